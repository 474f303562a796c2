//! Colour spaces and colour values.

/// Colour value in the graphics state.
#[derive(Debug, Clone, PartialEq)]
pub enum Color {
    Gray(f64),
    Rgb(f64, f64, f64),
    Cmyk(f64, f64, f64, f64),
    /// Components in any other colour space.
    Components(Vec<f64>),
    /// Pattern name, with tint components for uncoloured patterns.
    Pattern(String, Vec<f64>),
}

impl Default for Color {
    fn default() -> Self {
        Color::Gray(0.0)
    }
}

impl Color {
    /// Initial colour when `space` becomes current.
    pub fn initial(space: &str) -> Self {
        match space {
            "DeviceGray" | "CalGray" | "G" => Color::Gray(0.0),
            "DeviceRGB" | "CalRGB" | "RGB" => Color::Rgb(0.0, 0.0, 0.0),
            "DeviceCMYK" | "CMYK" => Color::Cmyk(0.0, 0.0, 0.0, 1.0),
            "Pattern" => Color::Pattern(String::new(), Vec::new()),
            "Indexed" | "I" => Color::Components(vec![0.0]),
            _ => Color::Components(vec![1.0]),
        }
    }

    /// Colour from numeric components, shaped by their count.
    pub fn from_components(components: &[f64]) -> Self {
        match *components {
            [g] => Color::Gray(g),
            [r, g, b] => Color::Rgb(r, g, b),
            [c, m, y, k] => Color::Cmyk(c, m, y, k),
            _ => Color::Components(components.to_vec()),
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            Color::Gray(g) => vec![*g],
            Color::Rgb(r, g, b) => vec![*r, *g, *b],
            Color::Cmyk(c, m, y, k) => vec![*c, *m, *y, *k],
            Color::Components(v) => v.clone(),
            Color::Pattern(_, tint) => tint.clone(),
        }
    }

    pub fn pattern_name(&self) -> Option<&str> {
        match self {
            Color::Pattern(name, _) => Some(name),
            _ => None,
        }
    }
}

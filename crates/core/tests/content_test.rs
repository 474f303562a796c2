mod common;

use common::{CONTENT, simple_pdf};
use vellum_core::content::{ContentStreamAnalyzer, ContentStreamBuilder, OpCode};
use vellum_core::model::geometry::Point;
use vellum_core::model::state::GraphicsStateTracker;
use vellum_core::{ObjRef, PdfFile, PdfObject, Result};

fn keywords<S: GraphicsStateTracker>(analyzer: &ContentStreamAnalyzer<S>) -> Vec<String> {
    analyzer
        .operators()
        .iter()
        .map(|op| op.keyword_str().into_owned())
        .collect()
}

#[test]
fn test_delete_image_from_page_content() {
    let mut file = PdfFile::load(simple_pdf("1.4")).unwrap();
    let stream = file
        .object_mut(ObjRef::new(4, 0))
        .unwrap()
        .unwrap()
        .as_stream_mut()
        .unwrap();
    let mut analyzer = ContentStreamAnalyzer::from_stream(stream).unwrap();
    assert_eq!(analyzer.image_indices(), &[2]);
    assert_eq!(analyzer.text_indices(), &[6]);

    let removed = analyzer.delete(2).unwrap();
    assert_eq!(removed, vec![0, 1, 2, 3]);
    assert!(analyzer.image_indices().is_empty());
    assert_eq!(analyzer.data(), &CONTENT[29..]);
    stream.set_decoded(analyzer.into_data());

    let mut reloaded = PdfFile::load(file.save(false).unwrap()).unwrap();
    let stream = reloaded
        .object_mut(ObjRef::new(4, 0))
        .unwrap()
        .unwrap()
        .as_stream_mut()
        .unwrap();
    let analyzer = ContentStreamAnalyzer::from_stream(stream).unwrap();
    assert_eq!(keywords(&analyzer), ["BT", "Tf", "Tj", "ET", "m", "l", "S"]);

    let show = analyzer.text_operators().next().unwrap();
    assert_eq!(show.op, OpCode::ShowText);
    assert_eq!(show.state.params.text.font.as_deref(), Some("F1"));
    assert_eq!(show.state.params.text.font_size, 12.0);
}

#[test]
fn test_delete_keeps_following_group() {
    let mut analyzer =
        ContentStreamAnalyzer::new(b"q /Im1 Do Q q 0 0 5 5 re f Q".to_vec()).unwrap();
    assert_eq!(analyzer.delete(1).unwrap(), vec![0, 1, 2]);
    assert_eq!(analyzer.data(), b"q 0 0 5 5 re f Q");
    assert_eq!(analyzer.operator(3).unwrap().op, OpCode::Save);
    assert_eq!(analyzer.operator(5).unwrap().offset, 13);
    assert!(analyzer.operator(1).is_none());
}

#[test]
fn test_delete_without_empty_group() {
    let mut analyzer = ContentStreamAnalyzer::new(b"q /Im1 Do 0 g Q".to_vec()).unwrap();
    assert_eq!(analyzer.delete(1).unwrap(), vec![1]);
    assert_eq!(analyzer.data(), b"q 0 g Q");

    let mut analyzer =
        ContentStreamAnalyzer::new(b"q 0 0 5 5 re f /Im1 Do Q".to_vec()).unwrap();
    assert_eq!(analyzer.delete(3).unwrap(), vec![3]);
    assert_eq!(analyzer.data(), b"q 0 0 5 5 re f Q");
}

#[test]
fn test_deleting_inside_group_keeps_later_snapshots() {
    let content = b"0 0 m q 1 0 0 1 5 5 cm 2 w /F1 12 Tf Q 3 0 0 1 0 0 cm 1 1 l S";
    let untouched = ContentStreamAnalyzer::new(content.to_vec()).unwrap();
    let cases: [(usize, &[usize]); 3] = [(2, &[2]), (3, &[3]), (4, &[1, 2, 3, 4, 5])];
    for (index, expected) in cases {
        let mut analyzer = ContentStreamAnalyzer::new(content.to_vec()).unwrap();
        assert_eq!(analyzer.delete(index).unwrap(), expected);
        for later in 6..=8 {
            assert_eq!(
                *analyzer.operator(later).unwrap().state,
                *untouched.operator(later).unwrap().state,
                "operator {later} after deleting {index}"
            );
        }
        assert_eq!(analyzer.final_state(), untouched.final_state());
    }
}

#[test]
fn test_delete_unknown_index() {
    let mut analyzer = ContentStreamAnalyzer::new(b"0 g".to_vec()).unwrap();
    assert!(analyzer.delete(4).is_err());
    assert_eq!(analyzer.len(), 1);
}

#[test]
fn test_built_stream_round_trips_through_file() {
    let mut builder = ContentStreamBuilder::new();
    builder
        .save()
        .fill_gray(0.5)
        .rectangle(0.0, 0.0, 20.0, 20.0)
        .fill()
        .restore()
        .begin_text();
    builder.font("F2", 10.0).unwrap().show_text(b"Built").unwrap();
    builder.end_text();

    let mut file = PdfFile::load(simple_pdf("1.4")).unwrap();
    file.replace(
        ObjRef::new(4, 0),
        PdfObject::Stream(Box::new(builder.into_stream(true))),
    );
    let saved = file.save(false).unwrap();

    let mut reloaded = PdfFile::load(saved).unwrap();
    let stream = reloaded
        .object_mut(ObjRef::new(4, 0))
        .unwrap()
        .unwrap()
        .as_stream_mut()
        .unwrap();
    assert_eq!(stream.dict().get_name("Filter"), Some("FlateDecode"));
    let analyzer = ContentStreamAnalyzer::from_stream(stream).unwrap();
    assert_eq!(
        keywords(&analyzer),
        ["q", "g", "re", "f", "Q", "BT", "Tf", "Tj", "ET"]
    );
    let show = analyzer.operator(7).unwrap();
    assert_eq!(show.state.params.text.font.as_deref(), Some("F2"));
    assert_eq!(show.state.params.text.font_size, 10.0);
}

/// Tracks nothing but the save depth.
#[derive(Debug, Clone, Default, PartialEq)]
struct Depth {
    level: usize,
}

impl GraphicsStateTracker for Depth {
    fn current_point(&self) -> Option<Point> {
        None
    }

    fn react(&mut self, op: OpCode, _operands: &[PdfObject]) -> Result<()> {
        match op {
            OpCode::Save => self.level += 1,
            OpCode::Restore => self.level = self.level.saturating_sub(1),
            _ => {}
        }
        Ok(())
    }
}

#[test]
fn test_custom_tracker() {
    let mut analyzer =
        ContentStreamAnalyzer::with_state(b"q q 0 g Q /Im1 Do Q".to_vec(), Depth::default())
            .unwrap();
    let levels: Vec<usize> = analyzer.operators().iter().map(|op| op.state.level).collect();
    assert_eq!(levels, [1, 2, 2, 1, 1, 0]);
    assert_eq!(analyzer.final_state().level, 0);

    // A Q sits between the outer q and the image, so no pair is removed.
    assert_eq!(analyzer.delete(4).unwrap(), vec![4]);
    assert_eq!(analyzer.data(), b"q q 0 g Q Q");
}

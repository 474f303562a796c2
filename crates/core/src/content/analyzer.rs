//! Content-stream analysis and safe operator deletion.
//!
//! A [`ContentStreamAnalyzer`] decodes one content stream into operators,
//! runs a [`GraphicsStateTracker`] over them and keeps a snapshot of the
//! state on every operator. Operators are addressed by a logical index that
//! survives deletions.

use super::inline_image::read_inline_image;
use super::operator::{OpCode, Operands, Operator, check_arity};
use crate::error::{PdfError, Result};
use crate::model::objects::PdfObject;
use crate::model::state::{GraphicsState, GraphicsStateTracker};
use crate::model::stream::Stream;
use crate::parser::PdfParser;
use crate::parser::cursor::TOKEN_END;
use smallvec::{SmallVec, smallvec};
use std::ops::Range;
use std::rc::Rc;
use tracing::{debug, trace};

/// Runs a tracker and hands out snapshots.
///
/// Painting operators see the state before they execute; state operators
/// see the state they produce.
struct Replay<S> {
    state: S,
    current: Rc<S>,
}

impl<S: GraphicsStateTracker> Replay<S> {
    fn new(initial: &S) -> Self {
        Self {
            state: initial.clone(),
            current: Rc::new(initial.clone()),
        }
    }

    fn step(&mut self, op: OpCode, operands: &[PdfObject]) -> Result<Rc<S>> {
        let before = Rc::clone(&self.current);
        if op.mutates_state() {
            self.state.react(op, operands)?;
            if self.state != *self.current {
                self.current = Rc::new(self.state.clone());
            }
        }
        Ok(if op.is_paint() {
            before
        } else {
            Rc::clone(&self.current)
        })
    }

    fn finish(self) -> Rc<S> {
        self.current
    }
}

#[derive(Debug, Clone)]
pub struct ContentStreamAnalyzer<S: GraphicsStateTracker = GraphicsState> {
    buffer: Vec<u8>,
    operators: Vec<Operator<S>>,
    /// Logical indices of `Do` and inline-image operators.
    images: Vec<usize>,
    /// Logical indices of text-showing operators.
    texts: Vec<usize>,
    initial_state: S,
    final_state: Rc<S>,
}

impl ContentStreamAnalyzer<GraphicsState> {
    pub fn new(data: Vec<u8>) -> Result<Self> {
        Self::with_state(data, GraphicsState::default())
    }

    /// Analyze the decoded payload of a content stream.
    pub fn from_stream(stream: &mut Stream) -> Result<Self> {
        Self::new(stream.decoded_data()?.to_vec())
    }
}

impl<S: GraphicsStateTracker> ContentStreamAnalyzer<S> {
    /// Analyze `data` starting from `initial`.
    pub fn with_state(data: Vec<u8>, initial: S) -> Result<Self> {
        let (operators, final_state) = decode(&data, &initial)?;
        let images = logical_indices(&operators, |op| op.is_image());
        let texts = logical_indices(&operators, |op| op.is_text());
        debug!(
            operators = operators.len(),
            images = images.len(),
            texts = texts.len(),
            "analyzed content stream"
        );
        Ok(Self {
            buffer: data,
            operators,
            images,
            texts,
            initial_state: initial,
            final_state,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_data(self) -> Vec<u8> {
        self.buffer
    }

    pub fn operators(&self) -> &[Operator<S>] {
        &self.operators
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    fn position(&self, index: usize) -> Option<usize> {
        self.operators
            .binary_search_by_key(&index, |op| op.index)
            .ok()
    }

    /// Operator with logical index `index`.
    pub fn operator(&self, index: usize) -> Option<&Operator<S>> {
        self.position(index).map(|pos| &self.operators[pos])
    }

    pub fn image_indices(&self) -> &[usize] {
        &self.images
    }

    pub fn text_indices(&self) -> &[usize] {
        &self.texts
    }

    pub fn image_operators(&self) -> impl Iterator<Item = &Operator<S>> + '_ {
        self.images.iter().filter_map(|&i| self.operator(i))
    }

    pub fn text_operators(&self) -> impl Iterator<Item = &Operator<S>> + '_ {
        self.texts.iter().filter_map(|&i| self.operator(i))
    }

    pub fn initial_state(&self) -> &S {
        &self.initial_state
    }

    pub fn final_state(&self) -> &S {
        &self.final_state
    }

    /// Delete the operator with logical index `index`, together with any
    /// `q ... Q` pair it leaves with nothing painted inside.
    ///
    /// Returns the logical indices removed.
    pub fn delete(&mut self, index: usize) -> Result<Vec<usize>> {
        let pos = self.position(index).ok_or_else(|| {
            PdfError::Structure(format!("no operator with index {index}"))
        })?;
        let range = expand_range(&self.operators, pos..pos + 1);
        trace!(index, ?range, "deleting operators");

        // Replay first so a failing tracker leaves the analyzer untouched.
        let mut replay = Replay::new(&self.initial_state);
        let mut snapshots = Vec::with_capacity(self.operators.len() - range.len());
        for (i, op) in self.operators.iter().enumerate() {
            if !range.contains(&i) {
                snapshots.push(replay.step(op.op, &op.operands)?);
            }
        }

        let start = self.operators[range.start].offset;
        let stop = self
            .operators
            .get(range.end)
            .map_or(self.buffer.len(), |op| op.offset);
        let fuse = start > 0
            && stop < self.buffer.len()
            && !TOKEN_END.contains(self.buffer[start - 1])
            && !TOKEN_END.contains(self.buffer[stop]);
        let replacement: &[u8] = if fuse { b" " } else { b"" };
        self.buffer.splice(start..stop, replacement.iter().copied());
        let shift = stop - start - replacement.len();

        let removed: Vec<usize> = self.operators.drain(range.clone()).map(|op| op.index).collect();
        for op in &mut self.operators[range.start..] {
            op.offset -= shift;
            op.end -= shift;
        }
        for (op, snapshot) in self.operators.iter_mut().zip(snapshots) {
            op.state = snapshot;
        }
        self.final_state = replay.finish();
        self.images.retain(|i| !removed.contains(i));
        self.texts.retain(|i| !removed.contains(i));
        Ok(removed)
    }
}

fn logical_indices<S>(operators: &[Operator<S>], pick: impl Fn(OpCode) -> bool) -> Vec<usize> {
    operators
        .iter()
        .filter(|op| pick(op.op))
        .map(|op| op.index)
        .collect()
}

/// Decode operators and run the tracker over them.
fn decode<S: GraphicsStateTracker>(data: &[u8], initial: &S) -> Result<(Vec<Operator<S>>, Rc<S>)> {
    let mut parser = PdfParser::content(data);
    let mut replay = Replay::new(initial);
    let mut operators = Vec::new();
    let mut pending: Operands = SmallVec::new();
    let mut first_operand: Option<usize> = None;

    while let Some((start, obj, end)) = parser.next_object()? {
        let PdfObject::Token(keyword) = obj else {
            first_operand.get_or_insert(start);
            pending.push(obj);
            continue;
        };
        let (op, _) = OpCode::lookup(&keyword);
        let offset = first_operand.take().unwrap_or(start);
        let (operands, end) = if op == OpCode::InlineImage {
            if !pending.is_empty() {
                return Err(PdfError::Structure(format!("operands before BI at {start}")));
            }
            let image = read_inline_image(&mut parser)?;
            let operands: Operands = smallvec![
                PdfObject::Dict(image.params),
                PdfObject::String(image.data)
            ];
            (operands, image.end)
        } else {
            check_arity(op, &keyword, pending.len(), start)?;
            (std::mem::take(&mut pending), end)
        };
        let state = replay.step(op, &operands)?;
        operators.push(Operator {
            op,
            keyword: SmallVec::from_slice(&keyword),
            operands,
            index: operators.len(),
            offset,
            end,
            state,
        });
    }

    if let Some(pos) = first_operand {
        return Err(PdfError::Structure(format!(
            "{} operand(s) at {pos} not followed by an operator",
            pending.len()
        )));
    }
    Ok((operators, replay.finish()))
}

/// Widen `range` once: if a `Q` follows it and only non-painting
/// operators sit between the matching `q` and the range, cover `q ... Q`.
fn widen_once<S>(operators: &[Operator<S>], range: &Range<usize>) -> Option<Range<usize>> {
    if !operators.get(range.end)?.op.is_pop() {
        return None;
    }
    for i in (0..range.start).rev() {
        let op = operators[i].op;
        if op.is_push() {
            return Some(i..range.end + 1);
        }
        if op.is_paint() || op.is_pop() {
            return None;
        }
    }
    None
}

/// Smallest range containing `range` whose removal leaves no empty
/// `q ... Q` pair around it.
pub fn expand_range<S>(operators: &[Operator<S>], range: Range<usize>) -> Range<usize> {
    let mut range = range;
    while let Some(wider) = widen_once(operators, &range) {
        range = wider;
    }
    range
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(content: &[u8]) -> ContentStreamAnalyzer {
        ContentStreamAnalyzer::new(content.to_vec()).unwrap()
    }

    fn mnemonics(analyzer: &ContentStreamAnalyzer) -> Vec<String> {
        analyzer
            .operators()
            .iter()
            .map(|op| op.keyword_str().into_owned())
            .collect()
    }

    #[test]
    fn test_operands_and_spans() {
        let a = analyze(b"1 0 0 1 5 5 cm\n0 0 10 10 re f");
        assert_eq!(mnemonics(&a), ["cm", "re", "f"]);
        let re = &a.operators()[1];
        assert_eq!(re.operands.len(), 4);
        assert_eq!((re.offset, re.end), (15, 27));
        assert_eq!(a.operators()[0].state.ctm().e, 5.0);
    }

    #[test]
    fn test_paint_sees_state_before() {
        let a = analyze(b"0 0 m 5 5 l S");
        let stroke = &a.operators()[2];
        assert!(stroke.state.current_point().is_some());
        assert!(a.final_state().current_point().is_none());
    }

    #[test]
    fn test_arity_mismatch() {
        let err = ContentStreamAnalyzer::new(b"1 2 3 m".to_vec()).unwrap_err();
        assert!(matches!(err, PdfError::Structure(_)));
    }

    #[test]
    fn test_leftover_operands() {
        assert!(ContentStreamAnalyzer::new(b"0 0 m 1 2".to_vec()).is_err());
    }

    #[test]
    fn test_unknown_operator_keeps_operands() {
        let a = analyze(b"1 2 3 foo");
        let op = &a.operators()[0];
        assert_eq!(op.op, OpCode::Unknown);
        assert_eq!(op.keyword_str(), "foo");
        assert_eq!(op.operands.len(), 3);
    }

    #[test]
    fn test_subsequences() {
        let a = analyze(b"BT /F1 12 Tf (hi) Tj ET q /Im1 Do Q BI /W 1 ID x EI");
        assert_eq!(a.text_indices(), &[2]);
        assert_eq!(a.image_indices(), &[5, 7]);
        let inline = a.operator(7).unwrap();
        assert_eq!(inline.operands[1], PdfObject::String(b"x".to_vec()));
    }

    #[test]
    fn test_expand_range_folds_empty_group() {
        let a = analyze(b"q 1 0 0 1 0 0 cm /Im1 Do Q 0 0 m");
        assert_eq!(expand_range(a.operators(), 2..3), 0..4);
        let b = analyze(b"q 0 0 1 1 re f /Im1 Do Q");
        assert_eq!(expand_range(b.operators(), 3..4), 3..4);
    }

    #[test]
    fn test_expand_range_nested() {
        let a = analyze(b"q q /Im1 Do Q Q");
        assert_eq!(expand_range(a.operators(), 2..3), 0..5);
    }

    #[test]
    fn test_delete_rewrites_buffer() {
        let mut a = analyze(b"q 2 w /Im1 Do Q 0 0 m 1 1 l S");
        let removed = a.delete(2).unwrap();
        assert_eq!(removed, vec![0, 1, 2, 3]);
        assert_eq!(a.data(), b"0 0 m 1 1 l S");
        assert_eq!(a.operators()[0].index, 4);
        assert_eq!(a.operators()[0].offset, 0);
        assert!(a.image_indices().is_empty());
        assert!(a.delete(2).is_err());
    }

    #[test]
    fn test_delete_refreshes_snapshots() {
        let mut a = analyze(b"3 w 0 0 m 1 1 l S");
        a.delete(0).unwrap();
        assert_eq!(a.operator(3).unwrap().state.params.line_width, 1.0);
        assert_eq!(a.final_state().params.line_width, 1.0);
    }

    #[test]
    fn test_delete_inserts_separator() {
        let mut a = analyze(b"(a)Tj[(b)]TJ(c)Tj");
        a.delete(1).unwrap();
        assert_eq!(a.data(), b"(a)Tj(c)Tj");
        let mut b = analyze(b"(a)Tj[(b)]TJ 0 g");
        b.delete(1).unwrap();
        assert_eq!(b.data(), b"(a)Tj 0 g");
    }
}

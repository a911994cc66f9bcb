//! Edit-operation sequencing: steps, position maps and tagged transactions.
//!
//! A `Transaction` is an ordered batch of `Step`s applied atomically by a
//! `DocumentModel`. Every text step yields a `StepMap` so positions captured
//! before the batch can be carried through it.

use std::ops::Range;

use smol_str::SmolStr;

use crate::types::{Bias, Selection, StyleKind};

/// One primitive edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Insert { at: usize, text: SmolStr },
    Delete { range: Range<usize> },
    Replace { range: Range<usize>, text: SmolStr },
    AddAnnotation { kind: StyleKind, range: Range<usize> },
    RemoveAnnotation { kind: StyleKind, range: Range<usize> },
    SetSelection(Selection),
}

impl Step {
    /// The position map for a text step, computed against the document as it
    /// is right before the step runs. Annotation and selection steps don't
    /// move positions.
    pub fn step_map(&self) -> Option<StepMap> {
        match self {
            Step::Insert { at, text } => Some(StepMap::new(*at, 0, text.chars().count())),
            Step::Delete { range } => Some(StepMap::new(range.start, range.len(), 0)),
            Step::Replace { range, text } => {
                Some(StepMap::new(range.start, range.len(), text.chars().count()))
            }
            _ => None,
        }
    }

    /// The range this step touches, for validation.
    pub(crate) fn span(&self) -> Option<Range<usize>> {
        match self {
            Step::Insert { at, .. } => Some(*at..*at),
            Step::Delete { range }
            | Step::Replace { range, .. }
            | Step::AddAnnotation { range, .. }
            | Step::RemoveAnnotation { range, .. } => Some(range.clone()),
            Step::SetSelection(sel) => Some(sel.to_range()),
        }
    }
}

/// Replacement of `old_len` chars at `start` by `new_len` chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMap {
    pub start: usize,
    pub old_len: usize,
    pub new_len: usize,
}

impl StepMap {
    pub fn new(start: usize, old_len: usize, new_len: usize) -> Self {
        Self {
            start,
            old_len,
            new_len,
        }
    }

    pub fn old_end(&self) -> usize {
        self.start + self.old_len
    }

    pub fn new_end(&self) -> usize {
        self.start + self.new_len
    }

    /// Map a position from before the edit to after it.
    ///
    /// The edges of a replaced range stick to the matching edge of the new
    /// content. Bias only decides pure insertion points and positions strictly
    /// inside the replaced range.
    pub fn map(&self, pos: usize, bias: Bias) -> usize {
        if pos < self.start {
            return pos;
        }
        let end = self.old_end();
        if pos > end {
            return pos - self.old_len + self.new_len;
        }
        let side = if self.old_len == 0 {
            bias
        } else if pos == self.start {
            Bias::Left
        } else if pos == end {
            Bias::Right
        } else {
            bias
        };
        match side {
            Bias::Left => self.start,
            Bias::Right => self.new_end(),
        }
    }

    /// True if this map inserts at exactly `pos` without removing anything.
    pub fn is_insertion_at(&self, pos: usize) -> bool {
        self.old_len == 0 && self.new_len > 0 && self.start == pos
    }
}

/// A sequence of step maps, applied in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn map(&self, pos: usize, bias: Bias) -> usize {
        self.maps.iter().fold(pos, |p, m| m.map(p, bias))
    }

    /// Map a range so that insertions at either edge stay outside it.
    pub fn map_range(&self, range: Range<usize>) -> Range<usize> {
        let start = self.map(range.start, Bias::Right);
        let end = self.map(range.end, Bias::Left);
        start..end.max(start)
    }
}

/// Who produced a transaction.
///
/// Everything except `User` and `External` is emitted by the fidelity engine
/// itself and must not be reacted to by the engine again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    User,
    /// Programmatic change from outside the engine (host app, sync).
    External,
    Reveal,
    Collapse,
    Reconcile,
    DelimiterKey,
    InputRule,
}

impl Origin {
    pub fn is_self_inflicted(&self) -> bool {
        !matches!(self, Origin::User | Origin::External)
    }
}

/// Semantic intent of a user edit, abstracted from the platform event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Typed text.
    Typing,
    /// Backspace.
    DeleteBackward,
    /// Delete key.
    DeleteForward,
    Paste,
    /// Programmatic replacement (search/replace).
    Replace,
    Other,
}

impl InputKind {
    /// Check if this input kind is a deletion operation.
    pub fn is_deletion(&self) -> bool {
        matches!(self, InputKind::DeleteBackward | InputKind::DeleteForward)
    }

    /// Check if this input kind inserts text.
    pub fn is_insertion(&self) -> bool {
        matches!(self, InputKind::Typing | InputKind::Paste)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionMeta {
    pub origin: Origin,
    pub input: Option<InputKind>,
}

/// An ordered batch of steps plus metadata.
///
/// Step positions are expressed against the document as it is when that step
/// runs, i.e. after all previous steps in the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub steps: Vec<Step>,
    pub meta: TransactionMeta,
}

impl Transaction {
    pub fn new(origin: Origin) -> Self {
        Self {
            steps: Vec::new(),
            meta: TransactionMeta {
                origin,
                input: None,
            },
        }
    }

    pub fn user(input: InputKind) -> Self {
        Self {
            steps: Vec::new(),
            meta: TransactionMeta {
                origin: Origin::User,
                input: Some(input),
            },
        }
    }

    pub fn with_input(mut self, input: InputKind) -> Self {
        self.meta.input = Some(input);
        self
    }

    pub fn origin(&self) -> Origin {
        self.meta.origin
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn push(&mut self, step: Step) -> &mut Self {
        self.steps.push(step);
        self
    }

    pub fn insert(&mut self, at: usize, text: impl Into<SmolStr>) -> &mut Self {
        self.push(Step::Insert {
            at,
            text: text.into(),
        })
    }

    pub fn delete(&mut self, range: Range<usize>) -> &mut Self {
        self.push(Step::Delete { range })
    }

    pub fn replace(&mut self, range: Range<usize>, text: impl Into<SmolStr>) -> &mut Self {
        self.push(Step::Replace {
            range,
            text: text.into(),
        })
    }

    pub fn add_annotation(&mut self, kind: StyleKind, range: Range<usize>) -> &mut Self {
        self.push(Step::AddAnnotation { kind, range })
    }

    pub fn remove_annotation(&mut self, kind: StyleKind, range: Range<usize>) -> &mut Self {
        self.push(Step::RemoveAnnotation { kind, range })
    }

    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.push(Step::SetSelection(selection))
    }

    pub fn set_caret(&mut self, offset: usize) -> &mut Self {
        self.set_selection(Selection::collapsed(offset))
    }

    /// True if any step changes text.
    pub fn changes_text(&self) -> bool {
        self.steps.iter().any(|s| s.step_map().is_some())
    }
}

/// A step as it was applied, with the text it removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedStep {
    pub step: Step,
    pub map: Option<StepMap>,
    pub removed: SmolStr,
}

/// Result of applying a transaction to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTransaction {
    pub meta: TransactionMeta,
    pub mapping: Mapping,
    pub steps: Vec<AppliedStep>,
    pub selection_before: Selection,
    pub selection_after: Selection,
}

impl AppliedTransaction {
    pub fn origin(&self) -> Origin {
        self.meta.origin
    }

    /// True if the text content changed.
    pub fn text_changed(&self) -> bool {
        !self.mapping.is_empty()
    }

    /// True if text or annotations changed.
    pub fn doc_changed(&self) -> bool {
        self.steps
            .iter()
            .any(|s| !matches!(s.step, Step::SetSelection(_)))
    }

    pub fn selection_changed(&self) -> bool {
        self.selection_before != self.selection_after
    }

    /// If the transaction removed text and inserted nothing, the concatenated
    /// removed text.
    pub fn pure_deletion(&self) -> Option<String> {
        let mut out = String::new();
        for applied in &self.steps {
            match &applied.step {
                Step::Delete { .. } => out.push_str(&applied.removed),
                Step::Insert { .. } | Step::Replace { .. } => return None,
                _ => {}
            }
        }
        (!out.is_empty()).then_some(out)
    }

    /// Text inserted by the transaction if it consists of exactly one insert step.
    pub fn single_insertion(&self) -> Option<(usize, &str)> {
        let mut text_steps = self.steps.iter().filter(|s| s.map.is_some());
        let first = text_steps.next()?;
        if text_steps.next().is_some() {
            return None;
        }
        match &first.step {
            Step::Insert { at, text } => Some((*at, text.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_map_bias() {
        let map = StepMap::new(4, 0, 2);
        assert_eq!(map.map(3, Bias::Left), 3);
        assert_eq!(map.map(4, Bias::Left), 4);
        assert_eq!(map.map(4, Bias::Right), 6);
        assert_eq!(map.map(5, Bias::Left), 7);
    }

    #[test]
    fn test_replace_edges_ignore_bias() {
        // replace [2, 5) with 1 char
        let map = StepMap::new(2, 3, 1);
        assert_eq!(map.map(2, Bias::Right), 2);
        assert_eq!(map.map(5, Bias::Left), 3);
        // strictly inside
        assert_eq!(map.map(3, Bias::Left), 2);
        assert_eq!(map.map(3, Bias::Right), 3);
        assert_eq!(map.map(9, Bias::Left), 7);
    }

    #[test]
    fn test_mapping_composes() {
        let mut mapping = Mapping::new();
        mapping.push(StepMap::new(8, 0, 2));
        mapping.push(StepMap::new(4, 0, 2));
        assert_eq!(mapping.map(6, Bias::Left), 8);
        assert_eq!(mapping.map(8, Bias::Right), 12);
        // insertions at both edges stay outside
        assert_eq!(mapping.map_range(4..8), 6..10);
    }

    #[test]
    fn test_origin_self_inflicted() {
        assert!(!Origin::User.is_self_inflicted());
        assert!(!Origin::External.is_self_inflicted());
        assert!(Origin::Reveal.is_self_inflicted());
        assert!(Origin::InputRule.is_self_inflicted());
    }

    #[test]
    fn test_builder_chains() {
        let mut tx = Transaction::new(Origin::Reveal);
        tx.insert(5, "**").insert(0, "**").set_caret(3);
        assert_eq!(tx.steps.len(), 3);
        assert!(tx.changes_text());
        assert_eq!(tx.origin(), Origin::Reveal);
    }
}

//! Document model: text, style annotations, selection and line prefixes.
//!
//! Defines the `DocumentModel` trait the fidelity engine consumes, and
//! `StyledDocument`, the in-crate implementation over any `TextBuffer`.
//! All mutation goes through [`DocumentModel::apply`] so every change is an
//! atomic, tagged transaction with a position mapping.

use std::ops::Range;

use serde::Serialize;
use smol_str::SmolStr;

use crate::annotations::AnnotationSet;
use crate::error::FidelityError;
use crate::text::{EditorRope, TextBuffer};
use crate::transaction::{AppliedStep, AppliedTransaction, Mapping, Step, StepMap, Transaction};
use crate::types::{Bias, CompositionState, Selection, StyleAnnotation};

/// Core trait for documents the fidelity engine can drive.
///
/// Implementations provide offset-addressable text, annotation queries and
/// atomic application of transactions.
pub trait DocumentModel {
    // === Required: Content access ===

    /// Get length in characters.
    fn len_chars(&self) -> usize;

    /// Get a slice of the content. None if the range is invalid.
    fn slice(&self, range: Range<usize>) -> Option<SmolStr>;

    /// Get character at offset.
    fn char_at(&self, offset: usize) -> Option<char>;

    /// Get the full text as a String.
    fn text(&self) -> String;

    /// Current style annotations.
    fn annotations(&self) -> &AnnotationSet;

    // === Required: Selection and composition ===

    fn selection(&self) -> Selection;

    /// Get the current composition state.
    fn composition(&self) -> Option<&CompositionState>;

    /// Set the composition state.
    fn set_composition(&mut self, composition: Option<CompositionState>);

    // === Required: Mutation ===

    /// Apply all steps of `tx` atomically.
    ///
    /// Either every step is applied or none is.
    fn apply(&mut self, tx: Transaction) -> Result<AppliedTransaction, FidelityError>;

    // === Provided ===

    /// Caret offset if the selection is collapsed.
    fn caret(&self) -> Option<usize> {
        self.selection().caret()
    }

    fn is_composing(&self) -> bool {
        self.composition().is_some()
    }

    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Offset where the line containing `offset` starts.
    fn line_start(&self, offset: usize) -> usize {
        let mut start = offset.min(self.len_chars());
        while start > 0 && self.char_at(start - 1) != Some('\n') {
            start -= 1;
        }
        start
    }

    /// Chars of `range`, clamped to the document.
    fn chars(&self, range: Range<usize>) -> Vec<char> {
        let end = range.end.min(self.len_chars());
        let start = range.start.min(end);
        self.slice(start..end)
            .map(|s| s.chars().collect())
            .unwrap_or_default()
    }
}

/// Serializable snapshot of a document's content.
///
/// `line_prefixes` holds one entry per line: the block syntax (heading
/// hashes, list bullets, quote markers, indentation) that the structured
/// view does not show as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentContent {
    pub text: String,
    pub annotations: Vec<StyleAnnotation>,
    pub line_prefixes: Vec<SmolStr>,
}

impl DocumentContent {
    /// Plain text with no annotations and no block prefixes.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = text.matches('\n').count() + 1;
        Self {
            text,
            annotations: Vec::new(),
            line_prefixes: vec![SmolStr::default(); lines],
        }
    }

    pub fn with_annotations(mut self, annotations: impl IntoIterator<Item = StyleAnnotation>) -> Self {
        self.annotations.extend(annotations);
        self
    }
}

/// Document over a `TextBuffer` with annotations and block line prefixes.
#[derive(Debug, Clone)]
pub struct StyledDocument<T: TextBuffer = EditorRope> {
    buffer: T,
    annotations: AnnotationSet,
    line_prefixes: Vec<SmolStr>,
    selection: Selection,
    composition: Option<CompositionState>,
}

impl StyledDocument<EditorRope> {
    pub fn new(text: &str) -> Self {
        Self::from_content(DocumentContent::from_text(text))
    }

    pub fn from_content(content: DocumentContent) -> Self {
        Self::with_buffer(EditorRope::from_str(&content.text), content)
    }
}

impl<T: TextBuffer> StyledDocument<T> {
    /// Build a document from `content`, storing text in `buffer`.
    ///
    /// `buffer` must already hold `content.text`. Annotations are normalized
    /// and clipped, the prefix list is padded or truncated to the line count.
    pub fn with_buffer(buffer: T, content: DocumentContent) -> Self {
        let len = buffer.len_chars();
        let mut annotations = AnnotationSet::from_annotations(content.annotations);
        annotations.clip_to(len);
        let lines = buffer.count_newlines(0..len) + 1;
        let mut line_prefixes = content.line_prefixes;
        line_prefixes.resize(lines, SmolStr::default());
        Self {
            buffer,
            annotations,
            line_prefixes,
            selection: Selection::collapsed(0),
            composition: None,
        }
    }

    pub fn buffer(&self) -> &T {
        &self.buffer
    }

    pub fn line_prefixes(&self) -> &[SmolStr] {
        &self.line_prefixes
    }

    pub fn to_content(&self) -> DocumentContent {
        DocumentContent {
            text: self.buffer.to_string(),
            annotations: self.annotations.to_vec(),
            line_prefixes: self.line_prefixes.clone(),
        }
    }

    /// Check every step against the document length it will see.
    fn validate(&self, tx: &Transaction) -> Result<(), FidelityError> {
        let mut len = self.buffer.len_chars();
        for (index, step) in tx.steps.iter().enumerate() {
            if let Some(span) = step.span() {
                if span.start > span.end {
                    return Err(FidelityError::InvertedRange {
                        index,
                        start: span.start,
                        end: span.end,
                    });
                }
                if span.end > len {
                    return Err(FidelityError::StepOutOfBounds {
                        index,
                        start: span.start,
                        end: span.end,
                        len,
                    });
                }
            }
            if let Some(map) = step.step_map() {
                len = len - map.old_len + map.new_len;
            }
        }
        Ok(())
    }

    /// Drop the prefixes of lines merged away by removing `range`.
    fn remove_lines(&mut self, range: Range<usize>) {
        let merged = self.buffer.count_newlines(range.clone());
        if merged == 0 {
            return;
        }
        let line = self.buffer.char_to_line(range.start);
        let end = (line + 1 + merged).min(self.line_prefixes.len());
        let start = (line + 1).min(end);
        self.line_prefixes.drain(start..end);
    }

    /// Add empty prefixes for lines split off by inserting `text` at `at`.
    fn insert_lines(&mut self, at: usize, text: &str) {
        let split = text.matches('\n').count();
        if split == 0 {
            return;
        }
        let line = self.buffer.char_to_line(at);
        let idx = (line + 1).min(self.line_prefixes.len());
        self.line_prefixes
            .splice(idx..idx, std::iter::repeat_n(SmolStr::default(), split));
    }

    fn apply_text(&mut self, range: Range<usize>, text: &str) -> SmolStr {
        let removed = self.buffer.slice(range.clone()).unwrap_or_default();
        if !range.is_empty() {
            self.remove_lines(range.clone());
            self.buffer.delete(range.clone());
        }
        if !text.is_empty() {
            self.insert_lines(range.start, text);
            self.buffer.insert(range.start, text);
        }
        removed
    }
}

impl<T: TextBuffer> DocumentModel for StyledDocument<T> {
    fn len_chars(&self) -> usize {
        self.buffer.len_chars()
    }

    fn slice(&self, range: Range<usize>) -> Option<SmolStr> {
        self.buffer.slice(range)
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.buffer.char_at(offset)
    }

    fn text(&self) -> String {
        self.buffer.to_string()
    }

    fn line_start(&self, offset: usize) -> usize {
        let offset = offset.min(self.buffer.len_chars());
        self.buffer.line_to_char(self.buffer.char_to_line(offset))
    }

    fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    fn selection(&self) -> Selection {
        self.selection
    }

    fn composition(&self) -> Option<&CompositionState> {
        self.composition.as_ref()
    }

    fn set_composition(&mut self, composition: Option<CompositionState>) {
        self.composition = composition;
    }

    fn apply(&mut self, tx: Transaction) -> Result<AppliedTransaction, FidelityError> {
        self.validate(&tx)?;

        let selection_before = self.selection;
        let mut selection = self.selection;
        let mut mapping = Mapping::new();
        let mut applied = Vec::with_capacity(tx.steps.len());

        for step in tx.steps {
            let map = step.step_map();
            let removed = match &step {
                Step::Insert { at, text } => self.apply_text(*at..*at, text),
                Step::Delete { range } => self.apply_text(range.clone(), ""),
                Step::Replace { range, text } => self.apply_text(range.clone(), text),
                Step::AddAnnotation { kind, range } => {
                    self.annotations.add(*kind, range.clone());
                    SmolStr::default()
                }
                Step::RemoveAnnotation { kind, range } => {
                    self.annotations.remove(*kind, range.clone());
                    SmolStr::default()
                }
                Step::SetSelection(sel) => {
                    selection = *sel;
                    SmolStr::default()
                }
            };
            if let Some(map) = map {
                self.map_positions(&map, &mut selection);
                mapping.push(map);
            }
            applied.push(AppliedStep { step, map, removed });
        }

        let len = self.buffer.len_chars();
        self.selection = selection.map(|p| p.min(len));

        tracing::trace!(
            origin = ?tx.meta.origin,
            steps = applied.len(),
            selection = ?self.selection,
            "applied transaction"
        );

        Ok(AppliedTransaction {
            meta: tx.meta,
            mapping,
            steps: applied,
            selection_before,
            selection_after: self.selection,
        })
    }
}

impl<T: TextBuffer> StyledDocument<T> {
    fn map_positions(&mut self, map: &StepMap, selection: &mut Selection) {
        self.annotations.map(map);
        *selection = selection.map(|p| map.map(p, Bias::Right));
        if let Some(comp) = self.composition.as_mut() {
            comp.start_offset = map.map(comp.start_offset, Bias::Left);
        }
    }
}

//! Core editor types: selection, bias, composition, and style annotations.
//!
//! These types are framework-agnostic and can be used with any text buffer implementation.

use std::ops::Range;

use serde::Serialize;

/// Which way a position leans when text is inserted exactly at it.
///
/// `Left` keeps the position before the inserted text, `Right` moves it past
/// the inserted text. Positions strictly inside a replaced range also use the
/// bias to pick the edge they collapse onto.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum Bias {
    #[default]
    Left,
    Right,
}

/// Text selection with anchor and head positions.
///
/// The anchor is where the selection started, the head is where the cursor is now.
/// They may be in any order - use `start()` and `end()` for ordered bounds.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Selection {
    /// Where selection started
    pub anchor: usize,
    /// Where cursor is now
    pub head: usize,
}

impl Selection {
    /// Create a new selection.
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Create a collapsed selection (cursor position).
    pub fn collapsed(offset: usize) -> Self {
        Self {
            anchor: offset,
            head: offset,
        }
    }

    /// Get the start (lower bound) of the selection.
    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Get the end (upper bound) of the selection.
    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Check if the selection is collapsed (empty, cursor only).
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// The caret offset, if the selection is collapsed.
    pub fn caret(&self) -> Option<usize> {
        self.is_collapsed().then_some(self.head)
    }

    /// Check if an offset is within the selection.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start() && offset < self.end()
    }

    /// Get the selection length.
    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    /// Check if empty (same as is_collapsed).
    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }

    /// Convert to a Range<usize> (ordered).
    pub fn to_range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    /// Check if the selection is backwards (head before anchor).
    pub fn is_backwards(&self) -> bool {
        self.head < self.anchor
    }

    /// Apply `f` to both ends.
    pub fn map(self, mut f: impl FnMut(usize) -> usize) -> Self {
        Self {
            anchor: f(self.anchor),
            head: f(self.head),
        }
    }
}

/// IME composition state (for international text input).
///
/// While a composition is in progress the reveal machinery stays passive;
/// it resumes once the composition is committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositionState {
    /// Character offset where composition started
    pub start_offset: usize,
    /// Current composition text (uncommitted)
    pub text: String,
}

impl CompositionState {
    /// Create a new composition state.
    pub fn new(start_offset: usize, text: String) -> Self {
        Self { start_offset, text }
    }

    /// Get the end offset of the composition.
    pub fn end_offset(&self) -> usize {
        self.start_offset + self.text.chars().count()
    }

    /// Check if an offset is within the composition.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start_offset && offset < self.end_offset()
    }
}

/// Inline emphasis kinds that participate in delimiter reveal.
///
/// Ordering matters: `Bold` sorts before `Italic`, which is the tie-break
/// whenever both could apply at the same position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StyleKind {
    Bold,
    Italic,
}

impl StyleKind {
    pub const ALL: [StyleKind; 2] = [StyleKind::Bold, StyleKind::Italic];

    /// The mutually exclusive counterpart.
    pub fn other(self) -> Self {
        match self {
            StyleKind::Bold => StyleKind::Italic,
            StyleKind::Italic => StyleKind::Bold,
        }
    }
}

/// A style applied to a run of document characters, `[start, end)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct StyleAnnotation {
    pub kind: StyleKind,
    pub range: Range<usize>,
}

impl StyleAnnotation {
    pub fn new(kind: StyleKind, range: Range<usize>) -> Self {
        Self { kind, range }
    }

    pub fn bold(range: Range<usize>) -> Self {
        Self::new(StyleKind::Bold, range)
    }

    pub fn italic(range: Range<usize>) -> Self {
        Self::new(StyleKind::Italic, range)
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// True if the character at `offset` carries this style.
    pub fn covers(&self, offset: usize) -> bool {
        self.range.contains(&offset)
    }

    /// True if `offset` lies inside the range or on either boundary.
    pub fn touches(&self, offset: usize) -> bool {
        self.range.start <= offset && offset <= self.range.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_bounds() {
        // Forward selection
        let sel = Selection::new(5, 10);
        assert_eq!(sel.start(), 5);
        assert_eq!(sel.end(), 10);
        assert!(!sel.is_backwards());

        // Backward selection
        let sel = Selection::new(10, 5);
        assert_eq!(sel.start(), 5);
        assert_eq!(sel.end(), 10);
        assert!(sel.is_backwards());
        assert_eq!(sel.to_range(), 5..10);
    }

    #[test]
    fn test_selection_caret() {
        assert_eq!(Selection::collapsed(7).caret(), Some(7));
        assert_eq!(Selection::new(3, 7).caret(), None);
        assert_eq!(Selection::new(3, 7).len(), 4);
    }

    #[test]
    fn test_composition_contains() {
        let comp = CompositionState::new(10, "你好".to_string());
        assert_eq!(comp.end_offset(), 12); // 2 chars
        assert!(!comp.contains(9));
        assert!(comp.contains(10));
        assert!(comp.contains(11));
        assert!(!comp.contains(12)); // end is exclusive
    }

    #[test]
    fn test_annotation_touch_vs_cover() {
        let ann = StyleAnnotation::bold(4..8);
        assert!(!ann.covers(8));
        assert!(ann.touches(8));
        assert!(ann.touches(4));
        assert!(!ann.touches(3));
        assert_eq!(StyleKind::Bold.other(), StyleKind::Italic);
    }
}

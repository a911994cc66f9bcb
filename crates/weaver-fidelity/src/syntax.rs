//! Delimiter syntax table for inline emphasis.
//!
//! Maps each style kind to its canonical marker and classifies literal
//! delimiter text (`**word**`, `_word_`, `**mi*` …) into a tagged
//! [`Emphasis`] variant. The priority order lives in one table so it can be
//! audited in isolation.

use std::ops::Range;

use crate::types::StyleKind;

/// Marker character family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerChar {
    Star,
    Underscore,
}

impl MarkerChar {
    pub fn as_char(self) -> char {
        match self {
            MarkerChar::Star => '*',
            MarkerChar::Underscore => '_',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '*' => Some(MarkerChar::Star),
            '_' => Some(MarkerChar::Underscore),
            _ => None,
        }
    }
}

/// Check if a char belongs to any emphasis marker family.
pub fn is_marker_char(c: char) -> bool {
    MarkerChar::from_char(c).is_some()
}

/// What a delimiter shape parses as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Emphasis {
    /// Plain literal text.
    #[default]
    None,
    Bold,
    Italic,
}

impl Emphasis {
    pub fn style(self) -> Option<StyleKind> {
        match self {
            Emphasis::None => None,
            Emphasis::Bold => Some(StyleKind::Bold),
            Emphasis::Italic => Some(StyleKind::Italic),
        }
    }
}

impl From<StyleKind> for Emphasis {
    fn from(kind: StyleKind) -> Self {
        match kind {
            StyleKind::Bold => Emphasis::Bold,
            StyleKind::Italic => Emphasis::Italic,
        }
    }
}

/// Result of classifying a literal fragment.
///
/// `left_len`/`right_len` are the literal marker runs at the fragment edges.
/// They are zero when the fragment is not emphasis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DelimiterShape {
    pub emphasis: Emphasis,
    pub marker: Option<MarkerChar>,
    pub left_len: usize,
    pub right_len: usize,
}

impl DelimiterShape {
    pub const PLAIN: DelimiterShape = DelimiterShape {
        emphasis: Emphasis::None,
        marker: None,
        left_len: 0,
        right_len: 0,
    };

    /// The inner (non-delimiter) range of a fragment of `len` chars.
    /// Empty when the delimiters cover everything.
    pub fn inner_range(&self, len: usize) -> Range<usize> {
        let start = self.left_len.min(len);
        let end = len.saturating_sub(self.right_len).max(start);
        start..end
    }
}

/// Canonical marker used when inserting delimiters programmatically.
pub fn canonical_marker(kind: StyleKind) -> &'static str {
    match kind {
        StyleKind::Bold => "**",
        StyleKind::Italic => "*",
    }
}

pub fn marker_len(kind: StyleKind) -> usize {
    canonical_marker(kind).len()
}

/// (left run, right run) → emphasis, in priority order.
const SHAPE_TABLE: [(usize, usize, Emphasis); 4] = [
    (2, 2, Emphasis::Bold),
    (1, 1, Emphasis::Italic),
    // Mismatched runs stay italic, lengths preserved until collapse.
    (2, 1, Emphasis::Italic),
    (1, 2, Emphasis::Italic),
];

/// Classify a pair of same-family run lengths.
pub fn classify_lengths(left: usize, right: usize) -> Emphasis {
    SHAPE_TABLE
        .iter()
        .find(|(l, r, _)| *l == left && *r == right)
        .map(|(_, _, e)| *e)
        .unwrap_or(Emphasis::None)
}

/// Length of the run of `c` at the start of `chars`.
pub fn leading_run(chars: &[char], c: char) -> usize {
    chars.iter().take_while(|&&x| x == c).count()
}

/// Length of the run of `c` at the end of `chars`.
pub fn trailing_run(chars: &[char], c: char) -> usize {
    chars.iter().rev().take_while(|&&x| x == c).count()
}

/// Classify a literal fragment such as `**word**`.
///
/// Both edges must be runs of the same marker character. A fragment made only
/// of marker characters splits its run in half, the left side taking the odd
/// one.
pub fn classify(text: &str) -> DelimiterShape {
    let chars: Vec<char> = text.chars().collect();
    classify_chars(&chars)
}

pub fn classify_chars(chars: &[char]) -> DelimiterShape {
    let (Some(&first), Some(&last)) = (chars.first(), chars.last()) else {
        return DelimiterShape::PLAIN;
    };
    let Some(marker) = MarkerChar::from_char(first) else {
        return DelimiterShape::PLAIN;
    };
    if first != last {
        return DelimiterShape::PLAIN;
    }

    let left_run = leading_run(chars, first);
    let (left_len, right_len) = if left_run == chars.len() {
        (chars.len().div_ceil(2), chars.len() / 2)
    } else {
        (left_run, trailing_run(chars, first))
    };

    let emphasis = classify_lengths(left_len, right_len);
    if emphasis == Emphasis::None {
        return DelimiterShape::PLAIN;
    }
    DelimiterShape {
        emphasis,
        marker: Some(marker),
        left_len,
        right_len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(text: &str) -> (Emphasis, usize, usize) {
        let s = classify(text);
        (s.emphasis, s.left_len, s.right_len)
    }

    #[test]
    fn test_canonical_markers() {
        assert_eq!(canonical_marker(StyleKind::Bold), "**");
        assert_eq!(canonical_marker(StyleKind::Italic), "*");
        assert_eq!(marker_len(StyleKind::Bold), 2);
    }

    #[test]
    fn test_table_priority() {
        assert_eq!(classify_lengths(2, 2), Emphasis::Bold);
        assert_eq!(classify_lengths(1, 1), Emphasis::Italic);
        assert_eq!(classify_lengths(2, 1), Emphasis::Italic);
        assert_eq!(classify_lengths(1, 2), Emphasis::Italic);
        assert_eq!(classify_lengths(3, 3), Emphasis::None);
        assert_eq!(classify_lengths(0, 1), Emphasis::None);
    }

    #[test]
    fn test_classify_fragments() {
        assert_eq!(shape("**word**"), (Emphasis::Bold, 2, 2));
        assert_eq!(shape("*word*"), (Emphasis::Italic, 1, 1));
        assert_eq!(shape("__word__"), (Emphasis::Bold, 2, 2));
        assert_eq!(shape("_word_"), (Emphasis::Italic, 1, 1));
        assert_eq!(shape("**mi*"), (Emphasis::Italic, 2, 1));
        assert_eq!(shape("*mi**"), (Emphasis::Italic, 1, 2));
    }

    #[test]
    fn test_classify_rejects() {
        assert_eq!(shape("***word***"), (Emphasis::None, 0, 0));
        assert_eq!(shape("**word__"), (Emphasis::None, 0, 0));
        assert_eq!(shape("word"), (Emphasis::None, 0, 0));
        assert_eq!(shape("*word"), (Emphasis::None, 0, 0));
        assert_eq!(shape(""), (Emphasis::None, 0, 0));
    }

    #[test]
    fn test_all_marker_fragment_splits() {
        assert_eq!(shape("****"), (Emphasis::Bold, 2, 2));
        assert_eq!(shape("***"), (Emphasis::Italic, 2, 1));
        assert_eq!(shape("**"), (Emphasis::Italic, 1, 1));
        assert_eq!(shape("*"), (Emphasis::None, 0, 0));
    }

    #[test]
    fn test_inner_range() {
        let s = classify("**mi*");
        assert_eq!(s.inner_range(5), 2..4);
        let s = classify("****");
        assert!(s.inner_range(4).is_empty());
    }
}

//! Search and replace over either representation.
//!
//! Match ranges are char offsets into the text they were built from. An
//! index built over the structured text is never used against the markdown
//! source, or the other way round.

use std::ops::Range;

use serde::Deserialize;

use crate::position::Representation;
use crate::transaction::{InputKind, Transaction};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub case_sensitive: bool,
}

fn chars_eq(a: char, b: char, options: &SearchOptions) -> bool {
    a == b || (!options.case_sensitive && a.to_lowercase().eq(b.to_lowercase()))
}

/// Non-overlapping matches of `query` in `text`, left to right.
pub fn find_all_matches(text: &str, query: &str, options: &SearchOptions) -> Vec<Range<usize>> {
    let hay: Vec<char> = text.chars().collect();
    let needle: Vec<char> = query.chars().collect();
    if needle.is_empty() || needle.len() > hay.len() {
        return Vec::new();
    }

    let mut matches = Vec::new();
    let mut i = 0;
    while i + needle.len() <= hay.len() {
        let hit = hay[i..i + needle.len()]
            .iter()
            .zip(&needle)
            .all(|(&a, &b)| chars_eq(a, b, options));
        if hit {
            matches.push(i..i + needle.len());
            i += needle.len();
        } else {
            i += 1;
        }
    }
    matches
}

/// Replace every range in `matches` (sorted, non-overlapping) with `replacement`.
pub fn do_replace_all(text: &str, matches: &[Range<usize>], replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut ranges = matches.iter().peekable();
    let mut skip_until = 0;
    for (i, c) in text.chars().enumerate() {
        if let Some(r) = ranges.peek() {
            if i == r.start {
                out.push_str(replacement);
                skip_until = r.end;
                ranges.next();
            }
        }
        if i >= skip_until {
            out.push(c);
        }
    }
    out
}

/// A single transaction replacing every match, applied right to left so
/// earlier offsets stay valid and annotations covering a match keep covering
/// its replacement.
pub fn replace_all_transaction(matches: &[Range<usize>], replacement: &str) -> Transaction {
    let mut tx = Transaction::user(InputKind::Replace);
    for range in matches.iter().rev() {
        tx.replace(range.clone(), replacement);
    }
    tx
}

/// Matches for one query over one view, with a current position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchIndex {
    query: String,
    options: SearchOptions,
    matches: Vec<Range<usize>>,
    current: Option<usize>,
}

impl SearchIndex {
    pub fn build(view: Representation, text: &str, query: &str, options: SearchOptions) -> Self {
        let matches = find_all_matches(text, query, &options);
        tracing::debug!(?view, query, count = matches.len(), "built search index");
        Self {
            query: query.to_string(),
            options,
            matches,
            current: None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn options(&self) -> SearchOptions {
        self.options
    }

    pub fn matches(&self) -> &[Range<usize>] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn current(&self) -> Option<Range<usize>> {
        self.current.and_then(|i| self.matches.get(i).cloned())
    }

    /// Advance to the next match, wrapping at the end.
    pub fn next(&mut self) -> Option<Range<usize>> {
        if self.matches.is_empty() {
            return None;
        }
        let next = match self.current {
            Some(i) => (i + 1) % self.matches.len(),
            None => 0,
        };
        self.current = Some(next);
        self.current()
    }

    /// Step back to the previous match, wrapping at the start.
    pub fn previous(&mut self) -> Option<Range<usize>> {
        if self.matches.is_empty() {
            return None;
        }
        let prev = match self.current {
            Some(0) | None => self.matches.len() - 1,
            Some(i) => i - 1,
        };
        self.current = Some(prev);
        self.current()
    }

    /// Select the first match at or after `caret`, wrapping to the first one.
    pub fn select_nearest(&mut self, caret: usize) -> Option<Range<usize>> {
        if self.matches.is_empty() {
            return None;
        }
        let idx = self
            .matches
            .iter()
            .position(|r| r.start >= caret)
            .unwrap_or(0);
        self.current = Some(idx);
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentContent, DocumentModel, StyledDocument};
    use crate::types::StyleAnnotation;

    #[test]
    fn test_find_and_replace_plain() {
        let text = "The **cat** sat";
        let matches = find_all_matches(text, "at", &SearchOptions::default());
        assert_eq!(matches, vec![7..9, 13..15]);
        assert_eq!(do_replace_all(text, &matches, "X"), "The **cX** sX");
    }

    #[test]
    fn test_non_overlapping() {
        let matches = find_all_matches("aaaa", "aa", &SearchOptions::default());
        assert_eq!(matches, vec![0..2, 2..4]);
    }

    #[test]
    fn test_case_sensitivity() {
        let insensitive = SearchOptions::default();
        let sensitive = SearchOptions {
            case_sensitive: true,
        };
        assert_eq!(find_all_matches("Cat cat", "cat", &insensitive).len(), 2);
        assert_eq!(find_all_matches("Cat cat", "cat", &sensitive), vec![4..7]);
        assert!(find_all_matches("cat", "", &insensitive).is_empty());
    }

    #[test]
    fn test_navigation_wraps() {
        let mut index = SearchIndex::build(
            Representation::Structured,
            "a b a b a",
            "a",
            SearchOptions::default(),
        );
        assert_eq!(index.len(), 3);
        assert_eq!(index.previous(), Some(8..9));
        assert_eq!(index.next(), Some(0..1));
        assert_eq!(index.next(), Some(4..5));
        assert_eq!(index.select_nearest(5), Some(8..9));
        assert_eq!(index.next(), Some(0..1));
        assert_eq!(index.select_nearest(9), Some(0..1));
    }

    #[test]
    fn test_structured_replace_keeps_annotation() {
        let mut doc = StyledDocument::from_content(
            DocumentContent::from_text("The cat sat").with_annotations([StyleAnnotation::bold(4..7)]),
        );
        let matches = find_all_matches(&doc.text(), "at", &SearchOptions::default());
        assert_eq!(matches, vec![5..7, 9..11]);
        doc.apply(replace_all_transaction(&matches, "X")).unwrap();
        assert_eq!(doc.text(), "The cX sX");
        assert_eq!(doc.annotations().to_vec(), vec![StyleAnnotation::bold(4..6)]);
    }
}

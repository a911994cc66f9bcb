//! Normalized set of inline style annotations.
//!
//! Annotations are kept sorted by start offset. Same-kind ranges that overlap
//! or touch are merged, empty ranges are dropped, so for every kind each char
//! is covered at most once.

use std::ops::Range;

use crate::transaction::StepMap;
use crate::types::{Bias, StyleAnnotation, StyleKind};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationSet {
    items: Vec<StyleAnnotation>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_annotations(annotations: impl IntoIterator<Item = StyleAnnotation>) -> Self {
        let mut set = Self::new();
        for ann in annotations {
            set.add(ann.kind, ann.range);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StyleAnnotation> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<StyleAnnotation> {
        self.items.clone()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Apply `kind` over `range`, merging with same-kind neighbours.
    pub fn add(&mut self, kind: StyleKind, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let mut merged = range;
        // Same-kind items are disjoint and sorted, so one pass catches every
        // neighbour the widened range reaches.
        self.items.retain(|a| {
            let joins =
                a.kind == kind && a.range.start <= merged.end && merged.start <= a.range.end;
            if joins {
                merged.start = merged.start.min(a.range.start);
                merged.end = merged.end.max(a.range.end);
            }
            !joins
        });
        let ann = StyleAnnotation::new(kind, merged);
        let pos = self
            .items
            .binary_search_by(|a| sort_key(a).cmp(&sort_key(&ann)))
            .unwrap_or_else(|pos| pos);
        self.items.insert(pos, ann);
    }

    /// Remove `kind` from `range`, splitting annotations that extend past it.
    pub fn remove(&mut self, kind: StyleKind, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let mut kept = Vec::with_capacity(self.items.len() + 1);
        for a in self.items.drain(..) {
            let overlaps =
                a.kind == kind && a.range.start < range.end && range.start < a.range.end;
            if !overlaps {
                kept.push(a);
                continue;
            }
            if a.range.start < range.start {
                kept.push(StyleAnnotation::new(kind, a.range.start..range.start));
            }
            if range.end < a.range.end {
                kept.push(StyleAnnotation::new(kind, range.end..a.range.end));
            }
        }
        kept.sort_by_key(sort_key);
        self.items = kept;
    }

    /// Remove every kind from `range`.
    pub fn remove_all(&mut self, range: Range<usize>) {
        for kind in StyleKind::ALL {
            self.remove(kind, range.clone());
        }
    }

    /// Annotations whose range contains the char at `offset`.
    pub fn covering(&self, offset: usize) -> impl Iterator<Item = &StyleAnnotation> {
        self.items.iter().filter(move |a| a.covers(offset))
    }

    /// True if the char at `offset` carries `kind`.
    pub fn is_covered(&self, kind: StyleKind, offset: usize) -> bool {
        self.covering(offset).any(|a| a.kind == kind)
    }

    /// Annotations intersected with `range`, in order. Empty intersections are skipped.
    pub fn clipped(&self, range: Range<usize>) -> Vec<StyleAnnotation> {
        self.items
            .iter()
            .filter_map(|a| {
                let start = a.range.start.max(range.start);
                let end = a.range.end.min(range.end);
                (start < end).then(|| StyleAnnotation::new(a.kind, start..end))
            })
            .collect()
    }

    /// Annotation of `kind` ending exactly at `offset`.
    pub fn ending_at(&self, kind: StyleKind, offset: usize) -> Option<&StyleAnnotation> {
        self.items
            .iter()
            .find(|a| a.kind == kind && a.range.end == offset)
    }

    /// Carry all annotations through a text edit.
    ///
    /// Starts map to the right and ends to the left, so text inserted exactly
    /// at an edge falls outside the annotation.
    pub fn map(&mut self, map: &StepMap) {
        let mapped = self
            .items
            .drain(..)
            .filter_map(|a| {
                let start = map.map(a.range.start, Bias::Right);
                let end = map.map(a.range.end, Bias::Left);
                (start < end).then(|| StyleAnnotation::new(a.kind, start..end))
            })
            .collect::<Vec<_>>();
        for ann in mapped {
            self.add(ann.kind, ann.range);
        }
    }

    /// Drop anything beyond `len`.
    pub fn clip_to(&mut self, len: usize) {
        let clipped = self.clipped(0..len);
        self.items = clipped;
    }
}

fn sort_key(a: &StyleAnnotation) -> (usize, StyleKind, usize) {
    (a.range.start, a.kind, a.range.end)
}

impl<'a> IntoIterator for &'a AnnotationSet {
    type Item = &'a StyleAnnotation;
    type IntoIter = std::slice::Iter<'a, StyleAnnotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[StyleAnnotation]) -> AnnotationSet {
        AnnotationSet::from_annotations(items.iter().cloned())
    }

    #[test]
    fn test_add_merges_same_kind() {
        let mut anns = set(&[StyleAnnotation::bold(0..3)]);
        anns.add(StyleKind::Bold, 3..6);
        assert_eq!(anns.to_vec(), vec![StyleAnnotation::bold(0..6)]);

        anns.add(StyleKind::Italic, 2..4);
        assert_eq!(anns.len(), 2);
    }

    #[test]
    fn test_add_bridges_two_ranges() {
        let mut anns = set(&[StyleAnnotation::bold(0..2), StyleAnnotation::bold(5..8)]);
        anns.add(StyleKind::Bold, 1..6);
        assert_eq!(anns.to_vec(), vec![StyleAnnotation::bold(0..8)]);
    }

    #[test]
    fn test_empty_is_dropped() {
        let mut anns = AnnotationSet::new();
        anns.add(StyleKind::Italic, 4..4);
        assert!(anns.is_empty());
    }

    #[test]
    fn test_remove_splits() {
        let mut anns = set(&[StyleAnnotation::bold(0..10)]);
        anns.remove(StyleKind::Bold, 3..5);
        assert_eq!(
            anns.to_vec(),
            vec![StyleAnnotation::bold(0..3), StyleAnnotation::bold(5..10)]
        );
    }

    #[test]
    fn test_insert_at_edges_does_not_extend() {
        let mut anns = set(&[StyleAnnotation::bold(4..8)]);
        anns.map(&StepMap::new(4, 0, 2));
        assert_eq!(anns.to_vec(), vec![StyleAnnotation::bold(6..10)]);
        anns.map(&StepMap::new(10, 0, 2));
        assert_eq!(anns.to_vec(), vec![StyleAnnotation::bold(6..10)]);
    }

    #[test]
    fn test_insert_inside_grows() {
        let mut anns = set(&[StyleAnnotation::italic(4..8)]);
        anns.map(&StepMap::new(5, 0, 3));
        assert_eq!(anns.to_vec(), vec![StyleAnnotation::italic(4..11)]);
    }

    #[test]
    fn test_replace_inside_stays_covered() {
        // "The cat sat", bold over "cat"; replace "at" with "X"
        let mut anns = set(&[StyleAnnotation::bold(4..7)]);
        anns.map(&StepMap::new(5, 2, 1));
        assert_eq!(anns.to_vec(), vec![StyleAnnotation::bold(4..6)]);
    }

    #[test]
    fn test_delete_whole_range_drops() {
        let mut anns = set(&[StyleAnnotation::bold(4..8)]);
        anns.map(&StepMap::new(4, 4, 0));
        assert!(anns.is_empty());
    }

    #[test]
    fn test_clipped_and_covering() {
        let anns = set(&[StyleAnnotation::bold(0..4), StyleAnnotation::italic(6..9)]);
        assert_eq!(
            anns.clipped(2..7),
            vec![StyleAnnotation::bold(2..4), StyleAnnotation::italic(6..7)]
        );
        assert_eq!(anns.covering(4).count(), 0);
        assert!(anns.is_covered(StyleKind::Italic, 8));
        assert!(anns.ending_at(StyleKind::Bold, 4).is_some());
    }
}

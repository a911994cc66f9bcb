//! Annotation range resolution: which style annotation the caret touches.

use std::ops::Range;

use crate::document::DocumentModel;
use crate::syntax::is_marker_char;
use crate::types::StyleKind;

/// Where the caret sits relative to a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Caret inside the annotation or on one of its boundaries.
    Inside,
    /// Caret right after a run of `marker_len` literal marker chars that
    /// closes the annotation.
    RightOutside { marker_len: usize },
}

/// A style annotation that should be revealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealCandidate {
    pub kind: StyleKind,
    pub range: Range<usize>,
    pub placement: Placement,
}

/// Find the innermost Bold/Italic annotation containing the caret or having
/// it on a boundary.
///
/// The char at the caret is probed first, then the char before it, which
/// catches a caret sitting right after the last styled char. Non-empty
/// selections never resolve.
pub fn find_reveal_candidate<D: DocumentModel + ?Sized>(doc: &D) -> Option<RevealCandidate> {
    let caret = doc.caret()?;
    let annotations = doc.annotations();

    let probe = |offset: usize| {
        annotations
            .covering(offset)
            .filter(|a| a.range.start <= caret && caret <= a.range.end)
            .min_by_key(|a| (a.range.len(), a.kind))
    };

    let found = probe(caret).or_else(|| caret.checked_sub(1).and_then(probe))?;
    tracing::trace!(caret, kind = ?found.kind, range = ?found.range, "resolved reveal candidate");
    Some(RevealCandidate {
        kind: found.kind,
        range: found.range.clone(),
        placement: Placement::Inside,
    })
}

/// Find an annotation closed by the literal marker run right before the caret.
///
/// Recovers a reveal after a deletion leaves the caret just outside a shrunk
/// annotation whose closing delimiter is still literal text.
pub fn find_reveal_candidate_right_outside<D: DocumentModel + ?Sized>(
    doc: &D,
) -> Option<RevealCandidate> {
    let caret = doc.caret()?;
    let before = doc.chars(caret.saturating_sub(2)..caret);
    let &marker = before.last()?;
    if !is_marker_char(marker) {
        return None;
    }
    let marker_len = before.iter().rev().take_while(|&&c| c == marker).count();

    // Prefer the longer run (`**` closes Bold), then the single char.
    (1..=marker_len).rev().find_map(|len| {
        let end = caret - len;
        StyleKind::ALL.iter().find_map(|&kind| {
            let ann = doc.annotations().ending_at(kind, end)?;
            tracing::trace!(caret, ?kind, range = ?ann.range, "resolved right-outside candidate");
            Some(RevealCandidate {
                kind,
                range: ann.range.clone(),
                placement: Placement::RightOutside { marker_len: len },
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentContent, StyledDocument};
    use crate::transaction::{Origin, Transaction};
    use crate::types::{Selection, StyleAnnotation};

    fn doc(text: &str, anns: &[StyleAnnotation], sel: Selection) -> StyledDocument {
        let mut doc = StyledDocument::from_content(
            DocumentContent::from_text(text).with_annotations(anns.iter().cloned()),
        );
        let mut tx = Transaction::new(Origin::External);
        tx.set_selection(sel);
        doc.apply(tx).unwrap();
        doc
    }

    #[test]
    fn test_caret_inside_and_on_boundaries() {
        let anns = [StyleAnnotation::bold(2..6)];
        for caret in [2, 4, 6] {
            let d = doc("a word b", &anns, Selection::collapsed(caret));
            let c = find_reveal_candidate(&d).expect("candidate");
            assert_eq!(c.range, 2..6);
            assert_eq!(c.placement, Placement::Inside);
        }
        for caret in [0, 1, 7, 8] {
            let d = doc("a word b", &anns, Selection::collapsed(caret));
            assert!(find_reveal_candidate(&d).is_none(), "caret {caret}");
        }
    }

    #[test]
    fn test_selection_never_resolves() {
        let d = doc("a word b", &[StyleAnnotation::bold(2..6)], Selection::new(3, 4));
        assert!(find_reveal_candidate(&d).is_none());
    }

    #[test]
    fn test_innermost_wins_bold_on_ties() {
        let anns = [StyleAnnotation::italic(0..8), StyleAnnotation::bold(2..5)];
        let d = doc("abcdefgh", &anns, Selection::collapsed(3));
        let c = find_reveal_candidate(&d).unwrap();
        assert_eq!((c.kind, c.range), (StyleKind::Bold, 2..5));

        let anns = [StyleAnnotation::italic(2..5), StyleAnnotation::bold(2..5)];
        let d = doc("abcdefgh", &anns, Selection::collapsed(3));
        let c = find_reveal_candidate(&d).unwrap();
        assert_eq!(c.kind, StyleKind::Bold);
    }

    #[test]
    fn test_right_outside() {
        // closing delimiter left behind as literal text
        let d = doc(
            "**word** x",
            &[StyleAnnotation::bold(2..6)],
            Selection::collapsed(8),
        );
        assert!(find_reveal_candidate(&d).is_none());
        let c = find_reveal_candidate_right_outside(&d).unwrap();
        assert_eq!(c.kind, StyleKind::Bold);
        assert_eq!(c.range, 2..6);
        assert_eq!(c.placement, Placement::RightOutside { marker_len: 2 });

        let d = doc("word x", &[StyleAnnotation::bold(0..4)], Selection::collapsed(5));
        assert!(find_reveal_candidate_right_outside(&d).is_none());
    }
}

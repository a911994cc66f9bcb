//! Emphasis input rule: `**word**` followed by a typed char becomes Bold.
//!
//! Runs only on plain typing while no span is revealed. The rule replaces
//! the literal delimiters with an annotation in one atomic transaction.

use crate::document::DocumentModel;
use crate::syntax::{MarkerChar, classify_lengths, is_marker_char, trailing_run};
use crate::transaction::{AppliedTransaction, Origin, Transaction};
use crate::types::StyleKind;

/// A matched `<open><inner><close>` run right before a trigger char.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmphasisMatch {
    pub kind: StyleKind,
    pub marker: MarkerChar,
    /// Start of the opening run.
    pub open_start: usize,
    pub open_len: usize,
    /// Start of the closing run.
    pub close_start: usize,
    pub close_len: usize,
    /// Offset of the trigger char.
    pub trigger: usize,
}

impl EmphasisMatch {
    pub fn inner_len(&self) -> usize {
        self.close_start - (self.open_start + self.open_len)
    }
}

/// Look for emphasis delimiters closed right before `trigger`.
pub fn match_emphasis<D: DocumentModel + ?Sized>(doc: &D, trigger: usize) -> Option<EmphasisMatch> {
    let line_start = doc.line_start(trigger);
    let line = doc.chars(line_start..trigger);
    let line = line.as_slice();

    let &m = line.last()?;
    let marker = MarkerChar::from_char(m)?;
    let close_len = trailing_run(line, m);
    if !(1..=2).contains(&close_len) {
        return None;
    }
    let close_rel = line.len() - close_len;

    // Last char of the opening run: the nearest same marker to the left.
    let open_last = line[..close_rel].iter().rposition(|&c| c == m)?;
    let open_len = trailing_run(&line[..=open_last], m);
    if !(1..=2).contains(&open_len) {
        return None;
    }
    let open_rel = open_last + 1 - open_len;

    let inner = &line[open_last + 1..close_rel];
    let (&first, &last) = (inner.first()?, inner.last()?);
    if first.is_whitespace() || last.is_whitespace() {
        return None;
    }
    if open_rel > 0 && line[open_rel - 1].is_alphanumeric() {
        return None;
    }
    let kind = classify_lengths(open_len, close_len).style()?;

    Some(EmphasisMatch {
        kind,
        marker,
        open_start: line_start + open_rel,
        open_len,
        close_start: line_start + close_rel,
        close_len,
        trigger,
    })
}

/// Build the input-rule transaction for a just-applied user transaction.
///
/// Fires when the transaction inserted exactly one non-marker char right
/// after a complete emphasis run. The caret lands right after the trigger.
pub fn emphasis_input_rule<D: DocumentModel + ?Sized>(
    doc: &D,
    applied: &AppliedTransaction,
) -> Option<Transaction> {
    if applied.origin() != Origin::User {
        return None;
    }
    let (at, text) = applied.single_insertion()?;
    let mut chars = text.chars();
    let trigger_char = chars.next()?;
    if chars.next().is_some() || is_marker_char(trigger_char) || trigger_char == '\n' {
        return None;
    }

    let m = match_emphasis(doc, at)?;
    let inner_start = m.open_start;
    let inner_len = m.inner_len();

    let mut tx = Transaction::new(Origin::InputRule);
    tx.delete(m.close_start..m.close_start + m.close_len)
        .delete(m.open_start..m.open_start + m.open_len);
    for kind in StyleKind::ALL {
        tx.remove_annotation(kind, inner_start..inner_start + inner_len);
    }
    tx.add_annotation(m.kind, inner_start..inner_start + inner_len)
        .set_caret(inner_start + inner_len + 1);

    tracing::debug!(
        kind = ?m.kind,
        start = inner_start,
        len = inner_len,
        "emphasis input rule fired"
    );
    Some(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::StyledDocument;
    use crate::transaction::InputKind;
    use crate::types::StyleAnnotation;

    fn type_char(doc: &mut StyledDocument, at: usize, c: &str) -> Option<Transaction> {
        let mut tx = Transaction::user(InputKind::Typing);
        tx.insert(at, c);
        let applied = doc.apply(tx).unwrap();
        emphasis_input_rule(doc, &applied)
    }

    #[test]
    fn test_bold_rule() {
        let mut doc = StyledDocument::new("**word**");
        let tx = type_char(&mut doc, 8, "x").expect("rule fires");
        doc.apply(tx).unwrap();
        assert_eq!(doc.text(), "wordx");
        assert_eq!(doc.annotations().to_vec(), vec![StyleAnnotation::bold(0..4)]);
        assert_eq!(doc.caret(), Some(5));
    }

    #[test]
    fn test_italic_underscore_rule_mid_line() {
        let mut doc = StyledDocument::new("say _hi_");
        let tx = type_char(&mut doc, 8, " ").expect("rule fires");
        doc.apply(tx).unwrap();
        assert_eq!(doc.text(), "say hi ");
        assert_eq!(doc.annotations().to_vec(), vec![StyleAnnotation::italic(4..6)]);
        assert_eq!(doc.caret(), Some(7));
    }

    #[test]
    fn test_rule_on_later_line() {
        let mut doc = StyledDocument::new("one **a**\ntwo\n**word**");
        assert_eq!(doc.line_start(22), 14);
        let tx = type_char(&mut doc, 22, "x").expect("rule fires");
        doc.apply(tx).unwrap();
        assert_eq!(doc.text(), "one **a**\ntwo\nwordx");
        assert_eq!(doc.annotations().to_vec(), vec![StyleAnnotation::bold(14..18)]);
        assert_eq!(doc.caret(), Some(19));
    }

    #[test]
    fn test_mismatched_runs_become_italic() {
        let mut doc = StyledDocument::new("**mi*");
        let tx = type_char(&mut doc, 5, "!").expect("rule fires");
        doc.apply(tx).unwrap();
        assert_eq!(doc.text(), "mi!");
        assert_eq!(doc.annotations().to_vec(), vec![StyleAnnotation::italic(0..2)]);
    }

    #[test]
    fn test_rule_rejections() {
        for (text, at) in [
            ("a*b*", 4),       // intraword opening
            ("** word**", 9),  // leading whitespace
            ("***word***", 10), // runs too long
            ("**", 2),          // nothing between
            ("*a\nb*", 5),      // crosses a line
        ] {
            let mut doc = StyledDocument::new(text);
            assert!(type_char(&mut doc, at, "x").is_none(), "{text:?}");
        }
    }

    #[test]
    fn test_marker_trigger_ignored() {
        let mut doc = StyledDocument::new("*word*");
        assert!(type_char(&mut doc, 6, "*").is_none());
    }
}

//! Reveal state machine for inline emphasis delimiters.
//!
//! A styled span is either collapsed (annotation only, no literal markers) or
//! expanded: the canonical markers are materialized as plain text around the
//! inner text while the annotation keeps covering only the inner run. At most
//! one span is expanded per controller.
//!
//! The controller subscribes to applied transactions. It never reacts to
//! transactions it (or another engine component) emitted; those carry a
//! self-inflicted [`Origin`].

use std::ops::Range;

use web_time::Instant;

use crate::config::RevealConfig;
use crate::document::DocumentModel;
use crate::error::FidelityError;
use crate::resolver::{
    Placement, RevealCandidate, find_reveal_candidate, find_reveal_candidate_right_outside,
};
use crate::syntax::{
    DelimiterShape, Emphasis, MarkerChar, canonical_marker, classify_chars, is_marker_char,
    leading_run, trailing_run,
};
use crate::transaction::{AppliedTransaction, Origin, Step, Transaction};
use crate::types::{Bias, StyleAnnotation, StyleKind};

/// The single expanded span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealState {
    /// Kind of the annotation that was revealed.
    pub kind: StyleKind,
    pub marker: MarkerChar,
    /// Expected marker length per side, from the canonical marker.
    pub marker_len: usize,
    /// Whole span including delimiters.
    pub start: usize,
    pub end: usize,
    /// What the delimiters currently parse as.
    pub semantic: Emphasis,
    pub left_len: usize,
    pub right_len: usize,
}

impl RevealState {
    /// Inclusive on both ends: a caret on either boundary is still inside.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn inner_range(&self) -> Range<usize> {
        let start = (self.start + self.left_len).min(self.end);
        let end = self.end.saturating_sub(self.right_len).max(start);
        start..end
    }

    /// True if the char at `offset` is one of the span's delimiter chars.
    pub fn is_delimiter_offset(&self, offset: usize) -> bool {
        let left = self.start..self.start + self.left_len;
        let right = self.end.saturating_sub(self.right_len)..self.end;
        left.contains(&offset) || right.contains(&offset)
    }

    fn set_shape(&mut self, shape: &DelimiterShape) {
        self.semantic = shape.emphasis;
        self.left_len = shape.left_len;
        self.right_len = shape.right_len;
        if let Some(marker) = shape.marker {
            self.marker = marker;
        }
    }
}

/// Key presses the controller can intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteKey {
    Backspace,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The key was consumed; the host must not run its default action.
    Handled,
    NotHandled,
}

#[derive(Debug, Clone, Default)]
pub struct RevealController {
    active: Option<RevealState>,
    config: RevealConfig,
    suppressed_until: Option<Instant>,
}

impl RevealController {
    pub fn new(config: RevealConfig) -> Self {
        Self {
            active: None,
            config,
            suppressed_until: None,
        }
    }

    pub fn active(&self) -> Option<&RevealState> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn config(&self) -> &RevealConfig {
        &self.config
    }

    /// True while automatic expansion is held off after a delimiter deletion.
    pub fn is_suppressed(&self) -> bool {
        self.suppressed_until
            .is_some_and(|until| Instant::now() < until)
    }

    fn suppress(&mut self) {
        self.suppressed_until = Some(Instant::now() + self.config.suppress_window());
        tracing::trace!(
            window_ms = self.config.suppress_window_ms,
            "suppressing reveal expansion"
        );
    }

    /// React to an applied transaction.
    pub fn on_transaction<D: DocumentModel + ?Sized>(
        &mut self,
        doc: &mut D,
        applied: &AppliedTransaction,
    ) -> Result<(), FidelityError> {
        if applied.origin().is_self_inflicted() {
            return Ok(());
        }

        if applied.text_changed() {
            self.remap_span(applied);
        }

        let deleted_marker = applied.origin() == Origin::User
            && applied.meta.input.is_some_and(|i| i.is_deletion())
            && applied
                .pure_deletion()
                .is_some_and(|removed| is_single_marker(&removed));
        if deleted_marker {
            self.suppress();
        }

        if doc.is_composing() {
            return Ok(());
        }

        if applied.text_changed() && self.active.is_some() {
            self.reconcile(doc)?;
        }

        let allow_right_outside = applied.meta.input.is_some_and(|i| i.is_deletion());
        self.sync_selection(doc, allow_right_outside)
    }

    /// Carry the span through text edits.
    ///
    /// Text inserted exactly at a boundary joins the span only when it
    /// consists solely of the span's marker char.
    fn remap_span(&mut self, applied: &AppliedTransaction) {
        let Some(state) = self.active.as_mut() else {
            return;
        };
        let marker = state.marker.as_char();
        for step in &applied.steps {
            let Some(map) = step.map else { continue };
            let joins = match &step.step {
                Step::Insert { text, .. } => !text.is_empty() && text.chars().all(|c| c == marker),
                _ => false,
            };
            let start_bias = if joins && map.is_insertion_at(state.start) {
                Bias::Left
            } else {
                Bias::Right
            };
            let end_bias = if joins && map.is_insertion_at(state.end) {
                Bias::Right
            } else {
                Bias::Left
            };
            state.start = map.map(state.start, start_bias);
            state.end = map.map(state.end, end_bias);
        }
        if state.is_empty() {
            tracing::debug!("reveal span deleted, dropping reveal state");
            self.active = None;
        }
    }

    /// Collapse or expand to match the current selection.
    pub fn sync_selection<D: DocumentModel + ?Sized>(
        &mut self,
        doc: &mut D,
        allow_right_outside: bool,
    ) -> Result<(), FidelityError> {
        if let Some(state) = &self.active {
            let inside = doc.caret().is_some_and(|caret| state.contains(caret));
            if inside {
                return Ok(());
            }
            self.collapse(doc)?;
        }

        if !self.config.enabled || doc.is_composing() || doc.caret().is_none() {
            return Ok(());
        }
        if self.is_suppressed() {
            tracing::trace!("reveal expansion suppressed");
            return Ok(());
        }

        let candidate = find_reveal_candidate(doc).or_else(|| {
            if allow_right_outside {
                find_reveal_candidate_right_outside(doc)
            } else {
                None
            }
        });
        match candidate {
            Some(candidate) => self.expand(doc, candidate),
            None => Ok(()),
        }
    }

    /// Materialize the delimiters of `candidate`.
    ///
    /// Existing literal markers of canonical length on both sides are adopted
    /// instead of inserting new ones.
    pub fn expand<D: DocumentModel + ?Sized>(
        &mut self,
        doc: &mut D,
        candidate: RevealCandidate,
    ) -> Result<(), FidelityError> {
        if self.active.is_some() {
            return Ok(());
        }
        let kind = candidate.kind;
        let marker = canonical_marker(kind);
        let len = marker.chars().count();
        let range = candidate.range;

        if let Some(found) = existing_markers(doc, &range, len) {
            let (start, end) = (range.start - len, range.end + len);
            let mut tx = Transaction::new(Origin::Reveal);
            strip_marker_regions(&mut tx, kind, start, range.clone(), end);
            doc.apply(tx)?;
            tracing::debug!(?kind, start, end, "adopted existing delimiters");
            self.active = Some(RevealState {
                kind,
                marker: found,
                marker_len: len,
                start,
                end,
                semantic: kind.into(),
                left_len: len,
                right_len: len,
            });
            return Ok(());
        }
        if matches!(candidate.placement, Placement::RightOutside { .. }) {
            return Ok(());
        }

        let caret = doc.caret().unwrap_or(range.end);
        let (s, e) = (range.start, range.end);
        let new_caret = if caret == e {
            e + 2 * len
        } else {
            caret.clamp(s, e) + len
        };

        let mut tx = Transaction::new(Origin::Reveal);
        tx.insert(e, marker).insert(s, marker);
        strip_marker_regions(&mut tx, kind, s, s + len..e + len, e + 2 * len);
        tx.set_caret(new_caret);
        doc.apply(tx)?;

        tracing::debug!(?kind, start = s, end = e + 2 * len, "expanded reveal");
        self.active = Some(RevealState {
            kind,
            marker: MarkerChar::Star,
            marker_len: len,
            start: s,
            end: e + 2 * len,
            semantic: kind.into(),
            left_len: len,
            right_len: len,
        });
        Ok(())
    }

    /// Re-derive the delimiter shape of the active span and fix annotations.
    pub fn reconcile<D: DocumentModel + ?Sized>(&mut self, doc: &mut D) -> Result<(), FidelityError> {
        let Some(state) = self.active.as_mut() else {
            return Ok(());
        };
        let len = doc.len_chars();
        state.end = state.end.min(len);
        state.start = state.start.min(state.end);

        let chars = doc.chars(state.span());
        let shape = classify_chars(&chars);
        let expected = expected_annotations(&shape, state.start, chars.len());
        let actual = doc.annotations().clipped(state.span());

        let shape_changed = shape.emphasis != state.semantic
            || shape.left_len != state.left_len
            || shape.right_len != state.right_len;
        if !shape_changed && actual == expected {
            return Ok(());
        }

        let mut tx = Transaction::new(Origin::Reconcile);
        for kind in StyleKind::ALL {
            tx.remove_annotation(kind, state.span());
        }
        for ann in &expected {
            tx.add_annotation(ann.kind, ann.range.clone());
        }
        doc.apply(tx)?;

        tracing::debug!(
            semantic = ?shape.emphasis,
            left = shape.left_len,
            right = shape.right_len,
            "reconciled reveal"
        );
        state.set_shape(&shape);
        Ok(())
    }

    /// Remove the literal delimiters of the active span.
    ///
    /// Unparseable fragments stay as typed, without annotation.
    pub fn collapse<D: DocumentModel + ?Sized>(&mut self, doc: &mut D) -> Result<(), FidelityError> {
        let Some(state) = self.active.take() else {
            return Ok(());
        };
        let len = doc.len_chars();
        let mut end = state.end.min(len);
        let mut start = state.start.min(end);
        let marker = state.marker.as_char();

        // Absorb delimiter chars that drifted just outside the span.
        let span = doc.chars(start..end);
        let mut lead = leading_run(&span, marker).min(span.len());
        while lead < state.marker_len && start > 0 && doc.char_at(start - 1) == Some(marker) {
            start -= 1;
            lead += 1;
        }
        let mut trail = trailing_run(&span, marker).min(span.len());
        while trail < state.marker_len && end < len && doc.char_at(end) == Some(marker) {
            end += 1;
            trail += 1;
        }

        let chars = doc.chars(start..end);
        let shape = classify_chars(&chars);
        let mut tx = Transaction::new(Origin::Collapse);

        match shape.emphasis.style() {
            Some(kind) => {
                let inner_range = shape.inner_range(chars.len());
                let inner: String = chars[inner_range.clone()].iter().collect();
                let inner_len = inner_range.len();
                let left = shape.left_len;
                let remap = |p: usize| {
                    if p >= end {
                        p - (end - start) + inner_len
                    } else if p <= start {
                        p
                    } else {
                        start + (p - start).saturating_sub(left).min(inner_len)
                    }
                };
                let selection = doc.selection().map(remap);

                tx.delete(start..end);
                if !inner.is_empty() {
                    tx.insert(start, inner);
                }
                for k in StyleKind::ALL {
                    tx.remove_annotation(k, start..start + inner_len);
                }
                tx.add_annotation(kind, start..start + inner_len)
                    .set_selection(selection);
                tracing::debug!(?kind, start, end, inner_len, "collapsed reveal");
            }
            None => {
                for k in StyleKind::ALL {
                    tx.remove_annotation(k, start..end);
                }
                tracing::debug!(start, end, "collapsed unparseable reveal as literal text");
            }
        }
        doc.apply(tx)?;
        Ok(())
    }

    /// Collapse immediately, e.g. on blur or a view switch.
    pub fn collapse_now<D: DocumentModel + ?Sized>(&mut self, doc: &mut D) -> Result<(), FidelityError> {
        self.collapse(doc)
    }

    /// Delete a single delimiter char of the active span.
    ///
    /// Returns `NotHandled` unless the key would delete one of the active
    /// span's delimiter chars.
    pub fn handle_key<D: DocumentModel + ?Sized>(
        &mut self,
        doc: &mut D,
        key: DeleteKey,
    ) -> Result<KeyOutcome, FidelityError> {
        let (Some(state), Some(caret)) = (self.active.as_ref(), doc.caret()) else {
            return Ok(KeyOutcome::NotHandled);
        };
        let target = match key {
            DeleteKey::Backspace => match caret.checked_sub(1) {
                Some(t) => t,
                None => return Ok(KeyOutcome::NotHandled),
            },
            DeleteKey::Delete => caret,
        };
        if !state.is_delimiter_offset(target) || target >= doc.len_chars() {
            return Ok(KeyOutcome::NotHandled);
        }

        let mut next = state.clone();
        let mut chars = doc.chars(state.span());
        chars.remove(target - state.start);
        next.end -= 1;
        let shape = classify_chars(&chars);
        let expected = expected_annotations(&shape, next.start, chars.len());

        let mut tx = Transaction::new(Origin::DelimiterKey);
        tx.delete(target..target + 1);
        for kind in StyleKind::ALL {
            tx.remove_annotation(kind, next.span());
        }
        for ann in &expected {
            tx.add_annotation(ann.kind, ann.range.clone());
        }
        tx.set_caret(target);
        doc.apply(tx)?;

        next.set_shape(&shape);
        tracing::debug!(?key, target, semantic = ?next.semantic, "deleted delimiter char");
        self.active = (!next.is_empty()).then_some(next);
        self.suppress();
        Ok(KeyOutcome::Handled)
    }

    /// Catch up after an IME composition ends.
    pub fn resume<D: DocumentModel + ?Sized>(&mut self, doc: &mut D) -> Result<(), FidelityError> {
        if doc.is_composing() {
            return Ok(());
        }
        if self.active.is_some() {
            self.reconcile(doc)?;
        }
        self.sync_selection(doc, false)
    }
}

fn is_single_marker(text: &str) -> bool {
    let mut chars = text.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if is_marker_char(c))
}

/// Annotations the inner run of a span at `start` should carry.
fn expected_annotations(shape: &DelimiterShape, start: usize, len: usize) -> Vec<StyleAnnotation> {
    let inner = shape.inner_range(len);
    match shape.emphasis.style() {
        Some(kind) if !inner.is_empty() => vec![StyleAnnotation::new(
            kind,
            start + inner.start..start + inner.end,
        )],
        _ => Vec::new(),
    }
}

/// Literal markers of exactly `len` same chars on both sides of `range`.
fn existing_markers<D: DocumentModel + ?Sized>(
    doc: &D,
    range: &Range<usize>,
    len: usize,
) -> Option<MarkerChar> {
    if range.start < len {
        return None;
    }
    let before = doc.chars(range.start - len..range.start);
    let after = doc.chars(range.end..range.end + len);
    if before.len() != len || after.len() != len {
        return None;
    }
    let c = before[0];
    let marker = MarkerChar::from_char(c)?;
    let uniform = before.iter().chain(after.iter()).all(|&x| x == c);
    let exact = (range.start == len || doc.char_at(range.start - len - 1) != Some(c))
        && doc.char_at(range.end + len) != Some(c);
    (uniform && exact).then_some(marker)
}

/// Strip styles from the marker regions around `inner` and drop the other
/// kind from the inner run.
fn strip_marker_regions(
    tx: &mut Transaction,
    kind: StyleKind,
    start: usize,
    inner: Range<usize>,
    end: usize,
) {
    tx.remove_annotation(kind.other(), inner.clone());
    for k in StyleKind::ALL {
        tx.remove_annotation(k, start..inner.start);
        tx.remove_annotation(k, inner.end..end);
    }
}

//! Editor surface: the entry point a host UI drives.
//!
//! `FidelityEditor` owns one document, its reveal controller and the current
//! search. Every user action becomes a tagged transaction that goes through
//! [`FidelityEditor::dispatch`], which runs the emphasis input rule and the
//! reveal state machine on it.

use std::ops::Range;

use crate::config::FidelityConfig;
use crate::convert::{CmarkConverter, MarkdownConverter};
use crate::document::{DocumentModel, StyledDocument};
use crate::error::FidelityError;
use crate::input_rules::emphasis_input_rule;
use crate::position::{MappedPosition, Representation, map_position};
use crate::reveal::{DeleteKey, KeyOutcome, RevealController, RevealState};
use crate::search::{
    SearchIndex, do_replace_all, find_all_matches, replace_all_transaction,
};
use crate::text::{EditorRope, TextBuffer};
use crate::transaction::{AppliedTransaction, InputKind, Origin, Transaction};
use crate::types::{CompositionState, Selection};

/// Markdown handed to a source view, with the caret mapped into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceView {
    pub markdown: String,
    pub caret: MappedPosition,
}

/// Structured search plus the text it was built over.
#[derive(Debug, Clone)]
struct ActiveSearch {
    index: SearchIndex,
    snapshot: String,
}

pub struct FidelityEditor<T: TextBuffer = EditorRope, C: MarkdownConverter = CmarkConverter> {
    doc: StyledDocument<T>,
    reveal: RevealController,
    converter: C,
    config: FidelityConfig,
    search: Option<ActiveSearch>,
}

impl FidelityEditor {
    /// Parse `markdown` with the reference converter and default config.
    pub fn from_markdown(markdown: &str) -> Self {
        Self::with_config(markdown, FidelityConfig::default())
    }

    pub fn with_config(markdown: &str, config: FidelityConfig) -> Self {
        Self::from_markdown_with(markdown, CmarkConverter, config)
    }
}

impl<T, C> FidelityEditor<T, C>
where
    T: TextBuffer + for<'a> From<&'a str>,
    C: MarkdownConverter,
{
    pub fn from_markdown_with(markdown: &str, converter: C, config: FidelityConfig) -> Self {
        let content = converter.parse(markdown);
        let buffer = T::from(content.text.as_str());
        Self::with_parts(StyledDocument::with_buffer(buffer, content), converter, config)
    }

    /// Collapse any reveal, serialize, and map the caret into the markdown.
    pub fn switch_to_source(&mut self) -> Result<SourceView, FidelityError> {
        let markdown = self.to_markdown()?;
        let caret = map_position(
            Representation::Structured,
            self.doc.selection().head,
            &self.doc.text(),
            &markdown,
            &self.config.mapping,
        );
        tracing::debug!(caret = caret.offset, anchored = caret.is_anchored(), "switched to source");
        Ok(SourceView { markdown, caret })
    }

    /// Replace the document with parsed `markdown` and place the caret at the
    /// structured position matching `caret` in the source.
    pub fn load_from_source(
        &mut self,
        markdown: &str,
        caret: usize,
    ) -> Result<MappedPosition, FidelityError> {
        let content = self.converter.parse(markdown);
        let mapped = map_position(
            Representation::Markdown,
            caret,
            &content.text,
            markdown,
            &self.config.mapping,
        );
        let buffer = T::from(content.text.as_str());
        self.doc = StyledDocument::with_buffer(buffer, content);
        self.reveal = RevealController::new(self.config.reveal.clone());
        self.search = None;

        let mut tx = Transaction::new(Origin::External);
        tx.set_caret(mapped.offset.min(self.doc.len_chars()));
        self.dispatch(tx)?;
        tracing::debug!(caret = mapped.offset, anchored = mapped.is_anchored(), "loaded from source");
        Ok(mapped)
    }

    /// Replace every match of `query` in the markdown source and reload.
    ///
    /// Returns the number of replacements.
    pub fn replace_all_in_source(
        &mut self,
        query: &str,
        replacement: &str,
    ) -> Result<usize, FidelityError> {
        let source = self.switch_to_source()?;
        let matches = find_all_matches(&source.markdown, query, &self.config.search);
        if matches.is_empty() {
            return Ok(0);
        }
        let markdown = do_replace_all(&source.markdown, &matches, replacement);

        let delta = replacement.chars().count() as isize;
        let caret = matches
            .iter()
            .filter(|m| m.end <= source.caret.offset)
            .fold(source.caret.offset as isize, |c, m| c + delta - m.len() as isize);
        self.load_from_source(&markdown, caret.max(0) as usize)?;
        Ok(matches.len())
    }
}

impl<T: TextBuffer, C: MarkdownConverter> FidelityEditor<T, C> {
    pub fn with_parts(doc: StyledDocument<T>, converter: C, config: FidelityConfig) -> Self {
        Self {
            doc,
            reveal: RevealController::new(config.reveal.clone()),
            converter,
            config,
            search: None,
        }
    }

    pub fn document(&self) -> &StyledDocument<T> {
        &self.doc
    }

    pub fn reveal(&self) -> Option<&RevealState> {
        self.reveal.active()
    }

    pub fn config(&self) -> &FidelityConfig {
        &self.config
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    /// Apply `tx` and let the engine react to it.
    ///
    /// Self-inflicted transactions are applied without reaction. A user
    /// insertion that completes an emphasis run is rewritten by the input
    /// rule; everything else feeds the reveal state machine.
    pub fn dispatch(&mut self, tx: Transaction) -> Result<AppliedTransaction, FidelityError> {
        let applied = self.doc.apply(tx)?;
        if applied.origin().is_self_inflicted() {
            return Ok(applied);
        }

        if !self.reveal.is_active() && !self.doc.is_composing() {
            if let Some(rule) = emphasis_input_rule(&self.doc, &applied) {
                self.doc.apply(rule)?;
                self.reveal.sync_selection(&mut self.doc, false)?;
                return Ok(applied);
            }
        }

        self.reveal.on_transaction(&mut self.doc, &applied)?;
        Ok(applied)
    }

    /// Insert `text` at the caret, replacing a non-empty selection.
    pub fn type_text(&mut self, text: &str) -> Result<AppliedTransaction, FidelityError> {
        let sel = self.doc.selection();
        let mut tx = Transaction::user(InputKind::Typing);
        match sel.caret() {
            Some(caret) => {
                tx.insert(caret, text);
            }
            None => {
                tx.replace(sel.to_range(), text)
                    .set_caret(sel.start() + text.chars().count());
            }
        }
        self.dispatch(tx)
    }

    pub fn move_caret(&mut self, offset: usize) -> Result<AppliedTransaction, FidelityError> {
        self.select(Selection::collapsed(offset))
    }

    pub fn select(&mut self, selection: Selection) -> Result<AppliedTransaction, FidelityError> {
        let len = self.doc.len_chars();
        let mut tx = Transaction::user(InputKind::Other);
        tx.set_selection(selection.map(|p| p.min(len)));
        self.dispatch(tx)
    }

    /// Backspace/Delete hook.
    ///
    /// Delimiter chars of the active reveal are handled by the reveal
    /// controller; anything else is a plain user deletion. `NotHandled` means
    /// there was nothing to delete.
    pub fn handle_key(&mut self, key: DeleteKey) -> Result<KeyOutcome, FidelityError> {
        if self.reveal.handle_key(&mut self.doc, key)? == KeyOutcome::Handled {
            return Ok(KeyOutcome::Handled);
        }

        let sel = self.doc.selection();
        let input = match key {
            DeleteKey::Backspace => InputKind::DeleteBackward,
            DeleteKey::Delete => InputKind::DeleteForward,
        };
        let range = match (sel.caret(), key) {
            (None, _) => sel.to_range(),
            (Some(0), DeleteKey::Backspace) => return Ok(KeyOutcome::NotHandled),
            (Some(caret), DeleteKey::Backspace) => caret - 1..caret,
            (Some(caret), DeleteKey::Delete) if caret < self.doc.len_chars() => caret..caret + 1,
            (Some(_), DeleteKey::Delete) => return Ok(KeyOutcome::NotHandled),
        };

        let mut tx = Transaction::user(input);
        tx.delete(range);
        self.dispatch(tx)?;
        Ok(KeyOutcome::Handled)
    }

    /// Focus loss: collapse any reveal now.
    pub fn blur(&mut self) -> Result<(), FidelityError> {
        self.reveal.collapse_now(&mut self.doc)
    }

    /// Start an IME composition at the selection start.
    pub fn begin_composition(&mut self) -> Result<(), FidelityError> {
        let sel = self.doc.selection();
        if !sel.is_collapsed() {
            let mut tx = Transaction::user(InputKind::DeleteForward);
            tx.delete(sel.to_range());
            self.dispatch(tx)?;
        }
        let start = self.doc.selection().start();
        self.doc
            .set_composition(Some(CompositionState::new(start, String::new())));
        tracing::trace!(start, "composition started");
        Ok(())
    }

    /// Replace the uncommitted composition text.
    pub fn update_composition(&mut self, text: &str) -> Result<(), FidelityError> {
        let Some(comp) = self.doc.composition().cloned() else {
            return Ok(());
        };
        let range = comp.start_offset..comp.end_offset().min(self.doc.len_chars());
        let mut tx = Transaction::user(InputKind::Typing);
        tx.replace(range.clone(), text)
            .set_caret(range.start + text.chars().count());
        self.dispatch(tx)?;
        self.doc.set_composition(Some(CompositionState::new(
            range.start,
            text.to_string(),
        )));
        Ok(())
    }

    /// Commit the composition and let the reveal machinery catch up.
    pub fn end_composition(&mut self, committed: Option<&str>) -> Result<(), FidelityError> {
        let Some(comp) = self.doc.composition().cloned() else {
            return Ok(());
        };
        if let Some(text) = committed.filter(|t| *t != comp.text) {
            self.update_composition(text)?;
        }
        self.doc.set_composition(None);
        tracing::trace!("composition ended");
        self.reveal.resume(&mut self.doc)
    }

    /// Collapse any reveal and serialize to markdown.
    pub fn to_markdown(&mut self) -> Result<String, FidelityError> {
        self.reveal.collapse_now(&mut self.doc)?;
        Ok(self.converter.serialize(&self.doc.to_content()))
    }

    /// Search the structured text and select the first match at or after the
    /// caret.
    pub fn search(&mut self, query: &str) -> Result<Option<Range<usize>>, FidelityError> {
        self.reveal.collapse_now(&mut self.doc)?;
        let snapshot = self.doc.text();
        let index = SearchIndex::build(
            Representation::Structured,
            &snapshot,
            query,
            self.config.search,
        );
        self.search = Some(ActiveSearch { index, snapshot });
        let from = self.doc.selection().start();
        let found = self
            .search
            .as_mut()
            .and_then(|s| s.index.select_nearest(from));
        self.select_match(found)
    }

    pub fn search_next(&mut self) -> Result<Option<Range<usize>>, FidelityError> {
        let found = match self.current_search()? {
            Some(index) => index.next(),
            None => None,
        };
        self.select_match(found)
    }

    pub fn search_previous(&mut self) -> Result<Option<Range<usize>>, FidelityError> {
        let found = match self.current_search()? {
            Some(index) => index.previous(),
            None => None,
        };
        self.select_match(found)
    }

    pub fn search_index(&self) -> Option<&SearchIndex> {
        self.search.as_ref().map(|s| &s.index)
    }

    /// Replace every match of `query` in the structured text in one
    /// transaction. Returns the number of replacements.
    pub fn replace_all(&mut self, query: &str, replacement: &str) -> Result<usize, FidelityError> {
        self.reveal.collapse_now(&mut self.doc)?;
        let matches = find_all_matches(&self.doc.text(), query, &self.config.search);
        if matches.is_empty() {
            return Ok(0);
        }
        self.dispatch(replace_all_transaction(&matches, replacement))?;
        self.search = None;
        tracing::debug!(query, count = matches.len(), "replaced all in structured view");
        Ok(matches.len())
    }

    /// Matches of `query` in the markdown source, as source char offsets.
    pub fn search_source(&mut self, query: &str) -> Result<Vec<Range<usize>>, FidelityError> {
        let markdown = self.to_markdown()?;
        Ok(find_all_matches(&markdown, query, &self.config.search))
    }

    /// The current index, rebuilt if the text moved on since it was built.
    fn current_search(&mut self) -> Result<Option<&mut SearchIndex>, FidelityError> {
        self.reveal.collapse_now(&mut self.doc)?;
        let text = self.doc.text();
        let Some(search) = self.search.as_mut() else {
            return Ok(None);
        };
        if search.snapshot != text {
            tracing::trace!("text changed since search, rebuilding index");
            let index = SearchIndex::build(
                Representation::Structured,
                &text,
                search.index.query(),
                search.index.options(),
            );
            *search = ActiveSearch {
                index,
                snapshot: text,
            };
        }
        Ok(Some(&mut search.index))
    }

    fn select_match(
        &mut self,
        found: Option<Range<usize>>,
    ) -> Result<Option<Range<usize>>, FidelityError> {
        if let Some(range) = &found {
            self.select(Selection::new(range.start, range.end))?;
        }
        Ok(found)
    }
}

//! weaver-fidelity: inline markdown fidelity for structured editors.
//!
//! This crate provides:
//! - `DocumentModel` trait and `StyledDocument<T>` over any `TextBuffer`
//! - `Transaction` - atomic, origin-tagged batches of edit steps
//! - `RevealController` - reveal/collapse of emphasis delimiters at the caret
//! - Emphasis input rule, caret mapping between views, search and replace
//! - `FidelityEditor` - the surface a host UI drives

pub mod annotations;
pub mod config;
pub mod convert;
pub mod document;
pub mod editor;
pub mod error;
pub mod input_rules;
pub mod markup;
pub mod position;
pub mod resolver;
pub mod reveal;
pub mod search;
pub mod syntax;
pub mod text;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod tests;

pub use annotations::AnnotationSet;
pub use config::{FidelityConfig, MappingConfig, RevealConfig};
pub use convert::{CmarkConverter, MarkdownConverter};
pub use document::{DocumentContent, DocumentModel, StyledDocument};
pub use editor::{FidelityEditor, SourceView};
pub use error::FidelityError;
pub use input_rules::{EmphasisMatch, emphasis_input_rule, match_emphasis};
pub use position::{
    AnchorMatch, MappedPosition, PlainRendering, Representation, map_between, map_position,
};
pub use resolver::{
    Placement, RevealCandidate, find_reveal_candidate, find_reveal_candidate_right_outside,
};
pub use reveal::{DeleteKey, KeyOutcome, RevealController, RevealState};
pub use search::{
    SearchIndex, SearchOptions, do_replace_all, find_all_matches, replace_all_transaction,
};
pub use smol_str::SmolStr;
pub use syntax::{DelimiterShape, Emphasis, MarkerChar, classify, classify_lengths};
pub use text::{EditorRope, TextBuffer};
pub use transaction::{
    AppliedTransaction, InputKind, Mapping, Origin, Step, StepMap, Transaction, TransactionMeta,
};
pub use types::{Bias, CompositionState, Selection, StyleAnnotation, StyleKind};

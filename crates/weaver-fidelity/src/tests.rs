//! Scenario tests driving `FidelityEditor` end to end.
//!
//! Each scenario renders the editor state as one line so the snapshots read
//! as a trace of what the user sees.

use std::time::Duration;

use insta::assert_snapshot;

use crate::config::{FidelityConfig, MappingConfig, RevealConfig};
use crate::convert::CmarkConverter;
use crate::document::{DocumentContent, DocumentModel, StyledDocument};
use crate::editor::FidelityEditor;
use crate::position::{Representation, map_position};
use crate::reveal::{DeleteKey, KeyOutcome};
use crate::types::{Selection, StyleAnnotation};

fn state(editor: &FidelityEditor) -> String {
    let doc = editor.document();
    let annotations: Vec<String> = doc
        .annotations()
        .iter()
        .map(|a| format!("{:?} {:?}", a.kind, a.range))
        .collect();
    let sel = doc.selection();
    let reveal = match editor.reveal() {
        Some(r) => format!(
            "{:?} {:?} {}+{}",
            r.semantic,
            r.span(),
            r.left_len,
            r.right_len
        ),
        None => "none".to_string(),
    };
    format!(
        "{:?} [{}] sel {}..{} reveal {}",
        doc.text(),
        annotations.join(", "),
        sel.anchor,
        sel.head,
        reveal
    )
}

/// Editor over structured `text` as is, without parsing it as markdown.
fn styled_editor(text: &str, annotations: &[StyleAnnotation]) -> FidelityEditor {
    let content = DocumentContent::from_text(text).with_annotations(annotations.iter().cloned());
    FidelityEditor::with_parts(
        StyledDocument::from_content(content),
        CmarkConverter,
        FidelityConfig::default(),
    )
}

fn type_chars(editor: &mut FidelityEditor, text: &str) {
    for c in text.chars() {
        editor.type_text(c.encode_utf8(&mut [0; 4])).unwrap();
    }
}

#[test]
fn test_typed_bold_becomes_annotation() {
    let mut editor = FidelityEditor::from_markdown("");
    type_chars(&mut editor, "**word**x");
    assert_snapshot!(state(&editor), @r#""wordx" [Bold 0..4] sel 5..5 reveal none"#);
    assert_eq!(editor.to_markdown().unwrap(), "**word**x");
}

#[test]
fn test_typed_italic_after_text() {
    let mut editor = FidelityEditor::from_markdown("");
    type_chars(&mut editor, "so *very* much");
    assert_snapshot!(state(&editor), @r#""so very much" [Italic 3..7] sel 12..12 reveal none"#);
}

#[test]
fn test_delete_and_retype_delimiter_restores_state() {
    let mut editor = FidelityEditor::from_markdown("**word** x");
    editor.move_caret(0).unwrap();
    let expanded = state(&editor);
    assert_snapshot!(&expanded, @r#""**word** x" [Bold 2..6] sel 2..2 reveal Bold 0..8 2+2"#);

    let outcome = editor.handle_key(DeleteKey::Backspace).unwrap();
    assert_eq!(outcome, KeyOutcome::Handled);
    assert_snapshot!(state(&editor), @r#""*word** x" [Italic 1..5] sel 1..1 reveal Italic 0..7 1+2"#);

    editor.type_text("*").unwrap();
    assert_eq!(state(&editor), expanded);
}

#[test]
fn test_mismatched_delimiters_collapse_to_italic() {
    let mut editor = FidelityEditor::from_markdown("**mi** x");
    editor.move_caret(1).unwrap();
    editor.move_caret(6).unwrap();
    editor.handle_key(DeleteKey::Backspace).unwrap();
    assert_snapshot!(state(&editor), @r#""**mi* x" [Italic 2..4] sel 5..5 reveal Italic 0..5 2+1"#);

    editor.move_caret(7).unwrap();
    assert_snapshot!(state(&editor), @r#""mi x" [Italic 0..2] sel 4..4 reveal none"#);
}

#[test]
fn test_selection_collapses_reveal() {
    let mut editor = FidelityEditor::from_markdown("**word**");
    editor.move_caret(1).unwrap();
    assert!(editor.reveal().is_some());

    editor.select(Selection::new(0, 3)).unwrap();
    assert!(editor.reveal().is_none());
    assert_eq!(editor.document().text(), "word");
    assert_eq!(editor.document().selection(), Selection::new(0, 1));
}

#[test]
fn test_blur_collapses() {
    let mut editor = FidelityEditor::from_markdown("a *b* c");
    editor.move_caret(3).unwrap();
    assert_eq!(editor.document().text(), "a *b* c");
    editor.blur().unwrap();
    assert_snapshot!(state(&editor), @r#""a b c" [Italic 2..3] sel 3..3 reveal none"#);
}

#[test]
fn test_generic_delete_outside_reveal() {
    let mut editor = FidelityEditor::from_markdown("ab");
    editor.move_caret(0).unwrap();
    assert_eq!(
        editor.handle_key(DeleteKey::Backspace).unwrap(),
        KeyOutcome::NotHandled
    );
    assert_eq!(
        editor.handle_key(DeleteKey::Delete).unwrap(),
        KeyOutcome::Handled
    );
    assert_eq!(editor.document().text(), "b");
}

#[test]
fn test_backspace_recovers_reveal_from_literal_closing_run() {
    let mut editor = styled_editor("**word**x", &[StyleAnnotation::bold(2..6)]);
    editor.move_caret(9).unwrap();
    assert!(editor.reveal().is_none());

    editor.handle_key(DeleteKey::Backspace).unwrap();
    assert_snapshot!(state(&editor), @r#""**word**" [Bold 2..6] sel 8..8 reveal Bold 0..8 2+2"#);

    editor.blur().unwrap();
    assert_snapshot!(state(&editor), @r#""word" [Bold 0..4] sel 4..4 reveal none"#);
}

#[test]
fn test_backspace_without_literal_opening_run_does_not_expand() {
    let mut editor = styled_editor("word**x", &[StyleAnnotation::bold(0..4)]);
    editor.move_caret(7).unwrap();

    editor.handle_key(DeleteKey::Backspace).unwrap();
    assert_snapshot!(state(&editor), @r#""word**" [Bold 0..4] sel 6..6 reveal none"#);
}

#[test]
fn test_caret_move_ignores_literal_closing_run() {
    // only deletions look right outside the caret
    let mut editor = styled_editor("**word**x", &[StyleAnnotation::bold(2..6)]);
    editor.move_caret(8).unwrap();
    assert_snapshot!(state(&editor), @r#""**word**x" [Bold 2..6] sel 8..8 reveal none"#);
}

#[test]
fn test_composition_inside_reveal() {
    let mut editor = FidelityEditor::from_markdown("**word**");
    editor.move_caret(2).unwrap();
    assert_eq!(editor.document().caret(), Some(4));

    editor.begin_composition().unwrap();
    editor.update_composition("e").unwrap();
    assert!(editor.document().is_composing());
    editor.end_composition(Some("é")).unwrap();
    assert!(!editor.document().is_composing());
    assert_snapshot!(state(&editor), @r#""**woérd**" [Bold 2..7] sel 5..5 reveal Bold 0..9 2+2"#);
}

#[test]
fn test_composition_does_not_fire_input_rule() {
    let mut editor = FidelityEditor::from_markdown("");
    type_chars(&mut editor, "*a*");
    editor.begin_composition().unwrap();
    editor.update_composition("x").unwrap();
    editor.end_composition(None).unwrap();
    assert_snapshot!(state(&editor), @r#""*a*x" [] sel 4..4 reveal none"#);
}

#[test]
fn test_search_and_replace() {
    let mut editor = FidelityEditor::from_markdown("The **cat** sat");
    assert_eq!(editor.search("at").unwrap(), Some(5..7));
    assert_eq!(editor.search_next().unwrap(), Some(9..11));
    assert_eq!(editor.search_next().unwrap(), Some(5..7));
    assert_eq!(editor.search_previous().unwrap(), Some(9..11));
    assert_eq!(editor.document().selection(), Selection::new(9, 11));

    assert_eq!(editor.search_source("at").unwrap(), vec![7..9, 13..15]);

    assert_eq!(editor.replace_all("at", "X").unwrap(), 2);
    assert_eq!(editor.to_markdown().unwrap(), "The **cX** sX");
    assert!(editor.search_index().is_none());
}

#[test]
fn test_search_rebuilds_after_edit() {
    let mut editor = FidelityEditor::from_markdown("ab ab");
    assert_eq!(editor.search("ab").unwrap(), Some(0..2));
    editor.move_caret(0).unwrap();
    editor.type_text("ab ").unwrap();
    // "ab ab ab": the index catches up with the new text
    assert_eq!(editor.search_next().unwrap(), Some(0..2));
    assert_eq!(editor.search_index().map(|i| i.len()), Some(3));
}

#[test]
fn test_replace_in_source_reloads() {
    let mut editor = FidelityEditor::from_markdown("The **cat** sat");
    assert_eq!(editor.replace_all_in_source("**", "_").unwrap(), 2);
    assert_snapshot!(state(&editor), @r#""The cat sat" [Italic 4..7] sel 0..0 reveal none"#);
}

#[test]
fn test_switch_views_maps_caret() {
    let mut editor = FidelityEditor::from_markdown("Hello **bold** world");
    editor.move_caret(10).unwrap();
    assert_eq!(editor.document().text(), "Hello **bold** world");

    let source = editor.switch_to_source().unwrap();
    assert_eq!(source.markdown, "Hello **bold** world");
    assert_eq!(source.caret.offset, 12);
    assert!(editor.reveal().is_none());

    let mapped = editor.load_from_source(&source.markdown, 17).unwrap();
    assert_eq!(mapped.offset, 13);
    assert_eq!(editor.document().caret(), Some(13));
}

#[test]
fn test_mapping_is_monotonic() {
    let markdown = "Hello **bold** world";
    let structured = "Hello bold world";
    let config = FidelityConfig::default();

    let mut last = 0;
    for offset in 0..=markdown.chars().count() {
        let mapped = map_position(
            Representation::Markdown,
            offset,
            structured,
            markdown,
            &config.mapping,
        );
        if offset < 3 {
            assert!(!mapped.is_anchored(), "offset {offset}");
            continue;
        }
        assert!(mapped.is_anchored(), "offset {offset}");
        assert!(mapped.offset >= last, "offset {offset} went backwards");
        last = mapped.offset;
    }
    assert_eq!(last, structured.len());
}

#[test]
fn test_suppression_window_blocks_then_expires() {
    let run = |config: FidelityConfig, wait: Duration| {
        let mut editor = FidelityEditor::with_config("**word** x", config);
        editor.move_caret(0).unwrap();
        editor.handle_key(DeleteKey::Backspace).unwrap();
        editor.move_caret(9).unwrap();
        assert_eq!(editor.document().text(), "word x");
        std::thread::sleep(wait);
        editor.move_caret(2).unwrap();
        editor
    };

    let editor = run(FidelityConfig::default(), Duration::ZERO);
    assert!(editor.reveal().is_none());

    let short = FidelityConfig {
        reveal: RevealConfig {
            suppress_window_ms: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    let editor = run(short, Duration::from_millis(20));
    assert_snapshot!(state(&editor), @r#""*word* x" [Italic 1..5] sel 3..3 reveal Italic 0..6 1+1"#);
}

#[test]
fn test_config_from_json() {
    let config: FidelityConfig = serde_json::from_str(
        r#"{"reveal": {"suppress_window_ms": 50}, "search": {"case_sensitive": true}}"#,
    )
    .unwrap();
    assert!(config.reveal.enabled);
    assert_eq!(config.reveal.suppress_window_ms, 50);
    assert_eq!(config.mapping, MappingConfig::default());
    assert!(config.search.case_sensitive);
}

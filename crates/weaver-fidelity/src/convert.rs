//! Markdown ⇄ structured content conversion.
//!
//! The engine only needs `parse`/`serialize` at view-switch boundaries.
//! `CmarkConverter` is a line-oriented reference implementation: block syntax
//! is kept as per-line prefixes, inline strong/emphasis become annotations,
//! everything else stays literal text.

use std::ops::Range;

use pulldown_cmark::{Event, Options, Parser, Tag};
use smol_str::SmolStr;

use crate::document::DocumentContent;
use crate::markup::{FenceTracker, code_spans, split_block_prefix};
use crate::syntax::canonical_marker;
use crate::types::{StyleAnnotation, StyleKind};

/// Two-way converter between markdown source and structured content.
pub trait MarkdownConverter {
    fn parse(&self, markdown: &str) -> DocumentContent;
    fn serialize(&self, content: &DocumentContent) -> String;
}

/// Reference converter built on pulldown-cmark.
#[derive(Debug, Clone, Copy, Default)]
pub struct CmarkConverter;

impl MarkdownConverter for CmarkConverter {
    fn parse(&self, markdown: &str) -> DocumentContent {
        let mut text = String::with_capacity(markdown.len());
        let mut annotations = Vec::new();
        let mut line_prefixes = Vec::new();
        let mut fences = FenceTracker::default();
        let mut offset = 0;

        for (idx, line) in markdown.split('\n').enumerate() {
            if idx > 0 {
                text.push('\n');
                offset += 1;
            }
            if fences.verbatim(line) {
                line_prefixes.push(SmolStr::default());
                text.push_str(line);
                offset += line.chars().count();
                continue;
            }

            let (prefix, content) = split_block_prefix(line);
            line_prefixes.push(SmolStr::new(prefix));
            let (plain, styles) = parse_inline(content);
            annotations.extend(styles.into_iter().map(|a| {
                StyleAnnotation::new(a.kind, a.range.start + offset..a.range.end + offset)
            }));
            offset += plain.chars().count();
            text.push_str(&plain);
        }

        DocumentContent {
            text,
            annotations,
            line_prefixes,
        }
    }

    fn serialize(&self, content: &DocumentContent) -> String {
        let mut out = String::with_capacity(content.text.len() + 16);
        let mut fences = FenceTracker::default();
        let mut line_start = 0;

        for (idx, line) in content.text.split('\n').enumerate() {
            if idx > 0 {
                out.push('\n');
            }
            let chars: Vec<char> = line.chars().collect();
            let line_range = line_start..line_start + chars.len();
            line_start = line_range.end + 1;

            let prefix = content
                .line_prefixes
                .get(idx)
                .map(SmolStr::as_str)
                .unwrap_or_default();
            if prefix.is_empty() && fences.verbatim(line) {
                out.push_str(line);
                continue;
            }
            out.push_str(prefix);

            let styles: Vec<StyleAnnotation> = content
                .annotations
                .iter()
                .filter_map(|a| line_relative(a, &line_range, &chars))
                .collect();
            out.push_str(&serialize_inline(&chars, &styles));
        }
        out
    }
}

/// Strip strong/emphasis delimiters and backslash escapes of ASCII
/// punctuation from one line of inline content. Returns the plain text and
/// annotations relative to it.
fn parse_inline(content: &str) -> (String, Vec<StyleAnnotation>) {
    let mut dropped: Vec<Range<usize>> = Vec::new();
    let mut code: Vec<Range<usize>> = Vec::new();
    let mut styles: Vec<(StyleKind, Range<usize>)> = Vec::new();

    for (event, range) in Parser::new_ext(content, Options::empty()).into_offset_iter() {
        let kind = match event {
            Event::Start(Tag::Strong) => StyleKind::Bold,
            Event::Start(Tag::Emphasis) => StyleKind::Italic,
            Event::Code(_) => {
                code.push(range);
                continue;
            }
            _ => continue,
        };
        let n = canonical_marker(kind).len();
        if range.len() < 2 * n {
            continue;
        }
        dropped.push(range.start..range.start + n);
        dropped.push(range.end - n..range.end);
        styles.push((kind, range.start + n..range.end - n));
    }

    let within = |ranges: &[Range<usize>], b: usize| ranges.iter().any(|r| r.contains(&b));

    // positions[b] = plain char offset of source byte b
    let mut positions = vec![0usize; content.len() + 1];
    let mut plain = String::with_capacity(content.len());
    let mut count = 0;
    let mut chars = content.char_indices().peekable();
    while let Some((b, c)) = chars.next() {
        positions[b] = count;
        if within(&dropped, b) {
            continue;
        }
        if c == '\\' && !within(&code, b) {
            if let Some(&(nb, nc)) = chars.peek() {
                if nc.is_ascii_punctuation() {
                    chars.next();
                    positions[nb] = count;
                    plain.push(nc);
                    count += 1;
                    continue;
                }
            }
        }
        plain.push(c);
        count += 1;
    }
    positions[content.len()] = count;

    let annotations = styles
        .into_iter()
        .map(|(kind, r)| StyleAnnotation::new(kind, positions[r.start]..positions[r.end]))
        .filter(|a| !a.is_empty())
        .collect();
    (plain, annotations)
}

/// Clip `ann` to a line and move edge whitespace outside it.
fn line_relative(
    ann: &StyleAnnotation,
    line: &Range<usize>,
    chars: &[char],
) -> Option<StyleAnnotation> {
    let mut start = ann.range.start.max(line.start) - line.start;
    let mut end = ann.range.end.min(line.end).saturating_sub(line.start);
    while start < end && chars[start].is_whitespace() {
        start += 1;
    }
    while end > start && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    (ann.range.start < line.end && line.start < ann.range.end && start < end)
        .then(|| StyleAnnotation::new(ann.kind, start..end))
}

/// Char offset to escape so a line starting with `chars` is not read as
/// block syntax.
fn block_lookalike_escape(chars: &[char]) -> Option<usize> {
    let line: String = chars.iter().collect();
    let (lookalike, _) = split_block_prefix(&line);
    lookalike.chars().position(|c| c.is_ascii_punctuation())
}

fn serialize_inline(chars: &[char], styles: &[StyleAnnotation]) -> String {
    let code = code_spans(chars);
    let block_escape = block_lookalike_escape(chars);
    let in_code = |i: usize| code.iter().any(|r| r.contains(&i));
    let has_marker_at = |p: usize| {
        styles
            .iter()
            .any(|a| a.range.start == p || a.range.end == p)
    };
    let word = |i: Option<&char>| i.is_some_and(|c| c.is_alphanumeric());

    let mut out = String::with_capacity(chars.len() + 8);
    for p in 0..=chars.len() {
        let mut closing: Vec<&StyleAnnotation> =
            styles.iter().filter(|a| a.range.end == p).collect();
        // innermost first
        closing.sort_by(|a, b| {
            b.range
                .start
                .cmp(&a.range.start)
                .then(b.kind.cmp(&a.kind))
        });
        for a in closing {
            out.push_str(canonical_marker(a.kind));
        }
        let mut opening: Vec<&StyleAnnotation> =
            styles.iter().filter(|a| a.range.start == p).collect();
        // outermost first, Bold outside Italic
        opening.sort_by(|a, b| b.range.end.cmp(&a.range.end).then(a.kind.cmp(&b.kind)));
        for a in opening {
            out.push_str(canonical_marker(a.kind));
        }

        let Some(&c) = chars.get(p) else { break };
        if in_code(p) {
            out.push(c);
            continue;
        }
        match c {
            '*' => out.push_str("\\*"),
            _ if block_escape == Some(p) => {
                out.push('\\');
                out.push(c);
            }
            '_' if !word(p.checked_sub(1).and_then(|i| chars.get(i))) || !word(chars.get(p + 1)) => {
                out.push_str("\\_")
            }
            '\\' if chars.get(p + 1).is_some_and(|n| n.is_ascii_punctuation())
                || has_marker_at(p + 1) =>
            {
                out.push_str("\\\\")
            }
            _ => out.push(c),
        }
    }
    out
}

//! Caret mapping between the structured text and its markdown serialization.
//!
//! Both sides are reduced to a plain rendering that keeps, per plain char,
//! the offset it came from. The last few plain chars before the caret are
//! used as an anchor key and looked up in the other side's rendering; the
//! occurrence closest to the proportional estimate wins. This is best-effort
//! and only runs at view switches and cross-view search.

use crate::config::MappingConfig;
use crate::markup::{FenceTracker, LINK_RE, code_spans, fence_marker, split_block_prefix};

/// Which text an offset refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Structured,
    Markdown,
}

/// Plain-text rendering of one representation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlainRendering {
    pub text: Vec<char>,
    /// Source char offset of each plain char.
    pub source_offsets: Vec<usize>,
    /// Length of the source in chars.
    pub source_len: usize,
}

impl PlainRendering {
    /// Strip fence lines, block prefixes, link syntax, emphasis markers and
    /// escapes from markdown source.
    pub fn from_markdown(markdown: &str) -> Self {
        let mut out = Self::default();
        let mut fences = FenceTracker::default();
        let mut line_start = 0;

        for (idx, line) in markdown.split('\n').enumerate() {
            let chars: Vec<char> = line.chars().collect();
            if idx > 0 {
                out.push('\n', line_start - 1);
            }
            if fences.verbatim(line) {
                if fence_marker(line).is_none() {
                    for (i, &c) in chars.iter().enumerate() {
                        out.push(c, line_start + i);
                    }
                }
                line_start += chars.len() + 1;
                continue;
            }

            let skip = split_block_prefix(line).0.chars().count();
            let mut keep = link_mask(line, &chars);
            keep[..skip].fill(false);
            let code = code_spans(&chars);
            let in_code = |i: usize| code.iter().any(|r| r.contains(&i));

            let mut i = skip;
            while i < chars.len() {
                let c = chars[i];
                if !keep[i] {
                    i += 1;
                    continue;
                }
                if in_code(i) {
                    out.push(c, line_start + i);
                    i += 1;
                    continue;
                }
                if c == '\\' && chars.get(i + 1).is_some_and(|n| n.is_ascii_punctuation()) {
                    out.push(chars[i + 1], line_start + i + 1);
                    i += 2;
                    continue;
                }
                let is_delimiter = c == '*'
                    || (c == '_'
                        && !(i > 0
                            && chars[i - 1].is_alphanumeric()
                            && chars.get(i + 1).is_some_and(|n| n.is_alphanumeric())));
                if !is_delimiter {
                    out.push(c, line_start + i);
                }
                i += 1;
            }
            line_start += chars.len() + 1;
        }
        out.source_len = markdown.chars().count();
        out
    }

    /// Strip link syntax from structured text.
    pub fn from_structured(text: &str) -> Self {
        let mut out = Self::default();
        let mut line_start = 0;
        for (idx, line) in text.split('\n').enumerate() {
            let chars: Vec<char> = line.chars().collect();
            if idx > 0 {
                out.push('\n', line_start - 1);
            }
            let keep = link_mask(line, &chars);
            for (i, &c) in chars.iter().enumerate() {
                if keep[i] {
                    out.push(c, line_start + i);
                }
            }
            line_start += chars.len() + 1;
        }
        out.source_len = text.chars().count();
        out
    }

    fn push(&mut self, c: char, source: usize) {
        self.text.push(c);
        self.source_offsets.push(source);
    }

    /// Number of plain chars that come from before `offset`.
    pub fn plain_before(&self, offset: usize) -> usize {
        self.source_offsets.partition_point(|&o| o < offset)
    }
}

/// Per-char keep mask with link syntax removed; link text is kept.
fn link_mask(line: &str, chars: &[char]) -> Vec<bool> {
    let mut keep = vec![true; chars.len()];
    let byte_to_char = |b: usize| line[..b].chars().count();
    for caps in LINK_RE.captures_iter(line) {
        let (Some(full), Some(label)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let (fs, fe) = (byte_to_char(full.start()), byte_to_char(full.end()));
        let (ls, le) = (byte_to_char(label.start()), byte_to_char(label.end()));
        for (i, k) in keep.iter_mut().enumerate().take(fe).skip(fs) {
            *k = (ls..le).contains(&i);
        }
    }
    keep
}

/// The anchor a mapped position was found through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorMatch {
    /// Length of the key that matched.
    pub key_len: usize,
    /// Number of occurrences of that key in the target rendering.
    pub candidates: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedPosition {
    pub offset: usize,
    /// None when no key matched and the offset fell back to the start.
    pub anchor: Option<AnchorMatch>,
}

impl MappedPosition {
    pub const UNANCHORED: MappedPosition = MappedPosition {
        offset: 0,
        anchor: None,
    };

    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }
}

/// Map `offset` in the `from` representation to the other one.
pub fn map_position(
    from: Representation,
    offset: usize,
    structured: &str,
    markdown: &str,
    config: &MappingConfig,
) -> MappedPosition {
    let (a, b) = match from {
        Representation::Structured => (
            PlainRendering::from_structured(structured),
            PlainRendering::from_markdown(markdown),
        ),
        Representation::Markdown => (
            PlainRendering::from_markdown(markdown),
            PlainRendering::from_structured(structured),
        ),
    };
    map_between(&a, &b, offset, config)
}

/// Map between two prepared renderings.
pub fn map_between(
    from: &PlainRendering,
    to: &PlainRendering,
    offset: usize,
    config: &MappingConfig,
) -> MappedPosition {
    let k = from.plain_before(offset);
    let estimate = if from.source_len == 0 {
        0.0
    } else {
        offset as f64 / from.source_len as f64 * to.source_len as f64
    };

    let min = config.min_key_len.max(1);
    let max = config.max_key_len.min(k);
    for len in (min..=max).rev() {
        let key = &from.text[k - len..k];
        let mut best: Option<(f64, usize)> = None;
        let mut candidates = 0;
        for (start, window) in to.text.windows(len).enumerate() {
            if window != key {
                continue;
            }
            candidates += 1;
            let end = to.source_offsets[start + len - 1] + 1;
            let distance = (end as f64 - estimate).abs();
            if best.is_none_or(|(d, _)| distance < d) {
                best = Some((distance, end));
            }
        }
        if let Some((_, end)) = best {
            tracing::trace!(offset, key_len = len, candidates, mapped = end, "anchored caret");
            return MappedPosition {
                offset: end,
                anchor: Some(AnchorMatch {
                    key_len: len,
                    candidates,
                }),
            };
        }
    }
    tracing::trace!(offset, "no anchor found, mapping to start");
    MappedPosition::UNANCHORED
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(md: &str) -> String {
        PlainRendering::from_markdown(md).text.into_iter().collect()
    }

    #[test]
    fn test_markdown_rendering_strips_markup() {
        assert_eq!(render("# Hello **bold** world"), "Hello bold world");
        assert_eq!(render("- see [docs](http://x) \\* _it_"), "see docs * it");
        assert_eq!(render("```\ncode *x*\n```\nafter"), "\ncode *x*\n\nafter");
        assert_eq!(render("snake_case `a*b`"), "snake_case `a*b`");
    }

    #[test]
    fn test_source_offsets_point_into_markdown() {
        let r = PlainRendering::from_markdown("a **b**");
        assert_eq!(r.text, vec!['a', ' ', 'b']);
        assert_eq!(r.source_offsets, vec![0, 1, 4]);
        assert_eq!(r.source_len, 7);
    }

    #[test]
    fn test_structured_to_markdown() {
        let cfg = MappingConfig::default();
        // caret after "bold" in the structured view
        let mapped = map_position(
            Representation::Structured,
            10,
            "Hello bold world",
            "Hello **bold** world",
            &cfg,
        );
        assert_eq!(mapped.offset, 12);
        assert_eq!(mapped.anchor.map(|a| a.key_len), Some(10));
    }

    #[test]
    fn test_markdown_to_structured() {
        let cfg = MappingConfig::default();
        let mapped = map_position(
            Representation::Markdown,
            20,
            "Title\nHello bold world",
            "# Title\nHello **bold** world",
            &cfg,
        );
        // after "Hello **bold" in markdown → after "Hello bold"
        assert_eq!(mapped.offset, 16);
        assert!(mapped.is_anchored());
    }

    #[test]
    fn test_short_prefix_is_unanchored() {
        let cfg = MappingConfig::default();
        let mapped = map_position(Representation::Structured, 2, "Hello", "Hello", &cfg);
        assert_eq!(mapped, MappedPosition::UNANCHORED);
    }

    #[test]
    fn test_closest_occurrence_wins() {
        let cfg = MappingConfig {
            max_key_len: 3,
            min_key_len: 3,
        };
        let text = "abc xyz abc xyz abc";
        let mapped = map_position(Representation::Structured, 19, text, text, &cfg);
        assert_eq!(mapped.offset, 19);
        assert_eq!(mapped.anchor.map(|a| a.candidates), Some(3));
        let mapped = map_position(Representation::Structured, 3, text, text, &cfg);
        assert_eq!(mapped.offset, 3);
    }
}

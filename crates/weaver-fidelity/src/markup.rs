//! Line-level markdown helpers shared by the converter and the position mapper.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// Block syntax at the start of a line: indentation, ATX heading hashes,
/// bullets, ordered list numbers and quote markers, possibly nested.
pub static BLOCK_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[ \t]*(?:#{1,6}(?:[ \t]+|$)|[-*+](?:[ \t]+|$)|\d{1,9}[.)](?:[ \t]+|$)|>[ \t]?))*[ \t]*")
        .unwrap()
});

/// Inline link or image: `[text](dest)` / `![alt](dest)`.
pub static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[([^\]\n]*)\]\([^)\n]*\)").unwrap());

/// Split a line into its block prefix and the inline content after it.
pub fn split_block_prefix(line: &str) -> (&str, &str) {
    let end = BLOCK_PREFIX_RE.find(line).map(|m| m.end()).unwrap_or(0);
    line.split_at(end)
}

/// The fence string if `line` opens or closes a fenced code block.
pub fn fence_marker(line: &str) -> Option<&str> {
    let trimmed = line.trim_start_matches([' ', '\t']);
    let c = trimmed.chars().next()?;
    if c != '`' && c != '~' {
        return None;
    }
    let run = trimmed.chars().take_while(|&x| x == c).count();
    (run >= 3).then(|| &trimmed[..run])
}

/// Tracks whether consecutive lines are inside a fenced code block.
#[derive(Debug, Default)]
pub struct FenceTracker {
    open: Option<String>,
}

impl FenceTracker {
    /// Feed the next line. Returns true if the line is verbatim code,
    /// including the fence lines themselves.
    pub fn verbatim(&mut self, line: &str) -> bool {
        match (&self.open, fence_marker(line)) {
            (Some(open), Some(fence)) => {
                if fence.starts_with(open.as_str()) {
                    self.open = None;
                }
                true
            }
            (Some(_), None) => true,
            (None, Some(fence)) => {
                self.open = Some(fence.to_string());
                true
            }
            (None, None) => false,
        }
    }
}

/// Char ranges of inline code spans, backticks included.
///
/// A span opens with a run of n backticks and closes at the next run of
/// exactly n. An unmatched run is literal text.
pub fn code_spans(chars: &[char]) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '`' {
            i += 1;
            continue;
        }
        let open = run_len(chars, i);
        let mut j = i + open;
        let mut close = None;
        while j < chars.len() {
            if chars[j] == '`' {
                let n = run_len(chars, j);
                if n == open {
                    close = Some(j + n);
                    break;
                }
                j += n;
            } else {
                j += 1;
            }
        }
        match close {
            Some(end) => {
                spans.push(i..end);
                i = end;
            }
            None => i += open,
        }
    }
    spans
}

fn run_len(chars: &[char], at: usize) -> usize {
    chars[at..].iter().take_while(|&&c| c == chars[at]).count()
}

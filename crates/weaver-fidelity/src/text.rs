//! Text buffer abstraction for document storage.
//!
//! The `TextBuffer` trait provides a common interface for text storage, so
//! the document model can sit on top of different backends. `EditorRope` is
//! the ropey-backed default.

use smol_str::{SmolStr, ToSmolStr};
use std::ops::Range;

/// A char-addressed text buffer.
///
/// All offsets are in Unicode scalar values (chars), not bytes or UTF-16.
pub trait TextBuffer {
    /// Total length in chars (Unicode scalar values).
    fn len_chars(&self) -> usize;

    /// Check if empty.
    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Insert text at char offset.
    fn insert(&mut self, char_offset: usize, text: &str);

    /// Delete char range.
    fn delete(&mut self, char_range: Range<usize>);

    /// Get a slice as SmolStr. Returns None if range is invalid.
    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr>;

    /// Get character at offset. Returns None if out of bounds.
    fn char_at(&self, char_offset: usize) -> Option<char>;

    /// Convert entire buffer to String.
    fn to_string(&self) -> String;

    /// Line index (0-based) of the line containing `char_offset`.
    fn char_to_line(&self, char_offset: usize) -> usize {
        self.slice(0..char_offset.min(self.len_chars()))
            .map(|s| s.matches('\n').count())
            .unwrap_or(0)
    }

    /// Char offset where line `line_idx` starts. Past the last line, the
    /// buffer length.
    fn line_to_char(&self, line_idx: usize) -> usize {
        if line_idx == 0 {
            return 0;
        }
        let text = self.to_string();
        text.match_indices('\n')
            .nth(line_idx - 1)
            .map(|(b, _)| text[..b].chars().count() + 1)
            .unwrap_or_else(|| self.len_chars())
    }

    /// Number of newlines inside `char_range`.
    fn count_newlines(&self, char_range: Range<usize>) -> usize {
        self.slice(char_range)
            .map(|s| s.matches('\n').count())
            .unwrap_or(0)
    }
}

/// Ropey-backed text buffer.
///
/// Provides O(log n) editing and char access.
#[derive(Clone, Debug, Default)]
pub struct EditorRope {
    rope: ropey::Rope,
}

impl EditorRope {
    /// Create a new empty rope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from string.
    pub fn from_str(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }

    /// Get a reference to the underlying rope (for advanced operations).
    pub fn rope(&self) -> &ropey::Rope {
        &self.rope
    }
}

impl TextBuffer for EditorRope {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        self.rope.insert(char_offset, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        self.rope.remove(char_range);
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        if char_range.start > char_range.end || char_range.end > self.len_chars() {
            return None;
        }
        Some(self.rope.slice(char_range).to_smolstr())
    }

    fn char_at(&self, char_offset: usize) -> Option<char> {
        if char_offset >= self.len_chars() {
            return None;
        }
        Some(self.rope.char(char_offset))
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }

    fn char_to_line(&self, char_offset: usize) -> usize {
        self.rope.char_to_line(char_offset.min(self.rope.len_chars()))
    }

    fn line_to_char(&self, line_idx: usize) -> usize {
        if line_idx > self.rope.len_lines() {
            return self.rope.len_chars();
        }
        self.rope.line_to_char(line_idx)
    }

    fn count_newlines(&self, char_range: Range<usize>) -> usize {
        if char_range.start > char_range.end || char_range.end > self.rope.len_chars() {
            return 0;
        }
        self.rope
            .slice(char_range)
            .chars()
            .filter(|c| *c == '\n')
            .count()
    }
}

impl From<&str> for EditorRope {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for EditorRope {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}

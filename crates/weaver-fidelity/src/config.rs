//! Engine tunables.

use serde::Deserialize;

use crate::search::SearchOptions;

/// Default suppression window after the user deletes a delimiter char.
pub const DEFAULT_SUPPRESS_WINDOW_MS: u64 = 220;
pub const DEFAULT_MAX_KEY_LEN: usize = 30;
pub const DEFAULT_MIN_KEY_LEN: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FidelityConfig {
    pub reveal: RevealConfig,
    pub mapping: MappingConfig,
    pub search: SearchOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Reveal delimiters when the caret touches a styled span.
    pub enabled: bool,
    /// How long automatic expansion stays off after a delimiter char was
    /// deleted by the user.
    pub suppress_window_ms: u64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            suppress_window_ms: DEFAULT_SUPPRESS_WINDOW_MS,
        }
    }
}

impl RevealConfig {
    pub fn suppress_window(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.suppress_window_ms)
    }
}

/// Anchor key lengths for position mapping, in plain-text chars.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub max_key_len: usize,
    pub min_key_len: usize,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            max_key_len: DEFAULT_MAX_KEY_LEN,
            min_key_len: DEFAULT_MIN_KEY_LEN,
        }
    }
}

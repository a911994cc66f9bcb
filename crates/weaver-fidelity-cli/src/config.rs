//! KDL config file loading.
//!
//! ```kdl
//! reveal-enabled true
//! reveal-suppress-ms 220
//! mapping-max-key 30
//! mapping-min-key 3
//! case-sensitive false
//! ```
//!
//! Every node is optional; missing nodes keep their defaults.

use std::path::{Path, PathBuf};

use kdl::{KdlDocument, KdlValue};
use miette::{IntoDiagnostic, Result, WrapErr};
use weaver_fidelity::FidelityConfig;

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("weaver-fidelity").join("config.kdl"))
}

/// Load `path`, or the default config file if it exists, or defaults.
pub fn load(path: Option<&Path>) -> Result<FidelityConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                tracing::debug!("no config file, using defaults");
                return Ok(FidelityConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    let config = parse(&content).wrap_err_with(|| format!("in config {}", path.display()))?;
    tracing::debug!(path = %path.display(), ?config, "loaded config");
    Ok(config)
}

pub fn parse(content: &str) -> Result<FidelityConfig> {
    let doc: KdlDocument = content.parse().into_diagnostic()?;
    let mut config = FidelityConfig::default();

    if let Some(v) = value(&doc, "reveal-enabled") {
        config.reveal.enabled = as_bool(v, "reveal-enabled")?;
    }
    if let Some(v) = value(&doc, "reveal-suppress-ms") {
        config.reveal.suppress_window_ms = as_count(v, "reveal-suppress-ms")? as u64;
    }
    if let Some(v) = value(&doc, "mapping-max-key") {
        config.mapping.max_key_len = as_count(v, "mapping-max-key")?;
    }
    if let Some(v) = value(&doc, "mapping-min-key") {
        config.mapping.min_key_len = as_count(v, "mapping-min-key")?;
    }
    if let Some(v) = value(&doc, "case-sensitive") {
        config.search.case_sensitive = as_bool(v, "case-sensitive")?;
    }

    if config.mapping.min_key_len > config.mapping.max_key_len {
        return Err(miette::miette!(
            "mapping-min-key ({}) is larger than mapping-max-key ({})",
            config.mapping.min_key_len,
            config.mapping.max_key_len
        ));
    }
    Ok(config)
}

fn value<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlValue> {
    Some(doc.get(name)?.entries().first()?.value())
}

fn as_bool(v: &KdlValue, name: &str) -> Result<bool> {
    v.as_bool()
        .ok_or_else(|| miette::miette!("{name} expects a boolean, got {v}"))
}

fn as_count(v: &KdlValue, name: &str) -> Result<usize> {
    v.as_i64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| miette::miette!("{name} expects a non-negative integer, got {v}"))
}

//! Tuning files on disk.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use bomberland_core::Tuning;

/// Reads `path` as TOML over the default tuning, or returns the defaults
/// when no path is given. Keys missing from the file keep their defaults.
pub(crate) fn load_tuning(path: Option<&Path>) -> Result<Tuning> {
    let Some(path) = path else {
        return Ok(Tuning::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read tuning file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid tuning file {}", path.display()))
}

/// Renders `tuning` as a TOML document `load_tuning` accepts.
pub(crate) fn render_tuning(tuning: &Tuning) -> Result<String> {
    toml::to_string_pretty(tuning).context("failed to render tuning as TOML")
}

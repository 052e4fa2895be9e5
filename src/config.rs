//! Processing defaults and optional `tintype.toml` overrides.
//!
//! Every knob has a compiled-in default; a config file only needs the keys it
//! wants to change. Values are validated and clamped on load so the rest of
//! the pipeline can trust them — nothing downstream re-checks bounds.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Target canvas width in pixels (3:4 portrait).
pub const TARGET_WIDTH: u32 = 600;
/// Target canvas height in pixels (3:4 portrait).
pub const TARGET_HEIGHT: u32 = 800;

pub const DEFAULT_FONT_SIZE: u32 = 24;
pub const MIN_FONT_SIZE: u32 = 8;
pub const MAX_FONT_SIZE: u32 = 120;
pub const DEFAULT_FONT_FAMILY: &str = "Arial, sans-serif";

/// Fallback caption color when no render has picked one yet.
pub const DEFAULT_TEXT_COLOR: &str = "#FFFFFF";

/// Quiet period before a caption edit triggers a re-render.
pub const DEBOUNCE_MS: u64 = 300;

/// Per-file intake ceiling. Larger files become failed items without ever
/// reaching the decoder.
pub const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Runtime configuration for a processing session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Output canvas width in pixels.
    pub target_width: u32,
    /// Output canvas height in pixels.
    pub target_height: u32,
    /// Default caption font size in pixels.
    pub font_size: u32,
    /// Recorded font family for captions.
    pub font_family: String,
    /// Caption-edit debounce in milliseconds.
    pub debounce_ms: u64,
    /// Per-file intake ceiling in bytes.
    pub max_file_bytes: u64,
    /// Apply the smoothing pass by default.
    pub smoothing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_width: TARGET_WIDTH,
            target_height: TARGET_HEIGHT,
            font_size: DEFAULT_FONT_SIZE,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            debounce_ms: DEBOUNCE_MS,
            max_file_bytes: MAX_FILE_BYTES,
            smoothing: false,
        }
    }
}

impl Config {
    /// Load a config file, falling back to defaults for absent keys.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()
    }

    /// Validate dimensions and clamp the font size into its legal range.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err(ConfigError::Invalid(
                "target dimensions must be non-zero".to_string(),
            ));
        }
        if self.max_file_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_file_bytes must be non-zero".to_string(),
            ));
        }
        self.font_size = self.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        Ok(self)
    }
}

/// A documented stock config, printed by `tintype gen-config`.
pub fn stock_config_toml() -> String {
    format!(
        "\
# tintype configuration. Every key is optional; absent keys use the
# compiled-in defaults shown here.

# Output canvas (pixels). All frames are center-cropped to this aspect
# ratio before resampling.
target_width = {TARGET_WIDTH}
target_height = {TARGET_HEIGHT}

# Caption defaults. font_size is clamped to [{MIN_FONT_SIZE}, {MAX_FONT_SIZE}].
font_size = {DEFAULT_FONT_SIZE}
font_family = \"{DEFAULT_FONT_FAMILY}\"

# Quiet period (ms) before caption edits trigger a re-render.
debounce_ms = {DEBOUNCE_MS}

# Per-file intake ceiling in bytes. Oversized files fail without decoding.
max_file_bytes = {MAX_FILE_BYTES}

# Apply the smoothing pass by default.
smoothing = false
"
    )
}

//! Shared types used across intake, session, and imaging.
//!
//! These types are the per-item record the session keeps and the caption
//! settings every overlay render receives a copy of. The session owns all
//! mutation; the imaging functions only ever see borrowed snapshots.

use crate::config::{DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, DEFAULT_TEXT_COLOR};
use serde::{Deserialize, Serialize};

/// Caption overlay settings for one item.
///
/// `color` always holds the color the most recent render actually used —
/// auto-detected or manual. It is derived, never edited directly; the session
/// writes it back after each render.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextSettings {
    pub is_active: bool,
    /// Pixels from canvas center; positive moves right. Clamped by the
    /// session to ± half the target width before being stored.
    pub x_offset: i32,
    /// Pixels from canvas center; positive moves down. Clamped by the
    /// session to ± half the target height before being stored.
    pub y_offset: i32,
    /// Effective color of the last render, hex `#RRGGBB`.
    pub color: String,
    pub font_size: u32,
    pub font_family: String,
    /// `Some("#000000")` / `Some("#FFFFFF")` forces that color; `None` means
    /// auto-detect from background brightness.
    pub manual_color_override: Option<String>,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            is_active: false,
            x_offset: 0,
            y_offset: 0,
            color: DEFAULT_TEXT_COLOR.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            manual_color_override: None,
        }
    }
}

/// Where an item is in the reading → normalizing → overlay pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// Intake is still reading the source bytes.
    Reading,
    /// Source bytes are in memory; waiting for a processing trigger.
    ReadyToConfigure,
    Normalizing,
    OverlayRendering,
    /// Normalized (and, if requested, captioned) output is available.
    Complete,
    Failed,
}

impl Status {
    /// A stage is running right now.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            Status::Reading | Status::Normalizing | Status::OverlayRendering
        )
    }
}

/// One image in the session: source bytes, derived outputs, caption state.
///
/// `normalized` is written once per successful normalization and never
/// touched by the overlay stage; `with_text` is rebuilt in full on every
/// render and cleared when the overlay is deactivated.
#[derive(Debug, Clone)]
pub struct ImageItem {
    pub id: String,
    /// Original filename, used for output naming.
    pub name: String,
    /// Encoded source bytes as read by intake.
    pub original: Vec<u8>,
    /// Encoded normalized frame (PNG), present once normalization succeeds.
    pub normalized: Option<Vec<u8>>,
    /// Encoded frame with caption (PNG), rebuilt on every overlay render.
    pub with_text: Option<Vec<u8>>,
    pub smoothing: bool,
    pub overlay_text: String,
    pub settings: TextSettings,
    pub status: Status,
    pub error: Option<String>,
}

impl ImageItem {
    pub fn new(id: String, name: String, original: Vec<u8>) -> Self {
        Self {
            id,
            name,
            original,
            normalized: None,
            with_text: None,
            smoothing: false,
            overlay_text: String::new(),
            settings: TextSettings::default(),
            status: Status::ReadyToConfigure,
            error: None,
        }
    }

    /// A failed record that never reached (or survived) a pipeline stage.
    pub fn failed(id: String, name: String, message: String) -> Self {
        Self {
            status: Status::Failed,
            error: Some(message),
            ..Self::new(id, name, Vec::new())
        }
    }

    /// The bytes a download of this item would serve: the captioned frame
    /// when the overlay is active and rendered, otherwise the plain
    /// normalized frame.
    pub fn download_bytes(&self) -> Option<&[u8]> {
        if self.settings.is_active {
            if let Some(with_text) = self.with_text.as_deref() {
                return Some(with_text);
            }
        }
        self.normalized.as_deref()
    }

    /// Whether the download would carry the caption overlay.
    pub fn download_has_overlay(&self) -> bool {
        self.settings.is_active && self.with_text.is_some()
    }
}

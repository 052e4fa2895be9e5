//! The per-session item store and processing state machine.
//!
//! The session owns the only mutable registry of items. Core imaging calls
//! never see it — they receive cloned bytes and settings, return new values,
//! and the session merges the result back (or discards it, if the item went
//! away while the work was in flight).
//!
//! # Scheduling rules
//!
//! - **Normalization** runs at most once per item at a time (an item is
//!   claimed by flipping it to `Normalizing`) and at most once system-wide
//!   (a single-permit semaphore), in batch and manual mode alike.
//! - **Overlay renders** are debounced per item: every caption edit replaces
//!   the item's single-shot timer, so a burst of edits produces one render
//!   with the last-issued settings. A render is single-flight per item; an
//!   edit that fires while one is running restarts the debounce instead of
//!   stacking a second render.
//! - **Removal** cancels the pending timer. Results of work already in
//!   flight are discarded on arrival when the item is gone or its overlay
//!   was deactivated in the interim; an overlay failure never clears the
//!   last good normalized frame.

use crate::config::{Config, MAX_FONT_SIZE, MIN_FONT_SIZE};
use crate::imaging::{self, BLACK, NormalizeOptions, WHITE, clamp_offset};
use crate::intake::SourceFile;
use crate::naming;
use crate::types::{ImageItem, Status};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle to a session. Cheap to clone; all clones share the same store.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    items: Mutex<HashMap<String, ImageItem>>,
    /// Insertion order, for stable batch processing and reporting.
    order: Mutex<Vec<String>>,
    /// Pending debounce timers, one per item at most.
    timers: Mutex<HashMap<String, PendingRender>>,
    /// Items with an overlay render currently executing.
    rendering: Mutex<HashSet<String>>,
    /// Global one-at-a-time cap for normalization.
    normalize_gate: Semaphore,
    next_id: AtomicU64,
    timer_generation: AtomicU64,
    renders_completed: AtomicU64,
}

struct PendingRender {
    generation: u64,
    handle: JoinHandle<()>,
}

/// What the debounce timer found when it fired.
enum Claim {
    /// Item gone or no longer eligible; drop silently.
    Drop,
    /// A render for this item is still executing; restart the debounce.
    Busy,
    /// Claimed: render with this snapshot.
    Run {
        base: Vec<u8>,
        text: String,
        settings: crate::types::TextSettings,
    },
}

impl Session {
    /// Create a session. Must be called inside a tokio runtime — timers and
    /// renders are spawned onto it.
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                items: Mutex::new(HashMap::new()),
                order: Mutex::new(Vec::new()),
                timers: Mutex::new(HashMap::new()),
                rendering: Mutex::new(HashSet::new()),
                normalize_gate: Semaphore::new(1),
                next_id: AtomicU64::new(1),
                timer_generation: AtomicU64::new(1),
                renders_completed: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Overlay renders that ran to completion (applied or discarded).
    pub fn renders_completed(&self) -> u64 {
        self.inner.renders_completed.load(Ordering::Relaxed)
    }

    // =========================================================================
    // Intake
    // =========================================================================

    /// Register a source file. Rejected sources become failed records; good
    /// ones wait in `ReadyToConfigure` with the session's defaults applied.
    pub fn add_source(&self, source: SourceFile) -> String {
        let id = self.fresh_id(&source.name);
        let item = match source.bytes {
            Ok(bytes) => {
                let mut item = ImageItem::new(id.clone(), source.name, bytes);
                item.smoothing = self.inner.config.smoothing;
                item.settings.font_size = self.inner.config.font_size;
                item.settings.font_family = self.inner.config.font_family.clone();
                item
            }
            Err(message) => {
                warn!(name = %source.name, %message, "intake rejected");
                ImageItem::failed(id.clone(), source.name, message)
            }
        };
        self.insert(item);
        id
    }

    /// Register a file by path, reading it off the blocking pool. The item
    /// is visible in `Reading` state while the bytes load.
    pub async fn add_path(&self, path: std::path::PathBuf) -> String {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let id = self.fresh_id(&name);

        let mut placeholder = ImageItem::new(id.clone(), name, Vec::new());
        placeholder.status = Status::Reading;
        self.insert(placeholder);

        let max_bytes = self.inner.config.max_file_bytes;
        let loaded = tokio::task::spawn_blocking(move || crate::intake::load_file(&path, max_bytes))
            .await
            .map(|source| source.bytes)
            .unwrap_or_else(|e| Err(format!("Error reading file: {e}")));

        let mut items = self.inner.items.lock().unwrap();
        if let Some(item) = items.get_mut(&id) {
            match loaded {
                Ok(bytes) => {
                    item.original = bytes;
                    item.smoothing = self.inner.config.smoothing;
                    item.settings.font_size = self.inner.config.font_size;
                    item.settings.font_family = self.inner.config.font_family.clone();
                    item.status = Status::ReadyToConfigure;
                }
                Err(message) => {
                    item.status = Status::Failed;
                    item.error = Some(message);
                }
            }
        }
        id
    }

    fn fresh_id(&self, name: &str) -> String {
        let n = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{name}-{n}")
    }

    fn insert(&self, item: ImageItem) {
        let id = item.id.clone();
        self.inner.items.lock().unwrap().insert(id.clone(), item);
        self.inner.order.lock().unwrap().push(id);
    }

    // =========================================================================
    // Store access
    // =========================================================================

    /// Snapshot of one item.
    pub fn item(&self, id: &str) -> Option<ImageItem> {
        self.inner.items.lock().unwrap().get(id).cloned()
    }

    /// Snapshot of all items in insertion order.
    pub fn items(&self) -> Vec<ImageItem> {
        let items = self.inner.items.lock().unwrap();
        let order = self.inner.order.lock().unwrap();
        order.iter().filter_map(|id| items.get(id).cloned()).collect()
    }

    /// Remove an item: its pending debounce dies now, and any in-flight
    /// result for it is discarded on arrival.
    pub fn remove(&self, id: &str) {
        if let Some(pending) = self.inner.timers.lock().unwrap().remove(id) {
            pending.handle.abort();
        }
        self.inner.items.lock().unwrap().remove(id);
        self.inner.order.lock().unwrap().retain(|other| other != id);
        debug!(%id, "item removed");
    }

    // =========================================================================
    // Per-item configuration
    // =========================================================================

    pub fn set_smoothing(&self, id: &str, enabled: bool) {
        let mut items = self.inner.items.lock().unwrap();
        if let Some(item) = items.get_mut(id) {
            item.smoothing = enabled;
        }
    }

    pub fn set_overlay_text(&self, id: &str, text: impl Into<String>) {
        {
            let mut items = self.inner.items.lock().unwrap();
            let Some(item) = items.get_mut(id) else { return };
            item.overlay_text = text.into();
        }
        self.maybe_schedule(id);
    }

    /// Toggle the overlay. Deactivating clears the captioned frame.
    pub fn set_overlay_active(&self, id: &str, active: bool) {
        {
            let mut items = self.inner.items.lock().unwrap();
            let Some(item) = items.get_mut(id) else { return };
            item.settings.is_active = active;
            if !active {
                item.with_text = None;
            }
        }
        if active {
            self.maybe_schedule(id);
        }
    }

    /// Caption offsets, clamped to ± half the canvas on each axis.
    pub fn set_offsets(&self, id: &str, x_offset: i32, y_offset: i32) {
        {
            let mut items = self.inner.items.lock().unwrap();
            let Some(item) = items.get_mut(id) else { return };
            item.settings.x_offset = clamp_offset(x_offset, self.inner.config.target_width);
            item.settings.y_offset = clamp_offset(y_offset, self.inner.config.target_height);
        }
        self.maybe_schedule(id);
    }

    pub fn set_font_size(&self, id: &str, font_size: u32) {
        {
            let mut items = self.inner.items.lock().unwrap();
            let Some(item) = items.get_mut(id) else { return };
            item.settings.font_size = font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        }
        self.maybe_schedule(id);
    }

    pub fn set_font_family(&self, id: &str, family: impl Into<String>) {
        {
            let mut items = self.inner.items.lock().unwrap();
            let Some(item) = items.get_mut(id) else { return };
            item.settings.font_family = family.into();
        }
        self.maybe_schedule(id);
    }

    /// Force black/white caption color, or `None` to return to auto-detect.
    /// Anything that is not one of the two legal colors is ignored.
    pub fn set_manual_color(&self, id: &str, color: Option<&str>) {
        let normalized = match color {
            None => None,
            Some(c) if c.eq_ignore_ascii_case(BLACK) => Some(BLACK.to_string()),
            Some(c) if c.eq_ignore_ascii_case(WHITE) => Some(WHITE.to_string()),
            Some(other) => {
                warn!(%id, color = %other, "ignoring unsupported manual color");
                return;
            }
        };
        {
            let mut items = self.inner.items.lock().unwrap();
            let Some(item) = items.get_mut(id) else { return };
            item.settings.manual_color_override = normalized;
        }
        self.maybe_schedule(id);
    }

    // =========================================================================
    // Normalization
    // =========================================================================

    /// Normalize one item: `ReadyToConfigure` → `Normalizing` →
    /// `Complete`/`Failed`. Waits its turn behind the global cap. A no-op
    /// for items in any other state.
    pub async fn process(&self, id: &str) {
        {
            let mut items = self.inner.items.lock().unwrap();
            let Some(item) = items.get_mut(id) else { return };
            if item.status != Status::ReadyToConfigure || item.original.is_empty() {
                return;
            }
            item.status = Status::Normalizing;
            item.error = None;
        }

        // Semaphore is never closed, so acquire cannot fail.
        let permit = self.inner.normalize_gate.acquire().await.unwrap();

        let snapshot = {
            let items = self.inner.items.lock().unwrap();
            items.get(id).map(|item| {
                (
                    item.original.clone(),
                    NormalizeOptions::from_config(&self.inner.config, item.smoothing),
                )
            })
        };
        let Some((bytes, opts)) = snapshot else {
            // Removed while queued.
            drop(permit);
            return;
        };

        debug!(%id, "normalizing");
        let result = tokio::task::spawn_blocking(move || imaging::normalize(&bytes, &opts)).await;
        drop(permit);

        let mut schedule = false;
        {
            let mut items = self.inner.items.lock().unwrap();
            let Some(item) = items.get_mut(id) else {
                debug!(%id, "normalization result discarded, item removed");
                return;
            };
            match result {
                Ok(Ok(png)) => {
                    item.normalized = Some(png);
                    item.status = Status::Complete;
                    item.error = None;
                    schedule = item.settings.is_active && !item.overlay_text.is_empty();
                    info!(%id, "normalized");
                }
                Ok(Err(e)) => {
                    item.status = Status::Failed;
                    item.error = Some(e.to_string());
                    warn!(%id, error = %e, "normalization failed");
                }
                Err(e) => {
                    item.status = Status::Failed;
                    item.error = Some(format!("Processing task failed: {e}"));
                    warn!(%id, error = %e, "normalization task panicked");
                }
            }
        }
        if schedule {
            self.schedule_render(id);
        }
    }

    /// Batch mode: normalize every pending item, one at a time, in insertion
    /// order. Returns when nothing is left pending; overlay renders spawned
    /// along the way keep running (see [`Session::flush_renders`]).
    pub async fn process_all(&self) {
        loop {
            let next = {
                let items = self.inner.items.lock().unwrap();
                let order = self.inner.order.lock().unwrap();
                order
                    .iter()
                    .find(|id| {
                        items.get(*id).is_some_and(|item| {
                            item.status == Status::ReadyToConfigure && !item.original.is_empty()
                        })
                    })
                    .cloned()
            };
            match next {
                Some(id) => self.process(&id).await,
                None => break,
            }
        }
    }

    // =========================================================================
    // Debounced overlay rendering
    // =========================================================================

    /// Schedule a render if the item can take one: normalized, overlay
    /// active, and either idle or mid-render (the fire-time check resolves
    /// the latter into a fresh quiet period). Called after every
    /// caption-affecting edit.
    fn maybe_schedule(&self, id: &str) {
        let eligible = {
            let items = self.inner.items.lock().unwrap();
            items.get(id).is_some_and(|item| {
                item.settings.is_active
                    && item.normalized.is_some()
                    && matches!(item.status, Status::Complete | Status::OverlayRendering)
            })
        };
        if eligible {
            self.schedule_render(id);
        }
    }

    /// (Re)start the item's single-shot debounce timer. Any previous pending
    /// timer for the item is cancelled — only the quiet period after the
    /// *last* edit fires.
    fn schedule_render(&self, id: &str) {
        let generation = self.inner.timer_generation.fetch_add(1, Ordering::Relaxed);
        let delay = Duration::from_millis(self.inner.config.debounce_ms);
        let session = self.clone();
        let task_id = id.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detached: a later reschedule or removal can cancel the sleep,
            // but never a render that already started. Stale wake-ups are
            // filtered by the generation check in fire_render.
            tokio::spawn(async move { session.fire_render(task_id, generation).await });
        });

        let mut timers = self.inner.timers.lock().unwrap();
        if let Some(previous) = timers.insert(id.to_string(), PendingRender { generation, handle }) {
            previous.handle.abort();
        }
    }

    async fn fire_render(&self, id: String, generation: u64) {
        // Claim under timers → items → rendering so there is no instant
        // where a render is pending but invisible to flush_renders.
        let claim = {
            let mut timers = self.inner.timers.lock().unwrap();
            if !timers.get(&id).is_some_and(|p| p.generation == generation) {
                // Superseded by a newer edit; its timer owns the render now.
                return;
            }
            let mut items = self.inner.items.lock().unwrap();
            let claim = match items.get_mut(&id) {
                None => Claim::Drop,
                Some(item) if !item.settings.is_active || item.normalized.is_none() => Claim::Drop,
                Some(item) if item.status == Status::OverlayRendering => Claim::Busy,
                Some(item) if item.status != Status::Complete => Claim::Drop,
                Some(item) => {
                    self.inner.rendering.lock().unwrap().insert(id.clone());
                    item.status = Status::OverlayRendering;
                    Claim::Run {
                        base: item.normalized.clone().unwrap(),
                        text: item.overlay_text.clone(),
                        settings: item.settings.clone(),
                    }
                }
            };
            timers.remove(&id);
            claim
        };

        let (base, text, settings) = match claim {
            Claim::Drop => return,
            Claim::Busy => {
                // A render is still executing; wait out a fresh quiet period.
                self.schedule_render(&id);
                return;
            }
            Claim::Run {
                base,
                text,
                settings,
            } => (base, text, settings),
        };

        let (width, height) = (self.inner.config.target_width, self.inner.config.target_height);
        debug!(%id, "rendering overlay");
        let result = tokio::task::spawn_blocking(move || {
            imaging::render_overlay(&base, &text, &settings, width, height)
        })
        .await;

        self.inner.renders_completed.fetch_add(1, Ordering::Relaxed);
        {
            let mut items = self.inner.items.lock().unwrap();
            match items.get_mut(&id) {
                None => debug!(%id, "overlay result discarded, item removed"),
                Some(item) if !item.settings.is_active => {
                    // Deactivated while in flight: drop the frame, leave the
                    // item usable.
                    if item.status == Status::OverlayRendering {
                        item.status = Status::Complete;
                    }
                    debug!(%id, "overlay result discarded, overlay deactivated");
                }
                Some(item) => match result {
                    Ok(Ok(overlay)) => {
                        item.with_text = Some(overlay.png);
                        item.settings.color = overlay.chosen_color;
                        item.status = Status::Complete;
                        item.error = None;
                        info!(%id, "overlay rendered");
                    }
                    Ok(Err(e)) => {
                        item.status = Status::Failed;
                        item.error = Some(format!("Text: {e}"));
                        warn!(%id, error = %e, "overlay failed");
                    }
                    Err(e) => {
                        item.status = Status::Failed;
                        item.error = Some(format!("Text: render task failed: {e}"));
                        warn!(%id, error = %e, "overlay task panicked");
                    }
                },
            }
        }
        self.inner.rendering.lock().unwrap().remove(&id);
    }

    /// Wait until no debounce timer is pending and no render is executing.
    pub async fn flush_renders(&self) {
        loop {
            let idle = self.inner.timers.lock().unwrap().is_empty()
                && self.inner.rendering.lock().unwrap().is_empty();
            if idle {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    // =========================================================================
    // Downloads
    // =========================================================================

    /// Downloadable artifacts for every completed item, in insertion order:
    /// `(filename, bytes)` pairs named by the stem + suffix convention.
    pub fn download_entries(&self) -> Vec<(String, Vec<u8>)> {
        self.items()
            .into_iter()
            .filter(|item| item.status == Status::Complete)
            .filter_map(|item| {
                let bytes = item.download_bytes()?.to_vec();
                let name = naming::download_name(&item.name, item.download_has_overlay());
                Some((name, bytes))
            })
            .collect()
    }
}

//! # Tintype
//!
//! A batch photo captioner. Every source image becomes a fixed-aspect
//! grayscale frame — center-cropped, resampled, desaturated, optionally
//! smoothed — with an optional multi-line caption composited in whichever
//! color contrasts with the background it lands on.
//!
//! # Architecture: Pure Core, One Store
//!
//! The pipeline per image:
//!
//! ```text
//! source bytes ─→ normalize ─→ grayscale PNG ─→ render_overlay ─→ captioned PNG
//!                 (crop, resample,               (layout, contrast pick,
//!                  desaturate, smooth)            composite, shadow)
//! ```
//!
//! Both core steps are pure functions from (bytes, parameters) to new bytes.
//! All mutable state lives in one place, the [`session::Session`] store; core
//! calls receive cloned inputs and the session merges results back — or
//! discards them when the item was removed or its overlay deactivated while
//! the work was in flight. This split exists for two reasons:
//!
//! - **Testability**: crop math, text layout, and brightness sampling are
//!   plain functions exercised without decoding a single image.
//! - **Cancellation without locks in the core**: the store decides what a
//!   finished result still means; pixel code never checks flags.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | The core: normalization, overlay rendering, and their pure math |
//! | [`session`] | Item store, per-item state machine, batch cap, debounced renders |
//! | [`intake`] | Reading sources with the size ceiling; directory walking |
//! | [`types`] | `ImageItem`, `TextSettings`, `Status` shared across stages |
//! | [`config`] | Defaults + optional `tintype.toml` overrides |
//! | [`naming`] | `<stem>_processed.png` / `<stem>_text_overlay.png` convention |
//! | [`output`] | Per-item result lines and `report.json` |
//!
//! # Design Decisions
//!
//! ## Bitmap Captions
//!
//! Captions render from a scaled 8×8 bitmap font rather than a shaping
//! engine. The metrics are exact integers, which the contrast sampler needs
//! (the sampled rectangle spans the widest line), output is deterministic
//! down to the byte, and the binary stays free of font discovery. The
//! requested font family is recorded with the item but does not select a
//! face.
//!
//! ## Contrast Before Ink
//!
//! The caption color is chosen by sampling the frame *before* any drawing:
//! mean brightness over the caption's bounding rectangle, strictly above
//! mid-gray → black text, otherwise white. Because frames are already
//! grayscale, one channel is the luminance and sampling is a plain read.
//! Black text additionally gets a one-pixel translucent under-strike so it
//! holds an edge on light, busy backgrounds.
//!
//! ## One Normalization at a Time
//!
//! Batch and manual processing share a single-permit gate: at most one
//! normalization runs at any moment, bounding peak memory on large sources.
//! Caption renders are debounced per item (a burst of edits produces one
//! render with the final settings) and single-flight per item.
//!
//! ## PNG-Only Output
//!
//! Decoders cover JPEG, PNG, TIFF, and WebP; every output is PNG. Frames
//! are grayscale with hard-edged caption ink — exactly the content PNG
//! compresses losslessly and predictably.

pub mod config;
pub mod imaging;
pub mod intake;
pub mod naming;
pub mod output;
pub mod session;
pub mod types;

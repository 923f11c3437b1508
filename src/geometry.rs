//! Viewport and clip-rectangle resolution
//!
//! Turns the partially specified geometry of a validated request into the
//! final viewport and optional clip rectangle used for capture. Resolution never
//! fails: an oversized clip is shrunk to fit the viewport, anchored at its origin.

use crate::config::{CaptureSettings, OutputFormat};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Browser viewport in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Viewport {
    /// Viewport width in pixels (default: 1920)
    pub width: u32,

    /// Viewport height in pixels (default: 1080)
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

/// Rectangle of the rendered page to capture, relative to the page origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Clip {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Clip {
    /// A clip whose origin lies on or past the viewport edge has no area left.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn fits_within(&self, viewport: &Viewport) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(viewport.width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(viewport.height)
    }
}

/// User-supplied geometry, each field optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometryInput {
    pub device_width: Option<u32>,
    pub device_height: Option<u32>,
    pub clip_x: Option<u32>,
    pub clip_y: Option<u32>,
    pub clip_width: Option<u32>,
    pub clip_height: Option<u32>,
}

impl GeometryInput {
    pub fn has_clip(&self) -> bool {
        self.clip_x.is_some()
            || self.clip_y.is_some()
            || self.clip_width.is_some()
            || self.clip_height.is_some()
    }
}

/// Fully resolved capture options, consumed once by the capturer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedOptions {
    pub format: OutputFormat,
    pub viewport: Viewport,
    pub delay: Duration,
    pub clip: Option<Clip>,
    /// Encoder quality, only sent for JPEG
    pub quality: Option<u8>,
}

impl ResolvedOptions {
    /// Full-page capture applies only when no clip was requested.
    pub fn full_page(&self) -> bool {
        self.clip.is_none()
    }
}

/// Derive the final viewport from the requested dimensions and the defaults.
pub fn resolve_viewport(input: &GeometryInput, default: Viewport) -> Viewport {
    Viewport {
        width: input.device_width.unwrap_or(default.width),
        height: input.device_height.unwrap_or(default.height),
    }
}

/// Derive the clip rectangle, if any clip field was supplied, clamped to `viewport`.
pub fn resolve_clip(input: &GeometryInput, viewport: Viewport) -> Option<Clip> {
    if !input.has_clip() {
        return None;
    }

    let x = input.clip_x.unwrap_or(0);
    let y = input.clip_y.unwrap_or(0);
    let width = input.clip_width.unwrap_or(viewport.width);
    let height = input.clip_height.unwrap_or(viewport.height);

    Some(Clip {
        x,
        y,
        width: width.min(viewport.width.saturating_sub(x)),
        height: height.min(viewport.height.saturating_sub(y)),
    })
}

/// Combine validated request fields with capture defaults.
pub fn resolve(
    input: &GeometryInput,
    format: Option<OutputFormat>,
    delay: Duration,
    defaults: &CaptureSettings,
) -> ResolvedOptions {
    let viewport = resolve_viewport(input, defaults.viewport);
    let format = format.unwrap_or(defaults.default_format);
    let quality = match format {
        OutputFormat::Jpeg => defaults.jpeg_quality,
        OutputFormat::Png => None,
    };

    ResolvedOptions {
        format,
        viewport,
        delay,
        clip: resolve_clip(input, viewport),
        quality,
    }
}

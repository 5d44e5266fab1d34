//! Configuration settings for a frame and its document pipeline.
//!
//! This module defines the viewport, scrollbar, autosizing and telemetry
//! settings a [`Document`](crate::document::Document) is created with.
//! Configuration can be loaded from environment variables or constructed
//! programmatically.

use anyhow::{Context as _, Result, anyhow};
use core::str::FromStr;
use layouter::IntSize;
use std::env;

/// Runtime configuration for one frame.
///
/// Controls the initial viewport, scrollbar geometry, the two autosizing
/// features and debugging output.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameConfig {
    /// Initial frame (viewport) size in px
    pub frame_size: IntSize,
    /// Thickness of a non-overlay scrollbar in px
    pub scrollbar_thickness: i32,
    /// Overlay scrollbars never take layout space
    pub overlay_scrollbars: bool,
    /// Whether text autosizing inflates narrow-column text
    pub text_autosizing_enabled: bool,
    /// Device width text autosizing measures clusters against
    pub text_autosizing_device_width: i32,
    /// Upper bound on the text autosizing multiplier
    pub text_autosizing_max_multiplier: f32,
    /// Whether the frame sizes itself to its content
    pub autosize_enabled: bool,
    /// Smallest size autosizing may choose
    pub autosize_min: IntSize,
    /// Largest size autosizing may choose; beyond it scrollbars appear
    pub autosize_max: IntSize,
    /// Whether to emit perf counters after every pump
    pub telemetry_enabled: bool,
    /// Nesting depth past which `document.write` is ignored
    pub max_write_recursion_depth: u32,
    /// Glyph advance as a fraction of the font size
    pub glyph_advance_ratio: f32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frame_size: IntSize::new(800, 600),
            scrollbar_thickness: 15,
            overlay_scrollbars: false,
            text_autosizing_enabled: false,
            text_autosizing_device_width: 320,
            text_autosizing_max_multiplier: 4.0,
            autosize_enabled: false,
            autosize_min: IntSize::new(0, 0),
            autosize_max: IntSize::new(800, 600),
            telemetry_enabled: false,
            max_write_recursion_depth: 21,
            glyph_advance_ratio: 0.5,
        }
    }
}

impl FrameConfig {
    /// Construct a configuration with explicit viewport settings and defaults
    /// for everything else.
    ///
    /// # Arguments
    ///
    /// * `frame_size` - Initial viewport size in px
    /// * `overlay_scrollbars` - Whether scrollbars overlay the content
    #[inline]
    #[must_use]
    pub fn new(frame_size: IntSize, overlay_scrollbars: bool) -> Self {
        Self {
            frame_size,
            overlay_scrollbars,
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `VALOR_FRAME_SIZE`: viewport as `WIDTHxHEIGHT` (default: 800x600)
    /// - `VALOR_SCROLLBAR_THICKNESS`: px (default: 15)
    /// - `VALOR_OVERLAY_SCROLLBARS`: set to "1" for overlay scrollbars
    /// - `VALOR_TEXT_AUTOSIZING`: set to "1" to enable text autosizing
    /// - `VALOR_TEXT_AUTOSIZING_DEVICE_WIDTH`: px (default: 320)
    /// - `VALOR_TEXT_AUTOSIZING_MAX`: maximum multiplier (default: 4.0)
    /// - `VALOR_AUTOSIZE`: set to "1" to enable frame autosizing
    /// - `VALOR_AUTOSIZE_MIN` / `VALOR_AUTOSIZE_MAX`: bounds as `WIDTHxHEIGHT`
    /// - `VALOR_TELEMETRY`: set to "1" to enable telemetry
    /// - `VALOR_MAX_WRITE_DEPTH`: write recursion limit (default: 21)
    /// - `VALOR_GLYPH_ADVANCE`: glyph advance ratio (default: 0.5)
    ///
    /// Malformed values fall back to the default with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let flag = |name: &str| env::var(name).ok().as_deref() == Some("1");
        Self {
            frame_size: env_size("VALOR_FRAME_SIZE").unwrap_or(defaults.frame_size),
            scrollbar_thickness: env_parsed("VALOR_SCROLLBAR_THICKNESS")
                .unwrap_or(defaults.scrollbar_thickness)
                .max(0),
            overlay_scrollbars: flag("VALOR_OVERLAY_SCROLLBARS"),
            text_autosizing_enabled: flag("VALOR_TEXT_AUTOSIZING"),
            text_autosizing_device_width: env_parsed("VALOR_TEXT_AUTOSIZING_DEVICE_WIDTH")
                .unwrap_or(defaults.text_autosizing_device_width)
                .max(1),
            text_autosizing_max_multiplier: env_parsed("VALOR_TEXT_AUTOSIZING_MAX")
                .unwrap_or(defaults.text_autosizing_max_multiplier)
                .max(1.0),
            autosize_enabled: flag("VALOR_AUTOSIZE"),
            autosize_min: env_size("VALOR_AUTOSIZE_MIN").unwrap_or(defaults.autosize_min),
            autosize_max: env_size("VALOR_AUTOSIZE_MAX").unwrap_or(defaults.autosize_max),
            telemetry_enabled: flag("VALOR_TELEMETRY"),
            max_write_recursion_depth: env_parsed("VALOR_MAX_WRITE_DEPTH")
                .unwrap_or(defaults.max_write_recursion_depth),
            glyph_advance_ratio: env_parsed("VALOR_GLYPH_ADVANCE")
                .unwrap_or(defaults.glyph_advance_ratio),
        }
    }

    /// Enable frame autosizing between `min` and `max`.
    #[inline]
    #[must_use]
    pub const fn with_autosize(mut self, min: IntSize, max: IntSize) -> Self {
        self.autosize_enabled = true;
        self.autosize_min = min;
        self.autosize_max = max;
        self
    }

    /// Enable text autosizing against `device_width`.
    #[inline]
    #[must_use]
    pub const fn with_text_autosizing(mut self, device_width: i32, max_multiplier: f32) -> Self {
        self.text_autosizing_enabled = true;
        self.text_autosizing_device_width = device_width;
        self.text_autosizing_max_multiplier = max_multiplier;
        self
    }

    /// Layout space a visible non-overlay scrollbar takes.
    #[inline]
    #[must_use]
    pub const fn scrollbar_space(&self) -> i32 {
        if self.overlay_scrollbars {
            0
        } else {
            self.scrollbar_thickness
        }
    }
}

/// Parse a `WIDTHxHEIGHT` size such as `800x600`.
///
/// # Errors
/// Returns an error if either dimension is missing, not a number or negative.
pub fn parse_size(value: &str) -> Result<IntSize> {
    let (width, height) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("expected WIDTHxHEIGHT, got {value:?}"))?;
    let width: i32 = width
        .trim()
        .parse()
        .with_context(|| format!("bad width in {value:?}"))?;
    let height: i32 = height
        .trim()
        .parse()
        .with_context(|| format!("bad height in {value:?}"))?;
    if width < 0 || height < 0 {
        return Err(anyhow!("negative size {value:?}"));
    }
    Ok(IntSize::new(width, height))
}

fn env_size(name: &str) -> Option<IntSize> {
    let value = env::var(name).ok()?;
    parse_size(&value)
        .map_err(|err| log::warn!("ignoring {name}: {err:#}"))
        .ok()
}

fn env_parsed<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok()?.trim().parse().ok()
}

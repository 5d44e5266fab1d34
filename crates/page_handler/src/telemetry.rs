//! Telemetry utilities for formatting and emitting perf counters.
//!
//! Kept independent of document internals; callers pass in counters explicitly.

use log::{info, warn};
use serde::Serialize;

/// Pipeline counters kept per document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PerfCounters {
    /// Completed `FrameView::layout` calls, nested ones included.
    pub layout_count: u64,
    /// Deepest layout nesting observed.
    pub nested_layout_peak: u32,
    pub nodes_restyled_last: u64,
    pub nodes_restyled_total: u64,
    pub objects_laid_out_last: u64,
    pub objects_laid_out_total: u64,
    /// Extra layout passes caused by text autosizing.
    pub text_autosize_second_passes: u64,
    /// Measurement iterations run by frame autosizing.
    pub autosize_measurement_passes: u64,
    pub post_layout_runs_sync: u64,
    pub post_layout_runs_deferred: u64,
    /// Outermost layouts that repainted the whole frame.
    pub full_paint_invalidations: u64,
    /// Paint invalidation passes over the layout tree.
    pub paint_invalidation_passes: u64,
    /// Rects handed to the host for repaint.
    pub invalidation_rects: u64,
    pub fast_path_scrolls: u64,
    pub slow_path_scrolls: u64,
    pub style_version: u64,
}

/// Serialise counters as one JSON line.
pub fn perf_counters_json(counters: &PerfCounters) -> String {
    serde_json::to_string(counters).unwrap_or_else(|err| {
        warn!("failed to serialise perf counters: {err}");
        String::from("{}")
    })
}

pub fn maybe_emit(enabled: bool, json_line: &str) {
    if enabled {
        info!(target: "valor::telemetry", "{json_line}");
    }
}

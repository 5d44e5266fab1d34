//! Text autosizing: scales text in wide blocks up for narrow devices.

use crate::geometry::snap;
use crate::object::{LayoutId, LayoutObject};
use crate::tree::LayoutTree;
use log::trace;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextAutosizer {
    enabled: bool,
    device_width: i32,
    max_multiplier: f32,
}

impl Default for TextAutosizer {
    fn default() -> Self {
        Self::disabled()
    }
}

impl TextAutosizer {
    pub const fn new(device_width: i32, max_multiplier: f32) -> Self {
        Self {
            enabled: true,
            device_width,
            max_multiplier,
        }
    }

    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            device_width: 0,
            max_multiplier: 1.0,
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled && self.device_width > 0
    }

    /// Font scale for a text cluster laid out at `cluster_width`.
    pub fn multiplier_for(&self, cluster_width: i32) -> f32 {
        if !self.is_enabled() {
            return 1.0;
        }
        (cluster_width as f32 / self.device_width as f32).clamp(1.0, self.max_multiplier.max(1.0))
    }
}

impl LayoutTree {
    /// Recompute multipliers for every text cluster below `root` from the
    /// widths of the last pass. Returns whether any changed, in which case
    /// the affected clusters are dirty again.
    pub(crate) fn apply_text_autosizing(&mut self, root: LayoutId, autosizer: &TextAutosizer) -> bool {
        let clusters: Vec<(LayoutId, i32)> = self
            .descendants(root)
            .filter(|id| {
                self.object(*id)
                    .is_some_and(LayoutObject::is_block_container)
                    && self.has_inline_content(*id)
            })
            .filter_map(|id| {
                let object = self.object(id)?;
                let content_width = object.size.width - snap(object.style.padding.horizontal());
                Some((id, content_width))
            })
            .collect();
        let mut changed = false;
        for (cluster, width) in clusters {
            let multiplier = autosizer.multiplier_for(width);
            let Some(object) = self.object_mut(cluster) else {
                continue;
            };
            if (object.autosize_multiplier - multiplier).abs() <= f32::EPSILON {
                continue;
            }
            trace!("autosize multiplier of {cluster:?}: {multiplier}");
            object.autosize_multiplier = multiplier;
            object.self_needs_layout = true;
            changed = true;
            // Walk through relayout boundaries up to `root` so the extra pass
            // reaches every dirtied cluster.
            if cluster != root {
                self.mark_containing_blocks_for_layout(cluster, Some(root));
            }
        }
        changed
    }
}

//! `ComputedStyle` interning.
//!
//! Identical styles are shared through one `Arc`, so a recalc that produces
//! an unchanged style hands back the same pointer and equality checks
//! downstream are usually a pointer comparison.

use crate::computed_style::ComputedStyle;
use html::NodeId;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash as _, Hasher as _};
use std::sync::Arc;

/// Hash a `ComputedStyle` for interning. Floats have no `Hash`, so the
/// debug rendering stands in for a field-wise hash.
fn hash_style(style: &ComputedStyle) -> u64 {
    let mut hasher = DefaultHasher::new();
    format!("{style:?}").hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Default)]
pub struct StyleInterner {
    /// Hash buckets; colliding but unequal styles share a bucket.
    buckets: HashMap<u64, Vec<Arc<ComputedStyle>>>,
    node_styles: HashMap<NodeId, Arc<ComputedStyle>>,
}

impl StyleInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, style: ComputedStyle) -> Arc<ComputedStyle> {
        let bucket = self.buckets.entry(hash_style(&style)).or_default();
        if let Some(existing) = bucket.iter().find(|existing| ***existing == style) {
            return Arc::clone(existing);
        }
        let interned = Arc::new(style);
        bucket.push(Arc::clone(&interned));
        interned
    }

    /// Store `node`'s style, returning the previous one.
    pub fn set_node_style(
        &mut self,
        node: NodeId,
        style: ComputedStyle,
    ) -> (Arc<ComputedStyle>, Option<Arc<ComputedStyle>>) {
        let interned = self.intern(style);
        let previous = self.node_styles.insert(node, Arc::clone(&interned));
        (interned, previous)
    }

    /// Store an already interned style.
    pub fn set_node_style_arc(
        &mut self,
        node: NodeId,
        style: Arc<ComputedStyle>,
    ) -> Option<Arc<ComputedStyle>> {
        self.node_styles.insert(node, style)
    }

    pub fn node_style(&self, node: NodeId) -> Option<&Arc<ComputedStyle>> {
        self.node_styles.get(&node)
    }

    pub fn remove_node(&mut self, node: NodeId) -> Option<Arc<ComputedStyle>> {
        self.node_styles.remove(&node)
    }

    /// Drop interned styles no node refers to any more.
    pub fn collect_garbage(&mut self) -> usize {
        let mut dropped = 0;
        for bucket in self.buckets.values_mut() {
            let before = bucket.len();
            bucket.retain(|style| Arc::strong_count(style) > 1);
            dropped += before - bucket.len();
        }
        self.buckets.retain(|_, bucket| !bucket.is_empty());
        dropped
    }

    pub fn stats(&self) -> StyleInternerStats {
        StyleInternerStats {
            unique_styles: self.buckets.values().map(Vec::len).sum(),
            total_nodes: self.node_styles.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleInternerStats {
    pub unique_styles: usize,
    pub total_nodes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computed_style::Display;
    use indextree::Arena;

    /// Identical styles share one allocation; different ones do not.
    ///
    /// # Panics
    /// Panics if interning doesn't deduplicate.
    #[test]
    fn identical_styles_share() {
        let mut interner = StyleInterner::new();
        let first = interner.intern(ComputedStyle::default());
        let second = interner.intern(ComputedStyle::default());
        let block = interner.intern(ComputedStyle {
            display: Display::Block,
            ..ComputedStyle::default()
        });
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &block));
        assert_eq!(interner.stats().unique_styles, 2);
    }

    /// Styles no node holds are collected.
    ///
    /// # Panics
    /// Panics if garbage collection keeps or drops the wrong styles.
    #[test]
    fn garbage_collection() {
        let mut arena = Arena::new();
        let node = arena.new_node(());
        let mut interner = StyleInterner::new();
        let (kept, previous) = interner.set_node_style(node, ComputedStyle::default());
        assert!(previous.is_none());
        drop(interner.intern(ComputedStyle::placeholder()));
        drop(kept);
        assert_eq!(interner.collect_garbage(), 1);
        assert_eq!(interner.stats(), StyleInternerStats {
            unique_styles: 1,
            total_nodes: 1,
        });
    }
}

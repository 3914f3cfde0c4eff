// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node identity.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

/// Sentinel value indicating "no node" in index fields.
pub(crate) const INVALID: u32 = u32::MAX;

static NEXT_TREE: AtomicU32 = AtomicU32::new(0);

/// Allocates a process-unique tree identifier.
pub(crate) fn next_tree_id() -> u32 {
    NEXT_TREE.fetch_add(1, Ordering::Relaxed)
}

/// A handle to a node in a [`NodeStore`](super::NodeStore).
///
/// Holds the store's identity, a slot index, and a generation counter, so a
/// handle held across node destruction, slot reuse, or a scene reload
/// resolves to "absent" rather than to some other node.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    pub(crate) tree: u32,
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{} in tree {})", self.idx, self.generation, self.tree)
    }
}

// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-cursor hover state.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::event::{CursorEvent, CursorId};
use crate::node::NodeId;

/// What the router remembers about one cursor between events.
#[derive(Clone, Debug, PartialEq)]
pub struct CursorState {
    /// The last event routed for this cursor.
    pub last_event: CursorEvent,
    /// Subtree the cursor's input source delivers into, if restricted.
    pub receiver: Option<NodeId>,
    /// Nodes that were under the cursor, front to back. Entries may have
    /// died since; they are skipped on use.
    pub nodes: Vec<NodeId>,
}

/// Hover state of every live cursor.
#[derive(Clone, Debug, Default)]
pub struct CursorTracker {
    cursors: BTreeMap<CursorId, CursorState>,
}

impl CursorTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State of a cursor.
    #[must_use]
    pub fn get(&self, cursor: CursorId) -> Option<&CursorState> {
        self.cursors.get(&cursor)
    }

    /// Nodes that were under `cursor` after its last event.
    #[must_use]
    pub fn nodes(&self, cursor: CursorId) -> &[NodeId] {
        self.cursors
            .get(&cursor)
            .map(|state| state.nodes.as_slice())
            .unwrap_or_default()
    }

    /// Records the outcome of routing `event`.
    pub fn update(&mut self, event: CursorEvent, receiver: Option<NodeId>, nodes: Vec<NodeId>) {
        self.cursors.insert(
            event.cursor,
            CursorState {
                last_event: event,
                receiver,
                nodes,
            },
        );
    }

    /// Forgets a cursor.
    pub fn remove(&mut self, cursor: CursorId) -> Option<CursorState> {
        self.cursors.remove(&cursor)
    }

    /// Last event and receiver of every tracked cursor, in cursor order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(CursorEvent, Option<NodeId>)> {
        self.cursors
            .values()
            .map(|state| (state.last_event, state.receiver))
            .collect()
    }

    /// Drops dead nodes from every hover set.
    pub fn prune(&mut self, is_alive: impl Fn(NodeId) -> bool) {
        for state in self.cursors.values_mut() {
            state.nodes.retain(|&n| is_alive(n));
        }
    }

    /// Number of tracked cursors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    /// Whether no cursor is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Forgets every cursor.
    pub fn clear(&mut self) {
        self.cursors.clear();
    }
}

/// Nodes of `a` that are not in `b`, in `a`'s order.
pub(crate) fn difference(a: &[NodeId], b: &[NodeId]) -> Vec<NodeId> {
    a.iter().copied().filter(|n| !b.contains(n)).collect()
}

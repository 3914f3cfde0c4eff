// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Exclusive cursor capture.
//!
//! While a node holds a cursor's capture, every event of that cursor is
//! delivered along the capturing node's ancestor chain instead of to the
//! nodes under the cursor. Captures are re-entrant: the same node may acquire
//! a cursor several times and holds it until the matching number of releases.
//!
//! The table stores [`NodeId`] handles only. Liveness is supplied by the
//! caller, and an entry whose node has died is dropped the next time it is
//! looked at.

use alloc::collections::BTreeMap;

use crate::error::CaptureError;
use crate::event::CursorId;
use crate::node::NodeId;

/// Capture state for one cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureInfo {
    /// Node holding the capture.
    pub node: NodeId,
    /// Outstanding acquisitions; always at least 1.
    pub count: u32,
}

/// Per-cursor capture entries.
#[derive(Clone, Debug, Default)]
pub struct CaptureTable {
    entries: BTreeMap<CursorId, CaptureInfo>,
}

impl CaptureTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures `cursor` for `node`.
    ///
    /// Re-acquiring by the holder increments its count. A capture whose
    /// holder is dead is replaced.
    ///
    /// # Errors
    ///
    /// [`CaptureError::AlreadyCaptured`] if a different live node holds the
    /// cursor. The existing capture is left untouched.
    pub fn acquire(
        &mut self,
        node: NodeId,
        cursor: CursorId,
        is_alive: impl Fn(NodeId) -> bool,
    ) -> Result<(), CaptureError> {
        match self.live_entry(cursor, &is_alive) {
            Some(info) if info.node == node => {
                info.count += 1;
                Ok(())
            }
            Some(info) => Err(CaptureError::AlreadyCaptured {
                cursor,
                holder: info.node,
                requested: node,
            }),
            None => {
                self.entries.insert(cursor, CaptureInfo { node, count: 1 });
                Ok(())
            }
        }
    }

    /// Undoes one acquisition of `cursor`, ending the capture at zero.
    ///
    /// # Errors
    ///
    /// [`CaptureError::NotCaptured`] if no live node holds the cursor.
    pub fn release(
        &mut self,
        cursor: CursorId,
        is_alive: impl Fn(NodeId) -> bool,
    ) -> Result<(), CaptureError> {
        let info = self
            .live_entry(cursor, &is_alive)
            .ok_or(CaptureError::NotCaptured(cursor))?;
        info.count -= 1;
        if info.count == 0 {
            self.entries.remove(&cursor);
        }
        Ok(())
    }

    /// The live node holding `cursor`, if any.
    pub fn capturing_node(
        &mut self,
        cursor: CursorId,
        is_alive: impl Fn(NodeId) -> bool,
    ) -> Option<NodeId> {
        self.live_entry(cursor, &is_alive).map(|info| info.node)
    }

    /// Whether a live node holds `cursor`.
    pub fn is_captured(&mut self, cursor: CursorId, is_alive: impl Fn(NodeId) -> bool) -> bool {
        self.capturing_node(cursor, is_alive).is_some()
    }

    /// Raw entry for `cursor`, without liveness checks.
    #[must_use]
    pub fn get(&self, cursor: CursorId) -> Option<CaptureInfo> {
        self.entries.get(&cursor).copied()
    }

    /// Number of entries, stale ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every capture.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Looks up `cursor`, dropping the entry if its node has died.
    fn live_entry(
        &mut self,
        cursor: CursorId,
        is_alive: &impl Fn(NodeId) -> bool,
    ) -> Option<&mut CaptureInfo> {
        let node = self.entries.get(&cursor)?.node;
        if !is_alive(node) {
            log::warn!("dropping capture of {cursor:?} held by dead {node:?}");
            self.entries.remove(&cursor);
            return None;
        }
        self.entries.get_mut(&cursor)
    }
}

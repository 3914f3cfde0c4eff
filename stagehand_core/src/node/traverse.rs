// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{INVALID, NodeId};
use super::store::NodeStore;

/// An iterator over the direct children of a node, back to front.
///
/// Created by [`NodeStore::children`]. Reversing it (it is double-ended)
/// yields children front-most first, which is hit-test order.
#[derive(Debug)]
pub struct Children<'a, C> {
    store: &'a NodeStore<C>,
    front: u32,
    back: u32,
}

impl<'a, C> Children<'a, C> {
    pub(crate) fn new(store: &'a NodeStore<C>, first: u32, last: u32) -> Self {
        Self {
            store,
            front: first,
            back: last,
        }
    }

    fn finish(&mut self) {
        self.front = INVALID;
        self.back = INVALID;
    }
}

impl<C> Iterator for Children<'_, C> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.front == INVALID {
            return None;
        }
        let idx = self.front;
        if idx == self.back {
            self.finish();
        } else {
            self.front = self.store.next_sibling[idx as usize];
        }
        Some(self.store.id_at(idx))
    }
}

impl<C> DoubleEndedIterator for Children<'_, C> {
    fn next_back(&mut self) -> Option<NodeId> {
        if self.back == INVALID {
            return None;
        }
        let idx = self.back;
        if idx == self.front {
            self.finish();
        } else {
            self.back = self.store.prev_sibling[idx as usize];
        }
        Some(self.store.id_at(idx))
    }
}

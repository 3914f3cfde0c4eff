// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hit testing.
//!
//! A hit set is ordered front to back: the front-most node under the point
//! comes first, followed by its ancestors up to the node the test started
//! from. Children are tested front-most (last) first and the first child
//! subtree that produces a hit wins, so at most one branch of the tree is in
//! any hit set.

use alloc::vec::Vec;

use kurbo::{Point, Vec2};

use super::id::{INVALID, NodeId};
use super::store::{NodeKind, NodeStore};

impl<C> NodeStore<C> {
    /// Returns the nodes under `point` (root coordinates), front to back.
    ///
    /// Empty if the store has no root.
    #[must_use]
    pub fn hit_test(&self, point: Point) -> Vec<NodeId> {
        match self.root() {
            Some(root) => self.hit_test_from(root, point),
            None => Vec::new(),
        }
    }

    /// Returns the nodes under `point` (root coordinates) within the subtree
    /// rooted at `subtree`, front to back.
    ///
    /// A stale `subtree` handle yields an empty set.
    #[must_use]
    pub fn hit_test_from(&self, subtree: NodeId, point: Point) -> Vec<NodeId> {
        let mut hits = Vec::new();
        if !self.is_alive(subtree) {
            return hits;
        }
        let local = point - self.parent_origin(subtree.idx);
        self.collect_hits(subtree.idx, local, &mut hits);
        hits
    }

    /// Offset of `idx`'s parent space from root space.
    fn parent_origin(&self, idx: u32) -> Vec2 {
        let mut offset = Vec2::ZERO;
        let mut p = self.parent[idx as usize];
        while p != INVALID {
            offset += self.bounds[p as usize].origin().to_vec2();
            p = self.parent[p as usize];
        }
        offset
    }

    /// Appends the hit chain under `point` (in `idx`'s parent space) and
    /// reports whether anything was hit.
    fn collect_hits(&self, idx: u32, point: Point, hits: &mut Vec<NodeId>) -> bool {
        let i = idx as usize;
        let flags = self.flags[i];
        if flags.hidden || !flags.sensitive {
            return false;
        }
        let bounds = self.bounds[i];
        let unbounded = bounds.is_zero_area();
        let inside = !unbounded && bounds.contains(point);

        match self.kind[i] {
            NodeKind::Group => {
                if !unbounded && !inside {
                    return false;
                }
                let child_point = point - bounds.origin().to_vec2();
                let mut child = self.last_child[i];
                while child != INVALID {
                    if self.collect_hits(child, child_point, hits) {
                        hits.push(self.id_at(idx));
                        return true;
                    }
                    child = self.prev_sibling[child as usize];
                }
                if inside {
                    hits.push(self.id_at(idx));
                }
                inside
            }
            NodeKind::Image | NodeKind::Text | NodeKind::Video | NodeKind::CanvasView(_) => {
                if inside {
                    hits.push(self.id_at(idx));
                }
                inside
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::Rect;

    use super::*;
    use crate::node::NodeFlags;

    type Store = NodeStore<()>;

    fn image(store: &mut Store, parent: NodeId, rect: Rect) -> NodeId {
        let id = store.create_node(NodeKind::Image, rect);
        store.add_child(parent, id);
        id
    }

    #[test]
    fn front_most_sibling_wins() {
        let (mut store, root) = Store::with_root();
        let back = image(&mut store, root, Rect::new(0.0, 0.0, 100.0, 100.0));
        let front = image(&mut store, root, Rect::new(50.0, 50.0, 150.0, 150.0));

        assert_eq!(store.hit_test(Point::new(75.0, 75.0)), vec![front, root]);
        assert_eq!(store.hit_test(Point::new(10.0, 10.0)), vec![back, root]);
        assert!(store.hit_test(Point::new(500.0, 500.0)).is_empty());
    }

    #[test]
    fn child_coordinates_are_relative_to_group() {
        let (mut store, root) = Store::with_root();
        let group = store.create_node(NodeKind::Group, Rect::new(100.0, 100.0, 200.0, 200.0));
        store.add_child(root, group);
        let leaf = image(&mut store, group, Rect::new(0.0, 0.0, 10.0, 10.0));

        assert_eq!(
            store.hit_test(Point::new(105.0, 105.0)),
            vec![leaf, group, root]
        );
        // Inside the group but outside the leaf: the bounded group is a hit.
        assert_eq!(store.hit_test(Point::new(150.0, 150.0)), vec![group, root]);
    }

    #[test]
    fn bounded_group_clips_children() {
        let (mut store, root) = Store::with_root();
        let group = store.create_node(NodeKind::Group, Rect::new(0.0, 0.0, 50.0, 50.0));
        store.add_child(root, group);
        let _overhang = image(&mut store, group, Rect::new(40.0, 40.0, 100.0, 100.0));

        assert!(store.hit_test(Point::new(60.0, 60.0)).is_empty());
    }

    #[test]
    fn unbounded_group_is_never_hit_itself() {
        let (mut store, root) = Store::with_root();
        let group = store.create_node(NodeKind::Group, Rect::ZERO);
        store.add_child(root, group);
        let leaf = image(&mut store, group, Rect::new(10.0, 10.0, 20.0, 20.0));

        assert_eq!(store.hit_test(Point::new(15.0, 15.0)), vec![leaf, group, root]);
        assert!(store.hit_test(Point::new(50.0, 50.0)).is_empty());
    }

    #[test]
    fn hidden_and_insensitive_subtrees_are_skipped() {
        let (mut store, root) = Store::with_root();
        let back = image(&mut store, root, Rect::new(0.0, 0.0, 100.0, 100.0));
        let front = image(&mut store, root, Rect::new(0.0, 0.0, 100.0, 100.0));
        let p = Point::new(5.0, 5.0);

        store.set_flags(
            front,
            NodeFlags {
                sensitive: false,
                ..NodeFlags::default()
            },
        );
        assert_eq!(store.hit_test(p), vec![back, root]);

        store.set_flags(
            root,
            NodeFlags {
                hidden: true,
                ..NodeFlags::default()
            },
        );
        assert!(store.hit_test(p).is_empty());
    }

    #[test]
    fn subtree_test_stops_at_subtree_root() {
        let (mut store, root) = Store::with_root();
        let panel = store.create_node(NodeKind::Group, Rect::new(20.0, 0.0, 120.0, 100.0));
        store.add_child(root, panel);
        let button = image(&mut store, panel, Rect::new(0.0, 0.0, 10.0, 10.0));
        let elsewhere = image(&mut store, root, Rect::new(200.0, 0.0, 300.0, 100.0));

        assert_eq!(
            store.hit_test_from(panel, Point::new(25.0, 5.0)),
            vec![button, panel]
        );
        assert!(store.hit_test_from(panel, Point::new(250.0, 5.0)).is_empty());
        assert_eq!(store.hit_test(Point::new(250.0, 5.0)), vec![elsewhere, root]);
    }
}

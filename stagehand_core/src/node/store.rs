// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and handler slots.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;

use crate::canvas::CanvasId;
use crate::error::CallbackError;
use crate::event::Event;

use super::id::{INVALID, NodeId, next_tree_id};
use super::traverse::Children;

/// Event handler attached to a node.
///
/// Receives the context the store is dispatched from (the
/// [`Player`](crate::player::Player) for a loaded scene), the node the event
/// is being delivered to, and the event. Returning `Ok(true)` marks the event
/// as handled and stops delivery to the remaining targets.
pub type EventHandler<C> = Box<dyn FnMut(&mut C, NodeId, &Event) -> Result<bool, CallbackError>>;

/// What a node is.
///
/// Only [`Group`](Self::Group) nodes have children. The remaining variants
/// are content leaves; their pixels belong to the render backend and matter
/// here only for hit testing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A container. With an empty rectangle it is unbounded and never a hit
    /// itself; with a non-empty one it clips hit testing of its children.
    Group,
    /// A still image.
    Image,
    /// A text run.
    Text,
    /// A video or camera picture.
    Video,
    /// A view onto an off-screen canvas.
    CanvasView(CanvasId),
}

impl NodeKind {
    /// Whether nodes of this kind may have children.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Group)
    }
}

/// Per-node boolean flags.
///
/// A [`hidden`](Self::hidden) or non-[`sensitive`](Self::sensitive) node is
/// skipped by hit testing together with its whole subtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeFlags {
    /// Whether the node (and its subtree) is hidden.
    pub hidden: bool,
    /// Whether the node reacts to cursor input.
    pub sensitive: bool,
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self {
            hidden: false,
            sensitive: true,
        }
    }
}

/// Struct-of-arrays storage for a scene tree.
///
/// Nodes are addressed by [`NodeId`] handles. Internally, each node occupies
/// a slot in parallel arrays. Destroyed nodes are recycled via a free list,
/// and generation counters prevent stale handle access. Every store has its
/// own identity, so handles never resolve across stores.
///
/// `C` is the context type handed to event handlers.
pub struct NodeStore<C> {
    pub(crate) tree: u32,

    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) last_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,
    pub(crate) root: u32,

    // -- Properties --
    pub(crate) kind: Vec<NodeKind>,
    pub(crate) bounds: Vec<Rect>,
    pub(crate) flags: Vec<NodeFlags>,

    // -- Handlers --
    handlers: Vec<Option<EventHandler<C>>>,
    handler_epoch: Vec<u32>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) live: Vec<bool>,
    free_list: Vec<u32>,
    pub(crate) len: u32,
}

impl<C> fmt::Debug for NodeStore<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeStore")
            .field("tree", &self.tree)
            .field("len", &self.len)
            .field("free", &self.free_list.len())
            .field("root", &self.root())
            .finish_non_exhaustive()
    }
}

impl<C> Default for NodeStore<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> NodeStore<C> {
    /// Creates an empty store with a fresh identity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: next_tree_id(),
            parent: Vec::new(),
            first_child: Vec::new(),
            last_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            root: INVALID,
            kind: Vec::new(),
            bounds: Vec::new(),
            flags: Vec::new(),
            handlers: Vec::new(),
            handler_epoch: Vec::new(),
            generation: Vec::new(),
            live: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Creates a group node with an empty rectangle and makes it the root.
    #[must_use]
    pub fn with_root() -> (Self, NodeId) {
        let mut store = Self::new();
        let root = store.create_node(NodeKind::Group, Rect::ZERO);
        store.set_root(root);
        (store, root)
    }

    // -- Allocation API --

    /// Creates a new detached node and returns its handle.
    ///
    /// `bounds` is given in the parent's coordinate space.
    pub fn create_node(&mut self, kind: NodeKind, bounds: Rect) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.last_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.kind[i] = kind;
            self.bounds[i] = bounds;
            self.flags[i] = NodeFlags::default();
            self.handlers[i] = None;
            self.live[i] = true;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.last_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.kind.push(kind);
            self.bounds.push(bounds);
            self.flags.push(NodeFlags::default());
            self.handlers.push(None);
            self.handler_epoch.push(0);
            self.generation.push(0);
            self.live.push(true);
            idx
        };
        self.id_at(idx)
    }

    /// Destroys a node, freeing its slot for reuse.
    ///
    /// Any handler is dropped. Destroying the root leaves the store rootless.
    ///
    /// # Panics
    ///
    /// Panics if the node has children (remove them first) or if the handle
    /// is stale.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy node with children"
        );

        if self.parent[idx as usize] != INVALID {
            self.unlink_from_parent(idx);
        }
        if self.root == idx {
            self.root = INVALID;
        }

        self.handlers[idx as usize] = None;
        self.handler_epoch[idx as usize] = self.handler_epoch[idx as usize].wrapping_add(1);
        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] = self.generation[idx as usize].wrapping_add(1);
        self.live[idx as usize] = false;
        self.free_list.push(idx);
    }

    /// Destroys a node together with all of its descendants.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn destroy_subtree(&mut self, id: NodeId) {
        self.validate(id);
        let mut stack = Vec::new();
        let mut order = Vec::new();
        stack.push(id.idx);
        while let Some(idx) = stack.pop() {
            order.push(idx);
            let mut child = self.first_child[idx as usize];
            while child != INVALID {
                stack.push(child);
                child = self.next_sibling[child as usize];
            }
        }
        // Children were pushed after their parents; destroy leaves first.
        for idx in order.into_iter().rev() {
            let node = self.id_at(idx);
            self.destroy_node(node);
        }
    }

    /// Returns whether the given handle refers to a live node of this store.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        id.tree == self.tree
            && id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.live[id.idx as usize]
    }

    /// Number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    // -- Topology API --

    /// Makes `id` the root of the scene.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node has a parent.
    pub fn set_root(&mut self, id: NodeId) {
        self.validate(id);
        assert!(
            self.parent[id.idx as usize] == INVALID,
            "root node cannot have a parent"
        );
        self.root = id.idx;
    }

    /// Returns the root node, if one is set.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        (self.root != INVALID).then(|| self.id_at(self.root))
    }

    /// Adds `child` as the last (front-most) child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, if `parent` is not a container, or
    /// if `child` already has a parent.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.kind[p as usize].is_container(),
            "parent is not a container node"
        );
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        assert!(c != self.root, "root node cannot become a child");

        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = INVALID;
        let last = self.last_child[p as usize];
        self.prev_sibling[c as usize] = last;
        if last == INVALID {
            self.first_child[p as usize] = c;
        } else {
            self.next_sibling[last as usize] = c;
        }
        self.last_child[p as usize] = c;
    }

    /// Inserts `child` before (behind) `sibling` in the sibling list.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` already has a parent, or `sibling`
    /// has no parent.
    pub fn insert_before(&mut self, child: NodeId, sibling: NodeId) {
        self.validate(child);
        self.validate(sibling);
        let c = child.idx;
        let s = sibling.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        let p = self.parent[s as usize];
        assert!(p != INVALID, "sibling has no parent");

        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = self.prev_sibling[s as usize];

        if self.prev_sibling[s as usize] != INVALID {
            self.next_sibling[self.prev_sibling[s as usize] as usize] = c;
        } else {
            self.first_child[p as usize] = c;
        }
        self.prev_sibling[s as usize] = c;
    }

    /// Removes `child` from its current parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node has no parent.
    pub fn remove_from_parent(&mut self, child: NodeId) {
        self.validate(child);
        assert!(
            self.parent[child.idx as usize] != INVALID,
            "node has no parent"
        );
        self.unlink_from_parent(child.idx);
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns an iterator over the direct children of a node, back to front.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_, C> {
        self.validate(id);
        Children::new(
            self,
            self.first_child[id.idx as usize],
            self.last_child[id.idx as usize],
        )
    }

    /// Returns the chain of nodes from the root of `id`'s tree down to `id`
    /// itself.
    ///
    /// A stale handle yields an empty chain.
    #[must_use]
    pub fn ancestor_chain(&self, id: NodeId) -> Vec<NodeId> {
        if !self.is_alive(id) {
            return Vec::new();
        }
        let mut chain = Vec::new();
        let mut idx = id.idx;
        while idx != INVALID {
            chain.push(self.id_at(idx));
            idx = self.parent[idx as usize];
        }
        chain.reverse();
        chain
    }

    // -- Properties --

    /// Returns the kind of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.validate(id);
        self.kind[id.idx as usize]
    }

    /// Returns the bounding rectangle of a node in parent coordinates.
    #[must_use]
    pub fn bounds(&self, id: NodeId) -> Rect {
        self.validate(id);
        self.bounds[id.idx as usize]
    }

    /// Sets the bounding rectangle of a node in parent coordinates.
    pub fn set_bounds(&mut self, id: NodeId, bounds: Rect) {
        self.validate(id);
        self.bounds[id.idx as usize] = bounds;
    }

    /// Returns the flags of a node.
    #[must_use]
    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Sets the flags of a node.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) {
        self.validate(id);
        self.flags[id.idx as usize] = flags;
    }

    // -- Handlers --

    /// Installs the event handler of a node, replacing any previous one.
    ///
    /// Safe to call from inside the node's own handler: the replacement wins
    /// over the handler that is currently running.
    pub fn set_handler<F>(&mut self, id: NodeId, handler: F)
    where
        F: FnMut(&mut C, NodeId, &Event) -> Result<bool, CallbackError> + 'static,
    {
        self.replace_handler(id, Some(Box::new(handler)));
    }

    /// Removes the event handler of a node.
    pub fn clear_handler(&mut self, id: NodeId) {
        self.replace_handler(id, None);
    }

    fn replace_handler(&mut self, id: NodeId, handler: Option<EventHandler<C>>) {
        self.validate(id);
        let i = id.idx as usize;
        self.handlers[i] = handler;
        self.handler_epoch[i] = self.handler_epoch[i].wrapping_add(1);
    }

    /// Whether the node currently has a handler installed.
    ///
    /// A handler that is running is reported as absent.
    #[must_use]
    pub fn has_handler(&self, id: NodeId) -> bool {
        self.is_alive(id) && self.handlers[id.idx as usize].is_some()
    }

    /// Moves a node's handler out for invocation.
    ///
    /// Returns the handler with the slot's epoch, or `None` for a stale
    /// handle or an empty slot.
    pub(crate) fn take_handler(&mut self, id: NodeId) -> Option<(EventHandler<C>, u32)> {
        if !self.is_alive(id) {
            return None;
        }
        let i = id.idx as usize;
        self.handlers[i].take().map(|h| (h, self.handler_epoch[i]))
    }

    /// Puts a handler taken with [`take_handler`](Self::take_handler) back,
    /// unless the node died or its slot was reassigned in the meantime.
    pub(crate) fn restore_handler(&mut self, id: NodeId, handler: EventHandler<C>, epoch: u32) {
        if self.is_alive(id) && self.handler_epoch[id.idx as usize] == epoch {
            self.handlers[id.idx as usize] = Some(handler);
        }
    }

    // -- Internal helpers --

    /// Builds a handle for a slot from its current generation.
    pub(crate) fn id_at(&self, idx: u32) -> NodeId {
        NodeId {
            tree: self.tree,
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Panics if the handle is stale.
    fn validate(&self, id: NodeId) {
        assert!(
            self.is_alive(id),
            "stale NodeId: {id:?} (current gen: {}, tree {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            },
            self.tree
        );
    }

    /// Removes `idx` from its parent's child list.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        } else {
            self.last_child[p as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    type Store = NodeStore<()>;

    fn group(store: &mut Store) -> NodeId {
        store.create_node(NodeKind::Group, Rect::ZERO)
    }

    #[test]
    fn create_and_destroy() {
        let mut store = Store::new();
        let id = group(&mut store);
        assert!(store.is_alive(id));
        store.destroy_node(id);
        assert!(!store.is_alive(id));
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut store = Store::new();
        let id1 = group(&mut store);
        store.destroy_node(id1);
        let id2 = group(&mut store);
        assert!(!store.is_alive(id1));
        assert!(store.is_alive(id2));
        assert_eq!(id1.idx, id2.idx);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    fn handles_do_not_resolve_across_stores() {
        let (a, root_a) = Store::with_root();
        let (b, root_b) = Store::with_root();
        assert_eq!(root_a.idx, root_b.idx);
        assert!(a.is_alive(root_a));
        assert!(!b.is_alive(root_a));
    }

    #[test]
    fn add_child_and_query() {
        let mut store = Store::new();
        let parent = group(&mut store);
        let child1 = group(&mut store);
        let child2 = group(&mut store);

        store.add_child(parent, child1);
        store.add_child(parent, child2);

        assert_eq!(store.parent(child1), Some(parent));
        let kids: Vec<_> = store.children(parent).collect();
        assert_eq!(kids, vec![child1, child2]);
        let front_first: Vec<_> = store.children(parent).rev().collect();
        assert_eq!(front_first, vec![child2, child1]);
    }

    #[test]
    fn insert_before_and_remove_keep_both_ends_linked() {
        let mut store = Store::new();
        let parent = group(&mut store);
        let a = group(&mut store);
        let b = group(&mut store);
        let c = group(&mut store);

        store.add_child(parent, a);
        store.add_child(parent, c);
        store.insert_before(b, c);
        assert_eq!(store.children(parent).collect::<Vec<_>>(), vec![a, b, c]);

        store.remove_from_parent(c);
        assert_eq!(store.children(parent).rev().collect::<Vec<_>>(), vec![b, a]);
        assert_eq!(store.parent(c), None);
    }

    #[test]
    fn ancestor_chain_is_root_first() {
        let (mut store, root) = Store::with_root();
        let mid = group(&mut store);
        let leaf = store.create_node(NodeKind::Image, Rect::new(0.0, 0.0, 1.0, 1.0));
        store.add_child(root, mid);
        store.add_child(mid, leaf);

        assert_eq!(store.ancestor_chain(leaf), vec![root, mid, leaf]);
        store.destroy_node(leaf);
        assert!(store.ancestor_chain(leaf).is_empty());
    }

    #[test]
    fn destroy_subtree_frees_descendants() {
        let (mut store, root) = Store::with_root();
        let mid = group(&mut store);
        let leaf = store.create_node(NodeKind::Text, Rect::ZERO);
        store.add_child(root, mid);
        store.add_child(mid, leaf);

        store.destroy_subtree(mid);
        assert!(!store.is_alive(mid));
        assert!(!store.is_alive(leaf));
        assert!(store.children(root).next().is_none());
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn handler_replaced_while_taken_is_not_restored() {
        let (mut store, root) = Store::with_root();
        store.set_handler(root, |_, _, _| Ok(true));
        let (handler, epoch) = store.take_handler(root).expect("handler installed");
        assert!(!store.has_handler(root));

        store.clear_handler(root);
        store.restore_handler(root, handler, epoch);
        assert!(!store.has_handler(root));
    }

    #[test]
    fn handler_restored_after_invocation() {
        let (mut store, root) = Store::with_root();
        store.set_handler(root, |_, _, _| Ok(false));
        let (mut handler, epoch) = store.take_handler(root).expect("handler installed");
        assert_eq!(handler(&mut (), root, &Event::Quit), Ok(false));
        store.restore_handler(root, handler, epoch);
        assert!(store.has_handler(root));
    }

    #[test]
    #[should_panic(expected = "cannot destroy node with children")]
    fn destroy_with_children_panics() {
        let mut store = Store::new();
        let parent = group(&mut store);
        let child = group(&mut store);
        store.add_child(parent, child);
        store.destroy_node(parent);
    }

    #[test]
    #[should_panic(expected = "parent is not a container node")]
    fn leaf_cannot_have_children() {
        let mut store = Store::new();
        let leaf = store.create_node(NodeKind::Image, Rect::ZERO);
        let child = group(&mut store);
        store.add_child(leaf, child);
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn destroyed_handle_panics_on_bounds() {
        let mut store = Store::new();
        let id = group(&mut store);
        store.destroy_node(id);
        let _ = store.bounds(id);
    }
}

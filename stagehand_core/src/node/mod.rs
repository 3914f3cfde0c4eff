// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene tree data model.
//!
//! A *node* is an element of the scene the player presents. Each node has:
//!
//! - An identity ([`NodeId`]) — a generational handle that becomes stale when
//!   the node is destroyed or its store is dropped. Everything outside the
//!   store (captures, hover state, timers' closures) holds only these
//!   handles and resolves them on use.
//! - Topology — parent, child, and sibling links forming an ordered tree.
//!   Later siblings are in front of earlier ones.
//! - A [`NodeKind`], a bounding rectangle in parent coordinates, and
//!   [`NodeFlags`].
//! - An optional [`EventHandler`].
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles.
//! Layout, drawing, and media decoding are left to the render backend; the
//! store keeps only what input routing needs.

mod hit;
mod id;
mod store;
mod traverse;

pub use id::NodeId;
pub use store::{EventHandler, NodeFlags, NodeKind, NodeStore};
pub use traverse::Children;

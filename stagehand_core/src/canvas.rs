// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Off-screen canvases and their render order.
//!
//! A canvas that shows another canvas's output *depends* on it, and the
//! dependency must render first. The graph is not kept as an adjacency
//! structure: [`CanvasGraph`] holds one ordered sequence of off-screen
//! canvases in which every canvas appears after everything it depends on. The
//! primary canvas ([`CanvasId::MAIN`]) is never part of the sequence and
//! always renders last.
//!
//! Each canvas records its *dependents*, the canvases that sample it.
//! Registering a dependency repositions the sampled canvas in the sequence;
//! a change that would create a cycle is rejected before anything is
//! committed.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::backend::FrameSource;
use crate::error::CanvasError;

/// URL scheme that names a canvas in scene descriptions.
pub const CANVAS_URL_SCHEME: &str = "canvas:";

/// Identifies a canvas.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanvasId(pub(crate) u32);

impl CanvasId {
    /// The primary, always-rendered canvas.
    pub const MAIN: Self = Self(0);

    /// Returns the raw id value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for CanvasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::MAIN {
            f.write_str("CanvasId(main)")
        } else {
            write!(f, "CanvasId({})", self.0)
        }
    }
}

/// An off-screen canvas.
pub struct Canvas {
    id: CanvasId,
    name: String,
    auto_render: bool,
    dependents: Vec<CanvasId>,
    source: Option<Box<dyn FrameSource>>,
}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("auto_render", &self.auto_render)
            .field("dependents", &self.dependents)
            .field("source", &self.source.is_some())
            .finish()
    }
}

impl Canvas {
    /// The canvas id.
    #[must_use]
    pub fn id(&self) -> CanvasId {
        self.id
    }

    /// The canvas name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the frame loop renders this canvas every frame.
    #[must_use]
    pub fn auto_render(&self) -> bool {
        self.auto_render
    }

    /// Canvases that sample this one.
    #[must_use]
    pub fn dependents(&self) -> &[CanvasId] {
        &self.dependents
    }

    /// Whether a live frame source feeds this canvas.
    #[must_use]
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub(crate) fn source_mut(&mut self) -> Option<&mut (dyn FrameSource + 'static)> {
        self.source.as_deref_mut()
    }
}

/// Off-screen canvases in render order.
#[derive(Debug)]
pub struct CanvasGraph {
    order: Vec<Canvas>,
    next_id: u32,
}

impl Default for CanvasGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasGraph {
    /// Creates a graph holding only the primary canvas.
    #[must_use]
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            next_id: 1,
        }
    }

    /// Registers a new off-screen canvas at the end of the render order.
    ///
    /// # Errors
    ///
    /// [`CanvasError::DuplicateName`] if the name is taken.
    pub fn create_canvas(
        &mut self,
        name: &str,
        auto_render: bool,
    ) -> Result<CanvasId, CanvasError> {
        if self.canvas_by_name(name).is_some() {
            return Err(CanvasError::DuplicateName(name.to_string()));
        }
        let id = CanvasId(self.next_id);
        self.next_id += 1;
        self.order.push(Canvas {
            id,
            name: name.to_string(),
            auto_render,
            dependents: Vec::new(),
            source: None,
        });
        log::debug!("created canvas '{name}' as {id:?}");
        Ok(id)
    }

    /// Removes an off-screen canvas.
    ///
    /// The canvas is also dropped from the dependent lists of the canvases it
    /// sampled.
    ///
    /// # Errors
    ///
    /// - [`CanvasError::PrimaryCanvas`] for [`CanvasId::MAIN`].
    /// - [`CanvasError::UnknownCanvas`] if no such canvas exists.
    /// - [`CanvasError::StillReferenced`] while other canvases depend on it.
    pub fn remove_canvas(&mut self, id: CanvasId) -> Result<(), CanvasError> {
        if id == CanvasId::MAIN {
            return Err(CanvasError::PrimaryCanvas);
        }
        let pos = self.position(id).ok_or(CanvasError::UnknownCanvas(id))?;
        let dependents = self.order[pos].dependents.len();
        if dependents > 0 {
            return Err(CanvasError::StillReferenced { id, dependents });
        }
        self.order.remove(pos);
        for canvas in &mut self.order {
            canvas.dependents.retain(|&d| d != id);
        }
        Ok(())
    }

    /// Records that `dependent` samples `dependency`, moving `dependency`
    /// ahead of everything that (transitively) samples it.
    ///
    /// On error the graph is unchanged.
    ///
    /// # Errors
    ///
    /// - [`CanvasError::UnknownCanvas`] if either canvas does not exist.
    /// - [`CanvasError::CircularDependency`] if `dependency` already
    ///   (transitively) depends on `dependent`, if either is the primary
    ///   canvas in the wrong role, or if `dependency` cannot move in front of
    ///   `dependent` without also moving in front of something it samples.
    pub fn register_dependency(
        &mut self,
        dependent: CanvasId,
        dependency: CanvasId,
    ) -> Result<(), CanvasError> {
        let circular = CanvasError::CircularDependency {
            dependent,
            dependency,
        };
        if dependent != CanvasId::MAIN && self.position(dependent).is_none() {
            return Err(CanvasError::UnknownCanvas(dependent));
        }
        if dependency == CanvasId::MAIN || dependent == dependency {
            return Err(circular);
        }
        let pos = self
            .position(dependency)
            .ok_or(CanvasError::UnknownCanvas(dependency))?;
        if self.order[pos].dependents.contains(&dependent) {
            return Ok(());
        }
        if self.feeds(dependent, dependency) {
            return Err(circular);
        }

        self.order[pos].dependents.push(dependent);
        match self.reposition(dependency) {
            Ok(()) => Ok(()),
            Err(err) => {
                if let Some(pos) = self.position(dependency) {
                    self.order[pos].dependents.retain(|&d| d != dependent);
                }
                Err(err)
            }
        }
    }

    /// Forgets that `dependent` samples `dependency`. Returns whether the
    /// edge existed.
    pub fn remove_dependency(&mut self, dependent: CanvasId, dependency: CanvasId) -> bool {
        let Some(pos) = self.position(dependency) else {
            return false;
        };
        let deps = &mut self.order[pos].dependents;
        let before = deps.len();
        deps.retain(|&d| d != dependent);
        deps.len() != before
    }

    /// Whether `canvas`'s output (transitively) reaches `target`.
    #[must_use]
    pub fn feeds(&self, canvas: CanvasId, target: CanvasId) -> bool {
        let mut visited = Vec::new();
        let mut stack = Vec::new();
        stack.push(canvas);
        while let Some(c) = stack.pop() {
            if visited.contains(&c) {
                continue;
            }
            visited.push(c);
            if let Some(entry) = self.get(c) {
                for &d in &entry.dependents {
                    if d == target {
                        return true;
                    }
                    stack.push(d);
                }
            }
        }
        false
    }

    /// Moves `id` to the first slot in front of a canvas that samples it.
    ///
    /// Mirrors the explicit-sequence scheme: take `id` out, scan for the
    /// first canvas it feeds, and insert it there as long as nothing at or
    /// after that slot feeds `id`. A canvas that feeds nothing in the
    /// sequence is appended and must reach the primary canvas.
    fn reposition(&mut self, id: CanvasId) -> Result<(), CanvasError> {
        let Some(old) = self.position(id) else {
            return Err(CanvasError::UnknownCanvas(id));
        };
        let mut rest: Vec<CanvasId> = self.order.iter().map(Canvas::id).collect();
        rest.remove(old);

        match rest.iter().position(|&c| self.feeds(id, c)) {
            Some(slot) => {
                if let Some(&late) = rest[slot..].iter().find(|&&c| self.feeds(c, id)) {
                    return Err(CanvasError::CircularDependency {
                        dependent: id,
                        dependency: late,
                    });
                }
                rest.insert(slot, id);
            }
            None => {
                if !self.feeds(id, CanvasId::MAIN) {
                    return Err(CanvasError::Unreachable(id));
                }
                rest.push(id);
            }
        }
        self.apply_order(&rest);
        Ok(())
    }

    fn apply_order(&mut self, order: &[CanvasId]) {
        let mut old = core::mem::take(&mut self.order);
        for id in order {
            if let Some(pos) = old.iter().position(|c| c.id == *id) {
                self.order.push(old.swap_remove(pos));
            }
        }
    }

    /// Off-screen canvases in render order.
    #[must_use]
    pub fn render_order(&self) -> Vec<CanvasId> {
        self.order.iter().map(Canvas::id).collect()
    }

    /// Iterates off-screen canvases in render order.
    pub fn iter(&self) -> impl Iterator<Item = &Canvas> {
        self.order.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Canvas> {
        self.order.iter_mut()
    }

    /// Looks up an off-screen canvas.
    #[must_use]
    pub fn get(&self, id: CanvasId) -> Option<&Canvas> {
        self.order.iter().find(|c| c.id == id)
    }

    /// Looks up an off-screen canvas by name.
    #[must_use]
    pub fn canvas_by_name(&self, name: &str) -> Option<CanvasId> {
        self.order.iter().find(|c| c.name == name).map(Canvas::id)
    }

    /// Resolves a `canvas:<name>` URL.
    ///
    /// # Errors
    ///
    /// [`CanvasError::InvalidUrl`] for other schemes,
    /// [`CanvasError::UnknownName`] if no canvas has that name.
    pub fn canvas_from_url(&self, url: &str) -> Result<CanvasId, CanvasError> {
        let name = url
            .strip_prefix(CANVAS_URL_SCHEME)
            .ok_or_else(|| CanvasError::InvalidUrl(url.to_string()))?;
        self.canvas_by_name(name)
            .ok_or_else(|| CanvasError::UnknownName(name.to_string()))
    }

    /// Sets whether the frame loop renders a canvas automatically.
    ///
    /// # Errors
    ///
    /// [`CanvasError::UnknownCanvas`] if no such canvas exists.
    pub fn set_auto_render(&mut self, id: CanvasId, auto_render: bool) -> Result<(), CanvasError> {
        self.get_mut(id)?.auto_render = auto_render;
        Ok(())
    }

    /// Attaches (or detaches) the live source that feeds a canvas.
    ///
    /// # Errors
    ///
    /// [`CanvasError::UnknownCanvas`] if no such canvas exists.
    pub fn set_source(
        &mut self,
        id: CanvasId,
        source: Option<Box<dyn FrameSource>>,
    ) -> Result<(), CanvasError> {
        self.get_mut(id)?.source = source;
        Ok(())
    }

    /// Number of off-screen canvases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether there are no off-screen canvases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drops every off-screen canvas.
    pub fn clear(&mut self) {
        self.order.clear();
    }

    fn get_mut(&mut self, id: CanvasId) -> Result<&mut Canvas, CanvasError> {
        self.order
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(CanvasError::UnknownCanvas(id))
    }

    fn position(&self, id: CanvasId) -> Option<usize> {
        self.order.iter().position(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn dependency_moves_canvas_in_front_of_its_dependent() {
        let mut graph = CanvasGraph::new();
        let a = graph.create_canvas("a", true).unwrap();
        let b = graph.create_canvas("b", true).unwrap();

        graph.register_dependency(CanvasId::MAIN, a).unwrap();
        graph.register_dependency(a, b).unwrap();
        assert_eq!(graph.render_order(), vec![b, a]);
        assert_eq!(graph.get(b).map(Canvas::dependents), Some(&[a][..]));
    }

    #[test]
    fn cycle_is_rejected_and_order_unchanged() {
        let mut graph = CanvasGraph::new();
        let a = graph.create_canvas("a", true).unwrap();
        let b = graph.create_canvas("b", true).unwrap();
        graph.register_dependency(CanvasId::MAIN, a).unwrap();
        graph.register_dependency(a, b).unwrap();
        let before = graph.render_order();

        let err = graph.register_dependency(b, a).unwrap_err();
        assert_eq!(
            err,
            CanvasError::CircularDependency {
                dependent: b,
                dependency: a
            }
        );
        assert_eq!(graph.render_order(), before);
        assert!(graph.get(a).is_some_and(|c| !c.dependents().contains(&b)));
    }

    #[test]
    fn self_and_main_dependencies_are_circular() {
        let mut graph = CanvasGraph::new();
        let a = graph.create_canvas("a", true).unwrap();
        assert!(matches!(
            graph.register_dependency(a, a),
            Err(CanvasError::CircularDependency { .. })
        ));
        assert!(matches!(
            graph.register_dependency(a, CanvasId::MAIN),
            Err(CanvasError::CircularDependency { .. })
        ));
    }

    #[test]
    fn chain_may_be_built_before_it_reaches_main() {
        let mut graph = CanvasGraph::new();
        let a = graph.create_canvas("a", true).unwrap();
        let b = graph.create_canvas("b", true).unwrap();

        graph.register_dependency(a, b).unwrap();
        assert_eq!(graph.render_order(), vec![b, a]);
        graph.register_dependency(CanvasId::MAIN, a).unwrap();
        assert_eq!(graph.render_order(), vec![b, a]);
    }

    #[test]
    fn canvas_feeding_nothing_visible_is_unreachable() {
        let mut graph = CanvasGraph::new();
        let a = graph.create_canvas("a", true).unwrap();
        let b = graph.create_canvas("b", true).unwrap();

        assert_eq!(graph.reposition(a), Err(CanvasError::Unreachable(a)));
        assert_eq!(graph.render_order(), vec![a, b]);
    }

    #[test]
    fn chain_renders_leaves_first() {
        let mut graph = CanvasGraph::new();
        let a = graph.create_canvas("a", true).unwrap();
        let b = graph.create_canvas("b", true).unwrap();
        let c = graph.create_canvas("c", true).unwrap();

        graph.register_dependency(CanvasId::MAIN, c).unwrap();
        graph.register_dependency(c, b).unwrap();
        graph.register_dependency(b, a).unwrap();
        assert_eq!(graph.render_order(), vec![a, b, c]);
    }

    #[test]
    fn move_past_own_dependency_is_rejected() {
        let mut graph = CanvasGraph::new();
        let y = graph.create_canvas("y", true).unwrap();
        let a = graph.create_canvas("a", true).unwrap();
        let x = graph.create_canvas("x", true).unwrap();
        graph.register_dependency(CanvasId::MAIN, y).unwrap();
        graph.register_dependency(CanvasId::MAIN, x).unwrap();
        graph.register_dependency(x, a).unwrap();
        assert_eq!(graph.render_order(), vec![y, a, x]);

        // x would have to move in front of y, but a still sits after y.
        assert_eq!(
            graph.register_dependency(y, x),
            Err(CanvasError::CircularDependency {
                dependent: x,
                dependency: a
            })
        );
        assert_eq!(graph.render_order(), vec![y, a, x]);
        assert!(graph.get(x).is_some_and(|c| !c.dependents().contains(&y)));
    }

    #[test]
    fn referenced_canvas_cannot_be_removed() {
        let mut graph = CanvasGraph::new();
        let a = graph.create_canvas("a", true).unwrap();
        let b = graph.create_canvas("b", true).unwrap();
        graph.register_dependency(CanvasId::MAIN, a).unwrap();
        graph.register_dependency(a, b).unwrap();

        assert_eq!(
            graph.remove_canvas(b),
            Err(CanvasError::StillReferenced {
                id: b,
                dependents: 1
            })
        );
        assert!(graph.remove_dependency(a, b));
        graph.remove_canvas(b).unwrap();
        assert_eq!(graph.render_order(), vec![a]);
        assert_eq!(graph.remove_canvas(b), Err(CanvasError::UnknownCanvas(b)));
        assert_eq!(
            graph.remove_canvas(CanvasId::MAIN),
            Err(CanvasError::PrimaryCanvas)
        );
    }

    #[test]
    fn removing_dependent_cleans_dependency_lists() {
        let mut graph = CanvasGraph::new();
        let a = graph.create_canvas("a", true).unwrap();
        let b = graph.create_canvas("b", true).unwrap();
        graph.register_dependency(CanvasId::MAIN, a).unwrap();
        graph.register_dependency(a, b).unwrap();
        graph.remove_dependency(CanvasId::MAIN, a);

        graph.remove_canvas(a).unwrap();
        assert!(graph.get(b).is_some_and(|c| c.dependents().is_empty()));
    }

    #[test]
    fn names_and_urls() {
        let mut graph = CanvasGraph::new();
        let a = graph.create_canvas("mirror", false).unwrap();
        assert_eq!(
            graph.create_canvas("mirror", true),
            Err(CanvasError::DuplicateName("mirror".into()))
        );
        assert_eq!(graph.canvas_from_url("canvas:mirror"), Ok(a));
        assert_eq!(
            graph.canvas_from_url("file:mirror"),
            Err(CanvasError::InvalidUrl("file:mirror".into()))
        );
        assert_eq!(
            graph.canvas_from_url("canvas:nope"),
            Err(CanvasError::UnknownName("nope".into()))
        );
        assert!(graph.get(a).is_some_and(|c| !c.auto_render()));
    }
}

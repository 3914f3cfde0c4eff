// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event routing.
//!
//! Cursor events are hit-tested against the scene (or the subtree their
//! source is confined to) and bubble front to back along the hit set until a
//! handler consumes them. Before delivery the router compares the new hit set
//! with the one the cursor had before and synthesizes `Out` events for nodes
//! that were left and `Over` events for nodes that were entered, in that
//! order. A captured cursor keeps its hover bookkeeping but delivers along
//! the capturing node's ancestor chain instead.
//!
//! Every event, synthesized ones included, passes the pre-dispatch hook
//! first.

use alloc::vec::Vec;

use super::{Player, Scene};
use crate::cursor::difference;
use crate::error::CallbackError;
use crate::event::{
    CursorEvent, CursorEventKind, Event, InputSourceKind, KeyCode, KeyEvent, KeyEventKind,
};
use crate::node::NodeId;

#[cfg(feature = "trace-rich")]
use crate::trace::{EventRouted, RoutedKind};

impl Player {
    /// Routes one event right away, outside the frame loop's input phase.
    ///
    /// # Errors
    ///
    /// The first error the event hook or a handler reports. Routing stops
    /// there.
    ///
    /// # Panics
    ///
    /// If no scene is loaded.
    pub fn dispatch_event(&mut self, event: impl Into<Event>) -> Result<(), CallbackError> {
        self.route_event(event.into(), None)
    }

    /// Routes `event`, confining untargeted cursor events to `receiver`.
    pub(crate) fn route_event(
        &mut self,
        event: Event,
        receiver: Option<NodeId>,
    ) -> Result<(), CallbackError> {
        assert!(
            self.scene.as_ref().is_some_and(|s| s.root().is_some()),
            "event dispatched with no scene loaded"
        );
        let intercepted = self.run_event_hook(&event)?;
        #[cfg(feature = "trace-rich")]
        self.routed.push(EventRouted {
            kind: match event {
                Event::Cursor(_) => RoutedKind::Cursor,
                Event::Key(_) => RoutedKind::Key,
                Event::Quit => RoutedKind::Quit,
            },
            cursor: match event {
                Event::Cursor(c) => Some(c.cursor),
                _ => None,
            },
            intercepted,
        });
        if intercepted {
            return Ok(());
        }
        if let Event::Cursor(c) = event {
            if c.source == InputSourceKind::Mouse && c.target.is_none() {
                self.last_mouse = Some(c);
            }
        }

        match event {
            Event::Cursor(c) => match c.target {
                Some(target) => {
                    self.deliver(target, &event)?;
                }
                None => self.handle_cursor_event(c, receiver, false)?,
            },
            Event::Key(key) => self.handle_key_event(key)?,
            Event::Quit => {
                log::info!("quit requested");
                self.stop();
            }
        }
        Ok(())
    }

    /// Re-evaluates hover state of every known cursor at its last position.
    ///
    /// Nodes that moved, appeared, or vanished under a resting cursor get
    /// their `Over`/`Out` events here; nothing else is delivered.
    pub(crate) fn refresh_hover(&mut self) -> Result<(), CallbackError> {
        for (event, receiver) in self.cursors.snapshot() {
            if self.scene.is_none() {
                break;
            }
            self.handle_cursor_event(event, receiver, true)?;
        }
        Ok(())
    }

    /// Runs the pre-dispatch hook. Returns whether it consumed the event.
    fn run_event_hook(&mut self, event: &Event) -> Result<bool, CallbackError> {
        let Some(mut hook) = self.event_hook.take() else {
            return Ok(false);
        };
        let epoch = self.event_hook_epoch;
        let result = hook(self, event);
        if self.event_hook.is_none() && self.event_hook_epoch == epoch {
            self.event_hook = Some(hook);
        }
        result
    }

    /// Calls `node`'s handler. Returns whether it consumed the event.
    fn deliver(&mut self, node: NodeId, event: &Event) -> Result<bool, CallbackError> {
        let Some((mut handler, epoch)) = self.scene.as_mut().and_then(|s| s.take_handler(node))
        else {
            return Ok(false);
        };
        let result = handler(self, node, event);
        // The handler may have dropped or replaced the scene.
        if let Some(scene) = self.scene.as_mut() {
            scene.restore_handler(node, handler, epoch);
        }
        result
    }

    fn handle_cursor_event(
        &mut self,
        event: CursorEvent,
        receiver: Option<NodeId>,
        only_check: bool,
    ) -> Result<(), CallbackError> {
        let Some(scene) = self.scene.as_ref() else {
            return Ok(());
        };
        let receiver = receiver.filter(|&r| scene.is_alive(r));
        let current = match receiver {
            Some(r) => scene.hit_test_from(r, event.position),
            None => scene.hit_test(event.position),
        };
        let targets: Vec<NodeId> =
            match self.captures.capturing_node(event.cursor, |n| scene.is_alive(n)) {
                Some(holder) => {
                    let mut chain = scene.ancestor_chain(holder);
                    chain.reverse();
                    chain
                }
                None => current.clone(),
            };
        let previous = self.cursors.nodes(event.cursor).to_vec();

        for node in difference(&previous, &current) {
            self.send_over(event, CursorEventKind::Out, node)?;
        }
        for node in difference(&current, &previous) {
            self.send_over(event, CursorEventKind::Over, node)?;
        }

        if !only_check {
            for node in targets {
                if !self.is_node_alive(node) {
                    continue;
                }
                let routed = Event::Cursor(event.retarget(event.kind, node));
                if self.deliver(node, &routed)? {
                    break;
                }
            }
        }

        if self.scene.is_none() {
            return Ok(());
        }
        if event.ends_cursor() {
            for &node in &current {
                self.send_over(event, CursorEventKind::Out, node)?;
            }
            self.cursors.remove(event.cursor);
        } else {
            self.cursors.update(event, receiver, current);
        }
        Ok(())
    }

    /// Delivers a synthesized `Over` or `Out` to one node.
    fn send_over(
        &mut self,
        event: CursorEvent,
        kind: CursorEventKind,
        node: NodeId,
    ) -> Result<(), CallbackError> {
        if !self.is_node_alive(node) {
            return Ok(());
        }
        let synthesized = Event::Cursor(event.retarget(kind, node));
        if self.run_event_hook(&synthesized)? {
            return Ok(());
        }
        self.deliver(node, &synthesized)?;
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<(), CallbackError> {
        let handled = match self.scene.as_ref().and_then(Scene::root) {
            Some(root) => self.deliver(root, &Event::Key(key))?,
            None => false,
        };
        if !handled
            && self.stop_on_escape
            && key.kind == KeyEventKind::Down
            && key.key == KeyCode::Escape
        {
            log::info!("escape pressed, stopping playback");
            self.stop();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    use kurbo::{Point, Rect};

    use super::*;
    use crate::event::CursorId;
    use crate::node::NodeKind;
    use crate::player::testing::{call_log, simple_scene, surface};
    use crate::player::{PlayerConfig, PlayerState};

    type Seen = Rc<RefCell<Vec<(NodeId, CursorEventKind)>>>;

    fn player_with(scene: Scene) -> Player {
        let mut player = Player::new(PlayerConfig::fixed_rate(50.0), surface(&call_log()));
        player.load_scene(scene).unwrap();
        player
    }

    /// Root with image `a` at x 0..10 and image `b` at x 20..30.
    fn two_images() -> (Scene, NodeId, NodeId, NodeId) {
        let (mut scene, root) = Scene::with_root();
        let a = scene.create_node(NodeKind::Image, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = scene.create_node(NodeKind::Image, Rect::new(20.0, 0.0, 30.0, 10.0));
        scene.add_child(root, a);
        scene.add_child(root, b);
        (scene, root, a, b)
    }

    fn record(scene: &mut Scene, node: NodeId, seen: &Seen) {
        let seen = seen.clone();
        scene.set_handler(node, move |_: &mut Player, id, event: &Event| {
            if let Event::Cursor(c) = event {
                seen.borrow_mut().push((id, c.kind));
            }
            Ok(false)
        });
    }

    fn motion(x: f64) -> CursorEvent {
        CursorEvent::mouse(CursorEventKind::Motion, Point::new(x, 5.0))
    }

    #[test]
    fn moving_between_nodes_sends_out_before_over() {
        let (mut scene, root, a, b) = two_images();
        let seen = Seen::default();
        for node in [root, a, b] {
            record(&mut scene, node, &seen);
        }
        let mut player = player_with(scene);

        player.dispatch_event(motion(5.0)).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![
                (a, CursorEventKind::Over),
                (root, CursorEventKind::Over),
                (a, CursorEventKind::Motion),
                (root, CursorEventKind::Motion),
            ]
        );

        seen.borrow_mut().clear();
        player.dispatch_event(motion(25.0)).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![
                (a, CursorEventKind::Out),
                (b, CursorEventKind::Over),
                (b, CursorEventKind::Motion),
                (root, CursorEventKind::Motion),
            ]
        );
    }

    #[test]
    fn touch_release_leaves_every_node_and_forgets_cursor() {
        let (mut scene, root, a, _b) = two_images();
        let seen = Seen::default();
        record(&mut scene, root, &seen);
        record(&mut scene, a, &seen);
        let mut player = player_with(scene);
        let touch = CursorId(3);
        let at = Point::new(5.0, 5.0);

        player
            .dispatch_event(CursorEvent::touch(CursorEventKind::Down, touch, at))
            .unwrap();
        assert!(player.cursors.get(touch).is_some());
        seen.borrow_mut().clear();

        player
            .dispatch_event(CursorEvent::touch(CursorEventKind::Up, touch, at))
            .unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![
                (a, CursorEventKind::Up),
                (root, CursorEventKind::Up),
                (a, CursorEventKind::Out),
                (root, CursorEventKind::Out),
            ]
        );
        assert!(player.cursors.get(touch).is_none());

        // A mouse keeps hovering after its button is released.
        player
            .dispatch_event(CursorEvent::mouse(CursorEventKind::Up, at))
            .unwrap();
        assert!(player.cursors.get(CursorId::MOUSE).is_some());
    }

    #[test]
    fn captured_cursor_bubbles_from_holder() {
        let (mut scene, root, a, b) = two_images();
        let seen = Seen::default();
        for node in [root, a, b] {
            record(&mut scene, node, &seen);
        }
        let mut player = player_with(scene);
        player.capture_cursor(a, CursorId::MOUSE).unwrap();

        player.dispatch_event(motion(25.0)).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![
                (b, CursorEventKind::Over),
                (root, CursorEventKind::Over),
                (a, CursorEventKind::Motion),
                (root, CursorEventKind::Motion),
            ],
            "hover follows the cursor, delivery follows the capture"
        );

        player.release_cursor(CursorId::MOUSE).unwrap();
        seen.borrow_mut().clear();
        player.dispatch_event(motion(25.0)).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![(b, CursorEventKind::Motion), (root, CursorEventKind::Motion)]
        );
    }

    #[test]
    fn capture_of_destroyed_node_falls_back_to_hit_set() {
        let (mut scene, root, a, b) = two_images();
        let seen = Seen::default();
        record(&mut scene, root, &seen);
        record(&mut scene, b, &seen);
        let mut player = player_with(scene);
        player.capture_cursor(a, CursorId::MOUSE).unwrap();
        player.scene_mut().unwrap().destroy_node(a);

        player.dispatch_event(motion(25.0)).unwrap();
        assert!(seen.borrow().contains(&(b, CursorEventKind::Motion)));
        assert!(!player.is_captured(CursorId::MOUSE));
    }

    #[test]
    fn consumed_event_stops_bubbling() {
        let (mut scene, root, a, _b) = two_images();
        let seen = Seen::default();
        record(&mut scene, root, &seen);
        scene.set_handler(a, |_: &mut Player, _, event: &Event| {
            Ok(matches!(event, Event::Cursor(c) if c.kind == CursorEventKind::Down))
        });
        let mut player = player_with(scene);

        player
            .dispatch_event(CursorEvent::mouse(CursorEventKind::Down, Point::new(5.0, 5.0)))
            .unwrap();
        assert_eq!(*seen.borrow(), vec![(root, CursorEventKind::Over)]);
    }

    #[test]
    fn event_hook_sees_and_may_swallow_synthesized_events() {
        let (mut scene, root, a, _b) = two_images();
        let seen = Seen::default();
        record(&mut scene, root, &seen);
        record(&mut scene, a, &seen);
        let mut player = player_with(scene);
        let hooked = Rc::new(RefCell::new(Vec::new()));
        let h = hooked.clone();
        player.set_event_hook(move |_: &mut Player, event: &Event| {
            let Event::Cursor(c) = event else {
                return Ok(false);
            };
            h.borrow_mut().push(c.kind);
            Ok(c.kind == CursorEventKind::Over)
        });

        player.dispatch_event(motion(5.0)).unwrap();
        assert_eq!(
            *hooked.borrow(),
            vec![
                CursorEventKind::Motion,
                CursorEventKind::Over,
                CursorEventKind::Over,
            ]
        );
        assert_eq!(
            *seen.borrow(),
            vec![(a, CursorEventKind::Motion), (root, CursorEventKind::Motion)]
        );
        assert_eq!(player.mouse_state(), Some(motion(5.0)));
    }

    #[test]
    fn swallowed_mouse_event_is_not_mouse_state() {
        let mut player = player_with(simple_scene().0);
        player.set_event_hook(|_: &mut Player, event: &Event| {
            Ok(matches!(event, Event::Cursor(c) if c.position.x > 50.0))
        });

        player.dispatch_event(motion(5.0)).unwrap();
        player.dispatch_event(motion(60.0)).unwrap();
        assert_eq!(player.mouse_state(), Some(motion(5.0)));
    }

    #[test]
    fn event_hook_can_remove_itself() {
        let mut player = player_with(simple_scene().0);
        let calls = Rc::new(RefCell::new(0_u32));
        let c = calls.clone();
        player.set_event_hook(move |p: &mut Player, _: &Event| {
            *c.borrow_mut() += 1;
            p.clear_event_hook();
            Ok(true)
        });

        player.dispatch_event(motion(5.0)).unwrap();
        player.dispatch_event(motion(6.0)).unwrap();
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn unhandled_escape_stops_player() {
        let mut player = player_with(simple_scene().0);
        player.set_stop_on_escape(true);
        player.dispatch_event(KeyEvent::down(KeyCode::Escape)).unwrap();
        assert_eq!(player.state(), PlayerState::Idle);
        assert!(player.scene().is_none());
    }

    #[test]
    fn handled_or_disabled_escape_is_ignored() {
        let (mut scene, root, _node) = simple_scene();
        scene.set_handler(root, |_: &mut Player, _, event: &Event| {
            Ok(matches!(event, Event::Key(_)))
        });
        let mut player = player_with(scene);
        player.set_stop_on_escape(true);
        player.dispatch_event(KeyEvent::down(KeyCode::Escape)).unwrap();
        assert_eq!(player.state(), PlayerState::Initialized);

        let mut player = player_with(simple_scene().0);
        player.set_stop_on_escape(false);
        player.dispatch_event(KeyEvent::down(KeyCode::Escape)).unwrap();
        player.dispatch_event(KeyEvent::up(KeyCode::Escape)).unwrap();
        assert_eq!(player.state(), PlayerState::Initialized);
    }

    #[test]
    fn quit_stops_player() {
        let mut player = player_with(simple_scene().0);
        player.dispatch_event(Event::Quit).unwrap();
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    #[should_panic(expected = "event dispatched with no scene loaded")]
    fn dispatch_without_scene_panics() {
        let mut player = Player::new(PlayerConfig::default(), surface(&call_log()));
        let _ = player.dispatch_event(Event::Quit);
    }

    #[test]
    fn destroyed_hover_node_gets_no_out() {
        let (mut scene, root, a, b) = two_images();
        let seen = Seen::default();
        for node in [root, a, b] {
            record(&mut scene, node, &seen);
        }
        let mut player = player_with(scene);
        player.dispatch_event(motion(5.0)).unwrap();
        player.scene_mut().unwrap().destroy_node(a);
        seen.borrow_mut().clear();

        player.dispatch_event(motion(25.0)).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![
                (b, CursorEventKind::Over),
                (b, CursorEventKind::Motion),
                (root, CursorEventKind::Motion),
            ]
        );
    }

    #[test]
    fn receiver_confines_hit_testing() {
        let (mut scene, root) = Scene::with_root();
        let panel = scene.create_node(NodeKind::Group, Rect::new(0.0, 0.0, 15.0, 15.0));
        let inner = scene.create_node(NodeKind::Image, Rect::new(0.0, 0.0, 10.0, 10.0));
        let outside = scene.create_node(NodeKind::Image, Rect::new(20.0, 0.0, 30.0, 10.0));
        scene.add_child(root, panel);
        scene.add_child(panel, inner);
        scene.add_child(root, outside);
        let seen = Seen::default();
        for node in [root, panel, inner, outside] {
            record(&mut scene, node, &seen);
        }
        let mut player = player_with(scene);

        player.route_event(motion(25.0).into(), Some(panel)).unwrap();
        assert!(seen.borrow().is_empty());

        player.route_event(motion(5.0).into(), Some(panel)).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![
                (inner, CursorEventKind::Over),
                (panel, CursorEventKind::Over),
                (inner, CursorEventKind::Motion),
                (panel, CursorEventKind::Motion),
            ]
        );
    }

    #[test]
    fn refresh_hover_notices_moved_nodes() {
        let (mut scene, root, a, _b) = two_images();
        let seen = Seen::default();
        record(&mut scene, root, &seen);
        record(&mut scene, a, &seen);
        let mut player = player_with(scene);
        player.dispatch_event(motion(5.0)).unwrap();
        seen.borrow_mut().clear();

        player
            .scene_mut()
            .unwrap()
            .set_bounds(a, Rect::new(100.0, 100.0, 110.0, 110.0));
        player.refresh_hover().unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![(a, CursorEventKind::Out), (root, CursorEventKind::Out)]
        );

        seen.borrow_mut().clear();
        player.refresh_hover().unwrap();
        assert!(seen.borrow().is_empty(), "nothing changed since");
    }

    #[test]
    fn targeted_event_goes_straight_to_target() {
        let (mut scene, root, a, b) = two_images();
        let seen = Seen::default();
        for node in [root, a, b] {
            record(&mut scene, node, &seen);
        }
        let mut player = player_with(scene);
        let event = motion(5.0).retarget(CursorEventKind::Over, b);

        player.dispatch_event(event).unwrap();
        assert_eq!(*seen.borrow(), vec![(b, CursorEventKind::Over)]);
        assert_eq!(player.mouse_state(), None, "targeted events are not mouse state");
    }
}

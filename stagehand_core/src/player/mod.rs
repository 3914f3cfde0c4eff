// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The player: owner of the scene, the frame loop, and everything callbacks
//! can reach.
//!
//! A [`Player`] is constructed explicitly by the application and owned by
//! it. Callbacks (timers, hooks, event handlers) receive `&mut Player` and
//! may re-enter any of its operations: schedule or cancel timers, capture
//! cursors, load another scene, create or delete canvases, or stop playback.
//! While a callback runs it is moved out of the structure that owns it and
//! moved back afterwards only if that structure still wants it.
//!
//! # States
//!
//! ```text
//! Idle ──load_scene──► Initialized ──start──► Running ──stop──► Stopping
//!  ▲                        │                                      │
//!  └──────────stop──────────┘◄──────────── teardown ◄──────────────┘
//! ```
//!
//! [`Player::start`] blocks for the whole run. [`Player::stop`] from inside
//! a callback only requests the stop; the frame in progress completes and
//! the loop exits at the top of the next iteration.

mod config;
mod router;
mod run;
#[cfg(test)]
pub(crate) mod testing;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

pub use config::{AudioParams, DisplayParams, PlayerConfig};

use crate::backend::{AudioOutput, DisplaySurface, InputSource};
use crate::canvas::{CanvasGraph, CanvasId};
use crate::capture::CaptureTable;
use crate::cursor::CursorTracker;
use crate::error::{CallbackError, CanvasError, CaptureError, PlayerError, Resource};
use crate::event::{CursorEvent, CursorId, Event};
use crate::hooks::{HookId, HookList};
use crate::node::{NodeId, NodeStore};
use crate::pacing::{FrameClock, FramePacing, FrameStats, JitterStats};
use crate::time::{Duration, HostTime};
use crate::timer::{TimeoutId, TimerHost, TimerQueue};
use crate::trace::{TraceSink, Tracer};

#[cfg(feature = "trace-rich")]
use crate::trace::{CanvasRendered, EventRouted};

/// Scene tree whose handlers receive the player.
pub type Scene = NodeStore<Player>;

/// Pre-dispatch hook. Returning `Ok(true)` consumes the event.
pub type EventHook = Box<dyn FnMut(&mut Player, &Event) -> Result<bool, CallbackError>>;

static LIVE_PLAYERS: AtomicUsize = AtomicUsize::new(0);

/// Lifecycle state of a [`Player`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayerState {
    /// No scene loaded.
    Idle,
    /// A scene is loaded; the frame loop is not running.
    Initialized,
    /// The frame loop is running.
    Running,
    /// A stop was requested; the loop exits after the current frame.
    Stopping,
}

struct InputSlot {
    source: Box<dyn InputSource>,
    started: bool,
}

/// Drives a scene through a timed sequence of frames.
pub struct Player {
    config: PlayerConfig,
    state: PlayerState,

    // -- Collaborators --
    surface: Box<dyn DisplaySurface>,
    surface_acquired: bool,
    audio: Option<Box<dyn AudioOutput>>,
    audio_acquired: bool,
    inputs: Vec<InputSlot>,
    injected: Vec<Event>,

    // -- Scene state --
    scene: Option<Scene>,
    timers: TimerQueue<Self>,
    captures: CaptureTable,
    cursors: CursorTracker,
    canvases: CanvasGraph,
    last_mouse: Option<CursorEvent>,

    // -- Callbacks --
    pre_render_hooks: HookList<Self>,
    frame_end_hooks: HookList<Self>,
    playback_end_hooks: HookList<Self>,
    event_hook: Option<EventHook>,
    event_hook_epoch: u32,
    stop_on_escape: bool,

    // -- Timing --
    clock: FrameClock,
    jitter: JitterStats,
    frame_index: u64,
    playback_started: bool,

    trace: Option<Box<dyn TraceSink>>,
    #[cfg(feature = "trace-rich")]
    routed: Vec<EventRouted>,
    #[cfg(feature = "trace-rich")]
    rendered: Vec<CanvasRendered>,
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("state", &self.state)
            .field("scene", &self.scene.as_ref().map(Scene::node_count))
            .field("timers", &self.timers)
            .field("canvases", &self.canvases.len())
            .field("inputs", &self.inputs.len())
            .field("frame_time", &self.clock.time())
            .finish_non_exhaustive()
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        LIVE_PLAYERS.fetch_sub(1, Ordering::Relaxed);
    }
}

impl TimerHost for Player {
    fn timers(&mut self) -> &mut TimerQueue<Self> {
        &mut self.timers
    }

    fn is_stopping(&self) -> bool {
        self.state == PlayerState::Stopping
    }
}

fn pre_render_hooks(p: &mut Player) -> &mut HookList<Player> {
    &mut p.pre_render_hooks
}

fn frame_end_hooks(p: &mut Player) -> &mut HookList<Player> {
    &mut p.frame_end_hooks
}

fn playback_end_hooks(p: &mut Player) -> &mut HookList<Player> {
    &mut p.playback_end_hooks
}

impl Player {
    /// Creates an idle player presenting to `surface`.
    #[must_use]
    pub fn new(config: PlayerConfig, surface: Box<dyn DisplaySurface>) -> Self {
        LIVE_PLAYERS.fetch_add(1, Ordering::Relaxed);
        Self {
            config,
            state: PlayerState::Idle,
            surface,
            surface_acquired: false,
            audio: None,
            audio_acquired: false,
            inputs: Vec::new(),
            injected: Vec::new(),
            scene: None,
            timers: TimerQueue::new(),
            captures: CaptureTable::new(),
            cursors: CursorTracker::new(),
            canvases: CanvasGraph::new(),
            last_mouse: None,
            pre_render_hooks: HookList::new(),
            frame_end_hooks: HookList::new(),
            playback_end_hooks: HookList::new(),
            event_hook: None,
            event_hook_epoch: 0,
            stop_on_escape: config.stop_on_escape,
            clock: FrameClock::new(config.pacing),
            jitter: JitterStats::new(config.jitter_alpha),
            frame_index: 0,
            playback_started: false,
            trace: None,
            #[cfg(feature = "trace-rich")]
            routed: Vec::new(),
            #[cfg(feature = "trace-rich")]
            rendered: Vec::new(),
        }
    }

    /// Whether any player is alive in this process.
    #[must_use]
    pub fn exists() -> bool {
        LIVE_PLAYERS.load(Ordering::Relaxed) > 0
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Whether the frame loop is active (running or finishing its last
    /// frame).
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.state, PlayerState::Running | PlayerState::Stopping)
    }

    /// The configuration the player was created with, as modified since.
    #[must_use]
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    // -- Scene --

    /// Replaces the scene.
    ///
    /// Hover and capture state of the previous scene is dropped. Loading
    /// while running is allowed; the new scene is used from the next routing
    /// step on.
    ///
    /// # Errors
    ///
    /// [`PlayerError::NoScene`] if the scene has no root node.
    pub fn load_scene(&mut self, scene: Scene) -> Result<(), PlayerError> {
        if scene.root().is_none() {
            return Err(PlayerError::NoScene);
        }
        log::debug!("loading scene with {} nodes", scene.node_count());
        self.scene = Some(scene);
        self.cursors.clear();
        self.captures.clear();
        if self.state == PlayerState::Idle {
            self.state = PlayerState::Initialized;
        }
        Ok(())
    }

    /// The loaded scene.
    #[must_use]
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    /// The loaded scene, for modification.
    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    fn is_node_alive(&self, node: NodeId) -> bool {
        self.scene.as_ref().is_some_and(|s| s.is_alive(node))
    }

    // -- Timers --

    /// Schedules `callback` to run `delay` after the current frame time.
    ///
    /// A periodic timeout fires again every `delay` until cancelled.
    pub fn schedule_timeout<F>(&mut self, delay: Duration, periodic: bool, callback: F) -> TimeoutId
    where
        F: FnMut(&mut Self) -> Result<(), CallbackError> + 'static,
    {
        let fire_time = self.clock.time().saturating_add(delay);
        let interval = periodic.then_some(delay);
        self.timers.schedule(fire_time, interval, callback)
    }

    /// Runs `callback` once, `delay` after the current frame time.
    pub fn set_timeout<F>(&mut self, delay: Duration, callback: F) -> TimeoutId
    where
        F: FnMut(&mut Self) -> Result<(), CallbackError> + 'static,
    {
        self.schedule_timeout(delay, false, callback)
    }

    /// Runs `callback` every `period`.
    pub fn set_interval<F>(&mut self, period: Duration, callback: F) -> TimeoutId
    where
        F: FnMut(&mut Self) -> Result<(), CallbackError> + 'static,
    {
        self.schedule_timeout(period, true, callback)
    }

    /// Runs `callback` once per frame, starting with the next frame.
    pub fn set_on_frame_handler<F>(&mut self, callback: F) -> TimeoutId
    where
        F: FnMut(&mut Self) -> Result<(), CallbackError> + 'static,
    {
        self.schedule_timeout(Duration::ZERO, true, callback)
    }

    /// Cancels a timeout. Returns whether it was still scheduled.
    pub fn cancel_timeout(&mut self, id: TimeoutId) -> bool {
        self.timers.cancel(id)
    }

    // -- Capture --

    /// Routes every event of `cursor` to `node` and its ancestors.
    ///
    /// # Errors
    ///
    /// [`CaptureError::AlreadyCaptured`] if another live node holds the
    /// cursor.
    pub fn capture_cursor(&mut self, node: NodeId, cursor: CursorId) -> Result<(), CaptureError> {
        let scene = self.scene.as_ref();
        self.captures
            .acquire(node, cursor, |n| scene.is_some_and(|s| s.is_alive(n)))
    }

    /// Undoes one [`capture_cursor`](Self::capture_cursor).
    ///
    /// # Errors
    ///
    /// [`CaptureError::NotCaptured`] if no live node holds the cursor.
    pub fn release_cursor(&mut self, cursor: CursorId) -> Result<(), CaptureError> {
        let scene = self.scene.as_ref();
        self.captures
            .release(cursor, |n| scene.is_some_and(|s| s.is_alive(n)))
    }

    /// The live node capturing `cursor`, if any.
    pub fn capturing_node(&mut self, cursor: CursorId) -> Option<NodeId> {
        let scene = self.scene.as_ref();
        self.captures
            .capturing_node(cursor, |n| scene.is_some_and(|s| s.is_alive(n)))
    }

    /// Whether a live node captures `cursor`.
    pub fn is_captured(&mut self, cursor: CursorId) -> bool {
        self.capturing_node(cursor).is_some()
    }

    // -- Canvases --

    /// Registers an off-screen canvas.
    ///
    /// # Errors
    ///
    /// [`CanvasError::DuplicateName`] if the name is taken.
    pub fn create_canvas(
        &mut self,
        name: &str,
        auto_render: bool,
    ) -> Result<CanvasId, CanvasError> {
        self.canvases.create_canvas(name, auto_render)
    }

    /// Removes an off-screen canvas.
    ///
    /// # Errors
    ///
    /// See [`CanvasGraph::remove_canvas`].
    pub fn delete_canvas(&mut self, id: CanvasId) -> Result<(), CanvasError> {
        self.canvases.remove_canvas(id)
    }

    /// Records that `dependent` samples `dependency`.
    ///
    /// # Errors
    ///
    /// See [`CanvasGraph::register_dependency`].
    pub fn register_canvas_dependency(
        &mut self,
        dependent: CanvasId,
        dependency: CanvasId,
    ) -> Result<(), CanvasError> {
        self.canvases.register_dependency(dependent, dependency)
    }

    /// The canvas graph.
    #[must_use]
    pub fn canvases(&self) -> &CanvasGraph {
        &self.canvases
    }

    /// The canvas graph, for attaching sources or toggling auto-render.
    pub fn canvases_mut(&mut self) -> &mut CanvasGraph {
        &mut self.canvases
    }

    // -- Hooks --

    /// Adds a hook that runs right before the primary canvas renders.
    pub fn add_pre_render_hook<F>(&mut self, hook: F) -> HookId
    where
        F: FnMut(&mut Self) -> Result<(), CallbackError> + 'static,
    {
        self.pre_render_hooks.add(hook)
    }

    /// Removes a pre-render hook.
    pub fn remove_pre_render_hook(&mut self, id: HookId) -> bool {
        self.pre_render_hooks.remove(id)
    }

    /// Adds a hook that runs after the primary canvas rendered, before the
    /// frame is presented.
    pub fn add_frame_end_hook<F>(&mut self, hook: F) -> HookId
    where
        F: FnMut(&mut Self) -> Result<(), CallbackError> + 'static,
    {
        self.frame_end_hooks.add(hook)
    }

    /// Removes a frame-end hook.
    pub fn remove_frame_end_hook(&mut self, id: HookId) -> bool {
        self.frame_end_hooks.remove(id)
    }

    /// Adds a hook that runs when playback ends. Errors from these hooks are
    /// logged, not returned.
    pub fn add_playback_end_hook<F>(&mut self, hook: F) -> HookId
    where
        F: FnMut(&mut Self) -> Result<(), CallbackError> + 'static,
    {
        self.playback_end_hooks.add(hook)
    }

    /// Removes a playback-end hook.
    pub fn remove_playback_end_hook(&mut self, id: HookId) -> bool {
        self.playback_end_hooks.remove(id)
    }

    // -- Input --

    /// Installs the pre-dispatch hook, replacing any previous one. It sees
    /// every event, synthesized enter/leave included, before routing.
    pub fn set_event_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&mut Self, &Event) -> Result<bool, CallbackError> + 'static,
    {
        self.event_hook = Some(Box::new(hook));
        self.event_hook_epoch = self.event_hook_epoch.wrapping_add(1);
    }

    /// Removes the pre-dispatch hook.
    pub fn clear_event_hook(&mut self) {
        self.event_hook = None;
        self.event_hook_epoch = self.event_hook_epoch.wrapping_add(1);
    }

    /// Queues an event for routing in the next frame, ahead of events from
    /// input sources.
    pub fn inject_event(&mut self, event: impl Into<Event>) {
        self.injected.push(event.into());
    }

    /// Registers an input source. Sources are polled in registration order.
    ///
    /// A continuous source added while running is started right away.
    ///
    /// # Errors
    ///
    /// [`PlayerError::Acquire`] if starting the source fails. The source is
    /// not registered.
    pub fn add_input_source(
        &mut self,
        mut source: Box<dyn InputSource>,
    ) -> Result<(), PlayerError> {
        let mut started = false;
        if self.is_running() && source.is_continuous() {
            source.start().map_err(|source| PlayerError::Acquire {
                resource: Resource::Input(self.inputs.len()),
                source,
            })?;
            started = true;
        }
        self.inputs.push(InputSlot { source, started });
        Ok(())
    }

    /// Number of registered input sources.
    #[must_use]
    pub fn input_source_count(&self) -> usize {
        self.inputs.len()
    }

    /// Whether an unhandled escape key press stops playback.
    #[must_use]
    pub fn stop_on_escape(&self) -> bool {
        self.stop_on_escape
    }

    /// Sets the escape policy.
    pub fn set_stop_on_escape(&mut self, stop: bool) {
        self.stop_on_escape = stop;
    }

    /// The last event a mouse produced.
    #[must_use]
    pub fn mouse_state(&self) -> Option<CursorEvent> {
        self.last_mouse
    }

    // -- Audio --

    /// Sets the audio output used from the next [`start`](Self::start) on.
    ///
    /// An output acquired by the current run is released first.
    pub fn set_audio_output(&mut self, audio: Box<dyn AudioOutput>) {
        if core::mem::take(&mut self.audio_acquired) {
            if let Some(old) = self.audio.as_mut() {
                old.release();
            }
        }
        self.audio = Some(audio);
    }

    /// Sets the master volume, now and for future runs.
    pub fn set_volume(&mut self, volume: f32) {
        self.config.audio.volume = volume;
        if self.audio_acquired {
            if let Some(audio) = self.audio.as_mut() {
                audio.set_volume(volume);
            }
        }
    }

    // -- Timing --

    /// Time of the current frame; zero outside playback.
    #[must_use]
    pub fn frame_time(&self) -> HostTime {
        self.clock.time()
    }

    /// Length of a frame: the nominal length under fixed pacing, otherwise
    /// derived from the measured frame rate. Zero outside playback.
    #[must_use]
    pub fn frame_duration(&self) -> Duration {
        if !self.is_running() {
            return Duration::ZERO;
        }
        match self.clock.pacing() {
            FramePacing::Fixed { fps } => Duration::from_frame_rate(fps),
            FramePacing::Display => Duration::from_frame_rate(self.jitter.effective_framerate()),
        }
    }

    /// Frames per second actually achieved; the nominal rate under fixed
    /// pacing. Zero outside playback.
    #[must_use]
    pub fn effective_framerate(&self) -> f64 {
        if !self.is_running() {
            return 0.0;
        }
        match self.clock.pacing() {
            FramePacing::Fixed { fps } => fps,
            FramePacing::Display => self.jitter.effective_framerate(),
        }
    }

    /// Presentation statistics of the current run.
    #[must_use]
    pub fn frame_stats(&self) -> FrameStats {
        self.jitter.stats()
    }

    /// Switches to fixed pacing at `fps`, or back to display pacing with
    /// `None`.
    pub fn set_fixed_rate(&mut self, fps: Option<f64>) {
        let pacing = match fps {
            Some(fps) => FramePacing::Fixed { fps },
            None => FramePacing::Display,
        };
        self.config.pacing = pacing;
        self.clock.set_pacing(pacing);
    }

    /// Length of one frame as the loop intends it.
    fn nominal_frame_duration(&self) -> Duration {
        match self.clock.pacing() {
            FramePacing::Fixed { fps } => Duration::from_frame_rate(fps),
            FramePacing::Display if self.config.display.frame_rate > 0.0 => {
                Duration::from_frame_rate(self.config.display.frame_rate)
            }
            FramePacing::Display => Duration::from_frame_rate(self.surface.refresh_rate()),
        }
    }

    // -- Tracing --

    /// Installs a trace sink, returning the previous one. Events are only
    /// emitted when the `trace` feature is enabled.
    pub fn set_trace_sink(
        &mut self,
        sink: Option<Box<dyn TraceSink>>,
    ) -> Option<Box<dyn TraceSink>> {
        core::mem::replace(&mut self.trace, sink)
    }

    fn tracer(&mut self) -> Tracer<'_> {
        match self.trace.as_deref_mut() {
            Some(sink) => Tracer::new(sink),
            None => Tracer::none(),
        }
    }
}


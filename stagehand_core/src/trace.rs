// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! player calls at each stage of a frame. All method bodies default to
//! no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! [`FrameSummaryBuilder`] collects phase timestamps during a frame and
//! produces a [`FrameSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates [`EventRouted`] and
//!   [`CanvasRendered`] records plus the corresponding `TraceSink` methods.

use crate::time::HostTime;

#[cfg(feature = "trace-rich")]
use crate::canvas::CanvasId;
#[cfg(feature = "trace-rich")]
use crate::event::CursorId;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of the frame loop is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Due timer callbacks.
    Timers,
    /// Input polling and routing, including hover refresh.
    Input,
    /// Off-screen canvas rendering.
    Offscreen,
    /// Pre-render hooks and primary canvas rendering.
    Main,
    /// End-of-frame hooks.
    Hooks,
    /// Waiting for the frame boundary and presenting.
    Present,
}

impl PhaseKind {
    /// Every phase, in frame order.
    pub const ALL: [Self; 6] = [
        Self::Timers,
        Self::Input,
        Self::Offscreen,
        Self::Main,
        Self::Hooks,
        Self::Present,
    ];

    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Timers => "timers",
            Self::Input => "input",
            Self::Offscreen => "offscreen",
            Self::Main => "main",
            Self::Hooks => "hooks",
            Self::Present => "present",
        }
    }
}

/// Kind of a routed event.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoutedKind {
    /// A cursor event.
    Cursor,
    /// A keyboard event.
    Key,
    /// A quit request.
    Quit,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted at the start of every frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameBeginEvent {
    /// Frame counter since playback started.
    pub frame_index: u64,
    /// Frame time exposed to callbacks for this frame.
    pub frame_time: HostTime,
    /// Display time when the frame began.
    pub now: HostTime,
}

/// Marks the beginning of a frame-loop phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Display time at the start of the phase.
    pub timestamp: HostTime,
}

/// Marks the end of a frame-loop phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Display time at the end of the phase.
    pub timestamp: HostTime,
}

/// Emitted after a frame has been presented.
#[derive(Clone, Copy, Debug)]
pub struct PresentEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Display time right after presenting.
    pub presented_at: HostTime,
    /// Deviation of the present interval from the nominal frame duration.
    pub jitter_ticks: u64,
    /// Whether the display reported the frame as late.
    pub late: bool,
}

/// Per-frame timing summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Frame time exposed to callbacks.
    pub frame_time: HostTime,
    /// Display time when the frame began.
    pub now: HostTime,
    /// Timer phase duration in ticks (0 if not measured).
    pub timers_ticks: u64,
    /// Input phase duration in ticks (0 if not measured).
    pub input_ticks: u64,
    /// Off-screen phase duration in ticks (0 if not measured).
    pub offscreen_ticks: u64,
    /// Main phase duration in ticks (0 if not measured).
    pub main_ticks: u64,
    /// Hook phase duration in ticks (0 if not measured).
    pub hooks_ticks: u64,
    /// Present phase duration in ticks (0 if not measured).
    pub present_ticks: u64,
    /// Timer callbacks fired this frame.
    pub timers_fired: u32,
    /// Input events routed this frame (synthesized hover refreshes excluded).
    pub events_routed: u32,
    /// Whether the display reported the frame as late.
    pub late: bool,
}

/// One routed event (requires `trace-rich` feature).
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct EventRouted {
    /// What kind of event.
    pub kind: RoutedKind,
    /// The cursor, for cursor events.
    pub cursor: Option<CursorId>,
    /// Whether the pre-dispatch hook consumed the event.
    pub intercepted: bool,
}

/// One off-screen canvas render (requires `trace-rich` feature).
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct CanvasRendered {
    /// The canvas.
    pub canvas: CanvasId,
    /// How many times it rendered this frame.
    pub renders: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the frame loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called at the start of a frame.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of a frame-loop phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a frame-loop phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called after a frame is presented.
    fn on_present(&mut self, e: &PresentEvent) {
        _ = e;
    }

    /// Called with a per-frame timing summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }

    /// Called with the events routed during a frame (requires `trace-rich`
    /// feature).
    #[cfg(feature = "trace-rich")]
    fn on_events_routed(&mut self, frame_index: u64, events: &[EventRouted]) {
        _ = (frame_index, events);
    }

    /// Called with the off-screen renders of a frame (requires `trace-rich`
    /// feature).
    #[cfg(feature = "trace-rich")]
    fn on_canvases_rendered(&mut self, frame_index: u64, renders: &[CanvasRendered]) {
        _ = (frame_index, renders);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameBeginEvent`].
    #[inline]
    pub fn frame_begin(&mut self, e: &FrameBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PresentEvent`].
    #[inline]
    pub fn present(&mut self, e: &PresentEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_present(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits routed events (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn events_routed(&mut self, frame_index: u64, events: &[EventRouted]) {
        if let Some(s) = &mut self.sink {
            s.on_events_routed(frame_index, events);
        }
    }

    /// Emits off-screen renders (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn canvases_rendered(&mut self, frame_index: u64, renders: &[CanvasRendered]) {
        if let Some(s) = &mut self.sink {
            s.on_canvases_rendered(frame_index, renders);
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps during a frame and produces a [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    begin: FrameBeginEvent,
    phase_starts: [Option<HostTime>; 6],
    phase_ends: [Option<HostTime>; 6],
    timers_fired: u32,
    events_routed: u32,
    late: bool,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for the frame that `begin` opened.
    #[must_use]
    pub fn new(begin: &FrameBeginEvent) -> Self {
        Self {
            begin: *begin,
            phase_starts: [None; 6],
            phase_ends: [None; 6],
            timers_fired: 0,
            events_routed: 0,
            late: false,
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: HostTime) {
        self.phase_starts[phase_index(phase)] = Some(t);
    }

    /// Records the end of a phase.
    pub fn phase_end(&mut self, phase: PhaseKind, t: HostTime) {
        self.phase_ends[phase_index(phase)] = Some(t);
    }

    /// Sets the number of timer callbacks fired.
    pub fn set_timers_fired(&mut self, n: u32) {
        self.timers_fired = n;
    }

    /// Sets the number of input events routed.
    pub fn set_events_routed(&mut self, n: u32) {
        self.events_routed = n;
    }

    /// Sets whether the frame was late.
    pub fn set_late(&mut self, late: bool) {
        self.late = late;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        FrameSummary {
            frame_index: self.begin.frame_index,
            frame_time: self.begin.frame_time,
            now: self.begin.now,
            timers_ticks: self.phase_duration(PhaseKind::Timers),
            input_ticks: self.phase_duration(PhaseKind::Input),
            offscreen_ticks: self.phase_duration(PhaseKind::Offscreen),
            main_ticks: self.phase_duration(PhaseKind::Main),
            hooks_ticks: self.phase_duration(PhaseKind::Hooks),
            present_ticks: self.phase_duration(PhaseKind::Present),
            timers_fired: self.timers_fired,
            events_routed: self.events_routed,
            late: self.late,
        }
    }

    fn phase_duration(&self, phase: PhaseKind) -> u64 {
        let idx = phase_index(phase);
        match (self.phase_starts[idx], self.phase_ends[idx]) {
            (Some(start), Some(end)) => end.saturating_duration_since(start).ticks(),
            _ => 0,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::Timers => 0,
        PhaseKind::Input => 1,
        PhaseKind::Offscreen => 2,
        PhaseKind::Main => 3,
        PhaseKind::Hooks => 4,
        PhaseKind::Present => 5,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame loop and input routing for a real-time presentation player.
//!
//! `stagehand_core` drives a scene of nodes through a timed sequence of
//! frames. Each frame it fires due timers, routes input to nodes, renders
//! off-screen canvases in dependency order, renders the primary canvas, and
//! presents. It is `no_std` compatible (with `alloc`); everything that
//! touches a window, an audio device, or an input driver sits behind the
//! traits in [`backend`].
//!
//! # Architecture
//!
//! ```text
//!   DisplaySurface::display_time()
//!       │
//!       ▼
//!   FrameClock::advance() ──► frame time
//!       │
//!       ▼
//!   TimerQueue::run_due_pass()            timers fire, earliest first
//!       │
//!       ▼
//!   InputSource::poll_events() ──► router ──► node handlers
//!       │                          (hit test, Over/Out, capture)
//!       ▼
//!   CanvasGraph order ──► DisplaySurface::render_canvas()
//!       │
//!       ▼
//!   pre-render hooks ──► render_main() ──► frame-end hooks
//!       │
//!       ▼
//!   wait_for_frame_boundary() ──► present() ──► JitterStats::record()
//! ```
//!
//! **[`player`]** — The [`Player`](player::Player): lifecycle, frame loop,
//! event routing, and the operations callbacks may re-enter.
//!
//! **[`node`]** — Struct-of-arrays scene tree with generational handles and
//! hit testing.
//!
//! **[`timer`]** — Ordered queue of one-shot and periodic timeouts that
//! tolerates schedule and cancel calls from inside its own callbacks.
//!
//! **[`hooks`]** — Ordered per-frame hook lists with the same re-entrancy
//! rules.
//!
//! **[`capture`]** and **[`cursor`]** — Per-cursor capture and hover state.
//!
//! **[`canvas`]** — Off-screen canvas registry and render ordering.
//!
//! **[`pacing`]** — Frame clock and presentation jitter statistics.
//!
//! **[`time`]** — Host time and durations.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-event
//!   routing and per-canvas render records.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backend;
pub mod canvas;
pub mod capture;
pub mod cursor;
pub mod error;
pub mod event;
pub mod hooks;
pub mod node;
pub mod pacing;
pub mod player;
pub mod time;
pub mod timer;
pub mod trace;

// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for platform integrations.
//!
//! The player drives four kinds of external collaborators, each behind a
//! trait so that platform glue and test doubles plug in the same way:
//!
//! - **[`DisplaySurface`]** — The window or screen. Reports display time,
//!   renders the primary and off-screen canvases, waits for the frame
//!   boundary, and presents.
//!
//! - **[`AudioOutput`]** — Brought up before the first frame and torn down
//!   with the player. Mixing happens on the backend's own thread.
//!
//! - **[`InputSource`]** — Mouse, keyboard, touch, or tracker drivers. The
//!   player polls each source once per frame; sources never call into the
//!   player.
//!
//! - **[`FrameSource`]** — A live producer (camera, video decoder) feeding an
//!   off-screen canvas. Polled for "is a new frame available"; any
//!   background work it does stays behind that query.
//!
//! # Crate boundaries
//!
//! `stagehand_core` owns scheduling, routing, and this contract module.
//! Backend crates implement the traits; application code hands the
//! implementations to a [`Player`](crate::player::Player).
//!
//! # Frame loop pseudocode
//!
//! ```rust,ignore
//! surface.acquire(&display)?;
//! audio.acquire(&audio_params)?;
//! loop {
//!     let now = surface.display_time();
//!     // timers, input, ...
//!     for canvas in render_order {
//!         surface.render_canvas(canvas, frame_time)?;
//!     }
//!     surface.render_main(frame_time)?;
//!     surface.wait_for_frame_boundary(next_boundary)?;
//!     surface.present()?;
//!     let late = surface.was_last_frame_late();
//! }
//! ```

use alloc::vec::Vec;

use crate::canvas::CanvasId;
use crate::error::{AcquireError, SurfaceError};
use crate::event::Event;
use crate::node::NodeId;
use crate::player::{AudioParams, DisplayParams};
use crate::time::{HostTime, Timebase};

/// The render target the player presents to.
pub trait DisplaySurface {
    /// Opens the window or display mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be brought up.
    fn acquire(&mut self, params: &DisplayParams) -> Result<(), AcquireError>;

    /// Closes whatever [`acquire`](Self::acquire) opened.
    fn release(&mut self);

    /// Current display time in native ticks.
    fn display_time(&self) -> HostTime;

    /// Conversion from [`display_time`](Self::display_time) ticks to
    /// nanoseconds.
    fn timebase(&self) -> Timebase {
        Timebase::NANOS
    }

    /// Refresh rate of the display in Hz, or zero if unknown.
    fn refresh_rate(&self) -> f64;

    /// Renders one off-screen canvas for the frame at `frame_time`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render_canvas(&mut self, canvas: CanvasId, frame_time: HostTime) -> Result<(), SurfaceError>;

    /// Renders the primary canvas for the frame at `frame_time`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render_main(&mut self, frame_time: HostTime) -> Result<(), SurfaceError>;

    /// Blocks until the display is ready for the next frame. `target` is the
    /// intended boundary in [`display_time`](Self::display_time) ticks.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface was lost while waiting.
    fn wait_for_frame_boundary(&mut self, target: HostTime) -> Result<(), SurfaceError>;

    /// Makes the rendered frame visible.
    ///
    /// # Errors
    ///
    /// Returns an error if presentation fails.
    fn present(&mut self) -> Result<(), SurfaceError>;

    /// Whether the frame presented last missed its boundary.
    fn was_last_frame_late(&self) -> bool;
}

/// Sound output.
pub trait AudioOutput {
    /// Opens the audio device.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable device is available.
    fn acquire(&mut self, params: &AudioParams) -> Result<(), AcquireError>;

    /// Closes the audio device.
    fn release(&mut self);

    /// Sets the master volume (0.0 to 1.0).
    fn set_volume(&mut self, volume: f32);
}

/// A device that produces input events.
pub trait InputSource {
    /// Whether the source must be started before it produces events (e.g. a
    /// multitouch driver with its own capture thread).
    fn is_continuous(&self) -> bool {
        false
    }

    /// Starts a continuous source.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened.
    fn start(&mut self) -> Result<(), AcquireError> {
        Ok(())
    }

    /// Stops a continuous source.
    fn stop(&mut self) {}

    /// Appends every event that arrived since the last poll, in arrival
    /// order.
    fn poll_events(&mut self, out: &mut Vec<Event>);

    /// Subtree this source's cursor events are confined to. `None` means the
    /// whole scene.
    fn receiver(&self) -> Option<NodeId> {
        None
    }
}

/// A live producer of frames for an off-screen canvas.
pub trait FrameSource {
    /// Takes the next available frame. Returns `false` when none is ready.
    fn poll_frame(&mut self) -> bool;
}

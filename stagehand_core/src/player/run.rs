// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame loop, resource acquisition, and teardown.

use alloc::vec::Vec;

use super::{Player, PlayerState, frame_end_hooks, playback_end_hooks, pre_render_hooks};
use crate::error::{PlayerError, Resource};
use crate::event::Event;
use crate::hooks::HookList;
use crate::node::NodeId;
use crate::time::HostTime;
use crate::timer::TimerQueue;
use crate::trace::{
    FrameBeginEvent, FrameSummaryBuilder, PhaseBeginEvent, PhaseEndEvent, PhaseKind, PresentEvent,
};

#[cfg(feature = "trace-rich")]
use crate::trace::CanvasRendered;

impl Player {
    /// Runs the frame loop until playback stops.
    ///
    /// Acquires the display surface, the audio output, and every continuous
    /// input source, renders frames until [`stop`](Self::stop) is requested,
    /// then tears everything down and returns to [`PlayerState::Idle`].
    ///
    /// # Errors
    ///
    /// - [`PlayerError::NoScene`] if no scene is loaded.
    /// - [`PlayerError::AlreadyRunning`] when called from inside the loop.
    /// - [`PlayerError::Acquire`] if a resource cannot be brought up. Whatever
    ///   was acquired before is released again.
    /// - Any error a callback or the surface reports during a frame. The
    ///   player is torn down before the error is returned.
    pub fn start(&mut self) -> Result<(), PlayerError> {
        match self.state {
            PlayerState::Idle => return Err(PlayerError::NoScene),
            PlayerState::Running | PlayerState::Stopping => {
                return Err(PlayerError::AlreadyRunning);
            }
            PlayerState::Initialized => {}
        }
        if let Err(err) = self.init_playback() {
            log::error!("playback could not start: {err}");
            self.teardown();
            return Err(err);
        }

        log::info!("playback started");
        let result = self.run_frames();
        if let Err(err) = &result {
            log::error!(
                "frame {} failed, tearing down: {err}",
                self.frame_index.saturating_sub(1)
            );
        }
        self.teardown();
        log::info!("playback ended after {} frames", self.frame_index);
        result
    }

    /// Requests the end of playback.
    ///
    /// While the loop runs this only flags the request; the current frame
    /// completes first. Outside the loop the player is torn down at once:
    /// the scene is dropped and the state returns to [`PlayerState::Idle`].
    pub fn stop(&mut self) {
        match self.state {
            PlayerState::Running => {
                log::debug!("stop requested");
                self.state = PlayerState::Stopping;
            }
            PlayerState::Stopping => {}
            PlayerState::Idle | PlayerState::Initialized => self.teardown(),
        }
    }

    fn init_playback(&mut self) -> Result<(), PlayerError> {
        self.surface
            .acquire(&self.config.display)
            .map_err(|source| PlayerError::Acquire {
                resource: Resource::Surface,
                source,
            })?;
        self.surface_acquired = true;

        if let Some(audio) = self.audio.as_mut() {
            audio
                .acquire(&self.config.audio)
                .map_err(|source| PlayerError::Acquire {
                    resource: Resource::Audio,
                    source,
                })?;
            audio.set_volume(self.config.audio.volume);
            self.audio_acquired = true;
        }

        for (idx, slot) in self.inputs.iter_mut().enumerate() {
            if slot.source.is_continuous() {
                slot.source.start().map_err(|source| PlayerError::Acquire {
                    resource: Resource::Input(idx),
                    source,
                })?;
                slot.started = true;
            }
        }

        self.clock.reset();
        self.jitter.reset();
        self.frame_index = 0;
        self.playback_started = true;
        self.state = PlayerState::Running;
        Ok(())
    }

    fn run_frames(&mut self) -> Result<(), PlayerError> {
        self.frame(true)?;
        while self.state == PlayerState::Running {
            self.frame(false)?;
        }
        Ok(())
    }

    /// Releases everything a run holds and returns to idle.
    fn teardown(&mut self) {
        self.state = PlayerState::Stopping;
        if core::mem::take(&mut self.playback_started) {
            if let Err(err) = HookList::run(self, playback_end_hooks) {
                log::error!("playback-end hook failed: {err}");
            }
        }

        self.timers.clear();
        self.captures.clear();
        self.cursors.clear();
        self.canvases.clear();
        self.injected.clear();
        self.last_mouse = None;

        for slot in self.inputs.iter_mut().rev() {
            if core::mem::take(&mut slot.started) {
                slot.source.stop();
            }
        }
        if core::mem::take(&mut self.audio_acquired) {
            if let Some(audio) = self.audio.as_mut() {
                audio.release();
            }
        }
        if core::mem::take(&mut self.surface_acquired) {
            self.surface.release();
        }

        self.scene = None;
        self.clock.reset();
        self.state = PlayerState::Idle;
        log::debug!("player torn down");
    }

    // -- Frame --

    fn frame(&mut self, first: bool) -> Result<(), PlayerError> {
        let timebase = self.surface.timebase();
        let started_at = self.surface.display_time();
        let display_now = HostTime(started_at.to_nanos(timebase));
        if first {
            self.clock.start(display_now);
        } else {
            self.clock.advance(display_now);
        }
        let frame_time = self.clock.time();
        let frame_index = self.frame_index;
        self.frame_index += 1;

        let begin = FrameBeginEvent {
            frame_index,
            frame_time,
            now: started_at,
        };
        self.tracer().frame_begin(&begin);
        let mut summary = FrameSummaryBuilder::new(&begin);

        if !first {
            self.phase_begin(&mut summary, PhaseKind::Timers);
            let fired = TimerQueue::run_due_pass(self, frame_time)?;
            summary.set_timers_fired(u32::try_from(fired).unwrap_or(u32::MAX));
            self.phase_end(&mut summary, PhaseKind::Timers);

            self.phase_begin(&mut summary, PhaseKind::Input);
            let routed = self.route_pending_input()?;
            self.refresh_hover()?;
            summary.set_events_routed(routed);
            self.phase_end(&mut summary, PhaseKind::Input);
        }

        self.phase_begin(&mut summary, PhaseKind::Offscreen);
        self.render_offscreen(frame_time)?;
        self.phase_end(&mut summary, PhaseKind::Offscreen);

        self.phase_begin(&mut summary, PhaseKind::Main);
        HookList::run(self, pre_render_hooks)?;
        self.surface.render_main(frame_time)?;
        self.phase_end(&mut summary, PhaseKind::Main);

        self.phase_begin(&mut summary, PhaseKind::Hooks);
        HookList::run(self, frame_end_hooks)?;
        self.phase_end(&mut summary, PhaseKind::Hooks);

        self.phase_begin(&mut summary, PhaseKind::Present);
        let nominal = self.nominal_frame_duration();
        let boundary = HostTime(
            started_at
                .ticks()
                .saturating_add(HostTime::from_nanos(nominal.ticks(), timebase).ticks()),
        );
        self.surface.wait_for_frame_boundary(boundary)?;
        self.surface.present()?;
        let late = self.surface.was_last_frame_late();
        let presented_at = self.surface.display_time();
        let jitter = self
            .jitter
            .record(HostTime(presented_at.to_nanos(timebase)), nominal, late);
        if late {
            log::warn!(
                "frame {frame_index} was late (jitter {} ms)",
                jitter.as_millis()
            );
        }
        self.phase_end(&mut summary, PhaseKind::Present);

        self.tracer().present(&PresentEvent {
            frame_index,
            presented_at,
            jitter_ticks: jitter.ticks(),
            late,
        });
        #[cfg(feature = "trace-rich")]
        self.flush_rich_trace(frame_index);
        summary.set_late(late);
        let summary = summary.finish();
        self.tracer().frame_summary(&summary);
        Ok(())
    }

    fn phase_begin(&mut self, summary: &mut FrameSummaryBuilder, phase: PhaseKind) {
        let timestamp = self.surface.display_time();
        summary.phase_begin(phase, timestamp);
        let frame_index = self.frame_index - 1;
        self.tracer().phase_begin(&PhaseBeginEvent {
            frame_index,
            phase,
            timestamp,
        });
    }

    fn phase_end(&mut self, summary: &mut FrameSummaryBuilder, phase: PhaseKind) {
        let timestamp = self.surface.display_time();
        summary.phase_end(phase, timestamp);
        let frame_index = self.frame_index - 1;
        self.tracer().phase_end(&PhaseEndEvent {
            frame_index,
            phase,
            timestamp,
        });
    }

    /// Routes injected events, then every source's events in registration
    /// order. Returns the number of events routed.
    fn route_pending_input(&mut self) -> Result<u32, PlayerError> {
        let mut pending: Vec<(Event, Option<NodeId>)> =
            self.injected.drain(..).map(|e| (e, None)).collect();
        let mut polled = Vec::new();
        for slot in &mut self.inputs {
            slot.source.poll_events(&mut polled);
            let receiver = slot.source.receiver();
            pending.extend(polled.drain(..).map(|e| (e, receiver)));
        }

        let mut routed = 0;
        for (event, receiver) in pending {
            // A callback may have replaced or dropped the scene.
            if self.scene.is_none() {
                break;
            }
            self.route_event(event, receiver)?;
            routed += 1;
        }
        Ok(routed)
    }

    /// Renders auto-rendering off-screen canvases in dependency order.
    ///
    /// A canvas fed by a live source renders once per frame the source has
    /// ready, possibly not at all.
    fn render_offscreen(&mut self, frame_time: HostTime) -> Result<(), PlayerError> {
        for canvas in self.canvases.iter_mut() {
            if !canvas.auto_render() {
                continue;
            }
            let id = canvas.id();
            let mut renders: u32 = 0;
            match canvas.source_mut() {
                Some(source) => {
                    while source.poll_frame() {
                        self.surface.render_canvas(id, frame_time)?;
                        renders += 1;
                    }
                }
                None => {
                    self.surface.render_canvas(id, frame_time)?;
                    renders = 1;
                }
            }
            #[cfg(feature = "trace-rich")]
            self.rendered.push(CanvasRendered {
                canvas: id,
                renders,
            });
            #[cfg(not(feature = "trace-rich"))]
            {
                _ = renders;
            }
        }
        Ok(())
    }

    #[cfg(feature = "trace-rich")]
    fn flush_rich_trace(&mut self, frame_index: u64) {
        let routed = core::mem::take(&mut self.routed);
        let rendered = core::mem::take(&mut self.rendered);
        let mut tracer = self.tracer();
        tracer.events_routed(frame_index, &routed);
        tracer.canvases_rendered(frame_index, &rendered);
    }
}

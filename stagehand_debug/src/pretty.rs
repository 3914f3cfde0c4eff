// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Display
//! timestamps are converted to microseconds using a [`Timebase`]; frame times
//! and jitter are already in nanoseconds.

use std::io::Write;

use stagehand_core::time::{HostTime, Timebase};
use stagehand_core::trace::{
    CanvasRendered, EventRouted, FrameBeginEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent,
    PresentEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            timebase,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ticks_to_us(&self, ticks: u64) -> f64 {
        self.timebase.ticks_to_nanos(ticks) as f64 / 1000.0
    }

    fn host_us(&self, t: HostTime) -> f64 {
        self.ticks_to_us(t.ticks())
    }
}

fn nanos_to_ms(nanos: u64) -> f64 {
    nanos as f64 / 1_000_000.0
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[frame] {} t={:.3}ms now={:.1}µs",
            e.frame_index,
            nanos_to_ms(e.frame_time.ticks()),
            self.host_us(e.now),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.1}µs",
            e.frame_index,
            e.phase.name(),
            self.host_us(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.1}µs",
            e.frame_index,
            e.phase.name(),
            self.host_us(e.timestamp),
        );
    }

    fn on_present(&mut self, e: &PresentEvent) {
        let late = if e.late { "LATE" } else { "ok" };
        let _ = writeln!(
            self.writer,
            "[present] frame={} at {:.1}µs jitter={:.3}ms {late}",
            e.frame_index,
            self.host_us(e.presented_at),
            nanos_to_ms(e.jitter_ticks),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let late = if s.late { "LATE" } else { "ok" };
        let _ = writeln!(
            self.writer,
            "[summary] frame={} timers={}x{:.1}µs input={}x{:.1}µs \
             offscreen={:.1}µs main={:.1}µs hooks={:.1}µs present={:.1}µs {late}",
            s.frame_index,
            s.timers_fired,
            self.ticks_to_us(s.timers_ticks),
            s.events_routed,
            self.ticks_to_us(s.input_ticks),
            self.ticks_to_us(s.offscreen_ticks),
            self.ticks_to_us(s.main_ticks),
            self.ticks_to_us(s.hooks_ticks),
            self.ticks_to_us(s.present_ticks),
        );
    }

    fn on_events_routed(&mut self, frame_index: u64, events: &[EventRouted]) {
        if events.is_empty() {
            return;
        }
        let intercepted = events.iter().filter(|e| e.intercepted).count();
        let _ = writeln!(
            self.writer,
            "[events] frame={frame_index} routed={} intercepted={intercepted}",
            events.len(),
        );
    }

    fn on_canvases_rendered(&mut self, frame_index: u64, renders: &[CanvasRendered]) {
        for r in renders {
            let _ = writeln!(
                self.writer,
                "[canvas] frame={frame_index} {:?} renders={}",
                r.canvas, r.renders,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use stagehand_core::trace::{PhaseKind, RoutedKind};

    use super::*;

    #[test]
    fn pretty_print_frame() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new(), Timebase::NANOS);
        sink.on_frame_begin(&FrameBeginEvent {
            frame_index: 1,
            frame_time: HostTime(20_000_000),
            now: HostTime(1_000_000),
        });
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 1,
            phase: PhaseKind::Timers,
            timestamp: HostTime(1_000_000),
        });
        sink.on_present(&PresentEvent {
            frame_index: 1,
            presented_at: HostTime(21_000_000),
            jitter_ticks: 1_500_000,
            late: true,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("[frame] 1 t=20.000ms"), "got: {output}");
        assert!(output.contains("timers at 1000.0µs"), "got: {output}");
        assert!(output.contains("jitter=1.500ms LATE"), "got: {output}");
    }

    #[test]
    fn quiet_frames_print_no_event_line() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new(), Timebase::NANOS);
        sink.on_events_routed(4, &[]);
        sink.on_events_routed(
            5,
            &[EventRouted {
                kind: RoutedKind::Quit,
                cursor: None,
                intercepted: false,
            }],
        );
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(output, "[events] frame=5 routed=1 intercepted=0\n");
    }
}

// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Phases become duration slices on thread 0, presents become instants on
//! thread 1, and per-frame summaries become counters.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use stagehand_core::time::Timebase;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Display timestamps are converted to microseconds using the provided
/// [`Timebase`]. Rich aggregates carry the timestamp of the last frame begin
/// seen before them.
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut frame_ts = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::FrameBegin(e) => {
                frame_ts = ticks_to_us(e.now.ticks(), timebase);
                events.push(json!({
                    "ph": "i",
                    "name": "FrameBegin",
                    "cat": "Frame",
                    "ts": frame_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frame_index": e.frame_index,
                        "frame_time_ms": nanos_to_ms(e.frame_time.ticks()),
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": e.phase.name(),
                    "cat": "Frame",
                    "ts": ticks_to_us(e.timestamp.ticks(), timebase),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": e.phase.name(),
                    "cat": "Frame",
                    "ts": ticks_to_us(e.timestamp.ticks(), timebase),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::Present(e) => {
                let name = if e.late { "LatePresent" } else { "Present" };
                events.push(json!({
                    "ph": "i",
                    "name": name,
                    "cat": "Display",
                    "ts": ticks_to_us(e.presented_at.ticks(), timebase),
                    "pid": 0,
                    "tid": 1,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "jitter_ms": nanos_to_ms(e.jitter_ticks),
                        "late": e.late,
                    }
                }));
            }
            RecordedEvent::FrameSummary(s) => {
                events.push(json!({
                    "ph": "C",
                    "name": "FrameSummary",
                    "cat": "Summary",
                    "ts": ticks_to_us(s.now.ticks(), timebase),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "timers_us": ticks_to_us(s.timers_ticks, timebase),
                        "input_us": ticks_to_us(s.input_ticks, timebase),
                        "offscreen_us": ticks_to_us(s.offscreen_ticks, timebase),
                        "main_us": ticks_to_us(s.main_ticks, timebase),
                        "hooks_us": ticks_to_us(s.hooks_ticks, timebase),
                        "present_us": ticks_to_us(s.present_ticks, timebase),
                        "timers_fired": s.timers_fired,
                        "events_routed": s.events_routed,
                    }
                }));
            }
            RecordedEvent::EventsRouted {
                frame_index,
                count,
                intercepted,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "EventsRouted",
                    "cat": "Rich",
                    "ts": frame_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "frame_index": frame_index,
                        "count": count,
                        "intercepted": intercepted,
                    }
                }));
            }
            RecordedEvent::CanvasesRendered {
                frame_index,
                canvases,
                renders,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "CanvasesRendered",
                    "cat": "Rich",
                    "ts": frame_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "frame_index": frame_index,
                        "canvases": canvases,
                        "renders": renders,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ticks_to_us(ticks: u64, timebase: Timebase) -> f64 {
    timebase.ticks_to_nanos(ticks) as f64 / 1000.0
}

fn nanos_to_ms(nanos: u64) -> f64 {
    nanos as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use stagehand_core::time::HostTime;
    use stagehand_core::trace::{
        FrameBeginEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, PresentEvent, TraceSink,
    };

    use super::*;
    use crate::recorder::RecorderSink;

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_frame_begin(&FrameBeginEvent {
            frame_index: 0,
            frame_time: HostTime(0),
            now: HostTime(1_000_000),
        });
        rec.on_phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::Main,
            timestamp: HostTime(1_000_000),
        });
        rec.on_phase_end(&PhaseEndEvent {
            frame_index: 0,
            phase: PhaseKind::Main,
            timestamp: HostTime(1_000_100),
        });
        rec.on_present(&PresentEvent {
            frame_index: 0,
            presented_at: HostTime(17_000_000),
            jitter_ticks: 0,
            late: true,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), Timebase::NANOS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed[0]["name"], "FrameBegin");
        assert_eq!(parsed[0]["ts"], 1000.0);
        assert_eq!(parsed[1]["ph"], "B");
        assert_eq!(parsed[1]["name"], "main");
        assert_eq!(parsed[2]["ph"], "E");
        assert_eq!(parsed[2]["ts"], 1000.1);
        assert_eq!(parsed[3]["name"], "LatePresent");
        assert_eq!(parsed[3]["tid"], 1);
    }

    #[test]
    fn rich_aggregates_use_frame_timestamp() {
        let mut rec = RecorderSink::new();
        rec.on_frame_begin(&FrameBeginEvent {
            frame_index: 2,
            frame_time: HostTime(40_000_000),
            now: HostTime(5_000_000),
        });
        rec.on_events_routed(2, &[]);

        let mut out = Vec::new();
        export(rec.as_bytes(), Timebase::NANOS, &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[1]["name"], "EventsRouted");
        assert_eq!(parsed[1]["ts"], 5000.0);
        assert_eq!(parsed[1]["args"]["count"], 0);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], Timebase::NANOS, &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert!(parsed.is_empty());
    }
}

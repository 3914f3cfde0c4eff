// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Rich events ([`on_events_routed`](TraceSink::on_events_routed),
//! [`on_canvases_rendered`](TraceSink::on_canvases_rendered)) are stored as
//! aggregates only.

use stagehand_core::time::HostTime;
use stagehand_core::trace::{
    CanvasRendered, EventRouted, FrameBeginEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent,
    PhaseKind, PresentEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_BEGIN: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_PRESENT: u8 = 4;
const TAG_FRAME_SUMMARY: u8 = 5;
const TAG_EVENTS_ROUTED: u8 = 6;
const TAG_CANVASES_RENDERED: u8 = 7;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Timers => 0,
            PhaseKind::Input => 1,
            PhaseKind::Offscreen => 2,
            PhaseKind::Main => 3,
            PhaseKind::Hooks => 4,
            PhaseKind::Present => 5,
        });
    }

    fn write_count(&mut self, n: usize) {
        self.write_u32(u32::try_from(n).unwrap_or(u32::MAX));
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.write_u8(TAG_FRAME_BEGIN);
        self.write_u64(e.frame_index);
        self.write_u64(e.frame_time.ticks());
        self.write_u64(e.now.ticks());
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_present(&mut self, e: &PresentEvent) {
        self.write_u8(TAG_PRESENT);
        self.write_u64(e.frame_index);
        self.write_u64(e.presented_at.ticks());
        self.write_u64(e.jitter_ticks);
        self.write_bool(e.late);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_u64(s.frame_time.ticks());
        self.write_u64(s.now.ticks());
        self.write_u64(s.timers_ticks);
        self.write_u64(s.input_ticks);
        self.write_u64(s.offscreen_ticks);
        self.write_u64(s.main_ticks);
        self.write_u64(s.hooks_ticks);
        self.write_u64(s.present_ticks);
        self.write_u32(s.timers_fired);
        self.write_u32(s.events_routed);
        self.write_bool(s.late);
    }

    fn on_events_routed(&mut self, frame_index: u64, events: &[EventRouted]) {
        self.write_u8(TAG_EVENTS_ROUTED);
        self.write_u64(frame_index);
        self.write_count(events.len());
        self.write_count(events.iter().filter(|e| e.intercepted).count());
    }

    fn on_canvases_rendered(&mut self, frame_index: u64, renders: &[CanvasRendered]) {
        self.write_u8(TAG_CANVASES_RENDERED);
        self.write_u64(frame_index);
        self.write_count(renders.len());
        self.write_u32(
            renders
                .iter()
                .fold(0_u32, |sum, r| sum.saturating_add(r.renders)),
        );
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`FrameBeginEvent`].
    FrameBegin(FrameBeginEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`PresentEvent`].
    Present(PresentEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
    /// Routed-event totals for a frame.
    EventsRouted {
        /// Frame counter.
        frame_index: u64,
        /// Number of events routed.
        count: u32,
        /// How many of them the pre-dispatch hook consumed.
        intercepted: u32,
    },
    /// Off-screen render totals for a frame.
    CanvasesRendered {
        /// Frame counter.
        frame_index: u64,
        /// Number of auto-rendering canvases visited.
        canvases: u32,
        /// Sum of their render counts.
        renders: u32,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_bool(&mut self) -> Option<bool> {
        self.read_u8().map(|b| b != 0)
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        PhaseKind::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn decode_frame_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameBegin(FrameBeginEvent {
            frame_index: self.read_u64()?,
            frame_time: self.read_time()?,
            now: self.read_time()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_present(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Present(PresentEvent {
            frame_index: self.read_u64()?,
            presented_at: self.read_time()?,
            jitter_ticks: self.read_u64()?,
            late: self.read_bool()?,
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index: self.read_u64()?,
            frame_time: self.read_time()?,
            now: self.read_time()?,
            timers_ticks: self.read_u64()?,
            input_ticks: self.read_u64()?,
            offscreen_ticks: self.read_u64()?,
            main_ticks: self.read_u64()?,
            hooks_ticks: self.read_u64()?,
            present_ticks: self.read_u64()?,
            timers_fired: self.read_u32()?,
            events_routed: self.read_u32()?,
            late: self.read_bool()?,
        }))
    }

    fn decode_events_routed(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::EventsRouted {
            frame_index: self.read_u64()?,
            count: self.read_u32()?,
            intercepted: self.read_u32()?,
        })
    }

    fn decode_canvases_rendered(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::CanvasesRendered {
            frame_index: self.read_u64()?,
            canvases: self.read_u32()?,
            renders: self.read_u32()?,
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_u8()? {
            TAG_FRAME_BEGIN => self.decode_frame_begin(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_PRESENT => self.decode_present(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            TAG_EVENTS_ROUTED => self.decode_events_routed(),
            TAG_CANVASES_RENDERED => self.decode_canvases_rendered(),
            _ => None, // unknown tag ends the recording
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use stagehand_core::canvas::CanvasId;
    use stagehand_core::event::CursorId;
    use stagehand_core::trace::{FrameSummaryBuilder, RoutedKind};

    use super::*;

    fn sample_begin() -> FrameBeginEvent {
        FrameBeginEvent {
            frame_index: 7,
            frame_time: HostTime(140_000_000),
            now: HostTime(1_000_000),
        }
    }

    fn sample_summary() -> FrameSummary {
        let mut builder = FrameSummaryBuilder::new(&sample_begin());
        builder.phase_begin(PhaseKind::Timers, HostTime(1_000_000));
        builder.phase_end(PhaseKind::Timers, HostTime(1_000_300));
        builder.phase_begin(PhaseKind::Present, HostTime(1_002_000));
        builder.phase_end(PhaseKind::Present, HostTime(1_016_000));
        builder.set_timers_fired(4);
        builder.set_events_routed(2);
        builder.set_late(true);
        builder.finish()
    }

    #[test]
    fn frame_of_events_decodes_in_order() {
        let mut rec = RecorderSink::new();
        rec.on_frame_begin(&sample_begin());
        rec.on_phase_begin(&PhaseBeginEvent {
            frame_index: 7,
            phase: PhaseKind::Offscreen,
            timestamp: HostTime(2000),
        });
        rec.on_phase_end(&PhaseEndEvent {
            frame_index: 7,
            phase: PhaseKind::Offscreen,
            timestamp: HostTime(3000),
        });
        rec.on_present(&PresentEvent {
            frame_index: 7,
            presented_at: HostTime(17_000_000),
            jitter_ticks: 250_000,
            late: false,
        });
        rec.on_frame_summary(&sample_summary());

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 5);
        match &events[0] {
            RecordedEvent::FrameBegin(e) => {
                assert_eq!(e.frame_index, 7);
                assert_eq!(e.frame_time, HostTime(140_000_000));
            }
            other => panic!("expected FrameBegin, got {other:?}"),
        }
        match &events[2] {
            RecordedEvent::PhaseEnd(e) => {
                assert_eq!(e.phase, PhaseKind::Offscreen);
                assert_eq!(e.timestamp, HostTime(3000));
            }
            other => panic!("expected PhaseEnd, got {other:?}"),
        }
        match &events[3] {
            RecordedEvent::Present(e) => {
                assert_eq!(e.jitter_ticks, 250_000);
                assert!(!e.late);
            }
            other => panic!("expected Present, got {other:?}"),
        }
        match &events[4] {
            RecordedEvent::FrameSummary(s) => {
                assert_eq!(s.timers_ticks, 300);
                assert_eq!(s.present_ticks, 14_000);
                assert_eq!(s.input_ticks, 0);
                assert_eq!(s.timers_fired, 4);
                assert_eq!(s.events_routed, 2);
                assert!(s.late);
            }
            other => panic!("expected FrameSummary, got {other:?}"),
        }
    }

    #[test]
    fn rich_events_are_aggregated() {
        let mut rec = RecorderSink::new();
        let routed = [
            EventRouted {
                kind: RoutedKind::Cursor,
                cursor: Some(CursorId::MOUSE),
                intercepted: true,
            },
            EventRouted {
                kind: RoutedKind::Key,
                cursor: None,
                intercepted: false,
            },
        ];
        rec.on_events_routed(3, &routed);
        rec.on_canvases_rendered(
            3,
            &[
                CanvasRendered {
                    canvas: CanvasId::MAIN,
                    renders: 2,
                },
                CanvasRendered {
                    canvas: CanvasId::MAIN,
                    renders: 0,
                },
            ],
        );

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert!(matches!(
            events[0],
            RecordedEvent::EventsRouted {
                frame_index: 3,
                count: 2,
                intercepted: 1,
            }
        ));
        assert!(matches!(
            events[1],
            RecordedEvent::CanvasesRendered {
                frame_index: 3,
                canvases: 2,
                renders: 2,
            }
        ));
    }

    #[test]
    fn truncated_record_ends_iteration() {
        let mut rec = RecorderSink::new();
        rec.on_frame_begin(&sample_begin());
        rec.on_frame_begin(&sample_begin());
        let bytes = rec.into_bytes();

        let events: Vec<_> = decode(&bytes[..bytes.len() - 3]).collect();
        assert_eq!(events.len(), 1);
        assert!(decode(&[]).next().is_none());
        assert!(decode(&[0xff, 0, 0]).next().is_none(), "unknown tag");
    }
}

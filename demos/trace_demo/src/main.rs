// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless player run that exercises the tracing and diagnostics pipeline.
//!
//! Plays a small scene for two seconds of simulated time against a virtual
//! display, a scripted mouse, and a fake camera feeding an off-screen canvas.
//! Events go to both a [`PrettyPrintSink`](stagehand_debug::pretty::PrettyPrintSink)
//! and a [`RecorderSink`](stagehand_debug::recorder::RecorderSink); the
//! recording is exported as a Chrome trace JSON file at the end.
//!
//! Set `RUST_LOG=debug` to see the player's own log output.

use std::cell::RefCell;
use std::fs::File;
use std::io::BufWriter;
use std::rc::Rc;

use kurbo::{Point, Rect};

use stagehand_core::backend::{DisplaySurface, FrameSource, InputSource};
use stagehand_core::canvas::CanvasId;
use stagehand_core::error::{AcquireError, SurfaceError};
use stagehand_core::event::{CursorEvent, CursorEventKind, Event};
use stagehand_core::node::NodeKind;
use stagehand_core::player::{DisplayParams, Player, PlayerConfig, Scene};
use stagehand_core::time::{Duration, HostTime, Timebase};
use stagehand_core::trace::{
    CanvasRendered, EventRouted, FrameBeginEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent,
    PresentEvent, TraceSink,
};

use stagehand_debug::pretty::PrettyPrintSink;
use stagehand_debug::recorder::RecorderSink;

/// 16.6ms refresh interval in nanoseconds (≈60 Hz).
const REFRESH_INTERVAL_NS: u64 = 16_666_667;
/// Every this many frames the virtual display drops one refresh.
const LATE_EVERY: u32 = 45;

fn main() {
    env_logger::init();
    let timebase = Timebase::NANOS;

    // -- sinks -------------------------------------------------------------
    let recorder = Rc::new(RefCell::new(RecorderSink::new()));
    let tee = Tee {
        pretty: PrettyPrintSink::new(Box::new(std::io::stdout()), timebase),
        recorder: Rc::clone(&recorder),
    };

    // -- player ------------------------------------------------------------
    let mut player = Player::new(
        PlayerConfig::fixed_rate(60.0),
        Box::new(VirtualDisplay::default()),
    );
    player.set_trace_sink(Some(Box::new(tee)));
    player.load_scene(build_scene()).expect("scene has a root");

    let camera = player.create_canvas("camera", true).expect("fresh name");
    let blur = player.create_canvas("blur", true).expect("fresh name");
    player
        .register_canvas_dependency(CanvasId::MAIN, blur)
        .expect("blur is a valid dependency");
    player
        .register_canvas_dependency(blur, camera)
        .expect("camera is a valid dependency");
    player
        .canvases_mut()
        .set_source(camera, Some(Box::new(EveryOtherFrame::default())))
        .expect("camera exists");

    player
        .add_input_source(Box::new(ScriptedMouse::default()))
        .expect("non-continuous sources always register");
    player.set_interval(Duration::from_millis(500), |p: &mut Player| {
        log::info!("half-second tick at {:?}", p.frame_time());
        Ok(())
    });
    player.set_timeout(Duration::from_secs(2), |p: &mut Player| {
        p.stop();
        Ok(())
    });

    // -- run ---------------------------------------------------------------
    player.start().expect("playback failed");
    let stats = player.frame_stats();
    println!(
        "{} frames, {} late, smoothed jitter {:?}",
        stats.frames, stats.late_frames, stats.smoothed_jitter,
    );

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    stagehand_debug::chrome::export(recorder.borrow().as_bytes(), timebase, &mut writer)
        .expect("failed to write Chrome trace");

    println!("Wrote {path}");
}

/// Root with a button that reports clicks and hover changes.
fn build_scene() -> Scene {
    let (mut scene, root) = Scene::with_root();
    let button = scene.create_node(NodeKind::Image, Rect::new(100.0, 100.0, 200.0, 150.0));
    scene.add_child(root, button);
    scene.set_handler(button, |p: &mut Player, _, event: &Event| {
        if let Event::Cursor(c) = event {
            match c.kind {
                CursorEventKind::Over => log::info!("hover in at {:?}", p.frame_time()),
                CursorEventKind::Out => log::info!("hover out at {:?}", p.frame_time()),
                CursorEventKind::Down => {
                    log::info!("button pressed at {:?}", c.position);
                    return Ok(true);
                }
                _ => {}
            }
        }
        Ok(false)
    });
    scene
}

// ---------------------------------------------------------------------------
// Simulated backends
// ---------------------------------------------------------------------------

/// A display whose clock only moves when the player renders or presents.
#[derive(Debug, Default)]
struct VirtualDisplay {
    now: u64,
    presents: u32,
    late: bool,
}

impl DisplaySurface for VirtualDisplay {
    fn acquire(&mut self, params: &DisplayParams) -> Result<(), AcquireError> {
        log::info!("virtual display up at {} Hz", params.frame_rate);
        Ok(())
    }

    fn release(&mut self) {
        log::info!("virtual display down after {} presents", self.presents);
    }

    fn display_time(&self) -> HostTime {
        HostTime(self.now)
    }

    fn refresh_rate(&self) -> f64 {
        60.0
    }

    fn render_canvas(
        &mut self,
        _canvas: CanvasId,
        _frame_time: HostTime,
    ) -> Result<(), SurfaceError> {
        self.now += 400_000;
        Ok(())
    }

    fn render_main(&mut self, _frame_time: HostTime) -> Result<(), SurfaceError> {
        self.now += 2_000_000;
        Ok(())
    }

    fn wait_for_frame_boundary(&mut self, target: HostTime) -> Result<(), SurfaceError> {
        self.now = self.now.max(target.ticks());
        Ok(())
    }

    fn present(&mut self) -> Result<(), SurfaceError> {
        self.presents += 1;
        self.late = self.presents % LATE_EVERY == 0;
        if self.late {
            self.now += REFRESH_INTERVAL_NS;
        }
        self.now += 100_000;
        Ok(())
    }

    fn was_last_frame_late(&self) -> bool {
        self.late
    }
}

/// Sweeps the mouse across the button and clicks in the middle.
#[derive(Debug, Default)]
struct ScriptedMouse {
    polls: u32,
}

impl InputSource for ScriptedMouse {
    fn poll_events(&mut self, out: &mut Vec<Event>) {
        self.polls += 1;
        let x = f64::from(self.polls) * 4.0;
        let position = Point::new(x, 120.0);
        out.push(CursorEvent::mouse(CursorEventKind::Motion, position).into());
        if self.polls == 38 {
            out.push(CursorEvent::mouse(CursorEventKind::Down, position).into());
            out.push(CursorEvent::mouse(CursorEventKind::Up, position).into());
        }
    }
}

/// A camera that has a new frame on every other poll.
#[derive(Debug, Default)]
struct EveryOtherFrame {
    pending: bool,
    polls: u32,
}

impl FrameSource for EveryOtherFrame {
    fn poll_frame(&mut self) -> bool {
        if self.pending {
            self.pending = false;
            return true;
        }
        self.polls += 1;
        self.pending = self.polls % 2 == 0;
        false
    }
}

// ---------------------------------------------------------------------------
// Tee sink
// ---------------------------------------------------------------------------

/// Forwards every event to a pretty printer and a shared recorder.
struct Tee {
    pretty: PrettyPrintSink,
    recorder: Rc<RefCell<RecorderSink>>,
}

impl TraceSink for Tee {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.pretty.on_frame_begin(e);
        self.recorder.borrow_mut().on_frame_begin(e);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.pretty.on_phase_begin(e);
        self.recorder.borrow_mut().on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.pretty.on_phase_end(e);
        self.recorder.borrow_mut().on_phase_end(e);
    }

    fn on_present(&mut self, e: &PresentEvent) {
        self.pretty.on_present(e);
        self.recorder.borrow_mut().on_present(e);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.pretty.on_frame_summary(s);
        self.recorder.borrow_mut().on_frame_summary(s);
    }

    fn on_events_routed(&mut self, frame_index: u64, events: &[EventRouted]) {
        self.pretty.on_events_routed(frame_index, events);
        self.recorder.borrow_mut().on_events_routed(frame_index, events);
    }

    fn on_canvases_rendered(&mut self, frame_index: u64, renders: &[CanvasRendered]) {
        self.pretty.on_canvases_rendered(frame_index, renders);
        self.recorder
            .borrow_mut()
            .on_canvases_rendered(frame_index, renders);
    }
}

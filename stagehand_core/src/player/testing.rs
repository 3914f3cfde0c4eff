// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fake backends for player tests.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use kurbo::Rect;

use super::{AudioParams, DisplayParams, Scene};
use crate::backend::{AudioOutput, DisplaySurface, FrameSource, InputSource};
use crate::canvas::CanvasId;
use crate::error::{AcquireError, SurfaceError};
use crate::event::Event;
use crate::node::{NodeId, NodeKind};
use crate::time::HostTime;

/// A backend call observed by a fake.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    Acquire,
    Release,
    RenderCanvas(CanvasId),
    RenderMain(HostTime),
    Wait(HostTime),
    Present,
    AudioAcquire,
    AudioRelease,
    InputStart(u32),
    InputStop(u32),
}

pub(crate) type CallLog = Rc<RefCell<Vec<Call>>>;

pub(crate) fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Root group with one 10x10 image at the origin.
pub(crate) fn simple_scene() -> (Scene, NodeId, NodeId) {
    let (mut scene, root) = Scene::with_root();
    let node = scene.create_node(NodeKind::Image, Rect::new(0.0, 0.0, 10.0, 10.0));
    scene.add_child(root, node);
    (scene, root, node)
}

/// Surface whose clock advances one frame period per present.
pub(crate) struct FakeSurface {
    log: CallLog,
    now: u64,
    period: u64,
    presents: u32,
    pub(crate) lose_after_presents: Option<u32>,
    pub(crate) late: bool,
}

impl FakeSurface {
    pub(crate) fn new(log: CallLog) -> Self {
        Self {
            log,
            now: 0,
            period: 20_000_000,
            presents: 0,
            lose_after_presents: None,
            late: false,
        }
    }

    /// Starts the display clock at `now` ticks instead of zero.
    pub(crate) fn starting_at(mut self, now: u64) -> Self {
        self.now = now;
        self
    }
}

impl DisplaySurface for FakeSurface {
    fn acquire(&mut self, _params: &DisplayParams) -> Result<(), AcquireError> {
        self.log.borrow_mut().push(Call::Acquire);
        Ok(())
    }

    fn release(&mut self) {
        self.log.borrow_mut().push(Call::Release);
    }

    fn display_time(&self) -> HostTime {
        HostTime(self.now)
    }

    fn refresh_rate(&self) -> f64 {
        50.0
    }

    fn render_canvas(
        &mut self,
        canvas: CanvasId,
        _frame_time: HostTime,
    ) -> Result<(), SurfaceError> {
        self.log.borrow_mut().push(Call::RenderCanvas(canvas));
        Ok(())
    }

    fn render_main(&mut self, frame_time: HostTime) -> Result<(), SurfaceError> {
        self.log.borrow_mut().push(Call::RenderMain(frame_time));
        Ok(())
    }

    fn wait_for_frame_boundary(&mut self, target: HostTime) -> Result<(), SurfaceError> {
        self.log.borrow_mut().push(Call::Wait(target));
        Ok(())
    }

    fn present(&mut self) -> Result<(), SurfaceError> {
        if self.lose_after_presents.is_some_and(|n| self.presents >= n) {
            return Err(SurfaceError::Lost);
        }
        self.presents += 1;
        self.now += self.period;
        self.log.borrow_mut().push(Call::Present);
        Ok(())
    }

    fn was_last_frame_late(&self) -> bool {
        self.late
    }
}

pub(crate) struct FakeAudio {
    log: CallLog,
    fail: bool,
}

impl FakeAudio {
    pub(crate) fn new(log: CallLog) -> Self {
        Self { log, fail: false }
    }

    pub(crate) fn failing(log: CallLog) -> Self {
        Self { log, fail: true }
    }
}

impl AudioOutput for FakeAudio {
    fn acquire(&mut self, _params: &AudioParams) -> Result<(), AcquireError> {
        if self.fail {
            return Err(AcquireError::new("no device"));
        }
        self.log.borrow_mut().push(Call::AudioAcquire);
        Ok(())
    }

    fn release(&mut self) {
        self.log.borrow_mut().push(Call::AudioRelease);
    }

    fn set_volume(&mut self, _volume: f32) {}
}

/// Input source that yields one scripted batch per poll.
pub(crate) struct ScriptedInput {
    id: u32,
    log: CallLog,
    continuous: bool,
    pub(crate) fail_start: bool,
    pub(crate) receiver: Option<NodeId>,
    frames: VecDeque<Vec<Event>>,
}

impl ScriptedInput {
    pub(crate) fn new(id: u32, log: CallLog) -> Self {
        Self {
            id,
            log,
            continuous: false,
            fail_start: false,
            receiver: None,
            frames: VecDeque::new(),
        }
    }

    pub(crate) fn continuous(id: u32, log: CallLog) -> Self {
        Self {
            continuous: true,
            ..Self::new(id, log)
        }
    }

    pub(crate) fn push_frame(&mut self, events: Vec<Event>) {
        self.frames.push_back(events);
    }
}

impl InputSource for ScriptedInput {
    fn is_continuous(&self) -> bool {
        self.continuous
    }

    fn start(&mut self) -> Result<(), AcquireError> {
        if self.fail_start {
            return Err(AcquireError::new("device busy"));
        }
        self.log.borrow_mut().push(Call::InputStart(self.id));
        Ok(())
    }

    fn stop(&mut self) {
        self.log.borrow_mut().push(Call::InputStop(self.id));
    }

    fn poll_events(&mut self, out: &mut Vec<Event>) {
        if let Some(batch) = self.frames.pop_front() {
            out.extend(batch);
        }
    }

    fn receiver(&self) -> Option<NodeId> {
        self.receiver
    }
}

/// Frame source with a shared count of frames ready.
pub(crate) struct ScriptedFrames {
    ready: Rc<Cell<u32>>,
}

impl ScriptedFrames {
    pub(crate) fn new(ready: Rc<Cell<u32>>) -> Self {
        Self { ready }
    }
}

impl FrameSource for ScriptedFrames {
    fn poll_frame(&mut self) -> bool {
        let n = self.ready.get();
        if n == 0 {
            return false;
        }
        self.ready.set(n - 1);
        true
    }
}

/// Boxes a fake surface for [`Player::new`](super::Player::new).
pub(crate) fn surface(log: &CallLog) -> Box<dyn DisplaySurface> {
    Box::new(FakeSurface::new(log.clone()))
}

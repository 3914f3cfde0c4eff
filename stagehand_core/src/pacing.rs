// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame timing: where frame time comes from and how well frames keep pace.
//!
//! [`FrameClock`] produces the frame time the player exposes to callbacks.
//! With [`FramePacing::Display`] it follows the display's clock; with
//! [`FramePacing::Fixed`] it is a synthetic counter that advances by exactly
//! one nominal frame per frame, independent of wall-clock time. Fixed pacing
//! makes runs reproducible, which is what tests and offline capture want.
//!
//! [`JitterStats`] measures the interval between successive presents against
//! the nominal frame duration and smooths it with an exponential moving
//! average.

use crate::time::{Duration, HostTime};

/// Source of frame time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FramePacing {
    /// Frame time is the display time at the start of each frame.
    Display,
    /// Frame time advances by `1 / fps` seconds per frame.
    Fixed {
        /// Nominal frames per second. Must be positive.
        fps: f64,
    },
}

impl FramePacing {
    /// Whether this is [`FramePacing::Fixed`].
    #[must_use]
    pub const fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed { .. })
    }
}

/// Produces the frame time for each frame of a run.
#[derive(Clone, Copy, Debug)]
pub struct FrameClock {
    pacing: FramePacing,
    frames: u64,
    time: HostTime,
    origin: Option<HostTime>,
}

impl FrameClock {
    /// Creates a clock at frame zero.
    #[must_use]
    pub const fn new(pacing: FramePacing) -> Self {
        Self {
            pacing,
            frames: 0,
            time: HostTime::ZERO,
            origin: None,
        }
    }

    /// The active pacing mode.
    #[must_use]
    pub const fn pacing(&self) -> FramePacing {
        self.pacing
    }

    /// Switches pacing mode. The frame count and time carry over.
    pub fn set_pacing(&mut self, pacing: FramePacing) {
        self.pacing = pacing;
    }

    /// Starts a run at frame zero, time zero. `display_now` is the display
    /// time in nanoseconds that frame zero corresponds to.
    pub fn start(&mut self, display_now: HostTime) {
        self.frames = 0;
        self.time = HostTime::ZERO;
        self.origin = Some(display_now);
    }

    /// Moves to the next frame and returns its time.
    ///
    /// `display_now` is the display time in nanoseconds; it is ignored under
    /// fixed pacing. Display-paced frame time counts from the display time
    /// passed to [`start`](Self::start), or from the first display time seen
    /// if the run was never started.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "frame times stay far below u64::MAX nanoseconds"
    )]
    pub fn advance(&mut self, display_now: HostTime) -> HostTime {
        self.frames += 1;
        self.time = match self.pacing {
            FramePacing::Display => {
                let origin = *self.origin.get_or_insert(display_now);
                HostTime(display_now.saturating_duration_since(origin).ticks())
            }
            FramePacing::Fixed { fps } if fps > 0.0 => {
                HostTime((self.frames as f64 * 1_000_000_000.0 / fps) as u64)
            }
            FramePacing::Fixed { .. } => self.time,
        };
        self.time
    }

    /// Time of the current frame.
    #[must_use]
    pub const fn time(&self) -> HostTime {
        self.time
    }

    /// Frames advanced since the last reset.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Returns to frame zero at time zero and forgets the run's origin.
    pub fn reset(&mut self) {
        self.frames = 0;
        self.time = HostTime::ZERO;
        self.origin = None;
    }
}

/// Exponential moving average tracker.
#[derive(Clone, Copy, Debug)]
struct Ema {
    value: f64,
    alpha: f64,
    initialized: bool,
}

impl Ema {
    const fn new(alpha: f64) -> Self {
        Self {
            value: 0.0,
            alpha,
            initialized: false,
        }
    }

    fn update(&mut self, sample: f64) {
        if self.initialized {
            self.value = self.alpha * sample + (1.0 - self.alpha) * self.value;
        } else {
            self.value = sample;
            self.initialized = true;
        }
    }

    const fn get(&self) -> f64 {
        self.value
    }

    const fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Snapshot of presentation statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    /// Frames presented since playback started.
    pub frames: u64,
    /// Frames the display reported as late.
    pub late_frames: u64,
    /// Deviation of the last present interval from the nominal duration.
    pub last_jitter: Duration,
    /// Smoothed deviation.
    pub smoothed_jitter: Duration,
    /// Smoothed interval between presents.
    pub smoothed_interval: Duration,
}

/// Tracks present intervals and their deviation from the nominal frame
/// duration.
#[derive(Clone, Copy, Debug)]
pub struct JitterStats {
    jitter: Ema,
    interval: Ema,
    last_present: Option<HostTime>,
    frames: u64,
    late_frames: u64,
    last_jitter: Duration,
}

impl JitterStats {
    /// Creates empty statistics. `alpha` is the smoothing factor (0.0 to
    /// 1.0); smaller values smooth more.
    #[must_use]
    pub const fn new(alpha: f64) -> Self {
        Self {
            jitter: Ema::new(alpha),
            interval: Ema::new(alpha),
            last_present: None,
            frames: 0,
            late_frames: 0,
            last_jitter: Duration::ZERO,
        }
    }

    /// Records a present at `presented_at` and returns the jitter of this
    /// frame. The first present after a reset has no interval and reports
    /// zero jitter.
    pub fn record(&mut self, presented_at: HostTime, nominal: Duration, late: bool) -> Duration {
        self.frames += 1;
        if late {
            self.late_frames += 1;
        }
        let jitter = match self.last_present {
            Some(prev) => {
                let interval = presented_at.saturating_duration_since(prev);
                self.interval.update(interval.ticks() as f64);
                if nominal == Duration::ZERO {
                    Duration::ZERO
                } else {
                    interval.abs_diff(nominal)
                }
            }
            None => Duration::ZERO,
        };
        self.last_present = Some(presented_at);
        self.last_jitter = jitter;
        self.jitter.update(jitter.ticks() as f64);
        jitter
    }

    /// Frames per second derived from the smoothed present interval, or zero
    /// before two presents have been seen.
    #[must_use]
    pub fn effective_framerate(&self) -> f64 {
        if self.interval.is_initialized() && self.interval.get() > 0.0 {
            1_000_000_000.0 / self.interval.get()
        } else {
            0.0
        }
    }

    /// Current statistics.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "smoothed values are bounded by observed intervals"
    )]
    pub fn stats(&self) -> FrameStats {
        FrameStats {
            frames: self.frames,
            late_frames: self.late_frames,
            last_jitter: self.last_jitter,
            smoothed_jitter: Duration(self.jitter.get() as u64),
            smoothed_interval: Duration(self.interval.get() as u64),
        }
    }

    /// Forgets everything recorded.
    pub fn reset(&mut self) {
        *self = Self::new(self.jitter.alpha);
    }
}

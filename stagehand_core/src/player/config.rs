// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Player configuration.

use crate::pacing::FramePacing;

/// Parameters handed to [`DisplaySurface::acquire`](crate::backend::DisplaySurface::acquire).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayParams {
    /// Width in pixels; 0 lets the backend choose.
    pub width: u32,
    /// Height in pixels; 0 lets the backend choose.
    pub height: u32,
    /// Whether to take over the whole screen.
    pub fullscreen: bool,
    /// Target frame rate in Hz. 0 means "follow the display's refresh".
    pub frame_rate: f64,
}

impl DisplayParams {
    /// A window sized by the backend, synchronized to the display refresh.
    #[must_use]
    pub const fn windowed() -> Self {
        Self {
            width: 0,
            height: 0,
            fullscreen: false,
            frame_rate: 0.0,
        }
    }
}

/// Parameters handed to [`AudioOutput::acquire`](crate::backend::AudioOutput::acquire).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioParams {
    /// Samples per second.
    pub sample_rate: u32,
    /// Output channels.
    pub channels: u16,
    /// Initial master volume (0.0 to 1.0).
    pub volume: f32,
}

impl AudioParams {
    /// 44.1 kHz stereo at full volume.
    #[must_use]
    pub const fn stereo() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            volume: 1.0,
        }
    }
}

/// Configuration for a [`Player`](super::Player).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerConfig {
    /// Where frame time comes from.
    pub pacing: FramePacing,
    /// Whether an unhandled escape key press stops playback.
    pub stop_on_escape: bool,
    /// Smoothing factor for jitter statistics (0.0 to 1.0). Smaller values
    /// smooth more.
    pub jitter_alpha: f64,
    /// Display surface parameters.
    pub display: DisplayParams,
    /// Audio output parameters.
    pub audio: AudioParams,
}

impl PlayerConfig {
    /// Interactive playback paced by the display.
    #[must_use]
    pub const fn display() -> Self {
        Self {
            pacing: FramePacing::Display,
            stop_on_escape: true,
            jitter_alpha: 0.1,
            display: DisplayParams::windowed(),
            audio: AudioParams::stereo(),
        }
    }

    /// Deterministic playback where frame time advances by `1 / fps` seconds
    /// per frame regardless of wall-clock time.
    #[must_use]
    pub const fn fixed_rate(fps: f64) -> Self {
        Self {
            pacing: FramePacing::Fixed { fps },
            stop_on_escape: false,
            jitter_alpha: 0.1,
            display: DisplayParams {
                width: 0,
                height: 0,
                fullscreen: false,
                frame_rate: fps,
            },
            audio: AudioParams::stereo(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self::display()
    }
}

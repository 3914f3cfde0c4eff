// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Each concern has its own error enum; [`PlayerError`] wraps them for the
//! operations that drive the frame loop.

use alloc::string::String;
use core::fmt;

use crate::canvas::CanvasId;
use crate::event::CursorId;
use crate::node::NodeId;

/// Failure to acquire or release a cursor capture.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// The cursor is held by a different node.
    #[error("capture requested for {requested:?}, but {cursor:?} is already captured by {holder:?}")]
    AlreadyCaptured {
        /// Cursor in question.
        cursor: CursorId,
        /// Node that currently holds the capture.
        holder: NodeId,
        /// Node that asked for it.
        requested: NodeId,
    },
    /// Release was requested for a cursor nobody holds.
    #[error("release requested for {0:?}, which is not captured")]
    NotCaptured(CursorId),
}

/// Rejected change to the canvas graph.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CanvasError {
    /// The edge would make a canvas (transitively) render before itself.
    #[error("circular dependency between {dependent:?} and {dependency:?}")]
    CircularDependency {
        /// Canvas that samples the other.
        dependent: CanvasId,
        /// Canvas being sampled.
        dependency: CanvasId,
    },
    /// The canvas feeds nothing that ends up on the primary canvas.
    #[error("{0:?} is not reachable from the primary canvas")]
    Unreachable(CanvasId),
    /// The canvas still has dependents and cannot be removed.
    #[error("{id:?} still has {dependents} dependent canvas(es)")]
    StillReferenced {
        /// Canvas that was to be removed.
        id: CanvasId,
        /// Number of outstanding dependents.
        dependents: usize,
    },
    /// No canvas with this id exists.
    #[error("unknown canvas {0:?}")]
    UnknownCanvas(CanvasId),
    /// The operation is not allowed on the primary canvas.
    #[error("operation not permitted on the primary canvas")]
    PrimaryCanvas,
    /// A canvas with this name is already registered.
    #[error("a canvas named '{0}' already exists")]
    DuplicateName(String),
    /// A canvas URL did not use the `canvas:` scheme.
    #[error("invalid canvas url '{0}', expected 'canvas:<name>'")]
    InvalidUrl(String),
    /// A canvas URL named no registered canvas.
    #[error("no canvas named '{0}'")]
    UnknownName(String),
}

/// Failure to bring up an external resource.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct AcquireError {
    reason: String,
}

impl AcquireError {
    /// Creates an error with the given reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Human-readable reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Failure reported by a display surface while rendering or presenting.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    /// The surface went away (window closed, device lost).
    #[error("display surface lost")]
    Lost,
    /// Any other backend failure.
    #[error("display surface failure: {0}")]
    Backend(String),
}

/// Error returned by a user callback (timer, hook, or event handler).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("callback failed: {message}")]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    /// Creates an error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message given at construction.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<CaptureError> for CallbackError {
    fn from(err: CaptureError) -> Self {
        Self::new(alloc::format!("{err}"))
    }
}

impl From<CanvasError> for CallbackError {
    fn from(err: CanvasError) -> Self {
        Self::new(alloc::format!("{err}"))
    }
}

/// Which external resource failed to come up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    /// The display surface.
    Surface,
    /// The audio output.
    Audio,
    /// An input source, by registration index.
    Input(usize),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surface => f.write_str("display surface"),
            Self::Audio => f.write_str("audio output"),
            Self::Input(idx) => write!(f, "input source #{idx}"),
        }
    }
}

/// Errors surfaced by [`Player`](crate::player::Player) operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlayerError {
    /// `start` was called without a scene loaded.
    #[error("no scene loaded")]
    NoScene,
    /// `start` was called while the frame loop is already active.
    #[error("player is already running")]
    AlreadyRunning,
    /// A resource could not be acquired; everything acquired before it has
    /// been released again.
    #[error("failed to acquire {resource}: {source}")]
    Acquire {
        /// The resource that failed.
        resource: Resource,
        /// Underlying failure.
        source: AcquireError,
    },
    /// The display surface failed mid-frame.
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    /// A user callback failed.
    #[error(transparent)]
    Callback(#[from] CallbackError),
    /// A capture operation failed.
    #[error(transparent)]
    Capture(#[from] CaptureError),
    /// A canvas graph operation failed.
    #[error(transparent)]
    Canvas(#[from] CanvasError),
}

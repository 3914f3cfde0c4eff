// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Timeouts, intervals, and per-frame callbacks.
//!
//! [`TimerQueue`] keeps pending timeouts sorted by fire time, ties in
//! insertion order. [`TimerQueue::run_due_pass`] fires everything that is due
//! and tolerates callbacks that re-enter the queue through their host:
//!
//! - Timeouts scheduled during a pass go to a staging buffer and are merged
//!   after the pass, so they can never fire in the pass that created them.
//! - Cancelling the timeout that is currently firing only flags it; the pass
//!   drops it after the callback returns and restarts at the new head.
//! - Interval timeouts are rebased to `now + period` and re-enter through the
//!   staging buffer, so each fires at most once per pass.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::error::CallbackError;
use crate::time::{Duration, HostTime};

/// Timer callback. Receives the host that owns the queue.
pub type TimerCallback<H> = Box<dyn FnMut(&mut H) -> Result<(), CallbackError>>;

/// Identifies a scheduled timeout.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeoutId(pub(crate) u64);

impl TimeoutId {
    /// Returns the raw id value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TimeoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeoutId({})", self.0)
    }
}

/// Owner of a [`TimerQueue`] whose callbacks receive `&mut Self`.
pub trait TimerHost: Sized {
    /// The host's timer queue.
    fn timers(&mut self) -> &mut TimerQueue<Self>;

    /// Whether the host is shutting down. A due pass stops firing as soon as
    /// this turns true.
    fn is_stopping(&self) -> bool;
}

struct Timeout<H> {
    id: TimeoutId,
    fire_time: HostTime,
    interval: Option<Duration>,
    // `None` only while the callback is running.
    callback: Option<TimerCallback<H>>,
}

/// Pending timeouts ordered by fire time.
pub struct TimerQueue<H> {
    pending: Vec<Timeout<H>>,
    staged: Vec<Timeout<H>>,
    next_id: u64,
    in_pass: bool,
    current: Option<TimeoutId>,
    current_cancelled: bool,
}

impl<H> fmt::Debug for TimerQueue<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("pending", &self.pending.len())
            .field("staged", &self.staged.len())
            .field("in_pass", &self.in_pass)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl<H> Default for TimerQueue<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> TimerQueue<H> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            staged: Vec::new(),
            next_id: 1,
            in_pass: false,
            current: None,
            current_cancelled: false,
        }
    }

    /// Schedules `callback` to fire at `fire_time`.
    ///
    /// With `interval`, the timeout fires again `interval` after each pass
    /// that fired it. Scheduling from inside a due pass defers insertion
    /// until the pass ends.
    pub fn schedule<F>(
        &mut self,
        fire_time: HostTime,
        interval: Option<Duration>,
        callback: F,
    ) -> TimeoutId
    where
        F: FnMut(&mut H) -> Result<(), CallbackError> + 'static,
    {
        let id = TimeoutId(self.next_id);
        self.next_id += 1;
        let timeout = Timeout {
            id,
            fire_time,
            interval,
            callback: Some(Box::new(callback)),
        };
        if self.in_pass {
            self.staged.push(timeout);
        } else {
            self.insert_sorted(timeout);
        }
        id
    }

    /// Cancels a timeout. Returns whether it was found.
    ///
    /// Cancelling the timeout whose callback is running is allowed; it will
    /// not fire again.
    pub fn cancel(&mut self, id: TimeoutId) -> bool {
        if self.current == Some(id) {
            let found = !self.current_cancelled;
            self.current_cancelled = true;
            return found;
        }
        if let Some(pos) = self.pending.iter().position(|t| t.id == id) {
            self.pending.remove(pos);
            return true;
        }
        if let Some(pos) = self.staged.iter().position(|t| t.id == id) {
            self.staged.remove(pos);
            return true;
        }
        false
    }

    /// Whether a timeout is still scheduled.
    #[must_use]
    pub fn contains(&self, id: TimeoutId) -> bool {
        if self.current == Some(id) {
            return !self.current_cancelled;
        }
        self.pending.iter().chain(&self.staged).any(|t| t.id == id)
    }

    /// Number of scheduled timeouts, staged ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len() + self.staged.len()
    }

    /// Whether nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fire time of the earliest pending timeout.
    #[must_use]
    pub fn next_fire_time(&self) -> Option<HostTime> {
        self.pending.first().map(|t| t.fire_time)
    }

    /// Drops every timeout.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.staged.clear();
        if self.current.is_some() {
            self.current_cancelled = true;
        }
    }

    fn insert_sorted(&mut self, timeout: Timeout<H>) {
        let pos = self
            .pending
            .partition_point(|t| t.fire_time <= timeout.fire_time);
        self.pending.insert(pos, timeout);
    }

    fn merge_staged(&mut self) {
        for timeout in core::mem::take(&mut self.staged) {
            self.insert_sorted(timeout);
        }
    }
}

impl<H: TimerHost> TimerQueue<H> {
    /// Fires every timeout of `host`'s queue that is due at `now`, earliest
    /// first. Returns the number of callbacks invoked.
    ///
    /// A failing callback ends the pass and its error is returned; timeouts
    /// scheduled before the failure are kept.
    pub fn run_due_pass(host: &mut H, now: HostTime) -> Result<usize, CallbackError> {
        host.timers().in_pass = true;
        let result = Self::fire_due(host, now);
        let queue = host.timers();
        queue.in_pass = false;
        queue.current = None;
        queue.current_cancelled = false;
        queue.merge_staged();
        result
    }

    fn fire_due(host: &mut H, now: HostTime) -> Result<usize, CallbackError> {
        let mut fired = 0;
        while !host.is_stopping() {
            let queue = host.timers();
            let Some(head) = queue.pending.first_mut() else {
                break;
            };
            if head.fire_time > now {
                break;
            }
            let id = head.id;
            let mut callback = head.callback.take();
            queue.current = Some(id);
            queue.current_cancelled = false;

            let outcome = match callback.as_mut() {
                Some(cb) => cb(host),
                None => Ok(()),
            };
            fired += 1;

            let queue = host.timers();
            let cancelled = queue.current_cancelled;
            queue.current = None;
            queue.current_cancelled = false;
            // Other timeouts may have been cancelled meanwhile, so look the
            // head up again instead of assuming index 0.
            if let Some(pos) = queue.pending.iter().position(|t| t.id == id) {
                let mut timeout = queue.pending.remove(pos);
                if let (false, Some(period)) = (cancelled, timeout.interval) {
                    timeout.fire_time = now.saturating_add(period);
                    timeout.callback = callback;
                    queue.staged.push(timeout);
                }
            }
            outcome?;
        }
        Ok(fired)
    }
}

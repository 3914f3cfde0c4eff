// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lists of callbacks run at fixed points of the frame loop.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::error::CallbackError;

/// A frame-loop hook. Receives the host that owns the list.
pub type Hook<H> = Box<dyn FnMut(&mut H) -> Result<(), CallbackError>>;

/// Identifies a registered hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HookId(u64);

struct Entry<H> {
    id: HookId,
    hook: Hook<H>,
}

/// Ordered hook list that tolerates hooks adding and removing hooks while
/// the list runs.
///
/// Hooks added during a run are first invoked on the next run. A hook
/// removed during a run is not invoked afterwards, even within the same run.
pub struct HookList<H> {
    entries: Vec<Entry<H>>,
    next_id: u64,
    running: bool,
    // Hooks taken out by the run in progress.
    in_flight: Vec<HookId>,
    // In-flight hooks removed during the run.
    removed: Vec<HookId>,
}

impl<H> fmt::Debug for HookList<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookList")
            .field("len", &self.entries.len())
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl<H> Default for HookList<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> HookList<H> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            running: false,
            in_flight: Vec::new(),
            removed: Vec::new(),
        }
    }

    /// Appends a hook.
    pub fn add<F>(&mut self, hook: F) -> HookId
    where
        F: FnMut(&mut H) -> Result<(), CallbackError> + 'static,
    {
        let id = HookId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            hook: Box::new(hook),
        });
        id
    }

    /// Removes a hook. Returns whether it was registered.
    pub fn remove(&mut self, id: HookId) -> bool {
        if let Some(pos) = self.entries.iter().position(|e| e.id == id) {
            self.entries.remove(pos);
            return true;
        }
        if self.in_flight.contains(&id) && !self.removed.contains(&id) {
            self.removed.push(id);
            return true;
        }
        false
    }

    /// Number of registered hooks (not counting those taken out by a run in
    /// progress).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no hooks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every hook, including those taken out by a run in progress.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.removed.clone_from(&self.in_flight);
    }

    /// Invokes every hook in registration order.
    ///
    /// `list` locates this list inside `host`. The first failing hook ends
    /// the run; its error is returned and no hook is lost.
    pub fn run(host: &mut H, list: fn(&mut H) -> &mut Self) -> Result<(), CallbackError> {
        let this = list(host);
        if this.running {
            // Re-entrant run from inside a hook: nothing left to call.
            return Ok(());
        }
        let mut taken = core::mem::take(&mut this.entries);
        this.in_flight = taken.iter().map(|e| e.id).collect();
        this.running = true;

        let mut result = Ok(());
        for entry in &mut taken {
            if list(host).removed.contains(&entry.id) {
                continue;
            }
            if let Err(e) = (entry.hook)(host) {
                result = Err(e);
                break;
            }
        }

        let this = list(host);
        let removed = core::mem::take(&mut this.removed);
        this.in_flight.clear();
        taken.retain(|e| !removed.contains(&e.id));
        // Hooks added during the run go after the existing ones.
        taken.append(&mut this.entries);
        this.entries = taken;
        this.running = false;
        result
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[derive(Default)]
    struct Host {
        hooks: HookList<Self>,
        log: Vec<u32>,
        ids: Vec<HookId>,
    }

    fn hooks(h: &mut Host) -> &mut HookList<Host> {
        &mut h.hooks
    }

    #[test]
    fn runs_in_registration_order() {
        let mut host = Host::default();
        for tag in [3, 1, 2] {
            host.hooks.add(move |h: &mut Host| {
                h.log.push(tag);
                Ok(())
            });
        }
        HookList::run(&mut host, hooks).unwrap();
        HookList::run(&mut host, hooks).unwrap();
        assert_eq!(host.log, vec![3, 1, 2, 3, 1, 2]);
    }

    #[test]
    fn hook_added_during_run_waits_for_next_run() {
        let mut host = Host::default();
        host.hooks.add(|h: &mut Host| {
            h.log.push(1);
            if h.log.len() == 1 {
                h.hooks.add(|h: &mut Host| {
                    h.log.push(2);
                    Ok(())
                });
            }
            Ok(())
        });
        HookList::run(&mut host, hooks).unwrap();
        assert_eq!(host.log, vec![1]);
        HookList::run(&mut host, hooks).unwrap();
        assert_eq!(host.log, vec![1, 1, 2]);
    }

    #[test]
    fn hook_removed_during_run_is_skipped() {
        let mut host = Host::default();
        host.hooks.add(|h: &mut Host| {
            h.log.push(1);
            let later = h.ids[1];
            assert!(h.hooks.remove(later));
            Ok(())
        });
        let later = host.hooks.add(|h: &mut Host| {
            h.log.push(2);
            Ok(())
        });
        let first = HookId(1);
        host.ids = vec![first, later];

        HookList::run(&mut host, hooks).unwrap();
        assert_eq!(host.log, vec![1]);
        assert_eq!(host.hooks.len(), 1);
    }

    #[test]
    fn failing_hook_keeps_list_intact() {
        let mut host = Host::default();
        host.hooks.add(|_: &mut Host| Err(CallbackError::new("nope")));
        host.hooks.add(|h: &mut Host| {
            h.log.push(2);
            Ok(())
        });
        assert!(HookList::run(&mut host, hooks).is_err());
        assert!(host.log.is_empty());
        assert_eq!(host.hooks.len(), 2);
    }
}

//! The deadline scheduler: maps suspended processes to points in simulated
//! time and fires the nearest deadline(s).
//!
//! Simulated time is a non-negative `f64` in seconds and only ever moves
//! forward. A [`Deadline::Immediately`] entry is a zero-delay continuation:
//! it fires on the next [`Timeline::advance`] without moving time, and it
//! never fires later than a timed deadline at the same instant.

use std::collections::HashMap;

use crate::error::SimError;
use crate::process::ProcessId;

/// When a suspended process should next become runnable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Deadline {
    /// Run at the current time on the next `advance`, without moving time.
    Immediately,
    /// Run once time reaches the given instant (seconds).
    At(f64),
}

/// The kernel's deadline scheduler.
#[derive(Debug, Default)]
pub struct Timeline {
    now: f64,
    deadlines: HashMap<ProcessId, Deadline>,
}

impl Timeline {
    /// Creates a timeline at time zero with no pending deadlines.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current simulated time in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Returns whether the given process has a pending deadline.
    pub fn is_pending(&self, process: ProcessId) -> bool {
        self.deadlines.contains_key(&process)
    }

    /// Restores the timeline to time zero with no pending deadlines.
    pub fn reset(&mut self) {
        self.now = 0.0;
        self.deadlines.clear();
    }

    /// Schedules `process` to become runnable at time `run_at`.
    ///
    /// Errors if the process already has a pending deadline.
    pub fn at(&mut self, run_at: f64, process: ProcessId) -> Result<(), SimError> {
        self.insert(process, Deadline::At(run_at))
    }

    /// Schedules `process` after `delay_by` seconds, or immediately (a
    /// zero-delay continuation at the current instant) when `delay_by` is
    /// `None`.
    pub fn delay(&mut self, delay_by: Option<f64>, process: ProcessId) -> Result<(), SimError> {
        match delay_by {
            Some(d) => self.insert(process, Deadline::At(self.now + d)),
            None => self.insert(process, Deadline::Immediately),
        }
    }

    fn insert(&mut self, process: ProcessId, deadline: Deadline) -> Result<(), SimError> {
        if self.deadlines.contains_key(&process) {
            return Err(SimError::DeadlinePending {
                process: process.as_raw(),
            });
        }
        self.deadlines.insert(process, deadline);
        Ok(())
    }

    /// Fires the nearest deadline(s), removing them from the pending set and
    /// returning the processes that should become runnable.
    ///
    /// If any `Immediately` deadline is pending, the winning instant is the
    /// current time: every `Immediately` process fires, together with every
    /// timed process scheduled at exactly the current time, and `now` does
    /// not change. Otherwise `now` moves to the minimum timed deadline and
    /// every process tied for it fires.
    ///
    /// Returns an empty vector, leaving `now` unchanged, if no deadline is
    /// pending.
    pub fn advance(&mut self) -> Vec<ProcessId> {
        let mut nearest = None::<f64>;
        let mut any_immediate = false;
        for deadline in self.deadlines.values() {
            match *deadline {
                Deadline::Immediately => any_immediate = true,
                Deadline::At(t) => {
                    debug_assert!(t >= self.now, "stored deadline {t} is before now {}", self.now);
                    if nearest.is_none_or(|n| t < n) {
                        nearest = Some(t);
                    }
                }
            }
        }

        let winner = if any_immediate {
            self.now
        } else {
            match nearest {
                Some(t) => t,
                None => return Vec::new(),
            }
        };

        let fired: Vec<ProcessId> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| match **deadline {
                Deadline::Immediately => true,
                Deadline::At(t) => t == winner,
            })
            .map(|(&process, _)| process)
            .collect();

        for process in &fired {
            self.deadlines.remove(process);
        }
        self.now = winner;
        fired
    }
}

//! The process abstraction and its suspend/resume protocol.
//!
//! A simulation process is a [`Behavior`]: a resumable state machine that,
//! each time it is resumed, performs any number of non-suspending signal
//! reads and staged writes through its [`ProcessContext`], then returns one
//! [`Wait`] request telling the kernel when to resume it next. This is the
//! explicit-state-machine rendition of a simulation coroutine: resume, run
//! until the next request, suspend.
//!
//! Reads observe committed values only; writes stage pending values that
//! become visible after the next commit. Neither suspends.

use crest_netlist::{ArenaId, Bits, DomainId, SignalId};
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::state::SignalStore;

/// Opaque, arena-assigned ID for a registered simulation process.
///
/// Process identity is this stable integer, never object identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ProcessId(u32);

impl ProcessId {
    /// Creates a `ProcessId` from a raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl ArenaId for ProcessId {
    fn from_raw(index: u32) -> Self {
        Self(index)
    }

    fn as_raw(self) -> u32 {
        self.0
    }
}

/// A suspension request: what must happen before the process resumes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Wait {
    /// Resume once the current fixed-point settling pass completes, so the
    /// next observations see only settled values.
    Settle,
    /// Resume after the given number of seconds; `None` resumes when the
    /// next settling pass begins (a zero-delay continuation).
    Delay(Option<f64>),
    /// Resume on the named domain's next active clock edge (and its reset
    /// edge, if the domain uses an asynchronous reset).
    Tick(DomainId),
    /// The process is finished; it passivates and never resumes again.
    Halt,
}

/// The window a process sees into the simulation while it is running.
///
/// All operations here are non-suspending. Control returns to the kernel
/// only through the [`Wait`] value the behavior returns.
pub struct ProcessContext<'a> {
    pub(crate) state: &'a mut SignalStore,
    pub(crate) now: f64,
    pub(crate) passive: bool,
}

impl ProcessContext<'_> {
    /// Reads a signal's committed value.
    pub fn read(&mut self, signal: SignalId) -> Result<Bits, SimError> {
        self.state.read(signal)
    }

    /// Stages a value into a signal's pending slot; other processes observe
    /// it only after the next commit.
    pub fn write(&mut self, signal: SignalId, value: &Bits) -> Result<(), SimError> {
        self.state.write(signal, value)
    }

    /// Toggles whether this process counts toward "the simulation still has
    /// work to do". Execution continues immediately.
    pub fn set_passive(&mut self, passive: bool) {
        self.passive = passive;
    }

    /// Returns the current simulated time in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }
}

/// One unit of concurrent simulation logic.
///
/// Implemented directly by explicit state machines (see [`ClockBehavior`])
/// and by `FnMut(&mut ProcessContext<'_>) -> Result<Wait, SimError>`
/// closures.
pub trait Behavior {
    /// Runs the process until its next suspension request.
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError>;
}

impl<F> Behavior for F
where
    F: FnMut(&mut ProcessContext<'_>) -> Result<Wait, SimError>,
{
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        self(ctx)
    }
}

/// Wraps a behavior so that its very first resume yields a fixed request.
///
/// Testbench processes are prefixed with [`Wait::Settle`] so their first
/// observations happen only after reset values have settled; synchronous
/// processes are prefixed with [`Wait::Tick`] so their first statement runs
/// after the first active clock edge, matching the latency of a real
/// synchronous register.
pub(crate) struct Prefixed<B> {
    first: Option<Wait>,
    inner: B,
}

impl<B: Behavior> Prefixed<B> {
    pub(crate) fn new(first: Wait, inner: B) -> Self {
        Self {
            first: Some(first),
            inner,
        }
    }
}

impl<B: Behavior> Behavior for Prefixed<B> {
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        if let Some(first) = self.first.take() {
            return Ok(first);
        }
        self.inner.resume(ctx)
    }
}

/// The synthesized clock generator: passivates itself, waits out the phase
/// offset, latches the clock's initial level, then toggles forever at a 50%
/// duty cycle.
///
/// Latching the initial level (rather than assuming zero) keeps the
/// generator correct if the clock was manipulated before the process was
/// added, or if its reset state is high.
pub(crate) struct ClockBehavior {
    clk: SignalId,
    phase: f64,
    half_period: f64,
    state: ClockState,
    initial: bool,
}

enum ClockState {
    Start,
    Latch,
    High,
    Low,
}

impl ClockBehavior {
    pub(crate) fn new(clk: SignalId, period: f64, phase: Option<f64>) -> Self {
        let half_period = period / 2.0;
        Self {
            clk,
            // By default the first edge lands half a period in, so synchronous
            // activity is visibly distinct from reset values in a trace.
            phase: phase.unwrap_or(half_period),
            half_period,
            state: ClockState::Start,
            initial: false,
        }
    }
}

impl Behavior for ClockBehavior {
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        match self.state {
            ClockState::Start => {
                ctx.set_passive(true);
                self.state = ClockState::Latch;
                Ok(Wait::Delay(Some(self.phase)))
            }
            ClockState::Latch => {
                self.initial = ctx.read(self.clk)?.get(0);
                ctx.write(self.clk, &Bits::from_bool(!self.initial))?;
                self.state = ClockState::High;
                Ok(Wait::Delay(Some(self.half_period)))
            }
            ClockState::High => {
                ctx.write(self.clk, &Bits::from_bool(self.initial))?;
                self.state = ClockState::Low;
                Ok(Wait::Delay(Some(self.half_period)))
            }
            ClockState::Low => {
                ctx.write(self.clk, &Bits::from_bool(!self.initial))?;
                self.state = ClockState::High;
                Ok(Wait::Delay(Some(self.half_period)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::InterpEvaluator;
    use crest_netlist::Netlist;
    use std::sync::Arc;

    fn make_store() -> (SignalStore, SignalId) {
        let mut netlist = Netlist::new();
        let clk = netlist.add_signal("top.clk", 1, 0);
        let netlist = Arc::new(netlist);
        let eval_netlist = netlist.clone();
        let store = SignalStore::new(
            netlist,
            Box::new(move || Box::new(InterpEvaluator::new(eval_netlist.clone()))),
        );
        (store, clk)
    }

    #[test]
    fn prefixed_emits_first_request_once() {
        let (mut store, _clk) = make_store();
        let mut behavior = Prefixed::new(Wait::Settle, |_: &mut ProcessContext<'_>| {
            Ok(Wait::Halt)
        });
        let mut ctx = ProcessContext {
            state: &mut store,
            now: 0.0,
            passive: false,
        };
        assert_eq!(behavior.resume(&mut ctx).unwrap(), Wait::Settle);
        assert_eq!(behavior.resume(&mut ctx).unwrap(), Wait::Halt);
    }

    #[test]
    fn closure_behavior_reads_and_writes() {
        let (mut store, clk) = make_store();
        let mut behavior = move |ctx: &mut ProcessContext<'_>| {
            let v = ctx.read(clk)?;
            ctx.write(clk, &!&v)?;
            Ok(Wait::Halt)
        };
        let mut ctx = ProcessContext {
            state: &mut store,
            now: 0.0,
            passive: false,
        };
        assert_eq!(Behavior::resume(&mut behavior, &mut ctx).unwrap(), Wait::Halt);
        // The write is staged, not committed.
        assert_eq!(store.read(clk).unwrap().to_u64(), Some(0));
        let (changed, _) = store.commit();
        assert!(changed);
        assert_eq!(store.read(clk).unwrap().to_u64(), Some(1));
    }

    #[test]
    fn set_passive_is_non_suspending() {
        let (mut store, _clk) = make_store();
        let mut ctx = ProcessContext {
            state: &mut store,
            now: 1.5,
            passive: false,
        };
        ctx.set_passive(true);
        assert!(ctx.passive);
        assert_eq!(ctx.now(), 1.5);
    }

    #[test]
    fn clock_behavior_sequence() {
        let (mut store, clk) = make_store();
        let mut clock = ClockBehavior::new(clk, 10.0, None);

        // First resume: passivate and delay by the default phase (period/2).
        let mut ctx = ProcessContext {
            state: &mut store,
            now: 0.0,
            passive: false,
        };
        assert_eq!(clock.resume(&mut ctx).unwrap(), Wait::Delay(Some(5.0)));
        assert!(ctx.passive);

        // Second resume: latch initial level, drive the opposite.
        let mut ctx = ProcessContext {
            state: &mut store,
            now: 5.0,
            passive: true,
        };
        assert_eq!(clock.resume(&mut ctx).unwrap(), Wait::Delay(Some(5.0)));
        store.commit();
        assert_eq!(store.read(clk).unwrap().to_u64(), Some(1));

        // Third resume: back to the initial level.
        let mut ctx = ProcessContext {
            state: &mut store,
            now: 10.0,
            passive: true,
        };
        assert_eq!(clock.resume(&mut ctx).unwrap(), Wait::Delay(Some(5.0)));
        store.commit();
        assert_eq!(store.read(clk).unwrap().to_u64(), Some(0));
    }

    #[test]
    fn clock_behavior_respects_initial_high() {
        let (mut store, clk) = make_store();
        store.write(clk, &Bits::from_bool(true)).unwrap();
        store.commit();

        let mut clock = ClockBehavior::new(clk, 10.0, Some(2.0));
        let mut ctx = ProcessContext {
            state: &mut store,
            now: 0.0,
            passive: false,
        };
        assert_eq!(clock.resume(&mut ctx).unwrap(), Wait::Delay(Some(2.0)));

        let mut ctx = ProcessContext {
            state: &mut store,
            now: 2.0,
            passive: true,
        };
        clock.resume(&mut ctx).unwrap();
        store.commit();
        // A clock that starts high toggles low first.
        assert_eq!(store.read(clk).unwrap().to_u64(), Some(0));
    }

    #[test]
    fn process_id_roundtrip() {
        let id = ProcessId::from_raw(7);
        assert_eq!(id.as_raw(), 7);
        let json = serde_json::to_string(&id).unwrap();
        let back: ProcessId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}

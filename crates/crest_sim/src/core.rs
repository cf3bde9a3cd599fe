//! The event-driven simulation kernel.
//!
//! [`Simulator`] owns the timeline, the registered processes, and the
//! signal state store, and drives them through the settle/advance cycle:
//! run every runnable process, iterate the evaluator to a combinational
//! fixed point, commit, wake edge-triggered processes, then pop the next
//! timeline deadline. Waveform sessions are sampled once per advance,
//! after settling, so traces only ever contain settled values.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use crest_netlist::{Arena, Bits, DomainId, Netlist, SignalId};

use crate::error::SimError;
use crate::eval::{EvaluatorFactory, VcdId};
use crate::interp::InterpEvaluator;
use crate::process::{Behavior, ClockBehavior, Prefixed, ProcessContext, ProcessId, Wait};
use crate::state::SignalStore;
use crate::timeline::Timeline;

/// Waveform sample resolution: one tick per 100 ps.
///
/// Fine enough to keep distinct sub-nanosecond events distinct, coarse
/// enough that a `u64` tick counter covers decades of simulated time.
const TICKS_PER_SECOND: f64 = 1e10;

type BehaviorCtor = Box<dyn Fn() -> Box<dyn Behavior>>;

/// Handle for an open waveform session on a [`Simulator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaveformId(u32);

struct WaveSession {
    vcd: VcdId,
    sink: Box<dyn Write>,
}

/// One registered process: its constructor (kept for reset), its live
/// behavior, and its scheduling flags.
struct ProcessSlot {
    ctor: BehaviorCtor,
    /// Taken while the behavior runs, so the kernel can hand the process a
    /// mutable view of the rest of the simulation.
    behavior: Option<Box<dyn Behavior>>,
    runnable: bool,
    passive: bool,
    halted: bool,
}

/// The simulation kernel.
pub struct Simulator {
    netlist: Arc<Netlist>,
    timeline: Timeline,
    processes: Arena<ProcessId, ProcessSlot>,
    state: SignalStore,
    clocked: HashSet<DomainId>,
    waves: Vec<Option<WaveSession>>,
    max_settle_passes: Option<u32>,
}

impl Simulator {
    /// Creates a simulator over a netlist, using the built-in interpreting
    /// evaluator.
    pub fn new(netlist: Netlist) -> Self {
        let netlist = Arc::new(netlist);
        let eval_netlist = netlist.clone();
        let factory: EvaluatorFactory =
            Box::new(move || Box::new(InterpEvaluator::new(eval_netlist.clone())));
        Self::from_parts(netlist, factory)
    }

    /// Creates a simulator with a custom evaluator factory, for toolchains
    /// that substitute a compiled evaluator for the interpreter.
    pub fn with_evaluator(netlist: Netlist, factory: EvaluatorFactory) -> Self {
        Self::from_parts(Arc::new(netlist), factory)
    }

    fn from_parts(netlist: Arc<Netlist>, factory: EvaluatorFactory) -> Self {
        let state = SignalStore::new(netlist.clone(), factory);
        Self {
            netlist,
            timeline: Timeline::new(),
            processes: Arena::new(),
            state,
            clocked: HashSet::new(),
            waves: Vec::new(),
            max_settle_passes: None,
        }
    }

    /// Returns the netlist this simulator runs.
    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    /// Returns the current simulated time in seconds.
    pub fn now(&self) -> f64 {
        self.timeline.now()
    }

    /// Caps the number of eval/commit passes one settling phase may take.
    ///
    /// Unset by default: an unstable combinational loop then simply never
    /// settles, the same way the physical circuit never would.
    pub fn set_max_settle_passes(&mut self, cap: Option<u32>) {
        self.max_settle_passes = cap;
    }

    fn register(&mut self, ctor: BehaviorCtor) -> ProcessId {
        let behavior = Some((ctor)());
        self.processes.alloc(ProcessSlot {
            ctor,
            behavior,
            runnable: true,
            passive: false,
            halted: false,
        })
    }

    /// Registers a testbench process.
    ///
    /// The constructor is retained so [`Simulator::reset`] can rebuild the
    /// behavior from scratch. The behavior's first observations happen only
    /// after reset values have settled.
    pub fn add_process<B, F>(&mut self, constructor: F) -> ProcessId
    where
        B: Behavior + 'static,
        F: Fn() -> B + 'static,
    {
        self.register(Box::new(move || {
            Box::new(Prefixed::new(Wait::Settle, constructor()))
        }))
    }

    /// Registers a synchronous process on a clock domain.
    ///
    /// The behavior first resumes after the domain's first active clock
    /// edge, so it exhibits the same one-edge latency as a synchronous
    /// register.
    pub fn add_sync_process<B, F>(
        &mut self,
        domain: &str,
        constructor: F,
    ) -> Result<ProcessId, SimError>
    where
        B: Behavior + 'static,
        F: Fn() -> B + 'static,
    {
        let id = self.domain(domain)?;
        Ok(self.register(Box::new(move || {
            Box::new(Prefixed::new(Wait::Tick(id), constructor()))
        })))
    }

    /// Attaches a clock generator to the `"sync"` domain.
    pub fn add_clock(&mut self, period: f64) -> Result<(), SimError> {
        self.add_clock_to(period, None, "sync", false)
    }

    /// Attaches a clock generator to a named domain.
    ///
    /// `phase` delays the first edge; it defaults to half a period. With
    /// `if_exists`, a missing domain is silently skipped instead of being
    /// an error — useful for driving a standard set of domains over designs
    /// that only use some of them. Driving the same domain twice is always
    /// an error.
    pub fn add_clock_to(
        &mut self,
        period: f64,
        phase: Option<f64>,
        domain: &str,
        if_exists: bool,
    ) -> Result<(), SimError> {
        let Some(id) = self.netlist.find_domain(domain) else {
            if if_exists {
                return Ok(());
            }
            return Err(SimError::UnknownDomain {
                name: domain.to_string(),
            });
        };
        if !self.clocked.insert(id) {
            return Err(SimError::DomainAlreadyClocked {
                name: domain.to_string(),
            });
        }
        let clk = self.netlist.domain(id).clk;
        self.register(Box::new(move || {
            Box::new(ClockBehavior::new(clk, period, phase))
        }));
        Ok(())
    }

    /// Resolves a clock domain by name.
    pub fn domain(&self, name: &str) -> Result<DomainId, SimError> {
        self.netlist
            .find_domain(name)
            .ok_or_else(|| SimError::UnknownDomain {
                name: name.to_string(),
            })
    }

    /// Reads a signal's committed value from outside any process.
    pub fn signal_value(&mut self, signal: SignalId) -> Result<Bits, SimError> {
        self.state.read(signal)
    }

    /// Stages a signal value from outside any process; it takes effect at
    /// the next commit.
    pub fn set_signal(&mut self, signal: SignalId, value: &Bits) -> Result<(), SimError> {
        self.state.write(signal, value)
    }

    /// Resumes one process and acts on its suspension request.
    fn run_process(&mut self, id: ProcessId) -> Result<(), SimError> {
        let now = self.timeline.now();
        let slot = self.processes.get_mut(id);
        slot.runnable = false;
        let Some(mut behavior) = slot.behavior.take() else {
            return Ok(());
        };
        let mut ctx = ProcessContext {
            state: &mut self.state,
            now,
            passive: slot.passive,
        };
        let result = behavior.resume(&mut ctx);
        let passive = ctx.passive;
        let slot = self.processes.get_mut(id);
        slot.passive = passive;
        slot.behavior = Some(behavior);
        match result? {
            Wait::Settle | Wait::Delay(None) => self.timeline.delay(None, id)?,
            Wait::Delay(Some(seconds)) => self.timeline.delay(Some(seconds), id)?,
            Wait::Tick(domain) => {
                let dom = self.netlist.domain(domain);
                let clk = dom.clk;
                let active = Bits::from_bool(dom.edge.active_level());
                let rst = if dom.async_reset { dom.rst } else { None };
                self.state.add_trigger(id, clk, Some(active))?;
                if let Some(rst) = rst {
                    self.state.add_trigger(id, rst, Some(Bits::from_bool(true)))?;
                }
            }
            Wait::Halt => {
                let slot = self.processes.get_mut(id);
                slot.halted = true;
                slot.passive = true;
            }
        }
        Ok(())
    }

    /// Runs processes and iterates the evaluator until no staged change
    /// and no runnable process remains.
    ///
    /// Processes observe only values committed in earlier passes, so their
    /// execution order within a pass is unobservable.
    pub fn settle(&mut self) -> Result<(), SimError> {
        let mut passes: u32 = 0;
        loop {
            let runnable: Vec<ProcessId> = self
                .processes
                .iter()
                .filter(|(_, slot)| slot.runnable && !slot.halted)
                .map(|(id, _)| id)
                .collect();
            for id in runnable {
                self.run_process(id)?;
            }
            self.state.eval();
            let (changed, woken) = self.state.commit();
            for id in woken {
                self.state.clear_triggers(id);
                let slot = self.processes.get_mut(id);
                if !slot.halted {
                    slot.runnable = true;
                }
            }
            let more = self.processes.values().any(|s| s.runnable && !s.halted);
            if !changed && !more {
                return Ok(());
            }
            passes += 1;
            if let Some(cap) = self.max_settle_passes {
                if passes >= cap {
                    return Err(SimError::SettleLimit {
                        now: self.timeline.now(),
                        passes: cap,
                    });
                }
            }
        }
    }

    /// Settles the design, samples waveforms, then pops the next timeline
    /// deadline and wakes its processes.
    ///
    /// Returns whether any non-passive process remains; when it returns
    /// `false` the simulation has no observable work left.
    pub fn advance(&mut self) -> Result<bool, SimError> {
        self.settle()?;
        self.sample_waveforms()?;
        for id in self.timeline.advance() {
            let slot = self.processes.get_mut(id);
            if !slot.halted {
                slot.runnable = true;
            }
        }
        Ok(self
            .processes
            .values()
            .any(|slot| !slot.passive && !slot.halted))
    }

    /// Runs until every remaining process is passive.
    pub fn run(&mut self) -> Result<(), SimError> {
        while self.advance()? {}
        Ok(())
    }

    /// Runs until the deadline (in seconds) is reached, or — unless
    /// `run_passive` is set — until every remaining process is passive,
    /// whichever comes first.
    ///
    /// With `run_passive`, a simulation whose only activity is passive
    /// (e.g. a lone clock generator) keeps stepping until the deadline.
    pub fn run_until(&mut self, deadline: f64, run_passive: bool) -> Result<(), SimError> {
        let now = self.timeline.now();
        if now > deadline {
            return Err(SimError::DeadlineInPast { now, deadline });
        }
        loop {
            let active = self.advance()?;
            if !active && !run_passive {
                return Ok(());
            }
            if self.timeline.now() >= deadline {
                return Ok(());
            }
        }
    }

    /// Rewinds the simulation to its initial state: time zero, all signals
    /// at their reset values, every process rebuilt from its constructor.
    ///
    /// Registered clocks survive a reset. Open waveform sessions are
    /// flushed and closed first: a trace cannot continue across the rewind
    /// to time zero, and the recreated evaluator would discard their
    /// buffered data. A new session may be opened afterwards.
    pub fn reset(&mut self) {
        self.drain_waveforms();
        self.timeline.reset();
        self.state.reset();
        for index in 0..self.processes.len() {
            let slot = self.processes.get_mut(ProcessId::from_raw(index as u32));
            slot.behavior = Some((slot.ctor)());
            slot.runnable = true;
            slot.passive = false;
            slot.halted = false;
        }
    }

    /// Opens a waveform session tracing every signal to `sink`.
    ///
    /// Sessions must open at time zero so the trace has a complete history.
    pub fn write_vcd<W: Write + 'static>(&mut self, sink: W) -> Result<WaveformId, SimError> {
        self.open_vcd(sink, None)
    }

    /// Opens a waveform session tracing only the given signals.
    pub fn write_vcd_filtered<W: Write + 'static>(
        &mut self,
        sink: W,
        signals: &[SignalId],
    ) -> Result<WaveformId, SimError> {
        self.open_vcd(sink, Some(signals))
    }

    fn open_vcd(
        &mut self,
        sink: impl Write + 'static,
        filter: Option<&[SignalId]>,
    ) -> Result<WaveformId, SimError> {
        let now = self.timeline.now();
        if now != 0.0 {
            return Err(SimError::WaveformAfterStart { now });
        }
        let evaluator = self.state.evaluator_mut();
        let vcd = evaluator.vcd_create();
        match filter {
            None => evaluator.vcd_add_all(vcd),
            Some(signals) => {
                for &signal in signals {
                    let name = self.netlist.signal(signal).name.clone();
                    if !evaluator.vcd_add(vcd, &name) {
                        evaluator.vcd_destroy(vcd);
                        return Err(SimError::UnknownSignal { name });
                    }
                }
            }
        }
        evaluator.vcd_timescale(vcd, 100, "ps");
        let id = WaveformId(self.waves.len() as u32);
        self.waves.push(Some(WaveSession {
            vcd,
            sink: Box::new(sink),
        }));
        Ok(id)
    }

    /// Closes a waveform session, flushing any buffered trace data.
    pub fn close_vcd(&mut self, id: WaveformId) -> Result<(), SimError> {
        let slot = self
            .waves
            .get_mut(id.0 as usize)
            .ok_or(SimError::UnknownWaveform { id: id.0 })?;
        let mut session = slot.take().ok_or(SimError::WaveformClosed)?;
        let evaluator = self.state.evaluator_mut();
        let bytes = evaluator.vcd_read(session.vcd);
        evaluator.vcd_destroy(session.vcd);
        if !bytes.is_empty() {
            session.sink.write_all(&bytes)?;
        }
        session.sink.flush()?;
        Ok(())
    }

    /// Flushes and closes every open waveform session, ignoring sink
    /// errors; shared by [`reset`](Self::reset) and `Drop`.
    fn drain_waveforms(&mut self) {
        let evaluator = self.state.evaluator_mut();
        for slot in self.waves.iter_mut() {
            let Some(mut session) = slot.take() else {
                continue;
            };
            let bytes = evaluator.vcd_read(session.vcd);
            evaluator.vcd_destroy(session.vcd);
            if !bytes.is_empty() {
                let _ = session.sink.write_all(&bytes);
            }
            let _ = session.sink.flush();
        }
    }

    fn sample_waveforms(&mut self) -> Result<(), SimError> {
        if self.waves.iter().all(Option::is_none) {
            return Ok(());
        }
        let tick = (self.timeline.now() * TICKS_PER_SECOND).round() as u64;
        let evaluator = self.state.evaluator_mut();
        for session in self.waves.iter_mut().flatten() {
            evaluator.vcd_sample(session.vcd, tick);
            let bytes = evaluator.vcd_read(session.vcd);
            if !bytes.is_empty() {
                session.sink.write_all(&bytes)?;
            }
        }
        Ok(())
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.drain_waveforms();
    }
}

//! The evaluator bridge: the contract the kernel requires from a circuit
//! evaluator.
//!
//! The kernel never computes signal values itself. It drives an opaque
//! [`Evaluator`] — one handle per simulation generation, recreated wholesale
//! on reset — through single propagation passes and atomic commits, and
//! reads serialized waveform deltas back from it. The reference
//! implementation is [`InterpEvaluator`](crate::interp::InterpEvaluator);
//! a production toolchain substitutes a compiled native evaluator behind
//! the same trait.

use crest_netlist::Bits;

/// A storage location backing one signal inside the evaluator.
///
/// Wide signals span multiple machine words; the location carries the width
/// so the kernel can size value buffers without consulting the netlist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    /// Evaluator-internal storage index.
    pub index: usize,
    /// Bit width of the stored value.
    pub width: u32,
}

/// Handle for one waveform recording session inside the evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VcdId(pub u32);

/// One circuit-evaluator instance.
///
/// `eval` performs exactly one propagation pass — the kernel supplies the
/// fixed-point loop. `commit` swaps every pending value into place
/// atomically with respect to the kernel's process scheduling and reports
/// whether anything changed.
pub trait Evaluator {
    /// Resolves a dotted hierarchical signal name to its storage location.
    fn locate(&self, path: &str) -> Option<Location>;

    /// Reads the committed value at a location.
    fn curr(&self, loc: Location) -> Bits;

    /// Reads the pending value at a location.
    fn next(&self, loc: Location) -> Bits;

    /// Stages a pending value at a location; visible after the next commit.
    fn set_next(&mut self, loc: Location, value: &Bits);

    /// Propagates staged changes through circuit logic once.
    fn eval(&mut self);

    /// Swaps pending values into committed values for all signals and
    /// returns whether any value changed.
    fn commit(&mut self) -> bool;

    /// Creates a new waveform recording session bound to this handle.
    fn vcd_create(&mut self) -> VcdId;

    /// Adds every signal to the session's tracked set.
    fn vcd_add_all(&mut self, vcd: VcdId);

    /// Adds a single signal (by dotted name) to the session's tracked set.
    ///
    /// Returns `false` if the name does not resolve.
    fn vcd_add(&mut self, vcd: VcdId, path: &str) -> bool;

    /// Registers the session's time scale as `number` units of `unit`
    /// (e.g. `100` and `"ps"`) per sample tick.
    fn vcd_timescale(&mut self, vcd: VcdId, number: u32, unit: &str);

    /// Samples all tracked signals at the given integer tick, appending a
    /// delta record to the session's internal buffer.
    fn vcd_sample(&mut self, vcd: VcdId, tick: u64);

    /// Drains and returns the session's serialized bytes accumulated since
    /// the previous read.
    fn vcd_read(&mut self, vcd: VcdId) -> Vec<u8>;

    /// Destroys a waveform session, discarding any unread bytes.
    fn vcd_destroy(&mut self, vcd: VcdId);
}

/// Constructor for evaluator handles.
///
/// The signal state store recreates its evaluator from this factory on
/// every [`reset`](crate::state::SignalStore::reset), giving each
/// simulation generation a fresh handle.
pub type EvaluatorFactory = Box<dyn Fn() -> Box<dyn Evaluator>>;

//! Event-driven simulation kernel for the Crest HDL toolchain.
//!
//! This crate schedules concurrent simulation processes against an opaque
//! circuit [`Evaluator`] over simulated time. The kernel never computes
//! signal values itself; it drives the evaluator through single
//! propagation passes to a combinational fixed point, commits staged
//! values atomically, and wakes processes on timeline deadlines and clock
//! edges. Testbench logic and synthesized clock generators share one
//! process model: a resumable [`Behavior`] that suspends by returning a
//! [`Wait`] request.
//!
//! # Usage
//!
//! ```ignore
//! use crest_sim::Simulator;
//!
//! let mut sim = Simulator::new(netlist);
//! sim.add_clock(1e-6)?;
//! sim.add_process(|| my_testbench());
//! sim.run()?;
//! ```
//!
//! # Modules
//!
//! - `error` — simulation error types
//! - `timeline` — deadline scheduling over f64 seconds
//! - `eval` — the evaluator contract the kernel requires
//! - `interp` — the built-in interpreting evaluator with VCD sessions
//! - `process` — behaviors, process contexts, the clock generator
//! - `state` — committed/pending signal state and edge triggers
//! - `core` — the simulation kernel

#![warn(missing_docs)]

pub mod core;
pub mod error;
pub mod eval;
pub mod interp;
pub mod process;
pub mod state;
pub mod timeline;

pub use crate::core::{Simulator, WaveformId};
pub use error::SimError;
pub use eval::{Evaluator, EvaluatorFactory, Location, VcdId};
pub use interp::InterpEvaluator;
pub use process::{Behavior, ProcessContext, ProcessId, Wait};
pub use state::SignalStore;
pub use timeline::{Deadline, Timeline};

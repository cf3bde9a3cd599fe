//! Simulation error types for the event-driven kernel.
//!
//! Every synchronously-reported precondition violation and resolution
//! failure is a variant of [`SimError`]. Unstable combinational feedback
//! and stalled simulations are deliberately *not* represented here: they
//! surface as non-termination, matching real hardware's lack of deadlock
//! detection.

use std::io;

/// Errors that can occur during simulation setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A clock domain name could not be resolved in the prepared netlist.
    #[error("domain {name:?} is not present in simulation")]
    UnknownDomain {
        /// The unresolvable domain name.
        name: String,
    },

    /// A clock domain already has a clock process driving it.
    #[error("domain {name:?} already has a clock driving it")]
    DomainAlreadyClocked {
        /// The doubly-driven domain name.
        name: String,
    },

    /// A process was scheduled on the timeline while it already had a
    /// pending deadline.
    #[error("process {process} already has a pending deadline")]
    DeadlinePending {
        /// Raw ID of the offending process.
        process: u32,
    },

    /// A signal has no corresponding storage location in the prepared
    /// circuit.
    #[error("signal {name:?} is not present in the prepared circuit")]
    UnknownSignal {
        /// The unresolvable signal name.
        name: String,
    },

    /// A waveform session was requested after simulated time advanced.
    #[error("cannot start a waveform session at time {now}; traces must start at time zero")]
    WaveformAfterStart {
        /// Current simulated time in seconds.
        now: f64,
    },

    /// A waveform handle did not come from any `write_vcd` call on this
    /// simulator.
    #[error("waveform session {id} was never opened")]
    UnknownWaveform {
        /// The unrecognized session handle.
        id: u32,
    },

    /// A waveform session was closed twice.
    #[error("waveform session is already closed")]
    WaveformClosed,

    /// `run_until` was called with a deadline earlier than the current time.
    #[error("deadline {deadline} is in the past (now = {now})")]
    DeadlineInPast {
        /// Current simulated time in seconds.
        now: f64,
        /// The requested deadline in seconds.
        deadline: f64,
    },

    /// The settling loop exceeded the configured pass cap.
    ///
    /// Only reported when a cap is explicitly configured via
    /// [`Simulator::set_max_settle_passes`](crate::core::Simulator::set_max_settle_passes);
    /// by default an unstable combinational loop never terminates.
    #[error("settling did not converge at time {now} within {passes} passes")]
    SettleLimit {
        /// Simulated time at which settling failed to converge.
        now: f64,
        /// The configured pass cap.
        passes: u32,
    },

    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),
}

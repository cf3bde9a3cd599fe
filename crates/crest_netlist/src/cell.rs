//! Primitive cells executed by the reference interpreted evaluator.
//!
//! This is deliberately a small set: enough to express the combinational
//! and sequential structures the simulation kernel is tested against. A
//! production netlist would be compiled to a native evaluator instead of
//! being interpreted cell by cell.

use crate::domain::Edge;
use crate::ids::SignalId;
use serde::{Deserialize, Serialize};

/// A primitive cell in the prepared netlist.
///
/// Combinational cells read committed input values and stage their result
/// on the output's pending value; one evaluation pass propagates one level
/// of logic. `Dff` captures its input on the active edge of its clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Cell {
    /// `y = !a` (bitwise).
    Not {
        /// Input.
        a: SignalId,
        /// Output.
        y: SignalId,
    },
    /// `y = a & b`.
    And {
        /// First input.
        a: SignalId,
        /// Second input.
        b: SignalId,
        /// Output.
        y: SignalId,
    },
    /// `y = a | b`.
    Or {
        /// First input.
        a: SignalId,
        /// Second input.
        b: SignalId,
        /// Output.
        y: SignalId,
    },
    /// `y = a ^ b`.
    Xor {
        /// First input.
        a: SignalId,
        /// Second input.
        b: SignalId,
        /// Output.
        y: SignalId,
    },
    /// `y = sel ? a : b`.
    Mux {
        /// Select input (bit 0 decides).
        sel: SignalId,
        /// Input passed through when `sel` is one.
        a: SignalId,
        /// Input passed through when `sel` is zero.
        b: SignalId,
        /// Output.
        y: SignalId,
    },
    /// D flip-flop: `q` captures `d` on the active edge of `clk`.
    Dff {
        /// Clock input.
        clk: SignalId,
        /// Active clock edge.
        edge: Edge,
        /// Data input.
        d: SignalId,
        /// Registered output.
        q: SignalId,
        /// Optional asynchronous reset (active high); restores `q` to its
        /// netlist reset value while asserted.
        arst: Option<SignalId>,
    },
}

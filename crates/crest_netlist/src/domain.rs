//! Clock domains: named groups of synchronous logic sharing a clock signal.

use crate::ids::SignalId;
use serde::{Deserialize, Serialize};

/// Edge polarity of a clock or reset signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    /// Rising edge (0 → 1).
    Pos,
    /// Falling edge (1 → 0).
    Neg,
}

impl Edge {
    /// The single-bit value a signal takes *after* this edge.
    pub fn active_level(self) -> bool {
        matches!(self, Edge::Pos)
    }
}

/// A named clock domain.
///
/// Synchronous processes registered against a domain wake on its clock's
/// active edge, and additionally on its reset edge when the domain uses an
/// asynchronous reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockDomain {
    /// Domain name (`"sync"` by convention for the default domain).
    pub name: String,
    /// The clock signal driving this domain.
    pub clk: SignalId,
    /// Active clock edge.
    pub edge: Edge,
    /// Optional reset signal (active high).
    pub rst: Option<SignalId>,
    /// Whether `rst` acts asynchronously.
    pub async_reset: bool,
}

impl ClockDomain {
    /// Creates a rising-edge domain without a reset signal.
    pub fn new(name: impl Into<String>, clk: SignalId) -> Self {
        Self {
            name: name.into(),
            clk,
            edge: Edge::Pos,
            rst: None,
            async_reset: false,
        }
    }

    /// Attaches a reset signal, optionally asynchronous.
    pub fn with_reset(mut self, rst: SignalId, asynchronous: bool) -> Self {
        self.rst = Some(rst);
        self.async_reset = asynchronous;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_level() {
        assert!(Edge::Pos.active_level());
        assert!(!Edge::Neg.active_level());
    }

    #[test]
    fn new_defaults() {
        let d = ClockDomain::new("sync", SignalId::from_raw(0));
        assert_eq!(d.name, "sync");
        assert_eq!(d.edge, Edge::Pos);
        assert!(d.rst.is_none());
        assert!(!d.async_reset);
    }

    #[test]
    fn with_reset() {
        let d = ClockDomain::new("sync", SignalId::from_raw(0))
            .with_reset(SignalId::from_raw(1), true);
        assert_eq!(d.rst, Some(SignalId::from_raw(1)));
        assert!(d.async_reset);
    }
}

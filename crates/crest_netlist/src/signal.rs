//! Signal records in the prepared netlist.

use crate::bits::Bits;
use serde::{Deserialize, Serialize};

/// A flattened signal in the prepared netlist.
///
/// Signals are identified by dotted hierarchical names (`"top.cpu.clk"`),
/// which is also how the circuit evaluator resolves them to storage
/// locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Dotted hierarchical name.
    pub name: String,
    /// Bit width.
    pub width: u32,
    /// Value the signal holds at time zero and after a simulation reset.
    pub reset: Bits,
}

impl Signal {
    /// Creates a signal with a reset value given as an integer.
    pub fn new(name: impl Into<String>, width: u32, reset: u64) -> Self {
        Self {
            name: name.into(),
            width,
            reset: Bits::from_u64(reset, width),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_builds_reset_value() {
        let s = Signal::new("top.count", 4, 0b1001);
        assert_eq!(s.name, "top.count");
        assert_eq!(s.width, 4);
        assert_eq!(s.reset.to_u64(), Some(0b1001));
    }

    #[test]
    fn serde_roundtrip() {
        let s = Signal::new("top.clk", 1, 0);
        let json = serde_json::to_string(&s).unwrap();
        let back: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "top.clk");
        assert_eq!(back.width, 1);
    }
}

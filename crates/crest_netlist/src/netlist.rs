//! The top-level prepared-netlist container.

use crate::arena::Arena;
use crate::bits::Bits;
use crate::cell::Cell;
use crate::domain::ClockDomain;
use crate::ids::{CellId, DomainId, SignalId};
use crate::signal::Signal;
use std::collections::HashMap;

/// A flattened, prepared circuit: signals, clock domains, and cells.
///
/// This is what elaboration hands to the simulator. Signal names are unique
/// dotted paths; [`Netlist::find_signal`] and [`Netlist::find_domain`] give
/// by-name lookup for the kernel's resolution steps.
#[derive(Debug, Clone, Default)]
pub struct Netlist {
    signals: Arena<SignalId, Signal>,
    domains: Arena<DomainId, ClockDomain>,
    cells: Arena<CellId, Cell>,
    by_name: HashMap<String, SignalId>,
}

impl Netlist {
    /// Creates an empty netlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a signal and returns its ID.
    ///
    /// # Panics
    ///
    /// Panics if a signal with the same name already exists.
    pub fn add_signal(&mut self, name: impl Into<String>, width: u32, reset: u64) -> SignalId {
        let signal = Signal::new(name, width, reset);
        let name = signal.name.clone();
        assert!(
            !self.by_name.contains_key(&name),
            "duplicate signal name {name:?}"
        );
        let id = self.signals.alloc(signal);
        self.by_name.insert(name, id);
        id
    }

    /// Adds a clock domain and returns its ID.
    pub fn add_domain(&mut self, domain: ClockDomain) -> DomainId {
        self.domains.alloc(domain)
    }

    /// Adds a primitive cell and returns its ID.
    pub fn add_cell(&mut self, cell: Cell) -> CellId {
        self.cells.alloc(cell)
    }

    /// Looks up a signal by its dotted name.
    pub fn find_signal(&self, name: &str) -> Option<SignalId> {
        self.by_name.get(name).copied()
    }

    /// Looks up a clock domain by name.
    pub fn find_domain(&self, name: &str) -> Option<DomainId> {
        self.domains
            .iter()
            .find(|(_, d)| d.name == name)
            .map(|(id, _)| id)
    }

    /// Returns the signal record for an ID.
    pub fn signal(&self, id: SignalId) -> &Signal {
        self.signals.get(id)
    }

    /// Returns the domain record for an ID.
    pub fn domain(&self, id: DomainId) -> &ClockDomain {
        self.domains.get(id)
    }

    /// Iterates over all signals in allocation order.
    pub fn signals(&self) -> impl Iterator<Item = (SignalId, &Signal)> {
        self.signals.iter()
    }

    /// Iterates over all cells in allocation order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    /// Returns the number of signals.
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Returns the reset value of a signal.
    pub fn reset_value(&self, id: SignalId) -> &Bits {
        &self.signals.get(id).reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Edge;

    #[test]
    fn add_and_find_signal() {
        let mut n = Netlist::new();
        let clk = n.add_signal("top.clk", 1, 0);
        assert_eq!(n.find_signal("top.clk"), Some(clk));
        assert_eq!(n.find_signal("top.rst"), None);
        assert_eq!(n.signal(clk).width, 1);
    }

    #[test]
    #[should_panic(expected = "duplicate signal name")]
    fn duplicate_name_panics() {
        let mut n = Netlist::new();
        n.add_signal("top.clk", 1, 0);
        n.add_signal("top.clk", 1, 0);
    }

    #[test]
    fn add_and_find_domain() {
        let mut n = Netlist::new();
        let clk = n.add_signal("top.clk", 1, 0);
        let d = n.add_domain(ClockDomain::new("sync", clk));
        assert_eq!(n.find_domain("sync"), Some(d));
        assert_eq!(n.find_domain("other"), None);
        assert_eq!(n.domain(d).clk, clk);
        assert_eq!(n.domain(d).edge, Edge::Pos);
    }

    #[test]
    fn cells_iterate_in_order() {
        let mut n = Netlist::new();
        let a = n.add_signal("a", 1, 0);
        let y = n.add_signal("y", 1, 0);
        n.add_cell(Cell::Not { a, y });
        assert_eq!(n.cells().count(), 1);
    }

    #[test]
    fn reset_value() {
        let mut n = Netlist::new();
        let s = n.add_signal("top.count", 8, 42);
        assert_eq!(n.reset_value(s).to_u64(), Some(42));
    }
}

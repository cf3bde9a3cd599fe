//! Committed/pending signal state and edge trigger bookkeeping.
//!
//! [`SignalStore`] owns the evaluator and fronts it with two services the
//! kernel needs: lazy resolution of netlist signals to evaluator storage
//! locations, and per-process wakeup triggers that are checked against the
//! value transition each commit performs.

use std::collections::HashMap;
use std::sync::Arc;

use crest_netlist::{Bits, Netlist, SignalId};

use crate::error::SimError;
use crate::eval::{Evaluator, EvaluatorFactory, Location};
use crate::process::ProcessId;

/// A resolved signal: the netlist entity plus its evaluator location.
struct Slot {
    location: Location,
}

/// The kernel's view of design state.
///
/// Resolution is lazy: a signal is looked up in the evaluator by its
/// hierarchical name the first time any process or observer touches it, and
/// the location is cached until [`SignalStore::reset`] discards the
/// evaluator instance.
pub struct SignalStore {
    netlist: Arc<Netlist>,
    factory: EvaluatorFactory,
    evaluator: Box<dyn Evaluator>,
    slots: Vec<Slot>,
    index: HashMap<SignalId, usize>,
    /// Active wakeup triggers, one at most per (process, signal) pair.
    /// `None` wakes on any value change; `Some(v)` wakes only on a
    /// transition into `v`.
    triggers: HashMap<(ProcessId, usize), Option<Bits>>,
}

impl SignalStore {
    /// Creates a store over a fresh evaluator instance.
    pub fn new(netlist: Arc<Netlist>, factory: EvaluatorFactory) -> Self {
        let evaluator = (factory)();
        Self {
            netlist,
            factory,
            evaluator,
            slots: Vec::new(),
            index: HashMap::new(),
            triggers: HashMap::new(),
        }
    }

    /// Resolves a signal to its slot, caching the evaluator location.
    fn resolve(&mut self, signal: SignalId) -> Result<usize, SimError> {
        if let Some(&slot) = self.index.get(&signal) {
            return Ok(slot);
        }
        let name = &self.netlist.signal(signal).name;
        let location = self
            .evaluator
            .locate(name)
            .ok_or_else(|| SimError::UnknownSignal { name: name.clone() })?;
        let slot = self.slots.len();
        self.slots.push(Slot { location });
        self.index.insert(signal, slot);
        Ok(slot)
    }

    /// Reads a signal's committed value.
    pub fn read(&mut self, signal: SignalId) -> Result<Bits, SimError> {
        let slot = self.resolve(signal)?;
        Ok(self.evaluator.curr(self.slots[slot].location))
    }

    /// Stages a pending value for a signal.
    pub fn write(&mut self, signal: SignalId, value: &Bits) -> Result<(), SimError> {
        let slot = self.resolve(signal)?;
        self.evaluator.set_next(self.slots[slot].location, value);
        Ok(())
    }

    /// Registers a wakeup trigger for a process on a signal.
    ///
    /// `trigger` of `None` wakes on any change; `Some(v)` wakes only when
    /// the signal transitions into value `v`.
    pub fn add_trigger(
        &mut self,
        process: ProcessId,
        signal: SignalId,
        trigger: Option<Bits>,
    ) -> Result<(), SimError> {
        let slot = self.resolve(signal)?;
        let prior = self.triggers.insert((process, slot), trigger);
        debug_assert!(prior.is_none(), "duplicate trigger for process/signal pair");
        Ok(())
    }

    /// Unregisters the trigger a process holds on one signal, if any.
    pub fn remove_trigger(&mut self, process: ProcessId, signal: SignalId) -> Result<(), SimError> {
        let slot = self.resolve(signal)?;
        self.triggers.remove(&(process, slot));
        Ok(())
    }

    /// Removes every trigger held by a process.
    pub fn clear_triggers(&mut self, process: ProcessId) {
        self.triggers.retain(|&(p, _), _| p != process);
    }

    /// Runs one evaluation pass over the design's combinational logic.
    pub fn eval(&mut self) {
        self.evaluator.eval();
    }

    /// Atomically applies all pending values.
    ///
    /// Returns whether any signal changed, and the set of processes whose
    /// triggers matched the transition this commit performed. Triggers are
    /// checked against the pre-commit curr/next pair, so a glitch that
    /// stages a value equal to the committed one wakes nobody.
    pub fn commit(&mut self) -> (bool, Vec<ProcessId>) {
        let mut woken = Vec::new();
        for (&(process, slot), trigger) in &self.triggers {
            let location = self.slots[slot].location;
            let curr = self.evaluator.curr(location);
            let next = self.evaluator.next(location);
            let fired = match trigger {
                None => next != curr,
                Some(v) => next == *v && curr != *v,
            };
            if fired && !woken.contains(&process) {
                woken.push(process);
            }
        }
        woken.sort_by_key(|p| p.as_raw());
        let changed = self.evaluator.commit();
        (changed, woken)
    }

    /// Discards the evaluator and builds a fresh one, restoring every
    /// signal to its reset value. All cached locations and triggers are
    /// invalidated.
    pub fn reset(&mut self) {
        self.evaluator = (self.factory)();
        self.slots.clear();
        self.index.clear();
        self.triggers.clear();
    }

    /// Direct access to the evaluator, used for waveform sessions.
    pub(crate) fn evaluator_mut(&mut self) -> &mut dyn Evaluator {
        &mut *self.evaluator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::InterpEvaluator;

    fn make_store() -> (SignalStore, SignalId, SignalId) {
        let mut netlist = Netlist::new();
        let a = netlist.add_signal("top.a", 4, 0);
        let b = netlist.add_signal("top.b", 4, 3);
        let netlist = Arc::new(netlist);
        let eval_netlist = netlist.clone();
        let store = SignalStore::new(
            netlist,
            Box::new(move || Box::new(InterpEvaluator::new(eval_netlist.clone()))),
        );
        (store, a, b)
    }

    #[test]
    fn read_returns_reset_value() {
        let (mut store, a, b) = make_store();
        assert_eq!(store.read(a).unwrap().to_u64(), Some(0));
        assert_eq!(store.read(b).unwrap().to_u64(), Some(3));
    }

    #[test]
    fn write_is_invisible_until_commit() {
        let (mut store, a, _) = make_store();
        store.write(a, &Bits::from_u64(5, 4)).unwrap();
        assert_eq!(store.read(a).unwrap().to_u64(), Some(0));
        let (changed, woken) = store.commit();
        assert!(changed);
        assert!(woken.is_empty());
        assert_eq!(store.read(a).unwrap().to_u64(), Some(5));
    }

    #[test]
    fn commit_without_pending_changes_reports_quiescence() {
        let (mut store, a, _) = make_store();
        store.write(a, &Bits::from_u64(0, 4)).unwrap();
        let (changed, _) = store.commit();
        assert!(!changed);
    }

    #[test]
    fn any_change_trigger_fires_on_transition() {
        let (mut store, a, _) = make_store();
        let p = ProcessId::from_raw(0);
        store.add_trigger(p, a, None).unwrap();

        store.write(a, &Bits::from_u64(1, 4)).unwrap();
        let (_, woken) = store.commit();
        assert_eq!(woken, vec![p]);
    }

    #[test]
    fn any_change_trigger_ignores_identical_restage() {
        let (mut store, a, _) = make_store();
        let p = ProcessId::from_raw(0);
        store.add_trigger(p, a, None).unwrap();

        store.write(a, &Bits::from_u64(0, 4)).unwrap();
        let (_, woken) = store.commit();
        assert!(woken.is_empty());
    }

    #[test]
    fn value_trigger_fires_only_on_transition_into_value() {
        let (mut store, a, _) = make_store();
        let p = ProcessId::from_raw(0);
        let target = Bits::from_u64(2, 4);
        store.add_trigger(p, a, Some(target.clone())).unwrap();

        // 0 -> 1: not into the target value.
        store.write(a, &Bits::from_u64(1, 4)).unwrap();
        let (_, woken) = store.commit();
        assert!(woken.is_empty());

        // 1 -> 2: into the target value.
        store.write(a, &Bits::from_u64(2, 4)).unwrap();
        let (_, woken) = store.commit();
        assert_eq!(woken, vec![p]);

        // 2 -> 2: already at the target value, no transition.
        store.write(a, &Bits::from_u64(2, 4)).unwrap();
        let (_, woken) = store.commit();
        assert!(woken.is_empty());
    }

    #[test]
    fn trigger_persists_until_cleared() {
        let (mut store, a, _) = make_store();
        let p = ProcessId::from_raw(0);
        store.add_trigger(p, a, None).unwrap();

        store.write(a, &Bits::from_u64(1, 4)).unwrap();
        let (_, woken) = store.commit();
        assert_eq!(woken, vec![p]);

        // Still registered: fires again on the next change.
        store.write(a, &Bits::from_u64(2, 4)).unwrap();
        let (_, woken) = store.commit();
        assert_eq!(woken, vec![p]);

        store.clear_triggers(p);
        store.write(a, &Bits::from_u64(3, 4)).unwrap();
        let (_, woken) = store.commit();
        assert!(woken.is_empty());
    }

    #[test]
    fn remove_trigger_targets_one_signal() {
        let (mut store, a, b) = make_store();
        let p = ProcessId::from_raw(0);
        store.add_trigger(p, a, None).unwrap();
        store.add_trigger(p, b, None).unwrap();
        store.remove_trigger(p, a).unwrap();

        store.write(a, &Bits::from_u64(1, 4)).unwrap();
        let (_, woken) = store.commit();
        assert!(woken.is_empty());

        store.write(b, &Bits::from_u64(1, 4)).unwrap();
        let (_, woken) = store.commit();
        assert_eq!(woken, vec![p]);
    }

    #[test]
    fn multiple_triggers_on_one_commit_dedup_processes() {
        let (mut store, a, b) = make_store();
        let p = ProcessId::from_raw(0);
        store.add_trigger(p, a, None).unwrap();
        store.add_trigger(p, b, None).unwrap();

        store.write(a, &Bits::from_u64(1, 4)).unwrap();
        store.write(b, &Bits::from_u64(1, 4)).unwrap();
        let (_, woken) = store.commit();
        assert_eq!(woken, vec![p]);
    }

    #[test]
    fn reset_restores_reset_values_and_drops_triggers() {
        let (mut store, a, b) = make_store();
        let p = ProcessId::from_raw(0);
        store.add_trigger(p, a, None).unwrap();
        store.write(a, &Bits::from_u64(9, 4)).unwrap();
        store.commit();
        assert_eq!(store.read(a).unwrap().to_u64(), Some(9));

        store.reset();
        assert_eq!(store.read(a).unwrap().to_u64(), Some(0));
        assert_eq!(store.read(b).unwrap().to_u64(), Some(3));

        store.write(a, &Bits::from_u64(1, 4)).unwrap();
        let (_, woken) = store.commit();
        assert!(woken.is_empty());
    }

    #[test]
    fn unresolvable_signal_reports_its_name() {
        // A store whose evaluator was built over an empty design: every
        // lookup misses.
        let mut outer = Netlist::new();
        let a = outer.add_signal("top.a", 1, 0);
        let mut store = SignalStore::new(
            Arc::new(outer),
            Box::new(|| Box::new(InterpEvaluator::new(Arc::new(Netlist::new())))),
        );
        match store.read(a) {
            Err(SimError::UnknownSignal { name }) => assert_eq!(name, "top.a"),
            other => panic!("expected UnknownSignal, got {other:?}"),
        }
    }
}

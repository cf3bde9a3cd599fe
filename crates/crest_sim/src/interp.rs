//! The built-in interpreting evaluator.
//!
//! [`InterpEvaluator`] walks the netlist's cell list directly, with no
//! compilation step. Each [`Evaluator::eval`] computes every combinational
//! output once from committed inputs, so a combinational chain settles in a
//! number of eval/commit rounds proportional to its depth. Each register
//! remembers its clock's level as of the previous commit and captures when
//! the committed level has since transitioned to the active edge; cells
//! read committed values only, so settled results do not depend on the
//! order cells are listed in.
//!
//! It also implements the in-memory VCD session interface: sessions buffer
//! IEEE 1364 Value Change Dump text which the kernel drains with
//! [`Evaluator::vcd_read`] after each sample.

use std::sync::Arc;

use crest_netlist::{Bits, Cell, Netlist, SignalId};

use crate::eval::{Evaluator, Location, VcdId};

/// One open VCD session: which signals it tracks and the buffered text not
/// yet drained by the kernel.
struct VcdSession {
    tracked: Vec<SignalId>,
    timescale: Option<(u32, String)>,
    header_written: bool,
    /// Last sampled value per tracked signal; only differing values are
    /// emitted on later samples.
    last: Vec<Option<Bits>>,
    buf: Vec<u8>,
}

impl VcdSession {
    fn new() -> Self {
        Self {
            tracked: Vec::new(),
            timescale: None,
            header_written: false,
            last: Vec::new(),
            buf: Vec::new(),
        }
    }

    fn track(&mut self, signal: SignalId) {
        if !self.tracked.contains(&signal) {
            self.tracked.push(signal);
            self.last.push(None);
        }
    }
}

/// Generates a VCD identifier code from a sequential index.
///
/// Uses printable ASCII characters starting from `!` (0x21).
/// Multi-character codes are generated for indices >= 94.
fn make_id_code(index: usize) -> String {
    let mut result = String::new();
    let mut idx = index;
    loop {
        let c = (b'!' + (idx % 94) as u8) as char;
        result.push(c);
        idx /= 94;
        if idx == 0 {
            break;
        }
        idx -= 1;
    }
    result
}

/// Formats a value as a VCD value-change record for the given id code.
fn format_change(value: &Bits, width: u32, id_code: &str) -> String {
    if width == 1 {
        format!("{}{id_code}", u8::from(value.get(0)))
    } else {
        format!("b{value} {id_code}")
    }
}

/// A direct interpreter over the prepared netlist.
pub struct InterpEvaluator {
    netlist: Arc<Netlist>,
    /// Committed values, indexed by raw signal ID.
    curr: Vec<Bits>,
    /// Pending values staged for the next commit.
    next: Vec<Bits>,
    /// Per-cell clock level as of the previous commit; meaningful only at
    /// `Dff` indices.
    clk_level: Vec<bool>,
    sessions: Vec<Option<VcdSession>>,
}

impl InterpEvaluator {
    /// Creates an evaluator with every signal at its reset value.
    pub fn new(netlist: Arc<Netlist>) -> Self {
        let curr: Vec<Bits> = netlist
            .signals()
            .map(|(id, _)| netlist.reset_value(id).clone())
            .collect();
        let next = curr.clone();
        let clk_level = netlist
            .cells()
            .map(|cell| match *cell {
                Cell::Dff { clk, .. } => curr[clk.as_raw() as usize].get(0),
                _ => false,
            })
            .collect();
        Self {
            netlist,
            curr,
            next,
            clk_level,
            sessions: Vec::new(),
        }
    }

    fn bit(&self, signal: SignalId) -> bool {
        self.curr[signal.as_raw() as usize].get(0)
    }

    fn stage(&mut self, signal: SignalId, value: Bits) {
        self.next[signal.as_raw() as usize] = value;
    }

    fn write_header(&self, session: &mut VcdSession) {
        use std::io::Write;
        let buf = &mut session.buf;
        writeln!(buf, "$version").unwrap();
        writeln!(buf, "  Crest HDL Simulator").unwrap();
        writeln!(buf, "$end").unwrap();
        if let Some((number, unit)) = &session.timescale {
            writeln!(buf, "$timescale").unwrap();
            writeln!(buf, "  {number}{unit}").unwrap();
            writeln!(buf, "$end").unwrap();
        }
        writeln!(buf, "$scope module crest $end").unwrap();
        for (idx, &signal) in session.tracked.iter().enumerate() {
            let record = self.netlist.signal(signal);
            let id_code = make_id_code(idx);
            writeln!(buf, "$var wire {} {id_code} {} $end", record.width, record.name).unwrap();
        }
        writeln!(buf, "$upscope $end").unwrap();
        writeln!(buf, "$enddefinitions $end").unwrap();
    }
}

impl Evaluator for InterpEvaluator {
    fn locate(&self, path: &str) -> Option<Location> {
        let id = self.netlist.find_signal(path)?;
        Some(Location {
            index: id.as_raw() as usize,
            width: self.netlist.signal(id).width,
        })
    }

    fn curr(&self, location: Location) -> Bits {
        self.curr[location.index].clone()
    }

    fn next(&self, location: Location) -> Bits {
        self.next[location.index].clone()
    }

    fn set_next(&mut self, location: Location, value: &Bits) {
        debug_assert_eq!(value.width(), location.width, "staged value width mismatch");
        self.next[location.index] = value.clone();
    }

    fn eval(&mut self) {
        let netlist = self.netlist.clone();
        for (index, cell) in netlist.cells().enumerate() {
            match *cell {
                Cell::Not { a, y } => {
                    self.stage(y, !&self.curr[a.as_raw() as usize]);
                }
                Cell::And { a, b, y } => {
                    let v = &self.curr[a.as_raw() as usize] & &self.curr[b.as_raw() as usize];
                    self.stage(y, v);
                }
                Cell::Or { a, b, y } => {
                    let v = &self.curr[a.as_raw() as usize] | &self.curr[b.as_raw() as usize];
                    self.stage(y, v);
                }
                Cell::Xor { a, b, y } => {
                    let v = &self.curr[a.as_raw() as usize] ^ &self.curr[b.as_raw() as usize];
                    self.stage(y, v);
                }
                Cell::Mux { sel, a, b, y } => {
                    let v = if self.bit(sel) {
                        self.curr[a.as_raw() as usize].clone()
                    } else {
                        self.curr[b.as_raw() as usize].clone()
                    };
                    self.stage(y, v);
                }
                Cell::Dff {
                    clk,
                    edge,
                    d,
                    q,
                    arst,
                } => {
                    if let Some(rst) = arst {
                        if self.bit(rst) {
                            let v = netlist.reset_value(q).clone();
                            self.stage(q, v);
                            continue;
                        }
                    }
                    let active = edge.active_level();
                    let was = self.clk_level[index];
                    let is = self.bit(clk);
                    if was != active && is == active {
                        let v = self.curr[d.as_raw() as usize].clone();
                        self.stage(q, v);
                    }
                }
            }
        }
    }

    fn commit(&mut self) -> bool {
        // Record each register's clock level before the swap; the next
        // eval pass detects an edge as a change of committed level across
        // this boundary.
        let netlist = self.netlist.clone();
        for (index, cell) in netlist.cells().enumerate() {
            if let Cell::Dff { clk, .. } = *cell {
                self.clk_level[index] = self.bit(clk);
            }
        }
        let mut changed = false;
        for (curr, next) in self.curr.iter_mut().zip(&self.next) {
            if curr != next {
                *curr = next.clone();
                changed = true;
            }
        }
        changed
    }

    fn vcd_create(&mut self) -> VcdId {
        let id = VcdId(self.sessions.len() as u32);
        self.sessions.push(Some(VcdSession::new()));
        id
    }

    fn vcd_add_all(&mut self, vcd: VcdId) {
        let signals: Vec<SignalId> = self.netlist.signals().map(|(id, _)| id).collect();
        if let Some(Some(session)) = self.sessions.get_mut(vcd.0 as usize) {
            for signal in signals {
                session.track(signal);
            }
        }
    }

    fn vcd_add(&mut self, vcd: VcdId, path: &str) -> bool {
        let Some(signal) = self.netlist.find_signal(path) else {
            return false;
        };
        if let Some(Some(session)) = self.sessions.get_mut(vcd.0 as usize) {
            session.track(signal);
        }
        true
    }

    fn vcd_timescale(&mut self, vcd: VcdId, number: u32, unit: &str) {
        if let Some(Some(session)) = self.sessions.get_mut(vcd.0 as usize) {
            session.timescale = Some((number, unit.to_string()));
        }
    }

    fn vcd_sample(&mut self, vcd: VcdId, tick: u64) {
        use std::io::Write;
        let Some(Some(mut session)) = self.sessions.get_mut(vcd.0 as usize).map(Option::take)
        else {
            return;
        };
        if !session.header_written {
            self.write_header(&mut session);
            session.header_written = true;
            writeln!(session.buf, "$dumpvars").unwrap();
            writeln!(session.buf, "#{tick}").unwrap();
            for (idx, &signal) in session.tracked.iter().enumerate() {
                let value = self.curr[signal.as_raw() as usize].clone();
                let width = self.netlist.signal(signal).width;
                let record = format_change(&value, width, &make_id_code(idx));
                writeln!(session.buf, "{record}").unwrap();
                session.last[idx] = Some(value);
            }
        } else {
            // Delta sample: emit a timestamp only if something changed.
            let mut stamped = false;
            for (idx, &signal) in session.tracked.iter().enumerate() {
                let value = self.curr[signal.as_raw() as usize].clone();
                if session.last[idx].as_ref() == Some(&value) {
                    continue;
                }
                if !stamped {
                    writeln!(session.buf, "#{tick}").unwrap();
                    stamped = true;
                }
                let width = self.netlist.signal(signal).width;
                let record = format_change(&value, width, &make_id_code(idx));
                writeln!(session.buf, "{record}").unwrap();
                session.last[idx] = Some(value);
            }
        }
        self.sessions[vcd.0 as usize] = Some(session);
    }

    fn vcd_read(&mut self, vcd: VcdId) -> Vec<u8> {
        match self.sessions.get_mut(vcd.0 as usize) {
            Some(Some(session)) => std::mem::take(&mut session.buf),
            _ => Vec::new(),
        }
    }

    fn vcd_destroy(&mut self, vcd: VcdId) {
        if let Some(session) = self.sessions.get_mut(vcd.0 as usize) {
            *session = None;
        }
    }
}

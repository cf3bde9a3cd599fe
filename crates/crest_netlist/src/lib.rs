//! Prepared-circuit representation consumed by the Crest simulation kernel.
//!
//! Elaboration and netlist transformation happen upstream; this crate is the
//! *result* of that work, flattened into a single namespace: signals with
//! dotted hierarchical names, clock domains, and a small set of primitive
//! cells that the reference interpreted evaluator in `crest_sim` executes.
//!
//! # Modules
//!
//! - `arena` — dense, ID-indexed storage
//! - `ids` — opaque ID newtypes
//! - `bits` — 2-state packed bit vectors chunked in 32-bit words
//! - `signal` — signal records (name, width, reset value)
//! - `domain` — clock domains and edge polarity
//! - `cell` — primitive cells for the interpreted evaluator
//! - `netlist` — the top-level container

#![warn(missing_docs)]

pub mod arena;
pub mod bits;
pub mod cell;
pub mod domain;
pub mod ids;
pub mod netlist;
pub mod signal;

pub use arena::{Arena, ArenaId};
pub use bits::Bits;
pub use cell::Cell;
pub use domain::{ClockDomain, Edge};
pub use ids::{CellId, DomainId, SignalId};
pub use netlist::Netlist;
pub use signal::Signal;

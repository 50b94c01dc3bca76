//! Lifecycle events and the caller-supplied handler (spec.md §6).
//!
//! The store does not buffer, retry, or catch-unwind around a handler
//! call — a panicking handler is the caller's contract violation, not
//! something this layer guards against.

/// A lifecycle point the store notifies callers about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    CreateStart,
    CreateTable,
    Load,
    Backup,
    Unload,
}

/// Which table a [`Event`] pertains to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Header,
    Tx,
    Point,
    Output,
    Outs,
    Txs,
    StrongTx,
    Candidate,
    Confirmed,
    Neutrino,
}

pub type EventHandler = Box<dyn Fn(Event, Table) + Send + Sync>;

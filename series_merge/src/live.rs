//! The live result slot
//!
//! Query executions may overlap: a refresh tick or a re-submitted query can
//! start before the previous execution finishes. [`LiveResult`] keeps exactly
//! one authoritative result. Each execution takes a [`Ticket`] when it starts
//! and may only publish while that ticket is still the newest one issued. A
//! late completion from a superseded execution is dropped.

use std::sync::{
    Arc, PoisonError, RwLock,
    atomic::{AtomicU64, Ordering},
};

use tracing::{info, warn};

use crate::engine::MergedResult;

/// Identifies one query execution. Later tickets compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

/// Outcome of [`LiveResult::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    /// The result is now the live result.
    Installed,
    /// A newer execution started, the result was discarded.
    Superseded,
}

#[derive(Debug, Default)]
struct Slot {
    /// Ticket of the installed result, zero before the first install.
    generation: u64,
    result: Option<Arc<MergedResult>>,
}

/// Holder of the single authoritative result set.
#[derive(Debug, Default)]
pub struct LiveResult {
    issued: AtomicU64,
    slot: RwLock<Slot>,
}

impl LiveResult {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an execution. Every ticket issued earlier becomes stale.
    pub fn begin(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `ticket` is still the newest issued.
    #[must_use]
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }

    /// Install `result` if `ticket` is still the newest issued, replacing the
    /// previous result wholesale. Otherwise this is a no-op.
    pub fn publish(&self, ticket: Ticket, result: MergedResult) -> Publish {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if !self.is_current(ticket) || ticket.0 <= slot.generation {
            warn!(
                "Discarding result of superseded execution {ticket}, newest is {newest}",
                ticket = ticket.0,
                newest = self.issued.load(Ordering::SeqCst)
            );
            return Publish::Superseded;
        }

        info!(
            "Installing result of execution {ticket}: {columns} columns, {rows} rows",
            ticket = ticket.0,
            columns = result.columns.len(),
            rows = result.rows.len()
        );
        slot.generation = ticket.0;
        slot.result = Some(Arc::new(result));
        Publish::Installed
    }

    /// The current authoritative result, if any execution has completed.
    #[must_use]
    pub fn current(&self) -> Option<Arc<MergedResult>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .result
            .clone()
    }
}

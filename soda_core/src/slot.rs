//! Single-value handoff slot between the barcode intake thread and the
//! controller tick.
//!
//! Contract: one writer (the intake thread), one reader (the controller).
//! A write overwrites any unconsumed value (last-write-wins, no queue);
//! a read clears the slot, so a consumed scan is never re-delivered.
//! This is the only shared mutable state in the process.

use std::sync::{Arc, Mutex};

/// In-band null used by the till receipts; never a valid trigger.
pub const BARCODE_NULL: i64 = -1;

/// A decoded scan stamped with the controller-epoch time it arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scan {
    pub code: i64,
    pub received_at_ms: u64,
}

#[derive(Debug, Default)]
struct Cell {
    pending: Mutex<Option<Scan>>,
}

impl Cell {
    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Scan>> {
        // A poisoned slot only means a holder panicked mid-store; the
        // Option inside is still a coherent value.
        self.pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Writer half, owned by the intake thread.
#[derive(Debug, Clone)]
pub struct SlotWriter {
    cell: Arc<Cell>,
}

/// Reader half, owned by the controller.
#[derive(Debug)]
pub struct SlotReader {
    cell: Arc<Cell>,
}

/// Create a connected writer/reader pair around an empty slot.
pub fn barcode_slot() -> (SlotWriter, SlotReader) {
    let cell = Arc::new(Cell::default());
    (
        SlotWriter { cell: cell.clone() },
        SlotReader { cell },
    )
}

impl SlotWriter {
    /// Store a decoded scan, overwriting any unconsumed one.
    pub fn submit(&self, code: i64, now_ms: u64) {
        let mut guard = self.cell.lock();
        if let Some(prev) = guard.replace(Scan {
            code,
            received_at_ms: now_ms,
        }) {
            tracing::debug!(dropped = prev.code, "unconsumed scan overwritten");
        }
    }

    /// Explicitly reject the current line: clear the slot.
    pub fn submit_invalid(&self) {
        *self.cell.lock() = None;
    }
}

impl SlotReader {
    /// Atomic read-and-clear, called once per controller tick.
    pub fn take(&self) -> Option<Scan> {
        self.cell.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_clears_the_slot() {
        let (tx, rx) = barcode_slot();
        tx.submit(42, 7);
        assert_eq!(
            rx.take(),
            Some(Scan {
                code: 42,
                received_at_ms: 7
            })
        );
        assert_eq!(rx.take(), None);
    }

    #[test]
    fn second_submit_overwrites_first() {
        let (tx, rx) = barcode_slot();
        tx.submit(1, 10);
        tx.submit(2, 20);
        assert_eq!(
            rx.take(),
            Some(Scan {
                code: 2,
                received_at_ms: 20
            })
        );
        assert_eq!(rx.take(), None);
    }

    #[test]
    fn submit_invalid_discards_pending_value() {
        let (tx, rx) = barcode_slot();
        tx.submit(5, 1);
        tx.submit_invalid();
        assert_eq!(rx.take(), None);
    }

    #[test]
    fn empty_slot_reads_none() {
        let (_tx, rx) = barcode_slot();
        assert_eq!(rx.take(), None);
    }
}

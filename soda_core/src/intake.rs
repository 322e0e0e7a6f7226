//! Barcode scanner intake thread.
//!
//! The scanner presents as keyboard-style text lines. A dedicated
//! thread blocks on the line reader and publishes each decoded code
//! into the handoff slot; the controller never blocks on input.
//!
//! Cancellation is best-effort: the stop flag is checked once per loop
//! iteration, so a stop issued while the thread is blocked in a read
//! takes effect only when the next line (or EOF) arrives.

use crate::slot::{BARCODE_NULL, SlotWriter};
use soda_traits::clock::Clock;
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

pub struct Intake {
    stop: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Intake {
    /// Spawn the reader thread. Scans are stamped against the same
    /// clock/epoch the controller uses, so freshness comparisons share
    /// one timeline.
    pub fn spawn<R, C>(mut reader: R, slot: SlotWriter, clock: C, epoch: Instant) -> Self
    where
        R: BufRead + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let join_handle = std::thread::spawn(move || {
            let mut line = String::new();
            loop {
                if stop_flag.load(Ordering::Relaxed) {
                    tracing::debug!("intake thread received stop signal");
                    break;
                }
                line.clear();
                match reader.read_line(&mut line) {
                    Ok(0) => {
                        tracing::debug!("scanner input reached EOF");
                        break;
                    }
                    Ok(_) => match line.trim().parse::<i64>() {
                        Ok(code) if code != BARCODE_NULL => {
                            slot.submit(code, clock.ms_since(epoch));
                        }
                        Ok(_) => {
                            // The in-band null is never a trigger.
                            tracing::debug!("sentinel scan rejected");
                            slot.submit_invalid();
                        }
                        Err(_) => {
                            tracing::debug!(line = %line.trim(), "unparsable scan rejected");
                            slot.submit_invalid();
                        }
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "scanner read failed");
                        break;
                    }
                }
            }
            tracing::trace!("intake thread exiting");
        });

        Self {
            stop,
            join_handle: Some(join_handle),
        }
    }

    /// Request the thread to stop at its next loop iteration.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Stop and wait for the thread. Only call this when the reader is
    /// known to terminate (EOF or a closed pipe); a quiet scanner keeps
    /// the thread blocked indefinitely.
    pub fn join(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            if let Err(e) = handle.join() {
                tracing::warn!(?e, "intake thread panicked");
            }
        }
    }
}

impl Drop for Intake {
    fn drop(&mut self) {
        // Signal only. Joining here could hang the process behind a
        // blocking read that never returns; the thread holds no state
        // beyond the slot writer.
        self.stop.store(true, Ordering::Relaxed);
    }
}

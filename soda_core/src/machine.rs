//! The vending controller: single authority over the relay output.
//!
//! One `step()` is one tick: snapshot the panel inputs, poll the
//! shutdown hold, fire the receipt printer on a press edge, drain the
//! barcode slot through the receipt-age filter, run the pure transition,
//! then write the relay state. Outputs are re-asserted every tick so a
//! transient I/O glitch heals on the next pass.

use crate::error::{BuildError, Result, VendError};
use crate::shutdown::ShutdownSequencer;
use crate::slot::{BARCODE_NULL, SlotReader};
use crate::state::{DispenseState, TickInputs, advance};
use crate::validity::{is_fresh, receipt_fresh};
use eyre::WrapErr;
use soda_traits::clock::{Clock, MonotonicClock};
use soda_traits::{ControlPanel, DispenseRelay, ReceiptPrinter};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Timing knobs, all in milliseconds.
#[derive(Debug, Clone)]
pub struct TimingCfg {
    /// Controller tick period.
    pub tick_ms: u64,
    /// Maximum relay-on window after a trigger, absent early cancel.
    pub dispense_ms: u64,
    /// Maximum age of a scanned barcode before it is stale.
    pub barcode_valid_ms: u64,
    /// Continuous print-button + switch hold that forces shutdown.
    pub shutdown_hold_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            tick_ms: 200,
            dispense_ms: 60_000,
            barcode_valid_ms: crate::validity::BARCODE_VALID_MS,
            shutdown_hold_ms: 5_000,
        }
    }
}

/// Outcome of a single tick.
#[derive(Debug)]
pub enum TickStatus {
    /// Keep ticking.
    Running,
    /// Operator hold completed; relay already forced off.
    ShutdownRequested,
}

pub struct VendingMachine<P: ControlPanel, R: DispenseRelay> {
    panel: P,
    relay: R,
    printer: Option<Box<dyn ReceiptPrinter>>,
    slot: SlotReader,
    timing: TimingCfg,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    /// Wall-clock Unix seconds at the epoch; receipt ages are measured
    /// against `unix_base_s + now_ms / 1000`.
    unix_base_s: i64,
    tick_period: Duration,

    state: DispenseState,
    prev_switch_on: bool,
    prev_print_pressed: bool,
    shutdown: ShutdownSequencer,
}

impl<P: ControlPanel, R: DispenseRelay> core::fmt::Debug for VendingMachine<P, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VendingMachine")
            .field("state", &self.state)
            .field("timing", &self.timing)
            .finish()
    }
}

impl<P: ControlPanel, R: DispenseRelay> VendingMachine<P, R> {
    pub fn builder(panel: P, relay: R, slot: SlotReader) -> Builder<P, R> {
        Builder {
            panel,
            relay,
            slot,
            printer: None,
            timing: None,
            clock: None,
            unix_base_s: None,
        }
    }

    /// Current dispense state (for tests and status reporting).
    pub fn state(&self) -> DispenseState {
        self.state
    }

    /// Shared clock; the intake thread stamps scans with it.
    pub fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        self.clock.clone()
    }

    /// Epoch all `*_ms` timestamps are measured from.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// One controller tick. Sleeps the tick period before returning
    /// `Running`; returns immediately on shutdown.
    pub fn step(&mut self) -> Result<TickStatus> {
        let now = self.clock.ms_since(self.epoch);

        let switch_on = self
            .panel
            .switch_on()
            .map_err(|e| eyre::Report::new(VendError::Gpio(e.to_string())))
            .wrap_err("read switch")?;
        let print_pressed = self
            .panel
            .print_pressed()
            .map_err(|e| eyre::Report::new(VendError::Gpio(e.to_string())))
            .wrap_err("read print button")?;
        let early_off_pressed = self
            .panel
            .early_off_pressed()
            .map_err(|e| eyre::Report::new(VendError::Gpio(e.to_string())))
            .wrap_err("read early-off button")?;

        // Operator escape hatch first: its output wins over everything.
        if self.shutdown.poll(print_pressed && switch_on, now) {
            self.force_off();
            return Ok(TickStatus::ShutdownRequested);
        }

        // Receipt print on the press edge only; failures never touch
        // the dispense logic.
        if print_pressed && !self.prev_print_pressed
            && let Some(printer) = self.printer.as_mut()
            && let Err(e) = printer.print_receipt()
        {
            tracing::warn!(error = %e, "receipt print failed");
        }

        let mut barcode_trigger = false;
        if let Some(scan) = self.slot.take() {
            // The code is the receipt's print-time Unix timestamp; its
            // age against wall-clock now is the operative check. The
            // arrival stamp only guards against scans that sat in the
            // slot past the window.
            let unix_now_s = self.unix_base_s.saturating_add((now / 1000) as i64);
            let window_s = (self.timing.barcode_valid_ms / 1000) as i64;
            if scan.code == BARCODE_NULL {
                tracing::debug!("null sentinel scan ignored");
            } else if !is_fresh(scan.received_at_ms, now, self.timing.barcode_valid_ms) {
                tracing::debug!(
                    code = scan.code,
                    received_at_ms = scan.received_at_ms,
                    now_ms = now,
                    "stale scan arrival discarded"
                );
            } else if receipt_fresh(scan.code, unix_now_s, window_s) {
                tracing::info!(code = scan.code, "barcode accepted");
                barcode_trigger = true;
            } else {
                tracing::debug!(
                    printed_at_s = scan.code,
                    unix_now_s,
                    "expired receipt discarded"
                );
            }
        }

        let inputs = TickInputs {
            switch_on,
            prev_switch_on: self.prev_switch_on,
            early_off_pressed,
            barcode_trigger,
            now_ms: now,
        };
        let next = advance(self.state, &inputs, self.timing.dispense_ms);
        if next.relay_on() != self.state.relay_on() {
            match next {
                DispenseState::Dispensing { source, .. } => {
                    tracing::info!(?source, now_ms = now, "dispense on");
                }
                DispenseState::Idle => tracing::info!(now_ms = now, "dispense off"),
            }
        }
        self.state = next;
        self.prev_switch_on = switch_on;
        self.prev_print_pressed = print_pressed;

        // Write the output every tick, transition or not.
        if self.state.relay_on() {
            self.relay
                .energize()
                .map_err(|e| eyre::Report::new(VendError::Gpio(e.to_string())))
                .wrap_err("energize relay")?;
        } else {
            self.relay
                .deenergize()
                .map_err(|e| eyre::Report::new(VendError::Gpio(e.to_string())))
                .wrap_err("deenergize relay")?;
        }

        self.clock.sleep(self.tick_period);
        Ok(TickStatus::Running)
    }

    /// Best-effort relay off, used on shutdown and interrupt paths.
    pub fn force_off(&mut self) {
        self.state = DispenseState::Idle;
        if let Err(e) = self.relay.deenergize() {
            tracing::warn!(error = %e, "relay off failed during shutdown");
        }
    }
}

/// Builder for `VendingMachine`; timing is validated on `build()`.
pub struct Builder<P: ControlPanel, R: DispenseRelay> {
    panel: P,
    relay: R,
    slot: SlotReader,
    printer: Option<Box<dyn ReceiptPrinter>>,
    timing: Option<TimingCfg>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    unix_base_s: Option<i64>,
}

impl<P: ControlPanel, R: DispenseRelay> Builder<P, R> {
    pub fn with_printer(mut self, printer: impl ReceiptPrinter + 'static) -> Self {
        self.printer = Some(Box::new(printer));
        self
    }

    pub fn with_timing(mut self, timing: TimingCfg) -> Self {
        self.timing = Some(timing);
        self
    }

    /// Provide a custom clock; defaults to MonotonicClock.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Override the wall-clock Unix seconds at the epoch; defaults to
    /// the system clock. Receipt ages become deterministic under a
    /// frozen test clock with this set.
    pub fn with_unix_base(mut self, secs: i64) -> Self {
        self.unix_base_s = Some(secs);
        self
    }

    pub fn build(self) -> Result<VendingMachine<P, R>> {
        let timing = self.timing.unwrap_or_default();
        if timing.tick_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "tick_ms must be >= 1",
            )));
        }
        if timing.dispense_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "dispense_ms must be >= 1",
            )));
        }
        if timing.barcode_valid_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "barcode_valid_ms must be >= 1",
            )));
        }
        if timing.shutdown_hold_ms < timing.tick_ms {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "shutdown_hold_ms must be at least one tick",
            )));
        }
        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };
        let epoch = clock.now();
        let unix_base_s = self.unix_base_s.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0)
        });
        let tick_period = Duration::from_millis(timing.tick_ms);
        let shutdown = ShutdownSequencer::new(timing.shutdown_hold_ms);

        Ok(VendingMachine {
            panel: self.panel,
            relay: self.relay,
            printer: self.printer,
            slot: self.slot,
            timing,
            clock,
            epoch,
            unix_base_s,
            tick_period,
            state: DispenseState::Idle,
            prev_switch_on: false,
            prev_print_pressed: false,
            shutdown,
        })
    }
}

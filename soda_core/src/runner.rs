//! Tick loop driving the controller until shutdown or interrupt.

use crate::error::Result;
use crate::machine::{TickStatus, VendingMachine};
use soda_traits::{ControlPanel, DispenseRelay};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Why the loop ended. Both causes leave the relay de-energized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    /// Operator completed the print-button + switch hold.
    OperatorHold,
    /// External interrupt (SIGINT or supervisor stop).
    Interrupted,
}

/// Run the controller until the operator hold completes or `interrupt`
/// is raised. GPIO errors bubble out; the relay is forced off on every
/// exit path that this function controls.
pub fn run<P, R>(
    machine: &mut VendingMachine<P, R>,
    interrupt: &Arc<AtomicBool>,
) -> Result<ShutdownCause>
where
    P: ControlPanel,
    R: DispenseRelay,
{
    tracing::info!("vending control loop start");
    loop {
        if interrupt.load(Ordering::Relaxed) {
            machine.force_off();
            tracing::info!("interrupt received; relay forced off");
            return Ok(ShutdownCause::Interrupted);
        }
        match machine.step() {
            Ok(TickStatus::Running) => {}
            Ok(TickStatus::ShutdownRequested) => {
                tracing::info!("operator shutdown; control loop ending");
                return Ok(ShutdownCause::OperatorHold);
            }
            Err(e) => {
                // Best-effort: never leave the relay energized behind
                // a failed tick.
                machine.force_off();
                return Err(e);
            }
        }
    }
}

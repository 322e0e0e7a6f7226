//! Dispense state and the per-tick transition function.
//!
//! The state is a plain tagged value and the transition is a pure
//! function of a snapshot of the tick's inputs; the controller applies
//! the result and drives the relay from it. Precedence per tick:
//! switch > fresh barcode trigger > switch-release / window expiry /
//! early-off.

/// What started the current dispense. A switch-initiated dispense ends
/// the moment the switch releases; a barcode-initiated one runs out the
/// window (or is cut short by the early-off button).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Switch,
    Barcode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispenseState {
    /// Relay de-energized.
    Idle,
    /// Relay energized since `started_at_ms`.
    Dispensing {
        started_at_ms: u64,
        source: TriggerSource,
    },
}

impl DispenseState {
    #[inline]
    pub fn relay_on(&self) -> bool {
        matches!(self, DispenseState::Dispensing { .. })
    }
}

/// Snapshot of one tick's inputs. `barcode_trigger` is set only for a
/// scan that already passed the freshness filter this tick.
#[derive(Debug, Clone, Copy)]
pub struct TickInputs {
    pub switch_on: bool,
    pub prev_switch_on: bool,
    pub early_off_pressed: bool,
    pub barcode_trigger: bool,
    pub now_ms: u64,
}

/// Compute the next dispense state from the current one and a tick
/// snapshot.
///
/// - A held switch always dispenses. Only a fresh off-to-on edge sets
///   `started_at_ms`; while held, the timer is neither reset nor
///   allowed to expire, and barcodes have no additional effect.
/// - With the switch off, a fresh trigger (re)starts the window, even
///   mid-dispense.
/// - Otherwise a running dispense ends on switch release (switch-
///   initiated only), window expiry, or early-off. A dispense entered
///   this same tick is never cancelled by early-off.
pub fn advance(state: DispenseState, inputs: &TickInputs, dispense_ms: u64) -> DispenseState {
    if inputs.switch_on {
        let fresh_edge = !inputs.prev_switch_on;
        return match state {
            DispenseState::Dispensing { started_at_ms, .. } if !fresh_edge => {
                DispenseState::Dispensing {
                    started_at_ms,
                    source: TriggerSource::Switch,
                }
            }
            _ => DispenseState::Dispensing {
                started_at_ms: inputs.now_ms,
                source: TriggerSource::Switch,
            },
        };
    }

    if inputs.barcode_trigger {
        return DispenseState::Dispensing {
            started_at_ms: inputs.now_ms,
            source: TriggerSource::Barcode,
        };
    }

    match state {
        DispenseState::Idle => DispenseState::Idle,
        // The switch is off here, so a switch-initiated dispense ends.
        DispenseState::Dispensing {
            source: TriggerSource::Switch,
            ..
        } => DispenseState::Idle,
        DispenseState::Dispensing { started_at_ms, .. }
            if inputs.now_ms.saturating_sub(started_at_ms) > dispense_ms =>
        {
            DispenseState::Idle
        }
        DispenseState::Dispensing { .. } if inputs.early_off_pressed => DispenseState::Idle,
        keep => keep,
    }
}

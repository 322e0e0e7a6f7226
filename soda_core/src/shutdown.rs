//! Operator shutdown hold: print-button + switch held continuously.

/// Tracks the two-input hold and fires exactly once when the hold
/// duration reaches the threshold. Any release clears the hold; an
/// interrupted hold earns no partial credit.
#[derive(Debug)]
pub struct ShutdownSequencer {
    hold_ms: u64,
    hold_started_at_ms: Option<u64>,
    fired: bool,
}

impl ShutdownSequencer {
    pub fn new(hold_ms: u64) -> Self {
        Self {
            hold_ms,
            hold_started_at_ms: None,
            fired: false,
        }
    }

    /// Called once per tick. Returns true on the tick the hold
    /// completes; latched so it can never fire twice.
    pub fn poll(&mut self, both_held: bool, now_ms: u64) -> bool {
        if self.fired {
            return false;
        }
        if !both_held {
            self.hold_started_at_ms = None;
            return false;
        }
        match self.hold_started_at_ms {
            None => {
                self.hold_started_at_ms = Some(now_ms);
                false
            }
            Some(t0) => {
                if now_ms.saturating_sub(t0) >= self.hold_ms {
                    self.fired = true;
                    tracing::info!(held_ms = now_ms.saturating_sub(t0), "shutdown hold complete");
                    true
                } else {
                    false
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOLD: u64 = 5_000;

    #[test]
    fn short_hold_does_not_fire() {
        let mut seq = ShutdownSequencer::new(HOLD);
        assert!(!seq.poll(true, 0));
        assert!(!seq.poll(true, 4_900));
    }

    #[test]
    fn full_hold_fires_once_and_latches() {
        let mut seq = ShutdownSequencer::new(HOLD);
        assert!(!seq.poll(true, 0));
        assert!(seq.poll(true, 5_000));
        assert!(!seq.poll(true, 5_200));
        assert!(!seq.poll(true, 60_000));
    }

    #[test]
    fn release_resets_the_hold_clock() {
        let mut seq = ShutdownSequencer::new(HOLD);
        assert!(!seq.poll(true, 0));
        assert!(!seq.poll(true, 3_000));
        // Released at 3 s: the 3 s already held never accumulates.
        assert!(!seq.poll(false, 3_200));
        assert!(!seq.poll(true, 3_400));
        assert!(!seq.poll(true, 8_200));
        assert!(seq.poll(true, 8_400));
    }

    #[test]
    fn single_input_is_not_a_hold() {
        let mut seq = ShutdownSequencer::new(HOLD);
        for t in (0..20_000).step_by(200) {
            assert!(!seq.poll(false, t));
        }
    }
}

//! Barcode freshness filters.
//!
//! Two checks guard a scan. The operative one is receipt age: the
//! scanned code is the Unix timestamp the receipt was printed at, and
//! a receipt older than the window (or from the future) is expired.
//! The arrival stamp check is a replay guard for scans that sat
//! unconsumed in the handoff slot.

/// Default validity window for a scanned receipt: one hour.
pub const BARCODE_VALID_MS: u64 = 3_600_000;

/// Receipt validity window in seconds (the codes are second-resolution
/// Unix timestamps).
pub const RECEIPT_VALID_S: i64 = 3_600;

/// Arrival-stamp guard: usable iff `0 <= now - received_at <= window`.
///
/// Timestamps ahead of `now` (clock skew, replayed input) are rejected,
/// as are scans older than the window. The caller discards rejected
/// scans permanently; there is no retry.
#[inline]
pub fn is_fresh(received_at_ms: u64, now_ms: u64, window_ms: u64) -> bool {
    now_ms
        .checked_sub(received_at_ms)
        .is_some_and(|age| age <= window_ms)
}

/// Receipt-age check: usable iff `0 <= unix_now - printed_at <= window`.
///
/// `printed_at_s` is the scanned code itself, the print-time Unix
/// timestamp encoded on the receipt. Codes from the future are
/// rejected the same as expired ones.
#[inline]
pub fn receipt_fresh(printed_at_s: i64, unix_now_s: i64, window_s: i64) -> bool {
    unix_now_s
        .checked_sub(printed_at_s)
        .is_some_and(|age| (0..=window_s).contains(&age))
}

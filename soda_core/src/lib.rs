#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Vending control core (hardware-agnostic).
//!
//! Reconciles three trigger sources — bypass switch, validated barcode
//! scan, early-off button — into a single relay output, once per
//! ~200 ms tick. All hardware goes through `soda_traits::ControlPanel`,
//! `DispenseRelay`, and `ReceiptPrinter`.
//!
//! ## Architecture
//!
//! - **State**: `DispenseState` + pure per-tick transition (`state`)
//! - **Handoff**: single-value overwrite slot for scans (`slot`)
//! - **Freshness**: barcode validity window (`validity`)
//! - **Escape hatch**: two-input shutdown hold (`shutdown`)
//! - **Intake**: blocking line-reader thread (`intake`)
//! - **Controller**: per-tick orchestration (`machine`, `runner`)

pub mod error;
pub mod intake;
pub mod machine;
pub mod mocks;
pub mod runner;
pub mod shutdown;
pub mod slot;
pub mod state;
pub mod validity;

pub use error::{BuildError, VendError};
pub use intake::Intake;
pub use machine::{TickStatus, TimingCfg, VendingMachine};
pub use runner::ShutdownCause;
pub use shutdown::ShutdownSequencer;
pub use slot::{BARCODE_NULL, Scan, SlotReader, SlotWriter, barcode_slot};
pub use state::{DispenseState, TickInputs, TriggerSource, advance};
pub use validity::{BARCODE_VALID_MS, RECEIPT_VALID_S, is_fresh, receipt_fresh};

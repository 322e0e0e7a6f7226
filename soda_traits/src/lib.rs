pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Operator-facing inputs of the vending machine: bypass switch,
/// receipt print button, and early-off button.
pub trait ControlPanel {
    fn switch_on(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
    fn print_pressed(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
    fn early_off_pressed(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

/// Dispense output: the relay plus the red/green status indicators,
/// driven together so the panel always reflects the relay state.
pub trait DispenseRelay {
    fn energize(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn deenergize(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Receipt printer: renders a fresh barcode and hands it to the spooler.
/// Implementations choose the payload (the current wall-clock timestamp).
pub trait ReceiptPrinter {
    fn print_receipt(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

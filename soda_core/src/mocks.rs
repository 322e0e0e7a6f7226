//! Test doubles for the hardware seams.

use soda_traits::{ControlPanel, DispenseRelay, ReceiptPrinter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Handle for driving a `ScriptedPanel` from a test while the panel
/// itself is owned by the machine.
#[derive(Debug, Clone, Default)]
pub struct PanelHandle {
    switch: Arc<AtomicBool>,
    print: Arc<AtomicBool>,
    early_off: Arc<AtomicBool>,
}

impl PanelHandle {
    pub fn set_switch(&self, on: bool) {
        self.switch.store(on, Ordering::Relaxed);
    }
    pub fn set_print(&self, pressed: bool) {
        self.print.store(pressed, Ordering::Relaxed);
    }
    pub fn set_early_off(&self, pressed: bool) {
        self.early_off.store(pressed, Ordering::Relaxed);
    }
}

/// Panel whose inputs are flipped externally through a `PanelHandle`.
pub struct ScriptedPanel {
    handle: PanelHandle,
}

pub fn scripted_panel() -> (ScriptedPanel, PanelHandle) {
    let handle = PanelHandle::default();
    (
        ScriptedPanel {
            handle: handle.clone(),
        },
        handle,
    )
}

impl ControlPanel for ScriptedPanel {
    fn switch_on(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.handle.switch.load(Ordering::Relaxed))
    }
    fn print_pressed(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.handle.print.load(Ordering::Relaxed))
    }
    fn early_off_pressed(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.handle.early_off.load(Ordering::Relaxed))
    }
}

/// Probe observing what a `SpyRelay` was told to do.
#[derive(Debug, Clone, Default)]
pub struct RelayProbe {
    energized: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl RelayProbe {
    pub fn is_energized(&self) -> bool {
        self.energized.load(Ordering::Relaxed)
    }
    /// Total output writes, both on and off.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

pub struct SpyRelay {
    probe: RelayProbe,
}

pub fn spy_relay() -> (SpyRelay, RelayProbe) {
    let probe = RelayProbe::default();
    (
        SpyRelay {
            probe: probe.clone(),
        },
        probe,
    )
}

impl DispenseRelay for SpyRelay {
    fn energize(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.probe.energized.store(true, Ordering::Relaxed);
        self.probe.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
    fn deenergize(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.probe.energized.store(false, Ordering::Relaxed);
        self.probe.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Probe counting receipt print attempts.
#[derive(Debug, Clone, Default)]
pub struct PrinterProbe {
    attempts: Arc<AtomicUsize>,
}

impl PrinterProbe {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }
}

pub struct SpyPrinter {
    probe: PrinterProbe,
    fail: bool,
}

pub fn spy_printer() -> (SpyPrinter, PrinterProbe) {
    let probe = PrinterProbe::default();
    (
        SpyPrinter {
            probe: probe.clone(),
            fail: false,
        },
        probe,
    )
}

/// Printer that counts attempts but always errors; the controller must
/// shrug it off.
pub fn failing_printer() -> (SpyPrinter, PrinterProbe) {
    let probe = PrinterProbe::default();
    (
        SpyPrinter {
            probe: probe.clone(),
            fail: true,
        },
        probe,
    )
}

impl ReceiptPrinter for SpyPrinter {
    fn print_receipt(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.probe.attempts.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(Box::new(std::io::Error::other("spooler offline")));
        }
        Ok(())
    }
}

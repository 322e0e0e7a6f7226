#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the dispense controller.
//!
//! `Config` and sub-structs are deserialized from TOML and validated.
//! Every field has a default matching the installed machine, so an
//! absent or empty file yields a runnable configuration.

use serde::Deserialize;

/// BCM pin assignments on the controller board.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Pins {
    /// Dispense relay output.
    pub relay: u8,
    /// Idle indicator LED.
    pub led_red: u8,
    /// Dispensing indicator LED.
    pub led_green: u8,
    /// Bypass switch input.
    pub switch_in: u8,
    /// Receipt print button input.
    pub print_button: u8,
    /// Early-off button input.
    pub early_off: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            relay: 4,
            led_red: 12,
            led_green: 13,
            switch_in: 18,
            print_button: 19,
            early_off: 17,
        }
    }
}

/// Controller timing, all in milliseconds.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Timing {
    pub tick_ms: u64,
    /// Relay-on window after a trigger.
    pub dispense_ms: u64,
    /// Maximum age of a scanned barcode.
    pub barcode_valid_ms: u64,
    /// Print-button + switch hold that requests shutdown.
    pub shutdown_hold_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            tick_ms: 200,
            dispense_ms: 60_000,
            barcode_valid_ms: 3_600_000,
            shutdown_hold_ms: 5_000,
        }
    }
}

/// Receipt print pipeline.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Printer {
    pub enabled: bool,
    /// CUPS destination name.
    pub queue: String,
    /// Where the rendered barcode PNG is written.
    pub image_path: String,
    /// Barcode height in pixels.
    pub height_px: u32,
}

impl Default for Printer {
    fn default() -> Self {
        Self {
            enabled: true,
            queue: "ITPP130".into(),
            image_path: "barcode.png".into(),
            height_px: 206,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pins: Pins,
    pub timing: Timing,
    pub printer: Printer,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Timing
        if self.timing.tick_ms == 0 {
            eyre::bail!("timing.tick_ms must be >= 1");
        }
        if self.timing.tick_ms > 10_000 {
            eyre::bail!("timing.tick_ms is unreasonably large (>10s)");
        }
        if self.timing.dispense_ms == 0 {
            eyre::bail!("timing.dispense_ms must be >= 1");
        }
        if self.timing.barcode_valid_ms == 0 {
            eyre::bail!("timing.barcode_valid_ms must be >= 1");
        }
        if self.timing.shutdown_hold_ms < self.timing.tick_ms {
            eyre::bail!("timing.shutdown_hold_ms must be at least one tick");
        }

        // Pins: every assignment must be distinct.
        let pins = [
            ("pins.relay", self.pins.relay),
            ("pins.led_red", self.pins.led_red),
            ("pins.led_green", self.pins.led_green),
            ("pins.switch_in", self.pins.switch_in),
            ("pins.print_button", self.pins.print_button),
            ("pins.early_off", self.pins.early_off),
        ];
        for (i, (name_a, pin_a)) in pins.iter().enumerate() {
            for (name_b, pin_b) in &pins[i + 1..] {
                if pin_a == pin_b {
                    eyre::bail!("{name_a} and {name_b} are both assigned to BCM {pin_a}");
                }
            }
        }

        // Printer
        if self.printer.enabled {
            if self.printer.queue.is_empty() {
                eyre::bail!("printer.queue must not be empty");
            }
            if self.printer.image_path.is_empty() {
                eyre::bail!("printer.image_path must not be empty");
            }
            if self.printer.height_px == 0 {
                eyre::bail!("printer.height_px must be >= 1");
            }
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of: never, daily, hourly");
        }

        Ok(())
    }
}

//! Hardware bindings for the dispense controller.
//!
//! Simulated panel/relay implementations are always available; the real
//! Raspberry Pi GPIO bindings live behind the `hardware` feature.

pub mod error;
pub mod printer;

use soda_traits::{ControlPanel, DispenseRelay};

type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Simulated operator panel. Inputs stay where the last setter put
/// them, so a sim run dispenses on barcode scans alone unless a test
/// flips the switch.
#[derive(Debug, Default)]
pub struct SimulatedPanel {
    switch: bool,
    print: bool,
    early_off: bool,
}

impl SimulatedPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_switch(&mut self, on: bool) {
        self.switch = on;
    }

    pub fn set_print(&mut self, pressed: bool) {
        self.print = pressed;
    }

    pub fn set_early_off(&mut self, pressed: bool) {
        self.early_off = pressed;
    }
}

impl ControlPanel for SimulatedPanel {
    fn switch_on(&mut self) -> Result<bool, DynError> {
        Ok(self.switch)
    }
    fn print_pressed(&mut self) -> Result<bool, DynError> {
        Ok(self.print)
    }
    fn early_off_pressed(&mut self) -> Result<bool, DynError> {
        Ok(self.early_off)
    }
}

/// Simulated relay; logs transitions instead of driving a pin.
#[derive(Debug, Default)]
pub struct SimulatedRelay {
    energized: bool,
}

impl SimulatedRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_energized(&self) -> bool {
        self.energized
    }
}

impl DispenseRelay for SimulatedRelay {
    fn energize(&mut self) -> Result<(), DynError> {
        if !self.energized {
            tracing::info!("relay energized (simulated)");
        }
        self.energized = true;
        Ok(())
    }
    fn deenergize(&mut self) -> Result<(), DynError> {
        if self.energized {
            tracing::info!("relay de-energized (simulated)");
        }
        self.energized = false;
        Ok(())
    }
}

#[cfg(feature = "hardware")]
mod gpio {
    use super::DynError;
    use crate::error::HwError;
    use rppal::gpio::{Gpio, InputPin, OutputPin};
    use soda_traits::{ControlPanel, DispenseRelay};

    fn gpio_err(e: rppal::gpio::Error) -> HwError {
        HwError::Gpio(e.to_string())
    }

    /// Panel inputs wired active-high with internal pull-downs.
    pub struct GpioPanel {
        switch: InputPin,
        print: InputPin,
        early_off: InputPin,
    }

    impl GpioPanel {
        pub fn new(switch_pin: u8, print_pin: u8, early_off_pin: u8) -> Result<Self, HwError> {
            let gpio = Gpio::new().map_err(gpio_err)?;
            Ok(Self {
                switch: gpio.get(switch_pin).map_err(gpio_err)?.into_input_pulldown(),
                print: gpio.get(print_pin).map_err(gpio_err)?.into_input_pulldown(),
                early_off: gpio
                    .get(early_off_pin)
                    .map_err(gpio_err)?
                    .into_input_pulldown(),
            })
        }
    }

    impl ControlPanel for GpioPanel {
        fn switch_on(&mut self) -> Result<bool, DynError> {
            Ok(self.switch.is_high())
        }
        fn print_pressed(&mut self) -> Result<bool, DynError> {
            Ok(self.print.is_high())
        }
        fn early_off_pressed(&mut self) -> Result<bool, DynError> {
            Ok(self.early_off.is_high())
        }
    }

    /// Dispense relay plus the two indicator LEDs that mirror it: green
    /// while dispensing, red while idle.
    pub struct GpioRelay {
        relay: OutputPin,
        led_green: OutputPin,
        led_red: OutputPin,
    }

    impl GpioRelay {
        pub fn new(relay_pin: u8, green_pin: u8, red_pin: u8) -> Result<Self, HwError> {
            let gpio = Gpio::new().map_err(gpio_err)?;
            let mut relay = Self {
                relay: gpio.get(relay_pin).map_err(gpio_err)?.into_output(),
                led_green: gpio.get(green_pin).map_err(gpio_err)?.into_output(),
                led_red: gpio.get(red_pin).map_err(gpio_err)?.into_output(),
            };
            // Known-safe state before the first tick.
            relay.relay.set_low();
            relay.led_green.set_low();
            relay.led_red.set_high();
            Ok(relay)
        }
    }

    impl DispenseRelay for GpioRelay {
        fn energize(&mut self) -> Result<(), DynError> {
            self.relay.set_high();
            self.led_green.set_high();
            self.led_red.set_low();
            Ok(())
        }
        fn deenergize(&mut self) -> Result<(), DynError> {
            self.relay.set_low();
            self.led_green.set_low();
            self.led_red.set_high();
            Ok(())
        }
    }
}

#[cfg(feature = "hardware")]
pub use gpio::{GpioPanel, GpioRelay};

//! Controller assembly: wire config, hardware backend, barcode intake,
//! and receipt printer together and run the tick loop.

use eyre::WrapErr;
use soda_config::Config;
use soda_core::{Intake, ShutdownCause, TimingCfg, VendingMachine, barcode_slot, runner};
use soda_hardware::printer::{LpPrinter, PrinterCfg, print_now, timestamp_payload};
use soda_hardware::{SimulatedPanel, SimulatedRelay};
use soda_traits::{ControlPanel, DispenseRelay};
use std::io::BufReader;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn install_interrupt() -> eyre::Result<Arc<AtomicBool>> {
    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = interrupt.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
        .wrap_err("install SIGINT handler")?;
    Ok(interrupt)
}

fn printer_cfg(cfg: &Config) -> PrinterCfg {
    PrinterCfg {
        queue: cfg.printer.queue.clone(),
        image_path: cfg.printer.image_path.clone().into(),
        height_px: cfg.printer.height_px,
    }
}

/// `soda run`: dispense control loop until operator shutdown or SIGINT.
pub fn run(cfg: &Config, sim: bool) -> eyre::Result<()> {
    let interrupt = install_interrupt()?;

    #[cfg(feature = "hardware")]
    if !sim {
        let panel = soda_hardware::GpioPanel::new(
            cfg.pins.switch_in,
            cfg.pins.print_button,
            cfg.pins.early_off,
        )
        .wrap_err("open panel input pins")?;
        let relay =
            soda_hardware::GpioRelay::new(cfg.pins.relay, cfg.pins.led_green, cfg.pins.led_red)
                .wrap_err("open relay and LED pins")?;
        return run_machine(panel, relay, cfg, &interrupt);
    }

    #[cfg(not(feature = "hardware"))]
    if !sim {
        tracing::warn!("built without hardware support; using the simulated backend");
    }
    run_machine(SimulatedPanel::new(), SimulatedRelay::new(), cfg, &interrupt)
}

fn run_machine<P, R>(
    panel: P,
    relay: R,
    cfg: &Config,
    interrupt: &Arc<AtomicBool>,
) -> eyre::Result<()>
where
    P: ControlPanel,
    R: DispenseRelay,
{
    let (writer, reader) = barcode_slot();
    let timing = TimingCfg {
        tick_ms: cfg.timing.tick_ms,
        dispense_ms: cfg.timing.dispense_ms,
        barcode_valid_ms: cfg.timing.barcode_valid_ms,
        shutdown_hold_ms: cfg.timing.shutdown_hold_ms,
    };

    let mut builder = VendingMachine::builder(panel, relay, reader).with_timing(timing);
    if cfg.printer.enabled {
        builder = builder.with_printer(LpPrinter::new(printer_cfg(cfg)));
    } else {
        tracing::info!("receipt printing disabled by config");
    }
    let mut machine = builder.build().wrap_err("assemble controller")?;

    // The scanner types into stdin; stamp scans with the controller's
    // own clock so freshness shares one timeline.
    let intake = Intake::spawn(
        BufReader::new(std::io::stdin()),
        writer,
        machine.clock(),
        machine.epoch(),
    );

    let cause = runner::run(&mut machine, interrupt)?;
    intake.stop();
    match cause {
        ShutdownCause::OperatorHold => tracing::info!("stopped by operator hold"),
        ShutdownCause::Interrupted => tracing::info!("stopped by interrupt"),
    }
    Ok(())
}

/// `soda print`: one synchronous receipt through the spooler.
pub fn print_once(cfg: &Config) -> eyre::Result<()> {
    eyre::ensure!(cfg.printer.enabled, "printer is disabled in the config");
    let payload = timestamp_payload();
    print_now(&printer_cfg(cfg), &payload).wrap_err("print receipt")?;
    println!("receipt spooled: {payload}");
    Ok(())
}

/// `soda self-check`: report the effective settings and prove the
/// barcode renderer works, without touching GPIO or the spooler.
pub fn self_check(cfg: &Config) -> eyre::Result<()> {
    println!(
        "pins: relay={} led_red={} led_green={} switch_in={} print_button={} early_off={}",
        cfg.pins.relay,
        cfg.pins.led_red,
        cfg.pins.led_green,
        cfg.pins.switch_in,
        cfg.pins.print_button,
        cfg.pins.early_off,
    );
    println!(
        "timing: tick={}ms dispense={}ms barcode_valid={}ms shutdown_hold={}ms",
        cfg.timing.tick_ms,
        cfg.timing.dispense_ms,
        cfg.timing.barcode_valid_ms,
        cfg.timing.shutdown_hold_ms,
    );
    if cfg.printer.enabled {
        let png = soda_hardware::printer::render_code128_png(
            &timestamp_payload(),
            cfg.printer.height_px,
        )
        .wrap_err("render test barcode")?;
        println!(
            "printer: queue={} image_path={} height_px={} (test render: {} bytes)",
            cfg.printer.queue,
            cfg.printer.image_path,
            cfg.printer.height_px,
            png.len(),
        );
    } else {
        println!("printer: disabled");
    }
    println!("self-check ok");
    Ok(())
}

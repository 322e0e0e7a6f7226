//! Receipt printing through the CUPS `lp` spooler.
//!
//! A receipt is a Code 128 barcode of the current Unix timestamp in
//! seconds, rendered to a PNG and handed to `lp`. Rendering and
//! spooling run on a worker thread so the controller tick never waits
//! on the print pipeline; at most one job is queued, and a press that
//! lands while a job is pending is dropped with a warning.

use crate::error::HwError;
use barcoders::generators::image::Image;
use barcoders::sym::code128::Code128;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use soda_traits::ReceiptPrinter;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Print pipeline settings.
#[derive(Debug, Clone)]
pub struct PrinterCfg {
    /// CUPS destination, e.g. `ITPP130`.
    pub queue: String,
    /// Where the rendered PNG is written before spooling.
    pub image_path: PathBuf,
    /// Barcode height in pixels.
    pub height_px: u32,
}

/// Render a Code 128 PNG for the given payload.
///
/// The payload is prefixed with the character-set B selector, which
/// covers digits and the full printable ASCII range.
pub fn render_code128_png(payload: &str, height_px: u32) -> Result<Vec<u8>, HwError> {
    let barcode =
        Code128::new(format!("\u{0181}{payload}")).map_err(|e| HwError::Encode(e.to_string()))?;
    Image::png(height_px)
        .generate(&barcode.encode()[..])
        .map_err(|e| HwError::Encode(e.to_string()))
}

fn spool(queue: &str, image: &Path) -> Result<(), HwError> {
    let status = Command::new("lp").arg("-d").arg(queue).arg(image).status()?;
    if !status.success() {
        return Err(HwError::Spool(format!("lp exited with {status}")));
    }
    Ok(())
}

/// Render one receipt and hand it to `lp`, synchronously.
pub fn print_now(cfg: &PrinterCfg, payload: &str) -> Result<(), HwError> {
    let png = render_code128_png(payload, cfg.height_px)?;
    std::fs::write(&cfg.image_path, &png)?;
    spool(&cfg.queue, &cfg.image_path)
}

/// Receipt payload: the current Unix timestamp in seconds.
pub fn timestamp_payload() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        .to_string()
}

/// `ReceiptPrinter` backed by a single worker thread and the `lp`
/// command line.
pub struct LpPrinter {
    jobs: Sender<String>,
    stop: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl LpPrinter {
    pub fn new(cfg: PrinterCfg) -> Self {
        let (jobs, inbox): (Sender<String>, Receiver<String>) = bounded(1);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let worker = std::thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                match inbox.recv_timeout(Duration::from_millis(200)) {
                    Ok(payload) => {
                        if let Err(e) = print_now(&cfg, &payload) {
                            tracing::error!(error = %e, payload = %payload, "receipt job failed");
                        } else {
                            tracing::info!(payload = %payload, queue = %cfg.queue, "receipt spooled");
                        }
                    }
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::trace!("print worker exiting");
        });

        Self {
            jobs,
            stop,
            worker: Some(worker),
        }
    }
}

impl ReceiptPrinter for LpPrinter {
    fn print_receipt(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match self.jobs.try_send(timestamp_payload()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(payload)) => {
                // A job is already rendering; the press is dropped.
                tracing::warn!(payload = %payload, "print pipeline busy, receipt dropped");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(Box::new(HwError::Spool("print worker gone".into())))
            }
        }
    }
}

impl Drop for LpPrinter {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.worker.take()
            && let Err(e) = handle.join()
        {
            tracing::warn!(?e, "print worker panicked");
        }
    }
}

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use vm_audio::capture::LiveMeter;
use vm_audio::meter::VOLUME_PROCESSOR;
use vm_audio::offline::meter_file;
use vm_audio::registry::ProcessorRegistry;
use vm_core::config::MeterConfig;

use crate::cli::OutputFormat;
use crate::output::{render_message, render_timed};

/// How long the listener sleeps between two drains of the port.
const POLL_INTERVAL: Duration = Duration::from_millis(8);

/// Meter the input device until Ctrl-C or `duration` elapses.
///
/// Messages are drained on this thread; the node itself runs in the cpal
/// callback.
///
/// # Errors
/// Returns an error if the device cannot be opened or stdout is closed.
pub fn run_live(config: &MeterConfig, format: OutputFormat, duration: Option<f64>) -> Result<()> {
    let registry = ProcessorRegistry::with_builtins();
    let mut live = LiveMeter::start(&registry, VOLUME_PROCESSOR, config)?;
    log::info!("Mesure de « {} » ({} canaux)", live.device_name(), live.channels());

    let (stop_tx, stop_rx) = flume::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })?;

    let started = Instant::now();
    let mut out = std::io::stdout().lock();
    loop {
        for msg in live.messages().drain() {
            writeln!(out, "{}", render_message(&msg, format)?)?;
        }
        out.flush()?;

        if duration.is_some_and(|d| started.elapsed().as_secs_f64() >= d) {
            log::info!("Durée atteinte, arrêt.");
            break;
        }
        match stop_rx.recv_timeout(POLL_INTERVAL) {
            Ok(()) | Err(flume::RecvTimeoutError::Disconnected) => {
                log::info!("Interruption reçue, arrêt.");
                break;
            }
            Err(flume::RecvTimeoutError::Timeout) => {}
        }
    }

    let dropped = live.stop()?;
    if dropped > 0 {
        log::warn!("{dropped} messages perdus : l'écouteur n'a pas suivi");
    }
    Ok(())
}

/// Meter an audio file offline and print every message.
///
/// # Errors
/// Returns an error if decoding fails or stdout is closed.
pub fn run_file(path: &Path, config: &MeterConfig, format: OutputFormat) -> Result<()> {
    let registry = ProcessorRegistry::with_builtins();
    log::info!("Analyse du fichier audio : {}", path.display());
    let messages = meter_file(&registry, VOLUME_PROCESSOR, config, path)?;

    let mut out = std::io::stdout().lock();
    for v in &messages {
        writeln!(out, "{}", render_timed(v, format)?)?;
    }
    out.flush()?;
    Ok(())
}

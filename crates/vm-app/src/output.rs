use vm_audio::offline::TimedVolume;
use vm_core::message::VolumeMessage;

use crate::cli::OutputFormat;

/// Width of the text bar, in characters.
const BAR_WIDTH: usize = 40;

/// Render a live message as one output line.
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn render_message(msg: &VolumeMessage, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string(msg),
        OutputFormat::Bar => Ok(bar_line(msg)),
    }
}

/// Render an offline message, prefixed with its render time.
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn render_timed(v: &TimedVolume, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string(v),
        OutputFormat::Bar => Ok(format!(
            "{:>8.3}s {}",
            v.time,
            bar_line(&VolumeMessage { volume: v.volume })
        )),
    }
}

fn bar_line(msg: &VolumeMessage) -> String {
    let filled = (msg.display_level() * BAR_WIDTH as f64).round() as usize;
    format!(
        "{:>6.3} |{}{}|",
        msg.volume,
        "#".repeat(filled),
        " ".repeat(BAR_WIDTH - filled)
    )
}

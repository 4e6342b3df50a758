use std::path::Path;

use anyhow::Result;
use clap::Parser;
use vm_core::config::MeterConfig;

pub mod cli;
pub mod output;
pub mod pipeline;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    cli.validate()?;

    if cli.list_devices {
        for name in vm_audio::capture::list_input_devices()? {
            println!("{name}");
        }
        return Ok(());
    }

    // 3. Charger la config, puis les overrides CLI
    let mut config = resolve_config(&cli.config)?;
    if let Some(ref device) = cli.device {
        config.device = Some(device.clone());
        config.clamp_all();
    }

    // 4. Lancer la mesure
    match cli.audio.as_str() {
        "default" | "mic" | "microphone" => pipeline::run_live(&config, cli.format, cli.duration),
        path => {
            let audio_path = Path::new(path);
            if audio_path.exists() {
                pipeline::run_file(audio_path, &config, cli.format)
            } else {
                anyhow::bail!("Audio source not found: {path}")
            }
        }
    }
}

/// Load the config file, falling back to defaults when it is absent.
fn resolve_config(path: &Path) -> Result<MeterConfig> {
    if path.exists() {
        vm_core::config::load_config(path)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            path.display()
        );
        Ok(MeterConfig::default())
    }
}

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// volmeter — mesure du niveau audio en temps réel.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Source audio : "mic" pour le microphone, ou chemin vers un fichier audio.
    #[arg(long, default_value = "mic")]
    pub audio: String,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Périphérique d'entrée (remplace `host.device` de la config).
    #[arg(long)]
    pub device: Option<String>,

    /// Lister les périphériques d'entrée et quitter.
    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    /// Format de sortie des messages.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Arrêter la capture après N secondes (défaut : jusqu'à Ctrl-C).
    #[arg(long)]
    pub duration: Option<f64>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// How messages are written to stdout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per line: `{"volume":0.123}`.
    Json,
    /// A text level bar per line.
    Bar,
}

impl Cli {
    /// Validate numeric flags.
    ///
    /// # Errors
    /// Returns an error if `--duration` is not a positive number.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(d) = self.duration
            && !(d.is_finite() && d > 0.0)
        {
            anyhow::bail!("--duration doit être un nombre de secondes positif (reçu {d})");
        }
        Ok(())
    }
}

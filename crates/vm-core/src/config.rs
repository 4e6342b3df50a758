use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Minimum interval between two reports, in seconds (60 reports per second).
pub const UPDATE_INTERVAL: f64 = 1.0 / 60.0;

/// Weight of the previous smoothed level in the exponential moving average.
pub const SMOOTHING_FACTOR: f64 = 0.8;

/// Render quantum size in frames.
pub const DEFAULT_BLOCK_SIZE: usize = 128;

/// Capacity of the outbound message ring.
pub const DEFAULT_PORT_CAPACITY: usize = 256;

/// Tuning values handed to a level meter at construction.
///
/// # Example
/// ```
/// use vm_core::config::{MeterParams, SMOOTHING_FACTOR, UPDATE_INTERVAL};
/// let params = MeterParams::default();
/// assert!((params.update_interval - UPDATE_INTERVAL).abs() < f64::EPSILON);
/// assert!((params.smoothing - SMOOTHING_FACTOR).abs() < f64::EPSILON);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeterParams {
    /// Minimum seconds between two reports.
    pub update_interval: f64,
    /// Weight of the previous value, in [0, 1).
    pub smoothing: f64,
}

impl Default for MeterParams {
    fn default() -> Self {
        Self {
            update_interval: UPDATE_INTERVAL,
            smoothing: SMOOTHING_FACTOR,
        }
    }
}

/// Configuration complète du meter et de son hôte.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use vm_core::config::MeterConfig;
/// let config = MeterConfig::default();
/// assert_eq!(config.block_size, 128);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct MeterConfig {
    // === Meter ===
    /// Fréquence maximale des rapports, en Hz.
    pub update_rate_hz: f64,
    /// Lissage exponentiel [0.0, 0.999]. 0 = brut.
    pub smoothing: f64,

    // === Host ===
    /// Taille du bloc de rendu en frames.
    pub block_size: usize,
    /// Capacité du canal de messages sortant.
    pub port_capacity: usize,
    /// Nom du périphérique d'entrée. None = périphérique par défaut.
    pub device: Option<String>,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            update_rate_hz: 60.0,
            smoothing: SMOOTHING_FACTOR,
            block_size: DEFAULT_BLOCK_SIZE,
            port_capacity: DEFAULT_PORT_CAPACITY,
            device: None,
        }
    }
}

impl MeterConfig {
    /// Clamp all fields to their valid ranges.
    pub fn clamp_all(&mut self) {
        self.update_rate_hz = self.update_rate_hz.clamp(1.0, 1000.0);
        self.smoothing = self.smoothing.clamp(0.0, 0.999);
        self.block_size = self.block_size.clamp(16, 4096);
        self.port_capacity = self.port_capacity.clamp(1, 65536);
        if self
            .device
            .as_deref()
            .is_some_and(|d| d.is_empty() || d == "default")
        {
            self.device = None;
        }
    }

    /// Reject values clamping cannot repair.
    ///
    /// # Errors
    /// Returns an error if a float field is NaN or infinite.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.update_rate_hz.is_finite() {
            return Err(CoreError::OutOfRange {
                field: "update_rate_hz",
                value: self.update_rate_hz,
            });
        }
        if !self.smoothing.is_finite() {
            return Err(CoreError::OutOfRange {
                field: "smoothing",
                value: self.smoothing,
            });
        }
        Ok(())
    }

    /// Meter tuning derived from this config.
    #[must_use]
    pub fn meter_params(&self) -> MeterParams {
        MeterParams {
            update_interval: 1.0 / self.update_rate_hz,
            smoothing: self.smoothing,
        }
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize, Default)]
struct ConfigFile {
    meter: Option<MeterSection>,
    host: Option<HostSection>,
}

/// `[meter]` section, all fields optional for partial override.
#[derive(Deserialize)]
struct MeterSection {
    update_rate_hz: Option<f64>,
    smoothing: Option<f64>,
}

/// `[host]` section, all fields optional.
#[derive(Deserialize)]
struct HostSection {
    block_size: Option<usize>,
    port_capacity: Option<usize>,
    device: Option<String>,
}

/// Parse une config TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the TOML is malformed or a value cannot be repaired.
///
/// # Example
/// ```
/// use vm_core::config::parse_config;
/// let config = parse_config("[meter]\nsmoothing = 0.5\n").unwrap();
/// assert!((config.smoothing - 0.5).abs() < f64::EPSILON);
/// assert_eq!(config.block_size, 128);
/// ```
pub fn parse_config(content: &str) -> Result<MeterConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;

    let mut config = MeterConfig::default();

    if let Some(m) = file.meter {
        if let Some(v) = m.update_rate_hz {
            config.update_rate_hz = v;
        }
        if let Some(v) = m.smoothing {
            config.smoothing = v;
        }
    }

    if let Some(h) = file.host {
        if let Some(v) = h.block_size {
            config.block_size = v;
        }
        if let Some(v) = h.port_capacity {
            config.port_capacity = v;
        }
        if let Some(v) = h.device {
            config.device = Some(v);
        }
    }

    config.clamp_all();
    config.validate()?;
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use vm_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<MeterConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    let config = parse_config(&content)
        .with_context(|| format!("Config invalide : {}", path.display()))?;
    log::debug!("Config chargée depuis {}", path.display());
    Ok(config)
}

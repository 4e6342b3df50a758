use serde::{Deserialize, Serialize};

/// Message posted by the level meter after each reported callback.
///
/// Serializes as `{"volume": <number>}`. The value is the smoothed RMS level,
/// non-negative and not clamped: listeners scale it for display.
///
/// # Example
/// ```
/// use vm_core::message::VolumeMessage;
/// let msg = VolumeMessage { volume: 0.25 };
/// assert!(msg.display_level() > 0.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeMessage {
    /// Smoothed loudness estimate.
    pub volume: f64,
}

impl VolumeMessage {
    /// Volume clamped to [0, 1] for bar-style displays.
    #[must_use]
    pub fn display_level(&self) -> f64 {
        self.volume.clamp(0.0, 1.0)
    }
}

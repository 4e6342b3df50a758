/// Shared types, traits, and configuration for volmeter.
///
/// This crate holds everything the audio host and the binary agree on:
/// the render clock, the processor contract, the outbound message shape,
/// and the TOML configuration.

pub mod clock;
pub mod config;
pub mod error;
pub mod message;
pub mod traits;

pub use clock::RenderClock;
pub use config::{MeterConfig, MeterParams};
pub use error::CoreError;
pub use message::VolumeMessage;
pub use traits::AudioProcessor;

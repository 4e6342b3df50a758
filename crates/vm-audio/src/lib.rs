// Real-time level metering and the audio host that drives it.

pub mod capture;
pub mod decode;
pub mod error;
pub mod host;
pub mod meter;
pub mod offline;
pub mod port;
pub mod registry;
pub mod smoothing;

pub use meter::{LevelMeter, VOLUME_PROCESSOR};
pub use port::{MessagePort, MessageReceiver, message_channel};
pub use registry::{NodeOptions, ProcessorRegistry};

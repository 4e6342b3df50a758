use std::collections::HashMap;
use std::sync::Arc;

use vm_core::clock::RenderClock;
use vm_core::config::MeterParams;
use vm_core::message::VolumeMessage;
use vm_core::traits::AudioProcessor;

use crate::error::AudioError;
use crate::meter::{LevelMeter, VOLUME_PROCESSOR};
use crate::port::MessagePort;

/// Everything a node receives when the host instantiates it.
pub struct NodeOptions {
    /// Render clock of the graph the node joins.
    pub clock: Arc<RenderClock>,
    /// Outbound port to the node's listener.
    pub port: MessagePort<VolumeMessage>,
    /// Meter tuning.
    pub params: MeterParams,
}

/// Node constructor stored in the registry.
pub type ProcessorCtor = fn(NodeOptions) -> Box<dyn AudioProcessor>;

/// Table nom → constructeur, consultée par l'hôte pour instancier un nœud.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use vm_audio::port::message_channel;
/// use vm_audio::registry::{NodeOptions, ProcessorRegistry};
/// use vm_core::clock::RenderClock;
///
/// let registry = ProcessorRegistry::with_builtins();
/// let (port, _rx) = message_channel(8);
/// let options = NodeOptions {
///     clock: Arc::new(RenderClock::new(48000)),
///     port,
///     params: Default::default(),
/// };
/// let node = registry.create("volume-processor", options).unwrap();
/// assert_eq!(node.name(), "volume-processor");
/// ```
#[derive(Default)]
pub struct ProcessorRegistry {
    ctors: HashMap<&'static str, ProcessorCtor>,
}

impl ProcessorRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in nodes (`"volume-processor"`).
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .ctors
            .insert(VOLUME_PROCESSOR, LevelMeter::create as ProcessorCtor);
        registry
    }

    /// Register `ctor` under `name`.
    ///
    /// # Errors
    /// Returns `DuplicateProcessor` if the name is taken.
    pub fn register(
        &mut self,
        name: &'static str,
        ctor: ProcessorCtor,
    ) -> Result<(), AudioError> {
        if self.ctors.contains_key(name) {
            return Err(AudioError::DuplicateProcessor(name));
        }
        self.ctors.insert(name, ctor);
        Ok(())
    }

    /// Instantiate the node registered under `name`.
    ///
    /// # Errors
    /// Returns `UnknownProcessor` if nothing is registered under `name`.
    pub fn create(
        &self,
        name: &str,
        options: NodeOptions,
    ) -> Result<Box<dyn AudioProcessor>, AudioError> {
        let ctor = self
            .ctors
            .get(name)
            .ok_or_else(|| AudioError::UnknownProcessor(name.to_string()))?;
        Ok(ctor(options))
    }
}

use std::sync::Arc;

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use vm_core::clock::RenderClock;
use vm_core::config::MeterConfig;
use vm_core::message::VolumeMessage;

use crate::error::AudioError;
use crate::host::RenderHost;
use crate::port::{MessageReceiver, message_channel};
use crate::registry::{NodeOptions, ProcessorRegistry};

/// Live metering of an input device via cpal.
///
/// The render host lives inside the cpal data callback: samples are
/// de-interleaved into pre-allocated blocks and the node runs on the audio
/// thread. Messages come out on the receiver held here.
///
/// Dropping the handle stops the stream, which ends the node's lifecycle.
///
/// # Example
/// ```no_run
/// use vm_audio::capture::LiveMeter;
/// use vm_audio::registry::ProcessorRegistry;
/// use vm_core::config::MeterConfig;
///
/// let registry = ProcessorRegistry::with_builtins();
/// let mut live = LiveMeter::start(&registry, "volume-processor", &MeterConfig::default()).unwrap();
/// for msg in live.messages().drain() {
///     println!("{}", msg.volume);
/// }
/// ```
pub struct LiveMeter {
    stream: cpal::Stream,
    receiver: MessageReceiver<VolumeMessage>,
    clock: Arc<RenderClock>,
    device_name: String,
    channels: usize,
}

impl LiveMeter {
    /// Open the configured input device and start metering it with the node
    /// registered under `processor`.
    ///
    /// # Errors
    /// Returns an error if the device is unavailable, its sample format is
    /// unsupported, or `processor` is not registered.
    pub fn start(
        registry: &ProcessorRegistry,
        processor: &str,
        config: &MeterConfig,
    ) -> Result<Self> {
        let host = cpal::default_host();
        let device = match config.device.as_deref() {
            Some(wanted) => host
                .input_devices()?
                .find(|d| d.name().is_ok_and(|n| n == wanted))
                .ok_or_else(|| AudioError::DeviceNotFound(wanted.to_string()))?,
            None => host
                .default_input_device()
                .ok_or(AudioError::NoInputDevice)?,
        };
        let device_name = device.name().unwrap_or_else(|_| "<sans nom>".to_string());

        let supported = device.default_input_config()?;
        let sample_rate = supported.sample_rate().0;
        let channels = usize::from(supported.channels());
        let format = supported.sample_format();

        let clock = Arc::new(RenderClock::new(sample_rate));
        let (port, receiver) = message_channel(config.port_capacity);
        let node = registry.create(
            processor,
            NodeOptions {
                clock: Arc::clone(&clock),
                port,
                params: config.meter_params(),
            },
        )?;
        let render_host = RenderHost::new(node, Arc::clone(&clock), config.block_size, channels);

        let stream_config: cpal::StreamConfig = supported.into();
        let stream = match format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, render_host)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, render_host)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, render_host)?,
            other => return Err(AudioError::UnsupportedFormat(format!("{other:?}")).into()),
        };
        stream.play()?;

        log::info!(
            "Capture démarrée : {device_name} @ {sample_rate}Hz, {channels} canaux, blocs de {}",
            config.block_size
        );

        Ok(Self {
            stream,
            receiver,
            clock,
            device_name,
            channels,
        })
    }

    /// Listener side of the node's port.
    pub fn messages(&mut self) -> &mut MessageReceiver<VolumeMessage> {
        &mut self.receiver
    }

    /// Name of the device being metered.
    #[must_use]
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Interleaved channel count of the device stream.
    #[must_use]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Stop the stream and return how many messages were dropped.
    ///
    /// # Errors
    /// Returns an error if the backend fails to pause the stream.
    pub fn stop(self) -> Result<u64> {
        self.stream
            .pause()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;
        let dropped = self.receiver.dropped();
        log::info!(
            "Capture arrêtée après {:.2}s, {dropped} messages perdus",
            self.clock.current_time()
        );
        Ok(dropped)
    }
}

/// Build an input stream whose callback converts to f32 and feeds the host.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut host: RenderHost,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            host.push_interleaved(data.iter().map(|&s| f32::from_sample(s)));
        },
        |err| {
            log::error!("Audio stream error: {err}");
        },
        None,
    )?;
    Ok(stream)
}

/// Names of the input devices on the default host.
///
/// # Errors
/// Returns an error if the host cannot enumerate devices.
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let names = host
        .input_devices()?
        .filter_map(|d| d.name().ok())
        .collect();
    Ok(names)
}

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use vm_core::clock::RenderClock;
use vm_core::config::MeterConfig;
use vm_core::message::VolumeMessage;

use crate::decode::decode_file;
use crate::host::RenderHost;
use crate::port::message_channel;
use crate::registry::{NodeOptions, ProcessorRegistry};

/// A message tagged with the render time of the block that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TimedVolume {
    /// Start of the block, in seconds from the beginning of the stream.
    pub time: f64,
    /// Smoothed level posted by the node.
    pub volume: f64,
}

/// Render a mono buffer through a fresh node at simulated time.
///
/// The buffer is cut into blocks of `config.block_size`; a trailing partial
/// block is padded with silence. The port is drained after every block, so
/// nothing is dropped however small `port_capacity` is.
///
/// # Errors
/// Returns an error if `processor` is not registered.
///
/// # Example
/// ```
/// use vm_audio::offline::meter_samples;
/// use vm_audio::registry::ProcessorRegistry;
/// use vm_core::config::MeterConfig;
///
/// let registry = ProcessorRegistry::with_builtins();
/// let samples = vec![0.0f32; 48000];
/// let config = MeterConfig::default();
/// let out = meter_samples(&registry, "volume-processor", &config, &samples, 48000).unwrap();
/// assert!(!out.is_empty());
/// assert!(out.iter().all(|v| v.volume == 0.0));
/// ```
pub fn meter_samples(
    registry: &ProcessorRegistry,
    processor: &str,
    config: &MeterConfig,
    samples: &[f32],
    sample_rate: u32,
) -> Result<Vec<TimedVolume>> {
    let clock = Arc::new(RenderClock::new(sample_rate));
    let (port, mut receiver) = message_channel::<VolumeMessage>(config.port_capacity);
    let node = registry.create(
        processor,
        NodeOptions {
            clock: Arc::clone(&clock),
            port,
            params: config.meter_params(),
        },
    )?;
    let mut host = RenderHost::new(node, Arc::clone(&clock), config.block_size, 1);

    let mut out = Vec::new();
    for block in samples.chunks(host.block_size()) {
        let time = clock.current_time();
        host.push_interleaved(block.iter().copied());
        if block.len() < host.block_size() {
            host.flush();
        }
        out.extend(receiver.drain().map(|m| TimedVolume {
            time,
            volume: m.volume,
        }));
        if !host.is_active() {
            break;
        }
    }
    Ok(out)
}

/// Decode `path` and meter it with [`meter_samples`].
///
/// # Errors
/// Returns an error if decoding fails or `processor` is not registered.
pub fn meter_file(
    registry: &ProcessorRegistry,
    processor: &str,
    config: &MeterConfig,
    path: &Path,
) -> Result<Vec<TimedVolume>> {
    let (samples, sample_rate) = decode_file(path)?;
    if samples.is_empty() {
        anyhow::bail!("Audio file is empty: {}", path.display());
    }
    let out = meter_samples(registry, processor, config, &samples, sample_rate)?;
    log::info!(
        "{} messages pour {:.2}s d'audio",
        out.len(),
        samples.len() as f64 / f64::from(sample_rate)
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::VOLUME_PROCESSOR;

    fn run(samples: &[f32], rate: u32) -> Vec<TimedVolume> {
        let registry = ProcessorRegistry::with_builtins();
        meter_samples(&registry, VOLUME_PROCESSOR, &MeterConfig::default(), samples, rate)
            .unwrap_or_default()
    }

    #[test]
    fn one_second_reports_at_most_sixty_times() {
        let out = run(&vec![0.5; 48000], 48000);
        assert!(out.len() <= 60, "{} reports", out.len());
        assert!(out.len() >= 50, "{} reports", out.len());
        for pair in out.windows(2) {
            assert!(pair[1].time - pair[0].time >= 1.0 / 60.0 - 1e-12);
            assert!(pair[1].volume > pair[0].volume);
        }
    }

    #[test]
    fn tone_then_silence_decays() {
        let mut samples = vec![0.8f32; 24000];
        samples.extend(std::iter::repeat_n(0.0, 24000));
        let out = run(&samples, 48000);
        let peak = out
            .iter()
            .filter(|v| v.time < 0.5)
            .map(|v| v.volume)
            .fold(0.0, f64::max);
        let tail: Vec<f64> = out.iter().filter(|v| v.time >= 0.5).map(|v| v.volume).collect();
        assert!(peak > 0.7);
        assert!(!tail.is_empty());
        assert!(tail.windows(2).all(|w| w[1] < w[0] && w[1] >= 0.0));
        assert!(tail.last().copied().unwrap_or(1.0) < 0.01);
    }

    #[test]
    fn tiny_port_loses_nothing_offline() {
        let registry = ProcessorRegistry::with_builtins();
        let config = MeterConfig {
            port_capacity: 1,
            ..MeterConfig::default()
        };
        let samples = vec![0.3f32; 44100];
        let small = meter_samples(&registry, VOLUME_PROCESSOR, &config, &samples, 44100)
            .unwrap_or_default();
        assert_eq!(small, run(&samples, 44100));
    }

    #[test]
    fn unknown_processor_fails() {
        let registry = ProcessorRegistry::with_builtins();
        let res = meter_samples(&registry, "nope", &MeterConfig::default(), &[0.0; 10], 8000);
        assert!(res.is_err());
    }

    #[test]
    fn stereo_file_is_metered_at_its_native_rate() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec)?;
        for _ in 0..8000 {
            writer.write_sample(16384i16)?;
            writer.write_sample(0i16)?;
        }
        writer.finalize()?;

        let registry = ProcessorRegistry::with_builtins();
        let out = meter_file(&registry, VOLUME_PROCESSOR, &MeterConfig::default(), &path)?;
        // 63 blocks of 128 frames over one second, every other one reports.
        assert_eq!(out.len(), 32);
        let last = out.last().map_or(0.0, |v| v.time);
        assert!(last > 0.95 && last < 1.0, "last report at {last}");
        assert!(out.iter().all(|v| v.volume > 0.0 && v.volume < 0.25));
        Ok(())
    }

    #[test]
    fn empty_file_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("empty.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        hound::WavWriter::create(&path, spec)?.finalize()?;

        let registry = ProcessorRegistry::with_builtins();
        assert!(meter_file(&registry, VOLUME_PROCESSOR, &MeterConfig::default(), &path).is_err());
        Ok(())
    }
}

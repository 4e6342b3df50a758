use std::sync::Arc;

use vm_core::clock::RenderClock;
use vm_core::config::{MeterParams, SMOOTHING_FACTOR, UPDATE_INTERVAL};
use vm_core::message::VolumeMessage;
use vm_core::traits::AudioProcessor;

use crate::port::MessagePort;
use crate::registry::NodeOptions;
use crate::smoothing::LevelSmoother;

/// Name the level meter is registered under. Host-side code looks it up by
/// this string, so it must not change.
pub const VOLUME_PROCESSOR: &str = "volume-processor";

/// Root-mean-square of a block, accumulated in f64.
///
/// An empty block is silence and yields 0.
///
/// # Example
/// ```
/// use vm_audio::meter::block_rms;
/// assert!((block_rms(&[1.0; 128]) - 1.0).abs() < f64::EPSILON);
/// assert!(block_rms(&[]).abs() < f64::EPSILON);
/// ```
#[inline(always)]
#[must_use]
pub fn block_rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples
        .iter()
        .map(|&s| {
            let s = f64::from(s);
            s * s
        })
        .sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// Level meter node.
///
/// Reads the first channel of the first input, smooths its RMS, and posts
/// `{ volume }` at most once per `update_interval` of render time. Never
/// allocates, locks, or blocks inside `process`, and never retires itself.
///
/// The first callback always reports; after that the rate gate applies
/// between consecutive reports.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use vm_audio::meter::LevelMeter;
/// use vm_audio::port::message_channel;
/// use vm_core::clock::RenderClock;
/// use vm_core::config::{MeterParams, SMOOTHING_FACTOR, UPDATE_INTERVAL};
/// use vm_core::traits::AudioProcessor;
///
/// let clock = Arc::new(RenderClock::new(48000));
/// let (port, mut rx) = message_channel(16);
/// let mut meter = LevelMeter::new(Arc::clone(&clock), port, MeterParams::default());
///
/// let block = [1.0f32; 128];
/// assert!(meter.process(&[&[&block]]));
/// let msg = rx.try_recv().unwrap();
/// assert!((msg.volume - 0.2).abs() < 1e-12);
/// ```
pub struct LevelMeter {
    clock: Arc<RenderClock>,
    port: MessagePort<VolumeMessage>,
    update_interval: f64,
    /// Render time of the last report, or of construction before the first one.
    last_report_time: f64,
    has_reported: bool,
    smoother: LevelSmoother,
}

impl LevelMeter {
    /// Build a meter reading `clock` and posting to `port`.
    ///
    /// Non-finite tuning values fall back to the defaults; a negative
    /// interval is treated as 0 (report on every callback).
    #[must_use]
    pub fn new(
        clock: Arc<RenderClock>,
        port: MessagePort<VolumeMessage>,
        params: MeterParams,
    ) -> Self {
        let update_interval = if params.update_interval.is_finite() {
            params.update_interval.max(0.0)
        } else {
            UPDATE_INTERVAL
        };
        let smoothing = if params.smoothing.is_finite() {
            params.smoothing
        } else {
            SMOOTHING_FACTOR
        };
        let last_report_time = clock.current_time();
        Self {
            clock,
            port,
            update_interval,
            last_report_time,
            has_reported: false,
            smoother: LevelSmoother::new(smoothing),
        }
    }

    /// Registry constructor.
    #[must_use]
    pub fn create(options: NodeOptions) -> Box<dyn AudioProcessor> {
        Box::new(Self::new(options.clock, options.port, options.params))
    }

    /// Current smoothed level.
    #[must_use]
    pub fn level(&self) -> f64 {
        self.smoother.value()
    }

    /// Render time of the last report.
    #[must_use]
    pub fn last_report_time(&self) -> f64 {
        self.last_report_time
    }
}

impl AudioProcessor for LevelMeter {
    fn process(&mut self, inputs: &[&[&[f32]]]) -> bool {
        let now = self.clock.current_time();
        if self.has_reported && now - self.last_report_time < self.update_interval {
            return true;
        }
        self.last_report_time = self.last_report_time.max(now);
        self.has_reported = true;

        let rms = inputs
            .first()
            .and_then(|channels| channels.first())
            .map_or(0.0, |samples| block_rms(samples));

        let volume = self.smoother.smooth(rms);
        self.port.post_message(VolumeMessage { volume });
        true
    }

    fn name(&self) -> &'static str {
        VOLUME_PROCESSOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{MessageReceiver, message_channel};

    const RATE: u32 = 48000;

    fn meter_at(start: f64) -> (Arc<RenderClock>, LevelMeter, MessageReceiver<VolumeMessage>) {
        let clock = Arc::new(RenderClock::new(RATE));
        clock.set_time(start);
        let (port, rx) = message_channel(1024);
        let meter = LevelMeter::new(Arc::clone(&clock), port, MeterParams::default());
        (clock, meter, rx)
    }

    fn feed(
        clock: &RenderClock,
        meter: &mut LevelMeter,
        rx: &mut MessageReceiver<VolumeMessage>,
        time: f64,
        block: &[f32],
    ) -> Option<f64> {
        clock.set_time(time);
        assert!(meter.process(&[&[block]]));
        rx.try_recv().map(|m| m.volume)
    }

    #[test]
    fn rms_is_zero_only_for_silence() {
        assert!(block_rms(&[0.0; 64]).abs() < f64::EPSILON);
        let mut block = [0.0f32; 64];
        block[17] = 1e-20;
        assert!(block_rms(&block) > 0.0);
        block[17] = -0.5;
        assert!(block_rms(&block) > 0.0);
    }

    #[test]
    fn rms_of_constant_block_is_its_magnitude() {
        assert!((block_rms(&[-0.5; 256]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn full_scale_scenario() {
        let (clock, mut meter, mut rx) = meter_at(0.0);
        let ones = [1.0f32; 128];

        let v0 = feed(&clock, &mut meter, &mut rx, 0.0, &ones).unwrap_or(f64::NAN);
        let v1 = feed(&clock, &mut meter, &mut rx, 0.02, &ones).unwrap_or(f64::NAN);
        let v2 = feed(&clock, &mut meter, &mut rx, 0.04, &ones).unwrap_or(f64::NAN);
        assert!((v0 - 0.2).abs() < 1e-12, "got {v0}");
        assert!((v1 - 0.36).abs() < 1e-12, "got {v1}");
        assert!((v2 - 0.488).abs() < 1e-12, "got {v2}");

        let v3 = feed(&clock, &mut meter, &mut rx, 0.06, &[0.0; 128]).unwrap_or(f64::NAN);
        assert!((v3 - 0.3904).abs() < 1e-12, "got {v3}");
        assert!(v3 > 0.0);
    }

    #[test]
    fn gate_suppresses_fast_callbacks() {
        let (clock, mut meter, mut rx) = meter_at(0.0);
        let ones = [1.0f32; 128];
        assert!(feed(&clock, &mut meter, &mut rx, 0.0, &ones).is_some());
        assert!(feed(&clock, &mut meter, &mut rx, 0.01, &ones).is_none());
        assert!(feed(&clock, &mut meter, &mut rx, 0.016, &ones).is_none());
        assert!(feed(&clock, &mut meter, &mut rx, 0.017, &ones).is_some());
        // Gated callbacks leave the level untouched.
        assert!((meter.level() - 0.36).abs() < 1e-12);
    }

    #[test]
    fn at_most_sixty_reports_per_second() {
        let (clock, mut meter, mut rx) = meter_at(0.0);
        let block = [0.25f32; 1];
        let mut count = 0;
        for frame in 0..u64::from(RATE) {
            clock.set_time(frame as f64 / f64::from(RATE));
            meter.process(&[&[&block]]);
            count += rx.drain().count();
        }
        assert!(count <= 60, "{count} reports in one second");
        assert!(count >= 59, "{count} reports in one second");
    }

    #[test]
    fn quantum_cadence_is_rate_limited() {
        let (clock, mut meter, mut rx) = meter_at(0.0);
        let block = [0.1f32; 128];
        for _ in 0..(RATE / 128) {
            meter.process(&[&[&block]]);
            clock.advance(128);
        }
        let count = rx.drain().count();
        assert!(count > 0);
        assert!(count <= 60, "{count} reports in one second");
    }

    #[test]
    fn converges_monotonically_to_constant_level() {
        let (clock, mut meter, mut rx) = meter_at(0.0);
        let block = [0.5f32; 128];
        let mut prev = 0.0;
        for i in 0..50 {
            let v = feed(&clock, &mut meter, &mut rx, f64::from(i) * 0.02, &block)
                .unwrap_or(f64::NAN);
            assert!(v > prev, "step {i}: {v} <= {prev}");
            assert!(v <= 0.5);
            prev = v;
        }
        assert!((prev - 0.5).abs() < 1e-4);
    }

    #[test]
    fn absent_input_is_silence() {
        let (clock, mut meter, mut rx) = meter_at(0.0);
        feed(&clock, &mut meter, &mut rx, 0.0, &[1.0; 128]);

        let mut prev = meter.level();
        let shapes: [&[&[&[f32]]]; 3] = [&[], &[&[]], &[&[&[]]]];
        for (i, inputs) in shapes.iter().enumerate() {
            clock.set_time(0.02 * (i as f64 + 1.0));
            assert!(meter.process(inputs));
            let v = rx.try_recv().map_or(f64::NAN, |m| m.volume);
            assert!(v < prev && v > 0.0, "shape {i}: {v}");
            assert!((v - prev * 0.8).abs() < 1e-12);
            prev = v;
        }
    }

    #[test]
    fn only_first_channel_counts() {
        let (clock, mut meter, mut rx) = meter_at(0.0);
        let silent = [0.0f32; 128];
        let loud = [1.0f32; 128];
        let first: [&[f32]; 2] = [&silent, &loud];
        let second: [&[f32]; 1] = [&loud];
        let inputs: [&[&[f32]]; 2] = [&first, &second];
        clock.set_time(0.0);
        meter.process(&inputs);
        let v = rx.try_recv().map_or(f64::NAN, |m| m.volume);
        assert!(v.abs() < f64::EPSILON);
    }

    #[test]
    fn identical_inputs_are_bit_reproducible() {
        let run = || {
            let (clock, mut meter, mut rx) = meter_at(0.0);
            let mut out = Vec::new();
            for i in 0..200u32 {
                let block: Vec<f32> = (0..128u32)
                    .map(|j| ((i * 128 + j) as f32 * 0.013).sin() * 0.7)
                    .collect();
                if let Some(v) = feed(&clock, &mut meter, &mut rx, f64::from(i) * 0.005, &block) {
                    out.push(v.to_bits());
                }
            }
            out
        };
        let a = run();
        assert!(!a.is_empty());
        assert_eq!(a, run());
    }

    #[test]
    fn last_report_time_never_moves_back() {
        let (clock, mut meter, mut rx) = meter_at(1.0);
        assert!((meter.last_report_time() - 1.0).abs() < 1e-12);
        feed(&clock, &mut meter, &mut rx, 0.5, &[0.3; 128]);
        assert!((meter.last_report_time() - 1.0).abs() < 1e-12);
        feed(&clock, &mut meter, &mut rx, 2.0, &[0.3; 128]);
        assert!((meter.last_report_time() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn full_port_does_not_stall_the_meter() {
        let clock = Arc::new(RenderClock::new(RATE));
        let (port, mut rx) = message_channel(1);
        let mut meter = LevelMeter::new(Arc::clone(&clock), port, MeterParams::default());
        for i in 0..10 {
            clock.set_time(f64::from(i) * 0.02);
            assert!(meter.process(&[&[&[1.0; 128]]]));
        }
        assert_eq!(rx.drain().count(), 1);
        assert_eq!(rx.dropped(), 9);
        assert!(meter.level() > 0.8);
    }

    #[test]
    fn non_finite_params_keep_the_gate_closed() {
        let clock = Arc::new(RenderClock::new(RATE));
        let (port, mut rx) = message_channel(1024);
        let params = MeterParams {
            update_interval: f64::NAN,
            smoothing: f64::INFINITY,
        };
        let mut meter = LevelMeter::new(Arc::clone(&clock), port, params);
        let block = [1.0f32; 128];
        for _ in 0..(RATE / 128) {
            meter.process(&[&[&block]]);
            clock.advance(128);
        }
        let volumes: Vec<f64> = rx.drain().map(|m| m.volume).collect();
        assert!(volumes.len() <= 60, "{} reports in one second", volumes.len());
        assert!((volumes.first().copied().unwrap_or(f64::NAN) - 0.2).abs() < 1e-12);
        assert!(volumes.iter().all(|v| v.is_finite()));
    }
}

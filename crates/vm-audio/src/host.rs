use std::sync::Arc;

use vm_core::clock::RenderClock;
use vm_core::traits::AudioProcessor;

/// Channels beyond this count are dropped before reaching the node.
pub const MAX_CHANNELS: usize = 32;

/// Découpe un flux entrelacé en blocs de rendu fixes et pilote un nœud.
///
/// Le buffer planaire est pré-alloué à la construction : `push_interleaved`
/// ne fait aucune allocation et peut tourner dans le callback du device.
/// After each block the clock advances by `block_size` frames, so a node
/// reading the clock during `process` sees the start time of its block.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use vm_audio::host::RenderHost;
/// use vm_audio::meter::LevelMeter;
/// use vm_audio::port::message_channel;
/// use vm_core::clock::RenderClock;
///
/// let clock = Arc::new(RenderClock::new(48000));
/// let (port, mut rx) = message_channel(16);
/// let meter = LevelMeter::new(Arc::clone(&clock), port, Default::default());
/// let mut host = RenderHost::new(Box::new(meter), clock, 128, 1);
///
/// host.push_interleaved([0.5f32; 128]);
/// assert_eq!(host.quanta(), 1);
/// assert!(rx.try_recv().is_some());
/// ```
pub struct RenderHost {
    node: Box<dyn AudioProcessor>,
    clock: Arc<RenderClock>,
    /// Planar samples, `channels` runs of `block_size`.
    planar: Vec<f32>,
    block_size: usize,
    /// Channels forwarded to the node.
    channels: usize,
    /// Interleave stride of the incoming stream.
    stride: usize,
    /// Frames written into the current block.
    fill: usize,
    /// Channel of the next incoming sample within its frame.
    cursor: usize,
    quanta: u64,
    active: bool,
}

impl RenderHost {
    /// Host for a stream of `stream_channels` interleaved channels.
    ///
    /// `block_size` and `stream_channels` are raised to at least 1.
    #[must_use]
    pub fn new(
        node: Box<dyn AudioProcessor>,
        clock: Arc<RenderClock>,
        block_size: usize,
        stream_channels: usize,
    ) -> Self {
        let block_size = block_size.max(1);
        let stride = stream_channels.max(1);
        let channels = stride.min(MAX_CHANNELS);
        Self {
            node,
            clock,
            planar: vec![0.0; block_size * channels],
            block_size,
            channels,
            stride,
            fill: 0,
            cursor: 0,
            quanta: 0,
            active: true,
        }
    }

    /// Feed interleaved samples. Every completed block is rendered at once.
    ///
    /// Frames may straddle calls: a partial frame is carried over to the next
    /// call.
    pub fn push_interleaved<I>(&mut self, samples: I)
    where
        I: IntoIterator<Item = f32>,
    {
        for sample in samples {
            if self.cursor < self.channels {
                self.planar[self.cursor * self.block_size + self.fill] = sample;
            }
            self.cursor += 1;
            if self.cursor == self.stride {
                self.cursor = 0;
                self.fill += 1;
                if self.fill == self.block_size {
                    self.render_quantum();
                }
            }
        }
    }

    /// Render a trailing partial block, padded with silence.
    pub fn flush(&mut self) {
        if self.fill == 0 && self.cursor == 0 {
            return;
        }
        if self.cursor != 0 {
            // Incomplete frame: keep what arrived, zero the rest.
            for ch in self.cursor..self.channels {
                self.planar[ch * self.block_size + self.fill] = 0.0;
            }
            self.cursor = 0;
            self.fill += 1;
        }
        for ch in 0..self.channels {
            let start = ch * self.block_size;
            self.planar[start + self.fill..start + self.block_size].fill(0.0);
        }
        self.render_quantum();
    }

    fn render_quantum(&mut self) {
        if self.active {
            let empty: &[f32] = &[];
            let mut refs = [empty; MAX_CHANNELS];
            for (slot, chunk) in refs
                .iter_mut()
                .zip(self.planar.chunks_exact(self.block_size))
            {
                *slot = chunk;
            }
            let input: &[&[f32]] = &refs[..self.channels];
            self.active = self.node.process(&[input]);
        }
        self.clock.advance(self.block_size as u64);
        self.quanta += 1;
        self.fill = 0;
    }

    /// Blocks rendered so far.
    #[must_use]
    pub fn quanta(&self) -> u64 {
        self.quanta
    }

    /// `false` once the node has asked to stop.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Frames per block.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Shared render clock.
    #[must_use]
    pub fn clock(&self) -> &Arc<RenderClock> {
        &self.clock
    }
}

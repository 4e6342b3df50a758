use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rtrb::{Consumer, Producer, RingBuffer};

/// Crée un canal de messages unidirectionnel à capacité fixe.
///
/// Delivery guarantees:
/// - FIFO, single producer to single consumer;
/// - lossless while the listener drains faster than the node posts;
/// - when the ring is full, or the receiver is gone, the newest message is
///   dropped and counted;
/// - no acknowledgement, no retry.
///
/// `capacity` is raised to at least 1.
///
/// # Example
/// ```
/// use vm_audio::port::message_channel;
/// let (mut port, mut rx) = message_channel::<u32>(2);
/// port.post_message(1);
/// port.post_message(2);
/// port.post_message(3);
/// assert_eq!(rx.try_recv(), Some(1));
/// assert_eq!(rx.try_recv(), Some(2));
/// assert_eq!(rx.try_recv(), None);
/// assert_eq!(rx.dropped(), 1);
/// ```
#[must_use]
pub fn message_channel<T>(capacity: usize) -> (MessagePort<T>, MessageReceiver<T>) {
    let (producer, consumer) = RingBuffer::new(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        MessagePort {
            producer,
            dropped: Arc::clone(&dropped),
        },
        MessageReceiver { consumer, dropped },
    )
}

/// Côté émetteur, détenu par le nœud sur le thread audio.
///
/// `post_message` est wait-free : ni verrou, ni allocation.
pub struct MessagePort<T> {
    producer: Producer<T>,
    dropped: Arc<AtomicU64>,
}

impl<T> MessagePort<T> {
    /// Post a message without waiting.
    ///
    /// Returns `false` if the message was dropped.
    #[inline]
    pub fn post_message(&mut self, msg: T) -> bool {
        if self.producer.is_abandoned() || self.producer.push(msg).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }
}

/// Côté écouteur, lu hors du thread audio.
pub struct MessageReceiver<T> {
    consumer: Consumer<T>,
    dropped: Arc<AtomicU64>,
}

impl<T> MessageReceiver<T> {
    /// Pop the oldest pending message, if any.
    pub fn try_recv(&mut self) -> Option<T> {
        self.consumer.pop().ok()
    }

    /// Iterate over every message pending right now.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(move || self.consumer.pop().ok())
    }

    /// Messages dropped by the sender since the channel was created.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

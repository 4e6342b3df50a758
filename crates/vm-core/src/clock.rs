use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Horloge de rendu partagée entre l'hôte audio et ses processeurs.
///
/// L'hôte est le seul écrivain : il avance `frame_pos` après chaque bloc traité.
/// Les processeurs lisent `current_time()` pendant leur callback, qui vaut donc
/// l'instant de début du bloc en cours.
///
/// Tous les champs sont atomiques — zero-alloc, zero-lock, `Send + Sync`.
///
/// # Example
/// ```
/// use vm_core::clock::RenderClock;
/// let clock = RenderClock::new(48000);
/// assert!(clock.current_time().abs() < f64::EPSILON);
/// clock.advance(48000);
/// assert!((clock.current_time() - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug)]
pub struct RenderClock {
    /// Position de rendu en frames depuis le démarrage du flux.
    frame_pos: AtomicU64,
    /// Sample rate du flux, fixé à la construction.
    sample_rate: AtomicU32,
}

impl RenderClock {
    /// Crée une horloge à zéro pour le sample rate donné.
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frame_pos: AtomicU64::new(0),
            sample_rate: AtomicU32::new(sample_rate),
        }
    }

    /// Temps de rendu courant en secondes, `frame_pos / sample_rate`.
    ///
    /// Retourne 0 tant que le sample rate n'est pas connu.
    #[inline]
    #[must_use]
    pub fn current_time(&self) -> f64 {
        let rate = self.sample_rate.load(Ordering::Relaxed);
        if rate == 0 {
            return 0.0;
        }
        self.frame_pos.load(Ordering::Relaxed) as f64 / f64::from(rate)
    }

    /// Position courante en frames.
    #[inline]
    #[must_use]
    pub fn frame_pos(&self) -> u64 {
        self.frame_pos.load(Ordering::Relaxed)
    }

    /// Sample rate courant.
    #[inline]
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    /// Avance l'horloge de `frames` (appelé par l'hôte après chaque bloc).
    #[inline]
    pub fn advance(&self, frames: u64) {
        self.frame_pos.fetch_add(frames, Ordering::Relaxed);
    }

    /// Place l'horloge à `secs` secondes, arrondi à la frame la plus proche.
    ///
    /// Used by simulated hosts that replay a recorded (time, block) sequence.
    /// Negative or non-finite times clamp to 0.
    pub fn set_time(&self, secs: f64) {
        let rate = f64::from(self.sample_rate.load(Ordering::Relaxed));
        let frames = if secs.is_finite() && secs > 0.0 {
            (secs * rate).round() as u64
        } else {
            0
        };
        self.frame_pos.store(frames, Ordering::Relaxed);
    }
}

use std::sync::Mutex;
use std::time::Duration;

/// Source de temps injectable pour le scheduler.
///
/// `SystemClock` en production, `VirtualClock` dans les tests — le pacing
/// et l'annulation se testent sans délais wall-clock réels.
pub trait Clock: Send {
    /// Secondes écoulées depuis une origine arbitraire fixe.
    fn now(&self) -> f64;

    /// Bloque pendant `d` (ou avance le temps virtuel).
    fn sleep(&self, d: Duration);
}

impl<C: Clock + Sync> Clock for std::sync::Arc<C> {
    fn now(&self) -> f64 {
        (**self).now()
    }

    fn sleep(&self, d: Duration) {
        (**self).sleep(d);
    }
}

/// Horloge wall-clock. Origine = création de l'horloge.
///
/// # Example
/// ```
/// use gc_core::clock::{Clock, SystemClock};
/// let clock = SystemClock::new();
/// assert!(clock.now() >= 0.0);
/// ```
pub struct SystemClock {
    origin: std::time::Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// Horloge virtuelle pour les tests : `sleep` avance le temps instantanément.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use gc_core::clock::{Clock, VirtualClock};
/// let clock = VirtualClock::new();
/// clock.sleep(Duration::from_secs(2));
/// assert!((clock.now() - 2.0).abs() < 1e-9);
/// ```
pub struct VirtualClock {
    now: Mutex<f64>,
}

impl VirtualClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Mutex::new(0.0),
        }
    }

    /// Avance manuellement le temps (simule une latence de pipeline).
    pub fn advance(&self, secs: f64) {
        if let Ok(mut now) = self.now.lock() {
            *now += secs;
        }
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> f64 {
        self.now.lock().map_or(0.0, |n| *n)
    }

    fn sleep(&self, d: Duration) {
        self.advance(d.as_secs_f64());
    }
}

/// Horloge de lecture : intervalle cible, origine du run, index courant.
///
/// Mutée uniquement par le scheduler pendant Priming/Streaming.
///
/// # Example
/// ```
/// use gc_core::clock::PlaybackClock;
/// let mut clock = PlaybackClock::new(25.0);
/// clock.prime(1.0);
/// assert!((clock.target_for(25) - 2.0).abs() < 1e-9);
/// ```
pub struct PlaybackClock {
    /// Intervalle cible entre frames (1 / fps source), en secondes.
    interval: f64,
    /// Instant d'origine du run sur l'horloge injectée.
    start: f64,
    /// Index de la prochaine frame à émettre.
    pub frame_index: u64,
}

impl PlaybackClock {
    /// Crée une horloge pour le fps source donné. fps ≤ 0 retombe sur 1.
    #[must_use]
    pub fn new(fps: f64) -> Self {
        let fps = if fps > 0.0 { fps } else { 1.0 };
        Self {
            interval: 1.0 / fps,
            start: 0.0,
            frame_index: 0,
        }
    }

    /// Intervalle cible en secondes.
    #[inline]
    #[must_use]
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Réinitialise l'horloge à l'instant donné (état Priming).
    pub fn prime(&mut self, now: f64) {
        self.start = now;
        self.frame_index = 0;
    }

    /// Instant cible (sur l'horloge injectée) pour la frame `index`.
    #[inline]
    #[must_use]
    pub fn target_for(&self, index: u64) -> f64 {
        self.start + self.interval * index as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_clock_advances_on_sleep() {
        let clock = VirtualClock::new();
        assert!(clock.now().abs() < 1e-12);
        clock.sleep(Duration::from_millis(40));
        clock.advance(0.01);
        assert!((clock.now() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn playback_targets_are_evenly_spaced() {
        let mut pc = PlaybackClock::new(30.0);
        pc.prime(10.0);
        let d01 = pc.target_for(1) - pc.target_for(0);
        let d12 = pc.target_for(2) - pc.target_for(1);
        assert!((d01 - 1.0 / 30.0).abs() < 1e-9);
        assert!((d01 - d12).abs() < 1e-9);
        assert!((pc.target_for(0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn zero_fps_does_not_divide_by_zero() {
        let pc = PlaybackClock::new(0.0);
        assert!((pc.interval() - 1.0).abs() < 1e-9);
    }
}

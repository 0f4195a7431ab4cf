use std::sync::atomic::{AtomicU64, Ordering};

/// A double-precision float held in a 64-bit atomic.
///
/// The value is bit-packed into an [`AtomicU64`]. Stores use `Release`
/// ordering and loads use `Acquire`, so a value written on the audio thread
/// is fully visible to the main thread (and vice versa) as soon as the load
/// observes the store.
#[derive(Debug, Default)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    #[inline]
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    #[inline]
    pub fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release)
    }

    /// Stores `value` and returns the previous value.
    #[inline]
    pub fn swap(&self, value: f64) -> f64 {
        f64::from_bits(self.bits.swap(value.to_bits(), Ordering::AcqRel))
    }
}

impl From<f64> for AtomicF64 {
    #[inline]
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn round_trips_exact_bit_patterns() {
        let atomic = AtomicF64::new(0.0);
        for value in [0.0, -0.0, 1.5, f64::MIN_POSITIVE, f64::INFINITY, -3.25] {
            atomic.store(value);
            assert_eq!(atomic.load().to_bits(), value.to_bits());
        }
    }

    #[test]
    fn swap_returns_previous() {
        let atomic = AtomicF64::new(1.0);
        assert_eq!(atomic.swap(2.0), 1.0);
        assert_eq!(atomic.load(), 2.0);
    }

    #[test]
    fn stores_are_visible_across_threads() {
        let atomic = Arc::new(AtomicF64::new(0.0));
        let writer = Arc::clone(&atomic);

        let handle = std::thread::spawn(move || writer.store(440.0));
        handle.join().unwrap();

        assert_eq!(atomic.load(), 440.0);
    }
}

//! Typed constructors for common parameter shapes.
//!
//! Binders produce ready-to-register [`ParamInfo`] descriptors with the
//! right range, flags and display format, so plugin glue never hand-rolls
//! flag combinations. The logarithmic frequency helpers also expose the
//! normalized mapping itself for DSP code that wants to drive it directly.

use crate::format::db_to_amplitude;
use crate::{ParamFlags, ParamFormat, ParamId, ParamInfo};

/// A 0–100 percentage parameter.
pub fn percentage(id: impl Into<ParamId>, name: impl Into<String>, default: f64) -> ParamInfo {
    ParamInfo::new(id, name, 0.0, 100.0, default).with_format(ParamFormat::Percentage)
}

/// A gain parameter with a decibel range, stored as linear amplitude.
pub fn decibel(
    id: impl Into<ParamId>,
    name: impl Into<String>,
    min_db: f64,
    max_db: f64,
    default_db: f64,
) -> ParamInfo {
    ParamInfo::new(
        id,
        name,
        db_to_amplitude(min_db),
        db_to_amplitude(max_db),
        db_to_amplitude(default_db),
    )
    .with_flags(ParamFlags::default() | ParamFlags::MODULATABLE)
    .with_format(ParamFormat::Decibels)
}

/// A linearly mapped frequency parameter.
pub fn hertz(
    id: impl Into<ParamId>,
    name: impl Into<String>,
    min: f64,
    max: f64,
    default: f64,
) -> ParamInfo {
    ParamInfo::new(id, name, min, max, default).with_format(ParamFormat::Hertz)
}

/// A logarithmically mapped frequency parameter.
///
/// The stored value is the plain frequency in Hertz; [`LogMap`] carries the
/// normalized-to-frequency mapping so half of the `[0, 1]` control range
/// covers the bass region.
pub fn hertz_log(
    id: impl Into<ParamId>,
    name: impl Into<String>,
    f_lo: f64,
    f_hi: f64,
    default: f64,
) -> ParamInfo {
    ParamInfo::new(id, name, f_lo, f_hi, default)
        .with_flags(ParamFlags::default() | ParamFlags::MODULATABLE)
        .with_format(ParamFormat::Hertz)
}

/// A filter cutoff over the audible range.
pub fn cutoff(id: impl Into<ParamId>, name: impl Into<String>) -> ParamInfo {
    hertz_log(id, name, 20.0, 20_000.0, 1_000.0)
}

/// An envelope time segment in milliseconds (1 ms to 10 s).
pub fn adsr_time(id: impl Into<ParamId>, name: impl Into<String>, default_ms: f64) -> ParamInfo {
    ParamInfo::new(id, name, 1.0, 10_000.0, default_ms).with_format(ParamFormat::Milliseconds)
}

/// A labeled choice parameter (stepped enum).
pub fn choice(
    id: impl Into<ParamId>,
    name: impl Into<String>,
    labels: &[&str],
    default_index: usize,
) -> ParamInfo {
    #[allow(clippy::cast_precision_loss)]
    let max = labels.len().saturating_sub(1) as f64;
    #[allow(clippy::cast_precision_loss)]
    let default = (default_index as f64).min(max);

    ParamInfo::new(id, name, 0.0, max, default)
        .with_flags(ParamFlags::AUTOMATABLE | ParamFlags::ENUM | ParamFlags::BOUNDED)
        .with_format(ParamFormat::Choice(
            labels.iter().map(|s| s.to_string()).collect(),
        ))
}

/// The canonical bypass toggle.
pub fn bypass(id: impl Into<ParamId>) -> ParamInfo {
    ParamInfo::new(id, "Bypass", 0.0, 1.0, 0.0).with_flags(
        ParamFlags::AUTOMATABLE | ParamFlags::STEPPED | ParamFlags::BYPASS | ParamFlags::BOUNDED,
    )
}

/// The exponential mapping used by [`hertz_log`] parameters.
///
/// `denormalize` maps `x ∈ [0, 1]` to `lo * (hi/lo)^x`; `normalize` is its
/// inverse.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LogMap {
    pub lo: f64,
    pub hi: f64,
}

impl LogMap {
    #[inline]
    pub fn new(lo: f64, hi: f64) -> Self {
        debug_assert!(lo > 0.0 && hi > lo);
        Self { lo, hi }
    }

    /// Maps a normalized `[0, 1]` control value to a frequency.
    #[inline]
    pub fn denormalize(&self, x: f64) -> f64 {
        self.lo * (self.hi / self.lo).powf(x.clamp(0.0, 1.0))
    }

    /// Maps a frequency back to the normalized `[0, 1]` control range.
    #[inline]
    pub fn normalize(&self, freq: f64) -> f64 {
        let freq = freq.clamp(self.lo, self.hi);
        (freq / self.lo).ln() / (self.hi / self.lo).ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_map_covers_bass_in_the_lower_half() {
        let map = LogMap::new(20.0, 20_000.0);

        assert!((map.denormalize(0.0) - 20.0).abs() < 1e-9);
        assert!((map.denormalize(1.0) - 20_000.0).abs() < 1e-6);

        // Geometric midpoint: sqrt(20 * 20000) ~= 632 Hz, still "bass-ish"
        // rather than the linear midpoint of ~10 kHz.
        let mid = map.denormalize(0.5);
        assert!((mid - 632.45).abs() < 1.0);
    }

    #[test]
    fn log_map_round_trips() {
        let map = LogMap::new(20.0, 20_000.0);
        for freq in [20.0, 55.0, 440.0, 2_500.0, 20_000.0] {
            let x = map.normalize(freq);
            assert!((map.denormalize(x) - freq).abs() < 1e-6);
        }
    }

    #[test]
    fn decibel_binder_stores_linear_amplitude() {
        let info = decibel(1u32, "Gain", -60.0, 12.0, 0.0);
        assert!((info.default - 1.0).abs() < 1e-12);
        assert!(info.min < info.default && info.default < info.max);
    }

    #[test]
    fn choice_binder_is_a_stepped_enum() {
        let info = choice(2u32, "Mode", &["A", "B", "C"], 1);
        assert_eq!(info.max, 2.0);
        assert_eq!(info.default, 1.0);
        assert!(info.is_stepped());
    }

    #[test]
    fn bypass_binder_is_flagged_as_bypass() {
        let info = bypass(3u32);
        assert!(info.flags.contains(ParamFlags::BYPASS));
        assert_eq!((info.min, info.max), (0.0, 1.0));
    }
}

use bitflags::bitflags;
use clap_sys::ext::params::{
    clap_param_info_flags, CLAP_PARAM_IS_AUTOMATABLE, CLAP_PARAM_IS_BYPASS, CLAP_PARAM_IS_ENUM,
    CLAP_PARAM_IS_HIDDEN, CLAP_PARAM_IS_MODULATABLE, CLAP_PARAM_IS_PERIODIC,
    CLAP_PARAM_IS_READONLY, CLAP_PARAM_IS_STEPPED, CLAP_PARAM_REQUIRES_PROCESS,
};
use std::fmt;

/// A stable parameter identifier.
///
/// Ids are chosen by the plugin, survive save/load, and never change for the
/// lifetime of an instance.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ParamId(u32);

impl ParamId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ParamId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Debug for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParamId({})", self.0)
    }
}

bitflags! {
    /// Behavioral flags of a parameter.
    ///
    /// These are the registry's own bits; [`ParamFlags::to_clap`] maps them
    /// onto the `CLAP_PARAM_*` info flags. `BOUNDED` has no CLAP equivalent,
    /// it only switches hard clamping on in the registry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ParamFlags: u32 {
        const AUTOMATABLE = 1 << 0;
        const MODULATABLE = 1 << 1;
        const STEPPED = 1 << 2;
        const PERIODIC = 1 << 3;
        const BYPASS = 1 << 4;
        const READ_ONLY = 1 << 5;
        const ENUM = 1 << 6;
        const HIDDEN = 1 << 7;
        const BOUNDED = 1 << 8;
        const REQUIRES_PROCESS = 1 << 9;
    }
}

impl ParamFlags {
    /// Maps these flags to the raw CLAP parameter info flags.
    pub fn to_clap(self) -> clap_param_info_flags {
        let mut raw = 0;
        for (ours, theirs) in [
            (Self::AUTOMATABLE, CLAP_PARAM_IS_AUTOMATABLE),
            (Self::MODULATABLE, CLAP_PARAM_IS_MODULATABLE),
            (Self::STEPPED, CLAP_PARAM_IS_STEPPED),
            (Self::PERIODIC, CLAP_PARAM_IS_PERIODIC),
            (Self::BYPASS, CLAP_PARAM_IS_BYPASS),
            (Self::READ_ONLY, CLAP_PARAM_IS_READONLY),
            (Self::ENUM, CLAP_PARAM_IS_ENUM | CLAP_PARAM_IS_STEPPED),
            (Self::HIDDEN, CLAP_PARAM_IS_HIDDEN),
            (Self::REQUIRES_PROCESS, CLAP_PARAM_REQUIRES_PROCESS),
        ] {
            if self.contains(ours) {
                raw |= theirs;
            }
        }
        raw
    }

    /// Parses one manifest flag name. Unknown names yield `None` and are
    /// tolerated by the caller for forward compatibility.
    pub fn from_flag_name(name: &str) -> Option<Self> {
        Some(match name {
            "automatable" => Self::AUTOMATABLE,
            "modulatable" => Self::MODULATABLE,
            "stepped" => Self::STEPPED,
            "periodic" => Self::PERIODIC,
            "bypass" => Self::BYPASS,
            "readonly" => Self::READ_ONLY,
            "enum" => Self::ENUM,
            "hidden" => Self::HIDDEN,
            "bounded" => Self::BOUNDED,
            "requires-process" => Self::REQUIRES_PROCESS,
            _ => return None,
        })
    }

    /// Parses a list of manifest flag names, skipping unknown ones.
    pub fn from_names<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Self {
        names
            .into_iter()
            .filter_map(|name| Self::from_flag_name(name.as_ref()))
            .fold(Self::empty(), |acc, flag| acc | flag)
    }
}

impl Default for ParamFlags {
    #[inline]
    fn default() -> Self {
        Self::AUTOMATABLE | Self::BOUNDED
    }
}

/// How a parameter's value is rendered as text.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParamFormat {
    /// Plain `%.3f`.
    #[default]
    Generic,
    /// The value is a linear amplitude, displayed in decibels. Zero amplitude
    /// renders as `-inf dB`.
    Decibels,
    /// Frequency in Hertz, displayed with Hz/kHz units.
    Hertz,
    /// 0 to 100, one decimal.
    Percentage,
    /// Time in milliseconds, switching to seconds above one second.
    Milliseconds,
    /// Musical time in beats.
    Beats,
    /// An index into a fixed list of labels.
    Choice(Vec<String>),
}

/// A parameter descriptor.
///
/// Once registered, the id and bounds are immutable for the instance's
/// lifetime.
#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub id: ParamId,
    pub name: String,
    /// Slash-separated module path grouping the parameter in host UIs.
    pub module: String,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub flags: ParamFlags,
    pub format: ParamFormat,
}

impl ParamInfo {
    /// Creates a descriptor, normalizing its invariants: `min <= max` is
    /// required, the default is clamped into range, and stepped parameters
    /// round their default to the nearest step.
    pub fn new(id: impl Into<ParamId>, name: impl Into<String>, min: f64, max: f64, default: f64) -> Self {
        debug_assert!(min <= max, "parameter bounds are inverted");
        let mut info = Self {
            id: id.into(),
            name: name.into(),
            module: String::new(),
            min,
            max,
            default: default.clamp(min, max),
            flags: ParamFlags::default(),
            format: ParamFormat::Generic,
        };
        info.default = info.snap(info.default);
        info
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn with_flags(mut self, flags: ParamFlags) -> Self {
        self.flags = flags;
        self.default = self.snap(self.default);
        self
    }

    pub fn with_format(mut self, format: ParamFormat) -> Self {
        self.format = format;
        self
    }

    #[inline]
    pub fn is_stepped(&self) -> bool {
        self.flags
            .intersects(ParamFlags::STEPPED | ParamFlags::ENUM)
    }

    /// Clamps a value into the declared range and rounds it onto the step
    /// grid for stepped and enum parameters.
    #[inline]
    pub fn snap(&self, value: f64) -> f64 {
        let value = value.clamp(self.min, self.max);
        if self.is_stepped() {
            value.round().clamp(self.min, self.max)
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_clamped_and_snapped() {
        let info = ParamInfo::new(1u32, "Mode", 0.0, 3.0, 9.0).with_flags(ParamFlags::STEPPED);
        assert_eq!(info.default, 3.0);

        let info = ParamInfo::new(2u32, "Mode", 0.0, 3.0, 1.4).with_flags(ParamFlags::STEPPED);
        assert_eq!(info.default, 1.0);
    }

    #[test]
    fn enum_implies_stepped_in_clap_flags() {
        let raw = ParamFlags::ENUM.to_clap();
        assert_ne!(raw & CLAP_PARAM_IS_ENUM, 0);
        assert_ne!(raw & CLAP_PARAM_IS_STEPPED, 0);
    }

    #[test]
    fn manifest_flag_names_parse() {
        let flags = ParamFlags::from_names(["automatable", "stepped", "no-such-flag"]);
        assert_eq!(flags, ParamFlags::AUTOMATABLE | ParamFlags::STEPPED);
    }
}

//! Format-aware parameter text conversion.
//!
//! Each [`ParamFormat`] has one canonical display shape and a tolerant
//! parser: trailing units, surrounding whitespace and case differences are
//! accepted on the way back in. Parsed values are snapped through
//! [`ParamInfo::snap`], so out-of-range text clamps instead of failing.

use crate::{ParamFormat, ParamInfo};
use std::fmt;

/// Converts a decibel value to its linear amplitude.
#[inline]
pub fn db_to_amplitude(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Converts a linear amplitude to decibels. Zero maps to `-inf`.
#[inline]
pub fn amplitude_to_db(amplitude: f64) -> f64 {
    20.0 * amplitude.log10()
}

/// Formats `value` according to the parameter's format into `out`.
///
/// This is the allocation-free path the FFI layer uses to fill host-provided
/// display buffers.
pub fn write_value(info: &ParamInfo, value: f64, out: &mut impl fmt::Write) -> fmt::Result {
    let value = info.snap(value);

    match &info.format {
        ParamFormat::Generic => {
            if info.is_stepped() {
                write!(out, "{value:.0}")
            } else {
                write!(out, "{value:.3}")
            }
        }
        ParamFormat::Decibels => {
            if value <= 0.0 {
                out.write_str("-inf dB")
            } else {
                write!(out, "{:+.1} dB", amplitude_to_db(value))
            }
        }
        ParamFormat::Hertz => {
            if value >= 1000.0 {
                write!(out, "{:.2} kHz", value / 1000.0)
            } else {
                write!(out, "{value:.2} Hz")
            }
        }
        ParamFormat::Percentage => write!(out, "{value:.1} %"),
        ParamFormat::Milliseconds => {
            if value >= 1000.0 {
                write!(out, "{:.2} s", value / 1000.0)
            } else {
                write!(out, "{value:.1} ms")
            }
        }
        ParamFormat::Beats => write!(out, "{value:.2} beats"),
        ParamFormat::Choice(labels) => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = (value.max(0.0) as usize).min(labels.len().saturating_sub(1));
            match labels.get(index) {
                Some(label) => out.write_str(label),
                None => write!(out, "{value:.0}"),
            }
        }
    }
}

/// Formats `value` into a freshly allocated string.
pub fn value_to_text(info: &ParamInfo, value: f64) -> String {
    let mut text = String::new();
    // Writing to a String cannot fail.
    let _ = write_value(info, value, &mut text);
    text
}

/// Parses display text back into a parameter value.
///
/// Returns `None` if no number can be extracted; otherwise the value is
/// clamped and snapped into the parameter's range.
pub fn text_to_value(info: &ParamInfo, text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let value = match &info.format {
        ParamFormat::Generic => parse_number(text)?.0,
        ParamFormat::Decibels => {
            let body = strip_suffix_ci(text, "db");
            if matches!(body.to_ascii_lowercase().as_str(), "-inf" | "-infinity" | "-∞") {
                0.0
            } else {
                db_to_amplitude(parse_number(body)?.0)
            }
        }
        ParamFormat::Hertz => {
            let (number, unit) = parse_number(text)?;
            match unit.to_ascii_lowercase().as_str() {
                "" | "hz" => number,
                "khz" => number * 1000.0,
                _ => return None,
            }
        }
        ParamFormat::Percentage => {
            let (number, unit) = parse_number(text)?;
            match unit {
                "" | "%" => number,
                _ => return None,
            }
        }
        ParamFormat::Milliseconds => {
            let (number, unit) = parse_number(text)?;
            match unit.to_ascii_lowercase().as_str() {
                "" | "ms" => number,
                "s" | "sec" | "secs" | "seconds" => number * 1000.0,
                _ => return None,
            }
        }
        ParamFormat::Beats => {
            let (number, unit) = parse_number(text)?;
            match unit.to_ascii_lowercase().as_str() {
                "" | "beat" | "beats" => number,
                _ => return None,
            }
        }
        ParamFormat::Choice(labels) => {
            let index = labels
                .iter()
                .position(|label| label.eq_ignore_ascii_case(text));
            match index {
                #[allow(clippy::cast_precision_loss)]
                Some(index) => index as f64,
                None => parse_number(text)?.0,
            }
        }
    };

    Some(info.snap(value))
}

/// Splits leading numeric text from a trailing unit and parses the number.
fn parse_number(text: &str) -> Option<(f64, &str)> {
    let text = text.trim();
    let bytes = text.as_bytes();
    let mut end = 0;

    while end < bytes.len() {
        let b = bytes[end];
        let is_numeric = b.is_ascii_digit() || b == b'.' || ((b == b'+' || b == b'-') && end == 0);
        let is_exponent = (b == b'e' || b == b'E')
            && end > 0
            && bytes[end - 1].is_ascii_digit()
            && bytes
                .get(end + 1)
                .is_some_and(|&n| n.is_ascii_digit() || n == b'+' || n == b'-');
        let is_exponent_sign = (b == b'+' || b == b'-')
            && end > 0
            && (bytes[end - 1] == b'e' || bytes[end - 1] == b'E');

        if !(is_numeric || is_exponent || is_exponent_sign) {
            break;
        }
        end += 1;
    }

    let number: f64 = text[..end].parse().ok()?;
    Some((number, text[end..].trim()))
}

fn strip_suffix_ci<'a>(text: &'a str, suffix: &str) -> &'a str {
    let lower = text.to_ascii_lowercase();
    if lower.ends_with(suffix) {
        text[..text.len() - suffix.len()].trim_end()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{binder, ParamFlags, ParamFormat, ParamInfo};

    fn hertz() -> ParamInfo {
        ParamInfo::new(7u32, "Cutoff", 20.0, 20_000.0, 440.0).with_format(ParamFormat::Hertz)
    }

    #[test]
    fn hertz_displays_humanized_units() {
        assert_eq!(value_to_text(&hertz(), 440.0), "440.00 Hz");
        assert_eq!(value_to_text(&hertz(), 1500.0), "1.50 kHz");
    }

    #[test]
    fn hertz_parses_kilohertz() {
        let value = text_to_value(&hertz(), "1 kHz").unwrap();
        assert!((value - 1000.0).abs() <= 1.0);

        let value = text_to_value(&hertz(), "  250 hz ").unwrap();
        assert_eq!(value, 250.0);
    }

    #[test]
    fn decibel_text_round_trips_within_a_tenth() {
        let info = binder::decibel(3u32, "Gain", -60.0, 12.0, 0.0);

        for db in [-59.0, -12.5, -3.0, 0.0, 6.0, 11.9] {
            let amplitude = db_to_amplitude(db);
            let text = value_to_text(&info, amplitude);
            let parsed = text_to_value(&info, &text).unwrap();
            let parsed_db = amplitude_to_db(parsed);
            assert!(
                (parsed_db - db).abs() <= 0.1,
                "{db} dB -> {text:?} -> {parsed_db} dB"
            );
        }
    }

    #[test]
    fn zero_amplitude_is_negative_infinity() {
        let info = ParamInfo::new(1u32, "Gain", 0.0, 2.0, 1.0).with_format(ParamFormat::Decibels);
        assert_eq!(value_to_text(&info, 0.0), "-inf dB");
        assert_eq!(text_to_value(&info, "-inf dB"), Some(0.0));
    }

    #[test]
    fn percentage_has_one_decimal() {
        let info = binder::percentage(2u32, "Mix", 50.0);
        assert_eq!(value_to_text(&info, 57.25), "57.2 %");
        assert_eq!(text_to_value(&info, "30 %"), Some(30.0));
        assert_eq!(text_to_value(&info, "130"), Some(100.0)); // clamped
    }

    #[test]
    fn milliseconds_switch_to_seconds() {
        let info =
            ParamInfo::new(4u32, "Attack", 1.0, 10_000.0, 10.0).with_format(ParamFormat::Milliseconds);
        assert_eq!(value_to_text(&info, 12.5), "12.5 ms");
        assert_eq!(value_to_text(&info, 2500.0), "2.50 s");
        assert_eq!(text_to_value(&info, "1.5 s"), Some(1500.0));
    }

    #[test]
    fn choice_maps_labels_both_ways() {
        let info = binder::choice(5u32, "Mode", &["Clean", "Crunch", "Lead"], 0);
        assert_eq!(value_to_text(&info, 1.2), "Crunch");
        assert_eq!(text_to_value(&info, "lead"), Some(2.0));
        assert_eq!(text_to_value(&info, "1"), Some(1.0));
        assert_eq!(text_to_value(&info, "Fuzz"), None);
    }

    #[test]
    fn stepped_generic_rounds_before_formatting() {
        let info =
            ParamInfo::new(6u32, "Voices", 1.0, 16.0, 8.0).with_flags(ParamFlags::STEPPED);
        assert_eq!(value_to_text(&info, 7.6), "8");
        assert_eq!(text_to_value(&info, "3.4"), Some(3.0));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(text_to_value(&hertz(), "loud"), None);
        assert_eq!(text_to_value(&hertz(), ""), None);
    }
}

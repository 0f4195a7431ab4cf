//! MIDI 1.0 translation helpers.
//!
//! Plugins that prefer the CLAP-native event dialect can run incoming MIDI
//! through these helpers to turn channel messages into parameter events.

use super::event::{MidiEvent, ParamModEvent, ParamValueEvent};

const STATUS_MASK: u8 = 0xF0;
const STATUS_NOTE_OFF: u8 = 0x80;
const STATUS_NOTE_ON: u8 = 0x90;
const STATUS_CONTROL_CHANGE: u8 = 0xB0;
const STATUS_PITCH_BEND: u8 = 0xE0;

const PITCH_BEND_CENTER: i32 = 0x2000;

/// Decodes a pitch-bend message into a bipolar amount in `[-1, 1]`.
///
/// The 14-bit value `0x2000` is the center and maps to `0.0`.
pub fn pitch_bend_amount(data: [u8; 3]) -> Option<f64> {
    if data[0] & STATUS_MASK != STATUS_PITCH_BEND {
        return None;
    }

    let value = i32::from(data[2] & 0x7F) << 7 | i32::from(data[1] & 0x7F);
    Some(f64::from(value - PITCH_BEND_CENTER) / f64::from(PITCH_BEND_CENTER))
}

/// Decodes a control change into `(controller, normalized value in [0, 1])`.
pub fn control_change(data: [u8; 3]) -> Option<(u8, f64)> {
    if data[0] & STATUS_MASK != STATUS_CONTROL_CHANGE {
        return None;
    }
    Some((data[1] & 0x7F, f64::from(data[2] & 0x7F) / 127.0))
}

/// `(channel, key, velocity in [0, 1])` of a note-on, treating velocity 0 as
/// the running-status note-off convention.
pub fn note_on(data: [u8; 3]) -> Option<(u8, u8, f64)> {
    if data[0] & STATUS_MASK != STATUS_NOTE_ON || data[2] == 0 {
        return None;
    }
    Some((data[0] & 0x0F, data[1] & 0x7F, f64::from(data[2] & 0x7F) / 127.0))
}

/// `(channel, key, velocity in [0, 1])` of a note-off (including note-on
/// with velocity 0).
pub fn note_off(data: [u8; 3]) -> Option<(u8, u8, f64)> {
    let status = data[0] & STATUS_MASK;
    if status == STATUS_NOTE_OFF {
        return Some((data[0] & 0x0F, data[1] & 0x7F, f64::from(data[2] & 0x7F) / 127.0));
    }
    if status == STATUS_NOTE_ON && data[2] == 0 {
        return Some((data[0] & 0x0F, data[1] & 0x7F, 0.0));
    }
    None
}

/// Translates a pitch-bend message into a modulation event on `param_id`.
pub fn param_mod_from_pitch_bend(event: &MidiEvent, param_id: u32) -> Option<ParamModEvent> {
    let amount = pitch_bend_amount(event.data())?;
    Some(ParamModEvent::new(event.time(), param_id, amount))
}

/// Translates a control change into a value event on `param_id`, mapping
/// the controller's `[0, 1]` range onto `[min, max]`.
pub fn param_value_from_cc(
    event: &MidiEvent,
    param_id: u32,
    min: f64,
    max: f64,
) -> Option<ParamValueEvent> {
    let (_, normalized) = control_change(event.data())?;
    Some(ParamValueEvent::new(
        event.time(),
        param_id,
        min + normalized * (max - min),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_bend_center_is_zero() {
        let amount = pitch_bend_amount([0xE0, 0x00, 0x40]).unwrap();
        assert!(amount.abs() <= 1.0 / 8192.0);
    }

    #[test]
    fn pitch_bend_three_quarters_is_half() {
        let amount = pitch_bend_amount([0xE0, 0x00, 0x60]).unwrap();
        assert!((amount - 0.5).abs() <= 1.0 / 8192.0);
    }

    #[test]
    fn pitch_bend_extremes() {
        assert_eq!(pitch_bend_amount([0xE3, 0x00, 0x00]), Some(-1.0));
        let max = pitch_bend_amount([0xE0, 0x7F, 0x7F]).unwrap();
        assert!(max > 0.999 && max <= 1.0);
    }

    #[test]
    fn non_bend_messages_are_rejected() {
        assert_eq!(pitch_bend_amount([0x90, 60, 100]), None);
    }

    #[test]
    fn note_on_zero_velocity_is_a_note_off() {
        assert_eq!(note_on([0x90, 60, 0]), None);
        assert_eq!(note_off([0x90, 60, 0]), Some((0, 60, 0.0)));
        let (channel, key, velocity) = note_on([0x93, 60, 127]).unwrap();
        assert_eq!((channel, key), (3, 60));
        assert!((velocity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn translation_produces_a_mod_event() {
        let midi = MidiEvent::new(42, 0, [0xE0, 0x00, 0x60]);
        let event = param_mod_from_pitch_bend(&midi, 7).unwrap();
        assert_eq!(event.time(), 42);
        assert_eq!(event.param_id(), 7);
        assert!((event.amount() - 0.5).abs() <= 1.0 / 8192.0);
    }

    #[test]
    fn cc_maps_onto_the_parameter_range() {
        let midi = MidiEvent::new(0, 0, [0xB0, 74, 127]);
        let event = param_value_from_cc(&midi, 9, 20.0, 20_000.0).unwrap();
        assert_eq!(event.value(), 20_000.0);
    }
}

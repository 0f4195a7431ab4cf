use super::event::{NoteEvent, NoteKind, ParamGestureEvent, ParamModEvent, ParamValueEvent};
use clap_sys::events::{clap_event_header, clap_output_events};

/// The host's output event queue.
///
/// Typed push operations build the CLAP event struct on the stack and hand
/// it to the host's `try_push`. A full queue returns `false`; callers must
/// not retry in place and should drop or defer the event.
pub struct OutputEvents<'a> {
    raw: &'a clap_output_events,
}

impl<'a> OutputEvents<'a> {
    /// # Safety
    ///
    /// The pointer must be a valid output event list for the lifetime `'a`.
    pub unsafe fn from_raw(raw: *const clap_output_events) -> Option<Self> {
        raw.as_ref().map(|raw| Self { raw })
    }

    /// Pushes a raw event; the host copies it before returning.
    pub fn try_push_raw(&self, header: &clap_event_header) -> bool {
        match self.raw.try_push {
            // SAFETY: the list is valid per from_raw and the event is a
            // complete struct starting at its header.
            Some(try_push) => unsafe { try_push(self.raw, header) },
            None => false,
        }
    }

    pub fn try_push_note_on(
        &self,
        time: u32,
        note_id: i32,
        port_index: i16,
        channel: i16,
        key: i16,
        velocity: f64,
    ) -> bool {
        let event = NoteEvent::new(NoteKind::On, time, note_id, port_index, channel, key, velocity);
        self.try_push_raw(event.header())
    }

    pub fn try_push_note_off(
        &self,
        time: u32,
        note_id: i32,
        port_index: i16,
        channel: i16,
        key: i16,
        velocity: f64,
    ) -> bool {
        let event = NoteEvent::new(NoteKind::Off, time, note_id, port_index, channel, key, velocity);
        self.try_push_raw(event.header())
    }

    /// Reports a finished voice back to the host.
    pub fn try_push_note_end(
        &self,
        time: u32,
        note_id: i32,
        port_index: i16,
        channel: i16,
        key: i16,
    ) -> bool {
        let event = NoteEvent::new(NoteKind::End, time, note_id, port_index, channel, key, 0.0);
        self.try_push_raw(event.header())
    }

    pub fn try_push_param_value(&self, time: u32, param_id: u32, value: f64) -> bool {
        let event = ParamValueEvent::new(time, param_id, value);
        self.try_push_raw(event.header())
    }

    pub fn try_push_param_mod(&self, time: u32, param_id: u32, amount: f64) -> bool {
        let event = ParamModEvent::new(time, param_id, amount);
        self.try_push_raw(event.header())
    }

    pub fn try_push_gesture_begin(&self, time: u32, param_id: u32) -> bool {
        let event = ParamGestureEvent::begin(time, param_id);
        self.try_push_raw(event.header())
    }

    pub fn try_push_gesture_end(&self, time: u32, param_id: u32) -> bool {
        let event = ParamGestureEvent::end(time, param_id);
        self.try_push_raw(event.header())
    }

    #[inline]
    pub fn as_raw(&self) -> *const clap_output_events {
        self.raw
    }
}

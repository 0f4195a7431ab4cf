use clap_sys::events::{clap_event_header, clap_input_events, clap_output_events};
use std::ffi::c_void;

/// A fixed-capacity, 8-byte-aligned event queue.
///
/// The buffer can present itself as either side of the CLAP event list ABI:
/// [`as_input`](Self::as_input) for feeding events into a plugin and
/// [`as_output`](Self::as_output) for collecting what it pushes back.
/// Capacity is reserved up front; once full, `try_push` refuses and returns
/// `false` rather than growing, which keeps it usable as a pre-allocated
/// output queue on the audio thread.
pub struct EventBuffer {
    /// Raw event storage in 8-byte words, so every event header is aligned.
    storage: Vec<u64>,
    /// Start of each event, in words.
    offsets: Vec<usize>,
    word_capacity: usize,
    event_capacity: usize,
}

impl EventBuffer {
    /// Creates a buffer able to hold up to `bytes` of event data and
    /// `max_events` events.
    pub fn with_capacity(bytes: usize, max_events: usize) -> Self {
        let word_capacity = bytes.div_ceil(8);
        Self {
            storage: Vec::with_capacity(word_capacity),
            offsets: Vec::with_capacity(max_events),
            word_capacity,
            event_capacity: max_events,
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn clear(&mut self) {
        self.storage.clear();
        self.offsets.clear();
    }

    /// Copies a complete event (header plus payload) into the buffer.
    ///
    /// Returns `false` when the event does not fit in the reserved
    /// capacity; the buffer never reallocates in that case.
    pub fn try_push(&mut self, header: &clap_event_header) -> bool {
        let words = (header.size as usize).div_ceil(8);
        if words == 0
            || self.storage.len() + words > self.word_capacity
            || self.offsets.len() == self.event_capacity
        {
            return false;
        }

        let offset = self.storage.len();
        self.storage.resize(offset + words, 0);
        // SAFETY: the source is a complete event of header.size bytes; the
        // destination was just sized to hold it.
        unsafe {
            std::ptr::copy_nonoverlapping(
                (header as *const clap_event_header).cast::<u8>(),
                self.storage[offset..].as_mut_ptr().cast::<u8>(),
                header.size as usize,
            );
        }
        self.offsets.push(offset);
        true
    }

    /// The event header at `index`.
    pub fn header(&self, index: usize) -> Option<&clap_event_header> {
        let offset = *self.offsets.get(index)?;
        // SAFETY: offsets only ever point at complete events copied in by
        // try_push.
        Some(unsafe { &*self.storage[offset..].as_ptr().cast::<clap_event_header>() })
    }

    /// Presents the buffer as a CLAP input event list.
    ///
    /// The returned struct borrows `self`; keep it alive while the list is
    /// in use.
    pub fn as_input(&self) -> clap_input_events {
        clap_input_events {
            ctx: (self as *const Self as *mut Self).cast(),
            size: Some(input_size),
            get: Some(input_get),
        }
    }

    /// Presents the buffer as a CLAP output event list that appends.
    pub fn as_output(&mut self) -> clap_output_events {
        clap_output_events {
            ctx: (self as *mut Self).cast(),
            try_push: Some(output_try_push),
        }
    }
}

unsafe extern "C" fn input_size(list: *const clap_input_events) -> u32 {
    // SAFETY: ctx was set from an EventBuffer reference in as_input.
    let buffer = &*((*list).ctx as *const EventBuffer);
    u32::try_from(buffer.len()).unwrap_or(u32::MAX)
}

unsafe extern "C" fn input_get(
    list: *const clap_input_events,
    index: u32,
) -> *const clap_event_header {
    // SAFETY: ctx was set from an EventBuffer reference in as_input.
    let buffer = &*((*list).ctx as *const EventBuffer);
    match buffer.header(index as usize) {
        Some(header) => header,
        None => std::ptr::null(),
    }
}

unsafe extern "C" fn output_try_push(
    list: *const clap_output_events,
    event: *const clap_event_header,
) -> bool {
    if event.is_null() {
        return false;
    }
    // SAFETY: ctx was set from an exclusive EventBuffer reference in
    // as_output; the host/plugin hands a complete event.
    let buffer = &mut *((*list).ctx as *mut EventBuffer);
    buffer.try_push(&*event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventSink, InputEvents, NoteEvent, NoteKind, OutputEvents};

    #[test]
    fn round_trips_events_through_the_input_abi() {
        let mut buffer = EventBuffer::with_capacity(256, 8);
        let on = NoteEvent::new(NoteKind::On, 0, -1, 0, 0, 60, 0.8);
        let off = NoteEvent::new(NoteKind::Off, 128, -1, 0, 0, 60, 0.0);
        assert!(buffer.try_push(on.header()));
        assert!(buffer.try_push(off.header()));

        let list = buffer.as_input();
        // SAFETY: list borrows buffer, which outlives it.
        let events = unsafe { InputEvents::from_raw(&list) }.unwrap();
        assert_eq!(events.len(), 2);

        struct Collect(Vec<(u32, i16)>);
        impl EventSink for Collect {
            fn event(&mut self, event: &Event<'_>) {
                if let Event::NoteOn(e) | Event::NoteOff(e) = event {
                    self.0.push((e.time(), e.key()));
                }
            }
        }

        let mut sink = Collect(Vec::new());
        events.dispatch(&mut sink);
        assert_eq!(sink.0, [(0, 60), (128, 60)]);
    }

    #[test]
    fn refuses_events_beyond_capacity() {
        let mut buffer = EventBuffer::with_capacity(size_of::<clap_sys::events::clap_event_note>(), 1);
        let event = NoteEvent::new(NoteKind::On, 0, -1, 0, 0, 60, 1.0);

        assert!(buffer.try_push(event.header()));
        assert!(!buffer.try_push(event.header()));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn collects_pushes_through_the_output_abi() {
        let mut buffer = EventBuffer::with_capacity(256, 8);
        let list = buffer.as_output();
        // SAFETY: list borrows buffer exclusively for this scope.
        let outputs = unsafe { OutputEvents::from_raw(&list) }.unwrap();

        assert!(outputs.try_push_param_value(5, 7, 440.0));
        assert!(outputs.try_push_gesture_end(6, 7));
        drop(outputs);

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.header(0).unwrap().time, 5);
    }
}

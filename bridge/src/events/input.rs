use super::event::{decode, EventSink};
use clap_sys::events::{clap_event_header, clap_input_events};

/// The host's ordered input event queue for one process or flush call.
///
/// Events are visited strictly by index; the host is responsible for
/// timestamp ordering and that order is preserved. Iteration performs no
/// allocation: every event is viewed in place through its typed wrapper.
pub struct InputEvents<'a> {
    raw: &'a clap_input_events,
}

impl<'a> InputEvents<'a> {
    /// # Safety
    ///
    /// The pointer must be a valid input event list whose events stay alive
    /// for `'a`.
    pub unsafe fn from_raw(raw: *const clap_input_events) -> Option<Self> {
        raw.as_ref().map(|raw| Self { raw })
    }

    /// Number of events in the queue.
    pub fn len(&self) -> u32 {
        match self.raw.size {
            // SAFETY: the list is valid per from_raw.
            Some(size) => unsafe { size(self.raw) },
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw header at `index`, if the host returns one.
    pub fn header(&self, index: u32) -> Option<&'a clap_event_header> {
        let get = self.raw.get?;
        // SAFETY: the list is valid per from_raw; the host returns either
        // null or a pointer valid for the queue's lifetime.
        unsafe { get(self.raw, index).as_ref() }
    }

    /// Decodes and delivers every core-space event to the sink, in host
    /// order. Unknown events are skipped.
    pub fn dispatch(&self, sink: &mut impl EventSink) {
        for index in 0..self.len() {
            let Some(header) = self.header(index) else {
                continue;
            };
            // SAFETY: the host hands out complete events of header.size
            // bytes, alive for the duration of the call.
            if let Some(event) = unsafe { decode(header) } {
                sink.event(&event);
            }
        }
    }

    #[inline]
    pub fn as_raw(&self) -> *const clap_input_events {
        self.raw
    }
}

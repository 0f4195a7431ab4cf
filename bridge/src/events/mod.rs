//! The realtime event bridge.
//!
//! [`InputEvents`] iterates the host's queue in place and dispatches typed
//! [`Event`]s to an [`EventSink`]; [`OutputEvents`] offers typed pushes into
//! the host's queue; [`EventBuffer`] is a pre-allocated queue usable on
//! either side of that ABI. [`midi`] holds the MIDI 1.0 translation
//! helpers and [`ParamApplier`] is the sink that keeps the parameter
//! registry in sync with the event stream.

pub mod midi;

mod apply;
mod buffer;
mod event;
mod input;
mod output;

pub use apply::ParamApplier;
pub use buffer::EventBuffer;
pub use event::{
    Event, EventSink, Midi2Event, MidiEvent, MidiSysexEvent, NoteEvent, NoteExpressionEvent,
    NoteExpressionKind, NoteKind, ParamGestureEvent, ParamModEvent, ParamValueEvent,
    TransportEvent, TransportFlags,
};
pub use input::InputEvents;
pub use output::OutputEvents;

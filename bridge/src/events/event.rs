//! Typed, zero-copy views over CLAP core events.
//!
//! Each wrapper is a `repr(C)` shell around the matching `clap_event_*`
//! struct, so an event in the host's input queue can be viewed through its
//! wrapper without copying. [`decode`] turns a raw header into the tagged
//! [`Event`] sum type; dispatch over it is a plain `match`, keeping the
//! audio-thread path devirtualized.

use crate::util::slice_from_external_parts;
use bitflags::bitflags;
use clap_sys::events::{
    clap_event_header, clap_event_midi, clap_event_midi2, clap_event_midi_sysex, clap_event_note,
    clap_event_note_expression, clap_event_param_gesture, clap_event_param_mod,
    clap_event_param_value, clap_event_transport, CLAP_CORE_EVENT_SPACE_ID, CLAP_EVENT_MIDI,
    CLAP_EVENT_MIDI2, CLAP_EVENT_MIDI_SYSEX, CLAP_EVENT_NOTE_CHOKE, CLAP_EVENT_NOTE_END,
    CLAP_EVENT_NOTE_EXPRESSION, CLAP_EVENT_NOTE_OFF, CLAP_EVENT_NOTE_ON, CLAP_EVENT_PARAM_GESTURE_BEGIN,
    CLAP_EVENT_PARAM_GESTURE_END, CLAP_EVENT_PARAM_MOD, CLAP_EVENT_PARAM_VALUE,
    CLAP_EVENT_TRANSPORT, CLAP_NOTE_EXPRESSION_BRIGHTNESS, CLAP_NOTE_EXPRESSION_EXPRESSION,
    CLAP_NOTE_EXPRESSION_PAN, CLAP_NOTE_EXPRESSION_PRESSURE, CLAP_NOTE_EXPRESSION_TUNING,
    CLAP_NOTE_EXPRESSION_VIBRATO, CLAP_NOTE_EXPRESSION_VOLUME, CLAP_TRANSPORT_HAS_BEATS_TIMELINE,
    CLAP_TRANSPORT_HAS_SECONDS_TIMELINE, CLAP_TRANSPORT_HAS_TEMPO,
    CLAP_TRANSPORT_HAS_TIME_SIGNATURE, CLAP_TRANSPORT_IS_LOOP_ACTIVE, CLAP_TRANSPORT_IS_PLAYING,
    CLAP_TRANSPORT_IS_RECORDING, CLAP_TRANSPORT_IS_WITHIN_PRE_ROLL,
};
use clap_sys::fixedpoint::{CLAP_BEATTIME_FACTOR, CLAP_SECTIME_FACTOR};
use std::ffi::c_void;

fn header(type_: u16, time: u32, size: usize) -> clap_event_header {
    clap_event_header {
        #[allow(clippy::cast_possible_truncation)]
        size: size as u32,
        time,
        space_id: CLAP_CORE_EVENT_SPACE_ID,
        type_,
        flags: 0,
    }
}

/// The kind of a note lifecycle event.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum NoteKind {
    On,
    Off,
    Choke,
    End,
}

impl NoteKind {
    fn type_id(self) -> u16 {
        match self {
            Self::On => CLAP_EVENT_NOTE_ON,
            Self::Off => CLAP_EVENT_NOTE_OFF,
            Self::Choke => CLAP_EVENT_NOTE_CHOKE,
            Self::End => CLAP_EVENT_NOTE_END,
        }
    }
}

/// A note-on/off/choke/end event.
#[derive(Copy, Clone)]
#[repr(C)]
pub struct NoteEvent {
    inner: clap_event_note,
}

impl NoteEvent {
    pub fn new(
        kind: NoteKind,
        time: u32,
        note_id: i32,
        port_index: i16,
        channel: i16,
        key: i16,
        velocity: f64,
    ) -> Self {
        Self {
            inner: clap_event_note {
                header: header(kind.type_id(), time, size_of::<clap_event_note>()),
                note_id,
                port_index,
                channel,
                key,
                velocity,
            },
        }
    }

    #[inline]
    pub fn time(&self) -> u32 {
        self.inner.header.time
    }

    #[inline]
    pub fn note_id(&self) -> i32 {
        self.inner.note_id
    }

    #[inline]
    pub fn port_index(&self) -> i16 {
        self.inner.port_index
    }

    #[inline]
    pub fn channel(&self) -> i16 {
        self.inner.channel
    }

    #[inline]
    pub fn key(&self) -> i16 {
        self.inner.key
    }

    #[inline]
    pub fn velocity(&self) -> f64 {
        self.inner.velocity
    }

    #[inline]
    pub fn as_raw(&self) -> &clap_event_note {
        &self.inner
    }

    #[inline]
    pub fn header(&self) -> &clap_event_header {
        &self.inner.header
    }
}

/// The per-note expression dimensions.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum NoteExpressionKind {
    Volume,
    Pan,
    Tuning,
    Vibrato,
    Expression,
    Brightness,
    Pressure,
}

impl NoteExpressionKind {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            CLAP_NOTE_EXPRESSION_VOLUME => Some(Self::Volume),
            CLAP_NOTE_EXPRESSION_PAN => Some(Self::Pan),
            CLAP_NOTE_EXPRESSION_TUNING => Some(Self::Tuning),
            CLAP_NOTE_EXPRESSION_VIBRATO => Some(Self::Vibrato),
            CLAP_NOTE_EXPRESSION_EXPRESSION => Some(Self::Expression),
            CLAP_NOTE_EXPRESSION_BRIGHTNESS => Some(Self::Brightness),
            CLAP_NOTE_EXPRESSION_PRESSURE => Some(Self::Pressure),
            _ => None,
        }
    }
}

/// A note expression change.
#[derive(Copy, Clone)]
#[repr(C)]
pub struct NoteExpressionEvent {
    inner: clap_event_note_expression,
}

impl NoteExpressionEvent {
    #[inline]
    pub fn time(&self) -> u32 {
        self.inner.header.time
    }

    #[inline]
    pub fn kind(&self) -> Option<NoteExpressionKind> {
        NoteExpressionKind::from_raw(self.inner.expression_id)
    }

    #[inline]
    pub fn note_id(&self) -> i32 {
        self.inner.note_id
    }

    #[inline]
    pub fn port_index(&self) -> i16 {
        self.inner.port_index
    }

    #[inline]
    pub fn channel(&self) -> i16 {
        self.inner.channel
    }

    #[inline]
    pub fn key(&self) -> i16 {
        self.inner.key
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.inner.value
    }
}

/// A parameter value change.
#[derive(Copy, Clone)]
#[repr(C)]
pub struct ParamValueEvent {
    inner: clap_event_param_value,
}

impl ParamValueEvent {
    pub fn new(time: u32, param_id: u32, value: f64) -> Self {
        Self::with_target(time, param_id, value, -1, -1, -1, -1, std::ptr::null_mut())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_target(
        time: u32,
        param_id: u32,
        value: f64,
        note_id: i32,
        port_index: i16,
        channel: i16,
        key: i16,
        cookie: *mut c_void,
    ) -> Self {
        Self {
            inner: clap_event_param_value {
                header: header(
                    CLAP_EVENT_PARAM_VALUE,
                    time,
                    size_of::<clap_event_param_value>(),
                ),
                param_id,
                cookie,
                note_id,
                port_index,
                channel,
                key,
                value,
            },
        }
    }

    #[inline]
    pub fn time(&self) -> u32 {
        self.inner.header.time
    }

    #[inline]
    pub fn param_id(&self) -> u32 {
        self.inner.param_id
    }

    #[inline]
    pub fn cookie(&self) -> *mut c_void {
        self.inner.cookie
    }

    /// `-1` targets every voice; a non-negative id targets one voice.
    #[inline]
    pub fn note_id(&self) -> i32 {
        self.inner.note_id
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.inner.value
    }

    #[inline]
    pub fn header(&self) -> &clap_event_header {
        &self.inner.header
    }
}

/// A parameter modulation offset.
#[derive(Copy, Clone)]
#[repr(C)]
pub struct ParamModEvent {
    inner: clap_event_param_mod,
}

impl ParamModEvent {
    pub fn new(time: u32, param_id: u32, amount: f64) -> Self {
        Self {
            inner: clap_event_param_mod {
                header: header(CLAP_EVENT_PARAM_MOD, time, size_of::<clap_event_param_mod>()),
                param_id,
                cookie: std::ptr::null_mut(),
                note_id: -1,
                port_index: -1,
                channel: -1,
                key: -1,
                amount,
            },
        }
    }

    #[inline]
    pub fn time(&self) -> u32 {
        self.inner.header.time
    }

    #[inline]
    pub fn param_id(&self) -> u32 {
        self.inner.param_id
    }

    #[inline]
    pub fn note_id(&self) -> i32 {
        self.inner.note_id
    }

    /// Modulation delta, nominally in `[-1, 1]` of the mapped range.
    #[inline]
    pub fn amount(&self) -> f64 {
        self.inner.amount
    }

    #[inline]
    pub fn header(&self) -> &clap_event_header {
        &self.inner.header
    }
}

/// A parameter gesture boundary.
#[derive(Copy, Clone)]
#[repr(C)]
pub struct ParamGestureEvent {
    inner: clap_event_param_gesture,
}

impl ParamGestureEvent {
    pub fn begin(time: u32, param_id: u32) -> Self {
        Self {
            inner: clap_event_param_gesture {
                header: header(
                    CLAP_EVENT_PARAM_GESTURE_BEGIN,
                    time,
                    size_of::<clap_event_param_gesture>(),
                ),
                param_id,
            },
        }
    }

    pub fn end(time: u32, param_id: u32) -> Self {
        Self {
            inner: clap_event_param_gesture {
                header: header(
                    CLAP_EVENT_PARAM_GESTURE_END,
                    time,
                    size_of::<clap_event_param_gesture>(),
                ),
                param_id,
            },
        }
    }

    #[inline]
    pub fn time(&self) -> u32 {
        self.inner.header.time
    }

    #[inline]
    pub fn param_id(&self) -> u32 {
        self.inner.param_id
    }

    #[inline]
    pub fn header(&self) -> &clap_event_header {
        &self.inner.header
    }
}

bitflags! {
    /// Transport snapshot validity and state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TransportFlags: u32 {
        const HAS_TEMPO = CLAP_TRANSPORT_HAS_TEMPO;
        const HAS_BEATS_TIMELINE = CLAP_TRANSPORT_HAS_BEATS_TIMELINE;
        const HAS_SECONDS_TIMELINE = CLAP_TRANSPORT_HAS_SECONDS_TIMELINE;
        const HAS_TIME_SIGNATURE = CLAP_TRANSPORT_HAS_TIME_SIGNATURE;
        const IS_PLAYING = CLAP_TRANSPORT_IS_PLAYING;
        const IS_RECORDING = CLAP_TRANSPORT_IS_RECORDING;
        const IS_LOOP_ACTIVE = CLAP_TRANSPORT_IS_LOOP_ACTIVE;
        const IS_WITHIN_PRE_ROLL = CLAP_TRANSPORT_IS_WITHIN_PRE_ROLL;
    }
}

/// A full transport snapshot.
#[derive(Copy, Clone)]
#[repr(C)]
pub struct TransportEvent {
    inner: clap_event_transport,
}

impl TransportEvent {
    #[inline]
    pub fn time(&self) -> u32 {
        self.inner.header.time
    }

    #[inline]
    pub fn flags(&self) -> TransportFlags {
        TransportFlags::from_bits_truncate(self.inner.flags)
    }

    #[inline]
    pub fn tempo(&self) -> f64 {
        self.inner.tempo
    }

    /// Tempo ramp, in bpm per sample.
    #[inline]
    pub fn tempo_increment(&self) -> f64 {
        self.inner.tempo_inc
    }

    #[inline]
    pub fn song_pos_beats(&self) -> f64 {
        fixed_beats(self.inner.song_pos_beats)
    }

    #[inline]
    pub fn song_pos_seconds(&self) -> f64 {
        fixed_seconds(self.inner.song_pos_seconds)
    }

    #[inline]
    pub fn loop_start_beats(&self) -> f64 {
        fixed_beats(self.inner.loop_start_beats)
    }

    #[inline]
    pub fn loop_end_beats(&self) -> f64 {
        fixed_beats(self.inner.loop_end_beats)
    }

    #[inline]
    pub fn loop_start_seconds(&self) -> f64 {
        fixed_seconds(self.inner.loop_start_seconds)
    }

    #[inline]
    pub fn loop_end_seconds(&self) -> f64 {
        fixed_seconds(self.inner.loop_end_seconds)
    }

    #[inline]
    pub fn bar_start_beats(&self) -> f64 {
        fixed_beats(self.inner.bar_start)
    }

    #[inline]
    pub fn bar_number(&self) -> i32 {
        self.inner.bar_number
    }

    #[inline]
    pub fn time_signature(&self) -> (u16, u16) {
        (self.inner.tsig_num, self.inner.tsig_denom)
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.flags().contains(TransportFlags::IS_PLAYING)
    }

    #[inline]
    pub fn as_raw(&self) -> &clap_event_transport {
        &self.inner
    }
}

#[inline]
#[allow(clippy::cast_precision_loss)]
fn fixed_beats(raw: i64) -> f64 {
    raw as f64 / CLAP_BEATTIME_FACTOR as f64
}

#[inline]
#[allow(clippy::cast_precision_loss)]
fn fixed_seconds(raw: i64) -> f64 {
    raw as f64 / CLAP_SECTIME_FACTOR as f64
}

/// A 3-byte MIDI 1.0 message.
#[derive(Copy, Clone)]
#[repr(C)]
pub struct MidiEvent {
    inner: clap_event_midi,
}

impl MidiEvent {
    pub fn new(time: u32, port_index: u16, data: [u8; 3]) -> Self {
        Self {
            inner: clap_event_midi {
                header: header(CLAP_EVENT_MIDI, time, size_of::<clap_event_midi>()),
                port_index,
                data,
            },
        }
    }

    #[inline]
    pub fn time(&self) -> u32 {
        self.inner.header.time
    }

    #[inline]
    pub fn port_index(&self) -> u16 {
        self.inner.port_index
    }

    #[inline]
    pub fn data(&self) -> [u8; 3] {
        self.inner.data
    }

    #[inline]
    pub fn header(&self) -> &clap_event_header {
        &self.inner.header
    }
}

/// A MIDI system-exclusive message borrowing a host-owned buffer.
///
/// The buffer is only valid while the event is being dispatched; it must
/// not be retained.
#[repr(C)]
pub struct MidiSysexEvent {
    inner: clap_event_midi_sysex,
}

impl MidiSysexEvent {
    #[inline]
    pub fn time(&self) -> u32 {
        self.inner.header.time
    }

    #[inline]
    pub fn port_index(&self) -> u16 {
        self.inner.port_index
    }

    pub fn data(&self) -> &[u8] {
        // SAFETY: the host keeps the sysex buffer alive for the duration of
        // the event dispatch, which bounds &self.
        unsafe { slice_from_external_parts(self.inner.buffer, self.inner.size as usize) }
    }
}

/// A MIDI 2.0 universal packet.
#[derive(Copy, Clone)]
#[repr(C)]
pub struct Midi2Event {
    inner: clap_event_midi2,
}

impl Midi2Event {
    #[inline]
    pub fn time(&self) -> u32 {
        self.inner.header.time
    }

    #[inline]
    pub fn port_index(&self) -> u16 {
        self.inner.port_index
    }

    #[inline]
    pub fn data(&self) -> [u32; 4] {
        self.inner.data
    }
}

/// One decoded core-space event.
pub enum Event<'a> {
    NoteOn(&'a NoteEvent),
    NoteOff(&'a NoteEvent),
    NoteChoke(&'a NoteEvent),
    NoteEnd(&'a NoteEvent),
    NoteExpression(&'a NoteExpressionEvent),
    ParamValue(&'a ParamValueEvent),
    ParamMod(&'a ParamModEvent),
    ParamGestureBegin(&'a ParamGestureEvent),
    ParamGestureEnd(&'a ParamGestureEvent),
    Transport(&'a TransportEvent),
    Midi(&'a MidiEvent),
    MidiSysex(&'a MidiSysexEvent),
    Midi2(&'a Midi2Event),
}

impl Event<'_> {
    /// The event's timestamp, in samples from the start of the block.
    pub fn time(&self) -> u32 {
        match self {
            Event::NoteOn(e) | Event::NoteOff(e) | Event::NoteChoke(e) | Event::NoteEnd(e) => {
                e.time()
            }
            Event::NoteExpression(e) => e.time(),
            Event::ParamValue(e) => e.time(),
            Event::ParamMod(e) => e.time(),
            Event::ParamGestureBegin(e) | Event::ParamGestureEnd(e) => e.time(),
            Event::Transport(e) => e.time(),
            Event::Midi(e) => e.time(),
            Event::MidiSysex(e) => e.time(),
            Event::Midi2(e) => e.time(),
        }
    }
}

/// Receives decoded events, in host order.
///
/// Audio-thread sinks must be non-blocking and allocation-free.
pub trait EventSink {
    fn event(&mut self, event: &Event<'_>);
}

/// Views a raw header as a typed event, if it is large enough.
///
/// # Safety
///
/// The header must be the start of a complete, valid event allocation of
/// `header.size` bytes, aligned for its event type as the CLAP event ABI
/// requires.
#[allow(clippy::cast_ptr_alignment)] // alignment is the host's ABI obligation
unsafe fn cast<T>(header: &clap_event_header) -> Option<&T> {
    if (header.size as usize) < size_of::<T>() {
        return None;
    }
    // SAFETY: size checked above; event structs start with their header.
    Some(&*(header as *const clap_event_header).cast::<T>())
}

/// Decodes one core-space event. Events from other spaces, unknown types
/// and undersized payloads yield `None` and are skipped by dispatch.
///
/// # Safety
///
/// The header must be the start of a complete, valid event allocation of
/// `header.size` bytes, alive for `'a`.
pub(crate) unsafe fn decode<'a>(header: &'a clap_event_header) -> Option<Event<'a>> {
    if header.space_id != CLAP_CORE_EVENT_SPACE_ID {
        return None;
    }

    Some(match header.type_ {
        CLAP_EVENT_NOTE_ON => Event::NoteOn(cast(header)?),
        CLAP_EVENT_NOTE_OFF => Event::NoteOff(cast(header)?),
        CLAP_EVENT_NOTE_CHOKE => Event::NoteChoke(cast(header)?),
        CLAP_EVENT_NOTE_END => Event::NoteEnd(cast(header)?),
        CLAP_EVENT_NOTE_EXPRESSION => Event::NoteExpression(cast(header)?),
        CLAP_EVENT_PARAM_VALUE => Event::ParamValue(cast(header)?),
        CLAP_EVENT_PARAM_MOD => Event::ParamMod(cast(header)?),
        CLAP_EVENT_PARAM_GESTURE_BEGIN => Event::ParamGestureBegin(cast(header)?),
        CLAP_EVENT_PARAM_GESTURE_END => Event::ParamGestureEnd(cast(header)?),
        CLAP_EVENT_TRANSPORT => Event::Transport(cast(header)?),
        CLAP_EVENT_MIDI => Event::Midi(cast(header)?),
        CLAP_EVENT_MIDI_SYSEX => Event::MidiSysex(cast(header)?),
        CLAP_EVENT_MIDI2 => Event::Midi2(cast(header)?),
        _ => return None,
    })
}

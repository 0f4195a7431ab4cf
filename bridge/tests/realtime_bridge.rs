//! Integration tests across the event bridge, parameter registry and state
//! codec, driven through the same CLAP-shaped queues and streams a host
//! would provide.

use gobridge::events::{
    Event, EventBuffer, EventSink, InputEvents, MidiEvent, NoteEvent, NoteKind, OutputEvents,
    ParamApplier, ParamValueEvent,
};
use gobridge::events::midi;
use gobridge::stream::{HostInputStream, ReaderStream};
use gobridge_params::state::{load_state, save_state};
use gobridge_params::{binder, ParamId, ParamRegistry};
use std::io::Cursor;

#[derive(Default)]
struct Recorder {
    seen: Vec<(u32, &'static str)>,
}

impl EventSink for Recorder {
    fn event(&mut self, event: &Event<'_>) {
        let tag = match event {
            Event::NoteOn(_) => "note-on",
            Event::NoteOff(_) => "note-off",
            Event::ParamValue(_) => "param-value",
            Event::ParamMod(_) => "param-mod",
            Event::Midi(_) => "midi",
            _ => "other",
        };
        self.seen.push((event.time(), tag));
    }
}

#[test]
fn events_are_delivered_in_host_order() {
    let mut buffer = EventBuffer::with_capacity(1024, 16);
    buffer.try_push(NoteEvent::new(NoteKind::On, 0, -1, 0, 0, 60, 0.8).header());
    buffer.try_push(ParamValueEvent::new(64, 7, 880.0).header());
    buffer.try_push(MidiEvent::new(100, 0, [0xE0, 0x00, 0x60]).header());
    buffer.try_push(NoteEvent::new(NoteKind::Off, 128, -1, 0, 0, 60, 0.0).header());

    let list = buffer.as_input();
    // SAFETY: list borrows buffer, which outlives it.
    let events = unsafe { InputEvents::from_raw(&list) }.unwrap();

    let mut recorder = Recorder::default();
    events.dispatch(&mut recorder);

    assert_eq!(
        recorder.seen,
        [
            (0, "note-on"),
            (64, "param-value"),
            (100, "midi"),
            (128, "note-off"),
        ]
    );
}

#[test]
fn note_on_precedes_note_off_at_its_timestamp() {
    // A 256-frame block with a note-on at 0 and note-off at 128: the
    // handler must see the note-on first and the note-off with its exact
    // timestamp, so sample 128 can be rendered after the release.
    let mut buffer = EventBuffer::with_capacity(512, 4);
    buffer.try_push(NoteEvent::new(NoteKind::On, 0, -1, 0, 0, 60, 0.8).header());
    buffer.try_push(NoteEvent::new(NoteKind::Off, 128, -1, 0, 0, 60, 0.0).header());

    let list = buffer.as_input();
    // SAFETY: list borrows buffer, which outlives it.
    let events = unsafe { InputEvents::from_raw(&list) }.unwrap();

    let mut recorder = Recorder::default();
    events.dispatch(&mut recorder);

    assert_eq!(recorder.seen[0], (0, "note-on"));
    assert_eq!(recorder.seen[1], (128, "note-off"));
    assert!(recorder.seen[0].0 < 256 && recorder.seen[1].0 < 256);
}

#[test]
fn param_events_update_registry_and_bound_slots() {
    let registry = ParamRegistry::new();
    registry
        .register(binder::hertz_log(7u32, "Cutoff", 20.0, 20_000.0, 440.0))
        .unwrap();

    let mirror = std::sync::Arc::new(gobridge_params::AtomicF64::new(0.0));
    registry
        .bind(ParamId::new(7), std::sync::Arc::clone(&mirror))
        .unwrap();

    let mut buffer = EventBuffer::with_capacity(512, 4);
    buffer.try_push(ParamValueEvent::new(0, 7, 1000.0).header());
    buffer.try_push(ParamValueEvent::new(10, 99, 5.0).header()); // unknown id

    let list = buffer.as_input();
    // SAFETY: list borrows buffer, which outlives it.
    let events = unsafe { InputEvents::from_raw(&list) }.unwrap();

    let mut applier = ParamApplier::new(&registry);
    events.dispatch(&mut applier);

    assert_eq!(applier.applied(), 1);
    assert_eq!(registry.get(ParamId::new(7)), Some(1000.0));
    assert_eq!(mirror.load(), 1000.0);
}

#[test]
fn pitch_bend_translates_and_round_trips_through_a_queue() {
    let bend = MidiEvent::new(5, 0, [0xE0, 0x00, 0x60]);
    let translated = midi::param_mod_from_pitch_bend(&bend, 7).unwrap();

    let mut buffer = EventBuffer::with_capacity(256, 4);
    {
        let list = buffer.as_output();
        // SAFETY: list borrows buffer exclusively for this scope.
        let outputs = unsafe { OutputEvents::from_raw(&list) }.unwrap();
        assert!(outputs.try_push_param_mod(
            translated.time(),
            translated.param_id(),
            translated.amount()
        ));
    }

    let list = buffer.as_input();
    // SAFETY: list borrows buffer, which outlives it.
    let events = unsafe { InputEvents::from_raw(&list) }.unwrap();

    struct BendCheck(Option<f64>);
    impl EventSink for BendCheck {
        fn event(&mut self, event: &Event<'_>) {
            if let Event::ParamMod(e) = event {
                self.0 = Some(e.amount());
            }
        }
    }

    let mut check = BendCheck(None);
    events.dispatch(&mut check);
    let amount = check.0.unwrap();
    assert!((amount - 0.5).abs() <= 1.0 / 8192.0);
}

#[test]
fn state_round_trips_through_clap_shaped_streams() {
    let source = ParamRegistry::new();
    source
        .register(binder::hertz_log(7u32, "Cutoff", 20.0, 20_000.0, 440.0))
        .unwrap();
    source.set(ParamId::new(7), 440.0).unwrap();

    // Save to a plain byte buffer.
    let mut saved = Vec::new();
    save_state(&source, &mut saved, b"custom").unwrap();

    // Load it back through the raw clap_istream ABI, as the host would
    // present it.
    let mut cursor = Cursor::new(saved);
    let istream = ReaderStream::new(&mut cursor);
    // SAFETY: istream is alive for this scope.
    let mut host_stream = unsafe { HostInputStream::from_raw(istream.as_raw()) }.unwrap();

    let target = ParamRegistry::new();
    target
        .register(binder::hertz_log(7u32, "Cutoff", 20.0, 20_000.0, 880.0))
        .unwrap();

    let blob = load_state(&target, &mut host_stream).unwrap();
    assert_eq!(target.get(ParamId::new(7)), Some(440.0));
    assert_eq!(blob.custom, b"custom");
}

#[test]
fn full_output_queues_refuse_without_corruption() {
    let mut buffer = EventBuffer::with_capacity(32, 1); // one event fits
    {
        let list = buffer.as_output();
        // SAFETY: list borrows buffer exclusively for this scope.
        let outputs = unsafe { OutputEvents::from_raw(&list) }.unwrap();
        assert!(outputs.try_push_gesture_begin(0, 7));
        assert!(!outputs.try_push_gesture_end(1, 7));
    }
    assert_eq!(buffer.len(), 1);
}

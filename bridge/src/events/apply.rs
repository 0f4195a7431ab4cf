use super::event::{Event, EventSink};
use gobridge_params::{ParamId, ParamRegistry};

/// An event sink that feeds parameter events into the registry.
///
/// The process and flush paths run every incoming event through this sink
/// before forwarding the queue to the managed side, so registry slots and
/// bound atomics stay coherent even for plugins that consume the queue
/// lazily or not at all. Global events (`note_id == -1`) apply to the
/// shared slots; per-voice events are left to the plugin, which sees the
/// original queue unchanged.
pub struct ParamApplier<'a> {
    registry: &'a ParamRegistry,
    applied: usize,
}

impl<'a> ParamApplier<'a> {
    pub fn new(registry: &'a ParamRegistry) -> Self {
        Self {
            registry,
            applied: 0,
        }
    }

    /// How many parameter events were applied to the registry.
    pub fn applied(&self) -> usize {
        self.applied
    }
}

impl EventSink for ParamApplier<'_> {
    fn event(&mut self, event: &Event<'_>) {
        match event {
            Event::ParamValue(e) if e.note_id() < 0 => {
                self.registry
                    .apply_value_event(ParamId::new(e.param_id()), e.value());
                self.applied += 1;
            }
            Event::ParamMod(e) if e.note_id() < 0 => {
                self.registry
                    .apply_mod_event(ParamId::new(e.param_id()), e.amount());
                self.applied += 1;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventBuffer, InputEvents, ParamValueEvent};
    use gobridge_params::binder;

    #[test]
    fn global_value_events_update_the_registry() {
        let registry = ParamRegistry::new();
        registry
            .register(binder::hertz_log(7u32, "Cutoff", 20.0, 20_000.0, 440.0))
            .unwrap();

        let mut buffer = EventBuffer::with_capacity(256, 4);
        buffer.try_push(ParamValueEvent::new(0, 7, 880.0).header());
        // Per-voice event: must not touch the shared slot.
        buffer.try_push(
            ParamValueEvent::with_target(3, 7, 110.0, 5, 0, 0, 60, std::ptr::null_mut()).header(),
        );

        let list = buffer.as_input();
        // SAFETY: list borrows buffer, which outlives it.
        let events = unsafe { InputEvents::from_raw(&list) }.unwrap();

        let mut applier = ParamApplier::new(&registry);
        events.dispatch(&mut applier);

        assert_eq!(applier.applied(), 1);
        assert_eq!(registry.get(ParamId::new(7)), Some(880.0));
    }
}

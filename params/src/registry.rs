use crate::{AtomicF64, ParamId, ParamInfo};
use std::cell::UnsafeCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use thiserror::Error;

/// Default number of listener slots; see [`ParamRegistry::with_listener_capacity`].
pub const DEFAULT_LISTENER_CAPACITY: usize = 16;

/// Errors raised by the parameter registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("unknown parameter id {0:?}")]
    NotFound(ParamId),
    #[error("parameter id {0:?} is already registered")]
    DuplicateId(ParamId),
    #[error("parameter id {0:?} already has a bound slot")]
    AlreadyBound(ParamId),
    #[error("listener capacity exhausted")]
    TooManyListeners,
}

/// Handle to a registered listener.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ListenerId(usize);

type Listener = Box<dyn Fn(ParamId, f64) + Send + Sync>;

struct ParamSlot {
    info: ParamInfo,
    value: AtomicF64,
    modulation: AtomicF64,
    /// AtomicBind target: a plugin-owned slot mirroring this parameter.
    bound: OnceLock<Arc<AtomicF64>>,
}

/// An immutable view of the registered parameters.
///
/// Registration swaps in a new snapshot; readers on any thread keep using
/// whichever snapshot they loaded. Slots are shared between snapshots, so a
/// value written through an old snapshot is visible through the new one.
struct Snapshot {
    ordered: Vec<Arc<ParamSlot>>,
    by_id: HashMap<u32, Arc<ParamSlot>>,
}

/// A thread-safe parameter registry.
///
/// Registration and listener management are main-thread operations; value
/// reads and writes are lock-free and safe from any thread, including the
/// audio thread. Values are clamped into their declared range on every
/// write, so `min <= get(id) <= max` holds at all times after registration.
pub struct ParamRegistry {
    snapshot: AtomicPtr<Snapshot>,
    /// Serializes writers and keeps retired snapshots alive: a reader may
    /// still be iterating a snapshot that was just replaced.
    writer: Mutex<Vec<Box<Snapshot>>>,
    listeners: Listeners,
}

impl ParamRegistry {
    pub fn new() -> Self {
        Self::with_listener_capacity(DEFAULT_LISTENER_CAPACITY)
    }

    /// Creates a registry with a custom bound on listener registrations.
    pub fn with_listener_capacity(capacity: usize) -> Self {
        let empty = Box::new(Snapshot {
            ordered: Vec::new(),
            by_id: HashMap::new(),
        });

        Self {
            snapshot: AtomicPtr::new(Box::into_raw(empty)),
            writer: Mutex::new(Vec::new()),
            listeners: Listeners::with_capacity(capacity),
        }
    }

    #[inline]
    fn snapshot(&self) -> &Snapshot {
        // SAFETY: the pointer always refers to a live snapshot. Replaced
        // snapshots are parked in `writer` and outlive every reader, and the
        // current one is freed only on drop.
        unsafe { &*self.snapshot.load(Ordering::Acquire) }
    }

    /// Registers a parameter. Main-thread only.
    ///
    /// The descriptor's default value (already normalized by
    /// [`ParamInfo::new`]) becomes the initial value.
    pub fn register(&self, info: ParamInfo) -> Result<(), ParamError> {
        let mut graveyard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.snapshot();

        if current.by_id.contains_key(&info.id.get()) {
            return Err(ParamError::DuplicateId(info.id));
        }

        let slot = Arc::new(ParamSlot {
            value: AtomicF64::new(info.default),
            modulation: AtomicF64::new(0.0),
            bound: OnceLock::new(),
            info,
        });

        let mut ordered = current.ordered.clone();
        let mut by_id = current.by_id.clone();
        ordered.push(Arc::clone(&slot));
        by_id.insert(slot.info.id.get(), slot);

        let next = Box::into_raw(Box::new(Snapshot { ordered, by_id }));
        let retired = self.snapshot.swap(next, Ordering::AcqRel);
        // SAFETY: `retired` came from Box::into_raw and is only reclaimed
        // here, under the writer lock.
        graveyard.push(unsafe { Box::from_raw(retired) });

        Ok(())
    }

    /// Number of registered parameters.
    #[inline]
    pub fn count(&self) -> usize {
        self.snapshot().ordered.len()
    }

    /// Stable insertion-ordered access, for host-facing iteration.
    pub fn info_by_index(&self, index: usize) -> Option<ParamInfo> {
        self.snapshot()
            .ordered
            .get(index)
            .map(|slot| slot.info.clone())
    }

    pub fn info(&self, id: ParamId) -> Option<ParamInfo> {
        self.slot(id).map(|slot| slot.info.clone())
    }

    /// Registered ids, in insertion order.
    pub fn ids(&self) -> Vec<ParamId> {
        self.snapshot()
            .ordered
            .iter()
            .map(|slot| slot.info.id)
            .collect()
    }

    /// Lock-free value read, safe on any thread.
    #[inline]
    pub fn get(&self, id: ParamId) -> Option<f64> {
        self.slot(id).map(|slot| slot.value.load())
    }

    /// The value with the current modulation offset applied, clamped back
    /// into range.
    pub fn modulated(&self, id: ParamId) -> Option<f64> {
        self.slot(id)
            .map(|slot| slot.info.snap(slot.value.load() + slot.modulation.load()))
    }

    /// Sets a parameter value.
    ///
    /// The value is clamped (and snapped for stepped parameters), stored
    /// with release ordering, mirrored into the bound slot, and every
    /// listener is notified before this returns, on the calling thread.
    /// Returns the effective value.
    pub fn set(&self, id: ParamId, value: f64) -> Result<f64, ParamError> {
        let slot = self.slot(id).ok_or(ParamError::NotFound(id))?;
        Ok(self.store(slot, value))
    }

    /// Audio-thread entry point for parameter value events.
    ///
    /// Unknown ids are ignored: the host may replay automation for a
    /// parameter the plugin no longer declares.
    #[inline]
    pub fn apply_value_event(&self, id: ParamId, value: f64) {
        if let Some(slot) = self.slot(id) {
            self.store(slot, value);
        }
    }

    /// Audio-thread entry point for parameter modulation events.
    #[inline]
    pub fn apply_mod_event(&self, id: ParamId, amount: f64) {
        if let Some(slot) = self.slot(id) {
            slot.modulation.store(amount);
        }
    }

    /// Records a plugin-owned atomic slot that mirrors this parameter.
    ///
    /// After binding, every value change (sets and events alike) stores into
    /// the given slot with no allocation on the write path.
    pub fn bind(&self, id: ParamId, target: Arc<AtomicF64>) -> Result<(), ParamError> {
        let slot = self.slot(id).ok_or(ParamError::NotFound(id))?;
        target.store(slot.value.load());
        slot.bound
            .set(target)
            .map_err(|_| ParamError::AlreadyBound(id))
    }

    /// Registers a change listener. Main-thread only; notification runs on
    /// whichever thread performs the write, so listeners must be
    /// non-blocking and allocation-free if the audio thread may write.
    pub fn add_listener(
        &self,
        listener: impl Fn(ParamId, f64) + Send + Sync + 'static,
    ) -> Result<ListenerId, ParamError> {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        self.listeners.push(Box::new(listener))
    }

    #[inline]
    fn slot(&self, id: ParamId) -> Option<&ParamSlot> {
        self.snapshot().by_id.get(&id.get()).map(Arc::as_ref)
    }

    fn store(&self, slot: &ParamSlot, value: f64) -> f64 {
        let value = slot.info.snap(value);
        slot.value.store(value);
        if let Some(bound) = slot.bound.get() {
            bound.store(value);
        }
        self.listeners.notify(slot.info.id, value);
        value
    }
}

impl Default for ParamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ParamRegistry {
    fn drop(&mut self) {
        let current = self.snapshot.swap(std::ptr::null_mut(), Ordering::AcqRel);
        if !current.is_null() {
            // SAFETY: exclusive access in drop; the pointer came from
            // Box::into_raw.
            drop(unsafe { Box::from_raw(current) });
        }
    }
}

/// Fixed-capacity, append-only listener storage.
///
/// The writer (holding the registry's writer lock) fills a slot and then
/// publishes it by bumping `len` with release ordering; readers acquire
/// `len` and only touch slots below it, so notification never locks.
struct Listeners {
    len: AtomicUsize,
    slots: Box<[UnsafeCell<Option<Listener>>]>,
}

// SAFETY: slots below `len` are never written again, and writes above `len`
// are serialized by the registry's writer lock.
unsafe impl Sync for Listeners {}
// SAFETY: listeners are required to be Send.
unsafe impl Send for Listeners {}

impl Listeners {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            len: AtomicUsize::new(0),
            slots: (0..capacity).map(|_| UnsafeCell::new(None)).collect(),
        }
    }

    /// Caller must hold the registry writer lock.
    fn push(&self, listener: Listener) -> Result<ListenerId, ParamError> {
        let len = self.len.load(Ordering::Relaxed);
        if len >= self.slots.len() {
            return Err(ParamError::TooManyListeners);
        }

        // SAFETY: only one writer exists (writer lock), and readers do not
        // access this slot until `len` is published below.
        unsafe { *self.slots[len].get() = Some(listener) };
        self.len.store(len + 1, Ordering::Release);
        Ok(ListenerId(len))
    }

    fn notify(&self, id: ParamId, value: f64) {
        let len = self.len.load(Ordering::Acquire);
        for slot in &self.slots[..len] {
            // SAFETY: slots below the acquired `len` are fully initialized
            // and immutable.
            if let Some(listener) = unsafe { &*slot.get() } {
                listener(id, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{binder, ParamFlags};
    use std::sync::atomic::AtomicUsize;

    fn freq_param() -> ParamInfo {
        binder::hertz_log(7u32, "Cutoff", 20.0, 20_000.0, 440.0)
    }

    #[test]
    fn register_get_set() {
        let registry = ParamRegistry::new();
        registry.register(freq_param()).unwrap();

        assert_eq!(registry.count(), 1);
        assert_eq!(registry.get(ParamId::new(7)), Some(440.0));
        assert_eq!(registry.set(ParamId::new(7), 1000.0), Ok(1000.0));
        assert_eq!(registry.get(ParamId::new(7)), Some(1000.0));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let registry = ParamRegistry::new();
        registry.register(freq_param()).unwrap();
        assert_eq!(
            registry.register(freq_param()),
            Err(ParamError::DuplicateId(ParamId::new(7)))
        );
    }

    #[test]
    fn out_of_range_sets_clamp_without_error() {
        let registry = ParamRegistry::new();
        registry.register(freq_param()).unwrap();

        assert_eq!(registry.set(ParamId::new(7), 1e9), Ok(20_000.0));
        assert_eq!(registry.set(ParamId::new(7), -5.0), Ok(20.0));
        assert_eq!(registry.get(ParamId::new(7)), Some(20.0));
    }

    #[test]
    fn stepped_sets_round() {
        let registry = ParamRegistry::new();
        registry
            .register(
                ParamInfo::new(1u32, "Voices", 1.0, 16.0, 8.0).with_flags(ParamFlags::STEPPED),
            )
            .unwrap();

        assert_eq!(registry.set(ParamId::new(1), 3.7), Ok(4.0));
    }

    #[test]
    fn unknown_ids_error_on_set_but_not_on_events() {
        let registry = ParamRegistry::new();
        assert_eq!(
            registry.set(ParamId::new(99), 1.0),
            Err(ParamError::NotFound(ParamId::new(99)))
        );
        registry.apply_value_event(ParamId::new(99), 1.0); // silently ignored
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let registry = ParamRegistry::new();
        for id in [5u32, 1, 9] {
            registry
                .register(ParamInfo::new(id, format!("p{id}"), 0.0, 1.0, 0.0))
                .unwrap();
        }

        let ids: Vec<u32> = registry.ids().iter().map(ParamId::get).collect();
        assert_eq!(ids, [5, 1, 9]);
        assert_eq!(registry.info_by_index(1).unwrap().id.get(), 1);
        assert!(registry.info_by_index(3).is_none());
    }

    #[test]
    fn listeners_run_before_set_returns() {
        let registry = ParamRegistry::new();
        registry.register(freq_param()).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry
            .add_listener(move |id, value| sink.lock().unwrap().push((id.get(), value)))
            .unwrap();

        registry.set(ParamId::new(7), 880.0).unwrap();
        assert_eq!(seen.lock().unwrap().as_slice(), &[(7, 880.0)]);
    }

    #[test]
    fn seventeenth_listener_overflows_default_capacity() {
        let registry = ParamRegistry::new();
        for _ in 0..16 {
            registry.add_listener(|_, _| {}).unwrap();
        }
        assert_eq!(
            registry.add_listener(|_, _| {}).unwrap_err(),
            ParamError::TooManyListeners
        );
    }

    #[test]
    fn bound_slots_mirror_every_write() {
        let registry = ParamRegistry::new();
        registry.register(freq_param()).unwrap();

        let mirror = Arc::new(AtomicF64::new(0.0));
        registry.bind(ParamId::new(7), Arc::clone(&mirror)).unwrap();
        assert_eq!(mirror.load(), 440.0); // initialized on bind

        registry.apply_value_event(ParamId::new(7), 1234.0);
        assert_eq!(mirror.load(), 1234.0);

        assert_eq!(
            registry.bind(ParamId::new(7), Arc::new(AtomicF64::new(0.0))),
            Err(ParamError::AlreadyBound(ParamId::new(7)))
        );
    }

    #[test]
    fn modulation_offsets_but_does_not_replace() {
        let registry = ParamRegistry::new();
        registry.register(freq_param()).unwrap();

        registry.apply_mod_event(ParamId::new(7), 100.0);
        assert_eq!(registry.get(ParamId::new(7)), Some(440.0));
        assert_eq!(registry.modulated(ParamId::new(7)), Some(540.0));
    }

    #[test]
    fn values_written_on_another_thread_are_visible() {
        let registry = Arc::new(ParamRegistry::new());
        registry.register(freq_param()).unwrap();

        let writer = Arc::clone(&registry);
        std::thread::spawn(move || {
            writer.set(ParamId::new(7), 2000.0).unwrap();
        })
        .join()
        .unwrap();

        assert_eq!(registry.get(ParamId::new(7)), Some(2000.0));
    }

    #[test]
    fn registration_during_reads_keeps_old_snapshots_valid() {
        let registry = Arc::new(ParamRegistry::new());
        registry.register(freq_param()).unwrap();

        let reader = Arc::clone(&registry);
        let reads = std::thread::spawn(move || {
            let counter = AtomicUsize::new(0);
            for _ in 0..1000 {
                if reader.get(ParamId::new(7)).is_some() {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            }
            counter.into_inner()
        });

        for id in 100u32..150 {
            registry
                .register(ParamInfo::new(id, format!("p{id}"), 0.0, 1.0, 0.5))
                .unwrap();
        }

        assert_eq!(reads.join().unwrap(), 1000);
        assert_eq!(registry.count(), 51);
    }
}

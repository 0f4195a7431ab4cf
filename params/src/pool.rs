//! Fixed-capacity, lock-free object pools.
//!
//! [`SyncPool`] pre-allocates every object up front and hands them out as
//! RAII [`PoolLease`]s through a lock-free free list, so the audio thread
//! (and any other realtime-constrained caller) can lease and return objects
//! without touching the allocator. When the pool runs dry, [`SyncPool::lease`]
//! returns `None` and the caller decides whether to degrade or fall back to
//! the heap.

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

const NIL: u32 = u32::MAX;

struct Slot<T> {
    value: UnsafeCell<T>,
    next: AtomicU32,
}

/// A fixed-capacity pool of pre-initialized objects.
///
/// The free list is a Treiber stack over slot indices; the head carries a
/// generation tag so concurrent lease/return pairs cannot ABA each other.
pub struct SyncPool<T> {
    slots: Box<[Slot<T>]>,
    /// Packed `(tag << 32) | head_index`.
    head: AtomicU64,
}

// SAFETY: a leased slot is reachable from exactly one PoolLease, and free
// slots are only touched through the atomic free list.
unsafe impl<T: Send> Sync for SyncPool<T> {}
// SAFETY: moving the pool moves ownership of all slots.
unsafe impl<T: Send> Send for SyncPool<T> {}

impl<T> SyncPool<T> {
    /// Creates a pool of `capacity` objects produced by `init`.
    #[allow(clippy::cast_possible_truncation)] // capacity is checked below
    pub fn new(capacity: usize, init: impl Fn() -> T) -> Self {
        assert!(capacity > 0 && capacity < NIL as usize, "bad pool capacity");

        let slots: Box<[Slot<T>]> = (0..capacity)
            .map(|i| Slot {
                value: UnsafeCell::new(init()),
                next: AtomicU32::new(if i + 1 < capacity { (i + 1) as u32 } else { NIL }),
            })
            .collect();

        Self {
            slots,
            head: AtomicU64::new(0), // tag 0, head index 0
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Takes an object from the pool, or `None` if all are in use.
    ///
    /// Lock-free and allocation-free; safe on the audio thread.
    pub fn lease(&self) -> Option<PoolLease<'_, T>> {
        loop {
            let head = self.head.load(Ordering::Acquire);
            let index = unpack_index(head);
            if index == NIL {
                return None;
            }

            let next = self.slots[index as usize].next.load(Ordering::Relaxed);
            let new_head = pack(unpack_tag(head).wrapping_add(1), next);

            if self
                .head
                .compare_exchange_weak(head, new_head, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(PoolLease { pool: self, index });
            }
        }
    }

    fn put_back(&self, index: u32) {
        loop {
            let head = self.head.load(Ordering::Acquire);
            self.slots[index as usize]
                .next
                .store(unpack_index(head), Ordering::Relaxed);
            let new_head = pack(unpack_tag(head).wrapping_add(1), index);

            if self
                .head
                .compare_exchange_weak(head, new_head, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return;
            }
        }
    }
}

#[inline]
fn pack(tag: u32, index: u32) -> u64 {
    (u64::from(tag) << 32) | u64::from(index)
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
fn unpack_tag(packed: u64) -> u32 {
    (packed >> 32) as u32
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
fn unpack_index(packed: u64) -> u32 {
    packed as u32
}

/// Exclusive access to one pooled object; returns it to the pool on drop.
pub struct PoolLease<'a, T> {
    pool: &'a SyncPool<T>,
    index: u32,
}

impl<T> Deref for PoolLease<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: the slot was removed from the free list, so this lease has
        // exclusive access to it.
        unsafe { &*self.pool.slots[self.index as usize].value.get() }
    }
}

impl<T> DerefMut for PoolLease<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above; &mut self guarantees uniqueness of the lease.
        unsafe { &mut *self.pool.slots[self.index as usize].value.get() }
    }
}

impl<T> Drop for PoolLease<'_, T> {
    fn drop(&mut self) {
        self.pool.put_back(self.index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn leases_are_exclusive_and_bounded() {
        let pool = SyncPool::new(2, || 0u32);

        let mut a = pool.lease().unwrap();
        let mut b = pool.lease().unwrap();
        assert!(pool.lease().is_none());

        *a = 1;
        *b = 2;
        assert_ne!(*a, *b);
    }

    #[test]
    fn dropping_a_lease_returns_the_slot() {
        let pool = SyncPool::new(1, String::new);

        {
            let mut lease = pool.lease().unwrap();
            lease.push_str("scratch");
        }

        // Slot is reusable; contents are whatever the last lease left.
        let lease = pool.lease().unwrap();
        assert_eq!(&*lease, "scratch");
    }

    #[test]
    fn concurrent_lease_and_return_stays_consistent() {
        let pool = Arc::new(SyncPool::new(4, || 0u64));
        let mut handles = Vec::new();

        for _ in 0..4 {
            let pool = Arc::clone(&pool);
            handles.push(std::thread::spawn(move || {
                let mut acquired = 0u32;
                for _ in 0..10_000 {
                    if let Some(mut lease) = pool.lease() {
                        *lease += 1;
                        acquired += 1;
                    }
                }
                acquired
            }));
        }

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert!(total > 0);

        // Everything was returned: all four slots are leasable again.
        let all: Vec<_> = (0..4).map(|_| pool.lease().unwrap()).collect();
        assert!(pool.lease().is_none());
        drop(all);
        assert!(pool.lease().is_some());
    }
}

//! Lock-free SPSC ring buffer algorithm.
//!
//! Head and tail are free-running counters; a slot index is the counter
//! masked by `N - 1`, which is why `N` must be a power of two. The
//! difference `head - tail` (wrapping) is the number of occupied slots, so
//! all `N` slots are usable.
//!
//! # Safety
//!
//! [`Ring::push`] and [`Ring::pop`] are unsafe because the caller must uphold
//! the SPSC invariant: at most one thread pushes and at most one thread pops
//! at any time.

use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Role marker: fields owned exclusively by the producer.
pub struct ProducerRole;

/// Role marker: fields owned exclusively by the consumer.
pub struct ConsumerRole;

/// Role marker: buffer slots whose ownership transfers via the SPSC protocol.
pub struct SlotRole;

/// Interior-mutable cell tagged with the role that may touch it.
///
/// The `Role` parameter has no runtime effect; it keeps producer-local,
/// consumer-local and slot cells from being confused for one another.
#[repr(transparent)]
pub struct SpscCell<T, Role>(UnsafeCell<T>, PhantomData<Role>);

impl<T, Role> SpscCell<T, Role> {
    pub const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value), PhantomData)
    }

    pub const fn get(&self) -> *mut T {
        self.0.get()
    }
}

// SAFETY: each cell is accessed by exactly one side at a time. Producer and
// consumer caches are touched only by their owner; slots are handed between
// the two by the Release/Acquire publication of head and tail.
unsafe impl<T: Send, Role> Sync for SpscCell<T, Role> {}
unsafe impl<T: Send, Role> Send for SpscCell<T, Role> {}

pub type ProducerCache<T> = SpscCell<T, ProducerRole>;
pub type ConsumerCache<T> = SpscCell<T, ConsumerRole>;
pub type SlotCell<T> = SpscCell<T, SlotRole>;

/// Producer-side state: head counter and the last tail it observed.
#[repr(C)]
#[repr(align(64))]
pub struct ProducerState {
    /// Count of items ever pushed. Written by producer, read by consumer.
    pub head: AtomicUsize,
    /// Producer's cached copy of `tail`, refreshed only when the ring looks full.
    pub cached_tail: ProducerCache<usize>,
}

impl ProducerState {
    pub const fn new() -> Self {
        Self {
            head: AtomicUsize::new(0),
            cached_tail: ProducerCache::new(0),
        }
    }
}

/// Consumer-side state: tail counter and the last head it observed.
#[repr(C)]
#[repr(align(64))]
pub struct ConsumerState {
    /// Count of items ever popped. Written by consumer, read by producer.
    pub tail: AtomicUsize,
    /// Consumer's cached copy of `head`, refreshed only when the ring looks empty.
    pub cached_head: ConsumerCache<usize>,
}

impl ConsumerState {
    pub const fn new() -> Self {
        Self {
            tail: AtomicUsize::new(0),
            cached_head: ConsumerCache::new(0),
        }
    }
}

#[repr(C)]
pub struct Slot<T> {
    pub value: SlotCell<MaybeUninit<T>>,
}

/// Fixed-capacity ring of `N` slots.
#[repr(C)]
pub struct Ring<T, const N: usize> {
    producer: ProducerState,
    consumer: ConsumerState,
    buffer: [Slot<T>; N],
}

impl<T, const N: usize> Ring<T, N> {
    const MASK: usize = N - 1;

    /// Compile-time assertion that `N` is a non-zero power of two.
    pub const CAPACITY_OK: () = assert!(
        N.is_power_of_two(),
        "SPSC capacity must be a non-zero power of two"
    );

    pub fn new() -> Self {
        let () = Self::CAPACITY_OK;
        Self {
            producer: ProducerState::new(),
            consumer: ConsumerState::new(),
            // SAFETY: every slot is a `MaybeUninit`, which has no validity
            // requirement, so an uninitialized array of them is sound.
            buffer: unsafe { MaybeUninit::<[Slot<T>; N]>::uninit().assume_init() },
        }
    }

    /// Attempts to enqueue `item`, handing it back if the ring is full.
    ///
    /// # Safety
    ///
    /// Only one thread may call `push` at a time.
    #[inline]
    pub unsafe fn push(&self, item: T) -> Result<(), T> {
        // Only this side writes head.
        let head = self.producer.head.load(Ordering::Relaxed);

        // SAFETY: the producer is the only reader and writer of cached_tail.
        let mut cached_tail = unsafe { *self.producer.cached_tail.get() };

        if head.wrapping_sub(cached_tail) >= N {
            // Acquire pairs with the consumer's Release of tail: once we see
            // the slot freed, the consumer has finished reading it.
            cached_tail = self.consumer.tail.load(Ordering::Acquire);
            // SAFETY: as above.
            unsafe { *self.producer.cached_tail.get() = cached_tail };

            if head.wrapping_sub(cached_tail) >= N {
                return Err(item);
            }
        }

        // SAFETY: head - tail < N, so the slot at head is not visible to the
        // consumer until head is published below. The mask keeps the index
        // in bounds.
        unsafe {
            self.buffer[head & Self::MASK]
                .value
                .get()
                .write(MaybeUninit::new(item));
        }

        // Release pairs with the consumer's Acquire of head: the slot write
        // above happens-before the consumer reads it.
        self.producer
            .head
            .store(head.wrapping_add(1), Ordering::Release);

        Ok(())
    }

    /// Dequeues the oldest item, or `None` if the ring is empty.
    ///
    /// # Safety
    ///
    /// Only one thread may call `pop` at a time.
    #[inline]
    pub unsafe fn pop(&self) -> Option<T> {
        let tail = self.consumer.tail.load(Ordering::Relaxed);

        // SAFETY: the consumer is the only reader and writer of cached_head.
        let mut cached_head = unsafe { *self.consumer.cached_head.get() };

        if cached_head == tail {
            cached_head = self.producer.head.load(Ordering::Acquire);
            // SAFETY: as above.
            unsafe { *self.consumer.cached_head.get() = cached_head };

            if cached_head == tail {
                return None;
            }
        }

        // SAFETY: head != tail, so the producer initialized this slot and
        // published it with Release before we observed head with Acquire. It
        // will not write the slot again until tail moves past it.
        let item = unsafe {
            self.buffer[tail & Self::MASK]
                .value
                .get()
                .read()
                .assume_init()
        };

        self.consumer
            .tail
            .store(tail.wrapping_add(1), Ordering::Release);

        Some(item)
    }

    /// Number of occupied slots. Exact only when neither side is running.
    pub fn len(&self) -> usize {
        let tail = self.consumer.tail.load(Ordering::Acquire);
        let head = self.producer.head.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }
}

impl<T, const N: usize> Drop for Ring<T, N> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` rules out any concurrent push or pop.
        while unsafe { self.pop() }.is_some() {}
    }
}

// SAFETY: the ring owns its items; moving it moves them.
unsafe impl<T: Send, const N: usize> Send for Ring<T, N> {}

// SAFETY: shared access is mediated by the head/tail atomics and the SPSC
// contract documented on push and pop.
unsafe impl<T: Send, const N: usize> Sync for Ring<T, N> {}

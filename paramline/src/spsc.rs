//! Lock-free bounded SPSC queue for inter-thread messages.
//!
//! - [`Producer`]: write end, exactly one per queue
//! - [`Consumer`]: read end, exactly one per queue
//! - No mutexes, no syscalls and no allocation after [`channel`] returns
//!
//! ```
//! use paramline::spsc;
//!
//! let (tx, rx) = spsc::channel::<u64, 1024>();
//!
//! tx.try_push(42).expect("queue full");
//! assert_eq!(rx.try_pop(), Some(42));
//! assert_eq!(rx.try_pop(), None);
//! ```
//!
//! The capacity must be a non-zero power of two; anything else fails to
//! build:
//!
//! ```compile_fail
//! let (_tx, _rx) = paramline::spsc::channel::<u8, 3>();
//! ```
//!
//! Neither end is `Clone` or `Sync`, so a second concurrent producer or
//! consumer cannot be written in safe code. Sharing one end between threads
//! is rejected:
//!
//! ```compile_fail
//! let (tx, _rx) = paramline::spsc::channel::<u32, 8>();
//! std::thread::scope(|s| {
//!     s.spawn(|| tx.try_push(1));
//!     s.spawn(|| tx.try_push(2));
//! });
//! ```
//!
//! ```compile_fail
//! let (_tx, rx) = paramline::spsc::channel::<u32, 8>();
//! std::thread::scope(|s| {
//!     s.spawn(|| rx.try_pop());
//!     s.spawn(|| rx.try_pop());
//! });
//! ```
//!
//! and so is duplicating one:
//!
//! ```compile_fail
//! fn duplicate<T: Clone>(end: &T) -> T {
//!     end.clone()
//! }
//! let (tx, _rx) = paramline::spsc::channel::<u32, 8>();
//! let _second = duplicate(&tx);
//! ```
//!
//! ```compile_fail
//! fn duplicate<T: Clone>(end: &T) -> T {
//!     end.clone()
//! }
//! let (_tx, rx) = paramline::spsc::channel::<u32, 8>();
//! let _second = duplicate(&rx);
//! ```
//!
//! Moving each end to its own thread is the supported shape:
//!
//! ```
//! let (tx, rx) = paramline::spsc::channel::<u32, 8>();
//! std::thread::scope(|s| {
//!     s.spawn(move || tx.try_push(1));
//! });
//! assert_eq!(rx.try_pop(), Some(1));
//! ```

mod ring;

use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use minstant::Instant;

use ring::Ring;

/// Timeout for the spinning `*_blocking` helpers.
#[derive(Debug, Clone, Copy)]
pub enum Timeout {
    /// Wait indefinitely.
    Infinite,
    /// Wait for at most the specified duration.
    Duration(Duration),
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

impl Timeout {
    fn deadline(self) -> Option<Instant> {
        match self {
            Self::Infinite => None,
            Self::Duration(d) => Some(Instant::now() + d),
        }
    }
}

/// Opts a type out of `Sync` while leaving it `Send`.
type PhantomUnsync = PhantomData<Cell<&'static ()>>;

/// Write end of an SPSC queue.
///
/// `Send` but not `Sync`: it can move to the producer thread, but `&Producer`
/// cannot be shared for concurrent pushes.
pub struct Producer<T: Send, const N: usize> {
    ring: Arc<Ring<T, N>>,
    _unsync: PhantomUnsync,
}

/// Read end of an SPSC queue. Same thread-safety rules as [`Producer`].
pub struct Consumer<T: Send, const N: usize> {
    ring: Arc<Ring<T, N>>,
    _unsync: PhantomUnsync,
}

/// Creates a queue of capacity `N` and returns its two ends.
///
/// The ring lives until both ends are dropped; items still queued at that
/// point are dropped with it.
#[must_use]
pub fn channel<T: Send, const N: usize>() -> (Producer<T, N>, Consumer<T, N>) {
    let () = Ring::<T, N>::CAPACITY_OK;

    let ring = Arc::new(Ring::new());

    let producer = Producer {
        ring: Arc::clone(&ring),
        _unsync: PhantomData,
    };

    let consumer = Consumer {
        ring,
        _unsync: PhantomData,
    };

    (producer, consumer)
}

impl<T: Send, const N: usize> Producer<T, N> {
    /// Enqueues `item` if there is room (wait-free).
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` if the queue is full. Nothing already queued is
    /// touched.
    #[inline]
    pub fn try_push(&self, item: T) -> Result<(), T> {
        // SAFETY: this is the only Producer for the ring and it is not Sync.
        unsafe { self.ring.push(item) }
    }

    /// Spins until there is room, then pushes.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` on timeout.
    pub fn push_blocking(&self, mut item: T, timeout: Timeout) -> Result<(), T> {
        let deadline = timeout.deadline();
        loop {
            match self.try_push(item) {
                Ok(()) => return Ok(()),
                Err(returned) => {
                    item = returned;
                    if let Some(dl) = deadline
                        && Instant::now() > dl
                    {
                        return Err(item);
                    }
                    std::hint::spin_loop();
                }
            }
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Items currently queued, as seen from this side.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() >= N
    }
}

impl<T: Send, const N: usize> Consumer<T, N> {
    /// Dequeues the oldest item, or `None` if the queue is empty (wait-free).
    #[inline]
    #[must_use]
    pub fn try_pop(&self) -> Option<T> {
        // SAFETY: this is the only Consumer for the ring and it is not Sync.
        unsafe { self.ring.pop() }
    }

    /// Spins until an item is available, then pops. `None` on timeout.
    #[must_use]
    pub fn pop_blocking(&self, timeout: Timeout) -> Option<T> {
        let deadline = timeout.deadline();
        loop {
            if let Some(item) = self.try_pop() {
                return Some(item);
            }
            if let Some(dl) = deadline
                && Instant::now() > dl
            {
                return None;
            }
            std::hint::spin_loop();
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Items currently queued, as seen from this side.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

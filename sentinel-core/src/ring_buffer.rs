//! Lock-free single-producer/single-consumer byte ring
//!
//! The ring is built over caller-owned storage whose size is a power of two,
//! so cursors wrap with a mask. One slot is always left empty: `head == tail`
//! means empty and `head + 1 == tail` (masked) means full, so the usable
//! capacity is `size - 1`.
//!
//! `head` is only ever stored by the producer and `tail` only by the
//! consumer. Each side publishes its cursor with `Release` after touching the
//! payload slot and reads the other side's cursor with `Acquire`, so a
//! consumer never sees an advanced `head` before the byte behind it.
//!
//! Storage is a slice of [`AtomicU8`] so that the producer running in
//! interrupt context and the consumer in the main loop can share it without
//! `unsafe`. Byte accesses are `Relaxed`; the cursor fences order them.

use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::config::validate_ring_size;
use crate::error::{BufferError, ConfigError};

/// Fixed-capacity circular byte queue
pub struct RingBuffer<'a> {
    storage: &'a [AtomicU8],
    mask: usize,
    /// Next slot to write (producer-owned)
    head: AtomicUsize,
    /// Next slot to read (consumer-owned)
    tail: AtomicUsize,
}

impl<'a> RingBuffer<'a> {
    /// Create a ring over the first `size` slots of `storage`
    ///
    /// Fails without side effects if `storage` is empty, or `size` is zero,
    /// one, not a power of two, or larger than `storage`.
    ///
    /// A size of one is a power of two, but with one slot reserved the ring
    /// would be permanently full, so it is rejected with
    /// [`ConfigError::NoUsableCapacity`] instead of being accepted.
    pub fn new(storage: &'a [AtomicU8], size: usize) -> Result<Self, ConfigError> {
        if storage.is_empty() {
            return Err(ConfigError::MissingStorage);
        }
        validate_ring_size(size)?;
        if storage.len() < size {
            return Err(ConfigError::StorageTooSmall);
        }

        Ok(Self {
            storage: &storage[..size],
            mask: size - 1,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        })
    }

    /// Split into the one producer and the one consumer handle
    ///
    /// Holding `&mut self` for the lifetime of both handles is what keeps
    /// a second producer or consumer from appearing.
    pub fn split(&mut self) -> (Producer<'_, 'a>, Consumer<'_, 'a>) {
        let ring: &Self = self;
        (Producer { ring }, Consumer { ring })
    }

    /// Push a byte with exclusive access to both ends
    pub fn push(&mut self, byte: u8) -> Result<(), BufferError> {
        self.enqueue(byte)
    }

    /// Pop a byte with exclusive access to both ends
    pub fn pop(&mut self) -> Result<u8, BufferError> {
        self.dequeue()
    }

    /// `head == tail`
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// `(head + 1) & mask == tail`
    pub fn is_full(&self) -> bool {
        let head = self.head.load(Ordering::Acquire);
        ((head + 1) & self.mask) == self.tail.load(Ordering::Acquire)
    }

    /// Number of bytes waiting
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) & self.mask
    }

    /// Usable capacity (`size - 1`)
    pub fn capacity(&self) -> usize {
        self.mask
    }

    /// Current write cursor
    pub fn head(&self) -> usize {
        self.head.load(Ordering::Acquire)
    }

    /// Current read cursor
    pub fn tail(&self) -> usize {
        self.tail.load(Ordering::Acquire)
    }

    fn enqueue(&self, byte: u8) -> Result<(), BufferError> {
        // Only this side stores head, so a relaxed read of our own cursor is exact.
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) & self.mask;
        if next == self.tail.load(Ordering::Acquire) {
            return Err(BufferError::Full);
        }

        self.storage[head].store(byte, Ordering::Relaxed);
        self.head.store(next, Ordering::Release);
        Ok(())
    }

    fn dequeue(&self) -> Result<u8, BufferError> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return Err(BufferError::Empty);
        }

        let byte = self.storage[tail].load(Ordering::Relaxed);
        self.tail.store((tail + 1) & self.mask, Ordering::Release);
        Ok(byte)
    }
}

/// Write end of a [`RingBuffer`], owned by the interrupt/DMA context
pub struct Producer<'r, 'a> {
    ring: &'r RingBuffer<'a>,
}

impl Producer<'_, '_> {
    /// Append a byte, or report [`BufferError::Full`] without touching the ring
    pub fn push(&mut self, byte: u8) -> Result<(), BufferError> {
        self.ring.enqueue(byte)
    }

    /// Check if the next push would fail
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Number of bytes not yet consumed
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Check if the consumer has drained everything
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

/// Read end of a [`RingBuffer`], owned by the main loop
pub struct Consumer<'r, 'a> {
    ring: &'r RingBuffer<'a>,
}

impl Consumer<'_, '_> {
    /// Take the oldest byte, or report [`BufferError::Empty`]
    pub fn pop(&mut self) -> Result<u8, BufferError> {
        self.ring.dequeue()
    }

    /// Check if there is nothing to pop
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Check if the producer is currently blocked
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Number of bytes waiting
    pub fn len(&self) -> usize {
        self.ring.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;
    use std::vec::Vec;

    fn storage<const N: usize>() -> [AtomicU8; N] {
        core::array::from_fn(|_| AtomicU8::new(0))
    }

    #[test]
    fn test_init_rejects_bad_sizes() {
        let mem = storage::<16>();

        assert_eq!(RingBuffer::new(&mem, 0).err(), Some(ConfigError::ZeroSize));
        assert_eq!(RingBuffer::new(&mem, 12).err(), Some(ConfigError::NotPowerOfTwo));
        assert_eq!(RingBuffer::new(&mem, 1).err(), Some(ConfigError::NoUsableCapacity));
        assert_eq!(RingBuffer::new(&mem, 32).err(), Some(ConfigError::StorageTooSmall));
        assert_eq!(RingBuffer::new(&[], 16).err(), Some(ConfigError::MissingStorage));
    }

    #[test]
    fn test_init_starts_empty() {
        let mem = storage::<256>();
        let rb = RingBuffer::new(&mem, 256).unwrap();

        assert!(rb.is_empty());
        assert!(!rb.is_full());
        assert_eq!(rb.capacity(), 255);
        assert_eq!(rb.head(), 0);
        assert_eq!(rb.tail(), 0);
    }

    #[test]
    fn test_fifo_order() {
        let mem = storage::<16>();
        let mut rb = RingBuffer::new(&mem, 16).unwrap();

        for v in 1..=15u8 {
            rb.push(v).unwrap();
        }
        for v in 1..=15u8 {
            assert_eq!(rb.pop(), Ok(v));
        }
        assert_eq!(rb.pop(), Err(BufferError::Empty));
    }

    #[test]
    fn test_wrap_around() {
        let mem = storage::<8>();
        let mut rb = RingBuffer::new(&mem, 8).unwrap();

        for v in 0..7u8 {
            rb.push(v).unwrap();
        }
        for v in 0..7u8 {
            assert_eq!(rb.pop(), Ok(v));
        }
        assert_eq!(rb.head(), 7);
        assert_eq!(rb.tail(), 7);

        rb.push(0xAB).unwrap();
        assert_eq!(rb.head(), 0);
        assert_eq!(rb.pop(), Ok(0xAB));
        assert_eq!(rb.tail(), 0);
    }

    #[test]
    fn test_full_buffer_rejection() {
        let mem = storage::<8>();
        let mut rb = RingBuffer::new(&mem, 8).unwrap();

        for v in 0..7u8 {
            rb.push(v).unwrap();
        }
        assert!(rb.is_full());

        let head = rb.head();
        let tail = rb.tail();
        assert_eq!(rb.push(99), Err(BufferError::Full));
        assert_eq!(rb.head(), head);
        assert_eq!(rb.tail(), tail);
        assert_eq!(rb.len(), 7);

        assert_eq!(rb.pop(), Ok(0));
        assert!(rb.push(7).is_ok());
        assert!(rb.is_full());
    }

    #[test]
    fn test_split_handles() {
        let mem = storage::<4>();
        let mut rb = RingBuffer::new(&mem, 4).unwrap();
        let (mut tx, mut rx) = rb.split();

        assert!(rx.is_empty());
        tx.push(b'a').unwrap();
        tx.push(b'b').unwrap();
        tx.push(b'c').unwrap();
        assert!(tx.is_full());
        assert_eq!(rx.len(), 3);

        assert_eq!(rx.pop(), Ok(b'a'));
        assert!(!tx.is_full());
        assert_eq!(rx.pop(), Ok(b'b'));
        assert_eq!(rx.pop(), Ok(b'c'));
        assert_eq!(rx.pop(), Err(BufferError::Empty));
    }

    #[test]
    fn test_concurrent_producer_consumer() {
        const COUNT: usize = 20_000;
        let mem = storage::<64>();
        let mut rb = RingBuffer::new(&mem, 64).unwrap();
        let (mut tx, mut rx) = rb.split();

        std::thread::scope(|s| {
            s.spawn(move || {
                for i in 0..COUNT {
                    while tx.push(i as u8).is_err() {
                        std::hint::spin_loop();
                    }
                }
            });

            let mut received = 0usize;
            while received < COUNT {
                match rx.pop() {
                    Ok(byte) => {
                        assert_eq!(byte, received as u8);
                        received += 1;
                    }
                    Err(_) => std::hint::spin_loop(),
                }
            }
        });
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push(u8),
        Pop,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![any::<u8>().prop_map(Op::Push), Just(Op::Pop)]
    }

    proptest! {
        #[test]
        fn prop_matches_bounded_queue(
            size_log2 in 1u32..7,
            ops in proptest::collection::vec(op(), 0..400),
        ) {
            let size = 1usize << size_log2;
            let mem: Vec<AtomicU8> = (0..size).map(|_| AtomicU8::new(0)).collect();
            let mut rb = RingBuffer::new(&mem, size).unwrap();
            let mut model = VecDeque::new();
            let mut pushed = 0usize;
            let mut popped = 0usize;

            for op in ops {
                match op {
                    Op::Push(v) => match rb.push(v) {
                        Ok(()) => {
                            prop_assert!(model.len() < size - 1);
                            model.push_back(v);
                            pushed += 1;
                        }
                        Err(e) => {
                            prop_assert_eq!(e, BufferError::Full);
                            prop_assert_eq!(model.len(), size - 1);
                        }
                    },
                    Op::Pop => match rb.pop() {
                        Ok(v) => {
                            prop_assert_eq!(Some(v), model.pop_front());
                            popped += 1;
                        }
                        Err(e) => {
                            prop_assert_eq!(e, BufferError::Empty);
                            prop_assert!(model.is_empty());
                        }
                    },
                }

                prop_assert!(!(rb.is_full() && rb.is_empty()));
                prop_assert!(popped <= pushed);
                prop_assert_eq!(rb.len(), model.len());
            }
        }
    }
}

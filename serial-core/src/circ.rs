//! Transmit ring shared between the tty layer and a UART driver.
//!
//! The ring has exactly one producer and one consumer:
//! - the tty layer writes bytes and advances `head`,
//! - the driver reads bytes and advances `tail`.
//!
//! Each index has a single writer, so no lock is needed. Indices are published
//! with release stores and observed with acquire loads, which makes the byte
//! stores of one side visible to the other before the index moves.
//!
//! One slot is always left free to tell a full ring from an empty one, so a
//! ring of capacity `N` holds at most `N - 1` bytes.
//!
//! ```rust
//! # use serial_core::circ::CircBuf;
//! #
//! let xmit = CircBuf::new(4);
//! assert_eq!(xmit.write(b"abcd"), 3);
//! assert_eq!(xmit.len(), 3);
//!
//! assert_eq!(xmit.front(), Some(b'a'));
//! xmit.advance(1);
//! assert_eq!(xmit.pop(), Some(b'b'));
//! assert_eq!(xmit.pop(), Some(b'c'));
//! assert!(xmit.is_empty());
//! ```

use alloc::boxed::Box;
use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Default transmit ring size (one page).
pub const UART_XMIT_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CircFullError(pub u8);

impl core::fmt::Display for CircFullError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Transmit ring is full")
    }
}

impl core::error::Error for CircFullError {}

/// Single-producer single-consumer byte ring.
pub struct CircBuf {
    buf: Box<[AtomicU8]>,
    /// Next slot the producer writes.
    head: AtomicUsize,
    /// Next slot the consumer reads.
    tail: AtomicUsize,
}

impl core::fmt::Debug for CircBuf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CircBuf")
            .field("capacity", &self.capacity())
            .field("head", &self.head())
            .field("tail", &self.tail())
            .finish()
    }
}

impl Default for CircBuf {
    fn default() -> Self {
        Self::new(UART_XMIT_SIZE)
    }
}

impl CircBuf {
    #[must_use]
    /// Creates an empty ring.
    ///
    /// ## Panics
    ///
    /// Panics if `capacity` is not a power of two or is smaller than 2.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two() && capacity >= 2,
            "Transmit ring size must be a power of two"
        );
        Self {
            buf: (0..capacity).map(|_| AtomicU8::new(0)).collect(),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    #[inline]
    fn mask(&self) -> usize {
        self.capacity() - 1
    }

    #[must_use]
    #[inline]
    pub fn head(&self) -> usize {
        self.head.load(Ordering::Acquire)
    }

    #[must_use]
    #[inline]
    pub fn tail(&self) -> usize {
        self.tail.load(Ordering::Acquire)
    }

    #[must_use]
    #[inline]
    /// Number of bytes waiting to be consumed.
    pub fn len(&self) -> usize {
        self.head().wrapping_sub(self.tail()) & self.mask()
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head() == self.tail()
    }

    #[must_use]
    #[inline]
    /// Number of bytes the producer can still write.
    pub fn space(&self) -> usize {
        self.mask() - self.len()
    }

    /// Appends a byte. Producer side only.
    pub fn push(&self, byte: u8) -> Result<(), CircFullError> {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) & self.mask();
        if next == self.tail.load(Ordering::Acquire) {
            return Err(CircFullError(byte));
        }

        self.buf[head].store(byte, Ordering::Relaxed);
        self.head.store(next, Ordering::Release);
        Ok(())
    }

    /// Appends as many bytes as fit and returns how many were taken.
    /// Producer side only.
    pub fn write(&self, bytes: &[u8]) -> usize {
        bytes
            .iter()
            .take_while(|&&byte| self.push(byte).is_ok())
            .count()
    }

    #[must_use]
    /// Returns the byte at `tail` without consuming it. Consumer side only.
    pub fn front(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }
        Some(self.buf[tail].load(Ordering::Relaxed))
    }

    /// Consumes `count` bytes. Consumer side only.
    pub fn advance(&self, count: usize) {
        debug_assert!(count <= self.len(), "Advancing past head");
        let tail = self.tail.load(Ordering::Relaxed);
        self.tail
            .store((tail + count) & self.mask(), Ordering::Release);
    }

    #[must_use]
    /// Consumes and returns the byte at `tail`. Consumer side only.
    pub fn pop(&self) -> Option<u8> {
        let byte = self.front()?;
        self.advance(1);
        Some(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let xmit = CircBuf::new(16);
        assert!(xmit.is_empty());
        assert_eq!(xmit.space(), 15);

        xmit.push(0x41).unwrap();
        xmit.push(0x42).unwrap();
        xmit.push(0x43).unwrap();
        assert_eq!(xmit.head(), 3);
        assert_eq!(xmit.tail(), 0);
        assert_eq!(xmit.len(), 3);

        assert_eq!(xmit.pop(), Some(0x41));
        assert_eq!(xmit.pop(), Some(0x42));
        assert_eq!(xmit.pop(), Some(0x43));
        assert_eq!(xmit.pop(), None);
        assert_eq!(xmit.tail(), 3);
    }

    #[test]
    fn test_full() {
        let xmit = CircBuf::new(4);
        assert_eq!(xmit.write(b"xyzw"), 3);
        assert_eq!(xmit.space(), 0);
        assert_eq!(xmit.push(b'!'), Err(CircFullError(b'!')));
    }

    #[test]
    fn test_wrap_around() {
        let xmit = CircBuf::new(4);
        for round in 0..10u8 {
            assert_eq!(xmit.write(&[round, round + 1]), 2);
            assert_eq!(xmit.len(), 2);
            assert_eq!(xmit.pop(), Some(round));
            assert_eq!(xmit.pop(), Some(round + 1));
        }
        assert!(xmit.is_empty());
        assert!(xmit.head() < xmit.capacity());
    }

    #[test]
    fn test_front_does_not_consume() {
        let xmit = CircBuf::new(8);
        xmit.write(b"ok");
        assert_eq!(xmit.front(), Some(b'o'));
        assert_eq!(xmit.front(), Some(b'o'));
        xmit.advance(2);
        assert_eq!(xmit.front(), None);
    }

    #[test]
    #[should_panic = "Transmit ring size must be a power of two"]
    fn test_reject_size() {
        let _ = CircBuf::new(12);
    }

    #[test]
    fn test_concurrent_producer_consumer() {
        let xmit = std::sync::Arc::new(CircBuf::new(8));
        let producer = {
            let xmit = xmit.clone();
            std::thread::spawn(move || {
                for byte in 0..=255u8 {
                    while xmit.push(byte).is_err() {
                        std::thread::yield_now();
                    }
                }
            })
        };

        let mut received = Vec::new();
        while received.len() < 256 {
            match xmit.pop() {
                Some(byte) => received.push(byte),
                None => std::thread::yield_now(),
            }
        }
        producer.join().unwrap();

        assert!(received.iter().copied().eq(0..=255u8));
    }
}

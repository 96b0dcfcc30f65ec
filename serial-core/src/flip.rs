//! Receive side of a tty port.
//!
//! Drivers insert characters one by one from interrupt context, then push the
//! batch to make it visible to readers. Characters are staged in a pending
//! queue until `push` moves them to the readable queue.
//!
//! `push` only *tries* to take the readable queue: a reader preempted while
//! holding it must not deadlock the interrupt handler. A push that loses that
//! race is remembered, and the next reader publishes the pending characters
//! itself, so a batch is never stranded waiting for another interrupt.

use alloc::collections::VecDeque;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use spin::{Mutex, MutexGuard};

/// Default input queue capacity.
pub const FLIP_BUFFER_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
/// Per-character receive status.
pub enum CharFlag {
    Normal = 0,
    Break = 1,
    Frame = 2,
    Parity = 3,
    Overrun = 4,
}

#[derive(Debug)]
pub struct FlipBuffer {
    capacity: usize,
    /// Characters held by the buffer, pending or readable.
    used: AtomicUsize,
    pending: Mutex<VecDeque<(u8, CharFlag)>>,
    readable: Mutex<VecDeque<(u8, CharFlag)>>,
    /// Number of successful pushes, i.e. reader wake-ups.
    pushes: AtomicUsize,
    /// A push found the readable queue busy.
    missed: AtomicBool,
}

impl Default for FlipBuffer {
    fn default() -> Self {
        Self::new(FLIP_BUFFER_SIZE)
    }
}

impl FlipBuffer {
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            used: AtomicUsize::new(0),
            pending: Mutex::new(VecDeque::new()),
            readable: Mutex::new(VecDeque::new()),
            pushes: AtomicUsize::new(0),
            missed: AtomicBool::new(false),
        }
    }

    #[must_use]
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stages one character.
    ///
    /// Returns `false` if the buffer is full and the character was dropped.
    pub fn insert_char(&self, ch: u8, flag: CharFlag) -> bool {
        let reserved = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.capacity).then_some(used + 1)
            })
            .is_ok();
        if reserved {
            self.pending.lock().push_back((ch, flag));
        }
        reserved
    }

    /// Publishes staged characters to readers.
    ///
    /// Returns `false` if the readable queue was busy. The characters stay
    /// pending until the next push or the next read.
    pub fn push(&self) -> bool {
        let Some(mut readable) = self.readable.try_lock() else {
            self.missed.store(true, Ordering::Release);
            return false;
        };
        self.publish(&mut readable);
        true
    }

    fn publish(&self, readable: &mut VecDeque<(u8, CharFlag)>) {
        self.missed.store(false, Ordering::Release);
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            return;
        }
        readable.extend(pending.drain(..));
        self.pushes.fetch_add(1, Ordering::Release);
    }

    /// Locks the readable queue, completing a push that found it busy.
    fn readable(&self) -> MutexGuard<'_, VecDeque<(u8, CharFlag)>> {
        let mut readable = self.readable.lock();
        if self.missed.load(Ordering::Acquire) {
            self.publish(&mut readable);
        }
        readable
    }

    #[must_use]
    /// Number of characters inserted but not yet pushed.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    #[must_use]
    /// Number of characters readers can consume.
    pub fn available(&self) -> usize {
        self.readable().len()
    }

    #[must_use]
    pub fn pushes(&self) -> usize {
        self.pushes.load(Ordering::Acquire)
    }

    /// Reads published bytes into `buf`, dropping their flags.
    pub fn read(&self, buf: &mut [u8]) -> usize {
        let mut readable = self.readable();
        let count = buf.len().min(readable.len());
        for (slot, (ch, _)) in buf.iter_mut().zip(readable.drain(..count)) {
            *slot = ch;
        }
        self.used.fetch_sub(count, Ordering::AcqRel);
        count
    }

    #[must_use]
    /// Reads one published character with its flag.
    pub fn read_flagged(&self) -> Option<(u8, CharFlag)> {
        let entry = self.readable().pop_front()?;
        self.used.fetch_sub(1, Ordering::AcqRel);
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_then_push() {
        let flip = FlipBuffer::new(8);
        assert!(flip.insert_char(0x0D, CharFlag::Normal));
        assert!(flip.insert_char(0x0A, CharFlag::Normal));
        assert_eq!(flip.pending(), 2);
        assert_eq!(flip.available(), 0);

        assert!(flip.push());
        assert_eq!(flip.pending(), 0);
        assert_eq!(flip.pushes(), 1);

        let mut buf = [0; 4];
        assert_eq!(flip.read(&mut buf), 2);
        assert_eq!(&buf[..2], &[0x0D, 0x0A]);
    }

    #[test]
    fn test_capacity() {
        let flip = FlipBuffer::new(2);
        assert!(flip.insert_char(1, CharFlag::Normal));
        assert!(flip.insert_char(2, CharFlag::Normal));
        assert!(!flip.insert_char(3, CharFlag::Normal));

        flip.push();
        assert_eq!(flip.read_flagged(), Some((1, CharFlag::Normal)));
        assert!(flip.insert_char(4, CharFlag::Overrun));
        flip.push();
        assert_eq!(flip.read_flagged(), Some((2, CharFlag::Normal)));
        assert_eq!(flip.read_flagged(), Some((4, CharFlag::Overrun)));
        assert_eq!(flip.read_flagged(), None);
    }

    #[test]
    fn test_push_empty_is_not_a_wakeup() {
        let flip = FlipBuffer::new(2);
        assert!(flip.push());
        assert_eq!(flip.pushes(), 0);
    }

    #[test]
    fn test_push_while_reader_busy() {
        let flip = FlipBuffer::new(4);
        flip.insert_char(b'a', CharFlag::Normal);

        let reader = flip.readable.lock();
        assert!(!flip.push());
        drop(reader);

        assert_eq!(flip.pending(), 1);
        assert!(flip.push());
        assert_eq!(flip.available(), 1);
    }

    #[test]
    fn test_reader_completes_missed_push() {
        let flip = FlipBuffer::new(4);

        let reader = flip.readable.lock();
        assert!(flip.insert_char(b'Z', CharFlag::Normal));
        assert!(!flip.push());
        drop(reader);

        // No further push: the reader picks the batch up on its own.
        let mut buf = [0; 4];
        assert_eq!(flip.read(&mut buf), 1);
        assert_eq!(buf[0], b'Z');
        assert_eq!(flip.pending(), 0);
        assert_eq!(flip.pushes(), 1);
    }

    #[test]
    fn test_unpushed_chars_stay_hidden() {
        let flip = FlipBuffer::new(4);
        assert!(flip.insert_char(b'a', CharFlag::Normal));
        assert_eq!(flip.read_flagged(), None);
        assert_eq!(flip.pending(), 1);
    }

    #[test]
    fn test_flag_values() {
        assert_eq!(u8::from(CharFlag::Normal), 0);
        assert_eq!(CharFlag::try_from(4u8).ok(), Some(CharFlag::Overrun));
        assert!(CharFlag::try_from(5u8).is_err());
    }
}

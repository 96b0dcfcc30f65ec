//! Operations a UART driver exposes to the serial core.

use crate::UartResult;
use core::sync::atomic::{AtomicU32, Ordering};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Modem control lines driven by the host.
    pub struct ModemControl: u32 {
        const DTR = 0x0002;
        const RTS = 0x0004;
        const OUT1 = 0x2000;
        const OUT2 = 0x4000;
        const LOOP = 0x8000;
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Line settings requested by the tty layer.
pub struct Termios {
    pub baud: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
}

impl Default for Termios {
    fn default() -> Self {
        Self {
            baud: 115_200,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
        }
    }
}

/// A port the serial core can drive.
///
/// Every method may be called from any context the serial core runs in,
/// including concurrently with the port's own interrupt handler.
pub trait UartOps: Send + Sync {
    /// Index of the port in its driver.
    fn line(&self) -> usize;

    fn is_active(&self) -> bool;

    /// Acquires the interrupt and enables the port.
    fn startup(&self) -> UartResult<()>;

    /// Disables the port and releases the interrupt.
    fn shutdown(&self) -> UartResult<()>;

    /// Starts moving bytes from the transmit ring to the hardware.
    fn start_tx(&self) -> UartResult<()>;

    /// Stops transmission and waits for the hardware to drain.
    fn stop_tx(&self) -> UartResult<()>;

    /// Stops reception. Data still in the hardware is discarded.
    fn stop_rx(&self) -> UartResult<()>;

    /// Whether the hardware has nothing left to send.
    fn tx_empty(&self) -> bool;

    fn set_mctrl(&self, mctrl: ModemControl);

    fn set_termios(&self, new: &Termios, old: Option<&Termios>);
}

#[derive(Debug, Default)]
/// Running totals of a port's traffic and errors.
pub struct PortCounters {
    tx: AtomicU32,
    rx: AtomicU32,
    overrun: AtomicU32,
    buf_overrun: AtomicU32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IcountSnapshot {
    pub tx: u32,
    pub rx: u32,
    /// Hardware receive FIFO overflows.
    pub overrun: u32,
    /// Characters dropped because the input buffer was full.
    pub buf_overrun: u32,
}

impl PortCounters {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tx: AtomicU32::new(0),
            rx: AtomicU32::new(0),
            overrun: AtomicU32::new(0),
            buf_overrun: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn add_tx(&self, count: u32) {
        self.tx.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_rx(&self, count: u32) {
        self.rx.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_overrun(&self) {
        self.overrun.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_buf_overrun(&self) {
        self.buf_overrun.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> IcountSnapshot {
        IcountSnapshot {
            tx: self.tx.load(Ordering::Relaxed),
            rx: self.rx.load(Ordering::Relaxed),
            overrun: self.overrun.load(Ordering::Relaxed),
            buf_overrun: self.buf_overrun.load(Ordering::Relaxed),
        }
    }
}

//! Owl UART register window.
//!
//! Four 32-bit registers. Control and Status are only ever touched through
//! the set/clear/test helpers, each of which performs a fresh access.

use core::ptr::NonNull;
use serial_core::mmio::{MmioRegister, ReadWrite};

/// Register offsets in the UART window.
pub struct Registers;

impl Registers {
    pub const CTL: usize = 0x0;
    pub const RXDAT: usize = 0x4;
    pub const TXDAT: usize = 0x8;
    pub const STAT: usize = 0xC;
}

/// Size of the register window in bytes.
pub const WINDOW_SIZE: usize = 0x10;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// CTL register bits.
    pub struct Control: u32 {
        /// TX IRQ enable
        const TXIE = 1 << 19;
        /// RX IRQ enable
        const RXIE = 1 << 18;
        /// UART enable
        const EN = 1 << 15;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    /// STAT register bits.
    ///
    /// `TX_PENDING` and `RX_PENDING` are write-one-to-clear.
    pub struct Status: u32 {
        /// Transmitter busy
        const TX_BUSY = 1 << 17;
        const TX_FIFO_EMPTY = 1 << 10;
        const RX_FIFO_FULL = 1 << 9;
        const TX_FIFO_FULL = 1 << 6;
        const RX_FIFO_EMPTY = 1 << 5;
        /// TX IRQ pending
        const TX_PENDING = 1 << 1;
        /// RX IRQ pending
        const RX_PENDING = 1 << 0;

        const _ = !0;
    }
}

/// Word access to a UART register window.
///
/// Implementors only provide raw reads and writes; every helper is built on
/// top of them and performs a real access each time.
pub trait RegisterIo: Send + Sync {
    fn read(&self, offset: usize) -> u32;

    fn write(&self, offset: usize, value: u32);

    #[inline]
    fn set_bit(&self, offset: usize, mask: u32) {
        self.write(offset, self.read(offset) | mask);
    }

    #[inline]
    fn clear_bit(&self, offset: usize, mask: u32) {
        self.write(offset, self.read(offset) & !mask);
    }

    #[inline]
    /// Whether any bit of `mask` is set.
    fn test_bit(&self, offset: usize, mask: u32) -> bool {
        self.read(offset) & mask != 0
    }

    #[inline]
    fn control(&self) -> Control {
        Control::from_bits_truncate(self.read(Registers::CTL))
    }

    #[inline]
    fn set_control(&self, bits: Control) {
        self.set_bit(Registers::CTL, bits.bits());
    }

    #[inline]
    fn clear_control(&self, bits: Control) {
        self.clear_bit(Registers::CTL, bits.bits());
    }

    #[inline]
    fn test_control(&self, bits: Control) -> bool {
        self.test_bit(Registers::CTL, bits.bits())
    }

    #[inline]
    fn status(&self) -> Status {
        Status::from_bits_retain(self.read(Registers::STAT))
    }

    #[inline]
    fn test_status(&self, bits: Status) -> bool {
        self.test_bit(Registers::STAT, bits.bits())
    }

    #[inline]
    /// Clears pending bits by writing them back as ones.
    ///
    /// This is a read-modify-write of STAT: every pending bit set at the time
    /// of the read is cleared along with `bits`.
    fn ack_status(&self, bits: Status) {
        self.set_bit(Registers::STAT, bits.bits());
    }

    #[inline]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "Received data is the low byte of RXDAT"
    )]
    fn read_rx(&self) -> u8 {
        self.read(Registers::RXDAT) as u8
    }

    #[inline]
    fn write_tx(&self, byte: u8) {
        self.write(Registers::TXDAT, u32::from(byte));
    }
}

#[derive(Debug)]
/// Memory-mapped register window of one UART.
pub struct MmioWindow {
    base: MmioRegister<ReadWrite, u32>,
}

impl MmioWindow {
    #[must_use]
    #[inline]
    /// Wraps a mapped register window.
    ///
    /// # Safety
    ///
    /// `base` must point to a device mapping of at least `WINDOW_SIZE` bytes
    /// that stays valid for the lifetime of the window.
    pub const unsafe fn new(base: NonNull<u32>) -> Self {
        Self {
            base: MmioRegister::new(base),
        }
    }

    #[must_use]
    #[inline]
    pub const fn base(&self) -> NonNull<u32> {
        self.base.as_non_null()
    }

    #[inline]
    fn register(&self, offset: usize) -> MmioRegister<ReadWrite, u32> {
        debug_assert!(
            offset < WINDOW_SIZE && offset % 4 == 0,
            "Invalid register offset"
        );
        // SAFETY: `offset` is one of the `Registers` offsets, inside the
        // window guaranteed by `MmioWindow::new`.
        unsafe { self.base.byte_add(offset) }
    }
}

impl RegisterIo for MmioWindow {
    #[inline]
    fn read(&self, offset: usize) -> u32 {
        // SAFETY: The window is mapped for the lifetime of `self`.
        unsafe { self.register(offset).read() }
    }

    #[inline]
    fn write(&self, offset: usize, value: u32) {
        // SAFETY: The window is mapped for the lifetime of `self`.
        unsafe { self.register(offset).write(value) };
    }
}

/// Masks the TX interrupt for as long as it lives.
///
/// On creation the guard records whether TX IRQ was enabled and clears it.
/// On drop it sets it again if it was enabled.
pub struct TxIrqMask<'a, W: RegisterIo + ?Sized> {
    regs: &'a W,
    was_enabled: bool,
}

impl<'a, W: RegisterIo + ?Sized> TxIrqMask<'a, W> {
    #[must_use]
    pub fn new(regs: &'a W) -> Self {
        let was_enabled = regs.test_control(Control::TXIE);
        regs.clear_control(Control::TXIE);
        Self { regs, was_enabled }
    }

    #[must_use]
    #[inline]
    pub const fn was_enabled(&self) -> bool {
        self.was_enabled
    }
}

impl<W: RegisterIo + ?Sized> Drop for TxIrqMask<'_, W> {
    fn drop(&mut self) {
        if self.was_enabled {
            self.regs.set_control(Control::TXIE);
        }
    }
}

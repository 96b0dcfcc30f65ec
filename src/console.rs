//! Polled console output on an owl UART.
//!
//! The console writes straight to the TX FIFO, bypassing the transmit ring.
//! It masks the TX interrupt for the duration of the write so the interrupt
//! handler does not refill the FIFO underneath it, then restores the mask to
//! what it was.
//!
//! A refill running on another CPU, or one interrupted by a panic, may hold
//! the port's TX lock. The console waits for it for a bounded time only and
//! writes anyway once that time is up, so output is never lost to a stuck
//! lock.

use crate::{
    config::ConsoleBinding,
    platform::IoMem,
    port::OwlPort,
    regs::{RegisterIo, Status, TxIrqMask},
};
use alloc::sync::Arc;
use serial_core::{
    UartError, UartResult,
    console::{Console, ConsoleFlags, console_write_bytes},
    driver::UartDriver,
    poll::PollBudget,
};

impl<W: RegisterIo> OwlPort<W> {
    /// Writes `s` synchronously, without interrupts.
    ///
    /// Each `\n` is preceded by `\r`. Returns once the transmitter is idle.
    /// On timeout the rest of `s` is dropped.
    pub fn console_write(&self, s: &[u8]) -> UartResult<()> {
        let poll = self.poll();

        // Give a refill in progress the chance to finish its burst.
        let lock_budget = if poll.is_bounded() {
            poll
        } else {
            PollBudget::DEFAULT
        };
        let mut tx = None;
        // Past the budget the FIFO is shared with the stalled refill.
        let _ = lock_budget.spin_until(|| {
            tx = self.tx_lock().try_lock();
            tx.is_some()
        });
        let _tx = tx;

        let _mask = TxIrqMask::new(self.regs());

        console_write_bytes(s, |ch| {
            poll.spin_until(|| !self.regs().test_status(Status::TX_FIFO_FULL))?;
            self.regs().write_tx(ch);
            Ok::<(), UartError>(())
        })?;

        // Wait until everything has been sent out.
        poll.spin_until(|| !self.regs().test_status(Status::TX_BUSY))?;
        Ok(())
    }
}

/// Console bound to one line of the owl serial driver.
pub struct OwlConsole<W: RegisterIo = IoMem> {
    name: &'static str,
    binding: ConsoleBinding,
    driver: Arc<UartDriver<OwlPort<W>>>,
}

impl<W: RegisterIo> core::fmt::Debug for OwlConsole<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OwlConsole")
            .field("name", &self.name)
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

impl<W: RegisterIo + 'static> OwlConsole<W> {
    #[must_use]
    pub fn new(binding: ConsoleBinding, driver: Arc<UartDriver<OwlPort<W>>>) -> Self {
        Self {
            name: driver.dev_name(),
            binding,
            driver,
        }
    }

    #[must_use]
    #[inline]
    pub const fn binding(&self) -> ConsoleBinding {
        self.binding
    }
}

impl<W: RegisterIo + 'static> Console for OwlConsole<W> {
    fn name(&self) -> &str {
        self.name
    }

    fn index(&self) -> usize {
        self.binding.line
    }

    fn flags(&self) -> ConsoleFlags {
        self.binding.flags
    }

    fn write(&self, bytes: &[u8]) {
        // Nothing to print on until the line is probed.
        if let Some(port) = self.driver.port(self.binding.line) {
            let _ = port.console_write(bytes);
        }
    }
}

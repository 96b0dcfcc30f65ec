//! Interrupt-driven transfer between the FIFOs and the line buffers.

use super::OwlPort;
use crate::{
    config::DEV_NAME,
    regs::{Control, RegisterIo, Status},
};
use serial_core::{flip::CharFlag, irq::IrqReturn};
use spin::MutexGuard;

impl<W: RegisterIo> OwlPort<W> {
    /// Moves bytes from the transmit ring to the TX FIFO.
    ///
    /// Stops when the ring is empty (TX IRQ off) or the FIFO is full (TX IRQ
    /// on, so that the next interrupt resumes the transfer).
    pub(crate) fn write_tx_fifo(&self, _guard: &MutexGuard<'_, ()>) {
        let xmit = self.uart.xmit();
        loop {
            let Some(byte) = xmit.front() else {
                // No data left, no IRQ needed.
                self.regs.clear_control(Control::TXIE);
                break;
            };
            if self.regs.test_status(Status::TX_FIFO_FULL) {
                self.regs.set_control(Control::TXIE);
                break;
            }
            self.regs.write_tx(byte);
            xmit.advance(1);
            self.counters.add_tx(1);
        }
    }

    /// Moves received bytes from the RX FIFO to the input buffer and wakes
    /// readers.
    fn drain_rx_fifo(&self, status: Status) {
        if status.contains(Status::RX_FIFO_FULL) {
            self.counters.add_overrun();
            log::warn!(target: "owl_serial", "{}{}: RX FIFO overrun", DEV_NAME, self.res.line);
        }

        let input = self.uart.input();
        let drained = self.poll.spin_until(|| {
            if self.regs.test_status(Status::RX_FIFO_EMPTY) {
                return true;
            }
            let ch = self.regs.read_rx();
            self.counters.add_rx(1);
            if !input.insert_char(ch, CharFlag::Normal) {
                self.counters.add_buf_overrun();
            }
            false
        });
        if drained.is_err() {
            log::warn!(
                target: "owl_serial",
                "{}{}: RX FIFO still not empty",
                DEV_NAME,
                self.res.line,
            );
        }

        if !input.push() {
            log::trace!(
                target: "owl_serial",
                "{}{}: input busy, left to the reader",
                DEV_NAME,
                self.res.line,
            );
        }
    }

    /// Services a TX or RX interrupt of this port.
    ///
    /// Both pending bits are cleared on exit, whether or not they were set
    /// when the handler started.
    pub fn handle_irq(&self) -> IrqReturn {
        let status = self.regs.status();
        log::trace!(
            target: "owl_serial",
            "{}{}: irq, status {:#x}",
            DEV_NAME,
            self.res.line,
            status.bits(),
        );

        if status.contains(Status::TX_PENDING) {
            // A synchronous refill holding the lock re-arms TX IRQ itself.
            if let Some(guard) = self.tx_lock.try_lock() {
                self.write_tx_fifo(&guard);
            }
        }

        if status.contains(Status::RX_PENDING) {
            self.drain_rx_fifo(status);
        }

        self.regs.ack_status(Status::TX_PENDING | Status::RX_PENDING);

        IrqReturn::Handled
    }
}

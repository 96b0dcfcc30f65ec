//! Simulated owl UART for unit tests.
//!
//! The model keeps the parts of the hardware the driver depends on:
//! bounded TX and RX FIFOs, write-one-to-clear pending bits, and a
//! transmitter that only shifts bytes out when told to (or, with
//! `with_drain`, one byte per STAT read).

use crate::{
    platform::Resource,
    port::{OwlPort, PortResources},
    regs::{Control, RegisterIo, Registers, Status, WINDOW_SIZE},
};
use alloc::{collections::VecDeque, sync::Arc, vec::Vec};
use serial_core::{
    driver::UartState,
    irq::{IrqLine, IrqReturn, IrqTable},
    poll::PollBudget,
};
use std::sync::{Mutex, MutexGuard};

pub const TEST_IRQ: IrqLine = 32;
pub const TEST_BASE: u64 = 0xE012_A000;

#[derive(Debug, Default)]
struct SimState {
    control: u32,
    pending: Status,
    tx_depth: usize,
    tx_fifo: VecDeque<u8>,
    /// Every byte written to TXDAT, accepted or not.
    tx_log: Vec<u8>,
    /// Bytes that left the transmitter.
    wire: Vec<u8>,
    rx_depth: usize,
    rx_fifo: VecDeque<u8>,
    drain_on_status: bool,
    stuck_busy: bool,
    writes: Vec<(usize, u32)>,
}

impl SimState {
    fn shift_out(&mut self, count: usize) {
        let count = count.min(self.tx_fifo.len());
        self.wire.extend(self.tx_fifo.drain(..count));
        if count > 0 && self.control & Control::TXIE.bits() != 0 {
            self.pending |= Status::TX_PENDING;
        }
    }

    fn status(&self) -> Status {
        let mut status = self.pending;
        status.set(Status::TX_FIFO_EMPTY, self.tx_fifo.is_empty());
        status.set(Status::TX_FIFO_FULL, self.tx_fifo.len() >= self.tx_depth);
        status.set(Status::RX_FIFO_EMPTY, self.rx_fifo.is_empty());
        status.set(Status::RX_FIFO_FULL, self.rx_fifo.len() >= self.rx_depth);
        status.set(
            Status::TX_BUSY,
            self.stuck_busy || !self.tx_fifo.is_empty(),
        );
        status
    }
}

#[derive(Debug)]
pub struct SimUart(Mutex<SimState>);

impl SimUart {
    #[must_use]
    pub fn new(tx_depth: usize, rx_depth: usize) -> Self {
        Self(Mutex::new(SimState {
            tx_depth,
            rx_depth,
            ..SimState::default()
        }))
    }

    #[must_use]
    /// Makes every STAT read shift one byte out of the TX FIFO.
    pub fn with_drain(self) -> Self {
        self.set_drain(true);
        self
    }

    fn inner(&self) -> MutexGuard<'_, SimState> {
        self.0.lock().unwrap()
    }

    pub fn set_drain(&self, drain: bool) {
        self.inner().drain_on_status = drain;
    }

    pub fn set_stuck_busy(&self, busy: bool) {
        self.inner().stuck_busy = busy;
    }

    pub fn control(&self) -> Control {
        Control::from_bits_truncate(self.inner().control)
    }

    pub fn pending(&self) -> Status {
        self.inner().pending
    }

    pub fn raise(&self, bits: Status) {
        self.inner().pending |= bits;
    }

    pub fn tx_log(&self) -> Vec<u8> {
        self.inner().tx_log.clone()
    }

    pub fn wire(&self) -> Vec<u8> {
        self.inner().wire.clone()
    }

    pub fn shift_out(&self, count: usize) {
        self.inner().shift_out(count);
    }

    /// Puts bytes on the receive line. Bytes beyond the FIFO depth are lost.
    pub fn receive(&self, bytes: &[u8]) {
        let mut inner = self.inner();
        let room = inner.rx_depth.saturating_sub(inner.rx_fifo.len());
        inner.rx_fifo.extend(bytes.iter().take(room));
        if inner.control & Control::RXIE.bits() != 0 {
            inner.pending |= Status::RX_PENDING;
        }
    }

    /// Register writes since the last `clear_writes`.
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.inner().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.inner().writes.clear();
    }
}

impl RegisterIo for SimUart {
    fn read(&self, offset: usize) -> u32 {
        let mut inner = self.inner();
        match offset {
            Registers::CTL => inner.control,
            Registers::RXDAT => inner.rx_fifo.pop_front().map_or(0, u32::from),
            Registers::STAT => {
                if inner.drain_on_status {
                    inner.shift_out(1);
                }
                inner.status().bits()
            }
            _ => 0,
        }
    }

    fn write(&self, offset: usize, value: u32) {
        let mut inner = self.inner();
        inner.writes.push((offset, value));
        match offset {
            Registers::CTL => inner.control = value,
            Registers::TXDAT => {
                #[expect(clippy::cast_possible_truncation, reason = "TXDAT takes the low byte")]
                let byte = value as u8;
                inner.tx_log.push(byte);
                if inner.tx_fifo.len() < inner.tx_depth {
                    inner.tx_fifo.push_back(byte);
                }
            }
            Registers::STAT => {
                let ack =
                    Status::from_bits_retain(value) & (Status::TX_PENDING | Status::RX_PENDING);
                inner.pending.remove(ack);
            }
            _ => {}
        }
    }
}

/// A port wired to a simulated UART and a private interrupt table.
pub struct Fixture {
    pub port: Arc<OwlPort<SimUart>>,
    pub state: Arc<UartState>,
    pub irqs: Arc<IrqTable>,
}

impl Fixture {
    pub fn new(sim: SimUart) -> Self {
        Self::build(sim, 0, 16, 64)
    }

    pub fn build(sim: SimUart, line: usize, xmit_size: usize, flip_size: usize) -> Self {
        let state = Arc::new(UartState::new(xmit_size, flip_size));
        let irqs = Arc::new(IrqTable::new());
        let port = OwlPort::new(
            sim,
            PortResources {
                mem: Resource::new(TEST_BASE, WINDOW_SIZE),
                irq: TEST_IRQ,
                line,
            },
            state.clone(),
            irqs.clone(),
            PollBudget::new(64),
        );
        Self { port, state, irqs }
    }

    pub fn sim(&self) -> &SimUart {
        self.port.regs()
    }

    pub fn fire(&self) -> IrqReturn {
        self.irqs.dispatch(TEST_IRQ)
    }
}

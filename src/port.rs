//! One owl UART and its lifecycle.
//!
//! A port is `Inactive` until `startup` succeeds. While `Active`, its
//! interrupt handler is installed and the engine moves data between the
//! FIFOs and the line's buffers. `shutdown` brings it back to `Inactive`.

mod engine;

use crate::{
    config::{DEV_NAME, DRIVER_NAME},
    platform::{IoMem, Resource},
    regs::{Control, RegisterIo, Status},
};
use alloc::{
    boxed::Box,
    sync::{Arc, Weak},
};
use core::sync::atomic::{AtomicU8, Ordering};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serial_core::{
    UartError, UartResult,
    driver::UartState,
    irq::{IrqController, IrqHandler, IrqLine, IrqReturn, Trigger},
    poll::PollBudget,
    uart::{IcountSnapshot, ModemControl, PortCounters, Termios, UartOps},
};
use spin::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum PortState {
    Inactive = 0,
    Starting = 1,
    Active = 2,
    Stopping = 3,
}

/// Wrapper around `AtomicU8` to provide a more convenient API.
struct AtomicPortState(AtomicU8);

impl AtomicPortState {
    const fn new() -> Self {
        Self(AtomicU8::new(PortState::Inactive as u8))
    }

    fn load(&self) -> PortState {
        // Only valid states are ever stored.
        PortState::try_from(self.0.load(Ordering::Acquire)).unwrap_or(PortState::Inactive)
    }

    fn store(&self, state: PortState) {
        self.0.store(state.into(), Ordering::Release);
    }

    /// Moves from `current` to `new`, or returns the state that prevented it.
    fn transition(&self, current: PortState, new: PortState) -> Result<(), PortState> {
        self.0
            .compare_exchange(current.into(), new.into(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| PortState::try_from(actual).unwrap_or(PortState::Inactive))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Platform resources a port was probed with.
pub struct PortResources {
    pub mem: Resource,
    pub irq: IrqLine,
    pub line: usize,
}

pub struct OwlPort<W: RegisterIo = IoMem> {
    this: Weak<Self>,
    regs: W,
    res: PortResources,
    state: AtomicPortState,
    uart: Arc<UartState>,
    irq_ctl: Arc<dyn IrqController>,
    counters: PortCounters,
    /// Serializes transmit ring consumers.
    tx_lock: Mutex<()>,
    poll: PollBudget,
}

impl<W: RegisterIo> core::fmt::Debug for OwlPort<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OwlPort")
            .field("res", &self.res)
            .field("state", &self.state())
            .field("icount", &self.icount())
            .finish_non_exhaustive()
    }
}

impl<W: RegisterIo> OwlPort<W> {
    #[must_use]
    pub fn new(
        regs: W,
        res: PortResources,
        uart: Arc<UartState>,
        irq_ctl: Arc<dyn IrqController>,
        poll: PollBudget,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            regs,
            res,
            state: AtomicPortState::new(),
            uart,
            irq_ctl,
            counters: PortCounters::new(),
            tx_lock: Mutex::new(()),
            poll,
        })
    }

    #[must_use]
    #[inline]
    pub const fn regs(&self) -> &W {
        &self.regs
    }

    #[must_use]
    #[inline]
    pub const fn resources(&self) -> &PortResources {
        &self.res
    }

    #[must_use]
    #[inline]
    pub const fn irq(&self) -> IrqLine {
        self.res.irq
    }

    #[must_use]
    #[inline]
    /// Buffers of the line this port is bound to.
    pub const fn uart(&self) -> &Arc<UartState> {
        &self.uart
    }

    #[must_use]
    #[inline]
    pub fn state(&self) -> PortState {
        self.state.load()
    }

    #[must_use]
    #[inline]
    pub const fn poll(&self) -> PollBudget {
        self.poll
    }

    #[must_use]
    pub fn icount(&self) -> IcountSnapshot {
        self.counters.snapshot()
    }

    #[must_use]
    #[inline]
    pub(crate) const fn tx_lock(&self) -> &Mutex<()> {
        &self.tx_lock
    }
}

impl<W: RegisterIo + 'static> OwlPort<W> {
    fn irq_handler(&self) -> IrqHandler {
        let port = self.this.clone();
        Box::new(move |_irq| {
            port.upgrade()
                .map_or(IrqReturn::None, |port| port.handle_irq())
        })
    }
}

impl<W: RegisterIo + 'static> UartOps for OwlPort<W> {
    #[inline]
    fn line(&self) -> usize {
        self.res.line
    }

    #[inline]
    fn is_active(&self) -> bool {
        self.state() == PortState::Active
    }

    fn startup(&self) -> UartResult<()> {
        log::debug!(target: "owl_serial", "{}{}: startup", DEV_NAME, self.line());

        self.state
            .transition(PortState::Inactive, PortState::Starting)
            .map_err(|state| match state {
                PortState::Active => UartError::AlreadyActive,
                _ => UartError::Busy,
            })?;

        if let Err(err) =
            self.irq_ctl
                .request_irq(self.res.irq, Trigger::HighLevel, DRIVER_NAME, self.irq_handler())
        {
            log::error!(
                target: "owl_serial",
                "{}{}: request irq({}) failed({})",
                DEV_NAME,
                self.line(),
                self.res.irq,
                err
            );
            self.state.store(PortState::Inactive);
            return Err(err);
        }

        self.regs.set_control(Control::RXIE);
        self.regs.set_control(Control::EN);

        self.state.store(PortState::Active);
        Ok(())
    }

    fn shutdown(&self) -> UartResult<()> {
        log::debug!(target: "owl_serial", "{}{}: shutdown", DEV_NAME, self.line());

        self.state
            .transition(PortState::Active, PortState::Stopping)
            .map_err(|_| UartError::NotActive)?;

        self.regs.clear_control(Control::EN);
        self.regs.clear_control(Control::RXIE);

        let res = self.irq_ctl.free_irq(self.res.irq);
        self.state.store(PortState::Inactive);
        if let Err(err) = res {
            log::warn!(
                target: "owl_serial",
                "{}{}: free irq({}) failed({})",
                DEV_NAME,
                self.line(),
                self.res.irq,
                err
            );
        }
        res
    }

    fn start_tx(&self) -> UartResult<()> {
        log::debug!(target: "owl_serial", "{}{}: start_tx", DEV_NAME, self.line());

        if !self.is_active() {
            return Err(UartError::NotActive);
        }
        let guard = self.tx_lock.lock();
        self.write_tx_fifo(&guard);
        Ok(())
    }

    fn stop_tx(&self) -> UartResult<()> {
        log::debug!(target: "owl_serial", "{}{}: stop_tx", DEV_NAME, self.line());

        self.regs.clear_control(Control::TXIE);

        if let Err(timeout) = self
            .poll
            .spin_until(|| self.regs.test_status(Status::TX_FIFO_EMPTY))
        {
            log::warn!(
                target: "owl_serial",
                "{}{}: TX FIFO not drained: {}",
                DEV_NAME,
                self.line(),
                timeout,
            );
            return Err(timeout.into());
        }

        self.regs.ack_status(Status::TX_PENDING);
        Ok(())
    }

    fn stop_rx(&self) -> UartResult<()> {
        log::debug!(target: "owl_serial", "{}{}: stop_rx", DEV_NAME, self.line());

        self.regs.clear_control(Control::RXIE);

        // Reset the RX FIFO by reading it empty.
        if let Err(timeout) = self.poll.spin_until(|| {
            if self.regs.test_status(Status::RX_FIFO_EMPTY) {
                return true;
            }
            let _ = self.regs.read_rx();
            false
        }) {
            log::warn!(
                target: "owl_serial",
                "{}{}: RX FIFO not drained: {}",
                DEV_NAME,
                self.line(),
                timeout,
            );
            return Err(timeout.into());
        }

        self.regs.ack_status(Status::RX_PENDING);
        Ok(())
    }

    fn tx_empty(&self) -> bool {
        log::debug!(target: "owl_serial", "{}{}: tx_empty", DEV_NAME, self.line());
        self.regs.test_status(Status::TX_FIFO_EMPTY)
    }

    fn set_mctrl(&self, mctrl: ModemControl) {
        log::debug!(target: "owl_serial", "{}{}: set_mctrl {:?}", DEV_NAME, self.line(), mctrl);
    }

    fn set_termios(&self, new: &Termios, _old: Option<&Termios>) {
        log::debug!(target: "owl_serial", "{}{}: set_termios {:?}", DEV_NAME, self.line(), new);
    }
}

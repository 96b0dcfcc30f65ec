//! Interrupt line registration and dispatch.
//!
//! A handler is a plain closure owning whatever context it needs (usually a
//! weak reference to the device it serves). Drivers register it against a
//! line through an `IrqController` and unregister it when they shut down.
//!
//! `IrqTable` is the in-crate controller: the platform's interrupt entry code
//! calls `IrqTable::dispatch` with the line that fired.

use crate::{UartError, UartResult};
use alloc::{boxed::Box, collections::BTreeMap};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use spin::Mutex;

pub type IrqLine = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
/// Trigger condition of an interrupt line.
pub enum Trigger {
    RisingEdge = 0x1,
    FallingEdge = 0x2,
    HighLevel = 0x4,
    LowLevel = 0x8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    /// The interrupt was not for this handler (or nobody is registered).
    None,
    Handled,
}

pub type IrqHandler = Box<dyn Fn(IrqLine) -> IrqReturn + Send + Sync>;

/// Interface to the platform's interrupt controller.
pub trait IrqController: Send + Sync {
    /// Installs `handler` on `irq`. Lines are not shared.
    fn request_irq(
        &self,
        irq: IrqLine,
        trigger: Trigger,
        name: &'static str,
        handler: IrqHandler,
    ) -> UartResult<()>;

    /// Removes the handler of `irq`. Once this returns, the handler is not
    /// running and will not be called again.
    fn free_irq(&self, irq: IrqLine) -> UartResult<()>;
}

struct IrqAction {
    name: &'static str,
    trigger: Trigger,
    handler: IrqHandler,
}

/// Table of installed handlers, indexed by line.
///
/// The table lock is held while a handler runs, so `free_irq` waits for an
/// in-flight handler to complete.
pub struct IrqTable {
    actions: Mutex<BTreeMap<IrqLine, IrqAction>>,
}

impl Default for IrqTable {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for IrqTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let actions = self.actions.lock();
        f.debug_map()
            .entries(
                actions
                    .iter()
                    .map(|(irq, action)| (irq, (action.name, action.trigger))),
            )
            .finish()
    }
}

impl IrqTable {
    #[must_use]
    #[inline]
    pub const fn new() -> Self {
        Self {
            actions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Runs the handler installed on `irq`, if any.
    pub fn dispatch(&self, irq: IrqLine) -> IrqReturn {
        let actions = self.actions.lock();
        actions
            .get(&irq)
            .map_or(IrqReturn::None, |action| (action.handler)(irq))
    }

    #[must_use]
    pub fn is_registered(&self, irq: IrqLine) -> bool {
        self.actions.lock().contains_key(&irq)
    }

    #[must_use]
    pub fn trigger(&self, irq: IrqLine) -> Option<Trigger> {
        self.actions.lock().get(&irq).map(|action| action.trigger)
    }

    #[must_use]
    pub fn name(&self, irq: IrqLine) -> Option<&'static str> {
        self.actions.lock().get(&irq).map(|action| action.name)
    }
}

impl IrqController for IrqTable {
    fn request_irq(
        &self,
        irq: IrqLine,
        trigger: Trigger,
        name: &'static str,
        handler: IrqHandler,
    ) -> UartResult<()> {
        let mut actions = self.actions.lock();
        if actions.contains_key(&irq) {
            return Err(UartError::IrqBusy(irq));
        }
        actions.insert(
            irq,
            IrqAction {
                name,
                trigger,
                handler,
            },
        );
        Ok(())
    }

    fn free_irq(&self, irq: IrqLine) -> UartResult<()> {
        let action = self.actions.lock().remove(&irq);
        // The handler may own the last reference to its device, drop it unlocked.
        drop(action.ok_or(UartError::IrqNotRegistered(irq))?);
        Ok(())
    }
}

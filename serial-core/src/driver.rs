//! Registry of the lines a UART driver serves.
//!
//! A driver owns `nr` lines. Each line has a `UartState` (transmit ring and
//! input buffer) that lives as long as the driver is registered, and at most
//! one bound port.

use crate::{
    UartError, UartResult,
    circ::{CircBuf, UART_XMIT_SIZE},
    flip::{FLIP_BUFFER_SIZE, FlipBuffer},
    uart::UartOps,
};
use alloc::{sync::Arc, vec::Vec};
use spin::RwLock;

#[derive(Debug)]
/// Buffers of one line, shared by the tty layer and the bound port.
pub struct UartState {
    xmit: CircBuf,
    input: FlipBuffer,
}

impl Default for UartState {
    fn default() -> Self {
        Self::new(UART_XMIT_SIZE, FLIP_BUFFER_SIZE)
    }
}

impl UartState {
    #[must_use]
    pub fn new(xmit_size: usize, flip_size: usize) -> Self {
        Self {
            xmit: CircBuf::new(xmit_size),
            input: FlipBuffer::new(flip_size),
        }
    }

    #[must_use]
    #[inline]
    pub const fn xmit(&self) -> &CircBuf {
        &self.xmit
    }

    #[must_use]
    #[inline]
    pub const fn input(&self) -> &FlipBuffer {
        &self.input
    }
}

struct Slot<P: ?Sized> {
    state: Arc<UartState>,
    port: Option<Arc<P>>,
}

/// A UART driver: `nr` lines, each with its state and optionally a port.
pub struct UartDriver<P: ?Sized> {
    driver_name: &'static str,
    dev_name: &'static str,
    nr: usize,
    xmit_size: usize,
    flip_size: usize,
    slots: RwLock<Option<Vec<Slot<P>>>>,
}

impl<P: ?Sized + UartOps> core::fmt::Debug for UartDriver<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UartDriver")
            .field("driver_name", &self.driver_name)
            .field("dev_name", &self.dev_name)
            .field("nr", &self.nr)
            .field("registered", &self.is_registered())
            .finish_non_exhaustive()
    }
}

impl<P: ?Sized + UartOps> UartDriver<P> {
    #[must_use]
    pub const fn new(driver_name: &'static str, dev_name: &'static str, nr: usize) -> Self {
        Self::with_buffer_sizes(driver_name, dev_name, nr, UART_XMIT_SIZE, FLIP_BUFFER_SIZE)
    }

    #[must_use]
    pub const fn with_buffer_sizes(
        driver_name: &'static str,
        dev_name: &'static str,
        nr: usize,
        xmit_size: usize,
        flip_size: usize,
    ) -> Self {
        Self {
            driver_name,
            dev_name,
            nr,
            xmit_size,
            flip_size,
            slots: RwLock::new(None),
        }
    }

    #[must_use]
    #[inline]
    pub const fn driver_name(&self) -> &'static str {
        self.driver_name
    }

    #[must_use]
    #[inline]
    pub const fn dev_name(&self) -> &'static str {
        self.dev_name
    }

    #[must_use]
    #[inline]
    pub const fn nr(&self) -> usize {
        self.nr
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.slots.read().is_some()
    }

    /// Allocates the per-line state.
    pub fn register(&self) -> UartResult<()> {
        let mut slots = self.slots.write();
        if slots.is_some() {
            return Err(UartError::AlreadyRegistered);
        }
        *slots = Some(
            (0..self.nr)
                .map(|_| Slot {
                    state: Arc::new(UartState::new(self.xmit_size, self.flip_size)),
                    port: None,
                })
                .collect(),
        );
        drop(slots);

        log::debug!(target: "serial_core", "Registered {} ({} lines)", self.driver_name, self.nr);
        Ok(())
    }

    /// Releases the per-line state. All ports must have been removed.
    pub fn unregister(&self) -> UartResult<()> {
        let mut slots = self.slots.write();
        let lines = slots.as_ref().ok_or(UartError::NotRegistered)?;
        if let Some(line) = lines.iter().position(|slot| slot.port.is_some()) {
            return Err(UartError::LineInUse(line));
        }
        *slots = None;
        drop(slots);

        log::debug!(target: "serial_core", "Unregistered {}", self.driver_name);
        Ok(())
    }

    /// Returns the state of `line`.
    pub fn state(&self, line: usize) -> UartResult<Arc<UartState>> {
        let slots = self.slots.read();
        let lines = slots.as_ref().ok_or(UartError::NotRegistered)?;
        lines
            .get(line)
            .map(|slot| slot.state.clone())
            .ok_or(UartError::InvalidLine { line, nr: self.nr })
    }

    /// Binds `port` to the line it reports.
    pub fn add_one_port(&self, port: Arc<P>) -> UartResult<()> {
        let line = port.line();
        let mut slots = self.slots.write();
        let lines = slots.as_mut().ok_or(UartError::NotRegistered)?;
        let slot = lines
            .get_mut(line)
            .ok_or(UartError::InvalidLine { line, nr: self.nr })?;
        if slot.port.is_some() {
            return Err(UartError::LineInUse(line));
        }
        slot.port = Some(port);
        drop(slots);

        log::info!(target: "serial_core", "{}{} attached", self.dev_name, line);
        Ok(())
    }

    /// Unbinds the port of `line` and returns it.
    pub fn remove_one_port(&self, line: usize) -> UartResult<Arc<P>> {
        let mut slots = self.slots.write();
        let lines = slots.as_mut().ok_or(UartError::NotRegistered)?;
        let slot = lines
            .get_mut(line)
            .ok_or(UartError::InvalidLine { line, nr: self.nr })?;
        let port = slot.port.take().ok_or(UartError::LineEmpty(line))?;
        drop(slots);

        log::info!(target: "serial_core", "{}{} detached", self.dev_name, line);
        Ok(port)
    }

    #[must_use]
    pub fn port(&self, line: usize) -> Option<Arc<P>> {
        self.slots
            .read()
            .as_ref()?
            .get(line)
            .and_then(|slot| slot.port.clone())
    }

    #[must_use]
    /// Lines that currently have a port.
    pub fn lines(&self) -> Vec<usize> {
        self.slots.read().as_ref().map_or_else(Vec::new, |lines| {
            lines
                .iter()
                .enumerate()
                .filter_map(|(line, slot)| slot.port.as_ref().map(|_| line))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uart::{ModemControl, Termios};

    struct DummyPort(usize);

    impl UartOps for DummyPort {
        fn line(&self) -> usize {
            self.0
        }
        fn is_active(&self) -> bool {
            false
        }
        fn startup(&self) -> UartResult<()> {
            Ok(())
        }
        fn shutdown(&self) -> UartResult<()> {
            Ok(())
        }
        fn start_tx(&self) -> UartResult<()> {
            Ok(())
        }
        fn stop_tx(&self) -> UartResult<()> {
            Ok(())
        }
        fn stop_rx(&self) -> UartResult<()> {
            Ok(())
        }
        fn tx_empty(&self) -> bool {
            true
        }
        fn set_mctrl(&self, _mctrl: ModemControl) {}
        fn set_termios(&self, _new: &Termios, _old: Option<&Termios>) {}
    }

    fn driver() -> UartDriver<DummyPort> {
        UartDriver::with_buffer_sizes("dummy", "ttyD", 3, 16, 16)
    }

    #[test]
    fn test_register_twice() {
        let driver = driver();
        assert!(!driver.is_registered());
        driver.register().unwrap();
        assert_eq!(driver.register(), Err(UartError::AlreadyRegistered));
        driver.unregister().unwrap();
        assert_eq!(driver.unregister(), Err(UartError::NotRegistered));
    }

    #[test]
    fn test_add_remove() {
        let driver = driver();
        assert_eq!(
            driver.add_one_port(Arc::new(DummyPort(0))),
            Err(UartError::NotRegistered)
        );
        driver.register().unwrap();

        driver.add_one_port(Arc::new(DummyPort(2))).unwrap();
        assert_eq!(
            driver.add_one_port(Arc::new(DummyPort(2))),
            Err(UartError::LineInUse(2))
        );
        assert_eq!(
            driver.add_one_port(Arc::new(DummyPort(3))),
            Err(UartError::InvalidLine { line: 3, nr: 3 })
        );
        assert_eq!(driver.lines(), [2]);
        assert_eq!(driver.port(2).map(|port| port.line()), Some(2));
        assert!(driver.port(1).is_none());

        assert_eq!(driver.unregister(), Err(UartError::LineInUse(2)));

        assert_eq!(driver.remove_one_port(2).map(|port| port.line()), Ok(2));
        assert_eq!(
            driver.remove_one_port(2).map(|port| port.line()),
            Err(UartError::LineEmpty(2))
        );
        assert!(driver.lines().is_empty());
        driver.unregister().unwrap();
    }

    #[test]
    fn test_state_survives_port() {
        let driver = driver();
        driver.register().unwrap();
        let state = driver.state(1).unwrap();
        assert_eq!(state.xmit().capacity(), 16);
        assert_eq!(state.input().capacity(), 16);

        state.xmit().write(b"hi");
        driver.add_one_port(Arc::new(DummyPort(1))).unwrap();
        driver.remove_one_port(1).unwrap();
        assert_eq!(driver.state(1).unwrap().xmit().len(), 2);

        assert_eq!(
            driver.state(5).map(|_| ()),
            Err(UartError::InvalidLine { line: 5, nr: 3 })
        );
    }
}

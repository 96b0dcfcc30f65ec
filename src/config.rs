//! Driver configuration.

use crate::error::{SerialError, SerialResult};
use serial_core::{
    circ::UART_XMIT_SIZE, console::ConsoleFlags, flip::FLIP_BUFFER_SIZE, poll::PollBudget,
};

/// Maximum number of UARTs on the SoC.
pub const OWL_SERIAL_MAXIMUM: usize = 6;

pub const DRIVER_NAME: &str = "owl_serial";
pub const DEV_NAME: &str = "ttyS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Line the console is attached to.
pub struct ConsoleBinding {
    pub line: usize,
    pub flags: ConsoleFlags,
}

impl Default for ConsoleBinding {
    fn default() -> Self {
        Self {
            line: OWL_SERIAL_MAXIMUM - 1,
            flags: ConsoleFlags::PRINTBUFFER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    driver_name: &'static str,
    dev_name: &'static str,
    nr: usize,
    console: Option<ConsoleBinding>,
    xmit_size: usize,
    flip_size: usize,
    poll: PollBudget,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            driver_name: DRIVER_NAME,
            dev_name: DEV_NAME,
            nr: OWL_SERIAL_MAXIMUM,
            console: Some(ConsoleBinding {
                line: OWL_SERIAL_MAXIMUM - 1,
                flags: ConsoleFlags::PRINTBUFFER,
            }),
            xmit_size: UART_XMIT_SIZE,
            flip_size: FLIP_BUFFER_SIZE,
            poll: PollBudget::DEFAULT,
        }
    }

    #[must_use]
    pub const fn with_nr(mut self, nr: usize) -> Self {
        self.nr = nr;
        self
    }

    #[must_use]
    pub const fn with_console(mut self, console: Option<ConsoleBinding>) -> Self {
        self.console = console;
        self
    }

    #[must_use]
    pub const fn with_xmit_size(mut self, xmit_size: usize) -> Self {
        self.xmit_size = xmit_size;
        self
    }

    #[must_use]
    pub const fn with_flip_size(mut self, flip_size: usize) -> Self {
        self.flip_size = flip_size;
        self
    }

    #[must_use]
    pub const fn with_poll(mut self, poll: PollBudget) -> Self {
        self.poll = poll;
        self
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
    #[inline]
    pub const fn console(&self) -> Option<ConsoleBinding> {
        self.console
    }

    #[must_use]
    #[inline]
    pub const fn xmit_size(&self) -> usize {
        self.xmit_size
    }

    #[must_use]
    #[inline]
    pub const fn flip_size(&self) -> usize {
        self.flip_size
    }

    #[must_use]
    #[inline]
    pub const fn poll(&self) -> PollBudget {
        self.poll
    }

    pub const fn validate(&self) -> SerialResult<()> {
        if self.nr == 0 || self.nr > OWL_SERIAL_MAXIMUM {
            return Err(SerialError::InvalidConfig("port count out of range"));
        }
        if !self.xmit_size.is_power_of_two() || self.xmit_size < 2 {
            return Err(SerialError::InvalidConfig(
                "transmit ring size must be a power of two",
            ));
        }
        if self.flip_size == 0 {
            return Err(SerialError::InvalidConfig("input buffer size is zero"));
        }
        if let Some(console) = self.console
            && console.line >= self.nr
        {
            return Err(SerialError::InvalidConfig("console line out of range"));
        }
        Ok(())
    }
}

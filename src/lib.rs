//! Serial driver for the UARTs of the Actions S900 ("owl") SoC.
//!
//! Each UART is a four-register window: control, RX data, TX data and status.
//! Transmission and reception are interrupt driven: the tty layer fills the
//! line's transmit ring and calls `start_tx`, the interrupt handler keeps the
//! TX FIFO fed and pushes received bytes to the line's input buffer.
//!
//! A console can be bound to one line. It writes synchronously by polling the
//! FIFO, so it works with interrupts off and before the port is started.
//!
//! ## Example
//!
//! ```rust,no_run
//! # use owl_serial::{DriverConfig, OwlSerial, PlatformDevice, IoMapper};
//! # use serial_core::{irq::IrqTable, uart::UartOps};
//! # use std::sync::Arc;
//! # fn board() -> (Arc<dyn IoMapper>, Vec<Box<dyn PlatformDevice>>) { unimplemented!() }
//! #
//! let (mapper, devices) = board();
//! let irqs = Arc::new(IrqTable::new());
//!
//! let serial = OwlSerial::init(DriverConfig::new(), irqs.clone(), mapper).unwrap();
//! for dev in &devices {
//!     let port = serial.probe(dev.as_ref()).unwrap();
//!     port.startup().unwrap();
//! }
//! ```
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

extern crate alloc;

pub mod config;
pub mod console;
pub mod error;
pub mod platform;
pub mod port;
pub mod regs;

#[cfg(test)]
mod sim;

pub use config::{ConsoleBinding, DriverConfig, OWL_SERIAL_MAXIMUM};
pub use console::OwlConsole;
pub use error::{SerialError, SerialResult};
pub use platform::{IoMapper, IoMem, OwlSerial, PlatformDevice, Resource};
pub use port::{OwlPort, PortResources, PortState};
pub use regs::{MmioWindow, RegisterIo};
pub use serial_core;

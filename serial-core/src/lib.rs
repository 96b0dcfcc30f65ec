//! Host side of the serial stack.
//!
//! This crate holds everything a UART driver plugs into: the transmit ring
//! the tty layer fills, the flip buffer received characters are pushed to,
//! the interrupt dispatch table, the `UartOps` contract and the driver
//! registry that binds ports to line numbers.
//!
//! Drivers only depend on the traits and containers defined here, so they can
//! be exercised on the host with a simulated register window.
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

extern crate alloc;

pub mod circ;
pub mod console;
pub mod driver;
pub mod error;
pub mod flip;
pub mod irq;
pub mod mmio;
pub mod poll;
pub mod uart;

pub use error::{UartError, UartResult};

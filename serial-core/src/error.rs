use crate::{irq::IrqLine, poll::PollTimeout};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UartError {
    #[error("IRQ {0} is already in use")]
    IrqBusy(IrqLine),
    #[error("IRQ {0} is not registered")]
    IrqNotRegistered(IrqLine),
    #[error("Line {line} is out of range (driver has {nr} lines)")]
    InvalidLine { line: usize, nr: usize },
    #[error("Line {0} already has a port")]
    LineInUse(usize),
    #[error("Line {0} has no port")]
    LineEmpty(usize),
    #[error("Driver is not registered")]
    NotRegistered,
    #[error("Driver is already registered")]
    AlreadyRegistered,
    #[error("Port is not active")]
    NotActive,
    #[error("Port is already active")]
    AlreadyActive,
    #[error("Port is changing state")]
    Busy,
    #[error("Device did not respond in time")]
    Timeout,
    #[error("No such device")]
    NoDevice,
    #[error("Invalid argument")]
    InvalidArgument,
}

impl From<PollTimeout> for UartError {
    fn from(_: PollTimeout) -> Self {
        Self::Timeout
    }
}

pub type UartResult<T> = Result<T, UartError>;

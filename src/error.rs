use serial_core::UartError;
use thiserror::Error;

/// Errors raised while binding the driver to a device.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    #[error("No device match found")]
    NoMatch,

    #[error("No IO memory resource")]
    NoMemResource,

    #[error("Failed to map memory resource at {0:#x}")]
    MapFailed(u64),

    #[error("Failed to get IRQ")]
    NoIrq,

    #[error("Failed to get alias id")]
    NoAlias,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error(transparent)]
    Uart(#[from] UartError),
}

impl From<SerialError> for UartError {
    fn from(error: SerialError) -> Self {
        match error {
            SerialError::NoMatch
            | SerialError::NoMemResource
            | SerialError::MapFailed(_)
            | SerialError::NoIrq
            | SerialError::NoAlias => Self::NoDevice,
            SerialError::InvalidConfig(_) => Self::InvalidArgument,
            SerialError::Uart(error) => error,
        }
    }
}

pub type SerialResult<T> = Result<T, SerialError>;

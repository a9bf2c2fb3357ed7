//! Error types for the Linux GPIO socket

use thiserror::Error;

/// Linux GPIO socket specific errors
#[derive(Debug, Error)]
pub enum LinuxGpioError {
    /// Failed to request GPIO lines
    #[error("Failed to request GPIO lines: {0}")]
    LineRequestFailed(#[source] gpiocdev::Error),

    /// Failed to set GPIO line value
    #[error("Failed to set GPIO line value: {0}")]
    SetValueFailed(#[source] gpiocdev::Error),

    /// Failed to get GPIO line value
    #[error("Failed to get GPIO line value: {0}")]
    GetValueFailed(#[source] gpiocdev::Error),

    /// Failed to reconfigure GPIO lines
    #[error("Failed to reconfigure GPIO lines: {0}")]
    ReconfigureFailed(#[source] gpiocdev::Error),

    /// GPIO chip or device not specified
    #[error("No GPIO chip specified. Use dev=/dev/gpiochipN or gpiochip=N")]
    NoDevice,

    /// Wrong number of socket lines
    #[error("Expected 40 GPIO lines, one per socket pin, got {0}")]
    LineCount(usize),

    /// The same GPIO line is wired to two socket pins
    #[error("GPIO line {0} is wired to more than one socket pin")]
    DuplicateLine(u32),
}

/// Result type for Linux GPIO socket operations
pub type Result<T> = std::result::Result<T, LinuxGpioError>;

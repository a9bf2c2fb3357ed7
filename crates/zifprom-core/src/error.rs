//! Error types for zifprom-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Selection / configuration errors
    /// The selected profile is the safe "no chip" entry
    NoChipSelected,
    /// Profile index is outside the catalog
    InvalidProfile,
    /// Hex input could not be parsed
    InvalidHex,
    /// Address is beyond the image size of the active profile
    AddressOutOfBounds,

    // Sequencer errors
    /// The socket is not configured for reading
    NotReady,
    /// The ISP target did not echo the programming-enable sentinel.
    ///
    /// Carries the four raw bytes clocked back during the handshake.
    IspHandshakeFailed([u8; 4]),

    // Transfer errors
    /// The transfer was cancelled by the receiver or ran out of retries
    TransferAborted,
    /// A received block carried an unexpected sequence number
    BlockSequence,
    /// A received block failed its checksum
    ChecksumMismatch,

    // I/O errors
    /// The byte stream underneath the protocol failed
    TransportError,
    /// The byte stream ended while a reply was expected
    UnexpectedEof,
    /// No data arrived within the transport's read timeout
    Timeout,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChipSelected => write!(f, "no chip selected"),
            Self::InvalidProfile => write!(f, "invalid chip profile"),
            Self::InvalidHex => write!(f, "invalid hex input"),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::NotReady => write!(f, "socket not ready"),
            Self::IspHandshakeFailed(echo) => write!(
                f,
                "ISP handshake failed: {:02X} {:02X} {:02X} {:02X}",
                echo[0], echo[1], echo[2], echo[3]
            ),
            Self::TransferAborted => write!(f, "transfer aborted"),
            Self::BlockSequence => write!(f, "unexpected block number"),
            Self::ChecksumMismatch => write!(f, "block checksum mismatch"),
            Self::TransportError => write!(f, "transport error"),
            Self::UnexpectedEof => write!(f, "unexpected end of stream"),
            Self::Timeout => write!(f, "timed out waiting for data"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

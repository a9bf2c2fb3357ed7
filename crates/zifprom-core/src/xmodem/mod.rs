//! XMODEM block transfer (checksum variant)
//!
//! Captured images leave the reader as 128 byte XMODEM blocks with an
//! 8-bit additive checksum, which every terminal program can receive.
//! The reader only sends; [`Receiver`] is the host side, used by the
//! `zifprom` binary and by tests.
//!
//! Block numbers start at 1 and wrap modulo 256. A receiver cannot tell a
//! wrapped number from a resend of an old block; that is how XMODEM
//! works and is kept for compatibility.

mod block;
mod receiver;
mod sender;

pub use block::{checksum, XmodemBlock, BLOCK_LEN, PAYLOAD_LEN};
pub use receiver::Receiver;
pub use sender::{Sender, SenderState};

/// Start of header
pub const SOH: u8 = 0x01;
/// End of transmission
pub const EOT: u8 = 0x04;
/// Acknowledge
pub const ACK: u8 = 0x06;
/// Negative acknowledge, also starts a checksum-mode transfer
pub const NAK: u8 = 0x15;
/// Cancel
pub const CAN: u8 = 0x18;
/// Padding for the last, short block (CP/M end of file)
pub const EOF_PAD: u8 = 0x1A;

/// Transmissions allowed per block before the transfer is abandoned
pub const MAX_RETRIES: u8 = 10;

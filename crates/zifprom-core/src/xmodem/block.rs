//! On-the-wire XMODEM block

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::{EOF_PAD, SOH};
use crate::error::{Error, Result};

/// Payload bytes per block
pub const PAYLOAD_LEN: usize = 128;

/// Bytes per block on the wire: header, number, complement, payload, checksum
pub const BLOCK_LEN: usize = PAYLOAD_LEN + 4;

/// Additive checksum of a payload, modulo 256
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// One XMODEM block, laid out exactly as it is transmitted
#[repr(C)]
#[derive(Debug, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct XmodemBlock {
    /// Always [`SOH`]
    pub soh: u8,
    /// Block number, modulo 256
    pub number: u8,
    /// `255 - number`
    pub complement: u8,
    /// Data
    pub payload: [u8; PAYLOAD_LEN],
    /// Sum of the payload bytes, modulo 256
    pub checksum: u8,
}

impl Default for XmodemBlock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl XmodemBlock {
    /// Create a block with an all-padding payload
    pub fn new(number: u8) -> Self {
        let mut block = Self {
            soh: SOH,
            number,
            complement: 0,
            payload: [EOF_PAD; PAYLOAD_LEN],
            checksum: 0,
        };
        block.seal();
        block
    }

    /// Copy `data` into the payload, padding a short tail with [`EOF_PAD`]
    pub fn fill(&mut self, data: &[u8]) {
        let n = data.len().min(PAYLOAD_LEN);
        self.payload[..n].copy_from_slice(&data[..n]);
        self.payload[n..].fill(EOF_PAD);
    }

    /// Recompute the header and checksum from the number and payload
    pub fn seal(&mut self) {
        self.soh = SOH;
        self.complement = 0xFF - self.number;
        self.checksum = checksum(&self.payload);
    }

    /// Parse a block received from the wire
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::read_from_bytes(bytes).map_err(|_| Error::UnexpectedEof)
    }

    /// Check the framing of a received block.
    ///
    /// A damaged header is reported the same way as a damaged payload,
    /// since either way the block has to be sent again.
    pub fn verify(&self) -> Result<()> {
        if self.soh != SOH || self.complement != 0xFF - self.number {
            return Err(Error::ChecksumMismatch);
        }
        if self.checksum != checksum(&self.payload) {
            return Err(Error::ChecksumMismatch);
        }
        Ok(())
    }

    /// The block as it goes on the wire
    pub fn to_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

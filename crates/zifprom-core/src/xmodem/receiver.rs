//! XMODEM receiver (host side)

use log::{debug, info, trace, warn};

use super::block::{XmodemBlock, BLOCK_LEN, PAYLOAD_LEN};
use super::{ACK, CAN, EOT, MAX_RETRIES, NAK, SOH};
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Receives one file over a [`Transport`]
pub struct Receiver<T> {
    transport: T,
    max_retries: u8,
}

impl<T: Transport> Receiver<T> {
    /// Create a receiver
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            max_retries: MAX_RETRIES,
        }
    }

    /// Set the number of consecutive damaged blocks tolerated
    pub fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    /// Give the transport back
    pub fn into_inner(self) -> T {
        self.transport
    }

    fn cancel(&mut self, error: Error) -> Error {
        warn!("xmodem: cancelling transfer: {}", error);
        // best effort, the transfer has failed either way
        let _ = self.transport.send(&[CAN, CAN]);
        error
    }

    /// Read the rest of a block after its header byte
    fn read_body(&mut self, body: &mut [u8]) -> Result<()> {
        for byte in body.iter_mut() {
            *byte = self.transport.receive_byte()?;
        }
        Ok(())
    }

    /// Receive a whole file, handing each new payload to `sink`.
    ///
    /// Sends the initial NAK, acknowledges good blocks, NAKs damaged ones
    /// and acknowledges (but drops) a repeat of the previous block. A
    /// transport that reports [`Error::Timeout`] gets another NAK, so a
    /// sender that missed the first one still starts; timeouts count
    /// against the same retry ceiling as damaged blocks.
    /// Returns the number of payloads delivered.
    pub fn receive<F>(&mut self, mut sink: F) -> Result<u32>
    where
        F: FnMut(&[u8; PAYLOAD_LEN]) -> Result<()>,
    {
        let mut expected = 1u8;
        let mut blocks = 0u32;
        let mut errors = 0u8;
        let mut buf = [0u8; BLOCK_LEN];

        self.transport.send(&[NAK])?;

        loop {
            if errors >= self.max_retries {
                return Err(self.cancel(Error::TransferAborted));
            }

            let received = match self.transport.receive_byte() {
                Ok(byte) => Some(byte),
                Err(Error::Timeout) => None,
                Err(e) => return Err(e),
            };

            match received {
                None => {
                    debug!("xmodem: nothing from sender, NAK again");
                    errors += 1;
                    self.transport.send(&[NAK])?;
                }
                Some(SOH) => {
                    buf[0] = SOH;
                    match self.read_body(&mut buf[1..]) {
                        Ok(()) => {}
                        Err(Error::Timeout) => {
                            debug!("xmodem: block cut short");
                            errors += 1;
                            self.transport.send(&[NAK])?;
                            continue;
                        }
                        Err(e) => return Err(e),
                    }
                    let block = XmodemBlock::parse(&buf)?;

                    if let Err(e) = block.verify() {
                        debug!("xmodem: bad block {}: {}", block.number, e);
                        errors += 1;
                        self.transport.send(&[NAK])?;
                    } else if block.number == expected {
                        if let Err(e) = sink(&block.payload) {
                            return Err(self.cancel(e));
                        }
                        self.transport.send(&[ACK])?;
                        expected = expected.wrapping_add(1);
                        blocks += 1;
                        errors = 0;
                    } else if block.number == expected.wrapping_sub(1) {
                        debug!("xmodem: duplicate block {}", block.number);
                        self.transport.send(&[ACK])?;
                    } else {
                        return Err(self.cancel(Error::BlockSequence));
                    }
                }
                Some(EOT) => {
                    self.transport.send(&[ACK])?;
                    info!("xmodem: received {} blocks", blocks);
                    return Ok(blocks);
                }
                Some(CAN) => {
                    warn!("xmodem: sender cancelled");
                    return Err(Error::TransferAborted);
                }
                // line noise and terminal chatter before the first block
                Some(other) => trace!("xmodem: ignoring {:02X}", other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::vec::Vec;

    struct Scripted {
        incoming: VecDeque<u8>,
        sent: Vec<u8>,
        stalls: usize,
    }

    impl Scripted {
        fn new(incoming: Vec<u8>) -> Self {
            Self::stalled(0, incoming)
        }

        /// Time out `stalls` times before delivering anything
        fn stalled(stalls: usize, incoming: Vec<u8>) -> Self {
            Self {
                incoming: incoming.into(),
                sent: Vec::new(),
                stalls,
            }
        }
    }

    impl Transport for Scripted {
        fn send(&mut self, data: &[u8]) -> Result<()> {
            self.sent.extend_from_slice(data);
            Ok(())
        }

        fn bytes_available(&mut self) -> Result<usize> {
            Ok(self.incoming.len())
        }

        fn receive_byte(&mut self) -> Result<u8> {
            if self.stalls > 0 {
                self.stalls -= 1;
                return Err(Error::Timeout);
            }
            self.incoming.pop_front().ok_or(Error::UnexpectedEof)
        }
    }

    fn block(number: u8, fill: u8) -> Vec<u8> {
        let mut block = XmodemBlock::new(number);
        block.fill(&[fill; PAYLOAD_LEN]);
        block.seal();
        block.to_bytes().to_vec()
    }

    #[test]
    fn test_receive_file() {
        let mut wire = block(1, 0xAA);
        wire.extend(block(2, 0xBB));
        wire.push(EOT);

        let mut receiver = Receiver::new(Scripted::new(wire));
        let mut data = Vec::new();
        let blocks = receiver
            .receive(|payload| {
                data.extend_from_slice(payload);
                Ok(())
            })
            .unwrap();

        assert_eq!(blocks, 2);
        assert_eq!(data.len(), 256);
        assert!(data[..128].iter().all(|&b| b == 0xAA));
        assert!(data[128..].iter().all(|&b| b == 0xBB));
        assert_eq!(receiver.into_inner().sent, [NAK, ACK, ACK, ACK]);
    }

    #[test]
    fn test_damaged_and_duplicate_blocks() {
        let mut damaged = block(1, 0x10);
        damaged[40] ^= 0xFF;

        let mut wire = damaged;
        wire.extend(block(1, 0x10));
        wire.extend(block(1, 0x10));
        wire.push(EOT);

        let mut receiver = Receiver::new(Scripted::new(wire));
        let mut count = 0;
        let blocks = receiver
            .receive(|_| {
                count += 1;
                Ok(())
            })
            .unwrap();

        assert_eq!(blocks, 1);
        assert_eq!(count, 1);
        assert_eq!(receiver.into_inner().sent, [NAK, NAK, ACK, ACK, ACK]);
    }

    #[test]
    fn test_out_of_sequence_cancels() {
        let mut receiver = Receiver::new(Scripted::new(block(3, 0)));
        assert_eq!(receiver.receive(|_| Ok(())), Err(Error::BlockSequence));
        assert_eq!(receiver.into_inner().sent, [NAK, CAN, CAN]);
    }

    #[test]
    fn test_sender_cancel() {
        let mut receiver = Receiver::new(Scripted::new(Vec::from([CAN])));
        assert_eq!(receiver.receive(|_| Ok(())), Err(Error::TransferAborted));
    }

    #[test]
    fn test_timeout_repeats_nak() {
        let mut wire = block(1, 0x33);
        wire.push(EOT);
        let mut receiver = Receiver::new(Scripted::stalled(2, wire));
        assert_eq!(receiver.receive(|_| Ok(())), Ok(1));
        assert_eq!(receiver.into_inner().sent, [NAK, NAK, NAK, ACK, ACK]);
    }

    #[test]
    fn test_silent_sender_gives_up() {
        let stalls = MAX_RETRIES as usize;
        let mut receiver = Receiver::new(Scripted::stalled(stalls, Vec::new()));
        assert_eq!(receiver.receive(|_| Ok(())), Err(Error::TransferAborted));

        let sent = receiver.into_inner().sent;
        assert_eq!(sent.len(), stalls + 3);
        assert!(sent[..stalls + 1].iter().all(|&b| b == NAK));
        assert_eq!(&sent[stalls + 1..], &[CAN, CAN]);
    }
}

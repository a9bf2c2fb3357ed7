//! XMODEM sender

use log::{debug, error, info, trace, warn};

use super::block::{XmodemBlock, PAYLOAD_LEN};
use super::{ACK, CAN, EOT, MAX_RETRIES, NAK};
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Where the sender is in a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// Waiting for the receiver's NAK
    AwaitStart,
    /// Ready to send the block with this number
    Sending(u8),
    /// Data exhausted, sending EOT
    Finishing,
    /// The receiver acknowledged EOT
    Done,
    /// Cancelled by the receiver, out of retries, or the transport failed
    Aborted,
}

/// Sends one file over a [`Transport`]
///
/// ```ignore
/// let mut sender = Sender::new(&mut transport);
/// sender.await_start()?;
/// for chunk in image.chunks(PAYLOAD_LEN) {
///     sender.send_payload(chunk)?;
/// }
/// sender.finish()?;
/// ```
pub struct Sender<T> {
    transport: T,
    block: XmodemBlock,
    state: SenderState,
    max_retries: u8,
}

impl<T: Transport> Sender<T> {
    /// Create a sender waiting for the receiver to start
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            block: XmodemBlock::new(0),
            state: SenderState::AwaitStart,
            max_retries: MAX_RETRIES,
        }
    }

    /// Set the number of transmissions allowed per block
    pub fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    /// Current state
    pub fn state(&self) -> SenderState {
        self.state
    }

    /// Access the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back
    pub fn into_inner(self) -> T {
        self.transport
    }

    fn abort(&mut self, reason: &str) -> Error {
        error!("xmodem: transfer aborted, {}", reason);
        self.state = SenderState::Aborted;
        Error::TransferAborted
    }

    /// Receive a byte, marking the transfer aborted if the transport fails
    fn receive(&mut self) -> Result<u8> {
        self.transport.receive_byte().inspect_err(|_| {
            self.state = SenderState::Aborted;
        })
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.transport.send(data).inspect_err(|_| {
            self.state = SenderState::Aborted;
        })
    }

    /// Block until the receiver sends NAK.
    ///
    /// CAN aborts before anything is sent; other bytes are ignored.
    pub fn await_start(&mut self) -> Result<()> {
        if self.state != SenderState::AwaitStart {
            return Err(Error::NotReady);
        }

        loop {
            match self.receive()? {
                NAK => break,
                CAN => return Err(self.abort("cancelled before start")),
                other => trace!("xmodem: ignoring {:02X} while waiting for NAK", other),
            }
        }

        self.start_received();
        Ok(())
    }

    /// Note that the receiver's NAK has already been read by the caller
    pub fn start_received(&mut self) {
        if self.state == SenderState::AwaitStart {
            debug!("xmodem: receiver ready");
            self.state = SenderState::Sending(1);
        }
    }

    /// Send the next block and wait until it is acknowledged.
    ///
    /// At most [`PAYLOAD_LEN`] bytes are sent; a shorter payload is padded.
    /// NAK resends the same block, up to the retry ceiling. CAN or running
    /// out of retries aborts with [`Error::TransferAborted`].
    pub fn send_payload(&mut self, payload: &[u8]) -> Result<()> {
        let SenderState::Sending(number) = self.state else {
            return Err(Error::NotReady);
        };

        self.block.number = number;
        self.block.fill(&payload[..payload.len().min(PAYLOAD_LEN)]);

        let mut attempts = 0u8;
        loop {
            self.block.seal();
            let block = self.block.clone();
            self.send(block.to_bytes())?;
            attempts += 1;

            loop {
                match self.receive()? {
                    ACK => {
                        trace!("xmodem: block {} acknowledged", number);
                        self.state = SenderState::Sending(number.wrapping_add(1));
                        return Ok(());
                    }
                    CAN => return Err(self.abort("cancelled by receiver")),
                    NAK => break,
                    other => trace!("xmodem: ignoring {:02X} while waiting for ACK", other),
                }
            }

            if attempts >= self.max_retries {
                return Err(self.abort("too many retries"));
            }
            warn!("xmodem: NAK for block {}, resending", number);
        }
    }

    /// Send every byte of `data` as blocks, then finish the transfer
    pub fn send_all(&mut self, data: &[u8]) -> Result<()> {
        for chunk in data.chunks(PAYLOAD_LEN) {
            self.send_payload(chunk)?;
        }
        self.finish()
    }

    /// End the transfer: repeat EOT until the receiver acknowledges it.
    ///
    /// There is no retry ceiling here; only ACK, CAN or a failing
    /// transport end the loop.
    pub fn finish(&mut self) -> Result<()> {
        if !matches!(self.state, SenderState::Sending(_)) {
            return Err(Error::NotReady);
        }
        self.state = SenderState::Finishing;

        loop {
            self.send(&[EOT])?;
            match self.receive()? {
                ACK => {
                    info!("xmodem: transfer complete");
                    self.state = SenderState::Done;
                    return Ok(());
                }
                CAN => return Err(self.abort("cancelled at end of transfer")),
                other => trace!("xmodem: {:02X} in reply to EOT", other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmodem::{BLOCK_LEN, EOF_PAD, SOH};
    use std::collections::VecDeque;
    use std::vec::Vec;

    /// Transport with canned replies that records everything sent
    struct Scripted {
        replies: VecDeque<u8>,
        sent: Vec<u8>,
    }

    impl Scripted {
        fn new(replies: &[u8]) -> Self {
            Self {
                replies: replies.iter().copied().collect(),
                sent: Vec::new(),
            }
        }

        fn blocks(&self) -> Vec<&[u8]> {
            self.sent
                .chunks(BLOCK_LEN)
                .filter(|chunk| chunk.len() == BLOCK_LEN)
                .collect()
        }
    }

    impl Transport for Scripted {
        fn send(&mut self, data: &[u8]) -> Result<()> {
            self.sent.extend_from_slice(data);
            Ok(())
        }

        fn bytes_available(&mut self) -> Result<usize> {
            Ok(self.replies.len())
        }

        fn receive_byte(&mut self) -> Result<u8> {
            self.replies.pop_front().ok_or(Error::UnexpectedEof)
        }
    }

    #[test]
    fn test_cancel_before_start() {
        let mut sender = Sender::new(Scripted::new(&[b'x', CAN]));
        assert_eq!(sender.await_start(), Err(Error::TransferAborted));
        assert_eq!(sender.state(), SenderState::Aborted);
        assert_eq!(sender.send_payload(&[0; 128]), Err(Error::NotReady));
        assert!(sender.into_inner().sent.is_empty());
    }

    #[test]
    fn test_nak_resends_same_block() {
        let mut sender = Sender::new(Scripted::new(&[NAK, NAK, NAK, NAK, ACK, ACK, ACK]));
        sender.await_start().unwrap();
        assert_eq!(sender.state(), SenderState::Sending(1));

        let first = [0x11u8; 128];
        sender.send_payload(&first).unwrap();
        assert_eq!(sender.state(), SenderState::Sending(2));
        sender.send_payload(&[0x22u8; 128]).unwrap();
        assert_eq!(sender.state(), SenderState::Sending(3));

        let transport = sender.into_inner();
        let blocks = transport.blocks();
        assert_eq!(blocks.len(), 5);
        for block in &blocks[..4] {
            assert_eq!(*block, blocks[0]);
            assert_eq!(block[0], SOH);
            assert_eq!(block[1], 1);
            assert_eq!(block[2], 0xFE);
            assert_eq!(block[131], (0x11u32 * 128 % 256) as u8);
        }
        assert_eq!(blocks[4][1], 2);
        assert_eq!(blocks[4][2], 0xFD);
    }

    #[test]
    fn test_retry_ceiling_aborts() {
        let mut replies = Vec::from([NAK]);
        replies.extend([NAK; MAX_RETRIES as usize]);
        let mut sender = Sender::new(Scripted::new(&replies));
        sender.await_start().unwrap();
        assert_eq!(sender.send_payload(b"abc"), Err(Error::TransferAborted));
        assert_eq!(sender.state(), SenderState::Aborted);
        assert_eq!(sender.into_inner().blocks().len(), MAX_RETRIES as usize);
    }

    #[test]
    fn test_cancel_while_sending() {
        let mut sender = Sender::new(Scripted::new(&[NAK, CAN]));
        sender.start_received();
        assert_eq!(sender.state(), SenderState::Sending(1));
        sender.send_payload(b"abc").unwrap_err();
        assert_eq!(sender.state(), SenderState::Aborted);
    }

    #[test]
    fn test_short_payload_padded() {
        let mut sender = Sender::new(Scripted::new(&[NAK, ACK, NAK, ACK]));
        sender.await_start().unwrap();
        sender.send_all(b"hello").unwrap();
        assert_eq!(sender.state(), SenderState::Done);

        let transport = sender.into_inner();
        let block = transport.blocks()[0];
        assert_eq!(&block[3..8], b"hello");
        assert!(block[8..131].iter().all(|&b| b == EOF_PAD));
        // first EOT is NAKed, the second acknowledged
        assert_eq!(&transport.sent[BLOCK_LEN..], &[EOT, EOT]);
    }

    #[test]
    fn test_block_numbers_wrap() {
        let mut replies = Vec::from([NAK]);
        replies.extend([ACK; 300]);
        replies.push(ACK);
        let mut sender = Sender::new(Scripted::new(&replies));
        sender.await_start().unwrap();

        let data: Vec<u8> = (0..300 * 128).map(|i| (i / 128) as u8).collect();
        sender.send_all(&data).unwrap();

        let transport = sender.into_inner();
        let blocks = transport.blocks();
        assert_eq!(blocks.len(), 300);
        assert_eq!(blocks[0][1], 1);
        assert_eq!(blocks[254][1], 255);
        assert_eq!(blocks[255][1], 0);
        assert_eq!(blocks[255][2], 0xFF);
        assert_eq!(blocks[299][1], 44);
    }

    #[test]
    fn test_eot_repeats_past_retry_ceiling() {
        let mut replies = Vec::from([NAK]);
        replies.extend([NAK; MAX_RETRIES as usize + 2]);
        replies.push(ACK);
        let mut sender = Sender::new(Scripted::new(&replies));
        sender.await_start().unwrap();
        assert_eq!(sender.finish(), Ok(()));
        assert_eq!(sender.state(), SenderState::Done);

        let sent = sender.into_inner().sent;
        assert_eq!(sent.len(), MAX_RETRIES as usize + 3);
        assert!(sent.iter().all(|&b| b == EOT));
    }

    #[test]
    fn test_eot_cancel() {
        let mut sender = Sender::new(Scripted::new(&[NAK, CAN]));
        sender.await_start().unwrap();
        assert_eq!(sender.finish(), Err(Error::TransferAborted));
    }
}

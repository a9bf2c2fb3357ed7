//! In-memory byte streams

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use zifprom_core::error::{Error, Result};
use zifprom_core::transport::Transport;

/// Plays back canned input and records everything sent
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    incoming: VecDeque<u8>,
    sent: Vec<u8>,
}

impl ScriptedTransport {
    /// Create a transport that will deliver `incoming`, then report EOF
    pub fn new(incoming: &[u8]) -> Self {
        Self {
            incoming: incoming.iter().copied().collect(),
            sent: Vec::new(),
        }
    }

    /// Queue more input
    pub fn push(&mut self, data: &[u8]) {
        self.incoming.extend(data);
    }

    /// Everything sent so far
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    /// Take everything sent so far
    pub fn take_sent(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.sent)
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.sent.extend_from_slice(data);
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        Ok(self.incoming.len())
    }

    fn receive_byte(&mut self) -> Result<u8> {
        self.incoming.pop_front().ok_or(Error::UnexpectedEof)
    }
}

#[cfg(feature = "std")]
pub use self::loopback::LoopbackTransport;

#[cfg(feature = "std")]
mod loopback {
    use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};

    use zifprom_core::error::{Error, Result};
    use zifprom_core::transport::Transport;

    /// One end of an in-process, full duplex byte pipe
    #[derive(Debug)]
    pub struct LoopbackTransport {
        tx: Sender<u8>,
        rx: Receiver<u8>,
        peeked: Option<u8>,
    }

    impl LoopbackTransport {
        /// Create two connected ends
        pub fn pair() -> (Self, Self) {
            let (a_tx, b_rx) = channel();
            let (b_tx, a_rx) = channel();
            (
                Self {
                    tx: a_tx,
                    rx: a_rx,
                    peeked: None,
                },
                Self {
                    tx: b_tx,
                    rx: b_rx,
                    peeked: None,
                },
            )
        }
    }

    impl Transport for LoopbackTransport {
        fn send(&mut self, data: &[u8]) -> Result<()> {
            for &byte in data {
                self.tx.send(byte).map_err(|_| Error::TransportError)?;
            }
            Ok(())
        }

        fn bytes_available(&mut self) -> Result<usize> {
            if self.peeked.is_none() {
                match self.rx.try_recv() {
                    Ok(byte) => self.peeked = Some(byte),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => return Err(Error::UnexpectedEof),
                }
            }
            Ok(self.peeked.is_some() as usize)
        }

        fn receive_byte(&mut self) -> Result<u8> {
            match self.peeked.take() {
                Some(byte) => Ok(byte),
                None => self.rx.recv().map_err(|_| Error::UnexpectedEof),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_pair_is_full_duplex() {
            let (mut a, mut b) = LoopbackTransport::pair();
            a.send(b"hi").unwrap();
            b.send(&[0x15]).unwrap();

            assert_eq!(b.bytes_available().unwrap(), 1);
            assert_eq!(b.receive_byte().unwrap(), b'h');
            assert_eq!(b.receive_byte().unwrap(), b'i');
            assert_eq!(a.receive_byte().unwrap(), 0x15);
            assert_eq!(a.bytes_available().unwrap(), 0);

            drop(b);
            assert_eq!(a.receive_byte(), Err(Error::UnexpectedEof));
            assert_eq!(a.send(b"x"), Err(Error::TransportError));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_plays_back_then_eof() {
        let mut transport = ScriptedTransport::new(b"ab");
        transport.push(b"c");
        assert_eq!(transport.bytes_available().unwrap(), 3);
        assert_eq!(transport.receive_byte().unwrap(), b'a');
        assert_eq!(transport.receive_byte().unwrap(), b'b');
        assert_eq!(transport.receive_byte().unwrap(), b'c');
        assert_eq!(transport.receive_byte(), Err(Error::UnexpectedEof));

        transport.send(b"out").unwrap();
        assert_eq!(transport.take_sent(), b"out");
        assert!(transport.sent().is_empty());
    }
}

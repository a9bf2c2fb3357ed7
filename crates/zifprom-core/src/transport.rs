//! Byte stream underneath the monitor and XMODEM
//!
//! The reader talks to its host over whatever byte pipe the board has: a
//! USB CDC endpoint, a UART, or a TCP connection in the simulator. Only
//! three operations are needed, and receiving is always blocking: there
//! are no wall-clock timeouts anywhere in the protocol.

use embedded_io::{Error as _, ErrorType, Read, ReadExactError, ReadReady, Write};

use crate::error::{Error, Result};

/// Transport trait for sending and receiving bytes
pub trait Transport {
    /// Write all bytes to the transport
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Number of bytes that can be received without blocking
    fn bytes_available(&mut self) -> Result<usize>;

    /// Block until one byte arrives
    fn receive_byte(&mut self) -> Result<u8>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        (**self).send(data)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn receive_byte(&mut self) -> Result<u8> {
        (**self).receive_byte()
    }
}

#[cfg(feature = "alloc")]
impl Transport for alloc::boxed::Box<dyn Transport + Send> {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        (**self).send(data)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn receive_byte(&mut self) -> Result<u8> {
        (**self).receive_byte()
    }
}

/// Transport over any `embedded-io` stream
///
/// This is how a microcontroller's serial driver plugs in. Waiting for a
/// byte spins on [`ReadReady::read_ready`].
pub struct IoTransport<T> {
    io: T,
}

impl<T> IoTransport<T> {
    /// Wrap an `embedded-io` stream
    pub fn new(io: T) -> Self {
        Self { io }
    }

    /// Unwrap the stream
    pub fn into_inner(self) -> T {
        self.io
    }
}

fn io_error<E: embedded_io::Error>(e: E) -> Error {
    log::error!("transport: {:?}", e.kind());
    Error::TransportError
}

impl<T> Transport for IoTransport<T>
where
    T: ErrorType + Read + Write + ReadReady,
{
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.io.write_all(data).map_err(io_error)?;
        self.io.flush().map_err(io_error)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let ready = self.io.read_ready().map_err(io_error)?;
        Ok(ready as usize)
    }

    fn receive_byte(&mut self) -> Result<u8> {
        while !self.io.read_ready().map_err(io_error)? {
            core::hint::spin_loop();
        }

        let mut byte = [0u8; 1];
        match self.io.read_exact(&mut byte) {
            Ok(()) => Ok(byte[0]),
            Err(ReadExactError::UnexpectedEof) => Err(Error::UnexpectedEof),
            Err(ReadExactError::Other(e)) => Err(io_error(e)),
        }
    }
}

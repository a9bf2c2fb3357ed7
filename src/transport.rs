//! Host-side byte streams: serial port, TCP and stdin/stdout
//!
//! All of them are adapted to [`zifprom_core::transport::Transport`] by
//! [`StreamTransport`].

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use zifprom_core::error::{Error, Result};
use zifprom_core::transport::Transport;

/// Default read timeout for the host side of a transfer
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Streams that can report how many bytes are waiting
pub trait Pending {
    /// Bytes that can be read without blocking
    fn pending(&mut self) -> io::Result<usize>;
}

impl Pending for Box<dyn SerialPort> {
    fn pending(&mut self) -> io::Result<usize> {
        Ok(self.bytes_to_read()? as usize)
    }
}

impl Pending for TcpStream {
    fn pending(&mut self) -> io::Result<usize> {
        let mut buf = [0u8; 1];
        self.set_nonblocking(true)?;
        let result = match self.peek(&mut buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        };
        self.set_nonblocking(false)?;
        result
    }
}

/// The process's own stdin and stdout
pub struct Stdio;

impl Read for Stdio {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::stdin().read(buf)
    }
}

impl Write for Stdio {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

impl Pending for Stdio {
    // stdin cannot be polled portably
    fn pending(&mut self) -> io::Result<usize> {
        Ok(0)
    }
}

/// A [`Transport`] over any blocking `Read + Write` stream
pub struct StreamTransport<S> {
    stream: S,
}

impl<S> StreamTransport<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

/// Serial port transport
pub type SerialTransport = StreamTransport<Box<dyn SerialPort>>;

/// TCP socket transport
pub type TcpTransport = StreamTransport<TcpStream>;

/// Open a serial port, 8N1 without flow control
pub fn open_serial(
    device: &str,
    baud: u32,
) -> std::result::Result<SerialTransport, serialport::Error> {
    let port = serialport::new(device, baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(DEFAULT_TIMEOUT)
        .open()?;

    log::info!("Opened serial port {} at {} baud", device, baud);
    Ok(StreamTransport::new(port))
}

/// Connect to a device (or simulator) listening on TCP
pub fn connect_tcp(addr: &str) -> io::Result<TcpTransport> {
    log::info!("Connecting to {}", addr);
    let stream = TcpStream::connect(addr)?;
    stream.set_read_timeout(Some(DEFAULT_TIMEOUT))?;
    TcpTransport::from_stream(stream)
}

impl TcpTransport {
    /// Wrap an accepted or connected stream
    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        // Set TCP_NODELAY to reduce latency
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }
}

fn io_error(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            log::debug!("transport: timed out waiting for data");
            Error::Timeout
        }
        _ => {
            log::error!("transport: {}", e);
            Error::TransportError
        }
    }
}

impl<S: Read + Write + Pending> Transport for StreamTransport<S> {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).map_err(io_error)?;
        self.stream.flush().map_err(io_error)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        self.stream.pending().map_err(io_error)
    }

    fn receive_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        match self.stream.read(&mut buf) {
            Ok(0) => Err(Error::UnexpectedEof),
            Ok(_) => Ok(buf[0]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => self.receive_byte(),
            Err(e) => Err(io_error(e)),
        }
    }
}

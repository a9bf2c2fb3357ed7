//! Single-character command monitor
//!
//! This is what a terminal connected to the reader talks to:
//!
//! | Key        | Action                                              |
//! |------------|-----------------------------------------------------|
//! | `l`        | list the catalog                                    |
//! | `0`-`9`, `A`-`Z` | select a profile                              |
//! | `r` *hex* ⏎ | dump 64 bytes from an address                      |
//! | NAK (0x15) | XMODEM receive started: send the whole chip         |
//! | `i`        | probe an ISP target and show its signature          |
//! | `t`        | tri-state the socket                                |
//! | `?`, `h`   | help                                                |
//!
//! Bad input is answered with `?` and changes nothing. Every session that
//! powers the socket ends with the socket tri-stated, whatever the outcome.

use core::fmt::{self, Write as _};

use heapless::{String, Vec};
use log::{debug, info, warn};

use crate::chip::{catalog, ChipProfile};
use crate::error::{Error, Result};
use crate::programmer::ZifSocket;
use crate::sequencer::Sequencer;
use crate::transport::Transport;
use crate::xmodem::{Sender, CAN, NAK, PAYLOAD_LEN};

/// Bytes shown by a dump command
pub const DUMP_LEN: u32 = 64;

/// Bytes per dump row
const DUMP_ROW: u32 = 16;

/// Longest hex address accepted (24 address bits)
const MAX_HEX_DIGITS: usize = 6;

/// Longest line of input collected after `r`
const MAX_LINE: usize = 16;

const HELP: &str = "\
l        list chips\r\n\
0-9 A-Z  select chip\r\n\
r<hex>   dump 64 bytes\r\n\
i        probe ISP target\r\n\
t        tri-state socket\r\n\
start an XMODEM (checksum) receive to read the chip\r\n";

/// Map a byte to itself if printable, `.` otherwise
pub fn printable(byte: u8) -> char {
    if byte.is_ascii_graphic() || byte == b' ' {
        byte as char
    } else {
        '.'
    }
}

/// Parse a hexadecimal address of up to six digits
pub fn parse_hex(input: &[u8]) -> Result<u32> {
    if input.is_empty() || input.len() > MAX_HEX_DIGITS {
        return Err(Error::InvalidHex);
    }
    input.iter().try_fold(0u32, |addr, &c| {
        let digit = (c as char).to_digit(16).ok_or(Error::InvalidHex)?;
        Ok((addr << 4) | digit)
    })
}

/// Command loop over one transport and one socket
pub struct Monitor<S, T> {
    engine: Sequencer<'static, S>,
    transport: T,
}

impl<S: ZifSocket, T: Transport> Monitor<S, T> {
    /// Create a monitor around an engine and the host connection
    pub fn new(engine: Sequencer<'static, S>, transport: T) -> Self {
        Self { engine, transport }
    }

    /// Access the engine
    pub fn engine_mut(&mut self) -> &mut Sequencer<'static, S> {
        &mut self.engine
    }

    /// Take the monitor apart, tri-stating the socket
    pub fn into_parts(mut self) -> (Sequencer<'static, S>, T) {
        self.engine.tristate();
        (self.engine, self.transport)
    }

    fn print(&mut self, args: fmt::Arguments<'_>) -> Result<()> {
        let mut line: String<128> = String::new();
        if line.write_fmt(args).is_err() {
            warn!("monitor: output line truncated");
        }
        self.transport.send(line.as_bytes())
    }

    /// Serve commands until the transport fails or closes.
    ///
    /// Command errors are reported to the host and the loop carries on;
    /// only [`Error::TransportError`] and [`Error::UnexpectedEof`] end it.
    pub fn run(&mut self) -> Result<()> {
        self.engine.tristate();
        self.print(format_args!("zifprom ready, ? for help\r\n"))?;

        loop {
            self.step()?;
        }
    }

    /// Block for one command and run it
    pub fn step(&mut self) -> Result<()> {
        let command = self.transport.receive_byte()?;
        match self.dispatch(command) {
            Ok(()) => Ok(()),
            Err(e @ (Error::TransportError | Error::UnexpectedEof)) => Err(e),
            Err(Error::InvalidHex | Error::InvalidProfile) => {
                self.print(format_args!("?\r\n"))
            }
            Err(e) => {
                debug!("monitor: command {:02X} failed: {}", command, e);
                self.print(format_args!("? {}\r\n", e))
            }
        }
    }

    fn dispatch(&mut self, command: u8) -> Result<()> {
        match command {
            b'\r' | b'\n' => Ok(()),
            b'l' => self.list(),
            b'r' => self.dump(),
            b'i' => self.probe(),
            b't' => {
                self.engine.tristate();
                self.print(format_args!("socket tri-stated\r\n"))
            }
            b'?' | b'h' => self.transport.send(HELP.as_bytes()),
            NAK => self.transfer(),
            c => match catalog::index_of_selector(c) {
                Some(index) => self.select(index),
                None => Err(Error::InvalidProfile),
            },
        }
    }

    fn list(&mut self) -> Result<()> {
        let current = self.engine.profile();
        for (index, chip) in catalog::profiles().iter().enumerate() {
            let mark = if current == Some(chip) { '*' } else { ' ' };
            let selector = catalog::selector(index).unwrap_or('?');
            let kind = if chip.is_isp() { "isp" } else { "" };
            self.print(format_args!(
                "{}{} {:<16} {:2} pins {:6} bytes {}\r\n",
                mark,
                selector,
                chip.name,
                chip.pins,
                chip.image_size(),
                kind
            ))?;
        }
        Ok(())
    }

    fn select(&mut self, index: usize) -> Result<()> {
        let chip = catalog::get(index)?;
        self.engine.select(chip);
        info!("monitor: selected {}", chip.name);
        self.print(format_args!("selected {}\r\n", chip.name))?;
        self.print_power(chip)
    }

    fn print_power(&mut self, chip: &ChipProfile) -> Result<()> {
        if let Some(vcc) = chip.vcc {
            self.print(format_args!("  vcc on pin {}\r\n", vcc))?;
        }
        if let Some(gnd) = chip.gnd {
            self.print(format_args!("  gnd on pin {}\r\n", gnd))?;
        }
        Ok(())
    }

    /// Collect one line of input, echoing it
    fn read_line(&mut self) -> Result<Vec<u8, MAX_LINE>> {
        let mut line = Vec::new();
        let mut overflow = false;
        loop {
            let c = self.transport.receive_byte()?;
            if c == b'\r' || c == b'\n' {
                self.print(format_args!("\r\n"))?;
                return if overflow { Err(Error::InvalidHex) } else { Ok(line) };
            }
            self.transport.send(&[c])?;
            overflow |= line.push(c).is_err();
        }
    }

    /// Run a powered-socket session, tri-stating afterwards
    fn session<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        let result = f(self);
        self.engine.tristate();
        result
    }

    fn dump(&mut self) -> Result<()> {
        let line = self.read_line()?;
        let addr = parse_hex(&line)?;
        let size = self.engine.profile().map_or(0, |chip| chip.image_size());
        if self.engine.profile().is_some_and(|chip| !chip.is_unused()) && addr >= size {
            return Err(Error::AddressOutOfBounds);
        }

        self.session(|this| {
            this.engine.setup()?;
            let end = addr.saturating_add(DUMP_LEN).min(size);
            let mut row = addr;
            while row < end {
                let mut bytes = [0u8; DUMP_ROW as usize];
                let len = (end - row).min(DUMP_ROW) as usize;
                this.engine.read_into(row, &mut bytes[..len])?;

                let mut text: String<16> = String::new();
                let mut hex: String<48> = String::new();
                for &b in &bytes[..len] {
                    // both strings are sized for a full row
                    let _ = write!(hex, "{:02X} ", b);
                    let _ = text.push(printable(b));
                }
                this.print(format_args!("{:06X}: {:<48}{}\r\n", row, hex, text))?;
                row += len as u32;
            }
            Ok(())
        })
    }

    fn probe(&mut self) -> Result<()> {
        match self.engine.profile() {
            Some(chip) if chip.is_isp() => {}
            Some(chip) if !chip.is_unused() => return Err(Error::InvalidProfile),
            _ => return Err(Error::NoChipSelected),
        }

        self.session(|this| {
            this.engine.setup()?;
            let [a, b, c] = this.engine.isp_signature()?;
            this.print(format_args!("signature {:02X} {:02X} {:02X}\r\n", a, b, c))
        })
    }

    /// Send the whole chip; the receiver's NAK has already been read
    fn transfer(&mut self) -> Result<()> {
        info!("monitor: XMODEM transfer requested");
        self.session(|this| {
            if let Err(e) = this.engine.setup() {
                // the host is waiting for a block, tell it to give up
                this.transport.send(&[CAN, CAN])?;
                return Err(e);
            }

            let size = this.engine.profile().map_or(0, |chip| chip.image_size());
            let mut sender = Sender::new(&mut this.transport);
            sender.start_received();

            let mut payload = [0u8; PAYLOAD_LEN];
            let mut addr = 0u32;
            while addr < size {
                let len = (size - addr).min(PAYLOAD_LEN as u32) as usize;
                if let Err(e) = this.engine.read_into(addr, &mut payload[..len]) {
                    sender.transport_mut().send(&[CAN, CAN])?;
                    return Err(e);
                }
                sender.send_payload(&payload[..len])?;
                addr += len as u32;
            }
            sender.finish()
        })
    }
}

//! Bit-banged serial programming for AVR-style targets
//!
//! Microcontroller profiles have no parallel bus. Instead the reader
//! clocks the target's serial programming interface through five socket
//! pins and supplies the target's oscillator on its XTAL input, so chips
//! fused for an external crystal can still be read.
//!
//! The link is full duplex and MSB first: every byte sent returns a
//! byte. Instructions are four bytes, see [`opcodes`].

pub mod opcodes;

use log::{debug, trace, warn};

use crate::chip::{Bus, ChipProfile};
use crate::error::{Error, Result};
use crate::programmer::ZifSocket;
use crate::socket::{Direction, SocketPin};

/// Oscillator cycles spent with reset high, and again after releasing it
const RESET_PULSE_CYCLES: u32 = 16;

/// Socket pins of a serial programming link, already translated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IspLink {
    /// Serial clock
    pub sck: SocketPin,
    /// Data towards the target
    pub mosi: SocketPin,
    /// Data from the target
    pub miso: SocketPin,
    /// Target reset
    pub reset: SocketPin,
    /// Target oscillator input
    pub xtal: SocketPin,
    half_period_us: u32,
}

impl IspLink {
    /// Resolve the link for an ISP profile.
    ///
    /// Fails with [`Error::InvalidProfile`] for parallel profiles or if a
    /// role pin does not fit the package. A zero half period is raised
    /// to 1 µs.
    pub fn new(profile: &ChipProfile, half_period_us: u32) -> Result<Self> {
        let Bus::Isp(pins) = &profile.bus else {
            return Err(Error::InvalidProfile);
        };
        let pin = |p| profile.socket_pin(p).ok_or(Error::InvalidProfile);

        Ok(Self {
            sck: pin(pins.sck)?,
            mosi: pin(pins.mosi)?,
            miso: pin(pins.miso)?,
            reset: pin(pins.reset)?,
            xtal: pin(pins.xtal)?,
            half_period_us: half_period_us.max(1),
        })
    }

    /// Configure the link pins: everything driven low except MISO
    pub fn configure<S: ZifSocket>(&self, socket: &mut S) {
        for pin in [self.sck, self.mosi, self.reset, self.xtal] {
            socket.drive(pin, false);
            socket.set_direction(pin, Direction::Output);
        }
        socket.set_direction(self.miso, Direction::Input);
        socket.drive(self.miso, false);
    }

    /// Toggle the oscillator pin high then low `cycles` times
    pub fn clock<S: ZifSocket>(&self, socket: &mut S, cycles: u32) {
        for _ in 0..cycles {
            socket.drive(self.xtal, true);
            socket.delay_us(self.half_period_us);
            socket.drive(self.xtal, false);
            socket.delay_us(self.half_period_us);
        }
    }

    /// Keep the oscillator running for roughly `ms` milliseconds
    fn clock_for_ms<S: ZifSocket>(&self, socket: &mut S, ms: u32) {
        let period_us = 2 * self.half_period_us;
        self.clock(socket, ms.saturating_mul(1000) / period_us);
    }

    /// Shift one byte out on MOSI while shifting one in from MISO
    pub fn exchange<S: ZifSocket>(&self, socket: &mut S, byte: u8) -> u8 {
        let mut received = 0u8;
        for bit in (0..8).rev() {
            socket.drive(self.mosi, (byte >> bit) & 1 != 0);
            self.clock(socket, 1);
            socket.drive(self.sck, true);
            self.clock(socket, 1);
            received = (received << 1) | socket.sample(self.miso) as u8;
            socket.drive(self.sck, false);
        }
        trace!("isp: {:02X} -> {:02X}", byte, received);
        received
    }

    /// Run one four byte instruction, returning the four echoed bytes
    pub fn transaction<S: ZifSocket>(&self, socket: &mut S, command: [u8; 4]) -> [u8; 4] {
        command.map(|byte| self.exchange(socket, byte))
    }

    /// Put the target into serial programming mode.
    ///
    /// Pulses reset while clocking the target, waits `settle_ms` and sends
    /// Programming Enable. On failure the target stays powered and the
    /// four echoed bytes are returned in [`Error::IspHandshakeFailed`]; the
    /// caller may simply try again.
    pub fn enter<S: ZifSocket>(&self, socket: &mut S, settle_ms: u32) -> Result<()> {
        socket.drive(self.sck, false);
        socket.drive(self.mosi, false);

        socket.drive(self.reset, true);
        self.clock(socket, RESET_PULSE_CYCLES);
        socket.drive(self.reset, false);
        self.clock(socket, RESET_PULSE_CYCLES);
        self.clock_for_ms(socket, settle_ms);

        // pull-up on MISO so a missing target reads as 0xFF, not noise
        socket.drive(self.miso, true);
        let echo = self.transaction(socket, opcodes::PROGRAMMING_ENABLE);
        socket.drive(self.miso, false);

        if echo[2] == opcodes::ENABLE_ECHO {
            debug!("isp: programming enabled");
            Ok(())
        } else {
            warn!(
                "isp: handshake failed, echo {:02X} {:02X} {:02X} {:02X}",
                echo[0], echo[1], echo[2], echo[3]
            );
            Err(Error::IspHandshakeFailed(echo))
        }
    }

    /// Read one byte of program memory at a byte address
    pub fn read_flash<S: ZifSocket>(&self, socket: &mut S, addr: u32) -> u8 {
        self.transaction(socket, opcodes::read_flash(addr))[3]
    }

    /// Read the three device signature bytes
    pub fn read_signature<S: ZifSocket>(&self, socket: &mut S) -> [u8; opcodes::SIGNATURE_LEN] {
        let mut signature = [0u8; opcodes::SIGNATURE_LEN];
        for (index, byte) in signature.iter_mut().enumerate() {
            *byte = self.transaction(socket, opcodes::read_signature(index as u8))[3];
        }
        signature
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::catalog;

    /// Socket that plays back a fixed MISO bit stream and records MOSI
    struct ScriptedTarget {
        levels: [bool; 41],
        miso: SocketPin,
        mosi: SocketPin,
        sck: SocketPin,
        reply: &'static [u8],
        bit: usize,
        sent: [u8; 16],
        sent_bits: usize,
        xtal_edges: u32,
        xtal: SocketPin,
        delayed_us: u32,
    }

    impl ScriptedTarget {
        fn new(link: &IspLink, reply: &'static [u8]) -> Self {
            Self {
                levels: [false; 41],
                miso: link.miso,
                mosi: link.mosi,
                sck: link.sck,
                reply,
                bit: 0,
                sent: [0; 16],
                sent_bits: 0,
                xtal_edges: 0,
                xtal: link.xtal,
                delayed_us: 0,
            }
        }
    }

    impl ZifSocket for ScriptedTarget {
        fn set_direction(&mut self, _pin: SocketPin, _direction: Direction) {}

        fn drive(&mut self, pin: SocketPin, high: bool) {
            if pin == self.sck && high && !self.levels[pin.get() as usize] {
                let mosi = self.levels[self.mosi.get() as usize] as u8;
                let byte = self.sent_bits / 8;
                if byte < self.sent.len() {
                    self.sent[byte] = (self.sent[byte] << 1) | mosi;
                }
                self.sent_bits += 1;
            }
            if pin == self.xtal && high {
                self.xtal_edges += 1;
            }
            self.levels[pin.get() as usize] = high;
        }

        fn sample(&mut self, pin: SocketPin) -> bool {
            assert_eq!(pin, self.miso);
            let byte = self.reply.get(self.bit / 8).copied().unwrap_or(0xFF);
            let level = (byte >> (7 - self.bit % 8)) & 1 != 0;
            self.bit += 1;
            level
        }

        fn delay_us(&mut self, us: u32) {
            self.delayed_us += us;
        }
    }

    fn atmega8() -> IspLink {
        let (_, chip) = catalog::find("ATMega8").unwrap();
        IspLink::new(chip, 2).unwrap()
    }

    #[test]
    fn test_link_pins_translated() {
        let link = atmega8();
        // 28 pin package: pin 19 sits on socket 31, pin 9 on socket 9
        assert_eq!(link.sck.get(), 31);
        assert_eq!(link.mosi.get(), 29);
        assert_eq!(link.miso.get(), 30);
        assert_eq!(link.reset.get(), 1);
        assert_eq!(link.xtal.get(), 9);
    }

    #[test]
    fn test_parallel_profile_rejected() {
        let (_, chip) = catalog::find("M27C256").unwrap();
        assert_eq!(IspLink::new(chip, 2), Err(Error::InvalidProfile));
    }

    #[test]
    fn test_exchange_msb_first() {
        let link = atmega8();
        let mut target = ScriptedTarget::new(&link, &[0xA5]);
        assert_eq!(link.exchange(&mut target, 0x3C), 0xA5);
        assert_eq!(target.sent[0], 0x3C);
        // two oscillator pulses per bit
        assert_eq!(target.xtal_edges, 16);
    }

    #[test]
    fn test_handshake_success() {
        let link = atmega8();
        let mut target = ScriptedTarget::new(&link, &[0xFF, 0xAC, 0x53, 0x00]);
        assert_eq!(link.enter(&mut target, 20), Ok(()));
        assert_eq!(&target.sent[..4], &opcodes::PROGRAMMING_ENABLE);
    }

    #[test]
    fn test_handshake_failure_reports_echo() {
        let link = atmega8();
        let mut target = ScriptedTarget::new(&link, &[0x12, 0x34, 0x00, 0x56]);
        assert_eq!(
            link.enter(&mut target, 20),
            Err(Error::IspHandshakeFailed([0x12, 0x34, 0x00, 0x56]))
        );
    }

    #[test]
    fn test_read_flash_returns_last_echo() {
        let link = atmega8();
        let mut target = ScriptedTarget::new(&link, &[0x00, 0x20, 0x00, 0x9C]);
        assert_eq!(link.read_flash(&mut target, 0x1100), 0x9C);
        assert_eq!(&target.sent[..4], &[0x28, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_zero_half_period_still_delays() {
        let (_, chip) = catalog::find("ATMega8").unwrap();
        let link = IspLink::new(chip, 0).unwrap();
        let mut target = ScriptedTarget::new(&link, &[]);
        link.clock(&mut target, 3);
        assert_eq!(target.delayed_us, 6);
    }
}

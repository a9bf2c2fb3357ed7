//! Simulated AVR microcontroller in serial programming mode

use alloc::vec::Vec;

use zifprom_core::chip::{Bus, ChipProfile};
use zifprom_core::isp::opcodes;
use zifprom_core::socket::SocketPin;

use crate::socket::PinState;

/// ATmega8 device signature
pub const ATMEGA8_SIGNATURE: [u8; 3] = [0x1E, 0x93, 0x07];

/// Oscillator pulses needed while reset is high for the pulse to count
const MIN_RESET_CLOCKS: u32 = 2;

#[derive(Debug, Clone, Copy)]
struct Roles {
    sck: SocketPin,
    mosi: SocketPin,
    miso: SocketPin,
    reset: SocketPin,
    xtal: SocketPin,
}

/// An AVR target that has no clock of its own
///
/// The target counts oscillator pulses on XTAL and ignores serial clock
/// edges that arrive without one, the way a real part without a running
/// clock would. It only listens after a reset pulse given while SCK is
/// low, and echoes every byte one byte late.
#[derive(Debug, Clone)]
pub struct AvrTarget {
    profile: &'static ChipProfile,
    roles: Option<Roles>,
    flash: Vec<u8>,
    signature: [u8; 3],
    armed: bool,
    enabled: bool,
    reset_clocks: u32,
    clocks_since_edge: u32,
    clock_faults: u32,
    command: [u8; 4],
    position: usize,
    shift_in: u8,
    shift_out: u8,
    bits: u8,
}

impl AvrTarget {
    /// Seat a target with the given program memory
    pub fn new(profile: &'static ChipProfile, flash: Vec<u8>) -> Self {
        let roles = match &profile.bus {
            Bus::Isp(isp) => (|| {
                Some(Roles {
                    sck: profile.socket_pin(isp.sck)?,
                    mosi: profile.socket_pin(isp.mosi)?,
                    miso: profile.socket_pin(isp.miso)?,
                    reset: profile.socket_pin(isp.reset)?,
                    xtal: profile.socket_pin(isp.xtal)?,
                })
            })(),
            _ => None,
        };

        Self {
            profile,
            roles,
            flash,
            signature: ATMEGA8_SIGNATURE,
            armed: false,
            enabled: false,
            reset_clocks: 0,
            clocks_since_edge: 0,
            clock_faults: 0,
            command: [0; 4],
            position: 0,
            shift_in: 0,
            shift_out: 0xFF,
            bits: 0,
        }
    }

    /// Use a different device signature
    pub fn with_signature(mut self, signature: [u8; 3]) -> Self {
        self.signature = signature;
        self
    }

    /// Whether Programming Enable has been accepted
    pub fn programming_enabled(&self) -> bool {
        self.enabled
    }

    /// Serial clock edges seen without an oscillator pulse in between
    pub fn clock_faults(&self) -> u32 {
        self.clock_faults
    }

    /// Program memory contents
    pub fn flash(&self) -> &[u8] {
        &self.flash
    }

    fn powered(&self, pins: &PinState) -> bool {
        let profile = self.profile;
        profile
            .hi_pins
            .iter()
            .filter_map(|&p| profile.socket_pin(p))
            .all(|pin| pins.is_driven(pin, true))
            && profile
                .lo_pins
                .iter()
                .filter_map(|&p| profile.socket_pin(p))
                .all(|pin| pins.is_driven(pin, false))
    }

    /// React to the reader driving a pin; `was_high` is the previous level
    pub fn on_drive(&mut self, pins: &PinState, pin: SocketPin, was_high: bool, high: bool) {
        let Some(roles) = self.roles else {
            return;
        };
        if was_high == high || !self.powered(pins) {
            return;
        }

        if pin == roles.xtal && high {
            self.reset_clocks += 1;
            self.clocks_since_edge += 1;
        } else if pin == roles.reset {
            if high {
                self.reset_clocks = 0;
                self.armed = false;
            } else {
                self.armed = self.reset_clocks >= MIN_RESET_CLOCKS && !pins.level(roles.sck);
                self.enabled = false;
                self.position = 0;
                self.bits = 0;
                self.shift_out = 0xFF;
                self.clocks_since_edge = 0;
            }
        } else if pin == roles.sck && self.listening(pins) {
            if self.clocks_since_edge == 0 {
                self.clock_faults += 1;
            }
            self.clocks_since_edge = 0;

            if high {
                let bit = pins.level(roles.mosi) as u8;
                self.shift_in = (self.shift_in << 1) | bit;
            } else {
                self.bits += 1;
                if self.bits == 8 {
                    let byte = self.shift_in;
                    self.bits = 0;
                    self.shift_in = 0;
                    self.byte_received(byte);
                }
            }
        }
    }

    fn listening(&self, pins: &PinState) -> bool {
        self.armed && self.roles.is_some_and(|roles| !pins.level(roles.reset))
    }

    fn byte_received(&mut self, byte: u8) {
        self.command[self.position] = byte;
        self.position += 1;

        if self.position == 4 {
            self.position = 0;
            if self.command[..2] == opcodes::PROGRAMMING_ENABLE[..2] {
                self.enabled = true;
            }
        }

        self.shift_out = match (self.enabled, self.position) {
            (true, 3) => self.execute_read().unwrap_or(byte),
            _ => byte,
        };
    }

    /// Result byte of a read instruction, known once three bytes are in
    fn execute_read(&self) -> Option<u8> {
        match self.command[0] & !opcodes::READ_FLASH_ADDR_HIGH {
            opcodes::READ_FLASH => {
                let addr = opcodes::flash_address(&self.command) as usize;
                Some(self.flash.get(addr).copied().unwrap_or(0xFF))
            }
            opcodes::READ_SIGNATURE => self.signature.get(self.command[2] as usize).copied(),
            _ => None,
        }
    }

    /// Level the target drives on `pin`, or `None` if it does not drive it
    pub fn output(&self, pins: &PinState, pin: SocketPin) -> Option<bool> {
        let roles = self.roles?;
        if pin != roles.miso || !self.powered(pins) || !self.listening(pins) {
            return None;
        }
        Some((self.shift_out >> (7 - self.bits)) & 1 != 0)
    }
}

//! Simulated 40-pin socket

use alloc::vec::Vec;

use log::trace;
use zifprom_core::chip::ChipProfile;
use zifprom_core::programmer::ZifSocket;
use zifprom_core::socket::{Direction, SocketPin, SOCKET_PINS};

use crate::avr::AvrTarget;
use crate::rom::RomTarget;

const PINS: usize = SOCKET_PINS as usize;

/// What the reader currently does with every socket pin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinState {
    directions: [Direction; PINS],
    levels: [bool; PINS],
}

impl Default for PinState {
    fn default() -> Self {
        Self {
            directions: [Direction::Input; PINS],
            levels: [false; PINS],
        }
    }
}

impl PinState {
    /// Direction of a pin
    pub fn direction(&self, pin: SocketPin) -> Direction {
        self.directions[pin.index()]
    }

    /// Output level, or pull-up state for an input
    pub fn level(&self, pin: SocketPin) -> bool {
        self.levels[pin.index()]
    }

    /// Whether the pin is an output driven to `level`
    pub fn is_driven(&self, pin: SocketPin, level: bool) -> bool {
        self.direction(pin) == Direction::Output && self.level(pin) == level
    }
}

/// One call made on the socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOp {
    /// `set_direction`
    Direction(SocketPin, Direction),
    /// `drive`
    Drive(SocketPin, bool),
    /// `sample`, with the level returned
    Sample(SocketPin, bool),
}

/// Misbehaviour of data lines right after the address changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Noise {
    /// Lines are stable immediately
    #[default]
    Quiet,
    /// The first n samples of each line read inverted
    Settling(u32),
    /// Every other sample of each line reads inverted, forever
    Chaotic,
}

/// What sits in the socket
#[derive(Debug, Clone, Default)]
pub enum Target {
    /// Empty socket
    #[default]
    Empty,
    /// Parallel ROM
    Rom(RomTarget),
    /// AVR microcontroller
    Avr(AvrTarget),
}

impl Target {
    fn on_drive(&mut self, pins: &PinState, pin: SocketPin, was_high: bool, high: bool) {
        match self {
            Self::Empty => {}
            Self::Rom(rom) => rom.on_drive(pins, pin, was_high, high),
            Self::Avr(avr) => avr.on_drive(pins, pin, was_high, high),
        }
    }

    fn output(&self, pins: &PinState, pin: SocketPin) -> Option<bool> {
        match self {
            Self::Empty => None,
            Self::Rom(rom) => rom.output(pins, pin),
            Self::Avr(avr) => avr.output(pins, pin),
        }
    }
}

/// A socket with a simulated chip seated in it
///
/// Inputs read what the chip drives, or their pull-up state when nothing
/// drives them. Delays only advance a virtual clock.
#[derive(Debug, Clone)]
pub struct SimulatedSocket {
    pins: PinState,
    target: Target,
    noise: Noise,
    samples: [u32; PINS],
    elapsed_us: u64,
    log: Option<Vec<PinOp>>,
}

impl Default for SimulatedSocket {
    fn default() -> Self {
        Self {
            pins: PinState::default(),
            target: Target::Empty,
            noise: Noise::Quiet,
            samples: [0; PINS],
            elapsed_us: 0,
            log: None,
        }
    }
}

impl SimulatedSocket {
    /// An empty socket
    pub fn new() -> Self {
        Self::default()
    }

    /// A socket holding a parallel ROM with the given contents
    pub fn with_rom(profile: &'static ChipProfile, image: Vec<u8>) -> Self {
        Self {
            target: Target::Rom(RomTarget::new(profile, image)),
            ..Self::default()
        }
    }

    /// A socket holding an AVR with the given program memory
    pub fn with_avr(profile: &'static ChipProfile, flash: Vec<u8>) -> Self {
        Self {
            target: Target::Avr(AvrTarget::new(profile, flash)),
            ..Self::default()
        }
    }

    /// Seat a prepared target
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Add data line noise
    pub fn with_noise(mut self, noise: Noise) -> Self {
        self.noise = noise;
        self
    }

    /// Record every socket call
    pub fn with_log(mut self) -> Self {
        self.log = Some(Vec::new());
        self
    }

    /// Recorded calls, empty unless logging is on
    pub fn ops(&self) -> &[PinOp] {
        self.log.as_deref().unwrap_or(&[])
    }

    /// Forget the recorded calls
    pub fn clear_ops(&mut self) {
        if let Some(log) = &mut self.log {
            log.clear();
        }
    }

    /// Current pin configuration
    pub fn pins(&self) -> &PinState {
        &self.pins
    }

    /// Whether every pin is an input at level 0
    pub fn is_tristated(&self) -> bool {
        self.pins == PinState::default()
    }

    /// Virtual time spent in delays
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }

    /// The seated chip
    pub fn target(&self) -> &Target {
        &self.target
    }

    fn record(&mut self, op: PinOp) {
        if let Some(log) = &mut self.log {
            log.push(op);
        }
    }

    fn apply_noise(&mut self, pin: SocketPin, level: bool) -> bool {
        let count = &mut self.samples[pin.index()];
        let n = *count;
        *count = count.saturating_add(1);

        match self.noise {
            Noise::Quiet => level,
            Noise::Settling(samples) => level ^ (n < samples),
            Noise::Chaotic => level ^ (n % 2 == 1),
        }
    }
}

impl ZifSocket for SimulatedSocket {
    fn set_direction(&mut self, pin: SocketPin, direction: Direction) {
        self.record(PinOp::Direction(pin, direction));
        self.pins.directions[pin.index()] = direction;
    }

    fn drive(&mut self, pin: SocketPin, high: bool) {
        self.record(PinOp::Drive(pin, high));
        let was_high = self.pins.levels[pin.index()];
        self.pins.levels[pin.index()] = high;
        self.samples = [0; PINS];

        if self.pins.direction(pin) == Direction::Output {
            self.target.on_drive(&self.pins, pin, was_high, high);
        }
    }

    fn sample(&mut self, pin: SocketPin) -> bool {
        let level = if self.pins.direction(pin) == Direction::Output {
            self.pins.level(pin)
        } else if let Some(level) = self.target.output(&self.pins, pin) {
            self.apply_noise(pin, level)
        } else {
            self.pins.level(pin)
        };
        trace!("dummy: sample {} = {}", pin, level as u8);
        self.record(PinOp::Sample(pin, level));
        level
    }

    fn delay_us(&mut self, us: u32) {
        self.elapsed_us += u64::from(us);
    }

    fn propagation_delay(&mut self, _spins: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(n: u8) -> SocketPin {
        SocketPin::new(n).unwrap()
    }

    #[test]
    fn test_empty_socket_reads_pullups() {
        let mut socket = SimulatedSocket::new();
        assert!(socket.is_tristated());
        assert!(!socket.sample(pin(5)));
        socket.drive(pin(5), true);
        assert!(socket.sample(pin(5)));
        assert!(!socket.is_tristated());
    }

    #[test]
    fn test_output_reads_back_own_level() {
        let mut socket = SimulatedSocket::new().with_log();
        socket.drive(pin(3), true);
        socket.set_direction(pin(3), Direction::Output);
        assert!(socket.pins().is_driven(pin(3), true));
        assert!(socket.sample(pin(3)));
        assert_eq!(
            socket.ops(),
            &[
                PinOp::Drive(pin(3), true),
                PinOp::Direction(pin(3), Direction::Output),
                PinOp::Sample(pin(3), true),
            ]
        );
        socket.clear_ops();
        assert!(socket.ops().is_empty());
    }

    #[test]
    fn test_delays_accumulate() {
        let mut socket = SimulatedSocket::new();
        socket.delay_us(7);
        socket.delay_ms(2);
        assert_eq!(socket.elapsed_us(), 2007);
    }
}

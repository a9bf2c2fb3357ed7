//! Socket sequencing engine
//!
//! The [`Sequencer`] owns the socket and the currently selected profile.
//! It powers a chip up in a safe order, reads it through either the
//! parallel bus or the serial programming link, and returns every socket
//! pin to tri-state when asked.
//!
//! ```text
//!  Tristate --setup--> Configuring --parallel--> Ready
//!                           |                      ^
//!                           +--isp--> IspHandshake-+
//!                                          |
//!                                          +--> Faulted --retry_isp--> ...
//!  any state --tristate--> Tristate
//! ```

use log::{debug, info, trace, warn};

use crate::chip::{Bus, ChipProfile, Options, ParallelBus};
use crate::error::{Error, Result};
use crate::isp::IspLink;
use crate::programmer::ZifSocket;
use crate::socket::{Direction, PackagePin, SocketPin};

/// Delay after powering the chip before the first access, in ms
pub const DEFAULT_SETTLE_MS: u32 = 250;

/// Number of data bus samples before giving up on a stable value
pub const DEFAULT_MAX_SAMPLES: u8 = 8;

/// Spin iterations between driving an address and sampling the data bus
pub const DEFAULT_PROPAGATION_SPINS: u32 = 255;

/// Half period of the ISP oscillator and serial clock, in µs
pub const DEFAULT_ISP_HALF_PERIOD_US: u32 = 4;

/// Time the ISP target needs after reset before it accepts commands, in ms
pub const DEFAULT_ISP_SETTLE_MS: u32 = 20;

/// Tunables for the sequencing engine
///
/// The defaults are empirical values that work for the chips in the
/// catalog. Slow or noisy setups may want a longer settle time or more
/// samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerConfig {
    /// Delay after setup before the chip is accessed
    pub settle_ms: u32,
    /// Maximum data bus samples per byte (at least 1)
    pub max_samples: u8,
    /// Spin iterations between address and data
    pub propagation_spins: u32,
    /// ISP clock half period (at least 1)
    pub isp_half_period_us: u32,
    /// ISP settle time after reset
    pub isp_settle_ms: u32,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            settle_ms: DEFAULT_SETTLE_MS,
            max_samples: DEFAULT_MAX_SAMPLES,
            propagation_spins: DEFAULT_PROPAGATION_SPINS,
            isp_half_period_us: DEFAULT_ISP_HALF_PERIOD_US,
            isp_settle_ms: DEFAULT_ISP_SETTLE_MS,
        }
    }
}

impl SequencerConfig {
    /// Set the power-up settle delay
    pub fn with_settle_ms(mut self, ms: u32) -> Self {
        self.settle_ms = ms;
        self
    }

    /// Set the maximum number of samples per byte
    pub fn with_max_samples(mut self, samples: u8) -> Self {
        self.max_samples = samples.max(1);
        self
    }

    /// Set the address-to-data propagation spin count
    pub fn with_propagation_spins(mut self, spins: u32) -> Self {
        self.propagation_spins = spins;
        self
    }

    /// Set the ISP clock half period; zero is raised to 1 µs
    pub fn with_isp_half_period_us(mut self, us: u32) -> Self {
        self.isp_half_period_us = us.max(1);
        self
    }

    /// Set the ISP settle time after reset
    pub fn with_isp_settle_ms(mut self, ms: u32) -> Self {
        self.isp_settle_ms = ms;
        self
    }
}

/// Engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Every socket pin is an undriven input
    Tristate,
    /// Power and bus pins are being configured
    Configuring,
    /// Waiting for the ISP target to accept programming mode
    IspHandshake,
    /// Bytes can be read
    Ready,
    /// The ISP target refused programming mode; may be retried
    Faulted,
}

/// Sequencing engine for one socket
pub struct Sequencer<'c, S> {
    socket: S,
    config: SequencerConfig,
    profile: Option<&'c ChipProfile>,
    state: State,
    isp: Option<IspLink>,
}

impl<'c, S: ZifSocket> Sequencer<'c, S> {
    /// Create an engine with the default configuration.
    ///
    /// No profile is selected and the socket is assumed to be tri-stated;
    /// call [`Sequencer::tristate`] first if that is not guaranteed.
    pub fn new(socket: S) -> Self {
        Self::with_config(socket, SequencerConfig::default())
    }

    /// Create an engine with a custom configuration
    pub fn with_config(socket: S, config: SequencerConfig) -> Self {
        Self {
            socket,
            config,
            profile: None,
            state: State::Tristate,
            isp: None,
        }
    }

    /// Current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Configuration in use
    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Currently selected profile
    pub fn profile(&self) -> Option<&'c ChipProfile> {
        self.profile
    }

    /// Access the socket backend
    pub fn socket_mut(&mut self) -> &mut S {
        &mut self.socket
    }

    /// Tri-state the socket and hand the backend back
    pub fn into_socket(mut self) -> S {
        self.tristate();
        self.socket
    }

    /// Select the profile used by the next [`Sequencer::setup`].
    ///
    /// Selection alone does not configure the socket, but a powered
    /// socket is tri-stated first since its wiring belongs to the old
    /// profile.
    pub fn select(&mut self, profile: &'c ChipProfile) {
        if self.state != State::Tristate {
            self.tristate();
        }
        debug!("engine: selected {}", profile.name);
        self.profile = Some(profile);
    }

    /// Set every socket pin to an undriven input at level 0.
    ///
    /// Safe to call from any state, any number of times.
    pub fn tristate(&mut self) {
        for pin in SocketPin::all() {
            self.socket.set_direction(pin, Direction::Input);
            self.socket.drive(pin, false);
        }
        if self.state != State::Tristate {
            debug!("engine: socket tri-stated");
        }
        self.state = State::Tristate;
        self.isp = None;
    }

    fn drive_fixed(&mut self, profile: &ChipProfile, pins: &[PackagePin], high: bool) {
        for &pin in pins {
            if let Some(pin) = profile.socket_pin(pin) {
                self.socket.drive(pin, high);
                self.socket.set_direction(pin, Direction::Output);
            }
        }
    }

    /// Power up the selected chip and prepare it for reading.
    ///
    /// Fixed-low pins come up first, then fixed-high pins, then the bus.
    /// After the settle delay a parallel chip is [`State::Ready`]; an ISP
    /// target goes through the programming handshake, and ends up in
    /// [`State::Faulted`] if it refuses.
    pub fn setup(&mut self) -> Result<()> {
        let profile = match self.profile {
            Some(profile) if !profile.is_unused() => profile,
            _ => return Err(Error::NoChipSelected),
        };

        if self.state != State::Tristate {
            self.tristate();
        }

        info!("engine: setting up {}", profile.name);
        self.state = State::Configuring;

        self.drive_fixed(profile, profile.lo_pins, false);
        self.drive_fixed(profile, profile.hi_pins, true);

        match &profile.bus {
            Bus::Parallel(bus) => {
                self.drive_fixed(profile, bus.addr, false);
                let pullups = profile.options.contains(Options::PULLUPS);
                for pin in bus.data.iter().filter_map(|&p| profile.socket_pin(p)) {
                    self.socket.set_direction(pin, Direction::Input);
                    self.socket.drive(pin, pullups);
                }
            }
            Bus::Isp(_) => {
                let link = match IspLink::new(profile, self.config.isp_half_period_us) {
                    Ok(link) => link,
                    Err(e) => {
                        self.tristate();
                        return Err(e);
                    }
                };
                link.configure(&mut self.socket);
                self.isp = Some(link);
            }
            Bus::Unused => return Err(Error::NoChipSelected),
        }

        self.socket.delay_ms(self.config.settle_ms);

        if profile.is_isp() {
            self.state = State::IspHandshake;
            self.handshake()
        } else {
            self.state = State::Ready;
            Ok(())
        }
    }

    fn handshake(&mut self) -> Result<()> {
        let link = self.isp.ok_or(Error::NotReady)?;
        match link.enter(&mut self.socket, self.config.isp_settle_ms) {
            Ok(()) => {
                self.state = State::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = State::Faulted;
                Err(e)
            }
        }
    }

    /// Repeat the ISP handshake after a failure
    pub fn retry_isp(&mut self) -> Result<()> {
        match self.state {
            State::Faulted | State::IspHandshake => {
                self.state = State::IspHandshake;
                self.handshake()
            }
            _ => Err(Error::NotReady),
        }
    }

    /// Read the ISP target's signature bytes
    pub fn isp_signature(&mut self) -> Result<[u8; 3]> {
        match (self.state, self.isp) {
            (State::Ready, Some(link)) => Ok(link.read_signature(&mut self.socket)),
            _ => Err(Error::NotReady),
        }
    }

    /// Read one byte at a linear address
    pub fn read_byte(&mut self, addr: u32) -> Result<u8> {
        let profile = match (self.state, self.profile) {
            (State::Ready, Some(profile)) => profile,
            _ => return Err(Error::NotReady),
        };
        if addr >= profile.image_size() {
            return Err(Error::AddressOutOfBounds);
        }

        match (&profile.bus, self.isp) {
            (Bus::Parallel(bus), _) => Ok(self.read_parallel(profile, bus, addr)),
            (Bus::Isp(_), Some(link)) => Ok(link.read_flash(&mut self.socket, addr)),
            _ => Err(Error::NotReady),
        }
    }

    /// Fill `buf` with consecutive bytes starting at `addr`
    pub fn read_into(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        for (offset, byte) in buf.iter_mut().enumerate() {
            *byte = self.read_byte(addr + offset as u32)?;
        }
        Ok(())
    }

    fn set_address(&mut self, profile: &ChipProfile, bus: &ParallelBus, mut addr: u32) {
        for pin in bus.addr.iter().filter_map(|&p| profile.socket_pin(p)) {
            self.socket.drive(pin, addr & 1 != 0);
            addr >>= 1;
        }

        if let Some(latch) = bus.latch.and_then(|p| profile.socket_pin(p)) {
            self.socket.drive(latch, true);
            self.socket.drive(latch, false);
        }
    }

    /// Sample the data bus once; the first data pin is bit 0
    fn sample_data(&mut self, profile: &ChipProfile, bus: &ParallelBus) -> u8 {
        let mut byte = 0u8;
        for pin in bus.data.iter().filter_map(|&p| profile.socket_pin(p)) {
            let bit = if self.socket.sample(pin) { 0x80 } else { 0 };
            byte = (byte >> 1) | bit;
        }
        byte.checked_shr(8 - bus.data.len() as u32).unwrap_or(0)
    }

    fn read_parallel(&mut self, profile: &ChipProfile, bus: &ParallelBus, addr: u32) -> u8 {
        self.set_address(profile, bus, addr);
        self.socket.propagation_delay(self.config.propagation_spins);

        let mut last = self.sample_data(profile, bus);
        for _ in 1..self.config.max_samples {
            let next = self.sample_data(profile, bus);
            if next == last {
                trace!("engine: {:06X} = {:02X}", addr, next);
                return next;
            }
            last = next;
        }

        if self.config.max_samples > 1 {
            warn!("engine: unstable read at {:06X}, using {:02X}", addr, last);
        }
        last
    }
}

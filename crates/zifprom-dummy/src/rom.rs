//! Simulated parallel ROM

use alloc::vec::Vec;

use zifprom_core::chip::{Bus, ChipProfile, ParallelBus};
use zifprom_core::socket::{PackagePin, SocketPin};

use crate::socket::PinState;

/// A parallel memory chip seated in the socket
///
/// The chip only answers while every fixed pin of its profile is driven
/// the right way; otherwise its data pins float. Chips with a latch
/// strobe capture the address on the falling edge of the strobe.
#[derive(Debug, Clone)]
pub struct RomTarget {
    profile: &'static ChipProfile,
    image: Vec<u8>,
    latched: u32,
}

impl RomTarget {
    /// Seat a chip holding `image`; the image repeats if shorter than the chip
    pub fn new(profile: &'static ChipProfile, image: Vec<u8>) -> Self {
        Self {
            profile,
            image,
            latched: 0,
        }
    }

    /// Profile the chip was built from
    pub fn profile(&self) -> &'static ChipProfile {
        self.profile
    }

    /// Memory contents
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    fn bus(&self) -> Option<&'static ParallelBus> {
        match &self.profile.bus {
            Bus::Parallel(bus) => Some(bus),
            _ => None,
        }
    }

    /// Number of data pins
    pub fn data_width(&self) -> usize {
        self.bus().map_or(0, |bus| bus.data.len())
    }

    /// Whether the reader powers and enables the chip
    pub fn powered(&self, pins: &PinState) -> bool {
        let profile = self.profile;
        // the latch strobe is a fixed-low pin that is briefly pulsed high
        let latch = self.bus().and_then(|bus| bus.latch);
        let driven = |list: &[PackagePin], level: bool| {
            list.iter()
                .filter(|&&p| Some(p) != latch)
                .filter_map(|&p| profile.socket_pin(p))
                .all(|pin| pins.is_driven(pin, level))
        };

        driven(profile.hi_pins, true) && driven(profile.lo_pins, false)
    }

    /// Address currently presented on the address pins
    pub fn address(&self, pins: &PinState) -> u32 {
        let Some(bus) = self.bus() else {
            return 0;
        };
        bus.addr
            .iter()
            .enumerate()
            .filter_map(|(bit, &p)| Some((bit, self.profile.socket_pin(p)?)))
            .filter(|&(_, pin)| pins.is_driven(pin, true))
            .fold(0, |addr, (bit, _)| addr | (1 << bit))
    }

    /// React to the reader driving a pin; `was_high` is the previous level
    pub fn on_drive(&mut self, pins: &PinState, pin: SocketPin, was_high: bool, high: bool) {
        let latch = self
            .bus()
            .and_then(|bus| bus.latch)
            .and_then(|p| self.profile.socket_pin(p));
        if latch == Some(pin) && was_high && !high {
            self.latched = self.address(pins);
        }
    }

    /// Level the chip drives on `pin`, or `None` if it does not drive it
    pub fn output(&self, pins: &PinState, pin: SocketPin) -> Option<bool> {
        let bus = self.bus()?;
        let bit = bus
            .data
            .iter()
            .position(|&p| self.profile.socket_pin(p) == Some(pin))?;
        if !self.powered(pins) || self.image.is_empty() {
            return None;
        }

        let addr = if bus.latch.is_some() {
            self.latched
        } else {
            self.address(pins)
        };
        let byte = self.image[addr as usize % self.image.len()];
        Some((byte >> bit) & 1 != 0)
    }
}

//! Chip profile type definitions

use super::options::Options;
use crate::error::{Error, Result};
use crate::socket::{self, PackagePin, SocketPin};

/// Parallel memory bus description
///
/// The position of a pin in `addr` is its bit significance: `addr[0]`
/// carries address bit 0. Likewise `data[0]` is data bit 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelBus {
    /// Address pins, least significant first
    pub addr: &'static [PackagePin],
    /// Data pins, least significant first
    pub data: &'static [PackagePin],
    /// Latch strobe, one of the fixed-low pins (only with [`Options::LATCH`])
    pub latch: Option<PackagePin>,
}

/// Pin roles for an in-system-programmable microcontroller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IspPins {
    /// Serial clock (SCK)
    pub sck: PackagePin,
    /// Serial data from the reader to the target (MOSI)
    pub mosi: PackagePin,
    /// Serial data from the target back to the reader (MISO)
    pub miso: PackagePin,
    /// Target reset
    pub reset: PackagePin,
    /// Oscillator input, clocked by the reader
    pub xtal: PackagePin,
    /// Width of the program memory address in bytes (image is 2^width)
    pub addr_width: u8,
}

/// How the chip is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bus {
    /// Nothing is wired up, the socket stays tri-stated
    Unused,
    /// Parallel address/data bus
    Parallel(ParallelBus),
    /// Serial in-system programming interface
    Isp(IspPins),
}

/// Role a package pin plays in a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinRole {
    /// Address bit n
    Address(u8),
    /// Data bit n
    Data(u8),
    /// Held high
    High,
    /// Held low
    Low,
    /// Held low and pulsed after each address change
    Latch,
    /// ISP serial clock
    Sck,
    /// ISP data towards the target
    Mosi,
    /// ISP data from the target
    Miso,
    /// ISP target reset
    Reset,
    /// ISP oscillator
    Xtal,
    /// Not driven
    Unconnected,
}

/// Chip profile definition
///
/// Profiles are generated at build time from `chips/profiles.ron` and
/// live in a `static` table; see [`crate::chip::catalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipProfile {
    /// Name of the chip type
    pub name: &'static str,
    /// Electrical quirks
    pub options: Options,
    /// Total number of pins on the package
    pub pins: u8,
    /// Bus description
    pub bus: Bus,
    /// Pins driven high at all times (power, program enable)
    pub hi_pins: &'static [PackagePin],
    /// Pins driven low at all times (ground, output enable, chip select)
    pub lo_pins: &'static [PackagePin],
    /// Supply pin, for the user's information only
    pub vcc: Option<PackagePin>,
    /// Ground pin, for the user's information only
    pub gnd: Option<PackagePin>,
}

impl ChipProfile {
    /// Number of address bits
    pub fn addr_width(&self) -> u8 {
        match &self.bus {
            Bus::Unused => 0,
            Bus::Parallel(bus) => bus.addr.len() as u8,
            Bus::Isp(isp) => isp.addr_width,
        }
    }

    /// Number of parallel data bits; 0 for ISP and unused profiles
    pub fn data_width(&self) -> u8 {
        match &self.bus {
            Bus::Parallel(bus) => bus.data.len() as u8,
            _ => 0,
        }
    }

    /// Size of the image in bytes (2^addr_width), 0 when nothing is wired
    pub fn image_size(&self) -> u32 {
        match &self.bus {
            Bus::Unused => 0,
            _ => 1u32 << self.addr_width(),
        }
    }

    /// Whether this profile is read through the ISP interface
    pub fn is_isp(&self) -> bool {
        matches!(self.bus, Bus::Isp(_))
    }

    /// Whether this is the safe "no chip" profile
    pub fn is_unused(&self) -> bool {
        matches!(self.bus, Bus::Unused)
    }

    /// Translate a raw package pin number for this package.
    ///
    /// Returns `None` for pin 0 and for pins beyond the package.
    pub fn translate(&self, package_pin: u8) -> Option<SocketPin> {
        socket::translate(self.pins, package_pin)
    }

    /// Socket position of a package pin of this profile
    pub fn socket_pin(&self, pin: PackagePin) -> Option<SocketPin> {
        self.translate(pin.get())
    }

    /// Role of a package pin in this profile
    pub fn role_of(&self, pin: PackagePin) -> PinRole {
        match &self.bus {
            Bus::Parallel(bus) => {
                if bus.latch == Some(pin) {
                    return PinRole::Latch;
                }
                if let Some(bit) = bus.addr.iter().position(|&p| p == pin) {
                    return PinRole::Address(bit as u8);
                }
                if let Some(bit) = bus.data.iter().position(|&p| p == pin) {
                    return PinRole::Data(bit as u8);
                }
            }
            Bus::Isp(isp) => {
                let roles = [
                    (isp.sck, PinRole::Sck),
                    (isp.mosi, PinRole::Mosi),
                    (isp.miso, PinRole::Miso),
                    (isp.reset, PinRole::Reset),
                    (isp.xtal, PinRole::Xtal),
                ];
                if let Some((_, role)) = roles.iter().find(|(p, _)| *p == pin) {
                    return *role;
                }
            }
            Bus::Unused => {}
        }

        if self.hi_pins.contains(&pin) {
            PinRole::High
        } else if self.lo_pins.contains(&pin) {
            PinRole::Low
        } else {
            PinRole::Unconnected
        }
    }

    /// Check the profile invariants.
    ///
    /// Every pin must lie inside the package, bus pins must not overlap
    /// the fixed pins, and the latch pin must be one of the fixed-low pins.
    /// The build-time generator enforces the same rules; this is the
    /// runtime mirror for profiles built by hand.
    pub fn validate(&self) -> Result<()> {
        if self.pins == 0 || self.pins > socket::SOCKET_PINS {
            return Err(Error::InvalidProfile);
        }

        let documented = self.vcc.iter().chain(self.gnd.iter());
        for pin in self.hi_pins.iter().chain(self.lo_pins.iter()).chain(documented) {
            if pin.get() > self.pins {
                return Err(Error::InvalidProfile);
            }
        }
        if self.hi_pins.iter().any(|p| self.lo_pins.contains(p)) {
            return Err(Error::InvalidProfile);
        }

        let check_bus_pin = |pin: &PackagePin| -> Result<()> {
            if pin.get() > self.pins || self.hi_pins.contains(pin) || self.lo_pins.contains(pin) {
                Err(Error::InvalidProfile)
            } else {
                Ok(())
            }
        };

        match &self.bus {
            Bus::Unused => {
                if !self.hi_pins.is_empty() || !self.lo_pins.is_empty() {
                    return Err(Error::InvalidProfile);
                }
            }
            Bus::Parallel(bus) => {
                if bus.data.is_empty() || bus.data.len() > 8 || bus.addr.len() > 24 {
                    return Err(Error::InvalidProfile);
                }
                for pin in bus.addr.iter().chain(bus.data.iter()) {
                    check_bus_pin(pin)?;
                }
                if bus.addr.iter().any(|p| bus.data.contains(p)) {
                    return Err(Error::InvalidProfile);
                }
                match bus.latch {
                    Some(latch) if !self.lo_pins.contains(&latch) => {
                        return Err(Error::InvalidProfile)
                    }
                    Some(_) if !self.options.contains(Options::LATCH) => {
                        return Err(Error::InvalidProfile)
                    }
                    None if self.options.contains(Options::LATCH) => {
                        return Err(Error::InvalidProfile)
                    }
                    _ => {}
                }
            }
            Bus::Isp(isp) => {
                let roles = [isp.sck, isp.mosi, isp.miso, isp.reset, isp.xtal];
                for (i, pin) in roles.iter().enumerate() {
                    check_bus_pin(pin)?;
                    if roles[i + 1..].contains(pin) {
                        return Err(Error::InvalidProfile);
                    }
                }
                if isp.addr_width == 0 || isp.addr_width > 24 {
                    return Err(Error::InvalidProfile);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn p(n: u8) -> PackagePin {
        PackagePin::new(n)
    }

    static ADDR: [PackagePin; 4] = [p(1), p(2), p(3), p(4)];
    static DATA: [PackagePin; 2] = [p(5), p(6)];
    static HI: [PackagePin; 1] = [p(8)];
    static LO: [PackagePin; 1] = [p(7)];

    fn tiny() -> ChipProfile {
        ChipProfile {
            name: "TINY",
            options: Options::empty(),
            pins: 8,
            bus: Bus::Parallel(ParallelBus {
                addr: &ADDR,
                data: &DATA,
                latch: None,
            }),
            hi_pins: &HI,
            lo_pins: &LO,
            vcc: Some(p(8)),
            gnd: Some(p(7)),
        }
    }

    #[test]
    fn test_widths_and_size() {
        let chip = tiny();
        assert_eq!(chip.addr_width(), 4);
        assert_eq!(chip.data_width(), 2);
        assert_eq!(chip.image_size(), 16);
        assert!(!chip.is_isp());
        assert!(chip.validate().is_ok());
    }

    #[test]
    fn test_roles() {
        let chip = tiny();
        assert_eq!(chip.role_of(p(3)), PinRole::Address(2));
        assert_eq!(chip.role_of(p(6)), PinRole::Data(1));
        assert_eq!(chip.role_of(p(8)), PinRole::High);
        assert_eq!(chip.role_of(p(7)), PinRole::Low);
    }

    #[test]
    fn test_translate_uses_package_size() {
        let chip = tiny();
        assert_eq!(chip.translate(0), None);
        assert_eq!(chip.translate(4).unwrap().get(), 4);
        assert_eq!(chip.translate(5).unwrap().get(), 37);
    }

    #[test]
    fn test_overlap_rejected() {
        static BAD_HI: [PackagePin; 1] = [p(1)];
        let chip = ChipProfile {
            hi_pins: &BAD_HI,
            ..tiny()
        };
        assert_eq!(chip.validate(), Err(Error::InvalidProfile));
    }

    #[test]
    fn test_latch_must_be_fixed_low() {
        let chip = ChipProfile {
            options: Options::LATCH,
            bus: Bus::Parallel(ParallelBus {
                addr: &ADDR,
                data: &DATA,
                latch: Some(p(8)),
            }),
            ..tiny()
        };
        assert_eq!(chip.validate(), Err(Error::InvalidProfile));
    }
}

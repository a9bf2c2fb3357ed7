//! Universal 40-pin socket geometry
//!
//! Smaller packages are seated flush against pin 1 of the socket. The
//! lower half of the package lines up with the socket's lower half, and
//! the upper half is shifted so that the package's last pin sits on
//! socket pin 40. Everything that touches the socket goes through
//! [`translate`] so no caller ever deals with raw socket numbering.

use core::fmt;
use core::num::NonZeroU8;

/// Number of pins on the socket
pub const SOCKET_PINS: u8 = 40;

/// A physical socket position, 1..=40
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SocketPin(NonZeroU8);

impl SocketPin {
    /// Create a socket pin, returning `None` outside 1..=40
    pub const fn new(pin: u8) -> Option<Self> {
        if pin > SOCKET_PINS {
            return None;
        }
        match NonZeroU8::new(pin) {
            Some(p) => Some(Self(p)),
            None => None,
        }
    }

    /// Socket pin number
    pub const fn get(self) -> u8 {
        self.0.get()
    }

    /// Zero-based index, handy for per-pin state tables
    pub const fn index(self) -> usize {
        self.0.get() as usize - 1
    }

    /// Iterate over every socket pin in order
    pub fn all() -> impl Iterator<Item = SocketPin> {
        (1..=SOCKET_PINS).filter_map(SocketPin::new)
    }
}

impl fmt::Display for SocketPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Z{}", self.get())
    }
}

/// A pin number in a chip's own package numbering, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackagePin(NonZeroU8);

impl PackagePin {
    /// Create a package pin.
    ///
    /// Panics on 0; used from the generated catalog where it is a
    /// compile-time check.
    pub const fn new(pin: u8) -> Self {
        match NonZeroU8::new(pin) {
            Some(p) => Self(p),
            None => panic!("package pins are numbered from 1"),
        }
    }

    /// Package pin number
    pub const fn get(self) -> u8 {
        self.0.get()
    }
}

impl fmt::Display for PackagePin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Translate a package pin into the socket pin it is seated on.
///
/// `package_pins` is the total pin count of the package. Returns `None`,
/// meaning "leave the socket alone", for pin 0, for pins beyond the
/// package and for packages that do not fit the socket.
pub const fn translate(package_pins: u8, package_pin: u8) -> Option<SocketPin> {
    if package_pin == 0 || package_pin > package_pins || package_pins > SOCKET_PINS {
        return None;
    }

    if package_pin <= package_pins / 2 {
        SocketPin::new(package_pin)
    } else {
        SocketPin::new(package_pin + (SOCKET_PINS - package_pins))
    }
}

/// Pin direction as seen from the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// High impedance input
    #[default]
    Input,
    /// Driven output
    Output,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_in_range_and_injective() {
        for pins in 1..=SOCKET_PINS {
            let mut seen = [false; SOCKET_PINS as usize + 1];
            for k in 1..=pins {
                let pin = translate(pins, k).unwrap().get();
                assert!((1..=SOCKET_PINS).contains(&pin));
                assert!(!seen[pin as usize], "pins={} k={} collides", pins, k);
                seen[pin as usize] = true;
            }
        }
    }

    #[test]
    fn test_translate_zero_is_sentinel() {
        for pins in 0..=SOCKET_PINS {
            assert_eq!(translate(pins, 0), None);
        }
    }

    #[test]
    fn test_translate_28_pin_package() {
        assert_eq!(translate(28, 1).unwrap().get(), 1);
        assert_eq!(translate(28, 14).unwrap().get(), 14);
        assert_eq!(translate(28, 15).unwrap().get(), 27);
        assert_eq!(translate(28, 28).unwrap().get(), 40);
    }

    #[test]
    fn test_translate_out_of_package() {
        assert_eq!(translate(24, 25), None);
        assert_eq!(translate(41, 1), None);
    }

    #[test]
    fn test_full_socket_is_identity() {
        for k in 1..=SOCKET_PINS {
            assert_eq!(translate(SOCKET_PINS, k).unwrap().get(), k);
        }
    }

    #[test]
    fn test_socket_pin_bounds() {
        assert!(SocketPin::new(0).is_none());
        assert!(SocketPin::new(41).is_none());
        assert_eq!(SocketPin::new(40).unwrap().index(), 39);
        assert_eq!(SocketPin::all().count(), 40);
    }
}

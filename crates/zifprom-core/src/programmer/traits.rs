//! Socket driver trait definitions

use crate::socket::{Direction, SocketPin};

/// Raw access to the 40 physical pins of the socket
///
/// All methods are infallible: a backend that can fail (a GPIO line that
/// refuses a request) logs the failure and carries on, the same way a
/// microcontroller port write cannot fail. Callers never use raw socket
/// numbering directly, they go through [`crate::socket::translate`].
///
/// Every wait in the reader is a spin on this trait, so substituting a
/// deterministic fake makes the whole engine testable.
pub trait ZifSocket {
    /// Configure a pin as an input or an output
    fn set_direction(&mut self, pin: SocketPin, direction: Direction);

    /// Set the output level of a pin.
    ///
    /// On an input this enables (`true`) or disables the pin's pull-up.
    fn drive(&mut self, pin: SocketPin, high: bool);

    /// Read the current level of a pin
    fn sample(&mut self, pin: SocketPin) -> bool;

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);

    /// Delay for the specified number of milliseconds
    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.delay_us(1000);
        }
    }

    /// Short settle time measured in loop iterations rather than time
    ///
    /// Used between driving an address and sampling the data bus. Backends
    /// whose pin accesses are slow anyway may override this with a no-op.
    fn propagation_delay(&mut self, spins: u32) {
        for _ in 0..spins {
            core::hint::spin_loop();
        }
    }
}

impl<T: ZifSocket + ?Sized> ZifSocket for &mut T {
    fn set_direction(&mut self, pin: SocketPin, direction: Direction) {
        (**self).set_direction(pin, direction)
    }

    fn drive(&mut self, pin: SocketPin, high: bool) {
        (**self).drive(pin, high)
    }

    fn sample(&mut self, pin: SocketPin) -> bool {
        (**self).sample(pin)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }

    fn propagation_delay(&mut self, spins: u32) {
        (**self).propagation_delay(spins)
    }
}

// Boxed sockets let the host binary pick a backend at runtime
#[cfg(feature = "alloc")]
impl ZifSocket for alloc::boxed::Box<dyn ZifSocket + Send> {
    fn set_direction(&mut self, pin: SocketPin, direction: Direction) {
        (**self).set_direction(pin, direction)
    }

    fn drive(&mut self, pin: SocketPin, high: bool) {
        (**self).drive(pin, high)
    }

    fn sample(&mut self, pin: SocketPin) -> bool {
        (**self).sample(pin)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }

    fn propagation_delay(&mut self, spins: u32) {
        (**self).propagation_delay(spins)
    }
}

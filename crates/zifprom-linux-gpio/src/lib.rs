//! zifprom-linux-gpio - ZIF socket on Linux GPIO lines
//!
//! This crate drives the 40 socket pins directly from GPIO lines using the
//! Linux character device interface (gpiocdev). It suits single-board
//! computers with enough free GPIOs, wired through suitable level shifters
//! to the socket.
//!
//! # Usage with the zifprom CLI
//!
//! ```bash
//! # Socket pin k on line k-1 of gpiochip0, monitor on stdin/stdout
//! zifprom gpio --wiring dev=/dev/gpiochip0,base=0
//!
//! # Explicit wiring, 40 offsets, socket pin 1 first
//! zifprom gpio --wiring gpiochip=0,lines=2:3:4:17:27:22:10:9:...
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel 5.5+ with GPIO character device support (bias needs the v2 API)
//! - Access to `/dev/gpiochipN` devices (may require root or udev rules)

pub mod device;
pub mod error;

// Re-exports
pub use device::{parse_options, LinuxGpioSocket, LinuxGpioSocketConfig};
pub use error::{LinuxGpioError, Result};

/// Open a socket from a wiring string such as `dev=/dev/gpiochip0,base=0`
pub fn open_linux_gpio_socket(
    wiring: &str,
) -> std::result::Result<LinuxGpioSocket, Box<dyn std::error::Error>> {
    let options: Vec<(&str, &str)> = wiring
        .split(',')
        .filter(|opt| !opt.is_empty())
        .map(|opt| opt.split_once('=').unwrap_or((opt, "")))
        .collect();
    let config = parse_options(&options)?;
    Ok(LinuxGpioSocket::open(&config)?)
}

//! GPIO command implementation

use zifprom_core::error::Error;
use zifprom_core::monitor::Monitor;
use zifprom_core::sequencer::Sequencer;
use zifprom_linux_gpio::open_linux_gpio_socket;

use crate::transport::{Stdio, StreamTransport};

/// Serve the monitor on stdin/stdout until stdin closes
pub fn run_gpio(wiring: &str) -> Result<(), Box<dyn std::error::Error>> {
    let socket = open_linux_gpio_socket(wiring)?;
    let mut monitor = Monitor::new(Sequencer::new(socket), StreamTransport::new(Stdio));

    let result = monitor.run();
    // leave the socket tri-stated whatever happened
    drop(monitor.into_parts());

    match result {
        Ok(()) | Err(Error::UnexpectedEof) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

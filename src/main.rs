//! zifprom - ROM and EPROM reader for a 40-pin ZIF socket
//!
//! The reader seats any supported chip in a universal socket, powers it
//! through its own pins according to a compiled-in profile and streams the
//! contents to a host over XMODEM. This binary is the host side and a few
//! ways to run the reader itself:
//!
//! - `list` and `pinout` show the chip catalog and how a chip sits in the socket
//! - `dump` receives a whole chip from a reader on a serial port or TCP
//! - `simulate` runs the reader's monitor over TCP with a simulated chip
//! - `gpio` runs the monitor on stdin/stdout with a socket on Linux GPIO lines

mod cli;
mod commands;
mod transport;

use clap::Parser;
use cli::{Cli, Commands};
use zifprom_core::chip::catalog;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    log::debug!("Catalog holds {} chip profiles", catalog::len());

    let result = match cli.command {
        Commands::List => {
            commands::list_chips();
            Ok(())
        }
        Commands::Pinout { chip } => commands::show_pinout(&chip),
        Commands::Dump {
            connection,
            baud,
            chip,
            output,
        } => commands::run_dump(&connection, baud, chip.as_deref(), &output),
        Commands::Simulate {
            chip,
            image,
            listen,
        } => commands::run_simulate(&chip, &image, &listen),
        #[cfg(feature = "linux-gpio")]
        Commands::Gpio { wiring } => commands::run_gpio(&wiring),
    };

    result
}

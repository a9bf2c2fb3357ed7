//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default address of the socket simulator
pub const DEFAULT_LISTEN: &str = "127.0.0.1:2323";

#[derive(Parser)]
#[command(name = "zifprom")]
#[command(author, version, about = "ROM and EPROM reader for a 40-pin ZIF socket", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the reader is connected
#[derive(clap::Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct ConnectionArgs {
    /// Serial port of the reader (e.g. /dev/ttyUSB0)
    #[arg(short, long)]
    pub port: Option<String>,

    /// TCP address of a reader or simulator (e.g. 127.0.0.1:2323)
    #[arg(long)]
    pub tcp: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the chip catalog
    List,

    /// Show where each package pin of a chip sits in the socket
    Pinout {
        /// Chip name or selector character
        chip: String,
    },

    /// Read a whole chip from the reader over XMODEM
    Dump {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Serial baud rate
        #[arg(short, long, default_value_t = 115200)]
        baud: u32,

        /// Chip to select before reading (name or selector character);
        /// the reader's current selection is used if omitted
        #[arg(short, long)]
        chip: Option<String>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run the reader's monitor over TCP with a simulated chip in the socket
    Simulate {
        /// Chip to seat (name or selector character)
        #[arg(short, long)]
        chip: String,

        /// Contents of the simulated chip; repeated if shorter than the chip
        #[arg(short, long)]
        image: PathBuf,

        /// Address to listen on
        #[arg(short, long, default_value = DEFAULT_LISTEN)]
        listen: String,
    },

    /// Run the reader's monitor on stdin/stdout with a socket on Linux GPIO lines
    #[cfg(feature = "linux-gpio")]
    Gpio {
        /// Wiring options, e.g. dev=/dev/gpiochip0,base=0 or gpiochip=0,lines=A:B:...
        #[arg(short, long)]
        wiring: String,
    },
}

//! zifprom-core - Core library for reading chips through a ZIF socket
//!
//! This crate drives a universal 40-pin socket to read parallel ROMs and
//! EPROMs, or to talk to AVR-style microcontrollers over their serial
//! programming interface, and streams the captured image to a host with
//! XMODEM. It is `no_std` so the same code runs on the reader's
//! microcontroller and in host-side simulations.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable boxed socket and transport trait objects
//!
//! # Example
//!
//! ```ignore
//! use zifprom_core::{chip::catalog, programmer::ZifSocket, sequencer::Sequencer};
//!
//! fn dump<S: ZifSocket>(socket: S) -> zifprom_core::Result<()> {
//!     let mut engine = Sequencer::new(socket);
//!     engine.select(catalog::find("M27C256").unwrap().1);
//!     engine.setup()?;
//!     let first = engine.read_byte(0)?;
//!     engine.tristate();
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod chip;
pub mod error;
pub mod isp;
pub mod monitor;
pub mod programmer;
pub mod sequencer;
pub mod socket;
pub mod transport;
pub mod xmodem;

pub use error::{Error, Result};

//! Chip profile option flags

use bitflags::bitflags;

bitflags! {
    /// Option flags for chip profiles
    ///
    /// These flags describe electrical quirks the sequencer has to honour.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Options: u8 {
        /// Enable pull-ups on the data inputs
        const PULLUPS = 1 << 0;
        /// Pulse the latch pin after every address change
        const LATCH   = 1 << 1;
    }
}

impl Default for Options {
    fn default() -> Self {
        Options::empty()
    }
}

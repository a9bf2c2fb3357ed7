//! Compiled-in chip profile catalog
//!
//! The table is generated at build time from `chips/profiles.ron` by
//! `zifprom-chips-codegen`. Entry 0 is always the safe "no chip" profile.

use super::options::Options;
use super::types::{Bus, ChipProfile, IspPins, ParallelBus};
use crate::error::{Error, Result};
use crate::socket::PackagePin;

include!(concat!(env!("OUT_DIR"), "/profiles_generated.rs"));

/// All profiles, in selection order
pub fn profiles() -> &'static [ChipProfile] {
    &PROFILES
}

/// Number of profiles in the catalog
pub fn len() -> usize {
    PROFILES.len()
}

/// Look up a profile by index
pub fn get(index: usize) -> Result<&'static ChipProfile> {
    PROFILES.get(index).ok_or(Error::InvalidProfile)
}

/// Find a profile by name (case-insensitive)
pub fn find(name: &str) -> Option<(usize, &'static ChipProfile)> {
    PROFILES
        .iter()
        .enumerate()
        .find(|(_, chip)| chip.name.eq_ignore_ascii_case(name))
}

/// Selection character for a catalog index: `0`-`9` then `A`-`Z`
pub fn selector(index: usize) -> Option<char> {
    char::from_digit(index as u32, 36).map(|c| c.to_ascii_uppercase())
}

/// Catalog index for a selection character, if it names a profile
pub fn index_of_selector(c: u8) -> Option<usize> {
    let index = (c as char).to_digit(36)? as usize;
    // lower-case letters are commands, not selectors
    if c.is_ascii_lowercase() || index >= PROFILES.len() {
        return None;
    }
    Some(index)
}

/// The safe profile at index 0
pub fn safe() -> &'static ChipProfile {
    &PROFILES[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_entry_is_safe() {
        assert!(safe().is_unused());
        assert!(safe().hi_pins.is_empty());
        assert!(safe().lo_pins.is_empty());
        assert!(profiles()[1..].iter().all(|chip| !chip.is_unused()));
    }

    #[test]
    fn test_every_profile_is_valid() {
        for chip in profiles() {
            assert!(chip.validate().is_ok(), "{} is invalid", chip.name);
        }
    }

    #[test]
    fn test_lookup() {
        let (index, chip) = find("m27c256").unwrap();
        assert_eq!(chip.name, "M27C256");
        assert_eq!(chip.addr_width(), 15);
        assert_eq!(chip.data_width(), 8);
        assert_eq!(get(index).unwrap(), chip);
        assert_eq!(get(len()), Err(Error::InvalidProfile));
    }

    #[test]
    fn test_isp_profile() {
        let (_, chip) = find("ATMega8").unwrap();
        assert!(chip.is_isp());
        assert_eq!(chip.data_width(), 0);
        assert_eq!(chip.image_size(), 8192);
    }

    #[test]
    fn test_selectors_round_trip() {
        for index in 0..len() {
            let c = selector(index).unwrap();
            assert_eq!(index_of_selector(c as u8), Some(index));
        }
        assert_eq!(index_of_selector(b'l'), None);
        assert_eq!(index_of_selector(b'!'), None);
    }
}

//! zifprom-chips-codegen - Build-time code generator for the chip catalog
//!
//! This crate parses the RON chip profile list and generates Rust code
//! that is included in zifprom-core at build time. Every profile
//! invariant is checked here so a bad entry fails the build instead of
//! driving the wrong pin at runtime.

use proc_macro2::{Ident, Literal, Span, TokenStream};
use quote::quote;
use serde::Deserialize;

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

/// Pins on the universal socket
const SOCKET_PINS: u8 = 40;

/// Widest address bus the sequencer can drive
const MAX_ADDR_WIDTH: usize = 24;

/// Widest data bus assembled into a single byte
const MAX_DATA_WIDTH: usize = 8;

/// Error type for codegen operations
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Ron(ron::error::SpannedError),
    Validation(String),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ron::error::SpannedError> for Error {
    fn from(e: ron::error::SpannedError) -> Self {
        Error::Ron(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Ron(e) => write!(f, "RON parse error: {}", e),
            Error::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Profile definitions
// ============================================================================

/// Option flags (structured instead of a bit mask)
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct OptionsDef {
    /// Enable pull-ups on data inputs
    pub pullups: bool,
    /// Pulse a latch pin after each address change
    pub latch: bool,
}

impl OptionsDef {
    /// Generate token stream for the Options bitflags
    fn to_tokens(self) -> TokenStream {
        let mut flags = Vec::new();

        if self.pullups {
            flags.push(quote!(Options::PULLUPS));
        }
        if self.latch {
            flags.push(quote!(Options::LATCH));
        }

        if flags.is_empty() {
            quote!(Options::empty())
        } else {
            let first = &flags[0];
            let rest = &flags[1..];
            quote!(#first #(.union(#rest))*)
        }
    }
}

/// Bus definition in RON format
#[derive(Debug, Clone, Deserialize)]
pub enum BusDef {
    /// Nothing wired (the safe profile)
    Unused,
    /// Parallel address/data bus, least significant pin first
    Parallel {
        addr: Vec<u8>,
        data: Vec<u8>,
        #[serde(default)]
        latch: Option<u8>,
    },
    /// AVR-style serial programming interface
    Isp {
        sck: u8,
        mosi: u8,
        miso: u8,
        reset: u8,
        xtal: u8,
        addr_width: u8,
    },
}

/// Single chip profile in RON format
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileDef {
    /// Chip name as listed to the user
    pub name: String,
    /// Option flags
    #[serde(default)]
    pub options: OptionsDef,
    /// Package pin count
    pub pins: u8,
    /// Bus wiring
    pub bus: BusDef,
    /// Pins held high
    #[serde(default)]
    pub hi: Vec<u8>,
    /// Pins held low
    #[serde(default)]
    pub lo: Vec<u8>,
    /// Supply pin (documentation only)
    #[serde(default)]
    pub vcc: Option<u8>,
    /// Ground pin (documentation only)
    #[serde(default)]
    pub gnd: Option<u8>,
}

impl ProfileDef {
    /// Pins driven by the bus, in declaration order
    fn bus_pins(&self) -> Vec<u8> {
        match &self.bus {
            BusDef::Unused => Vec::new(),
            BusDef::Parallel { addr, data, .. } => addr.iter().chain(data.iter()).copied().collect(),
            BusDef::Isp {
                sck,
                mosi,
                miso,
                reset,
                xtal,
                ..
            } => vec![*sck, *mosi, *miso, *reset, *xtal],
        }
    }

    fn validate(&self) -> Result<(), Error> {
        let fail = |msg: String| Err(Error::Validation(format!("{}: {}", self.name, msg)));

        if self.pins == 0 || self.pins > SOCKET_PINS {
            return fail(format!("{} pins does not fit the socket", self.pins));
        }

        let documented = self.vcc.iter().chain(self.gnd.iter());
        for &pin in self.hi.iter().chain(self.lo.iter()).chain(documented) {
            if pin == 0 || pin > self.pins {
                return fail(format!("pin {} outside a {}-pin package", pin, self.pins));
            }
        }
        if let Some(pin) = self.hi.iter().find(|p| self.lo.contains(p)) {
            return fail(format!("pin {} is both high and low", pin));
        }

        let mut seen = HashSet::new();
        for pin in self.bus_pins() {
            if pin == 0 || pin > self.pins {
                return fail(format!("bus pin {} outside a {}-pin package", pin, self.pins));
            }
            if self.hi.contains(&pin) || self.lo.contains(&pin) {
                return fail(format!("bus pin {} is also a fixed pin", pin));
            }
            if !seen.insert(pin) {
                return fail(format!("bus pin {} used twice", pin));
            }
        }

        match &self.bus {
            BusDef::Unused => {
                if !self.hi.is_empty() || !self.lo.is_empty() {
                    return fail("the unused profile must not drive any pin".into());
                }
            }
            BusDef::Parallel { addr, data, latch } => {
                if addr.len() > MAX_ADDR_WIDTH {
                    return fail(format!("{} address pins, at most {}", addr.len(), MAX_ADDR_WIDTH));
                }
                if data.is_empty() || data.len() > MAX_DATA_WIDTH {
                    return fail(format!("{} data pins, expected 1..={}", data.len(), MAX_DATA_WIDTH));
                }
                match (latch, self.options.latch) {
                    (Some(pin), true) if !self.lo.contains(pin) => {
                        return fail(format!("latch pin {} must be held low", pin));
                    }
                    (Some(_), false) => return fail("latch pin without the latch option".into()),
                    (None, true) => return fail("latch option without a latch pin".into()),
                    _ => {}
                }
            }
            BusDef::Isp { addr_width, .. } => {
                if *addr_width == 0 || *addr_width as usize > MAX_ADDR_WIDTH {
                    return fail(format!("ISP address width {} out of range", addr_width));
                }
                if self.options.latch {
                    return fail("ISP profiles cannot use the latch option".into());
                }
            }
        }

        Ok(())
    }
}

/// Complete profile catalog
#[derive(Debug, Clone)]
pub struct Catalog {
    pub profiles: Vec<ProfileDef>,
}

fn pin_list(ident: &Ident, pins: &[u8]) -> TokenStream {
    let len = Literal::usize_unsuffixed(pins.len());
    let pins = pins.iter().map(|&p| {
        let p = Literal::u8_unsuffixed(p);
        quote!(PackagePin::new(#p))
    });
    quote! {
        static #ident: [PackagePin; #len] = [#(#pins),*];
    }
}

fn optional_pin(pin: Option<u8>) -> TokenStream {
    match pin {
        Some(p) => {
            let p = Literal::u8_unsuffixed(p);
            quote!(Some(PackagePin::new(#p)))
        }
        None => quote!(None),
    }
}

impl Catalog {
    /// Parse a catalog from RON text
    pub fn parse(content: &str) -> Result<Self, Error> {
        let profiles: Vec<ProfileDef> = ron::from_str(content)?;
        Ok(Catalog { profiles })
    }

    /// Load the catalog from a RON file
    pub fn load_from_file(path: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Validate the catalog
    pub fn validate(&self) -> Result<(), Error> {
        match self.profiles.first() {
            Some(first) if matches!(first.bus, BusDef::Unused) => {}
            _ => {
                return Err(Error::Validation(
                    "the first profile must be the unused (safe) profile".into(),
                ))
            }
        }

        let mut names = HashSet::new();
        for (i, profile) in self.profiles.iter().enumerate() {
            profile.validate()?;
            if i > 0 && matches!(profile.bus, BusDef::Unused) {
                return Err(Error::Validation(format!(
                    "{}: only the first profile may be unused",
                    profile.name
                )));
            }
            if !names.insert(profile.name.to_ascii_uppercase()) {
                return Err(Error::Validation(format!(
                    "duplicate profile name {}",
                    profile.name
                )));
            }
        }

        // one selector character per profile: 0-9 then A-Z
        if self.profiles.len() > 36 {
            return Err(Error::Validation(format!(
                "{} profiles, at most 36 can be selected",
                self.profiles.len()
            )));
        }

        Ok(())
    }

    /// Generate Rust code for the catalog
    pub fn generate_code(&self) -> String {
        let mut pin_tables = Vec::new();
        let mut profile_defs = Vec::new();

        for (i, profile) in self.profiles.iter().enumerate() {
            let table = |suffix: &str| Ident::new(&format!("P{}_{}", i, suffix), Span::call_site());
            let hi = table("HI");
            let lo = table("LO");
            pin_tables.push(pin_list(&hi, &profile.hi));
            pin_tables.push(pin_list(&lo, &profile.lo));

            let bus = match &profile.bus {
                BusDef::Unused => quote!(Bus::Unused),
                BusDef::Parallel { addr, data, latch } => {
                    let addr_ident = table("ADDR");
                    let data_ident = table("DATA");
                    pin_tables.push(pin_list(&addr_ident, addr));
                    pin_tables.push(pin_list(&data_ident, data));
                    let latch = optional_pin(*latch);
                    quote! {
                        Bus::Parallel(ParallelBus {
                            addr: &#addr_ident,
                            data: &#data_ident,
                            latch: #latch,
                        })
                    }
                }
                BusDef::Isp {
                    sck,
                    mosi,
                    miso,
                    reset,
                    xtal,
                    addr_width,
                } => {
                    let [sck, mosi, miso, reset, xtal, addr_width] =
                        [*sck, *mosi, *miso, *reset, *xtal, *addr_width].map(Literal::u8_unsuffixed);
                    quote! {
                        Bus::Isp(IspPins {
                            sck: PackagePin::new(#sck),
                            mosi: PackagePin::new(#mosi),
                            miso: PackagePin::new(#miso),
                            reset: PackagePin::new(#reset),
                            xtal: PackagePin::new(#xtal),
                            addr_width: #addr_width,
                        })
                    }
                }
            };

            let name = &profile.name;
            let options = profile.options.to_tokens();
            let pins = Literal::u8_unsuffixed(profile.pins);
            let vcc = optional_pin(profile.vcc);
            let gnd = optional_pin(profile.gnd);

            profile_defs.push(quote! {
                ChipProfile {
                    name: #name,
                    options: #options,
                    pins: #pins,
                    bus: #bus,
                    hi_pins: &#hi,
                    lo_pins: &#lo,
                    vcc: #vcc,
                    gnd: #gnd,
                }
            });
        }

        let count = Literal::usize_unsuffixed(profile_defs.len());
        let tokens = quote! {
            #(#pin_tables)*

            /// Static chip profile table
            ///
            /// Generated from chips/profiles.ron
            pub static PROFILES: [ChipProfile; #count] = [
                #(#profile_defs),*
            ];
        };

        // Format the output with prettyplease
        let syntax_tree = syn::parse2(tokens).expect("Failed to parse generated code");
        prettyplease::unparse(&syntax_tree)
    }

    /// Get total profile count
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Generate code from a profile file and write it to the output file
pub fn generate(profiles: &Path, output_file: &Path) -> Result<(), Error> {
    let catalog = Catalog::load_from_file(profiles)?;
    catalog.validate()?;

    let code = catalog.generate_code();
    fs::write(output_file, code)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAFE: &str = r#"(name: "NONE", pins: 28, bus: Unused)"#;

    fn catalog(entries: &[&str]) -> Result<Catalog, Error> {
        let body = core::iter::once(SAFE)
            .chain(entries.iter().copied())
            .collect::<Vec<_>>()
            .join(",\n");
        Catalog::parse(&format!("[{}]", body))
    }

    #[test]
    fn test_parse_parallel_profile() {
        let cat = catalog(&[r#"
            (
                name: "M27C256",
                pins: 28,
                bus: Parallel(
                    addr: [10, 9, 8, 7, 6, 5, 4, 3, 25, 24, 21, 23, 2, 26, 27],
                    data: [11, 12, 13, 15, 16, 17, 18, 19],
                ),
                hi: [28, 1],
                lo: [22, 20, 14],
                vcc: Some(28),
                gnd: Some(14),
            )
        "#])
        .unwrap();

        assert_eq!(cat.len(), 2);
        let chip = &cat.profiles[1];
        assert_eq!(chip.name, "M27C256");
        match &chip.bus {
            BusDef::Parallel { addr, data, latch } => {
                assert_eq!(addr.len(), 15);
                assert_eq!(data.len(), 8);
                assert_eq!(*latch, None);
            }
            other => panic!("unexpected bus {:?}", other),
        }
        assert!(cat.validate().is_ok());
    }

    #[test]
    fn test_parse_isp_profile() {
        let cat = catalog(&[r#"
            (
                name: "ATMega8",
                pins: 28,
                bus: Isp(sck: 19, mosi: 17, miso: 18, reset: 1, xtal: 9, addr_width: 13),
                hi: [7, 20],
                lo: [8, 22],
            )
        "#])
        .unwrap();
        assert!(cat.validate().is_ok());
        let code = cat.generate_code();
        assert!(code.contains("Bus::Isp"));
        assert!(code.contains("addr_width: 13"));
    }

    #[test]
    fn test_overlap_with_fixed_pin_rejected() {
        let cat = catalog(&[r#"
            (
                name: "BAD",
                pins: 24,
                bus: Parallel(addr: [1, 2], data: [3]),
                hi: [24, 2],
            )
        "#])
        .unwrap();
        assert!(matches!(cat.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_pin_outside_package_rejected() {
        let cat = catalog(&[r#"
            (
                name: "BAD",
                pins: 20,
                bus: Parallel(addr: [1, 21], data: [3]),
            )
        "#])
        .unwrap();
        assert!(matches!(cat.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_latch_requires_fixed_low_pin() {
        let cat = catalog(&[r#"
            (
                name: "BAD",
                options: (latch: true),
                pins: 28,
                bus: Parallel(addr: [1], data: [3], latch: Some(23)),
                lo: [14],
            )
        "#])
        .unwrap();
        assert!(matches!(cat.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_wide_data_bus_rejected() {
        let cat = catalog(&[r#"
            (
                name: "WIDE",
                pins: 40,
                bus: Parallel(
                    addr: [21],
                    data: [19, 18, 17, 16, 15, 14, 13, 12, 10],
                ),
            )
        "#])
        .unwrap();
        assert!(matches!(cat.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_safe_profile_must_come_first() {
        let cat = Catalog::parse(r#"[(name: "X", pins: 8, bus: Parallel(addr: [1], data: [2]))]"#)
            .unwrap();
        assert!(matches!(cat.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_options_to_tokens() {
        let options = OptionsDef {
            pullups: true,
            latch: true,
        };
        let s = options.to_tokens().to_string();
        assert!(s.contains("PULLUPS"));
        assert!(s.contains("LATCH"));
        assert_eq!(
            OptionsDef::default().to_tokens().to_string(),
            quote!(Options::empty()).to_string()
        );
    }

    #[test]
    fn test_generated_code_has_pin_tables() {
        let cat = catalog(&[r#"
            (
                name: "TINY",
                pins: 8,
                bus: Parallel(addr: [1, 2], data: [3, 4]),
                hi: [8],
                lo: [5],
            )
        "#])
        .unwrap();
        let code = cat.generate_code();
        assert!(code.contains("static P1_ADDR: [PackagePin; 2]"));
        assert!(code.contains("pub static PROFILES: [ChipProfile; 2]"));
        assert!(code.contains("\"TINY\""));
    }
}

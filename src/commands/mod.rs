//! CLI command implementations
//!
//! `list` and `pinout` only look at the compiled-in catalog. `dump` is the
//! host side of a transfer and talks to a reader; `simulate` and `gpio`
//! run the reader's own monitor on this machine.

mod dump;
#[cfg(feature = "linux-gpio")]
mod gpio;
mod list;
mod pinout;
mod simulate;

pub use dump::run_dump;
#[cfg(feature = "linux-gpio")]
pub use gpio::run_gpio;
pub use list::list_chips;
pub use pinout::show_pinout;
pub use simulate::run_simulate;

use zifprom_core::chip::{catalog, ChipProfile};

/// Find a chip by name, or by its single selector character
pub fn find_chip(name: &str) -> Result<(usize, &'static ChipProfile), String> {
    if let Some(found) = catalog::find(name) {
        return Ok(found);
    }
    if let [c] = name.as_bytes() {
        if let Some(index) = catalog::index_of_selector(c.to_ascii_uppercase()) {
            if let Ok(chip) = catalog::get(index) {
                return Ok((index, chip));
            }
        }
    }
    Err(format!(
        "Unknown chip '{}'. Use 'zifprom list' to see the catalog",
        name
    ))
}

/// Human readable size
pub fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}

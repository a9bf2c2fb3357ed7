//! List command implementation

use zifprom_core::chip::catalog;

use super::format_size;

/// List all chips in the catalog
pub fn list_chips() {
    println!("Supported chips:");
    println!();
    println!(
        "{:<4} {:<16} {:>5} {:>8} {:<9} {:>4} {:>4}",
        "Sel", "Name", "Pins", "Size", "Kind", "Vcc", "Gnd"
    );
    println!("{}", "-".repeat(58));

    for (index, chip) in catalog::profiles().iter().enumerate() {
        let selector = catalog::selector(index).unwrap_or('?');
        let kind = if chip.is_unused() {
            "-"
        } else if chip.is_isp() {
            "isp"
        } else {
            "parallel"
        };
        let pin = |p: Option<_>| p.map_or_else(|| "-".to_string(), |p| format!("{}", p));

        println!(
            "{:<4} {:<16} {:>5} {:>8} {:<9} {:>4} {:>4}",
            selector,
            chip.name,
            chip.pins,
            format_size(chip.image_size()),
            kind,
            pin(chip.vcc),
            pin(chip.gnd)
        );
    }
}

//! Pinout command implementation

use zifprom_core::chip::{ChipProfile, PinRole};
use zifprom_core::socket::PackagePin;

use super::find_chip;

fn describe(role: PinRole) -> String {
    match role {
        PinRole::Address(bit) => format!("A{}", bit),
        PinRole::Data(bit) => format!("D{}", bit),
        PinRole::High => "high".to_string(),
        PinRole::Low => "low".to_string(),
        PinRole::Latch => "latch".to_string(),
        PinRole::Sck => "SCK".to_string(),
        PinRole::Mosi => "MOSI".to_string(),
        PinRole::Miso => "MISO".to_string(),
        PinRole::Reset => "RESET".to_string(),
        PinRole::Xtal => "XTAL1".to_string(),
        PinRole::Unconnected => "-".to_string(),
    }
}

/// One row per package pin: package pin, socket pin, role, supply note
pub fn pinout_rows(chip: &ChipProfile) -> Vec<(u8, u8, String)> {
    (1..=chip.pins)
        .filter_map(|n| {
            let pin = PackagePin::new(n);
            let socket = chip.socket_pin(pin)?;
            let mut role = describe(chip.role_of(pin));
            if chip.vcc == Some(pin) {
                role.push_str(" (Vcc)");
            } else if chip.gnd == Some(pin) {
                role.push_str(" (GND)");
            }
            Some((n, socket.get(), role))
        })
        .collect()
}

/// Print the package to socket pin table of a chip
pub fn show_pinout(name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (_, chip) = find_chip(name)?;

    if chip.is_unused() {
        println!("{} drives no pins; the socket stays tri-stated", chip.name);
        return Ok(());
    }

    println!("{} ({} pins, seated at socket pin 1)", chip.name, chip.pins);
    println!();
    println!("{:>7} {:>7}  {}", "Package", "Socket", "Role");
    println!("{}", "-".repeat(30));
    for (package, socket, role) in pinout_rows(chip) {
        println!("{:>7} {:>7}  {}", package, socket, role);
    }

    Ok(())
}

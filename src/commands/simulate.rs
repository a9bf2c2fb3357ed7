//! Simulate command implementation

use std::fs;
use std::net::TcpListener;
use std::path::Path;
use zifprom_core::error::Error;
use zifprom_core::monitor::Monitor;
use zifprom_core::sequencer::Sequencer;
use zifprom_dummy::SimulatedSocket;

use super::{find_chip, format_size};
use crate::transport::TcpTransport;

/// Serve the monitor to one TCP client at a time, with `image` seated as `chip`
pub fn run_simulate(
    chip: &str,
    image: &Path,
    listen: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_, chip) = find_chip(chip)?;
    if chip.is_unused() {
        return Err(format!("{} cannot be simulated", chip.name).into());
    }

    let contents = fs::read(image)?;
    if contents.is_empty() {
        return Err(format!("{:?} is empty", image).into());
    }
    if contents.len() != chip.image_size() as usize {
        log::warn!(
            "Image is {} bytes, {} holds {}",
            contents.len(),
            chip.name,
            format_size(chip.image_size())
        );
    }

    let socket = if chip.is_isp() {
        SimulatedSocket::with_avr(chip, contents)
    } else {
        SimulatedSocket::with_rom(chip, contents)
    };
    let mut engine = Sequencer::new(socket);
    engine.select(chip);

    let listener = TcpListener::bind(listen)?;
    println!("Simulating {} on {}", chip.name, listener.local_addr()?);

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                log::warn!("Failed to accept connection: {}", e);
                continue;
            }
        };
        let peer = stream.peer_addr()?;
        log::info!("Client connected from {}", peer);

        let mut monitor = Monitor::new(engine, TcpTransport::from_stream(stream)?);
        match monitor.run() {
            Err(Error::UnexpectedEof) => log::info!("Client {} disconnected", peer),
            Err(e) => log::warn!("Session with {} ended: {}", peer, e),
            Ok(()) => {}
        }
        (engine, _) = monitor.into_parts();
    }

    Ok(())
}

//! zifprom-dummy - Simulated ZIF socket for testing
//!
//! This crate provides a [`ZifSocket`](zifprom_core::programmer::ZifSocket)
//! that keeps its pin state in memory, with an optional simulated chip
//! seated in it: a parallel ROM built from any catalog profile, or an AVR
//! answering the serial programming protocol. It also provides in-memory
//! transports for driving the monitor without a serial port.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
pub mod avr;
#[cfg(feature = "alloc")]
pub mod rom;
#[cfg(feature = "alloc")]
pub mod socket;
#[cfg(feature = "alloc")]
pub mod transport;

#[cfg(feature = "alloc")]
pub use avr::{AvrTarget, ATMEGA8_SIGNATURE};
#[cfg(feature = "alloc")]
pub use rom::RomTarget;
#[cfg(feature = "alloc")]
pub use socket::{Noise, PinOp, PinState, SimulatedSocket, Target};
#[cfg(feature = "alloc")]
pub use transport::ScriptedTransport;
#[cfg(feature = "std")]
pub use transport::LoopbackTransport;

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use zifprom_core::chip::{catalog, ChipProfile};
    use zifprom_core::error::Error;
    use zifprom_core::monitor::Monitor;
    use zifprom_core::programmer::ZifSocket;
    use zifprom_core::sequencer::{Sequencer, SequencerConfig, State};
    use zifprom_core::socket::PackagePin;
    use zifprom_core::transport::Transport;
    use zifprom_core::xmodem::Receiver;

    fn chip(name: &str) -> &'static ChipProfile {
        catalog::find(name).unwrap().1
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i ^ (i >> 8) ^ 0x5A) as u8).collect()
    }

    fn engine(
        socket: SimulatedSocket,
        chip: &'static ChipProfile,
    ) -> Sequencer<'static, SimulatedSocket> {
        let mut engine = Sequencer::new(socket);
        engine.select(chip);
        engine
    }

    #[test]
    fn test_read_whole_eprom() {
        let chip = chip("M27C256");
        let image = pattern(chip.image_size() as usize);
        let mut engine = engine(SimulatedSocket::with_rom(chip, image.clone()), chip);

        engine.setup().unwrap();
        let mut read = vec![0u8; image.len()];
        engine.read_into(0, &mut read).unwrap();
        assert_eq!(read, image);

        let socket = engine.into_socket();
        assert!(socket.is_tristated());
        assert!(socket.elapsed_us() >= 250_000);
    }

    #[test]
    fn test_unpowered_rom_floats() {
        let chip = chip("M27C256");
        let mut socket = SimulatedSocket::with_rom(chip, vec![0x00; 16]);
        let data = chip.socket_pin(PackagePin::new(11)).unwrap();
        // tri-stated socket: the data pin reads its pull-up state
        assert!(!socket.sample(data));
    }

    #[test]
    fn test_latched_address() {
        let chip = chip("87C64");
        let image = pattern(chip.image_size() as usize);
        let mut engine = engine(SimulatedSocket::with_rom(chip, image.clone()), chip);

        engine.setup().unwrap();
        let mut read = [0u8; 256];
        engine.read_into(0x1000, &mut read).unwrap();
        assert_eq!(&read[..], &image[0x1000..0x1100]);
        assert_eq!(engine.read_byte(0x1FFF).unwrap(), image[0x1FFF]);
    }

    #[test]
    fn test_settling_lines_converge() {
        let chip = chip("M27C64");
        let image = pattern(chip.image_size() as usize);
        let socket = SimulatedSocket::with_rom(chip, image.clone()).with_noise(Noise::Settling(1));
        let mut engine = engine(socket, chip);

        engine.setup().unwrap();
        for addr in [0u32, 1, 0x0ABC, 0x1FFF] {
            assert_eq!(engine.read_byte(addr).unwrap(), image[addr as usize]);
        }
    }

    #[test]
    fn test_chaotic_lines_return_last_sample() {
        let chip = chip("M27C64");
        let image = pattern(chip.image_size() as usize);
        let socket = SimulatedSocket::with_rom(chip, image.clone()).with_noise(Noise::Chaotic);
        let mut engine = engine(socket, chip);

        engine.setup().unwrap();
        // the eighth sample is an odd one, so every bit comes back inverted
        assert_eq!(engine.read_byte(0x123).unwrap(), !image[0x123]);

        let config = SequencerConfig::default().with_max_samples(1);
        let socket = SimulatedSocket::with_rom(chip, image.clone()).with_noise(Noise::Chaotic);
        let mut engine = Sequencer::with_config(socket, config);
        engine.select(chip);
        engine.setup().unwrap();
        assert_eq!(engine.read_byte(0x123).unwrap(), image[0x123]);
    }

    #[test]
    fn test_avr_handshake_and_read() {
        let chip = chip("ATMega8");
        let flash = pattern(chip.image_size() as usize);
        let mut engine = engine(SimulatedSocket::with_avr(chip, flash.clone()), chip);

        engine.setup().unwrap();
        assert_eq!(engine.state(), State::Ready);
        assert_eq!(engine.isp_signature().unwrap(), ATMEGA8_SIGNATURE);

        let mut read = [0u8; 64];
        engine.read_into(0x0FE0, &mut read).unwrap();
        assert_eq!(&read[..], &flash[0x0FE0..0x1020]);

        match engine.socket_mut().target() {
            Target::Avr(avr) => {
                assert!(avr.programming_enabled());
                assert_eq!(avr.clock_faults(), 0);
            }
            other => panic!("unexpected target {:?}", other),
        }
    }

    #[test]
    fn test_monitor_probe_reports_signature() {
        let chip = chip("ATMega8");
        let avr = AvrTarget::new(chip, pattern(chip.image_size() as usize))
            .with_signature([0x1E, 0x93, 0x0A]);
        let socket = SimulatedSocket::new().with_target(Target::Avr(avr));
        let (index, _) = catalog::find("ATMega8").unwrap();
        let selector = catalog::selector(index).unwrap() as u8;

        let mut terminal = ScriptedTransport::new(&[selector]);
        terminal.push(b"i");
        let mut monitor = Monitor::new(Sequencer::new(socket), &mut terminal);
        assert_eq!(monitor.run(), Err(Error::UnexpectedEof));
        let (engine, _) = monitor.into_parts();
        assert!(engine.into_socket().is_tristated());

        let shown = String::from_utf8_lossy(terminal.sent());
        assert!(shown.contains("selected ATMega8"));
        assert!(shown.contains("signature 1E 93 0A\r\n"));
    }

    #[test]
    fn test_empty_socket_fails_handshake() {
        let chip = chip("ATMega8");
        let mut engine = engine(SimulatedSocket::new(), chip);

        assert_eq!(engine.setup(), Err(Error::IspHandshakeFailed([0xFF; 4])));
        assert_eq!(engine.state(), State::Faulted);
        assert_eq!(engine.read_byte(0), Err(Error::NotReady));
        assert_eq!(engine.retry_isp(), Err(Error::IspHandshakeFailed([0xFF; 4])));
    }

    #[test]
    fn test_monitor_transfer_over_loopback() {
        let chip = chip("TBP28S42");
        let image = pattern(chip.image_size() as usize);
        let socket = SimulatedSocket::with_rom(chip, image.clone());
        let (device, mut host) = LoopbackTransport::pair();

        let monitor = std::thread::spawn(move || {
            let mut monitor = Monitor::new(Sequencer::new(socket), device);
            let result = monitor.run();
            let (engine, _) = monitor.into_parts();
            (result, engine.into_socket())
        });

        let (index, _) = catalog::find("TBP28S42").unwrap();
        let selector = catalog::selector(index).unwrap() as u8;
        host.send(&[selector]).unwrap();

        let mut received = Vec::new();
        let blocks = Receiver::new(&mut host)
            .receive(|payload| {
                received.extend_from_slice(payload);
                Ok(())
            })
            .unwrap();
        drop(host);

        assert_eq!(blocks, 4);
        assert_eq!(received, image);

        let (result, socket) = monitor.join().unwrap();
        assert_eq!(result, Err(Error::UnexpectedEof));
        assert!(socket.is_tristated());
    }
}

//! Dump command implementation

use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zifprom_core::chip::catalog;
use zifprom_core::transport::Transport;
use zifprom_core::xmodem::{Receiver, PAYLOAD_LEN};

use super::find_chip;
use crate::cli::ConnectionArgs;
use crate::transport;

fn create_progress_bar(total: Option<u32>) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = match total {
        Some(total) => {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
                    .progress_chars("#>-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {bytes} ({bytes_per_sec})")?,
            );
            pb
        }
    };
    Ok(pb)
}

fn open(
    connection: &ConnectionArgs,
    baud: u32,
) -> Result<Box<dyn Transport + Send>, Box<dyn std::error::Error>> {
    match (&connection.port, &connection.tcp) {
        (Some(port), _) => Ok(Box::new(transport::open_serial(port, baud)?)),
        (None, Some(addr)) => Ok(Box::new(transport::connect_tcp(addr)?)),
        (None, None) => Err("Either --port or --tcp must be given".into()),
    }
}

/// Receive a whole chip from the reader and write it to `output`
pub fn run_dump(
    connection: &ConnectionArgs,
    baud: u32,
    chip: Option<&str>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut link = open(connection, baud)?;

    let mut expected = None;
    if let Some(name) = chip {
        let (index, chip) = find_chip(name)?;
        if chip.is_unused() {
            return Err(format!("{} cannot be read", chip.name).into());
        }
        let selector = catalog::selector(index).ok_or("Chip has no selector")?;
        println!("Selecting {} ({} bytes)", chip.name, chip.image_size());
        link.send(&[selector as u8])?;
        expected = Some(chip.image_size());
    }

    let pb = create_progress_bar(expected)?;
    let mut data = Vec::with_capacity(expected.unwrap_or(0) as usize);

    let blocks = Receiver::new(&mut link).receive(|payload| {
        data.extend_from_slice(payload);
        pb.inc(PAYLOAD_LEN as u64);
        Ok(())
    });
    let blocks = match blocks {
        Ok(blocks) => blocks,
        Err(e) => {
            pb.abandon_with_message("Transfer failed");
            return Err(e.into());
        }
    };
    pb.finish_with_message("Read complete");

    if let Some(size) = expected {
        if data.len() < size as usize {
            log::warn!(
                "Reader sent {} bytes, expected {}; is the right chip selected?",
                data.len(),
                size
            );
        }
        data.truncate(size as usize);
    }

    log::debug!("Received {} blocks", blocks);

    let mut file = File::create(output)?;
    file.write_all(&data)?;
    println!("Wrote {} bytes to {:?}", data.len(), output);

    Ok(())
}

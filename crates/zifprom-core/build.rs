//! Build script for zifprom-core
//!
//! This script generates the chip profile catalog from RON at build time.

use std::env;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());

    // Profiles live at the workspace root
    let profiles = manifest_dir
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("chips")
        .join("profiles.ron");
    let output_file = out_dir.join("profiles_generated.rs");

    println!("cargo::rerun-if-changed={}", profiles.display());

    zifprom_chips_codegen::generate(&profiles, &output_file)
        .expect("Failed to generate chip profile catalog");
}

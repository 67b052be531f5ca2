// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sealdesk inspect` command implementation.
//!
//! Prints the unencrypted manifest of a transcript archive: format,
//! creation time, and section layout. No key is needed; the section
//! contents stay sealed.

use std::path::Path;

use sealdesk_core::SealdeskError;
use sealdesk_transcript::Archive;

/// Run the `sealdesk inspect` command.
pub fn run_inspect(archive_path: &Path) -> Result<(), SealdeskError> {
    let archive = Archive::load(archive_path)?;
    let manifest = archive.manifest();

    println!();
    println!("  {}", archive_path.display());
    println!("  {}", "-".repeat(50));
    println!("    format:     {} v{}", manifest.format, manifest.version);
    println!("    created at: {}", manifest.created_at.to_rfc3339());
    println!("    sections:   {}", manifest.sections.len());
    println!();

    for section in &manifest.sections {
        println!("    {:<40} {:>10} bytes", section.name, section.len);
    }

    println!();
    Ok(())
}

// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sealdesk decrypt` command implementation.
//!
//! Opens a transcript archive with its one-time key file and writes every
//! section's plaintext into an output directory, one file per section.

use std::path::{Component, Path, PathBuf};

use sealdesk_core::SealdeskError;
use sealdesk_transcript::{decode_private_key, Archive, TranscriptKeypair};
use zeroize::Zeroizing;

/// Run the `sealdesk decrypt` command.
///
/// Without `--out`, plaintexts land in a `<archive stem>.decrypted`
/// directory next to the archive.
pub fn run_decrypt(
    archive_path: &Path,
    key_path: &Path,
    out: Option<&Path>,
) -> Result<(), SealdeskError> {
    let key_text = Zeroizing::new(std::fs::read_to_string(key_path).map_err(|e| {
        SealdeskError::Crypto(format!("cannot read key file `{}`: {e}", key_path.display()))
    })?);
    let private = decode_private_key(&key_text)?;
    let keypair = TranscriptKeypair::from_bytes(*private);

    let archive = Archive::load(archive_path)?;

    let out_dir = match out {
        Some(dir) => dir.to_path_buf(),
        None => default_out_dir(archive_path),
    };
    std::fs::create_dir_all(&out_dir).map_err(io_err)?;

    let names: Vec<String> = archive.section_names().map(str::to_string).collect();
    for name in &names {
        let plaintext = archive.open_section(&keypair, name)?;

        // Section names may carry a directory component, e.g. attachments/<id>,
        // but must stay inside the output directory.
        let target = section_target(&out_dir, name)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(&target, &plaintext).map_err(io_err)?;

        println!("  {name} -> {} ({} bytes)", target.display(), plaintext.len());
    }

    println!("  decrypted {} sections into {}", names.len(), out_dir.display());
    Ok(())
}

fn section_target(out_dir: &Path, name: &str) -> Result<PathBuf, SealdeskError> {
    let relative = Path::new(name);
    let escapes = relative.is_absolute()
        || relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(SealdeskError::Archive {
            message: format!("section name `{name}` escapes the output directory"),
            source: None,
        });
    }
    Ok(out_dir.join(relative))
}

fn default_out_dir(archive_path: &Path) -> PathBuf {
    let stem = archive_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    archive_path.with_file_name(format!("{stem}.decrypted"))
}

fn io_err(e: std::io::Error) -> SealdeskError {
    SealdeskError::Archive {
        message: "failed to write decrypted output".to_string(),
        source: Some(Box::new(e)),
    }
}

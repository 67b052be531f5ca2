// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The transcript archive container format.
//!
//! One self-describing file per closed ticket:
//!
//! ```text
//! +----------------------+
//! | magic      (8 bytes) |
//! | manifest len (u32 LE)|
//! | manifest JSON        |
//! | section 0 ciphertext |
//! | section 1 ciphertext |
//! | ...                  |
//! +----------------------+
//! ```
//!
//! The manifest is NOT encrypted: it holds only structural metadata and the
//! per-section public parameters (ephemeral public key, nonce, length).
//! Sections follow in manifest order. Persistence is atomic: the container
//! is written to a temp file in the destination directory and renamed into
//! place, so no partially written archive ever exists at the final path.

use std::io::{Read, Write};
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use ring::aead::NONCE_LEN;
use sealdesk_core::{SealdeskError, TicketId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::envelope::{self, SealedSection, TranscriptKeypair, PUBLIC_KEY_LEN};

/// File magic identifying a sealdesk transcript container.
pub const MAGIC: &[u8; 8] = b"SDSKARCH";

/// Format identifier recorded in the manifest.
pub const FORMAT_NAME: &str = "sealdesk-transcript";

/// Current container layout version.
pub const FORMAT_VERSION: u32 = 1;

/// File extension for archives on disk and in exposed URLs.
pub const ARCHIVE_EXTENSION: &str = "sdtranscript";

/// Upper bound on the manifest we are willing to parse when reading.
const MAX_MANIFEST_BYTES: u32 = 16 * 1024 * 1024;

/// Name of the serialized message log section.
pub const SECTION_DATA: &str = "data";

/// Name of the ticket/topic/context metadata section.
pub const SECTION_META: &str = "transcriptMeta";

/// Section name for one fetched attachment blob.
pub fn attachment_section_name(attachment_id: &str) -> String {
    format!("attachments/{attachment_id}")
}

/// Archive filename for a ticket.
pub fn archive_filename(ticket_id: &TicketId) -> String {
    format!("{ticket_id}.{ARCHIVE_EXTENSION}")
}

/// Decryption parameters for one section, recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionMeta {
    pub name: String,
    /// Base64 of the section's ephemeral X25519 public key.
    pub ephemeral_public: String,
    /// Base64 of the section's AES-GCM nonce.
    pub nonce: String,
    /// Ciphertext length in bytes (tag included).
    pub len: u64,
}

/// The unencrypted archive manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format: String,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub sections: Vec<SectionMeta>,
}

/// An in-memory archive: manifest plus ciphertext sections in manifest order.
///
/// Immutable once written; created exactly once per close operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Archive {
    manifest: Manifest,
    sections: Vec<Vec<u8>>,
}

impl Archive {
    /// Start an empty archive stamped with the given creation time.
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            manifest: Manifest {
                format: FORMAT_NAME.to_string(),
                version: FORMAT_VERSION,
                created_at,
                sections: Vec::new(),
            },
            sections: Vec::new(),
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Append one sealed section under `name`.
    pub fn add_section(&mut self, name: &str, sealed: SealedSection) {
        self.manifest.sections.push(SectionMeta {
            name: name.to_string(),
            ephemeral_public: BASE64.encode(sealed.ephemeral_public),
            nonce: BASE64.encode(sealed.nonce),
            len: sealed.ciphertext.len() as u64,
        });
        self.sections.push(sealed.ciphertext);
    }

    /// Look up a section's metadata and ciphertext by name.
    pub fn section(&self, name: &str) -> Option<(&SectionMeta, &[u8])> {
        self.manifest
            .sections
            .iter()
            .position(|s| s.name == name)
            .map(|i| (&self.manifest.sections[i], self.sections[i].as_slice()))
    }

    /// Names of all sections, in container order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.manifest.sections.iter().map(|s| s.name.as_str())
    }

    /// Decrypt one section with the recipient private key.
    pub fn open_section(
        &self,
        keypair: &TranscriptKeypair,
        name: &str,
    ) -> Result<Vec<u8>, SealdeskError> {
        let (meta, ciphertext) = self.section(name).ok_or_else(|| SealdeskError::Archive {
            message: format!("no section named `{name}` in archive"),
            source: None,
        })?;

        let ephemeral_public: [u8; PUBLIC_KEY_LEN] = decode_param(&meta.ephemeral_public)?;
        let nonce: [u8; NONCE_LEN] = decode_param(&meta.nonce)?;

        envelope::open_section(keypair, name, &ephemeral_public, &nonce, ciphertext)
    }

    /// Serialize the container to a writer.
    pub fn write_to(&self, writer: &mut impl Write) -> Result<(), SealdeskError> {
        let manifest_json = serde_json::to_vec(&self.manifest).map_err(|e| {
            SealdeskError::Archive {
                message: "manifest serialization failed".to_string(),
                source: Some(Box::new(e)),
            }
        })?;

        writer.write_all(MAGIC).map_err(io_err)?;
        writer
            .write_all(&(manifest_json.len() as u32).to_le_bytes())
            .map_err(io_err)?;
        writer.write_all(&manifest_json).map_err(io_err)?;
        for section in &self.sections {
            writer.write_all(section).map_err(io_err)?;
        }
        Ok(())
    }

    /// Parse a container from a reader.
    pub fn read_from(reader: &mut impl Read) -> Result<Self, SealdeskError> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic).map_err(io_err)?;
        if &magic != MAGIC {
            return Err(SealdeskError::Archive {
                message: "not a sealdesk transcript archive (bad magic)".to_string(),
                source: None,
            });
        }

        let mut len_bytes = [0u8; 4];
        reader.read_exact(&mut len_bytes).map_err(io_err)?;
        let manifest_len = u32::from_le_bytes(len_bytes);
        if manifest_len > MAX_MANIFEST_BYTES {
            return Err(SealdeskError::Archive {
                message: format!("manifest length {manifest_len} exceeds sanity bound"),
                source: None,
            });
        }

        let mut manifest_json = vec![0u8; manifest_len as usize];
        reader.read_exact(&mut manifest_json).map_err(io_err)?;
        let manifest: Manifest =
            serde_json::from_slice(&manifest_json).map_err(|e| SealdeskError::Archive {
                message: "manifest parse failed".to_string(),
                source: Some(Box::new(e)),
            })?;

        if manifest.format != FORMAT_NAME || manifest.version != FORMAT_VERSION {
            return Err(SealdeskError::Archive {
                message: format!(
                    "unsupported archive format {}/{}",
                    manifest.format, manifest.version
                ),
                source: None,
            });
        }

        let mut sections = Vec::with_capacity(manifest.sections.len());
        for meta in &manifest.sections {
            // The buffer grows with bytes actually present, so a claimed
            // length far beyond the file cannot force a huge allocation.
            let mut section = Vec::new();
            let read = reader
                .by_ref()
                .take(meta.len)
                .read_to_end(&mut section)
                .map_err(io_err)?;
            if read as u64 != meta.len {
                return Err(SealdeskError::Archive {
                    message: format!(
                        "section `{}` truncated: expected {} bytes, found {read}",
                        meta.name, meta.len
                    ),
                    source: None,
                });
            }
            sections.push(section);
        }

        Ok(Self { manifest, sections })
    }

    /// Write the container atomically to `path`.
    ///
    /// The bytes go to a temp file in the same directory first, then rename
    /// into place. A close retry for the same ticket overwrites the path.
    pub fn persist(&self, path: &Path) -> Result<(), SealdeskError> {
        let dir = path.parent().ok_or_else(|| SealdeskError::Archive {
            message: format!("archive path `{}` has no parent directory", path.display()),
            source: None,
        })?;
        std::fs::create_dir_all(dir).map_err(io_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        self.write_to(&mut tmp)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| SealdeskError::Archive {
            message: format!("failed to move archive into `{}`", path.display()),
            source: Some(Box::new(e)),
        })?;

        debug!(path = %path.display(), sections = self.sections.len(), "archive persisted");
        Ok(())
    }

    /// Load a container from `path`.
    pub fn load(path: &Path) -> Result<Self, SealdeskError> {
        let mut file = std::fs::File::open(path).map_err(io_err)?;
        Self::read_from(&mut file)
    }
}

fn io_err(e: impl std::error::Error + Send + Sync + 'static) -> SealdeskError {
    SealdeskError::Archive {
        message: "archive I/O failed".to_string(),
        source: Some(Box::new(e)),
    }
}

fn decode_param<const N: usize>(encoded: &str) -> Result<[u8; N], SealdeskError> {
    let bytes = BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| SealdeskError::Archive {
            message: format!("invalid section parameter encoding: {e}"),
            source: None,
        })?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| SealdeskError::Archive {
            message: format!("section parameter has wrong length {}", bytes.len()),
            source: None,
        })
}

// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript sealing for the Sealdesk ticket bot.
//!
//! The pipeline pieces the closing orchestrator drives: the attachment
//! fetcher, the per-section envelope encryptor, the PEM-style key file
//! codec, and the archive container format.

pub mod container;
pub mod envelope;
pub mod fetcher;
pub mod keyfile;

pub use container::{
    archive_filename, attachment_section_name, Archive, Manifest, SectionMeta,
    ARCHIVE_EXTENSION, SECTION_DATA, SECTION_META,
};
pub use envelope::{open_section, seal_section, SealedSection, TranscriptKeypair};
pub use fetcher::{AttachmentFetcher, MAX_ATTACHMENT_BYTES, OVERSIZE_ERROR};
pub use keyfile::{decode_private_key, encode_private_key};

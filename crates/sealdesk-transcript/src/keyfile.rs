// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PEM-style encoding of the one-time transcript private key.
//!
//! The key is emitted exactly once, as a file attachment in the close
//! notifications. Holders decrypt the archive with `sealdesk decrypt`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sealdesk_core::SealdeskError;
use zeroize::Zeroizing;

const PEM_HEADER: &str = "-----BEGIN SEALDESK TRANSCRIPT KEY-----";
const PEM_FOOTER: &str = "-----END SEALDESK TRANSCRIPT KEY-----";

/// Encode a private key into a PEM-style text block.
pub fn encode_private_key(private_bytes: &[u8; 32]) -> String {
    let body = BASE64.encode(private_bytes);
    format!("{PEM_HEADER}\n{body}\n{PEM_FOOTER}\n")
}

/// Parse a PEM-style key block back into private key bytes.
///
/// Tolerates surrounding whitespace and any line wrapping of the base64
/// body; rejects missing markers and keys of the wrong length.
pub fn decode_private_key(text: &str) -> Result<Zeroizing<[u8; 32]>, SealdeskError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix(PEM_HEADER)
        .and_then(|rest| rest.strip_suffix(PEM_FOOTER))
        .ok_or_else(|| {
            SealdeskError::Crypto("not a sealdesk transcript key block".to_string())
        })?;

    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    let decoded = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| SealdeskError::Crypto(format!("invalid key encoding: {e}")))?;

    let bytes: [u8; 32] = decoded.as_slice().try_into().map_err(|_| {
        SealdeskError::Crypto(format!(
            "transcript key must be 32 bytes, got {}",
            decoded.len()
        ))
    })?;

    Ok(Zeroizing::new(bytes))
}

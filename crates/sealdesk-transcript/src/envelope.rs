// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-section envelope encryption for transcript archives.
//!
//! Each close operation generates a one-time X25519 recipient keypair. Every
//! section (message log, metadata, each attachment blob) is sealed
//! independently: a fresh ephemeral X25519 key agrees with the recipient
//! public key, the shared secret runs through HKDF-SHA256 with the section
//! name as context, and the derived key encrypts the section with
//! AES-256-GCM under a fresh random 96-bit nonce. Nonce reuse would be
//! catastrophic for GCM security; every call draws from the system CSPRNG.
//!
//! Possession of the recipient private key is necessary and sufficient to
//! decrypt every section. The private key is never persisted server-side.

use rand::rngs::OsRng;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::hkdf;
use ring::rand::{SecureRandom, SystemRandom};
use sealdesk_core::SealdeskError;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// Length of an X25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// HKDF salt binding derived keys to this archive format.
const HKDF_SALT: &[u8] = b"sealdesk-transcript-v1";

/// The one-time recipient keypair for a single close operation.
///
/// Debug output intentionally omits the private half.
pub struct TranscriptKeypair {
    secret: StaticSecret,
    public: PublicKey,
}

impl std::fmt::Debug for TranscriptKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptKeypair")
            .field("secret", &"[REDACTED]")
            .field("public", &hex_prefix(self.public.as_bytes()))
            .finish()
    }
}

fn hex_prefix(bytes: &[u8; 32]) -> String {
    bytes[..4].iter().map(|b| format!("{b:02x}")).collect()
}

impl TranscriptKeypair {
    /// Generate a fresh random keypair. Never reused across tickets.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Reconstruct a keypair from private key bytes (decrypt side).
    pub fn from_bytes(private_bytes: [u8; 32]) -> Self {
        let secret = StaticSecret::from(private_bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Public key bytes, recorded per section in the manifest's parameters.
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        *self.public.as_bytes()
    }

    /// Private key bytes, for one-time emission to staff and requester.
    /// The returned buffer zeroizes itself on drop.
    pub fn private_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.secret.to_bytes())
    }
}

/// One sealed section: ciphertext plus the public parameters needed to
/// decrypt it later given the recipient private key.
#[derive(Debug, Clone, PartialEq)]
pub struct SealedSection {
    /// AES-256-GCM ciphertext with the 16-byte authentication tag appended.
    pub ciphertext: Vec<u8>,
    /// Ephemeral X25519 public key for this section's key agreement.
    pub ephemeral_public: [u8; PUBLIC_KEY_LEN],
    /// Random 96-bit nonce, unique per section and per close operation.
    pub nonce: [u8; NONCE_LEN],
}

/// Seal one named section to the recipient public key.
pub fn seal_section(
    recipient_public: &[u8; PUBLIC_KEY_LEN],
    section_name: &str,
    plaintext: &[u8],
) -> Result<SealedSection, SealdeskError> {
    let recipient = PublicKey::from(*recipient_public);
    let ephemeral = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(&recipient);
    if !shared.was_contributory() {
        return Err(SealdeskError::Crypto(
            "degenerate shared secret from key agreement".to_string(),
        ));
    }

    let key = derive_section_key(shared.as_bytes(), section_name)?;

    let unbound = UnboundKey::new(&AES_256_GCM, key.as_ref())
        .map_err(|_| SealdeskError::Crypto("failed to create AES-256-GCM key".to_string()))?;
    let less_safe = LessSafeKey::new(unbound);

    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| SealdeskError::Crypto("failed to generate random nonce".to_string()))?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    // Seal in place: the buffer is extended with the authentication tag.
    let mut in_out = plaintext.to_vec();
    less_safe
        .seal_in_place_append_tag(nonce, Aad::from(section_name.as_bytes()), &mut in_out)
        .map_err(|_| SealdeskError::Crypto("AES-256-GCM encryption failed".to_string()))?;

    Ok(SealedSection {
        ciphertext: in_out,
        ephemeral_public: *ephemeral_public.as_bytes(),
        nonce: nonce_bytes,
    })
}

/// Open one named section with the recipient private key.
///
/// Fails if the key is wrong, the section name does not match the one it
/// was sealed under, or the ciphertext was tampered with.
pub fn open_section(
    keypair: &TranscriptKeypair,
    section_name: &str,
    ephemeral_public: &[u8; PUBLIC_KEY_LEN],
    nonce_bytes: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, SealdeskError> {
    let ephemeral = PublicKey::from(*ephemeral_public);
    let shared = keypair.secret.diffie_hellman(&ephemeral);
    if !shared.was_contributory() {
        return Err(SealdeskError::Crypto(
            "degenerate shared secret from key agreement".to_string(),
        ));
    }

    let key = derive_section_key(shared.as_bytes(), section_name)?;

    let unbound = UnboundKey::new(&AES_256_GCM, key.as_ref())
        .map_err(|_| SealdeskError::Crypto("failed to create AES-256-GCM key".to_string()))?;
    let less_safe = LessSafeKey::new(unbound);
    let nonce = Nonce::assume_unique_for_key(*nonce_bytes);

    let mut in_out = ciphertext.to_vec();
    let plaintext = less_safe
        .open_in_place(nonce, Aad::from(section_name.as_bytes()), &mut in_out)
        .map_err(|_| {
            SealdeskError::Crypto(
                "AES-256-GCM decryption failed -- wrong key or corrupted section".to_string(),
            )
        })?;

    Ok(plaintext.to_vec())
}

/// Derive the per-section AES-256 key from the agreed shared secret.
///
/// The section name goes into the HKDF info so two sections never share a
/// key even if an ephemeral key were somehow repeated.
fn derive_section_key(
    shared_secret: &[u8; 32],
    section_name: &str,
) -> Result<Zeroizing<[u8; 32]>, SealdeskError> {
    let salt = hkdf::Salt::new(hkdf::HKDF_SHA256, HKDF_SALT);
    let prk = salt.extract(shared_secret);
    let info = [section_name.as_bytes()];
    let okm = prk
        .expand(&info, hkdf::HKDF_SHA256)
        .map_err(|_| SealdeskError::Crypto("HKDF expand failed".to_string()))?;

    let mut key = Zeroizing::new([0u8; 32]);
    okm.fill(key.as_mut())
        .map_err(|_| SealdeskError::Crypto("HKDF fill failed".to_string()))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let keypair = TranscriptKeypair::generate();
        let plaintext = b"transcript section payload";

        let sealed = seal_section(&keypair.public_bytes(), "data", plaintext).unwrap();
        let opened = open_section(
            &keypair,
            "data",
            &sealed.ephemeral_public,
            &sealed.nonce,
            &sealed.ciphertext,
        )
        .unwrap();

        assert_eq!(opened, plaintext);
    }

    #[test]
    fn roundtrip_empty_section() {
        let keypair = TranscriptKeypair::generate();
        let sealed = seal_section(&keypair.public_bytes(), "transcriptMeta", b"").unwrap();
        let opened = open_section(
            &keypair,
            "transcriptMeta",
            &sealed.ephemeral_public,
            &sealed.nonce,
            &sealed.ciphertext,
        )
        .unwrap();
        assert!(opened.is_empty());
    }

    #[test]
    fn sealing_twice_produces_different_parameters() {
        let keypair = TranscriptKeypair::generate();
        let a = seal_section(&keypair.public_bytes(), "data", b"same input").unwrap();
        let b = seal_section(&keypair.public_bytes(), "data", b"same input").unwrap();

        assert_ne!(a.ephemeral_public, b.ephemeral_public);
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn tampering_any_single_byte_is_detected() {
        let keypair = TranscriptKeypair::generate();
        let sealed = seal_section(&keypair.public_bytes(), "data", b"integrity matters").unwrap();

        for i in 0..sealed.ciphertext.len() {
            let mut tampered = sealed.ciphertext.clone();
            tampered[i] ^= 0x01;
            let result = open_section(
                &keypair,
                "data",
                &sealed.ephemeral_public,
                &sealed.nonce,
                &tampered,
            );
            assert!(result.is_err(), "flip at byte {i} went undetected");
        }
    }

    #[test]
    fn wrong_private_key_fails() {
        let keypair = TranscriptKeypair::generate();
        let other = TranscriptKeypair::generate();
        let sealed = seal_section(&keypair.public_bytes(), "data", b"secret").unwrap();

        let result = open_section(
            &other,
            "data",
            &sealed.ephemeral_public,
            &sealed.nonce,
            &sealed.ciphertext,
        );
        assert!(result.is_err());
    }

    #[test]
    fn wrong_section_name_fails() {
        let keypair = TranscriptKeypair::generate();
        let sealed = seal_section(&keypair.public_bytes(), "attachments/1", b"blob").unwrap();

        let result = open_section(
            &keypair,
            "attachments/2",
            &sealed.ephemeral_public,
            &sealed.nonce,
            &sealed.ciphertext,
        );
        assert!(result.is_err());
    }

    #[test]
    fn keypair_roundtrips_through_private_bytes() {
        let keypair = TranscriptKeypair::generate();
        let restored = TranscriptKeypair::from_bytes(*keypair.private_bytes());
        assert_eq!(keypair.public_bytes(), restored.public_bytes());

        let sealed = seal_section(&keypair.public_bytes(), "data", b"payload").unwrap();
        let opened = open_section(
            &restored,
            "data",
            &sealed.ephemeral_public,
            &sealed.nonce,
            &sealed.ciphertext,
        )
        .unwrap();
        assert_eq!(opened, b"payload");
    }

    #[test]
    fn ciphertext_is_plaintext_plus_tag() {
        let keypair = TranscriptKeypair::generate();
        let sealed = seal_section(&keypair.public_bytes(), "data", b"hello").unwrap();
        assert_eq!(sealed.ciphertext.len(), 5 + 16);
    }

    #[test]
    fn debug_output_redacts_private_key() {
        let keypair = TranscriptKeypair::generate();
        let rendered = format!("{keypair:?}");
        assert!(rendered.contains("[REDACTED]"));
    }
}

//! # Address — Checksummed Account Address Codec
//!
//! Accounts are 32-byte ed25519 public keys, displayed as 58-character
//! RFC 4648 base32 strings (no padding) over `pubkey || checksum`, where
//! the checksum is the last 4 bytes of SHA-512/256 over the public key.
//!
//! ```text
//! [u8; 32] pubkey ──SHA-512/256──▶ digest[28..32] = checksum
//!          pubkey ∥ checksum (36 bytes) ──base32──▶ 58 chars
//! ```
//!
//! [`Address`] stores the encoded string form; the byte form is decoded on
//! demand (signing and verification need it, everything else compares and
//! orders strings).

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};

/// Length of a raw public key in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of the appended checksum in bytes.
const CHECKSUM_LEN: usize = 4;

/// Length of the base32-encoded address string.
const ENCODED_LEN: usize = 58;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

// ════════════════════════════════════════════════════════════════════════════════
// ERROR
// ════════════════════════════════════════════════════════════════════════════════

/// Errors from decoding an address string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The string is not 58 characters long.
    WrongLength(usize),
    /// The string contains a character outside the base32 alphabet.
    InvalidCharacter(char),
    /// The embedded checksum does not match the public key.
    ChecksumMismatch,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongLength(len) => {
                write!(f, "address must be {} characters, got {}", ENCODED_LEN, len)
            }
            Self::InvalidCharacter(c) => write!(f, "invalid base32 character {:?}", c),
            Self::ChecksumMismatch => write!(f, "address checksum mismatch"),
        }
    }
}

impl std::error::Error for AddressError {}

// ════════════════════════════════════════════════════════════════════════════════
// BASE32 (RFC 4648, no padding)
// ════════════════════════════════════════════════════════════════════════════════

/// Encodes bytes as unpadded RFC 4648 base32.
pub(crate) fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;
    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1F) as usize] as char);
        }
    }
    if bits > 0 {
        // Final partial group, low bits zero-filled.
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1F) as usize] as char);
    }
    out
}

/// Decodes unpadded RFC 4648 base32. Trailing bits that do not fill a
/// whole byte are discarded, mirroring the encoder.
pub(crate) fn base32_decode(s: &str) -> Result<Vec<u8>, AddressError> {
    let mut out = Vec::with_capacity(s.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;
    for c in s.chars() {
        let value = match c {
            'A'..='Z' => c as u32 - 'A' as u32,
            '2'..='7' => c as u32 - '2' as u32 + 26,
            _ => return Err(AddressError::InvalidCharacter(c)),
        };
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((buffer >> bits) & 0xFF) as u8);
        }
    }
    Ok(out)
}

fn checksum(public_key: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha512_256::digest(public_key);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[digest.len() - CHECKSUM_LEN..]);
    out
}

// ════════════════════════════════════════════════════════════════════════════════
// ADDRESS
// ════════════════════════════════════════════════════════════════════════════════

/// A checksummed account address in its 58-character string form.
///
/// Ordering and equality are on the string, which is equivalent to
/// ordering on the public key bytes only up to the base32 mapping; all
/// the pipeline needs is determinism, which both provide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Encodes a 32-byte public key into its address form.
    #[must_use]
    pub fn from_public_key(public_key: &[u8; PUBLIC_KEY_LEN]) -> Self {
        let check = checksum(public_key);
        let mut bytes = [0u8; PUBLIC_KEY_LEN + CHECKSUM_LEN];
        bytes[..PUBLIC_KEY_LEN].copy_from_slice(public_key);
        bytes[PUBLIC_KEY_LEN..].copy_from_slice(&check);
        Self(base32_encode(&bytes))
    }

    /// Parses and checksum-validates an address string.
    pub fn decode(s: &str) -> Result<Self, AddressError> {
        let addr = Self(s.to_string());
        addr.public_key()?;
        Ok(addr)
    }

    /// Recovers the 32-byte public key, validating the checksum.
    pub fn public_key(&self) -> Result<[u8; PUBLIC_KEY_LEN], AddressError> {
        if self.0.len() != ENCODED_LEN {
            return Err(AddressError::WrongLength(self.0.len()));
        }
        let decoded = base32_decode(&self.0)?;
        if decoded.len() != PUBLIC_KEY_LEN + CHECKSUM_LEN {
            return Err(AddressError::WrongLength(self.0.len()));
        }
        let mut key = [0u8; PUBLIC_KEY_LEN];
        key.copy_from_slice(&decoded[..PUBLIC_KEY_LEN]);
        if decoded[PUBLIC_KEY_LEN..] != checksum(&key) {
            return Err(AddressError::ChecksumMismatch);
        }
        Ok(key)
    }

    /// The encoded string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ZERO_ADDRESS;

    #[test]
    fn zero_key_encodes_to_sentinel() {
        let addr = Address::from_public_key(&[0u8; PUBLIC_KEY_LEN]);
        assert_eq!(addr.as_str(), ZERO_ADDRESS);
    }

    #[test]
    fn round_trip_recovers_key() {
        let key = [0x7Fu8; PUBLIC_KEY_LEN];
        let addr = Address::from_public_key(&key);
        assert_eq!(addr.as_str().len(), ENCODED_LEN);
        let recovered = addr
            .public_key()
            .unwrap_or_else(|e| panic!("round trip failed: {}", e));
        assert_eq!(recovered, key);
    }

    #[test]
    fn decode_validates_checksum() {
        let addr = Address::from_public_key(&[0x11u8; PUBLIC_KEY_LEN]);
        assert!(Address::decode(addr.as_str()).is_ok());

        // Flip one character in the key region.
        let mut corrupted: Vec<char> = addr.as_str().chars().collect();
        corrupted[0] = if corrupted[0] == 'A' { 'B' } else { 'A' };
        let corrupted: String = corrupted.into_iter().collect();
        assert_eq!(
            Address::decode(&corrupted),
            Err(AddressError::ChecksumMismatch)
        );
    }

    #[test]
    fn decode_rejects_bad_length() {
        assert_eq!(Address::decode("ABC"), Err(AddressError::WrongLength(3)));
        assert_eq!(Address::decode(""), Err(AddressError::WrongLength(0)));
    }

    #[test]
    fn decode_rejects_bad_character() {
        // '1' and '0' are outside the base32 alphabet.
        let bad = "1".repeat(ENCODED_LEN);
        assert_eq!(
            Address::decode(&bad),
            Err(AddressError::InvalidCharacter('1'))
        );
    }

    #[test]
    fn base32_codec_round_trips() {
        let data = [0xDEu8, 0xAD, 0xBE, 0xEF, 0x01, 0x23, 0x45];
        let encoded = base32_encode(&data);
        let decoded = base32_decode(&encoded)
            .unwrap_or_else(|e| panic!("decode failed: {}", e));
        assert_eq!(decoded, data);
    }

    #[test]
    fn distinct_keys_produce_distinct_addresses() {
        let a = Address::from_public_key(&[1u8; PUBLIC_KEY_LEN]);
        let b = Address::from_public_key(&[2u8; PUBLIC_KEY_LEN]);
        assert_ne!(a, b);
    }
}

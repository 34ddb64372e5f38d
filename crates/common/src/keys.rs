//! # Dispenser Account — Ed25519 Signing Identity
//!
//! The dispenser is the funded account every payout is sent from. It is
//! loaded from a hex-encoded 32-byte Ed25519 seed (the form a key
//! management tool exports) and derives its own on-chain [`Address`]
//! from the verifying key.
//!
//! ## Determinism
//!
//! `from_seed_hex` is fully deterministic: the same seed always produces
//! the same address and signing behavior (Ed25519 signing is
//! deterministic per RFC 8032).
//!
//! ## Safety
//!
//! - Seed bytes are never exposed via any public method.
//! - Error messages carry no key material and are safe to log.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};

use crate::address::Address;

/// Length of the Ed25519 seed in bytes.
pub const SEED_LEN: usize = 32;

// ════════════════════════════════════════════════════════════════════════════════
// ERROR
// ════════════════════════════════════════════════════════════════════════════════

/// Errors from loading the dispenser key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The seed string is not valid hex.
    InvalidHex(String),
    /// The decoded seed is not exactly 32 bytes.
    InvalidLength(usize),
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHex(msg) => write!(f, "dispenser seed is not valid hex: {}", msg),
            Self::InvalidLength(len) => {
                write!(f, "dispenser seed must be {} bytes, got {}", SEED_LEN, len)
            }
        }
    }
}

impl std::error::Error for KeyError {}

// ════════════════════════════════════════════════════════════════════════════════
// DISPENSER ACCOUNT
// ════════════════════════════════════════════════════════════════════════════════

/// The signing identity payouts are funded from.
pub struct DispenserAccount {
    signing_key: SigningKey,
    address: Address,
}

impl DispenserAccount {
    /// Loads the account from a hex-encoded 32-byte Ed25519 seed.
    pub fn from_seed_hex(seed_hex: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(seed_hex.trim()).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
        let seed: [u8; SEED_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidLength(bytes.len()))?;
        Ok(Self::from_seed(seed))
    }

    /// Loads the account from raw seed bytes.
    #[must_use]
    pub fn from_seed(seed: [u8; SEED_LEN]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let address = Address::from_public_key(signing_key.verifying_key().as_bytes());
        Self {
            signing_key,
            address,
        }
    }

    /// The account's on-chain address.
    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The account's verifying key.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Signs a message, returning the 64-byte Ed25519 signature.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for DispenserAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material.
        f.debug_struct("DispenserAccount")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════

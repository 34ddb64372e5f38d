//! # Asset Transfer Transactions
//!
//! Builds, groups, and signs the asset-transfer transactions the payout
//! pipeline submits. The encoding here is deliberately minimal: a
//! deterministic, length-delimited byte layout with a `"TX"` domain tag,
//! hashed with SHA-512/256 for transaction ids and signed with the
//! dispenser's Ed25519 key.
//!
//! ```text
//! AssetTransfer ──canonical_bytes()──▶ "TX" ∥ fields
//!       │                                   │
//!       │                                   ├─ SHA-512/256 ▶ transaction id
//!       │                                   └─ Ed25519 sign ▶ signature
//!       ▼
//! assign_group(): gid = SHA-512/256("TG" ∥ id₁ ∥ id₂ ∥ …)   (ids with group unset)
//! ```
//!
//! An atomic group either commits every member transaction or none; the
//! group id must therefore be written into each member *before* signing.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};

use crate::address::{base32_encode, Address, AddressError};
use crate::constants::MAX_GROUP_SIZE;
use crate::keys::DispenserAccount;

// ════════════════════════════════════════════════════════════════════════════════
// ERROR
// ════════════════════════════════════════════════════════════════════════════════

/// Errors from building or signing transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnError {
    /// A sender or receiver address failed to decode.
    BadAddress(AddressError),
    /// An atomic group cannot be empty.
    EmptyGroup,
    /// An atomic group exceeds the protocol limit.
    GroupTooLarge(usize),
    /// The transaction's sender is not the signing account.
    SenderMismatch,
    /// Signature verification machinery rejected the key material.
    Crypto(String),
}

impl fmt::Display for TxnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadAddress(e) => write!(f, "bad transaction address: {}", e),
            Self::EmptyGroup => write!(f, "transaction group is empty"),
            Self::GroupTooLarge(n) => {
                write!(f, "transaction group has {} members, limit is {}", n, MAX_GROUP_SIZE)
            }
            Self::SenderMismatch => write!(f, "transaction sender is not the signing account"),
            Self::Crypto(msg) => write!(f, "crypto error: {}", msg),
        }
    }
}

impl std::error::Error for TxnError {}

impl From<AddressError> for TxnError {
    fn from(e: AddressError) -> Self {
        Self::BadAddress(e)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TRANSACTION
// ════════════════════════════════════════════════════════════════════════════════

/// An unsigned asset-transfer transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTransfer {
    pub sender: Address,
    pub receiver: Address,
    pub asset_id: u64,
    /// Transfer amount in base units of the asset.
    pub amount: u64,
    /// Flat fee in base units of the network token.
    pub fee: u64,
    /// First round this transaction is valid in.
    pub first_valid: u64,
    /// Last round this transaction is valid in.
    pub last_valid: u64,
    pub genesis_id: String,
    /// Base64 genesis hash as reported by the node.
    pub genesis_hash: String,
    /// Note payload; empty means no note.
    #[serde(with = "base64_bytes")]
    pub note: Vec<u8>,
    /// Atomic group id, set by [`assign_group`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<[u8; 32]>,
}

impl AssetTransfer {
    /// Deterministic signing bytes: `"TX"` tag, then every field
    /// length-delimited in a fixed order. Two transactions have equal
    /// canonical bytes iff all their fields are equal.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, TxnError> {
        let sender_key = self.sender.public_key()?;
        let receiver_key = self.receiver.public_key()?;

        let mut buf = Vec::with_capacity(160 + self.note.len());
        buf.extend_from_slice(b"TX");
        push_u64(&mut buf, self.amount);
        push_u64(&mut buf, self.asset_id);
        push_u64(&mut buf, self.fee);
        push_u64(&mut buf, self.first_valid);
        push_u64(&mut buf, self.last_valid);
        push_bytes(&mut buf, self.genesis_id.as_bytes());
        push_bytes(&mut buf, self.genesis_hash.as_bytes());
        match &self.group {
            Some(gid) => push_bytes(&mut buf, gid),
            None => push_bytes(&mut buf, &[]),
        }
        push_bytes(&mut buf, &self.note);
        push_bytes(&mut buf, &receiver_key);
        push_bytes(&mut buf, &sender_key);
        Ok(buf)
    }

    /// 32-byte transaction id: SHA-512/256 over the canonical bytes.
    pub fn id(&self) -> Result<[u8; 32], TxnError> {
        let digest = Sha512_256::digest(self.canonical_bytes()?);
        let mut id = [0u8; 32];
        id.copy_from_slice(&digest);
        Ok(id)
    }

    /// Display form of the transaction id (unpadded base32).
    pub fn id_string(&self) -> Result<String, TxnError> {
        Ok(base32_encode(&self.id()?))
    }

    /// Signs the transaction with the dispenser key.
    ///
    /// The sender must be the dispenser's own address; signing somebody
    /// else's transaction is always a wiring bug.
    pub fn sign(self, account: &DispenserAccount) -> Result<SignedTransfer, TxnError> {
        if &self.sender != account.address() {
            return Err(TxnError::SenderMismatch);
        }
        let signature = account.sign(&self.canonical_bytes()?);
        Ok(SignedTransfer {
            txn: self,
            signature,
        })
    }
}

fn push_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn push_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

// ════════════════════════════════════════════════════════════════════════════════
// GROUP ASSIGNMENT
// ════════════════════════════════════════════════════════════════════════════════

/// Computes the atomic group id over the member transactions and writes
/// it into each of them.
///
/// The group id is SHA-512/256 over `"TG"` followed by every member's
/// transaction id, where the ids are computed with the group field unset.
/// Any previously assigned group id is discarded.
pub fn assign_group(txns: &mut [AssetTransfer]) -> Result<[u8; 32], TxnError> {
    if txns.is_empty() {
        return Err(TxnError::EmptyGroup);
    }
    if txns.len() > MAX_GROUP_SIZE {
        return Err(TxnError::GroupTooLarge(txns.len()));
    }

    let mut hasher = Sha512_256::new();
    hasher.update(b"TG");
    for txn in txns.iter() {
        let mut ungrouped = txn.clone();
        ungrouped.group = None;
        hasher.update(ungrouped.id()?);
    }
    let digest = hasher.finalize();
    let mut gid = [0u8; 32];
    gid.copy_from_slice(&digest);

    for txn in txns.iter_mut() {
        txn.group = Some(gid);
    }
    Ok(gid)
}

// ════════════════════════════════════════════════════════════════════════════════
// SIGNED TRANSACTION
// ════════════════════════════════════════════════════════════════════════════════

/// A signed asset transfer, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransfer {
    pub txn: AssetTransfer,
    /// Ed25519 signature over the canonical bytes (group id included).
    #[serde(with = "base64_signature")]
    pub signature: [u8; 64],
}

impl SignedTransfer {
    /// Verifies the signature against the sender's public key.
    pub fn verify(&self) -> Result<bool, TxnError> {
        let key_bytes = self.txn.sender.public_key()?;
        let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| TxnError::Crypto(e.to_string()))?;
        let signature = ed25519_dalek::Signature::from_bytes(&self.signature);
        let message = self.txn.canonical_bytes()?;
        Ok(verifying_key.verify_strict(&message, &signature).is_ok())
    }

    /// Display form of the transaction id.
    pub fn id_string(&self) -> Result<String, TxnError> {
        self.txn.id_string()
    }
}

// ── base64 serde helpers ─────────────────────────────────────────────────

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

mod base64_signature {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(sig: &[u8; 64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(sig))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 64], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = STANDARD.decode(s).map_err(serde::de::Error::custom)?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::custom("signature must be 64 bytes"))
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn dispenser() -> DispenserAccount {
        DispenserAccount::from_seed([0xAA; 32])
    }

    fn transfer(account: &DispenserAccount, receiver_byte: u8, amount: u64) -> AssetTransfer {
        AssetTransfer {
            sender: account.address().clone(),
            receiver: Address::from_public_key(&[receiver_byte; 32]),
            asset_id: 452_399_768,
            amount,
            fee: 1_000,
            first_valid: 25_000_000,
            last_valid: 25_001_000,
            genesis_id: "mainnet-v1.0".to_string(),
            genesis_hash: "wGHE2Pwdvd7S12BL5FaOP20EGYesN73ktiC1qzkkit8=".to_string(),
            note: b"rewards/v1:j[]".to_vec(),
            group: None,
        }
    }

    // ── Canonical bytes & ids ────────────────────────────────────────────

    #[test]
    fn canonical_bytes_are_deterministic() {
        let account = dispenser();
        let a = transfer(&account, 1, 500);
        let b = transfer(&account, 1, 500);
        assert_eq!(
            a.canonical_bytes().unwrap_or_else(|e| panic!("encode: {}", e)),
            b.canonical_bytes().unwrap_or_else(|e| panic!("encode: {}", e)),
        );
        assert_eq!(a.id().unwrap(), b.id().unwrap());
    }

    #[test]
    fn id_changes_with_any_field() {
        let account = dispenser();
        let base = transfer(&account, 1, 500);
        let mut other = transfer(&account, 1, 501);
        assert_ne!(base.id().unwrap(), other.id().unwrap());

        other = transfer(&account, 2, 500);
        assert_ne!(base.id().unwrap(), other.id().unwrap());

        other = transfer(&account, 1, 500);
        other.note = Vec::new();
        assert_ne!(base.id().unwrap(), other.id().unwrap());
    }

    #[test]
    fn id_string_is_base32() {
        let account = dispenser();
        let id = transfer(&account, 1, 500).id_string().unwrap();
        // 32 bytes -> 52 base32 characters.
        assert_eq!(id.len(), 52);
        assert!(id.chars().all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c)));
    }

    // ── Group assignment ─────────────────────────────────────────────────

    #[test]
    fn assign_group_sets_same_id_on_all_members() {
        let account = dispenser();
        let mut txns = vec![transfer(&account, 1, 500), transfer(&account, 2, 700)];
        let gid = assign_group(&mut txns).unwrap_or_else(|e| panic!("group: {}", e));
        assert_eq!(txns[0].group, Some(gid));
        assert_eq!(txns[1].group, Some(gid));
    }

    #[test]
    fn different_members_different_group_id() {
        let account = dispenser();
        let mut page_a = vec![transfer(&account, 1, 500)];
        let mut page_b = vec![transfer(&account, 1, 501)];
        let gid_a = assign_group(&mut page_a).unwrap();
        let gid_b = assign_group(&mut page_b).unwrap();
        assert_ne!(gid_a, gid_b);
    }

    #[test]
    fn assign_group_ignores_stale_group_ids() {
        let account = dispenser();
        let mut fresh = vec![transfer(&account, 1, 500)];
        let mut stale = vec![transfer(&account, 1, 500)];
        stale[0].group = Some([0xFF; 32]);
        assert_eq!(assign_group(&mut fresh).unwrap(), assign_group(&mut stale).unwrap());
    }

    #[test]
    fn assign_group_rejects_empty_and_oversized() {
        let account = dispenser();
        assert_eq!(assign_group(&mut []), Err(TxnError::EmptyGroup));

        let mut txns: Vec<AssetTransfer> =
            (0..=MAX_GROUP_SIZE as u8).map(|i| transfer(&account, i, 500)).collect();
        assert_eq!(
            assign_group(&mut txns),
            Err(TxnError::GroupTooLarge(MAX_GROUP_SIZE + 1))
        );
    }

    // ── Signing ──────────────────────────────────────────────────────────

    #[test]
    fn sign_and_verify() {
        let account = dispenser();
        let signed = transfer(&account, 1, 500)
            .sign(&account)
            .unwrap_or_else(|e| panic!("sign: {}", e));
        assert!(signed.verify().unwrap());
    }

    #[test]
    fn tampered_transaction_fails_verification() {
        let account = dispenser();
        let mut signed = transfer(&account, 1, 500).sign(&account).unwrap();
        signed.txn.amount += 1;
        assert!(!signed.verify().unwrap());
    }

    #[test]
    fn sign_rejects_foreign_sender() {
        let account = dispenser();
        let mut txn = transfer(&account, 1, 500);
        txn.sender = Address::from_public_key(&[0x55; 32]);
        assert_eq!(txn.sign(&account), Err(TxnError::SenderMismatch));
    }

    #[test]
    fn signature_covers_group_id() {
        let account = dispenser();
        let mut txns = vec![transfer(&account, 1, 500), transfer(&account, 2, 700)];
        assign_group(&mut txns).unwrap();
        let mut signed = txns
            .into_iter()
            .map(|t| t.sign(&account).unwrap())
            .collect::<Vec<_>>();
        assert!(signed.iter().all(|s| s.verify().unwrap()));

        // Moving a signed transaction into another group invalidates it.
        signed[0].txn.group = Some([0x01; 32]);
        assert!(!signed[0].verify().unwrap());
    }

    // ── Serialization ────────────────────────────────────────────────────

    #[test]
    fn signed_transfer_round_trips_through_json() {
        let account = dispenser();
        let signed = transfer(&account, 1, 500).sign(&account).unwrap();
        let json = serde_json::to_string(&signed).unwrap_or_else(|e| panic!("json: {}", e));
        let back: SignedTransfer =
            serde_json::from_str(&json).unwrap_or_else(|e| panic!("parse: {}", e));
        assert_eq!(back, signed);
        assert!(back.verify().unwrap());
    }
}

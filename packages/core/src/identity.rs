//! Client identity: the Ed25519 keypair that authenticates every connection.
//!
//! Servers see a client as its *node id*: the base58 encoding of the 32-byte
//! Ed25519 public key. A fresh [`Keypair`] gives an ephemeral identity; a
//! keypair restored from a saved 32-byte seed gives a stable one.
//!
//! # Typical host lifecycle
//!
//! ```text
//! First run:
//!   keypair = Keypair::generate()?
//!   seed    = keypair.seed()          // persist this, 32 raw bytes
//!
//! Subsequent runs:
//!   keypair = Keypair::from_seed(&saved_seed)
//!   // same node id as before
//! ```
//!
//! Secret material is zeroized when a [`Keypair`] is dropped or
//! [`cleared`](Keypair::clear).

use std::fmt;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

/// Errors that can occur when creating a [`Keypair`].
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to gather randomness for keypair generation: {0}")]
    Randomness(String),

    #[error("invalid seed: {0}")]
    InvalidSeed(String),
}

/// An Ed25519 keypair.
///
/// Not `Clone`: a keypair has exactly one owner, which is what lets a
/// [`Client`](crate::Client) scrub the keys it generated without touching
/// keys it was lent.
pub struct Keypair {
    signing_key: SigningKey,
    cleared: bool,
}

impl Keypair {
    /// Generate a fresh keypair from OS randomness.
    pub fn generate() -> Result<Self, IdentityError> {
        let mut seed = Zeroizing::new([0u8; 32]);
        OsRng
            .try_fill_bytes(&mut seed[..])
            .map_err(|e| IdentityError::Randomness(e.to_string()))?;
        Ok(Self::from_seed(&seed))
    }

    /// Derive a keypair deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
            cleared: false,
        }
    }

    /// Derive a keypair from a hex-encoded 32-byte seed.
    pub fn from_seed_hex(hex_seed: &str) -> Result<Self, IdentityError> {
        let bytes = Zeroizing::new(
            hex::decode(hex_seed.trim())
                .map_err(|e| IdentityError::InvalidSeed(format!("not hex: {e}")))?,
        );
        let seed: &[u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            IdentityError::InvalidSeed(format!("seed must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_seed(seed))
    }

    /// The raw 32-byte seed. **Keep this secret.**
    pub fn seed(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }

    /// The Ed25519 public key.
    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// The client's node id: base58 of the 32-byte public key.
    pub fn node_id(&self) -> String {
        bs58::encode(self.public_key().as_bytes()).into_string()
    }

    /// Sign `message`, e.g. a handshake transcript. Returns the raw 64-byte
    /// signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Scrub the secret key.
    ///
    /// The keypair is unusable afterwards: it holds the all-zero seed and
    /// [`is_cleared`](Self::is_cleared) reports `true`.
    pub fn clear(&mut self) {
        let mut zero = [0u8; 32];
        // The replaced key is zeroized by its own Drop.
        self.signing_key = SigningKey::from_bytes(&zero);
        zero.zeroize();
        self.cleared = true;
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("node_id", &self.node_id())
            .field("cleared", &self.cleared)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    #[test]
    fn generated_keypairs_differ() {
        let a = Keypair::generate().unwrap();
        let b = Keypair::generate().unwrap();
        assert_ne!(a.node_id(), b.node_id());
    }

    #[test]
    fn stable_from_seed() {
        let id = Keypair::generate().unwrap();
        let restored = Keypair::from_seed(&id.seed());
        assert_eq!(id.node_id(), restored.node_id());
    }

    #[test]
    fn from_seed_hex_matches_raw_seed() {
        let seed = [7u8; 32];
        let hex_seed = hex::encode(seed);
        let a = Keypair::from_seed(&seed);
        let b = Keypair::from_seed_hex(&hex_seed).unwrap();
        assert_eq!(a.node_id(), b.node_id());
    }

    #[test]
    fn from_seed_hex_rejects_wrong_length() {
        assert!(matches!(
            Keypair::from_seed_hex("abcd"),
            Err(IdentityError::InvalidSeed(_))
        ));
        assert!(matches!(
            Keypair::from_seed_hex("not hex at all"),
            Err(IdentityError::InvalidSeed(_))
        ));
    }

    #[test]
    fn signature_verifies() {
        let id = Keypair::generate().unwrap();
        let sig = Signature::from_bytes(&id.sign(b"handshake"));
        assert!(id.public_key().verify(b"handshake", &sig).is_ok());
    }

    #[test]
    fn clear_scrubs_seed() {
        let mut id = Keypair::from_seed(&[9u8; 32]);
        id.clear();
        assert!(id.is_cleared());
        assert_eq!(*id.seed(), [0u8; 32]);
    }

    #[test]
    fn debug_does_not_leak_seed() {
        let id = Keypair::from_seed(&[1u8; 32]);
        let dbg = format!("{id:?}");
        assert!(dbg.contains(&id.node_id()));
        assert!(!dbg.contains(&hex::encode([1u8; 32])));
    }
}

//! Sealed, time-limited action tokens.
//!
//! A token carries `{subject_id, expiration}` as canonical JSON, encrypted
//! with the symmetric key of its class (reset-password and confirm-email are
//! keyed independently) and emitted as `hex(nonce || ciphertext)`. The
//! ciphertext keeps the subject id opaque to the client, so tokens cannot be
//! used to enumerate account ids. Tokens are never stored server-side; they
//! only exist in the email link round-trip.

use aes_gcm::{
    Aes128Gcm, Aes256Gcm,
    aead::{
        Aead, AeadCore, KeyInit,
        generic_array::{GenericArray, typenum::U12},
    },
};
use chrono::{DateTime, Duration, Utc};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const NONCE_LEN: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Hex, decryption, or payload parsing failed (wrong key, wrong class,
    /// or a corrupted token).
    #[error("malformed token")]
    Malformed,
    /// The token decoded correctly but its expiration is not in the future.
    #[error("token expired")]
    Expired,
    /// The configured key does not match the algorithm's key length.
    #[error("invalid key length for algorithm")]
    InvalidKey,
}

/// Symmetric algorithms a token class may be configured with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    Aes256Gcm,
    Aes128Gcm,
}

impl Algorithm {
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::Aes256Gcm => 32,
            Self::Aes128Gcm => 16,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aes256Gcm => "aes-256-gcm",
            Self::Aes128Gcm => "aes-128-gcm",
        }
    }
}

impl std::str::FromStr for Algorithm {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "aes-256-gcm" => Ok(Self::Aes256Gcm),
            "aes-128-gcm" => Ok(Self::Aes128Gcm),
            other => Err(format!("unsupported token algorithm: {other}")),
        }
    }
}

/// The capability a token grants: one subject, one deadline.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub subject_id: Uuid,
    pub expiration: DateTime<Utc>,
}

/// Mint an opaque token for `subject_id` expiring `ttl_minutes` from now.
///
/// A non-positive TTL mints an already-expired token.
///
/// # Errors
///
/// Returns `TokenError::InvalidKey` if the key length does not match the
/// algorithm, `TokenError::Malformed` if sealing fails.
pub fn mint(
    subject_id: Uuid,
    ttl_minutes: i64,
    algorithm: Algorithm,
    key: &[u8],
) -> Result<String, TokenError> {
    let claim = Claim {
        subject_id,
        expiration: Utc::now() + Duration::minutes(ttl_minutes),
    };
    let plaintext = serde_json::to_vec(&claim).map_err(|_| TokenError::Malformed)?;

    let sealed = match algorithm {
        Algorithm::Aes256Gcm => seal::<Aes256Gcm>(key, &plaintext)?,
        Algorithm::Aes128Gcm => seal::<Aes128Gcm>(key, &plaintext)?,
    };

    Ok(hex::encode(sealed))
}

/// Decode and validate a token minted by [`mint`].
///
/// # Errors
///
/// `TokenError::Malformed` for anything that fails to decrypt or parse,
/// `TokenError::Expired` when the claim's expiration is not strictly in the
/// future. Callers must treat both as terminal and must not reveal which one
/// occurred.
pub fn verify(token: &str, algorithm: Algorithm, key: &[u8]) -> Result<Claim, TokenError> {
    let sealed = hex::decode(token.trim()).map_err(|_| TokenError::Malformed)?;

    let plaintext = match algorithm {
        Algorithm::Aes256Gcm => open::<Aes256Gcm>(key, &sealed)?,
        Algorithm::Aes128Gcm => open::<Aes128Gcm>(key, &sealed)?,
    };

    let claim: Claim = serde_json::from_slice(&plaintext).map_err(|_| TokenError::Malformed)?;

    if claim.expiration <= Utc::now() {
        return Err(TokenError::Expired);
    }

    Ok(claim)
}

fn seal<C>(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, TokenError>
where
    C: KeyInit + Aead + AeadCore<NonceSize = U12>,
{
    let cipher = C::new_from_slice(key).map_err(|_| TokenError::InvalidKey)?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(GenericArray::from_slice(&nonce), plaintext)
        .map_err(|_| TokenError::Malformed)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

fn open<C>(key: &[u8], sealed: &[u8]) -> Result<Vec<u8>, TokenError>
where
    C: KeyInit + Aead + AeadCore<NonceSize = U12>,
{
    if sealed.len() <= NONCE_LEN {
        return Err(TokenError::Malformed);
    }
    let cipher = C::new_from_slice(key).map_err(|_| TokenError::InvalidKey)?;
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

    cipher
        .decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map_err(|_| TokenError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_256: [u8; 32] = [7u8; 32];
    const KEY_128: [u8; 16] = [9u8; 16];

    #[test]
    fn round_trip_returns_original_subject() {
        let subject_id = Uuid::new_v4();
        let token = mint(subject_id, 30, Algorithm::Aes256Gcm, &KEY_256).unwrap();
        let claim = verify(&token, Algorithm::Aes256Gcm, &KEY_256).unwrap();
        assert_eq!(claim.subject_id, subject_id);
        assert!(claim.expiration > Utc::now());
    }

    #[test]
    fn round_trip_aes_128() {
        let subject_id = Uuid::new_v4();
        let token = mint(subject_id, 30, Algorithm::Aes128Gcm, &KEY_128).unwrap();
        let claim = verify(&token, Algorithm::Aes128Gcm, &KEY_128).unwrap();
        assert_eq!(claim.subject_id, subject_id);
    }

    #[test]
    fn negative_ttl_yields_expired() {
        let token = mint(Uuid::new_v4(), -1, Algorithm::Aes256Gcm, &KEY_256).unwrap();
        assert_eq!(
            verify(&token, Algorithm::Aes256Gcm, &KEY_256),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn zero_ttl_yields_expired() {
        let token = mint(Uuid::new_v4(), 0, Algorithm::Aes256Gcm, &KEY_256).unwrap();
        assert_eq!(
            verify(&token, Algorithm::Aes256Gcm, &KEY_256),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn wrong_key_is_malformed() {
        let token = mint(Uuid::new_v4(), 30, Algorithm::Aes256Gcm, &KEY_256).unwrap();
        let other_key = [8u8; 32];
        assert_eq!(
            verify(&token, Algorithm::Aes256Gcm, &other_key),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn cross_class_tokens_do_not_verify() {
        // Reset and confirm classes are keyed independently; a token minted
        // for one class must not decode under the other.
        let reset_key = [1u8; 32];
        let confirm_key = [2u8; 32];
        let token = mint(Uuid::new_v4(), 30, Algorithm::Aes256Gcm, &reset_key).unwrap();
        assert_eq!(
            verify(&token, Algorithm::Aes256Gcm, &confirm_key),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn cross_algorithm_tokens_do_not_verify() {
        let token = mint(Uuid::new_v4(), 30, Algorithm::Aes256Gcm, &KEY_256).unwrap();
        assert_eq!(
            verify(&token, Algorithm::Aes128Gcm, &KEY_128),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn garbage_inputs_are_malformed() {
        assert_eq!(
            verify("not-hex", Algorithm::Aes256Gcm, &KEY_256),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            verify("deadbeef", Algorithm::Aes256Gcm, &KEY_256),
            Err(TokenError::Malformed)
        );
        assert_eq!(verify("", Algorithm::Aes256Gcm, &KEY_256), Err(TokenError::Malformed));
    }

    #[test]
    fn truncated_token_is_malformed() {
        let token = mint(Uuid::new_v4(), 30, Algorithm::Aes256Gcm, &KEY_256).unwrap();
        let truncated = &token[..token.len() - 8];
        assert_eq!(
            verify(truncated, Algorithm::Aes256Gcm, &KEY_256),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn bad_key_length_is_rejected() {
        let short_key = [1u8; 5];
        assert_eq!(
            mint(Uuid::new_v4(), 30, Algorithm::Aes256Gcm, &short_key),
            Err(TokenError::InvalidKey)
        );
    }

    #[test]
    fn algorithm_parses_and_round_trips() {
        assert_eq!("aes-256-gcm".parse(), Ok(Algorithm::Aes256Gcm));
        assert_eq!("AES-128-GCM".parse(), Ok(Algorithm::Aes128Gcm));
        assert!("chacha20".parse::<Algorithm>().is_err());
        assert_eq!(Algorithm::Aes256Gcm.as_str(), "aes-256-gcm");
        assert_eq!(Algorithm::Aes256Gcm.key_len(), 32);
        assert_eq!(Algorithm::Aes128Gcm.key_len(), 16);
    }
}

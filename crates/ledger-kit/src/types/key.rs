//! Cryptographic key types.
//!
//! The ledger's signature scheme is Ed25519. Keys render as
//! `ed25519:<base58>` strings, the form used in credential files and
//! environment variables.

use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use bip39::Mnemonic;
use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::{Signer as _, SigningKey as DalekSigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use slipped10::{BIP32Path, Curve};

use crate::error::{ParseKeyError, SignerError};

const KEY_PREFIX: &str = "ed25519";

/// Default BIP-32 HD derivation path for ledger keys (SLIP-44 coin
/// type 9607).
pub const DEFAULT_HD_PATH: &str = "m/44'/9607'/0'";

/// Default number of words in generated seed phrases.
pub const DEFAULT_WORD_COUNT: usize = 12;

// ============================================================================
// PublicKey
// ============================================================================

/// An Ed25519 public key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Create from raw bytes, validating the curve point.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, ParseKeyError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| ParseKeyError::InvalidCurvePoint)?;
        Ok(Self(bytes))
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
        key.verify(message, &sig).is_ok()
    }
}

impl FromStr for PublicKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = decode_prefixed(s, 32)?;
        let bytes: [u8; 32] = data
            .as_slice()
            .try_into()
            .map_err(|_| ParseKeyError::InvalidCurvePoint)?;
        Self::from_bytes(bytes)
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            KEY_PREFIX,
            bs58::encode(&self.0).into_string()
        )
    }
}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = Deserialize::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl BorshSerialize for PublicKey {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.0)
    }
}

impl BorshDeserialize for PublicKey {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut bytes = [0u8; 32];
        reader.read_exact(&mut bytes)?;
        Self::from_bytes(bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

// ============================================================================
// SecretKey
// ============================================================================

/// An Ed25519 secret key.
#[derive(Clone)]
pub struct SecretKey([u8; 32]);

impl SecretKey {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let signing_key = DalekSigningKey::generate(&mut OsRng);
        Self(signing_key.to_bytes())
    }

    /// Create from raw seed bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw seed bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive the public key.
    pub fn public_key(&self) -> PublicKey {
        let signing_key = DalekSigningKey::from_bytes(&self.0);
        PublicKey(signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let signing_key = DalekSigningKey::from_bytes(&self.0);
        Signature(signing_key.sign(message).to_bytes())
    }

    // ========================================================================
    // Seed Phrase / Mnemonic Support
    // ========================================================================

    /// Derive a secret key from a BIP-39 seed phrase using SLIP-10
    /// derivation with the default HD path.
    pub fn from_seed_phrase(phrase: impl AsRef<str>) -> Result<Self, SignerError> {
        Self::from_seed_phrase_with_path(phrase, DEFAULT_HD_PATH)
    }

    /// Derive a secret key from a BIP-39 seed phrase with a custom HD
    /// path. Only hardened path components are supported.
    pub fn from_seed_phrase_with_path(
        phrase: impl AsRef<str>,
        hd_path: impl AsRef<str>,
    ) -> Result<Self, SignerError> {
        let normalized = phrase
            .as_ref()
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        let mnemonic: Mnemonic = normalized
            .parse()
            .map_err(|_| SignerError::InvalidSeedPhrase)?;
        let seed = mnemonic.to_seed("");

        let path: BIP32Path = hd_path
            .as_ref()
            .parse()
            .map_err(|e| SignerError::KeyDerivationFailed(format!("Invalid HD path: {}", e)))?;

        let derived =
            slipped10::derive_key_from_path(&seed, Curve::Ed25519, &path).map_err(|e| {
                SignerError::KeyDerivationFailed(format!("SLIP-10 derivation failed: {:?}", e))
            })?;

        Ok(Self(derived.key))
    }

    /// Generate a random seed phrase and the key derived from it.
    ///
    /// Returns both so the phrase can be backed up.
    pub fn generate_with_seed_phrase() -> Result<(String, Self), SignerError> {
        let mut entropy = [0u8; 16];
        rand::RngCore::fill_bytes(&mut OsRng, &mut entropy);
        let mnemonic = Mnemonic::from_entropy(&entropy)
            .map_err(|e| SignerError::KeyDerivationFailed(e.to_string()))?;
        let phrase = mnemonic.words().collect::<Vec<_>>().join(" ");
        let key = Self::from_seed_phrase(&phrase)?;
        Ok((phrase, key))
    }
}

impl FromStr for SecretKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = decode_prefixed(s, 32)?;
        let bytes: [u8; 32] = data
            .as_slice()
            .try_into()
            .map_err(|_| ParseKeyError::InvalidCurvePoint)?;
        Ok(Self(bytes))
    }
}

impl Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            KEY_PREFIX,
            bs58::encode(&self.0).into_string()
        )
    }
}

impl Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never reveal the seed
        write!(f, "SecretKey({})", self.public_key())
    }
}

// ============================================================================
// Signature
// ============================================================================

/// An Ed25519 signature.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// The raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            KEY_PREFIX,
            bs58::encode(&self.0).into_string()
        )
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

impl BorshSerialize for Signature {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.0)
    }
}

impl BorshDeserialize for Signature {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut bytes = [0u8; 64];
        reader.read_exact(&mut bytes)?;
        Ok(Self(bytes))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Decode an `ed25519:<base58>` string into raw bytes of the expected
/// length.
fn decode_prefixed(s: &str, expected: usize) -> Result<Vec<u8>, ParseKeyError> {
    let (prefix, data_str) = s.split_once(':').ok_or(ParseKeyError::InvalidFormat)?;
    if prefix != KEY_PREFIX {
        return Err(ParseKeyError::UnknownKeyType(prefix.to_string()));
    }

    let data = bs58::decode(data_str)
        .into_vec()
        .map_err(|e| ParseKeyError::InvalidBase58(e.to_string()))?;

    if data.len() != expected {
        return Err(ParseKeyError::InvalidLength {
            expected,
            actual: data.len(),
        });
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_generate_and_sign() {
        let secret = SecretKey::generate();
        let public = secret.public_key();

        let message = b"test message";
        let signature = secret.sign(message);

        assert!(public.verify(message, &signature));
        assert!(!public.verify(b"other message", &signature));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let secret = SecretKey::generate();
        let sig1 = secret.sign(b"message");
        let sig2 = secret.sign(b"message");
        assert_eq!(sig1, sig2);
    }

    #[test]
    fn test_public_key_display_roundtrip() {
        let public = SecretKey::generate().public_key();
        let text = public.to_string();
        assert!(text.starts_with("ed25519:"));
        let back: PublicKey = text.parse().unwrap();
        assert_eq!(back, public);
    }

    #[test]
    fn test_secret_key_display_roundtrip() {
        let secret = SecretKey::generate();
        let back: SecretKey = secret.to_string().parse().unwrap();
        assert_eq!(back.public_key(), secret.public_key());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            "nonsense".parse::<PublicKey>().unwrap_err(),
            ParseKeyError::InvalidFormat
        );
        assert!(matches!(
            "rsa:abcd".parse::<PublicKey>().unwrap_err(),
            ParseKeyError::UnknownKeyType(_)
        ));
        assert!(matches!(
            "ed25519:!!!".parse::<PublicKey>().unwrap_err(),
            ParseKeyError::InvalidBase58(_)
        ));
        assert!(matches!(
            "ed25519:abc".parse::<PublicKey>().unwrap_err(),
            ParseKeyError::InvalidLength { .. }
        ));
    }

    #[test]
    fn test_seed_phrase_is_deterministic() {
        let a = SecretKey::from_seed_phrase(TEST_PHRASE).unwrap();
        let b = SecretKey::from_seed_phrase(TEST_PHRASE).unwrap();
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_seed_phrase_paths_differ() {
        let a = SecretKey::from_seed_phrase_with_path(TEST_PHRASE, "m/44'/9607'/0'").unwrap();
        let b = SecretKey::from_seed_phrase_with_path(TEST_PHRASE, "m/44'/9607'/1'").unwrap();
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_seed_phrase_normalizes_whitespace() {
        let messy = format!("  {}  ", TEST_PHRASE.replace(' ', "   "));
        let a = SecretKey::from_seed_phrase(&messy).unwrap();
        let b = SecretKey::from_seed_phrase(TEST_PHRASE).unwrap();
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_invalid_seed_phrase() {
        let result = SecretKey::from_seed_phrase("not a valid mnemonic phrase at all");
        assert_eq!(result.unwrap_err(), SignerError::InvalidSeedPhrase);
    }

    #[test]
    fn test_generate_with_seed_phrase() {
        let (phrase, key) = SecretKey::generate_with_seed_phrase().unwrap();
        assert_eq!(phrase.split_whitespace().count(), DEFAULT_WORD_COUNT);
        let rederived = SecretKey::from_seed_phrase(&phrase).unwrap();
        assert_eq!(rederived.public_key(), key.public_key());
    }

    #[test]
    fn test_secret_key_debug_hides_seed() {
        let secret = SecretKey::generate();
        let debug = format!("{:?}", secret);
        assert!(debug.contains("PublicKey"));
        assert!(!debug.contains(&bs58::encode(secret.as_bytes()).into_string()));
    }

    #[test]
    fn test_borsh_roundtrip() {
        let secret = SecretKey::generate();
        let public = secret.public_key();
        let bytes = borsh::to_vec(&public).unwrap();
        assert_eq!(bytes.len(), 32);
        let back: PublicKey = borsh::from_slice(&bytes).unwrap();
        assert_eq!(back, public);

        let sig = secret.sign(b"payload");
        let bytes = borsh::to_vec(&sig).unwrap();
        assert_eq!(bytes.len(), 64);
        let back: Signature = borsh::from_slice(&bytes).unwrap();
        assert_eq!(back, sig);
    }
}

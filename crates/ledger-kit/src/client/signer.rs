//! Signer trait and implementations.
//!
//! A `Signer` knows which account pays for the operations it signs and
//! provides keys for signing. The `key()` method returns a
//! [`SigningKey`] bundling the public key with the signing capability.
//!
//! # Implementations
//!
//! - [`InMemorySigner`] - Single key stored in memory
//! - [`EnvSigner`] - Key loaded from environment variables
//! - [`FileSigner`] - Key loaded from `~/.ledger-credentials`
//!
//! # Example
//!
//! ```rust,no_run
//! use ledger_kit::{Ledger, InMemorySigner};
//!
//! # async fn example() -> Result<(), ledger_kit::Error> {
//! let signer = InMemorySigner::new("0.1001", "ed25519:...")?;
//!
//! let ledger = Ledger::testnet().operator(signer).build();
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::SignerError;
use crate::types::{AccountId, PublicKey, SecretKey, Signature};

// ============================================================================
// Signer Trait
// ============================================================================

/// Trait for transaction signing identities.
///
/// A signer knows which account it signs for and provides keys for
/// signing. Custom implementations can back `key()` with a hardware
/// wallet or KMS; the in-tree implementations hold the key in memory.
pub trait Signer: Send + Sync {
    /// The account this signer pays from.
    fn account_id(&self) -> AccountId;

    /// Get a key for signing.
    fn key(&self) -> SigningKey;
}

/// Implement `Signer` for `Arc<dyn Signer>` for convenience.
impl Signer for Arc<dyn Signer> {
    fn account_id(&self) -> AccountId {
        (**self).account_id()
    }

    fn key(&self) -> SigningKey {
        (**self).key()
    }
}

// ============================================================================
// SigningKey
// ============================================================================

/// A key that can sign messages.
///
/// Bundles a public key with the ability to sign using the
/// corresponding private key. For in-memory keys signing is instant;
/// for hardware wallets or KMS it may involve async operations, which
/// is why `sign` is async.
pub struct SigningKey {
    public_key: PublicKey,
    backend: Arc<dyn SigningBackend>,
}

impl SigningKey {
    /// Create a signing key from a secret key.
    pub fn new(secret_key: SecretKey) -> Self {
        let public_key = secret_key.public_key();
        Self {
            public_key,
            backend: Arc::new(SecretKeyBackend { secret_key }),
        }
    }

    /// Create a signing key from a public key and a custom backend
    /// function.
    pub fn from_fn<F>(public_key: PublicKey, sign_fn: F) -> Self
    where
        F: Fn(&[u8]) -> Result<Signature, SignerError> + Send + Sync + 'static,
    {
        Self {
            public_key,
            backend: Arc::new(FnBackend(sign_fn)),
        }
    }

    /// The public half of the key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Sign a message.
    pub async fn sign(&self, message: &[u8]) -> Result<Signature, SignerError> {
        self.backend.sign(message).await
    }
}

impl Clone for SigningKey {
    fn clone(&self) -> Self {
        Self {
            public_key: self.public_key.clone(),
            backend: self.backend.clone(),
        }
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("public_key", &self.public_key)
            .finish()
    }
}

// ============================================================================
// SigningBackend (internal)
// ============================================================================

/// Internal trait for signing backends, object-safe through boxed
/// futures.
trait SigningBackend: Send + Sync {
    fn sign(
        &self,
        message: &[u8],
    ) -> Pin<Box<dyn Future<Output = Result<Signature, SignerError>> + Send + '_>>;
}

/// In-memory signing backend using a secret key.
struct SecretKeyBackend {
    secret_key: SecretKey,
}

impl SigningBackend for SecretKeyBackend {
    fn sign(
        &self,
        message: &[u8],
    ) -> Pin<Box<dyn Future<Output = Result<Signature, SignerError>> + Send + '_>> {
        let sig = self.secret_key.sign(message);
        Box::pin(async move { Ok(sig) })
    }
}

/// Backend delegating to a caller-supplied closure.
struct FnBackend<F>(F);

impl<F> SigningBackend for FnBackend<F>
where
    F: Fn(&[u8]) -> Result<Signature, SignerError> + Send + Sync,
{
    fn sign(
        &self,
        message: &[u8],
    ) -> Pin<Box<dyn Future<Output = Result<Signature, SignerError>> + Send + '_>> {
        let result = (self.0)(message);
        Box::pin(async move { result })
    }
}

// ============================================================================
// InMemorySigner
// ============================================================================

/// A signer with a single key stored in memory.
///
/// The simplest signer implementation, suitable for scripts, bots, and
/// testing.
#[derive(Clone)]
pub struct InMemorySigner {
    account_id: AccountId,
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl InMemorySigner {
    /// Create a signer from an account ID string and a secret key
    /// string (`"ed25519:..."`).
    pub fn new(
        account_id: impl AsRef<str>,
        secret_key: impl AsRef<str>,
    ) -> Result<Self, crate::error::Error> {
        let account_id: AccountId = account_id.as_ref().parse()?;
        let secret_key: SecretKey = secret_key.as_ref().parse()?;
        Ok(Self::from_secret_key(account_id, secret_key))
    }

    /// Create a signer from a `SecretKey` directly.
    pub fn from_secret_key(account_id: AccountId, secret_key: SecretKey) -> Self {
        let public_key = secret_key.public_key();
        Self {
            account_id,
            secret_key,
            public_key,
        }
    }

    /// Create a signer from a BIP-39 seed phrase, using the default HD
    /// path.
    pub fn from_seed_phrase(
        account_id: impl AsRef<str>,
        phrase: impl AsRef<str>,
    ) -> Result<Self, crate::error::Error> {
        let account_id: AccountId = account_id.as_ref().parse()?;
        let secret_key = SecretKey::from_seed_phrase(phrase)?;
        Ok(Self::from_secret_key(account_id, secret_key))
    }

    /// The public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }
}

impl std::fmt::Debug for InMemorySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySigner")
            .field("account_id", &self.account_id)
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl Signer for InMemorySigner {
    fn account_id(&self) -> AccountId {
        self.account_id
    }

    fn key(&self) -> SigningKey {
        SigningKey::new(self.secret_key.clone())
    }
}

// ============================================================================
// EnvSigner
// ============================================================================

/// A signer that loads credentials from environment variables.
///
/// By default, reads from:
/// - `LEDGER_ACCOUNT_ID` - The account ID
/// - `LEDGER_SECRET_KEY` - The secret key
#[derive(Clone)]
pub struct EnvSigner {
    inner: InMemorySigner,
}

impl EnvSigner {
    /// Load from `LEDGER_ACCOUNT_ID` and `LEDGER_SECRET_KEY`.
    pub fn new() -> Result<Self, crate::error::Error> {
        Self::from_env_vars("LEDGER_ACCOUNT_ID", "LEDGER_SECRET_KEY")
    }

    /// Load from custom environment variable names.
    pub fn from_env_vars(account_var: &str, key_var: &str) -> Result<Self, crate::error::Error> {
        let account_id = std::env::var(account_var).map_err(|_| {
            crate::error::Error::Config(format!("Environment variable {} not set", account_var))
        })?;

        let secret_key = std::env::var(key_var).map_err(|_| {
            crate::error::Error::Config(format!("Environment variable {} not set", key_var))
        })?;

        let inner = InMemorySigner::new(&account_id, &secret_key)?;
        Ok(Self { inner })
    }

    /// The public key.
    pub fn public_key(&self) -> &PublicKey {
        self.inner.public_key()
    }
}

impl std::fmt::Debug for EnvSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSigner")
            .field("account_id", &self.inner.account_id)
            .field("public_key", &self.inner.public_key)
            .finish()
    }
}

impl Signer for EnvSigner {
    fn account_id(&self) -> AccountId {
        self.inner.account_id()
    }

    fn key(&self) -> SigningKey {
        self.inner.key()
    }
}

// ============================================================================
// FileSigner
// ============================================================================

/// A signer that loads its key from
/// `~/.ledger-credentials/{network}/{account}.json`.
#[cfg(feature = "file-signer")]
#[derive(Clone)]
pub struct FileSigner {
    inner: InMemorySigner,
}

/// Credential file format.
#[cfg(feature = "file-signer")]
#[derive(serde::Deserialize)]
struct CredentialFile {
    #[serde(alias = "private_key")]
    secret_key: String,
}

#[cfg(feature = "file-signer")]
impl FileSigner {
    /// Load credentials from the standard credentials directory.
    pub fn new(
        network: impl AsRef<str>,
        account_id: impl AsRef<str>,
    ) -> Result<Self, crate::error::Error> {
        let home = dirs::home_dir().ok_or_else(|| {
            crate::error::Error::Config("Could not determine home directory".to_string())
        })?;
        let path = home
            .join(".ledger-credentials")
            .join(network.as_ref())
            .join(format!("{}.json", account_id.as_ref()));

        Self::from_file(&path, account_id)
    }

    /// Load credentials from a specific file path.
    pub fn from_file(
        path: impl AsRef<std::path::Path>,
        account_id: impl AsRef<str>,
    ) -> Result<Self, crate::error::Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::error::Error::Config(format!(
                "Failed to read credentials file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let cred: CredentialFile = serde_json::from_str(&content).map_err(|e| {
            crate::error::Error::Config(format!(
                "Failed to parse credentials file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let inner = InMemorySigner::new(account_id, &cred.secret_key)?;
        Ok(Self { inner })
    }

    /// The public key.
    pub fn public_key(&self) -> &PublicKey {
        self.inner.public_key()
    }
}

#[cfg(feature = "file-signer")]
impl std::fmt::Debug for FileSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSigner")
            .field("account_id", &self.inner.account_id)
            .field("public_key", &self.inner.public_key)
            .finish()
    }
}

#[cfg(feature = "file-signer")]
impl Signer for FileSigner {
    fn account_id(&self) -> AccountId {
        self.inner.account_id()
    }

    fn key(&self) -> SigningKey {
        self.inner.key()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_signer() {
        let secret = SecretKey::generate();
        let signer = InMemorySigner::from_secret_key(AccountId::new(0, 1001), secret);

        assert_eq!(signer.account_id(), AccountId::new(0, 1001));

        let key = signer.key();
        let message = b"test message";
        let signature = key.sign(message).await.unwrap();

        assert_eq!(key.public_key(), signer.public_key());
        assert!(signer.public_key().verify(message, &signature));
    }

    #[tokio::test]
    async fn test_signing_key_from_fn() {
        let secret = SecretKey::generate();
        let public = secret.public_key();
        let key = SigningKey::from_fn(public.clone(), move |msg| Ok(secret.sign(msg)));

        let signature = key.sign(b"payload").await.unwrap();
        assert!(public.verify(b"payload", &signature));
    }

    #[test]
    fn test_in_memory_signer_from_strings() {
        let secret = SecretKey::generate();
        let signer = InMemorySigner::new("0.1001", secret.to_string()).unwrap();
        assert_eq!(signer.public_key(), &secret.public_key());
    }

    #[test]
    fn test_in_memory_signer_invalid_key() {
        assert!(InMemorySigner::new("0.1001", "not-a-key").is_err());
    }

    #[test]
    fn test_env_signer_missing_vars() {
        let result = EnvSigner::from_env_vars("NONEXISTENT_VAR_1", "NONEXISTENT_VAR_2");
        assert!(result.is_err());
    }

    #[test]
    fn test_in_memory_signer_debug_hides_secret() {
        let secret = SecretKey::generate();
        let encoded = bs58::encode(secret.as_bytes()).into_string();
        let signer = InMemorySigner::from_secret_key(AccountId::new(0, 1001), secret);

        let debug_str = format!("{:?}", signer);
        assert!(debug_str.contains("0.1001"));
        assert!(debug_str.contains("public_key"));
        assert!(!debug_str.contains(&encoded));
    }

    #[cfg(feature = "file-signer")]
    #[test]
    fn test_file_signer_from_file() {
        let secret = SecretKey::generate();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.1001.json");
        std::fs::write(
            &path,
            serde_json::json!({ "secret_key": secret.to_string() }).to_string(),
        )
        .unwrap();

        let signer = FileSigner::from_file(&path, "0.1001").unwrap();
        assert_eq!(signer.account_id(), AccountId::new(0, 1001));
        assert_eq!(signer.public_key(), &secret.public_key());
    }

    #[cfg(feature = "file-signer")]
    #[test]
    fn test_file_signer_accepts_private_key_alias() {
        let secret = SecretKey::generate();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.1001.json");
        std::fs::write(
            &path,
            serde_json::json!({ "private_key": secret.to_string() }).to_string(),
        )
        .unwrap();

        let signer = FileSigner::from_file(&path, "0.1001").unwrap();
        assert_eq!(signer.public_key(), &secret.public_key());
    }

    #[cfg(feature = "file-signer")]
    #[test]
    fn test_file_signer_missing_file() {
        let result = FileSigner::from_file("/definitely/not/here.json", "0.1001");
        assert!(result.is_err());
    }
}

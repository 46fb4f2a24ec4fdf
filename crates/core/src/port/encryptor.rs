// Encryptor Port (optional end-to-end payload encryption)

use async_trait::async_trait;
use thiserror::Error;

/// Encryption errors
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encrypt failed: {0}")]
    Encrypt(String),

    #[error("decrypt failed: {0}")]
    Decrypt(String),

    #[error("decrypt failed with all configured secrets")]
    SecretsExhausted,
}

/// Payload encryption interface. Applied to the serialized payload in
/// both directions; the algorithm is opaque to the transport.
#[async_trait]
pub trait Encryptor: Send + Sync {
    async fn encrypt(&self, plaintext: String) -> Result<String, CryptoError>;
    async fn decrypt(&self, ciphertext: String) -> Result<String, CryptoError>;
}

/// Pass-through (default when no secret is configured).
pub struct NoopEncryptor;

#[async_trait]
impl Encryptor for NoopEncryptor {
    async fn encrypt(&self, plaintext: String) -> Result<String, CryptoError> {
        Ok(plaintext)
    }

    async fn decrypt(&self, ciphertext: String) -> Result<String, CryptoError> {
        Ok(ciphertext)
    }
}

/// Single-secret algorithm seam behind [`Keyring`]. Implementations
/// must fail `open` for ciphertext sealed under a different secret.
pub trait Cipher: Send + Sync {
    fn seal(&self, secret: &str, plaintext: &str) -> Result<String, CryptoError>;
    fn open(&self, secret: &str, ciphertext: &str) -> Result<String, CryptoError>;
}

impl<T: Cipher + ?Sized> Cipher for std::sync::Arc<T> {
    fn seal(&self, secret: &str, plaintext: &str) -> Result<String, CryptoError> {
        (**self).seal(secret, plaintext)
    }

    fn open(&self, secret: &str, ciphertext: &str) -> Result<String, CryptoError> {
        (**self).open(secret, ciphertext)
    }
}

/// Secret-rotation wrapper.
///
/// Encrypts under the current secret. Decrypts by trying the current
/// secret first, then each retired secret in declaration order,
/// succeeding on the first that opens. The try order is what makes
/// zero-downtime secret rotation safe: jobs enqueued under a retired
/// secret may still be in flight after the current secret changes.
pub struct Keyring<C> {
    cipher: C,
    secret: String,
    old_secrets: Vec<String>,
}

impl<C: Cipher> Keyring<C> {
    pub fn new(cipher: C, secret: impl Into<String>, old_secrets: Vec<String>) -> Self {
        Self {
            cipher,
            secret: secret.into(),
            old_secrets,
        }
    }
}

#[async_trait]
impl<C: Cipher> Encryptor for Keyring<C> {
    async fn encrypt(&self, plaintext: String) -> Result<String, CryptoError> {
        self.cipher.seal(&self.secret, &plaintext)
    }

    async fn decrypt(&self, ciphertext: String) -> Result<String, CryptoError> {
        for secret in std::iter::once(&self.secret).chain(self.old_secrets.iter()) {
            if let Ok(plaintext) = self.cipher.open(secret, &ciphertext) {
                return Ok(plaintext);
            }
        }
        Err(CryptoError::SecretsExhausted)
    }
}

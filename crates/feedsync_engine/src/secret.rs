//! Feeder credentials.
//!
//! The feeder password may be kept encrypted at rest. It is decrypted
//! only when the client authenticates and lives in a [`SecretString`]
//! that is zeroized on drop.
//!
//! ## Ciphertext Format
//!
//! `nonce (12 bytes) || ciphertext || tag (16 bytes)`, AES-256-GCM, with
//! the key derived from an application secret via HKDF-SHA256.

use crate::error::{SyncError, SyncResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

const KEY_SIZE: usize = 32;
const KEY_INFO: &[u8] = b"feedsync-credential-key-v1";

/// A string that is wiped from memory when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    /// Wraps a secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the secret.
    ///
    /// Be careful with this method - don't log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

/// Everything needed to reach and authenticate against the feeder.
#[derive(Debug, Clone)]
pub struct FeederCredentials {
    /// Endpoint URL.
    pub url: String,
    /// Username.
    pub username: String,
    /// Plaintext password.
    pub password: SecretString,
}

/// Supplies feeder credentials.
///
/// Called when the client needs to authenticate, so implementations may
/// read fresh values from their backing configuration.
pub trait CredentialProvider: Send + Sync {
    /// Returns the current credentials.
    fn credentials(&self) -> SyncResult<FeederCredentials>;
}

/// Credentials held in memory as plaintext.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    credentials: FeederCredentials,
}

impl StaticCredentials {
    /// Creates a provider.
    pub fn new(url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: FeederCredentials {
                url: url.into(),
                username: username.into(),
                password: SecretString::new(password),
            },
        }
    }
}

impl CredentialProvider for StaticCredentials {
    fn credentials(&self) -> SyncResult<FeederCredentials> {
        Ok(self.credentials.clone())
    }
}

/// Encrypts and decrypts stored passwords with AES-256-GCM.
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    /// Derives the cipher key from an application secret and salt.
    pub fn from_secret(secret: &[u8], salt: &[u8]) -> SyncResult<Self> {
        use hkdf::Hkdf;
        use sha2::Sha256;

        let hk = Hkdf::<Sha256>::new(Some(salt), secret);
        let mut key = [0u8; KEY_SIZE];
        hk.expand(KEY_INFO, &mut key)
            .map_err(|_| SyncError::Credentials("key derivation failed".into()))?;

        let cipher = Aes256Gcm::new(GenericArray::from_slice(&key));
        key.zeroize();
        Ok(Self { cipher })
    }

    /// Encrypts a password.
    pub fn encrypt(&self, plaintext: &str) -> SyncResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| SyncError::Credentials("encryption failed".into()))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend(ciphertext);
        Ok(result)
    }

    /// Decrypts a password produced by [`CredentialCipher::encrypt`].
    pub fn decrypt(&self, ciphertext: &[u8]) -> SyncResult<SecretString> {
        if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
            return Err(SyncError::Credentials("ciphertext too short".into()));
        }

        let nonce = Nonce::from_slice(&ciphertext[..NONCE_SIZE]);
        let mut plaintext = self
            .cipher
            .decrypt(nonce, &ciphertext[NONCE_SIZE..])
            .map_err(|_| SyncError::Credentials("password decryption failed".into()))?;

        let secret = String::from_utf8(plaintext.clone())
            .map(SecretString)
            .map_err(|_| SyncError::Credentials("password is not valid UTF-8".into()));
        plaintext.zeroize();
        secret
    }
}

/// Credentials whose password is stored encrypted.
pub struct EncryptedCredentials {
    url: String,
    username: String,
    password: Vec<u8>,
    cipher: CredentialCipher,
}

impl EncryptedCredentials {
    /// Creates a provider from an encrypted password.
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        encrypted_password: Vec<u8>,
        cipher: CredentialCipher,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: encrypted_password,
            cipher,
        }
    }
}

impl CredentialProvider for EncryptedCredentials {
    fn credentials(&self) -> SyncResult<FeederCredentials> {
        Ok(FeederCredentials {
            url: self.url.clone(),
            username: self.username.clone(),
            password: self.cipher.decrypt(&self.password)?,
        })
    }
}

//! Fernet authenticated encryption, the scheme the user table is sealed with.
//!
//! Token verification happens before decryption, so a wrong key and a tampered
//! token fail the same way and never yield plaintext.

use std::fmt;
use std::time::Duration;

use fernet::Fernet;

use crate::error::CryptoError;

pub struct FernetKey {
    cipher: Fernet,
    encoded: String,
}

impl fmt::Debug for FernetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FernetKey(..)")
    }
}

impl FernetKey {
    /// Parse a 32-byte key given as url-safe base64.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let encoded = encoded.trim();
        let cipher = Fernet::new(encoded).ok_or(CryptoError::InvalidKey)?;
        Ok(Self {
            cipher,
            encoded: encoded.to_string(),
        })
    }

    pub fn generate() -> Self {
        let encoded = Fernet::generate_key();
        Self::from_base64(&encoded)
            .unwrap_or_else(|_| unreachable!("generated keys are always valid"))
    }

    pub fn to_base64(&self) -> String {
        self.encoded.clone()
    }

    /// Encrypt `data` into a url-safe base64 token stamped with the current time.
    pub fn encrypt(&self, data: &[u8]) -> String {
        self.cipher.encrypt(data)
    }

    /// Verify and decrypt a token. Surrounding whitespace is ignored.
    pub fn decrypt(&self, token: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let token = token_str(token)?;
        self.cipher
            .decrypt(token)
            .map_err(|_| CryptoError::InvalidToken)
    }

    /// As [`decrypt`](Self::decrypt), also rejecting tokens older than `ttl`
    /// or stamped too far in the future.
    pub fn decrypt_with_ttl(&self, token: &[u8], ttl: Duration) -> Result<Vec<u8>, CryptoError> {
        let token = token_str(token)?;
        match self.cipher.decrypt_with_ttl(token, ttl.as_secs()) {
            Ok(plaintext) => Ok(plaintext),
            // the library reports every failure alike; an authentic token that
            // only fails the age check is expired
            Err(_) if self.cipher.decrypt(token).is_ok() => Err(CryptoError::Expired),
            Err(_) => Err(CryptoError::InvalidToken),
        }
    }
}

fn token_str(token: &[u8]) -> Result<&str, CryptoError> {
    std::str::from_utf8(token)
        .map(str::trim)
        .map_err(|_| CryptoError::InvalidToken)
}

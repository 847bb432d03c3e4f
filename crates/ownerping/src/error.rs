use std::path::PathBuf;

use thiserror::Error;

/// Failures while resolving the code owner from the ownership file.
#[derive(Debug, Error)]
pub enum OwnerError {
    #[error("reading ownership file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ownership file has no `*` wildcard entry")]
    MissingWildcard,

    #[error("wildcard entry has no `@` owner handle")]
    MissingHandle,

    #[error("wildcard entry names an empty owner handle")]
    EmptyHandle,
}

/// Fernet key and token failures.
///
/// Verification failures are deliberately collapsed into one variant so a
/// wrong key and a tampered token look identical to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("encryption key must be 32 bytes of url-safe base64")]
    InvalidKey,

    #[error("token failed verification")]
    InvalidToken,

    #[error("token has expired")]
    Expired,
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("malformed user table: {0}")]
    Malformed(#[from] csv::Error),

    #[error("user table has no `{0}` column")]
    MissingColumn(&'static str),

    #[error("owner `{0}` is not present in the user table")]
    OwnerNotFound(String),

    #[error("user table row for `{handle}` (line {line}) has no wso2-id")]
    IncompleteRow { handle: String, line: u64 },
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("reading {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("writing {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decrypting {path}")]
    Decrypt {
        path: PathBuf,
        #[source]
        source: CryptoError,
    },

    #[error(transparent)]
    Table(#[from] TableError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("environment variable {name} does not hold a valid key")]
    InvalidKey {
        name: &'static str,
        #[source]
        source: CryptoError,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("building http client")]
    Client(#[source] reqwest::Error),

    #[error("webhook request failed after {attempts} attempt(s)")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("encoding notification body")]
    Encode(#[from] serde_json::Error),
}

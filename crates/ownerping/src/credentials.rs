use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{Paths, TableSettings};
use crate::error::CredentialError;
use crate::fernet::FernetKey;
use crate::table::UserMappingTable;

/// The encrypted user table on disk and where its plaintext copy goes.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    encrypted: PathBuf,
    decrypted: PathBuf,
    keep_decrypted: bool,
    max_age: Option<Duration>,
}

impl CredentialStore {
    pub fn new(paths: &Paths, table: &TableSettings) -> Self {
        Self {
            encrypted: paths.encrypted_table.clone(),
            decrypted: paths.decrypted_table.clone(),
            keep_decrypted: paths.keep_decrypted,
            max_age: table.max_token_age(),
        }
    }

    pub fn encrypted_path(&self) -> &Path {
        &self.encrypted
    }

    /// Decrypt the table, write the plaintext copy, and parse it.
    ///
    /// Nothing is written when decryption fails. The plaintext copy is removed
    /// before returning, on success and on parse failure, unless
    /// `keep_decrypted` is set.
    pub fn load(&self, key: &FernetKey) -> Result<UserMappingTable, CredentialError> {
        let token = fs::read(&self.encrypted).map_err(|source| CredentialError::Read {
            path: self.encrypted.clone(),
            source,
        })?;

        let decrypted = match self.max_age {
            Some(ttl) => key.decrypt_with_ttl(&token, ttl),
            None => key.decrypt(&token),
        };
        let plaintext = decrypted.map_err(|source| CredentialError::Decrypt {
            path: self.encrypted.clone(),
            source,
        })?;
        tracing::debug!(bytes = plaintext.len(), "decrypted user table");

        let _artifact = PlaintextArtifact::write(&self.decrypted, &plaintext, self.keep_decrypted)?;
        let table = UserMappingTable::from_csv(&plaintext)?;
        tracing::info!(rows = table.len(), "loaded user table");
        Ok(table)
    }

    /// Encrypt a plaintext table into the encrypted path. Returns the row count.
    pub fn seal(&self, key: &FernetKey, plaintext_path: &Path) -> Result<usize, CredentialError> {
        let plaintext = fs::read(plaintext_path).map_err(|source| CredentialError::Read {
            path: plaintext_path.to_path_buf(),
            source,
        })?;
        // refuse to seal something `load` could not read back
        let rows = UserMappingTable::from_csv(&plaintext)?.len();

        let token = key.encrypt(&plaintext);
        fs::write(&self.encrypted, token).map_err(|source| CredentialError::Write {
            path: self.encrypted.clone(),
            source,
        })?;
        tracing::info!(rows, path = %self.encrypted.display(), "sealed user table");
        Ok(rows)
    }
}

/// Plaintext copy of the table, removed on drop unless kept.
struct PlaintextArtifact {
    path: PathBuf,
    keep: bool,
}

impl PlaintextArtifact {
    fn write(path: &Path, plaintext: &[u8], keep: bool) -> Result<Self, CredentialError> {
        let artifact = Self {
            path: path.to_path_buf(),
            keep,
        };
        let write_err = |source| CredentialError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path).map_err(write_err)?;
        // `mode` only applies to new files; a leftover copy is tightened before any byte lands
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(write_err)?;
        }
        file.write_all(plaintext).map_err(write_err)?;
        Ok(artifact)
    }
}

impl Drop for PlaintextArtifact {
    fn drop(&mut self) {
        if self.keep {
            tracing::warn!(path = %self.path.display(), "keeping plaintext user table on disk");
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed plaintext user table"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "failed to remove plaintext user table"
            ),
        }
    }
}

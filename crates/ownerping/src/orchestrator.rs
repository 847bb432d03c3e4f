use anyhow::{Context, Result};

use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::error::NotifyError;
use crate::notifier::{compose_message, webhook_url, Delivery, NotificationMessage, Notifier};
use crate::owner::resolve_owner;

#[derive(Debug)]
pub enum Outcome {
    /// The webhook answered; the status decides success.
    Delivered(Delivery),
    /// No response after every attempt.
    Unreachable(NotifyError),
    DryRun {
        owner: String,
        internal_id: String,
        message: NotificationMessage,
    },
}

/// Resolve the code owner, map them to a chat user and post the failure notice.
pub async fn run_notify(config: &Config, dry_run: bool) -> Result<Outcome> {
    let settings = &config.settings;

    let owner = resolve_owner(&settings.paths.codeowners).context("Resolving code owner")?;

    let store = CredentialStore::new(&settings.paths, &settings.table);
    let table = store
        .load(&config.secrets.encryption_key)
        .context("Loading user table")?;
    let internal_id = table.lookup(&owner)?.to_string();
    tracing::info!(%owner, "resolved chat recipient");

    let message = compose_message(&settings.message, &internal_id);
    if dry_run {
        return Ok(Outcome::DryRun {
            owner,
            internal_id,
            message,
        });
    }

    let url = webhook_url(&settings.webhook.base_url, &config.secrets.chat);
    let notifier = Notifier::new(url, &settings.webhook)?;
    match notifier.send(&message).await {
        Ok(delivery) => Ok(Outcome::Delivered(delivery)),
        Err(err @ NotifyError::Transport { .. }) => Ok(Outcome::Unreachable(err)),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChatCredentials, Secrets, Settings};
    use crate::error::TableError;
    use crate::fernet::FernetKey;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir, codeowners: &str, table: &str) -> Config {
        let key = FernetKey::generate();
        let mut settings = Settings::default();
        settings.paths.codeowners = dir.path().join("CODEOWNERS");
        settings.paths.encrypted_table = dir.path().join("enc.csv");
        settings.paths.decrypted_table = dir.path().join("dec.csv");

        fs::write(&settings.paths.codeowners, codeowners).unwrap();
        fs::write(&settings.paths.encrypted_table, key.encrypt(table.as_bytes())).unwrap();

        Config {
            settings,
            secrets: Secrets {
                encryption_key: key,
                chat: ChatCredentials {
                    space_id: "space".to_string(),
                    key: "key".to_string(),
                    token: "token".to_string(),
                },
            },
        }
    }

    #[tokio::test]
    async fn dry_run_composes_without_sending() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, "* @alice\n", "gh-username,wso2-id\nalice,U123\n");

        let outcome = run_notify(&config, true).await.unwrap();
        assert_matches!(outcome, Outcome::DryRun { owner, internal_id, message } => {
            assert_eq!(owner, "alice");
            assert_eq!(internal_id, "U123");
            assert!(message.text.ends_with("<users/U123>"));
        });
        assert!(!dir.path().join("dec.csv").exists());
    }

    #[tokio::test]
    async fn unknown_owner_is_named_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, "* @carol\n", "gh-username,wso2-id\nalice,U123\n");

        let err = run_notify(&config, true).await.unwrap_err();
        assert_matches!(
            err.downcast_ref::<TableError>(),
            Some(TableError::OwnerNotFound(h)) if h == "carol"
        );
    }

    #[tokio::test]
    async fn malformed_codeowners_stops_before_decryption() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(&dir, "no owners here\n", "gh-username,wso2-id\nalice,U123\n");
        config.settings.paths.keep_decrypted = true;

        assert!(run_notify(&config, true).await.is_err());
        assert!(!dir.path().join("dec.csv").exists());
    }
}

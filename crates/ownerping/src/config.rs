use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::fernet::FernetKey;

const DEFAULT_CONFIG_NAME: &str = "ownerping.toml";

pub const ENV_ENCRYPTION_KEY: &str = "ENV_USER_ENCRYPTION_KEY";
pub const ENV_CHAT_ID: &str = "ENV_NOTIFICATIONS_CHAT_ID";
pub const ENV_CHAT_KEY: &str = "ENV_NOTIFICATIONS_CHAT_KEY";
pub const ENV_CHAT_TOKEN: &str = "ENV_NOTIFICATIONS_CHAT_TOKEN";

const MAX_RETRIES: u32 = 5;

/// Everything a notification run needs, assembled once at startup.
#[derive(Debug)]
pub struct Config {
    pub settings: Settings,
    pub secrets: Secrets,
}

impl Config {
    pub fn load(path_override: Option<PathBuf>) -> Result<Self> {
        let settings = Settings::load(path_override)?;
        let secrets = Secrets::from_env()?;
        Ok(Self { settings, secrets })
    }
}

/// Non-secret settings, read from `ownerping.toml` when one exists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub paths: Paths,
    pub message: MessageTemplate,
    pub webhook: WebhookSettings,
    pub table: TableSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Paths {
    pub codeowners: PathBuf,
    pub encrypted_table: PathBuf,
    /// Plaintext copy of the table; removed after lookup unless `keep_decrypted`.
    pub decrypted_table: PathBuf,
    pub keep_decrypted: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MessageTemplate {
    pub product: String,
    pub build_page_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebhookSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Extra attempts after a transport error or 5xx response.
    pub retries: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableSettings {
    /// Reject encrypted tables older than this many seconds.
    pub max_token_age_secs: Option<u64>,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            codeowners: PathBuf::from("./.github/CODEOWNERS"),
            encrypted_table: PathBuf::from("github_users_encrypted.csv"),
            decrypted_table: PathBuf::from("github_users_decrypted.csv"),
            keep_decrypted: false,
        }
    }
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self {
            product: "module-ballerinax-mongodb".to_string(),
            build_page_url: "https://github.com/ballerina-platform/module-ballerinax-mongodb/actions?query=workflow%3A%22Daily+build%22".to_string(),
        }
    }
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            base_url: "https://chat.googleapis.com/v1/spaces/".to_string(),
            timeout_secs: 30,
            retries: 1,
            retry_delay_ms: 500,
        }
    }
}

impl WebhookSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl TableSettings {
    pub fn max_token_age(&self) -> Option<Duration> {
        self.max_token_age_secs.map(Duration::from_secs)
    }
}

impl Settings {
    /// Load from an explicit path, or search upward from the current dir.
    /// Without any config file the built-in defaults apply.
    pub fn load(path_override: Option<PathBuf>) -> Result<Self> {
        let path = match path_override {
            Some(p) => p,
            None => match find_upwards(DEFAULT_CONFIG_NAME) {
                Some(p) => p,
                None => {
                    tracing::debug!("no {DEFAULT_CONFIG_NAME} found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Reading config file {}", path.display()))?;
        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Parsing TOML config {}", path.display()))?;
        settings.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "webhook.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.webhook.retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "webhook.retries must be at most {MAX_RETRIES}"
            )));
        }
        let base = &self.webhook.base_url;
        if !(base.starts_with("https://") || base.starts_with("http://")) {
            return Err(ConfigError::Invalid(format!(
                "webhook.base_url must be an http(s) url, got `{base}`"
            )));
        }
        Ok(())
    }
}

/// Values that only ever come from the environment.
pub struct Secrets {
    pub encryption_key: FernetKey,
    pub chat: ChatCredentials,
}

pub struct ChatCredentials {
    pub space_id: String,
    pub key: String,
    pub token: String,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("encryption_key", &self.encryption_key)
            .field("chat", &self.chat)
            .finish()
    }
}

impl fmt::Debug for ChatCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCredentials")
            .field("space_id", &self.space_id)
            .field("key", &"<redacted>")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Secrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let encryption_key = encryption_key_from(&lookup)?;
        let chat = ChatCredentials {
            space_id: required(&lookup, ENV_CHAT_ID)?,
            key: required(&lookup, ENV_CHAT_KEY)?,
            token: required(&lookup, ENV_CHAT_TOKEN)?,
        };
        Ok(Self {
            encryption_key,
            chat,
        })
    }
}

/// Only the table key; used by commands that never talk to the webhook.
pub fn encryption_key_from_env() -> Result<FernetKey, ConfigError> {
    encryption_key_from(&|name: &str| std::env::var(name).ok())
}

fn encryption_key_from<F>(lookup: &F) -> Result<FernetKey, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = required(lookup, ENV_ENCRYPTION_KEY)?;
    FernetKey::from_base64(&raw).map_err(|source| ConfigError::InvalidKey {
        name: ENV_ENCRYPTION_KEY,
        source,
    })
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingEnv(name))
}

fn find_upwards(file_name: &str) -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        let candidate = dir.join(file_name);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

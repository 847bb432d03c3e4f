use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use crate::config::{ChatCredentials, MessageTemplate, WebhookSettings};
use crate::error::NotifyError;

const JSON_UTF8: &str = "application/json; charset=UTF-8";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationMessage {
    pub text: String,
}

/// Final response of a webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub status: u16,
    pub attempts: u32,
}

impl Delivery {
    /// Only a plain 200 counts; the chat API answers every accepted message with it.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

pub fn compose_message(template: &MessageTemplate, internal_id: &str) -> NotificationMessage {
    let text = format!(
        "*{}* daily build failure\n\
         Please visit <{}|the daily build page> for more information\n\
         <users/{}>",
        template.product, template.build_page_url, internal_id
    );
    NotificationMessage { text }
}

/// Credentials are inserted verbatim: the chat service hands out tokens that
/// are already percent-encoded.
pub fn webhook_url(base: &str, chat: &ChatCredentials) -> String {
    let sep = if base.ends_with('/') { "" } else { "/" };
    format!(
        "{base}{sep}{}/messages?key={}&token={}",
        chat.space_id, chat.key, chat.token
    )
}

pub struct Notifier {
    client: reqwest::Client,
    url: String,
    settings: WebhookSettings,
}

impl Notifier {
    pub fn new(url: String, settings: &WebhookSettings) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(NotifyError::Client)?;
        Ok(Self {
            client,
            url,
            settings: settings.clone(),
        })
    }

    /// POST the message. Transport errors and 5xx responses are retried up to
    /// `retries` times; every other status is returned as is.
    pub async fn send(&self, message: &NotificationMessage) -> Result<Delivery, NotifyError> {
        let body = serde_json::to_vec(message)?;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let can_retry = attempts <= self.settings.retries;
            let result = self
                .client
                .post(&self.url)
                .header(CONTENT_TYPE, JSON_UTF8)
                .body(body.clone())
                .send()
                .await;

            match result {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_server_error() && can_retry {
                        tracing::warn!(
                            status = status.as_u16(),
                            attempts,
                            "webhook returned server error, retrying"
                        );
                    } else {
                        tracing::debug!(status = status.as_u16(), attempts, "webhook responded");
                        return Ok(Delivery {
                            status: status.as_u16(),
                            attempts,
                        });
                    }
                }
                // the url carries the webhook key and token
                Err(err) => {
                    let err = err.without_url();
                    if can_retry {
                        // a timed-out attempt may already have been delivered; a
                        // duplicate notice is accepted over a missed one
                        tracing::warn!(error = %err, attempts, "webhook request failed, retrying");
                    } else {
                        return Err(NotifyError::Transport {
                            attempts,
                            source: err,
                        });
                    }
                }
            }

            tokio::time::sleep(self.settings.retry_delay()).await;
        }
    }
}

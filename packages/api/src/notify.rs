//! # Registration notices
//!
//! After a new account is committed, a [`Notifier`] is told about it so that
//! someone can approve it. Delivery is best effort: the caller logs a failure
//! and carries on, the account stays registered either way.
//!
//! | Notifier | Delivery |
//! |----------|----------|
//! | [`LogNotifier`] | A `tracing` event. |
//! | [`WebhookNotifier`] | JSON `POST` to a configured URL. |
//! | [`Notifiers`] | Whichever of the two the settings select. |

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use crate::models::AccountInfo;
use crate::settings::Notify;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("notification endpoint answered {0}")]
    Status(reqwest::StatusCode),
}

pub trait Notifier {
    fn account_registered(
        &self,
        account: &AccountInfo,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn account_registered(&self, account: &AccountInfo) -> Result<(), NotifyError> {
        tracing::info!(
            "New account {} ({}) is {:?}",
            account.login_key,
            account.display_name,
            account.status
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    event: &'static str,
    account: &'a AccountInfo,
}

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, NotifyError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            url: url.into(),
        })
    }
}

impl Notifier for WebhookNotifier {
    async fn account_registered(&self, account: &AccountInfo) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&Payload {
                event: "account_registered",
                account,
            })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum Notifiers {
    Log(LogNotifier),
    Webhook(WebhookNotifier),
}

impl Notifiers {
    /// A webhook when one is configured, log lines otherwise.
    pub fn from_settings(settings: &Notify) -> Result<Self, NotifyError> {
        let url = settings.webhook_url.trim();
        if url.is_empty() {
            return Ok(Notifiers::Log(LogNotifier));
        }
        Ok(Notifiers::Webhook(WebhookNotifier::new(
            url,
            settings.timeout(),
        )?))
    }
}

impl Notifier for Notifiers {
    async fn account_registered(&self, account: &AccountInfo) -> Result<(), NotifyError> {
        match self {
            Notifiers::Log(n) => n.account_registered(account).await,
            Notifiers::Webhook(n) => n.account_registered(account).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_url_selects_log_notifier() {
        let notifiers = Notifiers::from_settings(&Notify {
            webhook_url: "  ".into(),
            timeout_secs: 5,
        })
        .unwrap();
        assert!(matches!(notifiers, Notifiers::Log(_)));

        let notifiers = Notifiers::from_settings(&Notify {
            webhook_url: "http://127.0.0.1:9/hook".into(),
            timeout_secs: 5,
        })
        .unwrap();
        assert!(matches!(notifiers, Notifiers::Webhook(_)));
    }

    #[tokio::test]
    async fn test_unreachable_webhook_reports_error() {
        let notifier =
            WebhookNotifier::new("http://127.0.0.1:9/hook", Some(Duration::from_secs(2))).unwrap();
        let account = AccountInfo {
            login_key: "ana@escola.org".into(),
            display_name: "Ana".into(),
            role: crate::models::Role::User,
            status: crate::models::Status::Pending,
            unit: String::new(),
            created_at: chrono::Utc::now(),
        };
        assert!(notifier.account_registered(&account).await.is_err());
    }
}

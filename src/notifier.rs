use crate::errors::AppError;
use crate::models::SignupForm;
use chrono::Utc;
use serde_json::json;
use std::time::Duration;

/// Relays landing-page signups to a notification webhook.
///
/// Without a webhook URL signups are only logged.
#[derive(Clone)]
pub struct SignupNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl SignupNotifier {
    /// Creates a new `SignupNotifier`.
    ///
    /// # Arguments
    ///
    /// * `webhook_url` - Where signup events are posted, if anywhere.
    pub fn new(webhook_url: Option<String>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create notifier client: {}", e))
            })?;

        Ok(Self {
            client,
            webhook_url,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Sends one signup event.
    ///
    /// # Returns
    ///
    /// * `Result<(), AppError>` - Ok once the webhook accepted it (or nothing is configured).
    pub async fn notify(&self, form: &SignupForm) -> Result<(), AppError> {
        let Some(url) = self.webhook_url.as_deref() else {
            tracing::info!("📝 Signup received (no webhook configured): {}", form.email);
            return Ok(());
        };

        let body = json!({
            "event": "signup",
            "submittedAt": Utc::now().to_rfc3339(),
            "signup": form,
        });

        tracing::info!("Relaying signup for {} to webhook", form.email);
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Failed to relay signup: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Signup webhook returned {}: {}",
                status, error_text
            )));
        }

        tracing::info!("✓ Signup relayed for {}", form.email);
        Ok(())
    }
}

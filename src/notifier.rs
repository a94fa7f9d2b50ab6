use log::{error, info, warn};
use reqwest::{Client, StatusCode, header};

use crate::config::{MonitorTarget, NotificationConfig};
use crate::error::Error;

/// Result of a delivered request to the Messages API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// 2xx with a well-formed JSON body.
    Sent,
    /// The provider answered with a non-2xx status.
    Rejected(StatusCode),
}

/// Formats the SMS text for an alert on `target`.
#[must_use]
pub fn alert_message(target: &MonitorTarget) -> String {
    format!(
        "url-monitor: alert triggered for {}. URL: {}",
        target.description, target.url
    )
}

/// Sends SMS alerts through the Twilio Messages API.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: Client,
}

impl Notifier {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Best-effort delivery: every failure is logged and swallowed.
    pub async fn notify(&self, target: &MonitorTarget, message: &str, twilio: &NotificationConfig) {
        match self.send_sms(message, twilio).await {
            Ok(Delivery::Sent) => info!("SMS sent for {}: {message}", target.url),
            Ok(Delivery::Rejected(status)) => {
                warn!("SMS for {} rejected by provider: {status}", target.url);
            }
            Err(e) => error!("Failed to send SMS for {}: {e}", target.url),
        }
    }

    /// Posts one message to the account's Messages endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, or when a 2xx response does not
    /// carry a valid JSON body.
    pub async fn send_sms(
        &self,
        message: &str,
        twilio: &NotificationConfig,
    ) -> Result<Delivery, Error> {
        let endpoint = messages_endpoint(twilio);
        let form = [
            ("To", twilio.to_phone_number.as_str()),
            ("From", twilio.from_phone_number.as_str()),
            ("Body", message),
        ];

        let response = self
            .client
            .post(endpoint)
            .basic_auth(&twilio.account_sid, Some(&twilio.auth_token))
            .header(header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Ok(Delivery::Rejected(status));
        }

        // Only checks that the body is well-formed JSON
        response.json::<serde_json::Value>().await?;
        Ok(Delivery::Sent)
    }
}

fn messages_endpoint(twilio: &NotificationConfig) -> String {
    format!(
        "{}/2010-04-01/Accounts/{}/Messages.json",
        twilio.api_base_url.as_str().trim_end_matches('/'),
        twilio.account_sid
    )
}

use std::sync::{Arc, Mutex};
use std::time::Duration;

use jeanbrun::config::EmailConfig;
use jeanbrun::leads::{EmailError, EmailMessage, EmailSender};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::{debug, info};

const BREVO_ENDPOINT: &str = "https://api.brevo.com/v3/smtp/email";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Transactional sender backed by the Brevo v3 HTTP API. Runs on the
/// blocking dispatch thread, so the blocking client is fine here. Build it
/// off the async workers too.
#[derive(Debug, Clone)]
pub(crate) struct BrevoEmailSender {
    client: Client,
    api_key: String,
    sender_email: String,
    sender_name: String,
    endpoint: String,
}

impl BrevoEmailSender {
    pub(crate) fn new(api_key: String, config: &EmailConfig) -> Result<Self, EmailError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| EmailError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            api_key,
            sender_email: config.sender_email.clone(),
            sender_name: config.sender_name.clone(),
            endpoint: BREVO_ENDPOINT.to_string(),
        })
    }

    fn payload(&self, message: &EmailMessage) -> Value {
        let mut recipient = json!({ "email": message.to });
        if let Some(name) = message.to_name.as_deref() {
            recipient["name"] = json!(name);
        }

        json!({
            "sender": {
                "name": self.sender_name,
                "email": self.sender_email,
            },
            "to": [recipient],
            "subject": message.subject,
            "htmlContent": message.html_content,
            "textContent": message.text_content,
        })
    }
}

impl EmailSender for BrevoEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .header("Accept", "application/json")
            .json(&self.payload(message))
            .send()
            .map_err(|err| EmailError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(to = %message.to, "email accepted by brevo");
            return Ok(());
        }

        let body = response
            .text()
            .unwrap_or_else(|_| "(no body)".to_string());
        Err(EmailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Sender used when no provider key is configured: messages are logged and
/// dropped. Only an explicit outbox keeps copies.
#[derive(Debug, Default, Clone)]
pub(crate) struct LoggingEmailSender {
    outbox: Option<Arc<Mutex<Vec<EmailMessage>>>>,
}

impl LoggingEmailSender {
    /// Keeps every message for later inspection, for the demo and tests.
    pub(crate) fn with_outbox() -> Self {
        Self {
            outbox: Some(Arc::default()),
        }
    }

    pub(crate) fn sent(&self) -> Vec<EmailMessage> {
        match &self.outbox {
            Some(outbox) => outbox.lock().expect("outbox mutex poisoned").clone(),
            None => Vec::new(),
        }
    }
}

impl EmailSender for LoggingEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        info!(to = %message.to, subject = %message.subject, "email not sent (no provider configured)");
        if let Some(outbox) = &self.outbox {
            outbox
                .lock()
                .expect("outbox mutex poisoned")
                .push(message.clone());
        }
        Ok(())
    }
}

/// Sender picked at startup from the email configuration.
#[derive(Debug, Clone)]
pub(crate) enum OutboundEmail {
    Brevo(BrevoEmailSender),
    Logging(LoggingEmailSender),
}

impl OutboundEmail {
    pub(crate) fn from_config(config: &EmailConfig) -> Result<Self, EmailError> {
        match config.brevo_api_key.clone() {
            Some(api_key) => Ok(Self::Brevo(BrevoEmailSender::new(api_key, config)?)),
            None => Ok(Self::Logging(LoggingEmailSender::default())),
        }
    }

    pub(crate) fn provider(&self) -> &'static str {
        match self {
            Self::Brevo(_) => "brevo",
            Self::Logging(_) => "log",
        }
    }
}

impl EmailSender for OutboundEmail {
    fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        match self {
            Self::Brevo(sender) => sender.send(message),
            Self::Logging(sender) => sender.send(message),
        }
    }
}

//! Account emails: a welcome message on registration and a farewell on deletion.
//!
//! Delivery is best effort. `dispatch` hands the message to a background task
//! and returns immediately; a failed send is logged and never retried.

use async_trait::async_trait;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::models::User;

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

pub fn welcome_email(user: &User) -> Email {
    Email {
        to: user.email.clone(),
        subject: "Welcome to Task Manager App!".to_string(),
        text: format!(
            "Welcome {}. We hope you have a great experience with our service.",
            user.name
        ),
    }
}

pub fn farewell_email(user: &User) -> Email {
    Email {
        to: user.email.clone(),
        subject: "Feedback for the Task Manager application".to_string(),
        text: format!(
            "Hello {}. We hate to see you go. Please rate our services and share any \
             suggestions that could help us improve. Thank you.",
            user.name
        ),
    }
}

#[derive(Debug)]
pub enum MailError {
    Transport(reqwest::Error),
    Rejected { status: u16, body: String },
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MailError::Transport(err) => write!(f, "mail transport failed: {}", err),
            MailError::Rejected { status, body } => {
                write!(f, "mail provider rejected message ({}): {}", status, body)
            }
        }
    }
}

impl std::error::Error for MailError {}

impl From<reqwest::Error> for MailError {
    fn from(err: reqwest::Error) -> Self {
        MailError::Transport(err)
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Sends mail through the SendGrid v3 API.
pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl SendGridMailer {
    pub fn new(api_key: &str, from: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            from: from.to_string(),
        })
    }

    fn payload(&self, email: &Email) -> serde_json::Value {
        json!({
            "personalizations": [{ "to": [{ "email": email.to }] }],
            "from": { "email": self.from },
            "subject": email.subject,
            "content": [{ "type": "text/plain", "value": email.text }]
        })
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let response = self
            .client
            .post(SENDGRID_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&self.payload(email))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(MailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Writes messages to the log instead of sending them. Used when no provider key is set.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        log::info!("email to {} ({}): {}", email.to, email.subject, email.text);
        Ok(())
    }
}

/// Sends `email` in the background. Never fails the caller.
pub fn dispatch(mailer: Arc<dyn Mailer>, email: Email) {
    actix_web::rt::spawn(async move {
        match mailer.send(&email).await {
            Ok(()) => log::info!("sent \"{}\" to {}", email.subject, email.to),
            Err(err) => log::warn!("could not send \"{}\" to {}: {}", email.subject, email.to, err),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserInput;

    fn user() -> User {
        User::new(
            UserInput {
                name: "Margaret".into(),
                age: 33,
                email: "margaret@example.com".into(),
                password: "unused1".into(),
            },
            "hash".into(),
        )
    }

    #[test]
    fn test_messages_address_the_user() {
        let user = user();
        let welcome = welcome_email(&user);
        assert_eq!(welcome.to, "margaret@example.com");
        assert!(welcome.text.contains("Margaret"));

        let farewell = farewell_email(&user);
        assert_eq!(farewell.to, "margaret@example.com");
        assert!(farewell.subject.contains("Feedback"));
    }

    #[test]
    fn test_sendgrid_payload_shape() {
        let mailer = SendGridMailer::new("SG.key", "team@example.com", Duration::from_secs(1))
            .unwrap();
        let payload = mailer.payload(&welcome_email(&user()));
        assert_eq!(
            payload["personalizations"][0]["to"][0]["email"],
            "margaret@example.com"
        );
        assert_eq!(payload["from"]["email"], "team@example.com");
        assert_eq!(payload["content"][0]["type"], "text/plain");
    }
}

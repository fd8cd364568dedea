use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

pub const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Application,
    JobPosting,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationKind::Application => "application",
            NotificationKind::JobPosting => "job_posting",
        }
    }
}

/// Confirmation message request handed to a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub name: String,
    pub kind: NotificationKind,
    pub details: BTreeMap<String, String>,
}

/// Outbound confirmation hook (e-mail provider, queue, log).
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("mail client could not be built: {0}")]
    Client(String),
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("mail provider rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Subject and HTML body for each confirmation kind.
#[derive(Debug, Clone)]
pub struct EmailTemplates {
    site_url: String,
}

impl EmailTemplates {
    pub fn new(site_url: impl Into<String>) -> Self {
        let site_url: String = site_url.into();
        Self {
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn render(&self, notification: &Notification) -> RenderedEmail {
        let name = escape_html(&notification.name);
        match notification.kind {
            NotificationKind::Application => RenderedEmail {
                subject: "Application Submitted Successfully - Coreica".to_string(),
                html: format!(
                    concat!(
                        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">",
                        "<h1>Application Received!</h1>",
                        "<h2>Dear {name},</h2>",
                        "<p>Thank you for submitting your application through Coreica! ",
                        "We're excited about your interest in joining our network of talented engineering professionals.</p>",
                        "<h3>What happens next?</h3>",
                        "<ul>",
                        "<li>Our team will review your application within 2-3 business days</li>",
                        "<li>We'll match your profile with suitable opportunities</li>",
                        "<li>You'll receive updates about relevant job openings</li>",
                        "<li>Companies may reach out directly for interviews</li>",
                        "</ul>",
                        "<p><a href=\"{site}\">View Dashboard</a></p>",
                        "<p>Best regards,<br><strong>The Coreica Team</strong><br>",
                        "Bridging Core Engineering with Global Opportunities</p>",
                        "</div>"
                    ),
                    name = name,
                    site = escape_html(&self.site_url),
                ),
            },
            NotificationKind::JobPosting => {
                let detail = |key: &str| {
                    notification
                        .details
                        .get(key)
                        .filter(|value| !value.trim().is_empty())
                        .map(|value| escape_html(value))
                };
                let role = detail("role");
                let company = detail("company");
                RenderedEmail {
                    subject: "Job Posted Successfully - Coreica".to_string(),
                    html: format!(
                        concat!(
                            "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">",
                            "<h1>Job Posted Successfully!</h1>",
                            "<h2>Dear {name},</h2>",
                            "<p>Your job posting for <strong>{role_intro}</strong> at <strong>{company_intro}</strong> ",
                            "has been successfully published on Coreica!</p>",
                            "<h3>Job Details:</h3>",
                            "<ul>",
                            "<li><strong>Position:</strong> {role}</li>",
                            "<li><strong>Company:</strong> {company}</li>",
                            "<li><strong>Type:</strong> {job_type}</li>",
                            "<li><strong>Location:</strong> {location}</li>",
                            "</ul>",
                            "<h3>What's next?</h3>",
                            "<ul>",
                            "<li>Your posting is now live and visible to candidates</li>",
                            "<li>Qualified students can apply directly</li>",
                            "<li>You'll receive applications via email</li>",
                            "<li>Use your dashboard to manage applications</li>",
                            "</ul>",
                            "<p><a href=\"{site}/dashboard\">Manage Applications</a></p>",
                            "<p>Best regards,<br><strong>The Coreica Team</strong><br>",
                            "Connecting talent with opportunities</p>",
                            "</div>"
                        ),
                        name = name,
                        role_intro = role.clone().unwrap_or_else(|| "the position".to_string()),
                        company_intro =
                            company.clone().unwrap_or_else(|| "your company".to_string()),
                        role = role.unwrap_or_else(|| "N/A".to_string()),
                        company = company.unwrap_or_else(|| "N/A".to_string()),
                        job_type = detail("job_type").unwrap_or_else(|| "N/A".to_string()),
                        location = detail("location").unwrap_or_else(|| "N/A".to_string()),
                        site = escape_html(&self.site_url),
                    ),
                }
            }
        }
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Sends confirmations through the Resend transactional mail API.
#[derive(Debug, Clone)]
pub struct ResendDispatcher {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
    templates: EmailTemplates,
}

impl ResendDispatcher {
    pub fn new(
        api_key: impl Into<String>,
        from: impl Into<String>,
        templates: EmailTemplates,
        timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DispatchError::Client(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: RESEND_ENDPOINT.to_string(),
            api_key: api_key.into(),
            from: from.into(),
            templates,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl NotificationDispatcher for ResendDispatcher {
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError> {
        let email = self.templates.render(notification);
        let payload = json!({
            "from": self.from,
            "to": [notification.to],
            "subject": email.subject,
            "html": email.html,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| DispatchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(kind = notification.kind.label(), "confirmation email accepted by provider");
        Ok(())
    }
}

/// Dispatcher used when no mail provider is configured; records intent only.
#[derive(Debug, Clone)]
pub struct LogDispatcher {
    templates: EmailTemplates,
}

impl LogDispatcher {
    pub fn new(templates: EmailTemplates) -> Self {
        Self { templates }
    }
}

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError> {
        let email = self.templates.render(notification);
        info!(
            kind = notification.kind.label(),
            subject = %email.subject,
            "mail provider not configured; confirmation logged only"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_posting_notification() -> Notification {
        let mut details = BTreeMap::new();
        details.insert("role".to_string(), "R&D Intern".to_string());
        details.insert("company".to_string(), "Acme <Labs>".to_string());
        details.insert("job_type".to_string(), "internship".to_string());
        Notification {
            to: "hr@acme.test".to_string(),
            name: "Acme".to_string(),
            kind: NotificationKind::JobPosting,
            details,
        }
    }

    #[test]
    fn application_template_greets_recipient() {
        let templates = EmailTemplates::new("https://coreica.test/");
        let email = templates.render(&Notification {
            to: "asha@example.com".to_string(),
            name: "Asha Rao".to_string(),
            kind: NotificationKind::Application,
            details: BTreeMap::new(),
        });

        assert_eq!(email.subject, "Application Submitted Successfully - Coreica");
        assert!(email.html.contains("Dear Asha Rao,"));
        assert!(email.html.contains("href=\"https://coreica.test\""));
    }

    #[test]
    fn job_posting_template_escapes_and_fills_missing_details() {
        let templates = EmailTemplates::new("https://coreica.test");
        let email = templates.render(&job_posting_notification());

        assert_eq!(email.subject, "Job Posted Successfully - Coreica");
        assert!(email.html.contains("R&amp;D Intern"));
        assert!(email.html.contains("Acme &lt;Labs&gt;"));
        assert!(email.html.contains("<strong>Location:</strong> N/A"));
        assert!(email.html.contains("https://coreica.test/dashboard"));
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_transport_error() {
        let dispatcher = ResendDispatcher::new(
            "re_test",
            "Coreica <onboarding@resend.dev>",
            EmailTemplates::new("https://coreica.test"),
            Duration::from_millis(500),
        )
        .expect("client builds")
        .with_endpoint("http://127.0.0.1:9/emails");

        match dispatcher.send(&job_posting_notification()).await {
            Err(DispatchError::Transport(_)) => {}
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn log_dispatcher_always_succeeds() {
        let dispatcher = LogDispatcher::new(EmailTemplates::new("https://coreica.test"));
        dispatcher
            .send(&job_posting_notification())
            .await
            .expect("log dispatch succeeds");
    }
}

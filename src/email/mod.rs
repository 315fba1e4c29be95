//! Notification dispatch abstractions and template substitution.
//!
//! The orchestrators only build an [`EmailMessage`] and hand it to an
//! [`EmailSender`]; transport (SMTP, API, queue) is the sender's concern.
//! The default sender for local dev is [`LogEmailSender`], which logs and
//! returns `Ok(())`.

use anyhow::Result;
use tracing::info;

/// An alternative-format body attached to a message (for example HTML).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alternative {
    pub content_type: String,
    pub body: String,
}

/// A rendered, ready-to-send message. Ephemeral; never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub alternatives: Vec<Alternative>,
}

/// Message template for one token class. The class is considered enabled only
/// when a template is configured and marked enabled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    pub subject: String,
    pub text: String,
    pub alternatives: Vec<Alternative>,
    pub enabled: bool,
}

/// Email delivery abstraction.
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error.
    ///
    /// # Errors
    ///
    /// Implementations return an error when delivery fails; the caller treats
    /// it as terminal for the current operation.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the message instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            alternatives = message.alternatives.len(),
            "email send stub"
        );
        Ok(())
    }
}

/// Literal replace-all of `{placeholder}` markers.
///
/// Every occurrence of every placeholder is replaced; a missing value must be
/// passed as an empty string by the caller, never skipped.
#[must_use]
pub fn substitute(body: &str, values: &[(&str, &str)]) -> String {
    let mut rendered = body.to_string();
    for (placeholder, value) in values {
        rendered = rendered.replace(&format!("{{{placeholder}}}"), value);
    }
    rendered
}

/// Render a template into a message, substituting placeholders uniformly in
/// the text body and every alternative body.
#[must_use]
pub fn render(template: &Template, to: &str, values: &[(&str, &str)]) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: template.subject.clone(),
        text: substitute(&template.text, values),
        alternatives: template
            .alternatives
            .iter()
            .map(|alternative| Alternative {
                content_type: alternative.content_type.clone(),
                body: substitute(&alternative.body, values),
            })
            .collect(),
    }
}

/// Built-in confirm-email template used when no custom template is supplied.
#[must_use]
pub fn default_confirm_template() -> Template {
    Template {
        subject: "Confirm your account".to_string(),
        text: "Hello {firstName} {lastName},\n\n\
               Please confirm your account using the following token:\n\n\
               {token}\n\n\
               If you did not create this account, ignore this email.\n"
            .to_string(),
        alternatives: Vec::new(),
        enabled: true,
    }
}

/// Built-in reset-password template used when no custom template is supplied.
#[must_use]
pub fn default_reset_template() -> Template {
    Template {
        subject: "Password reset request".to_string(),
        text: "Hello {firstName} {lastName},\n\n\
               A password reset was requested for your account. Use the\n\
               following token to choose a new password:\n\n\
               {token}\n\n\
               If you did not request this reset, ignore this email.\n"
            .to_string(),
        alternatives: Vec::new(),
        enabled: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitute_replaces_every_occurrence() {
        let body = "{firstName} {lastName}: token={token}, again {token}";
        let rendered = substitute(
            body,
            &[
                ("firstName", "Alice"),
                ("lastName", "Smith"),
                ("token", "abc123"),
            ],
        );
        assert_eq!(rendered, "Alice Smith: token=abc123, again abc123");
    }

    #[test]
    fn absent_names_render_as_empty_not_placeholder() {
        let rendered = substitute(
            "Hello {firstName}{lastName}!",
            &[("firstName", ""), ("lastName", ""), ("token", "t")],
        );
        assert_eq!(rendered, "Hello !");
    }

    #[test]
    fn render_substitutes_text_and_alternatives() {
        let template = Template {
            subject: "Subject".to_string(),
            text: "text {token}".to_string(),
            alternatives: vec![Alternative {
                content_type: "text/html".to_string(),
                body: "<p>{token}</p>".to_string(),
            }],
            enabled: true,
        };
        let message = render(&template, "a@b.com", &[("token", "xyz")]);
        assert_eq!(message.to, "a@b.com");
        assert_eq!(message.text, "text xyz");
        assert_eq!(message.alternatives[0].body, "<p>xyz</p>");
    }

    #[test]
    fn default_templates_carry_the_placeholders() {
        for template in [default_confirm_template(), default_reset_template()] {
            assert!(template.enabled);
            assert!(template.text.contains("{firstName}"));
            assert!(template.text.contains("{lastName}"));
            assert!(template.text.contains("{token}"));
        }
    }

    #[test]
    fn log_sender_always_succeeds() {
        let message = render(&default_confirm_template(), "a@b.com", &[("token", "t")]);
        assert!(LogEmailSender.send(&message).is_ok());
    }
}

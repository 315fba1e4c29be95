//! Account subsystem configuration.
//!
//! Built once at startup and passed explicitly to the service; there is no
//! process-wide mutable state. Each token class (reset-password,
//! confirm-email) carries its own TTL, algorithm, key, and message template.
//! A class with no configuration is disabled; a configured class never falls
//! back to a default TTL.

use crate::email::Template;
use crate::token::Algorithm;
use chrono::Duration;

const DEFAULT_GRACE_PERIOD_MINUTES: i64 = 1440;

/// Configuration for one token class.
#[derive(Clone, Debug)]
pub struct TokenClass {
    ttl_minutes: i64,
    algorithm: Algorithm,
    key: Vec<u8>,
    template: Template,
}

impl TokenClass {
    #[must_use]
    pub fn new(ttl_minutes: i64, algorithm: Algorithm, key: Vec<u8>, template: Template) -> Self {
        Self {
            ttl_minutes,
            algorithm,
            key,
            template,
        }
    }

    #[must_use]
    pub fn with_template(mut self, template: Template) -> Self {
        self.template = template;
        self
    }

    #[must_use]
    pub fn ttl_minutes(&self) -> i64 {
        self.ttl_minutes
    }

    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    #[must_use]
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// A class is live only when its template is configured and enabled.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.template.enabled
    }
}

#[derive(Clone, Debug, Default)]
pub struct AccountConfig {
    grace_period_minutes: Option<i64>,
    reset_password: Option<TokenClass>,
    confirm_email: Option<TokenClass>,
}

impl AccountConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_grace_period_minutes(mut self, minutes: i64) -> Self {
        self.grace_period_minutes = Some(minutes);
        self
    }

    #[must_use]
    pub fn with_reset_password(mut self, class: TokenClass) -> Self {
        self.reset_password = Some(class);
        self
    }

    #[must_use]
    pub fn with_confirm_email(mut self, class: TokenClass) -> Self {
        self.confirm_email = Some(class);
        self
    }

    #[must_use]
    pub fn grace_period_minutes(&self) -> i64 {
        self.grace_period_minutes
            .unwrap_or(DEFAULT_GRACE_PERIOD_MINUTES)
    }

    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::minutes(self.grace_period_minutes())
    }

    #[must_use]
    pub fn reset_password_enabled(&self) -> bool {
        self.reset_password.as_ref().is_some_and(TokenClass::enabled)
    }

    #[must_use]
    pub fn confirm_email_enabled(&self) -> bool {
        self.confirm_email.as_ref().is_some_and(TokenClass::enabled)
    }

    /// Confirmation is required exactly when the confirm-email class is live.
    #[must_use]
    pub fn confirmation_required(&self) -> bool {
        self.confirm_email_enabled()
    }

    #[must_use]
    pub fn reset_password(&self) -> Option<&TokenClass> {
        self.reset_password.as_ref().filter(|class| class.enabled())
    }

    #[must_use]
    pub fn confirm_email(&self) -> Option<&TokenClass> {
        self.confirm_email.as_ref().filter(|class| class.enabled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::{default_confirm_template, default_reset_template};

    fn confirm_class() -> TokenClass {
        TokenClass::new(
            30,
            Algorithm::Aes256Gcm,
            vec![1u8; 32],
            default_confirm_template(),
        )
    }

    #[test]
    fn defaults_disable_both_classes() {
        let config = AccountConfig::new();
        assert_eq!(config.grace_period_minutes(), 1440);
        assert!(!config.reset_password_enabled());
        assert!(!config.confirm_email_enabled());
        assert!(!config.confirmation_required());
        assert!(config.reset_password().is_none());
        assert!(config.confirm_email().is_none());
    }

    #[test]
    fn builder_overrides() {
        let config = AccountConfig::new()
            .with_grace_period_minutes(60)
            .with_confirm_email(confirm_class())
            .with_reset_password(TokenClass::new(
                15,
                Algorithm::Aes128Gcm,
                vec![2u8; 16],
                default_reset_template(),
            ));

        assert_eq!(config.grace_period_minutes(), 60);
        assert_eq!(config.grace_period(), Duration::minutes(60));
        assert!(config.confirmation_required());
        assert!(config.reset_password_enabled());

        let reset = config.reset_password().unwrap();
        assert_eq!(reset.ttl_minutes(), 15);
        assert_eq!(reset.algorithm(), Algorithm::Aes128Gcm);
        assert_eq!(reset.key().len(), 16);
    }

    #[test]
    fn disabled_template_disables_the_class() {
        let mut template = default_confirm_template();
        template.enabled = false;
        let config = AccountConfig::new()
            .with_confirm_email(confirm_class().with_template(template));

        assert!(!config.confirm_email_enabled());
        assert!(!config.confirmation_required());
        assert!(config.confirm_email().is_none());
    }
}

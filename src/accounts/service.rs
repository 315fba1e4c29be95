//! Action orchestrators.
//!
//! Each operation is a strict sequence of collaborator calls: fail-fast, no
//! local retries, no compensating rollback. Register in particular can leave
//! a persisted account behind when the notification send fails; that state is
//! surfaced as a collaborator error.

use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::access::{ADMIN_ROLE, AccountView, Subject, Viewer, full_set, project, resource_key};
use crate::email::{EmailSender, render};
use crate::store::{AccountStore, CreateOutcome, CredentialStore, GrantStore};
use crate::token;

use super::config::{AccountConfig, TokenClass};
use super::error::AccountError;
use super::models::Account;

/// Lightweight email sanity check applied before anything is persisted.
fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// New-account input, already deserialized by the caller.
#[derive(Clone, Debug)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub struct AccountService {
    accounts: Arc<dyn AccountStore>,
    credentials: Arc<dyn CredentialStore>,
    grants: Arc<dyn GrantStore>,
    mailer: Arc<dyn EmailSender>,
    config: AccountConfig,
}

impl AccountService {
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        credentials: Arc<dyn CredentialStore>,
        grants: Arc<dyn GrantStore>,
        mailer: Arc<dyn EmailSender>,
        config: AccountConfig,
    ) -> Self {
        Self {
            accounts,
            credentials,
            grants,
            mailer,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    /// Create an account, apply the owner and admin grants, register the
    /// credential, and (when confirmation is enabled) send the confirm token.
    ///
    /// # Errors
    ///
    /// `Validation` for a bad email, empty password, or duplicate email;
    /// `Collaborator` when a store or the mailer fails. A mailer failure
    /// leaves the account persisted.
    pub async fn register(&self, registration: Registration) -> Result<AccountView, AccountError> {
        let email = registration.email.trim().to_lowercase();
        if !valid_email(&email) {
            return Err(AccountError::Validation("invalid email address".to_string()));
        }
        if registration.password.is_empty() {
            return Err(AccountError::Validation("password must not be empty".to_string()));
        }

        let account = Account::new(email, registration.first_name, registration.last_name);
        let resource = resource_key(account.id);

        // Owner and admin grants go in before the entity itself so no
        // persisted account ever exists without them.
        self.grants
            .grant(Subject::Account(account.id), &resource, full_set())
            .await
            .map_err(collaborator)?;
        self.grants
            .grant(Subject::Role(ADMIN_ROLE.to_string()), &resource, full_set())
            .await
            .map_err(collaborator)?;

        match self.accounts.create(account.clone()).await.map_err(collaborator)? {
            CreateOutcome::Created => {}
            CreateOutcome::Conflict => {
                return Err(AccountError::Validation(
                    "email already registered".to_string(),
                ));
            }
        }

        self.credentials
            .register(account.id, &registration.password)
            .await
            .map_err(collaborator)?;

        if let Some(class) = self.config.confirm_email() {
            self.send_token_email(&account, class)?;
        }

        info!(account_id = %account.id, "account registered");
        Ok(project(&account, &Viewer::Owner))
    }

    /// Authenticate, apply the grace-period gate, stamp the login time.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown email, `Authorization` for bad credentials
    /// or an unconfirmed account past its grace period.
    pub async fn login(&self, email: &str, password: &str) -> Result<AccountView, AccountError> {
        let email = email.trim().to_lowercase();
        let mut account = self.find_by_email(&email).await?;

        let authenticated = self
            .credentials
            .authenticate(account.id, password)
            .await
            .map_err(collaborator)?;
        if !authenticated {
            return Err(AccountError::Authorization("invalid credentials".to_string()));
        }

        if !account.login_permitted(
            chrono::Utc::now(),
            self.config.confirmation_required(),
            self.config.grace_period(),
        ) {
            debug!(account_id = %account.id, "grace period expired");
            return Err(AccountError::Authorization(
                "account email is not confirmed".to_string(),
            ));
        }

        account.last_login_at = Some(chrono::Utc::now());
        self.accounts.save(&account).await.map_err(collaborator)?;

        Ok(project(&account, &Viewer::Owner))
    }

    /// Mint and send a reset-password token for the account behind `email`.
    ///
    /// # Errors
    ///
    /// `Validation` when the reset-password class is disabled, `NotFound` for
    /// an unknown email, `Collaborator` when the mailer fails.
    pub async fn reset_password_request(&self, email: &str) -> Result<(), AccountError> {
        let Some(class) = self.config.reset_password() else {
            return Err(AccountError::Validation(
                "password reset is not enabled".to_string(),
            ));
        };

        let account = self.find_by_email(&email.trim().to_lowercase()).await?;
        self.send_token_email(&account, class)?;
        info!(account_id = %account.id, "reset password token sent");
        Ok(())
    }

    /// Set a new password for the account named by a reset token.
    ///
    /// # Errors
    ///
    /// `Validation` for a disabled class or a bad/expired token, `NotFound`
    /// when the token's subject no longer exists.
    pub async fn reset_password(&self, opaque: &str, new_password: &str) -> Result<(), AccountError> {
        let Some(class) = self.config.reset_password() else {
            return Err(AccountError::Validation(
                "password reset is not enabled".to_string(),
            ));
        };
        if new_password.is_empty() {
            return Err(AccountError::Validation("password must not be empty".to_string()));
        }

        let claim = token::verify(opaque, class.algorithm(), class.key())?;
        let account = self.find_by_id(claim.subject_id).await?;

        self.credentials
            .set_password(account.id, new_password)
            .await
            .map_err(collaborator)?;
        info!(account_id = %account.id, "password reset");
        Ok(())
    }

    /// Mint and send a confirm-email token for the account behind `email`.
    ///
    /// # Errors
    ///
    /// `Validation` when the class is disabled or the account is already
    /// confirmed, `NotFound` for an unknown email.
    pub async fn confirm_email_request(&self, email: &str) -> Result<(), AccountError> {
        let Some(class) = self.config.confirm_email() else {
            return Err(AccountError::Validation(
                "email confirmation is not enabled".to_string(),
            ));
        };

        let account = self.find_by_email(&email.trim().to_lowercase()).await?;
        if account.is_confirmed() {
            return Err(AccountError::Validation(
                "account is already confirmed".to_string(),
            ));
        }

        self.send_token_email(&account, class)?;
        info!(account_id = %account.id, "confirm email token sent");
        Ok(())
    }

    /// Fire the `Unconfirmed -> Confirmed` transition for the token subject.
    ///
    /// A valid token for an already-confirmed account is a no-op success.
    ///
    /// # Errors
    ///
    /// `Validation` for a disabled class or a bad/expired token, `NotFound`
    /// when the token's subject no longer exists.
    pub async fn confirm_email(&self, opaque: &str) -> Result<(), AccountError> {
        let Some(class) = self.config.confirm_email() else {
            return Err(AccountError::Validation(
                "email confirmation is not enabled".to_string(),
            ));
        };

        let claim = token::verify(opaque, class.algorithm(), class.key())?;
        let mut account = self.find_by_id(claim.subject_id).await?;

        if account.confirm() {
            self.accounts.save(&account).await.map_err(collaborator)?;
            info!(account_id = %account.id, "account confirmed");
        }
        Ok(())
    }

    /// Re-authenticate with the old password, then set the new one.
    ///
    /// # Errors
    ///
    /// `Authorization` when re-authentication fails; the credential is left
    /// untouched in that case.
    pub async fn change_password(
        &self,
        account_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        if new_password.is_empty() {
            return Err(AccountError::Validation("password must not be empty".to_string()));
        }

        let authenticated = self
            .credentials
            .authenticate(account_id, old_password)
            .await
            .map_err(collaborator)?;
        if !authenticated {
            return Err(AccountError::Authorization("invalid credentials".to_string()));
        }

        self.credentials
            .set_password(account_id, new_password)
            .await
            .map_err(collaborator)?;
        info!(account_id = %account_id, "password changed");
        Ok(())
    }

    /// Owner-filtered view of an account.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn account_view(&self, account_id: Uuid) -> Result<AccountView, AccountError> {
        let account = self.find_by_id(account_id).await?;
        Ok(project(&account, &Viewer::Owner))
    }

    /// Role-membership check for an account.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn is_in_role(&self, account_id: Uuid, role: &str) -> Result<bool, AccountError> {
        let account = self.find_by_id(account_id).await?;
        Ok(account.is_in_role(role))
    }

    fn send_token_email(&self, account: &Account, class: &TokenClass) -> Result<(), AccountError> {
        let opaque = token::mint(
            account.id,
            class.ttl_minutes(),
            class.algorithm(),
            class.key(),
        )?;
        let message = render(
            class.template(),
            &account.email,
            &[
                ("firstName", account.first_name.as_deref().unwrap_or("")),
                ("lastName", account.last_name.as_deref().unwrap_or("")),
                ("token", &opaque),
            ],
        );
        self.mailer
            .send(&message)
            .map_err(|err| AccountError::Collaborator(err.to_string()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Account, AccountError> {
        self.accounts
            .find_by_email(email)
            .await
            .map_err(collaborator)?
            .ok_or_else(|| AccountError::NotFound("account not found".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Account, AccountError> {
        self.accounts
            .find_by_id(id)
            .await
            .map_err(collaborator)?
            .ok_or_else(|| AccountError::NotFound("account not found".to_string()))
    }
}

fn collaborator(err: anyhow::Error) -> AccountError {
    AccountError::Collaborator(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::{EmailMessage, Template};
    use crate::store::memory::{MemoryAccountStore, MemoryCredentialStore, MemoryGrantStore};
    use crate::token::Algorithm;
    use anyhow::anyhow;
    use std::sync::Mutex;

    struct RecordingSender {
        sent: Mutex<Vec<EmailMessage>>,
    }

    impl RecordingSender {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<EmailMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl EmailSender for RecordingSender {
        fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    struct FailingSender;

    impl EmailSender for FailingSender {
        fn send(&self, _message: &EmailMessage) -> anyhow::Result<()> {
            Err(anyhow!("smtp down"))
        }
    }

    // Token-only template so tests can read the token straight off the body.
    fn token_template() -> Template {
        Template {
            subject: "token".to_string(),
            text: "{token}".to_string(),
            alternatives: Vec::new(),
            enabled: true,
        }
    }

    fn confirm_class() -> TokenClass {
        TokenClass::new(30, Algorithm::Aes256Gcm, vec![7u8; 32], token_template())
    }

    fn reset_class() -> TokenClass {
        TokenClass::new(30, Algorithm::Aes256Gcm, vec![9u8; 32], token_template())
    }

    struct Harness {
        service: AccountService,
        accounts: Arc<MemoryAccountStore>,
        credentials: Arc<MemoryCredentialStore>,
        grants: Arc<MemoryGrantStore>,
        mailer: Arc<RecordingSender>,
    }

    fn harness(config: AccountConfig) -> Harness {
        let accounts = Arc::new(MemoryAccountStore::new());
        let credentials = Arc::new(MemoryCredentialStore::new());
        let grants = Arc::new(MemoryGrantStore::new());
        let mailer = RecordingSender::new();
        let service = AccountService::new(
            accounts.clone(),
            credentials.clone(),
            grants.clone(),
            mailer.clone(),
            config,
        );
        Harness {
            service,
            accounts,
            credentials,
            grants,
            mailer,
        }
    }

    fn registration(email: &str) -> Registration {
        Registration {
            email: email.to_string(),
            password: "pw".to_string(),
            first_name: Some("Alice".to_string()),
            last_name: None,
        }
    }

    #[tokio::test]
    async fn register_without_confirmation_sends_nothing() {
        let h = harness(AccountConfig::new());
        let view = h.service.register(registration("A@B.com")).await.unwrap();

        assert_eq!(view.email, "a@b.com");
        assert!(!view.is_confirmed);
        assert!(h.mailer.sent().is_empty());
        assert!(h.credentials.authenticate(view.id, "pw").await.unwrap());
    }

    #[tokio::test]
    async fn register_applies_owner_and_admin_grants() {
        let h = harness(AccountConfig::new());
        let view = h.service.register(registration("a@b.com")).await.unwrap();

        let grants = h.grants.grants_for(&resource_key(view.id)).await.unwrap();
        assert_eq!(grants.len(), 2);
        for grant in &grants {
            assert_eq!(grant.capabilities, full_set());
        }
        assert!(grants.iter().any(|g| g.subject == Subject::Account(view.id)));
        assert!(
            grants
                .iter()
                .any(|g| g.subject == Subject::Role(ADMIN_ROLE.to_string()))
        );
    }

    #[tokio::test]
    async fn register_rejects_duplicates_and_bad_input() {
        let h = harness(AccountConfig::new());
        h.service.register(registration("a@b.com")).await.unwrap();

        let err = h.service.register(registration("a@b.com")).await.unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));

        let err = h.service.register(registration("not-an-email")).await.unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));

        let mut empty_pw = registration("b@b.com");
        empty_pw.password = String::new();
        let err = h.service.register(empty_pw).await.unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));
    }

    #[tokio::test]
    async fn register_with_confirmation_sends_a_working_token() {
        let config = AccountConfig::new().with_confirm_email(confirm_class());
        let h = harness(config);
        let view = h.service.register(registration("a@b.com")).await.unwrap();

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@b.com");

        h.service.confirm_email(&sent[0].text).await.unwrap();
        let account = h.accounts.find_by_id(view.id).await.unwrap().unwrap();
        assert!(account.is_confirmed());
    }

    #[tokio::test]
    async fn register_surfaces_mailer_failure_but_keeps_the_account() {
        let accounts = Arc::new(MemoryAccountStore::new());
        let service = AccountService::new(
            accounts.clone(),
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemoryGrantStore::new()),
            Arc::new(FailingSender),
            AccountConfig::new().with_confirm_email(confirm_class()),
        );

        let err = service.register(registration("a@b.com")).await.unwrap_err();
        assert!(matches!(err, AccountError::Collaborator(_)));
        assert!(accounts.find_by_email("a@b.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn login_stamps_last_login() {
        let h = harness(AccountConfig::new());
        h.service.register(registration("a@b.com")).await.unwrap();

        let view = h.service.login("a@b.com", "pw").await.unwrap();
        assert!(view.last_login_at.is_some());

        let stored = h.accounts.find_by_id(view.id).await.unwrap().unwrap();
        assert_eq!(stored.last_login_at, view.last_login_at);
    }

    #[tokio::test]
    async fn login_rejections() {
        let h = harness(AccountConfig::new());
        h.service.register(registration("a@b.com")).await.unwrap();

        let err = h.service.login("a@b.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AccountError::Authorization(_)));

        let err = h.service.login("nobody@b.com", "pw").await.unwrap_err();
        assert!(matches!(err, AccountError::NotFound(_)));
    }

    #[tokio::test]
    async fn login_forbidden_past_grace_period() {
        let config = AccountConfig::new()
            .with_confirm_email(confirm_class())
            .with_grace_period_minutes(60);
        let h = harness(config);
        let view = h.service.register(registration("a@b.com")).await.unwrap();

        // Inside the window the unconfirmed account may still log in.
        h.service.login("a@b.com", "pw").await.unwrap();

        let mut account = h.accounts.find_by_id(view.id).await.unwrap().unwrap();
        account.created_at = chrono::Utc::now() - chrono::Duration::minutes(61);
        h.accounts.save(&account).await.unwrap();

        let err = h.service.login("a@b.com", "pw").await.unwrap_err();
        assert!(matches!(err, AccountError::Authorization(_)));
    }

    #[tokio::test]
    async fn reset_password_flow() {
        let config = AccountConfig::new().with_reset_password(reset_class());
        let h = harness(config);
        h.service.register(registration("a@b.com")).await.unwrap();

        h.service.reset_password_request("a@b.com").await.unwrap();
        let token = h.mailer.sent()[0].text.clone();

        h.service.reset_password(&token, "fresh").await.unwrap();
        h.service.login("a@b.com", "fresh").await.unwrap();
        let err = h.service.login("a@b.com", "pw").await.unwrap_err();
        assert!(matches!(err, AccountError::Authorization(_)));
    }

    #[tokio::test]
    async fn reset_password_request_requires_the_class_and_the_account() {
        let disabled = harness(AccountConfig::new());
        let err = disabled
            .service
            .reset_password_request("a@b.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));

        let enabled = harness(AccountConfig::new().with_reset_password(reset_class()));
        let err = enabled
            .service
            .reset_password_request("nobody@b.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::NotFound(_)));
        assert!(enabled.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn confirm_tokens_do_not_reset_passwords() {
        let config = AccountConfig::new()
            .with_confirm_email(confirm_class())
            .with_reset_password(reset_class());
        let h = harness(config);
        h.service.register(registration("a@b.com")).await.unwrap();
        let confirm_token = h.mailer.sent()[0].text.clone();

        let err = h
            .service
            .reset_password(&confirm_token, "fresh")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));
        h.service.login("a@b.com", "pw").await.unwrap();
    }

    #[tokio::test]
    async fn expired_confirm_token_leaves_state_unchanged() {
        let class = TokenClass::new(-1, Algorithm::Aes256Gcm, vec![7u8; 32], token_template());
        let config = AccountConfig::new().with_confirm_email(class);
        let h = harness(config);
        let view = h.service.register(registration("a@b.com")).await.unwrap();
        let token = h.mailer.sent()[0].text.clone();

        let err = h.service.confirm_email(&token).await.unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));

        let account = h.accounts.find_by_id(view.id).await.unwrap().unwrap();
        assert!(!account.is_confirmed());
    }

    #[tokio::test]
    async fn confirm_email_is_idempotent_for_a_valid_token() {
        let config = AccountConfig::new().with_confirm_email(confirm_class());
        let h = harness(config);
        h.service.register(registration("a@b.com")).await.unwrap();
        let token = h.mailer.sent()[0].text.clone();

        h.service.confirm_email(&token).await.unwrap();
        h.service.confirm_email(&token).await.unwrap();
    }

    #[tokio::test]
    async fn confirm_email_request_rejects_confirmed_accounts() {
        let config = AccountConfig::new().with_confirm_email(confirm_class());
        let h = harness(config);
        h.service.register(registration("a@b.com")).await.unwrap();
        let token = h.mailer.sent()[0].text.clone();
        h.service.confirm_email(&token).await.unwrap();

        let err = h
            .service
            .confirm_email_request("a@b.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));
    }

    #[tokio::test]
    async fn change_password_requires_the_old_password() {
        let h = harness(AccountConfig::new());
        let view = h.service.register(registration("a@b.com")).await.unwrap();

        let err = h
            .service
            .change_password(view.id, "wrong", "fresh")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Authorization(_)));
        // Old credential untouched.
        assert!(h.credentials.authenticate(view.id, "pw").await.unwrap());

        h.service.change_password(view.id, "pw", "fresh").await.unwrap();
        assert!(h.credentials.authenticate(view.id, "fresh").await.unwrap());
    }

    #[tokio::test]
    async fn role_membership_lookup() {
        let h = harness(AccountConfig::new());
        let view = h.service.register(registration("a@b.com")).await.unwrap();

        assert!(!h.service.is_in_role(view.id, "admin").await.unwrap());

        let mut account = h.accounts.find_by_id(view.id).await.unwrap().unwrap();
        account.roles.insert("admin".to_string());
        h.accounts.save(&account).await.unwrap();

        assert!(h.service.is_in_role(view.id, "admin").await.unwrap());
        let err = h.service.is_in_role(Uuid::new_v4(), "admin").await.unwrap_err();
        assert!(matches!(err, AccountError::NotFound(_)));
    }
}

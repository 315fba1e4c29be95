//! Postgres-backed collaborators.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;
use tracing::{Instrument, info_span};
use uuid::Uuid;

use crate::access::{Capability, Grant, Subject};
use crate::accounts::models::{Account, ConfirmationState};

use super::{AccountStore, CreateOutcome, CredentialStore, GrantStore};

/// Create the account tables when they do not exist yet.
///
/// # Errors
///
/// Returns an error when any DDL statement fails.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    let statements = [
        r"
        CREATE TABLE IF NOT EXISTS accounts (
            id UUID PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            first_name TEXT,
            last_name TEXT,
            roles TEXT[] NOT NULL DEFAULT '{}',
            is_confirmed BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL,
            last_login_at TIMESTAMPTZ
        )",
        r"
        CREATE TABLE IF NOT EXISTS account_credentials (
            account_id UUID PRIMARY KEY REFERENCES accounts(id),
            salt BYTEA NOT NULL,
            digest BYTEA NOT NULL
        )",
        r"
        CREATE TABLE IF NOT EXISTS account_grants (
            subject_key TEXT NOT NULL,
            resource_key TEXT NOT NULL,
            capability TEXT NOT NULL,
            PRIMARY KEY (subject_key, resource_key, capability)
        )",
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("failed to ensure account schema")?;
    }

    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn account_from_row(row: &sqlx::postgres::PgRow) -> Account {
    let roles: Vec<String> = row.get("roles");
    let is_confirmed: bool = row.get("is_confirmed");
    Account {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        roles: roles.into_iter().collect(),
        confirmation: if is_confirmed {
            ConfirmationState::Confirmed
        } else {
            ConfirmationState::Unconfirmed
        },
        created_at: row.get("created_at"),
        last_login_at: row.get("last_login_at"),
    }
}

pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn create(&self, account: Account) -> Result<CreateOutcome> {
        let query = r"
            INSERT INTO accounts
                (id, email, first_name, last_name, roles, is_confirmed, created_at, last_login_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let roles: Vec<String> = account.roles.iter().cloned().collect();
        let result = sqlx::query(query)
            .bind(account.id)
            .bind(&account.email)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(&roles)
            .bind(account.is_confirmed())
            .bind(account.created_at)
            .bind(account.last_login_at)
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert account"),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let query = "SELECT * FROM accounts WHERE id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up account by id")?;

        Ok(row.as_ref().map(account_from_row))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let query = "SELECT * FROM accounts WHERE email = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up account by email")?;

        Ok(row.as_ref().map(account_from_row))
    }

    async fn save(&self, account: &Account) -> Result<()> {
        let query = r"
            UPDATE accounts
            SET first_name = $2,
                last_name = $3,
                roles = $4,
                is_confirmed = $5,
                last_login_at = $6
            WHERE id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let roles: Vec<String> = account.roles.iter().cloned().collect();
        let result = sqlx::query(query)
            .bind(account.id)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(&roles)
            .bind(account.is_confirmed())
            .bind(account.last_login_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to save account")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("unknown account id: {}", account.id));
        }

        Ok(())
    }
}

fn credential_digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn register(&self, account_id: Uuid, password: &str) -> Result<()> {
        let mut salt = [0u8; 16];
        OsRng.fill_bytes(&mut salt);

        let query = r"
            INSERT INTO account_credentials (account_id, salt, digest)
            VALUES ($1, $2, $3)
            ON CONFLICT (account_id) DO UPDATE SET salt = $2, digest = $3
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(account_id)
            .bind(salt.as_slice())
            .bind(credential_digest(&salt, password))
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to register credential")?;

        Ok(())
    }

    async fn set_password(&self, account_id: Uuid, new_password: &str) -> Result<()> {
        let mut salt = [0u8; 16];
        OsRng.fill_bytes(&mut salt);

        let query = r"
            UPDATE account_credentials
            SET salt = $2, digest = $3
            WHERE account_id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(account_id)
            .bind(salt.as_slice())
            .bind(credential_digest(&salt, new_password))
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to set credential")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("no credential for account: {account_id}"));
        }

        Ok(())
    }

    async fn authenticate(&self, account_id: Uuid, password: &str) -> Result<bool> {
        let query = "SELECT salt, digest FROM account_credentials WHERE account_id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to load credential")?;

        Ok(row.is_some_and(|row| {
            let salt: Vec<u8> = row.get("salt");
            let digest: Vec<u8> = row.get("digest");
            credential_digest(&salt, password) == digest
        }))
    }
}

fn capability_as_str(capability: Capability) -> &'static str {
    match capability {
        Capability::Read => "read",
        Capability::Write => "write",
        Capability::Delete => "delete",
    }
}

fn parse_capability(value: &str) -> Result<Capability> {
    match value {
        "read" => Ok(Capability::Read),
        "write" => Ok(Capability::Write),
        "delete" => Ok(Capability::Delete),
        other => Err(anyhow!("unknown capability: {other}")),
    }
}

fn parse_subject(key: &str) -> Result<Subject> {
    if let Some(id) = key.strip_prefix("account:") {
        return Ok(Subject::Account(
            Uuid::parse_str(id).context("invalid account subject key")?,
        ));
    }
    if let Some(role) = key.strip_prefix("role:") {
        return Ok(Subject::Role(role.to_string()));
    }
    Err(anyhow!("unknown subject key: {key}"))
}

pub struct PostgresGrantStore {
    pool: PgPool,
}

impl PostgresGrantStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GrantStore for PostgresGrantStore {
    async fn grant(
        &self,
        subject: Subject,
        resource: &str,
        capabilities: BTreeSet<Capability>,
    ) -> Result<()> {
        // One row per capability; the conflict clause makes re-grants no-ops.
        let query = r"
            INSERT INTO account_grants (subject_key, resource_key, capability)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
        ";
        for capability in capabilities {
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "INSERT",
                db.statement = query
            );
            sqlx::query(query)
                .bind(subject.key())
                .bind(resource)
                .bind(capability_as_str(capability))
                .execute(&self.pool)
                .instrument(span)
                .await
                .context("failed to insert grant")?;
        }

        Ok(())
    }

    async fn grants_for(&self, resource: &str) -> Result<Vec<Grant>> {
        let query = r"
            SELECT subject_key, capability
            FROM account_grants
            WHERE resource_key = $1
            ORDER BY subject_key
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .bind(resource)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to load grants")?;

        let mut grants: Vec<Grant> = Vec::new();
        for row in rows {
            let subject_key: String = row.get("subject_key");
            let capability: String = row.get("capability");
            let subject = parse_subject(&subject_key)?;
            let capability = parse_capability(&capability)?;

            if let Some(grant) = grants.iter_mut().find(|grant| grant.subject == subject) {
                grant.capabilities.insert(capability);
            } else {
                grants.push(Grant {
                    subject,
                    resource: resource.to_string(),
                    capabilities: BTreeSet::from([capability]),
                });
            }
        }

        Ok(grants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_keys_round_trip() -> Result<()> {
        let id = Uuid::new_v4();
        assert_eq!(
            parse_subject(&Subject::Account(id).key())?,
            Subject::Account(id)
        );
        assert_eq!(
            parse_subject(&Subject::Role("admin".to_string()).key())?,
            Subject::Role("admin".to_string())
        );
        assert!(parse_subject("bogus").is_err());
        assert!(parse_subject("account:not-a-uuid").is_err());
        Ok(())
    }

    #[test]
    fn capabilities_round_trip() -> Result<()> {
        for capability in [Capability::Read, Capability::Write, Capability::Delete] {
            assert_eq!(parse_capability(capability_as_str(capability))?, capability);
        }
        assert!(parse_capability("admin").is_err());
        Ok(())
    }

    #[test]
    fn credential_digest_depends_on_salt_and_password() {
        let first = credential_digest(b"salt-a", "pw");
        assert_eq!(first, credential_digest(b"salt-a", "pw"));
        assert_ne!(first, credential_digest(b"salt-b", "pw"));
        assert_ne!(first, credential_digest(b"salt-a", "other"));
    }
}

//! Persistence collaborators.
//!
//! The orchestrators only see these traits; consistency guarantees belong to
//! the implementations. `memory` backs tests and local dev, `postgres` is the
//! production store. At minimum an implementation provides read-your-writes
//! on a single account id.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::access::{Capability, Grant, Subject};
use crate::accounts::models::Account;

pub mod memory;
pub mod postgres;

/// Result of attempting to persist a new account.
#[derive(Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// An account with the same email already exists.
    Conflict,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create(&self, account: Account) -> Result<CreateOutcome>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;
    async fn save(&self, account: &Account) -> Result<()>;
}

/// Credential sub-contract. Hashing scheme and storage are delegated here;
/// raw passwords never persist and hashes never leave the store.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn register(&self, account_id: Uuid, password: &str) -> Result<()>;
    async fn set_password(&self, account_id: Uuid, new_password: &str) -> Result<()>;
    async fn authenticate(&self, account_id: Uuid, password: &str) -> Result<bool>;
}

/// Grant storage. `grant` is idempotent: granting the same triple twice has
/// no additional effect.
#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn grant(
        &self,
        subject: Subject,
        resource: &str,
        capabilities: BTreeSet<Capability>,
    ) -> Result<()>;

    async fn grants_for(&self, resource: &str) -> Result<Vec<Grant>>;
}

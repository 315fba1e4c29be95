//! Capability grants and owner-scoped projection.
//!
//! A grant is a `(subject, resource, capability-set)` triple. Subjects are
//! either an account or a named role; resources are addressed by a stable
//! string key. Grants are additive; revocation is out of scope.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::accounts::models::Account;

/// Role that receives a full grant on every account at creation.
pub const ADMIN_ROLE: &str = "admin";

#[derive(
    Serialize, Deserialize, ToSchema, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Read,
    Write,
    Delete,
}

/// The full capability set granted to an account's owner and to the admin
/// role at creation time.
#[must_use]
pub fn full_set() -> BTreeSet<Capability> {
    BTreeSet::from([Capability::Read, Capability::Write, Capability::Delete])
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Subject {
    Account(Uuid),
    Role(String),
}

impl Subject {
    /// Stable key addressing this subject.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::Account(id) => format!("account:{id}"),
            Self::Role(name) => format!("role:{name}"),
        }
    }
}

/// Stable key addressing an account as a protected resource.
#[must_use]
pub fn resource_key(account_id: Uuid) -> String {
    format!("account:{account_id}")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grant {
    pub subject: Subject,
    pub resource: String,
    pub capabilities: BTreeSet<Capability>,
}

/// Who is looking at an account. Only the owner context exists today; the
/// enum keeps the projection seam explicit for future viewer kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Viewer {
    Owner,
}

/// Owner-filtered view of an account, safe to return to the caller.
///
/// Credential material never reaches [`Account`], so the projection only has
/// to select the owner-visible fields. It never mutates the entity.
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq, Eq)]
pub struct AccountView {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roles: Vec<String>,
    pub is_confirmed: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_login_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Pure projection of an account for the given viewer context.
#[must_use]
pub fn project(account: &Account, viewer: &Viewer) -> AccountView {
    match viewer {
        Viewer::Owner => AccountView {
            id: account.id,
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            roles: account.roles.iter().cloned().collect(),
            is_confirmed: account.is_confirmed(),
            created_at: account.created_at,
            last_login_at: account.last_login_at,
        },
    }
}

//! In-memory collaborators for tests and local development.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::access::{Capability, Grant, Subject};
use crate::accounts::models::Account;

use super::{AccountStore, CreateOutcome, CredentialStore, GrantStore};

#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn create(&self, account: Account) -> Result<CreateOutcome> {
        let mut accounts = self.accounts.lock().await;
        if accounts.values().any(|existing| existing.email == account.email) {
            return Ok(CreateOutcome::Conflict);
        }
        accounts.insert(account.id, account);
        Ok(CreateOutcome::Created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.accounts.lock().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .await
            .values()
            .find(|account| account.email == email)
            .cloned())
    }

    async fn save(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.lock().await;
        if !accounts.contains_key(&account.id) {
            return Err(anyhow!("unknown account id: {}", account.id));
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }
}

#[derive(Debug)]
struct StoredCredential {
    salt: [u8; 16],
    digest: Vec<u8>,
}

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: Mutex<HashMap<Uuid, StoredCredential>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn register(&self, account_id: Uuid, password: &str) -> Result<()> {
        let mut salt = [0u8; 16];
        OsRng.fill_bytes(&mut salt);
        let credential = StoredCredential {
            salt,
            digest: digest(&salt, password),
        };
        self.credentials.lock().await.insert(account_id, credential);
        Ok(())
    }

    async fn set_password(&self, account_id: Uuid, new_password: &str) -> Result<()> {
        let mut credentials = self.credentials.lock().await;
        let Some(credential) = credentials.get_mut(&account_id) else {
            return Err(anyhow!("no credential for account: {account_id}"));
        };
        let mut salt = [0u8; 16];
        OsRng.fill_bytes(&mut salt);
        credential.salt = salt;
        credential.digest = digest(&salt, new_password);
        Ok(())
    }

    async fn authenticate(&self, account_id: Uuid, password: &str) -> Result<bool> {
        let credentials = self.credentials.lock().await;
        Ok(credentials
            .get(&account_id)
            .is_some_and(|credential| digest(&credential.salt, password) == credential.digest))
    }
}

#[derive(Debug, Default)]
pub struct MemoryGrantStore {
    grants: Mutex<HashMap<String, HashMap<Subject, BTreeSet<Capability>>>>,
}

impl MemoryGrantStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GrantStore for MemoryGrantStore {
    async fn grant(
        &self,
        subject: Subject,
        resource: &str,
        capabilities: BTreeSet<Capability>,
    ) -> Result<()> {
        let mut grants = self.grants.lock().await;
        grants
            .entry(resource.to_string())
            .or_default()
            .entry(subject)
            .or_default()
            .extend(capabilities);
        Ok(())
    }

    async fn grants_for(&self, resource: &str) -> Result<Vec<Grant>> {
        let grants = self.grants.lock().await;
        Ok(grants
            .get(resource)
            .map(|subjects| {
                subjects
                    .iter()
                    .map(|(subject, capabilities)| Grant {
                        subject: subject.clone(),
                        resource: resource.to_string(),
                        capabilities: capabilities.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

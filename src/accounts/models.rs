//! Account entity and confirmation state machine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Email confirmation state. `Confirmed` is terminal; the only transition is
/// `Unconfirmed -> Confirmed`, fired by a valid confirm-email token.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationState {
    #[default]
    Unconfirmed,
    Confirmed,
}

/// A user account. Credential material (password hash + salt) is owned by the
/// credential store collaborator and never appears here.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roles: BTreeSet<String>,
    pub confirmation: ConfirmationState,
    /// Immutable once set.
    pub created_at: DateTime<Utc>,
    /// Stamped on every successful login.
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Account {
    #[must_use]
    pub fn new(email: String, first_name: Option<String>, last_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            first_name,
            last_name,
            roles: BTreeSet::new(),
            confirmation: ConfirmationState::Unconfirmed,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.confirmation == ConfirmationState::Confirmed
    }

    /// Fire the `Unconfirmed -> Confirmed` transition.
    ///
    /// Returns `true` when the state changed, `false` when the account was
    /// already confirmed. There is no transition out of `Confirmed`.
    pub fn confirm(&mut self) -> bool {
        match self.confirmation {
            ConfirmationState::Unconfirmed => {
                self.confirmation = ConfirmationState::Confirmed;
                true
            }
            ConfirmationState::Confirmed => false,
        }
    }

    /// Grace-period gate, evaluated at login only.
    ///
    /// When confirmation is not required the gate is bypassed entirely.
    /// Unconfirmed accounts may log in only while `now < created_at + grace`.
    #[must_use]
    pub fn login_permitted(
        &self,
        now: DateTime<Utc>,
        confirmation_required: bool,
        grace: Duration,
    ) -> bool {
        if !confirmation_required || self.is_confirmed() {
            return true;
        }
        now < self.created_at + grace
    }

    #[must_use]
    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

//! In-memory session store and cookie plumbing.
//!
//! The raw token travels to the client once, in the cookie; only its SHA-256
//! digest is kept server-side. Expired entries are evicted opportunistically
//! on every lookup and insert.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{AUTHORIZATION, COOKIE, InvalidHeaderValue},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

const SESSION_COOKIE_NAME: &str = "akonto_session";

pub fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

struct SessionEntry {
    account_id: Uuid,
    expires_at: Instant,
}

pub struct SessionStore {
    ttl: Duration,
    cookie_secure: bool,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration, cookie_secure: bool) -> Self {
        Self {
            ttl,
            cookie_secure,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl.as_secs()
    }

    /// Whether session cookies carry the `Secure` attribute.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    /// Create a session and return the raw token for the cookie.
    pub async fn create(&self, account_id: Uuid) -> String {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, entry| entry.expires_at > now);
        sessions.insert(
            hash_session_token(&token),
            SessionEntry {
                account_id,
                expires_at: now + self.ttl,
            },
        );
        token
    }

    /// Resolve a raw token to its account, evicting it when expired.
    pub async fn resolve(&self, token: &str) -> Option<Uuid> {
        let digest = hash_session_token(token);
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, entry| entry.expires_at > now);
        sessions.get(&digest).map(|entry| entry.account_id)
    }

    pub async fn revoke(&self, token: &str) {
        let digest = hash_session_token(token);
        self.sessions.lock().await.remove(&digest);
    }
}

/// Build a `HttpOnly` cookie carrying the session token.
pub fn session_cookie(
    token: &str,
    ttl_seconds: u64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub fn clear_session_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Pull the session token from the cookie or an Authorization bearer header.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

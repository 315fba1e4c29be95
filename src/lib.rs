//! User account registration, confirmation and access service.
//!
//! The HTTP surface lives in [`api`]; the domain orchestrators in
//! [`accounts::service`]; tokens, grants, persistence and notification
//! dispatch in [`token`], [`access`], [`store`] and [`email`].

pub mod access;
pub mod accounts;
pub mod api;
pub mod cli;
pub mod email;
pub mod store;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_carries_name_and_version() {
        assert!(APP_USER_AGENT.starts_with("akonto/"));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn commit_hash_is_never_empty() {
        assert!(!GIT_COMMIT_HASH.is_empty());
    }
}

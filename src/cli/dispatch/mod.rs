use crate::accounts::config::{AccountConfig, TokenClass};
use crate::cli::actions::Action;
use crate::cli::commands::tokens::{
    ARG_CONFIRM_EMAIL_ALGORITHM, ARG_CONFIRM_EMAIL_KEY, ARG_CONFIRM_EMAIL_TTL,
    ARG_RESET_PASSWORD_ALGORITHM, ARG_RESET_PASSWORD_KEY, ARG_RESET_PASSWORD_TTL,
};
use crate::email::{Template, default_confirm_template, default_reset_template};
use crate::token::Algorithm;
use anyhow::{Context, Result, anyhow};
use secrecy::{ExposeSecret, SecretString};

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let mut config = AccountConfig::new();

    if let Some(minutes) = matches.get_one::<i64>("grace-period-minutes") {
        config = config.with_grace_period_minutes(*minutes);
    }

    if let Some(class) = token_class(
        matches,
        ARG_CONFIRM_EMAIL_KEY,
        ARG_CONFIRM_EMAIL_TTL,
        ARG_CONFIRM_EMAIL_ALGORITHM,
        default_confirm_template(),
    )? {
        config = config.with_confirm_email(class);
    }

    if let Some(class) = token_class(
        matches,
        ARG_RESET_PASSWORD_KEY,
        ARG_RESET_PASSWORD_TTL,
        ARG_RESET_PASSWORD_ALGORITHM,
        default_reset_template(),
    )? {
        config = config.with_reset_password(class);
    }

    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        dsn: matches
            .get_one("dsn")
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow!("missing required argument: --dsn"))?,
        session_ttl_seconds: matches
            .get_one::<u64>("session-ttl-seconds")
            .copied()
            .unwrap_or(3600),
        session_cookie_secure: matches.get_flag("session-cookie-secure"),
        config,
    })
}

/// Assemble one token class from its three arguments.
///
/// Fail closed: a key without a TTL, a non-hex key, or a key whose length does
/// not match the algorithm is a hard dispatch error, never a silent default.
fn token_class(
    matches: &clap::ArgMatches,
    key_arg: &str,
    ttl_arg: &str,
    algorithm_arg: &str,
    template: Template,
) -> Result<Option<TokenClass>> {
    let Some(key_hex) = matches.get_one::<String>(key_arg) else {
        return Ok(None);
    };
    let key_hex = SecretString::from(key_hex.clone());

    let ttl_minutes = matches
        .get_one::<i64>(ttl_arg)
        .copied()
        .ok_or_else(|| anyhow!("--{ttl_arg} is required when --{key_arg} is set"))?;

    let algorithm: Algorithm = matches
        .get_one::<String>(algorithm_arg)
        .map_or("aes-256-gcm", String::as_str)
        .parse()
        .map_err(|err: String| anyhow!(err))?;

    let key = hex::decode(key_hex.expose_secret())
        .with_context(|| format!("--{key_arg} must be hex-encoded"))?;
    if key.len() != algorithm.key_len() {
        return Err(anyhow!(
            "--{key_arg} must decode to {} bytes for {}",
            algorithm.key_len(),
            algorithm.as_str()
        ));
    }

    Ok(Some(TokenClass::new(ttl_minutes, algorithm, key, template)))
}

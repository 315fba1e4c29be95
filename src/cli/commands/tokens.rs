//! Token class arguments for the confirm-email and reset-password flows.
//!
//! A class is enabled by supplying its key; a key without a TTL is rejected
//! at dispatch time rather than falling back to a default.

use clap::Arg;

pub const ARG_CONFIRM_EMAIL_KEY: &str = "confirm-email-key";
pub const ARG_CONFIRM_EMAIL_TTL: &str = "confirm-email-ttl-minutes";
pub const ARG_CONFIRM_EMAIL_ALGORITHM: &str = "confirm-email-algorithm";

pub const ARG_RESET_PASSWORD_KEY: &str = "reset-password-key";
pub const ARG_RESET_PASSWORD_TTL: &str = "reset-password-ttl-minutes";
pub const ARG_RESET_PASSWORD_ALGORITHM: &str = "reset-password-algorithm";

pub fn confirm_email_args() -> Vec<Arg> {
    vec![
        Arg::new(ARG_CONFIRM_EMAIL_KEY)
            .long(ARG_CONFIRM_EMAIL_KEY)
            .help("Hex-encoded symmetric key for confirm-email tokens; enables the flow")
            .env("AKONTO_CONFIRM_EMAIL_KEY"),
        Arg::new(ARG_CONFIRM_EMAIL_TTL)
            .long(ARG_CONFIRM_EMAIL_TTL)
            .help("Confirm-email token TTL in minutes (required when the key is set)")
            .env("AKONTO_CONFIRM_EMAIL_TTL_MINUTES")
            .value_parser(clap::value_parser!(i64)),
        Arg::new(ARG_CONFIRM_EMAIL_ALGORITHM)
            .long(ARG_CONFIRM_EMAIL_ALGORITHM)
            .help("Confirm-email token algorithm: aes-256-gcm or aes-128-gcm")
            .env("AKONTO_CONFIRM_EMAIL_ALGORITHM")
            .default_value("aes-256-gcm"),
    ]
}

pub fn reset_password_args() -> Vec<Arg> {
    vec![
        Arg::new(ARG_RESET_PASSWORD_KEY)
            .long(ARG_RESET_PASSWORD_KEY)
            .help("Hex-encoded symmetric key for reset-password tokens; enables the flow")
            .env("AKONTO_RESET_PASSWORD_KEY"),
        Arg::new(ARG_RESET_PASSWORD_TTL)
            .long(ARG_RESET_PASSWORD_TTL)
            .help("Reset-password token TTL in minutes (required when the key is set)")
            .env("AKONTO_RESET_PASSWORD_TTL_MINUTES")
            .value_parser(clap::value_parser!(i64)),
        Arg::new(ARG_RESET_PASSWORD_ALGORITHM)
            .long(ARG_RESET_PASSWORD_ALGORITHM)
            .help("Reset-password token algorithm: aes-256-gcm or aes-128-gcm")
            .env("AKONTO_RESET_PASSWORD_ALGORITHM")
            .default_value("aes-256-gcm"),
    ]
}

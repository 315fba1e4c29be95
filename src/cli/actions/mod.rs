use crate::accounts::config::AccountConfig;

pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        session_ttl_seconds: u64,
        session_cookie_secure: bool,
        config: AccountConfig,
    },
}

//! API server configuration.

use rex_core::auth::jwt::resolve_jwt_secret;
use rex_core::completion::DEFAULT_MODEL;
use rex_core::completion::openai::OPENAI_BASE_URL;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Key for the completions API. Without one every reply is the fallback.
    pub openai_api_key: Option<String>,
    /// Root of the OpenAI-compatible API.
    pub openai_base_url: String,
    /// Model id sent with every completion request.
    pub model: String,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable           | Default                                     |
    /// |--------------------|---------------------------------------------|
    /// | `BIND_ADDR`        | `127.0.0.1:3100`                            |
    /// | `DATABASE_URL`     | `postgres://localhost:5432/rex`             |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file     |
    /// | `OPENAI_API_KEY`   | unset                                       |
    /// | `OPENAI_BASE_URL`  | `https://api.openai.com/v1`                 |
    /// | `REX_MODEL`        | `gpt-3.5-turbo`                             |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3100".into()),
            pg_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/rex".into()),
            jwt_secret: resolve_jwt_secret(),
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| OPENAI_BASE_URL.into()),
            model: std::env::var("REX_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into()),
        }
    }
}

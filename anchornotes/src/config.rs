use serde::Deserialize;
use std::collections::HashMap;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Parse `ANCHOR_API_TOKENS`.
/// Format: comma-separated `token:userId` pairs, e.g. `s3cret:alice,other:bob`
fn parse_api_tokens() -> HashMap<String, String> {
    match env::var("ANCHOR_API_TOKENS") {
        Ok(val) if !val.is_empty() => val
            .split(',')
            .filter_map(|pair| {
                let mut parts = pair.splitn(2, ':');
                let token = parts.next()?.trim();
                let user_id = parts.next().map(str::trim).unwrap_or_default();
                if token.is_empty() || user_id.is_empty() {
                    tracing::warn!("Invalid token pair in ANCHOR_API_TOKENS, skipping");
                    None
                } else {
                    Some((token.to_string(), user_id.to_string()))
                }
            })
            .collect(),
        _ => HashMap::new(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub relevance: RelevanceConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token to user id. Identity is issued elsewhere; the server only
    /// needs to know which user a token belongs to.
    pub api_tokens: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
    pub busy_timeout_ms: u64,
    pub journal_mode: String,
    pub synchronous: String,
}

impl DatabaseConfig {
    /// Plain local SQLite file with default pragmas.
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            url: path.into(),
            auth_token: None,
            local_path: None,
            busy_timeout_ms: 5000,
            journal_mode: "WAL".to_string(),
            synchronous: "NORMAL".to_string(),
        }
    }
}

/// Upper bound for `RELEVANCE_WINDOW_MINUTES`: one week.
pub const MAX_RELEVANCE_WINDOW_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct RelevanceConfig {
    /// Half-width of the time window around "now" in which a reminder makes a
    /// note relevant.
    pub window_minutes: i64,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self { window_minutes: 60 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub state_dir: String,
    /// Explicit installation id. When unset one is generated and stored in
    /// `state_dir` on first use.
    pub installation_id: Option<String>,
    pub relevant_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            state_dir: ".anchornotes".to_string(),
            installation_id: None,
            relevant_ttl_secs: 3600,
            sweep_interval_secs: 300,
            api_base_url: "http://127.0.0.1:3000".to_string(),
            api_token: None,
            timeout_secs: 15,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let client_defaults = ClientConfig::default();
        Self {
            server: ServerConfig {
                host: env::var("ANCHOR_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("ANCHOR_PORT", 3000),
                api_tokens: parse_api_tokens(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:anchornotes.db".to_string()),
                auth_token: non_empty_env("DATABASE_AUTH_TOKEN"),
                local_path: non_empty_env("DATABASE_LOCAL_PATH"),
                busy_timeout_ms: parse_env_or("DATABASE_BUSY_TIMEOUT_MS", 5000),
                journal_mode: env::var("DATABASE_JOURNAL_MODE")
                    .unwrap_or_else(|_| "WAL".to_string()),
                synchronous: env::var("DATABASE_SYNCHRONOUS")
                    .unwrap_or_else(|_| "NORMAL".to_string()),
            },
            relevance: RelevanceConfig {
                window_minutes: parse_env_or("RELEVANCE_WINDOW_MINUTES", 60i64)
                    .clamp(0, MAX_RELEVANCE_WINDOW_MINUTES),
            },
            client: ClientConfig {
                state_dir: env::var("ANCHOR_STATE_DIR").unwrap_or(client_defaults.state_dir),
                installation_id: non_empty_env("ANCHOR_INSTALLATION_ID"),
                relevant_ttl_secs: parse_env_or(
                    "RELEVANT_NOTE_TTL_SECS",
                    client_defaults.relevant_ttl_secs,
                ),
                sweep_interval_secs: parse_env_or(
                    "EXPIRY_SWEEP_INTERVAL_SECS",
                    client_defaults.sweep_interval_secs,
                )
                .max(1),
                api_base_url: env::var("ANCHOR_API_BASE_URL")
                    .unwrap_or(client_defaults.api_base_url),
                api_token: non_empty_env("ANCHOR_API_TOKEN"),
                timeout_secs: parse_env_or("ANCHOR_API_TIMEOUT_SECS", client_defaults.timeout_secs),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

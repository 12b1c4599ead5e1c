use std::sync::Arc;

use libsql::{Builder, Connection};

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

/// Where the notes database lives, derived from `DATABASE_URL` and
/// `DATABASE_LOCAL_PATH`.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Location<'a> {
    File(&'a str),
    Remote { url: &'a str },
    /// Remote primary mirrored into a local file; needs periodic `sync`.
    Replica { path: &'a str, url: &'a str },
}

impl<'a> Location<'a> {
    fn of(config: &'a DatabaseConfig) -> Self {
        let url = config.url.as_str();
        if !(url.starts_with("libsql://") || url.starts_with("https://")) {
            return Self::File(url.strip_prefix("file:").unwrap_or(url));
        }
        match config.local_path.as_deref() {
            Some(path) => Self::Replica { path, url },
            None => Self::Remote { url },
        }
    }
}

/// Handle to the notes database. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    inner: Arc<libsql::Database>,
    busy_timeout_ms: u64,
    replica: bool,
}

impl Database {
    /// Opens the database, applies the file-level pragmas and creates any
    /// missing tables.
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        let token = config.auth_token.clone().unwrap_or_default();
        let location = Location::of(config);
        let inner = match location {
            Location::File(path) => Builder::new_local(path).build().await?,
            Location::Remote { url } => Builder::new_remote(url.to_string(), token).build().await?,
            Location::Replica { path, url } => {
                Builder::new_remote_replica(path, url.to_string(), token)
                    .build()
                    .await?
            }
        };

        let database = Self {
            inner: Arc::new(inner),
            busy_timeout_ms: config.busy_timeout_ms,
            replica: matches!(location, Location::Replica { .. }),
        };

        let conn = database.connect().await?;
        if let Location::File(path) = location {
            let journal_mode = pragma_value(&config.journal_mode, JOURNAL_MODES, "WAL");
            let synchronous = pragma_value(&config.synchronous, SYNCHRONOUS_MODES, "NORMAL");
            let pragmas =
                format!("PRAGMA journal_mode = {journal_mode}; PRAGMA synchronous = {synchronous};");
            if let Err(error) = conn.execute_batch(&pragmas).await {
                tracing::warn!(path, error = %error, "Failed to apply SQLite file pragmas");
            }
        }
        schema::init_schema(&conn).await?;

        tracing::debug!(replica = database.replica, "Notes database ready");
        Ok(database)
    }

    /// A fresh connection with foreign keys enforced and the busy timeout set.
    /// Both settings are per connection in SQLite.
    pub async fn connect(&self) -> Result<Connection> {
        let conn = self.inner.connect()?;
        let pragmas = format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            self.busy_timeout_ms
        );
        if let Err(error) = conn.execute_batch(&pragmas).await {
            tracing::warn!(
                busy_timeout_ms = self.busy_timeout_ms,
                error = %error,
                "Failed to apply connection pragmas"
            );
        }
        Ok(conn)
    }

    pub fn is_replica(&self) -> bool {
        self.replica
    }

    /// Pulls frames from the remote primary. No-op unless opened as a replica.
    pub async fn sync(&self) -> Result<()> {
        if !self.replica {
            return Ok(());
        }
        let replicated = self.inner.sync().await?;
        tracing::debug!(?replicated, "Replica synced");
        Ok(())
    }
}

const JOURNAL_MODES: &[&str] = &["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];
const SYNCHRONOUS_MODES: &[&str] = &["OFF", "NORMAL", "FULL", "EXTRA"];

/// Pragma values are interpolated into SQL, so only known keywords pass.
fn pragma_value(value: &str, allowed: &[&'static str], default: &'static str) -> &'static str {
    let wanted = value.trim();
    allowed
        .iter()
        .copied()
        .find(|mode| mode.eq_ignore_ascii_case(wanted))
        .unwrap_or(default)
}

// Common test utilities for integration tests
use std::collections::HashMap;
use std::sync::{Arc, Once};

use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use anchornotes::api::{create_router, AppState};
use anchornotes::config::{ClientConfig, Config, DatabaseConfig, RelevanceConfig, ServerConfig};
use anchornotes::db::{Database, DatabaseBackend, LibSqlBackend};

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// A server bound to an ephemeral port with its own database file.
pub struct TestServer {
    pub base_url: String,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    _dir: TempDir,
}

impl TestServer {
    pub async fn start(tokens: &[(&str, &str)]) -> Self {
        init_test_logger();

        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("anchornotes.db");
        let database = DatabaseConfig::local(db_path.to_string_lossy().into_owned());

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                api_tokens: tokens
                    .iter()
                    .map(|(t, u)| (t.to_string(), u.to_string()))
                    .collect::<HashMap<_, _>>(),
            },
            database: database.clone(),
            relevance: RelevanceConfig::default(),
            client: ClientConfig::default(),
        };

        let raw_db = Database::open(&database).await.unwrap();
        let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));
        let app = create_router(AppState::new(config, db));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
                .unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            cancel,
            handle,
            _dir: dir,
        }
    }

    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

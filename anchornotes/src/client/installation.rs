use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::Result;

const INSTALLATION_ID_FILE: &str = "installation_id";

/// Stable id for this client install. Client state is namespaced by it so
/// two installs sharing a state directory never see each other's sets.
///
/// Uses `config.installation_id` when set, otherwise reads the id stored in
/// `state_dir`, generating and saving a new one on first run.
pub fn installation_id(config: &ClientConfig) -> Result<String> {
    if let Some(id) = config
        .installation_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        return Ok(id.to_string());
    }

    let path = Path::new(&config.state_dir).join(INSTALLATION_ID_FILE);
    match fs::read_to_string(&path) {
        Ok(stored) if !stored.trim().is_empty() => return Ok(stored.trim().to_string()),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let id = Uuid::new_v4().to_string();
    fs::create_dir_all(&config.state_dir)?;
    fs::write(&path, &id)?;
    info!(installation_id = %id, "Generated new installation id");
    Ok(id)
}

/// Directory holding the persisted stores of one installation.
pub fn state_path(config: &ClientConfig, installation_id: &str) -> PathBuf {
    Path::new(&config.state_dir).join(installation_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> ClientConfig {
        ClientConfig {
            state_dir: dir.to_string_lossy().into_owned(),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn test_generated_id_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let first = installation_id(&config).unwrap();
        let second = installation_id(&config).unwrap();

        assert_eq!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn test_explicit_id_wins() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            installation_id: Some(" device-7 ".to_string()),
            ..config_in(dir.path())
        };

        assert_eq!(installation_id(&config).unwrap(), "device-7");
        assert!(!dir.path().join(INSTALLATION_ID_FILE).exists());
    }

    #[test]
    fn test_state_path_is_namespaced() {
        let config = ClientConfig {
            state_dir: "/var/lib/anchornotes".to_string(),
            ..ClientConfig::default()
        };

        assert_eq!(
            state_path(&config, "abc"),
            PathBuf::from("/var/lib/anchornotes/abc")
        );
    }
}

// rest_api/src/config.rs

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use models::medical::TransitionPolicy;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8082;
pub const DEFAULT_DATA_DIRECTORY: &str = "./data/mediconnect";
pub const DEFAULT_JWT_SECRET: &str = "mediconnect-development-secret-change-me";

pub const CONFIG_PATH_ENV: &str = "MEDICONNECT_CONFIG";
pub const PORT_ENV: &str = "MEDICONNECT_PORT";
pub const DATA_DIR_ENV: &str = "MEDICONNECT_DATA_DIR";
pub const JWT_SECRET_ENV: &str = "MEDICONNECT_JWT_SECRET";
pub const LOG_ENV: &str = "MEDICONNECT_LOG";

/// Server configuration, the `api:` section of `mediconnect.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub data_directory: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_hours: u64,
    pub seed_demo_data: bool,
    pub transition_policy: TransitionPolicy,
    /// Events buffered per dashboard session before new ones are dropped.
    pub session_buffer: usize,
    pub log_level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            data_directory: PathBuf::from(DEFAULT_DATA_DIRECTORY),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_hours: 8,
            seed_demo_data: true,
            transition_policy: TransitionPolicy::Strict,
            session_buffer: lib::notifier::DEFAULT_SESSION_BUFFER,
            log_level: "info".to_string(),
        }
    }
}

// Wrapper matching the `api:` key in the YAML file.
#[derive(Debug, Default, Deserialize)]
struct ApiConfigWrapper {
    #[serde(default)]
    api: ApiConfig,
}

impl ApiConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let wrapper: ApiConfigWrapper =
            serde_yaml2::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse API config: {}", e))?;
        Ok(wrapper.api)
    }

    /// Applies `MEDICONNECT_PORT`, `MEDICONNECT_DATA_DIR` and
    /// `MEDICONNECT_JWT_SECRET` as looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(PORT_ENV) {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("{} is not a valid port: {}", PORT_ENV, port))?;
        }
        if let Some(dir) = lookup(DATA_DIR_ENV) {
            self.data_directory = PathBuf::from(dir);
        }
        if let Some(secret) = lookup(JWT_SECRET_ENV) {
            self.jwt_secret = secret;
        }
        Ok(())
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

fn default_config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("mediconnect.yaml")
}

/// Loads `.env`, then the YAML file (path from `MEDICONNECT_CONFIG`, or
/// `mediconnect.yaml` beside this crate), then environment overrides. A
/// missing file means built-in defaults.
pub fn load_api_config(config_file_path: Option<PathBuf>) -> Result<ApiConfig> {
    dotenv::dotenv().ok();

    let path = config_file_path
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
        .unwrap_or_else(default_config_path);

    let mut config = if path.exists() {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read API config file {}", path.display()))?;
        ApiConfig::from_yaml(&content).with_context(|| format!("Invalid API config file {}", path.display()))?
    } else {
        ApiConfig::default()
    };

    config.apply_overrides(|key| std::env::var(key).ok())?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn should_fill_missing_fields_with_defaults() {
        let config = ApiConfig::from_yaml("api:\n  port: 9090\n  transition_policy: permissive\n").unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.transition_policy, TransitionPolicy::Permissive);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.token_ttl_hours, 8);
        assert!(config.seed_demo_data);
    }

    #[test]
    fn should_apply_environment_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([(PORT_ENV, "9191"), (DATA_DIR_ENV, "/tmp/mc"), (JWT_SECRET_ENV, "s3cret")]);
        let mut config = ApiConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.port, 9191);
        assert_eq!(config.data_directory, PathBuf::from("/tmp/mc"));
        assert!(!config.uses_default_secret());
    }

    #[test]
    fn should_reject_bad_port_override() {
        let mut config = ApiConfig::default();
        assert!(config
            .apply_overrides(|key| (key == PORT_ENV).then(|| "eighty".to_string()))
            .is_err());
    }

    #[test]
    fn should_parse_shipped_config() {
        let content = fs::read_to_string(default_config_path()).unwrap();
        let config = ApiConfig::from_yaml(&content).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.transition_policy, TransitionPolicy::Strict);
    }
}

use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::path::Path;

/// Listener settings shared by every service.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load `.env.local` / `.env` into the process environment, then read the
    /// optional `configuration` file overlaid with `APP__*` variables.
    pub fn load() -> Result<Self, AppError> {
        load_dotenv();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Load dotenv files from the working directory.
pub fn load_dotenv() {
    if let Ok(dir) = std::env::current_dir() {
        load_dotenv_from(&dir);
    }
}

/// `.env.local` wins over `.env`; dotenvy never overrides variables that are already set.
pub fn load_dotenv_from(dir: &Path) {
    dotenvy::from_path(dir.join(".env.local")).ok();
    dotenvy::from_path(dir.join(".env")).ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_on_all_interfaces_port_5000() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.port, 5000);

        let config: Config = serde_json::from_str(r#"{"port": 8080}"#).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn env_local_takes_precedence_over_env() {
        let suffix = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
        let shared = format!("SERVICE_CORE_DOTENV_SHARED_{}", suffix);
        let env_only = format!("SERVICE_CORE_DOTENV_ENV_ONLY_{}", suffix);

        let dir = std::env::temp_dir().join(format!("service-core-dotenv-{}", suffix));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(".env.local"), format!("{}=from-local\n", shared)).unwrap();
        std::fs::write(
            dir.join(".env"),
            format!("{}=from-env\n{}=only-in-env\n", shared, env_only),
        )
        .unwrap();

        load_dotenv_from(&dir);

        assert_eq!(std::env::var(&shared).unwrap(), "from-local");
        assert_eq!(std::env::var(&env_only).unwrap(), "only-in-env");

        std::fs::remove_dir_all(&dir).ok();
    }
}

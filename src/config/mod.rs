pub mod schema;

pub use schema::AgentConfig;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Name of the config file inside the home directory.
pub const CONFIG_FILE: &str = "legal-agent.toml";

/// Default home directory (~/.legal-agent).
pub fn default_home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".legal-agent"))
        .unwrap_or_else(|| PathBuf::from(".legal-agent"))
}

/// Load config from the given path, or return defaults.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if path.exists() {
        let contents =
            std::fs::read_to_string(path).context("Failed to read legal-agent config file")?;
        let config: AgentConfig =
            toml::from_str(&contents).context("Failed to parse legal-agent config (TOML)")?;
        Ok(config)
    } else {
        Ok(AgentConfig::default())
    }
}

/// Save config to the given path (TOML format).
pub fn save_config(config: &AgentConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents).context("Failed to write config file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let cfg = AgentConfig {
            bind_address: "0.0.0.0:8080".into(),
            ..AgentConfig::default()
        };

        save_config(&cfg, &path).unwrap();
        assert_eq!(load_config(&path).unwrap(), cfg);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "max_tokens = \"lots\"").unwrap();
        assert!(load_config(&path).is_err());
    }
}

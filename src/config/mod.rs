// Configuration management for mixtape
// Persisted defaults the CLI falls back to when flags are not given

use anyhow::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directories scanned when -d is not passed
    pub directories: Vec<PathBuf>,
    /// Default for -r/--recursive
    pub recursive: bool,
    /// Default for -u/--unique
    pub unique: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directories: vec![PathBuf::from(".")],
            recursive: false,
            unique: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content)?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("mixtape");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_creates_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixtape/config.toml");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.directories, vec![PathBuf::from(".")]);
        assert!(!config.recursive);
        assert!(path.exists());
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            directories: vec![PathBuf::from("/music")],
            recursive: true,
            unique: true,
        };
        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.directories, vec![PathBuf::from("/music")]);
        assert!(loaded.recursive);
        assert!(loaded.unique);
    }
}

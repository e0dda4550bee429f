use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

const CONFIG_FILE: &str = "config.json";
const DATABASE_FILE: &str = "mods.db";
const LOG_FILE: &str = "modlauncher.log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub base_folder: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub confirm_mod_delete: bool,
    #[serde(default)]
    pub database: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_folder: None,
            confirm_mod_delete: true,
            database: None,
        }
    }
}

impl AppConfig {
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir).context("create app data dir")?;
        let path = data_dir.join(CONFIG_FILE);
        if path.exists() {
            let raw = fs::read_to_string(&path).context("read app config")?;
            let config: AppConfig = serde_json::from_str(&raw).context("parse app config")?;
            return Ok(config);
        }

        let config = AppConfig::default();
        config.save(data_dir)?;
        Ok(config)
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir).context("create app data dir")?;
        let path = data_dir.join(CONFIG_FILE);
        let raw = serde_json::to_string_pretty(self).context("serialize app config")?;
        let temp = path.with_extension("json.tmp");
        fs::write(&temp, raw).context("write app config temp")?;
        fs::rename(&temp, &path).context("finalize app config")?;
        Ok(())
    }

    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        match &self.database {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => data_dir.join(path),
            None => data_dir.join(DATABASE_FILE),
        }
    }

    /// Falls back to the data directory when no base folder was chosen.
    pub fn base_folder_or(&self, data_dir: &Path) -> PathBuf {
        self.base_folder
            .clone()
            .filter(|path| !path.as_os_str().is_empty())
            .unwrap_or_else(|| data_dir.to_path_buf())
    }
}

pub fn log_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LOG_FILE)
}

/// Resolves the data directory, honouring an explicit override.
pub fn data_dir(override_dir: Option<&Path>) -> Result<PathBuf> {
    match override_dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => base_data_dir(),
    }
}

fn default_true() -> bool {
    true
}

fn base_data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    Ok(base.data_local_dir().join("modlauncher"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let config = AppConfig::load_or_create(&data_dir).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(data_dir.join(CONFIG_FILE).exists());
        assert_eq!(config.database_path(&data_dir), data_dir.join("mods.db"));
        assert_eq!(config.base_folder_or(&data_dir), data_dir);
    }

    #[test]
    fn saved_values_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::load_or_create(dir.path()).unwrap();
        config.base_folder = Some(PathBuf::from("/projects/b4rt"));
        config.confirm_mod_delete = false;
        config.save(dir.path()).unwrap();

        let reloaded = AppConfig::load_or_create(dir.path()).unwrap();
        assert_eq!(reloaded, config);
        assert_eq!(
            reloaded.base_folder_or(dir.path()),
            PathBuf::from("/projects/b4rt")
        );
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{}").unwrap();
        let config = AppConfig::load_or_create(dir.path()).unwrap();
        assert!(config.confirm_mod_delete);
        assert!(config.base_folder.is_none());
    }

    #[test]
    fn corrupt_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        assert!(AppConfig::load_or_create(dir.path()).is_err());
    }

    #[test]
    fn relative_database_path_lives_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        assert_eq!(config.database_path(dir.path()), dir.path().join(DATABASE_FILE));

        config.database = Some(PathBuf::from("catalog/mods.db"));
        assert_eq!(
            config.database_path(dir.path()),
            dir.path().join("catalog").join("mods.db")
        );

        let absolute = dir.path().join("elsewhere.db");
        config.database = Some(absolute.clone());
        assert_eq!(config.database_path(Path::new("/unused")), absolute);
    }
}

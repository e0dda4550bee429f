use crate::{
    activity_log::ActivityLog,
    config::{self, AppConfig},
    launcher::{self, ProcessSpawner},
    library::{ModFields, ModPath, ModRecord},
    query::{Listing, ModQuery},
    store::ModStore,
};
use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Everything one process needs to work on the catalog: settings, the open
/// store and the activity log that every mutation is written to.
pub struct Session {
    pub data_dir: PathBuf,
    pub config: AppConfig,
    pub store: ModStore,
    pub log: ActivityLog,
}

impl Session {
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        let config = AppConfig::load_or_create(&data_dir)?;
        let log = ActivityLog::new(config::log_path(&data_dir));
        let db_path = config.database_path(&data_dir);
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).context("create database dir")?;
        }
        let store = ModStore::open(&db_path)
            .with_context(|| format!("open database {}", db_path.display()))?;
        let mut session = Self {
            data_dir,
            config,
            store,
            log,
        };
        session.log_migration(&db_path);
        Ok(session)
    }

    #[cfg(test)]
    pub(crate) fn in_memory(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            config: AppConfig::default(),
            store: ModStore::open_in_memory().expect("in-memory store"),
            log: ActivityLog::detached(),
        }
    }

    fn log_migration(&mut self, db_path: &Path) {
        let report = self.store.migration().clone();
        if report.is_noop() {
            return;
        }
        if report.created_table {
            self.log
                .info(format!("Database created: {}", db_path.display()));
        } else if !report.added_columns.is_empty() {
            self.log.info(format!(
                "Database upgraded: added {}",
                report.added_columns.join(", ")
            ));
        }
    }

    pub fn listing(&self, query: ModQuery) -> Result<Listing> {
        self.store.listing(query).context("load mod list")
    }

    pub fn categories(&self) -> Result<Vec<String>> {
        self.store
            .distinct_categories()
            .context("load categories")
    }

    pub fn require(&self, id: i64) -> Result<ModRecord> {
        Ok(self.store.require(id)?)
    }

    pub fn add_mod(&mut self, fields: &ModFields) -> Result<i64> {
        match self.store.create(fields) {
            Ok(id) => {
                self.log
                    .info(format!("Mod added: {} (#{id})", fields.name.trim()));
                Ok(id)
            }
            Err(err) => {
                self.log.error(format!("Add failed: {err}"));
                Err(err.into())
            }
        }
    }

    pub fn edit_mod(&mut self, id: i64, fields: &ModFields) -> Result<()> {
        match self.store.update(id, fields) {
            Ok(()) => {
                self.log
                    .info(format!("Mod updated: {} (#{id})", fields.name.trim()));
                Ok(())
            }
            Err(err) => {
                self.log.error(format!("Edit failed: {err}"));
                Err(err.into())
            }
        }
    }

    /// Returns false when no mod had that id.
    pub fn delete_mod(&mut self, id: i64) -> Result<bool> {
        let deleted = self.store.get(id).and_then(|record| {
            let removed = self.store.delete(id)?;
            Ok(record.filter(|_| removed).map(|record| record.fields.name))
        });
        match deleted {
            Ok(Some(name)) => {
                self.log.info(format!("Mod deleted: {name} (#{id})"));
                Ok(true)
            }
            Ok(None) => {
                self.log.warn(format!("Delete skipped: no mod with id {id}"));
                Ok(false)
            }
            Err(err) => {
                self.log.error(format!("Delete failed: {err}"));
                Err(err.into())
            }
        }
    }

    /// Starts the mod's script and returns the recorded start time.
    pub fn run_mod(&mut self, spawner: &mut impl ProcessSpawner, id: i64) -> Result<i64> {
        let record = self.require(id)?;
        match launcher::run_mod(&self.store, spawner, &record) {
            Ok(started_at) => {
                self.log.info(format!("Mod started: {}", record.name()));
                Ok(started_at)
            }
            Err(err) => {
                self.log
                    .error(format!("Run failed for {}: {err}", record.name()));
                Err(err.into())
            }
        }
    }

    pub fn open_mod_path(
        &mut self,
        spawner: &mut impl ProcessSpawner,
        id: i64,
        which: ModPath,
    ) -> Result<PathBuf> {
        let record = self.require(id)?;
        match launcher::open_mod_path(spawner, &record, which) {
            Ok(path) => {
                self.log.info(format!(
                    "Opened {} for {}: {}",
                    which.label(),
                    record.name(),
                    path.display()
                ));
                Ok(path)
            }
            Err(err) => {
                self.log.error(format!("Open failed: {err}"));
                Err(err.into())
            }
        }
    }

    pub fn base_folder(&self) -> PathBuf {
        self.config.base_folder_or(&self.data_dir)
    }

    pub fn open_base_folder(&mut self, spawner: &mut impl ProcessSpawner) -> Result<PathBuf> {
        let folder = self.base_folder();
        match launcher::open_existing(spawner, &folder.to_string_lossy(), "base folder") {
            Ok(path) => {
                self.log
                    .info(format!("Opened base folder: {}", path.display()));
                Ok(path)
            }
            Err(err) => {
                self.log.error(format!("Open failed: {err}"));
                Err(err.into())
            }
        }
    }

    /// Stores a new base folder; the folder must already exist.
    pub fn set_base_folder(&mut self, raw: &str) -> Result<PathBuf> {
        let path = launcher::resolve_existing(raw, "base folder")?;
        if !path.is_dir() {
            anyhow::bail!("base folder is not a directory: {}", path.display());
        }
        self.config.base_folder = Some(path.clone());
        self.config.save(&self.data_dir)?;
        self.log
            .info(format!("Base folder set: {}", path.display()));
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        activity_log::LogLevel,
        error::{LaunchError, StoreError},
        launcher::FakeSpawner,
        library::STATUS_RUNNING,
    };

    #[test]
    fn open_creates_database_and_logs_it() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::open(dir.path().join("data")).unwrap();
        assert!(dir.path().join("data").join("mods.db").exists());
        assert!(session.store.migration().created_table);
        assert!(session.log.entries()[0]
            .message
            .starts_with("Database created"));

        drop(session);
        let reopened = Session::open(dir.path().join("data")).unwrap();
        assert!(reopened.log.entries().is_empty());
    }

    #[test]
    fn mutations_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::in_memory(dir.path().to_path_buf());
        let id = session.add_mod(&ModFields::named("Jump Cycle")).unwrap();
        let mut fields = session.require(id).unwrap().fields;
        fields.version = "1.1".to_string();
        session.edit_mod(id, &fields).unwrap();
        assert!(session.delete_mod(id).unwrap());
        assert!(!session.delete_mod(id).unwrap());

        let messages: Vec<&str> = session
            .log
            .entries()
            .iter()
            .map(|entry| entry.message.as_str())
            .collect();
        assert_eq!(
            messages,
            vec![
                "Mod added: Jump Cycle (#1)",
                "Mod updated: Jump Cycle (#1)",
                "Mod deleted: Jump Cycle (#1)",
                "Delete skipped: no mod with id 1",
            ]
        );
    }

    #[test]
    fn delete_surfaces_storage_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::in_memory(dir.path().to_path_buf());
        let id = session.add_mod(&ModFields::named("Jump Cycle")).unwrap();
        session
            .store
            .connection()
            .execute_batch("DROP TABLE mods")
            .unwrap();

        let err = session.delete_mod(id).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::Storage(_))
        ));
        let last = session.log.entries().last().unwrap();
        assert_eq!(last.level, LogLevel::Error);
        assert!(last.message.starts_with("Delete failed"));
    }

    #[test]
    fn failed_add_is_logged_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::in_memory(dir.path().to_path_buf());
        let err = session.add_mod(&ModFields::named("   ")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::Validation(_))
        ));
        assert_eq!(session.log.entries()[0].level, LogLevel::Error);
        assert_eq!(session.store.count().unwrap(), 0);
    }

    #[test]
    fn run_marks_mod_running() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("start.sh");
        fs::write(&script, "echo hi\n").unwrap();
        let mut session = Session::in_memory(dir.path().to_path_buf());
        let mut fields = ModFields::named("Jump Cycle");
        fields.bat_path = script.to_string_lossy().into_owned();
        let id = session.add_mod(&fields).unwrap();

        let mut spawner = FakeSpawner::default();
        let started_at = session.run_mod(&mut spawner, id).unwrap();
        let record = session.require(id).unwrap();
        assert_eq!(record.fields.status, STATUS_RUNNING);
        assert_eq!(record.fields.last_run, started_at);
        assert_eq!(spawner.calls.len(), 1);
    }

    #[test]
    fn run_with_missing_script_reports_launch_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::in_memory(dir.path().to_path_buf());
        let mut fields = ModFields::named("Ghost");
        fields.bat_path = dir.path().join("gone.bat").to_string_lossy().into_owned();
        let id = session.add_mod(&fields).unwrap();

        let err = session.run_mod(&mut FakeSpawner::default(), id).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LaunchError>(),
            Some(LaunchError::PathMissing { .. })
        ));
        assert!(!session.require(id).unwrap().fields.has_run());
    }

    #[test]
    fn base_folder_defaults_to_data_dir_and_can_be_set() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let project = dir.path().join("projects");
        fs::create_dir_all(&project).unwrap();
        let mut session = Session::open(data_dir.clone()).unwrap();
        assert_eq!(session.base_folder(), data_dir);

        session
            .set_base_folder(&project.to_string_lossy())
            .unwrap();
        assert_eq!(session.base_folder(), project);
        assert_eq!(
            AppConfig::load_or_create(&data_dir).unwrap().base_folder,
            Some(project.clone())
        );

        let mut spawner = FakeSpawner::default();
        assert_eq!(session.open_base_folder(&mut spawner).unwrap(), project);
        assert_eq!(spawner.calls.len(), 1);
    }

    #[test]
    fn base_folder_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::in_memory(dir.path().to_path_buf());
        let missing = dir.path().join("nope");
        assert!(session
            .set_base_folder(&missing.to_string_lossy())
            .is_err());
        assert!(session.config.base_folder.is_none());
    }
}

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use time::{OffsetDateTime, UtcOffset};

pub const STATUS_READY: &str = "Ready";
pub const STATUS_RUNNING: &str = "Running";

/// A persisted mod entry. `id` is assigned by the store and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModRecord {
    pub id: i64,
    #[serde(flatten)]
    pub fields: ModFields,
}

impl ModRecord {
    pub fn name(&self) -> &str {
        &self.fields.name
    }

    pub fn path(&self, which: ModPath) -> &str {
        self.fields.path(which)
    }
}

/// Every mutable column of a mod. Edits replace the whole set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModFields {
    pub name: String,
    pub version: String,
    pub category: String,
    pub cover_path: String,
    pub bat_path: String,
    pub blend_path: String,
    pub work_path: String,
    pub status: String,
    pub last_run: i64,
}

impl Default for ModFields {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: String::new(),
            category: String::new(),
            cover_path: String::new(),
            bat_path: String::new(),
            blend_path: String::new(),
            work_path: String::new(),
            status: STATUS_READY.to_string(),
            last_run: 0,
        }
    }
}

impl ModFields {
    #[cfg(test)]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Trims every text column; a blank status falls back to "Ready".
    pub fn normalized(mut self) -> Self {
        for value in [
            &mut self.name,
            &mut self.version,
            &mut self.category,
            &mut self.cover_path,
            &mut self.bat_path,
            &mut self.blend_path,
            &mut self.work_path,
            &mut self.status,
        ] {
            let trimmed = value.trim();
            if trimmed.len() != value.len() {
                *value = trimmed.to_string();
            }
        }
        if self.status.is_empty() {
            self.status = STATUS_READY.to_string();
        }
        self
    }

    pub fn validate(&self, now: i64) -> StoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(StoreError::validation("name is required"));
        }
        validate_last_run(self.last_run, now)
    }

    pub fn path(&self, which: ModPath) -> &str {
        match which {
            ModPath::Cover => &self.cover_path,
            ModPath::Script => &self.bat_path,
            ModPath::Blend => &self.blend_path,
            ModPath::WorkFolder => &self.work_path,
        }
    }

    pub fn has_run(&self) -> bool {
        self.last_run > 0
    }

    pub fn last_run_label(&self) -> String {
        format_timestamp(self.last_run).unwrap_or_default()
    }
}

pub(crate) fn validate_last_run(last_run: i64, now: i64) -> StoreResult<()> {
    if last_run < 0 {
        return Err(StoreError::validation(format!(
            "last run timestamp {last_run} is negative"
        )));
    }
    if last_run > now {
        return Err(StoreError::validation(format!(
            "last run timestamp {last_run} is in the future"
        )));
    }
    Ok(())
}

/// The path columns a user can open or launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModPath {
    Cover,
    Script,
    Blend,
    WorkFolder,
}

impl ModPath {
    pub fn label(self) -> &'static str {
        match self {
            ModPath::Cover => "cover image",
            ModPath::Script => "script",
            ModPath::Blend => "blend file",
            ModPath::WorkFolder => "project folder",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cover" | "image" => Some(ModPath::Cover),
            "script" | "bat" => Some(ModPath::Script),
            "blend" => Some(ModPath::Blend),
            "work" | "folder" | "project" => Some(ModPath::WorkFolder),
            _ => None,
        }
    }
}

pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs() as i64)
        .unwrap_or_default()
}

/// Local `YYYY-MM-DD HH:MM`, or `None` for the never-run sentinel.
pub fn format_timestamp(timestamp: i64) -> Option<String> {
    if timestamp <= 0 {
        return None;
    }
    let utc = OffsetDateTime::from_unix_timestamp(timestamp).ok()?;
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    utc.to_offset(offset)
        .format(time::macros::format_description!(
            "[year]-[month]-[day] [hour]:[minute]"
        ))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_ready_and_never_run() {
        let fields = ModFields::named("Jump Cycle");
        assert_eq!(fields.status, STATUS_READY);
        assert_eq!(fields.last_run, 0);
        assert!(!fields.has_run());
        assert_eq!(fields.version, "");
        assert_eq!(fields.last_run_label(), "");
    }

    #[test]
    fn normalized_trims_text_and_restores_status() {
        let fields = ModFields {
            name: "  Rig Setup ".to_string(),
            category: " Rigging".to_string(),
            work_path: "/tmp/rig  ".to_string(),
            status: "   ".to_string(),
            ..ModFields::default()
        }
        .normalized();
        assert_eq!(fields.name, "Rig Setup");
        assert_eq!(fields.category, "Rigging");
        assert_eq!(fields.work_path, "/tmp/rig");
        assert_eq!(fields.status, STATUS_READY);
    }

    #[test]
    fn validate_requires_a_name() {
        let err = ModFields::named("   ").validate(now_unix()).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn validate_rejects_bad_timestamps() {
        let now = 1_700_000_000;
        let mut fields = ModFields::named("Idle Loop");
        fields.last_run = -5;
        assert!(matches!(fields.validate(now), Err(StoreError::Validation(_))));
        fields.last_run = now + 60;
        assert!(matches!(fields.validate(now), Err(StoreError::Validation(_))));
        fields.last_run = now;
        assert!(fields.validate(now).is_ok());
    }

    #[test]
    fn mod_path_parse_accepts_aliases() {
        assert_eq!(ModPath::parse("Blend"), Some(ModPath::Blend));
        assert_eq!(ModPath::parse("bat"), Some(ModPath::Script));
        assert_eq!(ModPath::parse("folder"), Some(ModPath::WorkFolder));
        assert_eq!(ModPath::parse("cover"), Some(ModPath::Cover));
        assert_eq!(ModPath::parse("texture"), None);
    }

    #[test]
    fn format_timestamp_has_minute_precision() {
        assert_eq!(format_timestamp(0), None);
        let label = format_timestamp(1_700_000_000).unwrap();
        assert_eq!(label.len(), "2023-11-14 22:13".len());
        assert!(label.starts_with("2023-11-1"));
    }
}

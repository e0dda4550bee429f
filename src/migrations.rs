//! Additive schema migration for the `mods` table.
//!
//! The first release stored only name, cover, script, status and last run.
//! Newer columns are appended with their defaults so old databases keep every
//! existing value.

use crate::error::StoreResult;
use rusqlite::Connection;

pub const TABLE_MODS: &str = "mods";

/// Bumped whenever a column is appended below.
pub const SCHEMA_VERSION: i64 = 2;

const CREATE_MODS: &str = r#"
    CREATE TABLE IF NOT EXISTS mods (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        cover_path TEXT NOT NULL DEFAULT '',
        bat_path TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'Ready',
        last_run INTEGER NOT NULL DEFAULT 0
    )
"#;

/// Columns introduced after the original table, in the order they shipped.
const ADDED_COLUMNS: &[(&str, &str)] = &[
    ("version", "TEXT NOT NULL DEFAULT ''"),
    ("category", "TEXT NOT NULL DEFAULT ''"),
    ("blend_path", "TEXT NOT NULL DEFAULT ''"),
    ("work_path", "TEXT NOT NULL DEFAULT ''"),
];

/// Text columns that must never read back as NULL.
const TEXT_COLUMNS: &[(&str, &str)] = &[
    ("cover_path", "''"),
    ("bat_path", "''"),
    ("status", "'Ready'"),
    ("version", "''"),
    ("category", "''"),
    ("blend_path", "''"),
    ("work_path", "''"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub created_table: bool,
    pub added_columns: Vec<&'static str>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        !self.created_table && self.added_columns.is_empty()
    }
}

pub struct MigrationManager;

impl MigrationManager {
    /// Brings the schema up to date. Safe to call on every start.
    pub fn migrate(conn: &Connection) -> StoreResult<MigrationReport> {
        let tx = conn.unchecked_transaction()?;
        let mut report = MigrationReport {
            created_table: !Self::table_exists(&tx, TABLE_MODS)?,
            added_columns: Vec::new(),
        };

        tx.execute_batch(CREATE_MODS)?;

        for (column, definition) in ADDED_COLUMNS {
            if !Self::column_exists(&tx, TABLE_MODS, column)? {
                tx.execute_batch(&format!(
                    "ALTER TABLE {TABLE_MODS} ADD COLUMN {column} {definition}"
                ))?;
                report.added_columns.push(*column);
            }
        }

        for (column, default) in TEXT_COLUMNS {
            tx.execute(
                &format!("UPDATE {TABLE_MODS} SET {column} = {default} WHERE {column} IS NULL"),
                [],
            )?;
        }
        tx.execute(
            &format!("UPDATE {TABLE_MODS} SET last_run = 0 WHERE last_run IS NULL"),
            [],
        )?;

        if Self::current_version(&tx)? < SCHEMA_VERSION {
            tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }

        tx.commit()?;
        Ok(report)
    }

    pub fn current_version(conn: &Connection) -> StoreResult<i64> {
        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        Ok(version)
    }

    pub fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn column_exists(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
        Ok(Self::columns(conn, table)?.iter().any(|name| name == column))
    }

    pub fn columns(conn: &Connection, table: &str) -> StoreResult<Vec<String>> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    fn schema_snapshot(conn: &Connection) -> Vec<(String, String, i64, Option<String>)> {
        let mut stmt = conn.prepare("PRAGMA table_info(mods)").unwrap();
        stmt.query_map([], |row| {
            Ok((row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
    }

    fn legacy_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE mods (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                cover_path TEXT NOT NULL DEFAULT '',
                bat_path TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'Ready',
                last_run INTEGER NOT NULL DEFAULT 0
            );
            INSERT INTO mods (name, cover_path, bat_path, status, last_run)
                VALUES ('Dragon Pose', 'C:/covers/dragon.png', 'C:/mods/dragon.bat', 'Running', 1690000000);
            INSERT INTO mods (name) VALUES ('Walk Cycle');
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn fresh_database_gets_full_schema() {
        let conn = Connection::open_in_memory().unwrap();
        let report = MigrationManager::migrate(&conn).unwrap();
        assert!(report.created_table);
        assert_eq!(
            report.added_columns,
            vec!["version", "category", "blend_path", "work_path"]
        );
        let columns = MigrationManager::columns(&conn, TABLE_MODS).unwrap();
        assert_eq!(
            columns,
            vec![
                "id",
                "name",
                "cover_path",
                "bat_path",
                "status",
                "last_run",
                "version",
                "category",
                "blend_path",
                "work_path"
            ]
        );
        assert_eq!(MigrationManager::current_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn second_run_is_a_noop() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::migrate(&conn).unwrap();
        let before = schema_snapshot(&conn);

        let report = MigrationManager::migrate(&conn).unwrap();
        assert!(report.is_noop());
        assert_eq!(schema_snapshot(&conn), before);
        assert_eq!(MigrationManager::current_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn legacy_rows_are_backfilled_without_touching_existing_values() {
        let conn = legacy_db();
        let report = MigrationManager::migrate(&conn).unwrap();
        assert!(!report.created_table);
        assert_eq!(report.added_columns.len(), 4);

        let mut stmt = conn
            .prepare(
                "SELECT id, name, status, last_run, version, category, blend_path, work_path \
                 FROM mods ORDER BY id",
            )
            .unwrap();
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        let (id, name, status, last_run, version, category, blend, work) = &rows[0];
        assert_eq!(*id, 1);
        assert_eq!(name, "Dragon Pose");
        assert_eq!(status, "Running");
        assert_eq!(*last_run, 1_690_000_000);
        assert_eq!((version.as_str(), category.as_str()), ("", ""));
        assert_eq!((blend.as_str(), work.as_str()), ("", ""));

        let (id, name, status, last_run, ..) = &rows[1];
        assert_eq!(*id, 2);
        assert_eq!(name, "Walk Cycle");
        assert_eq!(status, "Ready");
        assert_eq!(*last_run, 0);
    }

    #[test]
    fn partially_migrated_database_only_gains_missing_columns() {
        let conn = legacy_db();
        conn.execute_batch("ALTER TABLE mods ADD COLUMN version TEXT NOT NULL DEFAULT ''")
            .unwrap();
        conn.execute(
            "UPDATE mods SET version = ?1 WHERE id = 1",
            params!["1.2"],
        )
        .unwrap();

        let report = MigrationManager::migrate(&conn).unwrap();
        assert_eq!(
            report.added_columns,
            vec!["category", "blend_path", "work_path"]
        );
        let version: String = conn
            .query_row("SELECT version FROM mods WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, "1.2");
    }

    #[test]
    fn null_text_values_are_normalised() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE mods (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                cover_path TEXT,
                bat_path TEXT,
                status TEXT,
                last_run INTEGER
            );
            INSERT INTO mods (name) VALUES ('Hand Rig');
            "#,
        )
        .unwrap();

        MigrationManager::migrate(&conn).unwrap();
        let (cover, status, last_run): (String, String, i64) = conn
            .query_row(
                "SELECT cover_path, status, last_run FROM mods WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(cover, "");
        assert_eq!(status, "Ready");
        assert_eq!(last_run, 0);
    }
}

use crate::{
    error::{StoreError, StoreResult},
    library::{now_unix, validate_last_run, ModFields, ModRecord},
    migrations::{MigrationManager, MigrationReport},
    query::{self, Listing, ModQuery},
};
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use std::path::Path;

const SELECT_MODS: &str = "SELECT id, name, version, category, cover_path, bat_path, \
     blend_path, work_path, status, last_run FROM mods";

/// Sole owner of the persisted mod collection.
///
/// Every mutating call is a single statement, so it either applies fully or
/// not at all.
pub struct ModStore {
    conn: Connection,
    migration: MigrationReport,
}

impl ModStore {
    /// Opens (or creates) the database file and migrates it.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> StoreResult<Self> {
        let migration = MigrationManager::migrate(&conn)?;
        Ok(Self { conn, migration })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// What the startup migration changed.
    pub fn migration(&self) -> &MigrationReport {
        &self.migration
    }

    pub fn create(&self, fields: &ModFields) -> StoreResult<i64> {
        let fields = fields.clone().normalized();
        fields.validate(now_unix())?;
        self.conn.execute(
            r#"
            INSERT INTO mods (name, version, category, cover_path, bat_path, blend_path, work_path, status, last_run)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                fields.name,
                fields.version,
                fields.category,
                fields.cover_path,
                fields.bat_path,
                fields.blend_path,
                fields.work_path,
                fields.status,
                fields.last_run,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Replaces every mutable column. Unknown ids fail with `NotFound`.
    ///
    /// A stored `last_run` ahead of the local clock may be written back
    /// unchanged; only newer future values are rejected.
    pub fn update(&self, id: i64, fields: &ModFields) -> StoreResult<()> {
        let fields = fields.clone().normalized();
        let current = self.require(id)?;
        fields.validate(now_unix().max(current.fields.last_run))?;
        let changed = self.conn.execute(
            r#"
            UPDATE mods
               SET name = ?1, version = ?2, category = ?3, cover_path = ?4, bat_path = ?5,
                   blend_path = ?6, work_path = ?7, status = ?8, last_run = ?9
             WHERE id = ?10
            "#,
            params![
                fields.name,
                fields.version,
                fields.category,
                fields.cover_path,
                fields.bat_path,
                fields.blend_path,
                fields.work_path,
                fields.status,
                fields.last_run,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    /// Returns whether a row was removed. Unknown ids are not an error.
    pub fn delete(&self, id: i64) -> StoreResult<bool> {
        let removed = self.conn.execute("DELETE FROM mods WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    /// Touches only `status` and `last_run`.
    pub fn set_run_status(&self, id: i64, status: &str, timestamp: i64) -> StoreResult<()> {
        validate_last_run(timestamp, now_unix())?;
        let status = status.trim();
        if status.is_empty() {
            return Err(StoreError::validation("status is required"));
        }
        let changed = self.conn.execute(
            "UPDATE mods SET status = ?1, last_run = ?2 WHERE id = ?3",
            params![status, timestamp, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    pub fn get(&self, id: i64) -> StoreResult<Option<ModRecord>> {
        let record = self
            .conn
            .query_row(&format!("{SELECT_MODS} WHERE id = ?1"), [id], record_from_row)
            .optional()?;
        Ok(record)
    }

    pub fn require(&self, id: i64) -> StoreResult<ModRecord> {
        self.get(id)?.ok_or(StoreError::NotFound(id))
    }

    /// Filtered listing in name order. The category match runs in SQL, the
    /// name match and ordering in [`ModQuery::apply`].
    pub fn get_all(&self, query: &ModQuery) -> StoreResult<Vec<ModRecord>> {
        let records = match query.category.as_exact() {
            Some(category) => {
                self.select(&format!("{SELECT_MODS} WHERE category = ?1"), [category])?
            }
            None => self.select(SELECT_MODS, [])?,
        };
        Ok(query.apply(records))
    }

    fn select<P: Params>(&self, sql: &str, params: P) -> StoreResult<Vec<ModRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let records = stmt
            .query_map(params, record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn listing(&self, query: ModQuery) -> StoreResult<Listing> {
        let records = self.get_all(&query)?;
        Ok(Listing { query, records })
    }

    pub fn distinct_categories(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT category FROM mods")?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(query::distinct_categories(values))
    }

    pub fn count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM mods", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ModRecord> {
    Ok(ModRecord {
        id: row.get(0)?,
        fields: ModFields {
            name: row.get(1)?,
            version: row.get(2)?,
            category: row.get(3)?,
            cover_path: row.get(4)?,
            bat_path: row.get(5)?,
            blend_path: row.get(6)?,
            work_path: row.get(7)?,
            status: row.get(8)?,
            last_run: row.get(9)?,
        },
    })
}

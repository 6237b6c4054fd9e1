use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::warn;

use crate::db::{AppGroup, GroupAssignment, GroupColor, GroupId};

/// Minimum schema version we know how to handle.
///
/// `0` means "no schema yet" (fresh DB).
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
pub const CURRENT_SCHEMA_VERSION: i32 = 3;

/// Error type for group database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Underlying SQLite error.
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The database was created with a newer schema version than we support.
    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },
}

/// Convenience result type for DB operations.
pub type DbResult<T> = Result<T, DbError>;

/// SQLite-backed group store.
///
/// Thin wrapper around `rusqlite::Connection` that:
/// - Opens/creates the DB file and applies schema migrations.
/// - Runs every mutation in its own transaction, committed before returning.
#[derive(Debug)]
pub struct GroupDb {
    conn: Connection,
}

impl GroupDb {
    /// Open (or create) a group database at the given path and ensure the schema exists.
    pub fn open(path: &Path) -> DbResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Private in-memory database, mainly for tests.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> DbResult<Self> {
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Expose a reference to the underlying connection for advanced callers.
    /// For most code, prefer higher-level helpers.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn schema_version(&self) -> DbResult<i32> {
        current_schema_version(&self.conn)
    }

    /// List all groups (ordered by id).
    pub fn list_groups(&self) -> DbResult<Vec<AppGroup>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, display_name, color
            FROM groups
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            let id: i64 = row.get(0)?;
            let color: Option<String> = row.get(2)?;
            Ok((GroupId::new(id), row.get::<_, String>(1)?, color))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, display_name, color) = row?;
            let color = match color.map(|c| c.parse::<GroupColor>()) {
                Some(Ok(color)) => Some(color),
                Some(Err(err)) => {
                    warn!(group = %id, error = %err, "ignoring stored group color");
                    None
                }
                None => None,
            };
            out.push(AppGroup { id, display_name, color });
        }
        Ok(out)
    }

    /// List all assignments (ordered by identity key).
    pub fn list_assignments(&self) -> DbResult<Vec<GroupAssignment>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT identity_key, group_id
            FROM assignments
            ORDER BY identity_key
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(GroupAssignment { identity_key: row.get(0)?, group_id: GroupId::new(row.get(1)?) })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Insert a group and return its fresh id.
    pub fn insert_group(
        &mut self,
        display_name: &str,
        color: Option<&GroupColor>,
    ) -> DbResult<GroupId> {
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO groups (display_name, color)
            VALUES (?1, ?2)
            "#,
            params![display_name, color.map(GroupColor::as_str)],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(GroupId::new(id))
    }

    /// Rename a group. Returns the number of rows affected.
    pub fn rename_group(&mut self, id: GroupId, display_name: &str) -> DbResult<usize> {
        let tx = self.conn.transaction()?;
        let affected = tx.execute(
            "UPDATE groups SET display_name = ?1 WHERE id = ?2",
            params![display_name, id.get()],
        )?;
        tx.commit()?;
        Ok(affected)
    }

    /// Set or clear a group's colour. Returns the number of rows affected.
    pub fn set_group_color(&mut self, id: GroupId, color: Option<&GroupColor>) -> DbResult<usize> {
        let tx = self.conn.transaction()?;
        let affected = tx.execute(
            "UPDATE groups SET color = ?1 WHERE id = ?2",
            params![color.map(GroupColor::as_str), id.get()],
        )?;
        tx.commit()?;
        Ok(affected)
    }

    /// Delete a group and every assignment to it in one transaction.
    /// Returns the number of assignments cleared.
    pub fn delete_group(&mut self, id: GroupId) -> DbResult<usize> {
        let tx = self.conn.transaction()?;
        let cleared = tx.execute("DELETE FROM assignments WHERE group_id = ?1", params![id.get()])?;
        tx.execute("DELETE FROM groups WHERE id = ?1", params![id.get()])?;
        tx.commit()?;
        Ok(cleared)
    }

    /// Assign (or reassign) an identity key to a group.
    pub fn upsert_assignment(&mut self, identity_key: &str, group_id: GroupId) -> DbResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO assignments (identity_key, group_id)
            VALUES (?1, ?2)
            ON CONFLICT(identity_key) DO UPDATE SET group_id = excluded.group_id
            "#,
            params![identity_key, group_id.get()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Remove an assignment. Returns whether one existed.
    pub fn delete_assignment(&mut self, identity_key: &str) -> DbResult<bool> {
        let tx = self.conn.transaction()?;
        let affected =
            tx.execute("DELETE FROM assignments WHERE identity_key = ?1", params![identity_key])?;
        tx.commit()?;
        Ok(affected > 0)
    }

    /// Group currently assigned to `identity_key`, read straight from disk.
    pub fn assignment_for(&self, identity_key: &str) -> DbResult<Option<GroupId>> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT group_id FROM assignments WHERE identity_key = ?1",
                params![identity_key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(GroupId::new))
    }

    /// Drop assignments whose group no longer exists. Returns how many went.
    pub fn prune_orphan_assignments(&mut self) -> DbResult<usize> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM assignments WHERE group_id NOT IN (SELECT id FROM groups)",
            [],
        )?;
        tx.commit()?;
        Ok(removed)
    }
}

/// Apply schema migrations to bring the database to the latest version.
///
/// We use `PRAGMA user_version` as the schema version indicator.
///
/// Version map:
/// - 0: no schema
/// - 1: groups + assignments
/// - 2: add color column to groups (guarded in code)
/// - 3: index assignments by group
fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let mut current_version = current_schema_version(conn)?;

    // Reject DBs created with a newer schema than we support.
    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version == 0 {
        // Initial schema. No FK constraint on assignments: orphans are pruned
        // on load so a hand-edited file still opens.
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS groups (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                display_name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS assignments (
                identity_key TEXT PRIMARY KEY NOT NULL,
                group_id     INTEGER NOT NULL
            );

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
        current_version = 1;
    }

    if current_version < 2 {
        let has_color = column_exists(conn, "groups", "color")?;
        if !has_color {
            conn.execute("ALTER TABLE groups ADD COLUMN color TEXT;", [])?;
        }
        conn.execute("PRAGMA user_version = 2;", [])?;
        current_version = 2;
    }

    if current_version < 3 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE INDEX IF NOT EXISTS idx_assignments_group ON assignments(group_id);
            PRAGMA user_version = 3;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

/// Read the SQLite schema version from `PRAGMA user_version`.
fn current_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> DbResult<bool> {
    let pragma = format!("PRAGMA table_info({table});");
    let mut stmt = conn.prepare(&pragma)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in rows {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Every collection is one row holding the whole collection as JSON.
//! Reads fall back to a caller-supplied default; writes replace the
//! whole collection and bump its revision.

use crate::error::DeskResult;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

mod student;
mod target;

const KEY_PREFIX: &str = "educrm_";

/// Every collection the dashboard persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Students,
    Groups,
    Transactions,
    Lessons,
    Teachers,
    Violations,
    Calls,
    Enrollments,
    ExamResults,
    Attendance,
    SubjectTargets,
}

impl StoreKey {
    pub const ALL: [StoreKey; 11] = [
        StoreKey::Students,
        StoreKey::Groups,
        StoreKey::Transactions,
        StoreKey::Lessons,
        StoreKey::Teachers,
        StoreKey::Violations,
        StoreKey::Calls,
        StoreKey::Enrollments,
        StoreKey::ExamResults,
        StoreKey::Attendance,
        StoreKey::SubjectTargets,
    ];

    fn name(self) -> &'static str {
        match self {
            StoreKey::Students       => "students",
            StoreKey::Groups         => "groups",
            StoreKey::Transactions   => "transactions",
            StoreKey::Lessons        => "lessons",
            StoreKey::Teachers       => "teachers",
            StoreKey::Violations     => "violations",
            StoreKey::Calls          => "calls",
            StoreKey::Enrollments    => "enrollments",
            StoreKey::ExamResults    => "exam_results",
            StoreKey::Attendance     => "attendance",
            StoreKey::SubjectTargets => "subject_targets",
        }
    }

    /// The row key, e.g. `educrm_students`.
    pub fn as_key(self) -> String {
        format!("{KEY_PREFIX}{}", self.name())
    }
}

pub struct DeskStore {
    conn: Connection,
}

impl DeskStore {
    pub fn open(path: &str) -> DeskResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> DeskResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DeskResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Keyed collections ──────────────────────────────────────

    /// Read a collection, or `default` when it is missing or unreadable.
    pub fn get<T: DeserializeOwned>(&self, key: StoreKey, default: T) -> T {
        let raw = match self.read_raw(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(e) => {
                log::warn!("store: error reading {}: {e}", key.as_key());
                return default;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("store: {} is not decodable, using default: {e}", key.as_key());
                default
            }
        }
    }

    /// Read a collection element by element. Elements that do not decode
    /// are skipped with a warning; the rest of the collection survives.
    pub fn get_each<T: DeserializeOwned>(&self, key: StoreKey) -> Vec<T> {
        let items: Vec<Value> = self.get(key, Vec::new());
        let total = items.len();
        let decoded: Vec<T> = items
            .into_iter()
            .enumerate()
            .filter_map(|(i, item)| match serde_json::from_value(item) {
                Ok(value) => Some(value),
                Err(e) => {
                    log::warn!("store: skipping {}[{i}]: {e}", key.as_key());
                    None
                }
            })
            .collect();
        if decoded.len() < total {
            log::warn!(
                "store: {} of {total} entries in {} were unreadable",
                total - decoded.len(),
                key.as_key()
            );
        }
        decoded
    }

    /// Replace a whole collection.
    pub fn set<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) -> DeskResult<()> {
        let json = serde_json::to_string(value)?;
        self.write_raw(key, &json)
    }

    /// Store a raw JSON blob without re-encoding it.
    pub fn write_raw(&self, key: StoreKey, json: &str) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO collection (key, value_json, revision, updated_at)
             VALUES (?1, ?2, 1, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value_json = excluded.value_json,
                revision   = collection.revision + 1,
                updated_at = excluded.updated_at",
            params![key.as_key(), json, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn read_raw(&self, key: StoreKey) -> DeskResult<Option<String>> {
        let raw = self
            .conn
            .query_row(
                "SELECT value_json FROM collection WHERE key = ?1",
                params![key.as_key()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(raw)
    }

    /// Number of writes to a collection; 0 when it has never been written.
    pub fn revision(&self, key: StoreKey) -> DeskResult<i64> {
        let revision = self
            .conn
            .query_row(
                "SELECT revision FROM collection WHERE key = ?1",
                params![key.as_key()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(revision.unwrap_or(0))
    }

    /// Remove every known collection.
    pub fn clear(&self) -> DeskResult<()> {
        for key in StoreKey::ALL {
            self.conn.execute(
                "DELETE FROM collection WHERE key = ?1",
                params![key.as_key()],
            )?;
        }
        log::info!("store: cleared {} collections", StoreKey::ALL.len());
        Ok(())
    }
}

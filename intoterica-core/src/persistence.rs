//! World settings store.
//!
//! The host keeps module state as JSON documents addressed by
//! `(namespace, key)`. The faction list lives in the `factions` section of
//! the document under `("intoterica", "data")`, next to sections this
//! crate does not own (quests, inbox, badges, world clock and so on).
//! Saving factions rewrites only that section; everything else is carried
//! through verbatim.
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS world_settings (
//!     namespace  TEXT NOT NULL,
//!     key        TEXT NOT NULL,
//!     value      BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT,
//!     PRIMARY KEY (namespace, key)
//! );
//! ```
//!
//! - WAL mode for concurrent reads while the writer commits.
//! - Optional CRC-32 checksum; a mismatch is logged and the data is still
//!   returned.
//! - Backup support via SQLite's online-backup API; each faction save
//!   first rotates up to `backup_count` numbered copies.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;
use crate::error::{IntotericaError, Result};
use crate::faction::Faction;
use crate::ports::FactionStore;

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

/// CRC-32 of `data` as a lowercase hex string.
fn crc32_hex(data: &[u8]) -> String {
    let crc = crc32_compute(data);
    format!("{crc:08x}")
}

/// Basic CRC-32 (ISO 3309 / ITU-T V.42) computation.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// World document
// ---------------------------------------------------------------------------

/// The module's world document: the faction list plus every section owned
/// by other features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldData {
    /// Faction list.
    #[serde(default, deserialize_with = "decode_factions")]
    pub factions: Vec<Faction>,
    /// Sections this crate does not interpret.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl WorldData {
    /// Read a world document from a JSON value.
    ///
    /// # Errors
    /// Returns [`IntotericaError::Serialization`] if the value is not a
    /// JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(IntotericaError::Serialization(format!(
                "world document must be an object, found {}",
                json_kind(&value)
            )));
        }
        Ok(serde_json::from_value(value)?)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Decode the faction list, dropping entries that are not factions at all.
fn decode_factions<'de, D>(deserializer: D) -> std::result::Result<Vec<Faction>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Faction>(value) {
            Ok(faction) => Some(faction),
            Err(e) => {
                warn!(error = %e, "Dropping unreadable faction entry");
                None
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// SqliteWorldStore
// ---------------------------------------------------------------------------

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS world_settings (
    namespace  TEXT NOT NULL,
    key        TEXT NOT NULL,
    value      BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    checksum   TEXT,
    PRIMARY KEY (namespace, key)
);";

/// Handle to an open `SQLite` database holding world settings.
///
/// # Usage
///
/// ```no_run
/// # use intoterica_core::persistence::SqliteWorldStore;
/// # use intoterica_core::config::PersistenceConfig;
/// # use intoterica_core::ports::FactionStore;
/// let store = SqliteWorldStore::open("world.db", &PersistenceConfig::default())?;
/// let factions = store.load_factions()?;
/// store.save_factions(&factions)?;
/// # Ok::<(), intoterica_core::error::IntotericaError>(())
/// ```
pub struct SqliteWorldStore {
    conn: Mutex<Connection>,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteWorldStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteWorldStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SqliteWorldStore {
    /// Open (or create) a database at `path`.
    ///
    /// The schema is created if missing. WAL mode is enabled when
    /// `config.wal_mode` is `true`.
    ///
    /// # Errors
    ///
    /// Returns [`IntotericaError::Database`] on `SQLite` failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "World settings store opened"
        );

        let store = Self {
            conn: Mutex::new(conn),
            config: config.clone(),
            db_path,
        };
        if !store.integrity_check()? {
            warn!(path = %store.db_path.display(), "Integrity check failed on open");
        }
        Ok(store)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`IntotericaError::Database`] on `SQLite` failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    // ------------------------------------------------------------------
    // Raw settings
    // ------------------------------------------------------------------

    /// Read one setting as JSON. `None` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns [`IntotericaError::Serialization`] if the stored bytes are
    /// not JSON, or [`IntotericaError::Database`] on `SQLite` failures.
    pub fn get_setting(&self, namespace: &str, key: &str) -> Result<Option<Value>> {
        let start = Instant::now();
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT value, checksum FROM world_settings WHERE namespace = ?1 AND key = ?2",
        )?;

        let row: Option<(Vec<u8>, Option<String>)> = stmt
            .query_row(params![namespace, key], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        let Some((data, stored_checksum)) = row else {
            return Ok(None);
        };

        if self.config.checksum_enabled {
            if let Some(expected) = stored_checksum.as_deref() {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(
                        namespace,
                        key,
                        expected,
                        actual = %actual,
                        "Checksum mismatch, stored document may be corrupt"
                    );
                }
            }
        }

        let value: Value = serde_json::from_slice(&data)?;
        debug!(
            namespace,
            key,
            bytes = data.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Loaded world setting"
        );
        Ok(Some(value))
    }

    /// Write (upsert) one setting.
    ///
    /// # Errors
    ///
    /// Returns [`IntotericaError::Serialization`] if JSON encoding fails,
    /// or [`IntotericaError::Database`] on `SQLite` failures.
    pub fn set_setting(&self, namespace: &str, key: &str, value: &Value) -> Result<()> {
        let start = Instant::now();
        let json = serde_json::to_vec(value)?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));
        let now = Utc::now().to_rfc3339();

        self.conn.lock().execute(
            "INSERT INTO world_settings (namespace, key, value, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(namespace, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![namespace, key, json, now, checksum],
        )?;

        debug!(
            namespace,
            key,
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved world setting"
        );
        Ok(())
    }

    /// Delete one setting. Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`IntotericaError::Database`] on `SQLite` failures.
    pub fn delete_setting(&self, namespace: &str, key: &str) -> Result<bool> {
        let deleted = self.conn.lock().execute(
            "DELETE FROM world_settings WHERE namespace = ?1 AND key = ?2",
            params![namespace, key],
        )?;
        Ok(deleted > 0)
    }

    /// When a setting was last written (RFC 3339), if ever.
    ///
    /// # Errors
    ///
    /// Returns [`IntotericaError::Database`] on `SQLite` failures.
    pub fn updated_at(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let stamp: Option<String> = conn
            .query_row(
                "SELECT updated_at FROM world_settings WHERE namespace = ?1 AND key = ?2",
                params![namespace, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(stamp)
    }

    // ------------------------------------------------------------------
    // World document
    // ------------------------------------------------------------------

    /// Load the module's world document; an absent document is empty.
    ///
    /// # Errors
    ///
    /// Returns [`IntotericaError::CorruptDocument`] if the stored value is
    /// not a JSON object, or any error from [`get_setting`](Self::get_setting).
    pub fn load_world(&self) -> Result<WorldData> {
        let (namespace, key) = (&self.config.namespace, &self.config.key);
        match self.get_setting(namespace, key)? {
            None => Ok(WorldData::default()),
            Some(value) => WorldData::from_value(value).map_err(|e| {
                IntotericaError::CorruptDocument {
                    namespace: namespace.clone(),
                    key: key.clone(),
                    reason: e.to_string(),
                }
            }),
        }
    }

    /// Replace the module's world document.
    ///
    /// # Errors
    ///
    /// Returns any error from [`set_setting`](Self::set_setting).
    pub fn save_world(&self, world: &WorldData) -> Result<()> {
        let value = serde_json::to_value(world)?;
        self.set_setting(&self.config.namespace, &self.config.key, &value)
    }

    // ------------------------------------------------------------------
    // Backup
    // ------------------------------------------------------------------

    /// Copy the database to `dest_path` using `SQLite`'s online-backup API.
    ///
    /// # Errors
    ///
    /// Returns [`IntotericaError::Database`] on `SQLite` failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let conn = self.conn.lock();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;

        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Database backup completed"
        );
        Ok(())
    }

    /// Create a numbered backup next to the database file, keeping at most
    /// `config.backup_count` of them.
    ///
    /// # Errors
    ///
    /// Returns [`IntotericaError::Database`] or [`IntotericaError::Io`] on failure.
    pub fn create_rotating_backup(&self) -> Result<()> {
        if self.db_path.as_os_str() == ":memory:" {
            return Ok(());
        }

        let max = self.config.backup_count;
        if max == 0 {
            return Ok(());
        }

        for i in (1..max).rev() {
            let src = self.backup_path(i);
            let dst = self.backup_path(i + 1);
            if src.exists() {
                std::fs::rename(&src, &dst)?;
            }
        }

        let oldest = self.backup_path(max + 1);
        if oldest.exists() {
            std::fs::remove_file(&oldest)?;
        }

        self.backup(self.backup_path(1))?;
        info!(max_backups = max, "Rotating backup created");
        Ok(())
    }

    /// Path to a numbered backup file (e.g. `world.db.bak.1`).
    fn backup_path(&self, n: u32) -> PathBuf {
        let mut p = self.db_path.clone();
        let ext = format!(
            "{}.bak.{n}",
            p.extension()
                .map_or(String::new(), |e| e.to_string_lossy().into_owned())
        );
        p.set_extension(ext);
        p
    }

    // ------------------------------------------------------------------
    // Utility
    // ------------------------------------------------------------------

    /// Path to the database file (or `:memory:`).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run `PRAGMA integrity_check`. `Ok(false)` means corruption.
    ///
    /// # Errors
    ///
    /// Returns [`IntotericaError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String =
            self.conn
                .lock()
                .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }
}

impl FactionStore for SqliteWorldStore {
    fn load_factions(&self) -> Result<Vec<Faction>> {
        Ok(self.load_world()?.factions)
    }

    /// Rotates `config.backup_count` copies of the previous database state
    /// before committing. A failed backup is logged and does not block the
    /// save.
    fn save_factions(&self, factions: &[Faction]) -> Result<()> {
        if let Err(e) = self.create_rotating_backup() {
            warn!(error = %e, "Rotating backup failed");
        }
        let mut world = self.load_world()?;
        world.factions = factions.to_vec();
        self.save_world(&world)?;
        info!(factions = factions.len(), "Faction list committed");
        Ok(())
    }
}

/// Adds `.optional()` to `rusqlite::Result`, turning
/// `QueryReturnedNoRows` into `Ok(None)`.
trait OptionalExt<T> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryWorldStore
// ---------------------------------------------------------------------------

/// In-memory [`FactionStore`] with the same document semantics as
/// [`SqliteWorldStore`].
#[derive(Debug, Default)]
pub struct MemoryWorldStore {
    world: Mutex<WorldData>,
    saves: Mutex<u64>,
}

impl MemoryWorldStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with a world document.
    #[must_use]
    pub fn with_world(world: WorldData) -> Self {
        Self {
            world: Mutex::new(world),
            saves: Mutex::new(0),
        }
    }

    /// A copy of the current document.
    #[must_use]
    pub fn snapshot(&self) -> WorldData {
        self.world.lock().clone()
    }

    /// Number of committed saves.
    #[must_use]
    pub fn save_count(&self) -> u64 {
        *self.saves.lock()
    }
}

impl FactionStore for MemoryWorldStore {
    fn load_factions(&self) -> Result<Vec<Faction>> {
        Ok(self.world.lock().factions.clone())
    }

    fn save_factions(&self, factions: &[Faction]) -> Result<()> {
        self.world.lock().factions = factions.to_vec();
        *self.saves.lock() += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use tracing::debug;

use crate::error::LibraryError;

use super::model::Track;

const CREATE_TABLES: &str = "
    CREATE TABLE IF NOT EXISTS songs (
        id INTEGER PRIMARY KEY,
        path TEXT UNIQUE,
        title TEXT NOT NULL,
        play_count INTEGER DEFAULT 0
    );
";

const SELECT_COLUMNS: &str = "SELECT path, title, play_count FROM songs";

/// SQLite-backed track store.
///
/// One connection guarded by a mutex: each method holds the lock for the
/// whole statement, so concurrent readers never see a half-applied write.
pub struct Library {
    conn: Mutex<Connection>,
}

impl Library {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, LibraryError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "opened library");
        Self::with_connection(conn)
    }

    /// A private, non-persistent store.
    pub fn open_in_memory() -> Result<Self, LibraryError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, LibraryError> {
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a track. Returns `false` when the path is already present.
    pub fn add(&self, path: &Path, title: &str) -> Result<bool, LibraryError> {
        let conn = self.conn();
        match conn.execute(
            "INSERT INTO songs (path, title) VALUES (?1, ?2)",
            params![path_key(path), title],
        ) {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                debug!(path = %path.display(), "track already in library");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All tracks in insertion order.
    pub fn all(&self) -> Result<Vec<Track>, LibraryError> {
        self.query(&format!("{SELECT_COLUMNS} ORDER BY id"))
    }

    /// Tracks whose title contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Result<Vec<Track>, LibraryError> {
        let needle = query.to_lowercase();
        let mut tracks = self.all()?;
        tracks.retain(|t| t.title.to_lowercase().contains(&needle));
        Ok(tracks)
    }

    /// Bump the play count of `path`. Unknown paths are ignored.
    pub fn increment_play_count(&self, path: &Path) -> Result<(), LibraryError> {
        let changed = self.conn().execute(
            "UPDATE songs SET play_count = play_count + 1 WHERE path = ?1",
            params![path_key(path)],
        )?;
        if changed == 0 {
            debug!(path = %path.display(), "play count not updated: track not in library");
        }
        Ok(())
    }

    /// Most listened first; equal counts keep insertion order.
    pub fn recommendations(&self) -> Result<Vec<Track>, LibraryError> {
        self.query(&format!("{SELECT_COLUMNS} ORDER BY play_count DESC, id ASC"))
    }

    pub fn get(&self, path: &Path) -> Result<Option<Track>, LibraryError> {
        let conn = self.conn();
        let track = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE path = ?1"),
                params![path_key(path)],
                track_from_row,
            )
            .optional()?;
        Ok(track)
    }

    pub fn remove(&self, path: &Path) -> Result<(), LibraryError> {
        self.conn()
            .execute("DELETE FROM songs WHERE path = ?1", params![path_key(path)])?;
        Ok(())
    }

    fn query(&self, sql: &str) -> Result<Vec<Track>, LibraryError> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(sql)?;
        let tracks = stmt
            .query_map([], track_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tracks)
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<Track> {
    let path: String = row.get("path")?;
    let play_count: i64 = row.get("play_count")?;
    Ok(Track {
        path: PathBuf::from(path),
        title: row.get("title")?,
        play_count: play_count.max(0) as u64,
    })
}

//! Database module for session persistence.
//!
//! Owns the SQLite handle for the session table: one physical connection,
//! established lazily on first use and released explicitly on shutdown.

use std::path::PathBuf;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::session::{SessionError, SessionResult};

/// First bytes of every SQLite 3 database file.
const SQLITE_HEADER: &[u8] = b"SQLite format 3";

/// Where the session table lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// Ephemeral store, discarded when the registry shuts down.
    #[default]
    InMemory,
    /// Durable store backed by an SQLite file at the given path.
    OnDisk(PathBuf),
}

impl DatabaseLocation {
    /// Durable location at `path`.
    pub fn on_disk(path: impl Into<PathBuf>) -> Self {
        Self::OnDisk(path.into())
    }

    /// Check that the location can back a session store.
    ///
    /// An on-disk path may not exist yet; if it does, it must be a file
    /// that is either empty or starts with the SQLite header.
    pub fn validate(&self) -> SessionResult<()> {
        let Self::OnDisk(path) = self else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }
        if path.is_dir() {
            return Err(SessionError::Configuration(format!(
                "expected a file path, but {} is a directory",
                path.display()
            )));
        }

        let mut header = [0u8; 16];
        let read = std::fs::File::open(path)
            .and_then(|mut file| {
                use std::io::Read;
                file.read(&mut header)
            })
            .map_err(|err| {
                SessionError::Configuration(format!("reading {}: {}", path.display(), err))
            })?;

        // A brand-new empty file is fine; anything else must be SQLite.
        if read > 0 && !header[..read].starts_with(SQLITE_HEADER) {
            return Err(SessionError::Configuration(format!(
                "{} is not an SQLite database file",
                path.display()
            )));
        }
        Ok(())
    }

    fn connect_options(&self) -> SessionResult<SqliteConnectOptions> {
        let options = match self {
            Self::InMemory => SqliteConnectOptions::from_str("sqlite::memory:")?,
            Self::OnDisk(path) => {
                let database_url = format!("sqlite://{}?mode=rwc", path.display());
                SqliteConnectOptions::from_str(&database_url)?
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .busy_timeout(std::time::Duration::from_secs(30))
            }
        };
        Ok(options)
    }
}

/// Database connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a handle to the given location.
    ///
    /// The pool is capped at a single connection so that store calls
    /// serialize, and the connection is not established until first use.
    /// Idle reaping is disabled: the handle lives for the registry's
    /// whole lifetime, and an in-memory store must keep its contents
    /// between calls.
    pub fn open(location: &DatabaseLocation) -> SessionResult<Self> {
        location.validate()?;

        if let DatabaseLocation::OnDisk(path) = location {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    SessionError::Configuration(format!(
                        "creating database directory {}: {}",
                        parent.display(),
                        err
                    ))
                })?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_lazy_with(location.connect_options()?);

        Ok(Self { pool })
    }

    /// Open an ephemeral in-memory database.
    pub fn in_memory() -> SessionResult<Self> {
        Self::open(&DatabaseLocation::InMemory)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Release the storage handle. Idempotent.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

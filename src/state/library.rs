use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::catalog::CatalogReader;
use super::scoring::OwnershipScorer;
use super::wardrobe::WardrobeStore;
use crate::error::{Error, Result};

/// Default time a connection waits on a locked database before failing
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// The Library owns the SQLite database shared by the wardrobe and the
/// bundled catalog.
///
/// It is constructed once at startup and handed by reference to whatever
/// needs the wardrobe, the catalog or the scorer. Background work opens its
/// own connection with [`Library::open_reader`] since `Connection` is not `Sync`.
pub struct Library {
    conn: Connection,
    db_path: PathBuf,
}

impl Library {
    /// Open (or create) the database at `db_path` and ensure the wardrobe schema.
    ///
    /// Any failure here is fatal: the caller gets [`Error::Init`] or
    /// [`Error::InitIo`].
    pub fn open(db_path: &Path, busy_timeout: Duration) -> Result<Self> {
        prepare_parent(db_path)?;

        let conn = Connection::open(db_path).map_err(|source| Error::Init {
            path: db_path.to_path_buf(),
            source,
        })?;

        let library = Library {
            conn,
            db_path: db_path.to_path_buf(),
        };
        library.configure(busy_timeout)?;
        library.init_schema().map_err(|e| library.fatal(e))?;

        tracing::info!("📁 Database initialized at: {}", library.db_path.display());
        Ok(library)
    }

    /// Open the database, first copying the bundled catalog into place when the
    /// working database does not exist yet. An existing database is never replaced.
    pub fn open_with_seed(
        db_path: &Path,
        bundle: Option<&Path>,
        busy_timeout: Duration,
    ) -> Result<Self> {
        if !db_path.exists() {
            match bundle {
                Some(bundle) if bundle.exists() => {
                    prepare_parent(db_path)?;
                    copy_bundle(bundle, db_path)?;
                    tracing::info!(
                        "Copied bundled catalog {} to {}",
                        bundle.display(),
                        db_path.display()
                    );
                }
                Some(bundle) => {
                    tracing::warn!("Bundled catalog not found at {}", bundle.display());
                }
                None => {}
            }
        }

        Self::open(db_path, busy_timeout)
    }

    /// In-memory database, used by tests and throwaway sessions
    pub fn open_in_memory() -> Result<Self> {
        let path = PathBuf::from(":memory:");
        let conn = Connection::open_in_memory().map_err(|source| Error::Init {
            path: path.clone(),
            source,
        })?;

        let library = Library { conn, db_path: path };
        library.init_schema().map_err(|e| library.fatal(e))?;
        Ok(library)
    }

    /// Open a read-only connection to an existing database.
    ///
    /// Used for scoring off the main connection. The schema is not touched.
    pub fn open_reader(db_path: &Path, busy_timeout: Duration) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(db_path, flags).map_err(|source| Error::Init {
            path: db_path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(busy_timeout)?;

        Ok(Library {
            conn,
            db_path: db_path.to_path_buf(),
        })
    }

    fn configure(&self, busy_timeout: Duration) -> Result<()> {
        self.conn
            .busy_timeout(busy_timeout)
            .map_err(|source| self.init_error(source))?;

        // WAL lets scoring readers run alongside an insert or delete
        let mode: String = self
            .conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|source| self.init_error(source))?;
        tracing::debug!("journal_mode = {}", mode);

        Ok(())
    }

    fn init_error(&self, source: rusqlite::Error) -> Error {
        Error::Init {
            path: self.db_path.clone(),
            source,
        }
    }

    fn fatal(&self, error: Error) -> Error {
        match error {
            Error::Database(source) => self.init_error(source),
            other => other,
        }
    }

    /// Ensure the wardrobe table and its index exist.
    ///
    /// Safe to call on every launch: creation is additive only and never
    /// drops or rewrites rows. The catalog tables are not created here; they
    /// arrive with the bundled dataset.
    pub fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS wardrobe (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                color           TEXT NOT NULL,
                type            TEXT NOT NULL,
                image_path      TEXT NOT NULL,
                created_at      INTEGER NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_wardrobe_type_color
             ON wardrobe(type, color)",
            [],
        )?;

        tracing::debug!("✅ Wardrobe schema ready");
        Ok(())
    }

    /// Get the path to the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn wardrobe(&self) -> WardrobeStore<'_> {
        WardrobeStore::new(self.connection())
    }

    pub fn catalog(&self) -> CatalogReader<'_> {
        CatalogReader::new(self.connection())
    }

    pub fn scorer(&self) -> OwnershipScorer<'_> {
        OwnershipScorer::new(self.connection())
    }

    /// Names of all tables in the database, for startup diagnostics
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

/// Create the directory that will hold `db_path`
fn prepare_parent(db_path: &Path) -> Result<()> {
    match db_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|source| Error::InitIo {
                path: db_path.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// Sibling file the bundle is copied into before it is renamed into place
fn seeding_path(db_path: &Path) -> PathBuf {
    let mut name = db_path.file_name().unwrap_or_default().to_os_string();
    name.push(".seeding");
    db_path.with_file_name(name)
}

/// Copy the bundled catalog to `db_path`.
///
/// The copy lands in a sibling file first and is renamed over `db_path` only
/// once complete, so an interrupted copy never leaves a truncated database
/// that a later launch would take as already seeded.
fn copy_bundle(bundle: &Path, db_path: &Path) -> Result<()> {
    let staging = seeding_path(db_path);
    let result = std::fs::copy(bundle, &staging).and_then(|_| std::fs::rename(&staging, db_path));

    result.map_err(|source| {
        let _ = std::fs::remove_file(&staging);
        Error::InitIo {
            path: db_path.to_path_buf(),
            source,
        }
    })
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}

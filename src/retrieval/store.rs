use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// One stored passage with its embedding.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub content: String,
    pub embedding: Vec<f32>,
}

/// Summary of an index file.
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub chunks: i64,
    pub sources: i64,
    pub embedding_model: Option<String>,
    pub built_at: Option<DateTime<Utc>>,
}

// ── SQLite store ────────────────────────────────────────────────

pub struct ChunkStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl ChunkStore {
    /// Create (or reuse) an index file for writing.
    pub fn create(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create index dir: {}", parent.display()))?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open index DB: {}", db_path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             PRAGMA temp_store   = MEMORY;",
        )?;

        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: db_path.to_path_buf(),
        })
    }

    /// Open an existing index read-only. A missing file means the index is
    /// unavailable.
    pub fn open_existing(db_path: &Path) -> Result<Self> {
        if !db_path.exists() {
            anyhow::bail!(
                "Document index unavailable: {} does not exist (run `lexgate index build <dir>`)",
                db_path.display()
            );
        }
        let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open index DB: {}", db_path.display()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: db_path.to_path_buf(),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chunks (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                source     TEXT NOT NULL,
                position   INTEGER NOT NULL,
                content    TEXT NOT NULL,
                embedding  BLOB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);
            CREATE TABLE IF NOT EXISTS index_meta (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .context("Failed to initialise index schema")?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn clear(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch("DELETE FROM chunks; DELETE FROM index_meta;")?;
        Ok(())
    }

    pub fn insert(&self, source: &str, position: usize, content: &str, embedding: &[f32]) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO chunks (source, position, content, embedding) VALUES (?1, ?2, ?3, ?4)",
            params![
                source,
                i64::try_from(position).unwrap_or(i64::MAX),
                content,
                encode_embedding(embedding)
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Remove all chunks previously ingested from `source`.
    pub fn remove_source(&self, source: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let removed = conn.execute("DELETE FROM chunks WHERE source = ?1", params![source])?;
        Ok(removed)
    }

    pub fn record_build(&self, embedding_model: &str) -> Result<()> {
        let conn = self.conn.lock();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR REPLACE INTO index_meta (key, value) VALUES ('embedding_model', ?1)",
            params![embedding_model],
        )?;
        conn.execute(
            "INSERT OR REPLACE INTO index_meta (key, value) VALUES ('built_at', ?1)",
            params![now],
        )?;
        Ok(())
    }

    pub fn embedding_model(&self) -> Result<Option<String>> {
        self.meta("embedding_model")
    }

    fn meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT value FROM index_meta WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn all_chunks(&self) -> Result<Vec<StoredChunk>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT content, embedding FROM chunks ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            let blob: Vec<u8> = row.get(1)?;
            Ok(StoredChunk {
                content: row.get(0)?,
                embedding: decode_embedding(&blob),
            })
        })?;
        let mut chunks = Vec::new();
        for row in rows {
            chunks.push(row?);
        }
        Ok(chunks)
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let (chunks, sources) = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT COUNT(*), COUNT(DISTINCT source) FROM chunks",
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )?
        };
        let built_at = self
            .meta("built_at")?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Ok(IndexStats {
            chunks,
            sources,
            embedding_model: self.embedding_model()?,
            built_at,
        })
    }
}

/// Little-endian `f32` sequence.
pub fn encode_embedding(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

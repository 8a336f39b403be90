use crate::db::*;
use crate::error::{AppError, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;

/// Database wrapper for thread-safe access.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            -- Magazines table (full metadata cache)
            CREATE TABLE IF NOT EXISTS magazines (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                author TEXT,
                category TEXT,
                path TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                mtime INTEGER NOT NULL DEFAULT 0,
                total_pages INTEGER NOT NULL DEFAULT 0,
                is_featured INTEGER NOT NULL DEFAULT 0,
                view_count INTEGER NOT NULL DEFAULT 0,
                download_count INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            -- Per-page extracted text (for in-magazine search)
            CREATE TABLE IF NOT EXISTS pages (
                magazine_id TEXT NOT NULL,
                page_number INTEGER NOT NULL,
                extracted_text TEXT NOT NULL DEFAULT '',
                text_confidence REAL NOT NULL DEFAULT 0,
                PRIMARY KEY (magazine_id, page_number),
                FOREIGN KEY (magazine_id) REFERENCES magazines(id) ON DELETE CASCADE
            );

            -- Reading progress table (one row per magazine, last write wins)
            CREATE TABLE IF NOT EXISTS reading_progress (
                magazine_id TEXT PRIMARY KEY,
                current_page INTEGER NOT NULL,
                percentage REAL NOT NULL,
                time_spent_seconds INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (magazine_id) REFERENCES magazines(id) ON DELETE CASCADE
            );

            -- Bookmarks table (unique per magazine+page)
            CREATE TABLE IF NOT EXISTS bookmarks (
                magazine_id TEXT NOT NULL,
                page_number INTEGER NOT NULL,
                note TEXT,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (magazine_id, page_number),
                FOREIGN KEY (magazine_id) REFERENCES magazines(id) ON DELETE CASCADE
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_pages_magazine ON pages(magazine_id);
            CREATE INDEX IF NOT EXISTS idx_bookmarks_magazine ON bookmarks(magazine_id);
            "#,
        )
        .map_err(|e| AppError::Internal(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    // ========== MAGAZINE OPERATIONS ==========

    /// Insert or update a magazine, preserving counters and creation time.
    pub fn save_magazine(&self, magazine: &StoredMagazine) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO magazines (id, title, description, author, category, path,
                 file_size, mtime, total_pages, is_featured, view_count, download_count,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 author = excluded.author,
                 category = excluded.category,
                 path = excluded.path,
                 file_size = excluded.file_size,
                 mtime = excluded.mtime,
                 total_pages = excluded.total_pages,
                 updated_at = excluded.updated_at",
            params![
                magazine.id,
                magazine.title,
                magazine.description,
                magazine.author,
                magazine.category,
                magazine.path,
                magazine.file_size,
                magazine.mtime,
                magazine.total_pages,
                magazine.is_featured,
                magazine.view_count,
                magazine.download_count,
                magazine.created_at,
                magazine.updated_at,
            ],
        )
        .map_err(|e| AppError::Internal(format!("Failed to save magazine: {}", e)))?;
        Ok(())
    }

    /// Get magazine by ID.
    pub fn get_magazine(&self, id: &str) -> Result<Option<StoredMagazine>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, title, description, author, category, path, file_size, mtime,
                    total_pages, is_featured, view_count, download_count, created_at, updated_at
             FROM magazines WHERE id = ?1",
            params![id],
            Self::row_to_magazine,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get magazine: {}", e)))
    }

    /// Get all magazines, newest first.
    pub fn get_all_magazines(&self) -> Result<Vec<StoredMagazine>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, title, description, author, category, path, file_size, mtime,
                        total_pages, is_featured, view_count, download_count, created_at, updated_at
                 FROM magazines ORDER BY created_at DESC",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let magazines = stmt
            .query_map([], Self::row_to_magazine)
            .map_err(|e| AppError::Internal(format!("Failed to list magazines: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect magazines: {}", e)))?;

        Ok(magazines)
    }

    /// Delete magazine and cascaded rows.
    pub fn delete_magazine(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        // Cascade manually: SQLite foreign_keys pragma is off by default.
        conn.execute("DELETE FROM pages WHERE magazine_id = ?1", params![id])
            .map_err(|e| AppError::Internal(format!("Failed to delete pages: {}", e)))?;
        conn.execute(
            "DELETE FROM reading_progress WHERE magazine_id = ?1",
            params![id],
        )
        .map_err(|e| AppError::Internal(format!("Failed to delete progress: {}", e)))?;
        conn.execute("DELETE FROM bookmarks WHERE magazine_id = ?1", params![id])
            .map_err(|e| AppError::Internal(format!("Failed to delete bookmarks: {}", e)))?;
        let rows = conn
            .execute("DELETE FROM magazines WHERE id = ?1", params![id])
            .map_err(|e| AppError::Internal(format!("Failed to delete magazine: {}", e)))?;
        Ok(rows > 0)
    }

    /// Increment the view counter.
    pub fn increment_views(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE magazines SET view_count = view_count + 1 WHERE id = ?1",
            params![id],
        )
        .map_err(|e| AppError::Internal(format!("Failed to increment views: {}", e)))?;
        Ok(())
    }

    /// Increment the download counter.
    pub fn increment_downloads(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE magazines SET download_count = download_count + 1 WHERE id = ?1",
            params![id],
        )
        .map_err(|e| AppError::Internal(format!("Failed to increment downloads: {}", e)))?;
        Ok(())
    }

    /// Aggregate library statistics.
    pub fn library_stats(&self) -> Result<LibraryStats> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(view_count), 0), COALESCE(SUM(download_count), 0)
             FROM magazines",
            [],
            |row| {
                Ok(LibraryStats {
                    total_magazines: row.get(0)?,
                    total_views: row.get(1)?,
                    total_downloads: row.get(2)?,
                })
            },
        )
        .map_err(|e| AppError::Internal(format!("Failed to get stats: {}", e)))
    }

    fn row_to_magazine(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredMagazine> {
        Ok(StoredMagazine {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            author: row.get(3)?,
            category: row.get(4)?,
            path: row.get(5)?,
            file_size: row.get(6)?,
            mtime: row.get(7)?,
            total_pages: row.get(8)?,
            is_featured: row.get(9)?,
            view_count: row.get(10)?,
            download_count: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    // ========== PAGE OPERATIONS ==========

    /// Replace all page rows for a magazine in one transaction.
    pub fn replace_pages(&self, magazine_id: &str, pages: &[StoredPage]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Internal(format!("Failed to start transaction: {}", e)))?;

        tx.execute("DELETE FROM pages WHERE magazine_id = ?1", params![
            magazine_id
        ])
        .map_err(|e| AppError::Internal(format!("Failed to clear pages: {}", e)))?;

        for page in pages {
            tx.execute(
                "INSERT INTO pages (magazine_id, page_number, extracted_text, text_confidence)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    page.magazine_id,
                    page.page_number,
                    page.extracted_text,
                    page.text_confidence,
                ],
            )
            .map_err(|e| AppError::Internal(format!("Failed to insert page: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| AppError::Internal(format!("Failed to commit pages: {}", e)))?;
        Ok(())
    }

    /// Get all pages of a magazine ordered by page number.
    pub fn get_pages(&self, magazine_id: &str) -> Result<Vec<StoredPage>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT magazine_id, page_number, extracted_text, text_confidence
                 FROM pages WHERE magazine_id = ?1 ORDER BY page_number",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let pages = stmt
            .query_map(params![magazine_id], Self::row_to_page)
            .map_err(|e| AppError::Internal(format!("Failed to list pages: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect pages: {}", e)))?;

        Ok(pages)
    }

    /// Search pages of a magazine by extracted text. Case-insensitive substring match.
    pub fn search_pages(&self, magazine_id: &str, query: &str) -> Result<Vec<StoredPage>> {
        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT magazine_id, page_number, extracted_text, text_confidence
                 FROM pages
                 WHERE magazine_id = ?1 AND extracted_text LIKE ?2 ESCAPE '\\'
                 ORDER BY page_number",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let pages = stmt
            .query_map(params![magazine_id, pattern], Self::row_to_page)
            .map_err(|e| AppError::Internal(format!("Failed to search pages: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect results: {}", e)))?;

        Ok(pages)
    }

    fn row_to_page(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredPage> {
        Ok(StoredPage {
            magazine_id: row.get(0)?,
            page_number: row.get(1)?,
            extracted_text: row.get(2)?,
            text_confidence: row.get(3)?,
        })
    }

    // ========== PROGRESS OPERATIONS ==========

    /// Upsert reading progress. Last write wins.
    pub fn save_progress(&self, progress: &ReadingProgress) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO reading_progress
                 (magazine_id, current_page, percentage, time_spent_seconds, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(magazine_id) DO UPDATE SET
                 current_page = excluded.current_page,
                 percentage = excluded.percentage,
                 time_spent_seconds = excluded.time_spent_seconds,
                 updated_at = excluded.updated_at",
            params![
                progress.magazine_id,
                progress.current_page,
                progress.percentage,
                progress.time_spent_seconds,
                progress.updated_at,
            ],
        )
        .map_err(|e| AppError::Internal(format!("Failed to save progress: {}", e)))?;
        Ok(())
    }

    /// Get reading progress for a magazine.
    pub fn get_progress(&self, magazine_id: &str) -> Result<Option<ReadingProgress>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT magazine_id, current_page, percentage, time_spent_seconds, updated_at
             FROM reading_progress WHERE magazine_id = ?1",
            params![magazine_id],
            |row| {
                Ok(ReadingProgress {
                    magazine_id: row.get(0)?,
                    current_page: row.get(1)?,
                    percentage: row.get(2)?,
                    time_spent_seconds: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get progress: {}", e)))
    }

    // ========== BOOKMARK OPERATIONS ==========

    /// Upsert a bookmark. Re-adding an existing page updates the note, no duplicate.
    pub fn save_bookmark(&self, bookmark: &Bookmark) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO bookmarks (magazine_id, page_number, note, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(magazine_id, page_number) DO UPDATE SET
                 note = excluded.note",
            params![
                bookmark.magazine_id,
                bookmark.page_number,
                bookmark.note,
                bookmark.created_at,
            ],
        )
        .map_err(|e| AppError::Internal(format!("Failed to save bookmark: {}", e)))?;
        Ok(())
    }

    /// Delete a bookmark by (magazine, page).
    pub fn delete_bookmark(&self, magazine_id: &str, page_number: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM bookmarks WHERE magazine_id = ?1 AND page_number = ?2",
                params![magazine_id, page_number],
            )
            .map_err(|e| AppError::Internal(format!("Failed to delete bookmark: {}", e)))?;
        Ok(rows > 0)
    }

    /// Get bookmarks for a magazine ordered by page number.
    pub fn get_bookmarks(&self, magazine_id: &str) -> Result<Vec<Bookmark>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT magazine_id, page_number, note, created_at
                 FROM bookmarks WHERE magazine_id = ?1 ORDER BY page_number",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let bookmarks = stmt
            .query_map(params![magazine_id], |row| {
                Ok(Bookmark {
                    magazine_id: row.get(0)?,
                    page_number: row.get(1)?,
                    note: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })
            .map_err(|e| AppError::Internal(format!("Failed to list bookmarks: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect bookmarks: {}", e)))?;

        Ok(bookmarks)
    }
}

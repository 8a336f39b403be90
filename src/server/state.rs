//! Application state shared across handlers.

use crate::config::Config;
use crate::db::{self, Database, StoredMagazine, StoredPage};
use crate::error::Result;
use crate::library::Magazine;
use crate::pdf::PdfMagazine;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Database connection.
    pub db: Database,
    /// In-memory magazine cache (for quick access).
    magazines: Arc<parking_lot::RwLock<Vec<Magazine>>>,
    /// Whether initial load from DB is complete.
    loaded: Arc<AtomicBool>,
    /// Whether a scan is currently in progress.
    scanning: Arc<AtomicBool>,
}

impl AppState {
    /// Create new application state with database.
    pub fn new_with_db(config: Config, db: Database) -> Self {
        Self {
            config: Arc::new(config),
            db,
            magazines: Arc::new(parking_lot::RwLock::new(Vec::new())),
            loaded: Arc::new(AtomicBool::new(false)),
            scanning: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Load magazines from database into memory cache (instant startup).
    pub fn load_from_db(&self) -> Result<()> {
        if self.loaded.load(Ordering::Relaxed) {
            return Ok(());
        }

        tracing::info!("Loading magazines from database...");
        let start = std::time::Instant::now();

        let stored = self.db.get_all_magazines()?;
        let magazines: Vec<Magazine> = stored.iter().map(Self::stored_to_magazine).collect();

        let count = magazines.len();
        *self.magazines.write() = magazines;
        self.loaded.store(true, Ordering::Relaxed);

        tracing::info!(magazines = count, elapsed = ?start.elapsed(), "Loaded from database");
        Ok(())
    }

    /// Convert StoredMagazine to Magazine.
    fn stored_to_magazine(sm: &StoredMagazine) -> Magazine {
        Magazine {
            id: sm.id.clone(),
            title: sm.title.clone(),
            description: sm.description.clone(),
            author: sm.author.clone(),
            category: sm.category.clone(),
            total_pages: sm.total_pages.max(0) as u32,
            is_featured: sm.is_featured,
            view_count: sm.view_count.max(0) as u64,
            download_count: sm.download_count.max(0) as u64,
            path: PathBuf::from(&sm.path),
            file_size: sm.file_size.max(0) as u64,
            modified: db::timestamp_to_datetime(sm.mtime),
        }
    }

    /// Convert Magazine to StoredMagazine.
    fn magazine_to_stored(magazine: &Magazine) -> StoredMagazine {
        let now = db::now_timestamp();

        StoredMagazine {
            id: magazine.id.clone(),
            title: magazine.title.clone(),
            description: magazine.description.clone(),
            author: magazine.author.clone(),
            category: magazine.category.clone(),
            path: magazine.path.to_string_lossy().to_string(),
            file_size: magazine.file_size as i64,
            mtime: magazine.modified.timestamp(),
            total_pages: i64::from(magazine.total_pages),
            is_featured: magazine.is_featured,
            view_count: magazine.view_count as i64,
            download_count: magazine.download_count as i64,
            created_at: now,
            updated_at: now,
        }
    }

    /// Scan the magazines directory incrementally (only changed files).
    pub fn scan_library(&self) -> Result<()> {
        // Prevent concurrent scans
        if self.scanning.swap(true, Ordering::SeqCst) {
            tracing::info!("Scan already in progress, skipping");
            return Ok(());
        }

        let result = self.do_incremental_scan();
        self.scanning.store(false, Ordering::SeqCst);
        result
    }

    /// Perform the actual incremental scan.
    fn do_incremental_scan(&self) -> Result<()> {
        let dir = self.config.library.magazines_dir.clone();
        if !dir.exists() {
            tracing::warn!(path = %dir.display(), "Magazines directory does not exist");
            return Ok(());
        }

        let start = std::time::Instant::now();
        tracing::info!(path = %dir.display(), "Scanning magazines (incremental)");

        // Existing magazines from DB keyed by path-derived ID
        let existing = self.db.get_all_magazines()?;
        let existing_map: HashMap<String, StoredMagazine> =
            existing.into_iter().map(|m| (m.id.clone(), m)).collect();

        let (new, updated, unchanged, scanned_ids) =
            self.scan_directory_incremental(&dir, &existing_map)?;

        // Remove magazines whose PDF disappeared from the filesystem
        let mut removed = 0;
        for id in existing_map.keys() {
            if !scanned_ids.contains(id) {
                let _ = self.db.delete_magazine(id);
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(removed = removed, "Removed deleted magazines");
        }

        // Reload from DB to update in-memory cache
        self.loaded.store(false, Ordering::Relaxed);
        self.load_from_db()?;

        tracing::info!(
            new = new,
            updated = updated,
            unchanged = unchanged,
            removed = removed,
            elapsed = ?start.elapsed(),
            "Scan complete"
        );

        Ok(())
    }

    /// Scan a directory incrementally, comparing with existing DB entries.
    fn scan_directory_incremental(
        &self,
        path: &Path,
        existing: &HashMap<String, StoredMagazine>,
    ) -> Result<(usize, usize, usize, Vec<String>)> {
        // Collect PDF files first
        let files: Vec<_> = walkdir::WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter_map(|e| {
                let file_path = e.path().to_path_buf();
                let extension = file_path.extension()?.to_str()?;
                if !extension.eq_ignore_ascii_case("pdf") {
                    return None;
                }
                let metadata = std::fs::metadata(&file_path).ok()?;
                Some((file_path, metadata))
            })
            .collect();

        tracing::info!(files = files.len(), "Found PDF files to process");

        // Separate files into: unchanged (skip), needs_processing (new/updated)
        let mut scanned_ids = Vec::with_capacity(files.len());
        let mut to_process = Vec::new();
        let mut unchanged_count = 0;

        for (file_path, metadata) in files {
            let id = uuid::Uuid::new_v5(
                &uuid::Uuid::NAMESPACE_URL,
                file_path.to_string_lossy().as_bytes(),
            )
            .to_string();

            scanned_ids.push(id.clone());

            let file_size = metadata.len() as i64;
            let mtime = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            // Check if file has changed
            if let Some(existing_magazine) = existing.get(&id)
                && existing_magazine.mtime == mtime
                && existing_magazine.file_size == file_size
            {
                // Unchanged - skip
                unchanged_count += 1;
                continue;
            }

            // Needs processing (new or updated)
            to_process.push((file_path, metadata, id));
        }

        let to_process_count = to_process.len();
        if to_process_count == 0 {
            return Ok((0, 0, unchanged_count, scanned_ids));
        }

        let workers = self.config.scan.workers;
        tracing::info!(
            to_process = to_process_count,
            unchanged = unchanged_count,
            workers = workers,
            "Processing new/updated files"
        );

        // Process with configurable parallelism
        let new_count = AtomicUsize::new(0);
        let updated_count = AtomicUsize::new(0);
        let processed = AtomicUsize::new(0);

        // Build thread pool with limited workers
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| {
                crate::error::AppError::Internal(format!("Failed to build scan pool: {}", e))
            })?;

        pool.install(|| {
            to_process.par_iter().for_each(|(file_path, metadata, id)| {
                let is_new = !existing.contains_key(id);
                if is_new {
                    new_count.fetch_add(1, Ordering::Relaxed);
                } else {
                    updated_count.fetch_add(1, Ordering::Relaxed);
                }

                if let Err(e) = self.ingest_pdf(file_path, id, metadata) {
                    tracing::warn!(path = %file_path.display(), error = %e, "Failed to ingest PDF");
                }

                // Progress logging every 100 files
                let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                if done.is_multiple_of(100) || done == to_process_count {
                    let percent = (done * 100) / to_process_count;
                    tracing::info!("Processing... {}/{} ({}%)", done, to_process_count, percent);
                }
            });
        });

        Ok((
            new_count.load(Ordering::Relaxed),
            updated_count.load(Ordering::Relaxed),
            unchanged_count,
            scanned_ids,
        ))
    }

    /// Ingest one PDF: metadata into the magazines table, per-page text
    /// into the pages table.
    fn ingest_pdf(&self, file_path: &Path, id: &str, metadata: &std::fs::Metadata) -> Result<()> {
        let mut magazine = Magazine::new(file_path.to_path_buf());
        magazine.id = id.to_string();
        magazine.file_size = metadata.len();
        magazine.modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| db::timestamp_to_datetime(d.as_secs() as i64))
            .unwrap_or_else(chrono::Utc::now);

        // An unreadable PDF still gets a row with file-level metadata
        let pdf = match PdfMagazine::load(file_path) {
            Ok(pdf) => {
                pdf.apply_metadata(&mut magazine);
                Some(pdf)
            }
            Err(e) => {
                tracing::warn!(path = %file_path.display(), error = %e, "Failed to parse PDF");
                None
            }
        };

        // SQLite handles locking via parking_lot::Mutex
        self.db.save_magazine(&Self::magazine_to_stored(&magazine))?;

        let Some(pdf) = pdf else {
            return Ok(());
        };

        let pages: Vec<StoredPage> = (1..=magazine.total_pages)
            .map(|n| {
                let (extracted_text, text_confidence) = pdf.page_text(n);
                StoredPage {
                    magazine_id: id.to_string(),
                    page_number: i64::from(n),
                    extracted_text,
                    text_confidence,
                }
            })
            .collect();
        self.db.replace_pages(id, &pages)?;

        Ok(())
    }

    /// Start a background scan (non-blocking).
    pub fn start_background_scan(&self) {
        let state = self.clone();
        std::thread::spawn(move || {
            if let Err(e) = state.scan_library() {
                tracing::error!(error = %e, "Background scan failed");
            }
        });
    }

    /// Get all magazines.
    pub fn get_all_magazines(&self) -> Vec<Magazine> {
        self.magazines.read().clone()
    }

    /// Get magazine by ID.
    pub fn get_magazine(&self, id: &str) -> Option<Magazine> {
        self.magazines.read().iter().find(|m| m.id == id).cloned()
    }

    /// Get magazine count.
    pub fn magazine_count(&self) -> usize {
        self.magazines.read().len()
    }

    /// Extract or generate the visual for one page of a magazine.
    ///
    /// The embedded page image is used when the PDF carries one; pages
    /// without one (or unreadable PDFs) fall back to a generated
    /// placeholder so a single bad page never blocks the rest.
    pub fn page_image(&self, magazine: &Magazine, page_number: u32) -> Vec<u8> {
        match PdfMagazine::load(&magazine.path).and_then(|pdf| pdf.page_image(page_number)) {
            Ok(Some(data)) => data,
            Ok(None) => self.placeholder_for(magazine, page_number),
            Err(e) => {
                tracing::debug!(
                    magazine = %magazine.id,
                    page = page_number,
                    error = %e,
                    "Page image extraction failed, using placeholder"
                );
                self.placeholder_for(magazine, page_number)
            }
        }
    }

    fn placeholder_for(&self, magazine: &Magazine, page_number: u32) -> Vec<u8> {
        crate::render::placeholder_page(
            &magazine.title,
            page_number,
            self.config.render.page_width,
            self.config.render.page_height,
        )
    }
}

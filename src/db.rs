mod schema;

pub use schema::Database;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored magazine record (full metadata cache).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMagazine {
    /// Magazine ID.
    pub id: String,
    /// Magazine title.
    pub title: String,
    /// Magazine description.
    pub description: Option<String>,
    /// Author name.
    pub author: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    /// Absolute path to the PDF file.
    pub path: String,
    /// File size in bytes.
    pub file_size: i64,
    /// File modification time (for cache invalidation).
    pub mtime: i64,
    /// Total number of PDF pages.
    pub total_pages: i64,
    /// Whether the magazine is featured.
    pub is_featured: bool,
    /// View counter.
    pub view_count: i64,
    /// Download counter.
    pub download_count: i64,
    /// Creation timestamp.
    pub created_at: i64,
    /// Last update timestamp.
    pub updated_at: i64,
}

/// Per-page record with extracted text for search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPage {
    /// Magazine ID.
    pub magazine_id: String,
    /// Page number (1-based).
    pub page_number: i64,
    /// Text extracted from the page.
    pub extracted_text: String,
    /// Extraction confidence in [0.0, 1.0].
    pub text_confidence: f64,
}

/// Reading progress for a magazine.
///
/// One row per magazine; concurrent updates resolve last-write-wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingProgress {
    /// Magazine ID.
    pub magazine_id: String,
    /// Current page number (1-based).
    pub current_page: i64,
    /// Reading percentage (0.0 - 100.0).
    pub percentage: f64,
    /// Total time spent reading in seconds.
    pub time_spent_seconds: i64,
    /// Last update timestamp.
    pub updated_at: i64,
}

/// Bookmark on a magazine page.
///
/// Keyed by (magazine, page); re-adding the same page updates the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    /// Magazine ID.
    pub magazine_id: String,
    /// Page number (1-based).
    pub page_number: i64,
    /// Optional user note.
    pub note: Option<String>,
    /// Creation timestamp.
    pub created_at: i64,
}

/// Aggregate library statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryStats {
    /// Number of magazines.
    pub total_magazines: i64,
    /// Sum of view counters.
    pub total_views: i64,
    /// Sum of download counters.
    pub total_downloads: i64,
}

/// Timestamp helper.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Convert timestamp to DateTime.
pub fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
}

//! Magazine metadata model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Represents a flipbook magazine in the library.
///
/// Serialized in the camelCase shape the reader API exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Magazine {
    /// Unique identifier for the magazine.
    pub id: String,

    /// Magazine title.
    pub title: String,

    /// Description or summary.
    pub description: Option<String>,

    /// Author name.
    pub author: Option<String>,

    /// Category slug.
    pub category: Option<String>,

    /// Total number of PDF pages.
    pub total_pages: u32,

    /// Whether the magazine is featured.
    pub is_featured: bool,

    /// View counter.
    pub view_count: u64,

    /// Download counter.
    pub download_count: u64,

    /// Path to the PDF file. Not exposed to clients.
    #[serde(skip)]
    pub path: PathBuf,

    /// File size in bytes.
    pub file_size: u64,

    /// Last modified time.
    pub modified: DateTime<Utc>,
}

impl Magazine {
    /// Create a new magazine with minimal information.
    pub fn new(path: PathBuf) -> Self {
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown")
            .to_string();

        // Generate a deterministic UUID based on the file path
        let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, path.to_string_lossy().as_bytes()).to_string();

        Self {
            id,
            title,
            description: None,
            author: None,
            category: None,
            total_pages: 0,
            is_featured: false,
            view_count: 0,
            download_count: 0,
            path,
            file_size: 0,
            modified: Utc::now(),
        }
    }

    /// Get the filename of the magazine PDF.
    pub fn filename(&self) -> &str {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown.pdf")
    }

    /// Display name for the author.
    pub fn author_display(&self) -> &str {
        self.author.as_deref().unwrap_or("Unknown Author")
    }
}

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Flipbook magazine server with reading sync.
#[derive(Parser, Debug, Clone)]
#[command(name = "flipbook-rs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "FLIPBOOK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the server (default if no command given).
    Serve {
        /// Address to bind the server to.
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Path to the magazines directory (overrides config).
        #[arg(short, long)]
        magazines: Option<PathBuf>,
    },

    /// Magazine management commands.
    Magazine {
        /// Magazine subcommand action.
        #[command(subcommand)]
        action: MagazineCommand,
    },

    /// Initialize database and create default config.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// Magazine management subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum MagazineCommand {
    /// List all magazines known to the database.
    List,

    /// Delete a magazine (and its pages, bookmarks, progress).
    Del {
        /// Magazine ID.
        id: String,
    },

    /// Scan the magazines directory and ingest new or changed PDFs.
    Scan,
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Magazine library configuration.
    #[serde(default)]
    pub library: LibraryConfig,

    /// Scan configuration.
    #[serde(default)]
    pub scan: ScanConfig,

    /// Page rendering configuration.
    #[serde(default)]
    pub render: RenderConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Site title.
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            title: default_title(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::new(
        std::net::IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        8080,
    )
}

fn default_title() -> String {
    "Flipbook Library".to_string()
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/flipbook.db")
}

/// Magazine library configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Directory containing magazine PDFs.
    #[serde(default = "default_magazines_dir")]
    pub magazines_dir: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            magazines_dir: default_magazines_dir(),
        }
    }
}

fn default_magazines_dir() -> PathBuf {
    PathBuf::from("data/magazines")
}

/// Scan configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Rescan interval in seconds (0 to disable).
    #[serde(default = "default_scan_interval")]
    pub interval_seconds: u64,

    /// Number of parallel workers for PDF processing (1 = sequential).
    /// Keep low for NAS/network storage to avoid saturation.
    #[serde(default = "default_scan_workers")]
    pub workers: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_scan_interval(),
            workers: default_scan_workers(),
        }
    }
}

fn default_scan_interval() -> u64 {
    300
}

fn default_scan_workers() -> usize {
    1 // Sequential by default - safe for NAS/Raspberry Pi
}

/// Page rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Placeholder page width in pixels.
    #[serde(default = "default_page_width")]
    pub page_width: u32,

    /// Placeholder page height in pixels.
    #[serde(default = "default_page_height")]
    pub page_height: u32,

    /// Thumbnail size in pixels (longest edge).
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page_width: default_page_width(),
            page_height: default_page_height(),
            thumbnail_size: default_thumbnail_size(),
        }
    }
}

fn default_page_width() -> u32 {
    600
}

fn default_page_height() -> u32 {
    800
}

fn default_thumbnail_size() -> u32 {
    200
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &PathBuf) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("config.toml"),
            PathBuf::from("flipbook-rs.toml"),
            dirs::config_dir()
                .map(|p| p.join("flipbook-rs").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/flipbook-rs/config.toml"),
        ];

        candidates.into_iter().find(|p| p.exists())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# flipbook-rs configuration

[server]
bind = "0.0.0.0:8080"
title = "Flipbook Library"

[database]
# path = "/var/lib/flipbook-rs/flipbook.db"

[library]
# Directory containing magazine PDFs
magazines_dir = "data/magazines"

[scan]
# Rescan interval in seconds (0 to disable)
interval_seconds = 300
# Parallel PDF workers (1 = sequential)
workers = 1

[render]
# Placeholder page dimensions
page_width = 600
page_height = 800
thumbnail_size = 200
"#
        .to_string()
    }
}

//! flipbook-rs: A lightweight flipbook server for PDF magazines with reading sync.
//!
//! This crate serves a directory of magazine PDFs as a paginated
//! flipbook: spreads of two facing pages behind a synthetic title leaf,
//! with reading progress, bookmarks and in-magazine text search.
//!
//! # Features
//!
//! - Spread-based reader state machine (navigation, zoom, fullscreen)
//! - Reading progress and bookmark persistence
//! - Full-text search over extracted page text
//! - Automatic PDF metadata extraction
//! - Page image extraction with generated placeholders
//! - Incremental library scanning
//! - View and download counters

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Configuration and CLI.
pub mod config;
/// Database operations.
pub mod db;
/// Error types.
pub mod error;
/// Library and magazine models.
pub mod library;
/// PDF parsing and extraction.
pub mod pdf;
/// Reader state machine.
pub mod reader;
/// Generated page visuals.
pub mod render;
/// HTTP server.
pub mod server;

#[cfg(test)]
mod tests;

pub use config::{Cli, Command, Config};
pub use db::Database;
pub use error::{AppError, Result};
pub use reader::{ReaderSession, SpreadLayout};
pub use server::AppState;

use crate::config::Config;
use crate::db::{Bookmark, Database, ReadingProgress, StoredMagazine, StoredPage, now_timestamp};
use crate::error::{AppError, Result};
use crate::reader::session::{FullscreenHost, PagePresenter, ProgressStore};
use crate::reader::{PageStatus, ReaderCommand, ReaderSession, SpreadLayout};
use crate::reader::{command_for_key, command_for_swipe};
use parking_lot::Mutex;
use std::sync::Arc;

fn test_db() -> Database {
    Database::open_memory().unwrap()
}

fn create_magazine(db: &Database, id: &str, title: &str) {
    let magazine = StoredMagazine {
        id: id.to_string(),
        title: title.to_string(),
        description: None,
        author: None,
        category: None,
        path: format!("/test/{}.pdf", id),
        file_size: 1000,
        mtime: now_timestamp(),
        total_pages: 10,
        is_featured: false,
        view_count: 0,
        download_count: 0,
        created_at: now_timestamp(),
        updated_at: now_timestamp(),
    };
    db.save_magazine(&magazine).unwrap();
}

// ============================================================================
// SPREAD LAYOUT
// ============================================================================

#[test]
fn spread_count_includes_title_leaf() {
    assert_eq!(SpreadLayout::new(10).spread_count(), 6);
    assert_eq!(SpreadLayout::new(9).spread_count(), 6);
    assert_eq!(SpreadLayout::new(1).spread_count(), 2);
    assert_eq!(SpreadLayout::new(0).spread_count(), 1);
}

#[test]
fn spread_pages_pair_up() {
    let layout = SpreadLayout::new(10);
    assert_eq!(layout.pages_for(0), None);
    assert_eq!(layout.pages_for(1), Some((1, Some(2))));
    assert_eq!(layout.pages_for(5), Some((9, Some(10))));
    assert_eq!(layout.pages_for(6), None);

    // Odd page count drops the trailing page
    let odd = SpreadLayout::new(9);
    assert_eq!(odd.pages_for(5), Some((9, None)));
}

#[test]
fn spread_clamp_bounds_any_target() {
    let layout = SpreadLayout::new(10);
    assert_eq!(layout.clamp(-5), 0);
    assert_eq!(layout.clamp(0), 0);
    assert_eq!(layout.clamp(3), 3);
    assert_eq!(layout.clamp(99), 5);
}

#[test]
fn spread_for_page_is_half_rounded_up() {
    let layout = SpreadLayout::new(10);
    assert_eq!(layout.spread_for_page(1), 1);
    assert_eq!(layout.spread_for_page(2), 1);
    assert_eq!(layout.spread_for_page(7), 4);
    assert_eq!(layout.spread_for_page(10), 5);
    // Out-of-range pages clamp to the last spread
    assert_eq!(layout.spread_for_page(99), 5);
}

#[test]
fn spread_labels() {
    let layout = SpreadLayout::new(10);
    assert_eq!(layout.label(0), "Title Page");
    assert_eq!(layout.label(1), "Pages 1-2 of 10");
    assert_eq!(layout.label(5), "Pages 9-10 of 10");

    let odd = SpreadLayout::new(9);
    assert_eq!(odd.label(5), "Pages 9-9 of 9");
}

#[test]
fn percentage_is_clamped() {
    let layout = SpreadLayout::new(10);
    assert_eq!(layout.percentage(5), 50.0);
    assert_eq!(layout.percentage(10), 100.0);
    assert_eq!(layout.percentage(99), 100.0);
    assert_eq!(SpreadLayout::new(0).percentage(3), 0.0);
}

// ============================================================================
// READER SESSION
// ============================================================================

#[derive(Clone, Default)]
struct FakePresenter {
    flips: Arc<Mutex<Vec<u32>>>,
}

impl PagePresenter for FakePresenter {
    fn flip_to(&mut self, spread: u32) {
        self.flips.lock().push(spread);
    }
    fn flip_next(&mut self) {}
    fn flip_prev(&mut self) {}
}

#[derive(Clone)]
struct FakeHost {
    deny: bool,
    exits: Arc<Mutex<u32>>,
}

impl FakeHost {
    fn new(deny: bool) -> Self {
        Self {
            deny,
            exits: Arc::new(Mutex::new(0)),
        }
    }
}

impl FullscreenHost for FakeHost {
    fn request_fullscreen(&mut self) -> Result<()> {
        if self.deny {
            Err(AppError::Internal("denied".to_string()))
        } else {
            Ok(())
        }
    }
    fn exit_fullscreen(&mut self) {
        *self.exits.lock() += 1;
    }
}

#[derive(Clone, Default)]
struct FakeStore {
    fail: bool,
    progress: Arc<Mutex<Vec<ReadingProgress>>>,
    bookmarks: Arc<Mutex<Vec<u32>>>,
}

impl ProgressStore for FakeStore {
    fn save_progress(&mut self, _magazine_id: &str, progress: &ReadingProgress) -> Result<()> {
        if self.fail {
            return Err(AppError::Internal("store down".to_string()));
        }
        self.progress.lock().push(progress.clone());
        Ok(())
    }
    fn add_bookmark(&mut self, _magazine_id: &str, page_number: u32) -> Result<()> {
        if self.fail {
            return Err(AppError::Internal("store down".to_string()));
        }
        self.bookmarks.lock().push(page_number);
        Ok(())
    }
    fn remove_bookmark(&mut self, _magazine_id: &str, page_number: u32) -> Result<()> {
        if self.fail {
            return Err(AppError::Internal("store down".to_string()));
        }
        self.bookmarks.lock().retain(|&p| p != page_number);
        Ok(())
    }
}

fn test_session(
    total_pages: u32,
) -> (
    ReaderSession<FakePresenter, FakeHost, FakeStore>,
    FakePresenter,
    FakeStore,
) {
    let presenter = FakePresenter::default();
    let store = FakeStore::default();
    let session = ReaderSession::new(
        "mag-1",
        total_pages,
        presenter.clone(),
        FakeHost::new(false),
        store.clone(),
    );
    (session, presenter, store)
}

#[test]
fn session_go_to_spread_clamps_and_flips() {
    let (mut session, presenter, _) = test_session(10);

    assert_eq!(session.go_to_spread(99), 5);
    assert_eq!(presenter.flips.lock().as_slice(), &[5]);

    session.flip_complete(5);
    assert_eq!(session.current_spread(), 5);
    assert_eq!(session.display_text(), "Pages 9-10 of 10");
}

#[test]
fn session_ignores_request_while_flip_in_flight() {
    let (mut session, presenter, _) = test_session(10);

    session.go_to_spread(3);
    assert!(session.is_flipping());

    // Second request before the flip lands is dropped, not queued
    assert_eq!(session.go_to_spread(1), 0);
    assert_eq!(presenter.flips.lock().len(), 1);

    session.flip_complete(3);
    assert!(!session.is_flipping());
    assert_eq!(session.go_to_spread(1), 1);
}

#[test]
fn session_same_target_does_not_retrigger() {
    let (mut session, presenter, _) = test_session(10);

    assert_eq!(session.go_to_spread(0), 0);
    assert!(presenter.flips.lock().is_empty());
    assert!(!session.is_flipping());
}

#[test]
fn session_navigation_stops_at_boundaries() {
    let (mut session, presenter, _) = test_session(10);

    // Prev at the title spread stays put
    assert_eq!(session.prev_spread(), 0);
    assert!(presenter.flips.lock().is_empty());

    session.go_to_spread(5);
    session.flip_complete(5);

    // Next at the last spread stays put
    assert_eq!(session.next_spread(), 5);
    assert_eq!(presenter.flips.lock().len(), 1);
}

#[test]
fn session_empty_magazine_navigation_is_noop() {
    let (mut session, presenter, _) = test_session(0);

    assert_eq!(session.layout().spread_count(), 1);
    assert_eq!(session.go_to_spread(3), 0);
    assert_eq!(session.next_spread(), 0);
    assert_eq!(session.prev_spread(), 0);
    assert!(presenter.flips.lock().is_empty());
    assert_eq!(session.display_text(), "Title Page");
}

#[test]
fn session_flip_complete_records_progress() {
    let (mut session, _, store) = test_session(10);

    session.go_to_spread(4);
    session.flip_complete(4);

    let saved = store.progress.lock();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].current_page, 7);
    assert_eq!(saved[0].percentage, 70.0);
}

#[test]
fn session_progress_failure_does_not_block_navigation() {
    let presenter = FakePresenter::default();
    let store = FakeStore {
        fail: true,
        ..Default::default()
    };
    let mut session =
        ReaderSession::new("mag-1", 10, presenter, FakeHost::new(false), store.clone());

    session.go_to_spread(2);
    session.flip_complete(2);

    assert_eq!(session.current_spread(), 2);
    assert!(store.progress.lock().is_empty());
}

#[test]
fn session_zoom_bounds() {
    let (mut session, _, _) = test_session(10);

    for _ in 0..20 {
        session.zoom_in();
    }
    assert_eq!(session.zoom(), 3.0);

    for _ in 0..40 {
        session.zoom_out();
    }
    assert_eq!(session.zoom(), 0.5);

    assert_eq!(session.reset_zoom(), 1.0);
    assert_eq!(session.zoom(), 1.0);
}

#[test]
fn session_fullscreen_toggle() {
    let host = FakeHost::new(false);
    let exits = host.exits.clone();
    let mut session = ReaderSession::new(
        "mag-1",
        10,
        FakePresenter::default(),
        host,
        FakeStore::default(),
    );

    assert!(session.toggle_fullscreen());
    assert!(session.is_fullscreen());
    assert!(!session.toggle_fullscreen());
    assert_eq!(*exits.lock(), 1);
}

#[test]
fn session_fullscreen_denial_keeps_flag_false() {
    let mut session = ReaderSession::new(
        "mag-1",
        10,
        FakePresenter::default(),
        FakeHost::new(true),
        FakeStore::default(),
    );

    assert!(!session.toggle_fullscreen());
    assert!(!session.is_fullscreen());
}

#[test]
fn session_bookmarks_deduplicate() {
    let (mut session, _, _) = test_session(10);

    session.add_bookmark(3).unwrap();
    session.add_bookmark(3).unwrap();
    session.add_bookmark(7).unwrap();

    assert_eq!(session.bookmarked_pages().collect::<Vec<_>>(), vec![3, 7]);
    assert!(session.is_bookmarked(3));

    session.remove_bookmark(3).unwrap();
    assert!(!session.is_bookmarked(3));
}

#[test]
fn session_bookmark_optimistic_on_store_failure() {
    let presenter = FakePresenter::default();
    let store = FakeStore {
        fail: true,
        ..Default::default()
    };
    let mut session = ReaderSession::new("mag-1", 10, presenter, FakeHost::new(false), store);

    // Store error surfaces but the in-memory set keeps the page
    assert!(session.add_bookmark(4).is_err());
    assert!(session.is_bookmarked(4));
}

#[test]
fn session_search_result_navigates_to_containing_spread() {
    let (mut session, presenter, _) = test_session(10);

    assert_eq!(session.handle_search_result(7), 4);
    assert_eq!(presenter.flips.lock().as_slice(), &[4]);
}

#[test]
fn session_restore_page_skips_animation() {
    let (mut session, presenter, _) = test_session(10);

    session.restore_page(8);
    assert_eq!(session.current_spread(), 4);
    assert!(presenter.flips.lock().is_empty());
}

#[test]
fn session_page_status_tracking() {
    let (mut session, _, _) = test_session(10);

    assert_eq!(session.page_status(3), PageStatus::Loading);
    session.page_ready(3);
    assert_eq!(session.page_status(3), PageStatus::Ready);

    // A failed page falls back to a placeholder, others are untouched
    session.page_failed(4);
    assert_eq!(session.page_status(4), PageStatus::Failed);
    assert_eq!(session.page_status(3), PageStatus::Ready);
}

// ============================================================================
// INPUT MAPPING
// ============================================================================

#[test]
fn keyboard_mapping() {
    assert_eq!(
        command_for_key("ArrowRight", false),
        Some(ReaderCommand::NextSpread)
    );
    assert_eq!(
        command_for_key("ArrowLeft", false),
        Some(ReaderCommand::PrevSpread)
    );
    assert_eq!(
        command_for_key("f", false),
        Some(ReaderCommand::ToggleFullscreen)
    );
    assert_eq!(command_for_key("+", false), Some(ReaderCommand::ZoomIn));
    assert_eq!(command_for_key("=", false), Some(ReaderCommand::ZoomIn));
    assert_eq!(command_for_key("-", false), Some(ReaderCommand::ZoomOut));
    assert_eq!(command_for_key("0", false), Some(ReaderCommand::ResetZoom));
    assert_eq!(
        command_for_key("Escape", false),
        Some(ReaderCommand::ExitFullscreen)
    );
    assert_eq!(command_for_key("x", false), None);
}

#[test]
fn keyboard_ignored_while_typing() {
    assert_eq!(command_for_key("ArrowRight", true), None);
    assert_eq!(command_for_key("f", true), None);
}

#[test]
fn swipe_mapping() {
    // Left swipe advances, right swipe goes back
    assert_eq!(command_for_swipe(-80.0, 10.0), Some(ReaderCommand::NextSpread));
    assert_eq!(command_for_swipe(80.0, -10.0), Some(ReaderCommand::PrevSpread));

    // Under the threshold is a tap
    assert_eq!(command_for_swipe(-30.0, 5.0), None);

    // Vertical dominance wins
    assert_eq!(command_for_swipe(20.0, -90.0), Some(ReaderCommand::RevealControls));
    assert_eq!(command_for_swipe(20.0, 90.0), None);
}

// ============================================================================
// DATABASE
// ============================================================================

#[test]
fn db_save_and_get_magazine() {
    let db = test_db();
    create_magazine(&db, "mag-1", "Test Magazine");

    let found = db.get_magazine("mag-1").unwrap().unwrap();
    assert_eq!(found.title, "Test Magazine");
    assert_eq!(found.total_pages, 10);

    assert!(db.get_magazine("missing").unwrap().is_none());
}

#[test]
fn db_resave_preserves_counters() {
    let db = test_db();
    create_magazine(&db, "mag-1", "Test Magazine");
    db.increment_views("mag-1").unwrap();
    db.increment_downloads("mag-1").unwrap();

    // Rescan writes the row again with fresh metadata
    let mut updated = db.get_magazine("mag-1").unwrap().unwrap();
    updated.title = "Renamed".to_string();
    updated.view_count = 0;
    updated.download_count = 0;
    db.save_magazine(&updated).unwrap();

    let found = db.get_magazine("mag-1").unwrap().unwrap();
    assert_eq!(found.title, "Renamed");
    assert_eq!(found.view_count, 1);
    assert_eq!(found.download_count, 1);
}

#[test]
fn db_delete_magazine_cascades() {
    let db = test_db();
    create_magazine(&db, "mag-1", "Test Magazine");
    db.replace_pages("mag-1", &[StoredPage {
        magazine_id: "mag-1".to_string(),
        page_number: 1,
        extracted_text: "hello".to_string(),
        text_confidence: 0.9,
    }])
    .unwrap();
    db.save_bookmark(&Bookmark {
        magazine_id: "mag-1".to_string(),
        page_number: 1,
        note: None,
        created_at: now_timestamp(),
    })
    .unwrap();

    assert!(db.delete_magazine("mag-1").unwrap());
    assert!(db.get_magazine("mag-1").unwrap().is_none());
    assert!(db.get_pages("mag-1").unwrap().is_empty());
    assert!(db.get_bookmarks("mag-1").unwrap().is_empty());

    assert!(!db.delete_magazine("mag-1").unwrap());
}

#[test]
fn db_library_stats() {
    let db = test_db();
    create_magazine(&db, "mag-1", "One");
    create_magazine(&db, "mag-2", "Two");
    db.increment_views("mag-1").unwrap();
    db.increment_views("mag-2").unwrap();
    db.increment_downloads("mag-1").unwrap();

    let stats = db.library_stats().unwrap();
    assert_eq!(stats.total_magazines, 2);
    assert_eq!(stats.total_views, 2);
    assert_eq!(stats.total_downloads, 1);
}

#[test]
fn db_replace_and_search_pages() {
    let db = test_db();
    create_magazine(&db, "mag-1", "Test Magazine");

    let pages: Vec<StoredPage> = (1..=3)
        .map(|n| StoredPage {
            magazine_id: "mag-1".to_string(),
            page_number: n,
            extracted_text: format!("Content of page {}", n),
            text_confidence: 0.8,
        })
        .collect();
    db.replace_pages("mag-1", &pages).unwrap();

    assert_eq!(db.get_pages("mag-1").unwrap().len(), 3);

    // Case-insensitive substring match
    let hits = db.search_pages("mag-1", "content OF PAGE 2").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].page_number, 2);

    // LIKE wildcards in the query are literal
    assert!(db.search_pages("mag-1", "p%ge").unwrap().is_empty());

    // Replacing again drops the old rows
    db.replace_pages("mag-1", &pages[..1]).unwrap();
    assert_eq!(db.get_pages("mag-1").unwrap().len(), 1);
}

#[test]
fn db_progress_last_write_wins() {
    let db = test_db();
    create_magazine(&db, "mag-1", "Test Magazine");

    let mut progress = ReadingProgress {
        magazine_id: "mag-1".to_string(),
        current_page: 3,
        percentage: 30.0,
        time_spent_seconds: 60,
        updated_at: now_timestamp(),
    };
    db.save_progress(&progress).unwrap();

    progress.current_page = 7;
    progress.percentage = 70.0;
    db.save_progress(&progress).unwrap();

    let found = db.get_progress("mag-1").unwrap().unwrap();
    assert_eq!(found.current_page, 7);
    assert_eq!(found.percentage, 70.0);

    assert!(db.get_progress("missing").unwrap().is_none());
}

#[test]
fn db_bookmark_upsert_no_duplicates() {
    let db = test_db();
    create_magazine(&db, "mag-1", "Test Magazine");

    let bookmark = Bookmark {
        magazine_id: "mag-1".to_string(),
        page_number: 4,
        note: None,
        created_at: now_timestamp(),
    };
    db.save_bookmark(&bookmark).unwrap();
    db.save_bookmark(&Bookmark {
        note: Some("second pass".to_string()),
        ..bookmark.clone()
    })
    .unwrap();

    let bookmarks = db.get_bookmarks("mag-1").unwrap();
    assert_eq!(bookmarks.len(), 1);
    assert_eq!(bookmarks[0].note.as_deref(), Some("second pass"));

    assert!(db.delete_bookmark("mag-1", 4).unwrap());
    assert!(!db.delete_bookmark("mag-1", 4).unwrap());
}

// ============================================================================
// CONFIG
// ============================================================================

#[test]
fn config_defaults() {
    let config = Config::default();
    assert_eq!(config.server.bind.port(), 8080);
    assert_eq!(config.scan.interval_seconds, 300);
    assert_eq!(config.scan.workers, 1);
    assert_eq!(config.render.page_width, 600);
    assert_eq!(config.render.page_height, 800);
}

#[test]
fn config_partial_toml_fills_defaults() {
    let config: Config = toml::from_str(
        r#"
        [server]
        bind = "127.0.0.1:9090"

        [scan]
        workers = 4
        "#,
    )
    .unwrap();

    assert_eq!(config.server.bind.port(), 9090);
    assert_eq!(config.scan.workers, 4);
    assert_eq!(config.server.title, "Flipbook Library");
    assert_eq!(config.scan.interval_seconds, 300);
}

#[test]
fn config_generated_default_parses() {
    let config: Config = toml::from_str(&Config::generate_default()).unwrap();
    assert_eq!(config.server.bind.port(), 8080);
}

// ============================================================================
// RENDER
// ============================================================================

#[test]
fn placeholder_page_is_png() {
    let data = crate::render::placeholder_page("Test Magazine", 7, 600, 800);
    assert!(data.starts_with(&[0x89, 0x50, 0x4E, 0x47]));

    let img = image::load_from_memory(&data).unwrap();
    assert_eq!(img.width(), 600);
    assert_eq!(img.height(), 800);
}

#[test]
fn placeholder_is_deterministic_per_title() {
    let a = crate::render::placeholder_page("Alpha", 1, 300, 400);
    let b = crate::render::placeholder_page("Alpha", 1, 300, 400);
    let c = crate::render::placeholder_page("Beta", 1, 300, 400);
    assert_eq!(a, b);
    assert_ne!(a, c);
}

// ============================================================================
// SCAN
// ============================================================================

#[test]
fn scan_removes_magazines_missing_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.library.magazines_dir = dir.path().to_path_buf();

    let db = test_db();
    create_magazine(&db, "mag-gone", "Vanished");

    let state = crate::server::AppState::new_with_db(config, db.clone());
    state.scan_library().unwrap();

    assert!(db.get_magazine("mag-gone").unwrap().is_none());
    assert_eq!(state.magazine_count(), 0);
}

#[test]
fn scan_missing_directory_is_harmless() {
    let mut config = Config::default();
    config.library.magazines_dir = std::path::PathBuf::from("/nonexistent/magazines");

    let state = crate::server::AppState::new_with_db(config, test_db());
    state.scan_library().unwrap();
    assert_eq!(state.magazine_count(), 0);
}

//! Reader session state machine.
//!
//! One session per open magazine. Navigation intents are validated and
//! clamped here, then handed to the injected page-turn presenter; the
//! session only commits a new spread index when the presenter reports
//! the flip complete. Progress and bookmark writes go through the
//! injected store and never block navigation.

use crate::db::ReadingProgress;
use crate::error::Result;
use crate::reader::spread::SpreadLayout;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Zoom step applied per zoom in/out action.
pub const ZOOM_STEP: f64 = 1.2;
/// Lower zoom bound.
pub const ZOOM_MIN: f64 = 0.5;
/// Upper zoom bound.
pub const ZOOM_MAX: f64 = 3.0;

/// Imperative page-turn surface of the flip animation engine.
pub trait PagePresenter {
    /// Animate a flip to the given spread index.
    fn flip_to(&mut self, spread: u32);
    /// Animate a flip to the next spread.
    fn flip_next(&mut self);
    /// Animate a flip to the previous spread.
    fn flip_prev(&mut self);
}

/// Fullscreen control on the reader container.
///
/// Entering fullscreen can be denied by the host environment; the
/// session logs the denial and keeps the flag false.
pub trait FullscreenHost {
    /// Ask the host to enter fullscreen.
    fn request_fullscreen(&mut self) -> Result<()>;
    /// Leave fullscreen.
    fn exit_fullscreen(&mut self);
}

/// Remote persistence for progress and bookmarks.
pub trait ProgressStore {
    /// Persist a progress record, last write wins.
    fn save_progress(&mut self, magazine_id: &str, progress: &ReadingProgress) -> Result<()>;
    /// Persist a bookmark for a page.
    fn add_bookmark(&mut self, magazine_id: &str, page_number: u32) -> Result<()>;
    /// Delete the bookmark for a page.
    fn remove_bookmark(&mut self, magazine_id: &str, page_number: u32) -> Result<()>;
}

/// Load state of one page visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// No load callback has arrived yet.
    Loading,
    /// The page visual is available.
    Ready,
    /// Render failed; a placeholder is shown instead.
    Failed,
}

/// Reader state for one magazine view.
pub struct ReaderSession<P, F, S> {
    magazine_id: String,
    layout: SpreadLayout,
    presenter: P,
    fullscreen_host: F,
    store: S,
    current_spread: u32,
    flip_in_flight: bool,
    zoom: f64,
    fullscreen: bool,
    bookmarks: BTreeSet<u32>,
    pages: BTreeMap<u32, PageStatus>,
    opened_at: Instant,
}

impl<P, F, S> ReaderSession<P, F, S>
where
    P: PagePresenter,
    F: FullscreenHost,
    S: ProgressStore,
{
    pub fn new(
        magazine_id: impl Into<String>,
        total_pages: u32,
        presenter: P,
        fullscreen_host: F,
        store: S,
    ) -> Self {
        Self {
            magazine_id: magazine_id.into(),
            layout: SpreadLayout::new(total_pages),
            presenter,
            fullscreen_host,
            store,
            current_spread: 0,
            flip_in_flight: false,
            zoom: 1.0,
            fullscreen: false,
            bookmarks: BTreeSet::new(),
            pages: BTreeMap::new(),
            opened_at: Instant::now(),
        }
    }

    /// Spread geometry of the open magazine.
    pub fn layout(&self) -> &SpreadLayout {
        &self.layout
    }

    /// Spread currently shown.
    pub fn current_spread(&self) -> u32 {
        self.current_spread
    }

    /// Current zoom factor.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Whether the reader is fullscreen.
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Whether a flip animation is in flight.
    pub fn is_flipping(&self) -> bool {
        self.flip_in_flight
    }

    /// Label for the spread currently shown.
    pub fn display_text(&self) -> String {
        self.layout.label(self.current_spread)
    }

    /// Request navigation to a spread. The target is clamped to the
    /// valid range; requests issued mid-flip or targeting the current
    /// spread are ignored. Returns the spread the reader will land on.
    pub fn go_to_spread(&mut self, target: i64) -> u32 {
        let target = self.layout.clamp(target);
        if self.flip_in_flight || target == self.current_spread {
            return self.current_spread;
        }
        self.flip_in_flight = true;
        self.presenter.flip_to(target);
        target
    }

    /// Navigate one spread forward, silently clamped at the end.
    pub fn next_spread(&mut self) -> u32 {
        self.go_to_spread(i64::from(self.current_spread) + 1)
    }

    /// Navigate one spread back, silently clamped at the title leaf.
    pub fn prev_spread(&mut self) -> u32 {
        self.go_to_spread(i64::from(self.current_spread) - 1)
    }

    /// Presenter callback once a flip animation has finished.
    ///
    /// Commits the new index and records progress for the first page of
    /// the landed spread.
    pub fn flip_complete(&mut self, spread: u32) {
        self.current_spread = self.layout.clamp(i64::from(spread));
        self.flip_in_flight = false;
        self.record_progress(self.layout.first_page(self.current_spread));
    }

    /// Jump directly to the spread holding a saved page, skipping the
    /// flip animation. Used when restoring a previous reading position.
    pub fn restore_page(&mut self, page_number: u32) {
        self.current_spread = self.layout.spread_for_page(page_number);
    }

    /// Navigate to the spread containing a search hit.
    pub fn handle_search_result(&mut self, page_number: u32) -> u32 {
        self.go_to_spread(i64::from(self.layout.spread_for_page(page_number)))
    }

    /// Zoom in one step, bounded above.
    pub fn zoom_in(&mut self) -> f64 {
        self.zoom = (self.zoom * ZOOM_STEP).clamp(ZOOM_MIN, ZOOM_MAX);
        self.zoom
    }

    /// Zoom out one step, bounded below.
    pub fn zoom_out(&mut self) -> f64 {
        self.zoom = (self.zoom / ZOOM_STEP).clamp(ZOOM_MIN, ZOOM_MAX);
        self.zoom
    }

    /// Reset zoom to exactly 1.0.
    pub fn reset_zoom(&mut self) -> f64 {
        self.zoom = 1.0;
        self.zoom
    }

    /// Toggle fullscreen. Denied requests leave the flag false.
    pub fn toggle_fullscreen(&mut self) -> bool {
        if self.fullscreen {
            self.fullscreen_host.exit_fullscreen();
            self.fullscreen = false;
        } else {
            match self.fullscreen_host.request_fullscreen() {
                Ok(()) => self.fullscreen = true,
                Err(e) => {
                    tracing::warn!("Fullscreen request denied: {}", e);
                }
            }
        }
        self.fullscreen
    }

    /// Leave fullscreen if active.
    pub fn exit_fullscreen(&mut self) {
        if self.fullscreen {
            self.fullscreen_host.exit_fullscreen();
            self.fullscreen = false;
        }
    }

    /// Whether a page is currently bookmarked.
    pub fn is_bookmarked(&self, page_number: u32) -> bool {
        self.bookmarks.contains(&page_number)
    }

    /// Bookmarked pages in ascending order.
    pub fn bookmarked_pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.bookmarks.iter().copied()
    }

    /// Seed the in-memory bookmark set from previously saved bookmarks.
    pub fn load_bookmarks(&mut self, pages: impl IntoIterator<Item = u32>) {
        self.bookmarks = pages.into_iter().collect();
    }

    /// Bookmark a page. The in-memory set is updated first; a store
    /// failure is logged and returned but the optimistic update stands.
    pub fn add_bookmark(&mut self, page_number: u32) -> Result<()> {
        self.bookmarks.insert(page_number);
        self.store
            .add_bookmark(&self.magazine_id, page_number)
            .inspect_err(|e| {
                tracing::warn!(
                    "Failed to save bookmark for {} page {}: {}",
                    self.magazine_id,
                    page_number,
                    e
                );
            })
    }

    /// Remove a bookmark, same optimistic semantics as adding one.
    pub fn remove_bookmark(&mut self, page_number: u32) -> Result<()> {
        self.bookmarks.remove(&page_number);
        self.store
            .remove_bookmark(&self.magazine_id, page_number)
            .inspect_err(|e| {
                tracing::warn!(
                    "Failed to remove bookmark for {} page {}: {}",
                    self.magazine_id,
                    page_number,
                    e
                );
            })
    }

    /// Persist reading progress for a page. Failures are logged and
    /// swallowed; navigation never waits on the store.
    pub fn record_progress(&mut self, page_number: u32) {
        let progress = ReadingProgress {
            magazine_id: self.magazine_id.clone(),
            current_page: i64::from(page_number),
            percentage: self.layout.percentage(page_number),
            time_spent_seconds: self.opened_at.elapsed().as_secs() as i64,
            updated_at: crate::db::now_timestamp(),
        };
        if let Err(e) = self.store.save_progress(&self.magazine_id, &progress) {
            tracing::warn!("Failed to save progress for {}: {}", self.magazine_id, e);
        }
    }

    /// Rasterizer callback: a page visual finished loading.
    pub fn page_ready(&mut self, page_number: u32) {
        self.pages.insert(page_number, PageStatus::Ready);
    }

    /// Rasterizer callback: a page visual failed to load. The page is
    /// shown as a placeholder; other pages are unaffected.
    pub fn page_failed(&mut self, page_number: u32) {
        tracing::debug!(
            "Page {} of {} failed to render, using placeholder",
            page_number,
            self.magazine_id
        );
        self.pages.insert(page_number, PageStatus::Failed);
    }

    /// Load state of a page, `Loading` until a callback arrives.
    pub fn page_status(&self, page_number: u32) -> PageStatus {
        self.pages
            .get(&page_number)
            .copied()
            .unwrap_or(PageStatus::Loading)
    }
}

/// SQLite-backed persistence, used when the session runs in-process
/// with the server store.
impl ProgressStore for crate::db::Database {
    fn save_progress(&mut self, _magazine_id: &str, progress: &ReadingProgress) -> Result<()> {
        crate::db::Database::save_progress(self, progress)
    }

    fn add_bookmark(&mut self, magazine_id: &str, page_number: u32) -> Result<()> {
        self.save_bookmark(&crate::db::Bookmark {
            magazine_id: magazine_id.to_string(),
            page_number: i64::from(page_number),
            note: None,
            created_at: crate::db::now_timestamp(),
        })
    }

    fn remove_bookmark(&mut self, magazine_id: &str, page_number: u32) -> Result<()> {
        self.delete_bookmark(magazine_id, i64::from(page_number))?;
        Ok(())
    }
}

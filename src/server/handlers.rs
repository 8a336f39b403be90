//! HTTP request handlers.

use crate::db::{self, Bookmark, ReadingProgress};
use crate::error::{AppError, Result};
use crate::library::Magazine;
use crate::reader::SpreadLayout;
use crate::server::AppState;
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, Response},
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

/// Sniff the content type of extracted page image bytes.
fn image_content_type(data: &[u8]) -> &'static str {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else {
        "image/png"
    }
}

// ============================================================================
// WEB PAGES
// ============================================================================

/// Index page (simple HTML).
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let magazine_count = state.magazine_count();
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <style>
        body {{ font-family: system-ui, sans-serif; max-width: 600px; margin: 2rem auto; padding: 0 1rem; }}
        h1 {{ color: #333; }}
        a {{ color: #0066cc; }}
        .stats {{ background: #f5f5f5; padding: 1rem; border-radius: 8px; margin: 1rem 0; }}
        code {{ background: #e8e8e8; padding: 0.2rem 0.4rem; border-radius: 4px; }}
    </style>
</head>
<body>
    <h1>{title}</h1>
    <div class="stats">
        <p><strong>{magazine_count}</strong> magazines in library</p>
    </div>
    <h2>Links</h2>
    <ul>
        <li><a href="/flipbook/magazines">Magazine List (JSON)</a></li>
        <li><a href="/flipbook/stats">Library Stats (JSON)</a></li>
    </ul>
</body>
</html>"#,
        title = state.config.server.title,
        magazine_count = magazine_count,
    );

    Html(html)
}

// ============================================================================
// MAGAZINE HANDLERS
// ============================================================================

/// Magazine list query parameters.
#[derive(Debug, Deserialize)]
pub struct MagazineListParams {
    /// Substring filter on title or author.
    search: Option<String>,
    /// Exact category slug filter.
    category: Option<String>,
    /// Keep only featured magazines.
    featured: Option<bool>,
    limit: Option<usize>,
    #[serde(default)]
    offset: usize,
}

/// Magazine list response.
#[derive(Debug, Serialize)]
pub struct MagazineListResponse {
    magazines: Vec<Magazine>,
    total: usize,
}

/// List magazines with optional filters and pagination.
pub async fn list_magazines(
    State(state): State<AppState>,
    Query(params): Query<MagazineListParams>,
) -> Json<MagazineListResponse> {
    let mut magazines = state.get_all_magazines();
    magazines.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));

    if let Some(search) = params.search.as_deref().map(str::to_lowercase) {
        magazines.retain(|m| {
            m.title.to_lowercase().contains(&search)
                || m.author
                    .as_deref()
                    .is_some_and(|a| a.to_lowercase().contains(&search))
        });
    }
    if let Some(category) = params.category.as_deref() {
        magazines.retain(|m| m.category.as_deref() == Some(category));
    }
    if params.featured == Some(true) {
        magazines.retain(|m| m.is_featured);
    }

    let total = magazines.len();
    let magazines: Vec<Magazine> = magazines
        .into_iter()
        .skip(params.offset)
        .take(params.limit.unwrap_or(usize::MAX))
        .collect();

    Json(MagazineListResponse { magazines, total })
}

/// Magazine detail response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MagazineResponse {
    magazine: Magazine,
    spread_count: u32,
}

/// Magazine metadata. Opening a magazine counts as a view.
pub async fn magazine_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MagazineResponse>> {
    let magazine = state
        .get_magazine(&id)
        .ok_or_else(|| AppError::NotFound(format!("Magazine not found: {}", id)))?;

    if let Err(e) = state.db.increment_views(&id) {
        tracing::warn!(magazine = %id, error = %e, "Failed to count view");
    }

    let spread_count = SpreadLayout::new(magazine.total_pages).spread_count();
    Ok(Json(MagazineResponse {
        magazine,
        spread_count,
    }))
}

/// One page entry in the page list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEntry {
    page_number: u32,
    image_url: String,
    thumbnail_url: String,
}

/// Page list magazine summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageListMagazine {
    total_pages: u32,
}

/// Page list response.
#[derive(Debug, Serialize)]
pub struct PageListResponse {
    pages: Vec<PageEntry>,
    magazine: PageListMagazine,
}

/// List page visuals of a magazine.
pub async fn magazine_pages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PageListResponse>> {
    let magazine = state
        .get_magazine(&id)
        .ok_or_else(|| AppError::NotFound(format!("Magazine not found: {}", id)))?;

    let pages = (1..=magazine.total_pages)
        .map(|n| PageEntry {
            page_number: n,
            image_url: format!("/flipbook/magazines/{}/pages/{}/image", id, n),
            thumbnail_url: format!("/flipbook/magazines/{}/pages/{}/thumbnail", id, n),
        })
        .collect();

    Ok(Json(PageListResponse {
        pages,
        magazine: PageListMagazine {
            total_pages: magazine.total_pages,
        },
    }))
}

/// Check a page number against a magazine, 1-based.
fn validate_page(magazine: &Magazine, page: u32) -> Result<()> {
    if page == 0 || page > magazine.total_pages {
        return Err(AppError::NotFound(format!(
            "Page {} not found in magazine {}",
            page, magazine.id
        )));
    }
    Ok(())
}

/// Full-size page image.
pub async fn page_image(
    State(state): State<AppState>,
    Path((id, page)): Path<(String, u32)>,
) -> Result<Response<Body>> {
    let magazine = state
        .get_magazine(&id)
        .ok_or_else(|| AppError::NotFound(format!("Magazine not found: {}", id)))?;
    validate_page(&magazine, page)?;

    let data = state.page_image(&magazine, page);

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, image_content_type(&data))
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .body(Body::from(data))
        .unwrap_or_else(|_| Response::default()))
}

/// Page thumbnail image.
pub async fn page_thumbnail(
    State(state): State<AppState>,
    Path((id, page)): Path<(String, u32)>,
) -> Result<Response<Body>> {
    let magazine = state
        .get_magazine(&id)
        .ok_or_else(|| AppError::NotFound(format!("Magazine not found: {}", id)))?;
    validate_page(&magazine, page)?;

    let data = state.page_image(&magazine, page);

    let img = image::load_from_memory(&data)?;
    let thumb = img.thumbnail(
        state.config.render.thumbnail_size,
        state.config.render.thumbnail_size * 2,
    );

    let mut thumb_data = Vec::new();
    thumb.write_to(
        &mut std::io::Cursor::new(&mut thumb_data),
        image::ImageFormat::Png,
    )?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .body(Body::from(thumb_data))
        .unwrap_or_else(|_| Response::default()))
}

/// Raw PDF download.
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response<Body>> {
    let magazine = state
        .get_magazine(&id)
        .ok_or_else(|| AppError::NotFound(format!("Magazine not found: {}", id)))?;

    let file = tokio::fs::File::open(&magazine.path).await?;
    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    if let Err(e) = state.db.increment_downloads(&id) {
        tracing::warn!(magazine = %id, error = %e, "Failed to count download");
    }

    let content_disposition = format!("attachment; filename=\"{}\"", magazine.filename());

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_DISPOSITION, content_disposition)
        .header(header::CONTENT_LENGTH, magazine.file_size)
        .body(body)
        .unwrap_or_else(|_| Response::default()))
}

// ============================================================================
// PROGRESS HANDLERS
// ============================================================================

/// Progress update request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdateRequest {
    current_page: i64,
    percentage: Option<f64>,
    #[serde(default)]
    time_spent: i64,
}

/// Wire shape of a progress record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressBody {
    current_page: i64,
    percentage: f64,
    time_spent_seconds: i64,
}

/// Progress response.
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    progress: Option<ProgressBody>,
}

/// Get reading progress for a magazine.
pub async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProgressResponse>> {
    state
        .get_magazine(&id)
        .ok_or_else(|| AppError::NotFound(format!("Magazine not found: {}", id)))?;

    let progress = state.db.get_progress(&id)?.map(|p| ProgressBody {
        current_page: p.current_page,
        percentage: p.percentage,
        time_spent_seconds: p.time_spent_seconds,
    });

    Ok(Json(ProgressResponse { progress }))
}

/// Update reading progress. Last write wins.
pub async fn update_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ProgressUpdateRequest>,
) -> Result<StatusCode> {
    let magazine = state
        .get_magazine(&id)
        .ok_or_else(|| AppError::NotFound(format!("Magazine not found: {}", id)))?;

    if req.current_page < 1 {
        return Err(AppError::InvalidRequest(
            "currentPage must be at least 1".to_string(),
        ));
    }

    // Recompute percentage when the client omits it
    let percentage = req
        .percentage
        .unwrap_or_else(|| {
            SpreadLayout::new(magazine.total_pages).percentage(req.current_page.min(u32::MAX as i64) as u32)
        })
        .clamp(0.0, 100.0);

    let progress = ReadingProgress {
        magazine_id: id,
        current_page: req.current_page,
        percentage,
        time_spent_seconds: req.time_spent.max(0),
        updated_at: db::now_timestamp(),
    };

    state.db.save_progress(&progress)?;
    Ok(StatusCode::OK)
}

// ============================================================================
// BOOKMARK HANDLERS
// ============================================================================

/// Bookmark request, used for both add and remove.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRequest {
    page_number: i64,
    note: Option<String>,
}

/// Get bookmarks for a magazine.
pub async fn get_bookmarks(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Bookmark>>> {
    state
        .get_magazine(&id)
        .ok_or_else(|| AppError::NotFound(format!("Magazine not found: {}", id)))?;

    let bookmarks = state.db.get_bookmarks(&id)?;
    Ok(Json(bookmarks))
}

/// Add a bookmark. Re-adding a bookmarked page updates the note.
pub async fn add_bookmark(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<BookmarkRequest>,
) -> Result<StatusCode> {
    let magazine = state
        .get_magazine(&id)
        .ok_or_else(|| AppError::NotFound(format!("Magazine not found: {}", id)))?;

    if req.page_number < 1 || req.page_number > i64::from(magazine.total_pages) {
        return Err(AppError::InvalidRequest(format!(
            "pageNumber {} out of range",
            req.page_number
        )));
    }

    let bookmark = Bookmark {
        magazine_id: id,
        page_number: req.page_number,
        note: req.note,
        created_at: db::now_timestamp(),
    };

    state.db.save_bookmark(&bookmark)?;
    Ok(StatusCode::OK)
}

/// Remove a bookmark.
pub async fn remove_bookmark(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<BookmarkRequest>,
) -> Result<StatusCode> {
    state
        .get_magazine(&id)
        .ok_or_else(|| AppError::NotFound(format!("Magazine not found: {}", id)))?;

    if state.db.delete_bookmark(&id, req.page_number)? {
        Ok(StatusCode::OK)
    } else {
        Err(AppError::NotFound(format!(
            "No bookmark on page {} of magazine {}",
            req.page_number, id
        )))
    }
}

// ============================================================================
// SEARCH HANDLERS
// ============================================================================

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    id: String,
    q: Option<String>,
}

/// One in-magazine search hit.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    page_number: i64,
    extracted_text: String,
    text_confidence: f64,
    spread_index: u32,
}

/// Search response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    search_results: Vec<SearchHit>,
}

/// Search extracted page text within one magazine.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Missing search query".to_string()))?;

    let magazine = state
        .get_magazine(&params.id)
        .ok_or_else(|| AppError::NotFound(format!("Magazine not found: {}", params.id)))?;

    let layout = SpreadLayout::new(magazine.total_pages);
    let search_results = state
        .db
        .search_pages(&params.id, query)?
        .into_iter()
        .map(|p| SearchHit {
            page_number: p.page_number,
            extracted_text: p.extracted_text,
            text_confidence: p.text_confidence,
            spread_index: layout.spread_for_page(p.page_number.max(0) as u32),
        })
        .collect();

    Ok(Json(SearchResponse { search_results }))
}

// ============================================================================
// LIBRARY API
// ============================================================================

/// Library statistics response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    total_magazines: i64,
    total_views: i64,
    total_downloads: i64,
}

/// Aggregate library statistics.
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let stats = state.db.library_stats()?;
    Ok(Json(StatsResponse {
        total_magazines: stats.total_magazines,
        total_views: stats.total_views,
        total_downloads: stats.total_downloads,
    }))
}

/// Scan response.
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    status: String,
}

/// Trigger a library rescan in the background.
pub async fn scan(State(state): State<AppState>) -> Json<ScanResponse> {
    state.start_background_scan();
    Json(ScanResponse {
        status: "scan started".to_string(),
    })
}

//! HTTP server and routes.

mod handlers;
mod state;

pub use state::AppState;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let flipbook_routes = Router::new()
        .route("/magazines", get(handlers::list_magazines))
        .route("/magazines/{id}", get(handlers::magazine_detail))
        .route("/magazines/{id}/pages", get(handlers::magazine_pages))
        .route(
            "/magazines/{id}/pages/{page}/image",
            get(handlers::page_image),
        )
        .route(
            "/magazines/{id}/pages/{page}/thumbnail",
            get(handlers::page_thumbnail),
        )
        .route("/download/{id}", get(handlers::download))
        // Progress by magazine
        .route("/magazines/{id}/progress", get(handlers::get_progress))
        .route("/magazines/{id}/progress", post(handlers::update_progress))
        // Bookmarks by magazine
        .route("/magazines/{id}/bookmarks", get(handlers::get_bookmarks))
        .route("/magazines/{id}/bookmark", post(handlers::add_bookmark))
        .route("/magazines/{id}/bookmark", delete(handlers::remove_bookmark))
        // In-magazine text search
        .route("/search", get(handlers::search))
        // Library management
        .route("/stats", get(handlers::stats))
        .route("/scan", post(handlers::scan));

    Router::new()
        .route("/", get(handlers::index))
        .nest("/flipbook", flipbook_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

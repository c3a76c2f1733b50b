//! Generic page view.
//!
//! Serves any URL that is a page slug. Registered as the catch-all
//! route, so it only handles URLs no other route claimed; the page
//! middleware additionally falls back to [`render_page`] when another
//! route claims a page URL but 404s on it.

use std::sync::OnceLock;

use axum::{
    Extension, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware;
use crate::models::ResolvedPage;
use crate::session::Viewer;
use crate::state::AppState;
use crate::theme::TemplateData;

/// Route pattern of the generic page view. The page middleware compares
/// the matched route against this to recognize its own view.
pub const PAGE_ROUTE: &str = "/{*slug}";

/// Home page slug.
const HOME_SLUG: &str = "/";

/// Whether the page middleware is enabled, memoized for the process
/// lifetime. The page view is useless without the middleware (nothing
/// would resolve pages or run processors), so it refuses to serve.
static MIDDLEWARE_INSTALLED: OnceLock<bool> = OnceLock::new();

/// Check once whether the page middleware is in the configured list.
pub fn middleware_installed(config: &Config) -> bool {
    *MIDDLEWARE_INSTALLED.get_or_init(|| config.page_middleware_enabled())
}

/// Create the page view router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route(PAGE_ROUTE, get(page))
}

/// Home page handler.
async fn home(
    State(state): State<AppState>,
    viewer: Option<Extension<Viewer>>,
    resolved: Option<Extension<ResolvedPage>>,
) -> AppResult<Response> {
    serve_slug(&state, HOME_SLUG, viewer, resolved).await
}

/// Catch-all page handler.
async fn page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    viewer: Option<Extension<Viewer>>,
    resolved: Option<Extension<ResolvedPage>>,
) -> AppResult<Response> {
    serve_slug(&state, &slug, viewer, resolved).await
}

async fn serve_slug(
    state: &AppState,
    slug: &str,
    viewer: Option<Extension<Viewer>>,
    resolved: Option<Extension<ResolvedPage>>,
) -> AppResult<Response> {
    // The catch-all capture keeps surrounding slashes ("about/" for
    // /about/); page slugs never carry them.
    let slug = middleware::path_to_slug(slug);

    if !middleware_installed(state.config()) {
        return Err(AppError::Config(
            "the page middleware is not enabled in MIDDLEWARE; the page view requires it"
                .to_string(),
        ));
    }

    // Prefer the page the middleware already resolved, when it is an
    // exact match for this URL. An ancestor match means this URL names
    // no page of its own.
    let resolved = match resolved.map(|Extension(r)| r).filter(|r| r.page.slug == slug) {
        Some(resolved) => resolved,
        None => {
            let viewer = viewer
                .map(|Extension(v)| v)
                .unwrap_or_else(Viewer::anonymous);
            let page = state
                .pages()
                .find_by_slug(&slug, &viewer)
                .await
                .map_err(AppError::Internal)?
                .ok_or(AppError::NotFound)?;
            ResolvedPage {
                page,
                ascendants: Vec::new(),
                is_current: true,
            }
        }
    };

    Ok(render_page(&resolved))
}

/// Build the deferred render response for a page.
///
/// Also used by the page middleware's 404 fallback.
pub fn render_page(resolved: &ResolvedPage) -> Response {
    let page = &resolved.page;

    let slug_name = if page.slug == HOME_SLUG {
        "index".to_string()
    } else {
        page.slug.replace('/', "_")
    };
    let suggestions = vec![
        format!("pages/{slug_name}.html"),
        format!("pages/{}.html", page.content_model),
        "pages/page.html".to_string(),
    ];

    let mut context = tera::Context::new();
    context.insert("title", &page.title);

    TemplateData {
        suggestions,
        title: page.title.clone(),
        context,
    }
    .into_response()
}

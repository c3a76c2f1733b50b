#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Provides an in-memory page store, canned page processors, and a
//! router builder wiring the real middleware stack the way the binary
//! does, minus the database.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use pergola_kernel::config::Config;
use pergola_kernel::middleware;
use pergola_kernel::models::{Page, PageStore, ResolvedPage, resolve_candidates, slug_branches};
use pergola_kernel::processors::{
    PageProcessor, ProcessorContext, ProcessorOutcome, ProcessorRegistry,
};
use pergola_kernel::routes;
use pergola_kernel::session::Viewer;
use pergola_kernel::state::AppState;
use pergola_kernel::theme::ThemeEngine;

/// In-memory page store backing the integration tests.
pub struct MemoryPageStore {
    pages: Vec<Page>,
}

impl MemoryPageStore {
    pub fn new(pages: Vec<Page>) -> Arc<Self> {
        Arc::new(Self { pages })
    }
}

#[async_trait]
impl PageStore for MemoryPageStore {
    async fn with_ascendants_for_slug(
        &self,
        slug: &str,
        viewer: &Viewer,
    ) -> Result<Option<ResolvedPage>> {
        let branches = slug_branches(slug);
        let candidates: Vec<Page> = self
            .pages
            .iter()
            .filter(|p| branches.iter().any(|b| *b == p.slug))
            .cloned()
            .collect();

        Ok(resolve_candidates(candidates, slug, viewer))
    }

    async fn find_by_slug(&self, slug: &str, viewer: &Viewer) -> Result<Option<Page>> {
        Ok(self
            .pages
            .iter()
            .find(|p| p.slug == slug)
            .filter(|p| p.visible_to(viewer))
            .cloned())
    }

    async fn check_health(&self) -> bool {
        true
    }
}

/// Build a published page.
pub fn page(slug: &str, content_model: &str) -> Page {
    let now = chrono::Utc::now().timestamp();
    Page {
        id: Uuid::now_v7(),
        slug: slug.to_string(),
        title: format!("Title of {slug}"),
        content_model: content_model.to_string(),
        parent_id: None,
        status: 1,
        login_required: false,
        in_menus: true,
        created: now,
        changed: now,
    }
}

/// Default test configuration. The database URL is never used; tests
/// run on the in-memory store.
pub fn test_config() -> Config {
    Config {
        port: 0,
        database_url: "postgres://unused".to_string(),
        database_max_connections: 1,
        templates_dir: PathBuf::from("./templates"),
        login_url: "/user/login".to_string(),
        middleware: vec!["page".to_string()],
        context_processors: vec!["page".to_string(), "site".to_string()],
        site_name: "Pergola".to_string(),
        cookie_same_site: "strict".to_string(),
    }
}

/// Assemble app state over the in-memory store.
pub fn test_state(
    config: Config,
    pages: Vec<Page>,
    processors: ProcessorRegistry,
    templates: Vec<(&str, &str)>,
) -> AppState {
    let theme = if templates.is_empty() {
        ThemeEngine::empty()
    } else {
        ThemeEngine::with_templates(templates).unwrap()
    };

    AppState::with_parts(
        config,
        MemoryPageStore::new(pages),
        processors,
        Arc::new(theme),
    )
}

/// Build the full middleware stack the way the binary does, with the
/// given viewer injected instead of session resolution.
pub fn build_app(state: AppState, extra: Option<Router<AppState>>, viewer: Viewer) -> Router {
    let mut router = Router::new()
        .merge(routes::health::router())
        .merge(routes::page::router());
    if let Some(extra) = extra {
        router = router.merge(extra);
    }

    router
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_page,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::render_template,
        ))
        .layer(axum::middleware::from_fn(
            move |mut request: Request<Body>, next: Next| {
                let viewer = viewer.clone();
                async move {
                    request.extensions_mut().insert(viewer);
                    next.run(request).await
                }
            },
        ))
        .with_state(state)
}

/// Build the stack without the page middleware layer.
pub fn build_app_without_page_middleware(state: AppState, viewer: Viewer) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::page::router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::render_template,
        ))
        .layer(axum::middleware::from_fn(
            move |mut request: Request<Body>, next: Next| {
                let viewer = viewer.clone();
                async move {
                    request.extensions_mut().insert(viewer);
                    next.run(request).await
                }
            },
        ))
        .with_state(state)
}

/// An authenticated, non-staff viewer.
pub fn authenticated_viewer() -> Viewer {
    Viewer {
        user_id: Some(Uuid::now_v7()),
        staff: false,
    }
}

/// An authenticated staff viewer.
pub fn staff_viewer() -> Viewer {
    Viewer {
        user_id: Some(Uuid::now_v7()),
        staff: true,
    }
}

/// Send a GET request through the app.
pub async fn get(app: Router, path: &str) -> Response {
    app.oneshot(
        Request::builder()
            .uri(path)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body into a string.
pub async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A processor that merges fixed context data.
pub struct ContextProcessor {
    pub name: String,
    pub data: Value,
}

impl ContextProcessor {
    pub fn new(name: &str, data: Value) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            data,
        })
    }
}

#[async_trait]
impl PageProcessor for ContextProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(
        &self,
        _ctx: &ProcessorContext,
        _page: &ResolvedPage,
    ) -> Result<ProcessorOutcome> {
        Ok(ProcessorOutcome::Data(self.data.clone()))
    }
}

/// A processor that substitutes the whole response.
pub struct ResponseProcessor {
    pub name: String,
    pub status: StatusCode,
    pub body: String,
}

impl ResponseProcessor {
    pub fn new(name: &str, status: StatusCode, body: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            status,
            body: body.to_string(),
        })
    }
}

#[async_trait]
impl PageProcessor for ResponseProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(
        &self,
        _ctx: &ProcessorContext,
        _page: &ResolvedPage,
    ) -> Result<ProcessorOutcome> {
        Ok(ProcessorOutcome::Response(
            (self.status, self.body.clone()).into_response(),
        ))
    }
}

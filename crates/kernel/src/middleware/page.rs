//! Page resolution middleware.
//!
//! Resolves the page for the current URL and attaches it to the request
//! before the routed handler runs. If no page matches the URL slug or
//! any of its branch prefixes, the handler's response passes through
//! untouched.
//!
//! When a page does match:
//! - a login-required page with an anonymous viewer becomes a redirect
//!   to the login URL, carrying the original path in `next`;
//! - a 404 from a non-page route whose URL is exactly a page slug is
//!   replaced by the generic page view, so pages may live under URL
//!   prefixes owned by other routes (a page at /blog/about while /blog
//!   belongs to a blog plugin);
//! - page processors registered for the page's slug or content model
//!   run against the response, merging extra template context or
//!   substituting the response entirely.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::Value;

use crate::config::PAGE_CONTEXT_PROCESSOR;
use crate::error::{AppError, AppResult};
use crate::models::ResolvedPage;
use crate::processors::{ProcessorContext, ProcessorOutcome, value_shape};
use crate::routes;
use crate::session::Viewer;
use crate::state::AppState;
use crate::theme::TemplateData;

/// Content model of link pages. Links exist for menus only and are
/// never rendered by the page view.
const LINK_MODEL: &str = "link";

/// Middleware to resolve the current page and run its processors.
pub async fn resolve_page(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let config = state.config();

    // The render layer cannot inject the current page into templates
    // without the page context processor. Refusing every request beats
    // silently rendering pages with no page in context.
    if !config
        .context_processors
        .iter()
        .any(|cp| cp == PAGE_CONTEXT_PROCESSOR)
    {
        return AppError::Config(format!(
            "the \"{PAGE_CONTEXT_PROCESSOR}\" context processor is missing from CONTEXT_PROCESSORS"
        ))
        .into_response();
    }

    let path = request.uri().path().to_string();
    let query = request.uri().query().map(|q| q.to_string());
    let slug = path_to_slug(&path);

    let viewer = request
        .extensions()
        .get::<Viewer>()
        .cloned()
        .unwrap_or_else(Viewer::anonymous);

    // Load the closest matching page by slug. If none is visible to the
    // viewer, skip all further processing.
    let resolved = match state.pages().with_ascendants_for_slug(&slug, &viewer).await {
        Ok(Some(resolved)) => resolved,
        Ok(None) => return next.run(request).await,
        Err(e) => return AppError::Internal(e).into_response(),
    };

    tracing::debug!(
        slug = %slug,
        page = %resolved.page.slug,
        current = resolved.is_current,
        "resolved page"
    );

    if resolved.page.login_required && !viewer.authenticated() {
        let full_path = match &query {
            Some(q) => format!("{path}?{q}"),
            None => path.clone(),
        };
        let target = format!(
            "{}?next={}",
            config.login_url,
            urlencoding::encode(&full_path)
        );
        tracing::debug!(page = %resolved.page.slug, "login required, redirecting");
        return Redirect::to(&target).into_response();
    }

    let matched_route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string());

    request.extensions_mut().insert(resolved.clone());

    let mut response = next.run(request).await;

    if response.status() == StatusCode::NOT_FOUND {
        let is_page_view = matched_route.as_deref() == Some(routes::page::PAGE_ROUTE);
        if resolved.is_current && !is_page_view && resolved.page.content_model != LINK_MODEL {
            // A non-page route owned this URL but had nothing for it,
            // while the URL is exactly a page slug. Render the page.
            tracing::debug!(
                slug = %slug,
                route = matched_route.as_deref().unwrap_or(""),
                "non-page route returned 404 for a page slug, using the page view"
            );
            response = routes::page::render_page(&resolved);
        } else {
            return response;
        }
    }

    let ctx = ProcessorContext {
        path,
        query,
        viewer,
    };

    match run_processors(&state, &ctx, &resolved, response).await {
        Ok(mut response) => {
            // Make the page available to the render layer's context
            // processor for whatever response we end up with.
            response.extensions_mut().insert(resolved);
            response
        }
        Err(e) => e.into_response(),
    }
}

/// Run slug processors, then model processors, against the response.
///
/// A substitute response short-circuits. Context data merges into the
/// response's template context without overwriting existing keys.
async fn run_processors(
    state: &AppState,
    ctx: &ProcessorContext,
    resolved: &ResolvedPage,
    mut response: Response,
) -> AppResult<Response> {
    let registry = state.processors();
    let slug_entries = registry.for_slug(&resolved.page.slug);
    let model_entries = registry.for_model(&resolved.page.content_model);

    for entry in slug_entries.iter().chain(model_entries) {
        if entry.exact_page && !resolved.is_current {
            continue;
        }

        let outcome = entry
            .processor
            .process(ctx, resolved)
            .await
            .map_err(AppError::Internal)?;

        match outcome {
            ProcessorOutcome::Response(substitute) => return Ok(substitute),
            ProcessorOutcome::Data(Value::Null) => {}
            ProcessorOutcome::Data(Value::Object(map)) => {
                merge_into_context(&mut response, map, entry.processor.name());
            }
            ProcessorOutcome::Data(other) => {
                return Err(AppError::ProcessorReturn {
                    processor: entry.processor.name().to_string(),
                    returned: value_shape(&other).to_string(),
                });
            }
        }
    }

    Ok(response)
}

/// Merge processor data into the response's template context.
///
/// Keys already present are kept; processors supplement the view's
/// context, they never override it.
fn merge_into_context(
    response: &mut Response,
    map: serde_json::Map<String, Value>,
    processor: &str,
) {
    let Some(data) = response.extensions_mut().get_mut::<TemplateData>() else {
        tracing::warn!(
            processor = %processor,
            "processor returned context data for a response without a template context"
        );
        return;
    };

    for (key, value) in map {
        if !data.context.contains_key(&key) {
            data.context.insert(key, &value);
        }
    }
}

/// Derive the page slug from a URL path.
///
/// Surrounding slashes are stripped; the root path maps to the home
/// slug `"/"`.
pub fn path_to_slug(path: &str) -> String {
    let slug = path.trim_matches('/');
    if slug.is_empty() {
        "/".to_string()
    } else {
        slug.to_string()
    }
}

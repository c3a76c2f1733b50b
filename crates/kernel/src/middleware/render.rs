//! Deferred template rendering middleware.
//!
//! The outermost layer of the response path. Handlers that render
//! through the theme attach a [`TemplateData`] extension instead of a
//! body; this layer resolves the template suggestions, applies the
//! configured context processors, and renders the final HTML. Responses
//! without `TemplateData` pass through untouched.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};

use crate::config::PAGE_CONTEXT_PROCESSOR;
use crate::models::ResolvedPage;
use crate::state::AppState;
use crate::theme::TemplateData;

/// Middleware to render deferred template responses.
pub async fn render_template(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    let Some(data) = response.extensions_mut().remove::<TemplateData>() else {
        return response;
    };
    let TemplateData {
        suggestions,
        title,
        mut context,
    } = data;

    for cp in &state.config().context_processors {
        match cp.as_str() {
            // The current page, when the page middleware resolved one.
            PAGE_CONTEXT_PROCESSOR => {
                if let Some(resolved) = response.extensions().get::<ResolvedPage>() {
                    if !context.contains_key("page") {
                        context.insert("page", &resolved.page);
                        context.insert("page_ascendants", &resolved.ascendants);
                        context.insert("page_is_current", &resolved.is_current);
                    }
                }
            }
            "site" => {
                if !context.contains_key("site_name") {
                    context.insert("site_name", &state.config().site_name);
                }
            }
            other => tracing::warn!(processor = %other, "unknown context processor"),
        }
    }

    let status = response.status();
    let refs: Vec<&str> = suggestions.iter().map(String::as_str).collect();

    let html = match state.theme().resolve_template(&refs) {
        Some(template) => match state.theme().render(&template, &context) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!(error = %e, template = %template, "failed to render template");
                return (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
                    .into_response();
            }
        },
        None => fallback_html(&title),
    };

    (status, Html(html)).into_response()
}

/// Minimal markup used when no template matches the suggestions.
fn fallback_html(title: &str) -> String {
    let title = html_escape(title);
    format!(
        "<!DOCTYPE html>\n<html><head><title>{title}</title></head><body><h1>{title}</h1></body></html>"
    )
}

/// HTML-escape a string for safe output.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn fallback_escapes_title() {
        let html = fallback_html("<b>Home</b>");
        assert!(html.contains("&lt;b&gt;Home&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn html_escape_special_chars() {
        assert_eq!(
            html_escape("<script>alert('xss')</script>"),
            "&lt;script&gt;alert(&#x27;xss&#x27;)&lt;/script&gt;"
        );
    }
}

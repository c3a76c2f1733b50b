//! Theme engine with Tera templates and suggestion resolution.

use std::path::Path;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use tera::Tera;
use tracing::debug;

/// Theme engine for rendering templates.
pub struct ThemeEngine {
    /// Tera template engine instance.
    tera: Tera,
    /// Cache mapping suggestion lists to resolved template names.
    suggestion_cache: DashMap<String, String>,
}

impl ThemeEngine {
    /// Create a new theme engine loading templates from the given directory.
    pub fn new(template_dir: &Path) -> Result<Self> {
        let pattern = template_dir.join("**/*.html");
        let pattern_str = pattern
            .to_str()
            .context("invalid template directory path")?;

        let mut tera = Tera::new(pattern_str).context("failed to initialize Tera templates")?;
        Self::register_filters(&mut tera);

        let template_count = tera.get_template_names().count();
        debug!(count = template_count, "loaded templates");

        Ok(Self {
            tera,
            suggestion_cache: DashMap::new(),
        })
    }

    /// Create a theme engine with no templates (for testing).
    pub fn empty() -> Self {
        let mut tera = Tera::default();
        Self::register_filters(&mut tera);

        Self {
            tera,
            suggestion_cache: DashMap::new(),
        }
    }

    /// Create a theme engine from in-memory templates (for testing).
    pub fn with_templates(templates: Vec<(&str, &str)>) -> Result<Self> {
        let mut tera = Tera::default();
        Self::register_filters(&mut tera);
        tera.add_raw_templates(templates)
            .context("failed to add raw templates")?;

        Ok(Self {
            tera,
            suggestion_cache: DashMap::new(),
        })
    }

    /// Register custom Tera filters.
    fn register_filters(tera: &mut Tera) {
        // Filter for formatting Unix timestamps as human-readable dates
        tera.register_filter(
            "format_date",
            |value: &tera::Value, _args: &std::collections::HashMap<String, tera::Value>| {
                let timestamp = match value {
                    tera::Value::Number(n) => n.as_i64().unwrap_or(0),
                    _ => return Ok(tera::Value::String(String::new())),
                };

                let formatted = chrono::DateTime::from_timestamp(timestamp, 0)
                    .map(|dt| dt.format("%B %-d, %Y").to_string())
                    .unwrap_or_else(|| "Unknown date".to_string());

                Ok(tera::Value::String(formatted))
            },
        );
    }

    /// Get the underlying Tera instance for custom operations.
    pub fn tera(&self) -> &Tera {
        &self.tera
    }

    /// Resolve the best template from a list of suggestions.
    ///
    /// Templates are tried in order; the first one that exists is
    /// returned. Results are cached for the process lifetime.
    ///
    /// Example suggestions:
    /// `["pages/blog_about.html", "pages/richtext.html", "pages/page.html"]`
    pub fn resolve_template(&self, suggestions: &[&str]) -> Option<String> {
        let cache_key = suggestions.join("|");
        if let Some(hit) = self.suggestion_cache.get(&cache_key) {
            return Some(hit.clone());
        }

        for suggestion in suggestions {
            if self.tera.get_template_names().any(|name| name == *suggestion) {
                self.suggestion_cache
                    .insert(cache_key, (*suggestion).to_string());
                return Some((*suggestion).to_string());
            }
        }

        None
    }

    /// Render a template with the given context.
    pub fn render(&self, template: &str, context: &tera::Context) -> Result<String> {
        self.tera
            .render(template, context)
            .with_context(|| format!("failed to render template {template}"))
    }
}

/// Deferred page render carried as a response extension.
///
/// View handlers that render through the theme do not produce HTML
/// themselves; they attach a `TemplateData` to an empty response and the
/// outermost render middleware turns it into HTML. Page processors merge
/// their context in between, which is what makes the two-phase shape
/// necessary.
#[derive(Clone)]
pub struct TemplateData {
    /// Template suggestions, most specific first.
    pub suggestions: Vec<String>,

    /// Page title, also used by the built-in fallback markup.
    pub title: String,

    /// Template context accumulated so far.
    pub context: tera::Context,
}

impl IntoResponse for TemplateData {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::empty());
        response.extensions_mut().insert(self);
        response
    }
}

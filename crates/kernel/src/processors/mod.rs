//! Page processors - per-page hooks that enrich the template context.
//!
//! A processor is registered against a content model or an exact page
//! slug and runs after the view produced its response. It either returns
//! extra context data to merge into the response's template context, or
//! a full substitute response that short-circuits the request.
//!
//! The registry is built once at startup and read-only afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::models::ResolvedPage;
use crate::session::Viewer;

/// Request details handed to processors.
///
/// Processors see a snapshot of the request, not the request itself:
/// by the time they run, the inner service has already consumed it.
#[derive(Debug, Clone)]
pub struct ProcessorContext {
    /// Request path.
    pub path: String,

    /// Raw query string, if any.
    pub query: Option<String>,

    /// The current viewer.
    pub viewer: Viewer,
}

/// What a processor produced.
pub enum ProcessorOutcome {
    /// A substitute response; returned immediately, skipping any
    /// remaining processors.
    Response(Response),

    /// Data for the template context. Must be a JSON object (or null
    /// for "nothing to add"); anything else is a processor bug and is
    /// reported as such.
    Data(Value),
}

impl ProcessorOutcome {
    /// An empty outcome: nothing to merge, response untouched.
    pub fn none() -> Self {
        Self::Data(Value::Null)
    }
}

/// A page processor.
#[async_trait]
pub trait PageProcessor: Send + Sync {
    /// Processor name, used in error messages and logs.
    fn name(&self) -> &str;

    async fn process(
        &self,
        ctx: &ProcessorContext,
        page: &ResolvedPage,
    ) -> Result<ProcessorOutcome>;
}

/// A registered processor with its exact-page flag.
#[derive(Clone)]
pub struct Registered {
    pub processor: Arc<dyn PageProcessor>,

    /// Only run when the resolved page is the exact match for the
    /// request URL, not an ancestor of it.
    pub exact_page: bool,
}

/// Registry mapping content models and exact slugs to ordered processors.
///
/// Populated at startup by the embedding application; `AppState` holds
/// it behind an `Arc`, so it is immutable for the process lifetime.
#[derive(Default)]
pub struct ProcessorRegistry {
    by_model: HashMap<String, Vec<Registered>>,
    by_slug: HashMap<String, Vec<Registered>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processor for every page of a content model.
    pub fn register_for_model(
        &mut self,
        content_model: impl Into<String>,
        processor: Arc<dyn PageProcessor>,
        exact_page: bool,
    ) {
        self.by_model
            .entry(content_model.into())
            .or_default()
            .push(Registered {
                processor,
                exact_page,
            });
    }

    /// Register a processor for one exact page slug.
    pub fn register_for_slug(
        &mut self,
        slug: impl Into<String>,
        processor: Arc<dyn PageProcessor>,
        exact_page: bool,
    ) {
        self.by_slug
            .entry(slug.into())
            .or_default()
            .push(Registered {
                processor,
                exact_page,
            });
    }

    /// Processors registered for a content model, in registration order.
    pub fn for_model(&self, content_model: &str) -> &[Registered] {
        self.by_model
            .get(content_model)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Processors registered for an exact slug, in registration order.
    pub fn for_slug(&self, slug: &str) -> &[Registered] {
        self.by_slug
            .get(slug)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Total number of registered processors.
    pub fn len(&self) -> usize {
        self.by_model.values().map(Vec::len).sum::<usize>()
            + self.by_slug.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Human-readable name of a JSON value's shape, for error messages.
pub(crate) fn value_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a map",
    }
}

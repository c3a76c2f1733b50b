//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::models::{PageStore, PgPageStore};
use crate::processors::ProcessorRegistry;
use crate::theme::ThemeEngine;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Application configuration.
    config: Config,

    /// Page lookup store.
    pages: Arc<dyn PageStore>,

    /// Page processor registry, frozen at startup.
    processors: Arc<ProcessorRegistry>,

    /// Theme engine for template rendering.
    theme: Arc<ThemeEngine>,
}

impl AppState {
    /// Create new application state with database connections.
    ///
    /// The processor registry is supplied by the embedding application
    /// and is read-only from here on.
    pub async fn new(config: Config, processors: ProcessorRegistry) -> Result<Self> {
        let pool = db::create_pool(&config)
            .await
            .context("failed to create database pool")?;

        let theme = ThemeEngine::new(&config.templates_dir)
            .context("failed to initialize theme engine")?;

        info!(
            processors = processors.len(),
            "page processor registry loaded"
        );

        Ok(Self::with_parts(
            config,
            PgPageStore::new(pool),
            processors,
            Arc::new(theme),
        ))
    }

    /// Assemble state from already-built parts.
    ///
    /// Used by `new` and by integration tests that swap in an in-memory
    /// page store or an empty theme.
    pub fn with_parts(
        config: Config,
        pages: Arc<dyn PageStore>,
        processors: ProcessorRegistry,
        theme: Arc<ThemeEngine>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pages,
                processors: Arc::new(processors),
                theme,
            }),
        }
    }

    /// Get the application configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the page store.
    pub fn pages(&self) -> &dyn PageStore {
        self.inner.pages.as_ref()
    }

    /// Get the processor registry.
    pub fn processors(&self) -> &ProcessorRegistry {
        &self.inner.processors
    }

    /// Get the theme engine.
    pub fn theme(&self) -> &ThemeEngine {
        &self.inner.theme
    }
}

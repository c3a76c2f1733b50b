//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Identifier of the page middleware in the `MIDDLEWARE` list.
pub const PAGE_MIDDLEWARE: &str = "page";

/// Identifier of the page context processor in the `CONTEXT_PROCESSORS` list.
pub const PAGE_CONTEXT_PROCESSOR: &str = "page";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Path to theme templates directory (default: ./templates).
    pub templates_dir: PathBuf,

    /// Login URL for the login-required redirect (default: /user/login).
    pub login_url: String,

    /// Enabled middleware identifiers, in order (default: "page").
    ///
    /// The page middleware layer is only attached when "page" appears
    /// here, and the generic page view refuses to run without it.
    pub middleware: Vec<String>,

    /// Enabled template context processors (default: "page,site").
    pub context_processors: Vec<String>,

    /// Site name injected by the "site" context processor (default: Pergola).
    pub site_name: String,

    /// Cookie SameSite policy: "strict", "lax", or "none" (default: "strict").
    pub cookie_same_site: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let templates_dir = env::var("TEMPLATES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./templates"));

        let login_url = env::var("LOGIN_URL").unwrap_or_else(|_| "/user/login".to_string());

        let middleware = env::var("MIDDLEWARE")
            .map(|v| split_list(&v))
            .unwrap_or_else(|_| vec![PAGE_MIDDLEWARE.to_string()]);

        let context_processors = env::var("CONTEXT_PROCESSORS")
            .map(|v| split_list(&v))
            .unwrap_or_else(|_| vec![PAGE_CONTEXT_PROCESSOR.to_string(), "site".to_string()]);

        let site_name = env::var("SITE_NAME").unwrap_or_else(|_| "Pergola".to_string());

        let cookie_same_site = env::var("COOKIE_SAME_SITE")
            .unwrap_or_else(|_| "strict".to_string())
            .to_lowercase();

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            templates_dir,
            login_url,
            middleware,
            context_processors,
            site_name,
            cookie_same_site,
        })
    }

    /// Whether the page middleware is enabled in the `MIDDLEWARE` list.
    pub fn page_middleware_enabled(&self) -> bool {
        self.middleware.iter().any(|m| m == PAGE_MIDDLEWARE)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

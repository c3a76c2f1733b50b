//! HTTP middleware components.
//!
//! Provides viewer resolution, page resolution, and deferred template
//! rendering layers.

pub mod auth;
pub mod page;
pub mod render;

pub use auth::resolve_viewer;
pub use page::{path_to_slug, resolve_page};
pub use render::render_template;

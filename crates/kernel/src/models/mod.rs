//! Data models.

pub mod page;

pub use page::{Page, PageStore, PgPageStore, ResolvedPage, resolve_candidates, slug_branches};

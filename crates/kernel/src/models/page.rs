//! Page model and slug-based lookup.
//!
//! Pages form a slug hierarchy ("about", "about/team"). Lookup is
//! ancestor-aware: a request for a URL that sits under a page (for
//! example a blog post under the blog page) still resolves that page,
//! so its access control and processors apply.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::session::Viewer;

/// Page record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Page {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// URL slug, without surrounding slashes ("/" for the home page).
    pub slug: String,

    /// Page title.
    pub title: String,

    /// Content model machine name ("richtext", "link", plugin types).
    pub content_model: String,

    /// Parent page, if any.
    pub parent_id: Option<Uuid>,

    /// Publication status (0 = unpublished, 1 = published).
    pub status: i16,

    /// Whether viewing this page requires an authenticated viewer.
    pub login_required: bool,

    /// Whether this page appears in menus.
    pub in_menus: bool,

    /// Unix timestamp when created.
    pub created: i64,

    /// Unix timestamp when last changed.
    pub changed: i64,
}

impl Page {
    /// Check if this page is published.
    pub fn is_published(&self) -> bool {
        self.status == 1
    }

    /// Whether the viewer may see this page at all.
    ///
    /// Login-required pages are still visible matches; the middleware
    /// turns them into a login redirect for anonymous viewers.
    pub fn visible_to(&self, viewer: &Viewer) -> bool {
        self.is_published() || viewer.staff
    }
}

/// A page resolved for one request: the deepest slug match, its
/// ascendant chain (deepest first), and whether the match was exact.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPage {
    pub page: Page,
    pub ascendants: Vec<Page>,
    pub is_current: bool,
}

/// Page lookup interface.
///
/// All page reads go through this trait so the HTTP layer never touches
/// SQL directly and tests can supply an in-memory store.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Find the deepest page whose slug is a branch prefix of `slug`,
    /// visible to `viewer`, together with its ascendant chain.
    async fn with_ascendants_for_slug(
        &self,
        slug: &str,
        viewer: &Viewer,
    ) -> Result<Option<ResolvedPage>>;

    /// Find a page by exact slug, visible to `viewer`.
    async fn find_by_slug(&self, slug: &str, viewer: &Viewer) -> Result<Option<Page>>;

    /// Check if the backing store is reachable.
    async fn check_health(&self) -> bool;
}

/// Split a slug into its branch prefixes, shallowest first.
///
/// `"blog/about/team"` yields `["blog", "blog/about", "blog/about/team"]`.
/// The home slug `"/"` yields itself.
pub fn slug_branches(slug: &str) -> Vec<String> {
    if slug == "/" {
        return vec!["/".to_string()];
    }

    let mut branches = Vec::new();
    let mut prefix = String::new();
    for part in slug.split('/').filter(|p| !p.is_empty()) {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(part);
        branches.push(prefix.clone());
    }
    branches
}

/// Order candidate pages into a resolved page: deepest match first,
/// remaining (shallower) matches as the ascendant chain.
///
/// Shared by store implementations; candidates must all be branch
/// prefixes of `slug`.
pub fn resolve_candidates(
    mut candidates: Vec<Page>,
    slug: &str,
    viewer: &Viewer,
) -> Option<ResolvedPage> {
    candidates.retain(|p| p.visible_to(viewer));
    // Branch prefixes nest, so slug length orders by depth.
    candidates.sort_by(|a, b| b.slug.len().cmp(&a.slug.len()));

    let mut iter = candidates.into_iter();
    let page = iter.next()?;
    let is_current = page.slug == slug;
    let ascendants: Vec<Page> = iter.collect();

    Some(ResolvedPage {
        page,
        ascendants,
        is_current,
    })
}

/// PostgreSQL-backed page store.
pub struct PgPageStore {
    pool: PgPool,
}

impl PgPageStore {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const PAGE_COLUMNS: &str =
    "id, slug, title, content_model, parent_id, status, login_required, in_menus, created, changed";

#[async_trait]
impl PageStore for PgPageStore {
    async fn with_ascendants_for_slug(
        &self,
        slug: &str,
        viewer: &Viewer,
    ) -> Result<Option<ResolvedPage>> {
        let branches = slug_branches(slug);
        if branches.is_empty() {
            return Ok(None);
        }

        let candidates = sqlx::query_as::<_, Page>(&format!(
            "SELECT {PAGE_COLUMNS} FROM page WHERE slug = ANY($1)"
        ))
        .bind(&branches)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch pages for slug branches")?;

        Ok(resolve_candidates(candidates, slug, viewer))
    }

    async fn find_by_slug(&self, slug: &str, viewer: &Viewer) -> Result<Option<Page>> {
        let page = sqlx::query_as::<_, Page>(&format!(
            "SELECT {PAGE_COLUMNS} FROM page WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch page by slug")?;

        Ok(page.filter(|p| p.visible_to(viewer)))
    }

    async fn check_health(&self) -> bool {
        db::check_health(&self.pool).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn page(slug: &str, status: i16) -> Page {
        let now = chrono::Utc::now().timestamp();
        Page {
            id: Uuid::now_v7(),
            slug: slug.to_string(),
            title: slug.to_string(),
            content_model: "richtext".to_string(),
            parent_id: None,
            status,
            login_required: false,
            in_menus: true,
            created: now,
            changed: now,
        }
    }

    #[test]
    fn slug_branches_nested() {
        assert_eq!(
            slug_branches("blog/about/team"),
            vec!["blog", "blog/about", "blog/about/team"]
        );
    }

    #[test]
    fn slug_branches_single() {
        assert_eq!(slug_branches("about"), vec!["about"]);
    }

    #[test]
    fn slug_branches_home() {
        assert_eq!(slug_branches("/"), vec!["/"]);
    }

    #[test]
    fn resolve_picks_deepest_match() {
        let candidates = vec![page("blog", 1), page("blog/about", 1)];
        let resolved =
            resolve_candidates(candidates, "blog/about/2024", &Viewer::anonymous()).unwrap();
        assert_eq!(resolved.page.slug, "blog/about");
        assert!(!resolved.is_current);
        assert_eq!(resolved.ascendants.len(), 1);
        assert_eq!(resolved.ascendants[0].slug, "blog");
    }

    #[test]
    fn resolve_marks_exact_match_current() {
        let candidates = vec![page("blog", 1)];
        let resolved = resolve_candidates(candidates, "blog", &Viewer::anonymous()).unwrap();
        assert!(resolved.is_current);
        assert!(resolved.ascendants.is_empty());
    }

    #[test]
    fn resolve_hides_unpublished_from_anonymous() {
        let candidates = vec![page("drafts", 0)];
        assert!(resolve_candidates(candidates, "drafts", &Viewer::anonymous()).is_none());
    }

    #[test]
    fn resolve_shows_unpublished_to_staff() {
        let staff = Viewer {
            user_id: Some(Uuid::now_v7()),
            staff: true,
        };
        let candidates = vec![page("drafts", 0)];
        let resolved = resolve_candidates(candidates, "drafts", &staff).unwrap();
        assert_eq!(resolved.page.slug, "drafts");
    }
}

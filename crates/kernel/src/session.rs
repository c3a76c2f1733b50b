//! Session management and the per-request viewer.

use serde::{Deserialize, Serialize};
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};
use uuid::Uuid;

/// Session key for user ID.
pub const SESSION_USER_ID: &str = "user_id";

/// Session key for the staff flag.
pub const SESSION_IS_STAFF: &str = "is_staff";

/// Default session expiry (24 hours).
pub const DEFAULT_SESSION_EXPIRY_HOURS: i64 = 24;

/// The authenticated-user view consumed by page resolution.
///
/// Carries only what access control needs: whether someone is logged in,
/// and whether they are staff (staff see unpublished pages).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewer {
    /// User ID, when authenticated.
    pub user_id: Option<Uuid>,

    /// Staff flag (may view unpublished pages).
    pub staff: bool,
}

impl Viewer {
    /// An unauthenticated viewer.
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            staff: false,
        }
    }

    /// Whether the viewer is logged in.
    pub fn authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Resolve the viewer from the session, anonymous when absent.
pub async fn viewer_from_session(session: &Session) -> Viewer {
    let user_id: Option<Uuid> = session.get(SESSION_USER_ID).await.ok().flatten();
    let staff: bool = session
        .get(SESSION_IS_STAFF)
        .await
        .ok()
        .flatten()
        .unwrap_or(false);

    Viewer {
        user_id,
        staff: staff && user_id.is_some(),
    }
}

/// Create the session layer with an in-process store.
pub fn create_session_layer(same_site: SameSite) -> SessionManagerLayer<MemoryStore> {
    let store = MemoryStore::default();

    SessionManagerLayer::new(store)
        .with_secure(same_site != SameSite::None)
        .with_http_only(true)
        .with_same_site(same_site)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            DEFAULT_SESSION_EXPIRY_HOURS,
        )))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_viewer_is_not_authenticated() {
        let viewer = Viewer::anonymous();
        assert!(!viewer.authenticated());
        assert!(!viewer.staff);
    }

    #[test]
    fn viewer_with_id_is_authenticated() {
        let viewer = Viewer {
            user_id: Some(Uuid::now_v7()),
            staff: false,
        };
        assert!(viewer.authenticated());
    }
}

//! Viewer resolution middleware.
//!
//! Derives the current [`Viewer`] from the session and inserts it as a
//! request extension, so downstream layers and handlers never touch the
//! session directly. An upstream layer may insert a `Viewer` itself (the
//! integration tests do), in which case it is left alone.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tower_sessions::Session;

use crate::session::{Viewer, viewer_from_session};

/// Middleware to attach the current viewer to the request.
pub async fn resolve_viewer(mut request: Request<Body>, next: Next) -> Response {
    if request.extensions().get::<Viewer>().is_none() {
        let viewer = match request.extensions().get::<Session>().cloned() {
            Some(session) => viewer_from_session(&session).await,
            None => Viewer::anonymous(),
        };
        request.extensions_mut().insert(viewer);
    }

    next.run(request).await
}

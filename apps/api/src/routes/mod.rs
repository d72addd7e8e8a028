pub mod health;

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, DefaultBodyLimit, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use futures::StreamExt;
use serde_json::{json, Value};
use tokio_stream::wrappers::BroadcastStream;

use crate::auth::{self, AdminSession, IdentityProvider};
use crate::messages;
use crate::notify;
use crate::projects;
use crate::projects::gateway::SectionsGateway;
use crate::resume;
use crate::settings;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Public site
        .route(
            "/api/v1/sections",
            get(projects::handlers::handle_list_sections),
        )
        .route("/api/v1/settings", get(settings::handle_get_settings))
        .route("/api/v1/resume", get(resume::handlers::handle_get_resume))
        .route(
            "/api/v1/resume/view",
            get(resume::handlers::handle_view_resume),
        )
        .route("/api/v1/ip", get(handle_ip))
        .route(
            "/api/v1/messages",
            post(messages::handlers::handle_submit_message),
        )
        .route("/api/v1/auth/sign-in", post(auth::handlers::handle_sign_in))
        .route(
            "/api/v1/auth/sign-out",
            post(auth::handlers::handle_sign_out),
        )
        // Admin console
        .route(
            "/api/v1/admin/projects",
            get(projects::handlers::handle_admin_list),
        )
        .route(
            "/api/v1/admin/projects/bulk-delete",
            post(projects::handlers::handle_bulk_delete),
        )
        .route(
            "/api/v1/admin/projects/bulk-move",
            post(projects::handlers::handle_bulk_move),
        )
        .route(
            "/api/v1/admin/sections/:section/projects",
            post(projects::handlers::handle_create_project),
        )
        .route(
            "/api/v1/admin/sections/:section/projects/:id",
            patch(projects::handlers::handle_update_project)
                .delete(projects::handlers::handle_delete_project),
        )
        .route(
            "/api/v1/admin/sections/:section/projects/:id/duplicate",
            post(projects::handlers::handle_duplicate_project),
        )
        .route(
            "/api/v1/admin/sections/:section/projects/:id/move",
            post(projects::handlers::handle_move_project),
        )
        .route(
            "/api/v1/admin/sections/:section/projects/:id/image",
            post(projects::handlers::handle_upload_project_image),
        )
        .route(
            "/api/v1/admin/resume",
            post(resume::handlers::handle_upload_resume)
                .delete(resume::handlers::handle_delete_resume),
        )
        .route("/api/v1/admin/settings", put(settings::handle_put_settings))
        .route(
            "/api/v1/admin/messages",
            get(messages::handlers::handle_list_messages),
        )
        .route(
            "/api/v1/admin/messages/:id",
            delete(messages::handlers::handle_delete_message),
        )
        .route(
            "/api/v1/admin/messages/:id/status",
            patch(messages::handlers::handle_set_status),
        )
        .route(
            "/api/v1/admin/messages/:id/replies",
            post(messages::handlers::handle_add_reply),
        )
        .route(
            "/api/v1/admin/projects/select-all",
            post(projects::handlers::handle_toggle_select_all),
        )
        .route(
            "/api/v1/admin/toasts",
            get(notify::handlers::handle_list_toasts),
        )
        .route(
            "/api/v1/admin/toasts/:id",
            delete(notify::handlers::handle_dismiss_toast),
        )
        .route("/api/v1/admin/events", get(handle_admin_events))
        // Document ceiling is 10 MB; leave headroom for multipart framing.
        .layer(DefaultBodyLimit::max(12 * 1024 * 1024))
        .with_state(state)
}

/// First X-Forwarded-For hop when present, else the peer address.
pub fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}

/// GET /api/v1/ip
/// Reflects the caller address; the public site uses it for abuse tracking.
pub async fn handle_ip(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Json<Value> {
    Json(json!({ "ip": client_ip(&headers, addr) }))
}

/// GET /api/v1/admin/events
/// SSE feed replacing client polling: section and resume document changes,
/// toast events, and session state changes. Dropping the connection drops
/// the underlying subscriptions.
pub async fn handle_admin_events(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Sse<impl futures::Stream<Item = Result<Event, axum::Error>>> {
    let sections = SectionsGateway::new(state.store.clone()).watch();
    let resume_changes = resume::watch(&state.store);

    let store_stream =
        futures::stream::select(sections.into_stream(), resume_changes.into_stream())
            .map(|ev| Event::default().event("store").json_data(&ev));
    let toast_stream = BroadcastStream::new(state.toasts.subscribe())
        .filter_map(|r| async move { r.ok() })
        .map(|ev| Event::default().event("toast").json_data(&ev));
    let session_stream = BroadcastStream::new(state.identity.watch())
        .filter_map(|r| async move { r.ok() })
        .map(|ev| Event::default().event("session").json_data(&ev));

    let merged = futures::stream::select(
        futures::stream::select(store_stream, toast_stream),
        session_stream,
    );
    Sse::new(merged).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "192.0.2.10:4321".parse().unwrap()
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.7, 10.0.0.1".parse().unwrap(),
        );
        assert_eq!(client_ip(&headers, addr()), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        assert_eq!(client_ip(&HeaderMap::new(), addr()), "192.0.2.10");
    }
}

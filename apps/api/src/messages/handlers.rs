use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::AdminSession;
use crate::errors::AppError;
use crate::routes::client_ip;
use crate::state::AppState;
use crate::store::DocumentStore;

use super::{Message, MessageStatus, Reply, ABUSE_THRESHOLD, ABUSE_WINDOW_SECS, REPLY_AUTHOR};

#[derive(Debug, Deserialize)]
pub struct SubmitMessageRequest {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitMessageResponse {
    pub id: String,
}

/// POST /api/v1/messages
/// Public contact form. The server derives the IP hash and abuse flag;
/// submitters are never trusted with either.
pub async fn handle_submit_message(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<SubmitMessageRequest>,
) -> Result<(StatusCode, Json<SubmitMessageResponse>), AppError> {
    if req.title.trim().is_empty() || req.body.trim().is_empty() {
        return Err(AppError::Validation(
            "title and body are both required".to_string(),
        ));
    }

    let ip = client_ip(&headers, addr);
    let ip_hash = super::ip_hash(&state.config.ip_hash_salt, &ip);
    let flagged = match recent_submissions(&state.redis, &ip_hash).await {
        Ok(count) => count > ABUSE_THRESHOLD,
        Err(e) => {
            // Abuse tracking is best-effort; a cache hiccup never blocks mail.
            warn!(error = %e, "abuse counter unavailable");
            false
        }
    };

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let message = Message {
        id: state.store.push_key(),
        title: req.title,
        body: req.body,
        ip_hash,
        user_agent,
        flagged,
        status: MessageStatus::New,
        created_at: Utc::now(),
        replies: Vec::new(),
        updated_at: None,
    };
    super::put_message(state.store.as_ref(), &message)
        .await
        .map_err(AppError::Internal)?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitMessageResponse { id: message.id }),
    ))
}

/// Sliding-window submission count per IP hash, via INCR with a TTL set on
/// first use.
async fn recent_submissions(
    redis: &redis::Client,
    ip_hash: &str,
) -> Result<i64, redis::RedisError> {
    let mut conn = redis.get_multiplexed_async_connection().await?;
    let key = format!("abuse:{ip_hash}");
    let count: i64 = conn.incr(&key, 1).await?;
    if count == 1 {
        let _: () = conn.expire(&key, ABUSE_WINDOW_SECS).await?;
    }
    Ok(count)
}

/// GET /api/v1/admin/messages
pub async fn handle_list_messages(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<Vec<Message>>, AppError> {
    let messages = super::list_messages(state.store.as_ref())
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: MessageStatus,
}

/// PATCH /api/v1/admin/messages/:id/status
pub async fn handle_set_status(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Message>, AppError> {
    let mut message = super::get_message(state.store.as_ref(), &id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("Message {id} not found")))?;

    message.status = req.status;
    super::put_message(state.store.as_ref(), &message)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(message))
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub content: String,
}

/// POST /api/v1/admin/messages/:id/replies
/// Appends a reply and marks the message answered.
pub async fn handle_add_reply(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    Json(req): Json<ReplyRequest>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    if req.content.trim().is_empty() {
        return Err(AppError::Validation("reply content is required".to_string()));
    }

    let mut message = super::get_message(state.store.as_ref(), &id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("Message {id} not found")))?;

    message.replies.push(Reply {
        content: req.content,
        author: REPLY_AUTHOR.to_string(),
        created_at: Utc::now(),
    });
    message.status = MessageStatus::Answered;
    super::put_message(state.store.as_ref(), &message)
        .await
        .map_err(AppError::Internal)?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// DELETE /api/v1/admin/messages/:id
pub async fn handle_delete_message(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    super::delete_message(state.store.as_ref(), &id)
        .await
        .map_err(AppError::Internal)?;
    Ok(StatusCode::NO_CONTENT)
}

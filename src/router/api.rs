use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use axum_sessions::extractors::ReadableSession;
use serde::Deserialize;
use serde_json::Value;

use crate::templates::models::SessionUser;

use super::{error::ApiError, session_user, AppState, MAX_CONTENT_LEN, MAX_IMAGE_LINK_LEN};

fn require_user(session: &ReadableSession) -> Result<SessionUser, ApiError> {
    session_user(session).ok_or(ApiError::Unauthenticated)
}

fn validate_content(content: &str) -> Result<(), ApiError> {
    if content.is_empty() || content.chars().count() > MAX_CONTENT_LEN {
        return Err(ApiError::Validation(
            "Your post content must not be empty and cannot exceed 1000 characters.".into(),
        ));
    }
    Ok(())
}

fn validate_image_link(link: &str) -> Result<(), ApiError> {
    if link.chars().count() > MAX_IMAGE_LINK_LEN {
        return Err(ApiError::Validation(
            "Your image URL cannot exceed 3000 characters.".into(),
        ));
    }
    Ok(())
}

/// `/forum/{key}`: an integer key addresses a post, anything else a
/// username.
pub async fn forum_get(
    State(state): State<AppState>,
    session: ReadableSession,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_user(&session)?;
    if let Ok(post_id) = key.parse::<i64>() {
        let post = state
            .db
            .get_post(post_id)
            .await
            .map_err(ApiError::internal)?
            .ok_or(ApiError::NotFound("Post not found."))?;
        Ok(Json(post.to_json()))
    } else {
        let detail = state
            .db
            .user_detail(key)
            .await
            .map_err(ApiError::internal)?
            .ok_or(ApiError::NotFound("User not found."))?;
        Ok(Json(detail.to_json()))
    }
}

#[derive(Deserialize)]
struct PostPatch {
    content: Option<String>,
    image_link: Option<String>,
    /// Presence alone requests a like toggle; the value is ignored.
    like: Option<Value>,
}

#[derive(Deserialize)]
struct LikePatch {
    post_id: Option<i64>,
    comment_id: Option<i64>,
}

pub async fn forum_put(
    State(state): State<AppState>,
    session: ReadableSession,
    Path(key): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let caller = require_user(&session)?;
    // A body the Json extractor rejects still gets the JSON error shape.
    let Json(body) = body.map_err(|_| ApiError::Validation("Invalid request body.".into()))?;
    if let Ok(post_id) = key.parse::<i64>() {
        let patch: PostPatch = serde_json::from_value(body)
            .map_err(|_| ApiError::Validation("Invalid request body.".into()))?;
        if let Some(content) = patch.content.as_deref() {
            validate_content(content)?;
        }
        if let Some(link) = patch.image_link.as_deref() {
            validate_image_link(link)?;
        }
        let found = state
            .db
            .update_post(post_id, patch.content, patch.image_link)
            .await
            .map_err(ApiError::internal)?;
        if !found {
            return Err(ApiError::NotFound("Post not found."));
        }
        if patch.like.is_some() {
            state
                .db
                .toggle_like(caller.id, post_id)
                .await
                .map_err(ApiError::internal)?
                .ok_or(ApiError::NotFound("Post not found."))?;
        }
        Ok(StatusCode::NO_CONTENT)
    } else {
        // Addressed by username, but the like lands on the caller's own
        // like set (the addressed user is only checked for existence).
        state
            .db
            .user_id(key)
            .await
            .map_err(ApiError::internal)?
            .ok_or(ApiError::NotFound("User not found."))?;
        let patch: LikePatch = serde_json::from_value(body)
            .map_err(|_| ApiError::Validation("Invalid request body.".into()))?;
        if let Some(post_id) = patch.post_id {
            let post = state
                .db
                .get_post(post_id)
                .await
                .map_err(ApiError::internal)?;
            if !post.is_some_and(|p| p.parent.is_none()) {
                return Err(ApiError::NotFound("Post not found."));
            }
            state
                .db
                .toggle_like(caller.id, post_id)
                .await
                .map_err(ApiError::internal)?;
        } else if let Some(comment_id) = patch.comment_id {
            let comment = state
                .db
                .get_post(comment_id)
                .await
                .map_err(ApiError::internal)?;
            if !comment.is_some_and(|c| c.parent.is_some()) {
                return Err(ApiError::NotFound("Comment not found."));
            }
            state
                .db
                .toggle_like(caller.id, comment_id)
                .await
                .map_err(ApiError::internal)?;
        }
        Ok(StatusCode::NO_CONTENT)
    }
}

#[derive(Deserialize)]
pub struct ComposeComment {
    content: Option<String>,
    image_link: Option<String>,
}

pub async fn compose_comment(
    State(state): State<AppState>,
    session: ReadableSession,
    Path(post_id): Path<i64>,
    form: Result<Json<ComposeComment>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let caller = require_user(&session)?;
    let Json(form) = form.map_err(|_| ApiError::Validation("Invalid request body.".into()))?;
    let content = form.content.unwrap_or_default();
    validate_content(&content)?;
    let image_link = form.image_link.unwrap_or_default();
    validate_image_link(&image_link)?;

    let comment = state
        .db
        .create_comment(post_id, caller.id, content, image_link)
        .await
        .map_err(ApiError::internal)?
        .ok_or(ApiError::NotFound("Post not found."))?;
    Ok(Json(comment.to_json()))
}

pub async fn get_or_put_required() -> ApiError {
    ApiError::MethodNotAllowed("GET or PUT request required.")
}

pub async fn post_required() -> ApiError {
    ApiError::MethodNotAllowed("POST request required.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_bounds() {
        assert!(validate_content("").is_err());
        assert!(validate_content("hello").is_ok());
        assert!(validate_content(&"x".repeat(1000)).is_ok());
        assert!(validate_content(&"x".repeat(1001)).is_err());
    }

    #[test]
    fn image_link_bounds() {
        assert!(validate_image_link("").is_ok());
        assert!(validate_image_link(&"u".repeat(3000)).is_ok());
        assert!(validate_image_link(&"u".repeat(3001)).is_err());
    }
}

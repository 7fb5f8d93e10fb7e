use axum::{
    body::Body,
    extract::{Path, State},
    http::Response,
    response::IntoResponse,
};
use axum_sessions::extractors::ReadableSession;

use crate::templates;

use super::{error, session_user, AppState};

pub async fn handle_comments(
    State(state): State<AppState>,
    session: ReadableSession,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, Response<Body>> {
    let post = state
        .db
        .get_post(post_id)
        .await
        .map_err(error::err_into_500)?;
    let Some(post) = post else {
        return Err(error::http_404());
    };

    let comments = state
        .db
        .get_comments(post.id)
        .await
        .map_err(error::err_into_500)?;

    Ok(templates::CommentsPage {
        post,
        comments,
        user: session_user(&session).map(|u| u.username),
    })
}

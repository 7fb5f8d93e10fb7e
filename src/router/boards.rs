use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::Response,
    response::{IntoResponse, Redirect},
    Form,
};
use axum_sessions::extractors::WritableSession;
use rusqlite::ErrorCode;
use serde::Deserialize;
use std::num::IntErrorKind;

use crate::{
    database::models::{FeedScope, SortKey},
    templates::{self, models::Flash},
};

use super::{
    error, session_user, take_flash, AppState, MAX_BOARD_DESC_LEN, MAX_BOARD_NAME_LEN,
    MAX_CONTENT_LEN, MAX_IMAGE_LINK_LEN,
};

pub async fn handle_home(
    State(state): State<AppState>,
    mut session: WritableSession,
) -> Result<impl IntoResponse, Response<Body>> {
    let flash = take_flash(&mut session);
    let boards = state.db.get_boards().await.map_err(error::err_into_500)?;
    let user = session_user(&session).map(|u| u.username);
    let can_create = user
        .as_deref()
        .is_some_and(|u| state.cfg.admins.iter().any(|a| a == u));
    Ok(templates::Index {
        flash,
        boards,
        can_create,
        user,
    })
}

#[derive(Deserialize)]
pub struct CreateBoardForm {
    name: String,
    description: String,
    thumbnail: Option<String>,
}

pub async fn handle_createboard(
    State(state): State<AppState>,
    mut session: WritableSession,
    Form(form): Form<CreateBoardForm>,
) -> Result<Redirect, Response<Body>> {
    let Some(user) = session_user(&session) else {
        return Ok(Redirect::to("/login"));
    };
    if !state.cfg.admins.iter().any(|a| *a == user.username) {
        session
            .insert(
                "flash",
                Flash::Error("You do not have permission to create boards".into()),
            )
            .unwrap();
        return Ok(Redirect::to("/"));
    }
    let name = form.name.trim().to_string();
    if name.is_empty() || name.chars().count() > MAX_BOARD_NAME_LEN {
        session
            .insert("flash", Flash::Error("Invalid board name".into()))
            .unwrap();
        return Ok(Redirect::to("/"));
    }
    if form.description.chars().count() > MAX_BOARD_DESC_LEN {
        session
            .insert("flash", Flash::Error("Board description too long".into()))
            .unwrap();
        return Ok(Redirect::to("/"));
    }
    let thumbnail = form.thumbnail.filter(|t| !t.is_empty());
    match state.db.create_board(name, form.description, thumbnail).await {
        Ok(_) => session
            .insert("flash", Flash::Success("Board successfully created".into()))
            .unwrap(),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            session
                .insert("flash", Flash::Error("Board already exists".into()))
                .unwrap()
        }
        Err(e) => return Err(error::err_into_500(e)),
    }
    Ok(Redirect::to("/"))
}

#[derive(Deserialize)]
pub struct FeedQuery {
    q: Option<String>,
    page: Option<String>,
}

// An unparsable page number means page 1. Numbers too large for usize
// saturate so they clamp to the last page like any other out-of-range
// value; the feed query does the clamping.
pub(super) fn parse_page(page: Option<&str>) -> usize {
    page.and_then(|p| match p.parse::<usize>() {
        Ok(n) => Some(n),
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow) => Some(usize::MAX),
        Err(_) => None,
    })
    .unwrap_or(1)
}

pub async fn handle_view(
    State(state): State<AppState>,
    mut session: WritableSession,
    Path(board_id): Path<i64>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, Response<Body>> {
    let flash = take_flash(&mut session);
    let board = state
        .db
        .get_board(board_id)
        .await
        .map_err(error::err_into_500)?;
    let Some(board) = board else {
        return Err(error::http_404());
    };

    let sort = SortKey::from_query(query.q.as_deref());
    let page = state
        .db
        .list_posts(FeedScope::Board(board.id), sort, parse_page(query.page.as_deref()))
        .await
        .map_err(error::err_into_500)?;

    Ok(templates::BoardPage {
        flash,
        board,
        page,
        sort: query.q.unwrap_or_default(),
        user: session_user(&session).map(|u| u.username),
    })
}

#[derive(Deserialize)]
pub struct NewPostForm {
    content: String,
    image_link: Option<String>,
}

pub async fn handle_post(
    State(state): State<AppState>,
    mut session: WritableSession,
    Path(board_id): Path<i64>,
    Form(form): Form<NewPostForm>,
) -> Result<Redirect, Response<Body>> {
    let redirect_uri = format!("/board/{board_id}");
    let Some(user) = session_user(&session) else {
        return Ok(Redirect::to("/login"));
    };
    let board = state
        .db
        .get_board(board_id)
        .await
        .map_err(error::err_into_500)?;
    let Some(board) = board else {
        return Err(error::http_404());
    };

    if form.content.is_empty() {
        session
            .insert("flash", Flash::Error("Post content cannot be empty".into()))
            .unwrap();
        return Ok(Redirect::to(&redirect_uri));
    }
    if form.content.chars().count() > MAX_CONTENT_LEN {
        session
            .insert(
                "flash",
                Flash::Error(format!("Post content too long (max {MAX_CONTENT_LEN} chars)").into()),
            )
            .unwrap();
        return Ok(Redirect::to(&redirect_uri));
    }
    let image_link = form.image_link.unwrap_or_default();
    if image_link.chars().count() > MAX_IMAGE_LINK_LEN {
        session
            .insert(
                "flash",
                Flash::Error(format!("Image link too long (max {MAX_IMAGE_LINK_LEN} chars)").into()),
            )
            .unwrap();
        return Ok(Redirect::to(&redirect_uri));
    }

    state
        .db
        .create_post(board.id, user.id, form.content, image_link)
        .await
        .map_err(error::err_into_500)?;

    session
        .insert(
            "flash",
            Flash::Success("Post was added successfully".into()),
        )
        .unwrap();

    Ok(Redirect::to(&redirect_uri))
}

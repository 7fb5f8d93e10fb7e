use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::Response,
    response::{IntoResponse, Redirect},
};
use axum_sessions::extractors::{ReadableSession, WritableSession};
use serde::Deserialize;

use crate::{
    database::models::{FeedScope, SortKey},
    templates::{self, models::Flash},
};

use super::{boards::parse_page, error, session_user, take_flash, AppState};

#[derive(Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

pub async fn handle_profile(
    State(state): State<AppState>,
    mut session: WritableSession,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, Response<Body>> {
    let flash = take_flash(&mut session);
    let viewer = session_user(&session);
    let profile = state
        .db
        .get_profile(username, viewer.as_ref().map(|u| u.id))
        .await
        .map_err(error::err_into_500)?;
    let Some(profile) = profile else {
        return Err(error::http_404());
    };

    let page = state
        .db
        .list_posts(
            FeedScope::Author(profile.id),
            SortKey::NewOld,
            parse_page(query.page.as_deref()),
        )
        .await
        .map_err(error::err_into_500)?;

    // The button shows the action available next, not the current state.
    let follow_button = if profile.viewer_follows {
        "Unfollow"
    } else {
        "Follow"
    };
    let followers_text = if profile.followers == 1 {
        "1 Follower".to_string()
    } else {
        format!("{} Followers", profile.followers)
    };
    let following_text = if profile.following == 1 {
        format!("{} follows 1 user.", profile.username)
    } else {
        format!("{} follows {} users.", profile.username, profile.following)
    };
    let own_profile = viewer
        .as_ref()
        .is_some_and(|u| u.username == profile.username);

    Ok(templates::UserPage {
        flash,
        profile,
        page,
        own_profile,
        follow_button,
        followers_text,
        following_text,
        user: viewer.map(|u| u.username),
    })
}

pub async fn handle_follow(
    State(state): State<AppState>,
    mut session: WritableSession,
    Path(username): Path<String>,
) -> Result<Redirect, Response<Body>> {
    let redirect_uri = format!("/{username}");
    let Some(viewer) = session_user(&session) else {
        return Ok(Redirect::to("/login"));
    };
    let target = state
        .db
        .user_id(username)
        .await
        .map_err(error::err_into_500)?;
    let Some(target) = target else {
        return Err(error::http_404());
    };

    match state
        .db
        .toggle_follow(viewer.id, target)
        .await
        .map_err(error::err_into_500)?
    {
        Some(_) => {}
        None => {
            session
                .insert("flash", Flash::Error("You cannot follow yourself".into()))
                .unwrap();
        }
    }
    Ok(Redirect::to(&redirect_uri))
}

pub async fn handle_following(
    State(state): State<AppState>,
    session: ReadableSession,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, Response<Body>> {
    let Some(viewer) = session_user(&session) else {
        return Ok(Redirect::to("/login").into_response());
    };
    let page = state
        .db
        .list_posts(
            FeedScope::Following(viewer.id),
            SortKey::NewOld,
            parse_page(query.page.as_deref()),
        )
        .await
        .map_err(error::err_into_500)?;
    Ok(templates::FollowingPage {
        page,
        user: Some(viewer.username),
    }
    .into_response())
}

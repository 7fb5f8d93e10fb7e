use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use axum_sessions::{
    async_session::{
        base64::{self, URL_SAFE_NO_PAD},
        MemoryStore,
    },
    extractors::WritableSession,
    SessionLayer,
};
use color_eyre::Result;

use crate::{
    config::Config,
    database::ExecutorConnection,
    templates::models::{Flash, SessionUser},
};

mod api;
mod auth;
mod boards;
mod error;
mod posts;
mod static_files;
mod users;

pub const MAX_CONTENT_LEN: usize = 1000;
pub const MAX_IMAGE_LINK_LEN: usize = 3000;
pub const MAX_BOARD_NAME_LEN: usize = 1000;
pub const MAX_BOARD_DESC_LEN: usize = 8000;

#[derive(Clone)]
pub struct AppState {
    db: ExecutorConnection,
    cfg: Arc<Config>,
}

/// The authenticated user for this request, if any.
fn session_user(session: &axum_sessions::async_session::Session) -> Option<SessionUser> {
    session.get("user")
}

/// Pops the flash message set by a previous redirect, if any.
fn take_flash(session: &mut WritableSession) -> Flash {
    let flash = session.get("flash").unwrap_or_default();
    if !matches!(flash, Flash::None) {
        session.remove("flash");
    }
    flash
}

pub async fn build(db: ExecutorConnection, cfg: Arc<Config>, store: MemoryStore) -> Result<Router> {
    let secret = base64::decode_config(&cfg.cookie_secret, URL_SAFE_NO_PAD)?;
    let router = Router::new()
        .route("/", get(boards::handle_home).post(boards::handle_createboard))
        .route("/login", get(auth::handle_loginpage).post(auth::handle_login))
        .route(
            "/register",
            get(auth::handle_registerpage).post(auth::handle_register),
        )
        .route("/logout", get(auth::handle_logout))
        .route("/following", get(users::handle_following))
        .route(
            "/board/:id",
            get(boards::handle_view).post(boards::handle_post),
        )
        .route("/board/post/:id", get(posts::handle_comments))
        .route(
            "/forum/comment/compose/:id",
            post(api::compose_comment).fallback(api::post_required),
        )
        .route(
            "/forum/:key",
            get(api::forum_get)
                .put(api::forum_put)
                .fallback(api::get_or_put_required),
        )
        .route("/static/*file", get(static_files::static_handler))
        .route(
            "/:username",
            get(users::handle_profile).post(users::handle_follow),
        )
        .fallback_service(get(|| async { error::http_404() }))
        .layer(SessionLayer::new(store, &secret))
        .with_state(AppState { db, cfg });
    Ok(router)
}

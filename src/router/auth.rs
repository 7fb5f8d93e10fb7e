use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use axum::{
    body::Body,
    extract::State,
    http::Response,
    response::{IntoResponse, Redirect},
    Form,
};
use axum_sessions::extractors::{ReadableSession, WritableSession};
use rusqlite::ErrorCode;
use serde::Deserialize;

use crate::templates::{
    self,
    models::{Flash, SessionUser},
};

use super::{error, session_user, AppState};

pub async fn handle_loginpage(session: ReadableSession) -> impl IntoResponse {
    if session_user(&session).is_some() {
        Err(Redirect::to("/").into_response())
    } else {
        Ok(templates::Login::default())
    }
}

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

pub async fn handle_login(
    State(state): State<AppState>,
    mut session: WritableSession,
    Form(form): Form<LoginForm>,
) -> Result<axum::response::Response, Response<Body>> {
    let cred = state
        .db
        .user_cred(form.username.clone())
        .await
        .map_err(error::err_into_500)?;
    let verified = cred.as_ref().and_then(|(id, hash)| {
        let parsed = PasswordHash::new(hash).ok()?;
        Argon2::default()
            .verify_password(form.password.as_bytes(), &parsed)
            .ok()?;
        Some(*id)
    });
    let Some(id) = verified else {
        return Ok(templates::Login {
            flash: Flash::Error("Invalid username and/or password".into()),
            user: None,
        }
        .into_response());
    };
    session
        .insert(
            "user",
            SessionUser {
                id,
                username: form.username,
            },
        )
        .unwrap();
    Ok(Redirect::to("/").into_response())
}

pub async fn handle_registerpage(session: ReadableSession) -> impl IntoResponse {
    if session_user(&session).is_some() {
        Err(Redirect::to("/").into_response())
    } else {
        Ok(templates::Register::default())
    }
}

#[derive(Deserialize)]
pub struct RegisterForm {
    username: String,
    email: String,
    password: String,
    confirmation: String,
}

pub async fn handle_register(
    State(state): State<AppState>,
    mut session: WritableSession,
    Form(form): Form<RegisterForm>,
) -> Result<axum::response::Response, Response<Body>> {
    let username = form.username.trim().to_string();
    if username.is_empty() {
        return Ok(templates::Register {
            flash: Flash::Error("Username cannot be empty".into()),
            user: None,
        }
        .into_response());
    }
    if form.password.is_empty() || form.password != form.confirmation {
        return Ok(templates::Register {
            flash: Flash::Error("Passwords must match".into()),
            user: None,
        }
        .into_response());
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(form.password.as_bytes(), &salt)
        .map_err(error::err_into_500)?
        .to_string();

    let id = match state
        .db
        .create_user(username.clone(), form.email, hash)
        .await
    {
        Ok(id) => id,
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            return Ok(templates::Register {
                flash: Flash::Error("Username already taken".into()),
                user: None,
            }
            .into_response());
        }
        Err(e) => return Err(error::err_into_500(e)),
    };

    session
        .insert("user", SessionUser { id, username })
        .unwrap();
    Ok(Redirect::to("/").into_response())
}

pub async fn handle_logout(mut session: WritableSession) -> impl IntoResponse {
    session.destroy();
    Redirect::to("/")
}

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// One-shot message carried across a redirect in the session.
#[derive(Default, Serialize, Deserialize)]
pub enum Flash {
    Success(Cow<'static, str>),
    Error(Cow<'static, str>),
    #[default]
    None,
}

/// The signed-in user, as stored in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
}

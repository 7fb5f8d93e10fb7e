use axum::{
    body::{boxed, Full},
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

use super::error;

#[derive(RustEmbed)]
#[folder = "static/"]
struct StaticFiles;

pub async fn static_handler(Path(file): Path<String>) -> impl IntoResponse {
    StaticFile(file.trim_start_matches('/').to_string())
}

pub struct StaticFile(pub String);

impl IntoResponse for StaticFile {
    fn into_response(self) -> Response {
        match StaticFiles::get(&self.0) {
            Some(content) => {
                let body = boxed(Full::from(content.data));
                let mime = mime_guess::from_path(&self.0).first_or_octet_stream();
                Response::builder()
                    .header(header::CONTENT_TYPE, mime.as_ref())
                    .body(body)
                    .unwrap()
            }
            None => Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(boxed(Full::from(error::HTML_404)))
                .unwrap(),
        }
    }
}

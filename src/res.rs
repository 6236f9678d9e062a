use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;

/// Success envelope: `{"success": true, ...body}`. The body must serialize
/// to a JSON object; its fields sit next to `success`.
#[derive(Debug, Serialize)]
pub struct Success<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

pub fn ok<T: Serialize>(body: T) -> Json<Success<T>> {
    Json(Success { success: true, body })
}

pub fn created<T: Serialize>(body: T) -> Response {
    (StatusCode::CREATED, ok(body)).into_response()
}

/// Body for responses that only carry a human readable note.
#[derive(Debug, Serialize)]
pub struct Note {
    pub message: &'static str,
}

pub fn note(message: &'static str) -> Json<Success<Note>> {
    ok(Note { message })
}

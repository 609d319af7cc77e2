use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use thiserror::Error;

/// Failures of the ledger store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ledger store unavailable: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("{table} row {id} has action_type {value:?}, expected In or Out")]
    UnknownAction {
        table: &'static str,
        id: i64,
        value: String,
    },
}

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),

    #[error("export failed: {0}")]
    Export(#[from] csv::Error),

    #[error("session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("forbidden")]
    Forbidden,

    #[error("login required")]
    LoginRequired,
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Store(StoreError::Persistence(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::LoginRequired => return Redirect::to("/login").into_response(),
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_)
            | AppError::Template(_)
            | AppError::Export(_)
            | AppError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            log::error!("{}", self);
        } else {
            log::warn!("{}", self);
        }

        let body = format!(
            "<!doctype html><meta charset=\"utf-8\"><h1>{}</h1><p>{}</p><p><a href=\"/\">Back</a></p>",
            status,
            escape(&self.to_string())
        );
        (status, Html(body)).into_response()
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_status_codes() {
        assert_eq!(AppError::Forbidden.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::BadRequest("no file".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        let unknown = StoreError::UnknownAction { table: "transactions", id: 4, value: "Move".into() };
        assert_eq!(
            AppError::from(unknown).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn login_required_redirects() {
        let response = AppError::LoginRequired.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");
    }
}

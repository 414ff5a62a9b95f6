/*
 * Responsibility
 * - アクセスゲートの拒否理由 (AppError) 定義
 * - IntoResponse 実装: どの拒否も 401 + 短い text/plain 本文
 */
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::auth::VerifyError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("No token on the request")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(#[source] VerifyError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingToken | AppError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

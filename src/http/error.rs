use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{commands, ports::ledger};

/// Error answered by the HTTP endpoints as `{"error": "..."}`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid or expired code")]
    InvalidCode,

    #[error("This code has already been used")]
    CodeAlreadyUsed,

    #[error("Not enough points")]
    NotEnoughPoints,

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Access denied. Admin privileges required.")]
    Forbidden,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedPayload(_)
            | Self::InvalidCode
            | Self::CodeAlreadyUsed
            | Self::NotEnoughPoints => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<commands::Error> for ApiError {
    fn from(err: commands::Error) -> Self {
        use commands::Error as E;

        match err {
            E::Ledger(ledger::Error::CodeNotFound(_)) => Self::InvalidCode,
            E::Ledger(ledger::Error::CodeAlreadyUsed(_)) => Self::CodeAlreadyUsed,
            E::Ledger(ledger::Error::InsufficientPoints { .. })
            | E::Ledger(ledger::Error::NegativePointsTotal { .. }) => Self::NotEnoughPoints,
            E::Ledger(
                err @ (ledger::Error::AccountNotFound(_) | ledger::Error::RewardNotFound(_)),
            ) => Self::Internal(err.to_string()),
            E::InvalidCredentials => Self::InvalidCredentials,
            E::NotAnAdmin(_) => Self::Forbidden,
            err @ (E::Ledger(ledger::Error::Adapter(_)) | E::Admin(_)) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl ApiError {
    /// Mapping for read endpoints addressed by account id, where a missing account is a 404
    pub fn from_lookup(err: commands::Error) -> Self {
        match err {
            commands::Error::Ledger(err @ ledger::Error::AccountNotFound(_)) => {
                Self::NotFound(err.to_string())
            }
            err => err.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

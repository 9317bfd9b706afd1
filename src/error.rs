use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchupError {
    #[error("A match-up needs between {min} and {max} unique entrants (got {count})")]
    EntrantCount { count: usize, min: usize, max: usize },

    #[error("A match-up needs a title")]
    EmptyTitle,

    #[error("Image lookup failed for \"{name}\": {reason}")]
    ImageResolution { name: String, reason: String },

    #[error("Match-up {0} not found")]
    NotFound(u64),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl IntoResponse for MatchupError {
    fn into_response(self) -> Response {
        let status = match self {
            MatchupError::EntrantCount { .. } | MatchupError::EmptyTitle => StatusCode::BAD_REQUEST,
            MatchupError::ImageResolution { .. } => StatusCode::BAD_GATEWAY,
            MatchupError::NotFound(_) => StatusCode::NOT_FOUND,
            MatchupError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

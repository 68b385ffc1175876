use axum::{
    Json,
    extract::{
        path::ErrorKind,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use news_types::api::ErrorBody;
use news_types::models::Emoji;

/// Every way a request can fail. Validators return the first rule violated.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("You cannot subscribe to yourself")]
    SelfFollow,

    #[error("You are already subscribed to this author")]
    DuplicateFollow,

    #[error("You are not subscribed to this author")]
    NotFollowing,

    #[error("You have already reacted with {0}")]
    DuplicateReaction(Emoji),

    #[error("You have no {0} reaction to remove")]
    NoReaction(Emoji),

    #[error("You can only publish into your own channel")]
    ForbiddenChannel,

    #[error("A channel with this title already exists")]
    DuplicateTitle,

    #[error("{0}")]
    Invalid(String),

    #[error("Authentication credentials were not provided or are invalid")]
    Unauthenticated,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("You do not have permission to perform this action")]
    PermissionDenied,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("The request conflicts with existing data")]
    Constraint,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::SelfFollow
            | ApiError::DuplicateFollow
            | ApiError::NotFollowing
            | ApiError::DuplicateReaction(_)
            | ApiError::NoReaction(_)
            | ApiError::ForbiddenChannel
            | ApiError::DuplicateTitle
            | ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UsernameTaken | ApiError::Constraint => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classify a failed insert/update. A storage constraint firing here means
    /// a concurrent request won the race past the validator's pre-check.
    pub fn from_write(err: anyhow::Error) -> Self {
        if news_db::is_constraint_violation(&err) {
            warn!("Write rejected by storage constraint: {}", err);
            ApiError::Constraint
        } else {
            ApiError::Internal(err)
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        ApiError::Invalid(msg.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Invalid(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Invalid(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(err) => {
                let key = match err.kind() {
                    ErrorKind::ParseErrorAtKey { key, .. }
                    | ErrorKind::DeserializeError { key, .. }
                    | ErrorKind::InvalidUtf8InPathParam { key } => Some(key.as_str()),
                    _ => None,
                };
                ApiError::NotFound(key.map_or("Resource", resource_for_param))
            }
            other => ApiError::Internal(anyhow::anyhow!(other.body_text())),
        }
    }
}

/// Resource named by a route parameter, for not-found messages.
fn resource_for_param(key: &str) -> &'static str {
    match key {
        "channel_id" => "Channel",
        "post_id" => "Post",
        "comment_id" => "Comment",
        "reply_id" => "Reply",
        _ => "Resource",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(e) = &self {
            error!("Internal error: {:#}", e);
        }

        let status = self.status();
        (status, Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}

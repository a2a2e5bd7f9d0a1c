use serde_json::json;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

use crate::schema::ValidationError;

pub const NOT_FOUND_MESSAGE: &str = "Not Found";
pub const NOT_ENOUGH_DATA_MESSAGE: &str = "Not enought data";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("no movie with id {id}")]
    NotFound { id: String },

    #[error("page {page} (size {size}) holds no movies")]
    NotEnoughData { page: u64, size: usize },

    #[error("movie store lock poisoned")]
    Poisoned,
}

/// Everything a request handler can fail with.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::NotEnoughData { .. }) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::Poisoned) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Reply for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation(err) => json!({ "error": err.issues }),
            Self::Store(StoreError::NotFound { .. }) => json!({ "message": NOT_FOUND_MESSAGE }),
            Self::Store(StoreError::NotEnoughData { .. }) => json!({ "message": NOT_ENOUGH_DATA_MESSAGE }),
            Self::Store(StoreError::Poisoned) => json!({ "message": "Internal Server Error" }),
        };
        reply::with_status(reply::json(&body), status).into_response()
    }
}

/// JSON `{"message": ...}` with the given status.
pub fn message(status: StatusCode, text: &str) -> Response {
    reply::with_status(reply::json(&json!({ "message": text })), status).into_response()
}

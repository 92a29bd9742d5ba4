use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::{json, Json, Value};
use rocket::Request;
use thiserror::Error;
use tracing::error;

use super::store::RepoError;
use crate::short_link::ShortLinkError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("You do not have permission to perform this action.")]
    Forbidden,
    #[error("store failure")]
    Store(#[from] RepoError),
}

impl ApiError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field,
            message: message.into(),
        }
    }

    fn status(&self) -> Status {
        match self {
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::BadRequest(_) | ApiError::Validation { .. } => Status::BadRequest,
            ApiError::Forbidden => Status::Forbidden,
            ApiError::Store(_) => Status::InternalServerError,
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::NotFound(message) => json!({ "error": message }),
            ApiError::BadRequest(message) => json!({ "errors": message }),
            ApiError::Validation { field, message } => json!({ field.to_string(): [message] }),
            ApiError::Forbidden => json!({ "detail": self.to_string() }),
            ApiError::Store(_) => json!({ "detail": "Internal server error." }),
        }
    }
}

impl From<ShortLinkError> for ApiError {
    fn from(err: ShortLinkError) -> Self {
        match err {
            ShortLinkError::NotFound(_) => ApiError::NotFound("Recipe not found"),
            ShortLinkError::Store(e) => ApiError::Store(e),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        if let ApiError::Store(e) = &self {
            error!(error = ?e, uri = %req.uri(), "store failure while handling request");
        }
        (self.status(), Json(self.body())).respond_to(req)
    }
}

use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::{Error, ErrorType};

/// HTTP response builder for Error enum
impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error_type {
            ErrorType::LabelMe => StatusCode::INTERNAL_SERVER_ERROR,

            ErrorType::UnknownUser => StatusCode::NOT_FOUND,
            ErrorType::UsernameTaken => StatusCode::CONFLICT,
            ErrorType::InvalidUsername => StatusCode::BAD_REQUEST,
            ErrorType::CannotFollowYourself => StatusCode::BAD_REQUEST,

            ErrorType::UnknownReport => StatusCode::NOT_FOUND,
            ErrorType::UnknownComment => StatusCode::NOT_FOUND,
            ErrorType::UnknownReply => StatusCode::NOT_FOUND,
            ErrorType::EmptyText => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorType::TextTooLong { .. } => StatusCode::BAD_REQUEST,
            ErrorType::MissingRequiredField { .. } => StatusCode::BAD_REQUEST,

            ErrorType::TooManyImages { .. } => StatusCode::BAD_REQUEST,
            ErrorType::FileTooLarge { .. } => StatusCode::BAD_REQUEST,
            ErrorType::InvalidFileType => StatusCode::BAD_REQUEST,
            // Client closed request; nginx convention, no named constant
            ErrorType::UploadCancelled => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST)
            }
            ErrorType::UploadFailed => StatusCode::INTERNAL_SERVER_ERROR,

            ErrorType::EnrichmentFailed => StatusCode::INTERNAL_SERVER_ERROR,

            ErrorType::NotOwner => StatusCode::FORBIDDEN,
            ErrorType::NotPrivileged => StatusCode::FORBIDDEN,

            ErrorType::DatabaseError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorType::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorType::InvalidOperation => StatusCode::BAD_REQUEST,
            ErrorType::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ErrorType::InvalidSession => StatusCode::UNAUTHORIZED,
            ErrorType::NotAuthenticated => StatusCode::UNAUTHORIZED,
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::NoEffect => StatusCode::OK,
            ErrorType::FailedValidation { .. } => StatusCode::BAD_REQUEST,
        };

        // Construction sites are internal detail; only expose them to
        // developers running a debug build.
        let error = if cfg!(debug_assertions) {
            self
        } else {
            Error {
                location: String::new(),
                ..self
            }
        };

        (status, Json(&error)).into_response()
    }
}

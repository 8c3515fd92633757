use actix_web::{
    error::BlockingError,
    http::{header, StatusCode},
    HttpResponse, ResponseError,
};
use db::{forms::FormErrors, StoreError};
use speedy::Writable;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    LoginRequired { location: String },
    #[error("permission {0} required")]
    Forbidden(&'static str),
    #[error("not found")]
    NotFound,
    #[error("form has {} invalid field(s)", .0.errors.len())]
    Invalid(FormErrors),
    #[error("malformed request body: {0}")]
    BadRequest(speedy::Error),
    #[error("failed to encode response: {0}")]
    Encode(speedy::Error),
    #[error(transparent)]
    Store(StoreError),
    #[error("blocking task failed: {0}")]
    Blocking(#[from] BlockingError),
    #[error("service misconfigured: {0}")]
    Misconfigured(&'static str),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        if err.is_not_found() {
            Self::NotFound
        } else {
            Self::Store(err)
        }
    }
}

impl From<FormErrors> for ApiError {
    fn from(errors: FormErrors) -> Self {
        Self::Invalid(errors)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::LoginRequired { .. } => StatusCode::FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            // Invalid forms are shown again with their errors, not as an error page.
            Self::Invalid(_) => StatusCode::OK,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Encode(_) | Self::Store(_) | Self::Blocking(_) | Self::Misconfigured(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::LoginRequired { location } => HttpResponse::Found()
                .insert_header((header::LOCATION, location.as_str()))
                .finish(),
            Self::Invalid(errors) => match errors.write_to_vec() {
                Ok(body) => HttpResponse::Ok().body(body),
                Err(err) => ApiError::Encode(err).error_response(),
            },
            Self::Encode(_) | Self::Store(_) | Self::Blocking(_) | Self::Misconfigured(_) => {
                log::error!("{self}");
                HttpResponse::InternalServerError().finish()
            }
            _ => HttpResponse::build(self.status_code()).body(self.to_string()),
        }
    }
}

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gauged_session::StoreError;
use serde::Serialize;
use snafu::Snafu;
use tracing::{debug, warn};

use crate::LOG_TARGET;
use crate::identity::IdentityError;
use crate::routes::AppJson;

// How we want user error responses to be serialized
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Debug, Snafu)]
pub enum RequestError {
    /// No authenticated session authorizes the request, or there is no
    /// authenticated identity to act on. An expected, user-visible outcome.
    #[snafu(visibility(pub(crate)))]
    Forbidden,
    #[snafu(visibility(pub(crate)))]
    #[snafu(display("{message}"))]
    BadRequest { message: String },
    #[snafu(transparent)]
    Store { source: StoreError },
    #[snafu(transparent)]
    Identity { source: IdentityError },
    #[snafu(visibility(pub(crate)))]
    #[snafu(display("InternalServerError: {msg}"))]
    InternalServerError { msg: &'static str },
}
pub type RequestResult<T> = std::result::Result<T, RequestError>;

impl From<JsonRejection> for RequestError {
    fn from(rejection: JsonRejection) -> Self {
        RequestError::BadRequest {
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        debug!(
            target: LOG_TARGET,
            err = %self,
            "Request Error"
        );

        let (status_code, message) = match self {
            RequestError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_owned()),
            RequestError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            err => {
                warn!(
                    target: LOG_TARGET,
                    err = %err,
                    "Unexpected Request Error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_owned(),
                )
            }
        };

        (status_code, AppJson(ErrorResponse { message })).into_response()
    }
}

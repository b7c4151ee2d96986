//! Tagged and untagged request failures.
//!
//! Every stage of a route pipeline resolves to an [`Outcome`]: either a
//! [`Response`] or a [`Failure`]. Failures travel outward through the
//! interceptors untouched until the router hands them to an
//! [`ExceptionFilter`](crate::filter::ExceptionFilter) (tagged failures only)
//! or to the framework default rendering.
//!
//! ```text
//! Failure::Http(HttpException)  ← carries a status code; filters may catch it
//! Failure::Unhandled(String)    ← anything else; always the default 500
//! ```

use std::fmt;

use http::StatusCode;

use crate::response::Response;

/// What every pipeline stage and handler eventually resolves to.
pub type Outcome = Result<Response, Failure>;

/// A failure carrying a machine-readable HTTP status code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpException {
    status: StatusCode,
    message: String,
}

impl HttpException {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn message(&self) -> &str { &self.message }

    /// Framework default rendering: the status code with the message as
    /// plain text. Used when no [`ExceptionFilter`](crate::filter::ExceptionFilter)
    /// is installed on the route or the router.
    pub fn into_default_response(self) -> Response {
        Response::builder().status(self.status).text(self.message)
    }
}

impl fmt::Display for HttpException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for HttpException {}

/// A failed request stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    /// Tagged failure with a status code.
    Http(HttpException),
    /// Untagged failure. Never caught by exception filters.
    Unhandled(String),
}

impl Failure {
    /// Wraps any displayable error as an untagged failure.
    pub fn unhandled(err: impl fmt::Display) -> Self {
        Self::Unhandled(err.to_string())
    }

    /// Framework default rendering for failures no filter caught.
    pub(crate) fn into_default_response(self) -> Response {
        match self {
            Self::Http(exception) => exception.into_default_response(),
            Self::Unhandled(_) => Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .text("Internal Server Error"),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "http exception: {e}"),
            Self::Unhandled(msg) => write!(f, "unhandled: {msg}"),
        }
    }
}

impl std::error::Error for Failure {}

impl From<HttpException> for Failure {
    fn from(e: HttpException) -> Self {
        Self::Http(e)
    }
}

impl From<serde_json::Error> for Failure {
    fn from(e: serde_json::Error) -> Self {
        Self::unhandled(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rendering_keeps_status_and_message() {
        let response = HttpException::bad_request("nope").into_default_response();
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.body(), b"nope");
    }

    #[test]
    fn unhandled_failures_hide_their_message() {
        let response = Failure::unhandled("db exploded").into_default_response();
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body(), b"Internal Server Error");
    }
}

//! Exception filters render tagged failures.
//!
//! Only [`HttpException`]s reach a filter. Untagged failures always get the
//! framework default `500`. The route's own filters are consulted first, then
//! the controller's, then the router's; the first one wins.

use http::{Method, StatusCode};
use serde::Serialize;

use crate::exception::HttpException;
use crate::response::{IntoResponse, Json, Response};

/// Method and path of the failed request, captured before the pipeline ran.
#[derive(Clone, Debug)]
pub struct RequestHead {
    pub method: Method,
    pub path: String,
}

pub trait ExceptionFilter: Send + Sync + 'static {
    fn catch(&self, exception: HttpException, head: &RequestHead) -> Response;
}

/// Renders `{"statusCode": <code>, "message": <message>}` with the exception's
/// status as the transport status.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpExceptionFilter;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    status_code: u16,
    message: &'a str,
}

impl ExceptionFilter for HttpExceptionFilter {
    fn catch(&self, exception: HttpException, head: &RequestHead) -> Response {
        let status: StatusCode = exception.status();
        tracing::debug!(
            method = %head.method,
            path = %head.path,
            status = status.as_u16(),
            "http exception",
        );
        let body = ErrorBody { status_code: status.as_u16(), message: exception.message() };
        let mut response = Json(body).into_response();
        response.status = status;
        response
    }
}

//! Outgoing HTTP response type and the [`IntoResponse`] / [`IntoOutcome`]
//! conversion traits.
//!
//! Build a [`Response`] in your handler and return it, or return a
//! `Result<_, HttpException>` and let the pipeline decide how the failure is
//! rendered.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;

use crate::exception::{Failure, HttpException, Outcome};

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
pub enum ContentType {
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use catnip::{Response, StatusCode};
///
/// Response::json(br#"{"name":"Tom"}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/cats/0")
///     .json(br#"{"name":"Tom","age":3}"#.to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) body: Vec<u8>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: StatusCode,
}

impl Response {
    /// `200 OK`, `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::bytes_raw("application/json", body)
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::bytes_raw("text/plain; charset=utf-8", body.into().into_bytes())
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { body: Vec::new(), headers: Vec::new(), status: code }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn bytes_raw(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            body,
            headers: vec![("content-type".to_owned(), content_type.to_owned())],
            status: StatusCode::OK,
        }
    }

    /// Converts into the hyper response written to the wire.
    ///
    /// Headers that are not valid HTTP tokens are dropped with a warning
    /// rather than failing the whole response.
    pub(crate) fn into_hyper(self) -> http::Response<Full<Bytes>> {
        let mut out = http::Response::new(Full::new(Bytes::from(self.body)));
        *out.status_mut() = self.status;
        let headers = out.headers_mut();
        for (name, value) in self.headers {
            match (
                http::HeaderName::from_bytes(name.as_bytes()),
                http::HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => { headers.append(name, value); }
                _ => tracing::warn!(header = %name, "dropping invalid response header"),
            }
        }
        out
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: Vec<u8>) -> Response {
        self.finish("application/json", body)
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish("text/plain; charset=utf-8", body.into().into_bytes())
    }

    /// Terminate with a typed body.
    pub fn bytes(self, content_type: ContentType, body: Vec<u8>) -> Response {
        self.finish(content_type.as_str(), body)
    }

    /// Terminate with no body (e.g. `101 Switching Protocols`, `204 No Content`).
    pub fn no_body(self) -> Response {
        Response { body: Vec::new(), headers: self.headers, status: self.status }
    }

    fn finish(self, content_type: &str, body: Vec<u8>) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { body, headers, status: self.status }
    }
}

// ── Json ──────────────────────────────────────────────────────────────────────

/// Serializes its contents with `serde_json` as an `application/json` body.
///
/// ```rust
/// use catnip::{Json, StatusCode};
///
/// async fn list(_req: catnip::Request) -> Json<Vec<&'static str>> {
///     Json(vec!["Tom", "Felix"])
/// }
///
/// // With an explicit status:
/// async fn create(_req: catnip::Request) -> (StatusCode, Json<&'static str>) {
///     (StatusCode::CREATED, Json("Tom"))
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Json<T>(pub T);

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers; pair it
/// with [`IntoOutcome`] (one line, see its docs).
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a status directly from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => Response::json(bytes),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize json response");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl<R: IntoResponse> IntoResponse for (StatusCode, R) {
    fn into_response(self) -> Response {
        let mut response = self.1.into_response();
        response.status = self.0;
        response
    }
}

// ── IntoOutcome ───────────────────────────────────────────────────────────────

/// Conversion of a handler's return value into a pipeline [`Outcome`].
///
/// Every [`IntoResponse`] type shipped by catnip implements it, as does
/// `Result<T, E>` for any `T: IntoResponse` and `E: Into<Failure>`, so
/// handlers can use `?` on [`HttpException`]s. For your own response type:
///
/// ```rust
/// use catnip::{IntoOutcome, IntoResponse, Outcome, Response};
///
/// struct Teapot;
///
/// impl IntoResponse for Teapot {
///     fn into_response(self) -> Response { Response::text("short and stout") }
/// }
///
/// impl IntoOutcome for Teapot {
///     fn into_outcome(self) -> Outcome { Ok(self.into_response()) }
/// }
/// ```
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

macro_rules! outcome_from_response {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoOutcome for $ty {
                fn into_outcome(self) -> Outcome { Ok(self.into_response()) }
            }
        )*
    };
}

outcome_from_response!(Response, &'static str, String, StatusCode);

impl<T: Serialize> IntoOutcome for Json<T> {
    fn into_outcome(self) -> Outcome { Ok(self.into_response()) }
}

impl<R: IntoResponse> IntoOutcome for (StatusCode, R) {
    fn into_outcome(self) -> Outcome { Ok(self.into_response()) }
}

impl IntoOutcome for HttpException {
    fn into_outcome(self) -> Outcome { Err(Failure::Http(self)) }
}

impl IntoOutcome for Failure {
    fn into_outcome(self) -> Outcome { Err(self) }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoResponse,
    E: Into<Failure>,
{
    fn into_outcome(self) -> Outcome {
        self.map(IntoResponse::into_response).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_wrapper_serializes_body() {
        let response = Json(serde_json::json!({ "name": "Tom" })).into_response();
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.body(), br#"{"name":"Tom"}"#);
    }

    #[test]
    fn status_tuple_overrides_status() {
        let response = (StatusCode::CREATED, "made").into_response();
        assert_eq!(response.status_code(), StatusCode::CREATED);
        assert_eq!(response.body(), b"made");
    }

    #[test]
    fn result_err_becomes_tagged_failure() {
        let result: Result<String, HttpException> = Err(HttpException::forbidden("no"));
        assert_eq!(
            result.into_outcome().unwrap_err(),
            Failure::Http(HttpException::forbidden("no")),
        );
    }

    #[test]
    fn builder_puts_content_type_first() {
        let response = Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/cats/0")
            .json(b"{}".to_vec());
        assert_eq!(response.headers()[0].0, "content-type");
        assert_eq!(response.header("location"), Some("/cats/0"));
    }

    #[test]
    fn invalid_headers_are_dropped_on_conversion() {
        let response = Response::builder().header("bad header", "x").text("ok");
        let hyper = response.into_hyper();
        assert_eq!(hyper.headers().len(), 1);
    }
}

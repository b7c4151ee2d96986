//! Incoming HTTP request type and the caller context derived from it.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::exception::HttpException;
use crate::pipeline::RouteMeta;

/// Header carrying the caller's role claims, comma separated.
pub const ROLES_HEADER: &str = "x-roles";

/// An incoming HTTP request.
///
/// The server builds these from the wire; tests and in-process callers build
/// them directly:
///
/// ```rust
/// use catnip::{Method, Request};
///
/// let req = Request::new(Method::POST, "/cats")
///     .with_header("x-roles", "admin")
///     .with_body(br#"{"name":"Tom","age":3}"#.to_vec());
/// assert_eq!(req.caller().roles(), ["admin"]);
/// ```
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
    pub(crate) params: HashMap<String, String>,
    /// Body after the route's pipes ran; `None` until a body pipe runs.
    pub(crate) body_value: Option<Value>,
    /// Path parameters after the route's parameter pipes ran.
    pub(crate) param_values: HashMap<String, Value>,
    pub(crate) route: Option<Arc<RouteMeta>>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self::from_parts(method, path.into(), Vec::new(), Vec::new())
    }

    pub(crate) fn from_parts(
        method: Method,
        path: String,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            method,
            path,
            headers,
            body,
            params: HashMap::new(),
            body_value: None,
            param_values: HashMap::new(),
            route: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/cats/{id}`, `req.param("id")` on `/cats/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Metadata of the route this request was dispatched to.
    pub fn route(&self) -> Option<&RouteMeta> {
        self.route.as_deref()
    }

    /// Role claims of whoever sent this request.
    pub fn caller(&self) -> Caller {
        Caller::from_header(self.header(ROLES_HEADER))
    }

    /// Decodes the body as JSON.
    ///
    /// If a body pipe already ran, its output is decoded; otherwise the raw
    /// body is parsed. Malformed or mistyped input is a `400`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpException> {
        let value = match &self.body_value {
            Some(value) => value.clone(),
            None => self.body_json()?,
        };
        serde_json::from_value(value)
            .map_err(|e| HttpException::bad_request(format!("Validation failed: {e}")))
    }

    /// Decodes a path parameter, after any parameter pipe ran on it.
    pub fn param_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, HttpException> {
        let value = match self.param_values.get(key) {
            Some(value) => value.clone(),
            None => Value::String(
                self.param(key)
                    .ok_or_else(|| HttpException::bad_request(format!("missing path parameter `{key}`")))?
                    .to_owned(),
            ),
        };
        serde_json::from_value(value)
            .map_err(|e| HttpException::bad_request(format!("Validation failed: {e}")))
    }

    /// Parses the raw body as a JSON value. An empty body is `null`.
    pub(crate) fn body_json(&self) -> Result<Value, HttpException> {
        if self.body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.body)
            .map_err(|_| HttpException::bad_request("Invalid JSON body"))
    }
}

/// Role claims attached to a request.
///
/// Consumed by guards; never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Caller {
    roles: Vec<String>,
}

impl Caller {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { roles: roles.into_iter().map(Into::into).collect() }
    }

    /// Parses `admin, editor` style header values. Absent header means no roles.
    pub fn from_header(value: Option<&str>) -> Self {
        let roles = value
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        Self { roles }
    }

    pub fn roles(&self) -> &[String] { &self.roles }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

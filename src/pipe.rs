//! Pipes validate or transform handler input before the handler runs.
//!
//! A pipe sees a [`serde_json::Value`]: the decoded body for
//! [`Route::pipe`](crate::Route::pipe), or a path parameter (as a JSON string)
//! for [`Route::param_pipe`](crate::Route::param_pipe). Returning an error
//! stops the pipeline; the error is a tagged failure, so filters see it.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::exception::HttpException;

pub trait Pipe: Send + Sync + 'static {
    fn transform(&self, value: Value) -> Result<Value, HttpException>;
}

/// Accepts any value that carries a string `name` field, unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct ValidationPipe;

impl Pipe for ValidationPipe {
    fn transform(&self, value: Value) -> Result<Value, HttpException> {
        match value.get("name") {
            Some(Value::String(_)) => Ok(value),
            _ => Err(HttpException::bad_request("Validation failed: name is required")),
        }
    }
}

/// Accepts any value that deserializes into `T`, unchanged.
///
/// The shape contract lives in `T`'s `Deserialize` impl: required fields and
/// field types are checked by serde.
pub struct TypedValidationPipe<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> TypedValidationPipe<T> {
    pub fn new() -> Self {
        Self { _target: PhantomData }
    }
}

impl<T> Default for TypedValidationPipe<T> {
    fn default() -> Self { Self::new() }
}

impl<T> fmt::Debug for TypedValidationPipe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedValidationPipe")
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: DeserializeOwned + 'static> Pipe for TypedValidationPipe<T> {
    fn transform(&self, value: Value) -> Result<Value, HttpException> {
        match T::deserialize(&value) {
            Ok(_) => Ok(value),
            Err(e) => Err(HttpException::bad_request(format!("Validation failed: {e}"))),
        }
    }
}

/// Turns a numeric string (`-?[0-9]+`) into a JSON integer.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParseIntPipe;

impl ParseIntPipe {
    fn parse(s: &str) -> Option<i64> {
        let digits = s.strip_prefix('-').unwrap_or(s);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse().ok()
    }
}

impl Pipe for ParseIntPipe {
    fn transform(&self, value: Value) -> Result<Value, HttpException> {
        let parsed = match &value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => n.as_i64(),
            _ => None,
        };
        parsed
            .map(Value::from)
            .ok_or_else(|| HttpException::bad_request("Validation failed (numeric string is expected)"))
    }
}

//! Request handlers.

pub mod chat;
pub mod conversations;
pub mod health;
pub mod messages;

use axum::body::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Parse a JSON request body.
///
/// Bodies are taken as raw bytes and parsed here rather than through axum's
/// `Json` extractor so malformed input gets the same error envelope as every
/// other failure. Only JSON objects are accepted: derived struct
/// deserializers would otherwise fill fields from an array by position. An
/// empty body parses as `{}` when `empty_is_object` is set.
pub(crate) fn parse_json_body<T: DeserializeOwned>(
    body: &Bytes,
    empty_is_object: bool,
) -> AppResult<T> {
    let invalid = || AppError::Validation("Invalid JSON body".into());

    let value = if empty_is_object && body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(body).map_err(|_| invalid())?
    };
    if !value.is_object() {
        return Err(invalid());
    }
    serde_json::from_value(value).map_err(|_| invalid())
}

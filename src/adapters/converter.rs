use crate::domain::model::{RequestBody, ResponseBody};
use crate::domain::ports::{Converter, RequestBodyConverter};
use crate::utils::error::{CallError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

const TEXT_PLAIN: &str = "text/plain; charset=UTF-8";
const APPLICATION_JSON: &str = "application/json; charset=UTF-8";

/// Plain text in and out. The body is not trimmed or otherwise touched.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl Converter<String> for StringConverter {
    fn convert(&self, body: ResponseBody) -> Result<String> {
        String::from_utf8(body.into_bytes().to_vec()).map_err(|e| CallError::ConversionError {
            message: format!("response body is not valid UTF-8: {}", e),
        })
    }
}

impl RequestBodyConverter<String> for StringConverter {
    fn encode(&self, value: &String) -> Result<RequestBody> {
        Ok(RequestBody::new(TEXT_PLAIN, value.clone()))
    }
}

/// JSON through `serde_json`.
pub struct JsonConverter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonConverter<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonConverter<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonConverter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonConverter")
    }
}

impl<T: DeserializeOwned> Converter<T> for JsonConverter<T> {
    fn convert(&self, body: ResponseBody) -> Result<T> {
        Ok(serde_json::from_slice(body.bytes())?)
    }
}

impl<T: Serialize> RequestBodyConverter<T> for JsonConverter<T> {
    fn encode(&self, value: &T) -> Result<RequestBody> {
        let bytes = serde_json::to_vec(value)?;
        Ok(RequestBody::new(APPLICATION_JSON, bytes))
    }
}

/// Hands back the raw body for callers that want to decode it themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyConverter;

impl Converter<ResponseBody> for BodyConverter {
    fn convert(&self, body: ResponseBody) -> Result<ResponseBody> {
        Ok(body)
    }
}

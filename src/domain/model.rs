use crate::utils::error::{CallError, Result};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use url::Url;

/// A declared HTTP operation, relative to a client's base URL.
#[derive(Debug, Clone)]
pub struct Endpoint {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Option<RequestBody>,
}

impl Endpoint {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Resolves the endpoint against `base_url` the way a browser resolves a
    /// link: a leading `/` replaces the base path, anything else is appended.
    pub fn to_request(&self, base_url: &Url) -> Result<Request> {
        let url = base_url.join(&self.path)?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                CallError::InvalidRequestError {
                    message: format!("invalid header name '{}': {}", name, e),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| CallError::InvalidRequestError {
                message: format!("invalid value for header '{}': {}", name, e),
            })?;
            headers.append(name, value);
        }

        Ok(Request {
            method: self.method.clone(),
            url,
            headers,
            body: self.body.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<RequestBody>,
}

impl Request {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct RequestBody {
    content_type: String,
    bytes: Bytes,
}

impl RequestBody {
    pub fn new(content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

/// Raw response bytes, exactly as the server sent them.
#[derive(Debug, Clone, Default)]
pub struct ResponseBody {
    content_type: Option<String>,
    bytes: Bytes,
}

impl ResponseBody {
    pub fn new(content_type: Option<String>, bytes: Bytes) -> Self {
        Self {
            content_type,
            bytes,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(
            Some("text/plain; charset=utf-8".to_string()),
            Bytes::copy_from_slice(text.as_bytes()),
        )
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Body as text; invalid UTF-8 sequences are replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Status line and headers of a completed exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: StatusCode,
    reason: String,
    headers: HeaderMap,
    url: Url,
}

impl RawResponse {
    pub fn new(status: StatusCode, reason: String, headers: HeaderMap, url: Url) -> Self {
        Self {
            status,
            reason,
            headers,
            url,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Full response wrapper: status, headers and either a decoded body or the
/// raw error body.
#[derive(Debug, Clone)]
pub struct Response<T> {
    raw: RawResponse,
    body: Option<T>,
    error_body: Option<ResponseBody>,
}

impl<T> Response<T> {
    pub fn success(raw: RawResponse, body: Option<T>) -> Self {
        Self {
            raw,
            body,
            error_body: None,
        }
    }

    pub fn error(raw: RawResponse, error_body: ResponseBody) -> Self {
        Self {
            raw,
            body: None,
            error_body: Some(error_body),
        }
    }

    pub fn raw(&self) -> &RawResponse {
        &self.raw
    }

    pub fn code(&self) -> u16 {
        self.raw.code()
    }

    pub fn status(&self) -> StatusCode {
        self.raw.status()
    }

    pub fn message(&self) -> &str {
        self.raw.reason()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.raw.headers()
    }

    pub fn is_successful(&self) -> bool {
        self.raw.status().is_success()
    }

    pub fn body(&self) -> Option<&T> {
        self.body.as_ref()
    }

    pub fn into_body(self) -> Option<T> {
        self.body
    }

    pub fn error_body(&self) -> Option<&ResponseBody> {
        self.error_body.as_ref()
    }

    pub fn into_parts(self) -> (RawResponse, Option<T>, Option<ResponseBody>) {
        (self.raw, self.body, self.error_body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_resolves_against_base_url() {
        let base = Url::parse("http://localhost:8080/api/").unwrap();

        let absolute = Endpoint::get("/").to_request(&base).unwrap();
        assert_eq!(absolute.url().as_str(), "http://localhost:8080/");

        let relative = Endpoint::get("users/1").to_request(&base).unwrap();
        assert_eq!(relative.url().as_str(), "http://localhost:8080/api/users/1");
    }

    #[test]
    fn test_endpoint_headers_and_body() {
        let base = Url::parse("http://localhost/").unwrap();
        let request = Endpoint::post("token")
            .header("X-Trace", "abc")
            .header("X-Trace", "def")
            .body(RequestBody::new("text/plain", "hello"))
            .to_request(&base)
            .unwrap();

        assert_eq!(*request.method(), Method::POST);
        assert_eq!(request.headers().get_all("x-trace").iter().count(), 2);
        assert_eq!(request.body().unwrap().bytes().as_ref(), b"hello");
        assert_eq!(request.body().unwrap().content_type(), "text/plain");
    }

    #[test]
    fn test_endpoint_rejects_bad_header() {
        let base = Url::parse("http://localhost/").unwrap();
        let result = Endpoint::get("/").header("bad header", "x").to_request(&base);
        assert!(matches!(result, Err(CallError::InvalidRequestError { .. })));
    }

    #[test]
    fn test_response_wrapper_accessors() {
        let raw = RawResponse::new(
            StatusCode::NOT_FOUND,
            "Client Error".to_string(),
            HeaderMap::new(),
            Url::parse("http://localhost/").unwrap(),
        );
        let response: Response<String> = Response::error(raw, ResponseBody::from_text("Hi"));

        assert!(!response.is_successful());
        assert_eq!(response.code(), 404);
        assert_eq!(response.message(), "Client Error");
        assert!(response.body().is_none());
        assert_eq!(response.error_body().unwrap().text(), "Hi");
    }
}

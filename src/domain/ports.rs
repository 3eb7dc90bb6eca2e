use crate::domain::model::{Request, RequestBody, Response, ResponseBody};
use crate::utils::error::{CallError, Result};
use std::sync::Arc;

/// One HTTP request/response exchange.
///
/// A call runs at most once; `duplicate` hands out a fresh call for the same
/// request when it has to be sent again.
pub trait Call<T>: Send + Sync {
    /// Runs the exchange, blocking the current thread until it finishes.
    fn execute(&self) -> Result<Response<T>>;

    /// Runs the exchange in the background and reports to `callback`.
    fn enqueue(&self, callback: Box<dyn Callback<T>>);

    fn is_executed(&self) -> bool;

    fn cancel(&self);

    fn is_canceled(&self) -> bool;

    fn request(&self) -> &Request;

    fn duplicate(&self) -> Box<dyn Call<T>>;
}

/// Receives the outcome of an enqueued call. Exactly one method is invoked.
pub trait Callback<T>: Send {
    /// The server answered; `response` may still be unsuccessful.
    fn on_response(self: Box<Self>, response: Response<T>);

    fn on_failure(self: Box<Self>, error: CallError);
}

/// Decodes a response body into `T`.
pub trait Converter<T>: Send + Sync {
    fn convert(&self, body: ResponseBody) -> Result<T>;
}

/// Encodes `T` into a request body.
pub trait RequestBodyConverter<T> {
    fn encode(&self, value: &T) -> Result<RequestBody>;
}

/// Turns a call into some other representation of the same work.
pub trait CallAdapter<T> {
    type Adapted;

    fn adapt(&self, call: Arc<dyn Call<T>>) -> Self::Adapted;
}

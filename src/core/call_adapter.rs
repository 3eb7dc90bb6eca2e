use crate::core::listenable_future::{Completer, ListenableFuture};
use crate::domain::model::Response;
use crate::domain::ports::{Call, CallAdapter, Callback};
use crate::utils::error::{CallError, HttpError};
use std::sync::Arc;

/// Hands out the adapters that turn a [`Call`] into a [`ListenableFuture`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FutureCallAdapterFactory;

impl FutureCallAdapterFactory {
    pub fn create() -> Self {
        Self
    }

    pub fn body_adapter(&self) -> BodyCallAdapter {
        BodyCallAdapter
    }

    pub fn response_adapter(&self) -> ResponseCallAdapter {
        ResponseCallAdapter
    }
}

/// Resolves to the decoded body; non-2xx responses fail the future.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyCallAdapter;

/// Resolves to the whole [`Response`]; only transport and conversion
/// failures fail the future.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseCallAdapter;

impl<T: Send + Sync + 'static> CallAdapter<T> for BodyCallAdapter {
    type Adapted = ListenableFuture<T>;

    fn adapt(&self, call: Arc<dyn Call<T>>) -> ListenableFuture<T> {
        let (future, completer) = ListenableFuture::pending();
        link_cancellation(&future, &call);
        call.enqueue(Box::new(BodyCallback { completer }));
        future
    }
}

impl<T: Send + Sync + 'static> CallAdapter<T> for ResponseCallAdapter {
    type Adapted = ListenableFuture<Response<T>>;

    fn adapt(&self, call: Arc<dyn Call<T>>) -> ListenableFuture<Response<T>> {
        let (future, completer) = ListenableFuture::pending();
        link_cancellation(&future, &call);
        call.enqueue(Box::new(ResponseCallback { completer }));
        future
    }
}

fn link_cancellation<T, U>(future: &ListenableFuture<U>, call: &Arc<dyn Call<T>>)
where
    T: 'static,
{
    let call = Arc::clone(call);
    future.on_cancel(move || {
        tracing::debug!("Future cancelled, cancelling call to {}", call.request().url());
        call.cancel();
    });
}

/// Resolves the future when the call itself reports a failure.
fn fail<V>(completer: Completer<V>, error: CallError) {
    if error.is_canceled() {
        completer.set_cancelled();
    } else {
        completer.set_error(error);
    }
}

struct BodyCallback<T> {
    completer: Completer<T>,
}

impl<T: Send + Sync> Callback<T> for BodyCallback<T> {
    fn on_response(self: Box<Self>, response: Response<T>) {
        let completer = self.completer;
        if !response.is_successful() {
            completer.set_error(HttpError::from_response(response).into());
            return;
        }

        let code = response.code();
        match response.into_body() {
            Some(body) => {
                completer.set(body);
            }
            None => {
                completer.set_error(CallError::EmptyBody { code });
            }
        }
    }

    fn on_failure(self: Box<Self>, error: CallError) {
        fail(self.completer, error);
    }
}

struct ResponseCallback<T> {
    completer: Completer<Response<T>>,
}

impl<T: Send + Sync> Callback<T> for ResponseCallback<T> {
    fn on_response(self: Box<Self>, response: Response<T>) {
        self.completer.set(response);
    }

    fn on_failure(self: Box<Self>, error: CallError) {
        fail(self.completer, error);
    }
}

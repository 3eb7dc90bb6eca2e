use crate::core::dispatcher::Dispatcher;
use crate::domain::model::{RawResponse, Request, Response, ResponseBody};
use crate::domain::ports::{Call, Callback, Converter};
use crate::utils::error::{CallError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// A [`Call`] carried out by `reqwest` on a [`Dispatcher`].
pub struct HttpCall<T> {
    client: Client,
    dispatcher: Arc<Dispatcher>,
    request: Request,
    converter: Arc<dyn Converter<T>>,
    executed: AtomicBool,
    cancel: CancellationToken,
}

impl<T: Send + 'static> HttpCall<T> {
    pub fn new(
        client: Client,
        dispatcher: Arc<Dispatcher>,
        request: Request,
        converter: Arc<dyn Converter<T>>,
    ) -> Self {
        Self {
            client,
            dispatcher,
            request,
            converter,
            executed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    fn mark_executed(&self) -> Result<()> {
        if self.executed.swap(true, Ordering::SeqCst) {
            return Err(CallError::AlreadyExecuted);
        }
        Ok(())
    }

    fn exchange(&self) -> impl std::future::Future<Output = Result<Response<T>>> + Send + 'static {
        let client = self.client.clone();
        let request = self.request.clone();
        let converter = Arc::clone(&self.converter);
        let cancel = self.cancel.clone();

        async move {
            if cancel.is_cancelled() {
                return Err(CallError::Canceled);
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("Call to {} cancelled in flight", request.url());
                    Err(CallError::Canceled)
                }
                result = perform(&client, &request, converter.as_ref()) => result,
            }
        }
    }
}

impl<T: Send + 'static> Call<T> for HttpCall<T> {
    fn execute(&self) -> Result<Response<T>> {
        self.mark_executed()?;

        let (tx, rx) = oneshot::channel();
        let exchange = self.exchange();
        self.dispatcher.spawn(async move {
            let _ = tx.send(exchange.await);
        });

        // Panics when called from async code instead of stalling a worker.
        rx.blocking_recv().unwrap_or_else(|_| {
            Err(CallError::IoError(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "dispatcher stopped before the call completed",
            )))
        })
    }

    fn enqueue(&self, callback: Box<dyn Callback<T>>) {
        if let Err(e) = self.mark_executed() {
            callback.on_failure(e);
            return;
        }

        let exchange = self.exchange();
        self.dispatcher.spawn(async move {
            match exchange.await {
                Ok(response) => callback.on_response(response),
                Err(e) => callback.on_failure(e),
            }
        });
    }

    fn is_executed(&self) -> bool {
        self.executed.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }

    fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn request(&self) -> &Request {
        &self.request
    }

    fn duplicate(&self) -> Box<dyn Call<T>> {
        Box::new(HttpCall::new(
            self.client.clone(),
            Arc::clone(&self.dispatcher),
            self.request.clone(),
            Arc::clone(&self.converter),
        ))
    }
}

async fn perform<T>(
    client: &Client,
    request: &Request,
    converter: &dyn Converter<T>,
) -> Result<Response<T>> {
    let started = Instant::now();
    tracing::debug!("--> {} {}", request.method(), request.url());

    let mut builder = client
        .request(request.method().clone(), request.url().clone())
        .headers(request.headers().clone());
    if let Some(body) = request.body() {
        builder = builder
            .header(CONTENT_TYPE, body.content_type())
            .body(body.bytes().clone());
    }

    let response = builder.send().await.map_err(|e| {
        tracing::warn!("<-- HTTP FAILED {}: {}", request.url(), e);
        CallError::from_transport(e)
    })?;

    let status = response.status();
    let reason = reason_phrase(&response);
    let headers = response.headers().clone();
    let url = response.url().clone();
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let bytes = response.bytes().await.map_err(|e| {
        tracing::warn!("<-- HTTP FAILED reading body of {}: {}", url, e);
        CallError::from_transport(e)
    })?;

    tracing::debug!(
        "<-- {} {} {} ({}ms, {} bytes)",
        status.as_u16(),
        reason,
        url,
        started.elapsed().as_millis(),
        bytes.len()
    );

    let raw = RawResponse::new(status, reason, headers, url);
    let body = ResponseBody::new(content_type, bytes);

    if !status.is_success() {
        return Ok(Response::error(raw, body));
    }
    if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
        return Ok(Response::success(raw, None));
    }

    let value = converter.convert(body)?;
    Ok(Response::success(raw, Some(value)))
}

/// The reason phrase from the status line, or the canonical one when the
/// server sent the standard phrase (or none at all).
fn reason_phrase(response: &reqwest::Response) -> String {
    response
        .extensions()
        .get::<hyper::ext::ReasonPhrase>()
        .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok())
        .or_else(|| response.status().canonical_reason())
        .unwrap_or_default()
        .to_string()
}

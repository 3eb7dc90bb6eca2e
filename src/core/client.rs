use crate::adapters::http::HttpCall;
use crate::config::ClientConfig;
use crate::core::call_adapter::FutureCallAdapterFactory;
use crate::core::dispatcher::Dispatcher;
use crate::core::listenable_future::ListenableFuture;
use crate::domain::model::{Endpoint, Response};
use crate::domain::ports::{Call, CallAdapter, Converter};
use crate::utils::error::{CallError, Result};
use crate::utils::validation::validate_base_url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use url::Url;

pub const DEFAULT_DISPATCHER_THREADS: usize = 2;

/// Entry point: resolves endpoints against a base URL and produces calls or
/// futures for them. Cheap to clone.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: Url,
    http: reqwest::Client,
    dispatcher: Arc<Dispatcher>,
    adapters: FutureCallAdapterFactory,
}

impl RestClient {
    pub fn builder() -> RestClientBuilder {
        RestClientBuilder::default()
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .base_url(&config.client.base_url)
            .dispatcher_threads(config.dispatcher_threads());

        if let Some(user_agent) = &config.client.user_agent {
            builder = builder.user_agent(user_agent);
        }
        if let Some(timeouts) = &config.timeouts {
            if let Some(seconds) = timeouts.connect_seconds {
                builder = builder.connect_timeout(Duration::from_secs(seconds));
            }
            if let Some(seconds) = timeouts.request_seconds {
                builder = builder.request_timeout(Duration::from_secs(seconds));
            }
        }
        if let Some(headers) = &config.headers {
            for (name, value) in headers {
                builder = builder.default_header(name, value);
            }
        }

        builder.build()
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn adapter_factory(&self) -> &FutureCallAdapterFactory {
        &self.inner.adapters
    }

    /// Stops an owned dispatcher. Calls still in flight fail their futures
    /// with a `BrokenPipe` I/O error.
    pub fn shutdown(&self) {
        self.inner.dispatcher.shutdown();
    }

    /// A raw call for `endpoint`, not yet started.
    pub fn new_call<T, C>(&self, endpoint: &Endpoint, converter: C) -> Result<HttpCall<T>>
    where
        T: Send + 'static,
        C: Converter<T> + 'static,
    {
        let request = endpoint.to_request(&self.inner.base_url)?;
        Ok(HttpCall::new(
            self.inner.http.clone(),
            Arc::clone(&self.inner.dispatcher),
            request,
            Arc::new(converter),
        ))
    }

    /// Builds a call for `endpoint` and hands it to `adapter`.
    pub fn adapt<T, C, A>(&self, endpoint: &Endpoint, converter: C, adapter: &A) -> Result<A::Adapted>
    where
        T: Send + 'static,
        C: Converter<T> + 'static,
        A: CallAdapter<T>,
    {
        let call: Arc<dyn Call<T>> = Arc::new(self.new_call(endpoint, converter)?);
        Ok(adapter.adapt(call))
    }

    /// Future of the decoded body. Non-2xx responses fail it with an
    /// `HttpError`.
    pub fn body<T, C>(&self, endpoint: &Endpoint, converter: C) -> ListenableFuture<T>
    where
        T: Send + Sync + 'static,
        C: Converter<T> + 'static,
    {
        let adapter = self.inner.adapters.body_adapter();
        self.adapt(endpoint, converter, &adapter)
            .unwrap_or_else(ListenableFuture::failed)
    }

    /// Future of the full response, successful or not.
    pub fn response<T, C>(&self, endpoint: &Endpoint, converter: C) -> ListenableFuture<Response<T>>
    where
        T: Send + Sync + 'static,
        C: Converter<T> + 'static,
    {
        let adapter = self.inner.adapters.response_adapter();
        self.adapt(endpoint, converter, &adapter)
            .unwrap_or_else(ListenableFuture::failed)
    }
}

#[derive(Default)]
pub struct RestClientBuilder {
    base_url: Option<String>,
    connect_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    user_agent: Option<String>,
    default_headers: Vec<(String, String)>,
    dispatcher_threads: Option<usize>,
    dispatcher_handle: Option<Handle>,
}

impl RestClientBuilder {
    /// Must be http(s) and end in `/`.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn dispatcher_threads(mut self, threads: usize) -> Self {
        self.dispatcher_threads = Some(threads);
        self
    }

    /// Run calls on an existing multi-thread runtime instead of starting one.
    pub fn dispatcher_handle(mut self, handle: Handle) -> Self {
        self.dispatcher_handle = Some(handle);
        self
    }

    pub fn build(self) -> Result<RestClient> {
        let base_url = self.base_url.ok_or_else(|| CallError::MissingConfigError {
            field: "base_url".to_string(),
        })?;
        validate_base_url("base_url", &base_url)?;
        let base_url = Url::parse(&base_url)?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.default_headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| CallError::InvalidConfigValueError {
                    field: "headers".to_string(),
                    value: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                CallError::InvalidConfigValueError {
                    field: format!("headers.{}", name),
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?;
            headers.append(header_name, header_value);
        }

        let mut http = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = self.connect_timeout {
            http = http.connect_timeout(timeout);
        }
        if let Some(timeout) = self.request_timeout {
            http = http.timeout(timeout);
        }
        if let Some(user_agent) = &self.user_agent {
            http = http.user_agent(user_agent);
        }
        let http = http.build().map_err(|e| CallError::ConfigError {
            message: format!("failed to build HTTP client: {}", e),
        })?;

        let dispatcher = match self.dispatcher_handle {
            // A blocking get() on the runtime's only thread would never see
            // the call make progress.
            Some(handle) if handle.runtime_flavor() == RuntimeFlavor::CurrentThread => {
                return Err(CallError::DispatcherError(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "dispatcher_handle requires a multi-thread runtime",
                )));
            }
            Some(handle) => Dispatcher::from_handle(handle),
            None => Dispatcher::new(self.dispatcher_threads.unwrap_or(DEFAULT_DISPATCHER_THREADS))?,
        };

        tracing::debug!("Created client for {}", base_url);
        Ok(RestClient {
            inner: Arc::new(ClientInner {
                base_url,
                http,
                dispatcher: Arc::new(dispatcher),
                adapters: FutureCallAdapterFactory::create(),
            }),
        })
    }
}

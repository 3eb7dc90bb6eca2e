pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::CliArgs;
pub use crate::config::ClientConfig;

pub use crate::adapters::{
    converter::{BodyConverter, JsonConverter, StringConverter},
    http::HttpCall,
};
pub use crate::core::{
    call_adapter::{BodyCallAdapter, FutureCallAdapterFactory, ResponseCallAdapter},
    client::{RestClient, RestClientBuilder},
    listenable_future::{Completer, ListenableFuture, Outcome},
};
pub use crate::domain::model::{Endpoint, RawResponse, Request, RequestBody, Response, ResponseBody};
pub use crate::domain::ports::{Call, CallAdapter, Callback, Converter, RequestBodyConverter};
pub use crate::utils::error::{CallError, FutureError, HttpError, Result};

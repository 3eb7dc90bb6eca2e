pub mod call_adapter;
pub mod client;
pub mod dispatcher;
pub mod listenable_future;

pub use crate::domain::model::{Endpoint, Response};
pub use crate::domain::ports::{Call, CallAdapter, Callback, Converter};
pub use crate::utils::error::Result;

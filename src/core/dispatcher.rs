use crate::utils::error::{CallError, Result};
use std::future::Future;
use std::sync::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

/// Runtime on which calls execute and callbacks fire.
pub struct Dispatcher {
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
}

impl Dispatcher {
    /// Starts a dedicated multi-thread runtime with `worker_threads` workers.
    pub fn new(worker_threads: usize) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("call-dispatcher")
            .enable_all()
            .build()
            .map_err(CallError::DispatcherError)?;
        let handle = runtime.handle().clone();
        tracing::debug!("Started dispatcher with {} worker threads", worker_threads.max(1));
        Ok(Self {
            runtime: Mutex::new(Some(runtime)),
            handle,
        })
    }

    /// Runs calls on a runtime someone else owns.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            runtime: Mutex::new(None),
            handle,
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn owns_runtime(&self) -> bool {
        self.runtime.lock().map(|rt| rt.is_some()).unwrap_or(false)
    }

    /// Stops the owned runtime. Tasks still running on it are dropped, and
    /// anything spawned afterwards never runs. No-op on a borrowed runtime.
    pub fn shutdown(&self) {
        let runtime = self.runtime.lock().ok().and_then(|mut rt| rt.take());
        if let Some(runtime) = runtime {
            tracing::debug!("Shutting down dispatcher");
            runtime.shutdown_background();
        }
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Dropping a runtime from inside async code panics; shutting down in
        // the background does not.
        if let Some(runtime) = self.runtime.get_mut().ok().and_then(Option::take) {
            runtime.shutdown_background();
        }
    }
}

//! A future that can be waited on from blocking code, awaited from async
//! code, observed through listeners and cancelled from either side.
//!
//! `ListenableFuture` is the reading half; `Completer` is the single writer.
//! The first of `set`, `set_error`, `set_cancelled` or
//! `ListenableFuture::cancel` wins and every later attempt is rejected.

use crate::utils::error::{CallError, FutureError};
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

/// How a future ended.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    Failure(Arc<CallError>),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    pub fn to_result(&self) -> Result<T, FutureError>
    where
        T: Clone,
    {
        match self {
            Outcome::Success(value) => Ok(value.clone()),
            Outcome::Failure(error) => Err(FutureError::ExecutionError(Arc::clone(error))),
            Outcome::Cancelled => Err(FutureError::Cancelled),
        }
    }
}

type Listener<T> = Box<dyn FnOnce(&Outcome<T>) + Send>;
type CancelHook = Box<dyn FnOnce() + Send>;

struct State<T> {
    outcome: Option<Arc<Outcome<T>>>,
    listeners: Vec<Listener<T>>,
    wakers: Vec<Waker>,
    cancel_hook: Option<CancelHook>,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    done: Condvar,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // Listeners never run under the lock, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves to `outcome` unless already terminal. Returns whether it did.
    fn complete(&self, outcome: Outcome<T>) -> bool {
        let outcome = Arc::new(outcome);
        let (listeners, wakers, cancel_hook) = {
            let mut state = self.lock();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(Arc::clone(&outcome));
            let hook = state.cancel_hook.take();
            (
                std::mem::take(&mut state.listeners),
                std::mem::take(&mut state.wakers),
                hook,
            )
        };
        self.done.notify_all();

        for waker in wakers {
            waker.wake();
        }
        for listener in listeners {
            listener(&outcome);
        }
        drop(cancel_hook);
        true
    }
}

/// Reading half. Clones share the same outcome.
pub struct ListenableFuture<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ListenableFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for ListenableFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.shared.lock().outcome.as_deref() {
            None => "pending",
            Some(Outcome::Success(_)) => "success",
            Some(Outcome::Failure(_)) => "failure",
            Some(Outcome::Cancelled) => "cancelled",
        };
        f.debug_struct("ListenableFuture")
            .field("status", &status)
            .finish()
    }
}

impl<T> ListenableFuture<T> {
    /// A pending future and the handle that completes it.
    pub fn pending() -> (ListenableFuture<T>, Completer<T>) {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                outcome: None,
                listeners: Vec::new(),
                wakers: Vec::new(),
                cancel_hook: None,
            }),
            done: Condvar::new(),
        });
        (
            ListenableFuture {
                shared: Arc::clone(&shared),
            },
            Completer {
                shared,
                finished: false,
            },
        )
    }

    pub fn ready(value: T) -> Self {
        let (future, completer) = Self::pending();
        completer.set(value);
        future
    }

    pub fn failed(error: CallError) -> Self {
        let (future, completer) = Self::pending();
        completer.set_error(error);
        future
    }

    pub fn is_done(&self) -> bool {
        self.shared.lock().outcome.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared
            .lock()
            .outcome
            .as_deref()
            .is_some_and(Outcome::is_cancelled)
    }

    /// Cancels the future and runs its cancel hook.
    ///
    /// Returns `false` if the future had already completed.
    pub fn cancel(&self) -> bool {
        let hook = {
            let mut state = self.shared.lock();
            if state.outcome.is_some() {
                return false;
            }
            state.cancel_hook.take()
        };
        if !self.shared.complete(Outcome::Cancelled) {
            return false;
        }
        if let Some(hook) = hook {
            hook();
        }
        true
    }

    /// Registers `hook` to run when this future is cancelled through
    /// [`ListenableFuture::cancel`]. If it is already cancelled the hook runs
    /// right away; if it completed any other way the hook is dropped.
    pub fn on_cancel<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let cancelled = {
            let mut state = self.shared.lock();
            match state.outcome.as_deref() {
                None => {
                    state.cancel_hook = Some(Box::new(hook));
                    return;
                }
                Some(outcome) => outcome.is_cancelled(),
            }
        };
        if cancelled {
            hook();
        }
    }

    /// Runs `listener` once the future is done: on the completing thread, or
    /// immediately on this thread if it is already done.
    pub fn add_listener<F>(&self, listener: F)
    where
        F: FnOnce(&Outcome<T>) + Send + 'static,
    {
        let outcome = {
            let mut state = self.shared.lock();
            match &state.outcome {
                Some(outcome) => Arc::clone(outcome),
                None => {
                    state.listeners.push(Box::new(listener));
                    return;
                }
            }
        };
        listener(&outcome);
    }

    fn wait(&self, timeout: Option<Duration>) -> Option<Arc<Outcome<T>>> {
        let state = self.shared.lock();
        let state = match timeout {
            None => self
                .shared
                .done
                .wait_while(state, |s| s.outcome.is_none())
                .unwrap_or_else(PoisonError::into_inner),
            Some(timeout) => {
                self.shared
                    .done
                    .wait_timeout_while(state, timeout, |s| s.outcome.is_none())
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };
        state.outcome.clone()
    }
}

impl<T: Clone> ListenableFuture<T> {
    /// Blocks until the future is done.
    pub fn get(&self) -> Result<T, FutureError> {
        match self.wait(None) {
            Some(outcome) => outcome.to_result(),
            None => Err(FutureError::Cancelled),
        }
    }

    /// Blocks for at most `timeout`. Timing out leaves the future pending.
    pub fn get_timeout(&self, timeout: Duration) -> Result<T, FutureError> {
        match self.wait(Some(timeout)) {
            Some(outcome) => outcome.to_result(),
            None => Err(FutureError::Timeout(timeout)),
        }
    }
}

impl<T: Clone> Future for ListenableFuture<T> {
    type Output = Result<T, FutureError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.shared.lock();
        match &state.outcome {
            Some(outcome) => Poll::Ready(outcome.to_result()),
            None => {
                if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    state.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

/// Writing half of a [`ListenableFuture`].
///
/// Dropping a completer that never completed fails the future with an
/// `io::ErrorKind::BrokenPipe` error so no waiter hangs forever.
pub struct Completer<T> {
    shared: Arc<Shared<T>>,
    finished: bool,
}

impl<T> Completer<T> {
    pub fn set(mut self, value: T) -> bool {
        self.finish(Outcome::Success(value))
    }

    pub fn set_error(mut self, error: CallError) -> bool {
        self.finish(Outcome::Failure(Arc::new(error)))
    }

    /// Marks the future cancelled without running its cancel hook; used when
    /// the cancellation came from the work itself.
    pub fn set_cancelled(mut self) -> bool {
        self.finish(Outcome::Cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared
            .lock()
            .outcome
            .as_deref()
            .is_some_and(Outcome::is_cancelled)
    }

    fn finish(&mut self, outcome: Outcome<T>) -> bool {
        self.finished = true;
        self.shared.complete(outcome)
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if !self.finished {
            let error = io::Error::new(
                io::ErrorKind::BrokenPipe,
                "call was dropped before it completed",
            );
            self.shared
                .complete(Outcome::Failure(Arc::new(CallError::IoError(error))));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_get_blocks_until_set_from_other_thread() {
        let (future, completer) = ListenableFuture::pending();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            completer.set("Hi".to_string());
        });

        assert_eq!(future.get().unwrap(), "Hi");
        assert!(future.is_done());
        assert!(!future.is_cancelled());
        handle.join().unwrap();
    }

    #[test]
    fn test_failure_exposes_cause() {
        let future: ListenableFuture<String> = ListenableFuture::failed(CallError::Canceled);
        let err = future.get().unwrap_err();
        assert!(err.cause().unwrap().is_canceled());
    }

    #[test]
    fn test_only_first_completion_wins() {
        let (future, completer) = ListenableFuture::pending();
        assert!(completer.set(1));

        assert!(!future.cancel());
        assert_eq!(future.get().unwrap(), 1);
        assert!(!future.is_cancelled());
    }

    #[test]
    fn test_cancel_wins_over_later_set() {
        let (future, completer) = ListenableFuture::<u32>::pending();
        assert!(future.cancel());
        assert!(completer.is_cancelled());
        assert!(!completer.set(7));

        assert!(matches!(future.get(), Err(FutureError::Cancelled)));
    }

    #[test]
    fn test_cancel_runs_hook_once() {
        let (future, _completer) = ListenableFuture::<u32>::pending();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        future.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(future.cancel());
        assert!(!future.cancel());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_set_cancelled_skips_hook() {
        let (future, completer) = ListenableFuture::<u32>::pending();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        future.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(completer.set_cancelled());
        assert!(future.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_on_cancel_after_cancel_runs_immediately() {
        let (future, _completer) = ListenableFuture::<u32>::pending();
        future.cancel();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        future.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listeners_fire_once_before_and_after_completion() {
        let (future, completer) = ListenableFuture::pending();
        let seen = Arc::new(AtomicUsize::new(0));

        let early = Arc::clone(&seen);
        future.add_listener(move |outcome: &Outcome<u32>| {
            assert!(outcome.is_success());
            early.fetch_add(1, Ordering::SeqCst);
        });

        completer.set(5);
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        let late = Arc::clone(&seen);
        future.add_listener(move |outcome| {
            assert_eq!(outcome.to_result().unwrap(), 5);
            late.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_get_timeout_leaves_future_pending() {
        let (future, completer) = ListenableFuture::<u32>::pending();

        let err = future.get_timeout(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, FutureError::Timeout(_)));
        assert!(!future.is_done());

        completer.set(3);
        assert_eq!(future.get_timeout(Duration::from_millis(20)).unwrap(), 3);
    }

    #[test]
    fn test_dropped_completer_fails_future() {
        let (future, completer) = ListenableFuture::<u32>::pending();
        drop(completer);

        let err = future.get().unwrap_err();
        let io = err.cause().and_then(CallError::as_io).unwrap();
        assert_eq!(io.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_await_completes_from_other_thread() {
        let (future, completer) = ListenableFuture::pending();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            completer.set("done".to_string());
        });

        let value = tokio_test::block_on(future).unwrap();
        assert_eq!(value, "done");
        handle.join().unwrap();
    }

    #[test]
    fn test_clones_share_outcome() {
        let (future, completer) = ListenableFuture::pending();
        let other = future.clone();
        completer.set(9);
        assert_eq!(other.get().unwrap(), 9);
        assert_eq!(format!("{:?}", future), "ListenableFuture { status: \"success\" }");
    }
}

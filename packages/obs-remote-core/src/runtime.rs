//! Where the engine's connection task runs.
//!
//! [`RemoteClient::start_with`](crate::RemoteClient::start_with) hands its
//! lifecycle future to a [`TaskSpawner`]; [`TokioSpawner`] is the default
//! used by [`RemoteClient::start`](crate::RemoteClient::start).

use std::future::Future;

/// Runs the engine's connection lifecycle in the background.
///
/// The future must be driven to completion; it ends on its own once the
/// client's shutdown token is cancelled, so no join handle is returned.
pub trait TaskSpawner: Send + Sync {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Spawns onto the Tokio runtime that was current at construction.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}

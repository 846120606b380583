//! Request/response correlation.
//!
//! The [`Correlator`] assigns every outbound request the next id, keeps the
//! caller's callback until the matching reply arrives, and resolves every
//! outstanding callback with [`RemoteError::Cancelled`] when the connection
//! goes away. It never interprets reply status; error replies reach their
//! callback like any other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};

use crate::error::RemoteError;
use crate::protocol::{Reply, ReplyFrame, Request};

/// Callback receiving a request's reply, or the reason it will never arrive.
pub type ReplyCallback = Box<dyn FnOnce(Result<Reply, RemoteError>) + Send + 'static>;

/// An outstanding request.
struct PendingRequest {
    request_type: String,
    callback: ReplyCallback,
}

/// Matches inbound replies to the callers that sent the requests.
pub struct Correlator {
    /// Next id to assign; never reset, so ids strictly increase.
    next_id: AtomicU64,
    /// Outstanding requests keyed by id.
    pending: Mutex<HashMap<u64, PendingRequest>>,
    /// Outbound frame queue of the open socket, `None` while disconnected.
    ///
    /// `send` holds the read lock across id assignment, registration and
    /// enqueue; `detach` takes the write lock. A request is therefore either
    /// registered before `detach` returns (and caught by the following
    /// `cancel_all`) or rejected as not connected.
    outbound: RwLock<Option<mpsc::UnboundedSender<String>>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            outbound: RwLock::new(None),
        }
    }

    /// Routes subsequent requests to a freshly opened socket.
    pub fn attach(&self, outbound: mpsc::UnboundedSender<String>) {
        *self.outbound.write() = Some(outbound);
    }

    /// Stops accepting requests. Returns true if a socket was attached.
    pub fn detach(&self) -> bool {
        self.outbound.write().take().is_some()
    }

    /// True while a socket is attached.
    pub fn is_open(&self) -> bool {
        self.outbound.read().is_some()
    }

    /// Number of requests awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Sends `request`, registering `callback` (or a no-op) under a new id.
    ///
    /// Returns the assigned id, or `None` if the request was dropped because
    /// no socket is open. A dropped request consumes no id and its callback
    /// is resolved at once with [`RemoteError::NotConnected`].
    pub fn send(&self, request: Request, callback: Option<ReplyCallback>) -> Option<u64> {
        let callback = callback.unwrap_or_else(|| Box::new(|_| {}));

        let outbound = self.outbound.read();
        let Some(tx) = outbound.as_ref() else {
            drop(outbound);
            log::debug!(
                "[Correlator] Dropping {} (not connected)",
                request.request_type()
            );
            callback(Err(RemoteError::NotConnected));
            return None;
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = request.to_frame(id);
        self.pending.lock().insert(
            id,
            PendingRequest {
                request_type: request.request_type().to_string(),
                callback,
            },
        );

        if tx.send(frame).is_err() {
            drop(outbound);
            log::warn!(
                "[Correlator] Socket writer gone, failing {} #{}",
                request.request_type(),
                id
            );
            // Release the table before running the callback; it may send again.
            let pending = self.pending.lock().remove(&id);
            if let Some(pending) = pending {
                (pending.callback)(Err(RemoteError::Connection("socket writer closed".into())));
            }
            return None;
        }

        log::debug!("[Correlator] Sent {} #{}", request.request_type(), id);
        Some(id)
    }

    /// Sends `request` and invokes `f` with the reply.
    pub fn send_with<F>(&self, request: Request, f: F) -> Option<u64>
    where
        F: FnOnce(Result<Reply, RemoteError>) + Send + 'static,
    {
        self.send(request, Some(Box::new(f)))
    }

    /// Sends `request` and waits for its reply.
    ///
    /// Resolves with [`RemoteError::NotConnected`] if no socket is open and
    /// with [`RemoteError::Cancelled`] if the connection drops first. An
    /// error-status reply is returned as `Ok`; use [`Reply::into_result`].
    pub async fn request(&self, request: Request) -> Result<Reply, RemoteError> {
        let (tx, rx) = oneshot::channel();
        self.send_with(request, move |result| {
            let _ = tx.send(result);
        });
        rx.await
            .map_err(|_| RemoteError::Cancelled("reply channel dropped".into()))?
    }

    /// Delivers a reply frame to its callback.
    ///
    /// Returns false if no outstanding request has the frame's id; such frames
    /// are dropped without effect.
    pub fn resolve(&self, frame: ReplyFrame) -> bool {
        let Some(id) = frame.correlation_id() else {
            log::debug!(
                "[Correlator] Dropping reply with foreign id {:?}",
                frame.message_id
            );
            return false;
        };
        let Some(pending) = self.pending.lock().remove(&id) else {
            log::debug!("[Correlator] Dropping reply #{} (no pending request)", id);
            return false;
        };

        let reply = frame.into_reply(id, pending.request_type);
        if !reply.is_ok() {
            log::warn!(
                "[Correlator] {} #{} failed: {}",
                reply.request_type,
                id,
                reply.error.as_deref().unwrap_or("unknown error")
            );
        }
        (pending.callback)(Ok(reply));
        true
    }

    /// Resolves every outstanding request with [`RemoteError::Cancelled`].
    ///
    /// Returns the number of requests cancelled.
    pub fn cancel_all(&self, reason: &str) -> usize {
        let drained: Vec<(u64, PendingRequest)> = self.pending.lock().drain().collect();
        let count = drained.len();
        for (id, pending) in drained {
            log::debug!(
                "[Correlator] Cancelling {} #{}: {}",
                pending.request_type,
                id,
                reason
            );
            (pending.callback)(Err(RemoteError::Cancelled(reason.to_string())));
        }
        if count > 0 {
            log::info!("[Correlator] Cancelled {} pending request(s)", count);
        }
        count
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

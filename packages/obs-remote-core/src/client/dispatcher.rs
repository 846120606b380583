//! Routing of inbound frames.
//!
//! Replies go to the correlator. Pushes are reconciled into the mirror and
//! then announced, in wire order. A push whose reconciliation fails
//! invalidates the mirror and triggers a fresh bootstrap.

use super::{bootstrap, EngineDeps};
use crate::error::RemoteError;
use crate::events::{ConnectionEvent, UpdateEvent};
use crate::mirror::Reconciled;
use crate::protocol::{Frame, PushFrame, UpdateKind};
use crate::utils::now_millis;

/// What handling one inbound frame did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// A reply; `matched` is false if no pending request had its id.
    Reply { matched: bool },
    /// A recognized push, reconciled (or skipped) and announced.
    Update { kind: UpdateKind, outcome: Reconciled },
    /// A recognized push the mirror could not absorb; bootstrap was reissued.
    Desync { kind: UpdateKind },
    /// A push of a kind this client does not know.
    Ignored(String),
}

/// Handles one inbound text frame.
///
/// # Errors
///
/// Returns [`RemoteError::Protocol`] for frames that cannot be classified.
/// The caller logs and drops them; the connection stays up.
pub(crate) fn dispatch(deps: &EngineDeps, text: &str) -> Result<Dispatched, RemoteError> {
    match Frame::parse(text)? {
        Frame::Reply(reply) => Ok(Dispatched::Reply {
            matched: deps.correlator.resolve(reply),
        }),
        Frame::Push(push) => Ok(dispatch_push(deps, push)),
    }
}

fn dispatch_push(deps: &EngineDeps, push: PushFrame) -> Dispatched {
    let Some(kind) = push.update.kind() else {
        let update_type = push
            .payload
            .get("update-type")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        log::debug!("[Dispatcher] Ignoring unhandled push {}", update_type);
        return Dispatched::Ignored(update_type);
    };

    let outcome = if push.ok {
        deps.mirror.apply(&push.update)
    } else {
        log::warn!(
            "[Dispatcher] {} push carried error status; not reconciled",
            kind.update_type()
        );
        Ok(Reconciled::Unchanged)
    };

    deps.emitter.emit_update(UpdateEvent {
        kind,
        payload: push.payload,
        timestamp: now_millis(),
    });

    match outcome {
        Ok(Reconciled::SceneListRequested) => {
            log::debug!("[Dispatcher] Scene list changed without contents; re-requesting");
            bootstrap::request_scenes(deps);
            Dispatched::Update {
                kind,
                outcome: Reconciled::SceneListRequested,
            }
        }
        Ok(outcome) => Dispatched::Update { kind, outcome },
        Err(e) => {
            log::warn!("[Dispatcher] {} could not be reconciled: {}", kind.update_type(), e);
            bootstrap::request_all(deps);
            deps.emitter.emit_connection(ConnectionEvent::StateDesync {
                message: e.to_string(),
                timestamp: now_millis(),
            });
            Dispatched::Desync { kind }
        }
    }
}

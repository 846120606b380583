//! Authentication handshake.
//!
//! Runs once per opened socket: `GetAuthRequired`, then (if the server asks
//! for it) `Authenticate` with the challenge response, then Ready. Nothing
//! but handshake traffic is issued by the engine before Ready.

use serde::Deserialize;

use super::{bootstrap, EngineDeps};
use crate::error::RemoteError;
use crate::events::ConnectionEvent;
use crate::protocol::auth::{auth_response, AuthRequirement};
use crate::protocol::{requests, Reply};
use crate::state::ConnectionState;
use crate::utils::now_millis;

/// Issues the authentication query on a freshly opened socket.
pub(crate) fn start(deps: &EngineDeps) {
    *deps.auth_failure.lock() = None;
    deps.set_state(ConnectionState::Connected);
    let next = deps.clone();
    deps.correlator
        .send_with(requests::get_auth_required(), move |result| {
            on_auth_required(&next, result);
        });
}

fn on_auth_required(deps: &EngineDeps, result: Result<Reply, RemoteError>) {
    let reply = match result.and_then(Reply::into_result) {
        Ok(reply) => reply,
        Err(RemoteError::Cancelled(_)) | Err(RemoteError::NotConnected) => return,
        Err(e) => return fail(deps, format!("auth query failed: {e}")),
    };

    let requirement = match AuthRequirement::deserialize(&reply.payload) {
        Ok(requirement) => requirement,
        Err(e) => return fail(deps, format!("malformed auth query reply: {e}")),
    };
    if !requirement.auth_required {
        log::info!("[Handshake] No authentication required");
        return enter_ready(deps);
    }

    let (Some(salt), Some(challenge)) = (requirement.salt, requirement.challenge) else {
        return fail(deps, "server requires auth but sent no challenge".into());
    };
    let Some(password) = deps.password.read().clone() else {
        return fail(deps, "server requires a password but none is configured".into());
    };

    deps.set_state(ConnectionState::Authenticating);
    let auth = auth_response(&password, &salt, &challenge);
    let next = deps.clone();
    deps.correlator
        .send_with(requests::authenticate(&auth), move |result| {
            on_authenticated(&next, result);
        });
}

fn on_authenticated(deps: &EngineDeps, result: Result<Reply, RemoteError>) {
    match result.and_then(Reply::into_result) {
        Ok(_) => {
            log::info!("[Handshake] Authenticated");
            enter_ready(deps);
        }
        Err(RemoteError::Cancelled(_)) | Err(RemoteError::NotConnected) => {}
        Err(RemoteError::Request { message, .. }) => fail(deps, message),
        Err(e) => fail(deps, e.to_string()),
    }
}

/// Leaves the socket open in the non-ready state and reports the failure.
fn fail(deps: &EngineDeps, message: String) {
    log::warn!("[Handshake] {}", RemoteError::Authentication(message.clone()));
    *deps.auth_failure.lock() = Some(message.clone());
    deps.set_state(ConnectionState::Connected);
    deps.emitter
        .emit_connection(ConnectionEvent::AuthenticationFailed {
            message,
            timestamp: now_millis(),
        });
}

fn enter_ready(deps: &EngineDeps) {
    deps.set_state(ConnectionState::Ready);
    bootstrap::request_all(deps);
    deps.emitter.emit_connection(ConnectionEvent::Established {
        url: deps.url.to_string(),
        timestamp: now_millis(),
    });
}

//! Socket lifecycle.
//!
//! One task owns the websocket for the engine's whole life: it connects,
//! multiplexes the correlator's outbound queue with inbound frames, and on
//! any close or failure cancels pending requests and reconnects after a
//! fixed delay. Only the shutdown token ends the loop.

use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::{dispatcher, handshake, EngineDeps};
use crate::error::RemoteError;
use crate::events::ConnectionEvent;
use crate::protocol_constants::SUBPROTOCOL;
use crate::state::{Config, ConnectionState};
use crate::utils::now_millis;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long shutdown waits for the server to acknowledge the Close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Why a connected session ended.
enum SessionEnd {
    Shutdown,
    Closed,
    Failed(RemoteError),
}

/// Runs the connect/reconnect loop until `shutdown` is cancelled.
pub(crate) async fn run(deps: EngineDeps, config: Config, shutdown: CancellationToken) {
    let delay = Duration::from_millis(config.reconnect_delay_ms);

    loop {
        deps.set_state(ConnectionState::Connecting);
        log::info!("[Connection] Connecting to {}", deps.url);

        let opened = tokio::select! {
            _ = shutdown.cancelled() => break,
            opened = open(&deps.url) => opened,
        };

        match opened {
            Ok(ws) => {
                let end = run_session(&deps, ws, &shutdown).await;
                teardown(&deps, end, shutdown.is_cancelled());
            }
            Err(e) => {
                log::warn!("[Connection] Connect to {} failed: {}", deps.url, e);
                deps.set_state(ConnectionState::Disconnected);
                deps.emitter.emit_connection(ConnectionEvent::Error {
                    message: e.to_string(),
                    timestamp: now_millis(),
                });
            }
        }

        if shutdown.is_cancelled() {
            break;
        }
        log::info!("[Connection] Reconnecting in {}ms", delay.as_millis());
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    deps.set_state(ConnectionState::Disconnected);
    log::info!("[Connection] Stopped");
}

/// Opens the websocket, offering the remote-control sub-protocol.
async fn open(url: &str) -> Result<WsStream, RemoteError> {
    let mut request = url.into_client_request()?;
    request
        .headers_mut()
        .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));
    let (ws, _response) = connect_async(request).await?;
    Ok(ws)
}

/// Drives one open socket until it closes, fails, or shutdown is requested.
async fn run_session(
    deps: &EngineDeps,
    ws: WsStream,
    shutdown: &CancellationToken,
) -> SessionEnd {
    let (mut sink, mut stream) = ws.split();
    let (tx, mut outbound) = mpsc::unbounded_channel::<String>();

    deps.correlator.attach(tx);
    log::info!("[Connection] Connected to {}", deps.url);
    handshake::start(deps);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                close(deps, &mut sink, &mut stream, &mut outbound).await;
                return SessionEnd::Shutdown;
            }
            Some(frame) = outbound.recv() => {
                if let Err(e) = sink.send(Message::Text(frame.into())).await {
                    return SessionEnd::Failed(e.into());
                }
            }
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if let Err(e) = dispatcher::dispatch(deps, text.as_str()) {
                        log::warn!("[Connection] Dropping inbound frame: {}", e);
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    log::info!("[Connection] Server closed the socket: {:?}", frame);
                    return SessionEnd::Closed;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return SessionEnd::Failed(e.into()),
                None => return SessionEnd::Closed,
            }
        }
    }
}

/// Flushes queued requests, sends Close and waits for the server's Close.
///
/// Replies that arrive before the server's Close are still dispatched.
async fn close(
    deps: &EngineDeps,
    sink: &mut SplitSink<WsStream, Message>,
    stream: &mut SplitStream<WsStream>,
    outbound: &mut mpsc::UnboundedReceiver<String>,
) {
    while let Ok(frame) = outbound.try_recv() {
        if sink.send(Message::Text(frame.into())).await.is_err() {
            return;
        }
    }
    if let Err(e) = sink.send(Message::Close(None)).await {
        log::debug!("[Connection] Close frame not sent: {}", e);
        return;
    }

    let drained = tokio::time::timeout(CLOSE_TIMEOUT, async {
        while let Some(Ok(msg)) = stream.next().await {
            match msg {
                Message::Text(text) => {
                    if let Err(e) = dispatcher::dispatch(deps, text.as_str()) {
                        log::debug!("[Connection] Dropping frame during close: {}", e);
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    })
    .await;
    if drained.is_err() {
        log::warn!(
            "[Connection] Server did not acknowledge close within {}ms",
            CLOSE_TIMEOUT.as_millis()
        );
    }
}

/// Cancels everything tied to the closed socket and announces the close.
fn teardown(deps: &EngineDeps, end: SessionEnd, shutting_down: bool) {
    deps.correlator.detach();
    let cancelled = deps.correlator.cancel_all("connection closed");
    deps.set_state(ConnectionState::Disconnected);
    deps.mirror.invalidate();

    match end {
        SessionEnd::Failed(e) => {
            log::warn!("[Connection] Socket failed: {}", e);
            deps.emitter.emit_connection(ConnectionEvent::Error {
                message: e.to_string(),
                timestamp: now_millis(),
            });
        }
        SessionEnd::Closed | SessionEnd::Shutdown => {}
    }

    log::info!(
        "[Connection] Closed ({} pending request(s) cancelled)",
        cancelled
    );
    deps.emitter.emit_connection(ConnectionEvent::Closed {
        shutting_down,
        timestamp: now_millis(),
    });
}

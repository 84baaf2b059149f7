use crate::AppState;
use crate::storage::SessionRecord;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use viva_core::protocol::{Envelope, MessageType};

/// Answers longer than this are rejected outright to bound judge costs.
const MAX_ANSWER_LENGTH: usize = 2000;

/// Handles WebSocket upgrade requests.
///
/// This function is the entry point for interview connections. It accepts the
/// upgrade request and passes the connection to `handle_socket` for the
/// lifetime of the session.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    info!("WebSocket upgrade request received");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manages one interview connection end to end.
///
/// This task is the sole mutator of its session. Inbound messages are
/// processed strictly in arrival order: the next message is not read until
/// the state machine has fully handled the current one, so a session's event
/// queue is effectively depth-one. Outbound delivery runs on separate tasks
/// so questions and status notes flush while a judge call is still pending.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();

    // Writer task: owns the sink, serializes every outbound envelope.
    let (out_tx, mut out_rx) = mpsc::channel::<Envelope>(32);
    let writer = tokio::spawn(async move {
        while let Some(envelope) = out_rx.recv().await {
            let json = match serde_json::to_string(&envelope) {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to serialize outbound envelope: {e}");
                    continue;
                }
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                // Client disconnected.
                break;
            }
        }
    });

    let (session_id, session) = state.registry.create().await;
    info!(session_id = %session_id, "New interview session started");

    // Forwarder task: maps state-machine commands to protocol messages.
    let (command_tx, mut command_rx) = mpsc::channel(32);
    let forwarder = {
        let session_id = session_id.clone();
        let out_tx = out_tx.clone();
        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                if out_tx
                    .send(Envelope::from_command(&session_id, command))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        })
    };

    let _ = out_tx.send(Envelope::session_start(&session_id)).await;

    // Initial record, so even an immediately-dropped connection leaves a trace.
    persist(&state, &session_id).await;

    if let Err(e) = session.lock().await.begin(&command_tx).await {
        warn!(session_id = %session_id, "Failed to start session: {e:#}");
    }

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_client_message(&state, &session_id, text.as_str(), &out_tx, &command_tx)
                    .await;
                // Latest transcript survives an abrupt disconnect later on.
                persist(&state, &session_id).await;
                if session.lock().await.is_ended() {
                    info!(session_id = %session_id, "Interview session completed");
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                debug!(session_id = %session_id, "Client closed the connection");
                break;
            }
            Ok(_) => {} // Ping/pong/binary frames carry no protocol meaning.
            Err(e) => {
                debug!(session_id = %session_id, "WebSocket error: {e}");
                break;
            }
        }
    }

    // Teardown: best-effort persistence, then the session ceases to exist.
    persist(&state, &session_id).await;
    state.registry.remove(&session_id).await;
    info!(session_id = %session_id, "Session removed from registry");

    drop(command_tx);
    let _ = forwarder.await;
    drop(out_tx);
    let _ = writer.await;
}

/// Shape checks on a parsed inbound envelope: answer type, a session_id
/// claim, and content within the length cap. The cap counts characters, not
/// bytes, so multibyte scripts get the same budget as ASCII. Returns the
/// claimed session id, which the caller still has to match against its own.
fn check_answer_envelope(envelope: &Envelope) -> Result<&str, String> {
    if envelope.kind != MessageType::Answer {
        return Err(format!(
            "Unsupported message type: only answers are accepted, got {:?}",
            envelope.kind
        ));
    }

    let Some(claimed_id) = envelope.session_id.as_deref() else {
        return Err("Missing session_id on answer message.".to_string());
    };

    if envelope.content.chars().count() > MAX_ANSWER_LENGTH {
        return Err(format!(
            "Your answer is too long. Please keep it under {MAX_ANSWER_LENGTH} characters."
        ));
    }

    Ok(claimed_id)
}

/// Validates one inbound frame and, if it is a well-formed answer for a live
/// session, feeds it to the state machine. Malformed input only ever
/// produces an `error` message; it never mutates the session.
async fn handle_client_message(
    state: &Arc<AppState>,
    own_session_id: &str,
    raw: &str,
    out_tx: &mpsc::Sender<Envelope>,
    command_tx: &mpsc::Sender<viva_core::Command>,
) {
    let send_error = |text: String| async move {
        let _ = out_tx
            .send(Envelope::error(Some(own_session_id), text))
            .await;
    };

    let envelope: Envelope = match serde_json::from_str(raw) {
        Ok(envelope) => envelope,
        Err(e) => {
            debug!(session_id = %own_session_id, "Malformed client message: {e}");
            send_error("I couldn't read that message. Please send a JSON answer message.".to_string())
                .await;
            return;
        }
    };

    let claimed_id = match check_answer_envelope(&envelope) {
        Ok(claimed_id) => claimed_id,
        Err(text) => {
            send_error(text).await;
            return;
        }
    };

    // NotFound never creates a session; a foreign id is refused the same
    // way, since this handler only drives its own session.
    if claimed_id != own_session_id || state.registry.get(claimed_id).await.is_err() {
        send_error(format!("Unknown session: {claimed_id}")).await;
        return;
    }

    let session = match state.registry.get(own_session_id).await {
        Ok(session) => session,
        Err(_) => return,
    };
    let mut session = session.lock().await;
    if let Err(e) = session
        .process_answer(&state.judge, &envelope.content, command_tx)
        .await
    {
        warn!(session_id = %own_session_id, "State machine failed to process answer: {e:#}");
    }
}

/// Writes the current session record. Failures are logged, never surfaced:
/// persistence is best-effort while the session lives.
async fn persist(state: &Arc<AppState>, session_id: &str) {
    let Ok(session) = state.registry.get(session_id).await else {
        return;
    };
    let record = {
        let session = session.lock().await;
        SessionRecord::from_session(&session)
    };
    if let Err(e) = state.storage.save(&record).await {
        warn!(session_id = %session_id, "Failed to persist session record: {e:#}");
    }
}

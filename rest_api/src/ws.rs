// rest_api/src/ws.rs
//! Dashboard push channel. The server only sends; anything the client sends
//! other than a close frame is ignored.

use std::fmt::Display;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{Sink, SinkExt, Stream, StreamExt};
use lib::Notifier;
use tracing::{debug, info, warn};

use crate::AppState;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let notifier = state.app.notifier.clone();
    ws.on_upgrade(move |socket| run_session(socket, notifier))
}

async fn run_session(socket: WebSocket, notifier: Notifier) {
    let (sender, receiver) = socket.split();
    pump_events(sender, receiver, notifier).await;
}

/// Forwards notifier events to `sender` until the client closes, the socket
/// fails or the notifier drops the session.
async fn pump_events<S, R, E>(mut sender: S, mut receiver: R, notifier: Notifier)
where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let (session_id, mut events) = notifier.connect().await;
    info!(%session_id, "Dashboard session connected");

    let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);
    keepalive.tick().await;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(%session_id, error = %e, kind = event.kind(), "Failed to encode event");
                        continue;
                    }
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    debug!(%session_id, "Send failed, closing session");
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(%session_id, error = %e, "Socket error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
            _ = keepalive.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    notifier.disconnect(session_id).await;
    info!(%session_id, "Dashboard session closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::Arc;

    use futures::channel::mpsc;
    use lib::MediConnect;
    use models::medical::{NewAction, TransitionPolicy};
    use security::Argon2Digest;
    use serde_json::{json, Value};

    async fn wait_for_sessions(notifier: &Notifier, expected: usize) {
        for _ in 0..200 {
            if notifier.session_count().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session count never reached {}", expected);
    }

    #[tokio::test]
    async fn should_push_new_action_frames_until_close() {
        let app = MediConnect::temporary(Arc::new(Argon2Digest::with_params(8, 1, 1).unwrap()), TransitionPolicy::Strict)
            .unwrap();
        app.seed_demo_data().await.unwrap();

        let (frames_tx, mut frames_rx) = mpsc::unbounded::<Message>();
        let (client_tx, client_rx) = mpsc::unbounded::<Result<Message, Infallible>>();
        let session = tokio::spawn(pump_events(frames_tx, client_rx, app.notifier.clone()));
        wait_for_sessions(&app.notifier, 1).await;

        // Non-close client frames are ignored.
        client_tx.unbounded_send(Ok(Message::Text("hello".into()))).unwrap();

        let action: NewAction = serde_json::from_value(json!({
            "patientId": 1,
            "authorId": 2,
            "fromOrganizationId": 1,
            "type": "lab_test",
            "description": "CBC"
        }))
        .unwrap();
        let created = app.router.create_action(action).await.unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(2), frames_rx.next()).await.unwrap();
        let text = match frame {
            Some(Message::Text(text)) => text,
            other => panic!("expected a text frame, got {:?}", other),
        };
        let event: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(event["type"], "NEW_ACTION");
        assert_eq!(event["action"]["id"], created.id);

        client_tx.unbounded_send(Ok(Message::Close(None))).unwrap();
        tokio::time::timeout(Duration::from_secs(2), session).await.unwrap().unwrap();
        assert_eq!(app.notifier.session_count().await, 0);
    }

    #[tokio::test]
    async fn should_end_session_when_client_stream_ends() {
        let notifier = Notifier::new(4);
        let (frames_tx, _frames_rx) = mpsc::unbounded::<Message>();
        let (client_tx, client_rx) = mpsc::unbounded::<Result<Message, Infallible>>();
        let session = tokio::spawn(pump_events(frames_tx, client_rx, notifier.clone()));
        wait_for_sessions(&notifier, 1).await;

        drop(client_tx);
        tokio::time::timeout(Duration::from_secs(2), session).await.unwrap().unwrap();
        assert_eq!(notifier.session_count().await, 0);
    }
}

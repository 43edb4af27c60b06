// lib/src/notifier.rs

use std::collections::HashMap;
use std::sync::Arc;

use models::events::Event;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_SESSION_BUFFER: usize = 64;

/// Registry of connected dashboard sessions.
///
/// Each session owns a bounded channel. Broadcasting never waits on a
/// session: a full buffer drops the event for that session only, a closed
/// channel removes the session.
#[derive(Clone)]
pub struct Notifier {
    sessions: Arc<RwLock<HashMap<Uuid, mpsc::Sender<Event>>>>,
    buffer: usize,
}

impl Default for Notifier {
    fn default() -> Self {
        Notifier::new(DEFAULT_SESSION_BUFFER)
    }
}

impl Notifier {
    pub fn new(buffer: usize) -> Self {
        Notifier {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            buffer: buffer.max(1),
        }
    }

    /// Registers a session and returns its id and event stream.
    pub async fn connect(&self) -> (Uuid, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;
        sessions.insert(id, tx);
        info!(session = %id, sessions = sessions.len(), "Dashboard session connected");
        (id, rx)
    }

    pub async fn disconnect(&self, id: Uuid) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(&id).is_some() {
            info!(session = %id, sessions = sessions.len(), "Dashboard session disconnected");
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Best-effort fan-out. Returns how many sessions accepted the event.
    pub async fn broadcast(&self, event: Event) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();
        {
            let sessions = self.sessions.read().await;
            for (id, tx) in sessions.iter() {
                match tx.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(session = %id, event = event.kind(), "Session buffer full, event dropped");
                    }
                    Err(TrySendError::Closed(_)) => dead.push(*id),
                }
            }
        }
        if !dead.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in &dead {
                sessions.remove(id);
                debug!(session = %id, "Removed closed session");
            }
        }
        debug!(event = event.kind(), delivered, "Event broadcast");
        delivered
    }
}

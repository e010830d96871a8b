/// Live chat socket registry
///
/// Each socket registers under `{task_id}:{user_id}` and gets an unbounded
/// outbound queue. Several sockets may share a key (two browser tabs), and
/// a push fans out to all of them. The [`ChatConnection`] handle is an RAII
/// guard: dropping it unregisters the socket and releases its slot in the
/// live connection count.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use taskafy_shared::models::message::Message;
use tokio::sync::mpsc;
use uuid::Uuid;

type Outbox = mpsc::UnboundedSender<String>;

/// Frames the server writes to chat sockets
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Echo to the sender once the message is stored
    MessageSent { message: Message },

    /// Push to the receiver
    NewMessage { message: Message },

    Error { message: String },

    Pong,
}

impl ServerFrame {
    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            message: message.into(),
        }
    }

    pub fn to_text(&self) -> String {
        // Frames hold only strings, UUIDs and timestamps
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"error"}"#.to_string())
    }
}

#[derive(Default)]
struct HubInner {
    sockets: Mutex<HashMap<String, HashMap<u64, Outbox>>>,
    next_id: AtomicU64,
    active: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct ChatHub {
    inner: Arc<HubInner>,
}

impl ChatHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(task_id: Uuid, user_id: Uuid) -> String {
        format!("{}:{}", task_id, user_id)
    }

    fn sockets(&self) -> MutexGuard<'_, HashMap<String, HashMap<u64, Outbox>>> {
        // Critical sections never panic midway; a poisoned map is still consistent
        self.inner.sockets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a socket and returns its handle and outbound queue
    pub fn register(&self, task_id: Uuid, user_id: Uuid) -> ChatConnection {
        let key = Self::key(task_id, user_id);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.sockets().entry(key.clone()).or_default().insert(id, tx.clone());
        let active = self.inner.active.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::debug!(%key, connection_id = id, active, "Chat socket registered");

        ChatConnection {
            hub: self.clone(),
            key,
            id,
            outbox: tx,
            inbox: Some(rx),
        }
    }

    fn unregister(&self, key: &str, id: u64) {
        let mut sockets = self.sockets();
        if let Some(entries) = sockets.get_mut(key) {
            entries.remove(&id);
            if entries.is_empty() {
                sockets.remove(key);
            }
        }
        drop(sockets);

        let active = self.inner.active.fetch_sub(1, Ordering::SeqCst) - 1;
        tracing::debug!(%key, connection_id = id, active, "Chat socket unregistered");
    }

    /// Sends a frame to every socket of `user_id` on `task_id`
    ///
    /// Returns how many sockets accepted it.
    pub fn send_to(&self, task_id: Uuid, user_id: Uuid, frame: &ServerFrame) -> usize {
        let key = Self::key(task_id, user_id);
        let sockets = self.sockets();

        let Some(entries) = sockets.get(&key) else {
            return 0;
        };

        let text = frame.to_text();
        entries
            .values()
            .filter(|outbox| outbox.send(text.clone()).is_ok())
            .count()
    }

    /// Number of open chat sockets
    pub fn active_connections(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }
}

/// Registration handle for one socket
pub struct ChatConnection {
    hub: ChatHub,
    key: String,
    id: u64,
    outbox: Outbox,
    inbox: Option<mpsc::UnboundedReceiver<String>>,
}

impl ChatConnection {
    /// Queues a frame on this socket only
    pub fn reply(&self, frame: &ServerFrame) {
        let _ = self.outbox.send(frame.to_text());
    }

    /// Takes the outbound queue for the socket writer
    pub fn take_inbox(&mut self) -> Option<mpsc::UnboundedReceiver<String>> {
        self.inbox.take()
    }
}

impl Drop for ChatConnection {
    fn drop(&mut self) {
        self.hub.unregister(&self.key, self.id);
    }
}

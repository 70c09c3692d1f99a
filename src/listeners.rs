//! Listener registry for connection events.
//!
//! Each registration returns a [`ListenerId`] that can later be passed to
//! [`SocketlinkClient::remove_listener`](crate::SocketlinkClient::remove_listener).
//! Any number of listeners may be registered per [`EventKind`]; they run in
//! registration order on the connection task, so they should return quickly.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::error;

use crate::error::SocketlinkError;
use crate::event::{EventKind, SocketlinkEvent};

/// Handle identifying one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type UnitFn = Arc<dyn Fn() + Send + Sync>;
type DataFn = Arc<dyn Fn(&Value) + Send + Sync>;
type DataRoomFn = Arc<dyn Fn(&Value, Option<&str>) + Send + Sync>;
type ErrorFn = Arc<dyn Fn(&SocketlinkError) + Send + Sync>;
type EventFn = Arc<dyn Fn(&SocketlinkEvent) + Send + Sync>;

/// A registered callback, tagged with the category it listens to.
#[derive(Clone)]
pub(crate) enum Listener {
    Open(UnitFn),
    Message(DataRoomFn),
    ServerBroadcast(DataFn),
    AdminBroadcast(DataRoomFn),
    Close(UnitFn),
    Error(ErrorFn),
    /// Receives every event.
    Any(EventFn),
}

impl Listener {
    /// `None` for catch-all listeners.
    fn kind(&self) -> Option<EventKind> {
        match self {
            Self::Open(_) => Some(EventKind::Open),
            Self::Message(_) => Some(EventKind::Message),
            Self::ServerBroadcast(_) => Some(EventKind::ServerBroadcast),
            Self::AdminBroadcast(_) => Some(EventKind::AdminBroadcast),
            Self::Close(_) => Some(EventKind::Close),
            Self::Error(_) => Some(EventKind::Error),
            Self::Any(_) => None,
        }
    }

    fn accepts(&self, kind: EventKind) -> bool {
        self.kind().is_none_or(|k| k == kind)
    }

    fn invoke(&self, event: &SocketlinkEvent) {
        match (self, event) {
            (Self::Any(f), _) => f(event),
            (Self::Open(f), SocketlinkEvent::Open) | (Self::Close(f), SocketlinkEvent::Close) => {
                f();
            }
            (Self::Message(f), SocketlinkEvent::Message { data, rid })
            | (Self::AdminBroadcast(f), SocketlinkEvent::AdminBroadcast { data, rid }) => {
                f(data, rid.as_deref());
            }
            (Self::ServerBroadcast(f), SocketlinkEvent::ServerBroadcast { data }) => f(data),
            (Self::Error(f), SocketlinkEvent::Error(err)) => f(err.as_ref()),
            _ => {}
        }
    }
}

/// Shared between the client handle (registration) and the connection task
/// (dispatch).
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    entries: Mutex<Vec<(ListenerId, Listener)>>,
}

impl ListenerRegistry {
    fn entries(&self) -> MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        // A panicking listener runs outside the lock, so poisoning only
        // happens if a registry operation itself panicked.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn register(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries().push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    /// Remove every listener of `kind`, or every listener when `None`.
    pub(crate) fn clear(&self, kind: Option<EventKind>) {
        let mut entries = self.entries();
        match kind {
            Some(kind) => entries.retain(|(_, l)| l.kind() != Some(kind)),
            None => entries.clear(),
        }
    }

    /// Invoke every listener interested in `event`. Returns how many ran.
    ///
    /// A panicking listener is logged and skipped; the remaining listeners
    /// still run and the connection task keeps going.
    pub(crate) fn dispatch(&self, event: &SocketlinkEvent) -> usize {
        let kind = event.kind();
        // Snapshot so listeners may (un)register without deadlocking.
        let targets: Vec<Listener> = self
            .entries()
            .iter()
            .filter(|(_, l)| l.accepts(kind))
            .map(|(_, l)| l.clone())
            .collect();

        for listener in &targets {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener.invoke(event))) {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_owned())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_owned());
                error!(kind = ?kind, %reason, "listener panicked");
            }
        }
        targets.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries().len()
    }
}

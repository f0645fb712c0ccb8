//! Connection registry: who is online, and how to reach them.
//!
//! Holds the `Identity -> ConnectionHandle` map and its inverse
//! `ConnectionId -> Identity` inside one mutex, so every operation reads and
//! writes both directions in the same critical section. The lock is never
//! held across an `.await`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use coachline_types::error::DeliveryError;
use coachline_types::message::{AckFrame, ChatFrame};
use coachline_types::user::Identity;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Process-unique id of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something the socket writer of a connection should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Relay a chat frame to the client.
    Chat(ChatFrame),
    /// Report the delivery outcome of a message this client sent.
    Ack(AckFrame),
    /// Send a close frame and stop writing.
    Close,
}

/// Write side of a live connection.
///
/// Wraps the sender half of the channel drained by the connection's socket
/// writer task. Once that task ends the channel closes and every further
/// write fails, which is how the relay observes a dead connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    /// Create a handle with a fresh id, returning the receiver the socket
    /// writer must drain.
    pub fn open() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: ConnectionId::new(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a chat frame for the client.
    pub fn send(&self, frame: ChatFrame) -> Result<(), DeliveryError> {
        self.tx
            .send(Outbound::Chat(frame))
            .map_err(|_| DeliveryError::ConnectionClosed)
    }

    /// Queue a delivery acknowledgement for the client.
    pub fn acknowledge(&self, ack: AckFrame) -> Result<(), DeliveryError> {
        self.tx
            .send(Outbound::Ack(ack))
            .map_err(|_| DeliveryError::ConnectionClosed)
    }

    /// Ask the writer to close the socket. No-op if it is already gone.
    pub fn close(&self) {
        let _ = self.tx.send(Outbound::Close);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Default)]
struct RegistryState {
    by_identity: HashMap<Identity, ConnectionHandle>,
    by_connection: HashMap<ConnectionId, Identity>,
}

impl RegistryState {
    fn remove_identity(&mut self, identity: &Identity) -> Option<ConnectionHandle> {
        let handle = self.by_identity.remove(identity)?;
        self.by_connection.remove(&handle.id);
        Some(handle)
    }
}

/// Bidirectional map between identities and their live connection.
///
/// At most one connection per identity. Built once at startup and shared by
/// `Arc` with every ingress reader and the dispatcher.
#[derive(Default)]
pub struct ConnectionRegistry {
    state: Mutex<RegistryState>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section leaves both maps consistent before it can
    // panic, so a poisoned lock still guards valid state.
    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Bind `identity` to `handle`.
    ///
    /// An existing binding for the identity is replaced and its handle
    /// returned. The registry does not close it.
    pub fn register(&self, identity: Identity, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let mut state = self.state();
        let superseded = state.remove_identity(&identity);

        // A handle belongs to exactly one identity.
        if let Some(previous_owner) = state.by_connection.get(&handle.id).cloned() {
            state.remove_identity(&previous_owner);
        }

        state.by_connection.insert(handle.id, identity.clone());
        state.by_identity.insert(identity.clone(), handle);
        drop(state);

        debug!(%identity, replaced = superseded.is_some(), "registered connection");
        superseded
    }

    /// Remove whatever binding `identity` has. Idempotent.
    pub fn unregister(&self, identity: &Identity) -> Option<ConnectionHandle> {
        let removed = self.state().remove_identity(identity);
        if removed.is_some() {
            debug!(%identity, "unregistered connection");
        }
        removed
    }

    /// Remove the binding only if `identity` is still bound to `connection`.
    ///
    /// A connection that was superseded by a newer login must not remove
    /// its successor. Returns `true` if a binding was removed.
    pub fn release(&self, identity: &Identity, connection: ConnectionId) -> bool {
        let mut state = self.state();
        let bound_here = state
            .by_identity
            .get(identity)
            .is_some_and(|handle| handle.id == connection);
        if bound_here {
            state.remove_identity(identity);
        }
        drop(state);

        if bound_here {
            debug!(%identity, %connection, "released connection");
        }
        bound_here
    }

    /// The live connection for `identity`, if any.
    pub fn lookup(&self, identity: &Identity) -> Option<ConnectionHandle> {
        self.state().by_identity.get(identity).cloned()
    }

    /// Reverse lookup from a connection to the identity bound to it.
    pub fn identity_of(&self, connection: ConnectionId) -> Option<Identity> {
        self.state().by_connection.get(&connection).cloned()
    }

    pub fn is_online(&self, identity: &Identity) -> bool {
        self.state().by_identity.contains_key(identity)
    }

    /// Snapshot of connected identities, sorted.
    pub fn online(&self) -> Vec<Identity> {
        let mut identities: Vec<Identity> = self.state().by_identity.keys().cloned().collect();
        identities.sort();
        identities
    }

    pub fn len(&self) -> usize {
        self.state().by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("ConnectionRegistry")
            .field("identities", &state.by_identity.len())
            .field("connections", &state.by_connection.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn alice() -> Identity {
        Identity::new("alice")
    }

    #[test]
    fn register_then_lookup_returns_same_connection() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = ConnectionHandle::open();
        let id = handle.id();

        assert!(registry.register(alice(), handle).is_none());

        let found = registry.lookup(&alice()).unwrap();
        assert_eq!(found.id(), id);
        assert_eq!(registry.identity_of(id), Some(alice()));
    }

    #[test]
    fn unregister_then_lookup_returns_absent() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = ConnectionHandle::open();
        let id = handle.id();
        registry.register(alice(), handle);

        assert!(registry.unregister(&alice()).is_some());
        assert!(registry.lookup(&alice()).is_none());
        assert!(registry.identity_of(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn unregister_unknown_identity_is_noop() {
        let registry = ConnectionRegistry::new();
        assert!(registry.unregister(&alice()).is_none());
        assert!(registry.unregister(&alice()).is_none());
    }

    #[test]
    fn register_same_identity_replaces_both_directions() {
        let registry = ConnectionRegistry::new();
        let (first, _rx1) = ConnectionHandle::open();
        let (second, _rx2) = ConnectionHandle::open();
        let first_id = first.id();
        let second_id = second.id();

        registry.register(alice(), first);
        let superseded = registry.register(alice(), second).unwrap();

        assert_eq!(superseded.id(), first_id);
        assert_eq!(registry.lookup(&alice()).unwrap().id(), second_id);
        assert!(registry.identity_of(first_id).is_none());
        assert_eq!(registry.identity_of(second_id), Some(alice()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_does_not_close_superseded_connection() {
        let registry = ConnectionRegistry::new();
        let (first, mut rx1) = ConnectionHandle::open();
        let (second, _rx2) = ConnectionHandle::open();

        registry.register(alice(), first);
        registry.register(alice(), second);

        assert!(rx1.try_recv().is_err());
    }

    #[test]
    fn release_ignores_superseded_connection() {
        let registry = ConnectionRegistry::new();
        let (first, _rx1) = ConnectionHandle::open();
        let (second, _rx2) = ConnectionHandle::open();
        let first_id = first.id();
        let second_id = second.id();

        registry.register(alice(), first);
        registry.register(alice(), second);

        assert!(!registry.release(&alice(), first_id));
        assert_eq!(registry.lookup(&alice()).unwrap().id(), second_id);

        assert!(registry.release(&alice(), second_id));
        assert!(registry.lookup(&alice()).is_none());
    }

    #[test]
    fn moving_a_handle_to_another_identity_keeps_maps_consistent() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = ConnectionHandle::open();
        let id = handle.id();

        registry.register(alice(), handle.clone());
        registry.register(Identity::new("bob"), handle);

        assert!(registry.lookup(&alice()).is_none());
        assert_eq!(registry.identity_of(id), Some(Identity::new("bob")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn handle_send_fails_after_writer_dropped() {
        let (handle, rx) = ConnectionHandle::open();
        drop(rx);

        assert!(handle.is_closed());
        let frame = ChatFrame {
            sender: "alice".to_string(),
            receiver: "bob".to_string(),
            content: "hi".to_string(),
        };
        assert!(matches!(
            handle.send(frame),
            Err(DeliveryError::ConnectionClosed)
        ));
    }

    #[test]
    fn online_lists_sorted_identities() {
        let registry = ConnectionRegistry::new();
        let mut writers = Vec::new();
        for name in ["carol", "alice", "bob"] {
            let (handle, rx) = ConnectionHandle::open();
            writers.push(rx);
            registry.register(Identity::new(name), handle);
        }
        let names: Vec<String> = registry.online().iter().map(|i| i.to_string()).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn debug_reports_counts_without_handles() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = ConnectionHandle::open();
        registry.register(alice(), handle);

        let rendered = format!("{registry:?}");
        assert_eq!(rendered, "ConnectionRegistry { identities: 1, connections: 1 }");
        assert!(!rendered.contains("alice"));
    }

    #[tokio::test]
    async fn concurrent_register_and_release_never_desynchronize() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut tasks = Vec::new();

        for i in 0..32 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let identity = Identity::new(format!("user-{}", i % 4));
                for _ in 0..50 {
                    let (handle, _rx) = ConnectionHandle::open();
                    let id = handle.id();
                    registry.register(identity.clone(), handle);
                    tokio::task::yield_now().await;
                    registry.release(&identity, id);
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        // Every remaining forward entry has a matching reverse entry.
        for identity in registry.online() {
            let handle = registry.lookup(&identity).unwrap();
            assert_eq!(registry.identity_of(handle.id()), Some(identity));
        }
    }
}

//! Real-time message relay.
//!
//! - `registry` -- `ConnectionRegistry`, the single source of truth for who is online
//! - `queue` -- the FIFO dispatch queue from readers to the dispatcher
//! - `ingress` -- `IngressReader`, one per live connection
//! - `dispatcher` -- `Dispatcher`, the sole consumer: resolve, persist, deliver
//! - `delivery` -- the live delivery step and its acknowledging decorator
//!
//! [`Relay`] is the handle the transport layer holds: it opens connections
//! (registering them) and builds their readers. It is created once at
//! startup and cloned into every request handler.

pub mod delivery;
pub mod dispatcher;
pub mod ingress;
pub mod queue;
pub mod registry;

use std::sync::Arc;

use coachline_types::config::RelaySettings;
use coachline_types::user::Identity;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::repository::{IdentityDirectory, MessageStore};

pub use delivery::{AcknowledgingDelivery, DeliveryStep, DirectDelivery, configured_delivery};
pub use dispatcher::{DispatchReport, Dispatcher};
pub use ingress::{InboundFrame, IngressExit, IngressReader};
pub use queue::{DispatchReceiver, DispatchSender, dispatch_queue};
pub use registry::{ConnectionHandle, ConnectionId, ConnectionRegistry, Outbound};

/// Errors from opening a relay connection.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No resolved identity: the connection must not be registered.
    #[error("connection has no resolved identity")]
    Unidentified,
}

/// A connection that has been registered with the relay.
///
/// The transport drains `outbound` into the socket and feeds inbound frames
/// to the reader from [`Relay::reader`].
#[derive(Debug)]
pub struct RelayConnection {
    pub identity: Identity,
    pub handle: ConnectionHandle,
    pub outbound: mpsc::UnboundedReceiver<Outbound>,
}

/// Shared handle to the running relay.
#[derive(Debug, Clone)]
pub struct Relay {
    registry: Arc<ConnectionRegistry>,
    queue: DispatchSender,
    max_content_bytes: usize,
}

impl Relay {
    /// Build a relay from its parts. The caller runs the dispatcher.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        queue: DispatchSender,
        settings: &RelaySettings,
    ) -> Self {
        Self {
            registry,
            queue,
            max_content_bytes: settings.max_content_bytes,
        }
    }

    /// Create the registry and queue, spawn the dispatcher, return the handle.
    ///
    /// The dispatcher task ends once every clone of the returned relay (and
    /// every reader it produced) has been dropped.
    pub fn start<D, S, L>(
        directory: D,
        store: S,
        delivery: L,
        settings: &RelaySettings,
    ) -> (Self, JoinHandle<()>)
    where
        D: IdentityDirectory + 'static,
        S: MessageStore + 'static,
        L: DeliveryStep + 'static,
    {
        let registry = Arc::new(ConnectionRegistry::new());
        let (tx, rx) = dispatch_queue();
        let dispatcher = Dispatcher::new(directory, store, delivery, Arc::clone(&registry));
        let task = tokio::spawn(dispatcher.run(rx));
        info!(max_content_bytes = settings.max_content_bytes, "relay started");
        (Self::new(registry, tx, settings), task)
    }

    /// Like [`Relay::start`], with the delivery step picked by
    /// `settings.acknowledge_delivery`.
    pub fn start_configured<D, S>(
        directory: D,
        store: S,
        settings: &RelaySettings,
    ) -> (Self, JoinHandle<()>)
    where
        D: IdentityDirectory + 'static,
        S: MessageStore + 'static,
    {
        info!(
            acknowledge_delivery = settings.acknowledge_delivery,
            "configuring delivery"
        );
        Self::start(
            directory,
            store,
            configured_delivery(settings.acknowledge_delivery),
            settings,
        )
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Check that `identity` may open a connection, without registering it.
    ///
    /// Transports call this before accepting the upgrade and [`Relay::connect`]
    /// only once the upgrade has completed.
    pub fn admit(&self, identity: &Identity) -> Result<(), RelayError> {
        if identity.is_empty() {
            return Err(RelayError::Unidentified);
        }
        Ok(())
    }

    /// Register a new connection for `identity`.
    ///
    /// A previous connection for the same identity is kicked: it is removed
    /// from the registry and told to close.
    pub fn connect(&self, identity: Identity) -> Result<RelayConnection, RelayError> {
        self.admit(&identity)?;

        let (handle, outbound) = ConnectionHandle::open();
        if let Some(previous) = self.registry.register(identity.clone(), handle.clone()) {
            info!(%identity, connection_id = %previous.id(), "closing superseded connection");
            previous.close();
        }

        info!(%identity, connection_id = %handle.id(), "connection opened");
        Ok(RelayConnection {
            identity,
            handle,
            outbound,
        })
    }

    /// Build the ingress reader for a registered connection.
    pub fn reader(&self, connection: &RelayConnection) -> IngressReader {
        IngressReader::new(
            connection.identity.clone(),
            connection.handle.id(),
            self.queue.clone(),
            Arc::clone(&self.registry),
            self.max_content_bytes,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryDirectory, MemoryMessageStore};
    use coachline_types::message::{AckFrame, ChatFrame, DeliveryOutcome};
    use futures_util::stream;
    use std::time::Duration;

    type FrameTx = mpsc::UnboundedSender<Result<InboundFrame, String>>;

    fn start_relay() -> (Relay, JoinHandle<()>, MemoryMessageStore) {
        let directory = MemoryDirectory::with_users(&["a", "b", "c"]);
        let store = MemoryMessageStore::new(directory.clone());
        let (relay, task) = Relay::start(
            directory,
            store.clone(),
            DirectDelivery,
            &RelaySettings::default(),
        );
        (relay, task, store)
    }

    /// Connect `name` and spawn its reader over an in-memory frame stream.
    fn open(
        relay: &Relay,
        name: &str,
    ) -> (
        FrameTx,
        mpsc::UnboundedReceiver<Outbound>,
        JoinHandle<IngressExit>,
    ) {
        let connection = relay.connect(Identity::new(name)).unwrap();
        let reader = relay.reader(&connection);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let frames = stream::poll_fn(move |cx| rx.poll_recv(cx));
        let task = tokio::spawn(reader.run(frames));
        (tx, connection.outbound, task)
    }

    fn send(tx: &FrameTx, receiver: &str, content: &str) {
        let raw = serde_json::json!({"receiver": receiver, "content": content}).to_string();
        tx.send(Ok(InboundFrame::Text(raw))).unwrap();
    }

    async fn wait_for_records(store: &MemoryMessageStore, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while store.records().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("messages were not persisted in time");
    }

    #[tokio::test]
    async fn admit_checks_identity_without_registering() {
        let (relay, _task, _store) = start_relay();
        let first = relay.connect(Identity::new("a")).unwrap();
        let mut first_out = first.outbound;

        relay.admit(&Identity::new("a")).unwrap();
        assert!(matches!(
            relay.admit(&Identity::new("")),
            Err(RelayError::Unidentified)
        ));

        assert!(first_out.try_recv().is_err());
        assert_eq!(relay.registry().len(), 1);
        assert_eq!(
            relay.registry().lookup(&Identity::new("a")).unwrap().id(),
            first.handle.id()
        );
    }

    #[tokio::test]
    async fn configured_relay_acknowledges_when_enabled() {
        let directory = MemoryDirectory::with_users(&["a", "b"]);
        let store = MemoryMessageStore::new(directory.clone());
        let settings = RelaySettings {
            acknowledge_delivery: true,
            ..RelaySettings::default()
        };
        let (relay, _task) = Relay::start_configured(directory, store, &settings);
        let (a_tx, mut a_out, _a_task) = open(&relay, "a");

        send(&a_tx, "b", "anyone home?");

        let ack = tokio::time::timeout(Duration::from_secs(5), a_out.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            ack,
            Outbound::Ack(AckFrame {
                receiver: "b".to_string(),
                outcome: DeliveryOutcome::Offline,
            })
        );
    }

    #[tokio::test]
    async fn configured_relay_without_acks_stays_silent() {
        let directory = MemoryDirectory::with_users(&["a", "b"]);
        let store = MemoryMessageStore::new(directory.clone());
        let (relay, _task) =
            Relay::start_configured(directory, store.clone(), &RelaySettings::default());
        let (a_tx, mut a_out, _a_task) = open(&relay, "a");

        send(&a_tx, "b", "anyone home?");
        wait_for_records(&store, 1).await;

        assert!(a_out.try_recv().is_err());
    }

    #[tokio::test]
    async fn connect_without_identity_is_refused() {
        let (relay, _task, _store) = start_relay();
        let err = relay.connect(Identity::new("")).unwrap_err();
        assert!(matches!(err, RelayError::Unidentified));
        assert!(relay.registry().is_empty());
    }

    #[tokio::test]
    async fn a_sends_hello_to_connected_b() {
        let (relay, _task, store) = start_relay();
        let (a_tx, _a_out, _a_task) = open(&relay, "a");
        let (_b_tx, mut b_out, _b_task) = open(&relay, "b");

        send(&a_tx, "b", "hello");

        let frame = tokio::time::timeout(Duration::from_secs(5), b_out.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            frame,
            Outbound::Chat(ChatFrame {
                sender: "a".to_string(),
                receiver: "b".to_string(),
                content: "hello".to_string(),
            })
        );

        wait_for_records(&store, 1).await;
        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sender, "a");
        assert_eq!(records[0].receiver, "b");
        assert_eq!(records[0].content, "hello");
        assert!(b_out.try_recv().is_err());
    }

    #[tokio::test]
    async fn a_sends_to_offline_c() {
        let (relay, _task, store) = start_relay();
        let (a_tx, mut a_out, _a_task) = open(&relay, "a");
        let (_b_tx, mut b_out, _b_task) = open(&relay, "b");

        send(&a_tx, "c", "see you tomorrow");
        wait_for_records(&store, 1).await;

        assert_eq!(store.records()[0].receiver, "c");
        assert!(a_out.try_recv().is_err());
        assert!(b_out.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_connection_is_unregistered_and_later_messages_only_persist() {
        let (relay, _task, store) = start_relay();
        let (a_tx, _a_out, a_task) = open(&relay, "a");
        let (b_tx, _b_out, _b_task) = open(&relay, "b");

        a_tx.send(Err("connection reset by peer".to_string())).unwrap();
        let exit = a_task.await.unwrap();
        assert!(matches!(exit, IngressExit::Transport(_)));
        assert!(!relay.registry().is_online(&Identity::new("a")));

        send(&b_tx, "a", "did you drop?");
        wait_for_records(&store, 1).await;
        assert_eq!(store.records()[0].receiver, "a");
        assert!(!relay.registry().is_online(&Identity::new("a")));
    }

    #[tokio::test]
    async fn second_login_kicks_first_connection() {
        let (relay, _task, _store) = start_relay();
        let first = relay.connect(Identity::new("a")).unwrap();
        let mut first_out = first.outbound;
        let second = relay.connect(Identity::new("a")).unwrap();

        assert_eq!(first_out.recv().await, Some(Outbound::Close));
        assert_eq!(
            relay.registry().lookup(&Identity::new("a")).unwrap().id(),
            second.handle.id()
        );
    }

    #[tokio::test]
    async fn per_sender_order_is_preserved_end_to_end() {
        let (relay, _task, store) = start_relay();
        let (a_tx, _a_out, _a_task) = open(&relay, "a");
        let (c_tx, _c_out, _c_task) = open(&relay, "c");

        for i in 0..50 {
            send(&a_tx, "b", &format!("a-{i}"));
            send(&c_tx, "b", &format!("c-{i}"));
        }
        wait_for_records(&store, 100).await;

        let from_a: Vec<String> = store
            .records()
            .into_iter()
            .filter(|r| r.sender == "a")
            .map(|r| r.content)
            .collect();
        let expected: Vec<String> = (0..50).map(|i| format!("a-{i}")).collect();
        assert_eq!(from_a, expected);
    }

    #[tokio::test]
    async fn dispatcher_stops_when_relay_and_readers_are_gone() {
        let (relay, task, _store) = start_relay();
        let (a_tx, _a_out, a_task) = open(&relay, "a");
        drop(a_tx);
        a_task.await.unwrap();
        drop(relay);

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}

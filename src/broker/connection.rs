// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! One logical handle to a single broker replica.
//!
//! A connection keeps a per-subject buffer of delivered, not-yet-acknowledged
//! messages. The delivery path appends into the buffer (deduplicating
//! against sequences that were already acknowledged); repositories read the
//! buffer with `fetch_buffered` and commit with `acknowledge`. Each subject
//! has its own lock, so concurrent readers never contend across subjects
//! and only the append handler serializes against them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::broker::{BrokerLink, SubjectSettings};
use crate::errors::BrokerError;
use crate::observability::messages::broker::{ConnectionOpened, SubscriptionRejected};
use crate::observability::messages::StructuredLog;

/// Lifecycle state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never opened.
    Inactive,
    /// The last open attempt failed.
    ConnectionFailed,
    /// Open, but no subject subscription could be established.
    NothingToRead,
    /// Open and reading from at least one subject.
    Reading,
    /// Closed.
    Disconnected,
}

/// Broker-native handle to one buffered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHandle {
    pub sequence: u64,
    pub payload: Vec<u8>,
}

#[derive(Default)]
struct SubjectBuffer {
    /// Delivered, not yet acknowledged, keyed by per-subject sequence.
    pending: HashMap<u64, MessageHandle>,
    /// Sequences already acknowledged; redeliveries of these are dropped.
    processed: HashSet<u64>,
}

struct SubjectState {
    settings: SubjectSettings,
    buffer: RwLock<SubjectBuffer>,
    /// Failure recorded when the durable subscription could not be
    /// established at open time.
    subscribe_error: RwLock<Option<String>>,
}

/// One logical handle to a single broker replica.
pub struct Connection {
    url: String,
    client: String,
    cluster: String,
    link: Arc<dyn BrokerLink>,
    state: RwLock<ConnectionState>,
    subjects: HashMap<String, SubjectState>,
}

impl Connection {
    /// Create a connection with its subjects pre-declared. The connection
    /// is [`ConnectionState::Inactive`] until [`open`](Connection::open).
    pub fn new(
        url: impl Into<String>,
        client: impl Into<String>,
        cluster: impl Into<String>,
        subjects: HashMap<String, SubjectSettings>,
        link: Arc<dyn BrokerLink>,
    ) -> Self {
        let subjects = subjects
            .into_iter()
            .map(|(subject, settings)| {
                (
                    subject,
                    SubjectState {
                        settings,
                        buffer: RwLock::new(SubjectBuffer::default()),
                        subscribe_error: RwLock::new(None),
                    },
                )
            })
            .collect();

        Self {
            url: url.into(),
            client: client.into(),
            cluster: cluster.into(),
            link,
            state: RwLock::new(ConnectionState::Inactive),
            subjects,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn client(&self) -> &str {
        &self.client
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Open the connection: establish the durable subscription for every
    /// declared subject and transition to `Reading` (or `NothingToRead`
    /// when every subscription was rejected).
    ///
    /// Opening from a state other than `Inactive`, `ConnectionFailed` or
    /// `Disconnected` is logged and ignored.
    pub async fn open(&self) {
        let mut state = self.state.write().await;
        match *state {
            ConnectionState::Inactive
            | ConnectionState::ConnectionFailed
            | ConnectionState::Disconnected => {}
            current => {
                tracing::error!(url = %self.url, state = ?current, "cannot open connection");
                return;
            }
        }

        let mut active = 0usize;
        for (subject, decl) in &self.subjects {
            let rejection = Self::check_subscribable(&decl.settings);
            if let Some(reason) = &rejection {
                SubscriptionRejected {
                    subject,
                    url: &self.url,
                    reason,
                }
                .log();
            } else {
                active += 1;
            }
            *decl.subscribe_error.write().await = rejection;
        }

        if active == 0 {
            tracing::error!(url = %self.url, "nothing to read from broker");
            *state = ConnectionState::NothingToRead;
        } else {
            ConnectionOpened {
                url: &self.url,
                subject_count: active,
            }
            .log();
            *state = ConnectionState::Reading;
        }
    }

    /// Close the connection and drop all buffered state.
    pub async fn close(&self) {
        let mut state = self.state.write().await;
        for decl in self.subjects.values() {
            let mut buffer = decl.buffer.write().await;
            *buffer = SubjectBuffer::default();
            *decl.subscribe_error.write().await = None;
        }
        *state = ConnectionState::Disconnected;
    }

    /// The durable cursor requires a name, and the fetch/acknowledge cycle
    /// only works when the broker leaves acking to us.
    fn check_subscribable(settings: &SubjectSettings) -> Option<String> {
        if settings.durable_name.is_empty() {
            return Some("durable name is required".to_string());
        }
        if !settings.manual_ack {
            return Some("manual ack mode is required for buffered consumption".to_string());
        }
        None
    }

    /// Delivery path for one arriving message: the subscription handler.
    ///
    /// Messages for undeclared subjects are dropped, as are redeliveries of
    /// sequences that were already acknowledged.
    pub async fn deliver(&self, subject: &str, sequence: u64, payload: Vec<u8>) {
        let Some(decl) = self.subjects.get(subject) else {
            return;
        };

        let mut buffer = decl.buffer.write().await;
        if buffer.processed.contains(&sequence) {
            return;
        }
        buffer
            .pending
            .insert(sequence, MessageHandle { sequence, payload });
    }

    /// Snapshot of all buffered, not-yet-acknowledged messages for a
    /// subject, keyed by native sequence.
    ///
    /// An undeclared subject or one whose subscription was rejected is an
    /// error; a connection that is simply not `Reading` yields an empty
    /// result.
    pub async fn fetch_buffered(
        &self,
        subject: &str,
    ) -> Result<HashMap<u64, MessageHandle>, BrokerError> {
        let decl = self
            .subjects
            .get(subject)
            .ok_or_else(|| BrokerError::UnknownSubject {
                subject: subject.to_string(),
                url: self.url.clone(),
            })?;

        if let Some(reason) = decl.subscribe_error.read().await.as_ref() {
            return Err(BrokerError::SubscriptionFailed {
                subject: subject.to_string(),
                url: self.url.clone(),
                reason: reason.clone(),
            });
        }

        if *self.state.read().await != ConnectionState::Reading {
            return Ok(HashMap::new());
        }

        let buffer = decl.buffer.read().await;
        Ok(buffer.pending.clone())
    }

    /// Acknowledge a set of buffered messages on the wire.
    ///
    /// Each successfully acked sequence leaves the pending buffer and joins
    /// the processed set; a sequence whose wire ack is rejected stays
    /// pending (and therefore redeliverable). The last rejection, if any,
    /// is returned after the whole set has been attempted.
    pub async fn acknowledge(
        &self,
        subject: &str,
        handles: &HashMap<u64, MessageHandle>,
    ) -> Result<(), BrokerError> {
        let decl = self
            .subjects
            .get(subject)
            .ok_or_else(|| BrokerError::UnknownSubject {
                subject: subject.to_string(),
                url: self.url.clone(),
            })?;

        let mut buffer = decl.buffer.write().await;
        let mut last_error = None;

        for sequence in handles.keys() {
            match self.link.ack(subject, *sequence).await {
                Ok(()) => {
                    buffer.pending.remove(sequence);
                    buffer.processed.insert(*sequence);
                }
                Err(err) => last_error = Some(err),
            }
        }

        match last_error {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Publish one message body to a subject.
    ///
    /// Publishing does not require the subject to be declared; downstream
    /// subjects are written to, never subscribed.
    pub async fn publish(&self, subject: &str, body: &[u8]) -> Result<(), BrokerError> {
        let state = *self.state.read().await;
        if !matches!(
            state,
            ConnectionState::NothingToRead | ConnectionState::Reading
        ) {
            return Err(BrokerError::BadState {
                url: self.url.clone(),
                state,
                operation: "publish",
            });
        }

        self.link.publish(subject, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::InProcessLink;

    fn test_connection(link: Arc<InProcessLink>) -> Connection {
        let subjects = HashMap::from([(
            "orders.new".to_string(),
            SubjectSettings::durable("orders-cursor"),
        )]);
        Connection::new("nats://replica-0:4222", "client-0", "test-cluster", subjects, link)
    }

    #[tokio::test]
    async fn test_open_transitions_to_reading() {
        let conn = test_connection(InProcessLink::shared());
        assert_eq!(conn.state().await, ConnectionState::Inactive);

        conn.open().await;
        assert_eq!(conn.state().await, ConnectionState::Reading);
    }

    #[tokio::test]
    async fn test_open_without_manual_ack_yields_nothing_to_read() {
        let mut settings = SubjectSettings::durable("orders-cursor");
        settings.manual_ack = false;
        let subjects = HashMap::from([("orders.new".to_string(), settings)]);
        let conn = Connection::new(
            "nats://replica-0:4222",
            "client-0",
            "test-cluster",
            subjects,
            InProcessLink::shared(),
        );

        conn.open().await;
        assert_eq!(conn.state().await, ConnectionState::NothingToRead);
        assert!(matches!(
            conn.fetch_buffered("orders.new").await,
            Err(BrokerError::SubscriptionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_before_open_is_empty() {
        let conn = test_connection(InProcessLink::shared());
        conn.deliver("orders.new", 1, b"{}".to_vec()).await;

        let msgs = conn.fetch_buffered("orders.new").await.unwrap();
        assert!(msgs.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_unknown_subject_fails() {
        let conn = test_connection(InProcessLink::shared());
        conn.open().await;

        assert!(matches!(
            conn.fetch_buffered("payments.settled").await,
            Err(BrokerError::UnknownSubject { .. })
        ));
    }

    #[tokio::test]
    async fn test_deliver_then_fetch_round_trip() {
        let conn = test_connection(InProcessLink::shared());
        conn.open().await;
        conn.deliver("orders.new", 1, b"one".to_vec()).await;
        conn.deliver("orders.new", 2, b"two".to_vec()).await;

        let msgs = conn.fetch_buffered("orders.new").await.unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs.get(&1).unwrap().payload, b"one");
        assert_eq!(msgs.get(&2).unwrap().payload, b"two");
    }

    #[tokio::test]
    async fn test_acknowledge_removes_from_pending_and_dedupes_redelivery() {
        let link = InProcessLink::shared();
        let conn = test_connection(Arc::clone(&link));
        conn.open().await;
        conn.deliver("orders.new", 1, b"one".to_vec()).await;
        conn.deliver("orders.new", 2, b"two".to_vec()).await;

        let msgs = conn.fetch_buffered("orders.new").await.unwrap();
        let to_ack: HashMap<u64, MessageHandle> =
            msgs.iter().filter(|(seq, _)| **seq == 1).map(|(s, h)| (*s, h.clone())).collect();
        conn.acknowledge("orders.new", &to_ack).await.unwrap();

        assert_eq!(link.acked(), vec![("orders.new".to_string(), 1)]);

        // Sequence 1 is gone from the buffer, and a broker redelivery of it
        // is dropped
        conn.deliver("orders.new", 1, b"one".to_vec()).await;
        let msgs = conn.fetch_buffered("orders.new").await.unwrap();
        assert_eq!(msgs.len(), 1);
        assert!(msgs.contains_key(&2));
    }

    #[tokio::test]
    async fn test_rejected_ack_keeps_message_pending() {
        let link = InProcessLink::shared();
        let conn = test_connection(Arc::clone(&link));
        conn.open().await;
        conn.deliver("orders.new", 1, b"one".to_vec()).await;

        link.fail_acks("broker unavailable");
        let msgs = conn.fetch_buffered("orders.new").await.unwrap();
        assert!(conn.acknowledge("orders.new", &msgs).await.is_err());

        // Still redeliverable
        let msgs = conn.fetch_buffered("orders.new").await.unwrap();
        assert!(msgs.contains_key(&1));
    }

    #[tokio::test]
    async fn test_publish_requires_open_connection() {
        let link = InProcessLink::shared();
        let conn = test_connection(Arc::clone(&link));

        assert!(matches!(
            conn.publish("orders.adapted", b"[]").await,
            Err(BrokerError::BadState { .. })
        ));

        conn.open().await;
        conn.publish("orders.adapted", b"[]").await.unwrap();
        assert_eq!(
            link.published(),
            vec![("orders.adapted".to_string(), b"[]".to_vec())]
        );
    }
}

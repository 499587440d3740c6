// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Repository over a set of redundant broker connections.
//!
//! Every replica numbers its own sequences independently, so identifiers
//! from different connections are remapped to composite
//! `(connection, sequence)` ids before merging. Reads prefer availability
//! over completeness: a connection failure is logged and skipped as long as
//! any other connection produced data.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::batch::{MessageId, TaskBatch};
use crate::broker::{Connection, MessageHandle};
use crate::errors::ProcessingError;
use crate::observability::messages::broker::{
    ConnectionReadFailed, UnparsableIdentifier, UnresolvableSequence,
};
use crate::observability::messages::StructuredLog;
use crate::traits::EventRepository;

/// Repository fanning reads and acknowledgements out across every
/// connection in the set.
pub struct ClusteredRepository {
    connections: Vec<Arc<Connection>>,
    /// Event stream name -> wire subject.
    streams: HashMap<String, String>,
}

impl ClusteredRepository {
    pub fn new(connections: Vec<Arc<Connection>>, streams: HashMap<String, String>) -> Self {
        Self {
            connections,
            streams,
        }
    }

    fn subject_for(&self, batch: &TaskBatch) -> Result<String, ProcessingError> {
        self.streams
            .get(batch.name())
            .cloned()
            .ok_or_else(|| ProcessingError::UnknownQueue {
                stream: batch.name().to_string(),
                scope: "clustered repository".to_string(),
            })
    }
}

#[async_trait]
impl EventRepository for ClusteredRepository {
    /// Fetch from every connection concurrently and merge under composite
    /// identifiers.
    ///
    /// Fails only when every connection errored and nothing was merged;
    /// otherwise partial data is returned and the individual failures are
    /// logged.
    async fn fetch_new(
        &self,
        batch: &mut TaskBatch,
        _consumer_name: &str,
    ) -> Result<(), ProcessingError> {
        let subject = self.subject_for(batch)?;

        let mut readers = Vec::with_capacity(self.connections.len());
        for (index, connection) in self.connections.iter().enumerate() {
            let connection = Arc::clone(connection);
            let subject = subject.clone();
            readers.push(tokio::spawn(async move {
                let result = connection.fetch_buffered(&subject).await;
                (index, connection.url().to_string(), result)
            }));
        }

        let mut merged: HashMap<MessageId, Vec<u8>> = HashMap::new();
        let mut last_error = None;

        for reader in readers {
            match reader.await {
                Ok((index, _, Ok(messages))) => {
                    for (sequence, handle) in messages {
                        merged.insert(MessageId::replica(index, sequence), handle.payload);
                    }
                }
                Ok((_, url, Err(source))) => {
                    ConnectionReadFailed {
                        url: &url,
                        error: &source,
                    }
                    .log();
                    last_error = Some(ProcessingError::Fetch { url, source });
                }
                Err(join_error) => {
                    tracing::error!(error = %join_error, "clustered fetch worker lost");
                }
            }
        }

        if merged.is_empty() {
            if let Some(err) = last_error {
                return Err(err);
            }
        }

        batch.allocate(merged.len());
        batch.write_events_from_iter(merged);

        Ok(())
    }

    /// Group the batch's non-failed identifiers by connection and
    /// acknowledge each group concurrently on its own connection.
    ///
    /// Identifiers that cannot be resolved (no composite parts, an index
    /// outside the set, or a sequence no longer buffered) are logged and
    /// skipped; they never fail the call. Connections with nothing resolved
    /// are skipped entirely.
    async fn confirm_ack(
        &self,
        batch: &TaskBatch,
        _consumer_name: &str,
    ) -> Result<(), ProcessingError> {
        let subject = self.subject_for(batch)?;

        let mut by_connection: HashMap<usize, Vec<u64>> = HashMap::new();
        for (id, outcome) in batch.ack_result() {
            if outcome.is_some() {
                continue;
            }
            match id.replica_parts() {
                Some((connection, sequence)) => {
                    by_connection.entry(connection).or_default().push(sequence);
                }
                None => {
                    let rendered = id.to_string();
                    tracing::error!("{}", UnparsableIdentifier { id: &rendered });
                }
            }
        }

        if by_connection.is_empty() {
            return Ok(());
        }

        let mut ackers = Vec::with_capacity(by_connection.len());
        for (index, sequences) in by_connection {
            let Some(connection) = self.connections.get(index) else {
                tracing::error!(connection = index, "no such connection in the set");
                continue;
            };
            let connection = Arc::clone(connection);
            let subject = subject.clone();

            ackers.push(tokio::spawn(async move {
                let messages = match connection.fetch_buffered(&subject).await {
                    Ok(messages) => messages,
                    Err(err) => {
                        ConnectionReadFailed {
                            url: connection.url(),
                            error: &err,
                        }
                        .log();
                        return;
                    }
                };

                let mut resolved: HashMap<u64, MessageHandle> =
                    HashMap::with_capacity(sequences.len());
                for sequence in sequences {
                    match messages.get(&sequence) {
                        Some(handle) => {
                            resolved.insert(sequence, handle.clone());
                        }
                        None => tracing::error!(
                            "{}",
                            UnresolvableSequence {
                                connection: index,
                                sequence,
                            }
                        ),
                    }
                }

                if resolved.is_empty() {
                    return;
                }

                if let Err(err) = connection.acknowledge(&subject, &resolved).await {
                    tracing::error!(url = connection.url(), error = %err, "clustered ack failed");
                }
            }));
        }

        for acker in ackers {
            if let Err(join_error) = acker.await {
                tracing::error!(error = %join_error, "clustered ack worker lost");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::DeliveryFailure;
    use crate::broker::{InProcessLink, SubjectSettings};

    fn connection(url: &str, link: Arc<InProcessLink>) -> Arc<Connection> {
        let subjects = HashMap::from([(
            "orders.new".to_string(),
            SubjectSettings::durable("orders-cursor"),
        )]);
        Arc::new(Connection::new(url, "client-0", "test-cluster", subjects, link))
    }

    fn streams() -> HashMap<String, String> {
        HashMap::from([("orders".to_string(), "orders.new".to_string())])
    }

    /// Three replicas, each with its own recording link.
    async fn cluster(
        seed: &[&[u64]],
    ) -> (ClusteredRepository, Vec<Arc<InProcessLink>>, Vec<Arc<Connection>>) {
        let mut links = Vec::new();
        let mut connections = Vec::new();
        for (index, sequences) in seed.iter().enumerate() {
            let link = InProcessLink::shared();
            let conn = connection(&format!("nats://replica-{}:4222", index), Arc::clone(&link));
            conn.open().await;
            for sequence in *sequences {
                conn.deliver("orders.new", *sequence, b"{}".to_vec()).await;
            }
            links.push(link);
            connections.push(conn);
        }
        (
            ClusteredRepository::new(connections.clone(), streams()),
            links,
            connections,
        )
    }

    #[tokio::test]
    async fn test_fetch_new_merges_with_composite_identifiers() {
        // Overlapping native sequences across replicas must not collide
        let (repo, _, _) = cluster(&[&[1, 2], &[1, 2, 3], &[2]]).await;
        let mut batch = TaskBatch::new("orders");

        repo.fetch_new(&mut batch, "worker").await.unwrap();

        assert_eq!(batch.len(), 6);
        assert!(batch.events().contains_key(&MessageId::replica(0, 2)));
        assert!(batch.events().contains_key(&MessageId::replica(1, 2)));
        assert!(batch.events().contains_key(&MessageId::replica(2, 2)));
        assert!(batch.ack_result().values().all(Option::is_none));
    }

    #[tokio::test]
    async fn test_fetch_new_partial_failure_returns_surviving_union() {
        let (_, _, connections) = cluster(&[&[1], &[5, 6], &[9]]).await;
        // Break replica 1's subscription by reopening it without manual ack
        connections[1].close().await;
        let mut settings = SubjectSettings::durable("orders-cursor");
        settings.manual_ack = false;
        let broken = Arc::new(Connection::new(
            "nats://replica-1:4222",
            "client-0",
            "test-cluster",
            HashMap::from([("orders.new".to_string(), settings)]),
            InProcessLink::shared(),
        ));
        broken.open().await;
        let repo = ClusteredRepository::new(
            vec![
                Arc::clone(&connections[0]),
                broken,
                Arc::clone(&connections[2]),
            ],
            streams(),
        );

        let mut batch = TaskBatch::new("orders");
        repo.fetch_new(&mut batch, "worker").await.unwrap();

        // Exactly the union of the healthy replicas
        assert_eq!(batch.len(), 2);
        assert!(batch.events().contains_key(&MessageId::replica(0, 1)));
        assert!(batch.events().contains_key(&MessageId::replica(2, 9)));
    }

    #[tokio::test]
    async fn test_fetch_new_fails_only_when_every_connection_fails() {
        let mut settings = SubjectSettings::durable("orders-cursor");
        settings.manual_ack = false;
        let mut connections = Vec::new();
        for index in 0..2 {
            let conn = Arc::new(Connection::new(
                format!("nats://replica-{}:4222", index),
                "client-0",
                "test-cluster",
                HashMap::from([("orders.new".to_string(), settings.clone())]),
                InProcessLink::shared(),
            ));
            conn.open().await;
            connections.push(conn);
        }
        let repo = ClusteredRepository::new(connections, streams());

        let mut batch = TaskBatch::new("orders");
        assert!(matches!(
            repo.fetch_new(&mut batch, "worker").await,
            Err(ProcessingError::Fetch { .. })
        ));
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_confirm_ack_groups_by_connection_and_skips_failed() {
        let (repo, links, _) = cluster(&[&[1, 2], &[1]]).await;
        let mut batch = TaskBatch::new("orders");
        repo.fetch_new(&mut batch, "worker").await.unwrap();
        assert_eq!(batch.len(), 3);

        batch.set_failure(
            MessageId::replica(0, 2),
            DeliveryFailure::new("downstream rejected"),
        );
        repo.confirm_ack(&batch, "worker").await.unwrap();

        assert_eq!(links[0].acked(), vec![("orders.new".to_string(), 1)]);
        assert_eq!(links[1].acked(), vec![("orders.new".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_confirm_ack_with_nothing_to_ack_touches_no_connection() {
        let (repo, links, _) = cluster(&[&[1], &[2]]).await;
        let mut batch = TaskBatch::new("orders");
        repo.fetch_new(&mut batch, "worker").await.unwrap();
        batch.fail_all(DeliveryFailure::new("publish rejected"));

        repo.confirm_ack(&batch, "worker").await.unwrap();

        assert!(links[0].acked().is_empty());
        assert!(links[1].acked().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_ack_skips_unresolvable_sequences() {
        let (repo, links, connections) = cluster(&[&[1, 2]]).await;
        let mut batch = TaskBatch::new("orders");
        repo.fetch_new(&mut batch, "worker").await.unwrap();

        // Sequence 2 disappears from the buffer before acknowledgement
        let mut buffered = connections[0].fetch_buffered("orders.new").await.unwrap();
        let vanished = HashMap::from([(2u64, buffered.remove(&2).unwrap())]);
        connections[0]
            .acknowledge("orders.new", &vanished)
            .await
            .unwrap();

        repo.confirm_ack(&batch, "worker").await.unwrap();

        // Sequence 1 still acknowledged; the vanished sequence was skipped,
        // not fatal
        assert!(links[0].acked().contains(&("orders.new".to_string(), 1)));
    }
}

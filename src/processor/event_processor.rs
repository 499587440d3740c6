// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! One fetch -> adapt -> consume -> acknowledge pass for a named event stream.
//!
//! The pass is a strict state machine:
//!
//! ```text
//! Fetching -> (empty: Done) -> Adapting -> Consuming -> Acknowledging -> Done
//! ```
//!
//! with a terminal `Failed` reachable from every stage. Stages never
//! reorder or pipeline: fetch strictly precedes adapt, adapt precedes
//! consume, consume precedes acknowledge. The whole pass runs under a
//! panic guard: a panicking stage is caught at the pass boundary, logged,
//! and converted into a normal error so the host process survives.

use std::collections::HashMap;
use std::sync::Arc;

use crate::batch::{MessageId, TaskBatch};
use crate::errors::ProcessingError;
use crate::observability::messages::processor::{PassFailed, PassPanicked, UnprocessedEvents};
use crate::processor::EventAdapter;
use crate::traits::{EventConsumer, EventRepository};

/// Orchestrates one pipeline pass for one named event stream, using one
/// repository and one consumer.
#[derive(Clone)]
pub struct EventProcessor {
    repository: Arc<dyn EventRepository>,
    consumer: Arc<dyn EventConsumer>,
    adapter: Option<EventAdapter>,
    stream: String,
}

impl EventProcessor {
    pub fn new(
        repository: Arc<dyn EventRepository>,
        consumer: Arc<dyn EventConsumer>,
        stream: impl Into<String>,
        adapter: Option<EventAdapter>,
    ) -> Self {
        Self {
            repository,
            consumer,
            adapter,
            stream: stream.into(),
        }
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Run one pass.
    ///
    /// With `log_unprocessed` set, identifiers that failed consumption are
    /// grouped by failure reason and summarized in the log before
    /// acknowledgement: one line per distinct reason, purely
    /// observational.
    pub async fn process(&self, log_unprocessed: bool) -> Result<(), ProcessingError> {
        let pass = self.clone();
        match tokio::spawn(async move { pass.run_pass(log_unprocessed).await }).await {
            Ok(result) => result,
            Err(join_error) => {
                let detail = if join_error.is_panic() {
                    let payload = join_error.into_panic();
                    if let Some(text) = payload.downcast_ref::<&'static str>() {
                        (*text).to_string()
                    } else if let Some(text) = payload.downcast_ref::<String>() {
                        text.clone()
                    } else {
                        "opaque panic payload".to_string()
                    }
                } else {
                    join_error.to_string()
                };
                tracing::error!(
                    "{}",
                    PassPanicked {
                        stream: &self.stream,
                        detail: &detail,
                    }
                );
                Err(ProcessingError::PassPanicked {
                    stream: self.stream.clone(),
                    detail,
                })
            }
        }
    }

    async fn run_pass(&self, log_unprocessed: bool) -> Result<(), ProcessingError> {
        let mut batch = TaskBatch::new(&self.stream);

        if let Err(err) = self.repository.fetch_new(&mut batch, self.consumer.name()).await {
            return Err(self.stage_failed(err));
        }

        if batch.is_empty() {
            return Ok(());
        }

        let adapter = match &self.adapter {
            Some(adapter) => adapter,
            None => {
                return Err(self.stage_failed(ProcessingError::NoAdapter {
                    stream: self.stream.clone(),
                }))
            }
        };
        if let Err(err) = adapter.apply(batch.events_mut()) {
            return Err(self.stage_failed(err));
        }

        if let Err(err) = self.consumer.consume(&mut batch).await {
            return Err(self.stage_failed(err));
        }

        if log_unprocessed {
            self.log_unprocessed_events(&batch);
        }

        if let Err(err) = self.repository.confirm_ack(&batch, self.consumer.name()).await {
            return Err(self.stage_failed(err));
        }

        Ok(())
    }

    fn stage_failed(&self, err: ProcessingError) -> ProcessingError {
        tracing::error!(
            "{}",
            PassFailed {
                stream: &self.stream,
                error: &err,
            }
        );
        err
    }

    fn log_unprocessed_events(&self, batch: &TaskBatch) {
        let mut grouped: HashMap<&str, Vec<MessageId>> = HashMap::new();
        for (id, outcome) in batch.ack_result() {
            if let Some(failure) = outcome {
                grouped.entry(failure.reason()).or_default().push(*id);
            }
        }

        for (reason, ids) in grouped {
            let rendered = ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            tracing::info!(
                "{}",
                UnprocessedEvents {
                    stream: &self.stream,
                    failure: reason,
                    ids: &rendered,
                    count: ids.len(),
                }
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct ProbeRepository {
        seed: Vec<(u64, Vec<u8>)>,
        fail_fetch: bool,
        fail_ack: bool,
        fetch_calls: AtomicUsize,
        ack_calls: AtomicUsize,
        acked_ids: Mutex<Vec<MessageId>>,
    }

    #[async_trait]
    impl EventRepository for ProbeRepository {
        async fn fetch_new(
            &self,
            batch: &mut TaskBatch,
            _consumer_name: &str,
        ) -> Result<(), ProcessingError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_fetch {
                return Err(ProcessingError::Fetch {
                    url: "nats://replica-0:4222".to_string(),
                    source: crate::errors::BrokerError::SubscriptionFailed {
                        subject: "orders.new".to_string(),
                        url: "nats://replica-0:4222".to_string(),
                        reason: "down".to_string(),
                    },
                });
            }
            batch.allocate(self.seed.len());
            for (sequence, payload) in &self.seed {
                batch.write_event(MessageId::Sequence(*sequence), payload.clone());
            }
            Ok(())
        }

        async fn confirm_ack(
            &self,
            batch: &TaskBatch,
            _consumer_name: &str,
        ) -> Result<(), ProcessingError> {
            self.ack_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_ack {
                return Err(ProcessingError::Ack {
                    url: "nats://replica-0:4222".to_string(),
                    source: crate::errors::BrokerError::AckRejected {
                        subject: "orders.new".to_string(),
                        sequence: 0,
                        reason: "down".to_string(),
                    },
                });
            }
            let mut acked = self.acked_ids.lock().unwrap();
            for (id, outcome) in batch.ack_result() {
                if outcome.is_none() {
                    acked.push(*id);
                }
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct ProbeConsumer {
        consume_calls: AtomicUsize,
        fail: bool,
        seen_payloads: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl EventConsumer for ProbeConsumer {
        async fn consume(&self, batch: &mut TaskBatch) -> Result<(), ProcessingError> {
            self.consume_calls.fetch_add(1, Ordering::SeqCst);
            let mut seen = self.seen_payloads.lock().unwrap();
            for payload in batch.events().values() {
                seen.push(payload.clone());
            }
            if self.fail {
                return Err(ProcessingError::Publish(
                    crate::errors::BrokerError::PublishRejected {
                        subject: "orders.adapted".to_string(),
                        reason: "down".to_string(),
                    },
                ));
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "probe"
        }
    }

    fn processor(
        repository: Arc<ProbeRepository>,
        consumer: Arc<ProbeConsumer>,
        adapter: Option<EventAdapter>,
    ) -> EventProcessor {
        EventProcessor::new(repository, consumer, "orders", adapter)
    }

    fn seeded(seed: &[(u64, &[u8])]) -> Arc<ProbeRepository> {
        Arc::new(ProbeRepository {
            seed: seed.iter().map(|(s, p)| (*s, p.to_vec())).collect(),
            ..ProbeRepository::default()
        })
    }

    #[tokio::test]
    async fn test_empty_fetch_short_circuits_to_done() {
        let repository = seeded(&[]);
        let consumer = Arc::new(ProbeConsumer::default());
        let processor = processor(
            Arc::clone(&repository),
            Arc::clone(&consumer),
            Some(EventAdapter::identity()),
        );

        processor.process(false).await.unwrap();

        assert_eq!(repository.fetch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(consumer.consume_calls.load(Ordering::SeqCst), 0);
        assert_eq!(repository.ack_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_adapter_fails_nonempty_pass() {
        let repository = seeded(&[(1, b"{}")]);
        let consumer = Arc::new(ProbeConsumer::default());
        let processor = processor(Arc::clone(&repository), Arc::clone(&consumer), None);

        assert!(matches!(
            processor.process(false).await,
            Err(ProcessingError::NoAdapter { .. })
        ));
        assert_eq!(consumer.consume_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_full_pass_runs_stages_in_order() {
        let repository = seeded(&[(1, b"one"), (2, b"two")]);
        let consumer = Arc::new(ProbeConsumer::default());
        let adapter = EventAdapter::per_message(|_, payload| {
            Ok(Some(payload.to_ascii_uppercase()))
        });
        let processor = processor(
            Arc::clone(&repository),
            Arc::clone(&consumer),
            Some(adapter),
        );

        processor.process(false).await.unwrap();

        // Consumer saw the adapted payloads, not the raw ones
        let mut seen = consumer.seen_payloads.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec![b"ONE".to_vec(), b"TWO".to_vec()]);

        // Everything was acknowledged
        let acked = repository.acked_ids.lock().unwrap();
        assert_eq!(acked.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_error_aborts_before_adapt() {
        let repository = Arc::new(ProbeRepository {
            fail_fetch: true,
            ..ProbeRepository::default()
        });
        let consumer = Arc::new(ProbeConsumer::default());
        let processor = processor(
            Arc::clone(&repository),
            Arc::clone(&consumer),
            Some(EventAdapter::identity()),
        );

        assert!(matches!(
            processor.process(false).await,
            Err(ProcessingError::Fetch { .. })
        ));
        assert_eq!(consumer.consume_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_adapter_error_aborts_before_consume() {
        let repository = seeded(&[(1, b"{}")]);
        let consumer = Arc::new(ProbeConsumer::default());
        let adapter = EventAdapter::new(|_| {
            Err(ProcessingError::Adapter {
                reason: "decode failed".to_string(),
            })
        });
        let processor = processor(
            Arc::clone(&repository),
            Arc::clone(&consumer),
            Some(adapter),
        );

        assert!(processor.process(false).await.is_err());
        assert_eq!(consumer.consume_calls.load(Ordering::SeqCst), 0);
        assert_eq!(repository.ack_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_consumer_error_aborts_before_ack() {
        let repository = seeded(&[(1, b"{}")]);
        let consumer = Arc::new(ProbeConsumer {
            fail: true,
            ..ProbeConsumer::default()
        });
        let processor = processor(
            Arc::clone(&repository),
            Arc::clone(&consumer),
            Some(EventAdapter::identity()),
        );

        assert!(matches!(
            processor.process(false).await,
            Err(ProcessingError::Publish(_))
        ));
        assert_eq!(repository.ack_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ack_error_propagates() {
        let repository = Arc::new(ProbeRepository {
            seed: vec![(1, b"{}".to_vec())],
            fail_ack: true,
            ..ProbeRepository::default()
        });
        let consumer = Arc::new(ProbeConsumer::default());
        let processor = processor(
            Arc::clone(&repository),
            Arc::clone(&consumer),
            Some(EventAdapter::identity()),
        );

        assert!(matches!(
            processor.process(false).await,
            Err(ProcessingError::Ack { .. })
        ));
        assert_eq!(consumer.consume_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_adapter_is_caught_at_the_pass_boundary() {
        let repository = seeded(&[(1, b"{}")]);
        let consumer = Arc::new(ProbeConsumer::default());
        let adapter = EventAdapter::new(|_| panic!("adapter exploded"));
        let processor = processor(
            Arc::clone(&repository),
            Arc::clone(&consumer),
            Some(adapter),
        );

        match processor.process(false).await {
            Err(ProcessingError::PassPanicked { stream, detail }) => {
                assert_eq!(stream, "orders");
                assert!(detail.contains("adapter exploded"));
            }
            other => panic!("expected PassPanicked, got {:?}", other.map(|_| ())),
        }
        // The pass failed but the process (and this test) survived
        assert_eq!(repository.ack_calls.load(Ordering::SeqCst), 0);
    }
}

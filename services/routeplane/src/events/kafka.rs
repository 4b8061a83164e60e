//! Kafka-backed event log.
//!
//! # Producer
//! Idempotent producer with `acks=all` and a bounded message timeout, so a
//! publish either lands replicated or fails within the deadline. librdkafka
//! performs the bounded transient retries internally; the guard therefore
//! runs a single attempt and only feeds the breaker.
//!
//! # Consumers
//! One consumer group per logical consumer, so every group sees every
//! event. Auto-commit is off: the offset is committed only after the handler
//! succeeds, which keeps delivery at-least-once across rebalances and
//! restarts. Undecodable payloads are committed and skipped so a poison
//! message cannot wedge the partition.
use super::{EventHandler, EventLogError, EventLogResult, EventPublisher};
use crate::config::KafkaConfig;
use crate::correlation;
use crate::model::RouteEvent;
use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use routeplane_resilience::{AdapterGuard, GuardError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub struct KafkaEventPublisher {
    producer: FutureProducer,
    topic: String,
    request_timeout: Duration,
    guard: AdapterGuard,
}

impl KafkaEventPublisher {
    pub fn new(config: &KafkaConfig, guard: AdapterGuard) -> anyhow::Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .set("retries", config.publish_retries.to_string())
            .set("message.timeout.ms", config.request_timeout_ms.to_string())
            .create()?;
        Ok(Self {
            producer,
            topic: config.topic.clone(),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            // librdkafka already retries; one attempt at this layer.
            guard: guard.with_max_attempts(1),
        })
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish(&self, event: &RouteEvent) -> EventLogResult<()> {
        let payload = serde_json::to_vec(event)?;
        let key = event.partition_key();
        let result = self
            .guard
            .execute(|| {
                let producer = self.producer.clone();
                let payload = payload.clone();
                let key = key.clone();
                async move {
                    let record = FutureRecord::to(&self.topic).key(&key).payload(&payload);
                    producer
                        .send(record, Timeout::After(self.request_timeout))
                        .await
                        .map(|_| ())
                        .map_err(|(err, _message)| {
                            EventLogError::Unavailable(err.to_string())
                        })
                }
            })
            .await;
        match result {
            Ok(()) => Ok(()),
            Err(GuardError::Rejected(rejection)) => Err(EventLogError::Shed(rejection)),
            Err(GuardError::Inner(err)) => Err(err),
        }
    }

    async fn health_check(&self) -> EventLogResult<()> {
        use rdkafka::producer::Producer;
        self.producer
            .client()
            .fetch_metadata(Some(&self.topic), Duration::from_secs(2))
            .map(|_| ())
            .map_err(|err| EventLogError::Unavailable(err.to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "kafka"
    }
}

/// Long-lived poll loop for one consumer group.
///
/// Runs until the shutdown channel flips to `true`. The correlation id from
/// each event is bound for the duration of its handler so consumer logs and
/// downstream writes line up with the originating request.
pub async fn run_consumer(
    config: &KafkaConfig,
    group_id: &str,
    handler: Arc<dyn EventHandler>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &config.brokers)
        .set("group.id", group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .create()?;
    consumer.subscribe(&[&config.topic])?;
    tracing::info!(
        consumer = handler.name(),
        group_id,
        topic = %config.topic,
        "consumer started"
    );

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            received = consumer.recv() => {
                let message = match received {
                    Ok(message) => message,
                    Err(err) => {
                        tracing::warn!(consumer = handler.name(), error = %err, "poll error");
                        tokio::time::sleep(Duration::from_millis(500)).await;
                        continue;
                    }
                };
                let event: RouteEvent = match message
                    .payload()
                    .ok_or_else(|| anyhow::anyhow!("empty payload"))
                    .and_then(|bytes| serde_json::from_slice(bytes).map_err(Into::into))
                {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(
                            consumer = handler.name(),
                            error = %err,
                            offset = message.offset(),
                            "skipping undecodable event"
                        );
                        let _ = consumer.commit_message(&message, CommitMode::Async);
                        continue;
                    }
                };

                let correlation_id = event
                    .correlation_id
                    .clone()
                    .unwrap_or_else(correlation::generate);
                let outcome =
                    correlation::scope(correlation_id, handler.handle(&event)).await;
                match outcome {
                    Ok(()) => {
                        metrics::counter!("routeplane_consumer_events_total",
                            "consumer" => handler.name(), "action" => event.action.as_str())
                        .increment(1);
                        if let Err(err) = consumer.commit_message(&message, CommitMode::Async) {
                            tracing::warn!(
                                consumer = handler.name(),
                                error = %err,
                                "offset commit failed"
                            );
                        }
                    }
                    Err(err) => {
                        // Offset stays uncommitted; the event is redelivered.
                        metrics::counter!("routeplane_consumer_failures_total",
                            "consumer" => handler.name())
                        .increment(1);
                        tracing::warn!(
                            consumer = handler.name(),
                            event_id = %event.event_id,
                            error = %err,
                            "handler failed, leaving offset uncommitted"
                        );
                    }
                }
            }
        }
    }

    tracing::info!(consumer = handler.name(), "consumer stopped");
    Ok(())
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message Bus Adapter (C4): four durable work queues plus two dead-letter
//! exchange/queue pairs (spec §4.4). Grounded on the teacher's NATS relay
//! (`transport/nats_relay.rs`, `nats_pub.rs`) for the publish/consume shape,
//! reimplemented over AMQP (`lapin`) since the spec calls for durable,
//! acknowledged work queues rather than NATS subject fan-out.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ExchangeKind};
use tokio::sync::mpsc;

use crate::error::EngineError;

pub const FRAME_ANALYSIS_QUEUE: &str = "frame.analysis";
pub const AUDIO_ANALYSIS_QUEUE: &str = "audio.analysis";
pub const BEHAVIOR_EVENTS_QUEUE: &str = "behavior.events";
pub const PROCTORING_RESULTS_QUEUE: &str = "proctoring.results";

const AI_DLX: &str = "ai.dlx";
const AI_DLQ: &str = "ai.dlq";
const PROCTORING_DLX: &str = "proctoring.dlx";
const PROCTORING_RESULTS_DLQ: &str = "proctoring.results.dlq";

/// A single delivered message with manual-ack control. Dropping a
/// `Delivery` without calling `ack`/`nack` leaves the broker's unacked
/// count pinned, so every consumer loop must settle it one way or another.
#[async_trait]
pub trait Delivery: Send {
    fn payload(&self) -> &[u8];
    async fn ack(self: Box<Self>) -> Result<(), EngineError>;
    /// `requeue = false` routes to the queue's dead-letter exchange, which
    /// is how malformed or unprocessable messages land in a DLQ instead of
    /// spinning forever.
    async fn nack(self: Box<Self>, requeue: bool) -> Result<(), EngineError>;
}

#[async_trait]
pub trait Bus: Send + Sync {
    /// Declare every queue, exchange, and dead-letter binding used by the
    /// proctoring pipeline. Idempotent; called once at startup.
    async fn bootstrap_topology(&self) -> Result<(), EngineError>;

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), EngineError>;

    /// Open a consumer with `prefetch = 1` so one slow message never starves
    /// the rest of the queue's fairness across workers.
    async fn consume(&self, queue: &str) -> Result<BoxStream<'static, Box<dyn Delivery>>, EngineError>;
}

/// Returns `(queue, dead_letter_exchange)` for every durable work queue, the
/// table the startup sequence walks to declare topology.
pub fn queue_topology() -> [(&'static str, &'static str); 4] {
    [
        (FRAME_ANALYSIS_QUEUE, AI_DLX),
        (AUDIO_ANALYSIS_QUEUE, AI_DLX),
        (BEHAVIOR_EVENTS_QUEUE, AI_DLX),
        (PROCTORING_RESULTS_QUEUE, PROCTORING_DLX),
    ]
}

pub struct AmqpBus {
    connection: Connection,
}

impl AmqpBus {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    async fn channel(&self) -> Result<Channel, EngineError> {
        self.connection
            .create_channel()
            .await
            .map_err(|e| EngineError::Bus(e.to_string()))
    }
}

#[async_trait]
impl Bus for AmqpBus {
    async fn bootstrap_topology(&self) -> Result<(), EngineError> {
        let channel = self.channel().await?;

        for dlx in [AI_DLX, PROCTORING_DLX] {
            channel
                .exchange_declare(
                    dlx,
                    ExchangeKind::Fanout,
                    ExchangeDeclareOptions { durable: true, ..Default::default() },
                    FieldTable::default(),
                )
                .await
                .map_err(|e| EngineError::Bus(e.to_string()))?;
        }

        channel
            .queue_declare(AI_DLQ, QueueDeclareOptions { durable: true, ..Default::default() }, FieldTable::default())
            .await
            .map_err(|e| EngineError::Bus(e.to_string()))?;
        channel
            .queue_bind(AI_DLQ, AI_DLX, "", QueueBindOptions::default(), FieldTable::default())
            .await
            .map_err(|e| EngineError::Bus(e.to_string()))?;

        channel
            .queue_declare(
                PROCTORING_RESULTS_DLQ,
                QueueDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await
            .map_err(|e| EngineError::Bus(e.to_string()))?;
        channel
            .queue_bind(PROCTORING_RESULTS_DLQ, PROCTORING_DLX, "", QueueBindOptions::default(), FieldTable::default())
            .await
            .map_err(|e| EngineError::Bus(e.to_string()))?;

        for (queue, dlx) in queue_topology() {
            let mut args = FieldTable::default();
            args.insert("x-dead-letter-exchange".into(), dlx.into());
            channel
                .queue_declare(queue, QueueDeclareOptions { durable: true, ..Default::default() }, args)
                .await
                .map_err(|e| EngineError::Bus(e.to_string()))?;
        }

        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), EngineError> {
        let channel = self.channel().await?;
        channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await
            .map_err(|e| EngineError::Bus(e.to_string()))?
            .await
            .map_err(|e| EngineError::Bus(e.to_string()))?;
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<BoxStream<'static, Box<dyn Delivery>>, EngineError> {
        let channel = self.channel().await?;
        channel
            .basic_qos(1, lapin::options::BasicQosOptions::default())
            .await
            .map_err(|e| EngineError::Bus(e.to_string()))?;
        let consumer = channel
            .basic_consume(
                queue,
                &format!("examcore-{queue}"),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| EngineError::Bus(e.to_string()))?;

        let stream = consumer.filter_map(|result| async move {
            match result {
                Ok(delivery) => Some(Box::new(AmqpDelivery { delivery }) as Box<dyn Delivery>),
                Err(_) => None,
            }
        });
        Ok(Box::pin(stream))
    }
}

struct AmqpDelivery {
    delivery: lapin::message::Delivery,
}

#[async_trait]
impl Delivery for AmqpDelivery {
    fn payload(&self) -> &[u8] {
        &self.delivery.data
    }

    async fn ack(self: Box<Self>) -> Result<(), EngineError> {
        self.delivery
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| EngineError::Bus(e.to_string()))
    }

    async fn nack(self: Box<Self>, requeue: bool) -> Result<(), EngineError> {
        self.delivery
            .nack(BasicNackOptions { requeue, ..Default::default() })
            .await
            .map_err(|e| EngineError::Bus(e.to_string()))
    }
}

/// In-process channel-backed fake used by ingestion/consumer tests so the
/// pipeline is exercisable without a live AMQP broker.
pub struct InMemoryBus {
    queues: std::sync::Mutex<std::collections::HashMap<String, Arc<mpsc::UnboundedSender<Vec<u8>>>>>,
    receivers: std::sync::Mutex<
        std::collections::HashMap<String, mpsc::UnboundedReceiver<Vec<u8>>>,
    >,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self { queues: Default::default(), receivers: Default::default() }
    }
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender_for(&self, queue: &str) -> Arc<mpsc::UnboundedSender<Vec<u8>>> {
        let mut queues = self.queues.lock().unwrap();
        if let Some(sender) = queues.get(queue) {
            return sender.clone();
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let tx = Arc::new(tx);
        queues.insert(queue.to_owned(), tx.clone());
        self.receivers.lock().unwrap().insert(queue.to_owned(), rx);
        tx
    }
}

struct InMemoryDelivery {
    payload: Vec<u8>,
}

#[async_trait]
impl Delivery for InMemoryDelivery {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn ack(self: Box<Self>) -> Result<(), EngineError> {
        Ok(())
    }

    async fn nack(self: Box<Self>, _requeue: bool) -> Result<(), EngineError> {
        Ok(())
    }
}

#[async_trait]
impl Bus for InMemoryBus {
    async fn bootstrap_topology(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), EngineError> {
        self.sender_for(queue)
            .send(payload.to_vec())
            .map_err(|e| EngineError::Bus(e.to_string()))
    }

    async fn consume(&self, queue: &str) -> Result<BoxStream<'static, Box<dyn Delivery>>, EngineError> {
        self.sender_for(queue);
        let rx = self
            .receivers
            .lock()
            .unwrap()
            .remove(queue)
            .ok_or_else(|| EngineError::Bus(format!("queue {queue} already has a consumer")))?;
        let stream = tokio_stream::wrappers::UnboundedReceiverStream::new(rx)
            .map(|payload| Box::new(InMemoryDelivery { payload }) as Box<dyn Delivery>);
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;

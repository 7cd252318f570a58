//! Managed connection to the event bus backing store with Sentinel
//! failover, a local buffer for degraded-mode publishes, and signed
//! pub/sub + stream operations.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use redis::aio::{ConnectionManager, PubSub};
use redis::AsyncCommands;
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

use crate::buffer::MessageBuffer;
use crate::envelope::{seal, verify};
use crate::error::BusError;
use crate::sentinel::{resolve_master, SentinelConfig};
use crate::state::ConnectionState;

pub struct EventBusConfig {
    pub sentinel: Option<SentinelConfig>,
    pub direct_url: Option<String>,
    pub engagement_id: String,
    pub engagement_key: Vec<u8>,
    pub buffer_max_count: usize,
    pub buffer_max_age: Duration,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

pub struct EventBus {
    config: EventBusConfig,
    state: RwLock<ConnectionState>,
    manager: RwLock<Option<ConnectionManager>>,
    buffer: tokio::sync::Mutex<MessageBuffer>,
}

/// A verified message delivered to a subscriber.
pub struct Delivery {
    pub channel: String,
    pub payload: Value,
}

pub struct Subscription {
    pub receiver: mpsc::Receiver<Delivery>,
    _task: tokio::task::JoinHandle<()>,
}

impl EventBus {
    pub fn new(config: EventBusConfig) -> Arc<Self> {
        let buffer = MessageBuffer::new(config.buffer_max_count, config.buffer_max_age);
        Arc::new(Self {
            config,
            state: RwLock::new(ConnectionState::Disconnected),
            manager: RwLock::new(None),
            buffer: tokio::sync::Mutex::new(buffer),
        })
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    async fn resolve_url(&self) -> Result<String, BusError> {
        if let Some(sentinel) = &self.config.sentinel {
            let (host, port) = resolve_master(sentinel).await?;
            Ok(format!("redis://{host}:{port}"))
        } else {
            Ok(self
                .config
                .direct_url
                .clone()
                .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()))
        }
    }

    /// Connect (or reconnect) to the resolved master, draining any
    /// buffered publishes in FIFO order once the connection is live.
    pub async fn connect(&self) -> Result<(), BusError> {
        *self.state.write().await = ConnectionState::Connecting;
        let url = self.resolve_url().await?;
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        *self.manager.write().await = Some(manager);
        *self.state.write().await = ConnectionState::Connected;
        info!("event bus connected");
        self.drain_buffer().await;
        Ok(())
    }

    /// Reconnect with exponential backoff and capped jitter, retrying
    /// until success. Intended to run as a background task.
    pub async fn reconnect_with_backoff(&self) {
        let mut backoff = self.config.base_backoff;
        loop {
            match self.connect().await {
                Ok(()) => return,
                Err(err) => {
                    warn!(error = %err, backoff_ms = backoff.as_millis(), "event bus reconnect failed");
                    *self.state.write().await = ConnectionState::Disconnected;
                    let jitter_ms = rand::thread_rng().gen_range(0..=backoff.as_millis() as u64 / 4 + 1);
                    tokio::time::sleep(backoff + Duration::from_millis(jitter_ms)).await;
                    backoff = (backoff * 2).min(self.config.max_backoff);
                }
            }
        }
    }

    async fn drain_buffer(&self) {
        let drained = {
            let mut buffer = self.buffer.lock().await;
            buffer.drain()
        };
        if drained.is_empty() {
            return;
        }
        info!(count = drained.len(), "draining buffered publishes");
        for (channel, message) in drained {
            if let Err(err) = self.publish_raw(&channel, message.clone()).await {
                warn!(channel = %channel, error = %err, "failed to drain buffered publish, re-buffering");
                self.buffer.lock().await.push(channel, message);
            }
        }
    }

    /// Publish a signed envelope. Returns the number of subscribers
    /// reached, or buffers the message and marks the bus degraded if the
    /// backing store is unreachable.
    pub async fn publish(&self, channel: &str, payload: Value, timestamp: &str) -> Result<i64, BusError> {
        let envelope = seal(payload, &self.config.engagement_id, &self.config.engagement_key, timestamp)?;
        let wire = serde_json::to_value(&envelope)?;
        match self.publish_raw(channel, wire.clone()).await {
            Ok(count) => Ok(count),
            Err(err) => {
                warn!(channel, error = %err, "publish failed, buffering for reconnect");
                *self.state.write().await = ConnectionState::Degraded;
                self.buffer.lock().await.push(channel.to_string(), wire);
                Ok(0)
            }
        }
    }

    async fn publish_raw(&self, channel: &str, wire: Value) -> Result<i64, BusError> {
        let mut guard = self.manager.write().await;
        let manager = guard.as_mut().ok_or(BusError::NotConnected)?;
        let payload = serde_json::to_string(&wire)?;
        let count: i64 = manager.publish(channel, payload).await?;
        Ok(count)
    }

    /// Subscribe to a channel pattern (`findings:*`, `control:kill`, etc.).
    /// Delivered messages are signature-verified against `key` before
    /// being forwarded; unverifiable or malformed messages are dropped
    /// silently, matching spec.md §4.D's "subscribers drop messages whose
    /// signature does not verify".
    pub async fn subscribe(&self, pattern: &str, key: Vec<u8>) -> Result<Subscription, BusError> {
        let url = self.resolve_url().await?;
        let client = redis::Client::open(url)?;
        let conn = client.get_async_connection().await?;
        let mut pubsub: PubSub = conn.into_pubsub();
        pubsub.psubscribe(pattern).await?;

        let (tx, rx) = mpsc::channel(256);
        let task = tokio::spawn(async move {
            use futures_util::StreamExt;
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let channel: String = msg.get_channel_name().to_string();
                let raw: String = match msg.get_payload() {
                    Ok(raw) => raw,
                    Err(_) => continue,
                };
                let envelope: cyberred_core::StigmergicMessage = match serde_json::from_str(&raw) {
                    Ok(envelope) => envelope,
                    Err(_) => continue,
                };
                if !verify(&envelope, &key) {
                    warn!(channel = %channel, "dropped message with invalid signature");
                    continue;
                }
                let delivery = Delivery {
                    channel,
                    payload: envelope.payload,
                };
                if tx.send(delivery).await.is_err() {
                    break;
                }
            }
        });

        Ok(Subscription {
            receiver: rx,
            _task: task,
        })
    }
}

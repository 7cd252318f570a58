//! Redis stream operations providing at-least-once delivery with consumer
//! groups. Entries carry the same signed envelope as pub/sub messages;
//! malformed or tampered entries are skipped, not fatal, per spec.md §4.D.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;

use crate::envelope::{seal, verify};
use crate::error::BusError;

pub struct StreamEntry {
    pub id: String,
    pub payload: Value,
}

pub async fn xadd(
    manager: &mut ConnectionManager,
    stream: &str,
    engagement_id: &str,
    key: &[u8],
    timestamp: &str,
    payload: Value,
) -> Result<String, BusError> {
    let envelope = seal(payload, engagement_id, key, timestamp)?;
    let wire = serde_json::to_string(&envelope)?;
    let id: String = manager.xadd(stream, "*", &[("envelope", wire)]).await?;
    Ok(id)
}

pub async fn xgroup_create(
    manager: &mut ConnectionManager,
    stream: &str,
    group: &str,
) -> Result<(), BusError> {
    let result: redis::RedisResult<()> = manager.xgroup_create_mkstream(stream, group, "$").await;
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.to_string().contains("BUSYGROUP") => Ok(()),
        Err(err) => Err(err.into()),
    }
}

pub async fn xreadgroup(
    manager: &mut ConnectionManager,
    stream: &str,
    group: &str,
    consumer: &str,
    count: usize,
    key: &[u8],
) -> Result<Vec<StreamEntry>, BusError> {
    let opts = redis::streams::StreamReadOptions::default()
        .group(group, consumer)
        .count(count);
    let reply: redis::streams::StreamReadReply = manager
        .xread_options(&[stream], &[">"], &opts)
        .await?;

    let mut entries = Vec::new();
    for stream_key in reply.keys {
        for id_entry in stream_key.ids {
            let Some(redis::Value::BulkString(raw)) = id_entry.map.get("envelope").cloned() else {
                continue;
            };
            let Ok(raw) = String::from_utf8(raw) else {
                continue;
            };
            let Ok(envelope) = serde_json::from_str::<cyberred_core::StigmergicMessage>(&raw) else {
                continue;
            };
            if !verify(&envelope, key) {
                continue;
            }
            entries.push(StreamEntry {
                id: id_entry.id,
                payload: envelope.payload,
            });
        }
    }
    Ok(entries)
}

pub async fn xack(
    manager: &mut ConnectionManager,
    stream: &str,
    group: &str,
    id: &str,
) -> Result<(), BusError> {
    let _: i64 = manager.xack(stream, group, &[id]).await?;
    Ok(())
}

pub async fn xpending_count(
    manager: &mut ConnectionManager,
    stream: &str,
    group: &str,
) -> Result<i64, BusError> {
    let reply: redis::streams::StreamPendingReply = manager.xpending(stream, group).await?;
    Ok(match reply {
        redis::streams::StreamPendingReply::Empty => 0,
        redis::streams::StreamPendingReply::Data(data) => data.count as i64,
    })
}

pub async fn xclaim(
    manager: &mut ConnectionManager,
    stream: &str,
    group: &str,
    consumer: &str,
    min_idle_ms: usize,
    ids: &[&str],
) -> Result<(), BusError> {
    let _: redis::streams::StreamClaimReply = manager
        .xclaim(stream, group, consumer, min_idle_ms, ids)
        .await?;
    Ok(())
}

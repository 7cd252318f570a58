//! Newline-delimited UTF-8 JSON framing, grounded on spec.md §4.N.

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};

use crate::error::IpcError;
use crate::types::{IpcRequest, IpcResponse, StreamEvent};

pub const MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

/// Reads one newline-delimited frame, returning `Ok(None)` on clean EOF.
/// A line exceeding [`MAX_FRAME_BYTES`] is a protocol error rather than a
/// silently truncated read.
pub async fn read_line<R: AsyncBufReadExt + Unpin>(
    reader: &mut R,
) -> Result<Option<String>, IpcError> {
    let mut line = String::new();
    let mut limited = reader.take(MAX_FRAME_BYTES as u64 + 1);
    let n = limited.read_line(&mut line).await?;
    if n == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    if line.len() > MAX_FRAME_BYTES {
        return Err(IpcError::FrameTooLarge(line.len(), MAX_FRAME_BYTES));
    }
    Ok(Some(line))
}

pub fn decode_request(line: &str) -> Result<IpcRequest, IpcError> {
    Ok(serde_json::from_str(line)?)
}

pub async fn write_response<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    response: &IpcResponse,
) -> Result<(), IpcError> {
    write_json_line(writer, response).await
}

pub async fn write_event<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    event: &StreamEvent,
) -> Result<(), IpcError> {
    write_json_line(writer, event).await
}

async fn write_json_line<W: AsyncWriteExt + Unpin, T: serde::Serialize>(
    writer: &mut W,
    value: &T,
) -> Result<(), IpcError> {
    let mut encoded = serde_json::to_vec(value)?;
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn reads_one_line_at_a_time() {
        let data = b"{\"a\":1}\n{\"b\":2}\n".to_vec();
        let mut reader = BufReader::new(&data[..]);
        let first = read_line(&mut reader).await.unwrap().unwrap();
        assert_eq!(first, "{\"a\":1}");
        let second = read_line(&mut reader).await.unwrap().unwrap();
        assert_eq!(second, "{\"b\":2}");
        assert!(read_line(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn exact_max_frame_size_is_accepted() {
        let mut data = vec![b'a'; MAX_FRAME_BYTES];
        data.push(b'\n');
        let mut reader = BufReader::new(&data[..]);
        let line = read_line(&mut reader).await.unwrap().unwrap();
        assert_eq!(line.len(), MAX_FRAME_BYTES);
    }

    #[tokio::test]
    async fn oversized_line_is_rejected() {
        let mut data = vec![b'a'; MAX_FRAME_BYTES + 16];
        data.push(b'\n');
        let mut reader = BufReader::new(&data[..]);
        let err = read_line(&mut reader).await.unwrap_err();
        assert!(matches!(err, IpcError::FrameTooLarge(_, _)));
    }

    #[test]
    fn decodes_request_ignoring_unknown_fields() {
        let req = decode_request(
            r#"{"command":"sessions.list","params":{},"request_id":"r1","extra":true}"#,
        )
        .unwrap();
        assert_eq!(req.command, "sessions.list");
        assert_eq!(req.request_id, "r1");
    }
}

//! Newline-delimited JSON-RPC framing
//!
//! Requests come in one per line. Responses go out through a single writer
//! task so concurrent completions never interleave on the output stream.

use serde_json::Value;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::protocol::{JsonRpcRequest, JsonRpcResponse};

/// Handle for queueing responses to the writer task
pub(crate) type ResponseSender = mpsc::UnboundedSender<JsonRpcResponse>;

/// One decoded input line
#[derive(Debug)]
pub(crate) enum Incoming {
    Request(JsonRpcRequest),
    /// JSON with a usable `id` that is not a valid request
    Invalid { id: Value, message: String },
}

/// Reads requests from a line-oriented stream
pub(crate) struct RequestReader<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> RequestReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    /// Next message, or `None` at end of input.
    ///
    /// Lines that are not JSON (including invalid UTF-8), or that are not
    /// requests and carry no non-null `id`, are logged and skipped; only
    /// I/O errors end the stream.
    ///
    /// Cancel safe: a partially read line stays in the buffer and is
    /// completed by the next call.
    pub async fn next_message(&mut self) -> io::Result<Option<Incoming>> {
        loop {
            let read = self.reader.read_until(b'\n', &mut self.buf).await?;
            if read == 0 && self.buf.is_empty() {
                return Ok(None);
            }

            let line = std::mem::take(&mut self.buf);
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }

            match decode_line(line) {
                Some(message) => return Ok(Some(message)),
                None => continue,
            }
        }
    }
}

fn decode_line(line: &[u8]) -> Option<Incoming> {
    let value: Value = match serde_json::from_slice(line) {
        Ok(v) => v,
        Err(e) => {
            warn!("Error processing message: {}", e);
            return None;
        }
    };

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    match serde_json::from_value::<JsonRpcRequest>(value) {
        Ok(request) => Some(Incoming::Request(request)),
        Err(e) if !id.is_null() => Some(Incoming::Invalid {
            id,
            message: format!("Invalid request: {}", e),
        }),
        Err(e) => {
            warn!("Error processing message: {}", e);
            None
        }
    }
}

/// Spawn the writer task. It runs until every sender is dropped or a
/// write fails; a failed write is returned from the join handle.
pub(crate) fn spawn_writer<W>(writer: W) -> (ResponseSender, JoinHandle<io::Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(write_responses(writer, rx));
    (tx, handle)
}

async fn write_responses<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_vec(&response)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
        debug!("Sent response for id {}", response.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::BufReader;

    fn expect_request(message: Option<Incoming>) -> JsonRpcRequest {
        match message {
            Some(Incoming::Request(request)) => request,
            other => panic!("expected request, got {:?}", other),
        }
    }

    fn expect_invalid(message: Option<Incoming>) -> Value {
        match message {
            Some(Incoming::Invalid { id, .. }) => id,
            other => panic!("expected invalid request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reader_skips_lines_without_id() {
        let mock = tokio_test::io::Builder::new()
            .read(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n")
            .read(b"this is not json\n")
            .read(b"\n")
            .read(b"{\"method\":5}\n")
            .read(b"{\"id\":null,\"method\":[]}\n")
            .read(b"[1,2,3]\n")
            .read(b"\xff\xfe\n")
            .read(b"{\"jsonrpc\":\"2.0\",\"id\":\"b\",\"method\":\"tools/list\"}\n")
            .build();
        let mut reader = RequestReader::new(BufReader::new(mock));

        let first = expect_request(reader.next_message().await.unwrap());
        assert_eq!(first.method, "ping");
        assert_eq!(first.id, Some(json!(1)));

        let second = expect_request(reader.next_message().await.unwrap());
        assert_eq!(second.method, "tools/list");
        assert_eq!(second.id, Some(json!("b")));

        assert!(reader.next_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reader_keeps_id_of_malformed_request() {
        let input: &[u8] = concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":5}\n",
            "{\"jsonrpc\":2,\"id\":\"three\",\"method\":\"ping\"}\n",
        )
        .as_bytes();
        let mut reader = RequestReader::new(input);

        assert_eq!(expect_invalid(reader.next_message().await.unwrap()), json!(1));
        assert_eq!(expect_invalid(reader.next_message().await.unwrap()), json!(2));
        assert_eq!(
            expect_invalid(reader.next_message().await.unwrap()),
            json!("three")
        );
        assert!(reader.next_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reader_accepts_final_line_without_newline() {
        let input: &[u8] = b"{\"id\":2,\"method\":\"ping\"}";
        let mut reader = RequestReader::new(input);
        let request = expect_request(reader.next_message().await.unwrap());
        assert_eq!(request.id, Some(json!(2)));
        assert!(reader.next_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_writer_emits_one_line_per_response() {
        let (out_w, out_r) = tokio::io::duplex(4096);
        let (tx, handle) = spawn_writer(out_w);

        tx.send(JsonRpcResponse::success(json!(1), json!({ "ok": true })))
            .unwrap();
        tx.send(JsonRpcResponse::success(json!("two"), json!([])))
            .unwrap();
        drop(tx);
        handle.await.unwrap().unwrap();

        let mut lines = BufReader::new(out_r).lines();
        let mut ids = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            let value: Value = serde_json::from_str(&line).unwrap();
            assert_eq!(value["jsonrpc"], "2.0");
            ids.push(value["id"].clone());
        }
        assert_eq!(ids, vec![json!(1), json!("two")]);
    }

    #[tokio::test]
    async fn test_writer_reports_write_failure() {
        let mock = tokio_test::io::Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            .build();
        let (tx, handle) = spawn_writer(mock);

        tx.send(JsonRpcResponse::success(json!(1), json!({})))
            .unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}

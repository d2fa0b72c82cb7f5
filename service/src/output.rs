//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Per-connection output buffering
//!
//! [`OutputSink`] is written to synchronously from any task. Flushed bytes are
//! queued for an [`OutputWriter`] task which owns the socket's write half.
//! The queue is bounded in bytes: a client that stops reading is cut off
//! instead of growing the queue without limit.

use crate::{ConnectionId, ServerMetrics};
use bytes::BytesMut;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use termgate_telnetcodec::{Encoder, NvtEncoder, TelnetFrame, TextEncoding};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

struct SinkInner {
    /// Written but not yet flushed
    buffer: BytesMut,
    /// Flushed and waiting for the writer task
    queued: BytesMut,
    encoder: NvtEncoder,
}

struct SinkShared {
    id: ConnectionId,
    inner: Mutex<SinkInner>,
    closed: AtomicBool,
    /// Wakes the writer when output is queued or the sink closes
    ready: Notify,
    /// Abandons the write in progress
    abort: CancellationToken,
    /// Cancelled when the connection must go away
    cancel: CancellationToken,
    bytes_flushed: AtomicU64,
    metrics: Arc<ServerMetrics>,
}

impl SinkShared {
    fn lock(&self) -> MutexGuard<'_, SinkInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.lock().buffer.clear();
        self.ready.notify_one();
    }

    /// Drop everything queued and tear the connection down
    fn abandon(&self) {
        self.lock().queued.clear();
        self.close();
        self.abort.cancel();
        self.cancel.cancel();
    }
}

/// Buffered, non-blocking writer for one connection
pub struct OutputSink {
    shared: Arc<SinkShared>,
    limit: usize,
}

impl OutputSink {
    /// Create a sink and the writer task that drains it into `writer`
    ///
    /// At most `limit` flushed bytes may wait for the socket. Going over the
    /// limit closes the sink and cancels `cancel`.
    pub fn new<W>(
        id: ConnectionId,
        writer: W,
        encoding: TextEncoding,
        limit: usize,
        cancel: CancellationToken,
        metrics: Arc<ServerMetrics>,
    ) -> (Self, OutputWriter<W>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let shared = Arc::new(SinkShared {
            id,
            inner: Mutex::new(SinkInner {
                buffer: BytesMut::with_capacity(1024),
                queued: BytesMut::new(),
                encoder: NvtEncoder::new(encoding),
            }),
            closed: AtomicBool::new(false),
            ready: Notify::new(),
            abort: CancellationToken::new(),
            cancel,
            bytes_flushed: AtomicU64::new(0),
            metrics,
        });
        let task = OutputWriter {
            shared: shared.clone(),
            writer,
        };
        (Self { shared, limit }, task)
    }

    /// Buffer text, translating every `\n` to `\r\n`
    pub fn write(&self, text: &str) {
        if self.is_closed() {
            return;
        }
        let mut inner = self.shared.lock();
        let SinkInner {
            buffer, encoder, ..
        } = &mut *inner;
        if let Err(error) = encoder.encode(text, buffer) {
            warn!(connection_id = %self.shared.id, %error, "Failed to encode output");
        }
    }

    /// Buffer bytes exactly as given
    pub fn write_raw(&self, bytes: &[u8]) {
        if self.is_closed() {
            return;
        }
        self.shared.lock().buffer.extend_from_slice(bytes);
    }

    /// Buffer a protocol frame
    pub fn write_frame(&self, frame: TelnetFrame) {
        if self.is_closed() {
            return;
        }
        let mut inner = self.shared.lock();
        let SinkInner {
            buffer, encoder, ..
        } = &mut *inner;
        if let Err(error) = encoder.encode(frame, buffer) {
            warn!(connection_id = %self.shared.id, %error, "Failed to encode frame");
        }
    }

    /// Queue everything buffered so far for the writer task
    ///
    /// A chunk is always accepted onto an empty queue. Otherwise, if the
    /// queue would grow past the limit the client is treated as stalled and
    /// the connection is closed.
    pub fn flush(&self) {
        if self.is_closed() {
            return;
        }
        let mut inner = self.shared.lock();
        let len = inner.buffer.len();
        if len == 0 {
            return;
        }
        let queued = inner.queued.len();
        if queued > 0 && queued + len > self.limit {
            drop(inner);
            warn!(
                connection_id = %self.shared.id,
                queued,
                limit = self.limit,
                "Output queue full, closing slow connection"
            );
            self.shared.metrics.connection_error();
            self.shared.abandon();
            return;
        }
        let chunk = inner.buffer.split();
        inner.queued.unsplit(chunk);
        drop(inner);

        self.shared
            .bytes_flushed
            .fetch_add(len as u64, Ordering::Relaxed);
        trace!(connection_id = %self.shared.id, bytes = len, "Flushed output");
        self.shared.ready.notify_one();
    }

    /// Stop accepting output
    ///
    /// Anything already flushed is still written; unflushed bytes are dropped.
    /// Calling this more than once has no further effect.
    pub fn close(&self) {
        self.shared.close();
    }

    /// Whether the sink no longer accepts output
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Bytes handed to the writer task so far
    pub fn bytes_flushed(&self) -> u64 {
        self.shared.bytes_flushed.load(Ordering::Relaxed)
    }

    /// Flushed bytes not yet taken by the writer task
    pub fn queued_bytes(&self) -> usize {
        self.shared.lock().queued.len()
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink")
            .field("id", &self.shared.id)
            .field("closed", &self.is_closed())
            .field("limit", &self.limit)
            .field("bytes_flushed", &self.bytes_flushed())
            .finish()
    }
}

/// Task half of an [`OutputSink`]
pub struct OutputWriter<W> {
    shared: Arc<SinkShared>,
    writer: W,
}

impl<W> OutputWriter<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Write queued output until the sink closes, then shut the writer down
    pub async fn run(mut self) {
        let shared = self.shared.clone();
        loop {
            let notified = shared.ready.notified();
            let chunk = shared.lock().queued.split().freeze();
            if chunk.is_empty() {
                if shared.is_closed() {
                    break;
                }
                notified.await;
                continue;
            }

            let written = select! {
                _ = shared.abort.cancelled() => {
                    debug!(connection_id = %shared.id, "Abandoning pending output");
                    return;
                }
                written = self.writer.write_all(&chunk) => written,
            };
            if let Err(error) = written {
                warn!(connection_id = %shared.id, %error, "Socket write failed");
                shared.abandon();
                return;
            }
            shared.metrics.bytes_sent(chunk.len() as u64);
        }
        if let Err(error) = self.writer.shutdown().await {
            debug!(connection_id = %shared.id, %error, "Socket shutdown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termgate_telnetcodec::{TelnetOption, negotiation_sequence};
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tracing_test::traced_test;

    fn sink_pair() -> (OutputSink, tokio::io::DuplexStream, Arc<ServerMetrics>) {
        let (server, client) = tokio::io::duplex(4096);
        let metrics = Arc::new(ServerMetrics::new());
        let (sink, writer) = OutputSink::new(
            ConnectionId::new(1),
            server,
            TextEncoding::Utf8,
            1024 * 1024,
            CancellationToken::new(),
            metrics.clone(),
        );
        tokio::spawn(writer.run());
        (sink, client, metrics)
    }

    #[tokio::test]
    async fn test_write_translates_newlines() {
        let (sink, mut client, metrics) = sink_pair();
        sink.write("hi\nthere\r\n");
        sink.flush();
        sink.close();

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"hi\r\nthere\r\r\n");
        assert_eq!(sink.bytes_flushed(), 12);
        assert_eq!(metrics.snapshot().bytes_sent, 12);
    }

    #[tokio::test]
    async fn test_raw_and_frames_are_untouched() {
        let (sink, mut client, _) = sink_pair();
        for frame in negotiation_sequence() {
            sink.write_frame(frame);
        }
        sink.write_raw(b"\n");
        sink.flush();
        sink.close();

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received.len(), 29);
        assert_eq!(&received[..3], &[255, 253, TelnetOption::Linemode.to_u8()]);
        assert_eq!(received.last(), Some(&b'\n'));
    }

    #[tokio::test]
    async fn test_closed_sink_ignores_output() {
        let (sink, mut client, _) = sink_pair();
        sink.write("before");
        sink.close();
        sink.close();
        sink.write("after");
        sink.flush();

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert!(received.is_empty());
        assert!(sink.is_closed());
    }

    #[tokio::test]
    async fn test_unflushed_output_stays_buffered() {
        let (sink, mut client, _) = sink_pair();
        sink.write("one");
        sink.flush();
        sink.write("two");

        let mut first = [0u8; 3];
        client.read_exact(&mut first).await.unwrap();
        assert_eq!(&first, b"one");
        sink.flush();
        let mut second = [0u8; 3];
        client.read_exact(&mut second).await.unwrap();
        assert_eq!(&second, b"two");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_stalled_client_is_cut_off() {
        const LIMIT: usize = 128 * 1024;
        const CHUNK: usize = 64 * 1024;

        // The client end is never read, so the writer stalls after 64 bytes.
        let (server, _client) = tokio::io::duplex(64);
        let metrics = Arc::new(ServerMetrics::new());
        let cancel = CancellationToken::new();
        let (sink, writer) = OutputSink::new(
            ConnectionId::new(1),
            server,
            TextEncoding::Utf8,
            LIMIT,
            cancel.clone(),
            metrics.clone(),
        );
        let writer = tokio::spawn(writer.run());

        let payload = vec![b'x'; CHUNK];
        for _ in 0..1024 {
            sink.write_raw(&payload);
            sink.flush();
            assert!(sink.queued_bytes() <= LIMIT);
            tokio::task::yield_now().await;
            if sink.is_closed() {
                break;
            }
        }

        assert!(sink.is_closed());
        assert!(cancel.is_cancelled());
        assert_eq!(sink.queued_bytes(), 0);
        assert!(sink.bytes_flushed() <= (LIMIT + CHUNK) as u64);
        assert_eq!(metrics.snapshot().connection_errors, 1);
        assert!(logs_contain("Output queue full, closing slow connection"));
        tokio::time::timeout(Duration::from_secs(1), writer)
            .await
            .expect("writer should stop once output is abandoned")
            .unwrap();
    }

    #[tokio::test]
    async fn test_large_chunk_accepted_onto_empty_queue() {
        let (server, mut client) = tokio::io::duplex(4096);
        let (sink, writer) = OutputSink::new(
            ConnectionId::new(1),
            server,
            TextEncoding::Utf8,
            16,
            CancellationToken::new(),
            Arc::new(ServerMetrics::new()),
        );
        tokio::spawn(writer.run());
        sink.write_raw(&[b'y'; 100]);
        sink.flush();
        assert!(!sink.is_closed());
        sink.close();

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, vec![b'y'; 100]);
    }
}

//! Chunk-by-chunk copy from the upstream body to the caller.
//!
//! The pump reads one chunk, forwards it, and only then reads the next. The
//! outbound channel should be created with [`RELAY_CHANNEL_CAPACITY`] so no
//! more than one chunk is ever waiting for the caller.

use std::fmt::Display;
use std::io;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Capacity of the channel between pump and response body.
pub const RELAY_CHANNEL_CAPACITY: usize = 1;

/// How a pump run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// Upstream body reached its end.
    Completed { chunks: usize, bytes: usize },
    /// The token fired or the caller went away.
    Cancelled { chunks: usize, bytes: usize },
    /// Upstream body failed mid-stream; the error was passed to the caller.
    Failed { chunks: usize, bytes: usize },
}

/// Copy `upstream` into `sink` until upstream ends, fails, or `cancel` fires.
///
/// A closed `sink` (caller disconnected) cancels `cancel`. When `cancel` fires
/// while the caller is still attached, an error is pushed into `sink` so the
/// response is aborted rather than ending like a finished stream. `upstream`
/// is dropped on return, which releases the upstream connection.
pub async fn pump<S, T, E>(
    upstream: S,
    sink: mpsc::Sender<Result<T, io::Error>>,
    cancel: CancellationToken,
) -> PumpOutcome
where
    S: Stream<Item = Result<T, E>>,
    T: AsRef<[u8]>,
    E: Display,
{
    let mut upstream = std::pin::pin!(upstream);
    let mut chunks = 0usize;
    let mut bytes = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return abort(&sink, chunks, bytes).await,
            next = upstream.next() => next,
        };

        match next {
            None => {
                debug!(chunks, bytes, "relay completed");
                return PumpOutcome::Completed { chunks, bytes };
            }
            Some(Ok(chunk)) => {
                let len = chunk.as_ref().len();
                let sent = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return abort(&sink, chunks, bytes).await,
                    result = sink.send(Ok(chunk)) => result.is_ok(),
                };
                if !sent {
                    cancel.cancel();
                    debug!(chunks, bytes, "relay stopped, caller gone");
                    return PumpOutcome::Cancelled { chunks, bytes };
                }
                chunks += 1;
                bytes += len;
            }
            Some(Err(e)) => {
                warn!(chunks, bytes, error = %e, "upstream body failed mid-stream");
                let _ = sink.send(Err(io::Error::other(e.to_string()))).await;
                return PumpOutcome::Failed { chunks, bytes };
            }
        }
    }
}

/// End a cancelled relay with an error item, unless the caller is gone.
async fn abort<T>(
    sink: &mpsc::Sender<Result<T, io::Error>>,
    chunks: usize,
    bytes: usize,
) -> PumpOutcome {
    debug!(chunks, bytes, "relay cancelled");
    let _ = sink.send(Err(io::Error::other("relay cancelled"))).await;
    PumpOutcome::Cancelled { chunks, bytes }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use futures_util::stream;

    use super::*;

    fn chunks(parts: &[&'static str]) -> Vec<Result<Vec<u8>, String>> {
        parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect()
    }

    /// Endless upstream that counts reads and records when it is dropped.
    struct CountingUpstream {
        reads: Arc<AtomicUsize>,
        dropped: Arc<AtomicBool>,
    }

    impl Stream for CountingUpstream {
        type Item = Result<Vec<u8>, String>;

        fn poll_next(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Option<Self::Item>> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            std::task::Poll::Ready(Some(Ok(format!("data: {n}\n\n").into_bytes())))
        }
    }

    impl Drop for CountingUpstream {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn copies_bytes_unmodified_and_in_order() {
        let (tx, mut rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let upstream = stream::iter(chunks(&["data: {\"a\":1}\n\n", "data: [DONE]\n\n"]));

        let task = tokio::spawn(pump(upstream, tx, cancel.clone()));

        let mut received = Vec::new();
        while let Some(item) = rx.recv().await {
            received.extend(item.expect("chunk"));
        }

        let outcome = task.await.expect("join");
        assert_eq!(received, b"data: {\"a\":1}\n\ndata: [DONE]\n\n");
        assert_eq!(outcome, PumpOutcome::Completed { chunks: 2, bytes: 29 });
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn cancellation_stops_upstream_reads() {
        let reads = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicBool::new(false));
        let upstream = CountingUpstream {
            reads: reads.clone(),
            dropped: dropped.clone(),
        };
        let (tx, mut rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(pump(upstream, tx, cancel.clone()));

        rx.recv().await.expect("first chunk").expect("ok");
        cancel.cancel();

        let mut rest = Vec::new();
        while let Some(item) = rx.recv().await {
            rest.push(item);
        }
        let outcome = task.await.expect("join");

        assert!(matches!(outcome, PumpOutcome::Cancelled { .. }));
        let last = rest.pop().expect("cancellation error");
        assert_eq!(last.unwrap_err().to_string(), "relay cancelled");
        assert!(rest.iter().all(Result::is_ok), "only the last item is an error");
        assert!(dropped.load(Ordering::SeqCst), "upstream must be released");
        let after_cancel = reads.load(Ordering::SeqCst);
        // One chunk delivered, at most one buffered, at most one blocked on send.
        assert!(after_cancel <= 3, "read {after_cancel} chunks");
        tokio::task::yield_now().await;
        assert_eq!(reads.load(Ordering::SeqCst), after_cancel);
    }

    #[tokio::test]
    async fn closed_caller_cancels_token() {
        let dropped = Arc::new(AtomicBool::new(false));
        let upstream = CountingUpstream {
            reads: Arc::new(AtomicUsize::new(0)),
            dropped: dropped.clone(),
        };
        let (tx, rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);
        drop(rx);
        let cancel = CancellationToken::new();

        let outcome = pump(upstream, tx, cancel.clone()).await;

        assert_eq!(outcome, PumpOutcome::Cancelled { chunks: 0, bytes: 0 });
        assert!(cancel.is_cancelled());
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn upstream_error_is_forwarded_then_stops() {
        let (tx, mut rx) = mpsc::channel(4);
        let upstream = stream::iter(vec![
            Ok(b"data: 1\n\n".to_vec()),
            Err("connection reset".to_string()),
            Ok(b"data: never\n\n".to_vec()),
        ]);

        let outcome = pump(upstream, tx, CancellationToken::new()).await;

        assert_eq!(outcome, PumpOutcome::Failed { chunks: 1, bytes: 9 });
        assert!(rx.recv().await.expect("first").is_ok());
        let err = rx.recv().await.expect("error item").unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert!(rx.recv().await.is_none());
    }
}

//! A large object must stream through the builder, not pile up in it.
//!
//! The source counts the bytes it has handed out and the sink counts the
//! bytes it has received. If the builder buffered the object, the source
//! would run far ahead of the sink.

mod support;

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use common::archive::{ArchiveBuilder, ArchiveConfig};
use common::fetcher::{ByteStream, FetchError, ObjectFetcher};
use futures::StreamExt;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

const OBJECT_SIZE: u64 = 16 * 1024 * 1024;
const CHUNK_SIZE: usize = 64 * 1024;
/// Allowed distance between source and sink: a chunk, the copy buffer and
/// whatever deflate holds back, with generous headroom.
const MAX_LAG: u64 = 2 * 1024 * 1024;

struct GeneratedFetcher {
    produced: Arc<AtomicU64>,
}

#[async_trait]
impl ObjectFetcher for GeneratedFetcher {
    async fn fetch(&self, _key: &str) -> Result<ByteStream, FetchError> {
        let produced = self.produced.clone();
        let chunks = OBJECT_SIZE / CHUNK_SIZE as u64;
        let stream = futures::stream::iter(0..chunks).map(move |i| {
            produced.fetch_add(CHUNK_SIZE as u64, Ordering::SeqCst);
            Ok(Bytes::from(support::noise(CHUNK_SIZE, i + 1)))
        });
        Ok(stream.boxed())
    }
}

struct LagTrackingSink {
    produced: Arc<AtomicU64>,
    received: u64,
    max_lag: u64,
}

impl AsyncWrite for LagTrackingSink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.received += buf.len() as u64;
        let produced = self.produced.load(Ordering::SeqCst);
        let lag = produced.saturating_sub(self.received);
        if lag > self.max_lag {
            self.max_lag = lag;
        }
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_large_entry_streams_with_bounded_lag() {
    let produced = Arc::new(AtomicU64::new(0));
    let fetcher = Arc::new(GeneratedFetcher {
        produced: produced.clone(),
    });
    let mut sink = LagTrackingSink {
        produced: produced.clone(),
        received: 0,
        max_lag: 0,
    };

    let m = support::manifest(vec![support::entry("huge", "huge.bin")]);
    let summary = ArchiveBuilder::new(fetcher, ArchiveConfig::default())
        .build(&m, &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.bytes(), OBJECT_SIZE);
    assert_eq!(produced.load(Ordering::SeqCst), OBJECT_SIZE);
    // Noise does not compress, so nearly everything reached the sink
    assert!(sink.received >= OBJECT_SIZE);
    assert!(
        sink.max_lag <= MAX_LAG,
        "source ran {} bytes ahead of the sink",
        sink.max_lag
    );
}

//! Shared helpers for archive integration tests
#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::pin::Pin;
use std::task::{Context, Poll};

use common::manifest::{Manifest, ManifestEntry};
use tokio::io::AsyncWrite;

/// A manifest entry with only a key and a name set
pub fn entry(source_key: &str, display_name: &str) -> ManifestEntry {
    ManifestEntry {
        source_key: source_key.to_string(),
        display_name: display_name.to_string(),
        ..Default::default()
    }
}

pub fn manifest(entries: Vec<ManifestEntry>) -> Manifest {
    Manifest::new(entries)
}

/// Read every entry of a finished archive back as (name, contents)
pub fn read_entries(archive: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).expect("archive should be readable");
    let mut entries = Vec::new();
    for i in 0..zip.len() {
        let mut file = zip.by_index(i).unwrap();
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        entries.push((file.name().to_string(), data));
    }
    entries
}

pub fn entry_names(archive: &[u8]) -> Vec<String> {
    read_entries(archive).into_iter().map(|(name, _)| name).collect()
}

/// General purpose flags of the first local file header
pub fn first_header_flags(archive: &[u8]) -> u16 {
    assert_eq!(&archive[0..4], b"PK\x03\x04");
    u16::from_le_bytes([archive[6], archive[7]])
}

/// (DOS time, DOS date) of the first local file header
pub fn first_header_dos_datetime(archive: &[u8]) -> (u16, u16) {
    assert_eq!(&archive[0..4], b"PK\x03\x04");
    (
        u16::from_le_bytes([archive[10], archive[11]]),
        u16::from_le_bytes([archive[12], archive[13]]),
    )
}

/// Incompressible test data
pub fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        out.extend_from_slice(&state.to_le_bytes());
    }
    out.truncate(len);
    out
}

/// A sink that accepts `limit` bytes and then fails like a closed socket
pub struct FailingSink {
    limit: usize,
    pub written: usize,
}

impl FailingSink {
    pub fn new(limit: usize) -> Self {
        Self { limit, written: 0 }
    }
}

impl AsyncWrite for FailingSink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        if self.written + buf.len() > self.limit {
            return Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "client went away",
            )));
        }
        self.written += buf.len();
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

//! Typed errors for the core pipelines. Per-record failures are data (`Record::error`),
//! not propagated here; these variants are for the handful of operations that can
//! genuinely abort (snapshot load/store, scanner setup, fatal startup conditions).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("open snapshot file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("create snapshot parent dir {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("write snapshot temp file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("rename snapshot temp file into place ({from} -> {to}): {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decode snapshot record at line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("resolve volume root {path}: {source}")]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

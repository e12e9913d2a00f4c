//! Abstracts over "where decoded fixes end up", decoupling the server
//! pipeline from any particular storage backend through a narrow trait
//! rather than owning storage concretely.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use outpost_core::Fix;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("sink io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sink serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub trait FixSink: Send + Sync {
    async fn append(&self, fixes: Vec<Fix>) -> Result<(), SinkError>;
}

/// Writes one NDJSON line per accepted batch. The default/example sink, so
/// the server runs standalone without a real geospatial database wired in.
/// Grounded in the NDJSON persist-worker pattern used by the ingestion
/// server found elsewhere in the retrieval pack.
pub struct LoggingSink {
    file: Mutex<tokio::fs::File>,
}

#[derive(Serialize)]
struct BatchRecord<'a> {
    received_at: String,
    count: usize,
    fixes: &'a [Fix],
}

impl LoggingSink {
    pub async fn open(path: PathBuf) -> Result<Self, SinkError> {
        let file = tokio::fs::OpenOptions::new().create(true).append(true).open(path).await?;
        Ok(Self { file: Mutex::new(file) })
    }
}

impl FixSink for LoggingSink {
    async fn append(&self, fixes: Vec<Fix>) -> Result<(), SinkError> {
        let record = BatchRecord { received_at: Utc::now().to_rfc3339(), count: fixes.len(), fixes: &fixes };
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        Ok(())
    }
}

/// An in-memory sink for tests: records every batch handed to it.
#[derive(Clone, Default)]
pub struct InMemorySink {
    batches: Arc<Mutex<Vec<Vec<Fix>>>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn batches(&self) -> Vec<Vec<Fix>> {
        self.batches.lock().await.clone()
    }
}

impl FixSink for InMemorySink {
    async fn append(&self, fixes: Vec<Fix>) -> Result<(), SinkError> {
        self.batches.lock().await.push(fixes);
        Ok(())
    }
}

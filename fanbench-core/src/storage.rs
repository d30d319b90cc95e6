//! Record persistence
//!
//! The orchestrator never writes anything itself; callers hand its records to
//! a [`RecordSink`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::error::{FanbenchError, Result};
use crate::latency::LatencyMetrics;
use crate::record::FanOutRecord;
use crate::validation::ValidationReport;

/// Trait for record storage backends
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Durably append records in order
    async fn append(&self, records: &[FanOutRecord]) -> Result<()>;
}

/// Append serializable values to a JSON-lines file, creating parent directories.
async fn append_json_lines<T: Serialize>(path: &Path, values: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut buffer = Vec::new();
    for value in values {
        serde_json::to_writer(&mut buffer, value)?;
        buffer.push(b'\n');
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| FanbenchError::Storage(format!("failed to open {}: {}", path.display(), e)))?;
    file.write_all(&buffer).await?;
    file.flush().await?;
    Ok(())
}

/// JSON-lines file sink, one record per line
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSink for JsonlSink {
    async fn append(&self, records: &[FanOutRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        append_json_lines(&self.path, records).await?;
        tracing::debug!(path = %self.path.display(), count = records.len(), "records appended");
        Ok(())
    }
}

/// In-memory sink
#[derive(Debug, Clone, Default)]
pub struct InMemorySink {
    records: Arc<RwLock<Vec<FanOutRecord>>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far
    pub async fn records(&self) -> Vec<FanOutRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl RecordSink for InMemorySink {
    async fn append(&self, records: &[FanOutRecord]) -> Result<()> {
        self.records.write().await.extend_from_slice(records);
        Ok(())
    }
}

/// One interactive chat exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatLogEntry {
    pub user_message: String,
    pub ai_response: String,
    pub model_name: String,
    pub time_stamp: DateTime<Utc>,
    pub fan_out_latency_sec: f64,
    pub agent_latency_last_sec: Option<f64>,
    pub agent_latency_metrics: Option<LatencyMetrics>,
    pub validation: Option<ValidationReport>,
}

/// JSON-lines log of interactive chat exchanges
#[derive(Debug, Clone)]
pub struct ChatLog {
    path: PathBuf,
}

impl ChatLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn log_run(&self, entry: &ChatLogEntry) -> Result<()> {
        append_json_lines(&self.path, std::slice::from_ref(entry)).await
    }
}

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::core::Anomaly;
use crate::utils::GuardResult;

/// Append-only destination for recorded anomalies
#[async_trait]
pub trait AnomalySink: Send + Sync {
    async fn append(&self, anomaly: &Anomaly) -> GuardResult<()>;
}

/// Writes one JSON object per line to a file
pub struct FileAnomalyLog {
    path: PathBuf,
}

impl FileAnomalyLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AnomalySink for FileAnomalyLog {
    async fn append(&self, anomaly: &Anomaly) -> GuardResult<()> {
        let mut line = serde_json::to_string(anomaly)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}

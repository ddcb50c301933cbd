use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::errors::PilotResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub ts: i64,
    pub step: u32,
    pub action: serde_json::Value,
    pub tokens: u64,
}

/// Append-only JSONL log of executed steps, one file per session.
pub struct StepLog {
    pub session_id: String,
    records: Vec<StepRecord>,
    file_path: std::path::PathBuf,
}

impl StepLog {
    pub fn new() -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        let file_path = sessions_dir().join(format!("session_{session_id}.jsonl"));
        Self {
            session_id,
            records: Vec::new(),
            file_path,
        }
    }

    pub fn push(&mut self, record: StepRecord) {
        self.records.push(record);
    }

    /// Append the latest record to the JSONL file.
    pub fn flush(&self) -> PilotResult<()> {
        if let Some(last) = self.records.last() {
            let line = serde_json::to_string(last)?;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.file_path)?;
            writeln!(file, "{line}")?;
            tracing::debug!(path = %self.file_path.display(), "step record flushed");
        }
        Ok(())
    }
}

impl Default for StepLog {
    fn default() -> Self {
        Self::new()
    }
}

fn sessions_dir() -> std::path::PathBuf {
    if let Some(base) = dirs::data_local_dir() {
        let dir = base.join("screenpilot").join("sessions");
        let _ = std::fs::create_dir_all(&dir);
        return dir;
    }
    std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."))
}

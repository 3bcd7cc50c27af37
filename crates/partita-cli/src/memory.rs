//! Resident memory per run stage.

use std::fmt;
use std::time::Instant;

use serde::Serialize;
use sysinfo::System;

#[derive(Debug, Clone)]
pub enum MemoryError {
    ProcessNotFound { pid: u32 },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::ProcessNotFound { pid } => write!(f, "failed to locate process {pid}"),
        }
    }
}

impl std::error::Error for MemoryError {}

/// Current resident set size of this process in bytes.
pub fn capture_rss_bytes() -> Result<u64, MemoryError> {
    let pid = sysinfo::Pid::from(std::process::id() as usize);
    let mut sys = System::new();
    sys.refresh_processes_specifics(
        sysinfo::ProcessesToUpdate::Some(&[pid]),
        true,
        sysinfo::ProcessRefreshKind::nothing().with_memory(),
    );
    let process = sys.process(pid).ok_or(MemoryError::ProcessNotFound {
        pid: std::process::id(),
    })?;
    Ok(process.memory())
}

/// One finished stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub stage: String,
    pub duration_ms: f64,
    pub rss_bytes: Option<u64>,
    pub rss_delta_bytes: Option<i64>,
}

/// Times stages and samples RSS at each boundary.
///
/// Memory sampling failures only drop the RSS fields; they never fail a run.
#[derive(Debug)]
pub struct StageProbe {
    started: Instant,
    last_rss: Option<u64>,
    records: Vec<StageRecord>,
}

impl StageProbe {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            last_rss: capture_rss_bytes().ok(),
            records: Vec::new(),
        }
    }

    /// Close the current stage under `stage` and open the next one.
    pub fn finish(&mut self, stage: &str) {
        let duration_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let rss_bytes = capture_rss_bytes().ok();
        let rss_delta_bytes = match (rss_bytes, self.last_rss) {
            (Some(after), Some(before)) => Some(after as i64 - before as i64),
            _ => None,
        };
        tracing::info!(
            component = "cli",
            operation = "stage",
            status = "success",
            stage,
            duration_ms,
            rss_bytes = ?rss_bytes,
            rss_delta_bytes = ?rss_delta_bytes,
            "Stage finished"
        );
        self.records.push(StageRecord {
            stage: stage.to_string(),
            duration_ms,
            rss_bytes,
            rss_delta_bytes,
        });
        self.started = Instant::now();
        if rss_bytes.is_some() {
            self.last_rss = rss_bytes;
        }
    }

    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }
}

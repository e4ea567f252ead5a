//! JSONL run logger for replaying supervisor activity.
//!
//! Each process run produces one file named `run-{ISO8601}.jsonl` in the
//! configured log directory. Every [`SupervisorEvent`] becomes one line,
//! stamped with the time it was written.
//!
//! Uses synchronous `std::fs` since writes are small, buffered, and flushed
//! after each event.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use crate::orchestration::events::SupervisorEvent;

/// Returns the current UTC time as an ISO 8601 string with milliseconds.
fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Run lifecycle entries. Supervisor events are logged alongside these with
/// their own `event_type` tags.
#[derive(Debug, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LogEntry {
    RunStart {
        timestamp: String,
        router_model: String,
        mcp_url: String,
        max_iterations: usize,
    },

    RunEnd {
        timestamp: String,
        queries: u64,
    },
}

#[derive(Serialize)]
struct StampedEvent<'a> {
    timestamp: String,
    #[serde(flatten)]
    event: &'a SupervisorEvent,
}

/// Append-only JSONL logger for one process run.
pub struct RunLogger {
    writer: BufWriter<fs::File>,
    log_path: PathBuf,
}

impl RunLogger {
    /// Create the log directory if needed and open a fresh run file in it.
    pub fn new(log_dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(log_dir)?;

        let run_id = Utc::now().format("%Y-%m-%dT%H-%M-%S%.3f").to_string();
        let log_path = log_dir.join(format!("run-{run_id}.jsonl"));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            log_path,
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn log_entry(&mut self, entry: &LogEntry) -> io::Result<()> {
        self.write_line(entry)
    }

    pub fn log_event(&mut self, event: &SupervisorEvent) -> io::Result<()> {
        self.write_line(&StampedEvent {
            timestamp: now_iso(),
            event,
        })
    }

    pub fn log_run_start(
        &mut self,
        router_model: &str,
        mcp_url: &str,
        max_iterations: usize,
    ) -> io::Result<()> {
        self.log_entry(&LogEntry::RunStart {
            timestamp: now_iso(),
            router_model: router_model.to_string(),
            mcp_url: mcp_url.to_string(),
            max_iterations,
        })
    }

    pub fn log_run_end(&mut self, queries: u64) -> io::Result<()> {
        self.log_entry(&LogEntry::RunEnd {
            timestamp: now_iso(),
            queries,
        })
    }

    /// Serialize one value as a single JSON line and flush.
    fn write_line<T: Serialize>(&mut self, value: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, value)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

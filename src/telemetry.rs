//! `McpCallLogger` — a mutex-guarded, line-atomic CSV logger for every tool
//! invocation across a run, independent of the per-eval TSV result sink.
//!
//! Grounded on `lev/runner2.py`'s journal-style logging alongside results
//! and on §4.13's telemetry schema (`timestamp, eval_id, server, tool,
//! success, duration_ms`).

use crate::error::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ToolCallEvent {
    pub timestamp: DateTime<Utc>,
    pub eval_id: String,
    pub server_name: String,
    pub tool_name: String,
    pub success: bool,
    pub duration_ms: u64,
}

pub struct McpCallLogger {
    path: PathBuf,
    file: Mutex<File>,
}

impl McpCallLogger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let is_new = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if is_new {
            writeln!(file, "timestamp,eval_id,server,tool,success,duration_ms")?;
        }
        Ok(Self { path, file: Mutex::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a single CSV line. Held behind a mutex so
    /// concurrent evals can log from separate tasks without interleaving.
    pub fn log(&self, event: &ToolCallEvent) -> Result<()> {
        let line = format!(
            "{},{},{},{},{},{}\n",
            event.timestamp.to_rfc3339(),
            csv_escape(&event.eval_id),
            csv_escape(&event.server_name),
            csv_escape(&event.tool_name),
            event.success,
            event.duration_ms
        );
        let mut file = self.file.lock();
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_commas_and_quotes() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.csv");
        let logger = McpCallLogger::open(&path).unwrap();
        logger
            .log(&ToolCallEvent {
                timestamp: Utc::now(),
                eval_id: "e1".to_string(),
                server_name: "files".to_string(),
                tool_name: "read_file".to_string(),
                success: true,
                duration_ms: 12,
            })
            .unwrap();
        drop(logger);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines[0], "timestamp,eval_id,server,tool,success,duration_ms");
        assert_eq!(lines.len(), 2);

        let logger2 = McpCallLogger::open(&path).unwrap();
        logger2
            .log(&ToolCallEvent {
                timestamp: Utc::now(),
                eval_id: "e2".to_string(),
                server_name: "files".to_string(),
                tool_name: "read_file".to_string(),
                success: false,
                duration_ms: 5,
            })
            .unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
    }
}

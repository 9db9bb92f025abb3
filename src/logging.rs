//! Log sinks handed to routines.
//!
//! Routines never reach for a global logger; they receive a [`LogSink`] and
//! call `append` from their background thread.

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Thread-safe destination for operator-facing log lines.
pub trait LogSink: Send + Sync {
    fn append(&self, message: &str);
}

fn timestamped(message: &str) -> String {
    format!("[{}] {}", Local::now().format("%H:%M:%S%.3f"), message)
}

/// Prints each line to the console and appends it to a log file.
pub struct FileLog {
    path: PathBuf,
    // Serializes writers so lines from different threads never interleave.
    lock: Mutex<()>,
}

impl FileLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl LogSink for FileLog {
    fn append(&self, message: &str) {
        let line = format!("{}\n", timestamped(message));
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        print!("{}", line);
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
        {
            let _ = file.write_all(line.as_bytes());
        }
    }
}

/// Keeps lines in memory. Used by tests and by embedders that render their own log view.
#[derive(Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every line appended so far, without timestamps.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True if any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|line| line.contains(needle))
    }
}

impl LogSink for MemoryLog {
    fn append(&self, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

//! # Console Buffer
//!
//! Shared byte sink handlers can write diagnostic output into instead of
//! stdout. The server manager drains complete lines into the log under the
//! `console` target; a trailing partial line waits for its newline.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

#[derive(Clone, Default)]
pub struct ConsoleBuffer {
    pending: Arc<Mutex<Vec<u8>>>,
}

impl ConsoleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written but not yet drained.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Remove and return every complete line, without its terminator.
    pub fn take_lines(&self) -> Vec<String> {
        let mut pending = self.pending.lock();
        let Some(last_newline) = pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };
        let complete: Vec<u8> = pending.drain(..=last_newline).collect();
        drop(pending);

        complete
            .split(|&b| b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    /// Log every complete line. Returns how many were logged.
    pub fn drain_to_log(&self) -> usize {
        let lines = self.take_lines();
        for line in &lines {
            info!(target: "console", "{}", line);
        }
        lines.len()
    }
}

impl Write for ConsoleBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_line_is_held_back() {
        let mut console = ConsoleBuffer::new();
        write!(console, "first\r\nsecond\nthi").unwrap();

        assert_eq!(console.take_lines(), vec!["first", "second"]);
        assert_eq!(console.pending_len(), 3);

        writeln!(console, "rd").unwrap();
        assert_eq!(console.drain_to_log(), 1);
        assert_eq!(console.pending_len(), 0);
    }

    #[test]
    fn test_clones_share_one_buffer() {
        let console = ConsoleBuffer::new();
        let mut writer = console.clone();
        writer.write_all(b"from a handler\n").unwrap();
        assert_eq!(console.take_lines(), vec!["from a handler"]);
        assert!(console.take_lines().is_empty());
    }
}

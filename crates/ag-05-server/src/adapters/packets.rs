//! # Packet Recorder
//!
//! Appends raw request/response bytes to disk, either to one shared file or
//! to one file per packet named `<filename>.<uid>`. With headers enabled each
//! packet is wrapped in delimiter lines carrying its uid, size and a UTC
//! timestamp.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::PacketDumpOptions;
use crate::domain::ServerError;

const RULE: &str = "----------------------------------------";

pub struct PacketRecorder {
    directory: PathBuf,
    filename: String,
    individual_files: bool,
    headers: bool,
    next_uid: AtomicU64,
    shared: Option<Mutex<File>>,
}

/// Strip trailing path separators, keeping a bare root intact.
fn trim_directory(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let trimmed = raw.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        PathBuf::from(if raw.is_empty() { "." } else { "/" })
    } else {
        PathBuf::from(trimmed)
    }
}

impl PacketRecorder {
    /// Create the recorder. In shared-file mode the file is created (or
    /// truncated) immediately.
    pub fn new(options: &PacketDumpOptions) -> Result<Self, ServerError> {
        let directory = trim_directory(&options.path);
        let shared = if options.individual_files {
            None
        } else {
            let path = directory.join(&options.filename);
            let file = File::create(&path).map_err(|source| ServerError::PacketDump {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), "Recording packets to shared file");
            Some(Mutex::new(file))
        };

        Ok(Self {
            directory,
            filename: options.filename.clone(),
            individual_files: options.individual_files,
            headers: options.headers,
            next_uid: AtomicU64::new(0),
            shared,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn uses_individual_files(&self) -> bool {
        self.individual_files
    }

    pub fn uses_headers(&self) -> bool {
        self.headers
    }

    /// Uid the next packet will get.
    pub fn next_uid(&self) -> u64 {
        self.next_uid.load(Ordering::Relaxed)
    }

    fn packet_path(&self, uid: u64) -> PathBuf {
        self.directory.join(format!("{}.{}", self.filename, uid))
    }

    fn write_packet(&self, out: &mut impl Write, uid: u64, bytes: &[u8]) -> io::Result<()> {
        if self.headers {
            let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
            writeln!(
                out,
                "{RULE}/ begin packet #{uid} ({} bytes @ {stamp}) /{RULE}",
                bytes.len()
            )?;
        }
        out.write_all(bytes)?;
        if self.headers {
            writeln!(out)?;
            writeln!(out, "{RULE}/ end packet #{uid} /{RULE}")?;
        }
        out.flush()
    }

    /// Record one packet and return its uid.
    pub fn record(&self, bytes: &[u8]) -> io::Result<u64> {
        let uid = self.next_uid.fetch_add(1, Ordering::Relaxed);

        match &self.shared {
            Some(file) => self.write_packet(&mut *file.lock(), uid, bytes)?,
            None => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(self.packet_path(uid))?;
                self.write_packet(&mut file, uid, bytes)?;
            }
        }

        debug!(uid, bytes = bytes.len(), "Packet recorded");
        Ok(uid)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn make_options(dir: &Path, individual_files: bool, headers: bool) -> PacketDumpOptions {
        PacketDumpOptions {
            enabled: true,
            individual_files,
            headers,
            path: dir.to_path_buf(),
            filename: "packets".to_string(),
        }
    }

    #[test]
    fn test_shared_file_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = PacketRecorder::new(&make_options(dir.path(), false, true)).unwrap();

        assert_eq!(recorder.record(b"ping").unwrap(), 0);
        assert_eq!(recorder.record(b"pong").unwrap(), 1);
        assert_eq!(recorder.next_uid(), 2);

        let written = fs::read_to_string(dir.path().join("packets")).unwrap();
        assert!(written.contains("/ begin packet #0 (4 bytes @ "));
        assert!(written.contains("ping\n----------------------------------------/ end packet #0 /"));
        assert!(written.contains("/ begin packet #1 (4 bytes @ "));
    }

    #[test]
    fn test_individual_files_without_headers() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = PacketRecorder::new(&make_options(dir.path(), true, false)).unwrap();

        recorder.record(b"first").unwrap();
        recorder.record(b"second").unwrap();

        assert_eq!(fs::read(dir.path().join("packets.0")).unwrap(), b"first");
        assert_eq!(fs::read(dir.path().join("packets.1")).unwrap(), b"second");
        assert!(!dir.path().join("packets").exists());
    }

    #[test]
    fn test_trailing_separators_trimmed() {
        assert_eq!(trim_directory(Path::new("/tmp/dumps///")), PathBuf::from("/tmp/dumps"));
        assert_eq!(trim_directory(Path::new("dumps\\")), PathBuf::from("dumps"));
        assert_eq!(trim_directory(Path::new("/")), PathBuf::from("/"));
    }

    #[test]
    fn test_missing_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let options = make_options(&dir.path().join("does-not-exist"), false, true);
        assert!(matches!(
            PacketRecorder::new(&options),
            Err(ServerError::PacketDump { .. })
        ));
    }
}

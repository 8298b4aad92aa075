//! Line-oriented file storage.
//!
//! Implements [`StoragePort`] over `std::fs` below a root directory.  On
//! ESP-IDF the root is the SPIFFS partition registered by
//! [`mount_spiffs`]; on host it is any directory (tests use a tempdir).
//!
//! Read rules, applied to every line:
//! - `;` starts a comment that runs to the end of the line
//! - trailing spaces, tabs and carriage returns are removed
//! - empty lines are kept, so line numbers stay meaningful
//!
//! Writes go to `<name>.tmp` first and are then renamed over the target, so
//! a concurrent reader never sees a half-written file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::app::ports::{StorageError, StoragePort};

/// Mount point of the data partition on target.
pub const SPIFFS_BASE: &str = "/spiffs";

const COMMENT_CHAR: char = ';';

/// Apply the read rules to one raw line.
pub fn clean_line(raw: &str) -> &str {
    let content = match raw.find(COMMENT_CHAR) {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    content.trim_end_matches([' ', '\t', '\r'])
}

pub struct LineFileStore {
    root: PathBuf,
}

impl LineFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name.trim_start_matches('/'))
    }
}

/// Move `staged` over `target`.  SPIFFS refuses to rename onto an existing
/// file, so the target is removed and the rename retried.
fn replace(staged: &Path, target: &Path) -> io::Result<()> {
    fs::rename(staged, target).or_else(|_| {
        fs::remove_file(target)?;
        fs::rename(staged, target)
    })
}

fn map_io(e: io::Error) -> StorageError {
    match e.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound,
        _ => StorageError::Io,
    }
}

impl StoragePort for LineFileStore {
    fn read_lines(&self, name: &str) -> Result<Vec<String>, StorageError> {
        let text = fs::read_to_string(self.path(name)).map_err(map_io)?;
        let lines: Vec<String> = text.lines().map(|l| clean_line(l).to_string()).collect();
        debug!("Storage: read {} lines from {}", lines.len(), name);
        Ok(lines)
    }

    fn write_lines(&mut self, name: &str, lines: &[String]) -> Result<(), StorageError> {
        let mut text = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            text.push_str(line);
            text.push('\n');
        }
        let target = self.path(name);
        let mut staged = target.clone().into_os_string();
        staged.push(".tmp");
        let staged = PathBuf::from(staged);
        fs::write(&staged, text)
            .and_then(|()| replace(&staged, &target))
            .map_err(|e| {
                warn!("Storage: writing {} failed: {}", name, e);
                let _ = fs::remove_file(&staged);
                StorageError::Io
            })
    }
}

/// Register the SPIFFS data partition at [`SPIFFS_BASE`].
#[cfg(target_os = "espidf")]
pub fn mount_spiffs() -> Result<(), StorageError> {
    use esp_idf_svc::sys::*;

    let conf = esp_vfs_spiffs_conf_t {
        base_path: c"/spiffs".as_ptr(),
        partition_label: core::ptr::null(),
        max_files: 5,
        format_if_mount_failed: true,
    };
    // SAFETY: conf and its strings are valid for the duration of the call;
    // called once from main() before any file access.
    let ret = unsafe { esp_vfs_spiffs_register(&conf) };
    if ret != ESP_OK {
        warn!("Storage: SPIFFS mount failed (rc={})", ret);
        return Err(StorageError::Io);
    }
    log::info!("Storage: SPIFFS mounted at {}", SPIFFS_BASE);
    Ok(())
}

/// Simulation: the host filesystem needs no mounting.
#[cfg(not(target_os = "espidf"))]
pub fn mount_spiffs() -> Result<(), StorageError> {
    log::info!("Storage(sim): mount skipped");
    Ok(())
}

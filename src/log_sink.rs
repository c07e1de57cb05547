//! Size-rotating log file.
//!
//! Files are named `<stem>.<n>.log`; index 0 is the live file. Before a write
//! that would push the live file past `max_bytes`, files shift `.k -> .k+1`,
//! the one at index `max_files - 1` is dropped and a fresh `.0` is opened.
//! With `max_files == 1` the live file is simply truncated.
//!
//! Notes:
//! - A single record larger than `max_bytes` is still written whole to a fresh file.
//! - The sink appends to an existing `.0` on startup and counts its current size.
//! - Meant to sit behind `tracing_appender::non_blocking`, which serializes writes.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::platform::open_log_file_secure_append;

/// File name stem used for the bridge log files.
pub const LOG_FILE_STEM: &str = "zfin-bridge";
/// Lower bounds applied to the rotation settings.
pub const MIN_ROTATE_BYTES: u64 = 1024;
pub const MIN_ROTATE_FILES: u32 = 1;

#[derive(Debug)]
pub struct RotatingFile {
    dir: PathBuf,
    stem: String,
    max_bytes: u64,
    max_files: u32,
    /// None only while rotating
    file: Option<File>,
    written: u64,
}

impl RotatingFile {
    /// Open (or create) `<dir>/<stem>.0.log` for appending. Creates `dir` if needed.
    pub fn open(dir: &Path, stem: &str, max_bytes: u64, max_files: u32) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = file_path(dir, stem, 0);
        let file = open_log_file_secure_append(&path)?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self {
            dir: dir.to_path_buf(),
            stem: stem.to_string(),
            max_bytes: max_bytes.max(MIN_ROTATE_BYTES),
            max_files: max_files.max(MIN_ROTATE_FILES),
            file: Some(file),
            written,
        })
    }

    /// Path of the file at `index` (0 = live).
    pub fn path_for(&self, index: u32) -> PathBuf {
        file_path(&self.dir, &self.stem, index)
    }

    fn rotate(&mut self) -> io::Result<()> {
        // Close the live handle first; Windows refuses to rename open files.
        if let Some(mut old) = self.file.take() {
            old.flush()?;
        }
        let live = self.path_for(0);
        if self.max_files == 1 {
            fs::OpenOptions::new().write(true).truncate(true).open(&live)?;
            self.file = Some(open_log_file_secure_append(&live)?);
            self.written = 0;
            return Ok(());
        }

        let oldest = self.path_for(self.max_files - 1);
        match fs::remove_file(&oldest) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        for index in (0..self.max_files - 1).rev() {
            let from = self.path_for(index);
            if from.exists() {
                fs::rename(&from, self.path_for(index + 1))?;
            }
        }
        self.file = Some(open_log_file_secure_append(&live)?);
        self.written = 0;
        Ok(())
    }

    fn live(&mut self) -> io::Result<&mut File> {
        let file = match self.file.take() {
            Some(f) => f,
            None => open_log_file_secure_append(&self.path_for(0))?,
        };
        Ok(self.file.insert(file))
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        let n = self.live()?.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

fn file_path(dir: &Path, stem: &str, index: u32) -> PathBuf {
    dir.join(format!("{stem}.{index}.log"))
}

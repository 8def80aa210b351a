use std::{fs, io::{BufWriter, Write}, path::Path};

use crate::errors::ScoutError;
use crate::types::LogEntry;

/// Append-only scan log, one line per fetched identifier
pub struct ScanLog<W: Write> {
    out: BufWriter<W>,
}

impl ScanLog<fs::File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ScoutError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ScoutError::Io(std::io::Error::new(
                e.kind(), format!("create dir {}: {e}", parent.display())
            )))?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ScoutError::Io(std::io::Error::new(
                e.kind(), format!("open {}: {e}", path.display())
            )))?;
        Ok(Self::new(file))
    }
}

impl<W: Write> ScanLog<W> {
    pub fn new(inner: W) -> Self {
        Self { out: BufWriter::new(inner) }
    }

    pub fn append(&mut self, entry: &LogEntry<'_>) -> Result<(), ScoutError> {
        writeln!(self.out, "{entry}")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ScoutError> {
        self.out.flush()?;
        Ok(())
    }

    /// Flushes and hands back the underlying writer
    pub fn close(self) -> Result<W, ScoutError> {
        self.out.into_inner().map_err(|e| ScoutError::Io(e.into_error()))
    }
}

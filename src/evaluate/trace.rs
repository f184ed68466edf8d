//! Per-evaluation trace persistence.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::cost::FitnessResult;
use crate::error::Result;

/// Appends one CSV row per evaluated candidate.
///
/// Each append opens the file, writes a single row, and closes it again, so
/// a run interrupted mid-search leaves a usable partial trace and
/// concurrent evaluators (which serialize appends behind a mutex) never
/// interleave partial rows.
#[derive(Debug)]
pub struct TraceWriter {
    path: PathBuf,
}

impl TraceWriter {
    /// Creates the trace file, truncating any previous run's trace, and
    /// writes the header row.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        writeln!(file, "# score, penalty, reasoncode, <param values...>")?;
        Ok(Self { path })
    }

    /// Appends one record: `score, penalty, reasoncode, params...`.
    pub fn append(&self, result: &FitnessResult, candidate: &[f64]) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        let mut row = format!(
            "{}, {}, {}",
            result.fitness(),
            result.penalty,
            result.reasons.code()
        );
        for value in candidate {
            row.push_str(&format!(", {value}"));
        }
        writeln!(file, "{row}")?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

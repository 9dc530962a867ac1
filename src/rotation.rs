//! Per-cycle choice between appending to the current output file and
//! starting a new one. Nothing is carried between cycles; the inputs are
//! re-read from disk and from the fresh snapshot every time.

use crate::locator::OutputFile;
use crate::sensor::SensorSnapshot;
use std::collections::HashSet;

/// The located file of the current month together with its header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentFile {
    pub file: OutputFile,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    NoCurrentFile,
    CompatibleFile,
    IncompatibleFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Append one row in the existing file's own column order.
    Append { file: OutputFile, columns: Vec<String> },
    CreateNew { index: u64 },
}

/// Columns compared as an unordered set; duplicates collapse.
pub fn column_set(columns: &[String]) -> HashSet<&str> {
    columns.iter().map(String::as_str).collect()
}

pub fn classify(current: Option<&CurrentFile>, snapshot: &SensorSnapshot) -> FileState {
    let Some(current) = current else {
        return FileState::NoCurrentFile;
    };
    let expected = snapshot.columns();
    if column_set(&current.columns) == column_set(&expected) {
        FileState::CompatibleFile
    } else {
        FileState::IncompatibleFile
    }
}

pub fn decide(current: Option<CurrentFile>, snapshot: &SensorSnapshot) -> Decision {
    match (classify(current.as_ref(), snapshot), current) {
        (FileState::CompatibleFile, Some(current)) => Decision::Append {
            file: current.file,
            columns: current.columns,
        },
        (FileState::IncompatibleFile, Some(current)) => Decision::CreateNew {
            index: current.file.index.saturating_add(1),
        },
        _ => Decision::CreateNew { index: 1 },
    }
}

use crate::error::{Error, Result};
use crate::naming::FileNaming;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub index: u64,
    pub path: PathBuf,
}

impl OutputFile {
    pub fn new(dir: &Path, naming: &FileNaming, index: u64) -> Self {
        Self {
            index,
            path: dir.join(naming.file_name(index)),
        }
    }
}

/// Highest-indexed file of the current month in `dir`, if any.
///
/// Unrelated entries, directories and other months' files are skipped.
pub fn find_current(dir: &Path, naming: &FileNaming) -> Result<Option<OutputFile>> {
    let entries = fs::read_dir(dir).map_err(|err| {
        tracing::error!(dir = %dir.display(), error = %err, "failed to list output directory");
        Error::io(dir, err)
    })?;

    let mut current: Option<OutputFile> = None;
    for entry in entries {
        let entry = entry.map_err(|err| Error::io(dir, err))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|v| v.to_str()) else {
            continue;
        };
        let Some(index) = naming.matches(name) else {
            continue;
        };
        if current.as_ref().map_or(true, |found| index > found.index) {
            current = Some(OutputFile { index, path });
        }
    }

    match &current {
        Some(file) => tracing::debug!(path = %file.path.display(), index = file.index, "located current output file"),
        None => tracing::debug!(dir = %dir.display(), month = naming.year_month(), "no output file for current month"),
    }
    Ok(current)
}

use crate::config::Config;
use crate::error::{Error, Result};
use crate::locator::{self, OutputFile};
use crate::naming::FileNaming;
use crate::rotation::{self, CurrentFile, Decision};
use crate::sensor::{self, SensorSnapshot};
use crate::writer;
use chrono::NaiveDateTime;
use reqwest::blocking::Client as HttpClient;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Appended { path: PathBuf },
    Created { path: PathBuf, index: u64 },
}

/// Fetch, then write one row. `clock` is read once the response is in, so
/// the row carries the write time. Callers must not run two polls against
/// the same output directory at once; nothing here locks.
pub fn poll<C>(config: &Config, client: &HttpClient, clock: C) -> Result<CycleOutcome>
where
    C: FnOnce() -> NaiveDateTime,
{
    let snapshot = sensor::fetch(client, &config.endpoint)?;
    run_cycle(config, &snapshot, clock())
}

pub fn run_cycle(config: &Config, snapshot: &SensorSnapshot, now: NaiveDateTime) -> Result<CycleOutcome> {
    fs::create_dir_all(&config.output_dir).map_err(|err| {
        tracing::error!(dir = %config.output_dir.display(), error = %err, "failed to create output directory");
        Error::io(&config.output_dir, err)
    })?;

    let naming = FileNaming::for_date(config.output_prefix.as_str(), now.date());
    let current = match locator::find_current(&config.output_dir, &naming)? {
        Some(file) => {
            let columns = writer::read_columns(&file.path, &config.csv)?;
            Some(CurrentFile { file, columns })
        }
        None => None,
    };

    let decision = rotation::decide(current, snapshot);
    tracing::debug!(?decision, "rotation decision");

    match decision {
        Decision::Append { file, columns } => {
            tracing::info!(path = %file.path.display(), index = file.index, "writing to existing output file");
            writer::append(&file.path, &columns, snapshot, &config.csv, now)?;
            Ok(CycleOutcome::Appended { path: file.path })
        }
        Decision::CreateNew { index } => {
            let file = OutputFile::new(&config.output_dir, &naming, index);
            tracing::info!(path = %file.path.display(), index, "setting up new output file");
            writer::initialize(&file.path, &snapshot.columns(), snapshot, &config.csv, now)?;
            Ok(CycleOutcome::Created {
                path: file.path,
                index,
            })
        }
    }
}

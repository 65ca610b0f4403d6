use crate::error::RecorderError;
use chrono::{Local, NaiveDateTime};
use crt_core::Measurement;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

pub const HEADER: [&str; 4] = ["datetime", "reaction_time_ms", "movement_time_ms", "target"];

/// One persisted row.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    pub datetime: NaiveDateTime,
    pub reaction_time_ms: f64,
    pub movement_time_ms: Option<f64>,
    pub target: usize,
}

impl TrialRecord {
    pub fn new(measurement: &Measurement, datetime: NaiveDateTime) -> Self {
        Self {
            datetime,
            reaction_time_ms: measurement.reaction_time_ms(),
            movement_time_ms: measurement.movement_time_ms(),
            target: measurement.target_index,
        }
    }

    /// Stamped with the local wall clock.
    pub fn now(measurement: &Measurement) -> Self {
        Self::new(measurement, Local::now().naive_local())
    }

    fn fields(&self) -> [String; 4] {
        [
            self.datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            format!("{:.1}", self.reaction_time_ms),
            self.movement_time_ms
                .map(|mt| format!("{mt:.1}"))
                .unwrap_or_default(),
            self.target.to_string(),
        ]
    }
}

/// Sink for completed trials. Called once per completed trial, never for aborts.
pub trait ResultRecorder {
    fn append(&mut self, record: &TrialRecord) -> Result<(), RecorderError>;
}

/// Append-only CSV file. The header is written when the file is new or empty.
#[derive(Debug, Clone)]
pub struct CsvRecorder {
    path: PathBuf,
}

impl CsvRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultRecorder for CsvRecorder {
    fn append(&mut self, record: &TrialRecord) -> Result<(), RecorderError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::Writer::from_writer(file);
        if needs_header {
            writer.write_record(HEADER)?;
        }
        writer.write_record(record.fields())?;
        writer.flush()?;

        tracing::debug!(path = %self.path.display(), target = record.target, "trial row appended");
        Ok(())
    }
}

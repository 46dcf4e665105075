//! Contains the sink where the results of each completed session are recorded.

use anyhow::{anyhow, Context, Result};
use std::{fs::OpenOptions, io::Write, path::PathBuf, time::Duration};

use crate::{data::Configuration, error::ScoreLogError};

/// The names of the columns in the score log, written as the first row of a new log.
pub const SCORE_LOG_HEADER: &str = "min_note_count,min_beat_count,segment_count,bpm,key,\
    note_accuracy,segment_accuracy,elapsed_seconds";

/// The results of one completed session, along with the options used to run it.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreRecord {
    /// The minimum number of events in each segment.
    pub min_note_count: usize,

    /// The minimum number of events ending on a beat in each segment.
    pub min_beat_count: usize,

    /// The number of segments presented.
    pub segment_count: usize,

    /// The playback tempo.
    pub bpm: u32,

    /// The name of the training key, or `random`.
    pub key: String,

    /// The fraction of notes answered correctly.
    pub note_accuracy: f64,

    /// The fraction of segments answered without errors.
    pub segment_accuracy: f64,

    /// The length of the session.
    pub elapsed: Duration,
}

impl ScoreRecord {
    /// Creates the record of a session run with the given configuration.
    #[must_use]
    pub fn new(
        config: &Configuration,
        note_accuracy: f64,
        segment_accuracy: f64,
        elapsed: Duration,
    ) -> Self {
        Self {
            min_note_count: config.min_note_count,
            min_beat_count: config.min_beat_count,
            segment_count: config.segment_count,
            bpm: config.tempo,
            key: config.key_label(),
            note_accuracy,
            segment_accuracy,
            elapsed,
        }
    }

    /// Returns the record as a row of the score log, without the line terminator.
    #[must_use]
    pub fn to_row(&self) -> String {
        format!(
            "{},{},{},{},{},{:.2},{:.2},{}",
            self.min_note_count,
            self.min_beat_count,
            self.segment_count,
            self.bpm,
            self.key,
            self.note_accuracy,
            self.segment_accuracy,
            self.elapsed.as_secs()
        )
    }
}

/// A trait exposing a function to record the results of a session.
pub trait ScoreSink {
    /// Appends the record to the sink.
    fn record(&mut self, record: &ScoreRecord) -> Result<(), ScoreLogError>;
}

/// A score sink that appends one row per session to a CSV file, creating it with a header row if
/// needed.
pub struct CsvScoreLog {
    /// The path to the CSV file.
    pub path: PathBuf,
}

impl CsvScoreLog {
    /// Creates a score log writing to the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Helper function to append the record to the file.
    fn record_helper(&self, record: &ScoreRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| anyhow!("cannot open score log {}", self.path.display()))?;
        let is_empty = file
            .metadata()
            .with_context(|| anyhow!("cannot read metadata of {}", self.path.display()))?
            .len()
            == 0;

        let mut contents = String::new();
        if is_empty {
            contents.push_str(SCORE_LOG_HEADER);
            contents.push('\n');
        }
        contents.push_str(&record.to_row());
        contents.push('\n');
        file.write_all(contents.as_bytes())
            .with_context(|| anyhow!("cannot write to score log {}", self.path.display()))
    }
}

impl ScoreSink for CsvScoreLog {
    fn record(&mut self, record: &ScoreRecord) -> Result<(), ScoreLogError> {
        self.record_helper(record)
            .map_err(|e| ScoreLogError::Append(self.path.clone(), e))
    }
}

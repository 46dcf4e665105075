//! Contains the errors returned by the trainer.

use std::{io, path::PathBuf};

use thiserror::Error;

/// An error returned while parsing or transposing notated music.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum NotationError {
    #[error("{source_name} has more than one {marker} marker")]
    DuplicateMarker {
        source_name: String,
        marker: &'static str,
    },

    #[error("{source_name} has no {marker} marker")]
    MissingMarker {
        source_name: String,
        marker: &'static str,
    },

    #[error("invalid key {0}")]
    InvalidKey(String),

    #[error("invalid time signature {0}")]
    InvalidTimeSignature(String),

    #[error("invalid tempo {0}")]
    InvalidTempo(String),

    #[error("invalid token {token:?} in {source_name}")]
    InvalidToken { source_name: String, token: String },

    #[error("{0} contains no notes")]
    Empty(String),

    #[error("cannot read notation file {0}: {1}")]
    ReadFile(PathBuf, #[source] io::Error),
}

/// An error returned when playing a melody.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum AudioError {
    #[error("cannot write temporary MIDI file: {0}")]
    WriteMidi(#[source] anyhow::Error),

    #[error("cannot run audio player {0}: {1}")]
    Player(String, #[source] io::Error),
}

/// An error returned when dealing with the score log.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ScoreLogError {
    #[error("cannot append to score log {0}: {1}")]
    Append(PathBuf, #[source] anyhow::Error),
}

/// An error returned when computing the accuracy of a session.
#[derive(Debug, Error, PartialEq)]
#[allow(missing_docs)]
pub enum AccuracyError {
    #[error("note accuracy is undefined because no notes were presented")]
    NoNotes,

    #[error("segment accuracy is undefined because no segments were judged")]
    NoSegments,
}

/// An error returned when preparing or running a training session.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum SessionError {
    #[error("cannot sample {requested} segments from a pool of {available}")]
    Sampling { requested: usize, available: usize },

    #[error(transparent)]
    DivisionUndefined(#[from] AccuracyError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    ScoreLog(#[from] ScoreLogError),

    #[error("cannot interact with the user: {0}")]
    Io(#[from] io::Error),
}

//! Dictation is an interactive melodic dictation trainer. It cuts short segments out of
//! collections of notated melodies, plays each one, asks the student to type the names of the
//! notes they heard, and grades the answers.
//!
//! The melodies are read from compact one-line entries or from ABC files and moved into a single
//! training key, so that every segment is heard relative to the same tonic. Each melody is split
//! into segments that end on a beat boundary and contain a minimum number of notes and beats. A
//! session samples a number of segments from the resulting pool, presents them one by one, and
//! records the note and segment accuracies to a score log when it completes.

pub mod answer;
pub mod audio;
pub mod collection;
pub mod data;
pub mod error;
pub mod extractor;
pub mod grader;
pub mod notation;
pub mod score_log;
pub mod session;
pub mod session_stats;

use rand::Rng;

use data::{Configuration, Segment};
use error::SessionError;
use notation::NotationEngine;

/// Loads the pool of segments described by the configuration and samples the segments of one
/// session. Fails before anything is played if the pool is too small.
pub fn prepare_session<R: Rng + ?Sized>(
    config: &Configuration,
    engine: &dyn NotationEngine,
    rng: &mut R,
) -> anyhow::Result<Vec<Segment>> {
    let pool = collection::load_pool(config, engine)?;
    let segments = collection::sample_segments(&pool, config.segment_count, rng)?;
    Ok(segments)
}

/// Returns whether the error is caused by a pool too small for the requested sample.
#[must_use]
pub fn is_sampling_error(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<SessionError>(),
        Some(SessionError::Sampling { .. })
    )
}

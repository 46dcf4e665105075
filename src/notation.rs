//! Contains the notation engine, which turns collection entries into ordered sequences of notes
//! and rests and moves them into the training key.
//!
//! Two formats are supported:
//! - A compact, one-entry-per-line notation. Each line contains a few `|`-separated preamble
//!   markers followed by the melody, for example `X:3|K:G|TS:3/4 c4 d e f g`. See the `compact`
//!   module for the grammar of the melody.
//! - Standard ABC files, each containing a single tune. See the `abc` module for the supported
//!   subset.

pub mod abc;
pub mod compact;

use std::{fs, path::Path};

use crate::{
    data::{
        music::{intervals::Interval, notes::Note},
        NoteEvent, NoteOrRest, ParsedEntry, StreamInfo, DEFAULT_TEMPO,
    },
    error::NotationError,
};

/// A trait exposing the operations needed to read the collections.
pub trait NotationEngine {
    /// Parses one line written in the compact notation.
    fn parse_compact_line(&self, line: &str) -> Result<ParsedEntry, NotationError>;

    /// Parses a file in standard notation. The file must contain exactly one tempo marking, one
    /// time signature, and one key signature.
    fn parse_standard_file(&self, path: &Path) -> Result<ParsedEntry, NotationError>;

    /// Returns the events moved from the key `from` to the key `to`. The offsets and durations of
    /// the events are preserved.
    fn transpose(&self, events: &[NoteOrRest], from: Note, to: Note) -> Vec<NoteOrRest>;
}

/// The notation engine used by the trainer, backed by the parsers in this module.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalNotationEngine {}

impl NotationEngine for LocalNotationEngine {
    fn parse_compact_line(&self, line: &str) -> Result<ParsedEntry, NotationError> {
        compact::parse_line(line)
    }

    fn parse_standard_file(&self, path: &Path) -> Result<ParsedEntry, NotationError> {
        let source =
            fs::read_to_string(path).map_err(|e| NotationError::ReadFile(path.to_path_buf(), e))?;
        abc::parse_tune(&source, &path.display().to_string())
    }

    fn transpose(&self, events: &[NoteOrRest], from: Note, to: Note) -> Vec<NoteOrRest> {
        let interval = Interval::between(from, to);
        events
            .iter()
            .map(|event| match event {
                NoteOrRest::Note(note) => NoteOrRest::Note(NoteEvent {
                    pitch: note.pitch.transpose(interval),
                    ..*note
                }),
                NoteOrRest::Rest(rest) => NoteOrRest::Rest(*rest),
            })
            .collect()
    }
}

/// Moves a parsed entry into the training key and returns the melody ready to be segmented.
/// Entries without a tempo marking use the default tempo.
pub fn into_stream_info(
    engine: &dyn NotationEngine,
    entry: &ParsedEntry,
    key: Note,
) -> StreamInfo {
    StreamInfo {
        tempo: entry.tempo.unwrap_or(DEFAULT_TEMPO),
        time_signature: entry.time_signature,
        events: engine.transpose(&entry.events, entry.key, key),
    }
}

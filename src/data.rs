//! Defines the basic data structures used by the trainer to describe melodies, the segments
//! extracted from them, and the options that control a training run.

pub mod music;

use std::{fmt, path::PathBuf, str::FromStr};

use derive_builder::Builder;
use num_rational::Ratio;

use crate::{
    data::music::{
        notes::{Note, Pitch},
        scales::Scale,
    },
    error::NotationError,
};

/// A position or a length measured in beats, where one beat is a quarter note.
pub type Beats = Ratio<u32>;

/// The default minimum number of events in a segment.
pub const DEFAULT_MIN_NOTE_COUNT: usize = 2;

/// The default minimum number of events in a segment that end on a beat boundary.
pub const DEFAULT_MIN_BEAT_COUNT: usize = 1;

/// The default number of segments presented in a session.
pub const DEFAULT_SEGMENT_COUNT: usize = 1;

/// The default playback tempo in beats per minute. Also used by the reference scale.
pub const DEFAULT_TEMPO: u32 = 80;

/// The slowest playback tempo accepted.
pub const MIN_TEMPO: u32 = 60;

/// The fastest playback tempo accepted.
pub const MAX_TEMPO: u32 = 200;

/// The collections read when no sources are given.
pub const DEFAULT_SOURCES: [&str; 2] = ["collections/*.tiny", "collections/*.abc"];

/// The file to which the results of each session are appended.
pub const DEFAULT_SCORE_LOG: &str = "scores.csv";

/// The external program used to play MIDI files.
pub const DEFAULT_PLAYER: &str = "timidity";

/// The largest number of beats accepted in a measure.
const MAX_BEATS_PER_MEASURE: u32 = 64;

/// A time signature, such as 3/4.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TimeSignature {
    /// The number of beats in a measure.
    pub numerator: u32,

    /// The note value that receives one beat.
    pub denominator: u32,
}

impl TimeSignature {
    /// Returns the length of a full measure in quarter notes.
    #[must_use]
    pub fn measure_length(&self) -> Beats {
        Ratio::new(4 * self.numerator, self.denominator)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature {
            numerator: 4,
            denominator: 4,
        }
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for TimeSignature {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NotationError::InvalidTimeSignature(s.to_string());
        let (numerator, denominator) = s.trim().split_once('/').ok_or_else(invalid)?;
        let numerator: u32 = numerator.trim().parse().map_err(|_| invalid())?;
        let denominator: u32 = denominator.trim().parse().map_err(|_| invalid())?;
        if !(1..=MAX_BEATS_PER_MEASURE).contains(&numerator)
            || !denominator.is_power_of_two()
            || denominator > 64
        {
            return Err(invalid());
        }
        Ok(TimeSignature {
            numerator,
            denominator,
        })
    }
}

/// A pitched event in a melody.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NoteEvent {
    /// The pitch of the note.
    pub pitch: Pitch,

    /// The position of the note from the start of the melody.
    pub offset: Beats,

    /// The length of the note.
    pub duration: Beats,
}

/// A silent event in a melody.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Rest {
    /// The position of the rest from the start of the melody.
    pub offset: Beats,

    /// The length of the rest.
    pub duration: Beats,
}

/// Either a note or a rest. Ordered sequences of these events are the unit produced when parsing
/// a collection entry and consumed when extracting segments.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoteOrRest {
    /// A pitched note.
    Note(NoteEvent),

    /// A rest.
    Rest(Rest),
}

impl NoteOrRest {
    /// Returns the position of the event from the start of the melody.
    #[must_use]
    pub fn offset(&self) -> Beats {
        match self {
            NoteOrRest::Note(note) => note.offset,
            NoteOrRest::Rest(rest) => rest.offset,
        }
    }

    /// Returns the length of the event.
    #[must_use]
    pub fn duration(&self) -> Beats {
        match self {
            NoteOrRest::Note(note) => note.duration,
            NoteOrRest::Rest(rest) => rest.duration,
        }
    }

    /// Returns the position at which the event ends.
    #[must_use]
    pub fn end(&self) -> Beats {
        self.offset() + self.duration()
    }

    /// Returns whether the event ends exactly on a beat boundary.
    #[must_use]
    pub fn ends_on_beat(&self) -> bool {
        self.end().is_integer()
    }

    /// Returns the pitch of the event, or `None` for rests.
    #[must_use]
    pub fn pitch(&self) -> Option<Pitch> {
        match self {
            NoteOrRest::Note(note) => Some(note.pitch),
            NoteOrRest::Rest(_) => None,
        }
    }

    /// Returns a copy of the event moved to the given offset.
    #[must_use]
    pub fn with_offset(&self, offset: Beats) -> NoteOrRest {
        match *self {
            NoteOrRest::Note(note) => NoteOrRest::Note(NoteEvent { offset, ..note }),
            NoteOrRest::Rest(rest) => NoteOrRest::Rest(Rest { offset, ..rest }),
        }
    }
}

/// The result of parsing one collection entry, before it is moved into the training key.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedEntry {
    /// The tempo written in the entry, if any.
    pub tempo: Option<u32>,

    /// The time signature of the entry.
    pub time_signature: TimeSignature,

    /// The tonic of the major key sharing the entry's key signature.
    pub key: Note,

    /// The notes and rests of the entry, in order.
    pub events: Vec<NoteOrRest>,
}

/// A melody ready to be segmented: its tempo, its time signature, and its events already
/// transposed into the training key.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamInfo {
    /// The tempo in beats per minute.
    pub tempo: u32,

    /// The time signature of the melody.
    pub time_signature: TimeSignature,

    /// The notes and rests of the melody, in order.
    pub events: Vec<NoteOrRest>,
}

/// A contiguous piece of a melody presented to the student as a single dictation.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    /// The tempo at which the segment is played.
    pub tempo: u32,

    /// The time signature under which the segment was extracted.
    pub time_signature: TimeSignature,

    /// The notes and rests in the segment.
    pub events: Vec<NoteOrRest>,
}

impl Segment {
    /// Returns the names of the notes in the segment, in order, skipping rests.
    #[must_use]
    pub fn expected_names(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(NoteOrRest::pitch)
            .map(|p| p.name())
            .collect()
    }

    /// Returns the number of pitched notes in the segment.
    #[must_use]
    pub fn note_count(&self) -> usize {
        self.events.iter().filter(|e| e.pitch().is_some()).count()
    }

    /// Returns the ascending major scale in the given key, in quarter notes and closing on the
    /// tonic held for a whole note, used to establish the key before a session.
    #[must_use]
    pub fn reference_scale(key: Note) -> Segment {
        let scale = Scale::major(key);
        let mut events = Vec::with_capacity(scale.pitches.len() + 1);
        let mut offset = Ratio::from_integer(0);
        for pitch in &scale.pitches {
            let duration = Ratio::from_integer(1);
            events.push(NoteOrRest::Note(NoteEvent {
                pitch: *pitch,
                offset,
                duration,
            }));
            offset += duration;
        }
        events.push(NoteOrRest::Note(NoteEvent {
            pitch: Pitch {
                note: key,
                octave: 4,
            },
            offset,
            duration: Ratio::from_integer(4),
        }));
        Segment {
            tempo: DEFAULT_TEMPO,
            time_signature: TimeSignature::default(),
            events,
        }
    }
}

/// The options that control a training run. They are fixed for the whole run.
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct Configuration {
    /// The minimum number of events in a segment.
    #[builder(default = "DEFAULT_MIN_NOTE_COUNT")]
    pub min_note_count: usize,

    /// The minimum number of events in a segment that end on a beat boundary.
    #[builder(default = "DEFAULT_MIN_BEAT_COUNT")]
    pub min_beat_count: usize,

    /// The number of segments presented in the session.
    #[builder(default = "DEFAULT_SEGMENT_COUNT")]
    pub segment_count: usize,

    /// The playback tempo in beats per minute. It replaces the tempo written in the collections.
    #[builder(default = "DEFAULT_TEMPO")]
    pub tempo: u32,

    /// The key into which all the melodies are transposed.
    #[builder(default = "Note::C")]
    pub key: Note,

    /// Whether the key was drawn at random instead of being chosen by the student.
    #[builder(default)]
    pub random_key: bool,

    /// The glob patterns of the collection files.
    #[builder(default = "DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect()")]
    pub sources: Vec<String>,

    /// The path of the score log.
    #[builder(default = "PathBuf::from(DEFAULT_SCORE_LOG)", setter(into))]
    pub score_log: PathBuf,

    /// The program used to play MIDI files.
    #[builder(default = "DEFAULT_PLAYER.to_string()", setter(into))]
    pub player: String,
}

impl ConfigurationBuilder {
    /// Checks the ranges of the options before building the configuration.
    fn validate(&self) -> Result<(), String> {
        if self.min_note_count == Some(0) {
            return Err("the minimum note count must be at least 1".to_string());
        }
        if self.min_beat_count == Some(0) {
            return Err("the minimum beat count must be at least 1".to_string());
        }
        if self.segment_count == Some(0) {
            return Err("the segment count must be at least 1".to_string());
        }
        if self
            .tempo
            .is_some_and(|tempo| !(MIN_TEMPO..=MAX_TEMPO).contains(&tempo))
        {
            return Err(format!(
                "the tempo must be between {MIN_TEMPO} and {MAX_TEMPO} BPM"
            ));
        }
        if self.sources.as_ref().is_some_and(Vec::is_empty) {
            return Err("at least one collection source is required".to_string());
        }
        Ok(())
    }
}

impl Configuration {
    /// Returns the name of the key as recorded in the score log.
    #[must_use]
    pub fn key_label(&self) -> String {
        if self.random_key {
            "random".to_string()
        } else {
            self.key.to_string()
        }
    }
}

impl Default for Configuration {
    /// Returns the default configuration.
    fn default() -> Self {
        Configuration {
            min_note_count: DEFAULT_MIN_NOTE_COUNT,
            min_beat_count: DEFAULT_MIN_BEAT_COUNT,
            segment_count: DEFAULT_SEGMENT_COUNT,
            tempo: DEFAULT_TEMPO,
            key: Note::C,
            random_key: false,
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            score_log: PathBuf::from(DEFAULT_SCORE_LOG),
            player: DEFAULT_PLAYER.to_string(),
        }
    }
}

//! Parses the compact notation used by the line-based collections.
//!
//! A line consists of `|`-separated fields. Every field but the last is a preamble marker:
//! - `X:<n>`: the index of the entry in its collection.
//! - `K:<tonic>`: the key of the entry, for example `K:G` or `K:B-`. Defaults to C.
//! - `TS:<n>/<d>`: the time signature of the entry. Defaults to 4/4.
//!
//! The last field is the melody, a whitespace-separated list of tokens:
//! - Notes are written with their letter name. Lowercase `c` is middle C (C4), and each repetition
//!   of the letter raises it one octave (`cc` is C5). Uppercase `C` is C3, and each repetition
//!   lowers it one octave (`CC` is C2).
//! - An accidental follows the letters: `#` or `##` for sharps, `-` or `--` for flats, and `n` for
//!   an explicit natural.
//! - A duration follows the accidental: `1` is a whole note, `2` a half note, `4` a quarter note,
//!   and so on up to `64`. Each dot adds half of the previous addition. A token without a
//!   duration reuses the last one given, starting with a quarter note.
//! - `r` followed by a duration is a rest.
//! - `trip{` and `}` enclose notes played as triplets.
//! - `<n>/<d>` or `TS:<n>/<d>` in the melody sets the time signature.
//! - Ties (`~`) and lyrics (`_text`) are accepted and ignored.

use num_rational::Ratio;

use crate::{
    data::{
        music::notes::{Accidental, NaturalNote, Note, Pitch},
        Beats, NoteEvent, NoteOrRest, ParsedEntry, Rest, TimeSignature,
    },
    error::NotationError,
};

/// The marker that introduces the entry index.
const INDEX_MARKER: &str = "X:";

/// The marker that introduces the key.
const KEY_MARKER: &str = "K:";

/// The marker that introduces the time signature.
const TIME_SIGNATURE_MARKER: &str = "TS:";

/// The prefix that opens a group of triplets.
const TRIPLET_OPEN: &str = "trip{";

/// The largest number of dots after a duration.
const MAX_DOTS: usize = 3;

/// Returns the index of the entry given in its `X:` marker, if the line has one.
#[must_use]
pub fn entry_index(line: &str) -> Option<u32> {
    let mut fields: Vec<&str> = line.split('|').collect();
    fields.pop();
    fields
        .iter()
        .filter_map(|field| field.trim().strip_prefix(INDEX_MARKER))
        .find_map(|index| index.trim().parse().ok())
}

/// Keeps track of the state needed while reading the tokens of a melody.
struct MelodyReader<'a> {
    /// The line being parsed, used in error messages.
    line: &'a str,

    /// The time signature found so far, if any.
    time_signature: Option<TimeSignature>,

    /// The position of the next event.
    offset: Beats,

    /// The duration used by tokens that do not give one.
    last_duration: Beats,

    /// Whether the reader is inside a group of triplets.
    in_triplet: bool,

    /// The events read so far.
    events: Vec<NoteOrRest>,
}

impl<'a> MelodyReader<'a> {
    fn new(line: &'a str, time_signature: Option<TimeSignature>) -> Self {
        MelodyReader {
            line,
            time_signature,
            offset: Ratio::from_integer(0),
            last_duration: Ratio::from_integer(1),
            in_triplet: false,
            events: Vec::new(),
        }
    }

    fn invalid(&self, token: &str) -> NotationError {
        NotationError::InvalidToken {
            source_name: self.line.to_string(),
            token: token.to_string(),
        }
    }

    fn set_time_signature(&mut self, value: &str) -> Result<(), NotationError> {
        if self.time_signature.is_some() {
            return Err(NotationError::DuplicateMarker {
                source_name: self.line.to_string(),
                marker: "time signature",
            });
        }
        self.time_signature = Some(value.parse()?);
        Ok(())
    }

    /// Reads one whitespace-separated token of the melody.
    fn read_token(&mut self, token: &str) -> Result<(), NotationError> {
        if let Some(value) = token.strip_prefix(TIME_SIGNATURE_MARKER) {
            return self.set_time_signature(value);
        }
        if token.contains('/') {
            return self.set_time_signature(token);
        }

        let mut body = token;
        if let Some(rest) = body.strip_prefix(TRIPLET_OPEN) {
            if self.in_triplet {
                return Err(self.invalid(token));
            }
            self.in_triplet = true;
            body = rest;
        }
        let closes_triplet = body.ends_with('}');
        if closes_triplet {
            if !self.in_triplet {
                return Err(self.invalid(token));
            }
            body = &body[..body.len() - 1];
        }

        // Lyrics and ties carry no timing or pitch information.
        let body = body.split('_').next().unwrap_or_default();
        let body = body.trim_end_matches('~');
        if !body.is_empty() {
            self.read_event(body, token)?;
        }

        if closes_triplet {
            self.in_triplet = false;
        }
        Ok(())
    }

    /// Reads a note or a rest and appends it to the melody.
    fn read_event(&mut self, body: &str, token: &str) -> Result<(), NotationError> {
        let chars: Vec<char> = body.chars().collect();
        let mut i = 0;

        let pitch = if chars[0] == 'r' {
            i += 1;
            None
        } else {
            let natural = NaturalNote::from_char(chars[0]).ok_or_else(|| self.invalid(token))?;
            let letter = chars[0];
            let mut repeats = 0;
            while i < chars.len() && chars[i] == letter {
                repeats += 1;
                i += 1;
            }
            let octave = if letter.is_ascii_lowercase() {
                3 + repeats
            } else {
                4 - repeats
            };

            let mut accidental = Accidental::Natural;
            let mut alter = 0;
            while i < chars.len() && matches!(chars[i], '#' | '-' | 'n') {
                match chars[i] {
                    '#' => alter += 1,
                    '-' => alter -= 1,
                    _ => {}
                }
                i += 1;
            }
            if alter != 0 {
                accidental = Accidental::from_alter(alter).ok_or_else(|| self.invalid(token))?;
            }
            Some(Pitch::new(natural, accidental, octave))
        };

        let digits: String = chars[i..].iter().take_while(|c| c.is_ascii_digit()).collect();
        i += digits.len();
        let dots = chars[i..].iter().take_while(|c| **c == '.').count();
        i += dots;
        if i != chars.len() || dots > MAX_DOTS {
            return Err(self.invalid(token));
        }

        let mut duration = if digits.is_empty() {
            self.last_duration
        } else {
            let value: u32 = digits.parse().map_err(|_| self.invalid(token))?;
            if !value.is_power_of_two() || value > 64 {
                return Err(self.invalid(token));
            }
            let base = Ratio::new(4, value);
            self.last_duration = base;
            base
        };
        let mut addition = duration;
        for _ in 0..dots {
            addition /= 2;
            duration += addition;
        }
        if self.in_triplet {
            duration = duration * Ratio::new(2, 3);
        }

        let offset = self.offset;
        self.events.push(match pitch {
            Some(pitch) => NoteOrRest::Note(NoteEvent {
                pitch,
                offset,
                duration,
            }),
            None => NoteOrRest::Rest(Rest { offset, duration }),
        });
        self.offset += duration;
        Ok(())
    }
}

/// Parses one line of a compact collection.
pub fn parse_line(line: &str) -> Result<ParsedEntry, NotationError> {
    let line = line.trim();
    let mut fields: Vec<&str> = line.split('|').collect();
    let melody = fields.pop().unwrap_or_default();

    let mut key: Option<Note> = None;
    let mut time_signature: Option<TimeSignature> = None;
    for field in fields {
        let field = field.trim();
        if field.starts_with(INDEX_MARKER) {
            continue;
        } else if let Some(value) = field.strip_prefix(KEY_MARKER) {
            if key.is_some() {
                return Err(NotationError::DuplicateMarker {
                    source_name: line.to_string(),
                    marker: "key",
                });
            }
            key = Some(value.parse()?);
        } else if let Some(value) = field.strip_prefix(TIME_SIGNATURE_MARKER) {
            if time_signature.is_some() {
                return Err(NotationError::DuplicateMarker {
                    source_name: line.to_string(),
                    marker: "time signature",
                });
            }
            time_signature = Some(value.parse()?);
        } else {
            return Err(NotationError::InvalidToken {
                source_name: line.to_string(),
                token: field.to_string(),
            });
        }
    }

    let mut reader = MelodyReader::new(line, time_signature);
    for token in melody.split_whitespace() {
        reader.read_token(token)?;
    }
    if reader.in_triplet {
        return Err(reader.invalid(TRIPLET_OPEN));
    }
    if reader.events.is_empty() {
        return Err(NotationError::Empty(line.to_string()));
    }

    Ok(ParsedEntry {
        tempo: None,
        time_signature: reader.time_signature.unwrap_or_default(),
        key: key.unwrap_or(Note::C),
        events: reader.events,
    })
}

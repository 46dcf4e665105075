//! Parses single-tune files written in ABC notation.
//!
//! The supported subset covers what is needed to read monophonic melodies:
//! - Header fields `X:`, `T:`, `M:`, `L:`, `Q:`, and `K:`. The `K:` field ends the header. Other
//!   fields are ignored.
//! - Notes with accidentals (`^`, `^^`, `_`, `__`, `=`), octave marks (`,` and `'`), and length
//!   multipliers (`2`, `3/2`, `/`, `//`, `/4`).
//! - Rests (`z`, `x`) and multi-measure rests (`Z`, `X`).
//! - Bar lines, which reset the accidentals carried through the bar.
//! - Broken rhythm (`>`, `<`) and tuplets (`(3`, `(p:q:r`).
//! - Chords, of which only the first note is kept.
//! - Decorations, chord symbols, annotations, grace notes, slurs, and ties, which are skipped.
//!
//! A tune must contain exactly one meter (`M:`), one tempo (`Q:`), and one key (`K:`). Fields
//! found in the body and inline fields count towards these totals, so a tune changing its meter
//! or key halfway is rejected rather than merged.

use std::collections::HashMap;

use num_rational::Ratio;

use crate::{
    data::{
        music::notes::{Accidental, NaturalNote, Note, Pitch},
        Beats, NoteEvent, NoteOrRest, ParsedEntry, Rest, TimeSignature,
    },
    error::NotationError,
};

/// The name of the meter marker used in error messages.
const METER: &str = "time signature";

/// The name of the tempo marker used in error messages.
const TEMPO: &str = "tempo";

/// The name of the key marker used in error messages.
const KEY: &str = "key";

/// The largest multiplier or divisor accepted in a note length, a unit length, or a count of
/// measures.
const MAX_LENGTH_FACTOR: u32 = 256;

/// The largest number of notes in a tuplet.
const MAX_TUPLET: u32 = 9;

/// The largest number of markers in a broken rhythm, as in `a>>>b`.
const MAX_BROKEN_RHYTHM: u32 = 3;

/// The largest tempo accepted, in beats per minute.
const MAX_BPM: u32 = 1000;

/// Returns the number of fifths that a mode moves the key signature away from the major key on
/// the same tonic.
fn mode_offset(mode: &str) -> Option<i32> {
    let mode = mode.to_ascii_lowercase();
    let prefix: String = mode.chars().take(3).collect();
    match prefix.as_str() {
        "" | "maj" | "ion" => Some(0),
        "m" | "min" | "aeo" => Some(-3),
        "mix" => Some(-1),
        "dor" => Some(-2),
        "phr" => Some(-4),
        "lyd" => Some(1),
        "loc" => Some(-5),
        _ => None,
    }
}

/// Parses the value of a `K:` field and returns the number of sharps (positive) or flats
/// (negative) in its key signature.
fn parse_key(value: &str) -> Result<i32, NotationError> {
    let invalid = || NotationError::InvalidKey(value.to_string());
    let mut words = value.split_whitespace();
    let first = words.next().ok_or_else(invalid)?;

    let mut chars = first.chars();
    let natural = chars
        .next()
        .filter(char::is_ascii_uppercase)
        .and_then(NaturalNote::from_char)
        .ok_or_else(invalid)?;
    let rest = chars.as_str();
    let (accidental, mode) = if let Some(mode) = rest.strip_prefix('#') {
        (Accidental::Sharp, mode)
    } else if let Some(mode) = rest.strip_prefix('b') {
        (Accidental::Flat, mode)
    } else {
        (Accidental::Natural, rest)
    };

    // The mode can be attached to the tonic or given as the next word.
    let mode = if mode.is_empty() {
        words
            .next()
            .filter(|word| !word.contains('='))
            .unwrap_or_default()
    } else {
        mode
    };
    let offset = mode_offset(mode).ok_or_else(invalid)?;
    let fifths = Note(natural, accidental).fifths() + offset;
    if !(-7..=7).contains(&fifths) {
        return Err(invalid());
    }
    Ok(fifths)
}

/// Parses the value of an `M:` field.
fn parse_meter(value: &str) -> Result<TimeSignature, NotationError> {
    let value = value.trim();
    match value {
        "C" => Ok(TimeSignature::default()),
        "C|" => Ok(TimeSignature {
            numerator: 2,
            denominator: 2,
        }),
        _ => {
            // Additive meters such as 2+3/8 are reduced to their total.
            let invalid = || NotationError::InvalidTimeSignature(value.to_string());
            let (numerators, denominator) = value.split_once('/').ok_or_else(invalid)?;
            let numerator = numerators
                .trim_matches(|c| c == '(' || c == ')')
                .split('+')
                .try_fold(0u32, |total, n| {
                    let n: u32 = n.trim().parse().map_err(|_| invalid())?;
                    total.checked_add(n).ok_or_else(invalid)
                })?;
            format!("{numerator}/{denominator}").parse()
        }
    }
}

/// Parses a fraction such as `1/8` into a length in quarter notes. The denominator must be a
/// power of two.
fn parse_fraction(value: &str) -> Option<Beats> {
    let (numerator, denominator) = value.trim().split_once('/')?;
    let numerator: u32 = numerator.trim().parse().ok()?;
    let denominator: u32 = denominator.trim().parse().ok()?;
    if !(1..=MAX_LENGTH_FACTOR).contains(&numerator)
        || !denominator.is_power_of_two()
        || denominator > MAX_LENGTH_FACTOR
    {
        return None;
    }
    Some(Ratio::new(4 * numerator, denominator))
}

/// Parses the value of a `Q:` field into quarter notes per minute. A bare number is read as
/// quarter notes per minute, and `3/8=80` as eighty dotted quarter notes per minute.
fn parse_tempo(value: &str) -> Result<u32, NotationError> {
    let invalid = || NotationError::InvalidTempo(value.to_string());

    // Drop any text in quotes, such as "Allegro".
    let unquoted: String = value
        .split('"')
        .enumerate()
        .filter(|(i, _)| i % 2 == 0)
        .map(|(_, part)| part)
        .collect();
    let unquoted = unquoted.trim();

    let (beat, bpm) = match unquoted.split_once('=') {
        Some((unit, bpm)) => (
            unit.split_whitespace()
                .map(|u| parse_fraction(u).ok_or_else(invalid))
                .sum::<Result<Beats, NotationError>>()?,
            bpm,
        ),
        None => (Ratio::from_integer(1), unquoted),
    };
    let bpm: u32 = bpm.trim().parse().map_err(|_| invalid())?;
    if bpm > MAX_BPM {
        return Err(invalid());
    }
    let quarter_bpm = (beat * bpm).round().to_integer();
    if quarter_bpm == 0 {
        return Err(invalid());
    }
    Ok(quarter_bpm)
}

/// Splits a line into a field name and value if the line is a field such as `K:G`.
fn field(line: &str) -> Option<(char, &str)> {
    let mut chars = line.chars();
    let name = chars.next().filter(char::is_ascii_alphabetic)?;
    let value = chars.as_str().strip_prefix(':')?;
    Some((name, value))
}

/// Reads the tune, keeping track of the markers found and of the running state of the melody.
struct TuneReader<'a> {
    /// The name of the source, used in error messages.
    source_name: &'a str,

    /// The meter markers found so far.
    meters: Vec<TimeSignature>,

    /// The tempo markers found so far.
    tempos: Vec<u32>,

    /// The key signatures found so far, as a number of sharps or flats.
    keys: Vec<i32>,

    /// The unit note length given by the `L:` field, if any.
    unit_length: Option<Beats>,

    /// The accidentals written earlier in the current bar.
    bar_accidentals: HashMap<(NaturalNote, i32), Accidental>,

    /// The factor applied to the next note by a broken rhythm marker.
    broken_factor: Option<Beats>,

    /// The number of notes left in the current tuplet and the factor applied to them.
    tuplet: Option<(u32, Beats)>,

    /// The position of the next event.
    offset: Beats,

    /// The events read so far.
    events: Vec<NoteOrRest>,
}

impl<'a> TuneReader<'a> {
    fn new(source_name: &'a str) -> Self {
        TuneReader {
            source_name,
            meters: Vec::new(),
            tempos: Vec::new(),
            keys: Vec::new(),
            unit_length: None,
            bar_accidentals: HashMap::new(),
            broken_factor: None,
            tuplet: None,
            offset: Ratio::from_integer(0),
            events: Vec::new(),
        }
    }

    fn duplicate(&self, marker: &'static str) -> NotationError {
        NotationError::DuplicateMarker {
            source_name: self.source_name.to_string(),
            marker,
        }
    }

    fn invalid(&self, token: impl Into<String>) -> NotationError {
        NotationError::InvalidToken {
            source_name: self.source_name.to_string(),
            token: token.into(),
        }
    }

    /// Returns the unit note length, derived from the meter when no `L:` field was given.
    fn unit(&self) -> Beats {
        if let Some(unit) = self.unit_length {
            return unit;
        }
        match self.meters.first() {
            Some(meter) if meter.measure_length() < Ratio::from_integer(3) => Ratio::new(1, 4),
            _ => Ratio::new(1, 2),
        }
    }

    /// Returns the key signature in effect.
    fn key_fifths(&self) -> i32 {
        self.keys.first().copied().unwrap_or_default()
    }

    /// Applies a field found in the header, in the body, or inline.
    fn apply_field(&mut self, name: char, value: &str) -> Result<(), NotationError> {
        match name {
            'M' => {
                if !self.meters.is_empty() {
                    return Err(self.duplicate(METER));
                }
                self.meters.push(parse_meter(value)?);
            }
            'Q' => {
                if !self.tempos.is_empty() {
                    return Err(self.duplicate(TEMPO));
                }
                self.tempos.push(parse_tempo(value)?);
            }
            'K' => {
                if !self.keys.is_empty() {
                    return Err(self.duplicate(KEY));
                }
                self.keys.push(parse_key(value)?);
            }
            'L' => {
                let unit = parse_fraction(value)
                    .ok_or_else(|| self.invalid(format!("L:{value}")))?;
                self.unit_length = Some(unit);
            }
            _ => {}
        }
        Ok(())
    }

    /// Reads an optional length multiplier such as `3`, `/`, `3/2`, or `//`. Multipliers and
    /// divisors of zero or above the supported range are rejected.
    fn read_length(&self, chars: &[char], i: &mut usize) -> Result<Beats, NotationError> {
        // Returns the number at the position, the default if there is none, or `None` if it is
        // out of range.
        let number = |i: &mut usize, default: u32| -> Option<u32> {
            let start = *i;
            while *i < chars.len() && chars[*i].is_ascii_digit() {
                *i += 1;
            }
            if start == *i {
                return Some(default);
            }
            chars[start..*i]
                .iter()
                .collect::<String>()
                .parse()
                .ok()
                .filter(|value| (1..=MAX_LENGTH_FACTOR).contains(value))
        };

        let start = *i;
        let numerator = number(i, 1);
        let mut denominator = Some(1u32);
        while *i < chars.len() && chars[*i] == '/' {
            *i += 1;
            denominator = denominator
                .zip(number(i, 2))
                .and_then(|(total, value)| total.checked_mul(value))
                .filter(|total| *total <= MAX_LENGTH_FACTOR);
        }
        match (numerator, denominator) {
            (Some(numerator), Some(denominator)) => Ok(Ratio::new(numerator, denominator)),
            _ => Err(self.invalid(chars[start..*i].iter().collect::<String>())),
        }
    }

    /// Reads a note starting at `i` and returns its pitch and length multiplier.
    fn read_note(
        &mut self,
        chars: &[char],
        i: &mut usize,
    ) -> Result<(Pitch, Beats), NotationError> {
        let mut written: Option<i32> = None;
        while *i < chars.len() && matches!(chars[*i], '^' | '_' | '=') {
            let alter = match chars[*i] {
                '^' => 1,
                '_' => -1,
                _ => 0,
            };
            written = Some(written.unwrap_or_default() + alter);
            *i += 1;
        }

        let letter = *chars.get(*i).ok_or_else(|| self.invalid("accidental"))?;
        let natural = NaturalNote::from_char(letter).ok_or_else(|| self.invalid(letter))?;
        *i += 1;
        let mut octave = if letter.is_ascii_uppercase() { 4 } else { 5 };
        while *i < chars.len() && matches!(chars[*i], ',' | '\'') {
            octave += if chars[*i] == ',' { -1 } else { 1 };
            *i += 1;
        }

        let accidental = match written {
            Some(alter) => {
                let accidental =
                    Accidental::from_alter(alter).ok_or_else(|| self.invalid("accidental"))?;
                self.bar_accidentals.insert((natural, octave), accidental);
                accidental
            }
            None => match self.bar_accidentals.get(&(natural, octave)) {
                Some(accidental) => *accidental,
                None => Note::signature_accidental(self.key_fifths(), natural),
            },
        };

        let multiplier = self.read_length(chars, i)?;
        Ok((Pitch::new(natural, accidental, octave), multiplier))
    }

    /// Appends an event with the given multiplier of the unit length, applying any pending
    /// broken rhythm or tuplet.
    fn push_event(&mut self, pitch: Option<Pitch>, multiplier: Beats) {
        let mut duration = self.unit() * multiplier;
        if let Some(factor) = self.broken_factor.take() {
            duration *= factor;
        }
        if let Some((remaining, factor)) = self.tuplet {
            duration *= factor;
            self.tuplet = if remaining > 1 {
                Some((remaining - 1, factor))
            } else {
                None
            };
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
    }

    /// Lengthens or shortens the last event for a broken rhythm marker and records the factor
    /// for the next one.
    fn apply_broken_rhythm(&mut self, marker: char, count: u32) -> Result<(), NotationError> {
        if count > MAX_BROKEN_RHYTHM {
            return Err(self.invalid(marker.to_string().repeat(count as usize)));
        }
        let shift = Ratio::new(1, 2u32.pow(count));
        let (first, second) = if marker == '>' {
            (Ratio::from_integer(2) - shift, shift)
        } else {
            (shift, Ratio::from_integer(2) - shift)
        };

        let last = self
            .events
            .pop()
            .ok_or_else(|| self.invalid(marker.to_string()))?;
        let duration = last.duration() * first;
        self.events.push(match last {
            NoteOrRest::Note(note) => NoteOrRest::Note(NoteEvent { duration, ..note }),
            NoteOrRest::Rest(rest) => NoteOrRest::Rest(Rest { duration, ..rest }),
        });
        self.offset = last.offset() + duration;
        self.broken_factor = Some(second);
        Ok(())
    }

    /// Reads a tuplet marker such as `(3` or `(3:2:3`, starting after the parenthesis.
    fn read_tuplet(&mut self, chars: &[char], i: &mut usize) -> Result<(), NotationError> {
        // Returns the number at the position, the default if there is none, or `None` if it is
        // out of range.
        let number = |i: &mut usize, default: u32| -> Option<u32> {
            let start = *i;
            while *i < chars.len() && chars[*i].is_ascii_digit() {
                *i += 1;
            }
            if start == *i {
                return Some(default);
            }
            chars[start..*i]
                .iter()
                .collect::<String>()
                .parse()
                .ok()
                .filter(|value| (1..=MAX_TUPLET).contains(value))
        };

        let start = *i;
        let p = number(i, 3);
        let default_q = match p {
            Some(2 | 4 | 8) => 3,
            _ => 2,
        };
        let mut q = Some(default_q);
        let mut r = p;
        if *i < chars.len() && chars[*i] == ':' {
            *i += 1;
            q = number(i, default_q);
            if *i < chars.len() && chars[*i] == ':' {
                *i += 1;
                r = number(i, p.unwrap_or(3));
            }
        }

        match (p, q, r) {
            (Some(p), Some(q), Some(r)) => {
                self.tuplet = Some((r, Ratio::new(q, p)));
                Ok(())
            }
            _ => {
                let marker: String = chars[start..*i].iter().collect();
                Err(self.invalid(format!("({marker}")))
            }
        }
    }

    /// Skips characters until the closing delimiter, which is consumed too.
    fn skip_until(
        &self,
        chars: &[char],
        i: &mut usize,
        close: char,
    ) -> Result<(), NotationError> {
        while *i < chars.len() && chars[*i] != close {
            *i += 1;
        }
        if *i == chars.len() {
            return Err(self.invalid(close.to_string()));
        }
        *i += 1;
        Ok(())
    }

    /// Reads a bracketed construct starting after the opening bracket: an inline field, a repeat
    /// ending, or a chord.
    fn read_bracket(&mut self, chars: &[char], i: &mut usize) -> Result<(), NotationError> {
        if *i + 1 < chars.len() && chars[*i].is_ascii_alphabetic() && chars[*i + 1] == ':' {
            let start = *i;
            self.skip_until(chars, i, ']')?;
            let inline: String = chars[start..*i - 1].iter().collect();
            if let Some((name, value)) = field(&inline) {
                self.apply_field(name, value)?;
            }
            return Ok(());
        }
        if *i < chars.len() && (chars[*i].is_ascii_digit() || chars[*i] == '|') {
            while *i < chars.len() && (chars[*i].is_ascii_digit() || chars[*i] == '|') {
                *i += 1;
            }
            self.bar_accidentals.clear();
            return Ok(());
        }

        // Only the first note of a chord is kept.
        let mut first: Option<(Pitch, Beats)> = None;
        while *i < chars.len() && chars[*i] != ']' {
            match chars[*i] {
                '^' | '_' | '=' | 'A'..='G' | 'a'..='g' => {
                    let note = self.read_note(chars, i)?;
                    first.get_or_insert(note);
                }
                _ => *i += 1,
            }
        }
        if *i == chars.len() {
            return Err(self.invalid("["));
        }
        *i += 1;
        let (pitch, multiplier) = first.ok_or_else(|| self.invalid("[]"))?;
        let chord_multiplier = self.read_length(chars, i)?;
        self.push_event(Some(pitch), multiplier * chord_multiplier);
        Ok(())
    }

    /// Reads one line of music.
    fn read_music(&mut self, line: &str) -> Result<(), NotationError> {
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            match c {
                '|' | ':' => {
                    i += 1;
                    // Digits after a bar line number a repeat ending.
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    self.bar_accidentals.clear();
                }
                '[' => {
                    i += 1;
                    self.read_bracket(&chars, &mut i)?;
                }
                '"' | '!' | '+' => {
                    i += 1;
                    self.skip_until(&chars, &mut i, c)?;
                }
                '{' => {
                    i += 1;
                    self.skip_until(&chars, &mut i, '}')?;
                }
                '(' => {
                    i += 1;
                    if i < chars.len() && chars[i].is_ascii_digit() {
                        self.read_tuplet(&chars, &mut i)?;
                    }
                }
                '>' | '<' => {
                    let mut count = 0;
                    while i < chars.len() && chars[i] == c {
                        count += 1;
                        i += 1;
                    }
                    self.apply_broken_rhythm(c, count)?;
                }
                '^' | '_' | '=' | 'A'..='G' | 'a'..='g' => {
                    let (pitch, multiplier) = self.read_note(&chars, &mut i)?;
                    self.push_event(Some(pitch), multiplier);
                }
                'z' | 'x' => {
                    i += 1;
                    let multiplier = self.read_length(&chars, &mut i)?;
                    self.push_event(None, multiplier);
                }
                'Z' | 'X' => {
                    i += 1;
                    let start = i;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    let digits: String = chars[start..i].iter().collect();
                    let measures = if digits.is_empty() {
                        Some(1)
                    } else {
                        digits
                            .parse::<u32>()
                            .ok()
                            .filter(|measures| (1..=MAX_LENGTH_FACTOR).contains(measures))
                    };
                    let measures = measures.ok_or_else(|| self.invalid(format!("{c}{digits}")))?;
                    let measure = self.meters.first().copied().unwrap_or_default();
                    let multiplier = measure.measure_length() * measures / self.unit();
                    self.push_event(None, multiplier);
                }
                ')' | ']' | '-' | '.' | '~' | '`' | '\\' | 'y' | 'H' | 'L' | 'M' | 'O' | 'P'
                | 'S' | 'T' | 'u' | 'v' => i += 1,
                c if c.is_whitespace() => i += 1,
                c => return Err(self.invalid(c)),
            }
        }
        Ok(())
    }
}

/// Parses a tune written in ABC notation. The name of the source is used in error messages.
pub fn parse_tune(source: &str, source_name: &str) -> Result<ParsedEntry, NotationError> {
    let mut reader = TuneReader::new(source_name);
    let mut in_body = false;

    for line in source.lines() {
        // Everything after a percent sign is a comment or a directive.
        let line = line.split('%').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        if let Some((name, value)) = field(line) {
            reader.apply_field(name, value)?;
            if name == 'K' {
                in_body = true;
            }
            continue;
        }
        if !in_body {
            return Err(reader.invalid(line));
        }
        reader.read_music(line)?;
    }

    let missing = |marker: &'static str| NotationError::MissingMarker {
        source_name: source_name.to_string(),
        marker,
    };
    let time_signature = *reader.meters.first().ok_or_else(|| missing(METER))?;
    let tempo = *reader.tempos.first().ok_or_else(|| missing(TEMPO))?;
    let fifths = *reader.keys.first().ok_or_else(|| missing(KEY))?;
    let key = Note::major_key_with_fifths(fifths)
        .ok_or_else(|| NotationError::InvalidKey(fifths.to_string()))?;
    if reader.events.is_empty() {
        return Err(NotationError::Empty(source_name.to_string()));
    }

    Ok(ParsedEntry {
        tempo: Some(tempo),
        time_signature,
        key,
        events: reader.events,
    })
}

#[cfg(test)]
mod test {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    fn beats(numer: u32, denom: u32) -> Beats {
        Ratio::new(numer, denom)
    }

    fn names(entry: &ParsedEntry) -> Vec<String> {
        entry
            .events
            .iter()
            .map(|e| match e.pitch() {
                Some(p) => p.to_string(),
                None => "z".to_string(),
            })
            .collect()
    }

    fn durations(entry: &ParsedEntry) -> Vec<Beats> {
        entry.events.iter().map(NoteOrRest::duration).collect()
    }

    /// Verifies parsing a simple tune with a key signature.
    #[test]
    fn simple_tune() -> Result<(), NotationError> {
        let source = indoc! {"
            X:1
            T:Simple
            M:3/4
            L:1/8
            Q:1/4=90
            K:G
            GABc d2 | e2 f2 g2 |]
        "};
        let entry = parse_tune(source, "simple.abc")?;
        assert_eq!(entry.key, Note::G);
        assert_eq!(entry.tempo, Some(90));
        assert_eq!(
            entry.time_signature,
            TimeSignature {
                numerator: 3,
                denominator: 4
            }
        );
        assert_eq!(
            names(&entry),
            vec!["G4", "A4", "B4", "C5", "D5", "E5", "F#5", "G5"]
        );
        assert_eq!(entry.events[4].offset(), beats(2, 1));
        assert_eq!(entry.events.last().unwrap().end(), beats(6, 1));
        Ok(())
    }

    /// Verifies that accidentals carry through the bar and are reset by bar lines.
    #[test]
    fn bar_accidentals() -> Result<(), NotationError> {
        let source = indoc! {"
            M:4/4
            L:1/4
            Q:100
            K:F
            ^c c B =B | c B _e' e,
        "};
        let entry = parse_tune(source, "accidentals.abc")?;
        assert_eq!(
            names(&entry),
            vec!["C#5", "C#5", "B-4", "B4", "C5", "B-4", "E-6", "E4"]
        );
        Ok(())
    }

    /// Verifies lengths, rests, broken rhythm, tuplets, and chords.
    #[test]
    fn rhythms() -> Result<(), NotationError> {
        let source = indoc! {r#"
            M:6/8
            Q:3/8=60
            K:Am
            "Am"A3/2 B/ z c>d (3efg [ceg]2 !trill!a// Z
        "#};
        let entry = parse_tune(source, "rhythms.abc")?;
        assert_eq!(entry.key, Note::C);
        assert_eq!(entry.tempo, Some(90));
        assert_eq!(
            names(&entry),
            vec!["A4", "B4", "z", "C5", "D5", "E5", "F5", "G5", "C5", "A5", "z"]
        );
        assert_eq!(
            durations(&entry),
            vec![
                beats(3, 4),
                beats(1, 4),
                beats(1, 2),
                beats(3, 4),
                beats(1, 4),
                beats(1, 3),
                beats(1, 3),
                beats(1, 3),
                beats(1, 1),
                beats(1, 8),
                beats(3, 1),
            ]
        );
        Ok(())
    }

    /// Verifies the default unit length for short meters.
    #[test]
    fn default_unit_length() -> Result<(), NotationError> {
        let source = "M:2/4\nQ:80\nK:D\nd e\n";
        let entry = parse_tune(source, "short.abc")?;
        assert_eq!(durations(&entry), vec![beats(1, 4), beats(1, 4)]);
        assert_eq!(names(&entry), vec!["D5", "E5"]);
        Ok(())
    }

    /// Verifies that the key of a minor or modal tune is the major key with the same signature.
    #[test]
    fn modal_keys() {
        assert_eq!(parse_key("G").unwrap(), 1);
        assert_eq!(parse_key("Em").unwrap(), 1);
        assert_eq!(parse_key("E minor").unwrap(), 1);
        assert_eq!(parse_key("D dor").unwrap(), 0);
        assert_eq!(parse_key("Bb").unwrap(), -2);
        assert_eq!(parse_key("F#m").unwrap(), 3);
        assert_eq!(parse_key("A clef=treble").unwrap(), 3);
        assert!(parse_key("H").is_err());
        assert!(parse_key("C#dor").is_ok());
        assert!(parse_key("Cbm").is_err());
    }

    /// Verifies parsing tempo markings.
    #[test]
    fn tempos() {
        assert_eq!(parse_tempo("120").unwrap(), 120);
        assert_eq!(parse_tempo("1/4=100").unwrap(), 100);
        assert_eq!(parse_tempo("1/2=60").unwrap(), 120);
        assert_eq!(parse_tempo("\"Allegro\" 1/4=132").unwrap(), 132);
        assert!(parse_tempo("fast").is_err());
    }

    /// Verifies parsing meters.
    #[test]
    fn meters() {
        assert_eq!(parse_meter("C").unwrap(), TimeSignature::default());
        assert_eq!(
            parse_meter("C|").unwrap(),
            TimeSignature {
                numerator: 2,
                denominator: 2
            }
        );
        assert_eq!(
            parse_meter("2+3/8").unwrap(),
            TimeSignature {
                numerator: 5,
                denominator: 8
            }
        );
        assert!(parse_meter("none").is_err());
    }

    /// Verifies that tunes with more than one meter, tempo, or key are rejected.
    #[test]
    fn duplicate_markers() {
        let two_meters = "M:3/4\nQ:80\nK:C\nCDE|\nM:4/4\nCDEF|\n";
        assert!(matches!(
            parse_tune(two_meters, "meters.abc"),
            Err(NotationError::DuplicateMarker { marker: METER, .. })
        ));

        let two_keys = "M:3/4\nQ:80\nK:C\nCDE|[K:G]GAB|\n";
        assert!(matches!(
            parse_tune(two_keys, "keys.abc"),
            Err(NotationError::DuplicateMarker { marker: KEY, .. })
        ));

        let two_tempos = "M:3/4\nQ:80\nQ:90\nK:C\nCDE|\n";
        assert!(matches!(
            parse_tune(two_tempos, "tempos.abc"),
            Err(NotationError::DuplicateMarker { marker: TEMPO, .. })
        ));
    }

    /// Verifies that tunes missing a meter, tempo, or key are rejected.
    #[test]
    fn missing_markers() {
        assert!(matches!(
            parse_tune("Q:80\nK:C\nCDE\n", "no_meter.abc"),
            Err(NotationError::MissingMarker { marker: METER, .. })
        ));
        assert!(matches!(
            parse_tune("M:3/4\nK:C\nCDE\n", "no_tempo.abc"),
            Err(NotationError::MissingMarker { marker: TEMPO, .. })
        ));
        assert!(matches!(
            parse_tune("M:3/4\nQ:80\nCDE\n", "no_key.abc"),
            Err(NotationError::InvalidToken { .. })
        ));
        assert!(matches!(
            parse_tune("M:3/4\nQ:80\nK:C\n", "empty.abc"),
            Err(NotationError::Empty(_))
        ));
    }

    /// Verifies that lengths, rests, tuplets, and broken rhythms beyond the supported range are
    /// rejected instead of overflowing.
    #[test]
    fn oversized_lengths() -> Result<(), NotationError> {
        let header = "X:1\nM:4/4\nQ:1/4=80\nL:1/8\nK:C\n";
        for body in [
            "A/65536/65536 B|",
            "A/256/2 B|",
            "A4294967296 B|",
            "A0 B|",
            "[CEG]/512 B|",
            "z/65536|",
            "Z4294967295|",
            "Z1000|",
            "(99abc|",
            "a>>>>b|",
        ] {
            let result = parse_tune(&format!("{header}{body}\n"), "long.abc");
            assert!(
                matches!(result, Err(NotationError::InvalidToken { .. })),
                "{body}"
            );
        }

        assert!(matches!(
            parse_tune("M:4000000000+4000000000/8\nQ:80\nK:C\nC\n", "meter.abc"),
            Err(NotationError::InvalidTimeSignature(_))
        ));
        assert!(matches!(
            parse_tune("M:4/4\nQ:1/4=4000000000\nK:C\nC\n", "tempo.abc"),
            Err(NotationError::InvalidTempo(_))
        ));
        assert!(matches!(
            parse_tune("M:4/4\nL:1/4294967295\nQ:80\nK:C\nC\n", "unit.abc"),
            Err(NotationError::InvalidToken { .. })
        ));

        let entry = parse_tune(&format!("{header}A/256 Z256|\n"), "long.abc")?;
        assert_eq!(durations(&entry), vec![beats(1, 512), beats(1024, 1)]);
        Ok(())
    }

    /// Verifies that unknown symbols are rejected.
    #[test]
    fn invalid_symbols() {
        assert!(matches!(
            parse_tune("M:3/4\nQ:80\nK:C\nC D & E\n", "bad.abc"),
            Err(NotationError::InvalidToken { .. })
        ));
        assert!(matches!(
            parse_tune("M:3/4\nQ:80\nK:C\n\"unterminated C D\n", "bad.abc"),
            Err(NotationError::InvalidToken { .. })
        ));
    }
}

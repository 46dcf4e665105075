//! Defines the notes, accidentals, and pitches that make up the melodies used in the dictations.

use std::{fmt, str::FromStr};

use strum::Display;

use crate::error::NotationError;

/// Defines the names of the natural notes. The order of the variants follows the order of the
/// notes in the C major scale.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[allow(missing_docs)]
pub enum NaturalNote {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl NaturalNote {
    /// All the natural notes in scale order, starting from C.
    pub const ALL: [NaturalNote; 7] = [
        NaturalNote::C,
        NaturalNote::D,
        NaturalNote::E,
        NaturalNote::F,
        NaturalNote::G,
        NaturalNote::A,
        NaturalNote::B,
    ];

    /// Returns the position of the note in the C major scale (C = 0, B = 6).
    #[must_use]
    pub fn index(self) -> i32 {
        match self {
            NaturalNote::C => 0,
            NaturalNote::D => 1,
            NaturalNote::E => 2,
            NaturalNote::F => 3,
            NaturalNote::G => 4,
            NaturalNote::A => 5,
            NaturalNote::B => 6,
        }
    }

    /// Returns the natural note at the given scale position. The position wraps around the
    /// octave, so negative values and values above 6 are valid.
    #[must_use]
    pub fn from_index(index: i32) -> NaturalNote {
        Self::ALL[index.rem_euclid(7) as usize]
    }

    /// Returns the number of semitones between C and this note within the same octave.
    #[must_use]
    pub fn semitones(self) -> i32 {
        match self {
            NaturalNote::C => 0,
            NaturalNote::D => 2,
            NaturalNote::E => 4,
            NaturalNote::F => 5,
            NaturalNote::G => 7,
            NaturalNote::A => 9,
            NaturalNote::B => 11,
        }
    }

    /// Returns the position of the note in the circle of fifths relative to C (F = -1, B = 5).
    #[must_use]
    pub fn fifths(self) -> i32 {
        match self {
            NaturalNote::F => -1,
            NaturalNote::C => 0,
            NaturalNote::G => 1,
            NaturalNote::D => 2,
            NaturalNote::A => 3,
            NaturalNote::E => 4,
            NaturalNote::B => 5,
        }
    }

    /// Parses a natural note from an ASCII letter in either case.
    #[must_use]
    pub fn from_char(c: char) -> Option<NaturalNote> {
        match c.to_ascii_uppercase() {
            'C' => Some(NaturalNote::C),
            'D' => Some(NaturalNote::D),
            'E' => Some(NaturalNote::E),
            'F' => Some(NaturalNote::F),
            'G' => Some(NaturalNote::G),
            'A' => Some(NaturalNote::A),
            'B' => Some(NaturalNote::B),
            _ => None,
        }
    }
}

/// Defines the pitch accidentals that can be applied to a note.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[allow(missing_docs)]
pub enum Accidental {
    DoubleFlat,
    Flat,
    Natural,
    Sharp,
    DoubleSharp,
}

impl Accidental {
    /// Returns the number of semitones by which the accidental alters the natural note.
    #[must_use]
    pub fn alter(self) -> i32 {
        match self {
            Accidental::DoubleFlat => -2,
            Accidental::Flat => -1,
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::DoubleSharp => 2,
        }
    }

    /// Returns the accidental that alters a note by the given number of semitones, if any.
    #[must_use]
    pub fn from_alter(alter: i32) -> Option<Accidental> {
        match alter {
            -2 => Some(Accidental::DoubleFlat),
            -1 => Some(Accidental::Flat),
            0 => Some(Accidental::Natural),
            1 => Some(Accidental::Sharp),
            2 => Some(Accidental::DoubleSharp),
            _ => None,
        }
    }

    /// Returns the ASCII marker used in note names. Flats are written with `-` and sharps with
    /// `#`, so that E flat is written as `E-`.
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            Accidental::DoubleFlat => "--",
            Accidental::Flat => "-",
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::DoubleSharp => "##",
        }
    }
}

/// Defines the union of a natural note and an accidental that describes a note regardless of its
/// octave. Keys are identified by the note of their tonic.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Note(pub NaturalNote, pub Accidental);

#[allow(missing_docs)]
impl Note {
    pub const A: Note = Note(NaturalNote::A, Accidental::Natural);
    pub const A_FLAT: Note = Note(NaturalNote::A, Accidental::Flat);
    pub const A_SHARP: Note = Note(NaturalNote::A, Accidental::Sharp);
    pub const B: Note = Note(NaturalNote::B, Accidental::Natural);
    pub const B_FLAT: Note = Note(NaturalNote::B, Accidental::Flat);
    pub const C: Note = Note(NaturalNote::C, Accidental::Natural);
    pub const C_FLAT: Note = Note(NaturalNote::C, Accidental::Flat);
    pub const C_SHARP: Note = Note(NaturalNote::C, Accidental::Sharp);
    pub const D: Note = Note(NaturalNote::D, Accidental::Natural);
    pub const D_FLAT: Note = Note(NaturalNote::D, Accidental::Flat);
    pub const D_SHARP: Note = Note(NaturalNote::D, Accidental::Sharp);
    pub const E: Note = Note(NaturalNote::E, Accidental::Natural);
    pub const E_FLAT: Note = Note(NaturalNote::E, Accidental::Flat);
    pub const F: Note = Note(NaturalNote::F, Accidental::Natural);
    pub const F_SHARP: Note = Note(NaturalNote::F, Accidental::Sharp);
    pub const G: Note = Note(NaturalNote::G, Accidental::Natural);
    pub const G_FLAT: Note = Note(NaturalNote::G, Accidental::Flat);
    pub const G_SHARP: Note = Note(NaturalNote::G, Accidental::Sharp);

    /// Returns the position of the note in the circle of fifths relative to C. Sharps move the
    /// note seven fifths clockwise and flats seven fifths counter-clockwise.
    #[must_use]
    pub fn fifths(&self) -> i32 {
        self.0.fifths() + 7 * self.1.alter()
    }

    /// Returns the number of semitones between C and this note, without wrapping. C flat returns
    /// -1 and B sharp returns 12.
    #[must_use]
    pub fn semitones(&self) -> i32 {
        self.0.semitones() + self.1.alter()
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0, self.1.marker())
    }
}

impl FromStr for Note {
    type Err = NotationError;

    /// Parses a note such as `G`, `b-`, `Bb`, or `F#`. A single `b` is read as the note B, and a
    /// `b` following a letter is read as a flat.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NotationError::InvalidKey(s.to_string());
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let natural = chars
            .next()
            .and_then(NaturalNote::from_char)
            .ok_or_else(invalid)?;
        let accidental = match chars.as_str() {
            "" => Accidental::Natural,
            "-" | "b" => Accidental::Flat,
            "--" | "bb" => Accidental::DoubleFlat,
            "#" => Accidental::Sharp,
            "##" => Accidental::DoubleSharp,
            _ => return Err(invalid()),
        };
        Ok(Note(natural, accidental))
    }
}

/// A note placed in a specific octave. Octaves follow scientific pitch notation, so middle C is
/// C4 and has MIDI number 60.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Pitch {
    /// The note name of the pitch.
    pub note: Note,

    /// The octave of the pitch.
    pub octave: i32,
}

impl Pitch {
    /// Creates a new pitch.
    #[must_use]
    pub fn new(natural: NaturalNote, accidental: Accidental, octave: i32) -> Pitch {
        Pitch {
            note: Note(natural, accidental),
            octave,
        }
    }

    /// Returns the name of the pitch without its octave, for example `E-` for E flat.
    #[must_use]
    pub fn name(&self) -> String {
        self.note.to_string()
    }

    /// Returns the number of diatonic steps between C0 and this pitch, ignoring accidentals.
    #[must_use]
    pub fn diatonic_number(&self) -> i32 {
        self.octave * 7 + self.note.0.index()
    }

    /// Returns the MIDI number of the pitch. Values outside the MIDI range are possible for
    /// extreme pitches and must be clamped by the caller.
    #[must_use]
    pub fn midi(&self) -> i32 {
        (self.octave + 1) * 12 + self.note.semitones()
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.note, self.octave)
    }
}

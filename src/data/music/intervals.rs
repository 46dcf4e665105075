//! Defines the musical intervals used to transpose melodies between keys.

use crate::data::music::notes::{Accidental, NaturalNote, Note, Pitch};

/// A directed interval measured both in diatonic steps and in semitones. Keeping both quantities
/// preserves the spelling of transposed notes, so that moving E flat up a major second results in
/// F and not in E sharp.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Interval {
    /// The number of letter names spanned by the interval. Negative values go down.
    pub steps: i32,

    /// The number of semitones spanned by the interval. Negative values go down.
    pub semitones: i32,
}

impl Interval {
    /// The interval that leaves every pitch untouched.
    pub const UNISON: Interval = Interval {
        steps: 0,
        semitones: 0,
    };

    /// Returns the interval from the note `from` to the note `to`, with both notes placed in the
    /// fourth octave. Moving from G to C is therefore a perfect fifth down, while moving from C to
    /// G is a perfect fifth up.
    #[must_use]
    pub fn between(from: Note, to: Note) -> Interval {
        Interval {
            steps: to.0.index() - from.0.index(),
            semitones: to.semitones() - from.semitones(),
        }
    }
}

impl Pitch {
    /// Returns a new pitch obtained by moving this one by the given interval. If the resulting
    /// spelling would need more than two accidentals, the enharmonic equivalent with the nearest
    /// letter name is used instead.
    #[must_use]
    pub fn transpose(&self, interval: Interval) -> Pitch {
        let diatonic = self.diatonic_number() + interval.steps;
        let octave = diatonic.div_euclid(7);
        let natural = NaturalNote::from_index(diatonic);
        let target_midi = self.midi() + interval.semitones;

        let natural_midi = (octave + 1) * 12 + natural.semitones();
        if let Some(accidental) = Accidental::from_alter(target_midi - natural_midi) {
            return Pitch::new(natural, accidental, octave);
        }
        Self::respell(target_midi)
    }

    /// Spells a MIDI number with a natural note or, for black keys, with a flat.
    fn respell(midi: i32) -> Pitch {
        let octave = midi.div_euclid(12) - 1;
        let pitch_class = midi.rem_euclid(12);
        let (natural, accidental) = match pitch_class {
            0 => (NaturalNote::C, Accidental::Natural),
            1 => (NaturalNote::D, Accidental::Flat),
            2 => (NaturalNote::D, Accidental::Natural),
            3 => (NaturalNote::E, Accidental::Flat),
            4 => (NaturalNote::E, Accidental::Natural),
            5 => (NaturalNote::F, Accidental::Natural),
            6 => (NaturalNote::G, Accidental::Flat),
            7 => (NaturalNote::G, Accidental::Natural),
            8 => (NaturalNote::A, Accidental::Flat),
            9 => (NaturalNote::A, Accidental::Natural),
            10 => (NaturalNote::B, Accidental::Flat),
            _ => (NaturalNote::B, Accidental::Natural),
        };
        Pitch::new(natural, accidental, octave)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pitch(natural: NaturalNote, accidental: Accidental, octave: i32) -> Pitch {
        Pitch::new(natural, accidental, octave)
    }

    /// Verifies the intervals between key tonics.
    #[test]
    fn between() {
        assert_eq!(Interval::between(Note::C, Note::C), Interval::UNISON);
        assert_eq!(
            Interval::between(Note::G, Note::C),
            Interval {
                steps: -4,
                semitones: -7
            }
        );
        assert_eq!(
            Interval::between(Note::C, Note::E_FLAT),
            Interval {
                steps: 2,
                semitones: 3
            }
        );
    }

    /// Verifies that transposing from G to C moves every note a perfect fifth down and keeps the
    /// spelling expected in the new key.
    #[test]
    fn transpose_g_to_c() {
        let interval = Interval::between(Note::G, Note::C);
        let moved = pitch(NaturalNote::F, Accidental::Sharp, 4).transpose(interval);
        assert_eq!(moved, pitch(NaturalNote::B, Accidental::Natural, 3));

        let moved = pitch(NaturalNote::F, Accidental::Natural, 4).transpose(interval);
        assert_eq!(moved, pitch(NaturalNote::B, Accidental::Flat, 3));

        let moved = pitch(NaturalNote::C, Accidental::Natural, 5).transpose(interval);
        assert_eq!(moved, pitch(NaturalNote::F, Accidental::Natural, 4));
    }

    /// Verifies transposition into a flat key.
    #[test]
    fn transpose_c_to_e_flat() {
        let interval = Interval::between(Note::C, Note::E_FLAT);
        let moved = pitch(NaturalNote::E, Accidental::Natural, 4).transpose(interval);
        assert_eq!(moved, pitch(NaturalNote::G, Accidental::Natural, 4));

        let moved = pitch(NaturalNote::A, Accidental::Natural, 4).transpose(interval);
        assert_eq!(moved, pitch(NaturalNote::C, Accidental::Natural, 5));

        let moved = pitch(NaturalNote::B, Accidental::Natural, 4).transpose(interval);
        assert_eq!(moved, pitch(NaturalNote::D, Accidental::Natural, 5));
    }

    /// Verifies that spellings needing triple accidentals are replaced by a simpler equivalent.
    #[test]
    fn transpose_respells_extremes() {
        let interval = Interval::between(Note::C, Note::G_FLAT);
        let moved = pitch(NaturalNote::F, Accidental::Flat, 4).transpose(interval);
        // C flat flat (two flats) is representable.
        assert_eq!(moved, pitch(NaturalNote::C, Accidental::DoubleFlat, 5));

        let interval = Interval::between(Note::C, Note::C_FLAT);
        let moved = pitch(NaturalNote::F, Accidental::DoubleFlat, 4).transpose(interval);
        assert_eq!(moved.midi(), pitch(NaturalNote::F, Accidental::DoubleFlat, 4).midi() - 1);
        assert_eq!(moved, pitch(NaturalNote::D, Accidental::Natural, 4));
    }

    /// Verifies that transposition across the octave boundary updates the octave.
    #[test]
    fn transpose_octave_boundary() {
        let interval = Interval::between(Note::C, Note::D);
        let moved = pitch(NaturalNote::B, Accidental::Natural, 3).transpose(interval);
        assert_eq!(moved, pitch(NaturalNote::C, Accidental::Sharp, 4));
    }
}

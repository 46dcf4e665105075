//! Contains the circle of fifths, used to pick training keys and to derive key signatures.

use crate::data::music::notes::{Accidental, NaturalNote, Note};

/// The order in which sharps are added to a key signature.
const SHARP_ORDER: [NaturalNote; 7] = [
    NaturalNote::F,
    NaturalNote::C,
    NaturalNote::G,
    NaturalNote::D,
    NaturalNote::A,
    NaturalNote::E,
    NaturalNote::B,
];

impl Note {
    /// Returns the tonics of all the major keys in the circle of fifths.
    #[must_use]
    pub fn all_keys() -> Vec<Note> {
        vec![
            // Key with no sharps or flats.
            Note::C,

            // Keys with at least one sharp.
            Note::G,
            Note::D,
            Note::A,
            Note::E,
            Note::B,
            Note::F_SHARP,
            Note::C_SHARP,

            // Keys with at least one flat.
            Note::F,
            Note::B_FLAT,
            Note::E_FLAT,
            Note::A_FLAT,
            Note::D_FLAT,
            Note::G_FLAT,
            Note::C_FLAT,
        ]
    }

    /// Returns the tonic of the major key with the given number of sharps (positive values) or
    /// flats (negative values). Returns `None` if the signature has more than seven of either.
    #[must_use]
    pub fn major_key_with_fifths(fifths: i32) -> Option<Note> {
        Note::all_keys().into_iter().find(|key| key.fifths() == fifths)
    }

    /// Returns the accidental that the key signature with the given number of sharps or flats
    /// applies to the given natural note.
    #[must_use]
    pub fn signature_accidental(fifths: i32, natural: NaturalNote) -> Accidental {
        let position = SHARP_ORDER
            .iter()
            .position(|n| *n == natural)
            .unwrap_or_default() as i32;
        if fifths > 0 && position < fifths {
            return Accidental::Sharp;
        }
        // Flats are added in the reverse order of sharps.
        if fifths < 0 && 6 - position < -fifths {
            return Accidental::Flat;
        }
        Accidental::Natural
    }
}

//! Defines the major scale played as a reference before each session.

use crate::data::music::{
    intervals::Interval,
    notes::{Note, Pitch},
};

/// The number of semitones between the tonic and each degree of the major scale.
const MAJOR_SEMITONES: [i32; 8] = [0, 2, 4, 5, 7, 9, 11, 12];

/// Defines a tonal scale.
#[derive(Clone, Debug)]
pub struct Scale {
    /// The tonic of the scale.
    pub tonic: Note,

    /// The pitches which form the scale in ascending order, including the tonic an octave above.
    pub pitches: Vec<Pitch>,
}

impl Scale {
    /// Returns the ascending major scale starting on the given tonic in the fourth octave.
    #[must_use]
    pub fn major(tonic: Note) -> Scale {
        let root = Pitch {
            note: tonic,
            octave: 4,
        };
        let pitches = MAJOR_SEMITONES
            .iter()
            .enumerate()
            .map(|(degree, semitones)| {
                root.transpose(Interval {
                    steps: degree as i32,
                    semitones: *semitones,
                })
            })
            .collect();
        Scale { tonic, pitches }
    }
}

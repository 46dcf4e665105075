//! Contains the logic to grade an answer against the notes of a segment.

use crate::data::Segment;

/// A trait exposing a function to grade the answer given for a segment.
pub trait AnswerGrader {
    /// Returns the number of errors in the answer. Zero means the answer is correct.
    fn grade(&self, answer: &[String], segment: &Segment) -> usize;
}

/// A grader that compares the note names position by position and counts every missing or extra
/// note as one more error. Octaves are not checked.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactMatchGrader {}

impl ExactMatchGrader {
    /// Returns the number of errors between the answer and the expected note names.
    #[must_use]
    pub fn count_errors(answer: &[String], expected: &[String]) -> usize {
        let mismatches = answer
            .iter()
            .zip(expected.iter())
            .filter(|(given, expected)| given.to_lowercase() != expected.to_lowercase())
            .count();
        mismatches + answer.len().abs_diff(expected.len())
    }
}

impl AnswerGrader for ExactMatchGrader {
    fn grade(&self, answer: &[String], segment: &Segment) -> usize {
        Self::count_errors(answer, &segment.expected_names())
    }
}

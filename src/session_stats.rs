//! Accumulates the results of the segments graded during a session.

use crate::error::AccuracyError;

/// The running totals of a session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoreAccumulator {
    /// The number of notes presented across all graded segments.
    pub total_notes: usize,

    /// The number of errors made across all graded segments.
    pub note_errors: usize,

    /// The number of segments answered with at least one error.
    pub segment_failures: usize,

    /// The number of segments graded.
    pub segments_judged: usize,
}

impl ScoreAccumulator {
    /// Records the result of grading one segment.
    pub fn record(&mut self, error_count: usize, note_count: usize) {
        self.total_notes += note_count;
        self.note_errors += error_count;
        if error_count > 0 {
            self.segment_failures += 1;
        }
        self.segments_judged += 1;
    }

    /// Returns the note accuracy and the segment accuracy of the session. The note accuracy can be
    /// negative when the answers contain more errors than there were notes.
    pub fn finalize(&self) -> Result<(f64, f64), AccuracyError> {
        if self.total_notes == 0 {
            return Err(AccuracyError::NoNotes);
        }
        if self.segments_judged == 0 {
            return Err(AccuracyError::NoSegments);
        }

        let note_accuracy = 1.0 - self.note_errors as f64 / self.total_notes as f64;
        let segment_accuracy = 1.0 - self.segment_failures as f64 / self.segments_judged as f64;
        Ok((note_accuracy, segment_accuracy))
    }
}

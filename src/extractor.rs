//! Splits a melody into the segments presented to the student.
//!
//! Segments are built greedily. Events are added to the current segment until it has at least the
//! minimum number of events, at least the minimum number of events ending on a beat boundary, and
//! its last event ends on a beat boundary. Segments therefore never stop in the middle of a beat,
//! and may run past the minimums to reach the next boundary.
//!
//! When the melody runs out while a segment is still short of these conditions, the incomplete
//! segment is dropped and the extraction ends.

use std::vec::IntoIter;

use crate::data::{NoteOrRest, Segment, StreamInfo, TimeSignature};

/// An iterator over the segments of a melody. The iterator consumes the melody, so extracting the
/// segments again requires a new extractor built from the original stream.
pub struct SegmentExtractor {
    /// The events not yet assigned to a segment.
    events: IntoIter<NoteOrRest>,

    /// The tempo with which the segments are tagged.
    tempo: u32,

    /// The time signature with which the segments are tagged.
    time_signature: TimeSignature,

    /// The minimum number of events in a segment.
    min_note_count: usize,

    /// The minimum number of events in a segment that end on a beat boundary.
    min_beat_count: usize,
}

impl SegmentExtractor {
    /// Creates an extractor over the given melody. Minimums of zero are treated as one.
    #[must_use]
    pub fn new(stream: StreamInfo, min_note_count: usize, min_beat_count: usize) -> Self {
        Self {
            events: stream.events.into_iter(),
            tempo: stream.tempo,
            time_signature: stream.time_signature,
            min_note_count: min_note_count.max(1),
            min_beat_count: min_beat_count.max(1),
        }
    }
}

impl Iterator for SegmentExtractor {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        let mut events = Vec::new();
        let mut beat_count = 0;
        let mut last_boundary: Option<NoteOrRest> = None;

        loop {
            // An exhausted melody ends the extraction, discarding any incomplete segment.
            let event = self.events.next()?;
            events.push(event);
            if event.ends_on_beat() {
                beat_count += 1;
                last_boundary = Some(event);
            }

            let done = events.len() >= self.min_note_count
                && beat_count >= self.min_beat_count
                && last_boundary.is_some()
                && event.ends_on_beat();
            if done {
                break;
            }
        }

        Some(Segment {
            tempo: self.tempo,
            time_signature: self.time_signature,
            events,
        })
    }
}

/// Returns an extractor over the segments of the given melody.
#[must_use]
pub fn extract(
    stream: StreamInfo,
    min_note_count: usize,
    min_beat_count: usize,
) -> SegmentExtractor {
    SegmentExtractor::new(stream, min_note_count, min_beat_count)
}

//! Contains the audio renderer used to play segments to the student.
//!
//! Segments are rendered into a Standard MIDI File with a single track, written to a temporary
//! file, and handed to an external player program. The call blocks until the player exits, and the
//! temporary file is removed afterwards whether or not the player succeeded.

use anyhow::{anyhow, Context, Result};
use midly::{
    num::{u15, u24, u28, u4, u7},
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};
use num_rational::Ratio;
use std::{io::Write, process::Command};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::{
    data::{Beats, NoteOrRest, Segment},
    error::AudioError,
};

/// Ticks per quarter note in the rendered files.
const TICKS_PER_QUARTER: u16 = 480;

/// The channel on which all notes are played.
const CHANNEL: u8 = 0;

/// The velocity of every note.
const VELOCITY: u8 = 80;

/// A trait exposing a function to play a segment.
pub trait AudioRenderer {
    /// Plays the segment and blocks until playback ends.
    fn play(&mut self, segment: &Segment) -> Result<(), AudioError>;
}

/// Converts a length in beats into MIDI ticks.
fn to_ticks(beats: Beats) -> u32 {
    (beats * u32::from(TICKS_PER_QUARTER)).round().to_integer()
}

/// Builds a single-track MIDI file for the segment. The first event of the segment is moved to
/// the start of the file.
#[must_use]
pub fn segment_to_smf(segment: &Segment) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    let mut track: Track<'static> = Vec::new();
    let tempo_microseconds = (60_000_000 / segment.tempo.max(1)).min(0xFF_FFFF);
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds))),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TimeSignature(
            segment.time_signature.numerator.min(255) as u8,
            segment.time_signature.denominator.trailing_zeros() as u8,
            24,
            8,
        )),
    });

    let start = segment
        .events
        .first()
        .map(NoteOrRest::offset)
        .unwrap_or_else(|| Ratio::from_integer(0));
    let mut last_tick = 0;
    for event in &segment.events {
        // Rests only move the position of the next note.
        let NoteOrRest::Note(note) = event else {
            continue;
        };
        let key = u7::new(note.pitch.midi().clamp(0, 127) as u8);
        let on_tick = to_ticks(note.offset - start);
        let off_tick = to_ticks(note.offset + note.duration - start);

        track.push(TrackEvent {
            delta: u28::new(on_tick.saturating_sub(last_tick)),
            kind: TrackEventKind::Midi {
                channel: u4::new(CHANNEL),
                message: MidiMessage::NoteOn {
                    key,
                    vel: u7::new(VELOCITY),
                },
            },
        });
        track.push(TrackEvent {
            delta: u28::new(off_tick.saturating_sub(on_tick)),
            kind: TrackEventKind::Midi {
                channel: u4::new(CHANNEL),
                message: MidiMessage::NoteOff {
                    key,
                    vel: u7::new(0),
                },
            },
        });
        last_tick = off_tick.max(on_tick);
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);
    smf
}

/// An audio renderer that plays MIDI files with an external program, such as `timidity`.
pub struct MidiPlayer {
    /// The player command. The first word is the program and the rest are passed as arguments
    /// before the path of the file.
    pub player: String,
}

impl MidiPlayer {
    /// Creates a renderer that uses the given player command.
    pub fn new(player: impl Into<String>) -> Self {
        Self {
            player: player.into(),
        }
    }

    /// Helper function to write the segment to a temporary MIDI file.
    fn write_temp_file(segment: &Segment) -> Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("dictation-")
            .suffix(".mid")
            .tempfile()
            .context("cannot create temporary MIDI file")?;
        segment_to_smf(segment)
            .write_std(&mut file)
            .with_context(|| anyhow!("cannot write MIDI data to {}", file.path().display()))?;
        file.flush()
            .with_context(|| anyhow!("cannot flush MIDI file {}", file.path().display()))?;
        Ok(file)
    }
}

impl AudioRenderer for MidiPlayer {
    fn play(&mut self, segment: &Segment) -> Result<(), AudioError> {
        let file = Self::write_temp_file(segment).map_err(AudioError::WriteMidi)?;

        let mut words = self.player.split_whitespace();
        let program = words.next().unwrap_or_default();
        debug!(player = %self.player, file = %file.path().display(), "playing segment");
        let status = Command::new(program)
            .args(words)
            .arg(file.path())
            .status()
            .map_err(|e| AudioError::Player(self.player.clone(), e))?;
        if !status.success() {
            warn!(player = %self.player, %status, "audio player exited with an error");
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use anyhow::Result;
    use midly::Smf;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        data::{music::notes::Note, TimeSignature},
        notation::{LocalNotationEngine, NotationEngine},
    };

    fn segment(line: &str) -> Result<Segment> {
        let entry = LocalNotationEngine::default().parse_compact_line(line)?;
        Ok(Segment {
            tempo: 120,
            time_signature: entry.time_signature,
            events: entry.events,
        })
    }

    /// Returns the key and the absolute tick of every note on and note off message.
    fn messages(smf: &Smf) -> Vec<(bool, u8, u32)> {
        let mut tick = 0;
        let mut messages = Vec::new();
        for event in &smf.tracks[0] {
            tick += event.delta.as_int();
            if let TrackEventKind::Midi { message, .. } = event.kind {
                match message {
                    MidiMessage::NoteOn { key, .. } => messages.push((true, key.as_int(), tick)),
                    MidiMessage::NoteOff { key, .. } => messages.push((false, key.as_int(), tick)),
                    _ => {}
                }
            }
        }
        messages
    }

    /// Verifies the notes, rests, and tempo written to the file.
    #[test]
    fn notes_and_rests() -> Result<()> {
        let smf = segment_to_smf(&segment("TS:3/4 c4 r8 e8 trip{g8 a b}")?);
        assert_eq!(smf.tracks.len(), 1);
        assert_eq!(
            messages(&smf),
            vec![
                (true, 60, 0),
                (false, 60, 480),
                (true, 64, 720),
                (false, 64, 960),
                (true, 67, 960),
                (false, 67, 1120),
                (true, 69, 1120),
                (false, 69, 1280),
                (true, 71, 1280),
                (false, 71, 1440),
            ]
        );
        assert!(smf.tracks[0].iter().any(|e| e.kind
            == TrackEventKind::Meta(MetaMessage::Tempo(u24::new(500_000)))));
        assert!(smf.tracks[0].iter().any(|e| e.kind
            == TrackEventKind::Meta(MetaMessage::TimeSignature(3, 2, 24, 8))));
        Ok(())
    }

    /// Verifies that segments taken from the middle of a melody start at the beginning of the
    /// file.
    #[test]
    fn rebased_offsets() -> Result<()> {
        let mut segment = segment("c4 d e f")?;
        segment.events.drain(..2);
        let messages = messages(&segment_to_smf(&segment));
        assert_eq!(messages[0], (true, 64, 0));
        assert_eq!(messages.last().copied(), Some((false, 65, 960)));
        Ok(())
    }

    /// Verifies that the rendered file can be read back.
    #[test]
    fn written_file_parses() -> Result<()> {
        let scale = Segment::reference_scale(Note::G);
        let file = MidiPlayer::write_temp_file(&scale)?;
        let bytes = std::fs::read(file.path())?;
        let smf = Smf::parse(&bytes)?;
        assert_eq!(messages(&smf).len(), 18);
        assert_eq!(scale.time_signature, TimeSignature::default());
        Ok(())
    }

    /// Verifies that playing with a missing player fails and that a working player succeeds.
    #[test]
    fn run_player() -> Result<()> {
        let segment = segment("c4 d")?;
        let mut missing = MidiPlayer::new("this-player-does-not-exist");
        assert!(matches!(
            missing.play(&segment),
            Err(AudioError::Player(_, _))
        ));

        let mut player = MidiPlayer::new("true --ignored");
        player.play(&segment)?;
        Ok(())
    }
}

//! Contains the state machine that drives a training session.
//!
//! A session presents each sampled segment in turn. The segment is played, the student types the
//! notes they heard, and the answer is graded and added to the running totals. The student can
//! then hear the segment again as many times as they want or move on to the next one. After the
//! last segment, the accuracies are printed and handed to the score sink.
//!
//! The session can be cancelled at any of its blocking points, either by closing the input or by
//! setting the interrupt flag. A cancelled session prints no report and records nothing.

use std::{
    io::{self, BufRead, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use strum::EnumString;
use tracing::{debug, info};

use crate::{
    answer,
    audio::AudioRenderer,
    data::{Configuration, Segment},
    error::SessionError,
    grader::AnswerGrader,
    score_log::{ScoreRecord, ScoreSink},
    session_stats::ScoreAccumulator,
};

/// The prompt shown when waiting for an answer.
pub const ANSWER_PROMPT: &str = "> ";

/// The prompt shown when waiting for the student to repeat the segment or move on.
pub const REPEAT_PROMPT: &str = "Next / repeat (n/r)? ";

/// How often the interrupt flag is checked while waiting for input.
const INTERRUPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A trait exposing a function to read the lines typed by the student.
pub trait InputSource {
    /// Returns the next line, without its terminator. Returns `None` when the input ends or the
    /// session is interrupted while waiting.
    fn next_line(&mut self) -> Result<Option<String>, SessionError>;
}

/// An input source that reads lines from any buffered reader.
pub struct ReaderInput<R: BufRead> {
    reader: R,
}

impl<R: BufRead> ReaderInput<R> {
    /// Creates an input source reading from the given reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> InputSource for ReaderInput<R> {
    fn next_line(&mut self) -> Result<Option<String>, SessionError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// An input source that reads standard input on a background thread, so that the interrupt flag
/// can be checked while the student is typing.
pub struct StdinInput {
    /// The lines read by the background thread.
    receiver: Receiver<io::Result<String>>,

    /// The flag set when the session must be cancelled.
    interrupted: Arc<AtomicBool>,
}

impl StdinInput {
    /// Starts reading standard input.
    pub fn new(interrupted: Arc<AtomicBool>) -> Self {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                if sender.send(line).is_err() {
                    break;
                }
            }
        });
        Self {
            receiver,
            interrupted,
        }
    }
}

impl InputSource for StdinInput {
    fn next_line(&mut self) -> Result<Option<String>, SessionError> {
        loop {
            if self.interrupted.load(Ordering::SeqCst) {
                return Ok(None);
            }
            match self.receiver.recv_timeout(INTERRUPT_POLL_INTERVAL) {
                Ok(line) => return Ok(Some(line?)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
            }
        }
    }
}

/// The choices offered after a segment is graded.
#[derive(Clone, Copy, Debug, EnumString, Eq, PartialEq)]
#[strum(ascii_case_insensitive)]
pub enum RepeatDecision {
    /// Move on to the next segment.
    #[strum(serialize = "n", serialize = "next")]
    Next,

    /// Play the same segment again.
    #[strum(serialize = "r", serialize = "repeat")]
    Repeat,
}

/// The states of a training session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    /// The session has not started.
    Idle,

    /// A segment is about to be played.
    Presenting {
        /// The index of the segment.
        index: usize,

        /// Whether the segment was already graded and is being repeated.
        answered: bool,
    },

    /// Waiting for the answer to the segment at the given index.
    AwaitingAnswer(usize),

    /// Waiting for the student to repeat the segment at the given index or move on.
    AwaitingRepeatDecision(usize),

    /// All the segments were graded and the results recorded.
    Complete,

    /// The session was interrupted. Nothing was recorded.
    Cancelled,
}

impl SessionState {
    /// Returns whether the session has ended.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Complete | SessionState::Cancelled)
    }
}

/// The results of a completed session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionReport {
    /// The fraction of notes answered correctly.
    pub note_accuracy: f64,

    /// The fraction of segments answered without errors.
    pub segment_accuracy: f64,

    /// The time spent in the session.
    pub elapsed: Duration,
}

/// How a session ended.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionOutcome {
    /// All the segments were presented and the results recorded.
    Completed(SessionReport),

    /// The session was interrupted before the end.
    Cancelled,
}

/// The collaborators a session talks to.
pub struct SessionIo<'a> {
    /// Where the answers and decisions are read from.
    pub input: &'a mut dyn InputSource,

    /// Where prompts and results are written.
    pub output: &'a mut dyn Write,

    /// Plays the segments.
    pub renderer: &'a mut dyn AudioRenderer,

    /// Records the results of the completed session.
    pub sink: &'a mut dyn ScoreSink,
}

/// A training session over a fixed list of segments.
pub struct TrainingSession<'a> {
    /// The options of the run.
    config: &'a Configuration,

    /// The segments to present, in order.
    segments: Vec<Segment>,

    /// The grader used to check the answers.
    grader: &'a dyn AnswerGrader,

    /// The flag set when the session must be cancelled.
    interrupted: Arc<AtomicBool>,

    /// The current state.
    state: SessionState,

    /// The running totals.
    stats: ScoreAccumulator,

    /// The time at which the first segment was presented.
    started: Option<Instant>,

    /// The results, once the session completes.
    report: Option<SessionReport>,
}

impl<'a> TrainingSession<'a> {
    /// Creates a session over the given segments.
    pub fn new(
        config: &'a Configuration,
        segments: Vec<Segment>,
        grader: &'a dyn AnswerGrader,
        interrupted: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            segments,
            grader,
            interrupted,
            state: SessionState::Idle,
            stats: ScoreAccumulator::default(),
            started: None,
            report: None,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the running totals.
    #[must_use]
    pub fn stats(&self) -> &ScoreAccumulator {
        &self.stats
    }

    /// Reads a line, returning `None` if the session must be cancelled.
    fn read_line(&self, io: &mut SessionIo) -> Result<Option<String>, SessionError> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let line = io.input.next_line()?;
        if self.interrupted.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(line)
    }

    /// Plays the segment, unless the session was interrupted.
    fn present(
        &mut self,
        io: &mut SessionIo,
        index: usize,
        answered: bool,
    ) -> Result<SessionState, SessionError> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Ok(SessionState::Cancelled);
        }
        debug!(index, answered, "presenting segment");
        io.renderer.play(&self.segments[index])?;
        Ok(if answered {
            SessionState::AwaitingRepeatDecision(index)
        } else {
            SessionState::AwaitingAnswer(index)
        })
    }

    /// Reads and grades the answer to the segment.
    fn await_answer(
        &mut self,
        io: &mut SessionIo,
        index: usize,
    ) -> Result<SessionState, SessionError> {
        write!(io.output, "{ANSWER_PROMPT}")?;
        io.output.flush()?;
        let Some(line) = self.read_line(io)? else {
            return Ok(SessionState::Cancelled);
        };

        // Surrounding whitespace is ignored. Invalid answers are asked again without counting as
        // an attempt.
        let line = line.trim();
        if !answer::is_valid(line) {
            return Ok(SessionState::AwaitingAnswer(index));
        }

        let segment = &self.segments[index];
        let tokens = answer::tokenize(line);
        let errors = self.grader.grade(&tokens, segment);
        self.stats.record(errors, segment.note_count());
        if errors == 0 {
            writeln!(io.output, " ✓")?;
        } else {
            writeln!(io.output, " ✗ {}", segment.expected_names().concat())?;
        }
        Ok(SessionState::AwaitingRepeatDecision(index))
    }

    /// Reads the decision to repeat the segment or move on.
    fn await_decision(
        &mut self,
        io: &mut SessionIo,
        index: usize,
    ) -> Result<SessionState, SessionError> {
        write!(io.output, "{REPEAT_PROMPT}")?;
        io.output.flush()?;
        let Some(line) = self.read_line(io)? else {
            return Ok(SessionState::Cancelled);
        };

        match line.trim().parse::<RepeatDecision>() {
            Ok(RepeatDecision::Repeat) => Ok(SessionState::Presenting {
                index,
                answered: true,
            }),
            Ok(RepeatDecision::Next) if index + 1 < self.segments.len() => {
                Ok(SessionState::Presenting {
                    index: index + 1,
                    answered: false,
                })
            }
            Ok(RepeatDecision::Next) => self.complete(io),
            Err(_) => Ok(SessionState::AwaitingRepeatDecision(index)),
        }
    }

    /// Computes, prints, and records the results of the session.
    fn complete(&mut self, io: &mut SessionIo) -> Result<SessionState, SessionError> {
        let elapsed = self.started.map(|s| s.elapsed()).unwrap_or_default();
        let (note_accuracy, segment_accuracy) = self.stats.finalize()?;
        writeln!(io.output, "Note accuracy: {:.0}%", 100.0 * note_accuracy)?;
        writeln!(io.output, "Segment accuracy: {:.0}%", 100.0 * segment_accuracy)?;

        io.sink.record(&ScoreRecord::new(
            self.config,
            note_accuracy,
            segment_accuracy,
            elapsed,
        ))?;
        info!(
            note_accuracy,
            segment_accuracy,
            elapsed_seconds = elapsed.as_secs(),
            "session complete"
        );
        self.report = Some(SessionReport {
            note_accuracy,
            segment_accuracy,
            elapsed,
        });
        Ok(SessionState::Complete)
    }

    /// Advances the session by one transition and returns the new state.
    pub fn step(&mut self, io: &mut SessionIo) -> Result<SessionState, SessionError> {
        let next = match self.state {
            SessionState::Idle => {
                if self.segments.is_empty() {
                    return Err(SessionError::Sampling {
                        requested: self.config.segment_count,
                        available: 0,
                    });
                }
                self.started = Some(Instant::now());
                SessionState::Presenting {
                    index: 0,
                    answered: false,
                }
            }
            SessionState::Presenting { index, answered } => self.present(io, index, answered)?,
            SessionState::AwaitingAnswer(index) => self.await_answer(io, index)?,
            SessionState::AwaitingRepeatDecision(index) => self.await_decision(io, index)?,
            state @ (SessionState::Complete | SessionState::Cancelled) => state,
        };

        if next == SessionState::Cancelled && self.state != SessionState::Cancelled {
            writeln!(io.output)?;
            info!("session cancelled");
        }
        self.state = next;
        Ok(next)
    }

    /// Runs the session until it completes or is cancelled.
    pub fn run(&mut self, io: &mut SessionIo) -> Result<SessionOutcome, SessionError> {
        while !self.step(io)?.is_terminal() {}
        match (&self.state, &self.report) {
            (SessionState::Complete, Some(report)) => Ok(SessionOutcome::Completed(report.clone())),
            _ => Ok(SessionOutcome::Cancelled),
        }
    }
}

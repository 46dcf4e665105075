use std::{cell::RefCell, fs, path::Path, rc::Rc};

use anyhow::Result;
use dictation::{
    audio::AudioRenderer,
    data::{Configuration, ConfigurationBuilder, Segment},
    error::{AudioError, SessionError},
    session::InputSource,
};

/// A compact collection whose melodies stay within the key once moved to C major.
pub const COMPACT_COLLECTION: &str = "\
# Folk tunes
X:1|K:G|TS:3/4 g4 a b cc dd b g2 a4
X:2|K:F|TS:4/4 f8 g a b- cc4 a8 g f4 c2
X:3|K:C|TS:6/8 e8 f g g f e d4. r8 c4
X:4|K:D|TS:2/4 d8 e f# g a4 d
";

/// A tune in standard notation.
pub const STANDARD_TUNE: &str = "\
X:1
T:Exercise
M:3/4
L:1/8
Q:1/4=90
K:Bb
B2 c2 d2 | e2 d2 c2 | B>c d2 B2 |]
";

/// Writes the collections into the directory and returns a configuration builder that reads
/// them.
pub fn write_collections(dir: &Path) -> Result<ConfigurationBuilder> {
    fs::write(dir.join("folk.tiny"), COMPACT_COLLECTION)?;
    fs::write(dir.join("exercise.abc"), STANDARD_TUNE)?;
    let mut builder = ConfigurationBuilder::default();
    builder
        .sources(vec![
            format!("{}/*.tiny", dir.display()),
            format!("{}/*.abc", dir.display()),
        ])
        .score_log(dir.join("scores.csv"));
    Ok(builder)
}

/// Returns the configuration built from the builder.
pub fn build(builder: &ConfigurationBuilder) -> Result<Configuration> {
    Ok(builder.build()?)
}

/// A renderer that lets the simulated student hear the segments.
pub struct SharedRenderer {
    pub heard: Rc<RefCell<Vec<Segment>>>,
}

impl AudioRenderer for SharedRenderer {
    fn play(&mut self, segment: &Segment) -> Result<(), AudioError> {
        self.heard.borrow_mut().push(segment.clone());
        Ok(())
    }
}

/// A simulated student that answers every segment it hears and then moves on.
pub struct SimulatedStudent {
    /// The segments played so far.
    pub heard: Rc<RefCell<Vec<Segment>>>,

    /// Computes the answer to a segment.
    pub answer: fn(&Segment) -> String,

    /// The number of times the student asks to hear each segment again.
    pub repeats: usize,

    /// The student closes the input after answering this many segments.
    pub give_up_after: Option<usize>,

    /// The number of segments answered.
    answered: usize,

    /// The number of times the current segment was repeated.
    repeated: usize,

    /// Whether the next line is a decision instead of an answer.
    deciding: bool,
}

impl SimulatedStudent {
    /// Creates a student that answers with the given function.
    pub fn new(heard: Rc<RefCell<Vec<Segment>>>, answer: fn(&Segment) -> String) -> Self {
        Self {
            heard,
            answer,
            repeats: 0,
            give_up_after: None,
            answered: 0,
            repeated: 0,
            deciding: false,
        }
    }
}

impl InputSource for SimulatedStudent {
    fn next_line(&mut self) -> Result<Option<String>, SessionError> {
        if self.deciding {
            if self.repeated < self.repeats {
                self.repeated += 1;
                return Ok(Some("r".to_string()));
            }
            self.deciding = false;
            self.repeated = 0;
            return Ok(Some("n".to_string()));
        }

        if self.give_up_after == Some(self.answered) {
            return Ok(None);
        }
        let heard = self.heard.borrow();
        let Some(segment) = heard.last() else {
            return Ok(None);
        };
        self.answered += 1;
        self.deciding = true;
        Ok(Some((self.answer)(segment)))
    }
}

/// Answers with the exact names of the notes.
pub fn perfect_answer(segment: &Segment) -> String {
    segment.expected_names().concat().to_lowercase()
}

/// Answers with the first note wrong and every other note right.
#[allow(dead_code)]
pub fn one_wrong_answer(segment: &Segment) -> String {
    let mut names: Vec<String> = segment
        .expected_names()
        .iter()
        .map(|name| name.to_lowercase())
        .collect();
    if let Some(first) = names.first_mut() {
        *first = if first.as_str() == "c" { "d" } else { "c" }.to_string();
    }
    names.concat()
}

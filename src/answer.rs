//! Reads the answers typed by the student into a list of note names.
//!
//! An answer is a run of note letters from A to G, in either case, where a letter followed by `-`
//! is flattened. Spaces and any other characters make the answer invalid, and the session asks for
//! it again without grading it.
//!
//! The session trims whitespace around the line before validating it, so ` ce-g ` is read as
//! `ce-g`. Spaces between the letters are still rejected.

/// The marker that flattens the preceding note.
const FLAT_MARKER: char = '-';

/// Returns whether the character is one of the note letters, in either case.
fn is_note_letter(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a'..='g')
}

/// Returns whether the answer can be graded. It must contain only note letters and flat markers,
/// with at least one letter.
#[must_use]
pub fn is_valid(raw: &str) -> bool {
    raw.chars().all(|c| is_note_letter(c) || c == FLAT_MARKER) && raw.chars().any(is_note_letter)
}

/// Splits the answer into lowercase note names. Each letter starts a new name, and the flat
/// markers that follow it are appended to it. Flat markers before the first letter are dropped.
#[must_use]
pub fn tokenize(raw: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for c in raw.chars() {
        if is_note_letter(c) {
            tokens.push(c.to_ascii_lowercase().to_string());
        } else if c == FLAT_MARKER {
            if let Some(last) = tokens.last_mut() {
                last.push(c);
            }
        }
    }
    tokens
}

//! Loads the collections of melodies and builds the pool of segments from which a session is
//! sampled.
//!
//! Each source is a glob pattern. Files ending in `.abc` hold a single tune in standard notation.
//! Every other file is a compact collection with one entry per line, where empty lines and lines
//! starting with `#` or `%` are ignored. Entries and files that cannot be parsed are logged and
//! skipped.

use anyhow::{anyhow, Context, Result};
use rand::{
    seq::{index, IndexedRandom},
    Rng,
};
use std::{fs, path::Path};
use tracing::{debug, info, warn};

use crate::{
    data::{music::notes::Note, Configuration, ParsedEntry, Segment},
    error::SessionError,
    extractor::SegmentExtractor,
    notation::{into_stream_info, NotationEngine},
};

/// The extension of the files in standard notation.
const STANDARD_EXTENSION: &str = "abc";

/// Returns whether the line of a compact collection should be ignored.
fn is_ignored_line(line: &str) -> bool {
    line.is_empty() || line.starts_with('#') || line.starts_with('%')
}

/// Reads all the entries of a compact collection, skipping those that cannot be parsed.
fn read_compact_file(engine: &dyn NotationEngine, path: &Path) -> Result<Vec<ParsedEntry>> {
    let contents = fs::read_to_string(path)
        .with_context(|| anyhow!("cannot read collection {}", path.display()))?;
    let mut entries = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if is_ignored_line(line) {
            continue;
        }
        match engine.parse_compact_line(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(
                file = %path.display(),
                line = number + 1,
                error = %e,
                "skipping collection entry"
            ),
        }
    }
    Ok(entries)
}

/// Reads the entries of a single file, choosing the notation from its extension. Files that
/// cannot be read or parsed are logged and produce no entries.
fn read_file(engine: &dyn NotationEngine, path: &Path) -> Vec<ParsedEntry> {
    let is_standard = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case(STANDARD_EXTENSION));
    let result = if is_standard {
        engine
            .parse_standard_file(path)
            .map(|entry| vec![entry])
            .map_err(anyhow::Error::from)
    } else {
        read_compact_file(engine, path)
    };

    match result {
        Ok(entries) => {
            debug!(file = %path.display(), entries = entries.len(), "read collection");
            entries
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "skipping collection file");
            Vec::new()
        }
    }
}

/// Reads the entries of every file matched by the configured sources. An invalid pattern is an
/// error, while unreadable files are skipped.
pub fn load_entries(
    config: &Configuration,
    engine: &dyn NotationEngine,
) -> Result<Vec<ParsedEntry>> {
    let mut entries = Vec::new();
    let mut file_count = 0;
    for pattern in &config.sources {
        let paths =
            glob::glob(pattern).with_context(|| anyhow!("invalid source pattern {pattern}"))?;
        for path in paths {
            match path {
                Ok(path) if path.is_file() => {
                    file_count += 1;
                    entries.extend(read_file(engine, &path));
                }
                Ok(_) => {}
                Err(e) => warn!(pattern = %pattern, error = %e, "skipping unreadable path"),
            }
        }
    }
    info!(files = file_count, entries = entries.len(), "loaded collections");
    Ok(entries)
}

/// Moves the entries into the training key, tags them with the configured tempo, and returns all
/// the segments extracted from them in order. Segments made only of rests are left out, since
/// they have no notes to name.
#[must_use]
pub fn build_pool(
    config: &Configuration,
    engine: &dyn NotationEngine,
    entries: &[ParsedEntry],
) -> Vec<Segment> {
    let pool: Vec<Segment> = entries
        .iter()
        .flat_map(|entry| {
            let mut stream = into_stream_info(engine, entry, config.key);
            stream.tempo = config.tempo;
            SegmentExtractor::new(stream, config.min_note_count, config.min_beat_count)
        })
        .filter(|segment| {
            let has_notes = segment.note_count() > 0;
            if !has_notes {
                debug!(events = segment.events.len(), "skipping segment without notes");
            }
            has_notes
        })
        .collect();
    info!(segments = pool.len(), key = %config.key, "built segment pool");
    pool
}

/// Loads the configured sources and returns the pool of segments.
pub fn load_pool(config: &Configuration, engine: &dyn NotationEngine) -> Result<Vec<Segment>> {
    let entries = load_entries(config, engine)?;
    Ok(build_pool(config, engine, &entries))
}

/// Returns `count` distinct segments drawn at random from the pool.
pub fn sample_segments<R: Rng + ?Sized>(
    pool: &[Segment],
    count: usize,
    rng: &mut R,
) -> Result<Vec<Segment>, SessionError> {
    if count > pool.len() {
        return Err(SessionError::Sampling {
            requested: count,
            available: pool.len(),
        });
    }
    Ok(index::sample(rng, pool.len(), count)
        .into_iter()
        .map(|i| pool[i].clone())
        .collect())
}

/// Returns one of the fifteen major keys, chosen at random.
pub fn random_key<R: Rng + ?Sized>(rng: &mut R) -> Note {
    Note::all_keys().choose(rng).copied().unwrap_or(Note::C)
}

#[cfg(test)]
mod test {
    use anyhow::Result;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, SeedableRng};
    use std::{collections::HashSet, fs};
    use tempfile::tempdir;

    use super::*;
    use crate::{
        data::{ConfigurationBuilder, NoteOrRest},
        notation::LocalNotationEngine,
    };

    const COMPACT: &str = indoc! {"
        # Warm up
        X:1|K:G|TS:3/4 g4 a b cc dd ee

        % broken entry
        X:2|K:H|c4 d
        X:3|TS:2/4 c8 d e f g4 a
    "};

    const STANDARD: &str = indoc! {"
        X:1
        M:4/4
        L:1/4
        Q:1/4=96
        K:F
        F G A _B | c4 |]
    "};

    /// Writes the collections into a temporary directory and returns a configuration reading them.
    fn setup(dir: &Path) -> Result<Configuration> {
        fs::write(dir.join("songs.tiny"), COMPACT)?;
        fs::write(dir.join("tune.abc"), STANDARD)?;
        fs::write(dir.join("broken.abc"), "M:4/4\nQ:80\nK:C\nK:G\nCDEF\n")?;
        Ok(ConfigurationBuilder::default()
            .sources(vec![
                format!("{}/*.tiny", dir.display()),
                format!("{}/*.abc", dir.display()),
            ])
            .tempo(120)
            .build()?)
    }

    /// Verifies loading entries from both notations while skipping the broken ones.
    #[test]
    fn load_collections() -> Result<()> {
        let temp_dir = tempdir()?;
        let config = setup(temp_dir.path())?;
        let engine = LocalNotationEngine::default();

        let entries = load_entries(&config, &engine)?;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].key, Note::G);
        assert_eq!(entries[2].key, Note::F);
        assert_eq!(entries[2].tempo, Some(96));
        Ok(())
    }

    /// Verifies that the pool is transposed, tagged with the configured tempo, and segmented.
    #[test]
    fn pool() -> Result<()> {
        let temp_dir = tempdir()?;
        let config = setup(temp_dir.path())?;
        let engine = LocalNotationEngine::default();

        let pool = load_pool(&config, &engine)?;
        let names: Vec<Vec<String>> = pool.iter().map(Segment::expected_names).collect();
        assert_eq!(
            names,
            vec![
                vec!["C", "D"],
                vec!["E", "F"],
                vec!["G", "A"],
                vec!["C", "D"],
                vec!["E", "F"],
                vec!["G", "A"],
                vec!["C", "D"],
                vec!["E", "F"],
            ]
        );
        assert!(pool.iter().all(|s| s.tempo == 120));
        assert!(pool.iter().all(|s| {
            s.events
                .last()
                .is_some_and(NoteOrRest::ends_on_beat)
        }));
        Ok(())
    }

    /// Verifies that segments made only of rests are left out of the pool.
    #[test]
    fn rests_only_segments() -> Result<()> {
        let temp_dir = tempdir()?;
        fs::write(temp_dir.path().join("rests.tiny"), "c4 d r4 r4 e f r2\nr1 r1\n")?;
        let config = ConfigurationBuilder::default()
            .sources(vec![format!("{}/*.tiny", temp_dir.path().display())])
            .build()?;

        let pool = load_pool(&config, &LocalNotationEngine::default())?;
        let names: Vec<Vec<String>> = pool.iter().map(Segment::expected_names).collect();
        assert_eq!(names, vec![vec!["C", "D"], vec!["E", "F"]]);
        assert!(pool.iter().all(|segment| segment.note_count() > 0));
        Ok(())
    }

    /// Verifies that missing directories produce an empty pool and invalid patterns fail.
    #[test]
    fn sources() -> Result<()> {
        let engine = LocalNotationEngine::default();
        let config = ConfigurationBuilder::default()
            .sources(vec!["/does/not/exist/*.tiny".to_string()])
            .build()?;
        assert!(load_pool(&config, &engine)?.is_empty());

        let config = ConfigurationBuilder::default()
            .sources(vec!["[".to_string()])
            .build()?;
        assert!(load_pool(&config, &engine).is_err());
        Ok(())
    }

    /// Verifies sampling segments without replacement.
    #[test]
    fn sampling() -> Result<()> {
        let temp_dir = tempdir()?;
        let config = setup(temp_dir.path())?;
        let pool = load_pool(&config, &LocalNotationEngine::default())?;
        let mut rng = StdRng::seed_from_u64(7);

        let sample = sample_segments(&pool, pool.len(), &mut rng)?;
        assert_eq!(sample.len(), pool.len());
        let sampled: HashSet<String> = sample
            .iter()
            .map(|s| format!("{:?}", s.events))
            .collect();
        let expected: HashSet<String> = pool.iter().map(|s| format!("{:?}", s.events)).collect();
        assert_eq!(sampled, expected);

        assert_eq!(sample_segments(&pool, 3, &mut rng)?.len(), 3);
        let error = sample_segments(&pool, pool.len() + 1, &mut rng).unwrap_err();
        assert!(matches!(
            error,
            SessionError::Sampling { requested, available }
                if requested == pool.len() + 1 && available == pool.len()
        ));
        assert!(matches!(
            sample_segments(&[], 1, &mut rng),
            Err(SessionError::Sampling { available: 0, .. })
        ));
        Ok(())
    }

    /// Verifies that the same seed draws the same segments and key.
    #[test]
    fn deterministic_with_seed() -> Result<()> {
        let temp_dir = tempdir()?;
        let config = setup(temp_dir.path())?;
        let pool = load_pool(&config, &LocalNotationEngine::default())?;

        let first = sample_segments(&pool, 4, &mut StdRng::seed_from_u64(42))?;
        let second = sample_segments(&pool, 4, &mut StdRng::seed_from_u64(42))?;
        assert_eq!(first, second);

        let key = random_key(&mut StdRng::seed_from_u64(3));
        assert_eq!(key, random_key(&mut StdRng::seed_from_u64(3)));
        assert!(Note::all_keys().contains(&key));
        Ok(())
    }
}

//! Runs one melodic dictation session from the command line.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::{
    io,
    path::PathBuf,
    process,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dictation::{
    audio::{AudioRenderer, MidiPlayer},
    collection,
    data::{
        music::notes::Note, ConfigurationBuilder, Segment, DEFAULT_MIN_BEAT_COUNT,
        DEFAULT_MIN_NOTE_COUNT, DEFAULT_PLAYER, DEFAULT_SCORE_LOG, DEFAULT_SEGMENT_COUNT,
        DEFAULT_SOURCES, DEFAULT_TEMPO,
    },
    grader::ExactMatchGrader,
    is_sampling_error,
    notation::LocalNotationEngine,
    prepare_session,
    score_log::CsvScoreLog,
    session::{SessionIo, SessionOutcome, StdinInput, TrainingSession},
};

/// The exit code used when the student presses Ctrl+C twice.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Parser, Debug)]
#[command(name = "dictation")]
#[command(about = "Train melodic dictation with segments of notated melodies")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Minimum number of notes in each segment
    #[arg(long, default_value_t = DEFAULT_MIN_NOTE_COUNT)]
    min_note_count: usize,

    /// Minimum number of notes ending on a beat in each segment
    #[arg(long, default_value_t = DEFAULT_MIN_BEAT_COUNT)]
    min_beat_count: usize,

    /// Number of segments in the session
    #[arg(short = 'n', long, default_value_t = DEFAULT_SEGMENT_COUNT)]
    segment_count: usize,

    /// Playback tempo in beats per minute (60 to 200)
    #[arg(short, long, default_value_t = DEFAULT_TEMPO)]
    bpm: u32,

    /// Training key, such as C, G, or B- (ignored with --random-key)
    #[arg(short, long, default_value = "C")]
    key: Note,

    /// Draw the training key at random
    #[arg(long)]
    random_key: bool,

    /// Glob patterns of the collection files
    #[arg(short, long = "source", default_values_t = DEFAULT_SOURCES.map(String::from))]
    sources: Vec<String>,

    /// File where the results of each session are appended
    #[arg(long, default_value = DEFAULT_SCORE_LOG)]
    score_log: PathBuf,

    /// Command used to play MIDI files
    #[arg(long, default_value = DEFAULT_PLAYER)]
    player: String,
}

/// Installs the handler that cancels the session on the first Ctrl+C and exits on the second.
fn install_interrupt_handler() -> Result<Arc<AtomicBool>> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            process::exit(INTERRUPTED_EXIT_CODE);
        }
    })
    .context("cannot install the interrupt handler")?;
    Ok(interrupted)
}

fn run(args: Args) -> Result<()> {
    let mut rng = rand::rng();
    let key = if args.random_key {
        collection::random_key(&mut rng)
    } else {
        args.key
    };
    let config = ConfigurationBuilder::default()
        .min_note_count(args.min_note_count)
        .min_beat_count(args.min_beat_count)
        .segment_count(args.segment_count)
        .tempo(args.bpm)
        .key(key)
        .random_key(args.random_key)
        .sources(args.sources)
        .score_log(args.score_log)
        .player(args.player)
        .build()
        .map_err(|e| anyhow!("invalid options: {e}"))?;
    info!(key = %config.key, random = config.random_key, "starting session");

    let engine = LocalNotationEngine::default();
    let segments = match prepare_session(&config, &engine, &mut rng) {
        Err(e) if is_sampling_error(&e) => {
            return Err(e.context("not enough segments in the collections; check --source"));
        }
        result => result?,
    };

    let interrupted = install_interrupt_handler()?;
    let mut renderer = MidiPlayer::new(config.player.clone());
    renderer
        .play(&Segment::reference_scale(config.key))
        .context("cannot play the reference scale")?;

    let grader = ExactMatchGrader::default();
    let mut input = StdinInput::new(interrupted.clone());
    let mut output = io::stdout();
    let mut sink = CsvScoreLog::new(config.score_log.clone());
    let mut session = TrainingSession::new(&config, segments, &grader, interrupted);
    let outcome = session.run(&mut SessionIo {
        input: &mut input,
        output: &mut output,
        renderer: &mut renderer,
        sink: &mut sink,
    })?;
    if outcome == SessionOutcome::Cancelled {
        info!("session ended early; no scores were recorded");
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

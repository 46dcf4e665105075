//! Plays a single entry of a compact collection, selected by its `X:` index. Useful to check how
//! a newly written entry sounds before adding it to the training sources.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::{fs, io, path::PathBuf, process};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dictation::{
    audio::{AudioRenderer, MidiPlayer},
    data::{music::notes::Note, Segment, DEFAULT_PLAYER},
    notation::{compact, into_stream_info, LocalNotationEngine, NotationEngine},
};

#[derive(Parser, Debug)]
#[command(name = "preview")]
#[command(about = "Play one entry of a compact collection")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// The collection file
    file: PathBuf,

    /// The index given by the X: marker of the entry
    index: u32,

    /// Move the entry into this key before playing it
    #[arg(short, long)]
    key: Option<Note>,

    /// Playback tempo in beats per minute, replacing the tempo of the entry
    #[arg(short, long)]
    bpm: Option<u32>,

    /// Command used to play MIDI files
    #[arg(long, default_value = DEFAULT_PLAYER)]
    player: String,
}

fn run(args: Args) -> Result<()> {
    let contents = fs::read_to_string(&args.file)
        .with_context(|| anyhow!("cannot read collection {}", args.file.display()))?;
    let line = contents
        .lines()
        .find(|line| compact::entry_index(line) == Some(args.index))
        .ok_or_else(|| anyhow!("no entry with index {} in {}", args.index, args.file.display()))?;
    debug!(line, "found entry");

    let engine = LocalNotationEngine::default();
    let entry = engine.parse_compact_line(line)?;
    let key = args.key.unwrap_or(entry.key);
    let stream = into_stream_info(&engine, &entry, key);
    let segment = Segment {
        tempo: args.bpm.unwrap_or(stream.tempo),
        time_signature: stream.time_signature,
        events: stream.events,
    };
    info!(
        index = args.index,
        key = %key,
        notes = segment.note_count(),
        "playing entry"
    );
    println!("{}", segment.expected_names().join(" "));

    MidiPlayer::new(args.player).play(&segment)?;
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

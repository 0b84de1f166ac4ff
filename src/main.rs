//! Lingodrill - Spoken-Language Drill
//!
//! Terminal front end for the drill engine: presents dialogue prompts and
//! grades typed (or piped-in transcribed) answers. `--tiles` switches to
//! word-tile assembly instead of free text.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use lingodrill::audio::NullPlayer;
use lingodrill::config::DrillConfig;
use lingodrill::dialogue::Dialogue;
use lingodrill::session::{DialogueSession, MessageKind, Turn};
use lingodrill::storage::{JsonFileStore, KeyValueStore, ProgressStore};
use lingodrill::tiles::TileBoard;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the dialogue JSON file
    dialogue: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Discard saved progress and start over
    #[arg(long)]
    reset: bool,

    /// Assemble answers from shuffled word tiles instead of typing them
    #[arg(long)]
    tiles: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let level = if args.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("🗣️ Lingodrill v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = DrillConfig::load()?;
    let dialogue = Dialogue::load(&args.dialogue)?;
    let store = JsonFileStore::open_default()?;
    let progress = ProgressStore::new(store, config.storage.clone());

    let mut session = DialogueSession::new(dialogue, config, Arc::new(NullPlayer), progress)?;

    if args.reset {
        let id = session.dialogue().id.clone();
        session.progress_store().reset(&id);
    }

    println!("=== {} ===", session.dialogue().title);
    if args.tiles {
        println!("Pick tiles by number (e.g. \"3 1 2\"), 'u' to undo. Commands: /skip, /quit\n");
    } else {
        println!("Answer each prompt. Commands: /skip, /quit\n");
    }

    let resumed = session.start().await?;
    if resumed {
        println!("(resumed from saved progress)\n");
    }
    let mut printed_through = print_new_messages(&session, 0);

    let mut board: Option<TileBoard> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while !session.is_complete() {
        if args.tiles && board.is_none() {
            board = make_board(&session);
            if let Some(b) = &board {
                print_rack(b);
            }
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        let turn = match input {
            "/quit" => break,
            "/skip" => {
                board = None;
                session.skip().await?
            }
            _ => match board.as_mut() {
                Some(b) => match handle_tile_input(b, input) {
                    Some(assembled) => {
                        board = None;
                        session.submit(&assembled).await?
                    }
                    None => {
                        print_rack(b);
                        Turn::Ignored
                    }
                },
                None => session.submit(input).await?,
            },
        };
        if turn == Turn::HintShown {
            // A miss hands back a fresh rack
            board = None;
        }

        printed_through = print_new_messages(&session, printed_through);
    }

    if session.is_complete() {
        let state = session.state();
        let duration_s = match (state.started_at_ms, state.ended_at_ms) {
            (Some(start), Some(end)) => (end - start) / 1000,
            _ => 0,
        };
        println!("\n🎉 Dialogue complete!");
        println!("   Words spoken: {}", state.words_spoken);
        println!("   Steps skipped: {}", state.skipped_phrases.len());
        println!("   Time: {}s", duration_s);
    } else {
        println!("\nProgress saved. Run again to resume.");
    }

    Ok(())
}

/// Build a tile board for the active step, if it expects an answer
fn make_board<S: KeyValueStore>(session: &DialogueSession<S>) -> Option<TileBoard> {
    let step = session.current_step()?;
    let expected = step.expected_response.as_deref()?;
    Some(TileBoard::new(expected, &mut rand::thread_rng()))
}

fn print_rack(board: &TileBoard) {
    let rack: Vec<String> = board
        .tiles()
        .iter()
        .enumerate()
        .map(|(i, tile)| {
            if tile.used {
                format!("[{}] —", i + 1)
            } else {
                format!("[{}] {}", i + 1, tile.word)
            }
        })
        .collect();
    println!("🧩 {}", rack.join("  "));
    if !board.assembled_text().is_empty() {
        println!("   so far: {}", board.assembled_text());
    }
}

/// Apply one line of tile commands. Returns the assembled sentence once every
/// tile is placed.
fn handle_tile_input(board: &mut TileBoard, input: &str) -> Option<String> {
    for token in input.split_whitespace() {
        if token == "u" {
            board.undo_last();
            continue;
        }
        if let Ok(number) = token.parse::<usize>() {
            if number >= 1 {
                board.select(number - 1);
            }
        }
    }
    if board.all_selected() {
        Some(board.assembled_text())
    } else {
        None
    }
}

/// Print messages newer than `after_id`, returning the new high-water mark
fn print_new_messages<S: KeyValueStore>(session: &DialogueSession<S>, after_id: u64) -> u64 {
    let mut last = after_id;
    for message in session.messages_since(after_id) {
        match &message.kind {
            MessageKind::Prompt { text, .. } => println!("👩‍🏫 {}", text),
            MessageKind::Learner { text, accepted, .. } => {
                let mark = if *accepted { "✅" } else { "❌" };
                println!("   you: {} {}", text, mark);
            }
            MessageKind::Hint { text, .. } => println!("   {}", text),
            MessageKind::Reveal { text, .. } => println!("👩‍🏫 The answer was: {}", text),
            MessageKind::Success { text, .. } => println!("👩‍🏫 {}", text),
        }
        last = message.id;
    }
    last
}

use std::io::{self, Write};

use bevy_math::{USizeVec2, usizevec2};
use clap::Parser;
use tictactoe_sync::{
    client::{Session, SyncClient, SyncStatus},
    logic::{Board, GameState, Outcome},
};

#[derive(Parser, Debug)]
#[command(about = "Play the shared tic-tac-toe game from a terminal")]
struct Args {
    #[arg(long, env = "BACKEND_URL", default_value = "http://localhost:3000")]
    server_url: String,

    /// Send single moves for the server to validate instead of whole game states
    #[arg(long)]
    hardened: bool,
}

enum Command {
    Play(usize),
    Reset,
    Refresh,
    Quit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't tear up the board
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let args = Args::parse();

    println!("❌⭕ Tic Tac Toe");
    println!("===============");
    let client = SyncClient::new(args.server_url);
    println!("📡 Connecting to {}...", client.base_url());
    match client.health().await {
        Ok(status) => println!("✅ {}", status),
        Err(e) => eprintln!("⚠️  Server unreachable, playing locally: {}", e),
    }

    let mut session = Session::connect(client, args.hardened).await;
    if session.is_hardened() {
        println!("🛡️  Hardened mode: the server checks every move");
    }

    loop {
        display_board(session.state());

        match prompt_command(session.outcome())? {
            Command::Play(index) => match session.play(index).await {
                Ok(SyncStatus::Saved) => {}
                Ok(SyncStatus::Reconciled) => {
                    println!("🔄 Server did not take the move, reloaded its board")
                }
                Ok(SyncStatus::Offline) => println!("⚠️  Move kept locally, server unreachable"),
                Ok(SyncStatus::Unconfirmed) => println!("⚠️  Server did not confirm the move"),
                Err(e) => println!("❌ {}", e),
            },
            Command::Reset => {
                match session.reset().await {
                    SyncStatus::Offline => println!("⚠️  Server unreachable, board not reset"),
                    SyncStatus::Unconfirmed => println!("⚠️  Server did not confirm the reset"),
                    SyncStatus::Saved | SyncStatus::Reconciled => {}
                }
            }
            Command::Refresh => {
                if let Err(e) = session.refresh().await {
                    println!("⚠️  Could not refresh: {}", e);
                }
            }
            Command::Quit => break,
        }
    }

    println!("👋 Thanks for playing.");
    Ok(())
}

fn display_board(state: &GameState) {
    println!("\n     A   B   C");
    for (y, row) in state.board.rows().enumerate() {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                Some(mark) => mark.to_string(),
                None => " ".into(),
            })
            .collect();
        println!("  {}  {} ", y + 1, cells.join(" | "));
        if y + 1 < 3 {
            println!("    ---+---+---");
        }
    }
    println!();

    match state.outcome() {
        Outcome::InProgress => println!("  {} to move", state.turn),
        Outcome::Won(mark) => println!("  🎉 {} wins!", mark),
        Outcome::Tie => println!("  🤝 It's a tie!"),
    }
}

/// Parses `B2` style coordinates: column letter, then row number counted from the top.
fn parse_coordinate(coord: &str) -> Option<USizeVec2> {
    let mut chars = coord.chars();
    let col = match chars.next()?.to_ascii_uppercase() {
        'A' => 0,
        'B' => 1,
        'C' => 2,
        _ => return None,
    };
    let row = match chars.next()? {
        '1' => 0,
        '2' => 1,
        '3' => 2,
        _ => return None,
    };
    if chars.next().is_some() {
        return None;
    }
    Some(usizevec2(col, row))
}

fn parse_command(input: &str) -> Option<Command> {
    match input.trim().to_lowercase().as_str() {
        "q" | "quit" => Some(Command::Quit),
        "r" | "reset" => Some(Command::Reset),
        "f" | "refresh" => Some(Command::Refresh),
        other => {
            // Plain numbers count cells 1-9; out of range values are left for the game to reject
            if let Ok(n) = other.parse::<usize>() {
                return Some(Command::Play(n.wrapping_sub(1)));
            }
            parse_coordinate(other)
                .and_then(Board::index_of)
                .map(Command::Play)
        }
    }
}

fn prompt_command(outcome: Outcome) -> io::Result<Command> {
    if outcome.is_over() {
        println!("💭 Game over. Enter R to reset, F to refresh, Q to quit.");
    } else {
        println!("💭 Enter a cell (A1-C3 or 1-9), R to reset, F to refresh, Q to quit.");
    }

    loop {
        print!("🎯 ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(Command::Quit);
        }
        match parse_command(&input) {
            Some(command) => return Ok(command),
            None => println!("  Invalid input: {}", input.trim()),
        }
    }
}

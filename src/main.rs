use anyhow::{bail, Context};
use scrabble_core::{
    bag::Tile,
    board::Coordinate,
    game::{GameController, Phase, Seat},
    judge::Judge,
    persistence::MemoryStore,
    player::{Player, RACK_SIZE},
    rules::{Difficulty, GameConfig},
};
use std::io;
use std::str::FromStr;

static DEFAULT_WORDS: &str = include_str!("../data/test_words.txt");

const HELP: &str = "place <letter> <row,col> (use ?x for a blank as x) | remove <row,col> | submit | recall | pass | exchange <letters> | challenge <word> | save | quit";

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let words = match args.next() {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Couldn't read word list {path}"))?,
        None => DEFAULT_WORDS.to_string(),
    };
    let difficulty = match args.next() {
        Some(level) => Difficulty::from_str(&level)
            .with_context(|| format!("{level} is not one of easy, medium or hard"))?,
        None => Difficulty::default(),
    };

    clear();
    let name = user_input("Your name:");
    let config = GameConfig {
        difficulty,
        ..GameConfig::default()
    };
    let mut game = GameController::new(
        Player::human(1, name, RACK_SIZE),
        Box::new(Judge::from_word_list(&words)),
        config,
    );
    let mut store = MemoryStore::new();
    let mut message = String::new();
    let mut window_opened = instant::Instant::now();

    loop {
        clear();
        render(&game, &message);
        if game.phase() == Phase::GameOver {
            return Ok(());
        }

        if game.turn() == Seat::Ai {
            message = match game.ai_move()? {
                Some(mv) => format!("AI: {mv}"),
                None => "AI passes".to_string(),
            };
            window_opened = instant::Instant::now();
            continue;
        }

        let input = user_input(HELP);
        if let Some(outcome) = game.tick_challenge(window_opened.elapsed().as_secs() as u32) {
            println!("{outcome}");
        }
        window_opened = instant::Instant::now();

        message = match run_command(&mut game, &mut store, &input) {
            Ok(Some(reply)) => reply,
            Ok(None) => return Ok(()),
            Err(e) => e.to_string(),
        };
    }
}

/// Returns `None` once the player wants to stop.
fn run_command(
    game: &mut GameController,
    store: &mut MemoryStore,
    input: &str,
) -> anyhow::Result<Option<String>> {
    let mut parts = input.split_whitespace();
    let reply = match parts.next().unwrap_or_default() {
        "place" | "p" => {
            let tile = parse_tile(parts.next().unwrap_or_default())?;
            let position = parse_coordinate(parts.next().unwrap_or_default())?;
            game.place_tile(position, tile)?;
            format!("Placed {tile} at {position}")
        }
        "remove" | "r" => {
            let position = parse_coordinate(parts.next().unwrap_or_default())?;
            let tile = game.remove_tile(position)?;
            format!("Took {tile} back")
        }
        "submit" | "s" => game.submit_move()?.message,
        "recall" => {
            game.recall_tiles();
            "Tiles recalled".to_string()
        }
        "pass" => {
            game.pass_turn()?;
            "You pass".to_string()
        }
        "exchange" | "x" => {
            let tiles = parts
                .next()
                .unwrap_or_default()
                .chars()
                .map(|c| {
                    if c == Tile::BLANK {
                        Tile::blank()
                    } else {
                        Tile::standard(c)
                    }
                })
                .collect::<Vec<_>>();
            let drawn = game.exchange_tiles(&tiles)?;
            format!("Exchanged for {}", drawn.len())
        }
        "challenge" | "c" => game.challenge_word(parts.next().unwrap_or_default())?.to_string(),
        "save" => format!("Saved as game {}", game.save_game(store)?),
        "quit" | "q" => return Ok(None),
        other => bail!("Sorry, I couldn't read {other:?}"),
    };
    Ok(Some(reply))
}

fn parse_tile(token: &str) -> anyhow::Result<Tile> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(Tile::BLANK), Some(letter)) if letter.is_ascii_alphabetic() => {
            Ok(Tile::blank().designate(letter))
        }
        (Some(Tile::BLANK), None) => Ok(Tile::blank()),
        (Some(letter), None) if letter.is_ascii_alphabetic() => Ok(Tile::standard(letter)),
        _ => bail!("{token:?} is not a tile"),
    }
}

fn parse_coordinate(token: &str) -> anyhow::Result<Coordinate> {
    let token = if token.starts_with('(') {
        token.to_string()
    } else {
        format!("({token})")
    };
    Ok(Coordinate::from_str(&token)?)
}

fn render(game: &GameController, message: &str) {
    println!("{}", game.board());
    println!();
    println!("{}", game.info());
    println!("Your rack: {}", game.player().rack);
    if !message.is_empty() {
        println!();
        println!("{message}");
    }
    if let Some(winner) = game.winner() {
        println!();
        println!("Game over! Winner: {winner}");
    }
    println!();
}

// Utilities
fn user_input(prompt: &str) -> String {
    println!("{}", prompt);
    let mut capture_string = String::new();
    io::stdin()
        .read_line(&mut capture_string)
        .expect("Failed to read line");
    println!();
    capture_string.trim().to_string()
}

fn clear() {
    clearscreen::clear().expect("failed to clear screen");
}

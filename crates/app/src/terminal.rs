//! Line-based terminal front end for a game.

use std::io::Write;

use quiz_core::model::{Question, User};
use quiz_core::quiz::{AnswerOutcome, FinalStandings, Lobby};
use services::{AppServices, GameEvent, GameLoop, GameOutcome, IntervalTicker, PlayerInput};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;

use crate::args::Args;

type InputLines = Lines<BufReader<Stdin>>;

/// What a line typed at the seating prompt asks for.
#[derive(Debug, PartialEq, Eq)]
enum SeatChoice {
    Start,
    /// Zero-based seat index.
    Remove(usize),
    Invalid,
}

fn seat_choice(line: &str, seats: usize) -> SeatChoice {
    match line.trim() {
        "" => SeatChoice::Start,
        other => match other.parse::<usize>() {
            Ok(n) if (1..=seats).contains(&n) => SeatChoice::Remove(n - 1),
            _ => SeatChoice::Invalid,
        },
    }
}

/// Seat the players, run one game against the wall clock and record it.
///
/// Without an account or named players the table gets a single guest seat.
pub async fn play(
    services: &AppServices,
    args: &Args,
    user: Option<User>,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = match user {
        Some(user) => Some(user),
        None if args.players.is_empty() => {
            Some(services.auth().sign_in_as_guest(args.name.as_deref())?)
        }
        None => None,
    };

    let mut lobby = Lobby::new();
    if let Some(user) = &user {
        lobby.join_user(user)?;
    }
    for name in &args.players {
        lobby.join(name, None)?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    confirm_seats(&mut lobby, &mut lines).await?;

    let games = services.games();
    let session = games.start(lobby, args.category.as_deref())?;

    let (input_tx, input_rx) = mpsc::channel(16);
    let (event_tx, mut event_rx) = mpsc::channel(64);
    tokio::spawn(read_inputs(lines, input_tx));
    let game = tokio::spawn(
        GameLoop::new(session, IntervalTicker::default(), input_rx, event_tx).run(),
    );

    let mut current: Option<Question> = None;
    while let Some(event) = event_rx.recv().await {
        render(&event, &mut current);
    }

    match game.await? {
        GameOutcome::Completed { standings, answers } => {
            let stored = games.record(&standings, &answers).await?;
            if !stored.is_empty() {
                println!("Result saved to your profile.");
            }
        }
        GameOutcome::Abandoned => println!("Game abandoned."),
    }
    Ok(())
}

/// List the table and let seats be dropped until Enter starts the game.
async fn confirm_seats(
    lobby: &mut Lobby,
    lines: &mut InputLines,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        for (seat, player) in lobby.players().iter().enumerate() {
            println!(
                "  {}. [{}] {} ({})",
                seat + 1,
                player.initials(),
                player.name(),
                player.avatar_tag()
            );
        }
        if lobby.len() < 2 {
            return Ok(());
        }
        print!("Seat number to remove, or Enter to start: ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        match seat_choice(&line, lobby.len()) {
            SeatChoice::Start => return Ok(()),
            SeatChoice::Remove(index) => {
                let id = lobby.players()[index].id().clone();
                let left = lobby.leave(&id)?;
                println!("{} left the table.", left.name());
            }
            SeatChoice::Invalid => println!("Type a seat number or press Enter."),
        }
    }
}

async fn read_inputs(mut lines: InputLines, tx: mpsc::Sender<PlayerInput>) {
    while let Ok(Some(line)) = lines.next_line().await {
        let input = match line.trim() {
            "q" | "quit" => PlayerInput::Quit,
            "" | "n" | "next" => PlayerInput::Advance,
            other => match other.parse::<usize>() {
                Ok(n @ 1..=4) => PlayerInput::Select(n - 1),
                _ => {
                    println!("Type 1-4 to answer, Enter to continue, q to quit.");
                    continue;
                }
            },
        };
        if tx.send(input).await.is_err() {
            break;
        }
    }
}

fn render(event: &GameEvent, current: &mut Option<Question>) {
    match event {
        GameEvent::QuestionShown {
            index,
            total,
            question,
            player,
            seconds_remaining,
        } => {
            println!();
            println!(
                "Question {}/{} [{}] for {} ({seconds_remaining}s)",
                index + 1,
                total,
                question.category(),
                player.name()
            );
            println!("{}", question.prompt());
            for (i, option) in question.options().iter().enumerate() {
                println!("  {}) {option}", i + 1);
            }
            *current = Some(question.clone());
        }
        GameEvent::Tick { seconds_remaining } => {
            if *seconds_remaining % 5 == 0 || *seconds_remaining <= 3 {
                println!("  {seconds_remaining}s left");
            }
        }
        GameEvent::Answered(AnswerOutcome::Correct {
            player_id: _,
            points,
            streak,
            streak_milestone,
            quick_answer,
        }) => {
            println!("Correct! +{points}");
            if *quick_answer {
                println!("Quick answer!");
            }
            if *streak_milestone {
                println!("On fire: {streak} in a row!");
            }
            println!("Press Enter for the next question.");
        }
        GameEvent::Answered(AnswerOutcome::Incorrect {
            correct_option_index,
        }) => {
            println!(
                "Wrong. The answer was {}.",
                answer_text(current.as_ref(), *correct_option_index)
            );
            println!("Press Enter for the next question.");
        }
        GameEvent::Answered(AnswerOutcome::Ignored) => {}
        GameEvent::TimedOut {
            correct_option_index,
        } => {
            println!(
                "Time's up! The answer was {}.",
                answer_text(current.as_ref(), *correct_option_index)
            );
            println!("Press Enter for the next question.");
        }
        GameEvent::Completed(standings) => print_standings(standings),
        GameEvent::Abandoned => {}
    }
}

fn answer_text(current: Option<&Question>, index: usize) -> String {
    current
        .and_then(|q| q.options().get(index))
        .map_or_else(|| format!("{}", index + 1), |text| format!("{}) {text}", index + 1))
}

fn print_standings(standings: &FinalStandings) {
    println!();
    println!("Final standings");
    for (rank, player) in standings.players().iter().enumerate() {
        println!("  {}. {:<16} {:>6}", rank + 1, player.name(), player.score());
    }
    if let Some(winner) = standings.winner() {
        println!("Winner: {}", winner.name());
    }
}

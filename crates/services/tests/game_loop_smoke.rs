use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{Player, PlayerId, Question, QuestionId};
use quiz_core::quiz::{AnswerOutcome, Lobby, QuizSession, SessionConfig};
use quiz_core::time::fixed_clock;
use services::{
    AppServices, AppServicesError, GameEvent, GameLoop, GameOutcome, IdentityProvider,
    LocalIdentityProvider, ManualTicker, PlayerInput, QuizConfig, TickHandle,
};
use storage::repository::Storage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

fn question(id: u64, correct: usize) -> Question {
    Question::new(
        QuestionId::new(id),
        format!("Question {id}"),
        ["a", "b", "c", "d"].map(String::from),
        correct,
        "General",
    )
    .unwrap()
}

struct Running {
    ticks: TickHandle,
    inputs: mpsc::Sender<PlayerInput>,
    events: mpsc::Receiver<GameEvent>,
    task: JoinHandle<GameOutcome>,
}

fn spawn(session: QuizSession) -> Running {
    let (ticker, ticks) = ManualTicker::channel();
    let (inputs, input_rx) = mpsc::channel(8);
    let (event_tx, events) = mpsc::channel(64);
    let task = tokio::spawn(GameLoop::new(session, ticker, input_rx, event_tx).run());
    Running {
        ticks,
        inputs,
        events,
        task,
    }
}

async fn next_event(events: &mut mpsc::Receiver<GameEvent>) -> GameEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event in time")
        .expect("loop still running")
}

#[tokio::test]
async fn single_player_two_questions_scores_260() {
    let player = Player::new(PlayerId::new("ana"), "Ana", "red").unwrap();
    let session = QuizSession::start(
        vec![question(1, 2), question(2, 0)],
        vec![player],
        SessionConfig::default(),
    )
    .unwrap();
    let mut game = spawn(session);

    assert!(matches!(
        next_event(&mut game.events).await,
        GameEvent::QuestionShown {
            index: 0,
            total: 2,
            seconds_remaining: 15,
            ..
        }
    ));
    game.inputs.send(PlayerInput::Select(2)).await.unwrap();
    assert!(matches!(
        next_event(&mut game.events).await,
        GameEvent::Answered(AnswerOutcome::Correct { points: 150, .. })
    ));
    // a second pick on a revealed question changes nothing
    game.inputs.send(PlayerInput::Select(1)).await.unwrap();
    game.inputs.send(PlayerInput::Advance).await.unwrap();
    assert!(matches!(
        next_event(&mut game.events).await,
        GameEvent::QuestionShown { index: 1, .. }
    ));

    for expected in (10..15).rev() {
        assert!(game.ticks.fire());
        assert_eq!(
            next_event(&mut game.events).await,
            GameEvent::Tick {
                seconds_remaining: expected
            }
        );
    }
    game.inputs.send(PlayerInput::Select(0)).await.unwrap();
    assert!(matches!(
        next_event(&mut game.events).await,
        GameEvent::Answered(AnswerOutcome::Correct {
            points: 110,
            streak: 2,
            ..
        })
    ));
    game.inputs.send(PlayerInput::Advance).await.unwrap();

    let GameEvent::Completed(standings) = next_event(&mut game.events).await else {
        panic!("expected completion");
    };
    assert_eq!(standings.winner().unwrap().score(), 260);

    let GameOutcome::Completed { answers, .. } = game.task.await.unwrap() else {
        panic!("expected a completed game");
    };
    assert_eq!(answers.len(), 2);
    assert!(answers.iter().all(|a| a.correct));
}

#[tokio::test]
async fn timeout_reveals_and_stale_ticks_do_not_leak_into_next_question() {
    let players = vec![
        Player::new(PlayerId::new("a"), "Ana", "red").unwrap(),
        Player::new(PlayerId::new("b"), "Luis", "blue").unwrap(),
    ];
    let session = QuizSession::start(
        vec![question(1, 0), question(2, 1)],
        players,
        SessionConfig::new(2).unwrap(),
    )
    .unwrap();
    let mut game = spawn(session);
    let _ = next_event(&mut game.events).await;

    game.ticks.fire();
    assert_eq!(
        next_event(&mut game.events).await,
        GameEvent::Tick {
            seconds_remaining: 1
        }
    );
    game.ticks.fire();
    assert_eq!(
        next_event(&mut game.events).await,
        GameEvent::TimedOut {
            correct_option_index: 0
        }
    );

    // queued while revealed; discarded when the next question starts
    game.ticks.fire();
    game.ticks.fire();
    game.inputs.send(PlayerInput::Select(0)).await.unwrap();
    game.inputs.send(PlayerInput::Advance).await.unwrap();

    let GameEvent::QuestionShown {
        index,
        player,
        seconds_remaining,
        ..
    } = next_event(&mut game.events).await
    else {
        panic!("expected the second question");
    };
    assert_eq!(index, 1);
    assert_eq!(player.name(), "Luis");
    assert_eq!(seconds_remaining, 2);

    game.ticks.fire();
    assert_eq!(
        next_event(&mut game.events).await,
        GameEvent::Tick {
            seconds_remaining: 1
        }
    );

    game.inputs.send(PlayerInput::Quit).await.unwrap();
    assert_eq!(next_event(&mut game.events).await, GameEvent::Abandoned);
    assert_eq!(game.task.await.unwrap(), GameOutcome::Abandoned);
}

#[tokio::test]
async fn finished_game_is_recorded_for_signed_in_players() {
    let storage = Storage::in_memory();
    let provider = Arc::new(LocalIdentityProvider::new(
        fixed_clock(),
        Arc::clone(&storage.accounts),
    ));
    let config = QuizConfig {
        questions_per_game: 3,
        seed: Some(11),
        ..QuizConfig::default()
    };
    let services = AppServices::assemble(
        &config,
        fixed_clock(),
        storage,
        provider.clone() as Arc<dyn IdentityProvider>,
    )
    .unwrap();

    services
        .auth()
        .register("ana@example.com", "Ana", None)
        .await
        .unwrap();
    let code = provider.last_code("ana@example.com").await.unwrap();
    let ana = services
        .auth()
        .verify("ana@example.com", &code)
        .await
        .unwrap();
    let guest = services.auth().sign_in_as_guest(Some("Rosa")).unwrap();

    let mut lobby = Lobby::new();
    lobby.join_user(&ana).unwrap();
    lobby.join_user(&guest).unwrap();
    let session = services.games().start(lobby, None).unwrap();
    let mut game = spawn(session);

    loop {
        match next_event(&mut game.events).await {
            GameEvent::QuestionShown { question, .. } => {
                let pick = question.correct_option_index();
                game.inputs.send(PlayerInput::Select(pick)).await.unwrap();
            }
            GameEvent::Answered(_) => {
                game.inputs.send(PlayerInput::Advance).await.unwrap();
            }
            GameEvent::Completed(_) => break,
            other => panic!("unexpected event {other:?}"),
        }
    }

    let GameOutcome::Completed { standings, answers } = game.task.await.unwrap() else {
        panic!("expected a completed game");
    };
    let ids = services.games().record(&standings, &answers).await.unwrap();
    assert_eq!(ids.len(), 1);

    let account = ana.account_id().unwrap();
    let stats = services.profiles().stats(account).await.unwrap();
    assert_eq!(stats.quizzes_completed, 1);
    // Ana holds questions 1 and 3 in the rotation
    assert_eq!(stats.correct_answers, 2);
    let ana_score = standings
        .players()
        .iter()
        .find(|p| p.account() == Some(account))
        .unwrap()
        .score();
    assert_eq!(stats.total_points, u64::from(ana_score));

    let profile = services.profiles().profile(account).await.unwrap().unwrap();
    assert_eq!(profile.points, u64::from(ana_score));
}

#[test]
fn missing_bank_file_is_reported_with_its_path() {
    let config = QuizConfig {
        bank_file: Some("/nonexistent/quiz-bank.json".into()),
        ..QuizConfig::default()
    };
    let storage = Storage::in_memory();
    let provider = Arc::new(LocalIdentityProvider::new(
        fixed_clock(),
        Arc::clone(&storage.accounts),
    ));
    let err = AppServices::assemble(&config, fixed_clock(), storage, provider)
        .err()
        .expect("bank file cannot be read");
    assert!(matches!(
        err,
        AppServicesError::BankFile { ref path, .. } if path == "/nonexistent/quiz-bank.json"
    ));
}

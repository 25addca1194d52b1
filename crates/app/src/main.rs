use std::io::Write;

use quiz_core::model::User;
use services::{AppServices, Clock, QuizConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod args;
mod terminal;

use args::{Args, Command, prepare_sqlite_file, print_usage};

const DEFAULT_LOG_FILTER: &str = "quiz=info,services=info,storage=info";
const HISTORY_ROWS: usize = 5;
const DEFAULT_REDIRECT: &str = "http://localhost:3000";

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: a game when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut config = QuizConfig::from_env()?;
    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter, &mut config).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so services stay pure.
    prepare_sqlite_file(&config.db_url)?;
    let services = AppServices::new_sqlite(&config, Clock::default()).await?;
    tracing::debug!(db = %config.db_url, command = ?cmd, "services ready");
    let auth = services.auth();

    match cmd {
        Command::Play => {
            let user = match (&parsed.email, &parsed.password) {
                (Some(email), Some(password)) => Some(auth.sign_in(email, password).await?),
                _ => None,
            };
            terminal::play(&services, &parsed, user).await
        }
        Command::Guest => {
            let guest = auth.sign_in_as_guest(parsed.name.as_deref())?;
            terminal::play(&services, &parsed, Some(guest)).await
        }
        Command::Register => {
            let email = parsed.require_email()?;
            let name = parsed.require_name()?;
            auth.register(email, name, parsed.password.as_deref()).await?;
            let user = loop {
                let code = prompt("Enter the 8-digit code sent to your email (r to resend): ")?;
                if code.eq_ignore_ascii_case("r") {
                    match auth.resend_code(email).await {
                        Ok(()) => println!("A new code is on its way."),
                        Err(err) => println!("{err}"),
                    }
                    continue;
                }
                break auth.verify(email, &code).await?;
            };
            println!("Welcome, {}!", user.display_name());
            auth.sign_out().await?;
            Ok(())
        }
        Command::Login => {
            auth.sign_in(parsed.require_email()?, parsed.require_password()?)
                .await?;
            let result = print_current(&services).await;
            auth.sign_out().await?;
            result
        }
        Command::Stats => {
            let user = auth
                .sign_in(parsed.require_email()?, parsed.require_password()?)
                .await?;
            let result = print_stats(&services, &user).await;
            auth.sign_out().await?;
            result
        }
        Command::Rename => {
            let name = parsed.require_name()?;
            auth.sign_in(parsed.require_email()?, parsed.require_password()?)
                .await?;
            auth.update_name(name).await?;
            let result = print_current(&services).await;
            auth.sign_out().await?;
            result
        }
        Command::SetPassword => {
            let email = parsed.require_email()?;
            let password = parsed.require_new_password()?;
            auth.request_login_code(email).await?;
            let code = prompt("Enter the 8-digit code sent to your email: ")?;
            auth.verify(email, &code).await?;
            let user = auth.set_password(password).await?;
            println!("Password set for {}.", user.display_name());
            auth.sign_out().await?;
            Ok(())
        }
        Command::ChangePassword => {
            let user = auth
                .change_password(
                    parsed.require_email()?,
                    parsed.require_password()?,
                    parsed.require_new_password()?,
                )
                .await?;
            println!("Password changed for {}.", user.display_name());
            auth.sign_out().await?;
            Ok(())
        }
        Command::ResetPassword => {
            let email = parsed.require_email()?;
            auth.request_password_reset(email, parsed.redirect.as_deref())
                .await?;
            println!("If an account exists for {email}, a recovery code was sent.");
            let code = prompt("Enter the 8-digit recovery code: ")?;
            let password = match parsed.new_password.clone() {
                Some(password) => password,
                None => prompt("New password: ")?,
            };
            let user = auth.complete_password_reset(email, &code, &password).await?;
            println!("Password reset. Welcome back, {}!", user.display_name());
            auth.sign_out().await?;
            Ok(())
        }
        Command::GoogleUrl => {
            let redirect = parsed.redirect.as_deref().unwrap_or(DEFAULT_REDIRECT);
            println!("{}", auth.google_sign_in_url(redirect)?);
            Ok(())
        }
    }
}

fn prompt(label: &str) -> std::io::Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Profile of whoever the identity session currently belongs to.
async fn print_current(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    match services.auth().current_user().await? {
        Some(user) => print_profile(services, &user).await,
        None => {
            println!("Not signed in.");
            Ok(())
        }
    }
}

async fn print_profile(
    services: &AppServices,
    user: &User,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{} ({} account)", user.display_name(), user.account_type());
    if user.has_google_linked() {
        println!("  google: linked");
    }
    if let Some(id) = user.account_id() {
        if let Some(profile) = services.profiles().profile(id).await? {
            println!("  email:  {}", profile.email);
            println!("  level:  {}", profile.level);
            println!("  points: {}", profile.points);
        }
    }
    if user.needs_password() {
        println!("This account has no password yet; set one to sign in with email.");
    }
    Ok(())
}

async fn print_stats(
    services: &AppServices,
    user: &User,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(id) = user.account_id() else {
        println!("Guests have no stats.");
        return Ok(());
    };
    let profiles = services.profiles();
    let stats = profiles.stats(id).await?;
    println!("{}", user.display_name());
    println!("  quizzes completed: {}", stats.quizzes_completed);
    println!("  total points:      {}", stats.total_points);
    println!("  average score:     {:.2}", stats.average_score);
    println!("  correct answers:   {}", stats.correct_answers);

    let history = profiles.history(id).await?;
    for result in history.iter().take(HISTORY_ROWS) {
        println!(
            "  {}  {:>6} pts  {}/{} correct",
            result.completed_at.format("%Y-%m-%d %H:%M"),
            result.score,
            result.correct_answers,
            result.total_questions
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        // a missing .env is fine
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("warning: failed to load .env: {e}");
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let code = match run().await {
        Ok(()) => 0,
        Err(err) => {
            // At this layer (binary glue), printing once is fine.
            eprintln!("{err}");
            2
        }
    };
    // the stdin reader task can still be parked on a read
    std::process::exit(code);
}

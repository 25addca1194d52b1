use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use services::QuizConfig;

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    MissingFlag { flag: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play,
    Guest,
    Register,
    Login,
    Stats,
    Rename,
    SetPassword,
    ChangePassword,
    ResetPassword,
    GoogleUrl,
}

impl Command {
    pub fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "guest" => Some(Self::Guest),
            "register" => Some(Self::Register),
            "login" => Some(Self::Login),
            "stats" => Some(Self::Stats),
            "rename" => Some(Self::Rename),
            "set-password" => Some(Self::SetPassword),
            "change-password" => Some(Self::ChangePassword),
            "reset-password" => Some(Self::ResetPassword),
            "google-url" => Some(Self::GoogleUrl),
            _ => None,
        }
    }
}

/// Flags shared by every subcommand. Unused ones are ignored by the command.
#[derive(Debug, Clone, Default)]
pub struct Args {
    pub players: Vec<String>,
    pub category: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub new_password: Option<String>,
    pub name: Option<String>,
    pub redirect: Option<String>,
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz play            [--players <a,b,...>] [--email <e> --password <p>]");
    eprintln!("                       [--questions <n>] [--seconds <n>] [--seed <n>]");
    eprintln!("                       [--category <c>] [--name <guest name>]");
    eprintln!("  quiz guest           [--name <n>]");
    eprintln!("  quiz register        --email <e> --name <n> [--password <p>]");
    eprintln!("  quiz login           --email <e> --password <p>");
    eprintln!("  quiz stats           --email <e> --password <p>");
    eprintln!("  quiz rename          --email <e> --password <p> --name <n>");
    eprintln!("  quiz set-password    --email <e> --new-password <p>");
    eprintln!("  quiz change-password --email <e> --password <p> --new-password <p>");
    eprintln!("  quiz reset-password  --email <e> [--new-password <p>] [--redirect <url>]");
    eprintln!("  quiz google-url      [--redirect <url>]");
    eprintln!();
    eprintln!("Common flags:");
    eprintln!("  --db <sqlite_url>   (default sqlite://quiz.sqlite3)");
    eprintln!("  --bank <file.json>  question bank to use instead of the built-in one");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_QUESTIONS_PER_GAME, QUIZ_SECONDS_PER_QUESTION, QUIZ_SEED,");
    eprintln!("  QUIZ_BANK_FILE,");
    eprintln!("  QUIZ_AUTH_URL, QUIZ_AUTH_KEY, QUIZ_LOGIN_MAX_ATTEMPTS, QUIZ_LOGIN_LOCKOUT_SECS");
    eprintln!("  RUST_LOG (default quiz=info,services=info,storage=info)");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(raw: String, flag: &'static str) -> Result<T, ArgsError> {
    match raw.trim().parse() {
        Ok(n) => Ok(n),
        Err(_) => Err(ArgsError::InvalidNumber { flag, raw }),
    }
}

impl Args {
    /// Parse flags on top of an environment-derived config; flags win.
    pub fn parse(
        args: &mut impl Iterator<Item = String>,
        config: &mut QuizConfig,
    ) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();
        config.db_url = normalize_sqlite_url(std::mem::take(&mut config.db_url));

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    config.db_url = normalize_sqlite_url(value);
                }
                "--questions" => {
                    let value = require_value(args, "--questions")?;
                    let n: usize = parse_number(value.clone(), "--questions")?;
                    if n == 0 {
                        return Err(ArgsError::InvalidNumber {
                            flag: "--questions",
                            raw: value,
                        });
                    }
                    config.questions_per_game = n;
                }
                "--seconds" => {
                    let value = require_value(args, "--seconds")?;
                    let n: u32 = parse_number(value.clone(), "--seconds")?;
                    if n == 0 {
                        return Err(ArgsError::InvalidNumber {
                            flag: "--seconds",
                            raw: value,
                        });
                    }
                    config.seconds_per_question = n;
                }
                "--seed" => {
                    let value = require_value(args, "--seed")?;
                    config.seed = Some(parse_number(value, "--seed")?);
                }
                "--players" => {
                    let value = require_value(args, "--players")?;
                    parsed.players = value
                        .split(',')
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(str::to_owned)
                        .collect();
                }
                "--bank" => {
                    let value = require_value(args, "--bank")?;
                    config.bank_file = Some(value.trim().to_string());
                }
                "--category" => parsed.category = Some(require_value(args, "--category")?),
                "--email" => parsed.email = Some(require_value(args, "--email")?),
                "--password" => parsed.password = Some(require_value(args, "--password")?),
                "--new-password" => {
                    parsed.new_password = Some(require_value(args, "--new-password")?);
                }
                "--name" => parsed.name = Some(require_value(args, "--name")?),
                "--redirect" => parsed.redirect = Some(require_value(args, "--redirect")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    pub fn require_email(&self) -> Result<&str, ArgsError> {
        self.email
            .as_deref()
            .ok_or(ArgsError::MissingFlag { flag: "--email" })
    }

    pub fn require_password(&self) -> Result<&str, ArgsError> {
        self.password
            .as_deref()
            .ok_or(ArgsError::MissingFlag { flag: "--password" })
    }

    pub fn require_new_password(&self) -> Result<&str, ArgsError> {
        self.new_password
            .as_deref()
            .ok_or(ArgsError::MissingFlag {
                flag: "--new-password",
            })
    }

    pub fn require_name(&self) -> Result<&str, ArgsError> {
        self.name
            .as_deref()
            .ok_or(ArgsError::MissingFlag { flag: "--name" })
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Resolve a `--db` / `QUIZ_DB_URL` value to an absolute `sqlite://` URL.
/// Bare paths and `sqlite:relative` are taken relative to the working directory.
pub fn normalize_sqlite_url(raw: String) -> String {
    let raw = raw.trim();
    if raw.starts_with("sqlite://") || is_in_memory(raw) {
        return raw.to_string();
    }
    let path = PathBuf::from(raw.strip_prefix("sqlite:").unwrap_or(raw));
    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", path.display())
}

/// Make sure the database file and its directory exist before the pool opens it.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if is_in_memory(db_url) {
        return Ok(());
    }
    let invalid = || ArgsError::InvalidDbUrl {
        raw: db_url.to_string(),
    };
    let rest = db_url.strip_prefix("sqlite://").ok_or_else(invalid)?;
    let file = Path::new(rest.split('?').next().unwrap_or_default());
    if file.as_os_str().is_empty() {
        return Err(invalid().into());
    }
    if let Some(dir) = file.parent() {
        fs::create_dir_all(dir)?;
    }
    // append mode creates a missing file and leaves an existing one untouched
    fs::OpenOptions::new().create(true).append(true).open(file)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<(Args, QuizConfig), ArgsError> {
        let mut config = QuizConfig {
            db_url: "sqlite::memory:".into(),
            ..QuizConfig::default()
        };
        let mut iter = argv.iter().map(|s| (*s).to_string());
        let args = Args::parse(&mut iter, &mut config)?;
        Ok((args, config))
    }

    #[test]
    fn flags_override_config() {
        let (args, config) = parse(&[
            "--players",
            "Ana, Luis,,Rosa",
            "--questions",
            "5",
            "--seconds",
            "20",
            "--seed",
            "9",
        ])
        .unwrap();
        assert_eq!(args.players, vec!["Ana", "Luis", "Rosa"]);
        assert_eq!(config.questions_per_game, 5);
        assert_eq!(config.seconds_per_question, 20);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.db_url, "sqlite::memory:");
    }

    #[test]
    fn account_flags_and_bank_file() {
        let (args, config) = parse(&[
            "--email",
            "ana@example.com",
            "--new-password",
            "secret2",
            "--redirect",
            "http://localhost:3000",
            "--bank",
            " bank.json ",
        ])
        .unwrap();
        assert_eq!(args.require_new_password().unwrap(), "secret2");
        assert_eq!(args.redirect.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.bank_file.as_deref(), Some("bank.json"));
        assert!(matches!(
            args.require_name(),
            Err(ArgsError::MissingFlag { flag: "--name" })
        ));
    }

    #[test]
    fn subcommands_are_recognised() {
        assert_eq!(Command::from_arg("guest"), Some(Command::Guest));
        assert_eq!(
            Command::from_arg("change-password"),
            Some(Command::ChangePassword)
        );
        assert_eq!(Command::from_arg("google-url"), Some(Command::GoogleUrl));
        assert_eq!(Command::from_arg("logout"), None);
    }

    #[test]
    fn rejects_zero_and_garbage() {
        assert!(matches!(
            parse(&["--seconds", "0"]),
            Err(ArgsError::InvalidNumber { flag: "--seconds", .. })
        ));
        assert!(matches!(
            parse(&["--seed", "x"]),
            Err(ArgsError::InvalidNumber { flag: "--seed", .. })
        ));
        assert!(matches!(
            parse(&["--email"]),
            Err(ArgsError::MissingValue { flag: "--email" })
        ));
        assert!(matches!(parse(&["--bogus"]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/quiz.db".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/quiz.db"));
        assert_eq!(normalize_sqlite_url(" sqlite::memory: ".into()), "sqlite::memory:");
    }

    #[test]
    fn in_memory_urls_need_no_file() {
        assert!(prepare_sqlite_file("sqlite::memory:").is_ok());
        assert!(prepare_sqlite_file("postgres://nope").is_err());
    }
}

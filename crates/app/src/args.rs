use std::fmt;

use cube_core::model::StageSlot;

pub const DB_URL_ENV: &str = "CUBE_DB_URL";
const DEFAULT_DB_URL: &str = "sqlite://cube.sqlite3";

#[derive(Debug)]
pub enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingValue { flag: &'static str },
    MissingArgument { command: String, name: &'static str },
    UnexpectedArgument(String),
    InvalidSlot { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "missing command"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { command, name } => {
                write!(f, "{command} requires <{name}>")
            }
            ArgsError::UnexpectedArgument(arg) => write!(f, "unexpected argument: {arg}"),
            ArgsError::InvalidSlot { raw } => write!(f, "invalid stage slot: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register { username: String, password: String },
    Login { username: String, password: String },
    Visit { username: String, slot: StageSlot },
    Complete { username: String, slot: StageSlot },
    Catalog { username: Option<String> },
    Chart { username: String },
    Help,
}

#[derive(Debug)]
pub struct Args {
    pub db_url: String,
    pub command: Command,
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cube-tutor register <username> <password>  [--db <sqlite_url>]");
    eprintln!("  cube-tutor login    <username> <password>  [--db <sqlite_url>]");
    eprintln!("  cube-tutor visit    <username> <slot>      [--db <sqlite_url>]");
    eprintln!("  cube-tutor complete <username> <slot>      [--db <sqlite_url>]");
    eprintln!("  cube-tutor catalog  [<username>]           [--db <sqlite_url>]");
    eprintln!("  cube-tutor chart    <username>             [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Slots: 0 is the rotation guide, 1..7 are the stages.");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {DB_URL_ENV}, RUST_LOG");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

struct Positionals {
    command: String,
    values: std::vec::IntoIter<String>,
}

impl Positionals {
    fn required(&mut self, name: &'static str) -> Result<String, ArgsError> {
        self.values.next().ok_or_else(|| ArgsError::MissingArgument {
            command: self.command.clone(),
            name,
        })
    }

    fn optional(&mut self) -> Option<String> {
        self.values.next()
    }

    fn slot(&mut self) -> Result<StageSlot, ArgsError> {
        let raw = self.required("slot")?;
        raw.parse().map_err(|_| ArgsError::InvalidSlot { raw })
    }

    fn finish(mut self) -> Result<(), ArgsError> {
        match self.values.next() {
            Some(extra) => Err(ArgsError::UnexpectedArgument(extra)),
            None => Ok(()),
        }
    }
}

impl Args {
    /// Parse CLI arguments (without the program name).
    ///
    /// `env_db_url` is the value of the database URL environment variable, if set.
    pub fn parse(
        argv: impl IntoIterator<Item = String>,
        env_db_url: Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env_db_url
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| DEFAULT_DB_URL.to_string(), normalize_sqlite_url);
        let mut positionals = Vec::new();

        let mut iter = argv.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut iter, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--help" | "-h" => {
                    return Ok(Self {
                        db_url,
                        command: Command::Help,
                    });
                }
                flag if flag.starts_with("--") => {
                    return Err(ArgsError::UnexpectedArgument(arg));
                }
                _ => positionals.push(arg),
            }
        }

        let mut values = positionals.into_iter();
        let name = values.next().ok_or(ArgsError::MissingCommand)?;
        let mut rest = Positionals {
            command: name.clone(),
            values,
        };

        let command = match name.as_str() {
            "register" => Command::Register {
                username: rest.required("username")?,
                password: rest.required("password")?,
            },
            "login" => Command::Login {
                username: rest.required("username")?,
                password: rest.required("password")?,
            },
            "visit" => Command::Visit {
                username: rest.required("username")?,
                slot: rest.slot()?,
            },
            "complete" => Command::Complete {
                username: rest.required("username")?,
                slot: rest.slot()?,
            },
            "catalog" => Command::Catalog {
                username: rest.optional(),
            },
            "chart" => Command::Chart {
                username: rest.required("username")?,
            },
            "help" => Command::Help,
            _ => return Err(ArgsError::UnknownCommand(name)),
        };
        rest.finish()?;

        Ok(Self { db_url, command })
    }
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(args.iter().map(ToString::to_string), None)
    }

    #[test]
    fn parses_visit_with_slot() {
        let args = parse(&["visit", "cuber", "3"]).unwrap();
        assert_eq!(
            args.command,
            Command::Visit {
                username: "cuber".into(),
                slot: StageSlot::new(3)
            }
        );
        assert_eq!(args.db_url, DEFAULT_DB_URL);
    }

    #[test]
    fn db_flag_overrides_environment() {
        let args = Args::parse(
            ["chart", "--db", "sqlite:///tmp/a.db", "cuber"].map(String::from),
            Some("sqlite:///tmp/env.db".into()),
        )
        .unwrap();
        assert_eq!(args.db_url, "sqlite:///tmp/a.db");
    }

    #[test]
    fn environment_sets_default_db() {
        let args =
            Args::parse(["catalog"].map(String::from), Some("sqlite::memory:".into())).unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        assert_eq!(args.command, Command::Catalog { username: None });
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(parse(&[]), Err(ArgsError::MissingCommand)));
        assert!(matches!(parse(&["dance"]), Err(ArgsError::UnknownCommand(_))));
        assert!(matches!(
            parse(&["complete", "cuber", "-1"]),
            Err(ArgsError::InvalidSlot { .. })
        ));
        assert!(matches!(
            parse(&["login", "cuber"]),
            Err(ArgsError::MissingArgument { name: "password", .. })
        ));
        assert!(matches!(
            parse(&["chart", "cuber", "extra"]),
            Err(ArgsError::UnexpectedArgument(_))
        ));
        assert!(matches!(
            parse(&["chart", "cuber", "--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
    }
}

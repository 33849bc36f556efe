use clap::{builder::ValueParser, Arg, ArgAction, ArgMatches, Command};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

/// Names accepted by `TGAUTH_LOG_LEVEL`, indexed by the equivalent `-v` count.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

fn parse_level(raw: &str) -> Result<u8, String> {
    let raw = raw.trim().to_ascii_lowercase();

    if let Ok(count) = raw.parse::<u8>() {
        if usize::from(count) < LEVEL_NAMES.len() {
            return Ok(count);
        }
    }

    LEVEL_NAMES
        .iter()
        .position(|name| *name == raw)
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("invalid log level, expected one of {}", LEVEL_NAMES.join(", ")))
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(parse_level)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("TGAUTH_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

/// Tracing level for a `-v` count; `None` keeps the ERROR default.
#[must_use]
pub const fn level_for(count: u8) -> Option<Level> {
    match count {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

#[must_use]
pub fn level(matches: &ArgMatches) -> Option<Level> {
    level_for(matches.get_one::<u8>(ARG_VERBOSITY).copied().unwrap_or(0))
}

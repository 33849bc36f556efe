use crate::chat::telegram::DEFAULT_API_URL;
use anyhow::{Context, Result};
use clap::{parser::ValueSource, Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::env;

pub const ARG_BOT_TOKEN: &str = "telegram-bot-token";
pub const ARG_API_URL: &str = "telegram-api-url";
pub const ARG_CODE_EXPIRY_SECONDS: &str = "code-expiry-seconds";

/// Legacy variable still honored for the code window.
pub const ENV_CODE_EXPIRY_LEGACY: &str = "CODE_EXPIRY_DURATION";

#[derive(Debug)]
pub struct Options {
    pub bot_token: Option<SecretString>,
    pub api_url: String,
    pub code_expiry_seconds: i64,
}

impl Options {
    /// # Errors
    /// Returns an error if the legacy code window variable is not a positive
    /// integer.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let bot_token = matches
            .get_one::<String>(ARG_BOT_TOKEN)
            .filter(|token| !token.trim().is_empty())
            .map(|token| SecretString::from(token.trim().to_string()));

        let api_url = matches
            .get_one::<String>(ARG_API_URL)
            .cloned()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let mut code_expiry_seconds = matches
            .get_one::<i64>(ARG_CODE_EXPIRY_SECONDS)
            .copied()
            .unwrap_or(300);

        if matches.value_source(ARG_CODE_EXPIRY_SECONDS) == Some(ValueSource::DefaultValue) {
            if let Ok(legacy) = env::var(ENV_CODE_EXPIRY_LEGACY) {
                code_expiry_seconds = legacy
                    .trim()
                    .parse::<i64>()
                    .ok()
                    .filter(|seconds| *seconds >= 1)
                    .with_context(|| {
                        format!("invalid {ENV_CODE_EXPIRY_LEGACY}: {legacy}, expected seconds >= 1")
                    })?;
            }
        }

        Ok(Self {
            bot_token,
            api_url,
            code_expiry_seconds,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BOT_TOKEN)
                .long(ARG_BOT_TOKEN)
                .help("Telegram bot token; without it login codes are only logged")
                .env("TELEGRAM_BOT_TOKEN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Telegram Bot API base URL")
                .env("TGAUTH_TELEGRAM_API_URL")
                .default_value(DEFAULT_API_URL),
        )
        .arg(
            Arg::new(ARG_CODE_EXPIRY_SECONDS)
                .long(ARG_CODE_EXPIRY_SECONDS)
                .help("Seconds a login code stays valid")
                .env("TGAUTH_CODE_EXPIRY_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
}

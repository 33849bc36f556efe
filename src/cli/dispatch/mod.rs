//! Map validated CLI matches to the action the binary executes.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{telegram, ARG_DATA_DIR, ARG_PORT};
use anyhow::Result;
use std::path::PathBuf;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if an argument is present but unusable.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8000);
    let data_dir = matches
        .get_one::<String>(ARG_DATA_DIR)
        .map_or_else(|| PathBuf::from("."), PathBuf::from);

    let telegram_opts = telegram::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        data_dir,
        code_expiry_seconds: telegram_opts.code_expiry_seconds,
        telegram_bot_token: telegram_opts.bot_token,
        telegram_api_url: telegram_opts.api_url,
    }))
}

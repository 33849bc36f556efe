pub mod logging;
pub mod telegram;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_DATA_DIR: &str = "data-dir";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("tgauth")
        .about("Credentials, sessions and Telegram login codes")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8000")
                .env("TGAUTH_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DATA_DIR)
                .long(ARG_DATA_DIR)
                .help("Directory holding the users.json and tokens.json snapshots")
                .default_value(".")
                .env("TGAUTH_DATA_DIR"),
        );

    let command = telegram::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const ENV_VARS: [&str; 7] = [
        "TGAUTH_PORT",
        "TGAUTH_DATA_DIR",
        "TGAUTH_LOG_LEVEL",
        "TGAUTH_CODE_EXPIRY_SECONDS",
        "TGAUTH_TELEGRAM_API_URL",
        "TELEGRAM_BOT_TOKEN",
        "CODE_EXPIRY_DURATION",
    ];

    fn clean_env() -> Vec<(&'static str, Option<&'static str>)> {
        env_with(&[])
    }

    /// Every variable unset except `overrides`.
    fn env_with(
        overrides: &[(&'static str, &'static str)],
    ) -> Vec<(&'static str, Option<&'static str>)> {
        ENV_VARS
            .iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| *value);
                (*name, value)
            })
            .collect()
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "tgauth");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Credentials, sessions and Telegram login codes".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_defaults() -> anyhow::Result<()> {
        temp_env::with_vars(clean_env(), || {
            let matches = new().get_matches_from(vec!["tgauth"]);
            assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(8000));
            assert_eq!(
                matches.get_one::<String>(ARG_DATA_DIR).map(String::as_str),
                Some(".")
            );

            let options = telegram::Options::parse(&matches)?;
            assert!(options.bot_token.is_none());
            assert_eq!(options.api_url, "https://api.telegram.org");
            assert_eq!(options.code_expiry_seconds, 300);
            Ok(())
        })
    }

    #[test]
    fn test_check_args() -> anyhow::Result<()> {
        temp_env::with_vars(clean_env(), || {
            let matches = new().get_matches_from(vec![
                "tgauth",
                "--port",
                "9000",
                "--data-dir",
                "/var/lib/tgauth",
                "--telegram-bot-token",
                "123:abc",
                "--code-expiry-seconds",
                "60",
            ]);
            assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(9000));
            assert_eq!(
                matches.get_one::<String>(ARG_DATA_DIR).map(String::as_str),
                Some("/var/lib/tgauth")
            );

            let options = telegram::Options::parse(&matches)?;
            assert_eq!(
                options.bot_token.as_ref().map(|t| t.expose_secret().to_string()),
                Some("123:abc".to_string())
            );
            assert_eq!(options.code_expiry_seconds, 60);
            Ok(())
        })
    }

    #[test]
    fn test_check_env() -> anyhow::Result<()> {
        let vars = env_with(&[
            ("TGAUTH_PORT", "443"),
            ("TGAUTH_DATA_DIR", "/data"),
            ("TGAUTH_LOG_LEVEL", "info"),
            ("TELEGRAM_BOT_TOKEN", "42:secret"),
            ("TGAUTH_TELEGRAM_API_URL", "http://localhost:8081"),
        ]);

        temp_env::with_vars(vars, || {
            let matches = new().get_matches_from(vec!["tgauth"]);
            assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(443));
            assert_eq!(
                matches.get_one::<String>(ARG_DATA_DIR).map(String::as_str),
                Some("/data")
            );
            assert_eq!(
                matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                Some(2)
            );

            let options = telegram::Options::parse(&matches)?;
            assert!(options.bot_token.is_some());
            assert_eq!(options.api_url, "http://localhost:8081");
            Ok(())
        })
    }

    #[test]
    fn test_legacy_code_expiry_env() -> anyhow::Result<()> {
        temp_env::with_vars(env_with(&[("CODE_EXPIRY_DURATION", "120")]), || {
            let matches = new().get_matches_from(vec!["tgauth"]);
            assert_eq!(telegram::Options::parse(&matches)?.code_expiry_seconds, 120);
            anyhow::Ok(())
        })?;

        let vars = env_with(&[
            ("CODE_EXPIRY_DURATION", "120"),
            ("TGAUTH_CODE_EXPIRY_SECONDS", "90"),
        ]);
        temp_env::with_vars(vars, || {
            let matches = new().get_matches_from(vec!["tgauth"]);
            assert_eq!(telegram::Options::parse(&matches)?.code_expiry_seconds, 90);
            Ok(())
        })
    }

    #[test]
    fn test_legacy_code_expiry_must_be_positive() {
        for value in ["0", "-5", "soon"] {
            temp_env::with_vars(env_with(&[("CODE_EXPIRY_DURATION", value)]), || {
                let matches = new().get_matches_from(vec!["tgauth"]);
                let err = telegram::Options::parse(&matches).err();
                assert!(
                    err.is_some_and(|err| err.to_string().contains("CODE_EXPIRY_DURATION")),
                    "{value} should be rejected"
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars(env_with(&[("TGAUTH_LOG_LEVEL", level)]), || {
                let matches = new().get_matches_from(vec!["tgauth"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(index as u8)
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5 {
            temp_env::with_vars(clean_env(), || {
                let mut args = vec!["tgauth".to_string()];

                // Add the appropriate number of "-v" flags based on the index
                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(index as u8)
                );
            });
        }
    }
}

use crate::admin::{DEFAULT_ADMIN_URL, MAX_FETCH_ATTEMPTS};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_ADMIN_URL: &str = "admin-url";
pub const ARG_ADMIN_USERNAME: &str = "admin-username";
pub const ARG_ADMIN_PASSWORD: &str = "admin-password";
pub const ARG_ADMIN_TIMEOUT_SECONDS: &str = "admin-timeout-seconds";
pub const ARG_ADMIN_FETCH_ATTEMPTS: &str = "admin-fetch-attempts";

#[derive(Debug)]
pub struct Options {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub timeout_seconds: u64,
    pub fetch_attempts: u32,
}

impl Options {
    /// # Errors
    /// Returns an error if a defaulted argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            url: matches
                .get_one::<String>(ARG_ADMIN_URL)
                .cloned()
                .context("missing required argument: --admin-url")?,
            username: matches.get_one::<String>(ARG_ADMIN_USERNAME).cloned(),
            password: matches
                .get_one::<String>(ARG_ADMIN_PASSWORD)
                .cloned()
                .map(SecretString::from),
            timeout_seconds: matches
                .get_one::<u64>(ARG_ADMIN_TIMEOUT_SECONDS)
                .copied()
                .context("missing required argument: --admin-timeout-seconds")?,
            fetch_attempts: matches
                .get_one::<u32>(ARG_ADMIN_FETCH_ATTEMPTS)
                .copied()
                .context("missing required argument: --admin-fetch-attempts")?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ADMIN_URL)
                .long(ARG_ADMIN_URL)
                .help("Base URL of the authorization server admin API")
                .env("TOLLGATE_ADMIN_URL")
                .default_value(DEFAULT_ADMIN_URL),
        )
        .arg(
            Arg::new(ARG_ADMIN_USERNAME)
                .long(ARG_ADMIN_USERNAME)
                .help("Basic auth username for the admin API")
                .env("TOLLGATE_ADMIN_USERNAME"),
        )
        .arg(
            Arg::new(ARG_ADMIN_PASSWORD)
                .long(ARG_ADMIN_PASSWORD)
                .help("Basic auth password for the admin API")
                .env("TOLLGATE_ADMIN_PASSWORD")
                .hide_env_values(true)
                .requires(ARG_ADMIN_USERNAME),
        )
        .arg(
            Arg::new(ARG_ADMIN_TIMEOUT_SECONDS)
                .long(ARG_ADMIN_TIMEOUT_SECONDS)
                .help("Timeout for each admin API call in seconds")
                .env("TOLLGATE_ADMIN_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_ADMIN_FETCH_ATTEMPTS)
                .long(ARG_ADMIN_FETCH_ATTEMPTS)
                .help("Attempts for idempotent admin API reads; writes are never retried")
                .env("TOLLGATE_ADMIN_FETCH_ATTEMPTS")
                .default_value("3")
                .value_parser(
                    clap::value_parser!(u32).range(1..=i64::from(MAX_FETCH_ATTEMPTS)),
                ),
        )
}

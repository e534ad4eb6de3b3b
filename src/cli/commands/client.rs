use clap::{Arg, Command};

pub const ARG_CLIENT_BASE_URL: &str = "client-base-url";
pub const ARG_CORS_ORIGIN: &str = "cors-origin";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_CLIENT_BASE_URL)
                .long(ARG_CLIENT_BASE_URL)
                .help("Base URL of the login UI, example: https://login.example.com")
                .env("TOLLGATE_CLIENT_BASE_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_CORS_ORIGIN)
                .long(ARG_CORS_ORIGIN)
                .help("Extra origin allowed by CORS, in addition to http://localhost:4002")
                .env("TOLLGATE_CORS_ORIGIN"),
        )
}

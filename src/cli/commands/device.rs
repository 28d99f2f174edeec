use crate::transport::DEFAULT_URL;
use anyhow::{Context, Result};
use clap::{Arg, Command};
use secrecy::SecretString;

pub const ARG_URL: &str = "url";
pub const ARG_USERNAME: &str = "username";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_SESSION_TIMEOUT: &str = "session-timeout";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_URL)
                .short('u')
                .long("url")
                .help("Device base URL, example: http://192.168.178.1")
                .env("FRITZBOX_URL")
                .default_value(DEFAULT_URL)
                .global(true),
        )
        .arg(
            Arg::new(ARG_USERNAME)
                .long("username")
                .help("Device user name, empty for password-only setups")
                .env("FRITZBOX_USERNAME")
                .default_value("")
                .global(true),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .long("password")
                .help("Device password")
                .env("FRITZBOX_PASSWORD")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TIMEOUT)
                .long("session-timeout")
                .help("Seconds a session id is reused before authenticating again")
                .env("FRITZBOX_SESSION_TIMEOUT")
                .default_value("1200")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub url: String,
    pub username: String,
    pub password: Option<SecretString>,
    pub session_timeout_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if an argument with a default value is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let url = matches
            .get_one::<String>(ARG_URL)
            .cloned()
            .context("missing required argument: --url")?;
        let username = matches
            .get_one::<String>(ARG_USERNAME)
            .cloned()
            .unwrap_or_default();
        let password = matches
            .get_one::<String>(ARG_PASSWORD)
            .map(|p| SecretString::from(p.clone()));
        let session_timeout_seconds = matches
            .get_one::<u64>(ARG_SESSION_TIMEOUT)
            .copied()
            .unwrap_or(1200);

        Ok(Self {
            url,
            username,
            password,
            session_timeout_seconds,
        })
    }
}

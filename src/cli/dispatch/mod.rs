//! Map parsed arguments to an action and the shared connection settings.

use crate::cli::{
    actions::Action,
    commands::{self, device},
    globals::GlobalArgs,
};
use crate::transport::DeviceTarget;
use anyhow::{anyhow, Context, Result};
use std::time::Duration;

/// # Errors
/// Returns an error if the device URL is invalid or no known subcommand was given.
pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let opts = device::Options::parse(matches)?;
    let target = DeviceTarget::parse(&opts.url).context("invalid FRITZBOX_URL")?;

    let mut globals = GlobalArgs::new(opts.url, target);
    globals.username = opts.username;
    globals.password = opts.password;
    globals.session_timeout = Duration::from_secs(opts.session_timeout_seconds);

    let action = match matches.subcommand() {
        Some((commands::CMD_SESSION_ID, _)) => Action::SessionId,
        Some((commands::CMD_LAST_USER, _)) => Action::LastUser,
        Some((commands::CMD_DATA, sub_m)) => Action::Data {
            page: sub_m
                .get_one::<String>("page")
                .cloned()
                .unwrap_or_else(|| "overview".to_string()),
            params: sub_m
                .get_many::<(String, String)>("param")
                .map(|params| params.cloned().collect())
                .unwrap_or_default(),
        },
        Some((commands::CMD_CALLS, sub_m)) => Action::Calls {
            skip: sub_m.get_one::<usize>("skip").copied().unwrap_or(0),
            limit: sub_m.get_one::<usize>("limit").copied(),
        },
        Some((commands::CMD_PHONE_BOOK, sub_m)) => Action::PhoneBook {
            id: sub_m.get_one::<u32>("id").copied().unwrap_or(0),
        },
        Some((commands::CMD_REBOOT, _)) => Action::Reboot,
        _ => return Err(anyhow!("unknown subcommand")),
    };

    Ok((action, globals))
}

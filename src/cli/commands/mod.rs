pub mod device;
pub mod logging;

use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub const CMD_SESSION_ID: &str = "session-id";
pub const CMD_LAST_USER: &str = "last-user";
pub const CMD_DATA: &str = "data";
pub const CMD_CALLS: &str = "calls";
pub const CMD_PHONE_BOOK: &str = "phone-book";
pub const CMD_REBOOT: &str = "reboot";

/// Parse `key=value` pairs for `data.lua` parameters.
#[must_use]
pub fn validator_param() -> ValueParser {
    ValueParser::from(
        move |param: &str| -> std::result::Result<(String, String), String> {
            match param.split_once('=') {
                Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
                _ => Err(format!("expected key=value, got {param:?}")),
            }
        },
    )
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("fritzbox")
        .about("FRITZ!Box session client")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new(CMD_SESSION_ID).about("Log in and print the session id"))
        .subcommand(
            Command::new(CMD_LAST_USER).about("Print the user that logged in last (no login)"),
        )
        .subcommand(
            Command::new(CMD_DATA)
                .about("Query a data.lua page and print the JSON answer")
                .arg(
                    Arg::new("page")
                        .long("page")
                        .help("Page identifier, for example overview, netDev, wKey or log")
                        .default_value("overview"),
                )
                .arg(
                    Arg::new("param")
                        .long("param")
                        .help("Extra form field as key=value, repeatable")
                        .action(ArgAction::Append)
                        .value_parser(validator_param()),
                ),
        )
        .subcommand(
            Command::new(CMD_CALLS)
                .about("Print the call list")
                .arg(
                    Arg::new("skip")
                        .long("skip")
                        .help("Entries to skip")
                        .default_value("0")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .help("Maximum number of entries")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new(CMD_PHONE_BOOK)
                .about("Export a phone book as XML")
                .arg(
                    Arg::new("id")
                        .long("id")
                        .help("Phone book id")
                        .default_value("0")
                        .value_parser(clap::value_parser!(u32)),
                ),
        )
        .subcommand(Command::new(CMD_REBOOT).about("Reboot the device"));

    let command = device::with_args(command);
    logging::with_args(command)
}

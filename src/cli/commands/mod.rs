use clap::{
    Arg, ColorChoice, Command,
    builder::{
        ValueParser,
        styling::{AnsiColor, Effects, Styles},
    },
};
use std::path::PathBuf;

pub const ARG_PORT: &str = "port";
pub const ARG_SETTINGS: &str = "settings";
pub const ARG_ROOT: &str = "root";
pub const ARG_USERS: &str = "users";
pub const ARG_AUTH_TIMEOUT: &str = "auth-timeout-seconds";
pub const ARG_VERBOSITY: &str = "verbosity";

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>()
            && parsed <= 5
        {
            return Ok(parsed);
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("authgate")
        .about("Login verification for multi-user file services")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("AUTHGATE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_SETTINGS)
                .short('s')
                .long("settings")
                .help("Path to the JSON settings file")
                .env("AUTHGATE_SETTINGS")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_ROOT)
                .short('r')
                .long("root")
                .help("Filesystem root user scopes are relative to")
                .default_value(".")
                .env("AUTHGATE_ROOT"),
        )
        .arg(
            Arg::new(ARG_USERS)
                .short('u')
                .long("users")
                .help("JSON file with users to seed the store with")
                .env("AUTHGATE_USERS")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_AUTH_TIMEOUT)
                .long("auth-timeout-seconds")
                .help("Deadline for one login attempt, directory and challenge calls included")
                .default_value("10")
                .env("AUTHGATE_AUTH_TIMEOUT_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("AUTHGATE_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}

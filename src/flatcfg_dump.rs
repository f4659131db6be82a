use std::io::{self, Write};

use clap::{Arg, Command};
use flatcfg::FlatConfigReader;
use tracing::error;

// CLI returns errors to main so a bad file ends the process with a message
// instead of a panic backtrace
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("flatcfg-dump")
        .about("Print the entries of a flat KEY = value config file")
        .arg(
            Arg::new("config")
                .help("Path to config file")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("key")
                .long("key")
                .help("Print only this key (case-insensitive)"),
        )
        .arg(
            Arg::new("default")
                .long("default")
                .help("Value printed when --key is absent from the file")
                .default_value(""),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .help("DEBUG, INFO, WARN or ERROR")
                .default_value("WARN"),
        )
        .get_matches();

    let log_level = matches
        .get_one::<String>("log-level")
        .map(|s| s.to_uppercase())
        .unwrap_or_default();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level_from_str(&log_level))
        .init();

    let config_path = matches
        .get_one::<String>("config")
        .ok_or("missing config path")?;
    let reader = match FlatConfigReader::from_path(config_path) {
        Ok(reader) => reader,
        Err(e) => {
            error!("Failed to load {}: {}", config_path, e);
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let key = matches.get_one::<String>("key").map(String::as_str);
    let default = matches
        .get_one::<String>("default")
        .map(String::as_str)
        .unwrap_or("");
    let stdout = std::io::stdout();
    print_config(&reader, key, default, &mut stdout.lock())?;

    Ok(())
}

// One value when `key` is given, otherwise every entry as `key = value`
// in file order
fn print_config(
    reader: &FlatConfigReader,
    key: Option<&str>,
    default: &str,
    out: &mut impl Write,
) -> io::Result<()> {
    match key {
        Some(key) => writeln!(out, "{}", reader.get_value(key, default))?,
        None => {
            for (key, value) in reader.items() {
                writeln!(out, "{} = {}", key, value)?;
            }
        }
    }
    Ok(())
}

fn level_from_str(level: &str) -> tracing::Level {
    match level {
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => tracing::Level::WARN,
    }
}

use clap::{Parser, Subcommand};
use duino_link::config::{Config, ConfigLoader};
use duino_link::{logging, Connection, ConnectionSettings, Framer, LineEnding, ReadError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "duino-link",
    version,
    about = "Talk to an Arduino-class board over a serial line.",
    long_about = "Opens a serial device, sends strings, integers and floats in the framing most sketches use, and reads them back without blocking when nothing is queued."
)]
struct Args {
    /// Port number (3 means COM3) or device path. Falls back to the config file.
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate. Falls back to the config file.
    #[arg(short, long)]
    baud: Option<u32>,

    /// Explicit configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Line ending for print-line: crlf, lf, cr or lfcr.
    #[arg(short, long)]
    line_ending: Option<LineEnding>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send text with nothing appended.
    Print { text: String },
    /// Send text followed by the line ending.
    PrintLine { text: String },
    /// Send a 4-byte little-endian integer.
    WriteInt {
        #[arg(allow_hyphen_values = true)]
        value: i32,
    },
    /// Send a 4-byte little-endian float.
    WriteFloat {
        #[arg(allow_hyphen_values = true)]
        value: f32,
    },
    /// Send raw bytes given as hex, e.g. "de ad be ef".
    WriteHex { hex: String },
    /// Read one line.
    ReadLine,
    /// Read one NUL-terminated string.
    ReadString,
    /// Read one 4-byte integer.
    ReadInt,
    /// Read one 4-byte float.
    ReadFloat,
    /// Read up to LIMIT queued bytes and print them as hex.
    ReadBytes {
        #[arg(long, default_value_t = 256)]
        limit: usize,
    },
    /// Discard everything queued.
    Flush,
    /// Print incoming lines until interrupted.
    Monitor {
        /// Poll interval while nothing is queued.
        #[arg(long, default_value_t = 20)]
        interval_ms: u64,
        /// Prefix each line with the local time.
        #[arg(long)]
        timestamps: bool,
        /// Stop after this many lines.
        #[arg(long)]
        count: Option<usize>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(args.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(2);
        }
    };
    logging::init(&config.logging);

    let Some(port_arg) = args.port.clone().or_else(|| config.serial.default_port.clone()) else {
        eprintln!("no port given: pass --port or set serial.default_port");
        return ExitCode::from(2);
    };
    let port = config.serial.resolve_port(&port_arg);
    let baud = args.baud.unwrap_or(config.serial.default_baud);

    let conn = Connection::new().with_settings(ConnectionSettings::from(&config.serial));
    let mut framer =
        Framer::new(conn).with_line_ending(args.line_ending.unwrap_or(config.serial.line_ending));

    if let Err(e) = framer.open(port, baud) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let code = run(&mut framer, args.command);
    framer.close();
    code
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, duino_link::ConfigError> {
    let loader = match path {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    Ok(loader.into_config())
}

fn run(framer: &mut Framer, command: Command) -> ExitCode {
    let written = match command {
        Command::Print { text } => framer.print(&text),
        Command::PrintLine { text } => framer.print_line(&text),
        Command::WriteInt { value } => framer.write_int(value),
        Command::WriteFloat { value } => framer.write_float(value),
        Command::WriteHex { hex } => match parse_hex(&hex) {
            Some(bytes) => framer.write_bytes(&bytes),
            None => {
                eprintln!("invalid hex: {hex}");
                return ExitCode::from(2);
            }
        },
        Command::ReadLine => return report(framer.read_line()),
        Command::ReadString => return report(framer.read_string()),
        Command::ReadInt => return report(framer.read_int()),
        Command::ReadFloat => return report(framer.read_float()),
        Command::ReadBytes { limit } => {
            println!("{}", to_hex(&framer.read_bytes(limit)));
            return ExitCode::SUCCESS;
        }
        Command::Flush => {
            println!("discarded {} bytes", framer.flush());
            return ExitCode::SUCCESS;
        }
        Command::Monitor {
            interval_ms,
            timestamps,
            count,
        } => return monitor(framer, Duration::from_millis(interval_ms), timestamps, count),
    };

    match written {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn report<T: std::fmt::Display>(result: Result<T, ReadError>) -> ExitCode {
    match result {
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(e) if e.is_transient() => {
            eprintln!("{e}");
            ExitCode::from(3)
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn monitor(
    framer: &mut Framer,
    interval: Duration,
    timestamps: bool,
    count: Option<usize>,
) -> ExitCode {
    let mut seen = 0;
    while count.map_or(true, |limit| seen < limit) {
        match framer.read_line() {
            Ok(line) => {
                seen += 1;
                if timestamps {
                    println!("{} {line}", chrono::Local::now().format("%H:%M:%S%.3f"));
                } else {
                    println!("{line}");
                }
            }
            Err(e) if e.is_transient() => std::thread::sleep(interval),
            Err(e) => {
                tracing::error!(error = %e, "monitor stopped");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

fn parse_hex(text: &str) -> Option<Vec<u8>> {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != ',')
        .collect();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(&digits);
    if digits.len() % 2 != 0 {
        return None;
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok())
        .collect()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

//! muhurta CLI - time-window normalization and summary cleaning tool
//!
//! A command-line front end for the muhurta library.

use clap::{Parser, Subcommand};
use colored::*;
use muhurta::{debug_strip, FormatOptions, RawWindowEntry, SummaryCleaner, SummaryOptions};
use serde_json::Value;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Time-window normalization and summary cleaning
#[derive(Parser)]
#[command(
    name = "muhurta",
    version,
    about = "Normalize astrology time windows and clean narrative summaries",
    long_about = "muhurta - Normalize astrology time windows and clean narrative summaries.\n\n\
                  Reads window arrays and free-text summaries as produced by upstream services\n\
                  and emits display-ready JSON or text. Use '-' to read from stdin.\n\n\
                  Usage:\n  \
                  muhurta windows <file>                     Normalize a window array to JSON\n  \
                  muhurta summary <file> --windows <file>    Clean a summary\n  \
                  muhurta strip <file>                       Remove leaked debug artifacts only"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Render times as 24-hour HH:MM
    #[arg(long = "24h", global = true)]
    twenty_four_hour: bool,

    /// Length of one numbered slot in minutes
    #[arg(long, global = true, default_value_t = muhurta::options::DEFAULT_SLOT_MINUTES)]
    slot_minutes: u32,

    /// Calendar date (YYYY-MM-DD) used to build ISO times
    #[arg(long, global = true)]
    date: Option<String>,

    /// IANA time zone for ISO times (e.g. Asia/Kolkata)
    #[arg(long, global = true)]
    tz: Option<String>,

    /// Run only normalization, debug stripping and whitespace cleanup
    #[arg(long, global = true)]
    minimal: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a JSON window array
    Windows {
        /// Input JSON file (array, or object with a `time_windows` array)
        input: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output compact JSON (no indentation)
        #[arg(long)]
        compact: bool,
    },

    /// Clean a narrative summary
    Summary {
        /// Input text file
        input: PathBuf,

        /// JSON window file used to expand window references
        #[arg(short, long)]
        windows: Option<PathBuf>,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove leaked debug artifacts from text
    Strip {
        /// Input text file
        input: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let format = format_options(&cli)?;
    let summary_options = if cli.minimal {
        SummaryOptions::minimal()
    } else {
        SummaryOptions::default()
    };
    let cleaner = SummaryCleaner::new()
        .with_format(format)
        .with_options(summary_options);

    match cli.command {
        Commands::Windows {
            input,
            output,
            compact,
        } => {
            let raw = read_windows(&input)?;
            let windows = cleaner.build_windows(Some(&raw));
            tracing::debug!(input = raw.len(), output = windows.len(), "normalized windows");

            let json = if compact {
                serde_json::to_string(&windows)?
            } else {
                serde_json::to_string_pretty(&windows)?
            };
            write_output(output.as_ref(), &json)?;

            if let Some(path) = output {
                eprintln!(
                    "{} {} windows written to {}",
                    "✓".green().bold(),
                    windows.len(),
                    path.display()
                );
            }
        }

        Commands::Summary {
            input,
            windows,
            output,
        } => {
            let text = read_input(&input)?;
            let raw = windows.as_deref().map(read_windows).transpose()?;
            let cleaned = cleaner.clean(Some(&text), raw.as_deref());
            write_output(output.as_ref(), &cleaned)?;

            if let Some(path) = output {
                eprintln!("{} Cleaned summary: {}", "✓".green().bold(), path.display());
            }
        }

        Commands::Strip { input, output } => {
            let text = read_input(&input)?;
            let stripped = debug_strip::strip_debug_blocks(&text);
            write_output(output.as_ref(), &stripped)?;

            if let Some(path) = output {
                eprintln!("{} Stripped text: {}", "✓".green().bold(), path.display());
            }
        }

        Commands::Version => print_version(),
    }

    Ok(())
}

/// Builds format options from the global flags, rejecting unknown time zones.
fn format_options(cli: &Cli) -> Result<FormatOptions, muhurta::Error> {
    let mut options = FormatOptions::new().with_slot_minutes(cli.slot_minutes);
    if cli.twenty_four_hour {
        options = options.twenty_four_hour();
    }
    if let Some(date) = &cli.date {
        options = options.with_date(date.as_str());
    }
    if let Some(tz) = &cli.tz {
        options = options.with_tz(tz.as_str());
    }
    options.time_zone()?;
    Ok(options)
}

fn read_input(path: &Path) -> muhurta::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

/// Reads a window array, accepting either a bare array or an upstream
/// response object carrying a `time_windows` array.
fn read_windows(path: &Path) -> Result<Vec<RawWindowEntry>, Box<dyn std::error::Error>> {
    let text = read_input(path)?;
    parse_windows(&text)
}

fn parse_windows(text: &str) -> Result<Vec<RawWindowEntry>, Box<dyn std::error::Error>> {
    let value: Value = serde_json::from_str(text).map_err(muhurta::Error::from)?;
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut response) => match response.remove("time_windows") {
            Some(Value::Array(entries)) => entries,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err("`time_windows` must be an array".into()),
        },
        _ => return Err("expected a JSON array of time windows".into()),
    };
    Ok(entries.into_iter().map(RawWindowEntry::from).collect())
}

fn print_version() {
    println!("{} {}", "muhurta".green().bold(), env!("CARGO_PKG_VERSION"));
    println!("Time-window normalization and summary cleaning");
}

fn write_output(path: Option<&PathBuf>, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", content)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "muhurta", "windows", "in.json", "--24h", "--slot-minutes", "60", "--tz", "Asia/Kolkata",
        ]);
        let options = format_options(&cli).unwrap();
        assert!(!options.use_ampm);
        assert_eq!(options.slot_minutes, 60);
        assert_eq!(options.tz.as_deref(), Some("Asia/Kolkata"));
    }

    #[test]
    fn test_unknown_time_zone_rejected() {
        let cli = Cli::parse_from(["muhurta", "strip", "-", "--tz", "Nowhere/City"]);
        assert!(matches!(
            format_options(&cli),
            Err(muhurta::Error::UnknownTimeZone(_))
        ));
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let result = read_input(Path::new("does/not/exist.txt"));
        assert!(matches!(result, Err(muhurta::Error::Io(_))));
    }

    #[test]
    fn test_parse_windows_shapes() {
        assert_eq!(parse_windows("[1, \"06:00\"]").unwrap().len(), 2);
        assert_eq!(
            parse_windows(r#"{"time_windows": [{"start": 3}], "summary": "x"}"#)
                .unwrap()
                .len(),
            1
        );
        assert!(parse_windows(r#"{"summary": "x"}"#).unwrap().is_empty());
        assert!(parse_windows("42").is_err());
        assert!(parse_windows(r#"{"time_windows": 5}"#).is_err());
        assert!(parse_windows("not json").is_err());
    }
}

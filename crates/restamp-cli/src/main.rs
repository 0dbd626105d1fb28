use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "restamp", version, about = "Give a batch of photos one-second-spaced capture timestamps")]
struct Cli {
    /// Image files, or a single directory whose files are processed
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Continue without asking when some files are ignored
    #[arg(short, long)]
    yes: bool,

    /// Show the timestamps that would be written without touching any file
    #[arg(long)]
    dry_run: bool,

    /// Extra metadata field to ignore (repeatable)
    #[arg(long = "ignore-field", value_name = "NAME")]
    ignore_fields: Vec<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Wait for Enter before exiting on error
    #[arg(long)]
    pause_on_error: bool,

    /// More log output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            if cli.pause_on_error {
                wait_for_enter();
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let paths = expand_paths(&cli.paths)?;
    tracing::debug!(count = paths.len(), "collected input paths");

    let options = restamp_core::RestampOptions {
        dry_run: cli.dry_run,
        extra_ignored_fields: cli.ignore_fields.clone(),
    };

    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} {msg}")
            .context("invalid progress template")?,
    );

    let assume_yes = cli.yes;
    let confirm = |exts: &BTreeSet<String>| {
        pb.suspend(|| confirm_ignored(exts, assume_yes))
    };
    let progress = |stage: &str, current: u64, total: u64, message: &str| {
        pb.set_length(total);
        pb.set_position(current + 1);
        pb.set_message(format!("{} {}", stage, message));
    };

    let result = restamp_core::process(&paths, &options, &confirm, &progress);
    pb.finish_and_clear();
    let result = result?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    for entry in &result.entries {
        println!(
            "{:>4}  {}  {}",
            entry.index,
            entry.timestamp.format(restamp_core::date::EXIF_DATETIME_FORMAT),
            entry.file_name
        );
    }
    eprintln!(
        "{} {} files",
        if result.dry_run { "Would restamp" } else { "Restamped" },
        result.entries.len()
    );
    Ok(())
}

/// A single directory argument expands to its immediate regular files.
fn expand_paths(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    match paths {
        [dir] if dir.is_dir() => {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(dir)
                .with_context(|| format!("cannot list {}", dir.display()))?
            {
                let path = entry?.path();
                if path.is_file() {
                    files.push(path);
                }
            }
            Ok(files)
        }
        _ => Ok(paths.to_vec()),
    }
}

fn confirm_ignored(extensions: &BTreeSet<String>, assume_yes: bool) -> bool {
    for ext in extensions {
        eprintln!("ignore ext: {}", restamp_core::error::display_extension(ext));
    }
    if assume_yes {
        return true;
    }
    eprint!("continue? [Y/n] ");
    io::stderr().flush().ok();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_lowercase().as_str(), "" | "y" | "yes")
}

fn wait_for_enter() {
    eprint!("Press Enter to exit");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok();
}

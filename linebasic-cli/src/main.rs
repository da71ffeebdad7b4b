mod report;

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use linebasic_core::{CoreError, check_source, load_programs, run_source};
use log::{LevelFilter, info};

use report::{Format, render};

/// Runs and checks line-numbered BASIC programs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value = "text",
        help = "How diagnostics are written to stderr"
    )]
    format: Format,

    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Raise the log level (-v info, -vv debug, -vvv trace)"
    )]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse, validate and execute a program.
    Run {
        /// Program file; reads stdin when omitted.
        file: Option<PathBuf>,
    },
    /// Validate one program or every `.bas` file under a directory.
    Check { path: PathBuf },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    execute(cli)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn execute(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Run { file } => run(file.as_deref(), cli.format),
        Command::Check { path } => check(&path, cli.format),
    }
}

fn run(file: Option<&Path>, format: Format) -> Result<ExitCode> {
    let (path, source) = match file {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("failed to read input file {}", path.display()))?;
            (path, source)
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read program from stdin")?;
            (Path::new("<stdin>"), buffer)
        }
    };

    info!("running {}", path.display());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = run_source(&source, &mut out);
    out.flush().context("failed to flush program output")?;
    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => report(&err, path, format),
    }
}

fn check(path: &Path, format: Format) -> Result<ExitCode> {
    let files = load_programs(path)
        .with_context(|| format!("failed to load programs from {}", path.display()))?;
    if files.is_empty() {
        anyhow::bail!("no .bas files found under {}", path.display());
    }

    let mut status = ExitCode::SUCCESS;
    for file in &files {
        let shown = if path.is_file() {
            path.to_path_buf()
        } else {
            path.join(&file.path)
        };
        match check_source(&file.contents) {
            Ok(program) => {
                info!("{} has {} lines", shown.display(), program.len());
                println!("ok: {}", shown.display());
            }
            Err(err) => status = report(&err, &shown, format)?,
        }
    }
    Ok(status)
}

fn report(err: &CoreError, path: &Path, format: Format) -> Result<ExitCode> {
    eprintln!("{}", render(err, path, format)?);
    Ok(ExitCode::FAILURE)
}

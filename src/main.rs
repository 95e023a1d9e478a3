//! canopy - concurrent, cycle-safe disk usage scanner.
//!
//! Usage:
//!   canopy [PATH]             Scan and show summary
//!   canopy scan [PATH]        Scan and show summary
//!   canopy export [PATH]      Export scan to JSON
//!   canopy --help             Show help

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use canopy_scan::{
    FolderStats, NodeId, ScanConfig, ScanError, ScanHooks, ScanPhase, ScanProgress, ScanResult,
    Scanner, TypeCategory,
};

/// Exit code reported when the user interrupts a scan.
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(
    name = "canopy",
    version,
    about = "Concurrent, cycle-safe disk usage scanner",
    long_about = "canopy walks a directory tree and reports where the space goes, \
                  folder by folder and by file type.\n\n\
                  Run `canopy [PATH]` for a summary or `canopy export` for JSON."
)]
struct Cli {
    #[command(flatten)]
    scan: ScanArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Scan and show summary
    Scan {
        #[command(flatten)]
        scan: ScanArgs,

        /// Number of largest folders to show per directory
        #[arg(short = 'n', long, default_value = "10")]
        top: usize,
    },

    /// Export scan results to JSON
    Export {
        #[command(flatten)]
        scan: ScanArgs,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Clone)]
struct ScanArgs {
    /// Path to scan (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Deepest folder level kept as its own entry; deeper content is folded in
    #[arg(short, long)]
    depth: Option<u32>,

    /// Include hidden files and well-known noise files
    #[arg(short = 'H', long)]
    hidden: bool,

    /// Descend into OS-reserved directories
    #[arg(long)]
    system: bool,

    /// Follow symbolic links
    #[arg(short = 'L', long)]
    follow_symlinks: bool,

    /// Record every individual file
    #[arg(short, long)]
    files: bool,

    /// Maximum concurrent filesystem operations
    #[arg(short, long, default_value_t = canopy_core::DEFAULT_CONCURRENCY)]
    concurrency: usize,
}

impl ScanArgs {
    fn to_config(&self) -> Result<ScanConfig> {
        ScanConfig::builder()
            .root(self.path.clone())
            .max_depth(self.depth)
            .include_hidden(self.hidden)
            .include_system(self.system)
            .follow_symlinks(self.follow_symlinks)
            .include_files(self.files)
            .concurrency(self.concurrency)
            .build()
            .context("Invalid scan options")
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("canopy=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let token = CancellationToken::new();
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let outcome = match cli.command {
        Some(Command::Scan { scan, top }) => run_scan(&scan, top, token).await,
        Some(Command::Export { scan, output }) => run_export(&scan, output, token).await,
        None => run_scan(&cli.scan, 10, token).await,
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(report)
            if report
                .downcast_ref::<ScanError>()
                .is_some_and(ScanError::is_cancelled) =>
        {
            eprintln!("\nScan stopped.");
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
        Err(report) => Err(report),
    }
}

/// Scan with a live progress line on stderr.
async fn scan_with_progress(args: &ScanArgs, token: CancellationToken) -> Result<ScanResult> {
    let config = args.to_config()?;
    eprintln!("Scanning {}...", config.root.display());

    let hooks = ScanHooks::new()
        .with_progress(draw_progress)
        .with_token(token);

    let result = Scanner::new().scan(&config, hooks).await?;
    Ok(result)
}

fn draw_progress(progress: &ScanProgress) {
    let mut stderr = std::io::stderr().lock();
    if progress.phase == ScanPhase::Enumerating {
        let _ = write!(
            stderr,
            "\r  {} files, {} folders ({:.0} files/s)",
            progress.files_scanned,
            progress.dirs_scanned,
            progress.files_per_second()
        );
    } else if progress.is_terminal() {
        let _ = writeln!(stderr, "\r{}", " ".repeat(60));
    }
    let _ = stderr.flush();
}

/// Run a scan and display summary.
async fn run_scan(args: &ScanArgs, top_n: usize, token: CancellationToken) -> Result<()> {
    let result = scan_with_progress(args, token).await?;
    let index = result.index();
    let Some(root) = result.root() else {
        return Ok(());
    };

    println!();
    println!("{}", "─".repeat(70));
    println!(
        " {} - {}",
        result.root_path.display(),
        format_size(result.total_size)
    );
    println!(
        " {} files, {} folders",
        result.total_file_count,
        result.folder_count()
    );
    println!(" Scanned in {:.2}s", result.scan_duration.as_secs_f64());
    println!("{}", "─".repeat(70));
    println!();

    print_folder(&result, &index, root, top_n, result.total_size);

    println!();
    println!(" By type:");
    let totals = result.category_totals();
    for category in TypeCategory::iter() {
        let tally = totals.get(category);
        if tally.is_empty() {
            continue;
        }
        let ratio = share(tally.size, result.total_size);
        println!(
            "   {:<10} {:>10} {:>8} files {:>5.1}% {}",
            category.to_string(),
            format_size(tally.size),
            tally.count,
            ratio * 100.0,
            make_bar(ratio, 10)
        );
    }

    if result.has_warnings() {
        println!();
        println!("{} warning(s) during scan", result.warnings.len());
    }

    Ok(())
}

/// Export scan results to JSON.
async fn run_export(
    args: &ScanArgs,
    output: Option<PathBuf>,
    token: CancellationToken,
) -> Result<()> {
    let result = scan_with_progress(args, token).await?;
    let json = serde_json::to_string_pretty(&result)?;

    match output {
        Some(output_path) => {
            std::fs::write(&output_path, json)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            eprintln!("Exported to {}", output_path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}

/// Print a folder and its largest subfolders.
fn print_folder(
    result: &ScanResult,
    index: &HashMap<NodeId, usize>,
    folder: &FolderStats,
    top_n: usize,
    root_size: u64,
) {
    let indent = "  ".repeat(folder.depth as usize);
    let ratio = share(folder.total_size, root_size);
    let name = if folder.is_root() {
        result.root_path.display().to_string()
    } else {
        format!("{}/", folder.name)
    };

    println!(
        "{}{}{:<40} {:>10} {:>5.1}% {}",
        indent,
        if folder.has_children() { "▼ " } else { "  " },
        truncate(&name, 40),
        format_size(folder.total_size),
        ratio * 100.0,
        make_bar(ratio, 10)
    );

    let mut children: Vec<&FolderStats> = folder
        .children_ids
        .iter()
        .filter_map(|id| index.get(id).map(|&i| &result.folders[i]))
        .collect();
    children.sort_by(|a, b| b.total_size.cmp(&a.total_size));

    let remaining = children.len().saturating_sub(top_n);
    for child in children.into_iter().take(top_n) {
        print_folder(result, index, child, top_n, root_size);
    }
    if remaining > 0 {
        let indent = "  ".repeat(folder.depth as usize + 1);
        println!("{}  ... and {} more", indent, remaining);
    }
}

fn share(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64
    } else {
        0.0
    }
}

/// Create a simple ASCII bar.
fn make_bar(ratio: f64, width: usize) -> String {
    let filled = ((ratio * width as f64).round() as usize).min(width);
    let empty = width - filled;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to max length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 1).collect();
        format!("{kept}…")
    }
}

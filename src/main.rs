// Allow panic/unwrap/expect in tests (denied globally via Cargo.toml lints)
#![cfg_attr(
    test,
    allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)
)]

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{bail, Result};
use tracing::info;

use wxr_import::import::users::PROTECTED_LOGIN;
use wxr_import::logging::{init_logging, parse_rotation, LogConfig};
use wxr_import::{
    load_document, parse_document, run_import, run_rollback, HttpTransport, ImportReport,
    JsonStore, MediaConfig, MediaFetcher, RollbackReport, Stores,
};

/// Import a WordPress WXR export into the content store
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the WXR export file (prompted for when omitted)
    file: Option<String>,

    /// Delete all content previously imported from the given file
    #[arg(long)]
    rollback: bool,

    /// Disable downloading PDF attachments
    #[arg(long = "no-pdf")]
    no_pdf: bool,

    /// Accept every interactive prompt (for unattended runs)
    #[arg(short = 'y', long)]
    yes: bool,

    /// Path of the content store snapshot
    #[arg(long, env = "WXR_STORE", default_value = "wxr-store.json")]
    store: PathBuf,

    /// Directory downloaded media is written under
    #[arg(long, env = "WXR_MEDIA_DIR", default_value = "assets/images/wpi")]
    media_dir: PathBuf,

    /// URL prefix stored content references media through
    #[arg(long, env = "WXR_MEDIA_URL", default_value = "assets/images/wpi")]
    media_url: String,

    /// Enable JSON log format (for log aggregation)
    #[arg(long, env = "WXR_LOG_JSON", default_value = "false")]
    log_json: bool,

    /// Log rotation period: daily, hourly, or never
    #[arg(long, env = "WXR_LOG_ROTATION", default_value = "daily")]
    log_rotation: String,

    /// Custom log directory (default: ~/.wxr-import/logs)
    #[arg(long, env = "WXR_LOG_DIR")]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre error hooks for colored error output
    color_eyre::install()?;

    let args = Args::parse();

    let log_config = LogConfig {
        json_format: args.log_json,
        rotation: parse_rotation(&args.log_rotation),
        ..LogConfig::default()
    };
    let log_config = match args.log_dir.as_deref() {
        Some(dir) => LogConfig {
            log_dir: PathBuf::from(dir),
            ..log_config
        },
        None => log_config,
    };
    init_logging(log_config)?;

    let file = resolve_input_file(args.file.as_deref(), args.yes)?;

    let store = JsonStore::open(&args.store)?;
    let stores = Stores {
        content: &store,
        tv: &store,
        users: &store,
    };

    if args.rollback {
        if !args.yes
            && !confirm(
                "WARNING: This will PERMANENTLY DELETE all imported data! Are you sure you want to proceed?",
                false,
            )?
        {
            println!("Rollback aborted.");
            return Ok(());
        }

        println!("Rolling back import based on file: {}", file.display());
        let doc = parse_document(&file)?;
        let report = run_rollback(&doc, &stores).await;
        print_rollback_summary(&report);
        return Ok(());
    }

    println!("Starting import from: {}", file.display());
    println!("Reading file...");

    let doc = load_document(&file)?;
    println!("Verified WordPress version: {}", doc.version);

    let mut media_config = MediaConfig {
        base_dir: args.media_dir.clone(),
        base_url: args.media_url.clone(),
        ..MediaConfig::default()
    };
    if args.no_pdf {
        media_config.allow_pdf = false;
        println!("PDF downloads disabled.");
    }

    println!("Analyzing media files...");
    let count = doc.attachment_count();
    println!("Found {count} potential media files to download.");

    if count > 0 && !args.yes {
        if confirm(
            &format!("Do you want to download these {count} files? (Existing files will be skipped)"),
            true,
        )? {
            println!("Downloads enabled. Existing files will be skipped.");
        } else {
            media_config.download_enabled = false;
            println!("Media downloads disabled.");
        }
    }

    let transport = HttpTransport::new()?;
    let mut media = MediaFetcher::new(media_config, Box::new(transport));

    let report = run_import(&doc, &stores, &mut media).await;

    println!("Import completed.");
    print_import_summary(&report);

    if !report.media_errors.is_empty() {
        println!(
            "There were {} media download failures:",
            report.media_errors.len()
        );
        for error in &report.media_errors {
            println!(" - {error}");
        }

        if args.yes || confirm("Do you want to save the error log to a file?", true)? {
            let filename = format!(
                "import_errors_{}.log",
                chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
            );
            std::fs::write(&filename, report.media_errors.join("\n"))?;
            println!("Log saved to {filename}");
            info!("Media error log written to {filename}");
        }
    }

    Ok(())
}

/// Resolve the export file: as given first, then relative to the working
/// directory.
fn resolve_input_file(arg: Option<&str>, assume_yes: bool) -> Result<PathBuf> {
    let input = match arg {
        Some(value) => value.to_string(),
        None if assume_yes => bail!("No file provided. Aborting."),
        None => ask("Please enter the name of the XML file (e.g. export.xml)")?,
    };

    if input.is_empty() {
        bail!("No file provided. Aborting.");
    }

    let as_given = PathBuf::from(&input);
    if as_given.exists() {
        return Ok(as_given);
    }

    let relative = std::env::current_dir()?.join(&input);
    if relative.exists() {
        return Ok(relative);
    }

    bail!("File not found: {input} (checked relative to the project root too)");
}

fn print_import_summary(report: &ImportReport) {
    println!(
        "Categories: {} created, {} reused. Users: {} created, {} reused. Posts/pages: {} created.",
        report.categories.created,
        report.categories.reused,
        report.users.created,
        report.users.reused,
        report.posts.created,
    );

    let errors = report.stage_errors();
    if !errors.is_empty() {
        println!("{} items failed to import:", errors.len());
        for error in errors {
            println!(" - {error}");
        }
    }
}

fn print_rollback_summary(report: &RollbackReport) {
    println!(
        "Deleted {} posts/pages, {} categories, {} users (the '{}' account is never touched).",
        report.posts.deleted, report.categories.deleted, report.users.deleted, PROTECTED_LOGIN,
    );

    let errors = report.errors();
    if errors.is_empty() {
        println!("Rollback complete.");
    } else {
        println!("Rollback finished with {} errors:", errors.len());
        for error in errors {
            println!(" - {error}");
        }
    }
}

/// Ask a free-form question on stdin.
fn ask(prompt: &str) -> Result<String> {
    print!("{prompt}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Yes/no confirmation with a default answer.
fn confirm(prompt: &str, default: bool) -> Result<bool> {
    let hint = if default { "Y/n" } else { "y/N" };
    print!("{prompt} [{hint}]: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let answer = line.trim().to_ascii_lowercase();

    Ok(match answer.as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    })
}

use chrono::{DateTime, Local};
use clap::Parser;
use mcbackup::catalog::{Catalog, ClearOutcome};
use mcbackup::config::{Args, CatalogConfig, Command};
use mcbackup::engine::{BackupEngine, BackupOptions, BackupReport};
use mcbackup::transport::adb::{AdbBridge, AdbConfig};
use mcbackup::BackupError;
use std::time::SystemTime;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    // stdout is reserved for listings and JSON.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match CatalogConfig::from_args(&args) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    let bridge = AdbBridge::new(AdbConfig {
        program: args.adb.clone(),
        serial: args.serial.clone(),
    });
    let engine = BackupEngine::new(&bridge, config).with_progress(!args.quiet && !args.no_progress);

    let outcome = match args.command {
        Command::List { refresh, json } => engine.catalog(refresh).and_then(|catalog| {
            print_catalog(&catalog, json)
                .map(|_| true)
                .map_err(|e| BackupError::Io(e.into()))
        }),
        Command::Backup { selectors, all, layout, dest, exclude } => {
            let options = BackupOptions { layout, dest, excludes: exclude };
            let report = if all {
                engine.backup_all(&options)
            } else {
                engine.backup(&selectors, &options)
            };
            report.map(|r| {
                print_report(&r);
                r.succeeded()
            })
        }
        Command::ClearCache => engine.clear_cache().map(|outcome| {
            match outcome {
                ClearOutcome::Removed { age: Some(age) } => {
                    println!("Removed cached world list ({}s old).", age.as_secs())
                }
                ClearOutcome::Removed { age: None } => println!("Removed cached world list."),
                ClearOutcome::NotPresent => println!("No cached world list."),
            }
            true
        }),
    };

    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(BackupError::NoWorldsFound) => {
            warn!("No worlds found on the device. Is Minecraft installed and has it been started once?");
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn print_catalog(catalog: &Catalog, json: bool) -> serde_json::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&catalog.entries)?);
        return Ok(());
    }

    if catalog.root.is_none() {
        let age = SystemTime::now()
            .duration_since(catalog.built_at)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        info!("World list is cached ({}s old); use --refresh to rescan.", age);
    }

    for (i, entry) in catalog.entries.iter().enumerate() {
        println!(
            "{:>3}  {:<32}  {:<16}  {}",
            i + 1,
            entry.display_name,
            entry.id,
            format_last_played(entry.recency_key)
        );
    }
    Ok(())
}

fn format_last_played(key: i64) -> String {
    if key <= 0 {
        return "-".to_string();
    }
    DateTime::from_timestamp(key, 0)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_report(report: &BackupReport) {
    for (entry, path) in &report.completed {
        println!("OK    {}  ->  {}", entry.display_name, path.display());
    }
    for (entry, reason) in &report.failed {
        println!("FAIL  {}  ({})", entry.display_name, reason);
    }
    if report.is_empty() && report.unmatched.is_empty() {
        println!("Nothing to back up.");
    }
    if report.has_failures() {
        error!("Encountered {} errors during backup.", report.failed.len());
    }
}

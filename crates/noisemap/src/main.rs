//! `noisemap` - CLI for the noise report service
//!
//! Runs the HTTP API and gives read access to the stored reports.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use noisemap::cli::{Cli, Command, ConfigCommand, ReportsCommand, ServeCommand};
use noisemap::{init_logging, server, BoundingBox, Config, NoiseReport, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(config, serve_cmd).await,
        Command::Reports(reports_cmd) => handle_reports(&config, reports_cmd),
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

async fn handle_serve(mut config: Config, cmd: ServeCommand) -> anyhow::Result<()> {
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    config.validate()?;

    server::run(&config).await?;
    Ok(())
}

fn open_storage(config: &Config) -> anyhow::Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("opening database {}", path.display()))
}

fn handle_reports(config: &Config, cmd: ReportsCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;

    match cmd {
        ReportsCommand::List { user, json } => {
            let reports = match user.as_deref() {
                Some(user_id) => storage.list_by_user(user_id)?,
                None => storage.list_all()?,
            };
            print_reports(&reports, json)?;
        }
        ReportsCommand::Map { json } => {
            let clusters = storage.aggregate_by_coordinate()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&clusters)?);
            } else if clusters.is_empty() {
                println!("No located reports.");
            } else {
                println!("{:>12}  {:>12}  {:>6}", "LATITUDE", "LONGITUDE", "COUNT");
                for cluster in &clusters {
                    let [longitude, latitude] = cluster.coordinates;
                    println!("{latitude:>12}  {longitude:>12}  {:>6}", cluster.count);
                }
            }
        }
        ReportsCommand::Area {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
            json,
        } => {
            let bounds = BoundingBox::new(min_lat, min_lon, max_lat, max_lon)?;
            let reports = storage.list_within(&bounds)?;
            print_reports(&reports, json)?;
        }
    }
    Ok(())
}

fn print_reports(reports: &[NoiseReport], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reports)?);
        return Ok(());
    }

    if reports.is_empty() {
        println!("No reports.");
        return Ok(());
    }

    for report in reports {
        let place = report.geo_location.as_ref().map_or_else(
            || "-".to_string(),
            |point| format!("{:.5},{:.5}", point.latitude(), point.longitude()),
        );
        println!(
            "{}  {}  {:<5}  {:<22}  {:<16}  {}",
            report.created_at.format("%Y-%m-%d %H:%M:%S"),
            report.id,
            report.media_type.as_str(),
            place,
            report.user_id,
            report.reason
        );
    }
    println!();
    println!("{} report(s)", reports.len());
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "total_reports": stats.total_reports,
            "located_reports": stats.located_reports,
            "oldest_report": stats.oldest_report,
            "newest_report": stats.newest_report,
            "db_size_bytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        let format_time = |t: Option<chrono::DateTime<chrono::Utc>>| {
            t.map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
        };
        println!("noisemap status");
        println!("---------------");
        println!("Database:        {}", storage.path().display());
        println!("Reports:         {}", stats.total_reports);
        println!("With location:   {}", stats.located_reports);
        println!("Oldest report:   {}", format_time(stats.oldest_report));
        println!("Newest report:   {}", format_time(stats.newest_report));
        println!("Database size:   {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Host:               {}", config.server.host);
                println!("  Port:               {}", config.server.port);
                println!("  Max upload bytes:   {}", config.server.max_upload_bytes);
                println!("  Permissive CORS:    {}", config.server.cors_permissive);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Media]");
                println!(
                    "  Directory:          {}",
                    config.media.resolved_directory().display()
                );
                println!("  Folder:             {}", config.media.folder);
                println!("  Public base URL:    {}", config.media.public_base_url);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

//! sitemill - streaming sitemap generator
//!
//! Writes size-capped, optionally gzipped sitemap segments and a sitemap
//! index from a stream of URL entries.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "sitemill")]
#[command(about = "Streaming sitemap and sitemap index generator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./sitemill.toml or ~/.config/sitemill/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Write sitemap segments and an index from entry lines
    Generate(cmd::generate::GenerateArgs),
    /// Check an index and the segments it references
    Verify(cmd::verify::VerifyArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = Arc::new(sitemill_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, the spinner shows activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = is_tty && !cli.debug;
    sitemill_core::init_logging(quiet, cli.debug, multi);

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Command::Generate(args) => {
            setup_signal_handler()?;
            cmd::generate::run(args, &config, &progress)
        }
        Command::Verify(args) => cmd::verify::run(args),
        Command::Config => {
            print_config(&config);
            Ok(())
        }
    }
}

/// First signal: stop reading input and close the session.
/// Second signal: exit immediately.
fn setup_signal_handler() -> Result<()> {
    for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT] {
        // SAFETY: AtomicBool::swap and process::exit are async-signal-safe
        unsafe {
            signal_hook::low_level::register(signal, || {
                if sitemill_core::request_shutdown() {
                    std::process::exit(130);
                }
            })?;
        }
    }
    Ok(())
}

fn print_config(config: &Config) {
    use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec![
        "Output directory",
        &config.output.dir.display().to_string(),
    ]);
    table.add_row(vec![
        "Compression",
        &if config.output.compress {
            format!("gzip (level {})", config.output.gzip_level)
        } else {
            "off".to_string()
        },
    ]);
    table.add_row(vec![
        "Index base URL",
        config.sitemap.base_url.as_deref().unwrap_or("(relative)"),
    ]);
    table.add_row(vec![
        "Entries per segment",
        &sitemill_core::progress::fmt_num(config.sitemap.limit),
    ]);
    table.add_row(vec!["Mobile", if config.sitemap.mobile { "yes" } else { "no" }]);
    table.add_row(vec![
        "High-water mark",
        &format!("{} bytes", config.sitemap.high_water_mark),
    ]);

    eprintln!("\n{table}");
}

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_lossless)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};
use pixgrid_engine::{DEFAULT_PALETTE, TokenUnits, default_plans, quote_plans};

mod demo;
mod settings;

pub use settings::*;

#[derive(Parser, Debug)]
#[command(version, about = "Client engine for a shared pixel canvas", long_about = None)]
pub struct Args {
    /// Configuration file (default: pixgrid.toml in the config directory)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log to stderr only
    #[arg(long, global = true)]
    no_log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a scripted drawing session against an in-memory canvas
    Demo {
        #[arg(long, default_value_t = 64)]
        width: u32,

        #[arg(long, default_value_t = 48)]
        height: u32,

        /// Credits of the demo account before the top-up
        #[arg(long, default_value_t = 20)]
        credits: u64,

        /// Number of pixels to draw
        #[arg(long, default_value_t = 24)]
        pixels: u32,
    },
    /// Price the default credit plans
    Plans {
        /// Payment fee per credit in raw token units
        #[arg(long, default_value_t = 10_000)]
        fee: u64,

        #[arg(long, default_value = "ICP")]
        symbol: String,

        #[arg(long, default_value_t = 8)]
        decimals: u8,
    },
    /// List the 256 palette colors
    Palette,
    /// Print the effective configuration as TOML
    Config,
}

fn start_logging(to_file: bool) -> Option<LoggerHandle> {
    let logger = match Logger::try_with_env_or_str("info") {
        Ok(logger) => logger,
        Err(err) => {
            eprintln!("Invalid log specification: {err}");
            return None;
        }
    };
    let logger = match Settings::log_dir().filter(|_| to_file) {
        Some(log_dir) => logger
            .log_to_file(FileSpec::default().directory(&log_dir).basename("pixgrid").suffix("log").suppress_timestamp())
            .rotate(Criterion::Size(64 * 1024), Naming::Numbers, Cleanup::KeepLogFiles(3))
            .duplicate_to_stderr(Duplicate::Warn),
        None => logger.log_to_stderr(),
    };
    match logger.start() {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("Failed to start logging: {err}");
            None
        }
    }
}

fn print_plans(fee: u64, units: &TokenUnits) {
    println!("{:>8}  {:>20}  {:>20}  {:>7}", "credits", "per credit", "price", "savings");
    for quote in quote_plans(&default_plans(), fee as u128) {
        println!(
            "{:>8}  {:>20}  {:>20}  {:>6}%",
            quote.credits,
            units.display(quote.per_credit),
            units.display(quote.price),
            quote.savings_pct
        );
    }
}

fn print_palette() {
    for (index, color) in DEFAULT_PALETTE.iter() {
        println!("{index:>3}  {}  {}", color.to_hex(), color.name());
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _logger = start_logging(!args.no_log_file);
    log::debug!("starting pixgrid {}", env!("CARGO_PKG_VERSION"));

    let config = Settings::load_config(args.config.as_deref())?;

    match args.command {
        Command::Demo {
            width,
            height,
            credits,
            pixels,
        } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(demo::run(
                config,
                demo::DemoOptions {
                    width,
                    height,
                    credits,
                    pixels,
                },
            ))?;
        }
        Command::Plans { fee, symbol, decimals } => print_plans(fee, &TokenUnits::new(symbol, decimals)),
        Command::Palette => print_palette(),
        Command::Config => print!("{}", toml::to_string_pretty(&config)?),
    }
    Ok(())
}

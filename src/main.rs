use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use certshot::platform::{DirAssets, FsPlatform, NoticeLevel};
use certshot::{CertificatePage, ExportConfig, ExportOutcome};

#[derive(Parser)]
#[command(name = "certshot", about = "Render a certificate and export it as a PNG")]
struct Cli {
    /// JSON file with export settings; missing fields take defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding logo, watermark and signature images
    #[arg(long, default_value = ".")]
    assets: PathBuf,

    /// Log lifecycle steps to stderr (repeat for debug output)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Save certificate-<registrationNumber>.png
    Download(Target),
    /// Write a print document holding the certificate image
    Print(Target),
    /// Hand the image to the native share sheet
    Share(Target),
}

#[derive(clap::Args)]
struct Target {
    /// Certificate query string, or a full page URL carrying one
    #[arg(long)]
    query: String,

    /// Output directory
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ExportConfig> {
    match path {
        Some(p) => {
            let json = std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            Ok(ExportConfig::from_json(&json)?)
        }
        None => Ok(ExportConfig::default()),
    }
}

fn query_part(input: &str) -> &str {
    input.split_once('?').map(|(_, q)| q).unwrap_or(input)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_ref())?;
    let (target, op) = match &cli.command {
        Command::Download(t) => (t, "download"),
        Command::Print(t) => (t, "print"),
        Command::Share(t) => (t, "share"),
    };

    let platform = Arc::new(FsPlatform::new(&target.out));
    let assets = Arc::new(DirAssets::new(&cli.assets));
    let page = CertificatePage::load(query_part(&target.query), config, platform.clone(), assets);

    let outcome = match page.exporter() {
        Some(exporter) => Some(match &cli.command {
            Command::Download(_) => exporter.download().await,
            Command::Print(_) => exporter.print().await,
            Command::Share(_) => exporter.share().await,
        }),
        None => None,
    };

    for notice in platform.take_notices() {
        match notice.level {
            NoticeLevel::Info => eprintln!("{}", notice.message),
            NoticeLevel::Error => eprintln!("error: {}", notice.message),
        }
    }

    match outcome {
        None => bail!("{}", page.error_message().unwrap_or("certificate could not be loaded")),
        Some(ExportOutcome::Completed) => Ok(()),
        Some(other) => bail!("{} did not complete: {:?}", op, other),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting tokio runtime")?;
    runtime.block_on(run(cli))
}

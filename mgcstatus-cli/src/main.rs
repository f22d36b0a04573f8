use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use mgcstatus_core::aggregate::{collect_report, ErrorPolicy, ReportOptions};
use mgcstatus_core::analyze::SizeArithmetic;
use mgcstatus_core::gateway::{ClusterSnapshot, MetadataGateway};
use mgcstatus_core::report;
use mgcstatus_core::retry::{Retrying, RetryPolicy};

mod mongo;
mod render;

use mongo::MongoGateway;
use render::Style;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OnError {
    Abort,
    Skip,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Arithmetic {
    Truncated,
    Exact,
}

#[derive(Parser)]
#[command(
    name = "mgcstatus",
    version,
    about = "Get the status of chunks for each collection of a sharded MongoDB cluster"
)]
struct Cli {
    /// Server to connect to
    #[arg(long, env = "MGCSTATUS_HOST", default_value = "localhost")]
    host: String,
    /// Port to connect to
    #[arg(long, env = "MGCSTATUS_PORT", default_value_t = 27017)]
    port: u16,
    /// Database to check status
    #[arg(short = 'd', long = "db", default_value = "test")]
    db: String,
    /// Enable markdown output
    #[arg(short, long)]
    markdown: bool,
    /// Emit rows as JSON
    #[arg(long, conflicts_with = "markdown")]
    json: bool,
    /// Add the AllDataSize(MB) column
    #[arg(short = 'x', long)]
    extended: bool,
    /// Read cluster metadata from a JSON snapshot instead of a live server
    #[arg(long, value_name = "FILE")]
    snapshot: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OnError::Abort)]
    on_error: OnError,
    #[arg(long, value_enum, default_value_t = Arithmetic::Truncated)]
    arithmetic: Arithmetic,
    /// Per-fetch timeout against a live server
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
    /// Retries for failed metadata fetches
    #[arg(long, default_value_t = 0)]
    retries: u32,
    /// Worker threads for per-collection analysis
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    jobs: Option<u16>,
    /// Log analysis progress to stderr
    #[arg(long, default_value_t = false)]
    progress: bool,
    /// -v info, -vv debug, -vvv trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn init_logging(&self) {
        if self.quiet {
            return;
        }
        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        let mut builder = env_logger::Builder::from_default_env();
        builder.filter_level(level);
        if self.progress && level < log::LevelFilter::Info {
            builder.filter_module("mgcstatus_core::progress", log::LevelFilter::Info);
        }
        builder.init();
    }

    fn options(&self) -> ReportOptions {
        ReportOptions {
            database: self.db.clone(),
            on_error: match self.on_error {
                OnError::Abort => ErrorPolicy::Abort,
                OnError::Skip => ErrorPolicy::Skip,
            },
            arithmetic: match self.arithmetic {
                Arithmetic::Truncated => SizeArithmetic::Truncated,
                Arithmetic::Exact => SizeArithmetic::Exact,
            },
            workers: self.jobs.map(usize::from),
            progress: self.progress,
        }
    }
}

fn open_gateway(cli: &Cli) -> Result<Box<dyn MetadataGateway>> {
    if let Some(path) = &cli.snapshot {
        let snap = ClusterSnapshot::load(path)
            .with_context(|| format!("load snapshot {}", path.display()))?;
        info!("using snapshot {}", path.display());
        return Ok(Box::new(snap));
    }
    let gw = MongoGateway::connect(&cli.host, cli.port, Duration::from_secs(cli.timeout_secs))
        .with_context(|| format!("connect to {}:{}", cli.host, cli.port))?;
    Ok(Box::new(gw))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    let policy = RetryPolicy { max_retries: cli.retries, ..RetryPolicy::default() };
    let gateway = Retrying::new(open_gateway(&cli)?, policy);
    let dists = collect_report(&gateway, &cli.options())
        .with_context(|| format!("chunk status of database {}", cli.db))?;
    let rows = report::rows(&dists, cli.extended);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        render::json(&mut out, &rows)?;
    } else {
        let style = if cli.markdown { Style::Markdown } else { Style::Plain };
        render::table(&mut out, &rows, cli.extended, style)?;
    }
    out.flush()?;
    Ok(())
}

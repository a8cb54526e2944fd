//! muninn: resolve a list of titles against the catalog.
//!
//! Reads one query per line (`title`, `title|year` or `title|year|kind`)
//! from a file or stdin and prints one JSON object per query.

use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use muninn::config::{Config, Secrets};
use muninn::{ContentKind, MuninnBuilder, MuninnError, Query};

/// Bulk title resolver.
#[derive(Parser)]
#[command(name = "muninn")]
#[command(version = muninn::PKG_VERSION)]
#[command(about = "Resolve titles to catalog identifiers")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input file with one query per line (default: stdin).
    input: Option<PathBuf>,

    /// Cancel whatever is still pending after this many seconds.
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Catalog base URL override.
    #[arg(long, env = "MUNINN_CATALOG_URL")]
    catalog_url: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let config = Config::load_or_default(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    let mut builder = MuninnBuilder::from_config(&config, &secrets);
    if let Some(url) = args.catalog_url {
        builder = builder.catalog_url(url);
    }
    let resolver = builder.build()?;

    let input = read_input(args.input)?;
    let queries = input
        .lines()
        .enumerate()
        .filter_map(|(n, line)| parse_line(line).map(|q| q.map_err(|e| (n + 1, e))))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|(line, e)| format!("line {line}: {e}"))?;

    info!(
        version = muninn::version_string(),
        queries = queries.len(),
        "resolving batch"
    );

    let result = match args.deadline_secs {
        Some(secs) => {
            resolver
                .resolve_batch_with_deadline(&queries, Duration::from_secs(secs))
                .await?
        }
        None => resolver.resolve_batch(&queries).await?,
    };

    for query in &queries {
        let line = serde_json::json!({
            "query": query,
            "outcome": result.outcome(query),
        });
        println!("{line}");
    }

    let metrics = resolver.cache_metrics();
    info!(
        hits = metrics.hits,
        misses = metrics.misses,
        hit_rate = metrics.hit_rate(),
        "cache usage"
    );

    Ok(())
}

fn read_input(path: Option<PathBuf>) -> io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Parse `title[|year[|kind]]`. Blank lines and `#` comments yield `None`.
fn parse_line(line: &str) -> Option<Result<Query, MuninnError>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut fields = line.split('|').map(str::trim);
    let mut query = Query::new(fields.next().unwrap_or_default());

    if let Some(year) = fields.next().filter(|s| !s.is_empty()) {
        match year.parse::<u16>() {
            Ok(year) => query = query.year(year),
            Err(_) => {
                return Some(Err(MuninnError::InvalidInput(format!(
                    "invalid year: {year}"
                ))));
            }
        }
    }

    if let Some(kind) = fields.next().filter(|s| !s.is_empty()) {
        match kind.parse::<ContentKind>() {
            Ok(kind) => query = query.kind(kind),
            Err(e) => return Some(Err(e)),
        }
    }

    Some(Ok(query))
}

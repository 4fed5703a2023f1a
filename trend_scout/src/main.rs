use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;
use trend_scout::scraper::HttpFetcher;
use trend_scout::session::{BoardView, SessionView, LIST_UNAVAILABLE};
use trend_scout::{utils, Dashboard, ScoutConfig, ScoutError};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Open the item at this zero-based rank and print its analysis
    #[arg(short, long)]
    open: Option<usize>,

    /// Write the result as JSON to this file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Skip the selector call; list only
    #[arg(long)]
    no_picks: bool,

    /// Fetch and summarize these article links one after another
    #[arg(short, long, num_args = 1..)]
    digest: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trend_scout=info")),
        )
        .init();

    let args = Args::parse();
    let config = ScoutConfig::from_env()?;

    let dashboard = if args.no_picks {
        Dashboard::new(config.clone(), Arc::new(HttpFetcher::new(&config)?), None)?
    } else {
        Dashboard::from_config(config)?
    };
    if let Some(notice) = dashboard.startup_notice() {
        warn!("{}", notice);
    }

    if !args.digest.is_empty() {
        let digest = dashboard.digest(&args.digest).await?;
        match &args.output {
            Some(path) => utils::save_text(&digest, path)?,
            None => println!("{}", digest),
        }
        return Ok(());
    }

    let board = match dashboard.board().await {
        Ok(board) => board,
        Err(e) => {
            error!(error = %e, "{}", LIST_UNAVAILABLE);
            return Ok(());
        }
    };

    let Some(rank) = args.open else {
        let view = BoardView::from_result(Ok(board));
        for item in &view.items {
            println!("{:>3}. {}", item.rank, item.label);
        }
        if let Some(path) = &args.output {
            utils::save_json(&view, path)?;
        }
        return Ok(());
    };

    let item = board
        .items
        .into_iter()
        .find(|item| item.rank == rank)
        .ok_or(ScoutError::UnknownItem(rank))?;

    let mut session = SessionView::default();
    session.open(dashboard.open(item).await);
    let detail = session.detail();

    if let Some(banner) = detail.banner {
        println!("{}\n", banner);
    }
    println!("{}\n", detail.title.as_deref().unwrap_or_default());
    println!("{}", detail.analysis);

    if let Some(path) = &args.output {
        utils::save_json(&detail, path)?;
    }
    Ok(())
}

use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use url::Url;

use paywall_drop::markup::reconstruct;
use paywall_drop::page::classify;
use paywall_drop::score::parse_score;
use paywall_drop::{
    Document, HostCapabilities, Outcome, Page, ReviewFetcher, RunState, Settings, Watcher,
};

#[derive(Parser)]
#[command(name = "paywall_drop", about = "Restore paywalled album reviews")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a review page and restore its body and score
    Restore {
        /// Address of the review page
        url: Url,
        /// Read the page HTML from this file instead of fetching it
        #[arg(long)]
        html: Option<PathBuf>,
        /// Behave like a host without a sanitising HTML parser
        #[arg(long)]
        no_sanitizer: bool,
        /// Write the patched page here instead of printing the body
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Tell whether an address is a supported review page
    Classify { url: Url },
    /// Parse a displayed score
    Score { text: String },
    /// Rebuild body markup from a structured review document (JSON)
    Render {
        /// JSON file, `-` or nothing for stdin
        file: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Restore {
            url,
            html,
            no_sanitizer,
            output,
        } => {
            let settings = Settings {
                sanitizer: !no_sanitizer,
                ..Settings::default()
            };
            restore(url, html, output, settings).await
        }
        Commands::Classify { url } => {
            println!("{}", classify(url.path()));
            Ok(())
        }
        Commands::Score { text } => {
            match parse_score(&text) {
                Some(score) => println!("{}", score),
                None => println!("none"),
            }
            Ok(())
        }
        Commands::Render { file } => {
            let raw = read_input(file.as_ref())?;
            let document: serde_json::Value =
                serde_json::from_str(&raw).context("Input is not valid JSON")?;
            let body = document
                .pointer("/review/body")
                .and_then(|b| b.as_array())
                .context("Input has no review.body sequence")?;
            println!("{}", reconstruct(body));
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

async fn restore(
    url: Url,
    html: Option<PathBuf>,
    output: Option<PathBuf>,
    settings: Settings,
) -> Result<()> {
    let fetcher = ReviewFetcher::new(&settings.user_agent)?;

    let source = match html {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            info!("Fetching page: {}", url);
            fetcher
                .fetch_page_html(&url)
                .await
                .with_context(|| format!("Failed to fetch {}", url))?
        }
    };

    let capabilities = HostCapabilities {
        sanitizer: settings.sanitizer,
    };
    let page = Page::new(Document::parse(url, &source).with_capabilities(capabilities));
    let anchors = settings.anchors.clone();
    let mut watcher = Watcher::new(page.clone(), fetcher, settings.anchors);

    let barrier_present = page.read(|doc| doc.find_by_class(&anchors.barrier_class).is_some());
    if !barrier_present {
        // A static page never mutates, so observing would wait forever.
        println!("No paywall barrier on this page; nothing to restore.");
        return Ok(());
    }

    let state = watcher.run().await;
    println!("Run settled as {:?}", state);
    if let Some(report) = watcher.report() {
        println!(
            "Body replaced: {} | Score restored: {}",
            report.body_replaced, report.score_restored
        );
    }

    match output {
        Some(path) => {
            let patched = page.read(Document::to_html);
            std::fs::write(&path, patched)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Patched page written to {}", path.display());
        }
        None if state == RunState::Settled(Outcome::Success) => {
            let (name, value) = &anchors.body_attr;
            let body = page.read(|doc| doc.find_by_attr(name, value).map(|id| doc.inner_html(id)));
            if let Some(body) = body {
                println!("\n{}", body);
            }
        }
        None => {}
    }
    Ok(())
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

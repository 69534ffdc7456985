use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use docs2pdf::{pipeline, BrowserSession, Config, PdfMerger};
use std::path::PathBuf;
use std::process;
use tokio::fs;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docs2pdf")]
#[command(about = "CLI utility to crawl a documentation website and turn it into a single PDF for offline reading")]
#[command(version)]
struct Args {
    /// JSON config file; flags passed on the command line take precedence
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the site, render every page and merge them into one PDF
    Run {
        #[command(flatten)]
        site: SiteArgs,

        #[command(flatten)]
        browser: BrowserArgs,

        #[command(flatten)]
        render: RenderArgs,
    },
    /// Crawl the site and only write the list of discovered URLs
    Crawl {
        #[command(flatten)]
        site: SiteArgs,

        #[command(flatten)]
        browser: BrowserArgs,
    },
    /// Render the URLs of an existing list and merge them into one PDF
    Render {
        /// URL list to read, one URL per line [default: docs.txt]
        #[arg(short = 'i', long = "input")]
        input: Option<PathBuf>,

        #[command(flatten)]
        browser: BrowserArgs,

        #[command(flatten)]
        render: RenderArgs,
    },
    /// Merge existing PDF files into a single document
    Merge {
        /// Directory containing PDF files to merge
        #[arg(short = 'd', long = "dir", default_value = "temp_pdfs")]
        input_dir: String,

        /// Output file path for the merged PDF
        #[arg(short = 'o', long = "output", default_value = "merged.pdf")]
        output_file: String,
    },
}

#[derive(clap::Args)]
struct SiteArgs {
    /// Origin of the website to crawl [default: https://langchain-ai.github.io]
    #[arg(long = "base-url")]
    base_url: Option<String>,

    /// Path prefix the crawl starts from and stays under [default: /langgraph/]
    #[arg(long = "start-path")]
    start_path: Option<String>,

    /// Substrings that exclude a URL when present [default: "#_" "?q="]
    #[arg(long = "skip-patterns", num_args = 1..)]
    skip_patterns: Option<Vec<String>>,

    /// Where the discovered URLs are written [default: docs.txt]
    #[arg(long = "url-list")]
    url_list: Option<PathBuf>,

    /// Stop the crawl after this many pages
    #[arg(long = "max-pages")]
    max_pages: Option<usize>,
}

#[derive(clap::Args)]
struct BrowserArgs {
    /// Navigation and network-idle timeout in seconds [default: 30]
    #[arg(short = 't', long = "timeout", value_parser = parse_seconds)]
    timeout: Option<f64>,

    /// Pause after network idle so deferred content can render, in seconds [default: 2]
    #[arg(long = "settle-delay", value_parser = parse_seconds)]
    settle_delay: Option<f64>,

    /// Show the browser window
    #[arg(long = "headed")]
    headed: bool,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Output PDF file [default: derived from the site]
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Text of the cookie consent button to click before printing [default: Accept]
    #[arg(long = "cookie-accept-button-text")]
    consent_button_text: Option<String>,

    /// Don't look for a cookie consent button
    #[arg(long = "no-consent", conflicts_with = "consent_button_text")]
    no_consent: bool,

    /// Attempts per page before giving up [default: 3]
    #[arg(long = "max-attempts", value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: Option<u32>,

    /// Pause between attempts on the same page, in seconds [default: 5]
    #[arg(long = "retry-backoff", value_parser = parse_seconds)]
    retry_backoff: Option<f64>,

    /// Directory for the per-page PDFs [default: temp_pdfs]
    #[arg(long = "temp-dir")]
    temp_dir: Option<PathBuf>,

    /// Preserve individual page PDFs (by default they are deleted after merging)
    #[arg(short = 'p', long = "preserve-pages")]
    preserve_pages: bool,
}

impl SiteArgs {
    fn apply(self, config: &mut Config) {
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(start_path) = self.start_path {
            config.start_path = start_path;
        }
        if let Some(skip_patterns) = self.skip_patterns {
            config.skip_patterns = skip_patterns;
        }
        if let Some(url_list) = self.url_list {
            config.url_list = url_list;
        }
        if self.max_pages.is_some() {
            config.max_pages = self.max_pages;
        }
    }
}

impl BrowserArgs {
    fn apply(self, config: &mut Config) {
        if let Some(timeout) = self.timeout {
            config.navigation_timeout_secs = timeout;
            config.idle_timeout_secs = timeout;
        }
        if let Some(settle_delay) = self.settle_delay {
            config.settle_delay_secs = settle_delay;
        }
        config.headed |= self.headed;
    }
}

impl RenderArgs {
    fn apply(self, config: &mut Config) {
        if self.output.is_some() {
            config.output = self.output;
        }
        if self.no_consent {
            config.consent_button_text = None;
        } else if self.consent_button_text.is_some() {
            config.consent_button_text = self.consent_button_text;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
        if let Some(retry_backoff) = self.retry_backoff {
            config.retry_backoff_secs = retry_backoff;
        }
        if let Some(temp_dir) = self.temp_dir {
            config.temp_dir = temp_dir;
        }
        config.keep_pages |= self.preserve_pages;
    }
}

fn parse_seconds(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|_| "Not a number.")?;
    if !value.is_finite() || value < 0.0 {
        return Err("Must be zero or positive number.".to_string());
    }
    Ok(value)
}

async fn merge_pdfs(input_dir: &str, output_file: &str) -> Result<()> {
    let input_path = PathBuf::from(input_dir);

    if !input_path.exists() {
        return Err(anyhow::anyhow!("Input directory '{}' does not exist", input_dir));
    }

    info!("Scanning directory: {}", input_dir.green());

    let mut entries = fs::read_dir(&input_path).await?;
    let mut pdf_files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "pdf") {
            pdf_files.push(path);
        }
    }

    if pdf_files.is_empty() {
        return Err(anyhow::anyhow!("No PDF files found in '{}'", input_dir));
    }

    // file name order keeps numbered pages in sequence
    pdf_files.sort();

    info!("Found {} PDF files to merge", pdf_files.len());

    let mut merger = PdfMerger::new();
    for pdf_path in &pdf_files {
        info!("Adding: {}", pdf_path.display().to_string().blue());
        if let Err(e) = merger.add_pdf(pdf_path).await {
            error!("Failed to add PDF {}: {}", pdf_path.display(), e);
        }
    }

    let output_path = PathBuf::from(output_file);
    merger.save(&output_path).await?;

    info!(
        "Successfully merged {} PDFs into: {}",
        merger.len(),
        output_path.display().to_string().green()
    );

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(&path),
        None => Ok(Config::default()),
    }
}

async fn execute(args: Args) -> Result<()> {
    let mut config = load_config(args.config)?;

    match args.command {
        Commands::Run {
            site,
            browser,
            render,
        } => {
            site.apply(&mut config);
            browser.apply(&mut config);
            render.apply(&mut config);
            config.validate()?;

            let session = BrowserSession::launch(config.headed).await?;
            let result = pipeline::run(&session, &config).await;
            session.close().await;
            result?.log();
        }
        Commands::Crawl { site, browser } => {
            site.apply(&mut config);
            browser.apply(&mut config);
            config.validate()?;

            let session = BrowserSession::launch(config.headed).await?;
            let result = pipeline::crawl(&session, &config).await;
            session.close().await;
            let urls = result?;
            info!(
                "Crawling completed: {} pages saved to {}",
                urls.len(),
                config.url_list.display().to_string().blue()
            );
        }
        Commands::Render {
            input,
            browser,
            render,
        } => {
            browser.apply(&mut config);
            render.apply(&mut config);
            config.validate()?;

            let url_list = input.unwrap_or_else(|| config.url_list.clone());
            let session = BrowserSession::launch(config.headed).await?;
            let result = pipeline::render(&session, &config, &url_list).await;
            session.close().await;
            result?.log();
        }
        Commands::Merge {
            input_dir,
            output_file,
        } => {
            merge_pdfs(&input_dir, &output_file).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // chromiumoxide logs every unparsed CDP event at error level
    let filter = EnvFilter::from_default_env()
        .add_directive("chromiumoxide::conn=off".parse().unwrap())
        .add_directive("chromiumoxide::handler=off".parse().unwrap())
        .add_directive("docs2pdf=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let args = Args::parse();

    if let Err(e) = execute(args).await {
        error!("{}", format!("Error: {}", e).red());
        process::exit(1);
    }
}

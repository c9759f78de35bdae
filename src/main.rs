//! Press-Harvest main entry point
//!
//! This is the command-line interface for the Press-Harvest article harvester.

use anyhow::{bail, Context};
use clap::Parser;
use press_harvest::config::{load_config_with_hash, validate, Config};
use press_harvest::session::ChromiumLauncher;
use press_harvest::Coordinator;
use std::collections::HashSet;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the login email
const EMAIL_VAR: &str = "PRESS_HARVEST_EMAIL";

/// Environment variable holding the login password
const PASSWORD_VAR: &str = "PRESS_HARVEST_PASSWORD";

/// Press-Harvest: an incremental article harvester
///
/// Press-Harvest renders every post of one or more publications in a browser,
/// stores each as markdown and HTML, and remembers what it has already
/// harvested so repeated runs only fetch what is new.
#[derive(Parser, Debug)]
#[command(name = "press-harvest")]
#[command(version = "1.0.0")]
#[command(about = "An incremental article harvester", long_about = None)]
struct Cli {
    /// Publication root URLs
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// File with one publication URL per line
    #[arg(long, value_name = "FILE")]
    urls_file: Option<PathBuf>,

    /// Read publication URLs from stdin, one per line
    #[arg(long)]
    stdin: bool,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run the browser without a window
    #[arg(long)]
    headless: bool,

    /// Chrome/Chromium executable to use
    #[arg(long, value_name = "PATH")]
    browser_path: Option<String>,

    /// User agent for the browser and discovery requests
    #[arg(long)]
    user_agent: Option<String>,

    /// Maximum number of posts to fetch per publication (0 = no cap)
    #[arg(short = 'n', long)]
    max_items: Option<usize>,

    /// Maximum number of fetches in flight at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Number of browser sessions
    #[arg(long)]
    pool_size: Option<usize>,

    /// Minimum delay before each fetch, in seconds
    #[arg(long)]
    delay_min: Option<f64>,

    /// Maximum delay before each fetch, in seconds
    #[arg(long)]
    delay_max: Option<f64>,

    /// Only harvest posts newer than the last run
    #[arg(long)]
    continuous: bool,

    /// Repeat the harvest every N minutes
    #[arg(long, value_name = "MINUTES")]
    interval: Option<u64>,

    /// Log in with the credentials from the environment or config
    #[arg(long)]
    login: bool,

    /// Log in by hand in the browser window before harvesting
    #[arg(long)]
    manual_login: bool,

    /// Root directory for markdown artifacts
    #[arg(long)]
    markdown_dir: Option<String>,

    /// Root directory for HTML artifacts
    #[arg(long)]
    html_dir: Option<String>,

    /// Directory for aggregated results files
    #[arg(long)]
    data_dir: Option<String>,

    /// Validate config and show what would be harvested without harvesting
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    apply_overrides(&mut config, &cli)?;
    if config.publications.is_empty() {
        bail!("No publication URLs given (pass URLs, --urls-file, --stdin, or `publications` in the config)");
    }
    validate(&config).context("Invalid configuration")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_harvest(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("press_harvest=info,warn"),
            1 => EnvFilter::new("press_harvest=debug,info"),
            2 => EnvFilter::new("press_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Layers command-line flags and environment credentials over the file config
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    let mut publications = cli.urls.clone();
    if let Some(path) = &cli.urls_file {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open URL file {}", path.display()))?;
        publications.extend(read_urls(std::io::BufReader::new(file))?);
    }
    if cli.stdin {
        publications.extend(read_urls(std::io::stdin().lock())?);
    }
    if !publications.is_empty() {
        config.publications = publications;
    }
    let mut seen = HashSet::new();
    config
        .publications
        .retain(|p| seen.insert(p.trim_end_matches('/').to_string()));

    if cli.headless {
        config.session.headless = true;
    }
    if let Some(path) = &cli.browser_path {
        config.session.browser_path = Some(path.clone());
    }
    if let Some(agent) = &cli.user_agent {
        config.session.user_agent = Some(agent.clone());
    }
    if let Some(size) = cli.pool_size {
        config.session.pool_size = size;
    }

    if let Some(n) = cli.max_items {
        config.harvest.max_items = n;
    }
    if let Some(n) = cli.concurrency {
        config.harvest.max_concurrent = n;
    }
    if let Some(secs) = cli.delay_min {
        config.harvest.delay_min = secs;
    }
    if let Some(secs) = cli.delay_max {
        config.harvest.delay_max = secs;
    }
    if cli.continuous {
        config.harvest.continuous = true;
    }
    if let Some(minutes) = cli.interval {
        config.harvest.interval_minutes = minutes;
    }

    if cli.login {
        config.auth.login = true;
    }
    if cli.manual_login {
        config.auth.manual_login = true;
    }
    if let Ok(email) = std::env::var(EMAIL_VAR) {
        config.auth.email = Some(email);
    }
    if let Ok(password) = std::env::var(PASSWORD_VAR) {
        config.auth.password = Some(password);
    }

    if let Some(dir) = &cli.markdown_dir {
        config.output.markdown_dir = dir.clone();
    }
    if let Some(dir) = &cli.html_dir {
        config.output.html_dir = dir.clone();
    }
    if let Some(dir) = &cli.data_dir {
        config.output.data_dir = dir.clone();
    }
    Ok(())
}

/// Reads one URL per line, skipping blank lines and `#` comments
fn read_urls(reader: impl BufRead) -> anyhow::Result<Vec<String>> {
    let mut urls = Vec::new();
    for line in reader.lines() {
        let line = line.context("Failed to read URL list")?;
        let line = line.trim();
        if !line.is_empty() && !line.starts_with('#') {
            urls.push(line.to_string());
        }
    }
    Ok(urls)
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) {
    println!("=== Press-Harvest Dry Run ===\n");

    println!("Harvest Configuration:");
    println!("  Mode: {}", if config.harvest.continuous { "continuous" } else { "full" });
    println!("  Max items: {}", config.harvest.max_items);
    println!("  Max concurrent: {}", config.harvest.max_concurrent);
    println!(
        "  Delay: {:.1}s - {:.1}s",
        config.harvest.delay_min, config.harvest.delay_max
    );
    println!("  Interval: {} min", config.harvest.interval_minutes);

    println!("\nSession:");
    println!("  Headless: {}", config.session.headless);
    println!("  Pool size: {}", config.session.pool_size);
    println!(
        "  Login: {}",
        if config.auth.manual_login {
            "manual"
        } else if config.auth.credentials().is_some() {
            "credentials"
        } else {
            "none"
        }
    );

    println!("\nOutput:");
    println!("  Markdown: {}", config.output.markdown_dir);
    println!("  HTML: {}", config.output.html_dir);
    println!("  Data: {}", config.output.data_dir);

    println!("\nPublications ({}):", config.publications.len());
    for publication in &config.publications {
        println!("  - {}", publication);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config) -> anyhow::Result<()> {
    if config.auth.login && config.auth.credentials().is_none() {
        tracing::warn!(
            "Login requested but no credentials found (set {} and {}); continuing logged out",
            EMAIL_VAR,
            PASSWORD_VAR
        );
    }

    let launcher = Arc::new(ChromiumLauncher::new(&config.session));
    let coordinator =
        Coordinator::from_config(config, launcher).context("Failed to set up harvester")?;

    if coordinator.config().auth.manual_login {
        println!("Log in in the browser window, then press Enter here to continue...");
        let operator_done = async {
            let _ = tokio::task::spawn_blocking(|| {
                let mut line = String::new();
                let _ = std::io::stdin().read_line(&mut line);
            })
            .await;
        };
        match coordinator.pool().manual_login(operator_done).await {
            Ok(status) => tracing::info!("Manual login finished: {:?}", status),
            Err(e) => tracing::warn!("Manual login failed, continuing logged out: {}", e),
        }
    } else if coordinator.config().auth.credentials().is_some() {
        let statuses = coordinator.pool().login_all().await;
        tracing::info!("Session login status: {:?}", statuses);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing the current iteration");
            let _ = shutdown_tx.send(true);
        }
    });

    coordinator.run_forever(shutdown_rx).await;
    coordinator.shutdown().await;
    tracing::info!("Harvest finished");
    Ok(())
}

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use stubble::capture::RequestLog;
use stubble::config::{ConfigOverrides, ServerConfig};
use stubble::loader::load_rule_files;
use stubble::server::{AppState, StubServer};
use stubble::{InMemoryRuleStore, Selector};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stubble")]
#[command(about = "HTTP test-double server answering requests from declarative rules")]
#[command(version)]
struct Args {
    /// Rule files (concatenated or newline-delimited JSON)
    rules: Vec<PathBuf>,

    /// Port to listen on [default: 8080]
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Address to listen on [default: 0.0.0.0]
    #[arg(long)]
    host: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ceiling on a single rule storage call [default: 5000]
    #[arg(long)]
    storage_timeout_ms: Option<u64>,

    /// Number of captured requests kept, 0 disables capture [default: 40]
    #[arg(long)]
    request_log_capacity: Option<usize>,

    /// Log level used when RUST_LOG is unset [default: info]
    #[arg(long)]
    log_level: Option<String>,

    /// Load and check the rule files, then exit
    #[arg(long)]
    validate: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            rules: self.rules.clone(),
            storage_timeout_ms: self.storage_timeout_ms,
            request_log_capacity: self.request_log_capacity,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let base = match &args.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ServerConfig::default(),
    };
    let config = base.apply(args.overrides());
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let rules = load_rule_files(&config.rules).context("Failed to load rules")?;
    info!(
        "Loaded {} rules from {} files",
        rules.len(),
        config.rules.len()
    );
    if rules.is_empty() {
        warn!("No rules loaded; every request gets the no-match response until rules are registered");
    }
    if args.validate {
        info!("Rule files are valid");
        return Ok(());
    }

    let store = Arc::new(InMemoryRuleStore::new(rules));
    let selector = Selector::new(store).with_storage_timeout(config.storage_timeout());
    let state = Arc::new(AppState::new(
        selector,
        RequestLog::new(config.request_log_capacity),
    ));

    let server = StubServer::bind(config.socket_addr()?, state)
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
}

// # iphopd - ip-hop daemon
//
// Thin integration layer: all update and scheduling logic lives in
// iphop-core. The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Building the store, vault, IP resolver and vendor adapter factory
// 4. Arming every stored schedule and running until SIGINT/SIGTERM
//
// ## Usage
//
// ```bash
// iphopd                 # run the scheduler (same as `iphopd run`)
// iphopd update <id>     # one manual update for a domain, then exit
// iphopd --help          # usage
// ```
//
// ## Configuration
//
// ### Store
// - `IPHOP_STORE_TYPE`: `file` (default) or `memory`
// - `IPHOP_STATE_PATH`: Path to the JSON state file (for file store)
// - `IPHOP_ENCRYPTION_KEY`: Base64 AES-256-GCM key sealing provider credentials
//
// ### IP Resolver
// - `IPHOP_IP_ENDPOINTS`: Comma-separated echo endpoints
// - `IPHOP_IP_TIMEOUT_SECS`: Per-request timeout (1-60, default 5)
// - `IPHOP_IP_MAX_ATTEMPTS`: Attempts per endpoint (1-10, default 3)
// - `IPHOP_IP_RETRY_DELAY_SECS`: Delay between attempts (0-60, default 2)
//
// ### Providers
// - `IPHOP_PROVIDER_TIMEOUT_SECS`: Vendor call timeout (1-120, default 10)
//
// ### Logging
// - `IPHOP_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// ## Example
//
// ```bash
// export IPHOP_STATE_PATH=/var/lib/ip-hop/state.json
// export IPHOP_ENCRYPTION_KEY=$(head -c 32 /dev/urandom | base64)
//
// iphopd
// ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use iphop_core::config::{IpHopConfig, ProviderHttpConfig, ResolverConfig, StoreConfig};
use iphop_core::traits::Store;
use iphop_core::{AesGcmVault, FileStore, IpHop, MemoryStore, UpdateOrchestrator};
use iphop_ip_http::HttpIpResolver;
use iphop_providers::VendorFactory;
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum IpHopExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<IpHopExitCode> for ExitCode {
    fn from(code: IpHopExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// ip-hop - keeps DNS A records pointed at this host's public IPv4 address
///
/// Configuration is read from IPHOP_* environment variables.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Defaults to `run` when omitted
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Arm every stored schedule and run until SIGINT/SIGTERM
    Run,

    /// Push the current IP for one domain now, then exit
    Update {
        /// Domain to update
        #[arg(value_name = "DOMAIN_ID")]
        domain_id: i64,
    },
}

impl Cli {
    fn command_or_default(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }
}

/// Application configuration
struct Config {
    core: IpHopConfig,
    encryption_key: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ResolverConfig::default();
        let resolver = ResolverConfig {
            endpoints: match lookup("IPHOP_IP_ENDPOINTS") {
                Some(list) => list
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                None => defaults.endpoints,
            },
            timeout_secs: parse_or(&lookup, "IPHOP_IP_TIMEOUT_SECS", defaults.timeout_secs)?,
            max_attempts: parse_or(&lookup, "IPHOP_IP_MAX_ATTEMPTS", defaults.max_attempts)?,
            retry_delay_secs: parse_or(
                &lookup,
                "IPHOP_IP_RETRY_DELAY_SECS",
                defaults.retry_delay_secs,
            )?,
        };

        let provider = ProviderHttpConfig {
            timeout_secs: parse_or(
                &lookup,
                "IPHOP_PROVIDER_TIMEOUT_SECS",
                ProviderHttpConfig::default().timeout_secs,
            )?,
        };

        let store = match lookup("IPHOP_STORE_TYPE")
            .unwrap_or_else(|| "file".to_string())
            .to_lowercase()
            .as_str()
        {
            "file" => StoreConfig::File {
                path: lookup("IPHOP_STATE_PATH").context(
                    "IPHOP_STATE_PATH is required when IPHOP_STORE_TYPE=file. \
                    Set it via: export IPHOP_STATE_PATH=/var/lib/ip-hop/state.json",
                )?,
            },
            "memory" => StoreConfig::Memory,
            other => anyhow::bail!(
                "IPHOP_STORE_TYPE '{}' is not supported. Supported types: file, memory",
                other
            ),
        };

        Ok(Self {
            core: IpHopConfig {
                resolver,
                provider,
                store,
            },
            encryption_key: lookup("IPHOP_ENCRYPTION_KEY").unwrap_or_default(),
            log_level: lookup("IPHOP_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.core.validate()?;

        if self.encryption_key.trim().is_empty() {
            anyhow::bail!(
                "IPHOP_ENCRYPTION_KEY is required. \
                Generate one via: head -c 32 /dev/urandom | base64"
            );
        }
        AesGcmVault::from_base64(&self.encryption_key)
            .context("IPHOP_ENCRYPTION_KEY is not a valid key")?;

        if let StoreConfig::File { path } = &self.core.store
            && let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            anyhow::bail!(
                "IPHOP_STATE_PATH parent directory does not exist: {}. \
                Create it first: sudo mkdir -p {}",
                parent.display(),
                parent.display()
            );
        }

        for url in &self.core.resolver.endpoints {
            if url.starts_with("http://") {
                eprintln!(
                    "WARNING: IP endpoint {} uses HTTP (not HTTPS). \
                    Responses can be tampered with in transit.",
                    url
                );
            }
        }

        self.level()?;
        Ok(())
    }

    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "IPHOP_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number. Got: {}", name, raw)),
        None => Ok(default),
    }
}

fn main() -> ExitCode {
    let command = match Cli::try_parse() {
        Ok(cli) => cli.command_or_default(),
        Err(e) => {
            let _ = e.print();
            // --help and --version land here too
            return if e.use_stderr() {
                IpHopExitCode::ConfigError.into()
            } else {
                IpHopExitCode::CleanShutdown.into()
            };
        }
    };

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return IpHopExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return IpHopExitCode::ConfigError.into();
    }

    let log_level = config.level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return IpHopExitCode::ConfigError.into();
    }

    info!("Starting iphopd {}", env!("CARGO_PKG_VERSION"));

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return IpHopExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let (iphop, store) = match build(&config).await {
            Ok(parts) => parts,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return IpHopExitCode::ConfigError;
            }
        };

        let outcome = match command {
            Command::Run => run_daemon(&iphop).await,
            Command::Update { domain_id } => run_update(&iphop, domain_id).await,
        };

        if let Err(e) = store.flush().await {
            error!("Failed to flush store: {}", e);
        }

        match outcome {
            Ok(()) => IpHopExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                IpHopExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Wire the store, vault, resolver and adapters into one facade
async fn build(config: &Config) -> Result<(IpHop, Arc<dyn Store>)> {
    let store: Arc<dyn Store> = match &config.core.store {
        StoreConfig::File { path } => {
            info!("Using file store at {}", path);
            Arc::new(FileStore::new(path).await?)
        }
        StoreConfig::Memory => {
            warn!("Using in-memory store; nothing survives a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let vault = AesGcmVault::from_base64(&config.encryption_key)?;
    let resolver = HttpIpResolver::new(&config.core.resolver)?;
    info!(
        "IP resolver: {} endpoint(s), {} attempt(s) each",
        resolver.endpoints().len(),
        config.core.resolver.max_attempts
    );
    let factory = VendorFactory::new(config.core.provider.clone());

    let orchestrator = Arc::new(UpdateOrchestrator::new(
        Arc::clone(&store),
        Arc::new(resolver),
        Arc::new(factory),
        Arc::new(vault),
    ));
    Ok((IpHop::new(orchestrator), store))
}

/// Arm every stored schedule and wait for a shutdown signal
async fn run_daemon(iphop: &IpHop) -> Result<()> {
    let loaded = iphop.scheduler_load_all().await?;
    info!("Daemon initialized with {} active schedule(s)", loaded);

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);
    info!("Shutting down daemon");

    iphop.scheduler_shutdown().await;
    Ok(())
}

/// One manual update, bypassing the change gate
async fn run_update(iphop: &IpHop, domain_id: i64) -> Result<()> {
    if iphop.trigger_manual_update(domain_id).await? {
        info!("Domain {} updated", domain_id);
        Ok(())
    } else {
        anyhow::bail!("Provider rejected the update for domain {}", domain_id)
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Fallback implementation for non-Unix platforms
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

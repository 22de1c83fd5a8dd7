//! Keystone Collector CLI
//!
//! A minimal stand-in for a telemetry host: builds the configuration bag
//! from flags, environment and an optional file, runs one query against the
//! collector and prints the result as JSON on stdout.
//!
//! ```text
//! keystone-collector metric-types
//! keystone-collector collect /intel/openstack/keystone/total_users_count
//! keystone-collector meta
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use keystone_collector::config::{
    ADMIN_ENDPOINT, ADMIN_PASSWORD, ADMIN_TENANT, ADMIN_USER, DOMAIN_ID, DOMAIN_NAME,
};
use keystone_collector::metrics::{config_policy, meta};
use keystone_collector::{ClientOptions, Collector, ConfigMap, MetricType, Namespace};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Keystone Collector - OpenStack identity metrics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML or JSON file with configuration items; flags take precedence
    #[arg(long, env = "KEYSTONE_COLLECTOR_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Keystone admin endpoint
    #[arg(long, env = "KEYSTONE_ADMIN_ENDPOINT", global = true)]
    admin_endpoint: Option<String>,

    /// Keystone admin user
    #[arg(long, env = "KEYSTONE_ADMIN_USER", global = true)]
    admin_user: Option<String>,

    /// Keystone admin password
    #[arg(long, env = "KEYSTONE_ADMIN_PASSWORD", global = true, hide_env_values = true)]
    admin_password: Option<String>,

    /// Keystone admin tenant
    #[arg(long, env = "KEYSTONE_ADMIN_TENANT", global = true)]
    admin_tenant: Option<String>,

    /// Domain name for domain-scoped authentication
    #[arg(long, env = "KEYSTONE_DOMAIN_NAME", global = true)]
    domain_name: Option<String>,

    /// Domain ID for domain-scoped authentication
    #[arg(long, env = "KEYSTONE_DOMAIN_ID", global = true)]
    domain_id: Option<String>,

    /// HTTP request timeout in seconds (no timeout when unset)
    #[arg(long, env = "KEYSTONE_REQUEST_TIMEOUT_SECONDS", global = true)]
    request_timeout_seconds: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the metric types the collector can produce
    MetricTypes,

    /// Collect metric values (all available metrics when none are given)
    Collect {
        /// Namespaces such as /intel/openstack/keystone/total_users_count
        namespaces: Vec<String>,
    },

    /// Print plugin metadata and configuration policy
    Meta,
}

#[derive(Serialize)]
struct MetaOutput {
    meta: keystone_collector::metrics::PluginMeta,
    config_policy: keystone_collector::metrics::ConfigPolicy,
}

impl Args {
    fn config_map(&self) -> anyhow::Result<ConfigMap> {
        let mut cfg = match &self.config {
            Some(path) => ConfigMap::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ConfigMap::new(),
        };

        let overrides = [
            (ADMIN_ENDPOINT, &self.admin_endpoint),
            (ADMIN_USER, &self.admin_user),
            (ADMIN_PASSWORD, &self.admin_password),
            (ADMIN_TENANT, &self.admin_tenant),
            (DOMAIN_NAME, &self.domain_name),
            (DOMAIN_ID, &self.domain_id),
        ];
        for (key, value) in overrides {
            if let Some(value) = value {
                cfg.insert(key, value.as_str());
            }
        }

        Ok(cfg)
    }

    fn client_options(&self) -> ClientOptions {
        ClientOptions {
            request_timeout: self.request_timeout_seconds.map(Duration::from_secs),
            ..ClientOptions::default()
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);

    match &args.command {
        Command::Meta => print_json(&MetaOutput {
            meta: meta(),
            config_policy: config_policy(),
        }),
        Command::MetricTypes => {
            let cfg = args.config_map()?;
            let mut collector = new_collector(&args)?;

            let metric_types = collector
                .get_metric_types(&cfg)
                .await
                .context("listing metric types")?;
            print_json(&metric_types)
        }
        Command::Collect { namespaces } => {
            let cfg = args.config_map()?;
            let mut collector = new_collector(&args)?;

            let requested = if namespaces.is_empty() {
                collector
                    .get_metric_types(&cfg)
                    .await
                    .context("listing metric types")?
            } else {
                namespaces
                    .iter()
                    .map(|ns| {
                        ns.parse::<Namespace>()
                            .map(|namespace| MetricType::new(namespace, cfg.clone()))
                    })
                    .collect::<keystone_collector::Result<Vec<_>>>()?
            };

            let metrics = collector
                .collect_metrics(&requested)
                .await
                .context("collecting metrics")?;
            info!("Collected {} metrics", metrics.len());
            print_json(&metrics)
        }
    }
}

fn new_collector(args: &Args) -> anyhow::Result<Collector> {
    let collector =
        Collector::keystone(args.client_options()).context("creating Keystone collector")?;
    info!("Starting Keystone collector on {}", collector.host());
    Ok(collector)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "reqwest=warn", "rustls=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

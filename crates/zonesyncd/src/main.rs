//! # zonesyncd - zone sync daemon
//!
//! Thin integration layer: parses flags/environment, wires an IP source and
//! the Cloudflare provider into a `Reconciler`, and maps the outcome to an
//! exit code. All reconciliation logic lives in zonesync-core.
//!
//! ## Configuration
//!
//! Every flag has an environment fallback:
//!
//! - `CLOUDFLARE_API_TOKEN` (required): API token with Zone:DNS:Edit
//! - `ZONE_ID` (required): zone to reconcile
//! - `RECORD_NAMES`: comma-separated record names to manage (empty = all)
//! - `PRINT_RECORDS`: list the zone's records and exit
//! - `DEBUG`: debug logging
//! - `SYNC_INTERVAL_SECS`: seconds between cycles (default 1800)
//! - `IP_SOURCE`: `dig` (default) or `http`
//! - `DIG_BIND_ADDRESS`: local address for dig's `-b`
//! - `IP_HTTP_URL`: service for the http source (default <https://api.ipify.org>)
//! - `ISOLATE_FAILURES`: keep going after a failed update
//! - `VERIFY_UPDATES`: fail updates the API reports as unsuccessful
//! - `DRY_RUN`: log updates instead of sending them
//! - `CLOUDFLARE_API_BASE`: override the API base URL
//!
//! ## Example
//!
//! ```bash
//! export CLOUDFLARE_API_TOKEN=your_token
//! export ZONE_ID=023e105f4ecef8ad9ca31a8372d0c353
//! export RECORD_NAMES=home.example.com,vpn.example.com
//!
//! zonesyncd
//! ```

use anyhow::{Context, Result};
use clap::builder::FalseyValueParser;
use clap::{Parser, ValueEnum};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;
use zonesync_cloudflare::CloudflareProvider;
use zonesync_core::config::{CLOUDFLARE_API_BASE, DEFAULT_INTERVAL};
use zonesync_core::{
    DnsProvider, DnsRecord, EngineEvent, FailureMode, IpDiscovery, ProviderConfig, Reconciler,
    ReconcilerConfig, SelectionPolicy,
};

/// Exit codes
///
/// - 0: Clean shutdown, or record listing printed
/// - 1: Any fatal error (configuration, startup, or a failed cycle)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZonesyncExitCode {
    CleanShutdown = 0,
    Fatal = 1,
}

impl From<ZonesyncExitCode> for ExitCode {
    fn from(code: ZonesyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum IpSourceKind {
    /// `dig +short myip.opendns.com @resolver1.opendns.com`
    Dig,
    /// Plain-text HTTP "what is my IP" service
    Http,
}

/// Keep a Cloudflare zone's A records pointed at this host's public IP
#[derive(Debug, Parser)]
#[command(name = "zonesyncd", version, about)]
struct Args {
    /// Cloudflare API token
    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Zone to reconcile
    #[arg(long, env = "ZONE_ID")]
    zone_id: Option<String>,

    /// Comma-separated record names to manage; empty manages every A record
    #[arg(long, env = "RECORD_NAMES", default_value = "")]
    records: String,

    /// Print the zone's records and exit
    #[arg(long, env = "PRINT_RECORDS", value_parser = FalseyValueParser::new())]
    print_records: bool,

    /// Debug logging
    #[arg(long, env = "DEBUG", value_parser = FalseyValueParser::new())]
    debug: bool,

    /// Seconds between reconciliation cycles
    #[arg(long, env = "SYNC_INTERVAL_SECS", default_value_t = DEFAULT_INTERVAL.as_secs())]
    interval_secs: u64,

    /// How to discover the public IP
    #[arg(long, env = "IP_SOURCE", value_enum, default_value_t = IpSourceKind::Dig)]
    ip_source: IpSourceKind,

    /// Local address dig sends its query from
    #[arg(long, env = "DIG_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// URL of the HTTP IP service
    #[arg(long, env = "IP_HTTP_URL", default_value = "https://api.ipify.org")]
    ip_url: String,

    /// Keep processing remaining records after a failed update
    #[arg(long, env = "ISOLATE_FAILURES", value_parser = FalseyValueParser::new())]
    isolate_failures: bool,

    /// Treat updates the API reports as unsuccessful as failures
    #[arg(long, env = "VERIFY_UPDATES", value_parser = FalseyValueParser::new())]
    verify_updates: bool,

    /// Log updates instead of sending them
    #[arg(long, env = "DRY_RUN", value_parser = FalseyValueParser::new())]
    dry_run: bool,

    /// Cloudflare API base URL
    #[arg(long, env = "CLOUDFLARE_API_BASE", default_value = CLOUDFLARE_API_BASE)]
    api_base: String,
}

/// Validated daemon settings
#[derive(Debug)]
struct Settings {
    provider: ProviderConfig,
    reconciler: ReconcilerConfig,
    ip_source: IpSourceKind,
    bind_address: Option<String>,
    ip_url: String,
    print_records: bool,
}

fn required(value: Option<String>, flag: &str, env: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => anyhow::bail!("{} is required. Set it via --{} or {}", env, flag, env),
    }
}

impl Args {
    /// Check required values and build the library configuration
    fn into_settings(self) -> Result<Settings> {
        let api_token = required(self.api_token, "api-token", "CLOUDFLARE_API_TOKEN")?;
        let zone_id = required(self.zone_id, "zone-id", "ZONE_ID")?;

        let provider = ProviderConfig::Cloudflare {
            api_token,
            api_base: self.api_base,
            verify_updates: self.verify_updates,
            dry_run: self.dry_run,
        };
        provider.validate()?;

        let failure_mode = if self.isolate_failures {
            FailureMode::Isolated
        } else {
            FailureMode::Strict
        };

        let reconciler = ReconcilerConfig::new(zone_id)
            .with_selection(SelectionPolicy::parse(&self.records))
            .with_interval(Duration::from_secs(self.interval_secs))
            .with_failure_mode(failure_mode);
        reconciler.validate()?;

        Ok(Settings {
            provider,
            reconciler,
            ip_source: self.ip_source,
            bind_address: self.bind_address.filter(|b| !b.trim().is_empty()),
            ip_url: self.ip_url,
            print_records: self.print_records,
        })
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ZonesyncExitCode::Fatal.into()
            } else {
                ZonesyncExitCode::CleanShutdown.into()
            };
        }
    };

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ZonesyncExitCode::Fatal.into();
    }

    let settings = match args.into_settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return ZonesyncExitCode::Fatal.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ZonesyncExitCode::Fatal.into();
        }
    };

    let code = rt.block_on(async {
        match run_daemon(settings).await {
            Ok(()) => ZonesyncExitCode::CleanShutdown,
            Err(e) => {
                error!("{:#}", e);
                ZonesyncExitCode::Fatal
            }
        }
    });

    code.into()
}

async fn run_daemon(settings: Settings) -> Result<()> {
    let provider = CloudflareProvider::from_config(&settings.provider)?;

    if settings.print_records {
        return print_records(&provider, &settings.reconciler).await;
    }

    let ip_source = build_ip_source(&settings)?;
    info!(
        "Starting zonesyncd for zone {} (ip source: {:?}, interval: {:?}, failure mode: {:?})",
        settings.reconciler.zone_id,
        settings.ip_source,
        settings.reconciler.interval,
        settings.reconciler.failure_mode
    );

    let (reconciler, events) =
        Reconciler::new(ip_source, Box::new(provider), settings.reconciler)?;
    tokio::spawn(log_events(events));

    reconciler.run().await?;
    Ok(())
}

fn build_ip_source(settings: &Settings) -> Result<Box<dyn IpDiscovery>> {
    match settings.ip_source {
        #[cfg(feature = "dig")]
        IpSourceKind::Dig => {
            let mut source = zonesync_ip_dig::DigIpSource::new();
            if let Some(bind) = &settings.bind_address {
                source = source.with_bind_address(bind.clone());
            }
            Ok(Box::new(source))
        }
        #[cfg(feature = "http")]
        IpSourceKind::Http => Ok(Box::new(zonesync_ip_http::HttpIpSource::new(
            settings.ip_url.clone(),
        )?)),
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("IP source {:?} is not compiled into this build", other),
    }
}

/// One listing line: `id name type content ttl proxied`, `*` when selected
fn format_record(record: &DnsRecord, selection: &SelectionPolicy) -> String {
    let marker = if selection.contains(record.name()) { "*" } else { " " };
    format!(
        "{} {} {} {} {} {} {}",
        marker,
        record.id,
        record.name(),
        record.record_type(),
        record.content().unwrap_or("-"),
        record.body.ttl,
        record.body.proxied.unwrap_or(false)
    )
}

async fn print_records(provider: &dyn DnsProvider, config: &ReconcilerConfig) -> Result<()> {
    let records = provider
        .list_records(&config.zone_id)
        .await
        .with_context(|| format!("listing records of zone {}", config.zone_id))?;

    for record in &records {
        println!("{}", format_record(record, &config.selection));
    }
    Ok(())
}

async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        debug!("Engine event: {:?}", event);
    }
}

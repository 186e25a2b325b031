//! Reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Finding the current public IP via IpDiscovery
//! - Listing the zone's records via DnsProvider
//! - Deciding which records have drifted
//! - Rewriting the content of drifted records
//! - Repeating that pass on a fixed interval until shutdown
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   current IP   ┌──────────────┐   list / update   ┌─────────────┐
//! │ IpDiscovery │ ─────────────▶ │  Reconciler  │ ◀───────────────▶ │ DnsProvider │
//! └─────────────┘                └──────────────┘                   └─────────────┘
//!                                        │
//!                                        ▼
//!                                ┌──────────────┐
//!                                │    Events    │
//!                                │   (notify)   │
//!                                └──────────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Discover the current IP
//! 2. List the zone's records (fresh every cycle, ids are never cached)
//! 3. For each record, in list order: skip unselected names, skip types
//!    outside the managed family, skip records already holding the IP
//! 4. Update every remaining record with `content` set to the IP
//!
//! Any failure in steps 1 or 2 aborts the cycle. A failed update aborts the
//! rest of the cycle in [`FailureMode::Strict`] and is recorded in the
//! [`CycleReport`] in [`FailureMode::Isolated`].
//!
//! ## Scheduling
//!
//! [`Reconciler::run_until`] probes the zone once (an empty zone is fatal),
//! runs a cycle immediately, then waits for whichever comes first: the
//! interval elapsing or the shutdown future resolving. Shutdown is only
//! observed between cycles; a cycle in flight always runs to completion.

use crate::config::{FailureMode, ReconcilerConfig};
use crate::error::{Error, Result};
use crate::record::DnsRecord;
use crate::selection::SelectionPolicy;
use crate::traits::{DnsProvider, IpDiscovery, IpVersion};
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Startup probe succeeded
    Started {
        records_count: usize,
    },

    /// A cycle obtained the current IP
    CycleStarted {
        ip: String,
    },

    /// Record already holds the current IP
    RecordInSync {
        name: String,
        content: String,
    },

    /// Record content was rewritten
    RecordUpdated {
        id: String,
        name: String,
        previous: Option<String>,
        current: String,
    },

    /// Record update failed
    RecordUpdateFailed {
        id: String,
        name: String,
        error: String,
    },

    /// Cycle finished without a fatal error
    CycleCompleted {
        updated: usize,
        failed: usize,
    },

    /// Scheduler stopped
    Stopped {
        reason: String,
    },
}

/// What a cycle decided for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Name not in the selection policy
    NotSelected,
    /// Type is not the managed address family's type
    UnmanagedType,
    /// Content already equals the current IP
    InSync,
    /// Content differs from the current IP; update it
    Drifted,
}

/// Decide what to do with a record given the current IP
///
/// Checks run in a fixed order: selection, then type, then content.
pub fn decide(
    record: &DnsRecord,
    ip: &str,
    selection: &SelectionPolicy,
    family: IpVersion,
) -> Decision {
    if !selection.contains(record.name()) {
        return Decision::NotSelected;
    }
    if !record.record_type().eq_ignore_ascii_case(family.record_type()) {
        return Decision::UnmanagedType;
    }
    if record.content() == Some(ip) {
        return Decision::InSync;
    }
    Decision::Drifted
}

/// A successful record update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordChange {
    pub id: String,
    pub name: String,
    pub previous: Option<String>,
    pub current: String,
}

/// A failed record update (isolated mode only)
#[derive(Debug)]
pub struct RecordFailure {
    pub id: String,
    pub name: String,
    pub error: Error,
}

/// Outcome of one reconciliation cycle
#[derive(Debug, Default)]
pub struct CycleReport {
    /// IP the cycle reconciled against
    pub ip: String,
    /// Records returned by the provider
    pub examined: usize,
    /// Records skipped by selection or type
    pub skipped: usize,
    /// Records already holding the IP
    pub in_sync: usize,
    pub updated: Vec<RecordChange>,
    pub failures: Vec<RecordFailure>,
}

impl CycleReport {
    fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            ..Self::default()
        }
    }

    /// Whether every drifted record was updated
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Core reconciliation engine
///
/// Owns one IP source, one provider and the immutable configuration. All work
/// happens on the caller's task: cycles never overlap and updates within a
/// cycle are issued one at a time in list order.
pub struct Reconciler {
    /// IP discovery source
    ip_source: Box<dyn IpDiscovery>,

    /// DNS provider for listing and updating records
    provider: Box<dyn DnsProvider>,

    config: ReconcilerConfig,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver). Dropping the receiver is fine;
    /// events are then discarded.
    pub fn new(
        ip_source: Box<dyn IpDiscovery>,
        provider: Box<dyn DnsProvider>,
        config: ReconcilerConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        if let Some(family) = ip_source.family()
            && family != config.family
        {
            return Err(Error::config(format!(
                "IP source reports {} addresses but {} records are managed",
                family,
                config.family.record_type()
            )));
        }

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let reconciler = Self {
            ip_source,
            provider,
            config,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Decide what a cycle would do with `record` for `ip`
    pub fn evaluate(&self, record: &DnsRecord, ip: &str) -> Decision {
        decide(record, ip, &self.config.selection, self.config.family)
    }

    /// List the configured zone's records
    pub async fn fetch_records(&self) -> Result<Vec<DnsRecord>> {
        self.provider.list_records(&self.config.zone_id).await
    }

    /// Startup probe: the zone must hold at least one record
    ///
    /// # Returns
    ///
    /// The number of records found.
    pub async fn ensure_records(&self) -> Result<usize> {
        let records = self.fetch_records().await?;
        if records.is_empty() {
            return Err(Error::no_records(&self.config.zone_id));
        }
        Ok(records.len())
    }

    /// Run one reconciliation cycle
    ///
    /// # Returns
    ///
    /// - `Ok(CycleReport)`: The cycle ran to the end (in isolated mode the
    ///   report may still carry per-record failures)
    /// - `Err(Error)`: Discovery or list failed, or an update failed in
    ///   strict mode
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let ip = self.discover_ip().await?;
        info!("Current public IP: {}", ip);
        self.emit_event(EngineEvent::CycleStarted { ip: ip.clone() });

        let records = self.fetch_records().await?;
        let mut report = CycleReport::new(ip.as_str());
        report.examined = records.len();

        for record in &records {
            match self.evaluate(record, &ip) {
                Decision::NotSelected => {
                    debug!("Record `{}` is not selected, skipping", record.name());
                    report.skipped += 1;
                }
                Decision::UnmanagedType => {
                    debug!(
                        "Record `{}` has type {}, skipping",
                        record.name(),
                        record.record_type()
                    );
                    report.skipped += 1;
                }
                Decision::InSync => {
                    debug!(
                        "IP hasn't changed for `{}`, no update needed: {}",
                        record.name(),
                        ip
                    );
                    report.in_sync += 1;
                    self.emit_event(EngineEvent::RecordInSync {
                        name: record.name().to_string(),
                        content: ip.clone(),
                    });
                }
                Decision::Drifted => {
                    if let Err(e) = self.update(record, &ip, &mut report).await {
                        self.emit_event(EngineEvent::RecordUpdateFailed {
                            id: record.id.clone(),
                            name: record.name().to_string(),
                            error: e.to_string(),
                        });

                        match self.config.failure_mode {
                            FailureMode::Strict => return Err(e),
                            FailureMode::Isolated => {
                                warn!("Failed to update `{}`: {}", record.name(), e);
                                report.failures.push(RecordFailure {
                                    id: record.id.clone(),
                                    name: record.name().to_string(),
                                    error: e,
                                });
                            }
                        }
                    }
                }
            }
        }

        self.emit_event(EngineEvent::CycleCompleted {
            updated: report.updated.len(),
            failed: report.failures.len(),
        });
        info!(
            "Cycle complete: {} record(s), {} updated, {} in sync, {} skipped, {} failed",
            report.examined,
            report.updated.len(),
            report.in_sync,
            report.skipped,
            report.failures.len()
        );

        Ok(report)
    }

    /// Run until the process receives SIGINT/SIGTERM
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Fatal error
    ///
    /// Signal handlers are installed before the startup probe, so a signal
    /// arriving during the first cycle is honoured once that cycle finishes.
    pub async fn run(&self) -> Result<()> {
        let shutdown = shutdown_signal();
        self.run_until(shutdown).await
    }

    /// Run until `shutdown` resolves or a fatal error occurs
    ///
    /// `shutdown` is only polled while waiting for the next cycle.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let result = self.schedule(shutdown).await;

        let reason = match &result {
            Ok(()) => "Shutdown signal".to_string(),
            Err(e) => e.to_string(),
        };
        self.emit_event(EngineEvent::Stopped { reason });

        result
    }

    async fn schedule<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let records_count = self.ensure_records().await?;
        self.emit_event(EngineEvent::Started { records_count });
        info!(
            "Starting to monitor IP address for zone {} ({} record(s), selection: {})",
            self.config.zone_id, records_count, self.config.selection
        );

        self.run_cycle().await?;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutting down...");
                    return Ok(());
                }

                _ = tokio::time::sleep(self.config.interval) => {
                    self.run_cycle().await?;
                }
            }
        }
    }

    async fn discover_ip(&self) -> Result<String> {
        let ip = self.ip_source.current().await.map_err(|e| match e {
            Error::Discovery(_) => e,
            other => Error::discovery(other.to_string()),
        })?;

        let ip = ip.trim();
        if ip.is_empty() {
            return Err(Error::discovery("IP discovery returned an empty address"));
        }
        Ok(ip.to_string())
    }

    async fn update(&self, record: &DnsRecord, ip: &str, report: &mut CycleReport) -> Result<()> {
        let previous = record.content().map(str::to_string);
        info!(
            "IP changed for `{}` from {} to {}, updating DNS record",
            record.name(),
            previous.as_deref().unwrap_or("<none>"),
            ip
        );

        let body = record.with_content(ip);
        self.provider
            .update_record(&self.config.zone_id, &record.id, &body)
            .await?;

        let change = RecordChange {
            id: record.id.clone(),
            name: record.name().to_string(),
            previous,
            current: ip.to_string(),
        };
        self.emit_event(EngineEvent::RecordUpdated {
            id: change.id.clone(),
            name: change.name.clone(),
            previous: change.previous.clone(),
            current: change.current.clone(),
        });
        report.updated.push(change);
        Ok(())
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // A closed channel just means nobody is listening
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

/// Install SIGINT/SIGTERM handlers now and return a future resolving on the
/// first signal (Ctrl-C elsewhere)
///
/// Handlers must be in place before the startup cycle, otherwise the default
/// action still terminates the process mid-cycle.
fn shutdown_signal() -> impl Future<Output = ()> + Send + 'static {
    #[cfg(unix)]
    let handlers = {
        use tokio::signal::unix::{SignalKind, signal};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(sigterm), Ok(sigint)) => Some((sigterm, sigint)),
            _ => {
                warn!("Failed to install SIGTERM/SIGINT handlers, falling back to Ctrl-C");
                None
            }
        }
    };

    async move {
        #[cfg(unix)]
        if let Some((mut sigterm, mut sigint)) = handlers {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM"),
                _ = sigint.recv() => info!("Received SIGINT"),
            }
            return;
        }

        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to wait for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

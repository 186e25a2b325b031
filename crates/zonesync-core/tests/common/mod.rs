//! Test doubles and common utilities for reconciler contract tests
//!
//! The doubles record every call so tests can assert on exactly which
//! updates were issued, and in what order relative to discovery and listing.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use zonesync_core::engine::EngineEvent;
use zonesync_core::error::{Error, Result};
use zonesync_core::record::{DnsRecord, RecordBody};
use zonesync_core::traits::{DnsProvider, IpDiscovery};
use zonesync_core::{Reconciler, ReconcilerConfig};

pub const ZONE: &str = "zone-1";

/// Shared, ordered log of collaborator calls
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// State behind a [`ScriptedIpSource`], kept by the test to steer it
#[derive(Default)]
pub struct IpState {
    /// `None` makes the next lookups fail
    ip: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl IpState {
    pub fn set(&self, ip: &str) {
        *self.ip.lock().unwrap() = Some(ip.to_string());
    }

    pub fn fail(&self) {
        *self.ip.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// An IP source returning whatever the test last set
pub struct ScriptedIpSource {
    state: Arc<IpState>,
    log: CallLog,
}

impl ScriptedIpSource {
    pub fn new(ip: &str) -> Self {
        let source = Self::failing();
        source.state.set(ip);
        source
    }

    pub fn failing() -> Self {
        Self {
            state: Arc::new(IpState::default()),
            log: CallLog::default(),
        }
    }

    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = log.clone();
        self
    }

    pub fn state(&self) -> Arc<IpState> {
        Arc::clone(&self.state)
    }
}

#[async_trait::async_trait]
impl IpDiscovery for ScriptedIpSource {
    async fn current(&self) -> Result<String> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        self.log.push("discover");
        self.state
            .ip
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::discovery("dig: connection timed out; no servers could be reached"))
    }
}

/// One update call as seen by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCall {
    pub zone_id: String,
    pub record_id: String,
    pub body: RecordBody,
}

/// State behind a [`MockDnsProvider`]
#[derive(Default)]
pub struct ProviderState {
    records: Mutex<Vec<DnsRecord>>,
    list_error: Mutex<Option<String>>,
    failing_ids: Mutex<HashSet<String>>,
    updates: Mutex<Vec<UpdateCall>>,
    list_calls: AtomicUsize,
    update_delay: Mutex<Option<Duration>>,
}

impl ProviderState {
    pub fn set_records(&self, records: Vec<DnsRecord>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Make list calls fail with provider-reported messages
    pub fn fail_list(&self, message: &str) {
        *self.list_error.lock().unwrap() = Some(message.to_string());
    }

    /// Make updates of one record id fail
    pub fn fail_update(&self, record_id: &str) {
        self.failing_ids.lock().unwrap().insert(record_id.to_string());
    }

    pub fn delay_updates(&self, delay: Duration) {
        *self.update_delay.lock().unwrap() = Some(delay);
    }

    pub fn updates(&self) -> Vec<UpdateCall> {
        self.updates.lock().unwrap().clone()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

/// A provider holding an in-memory zone
///
/// Successful updates are applied to the stored records, like the real
/// provider would, so consecutive cycles see the new content.
pub struct MockDnsProvider {
    state: Arc<ProviderState>,
    log: CallLog,
}

impl MockDnsProvider {
    pub fn new(records: Vec<DnsRecord>) -> Self {
        let state = ProviderState::default();
        state.set_records(records);
        Self {
            state: Arc::new(state),
            log: CallLog::default(),
        }
    }

    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = log.clone();
        self
    }

    pub fn state(&self) -> Arc<ProviderState> {
        Arc::clone(&self.state)
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>> {
        self.state.list_calls.fetch_add(1, Ordering::SeqCst);
        self.log.push("list");
        assert_eq!(zone_id, ZONE, "list must target the configured zone");

        if let Some(message) = self.state.list_error.lock().unwrap().clone() {
            return Err(Error::provider("mock", message));
        }
        Ok(self.state.records())
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, record: &RecordBody) -> Result<()> {
        self.log.push(format!("update:{record_id}"));

        let delay = *self.state.update_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.state.updates.lock().unwrap().push(UpdateCall {
            zone_id: zone_id.to_string(),
            record_id: record_id.to_string(),
            body: record.clone(),
        });

        if self.state.failing_ids.lock().unwrap().contains(record_id) {
            return Err(Error::provider("mock", format!("failed to update record {record_id}")));
        }

        let mut records = self.state.records.lock().unwrap();
        if let Some(stored) = records.iter_mut().find(|r| r.id == record_id) {
            stored.body = record.clone();
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A record with every passthrough field populated
pub fn record(id: &str, name: &str, record_type: &str, content: &str) -> DnsRecord {
    let mut body = RecordBody::new(name, record_type, content);
    body.ttl = 300;
    body.proxied = Some(false);
    body.comment = Some(format!("managed {name}"));
    body.tags = vec!["env:home".to_string()];
    DnsRecord::new(id, body)
}

/// Configuration for the test zone with a short interval
pub fn config() -> ReconcilerConfig {
    ReconcilerConfig::new(ZONE).with_interval(Duration::from_millis(40))
}

pub fn reconciler(
    ip_source: ScriptedIpSource,
    provider: MockDnsProvider,
    config: ReconcilerConfig,
) -> (Reconciler, mpsc::Receiver<EngineEvent>) {
    Reconciler::new(Box::new(ip_source), Box::new(provider), config)
        .expect("reconciler construction succeeds")
}

/// Drain every event currently buffered
pub fn drain(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Poll `condition` until it holds, panicking after two seconds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached within 2s"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

//! Contract Test: Which Records Get Updated
//!
//! A record is updated iff its name is selected (or the policy is empty),
//! its type is the managed family's type, and its content differs from the
//! current IP. Everything else gets zero update calls.
//!
//! If this test fails, the reconciler is touching records it does not own or
//! missing drift it should correct.

mod common;

use common::*;
use zonesync_core::{FailureMode, IpVersion, SelectionPolicy};

#[tokio::test]
async fn single_drifted_record_is_updated_with_everything_else_unchanged() {
    let fetched = record("r1", "home.example.com", "A", "1.2.3.4");
    let provider = MockDnsProvider::new(vec![fetched.clone()]);
    let zone = provider.state();

    let config = config().with_selection(SelectionPolicy::parse("home.example.com"));
    let (reconciler, _rx) = reconciler(ScriptedIpSource::new("5.6.7.8"), provider, config);

    let report = reconciler.run_cycle().await.expect("cycle succeeds");

    let updates = zone.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].zone_id, ZONE);
    assert_eq!(updates[0].record_id, "r1");
    assert_eq!(updates[0].body.content.as_deref(), Some("5.6.7.8"));

    let mut expected = fetched.body.clone();
    expected.content = Some("5.6.7.8".to_string());
    assert_eq!(updates[0].body, expected, "only content may change");

    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.updated[0].previous.as_deref(), Some("1.2.3.4"));
    assert_eq!(report.updated[0].current, "5.6.7.8");
}

#[tokio::test]
async fn matching_content_issues_no_update() {
    let provider = MockDnsProvider::new(vec![record("r1", "home.example.com", "A", "1.2.3.4")]);
    let zone = provider.state();

    let config = config().with_selection(SelectionPolicy::parse("home.example.com"));
    let (reconciler, _rx) = reconciler(ScriptedIpSource::new("1.2.3.4"), provider, config);

    let report = reconciler.run_cycle().await.expect("cycle succeeds");

    assert_eq!(zone.update_count(), 0);
    assert_eq!(report.in_sync, 1);
}

#[tokio::test]
async fn unselected_name_issues_no_update() {
    let provider = MockDnsProvider::new(vec![record("r1", "home.example.com", "A", "1.2.3.4")]);
    let zone = provider.state();

    let config = config().with_selection(SelectionPolicy::parse("other.example.com"));
    let (reconciler, _rx) = reconciler(ScriptedIpSource::new("5.6.7.8"), provider, config);

    let report = reconciler.run_cycle().await.expect("cycle succeeds");

    assert_eq!(zone.update_count(), 0);
    assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn selection_matches_names_case_insensitively() {
    let provider = MockDnsProvider::new(vec![record("r1", "home.example.com", "A", "1.2.3.4")]);
    let zone = provider.state();

    let config = config().with_selection(SelectionPolicy::parse("Home.Example.Com"));
    let (reconciler, _rx) = reconciler(ScriptedIpSource::new("5.6.7.8"), provider, config);

    reconciler.run_cycle().await.expect("cycle succeeds");

    assert_eq!(zone.update_count(), 1);
}

#[tokio::test]
async fn update_iff_selected_managed_and_drifted() {
    let records = vec![
        record("a-sel-drift", "home.example.com", "A", "1.2.3.4"),
        record("a-sel-sync", "vpn.example.com", "A", "5.6.7.8"),
        record("a-unsel-drift", "printer.example.com", "A", "1.2.3.4"),
        record("cname-sel", "www.example.com", "CNAME", "home.example.com"),
        record("txt-sel", "home.example.com", "TXT", "v=spf1 -all"),
        record("aaaa-sel", "home.example.com", "AAAA", "2001:db8::1"),
        record("a-sel-drift-2", "www.example.com", "A", "9.9.9.9"),
    ];
    let provider = MockDnsProvider::new(records);
    let zone = provider.state();

    let config = config().with_selection(SelectionPolicy::parse(
        "home.example.com,vpn.example.com,www.example.com",
    ));
    let (reconciler, _rx) = reconciler(ScriptedIpSource::new("5.6.7.8"), provider, config);

    let report = reconciler.run_cycle().await.expect("cycle succeeds");

    let updated: Vec<String> = zone.updates().into_iter().map(|u| u.record_id).collect();
    assert_eq!(updated, vec!["a-sel-drift", "a-sel-drift-2"], "updates follow list order");
    assert_eq!(report.examined, 7);
    assert_eq!(report.in_sync, 1);
    assert_eq!(report.skipped, 4);
}

#[tokio::test]
async fn empty_policy_monitors_every_address_record() {
    let records = vec![
        record("r1", "home.example.com", "A", "1.2.3.4"),
        record("r2", "lab.example.org", "A", "1.2.3.4"),
        record("r3", "mail.example.com", "MX", "mx.example.com"),
    ];
    let provider = MockDnsProvider::new(records);
    let zone = provider.state();

    let (reconciler, _rx) = reconciler(ScriptedIpSource::new("5.6.7.8"), provider, config());

    reconciler.run_cycle().await.expect("cycle succeeds");

    let updated: Vec<String> = zone.updates().into_iter().map(|u| u.record_id).collect();
    assert_eq!(updated, vec!["r1", "r2"]);
}

#[tokio::test]
async fn v6_family_manages_aaaa_records_only() {
    let records = vec![
        record("r4", "home.example.com", "A", "1.2.3.4"),
        record("r6", "home.example.com", "AAAA", "2001:db8::1"),
    ];
    let provider = MockDnsProvider::new(records);
    let zone = provider.state();

    let config = config()
        .with_family(IpVersion::V6)
        .with_failure_mode(FailureMode::Strict);
    let (reconciler, _rx) = reconciler(ScriptedIpSource::new("2001:db8::2"), provider, config);

    reconciler.run_cycle().await.expect("cycle succeeds");

    let updates = zone.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].record_id, "r6");
    assert_eq!(updates[0].body.content.as_deref(), Some("2001:db8::2"));
}

#[tokio::test]
async fn discovered_ip_is_trimmed_before_comparison() {
    let provider = MockDnsProvider::new(vec![record("r1", "home.example.com", "A", "1.2.3.4")]);
    let zone = provider.state();

    let (reconciler, _rx) = reconciler(ScriptedIpSource::new(" 1.2.3.4\n"), provider, config());

    let report = reconciler.run_cycle().await.expect("cycle succeeds");

    assert_eq!(report.ip, "1.2.3.4");
    assert_eq!(zone.update_count(), 0);
}

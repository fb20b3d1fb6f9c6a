//! Transfer pipeline integration tests
//!
//! Drives the configuration → policy/backoff → orchestrator chain the way
//! a gateway deployment would, over simulated channels. The central
//! contract under test: no record is ever silently dropped - every
//! processed record shows up in the report with a definite outcome.

use mdg_common::config::GatewayConfig;
use mdg_common::{ImageGrid, Record, TagValue};
use mdg_tx::{
    AbandonReason, BackoffConfig, BatchOrchestrator, FlakyChannel, SanitizationPolicy,
    ScriptedChannel, SendOutcome,
};
use tokio_util::sync::CancellationToken;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fleet_records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            Record::new(
                format!("scan-{:03}", i),
                format!("UNIT_{:02}", i % 3),
                ImageGrid::uniform(4, 4, 100 + i as i32),
            )
            .with_tag("PatientName", TagValue::text(format!("Patient^{}", i)))
            .with_tag("PatientID", TagValue::text(format!("{:05}", i)))
            .with_tag("Modality", TagValue::text("CT"))
        })
        .collect()
}

fn gateway_config() -> GatewayConfig {
    GatewayConfig::from_toml_str(
        r#"
        [transfer]
        max_attempts = 5
        base_delay_s = 1.0
        max_delay_s = 8.0

        [sanitization]
        station_name = "REMOTE_MOBILE_CLINIC_01"
        sensitive_fields = ["PatientName", "PatientID"]

        [sanitization.placeholder_values]
        PatientName = "ANONYMOUS"
        PatientID = "00000"
        "#,
    )
    .expect("valid test config")
}

#[tokio::test(start_paused = true)]
async fn test_flaky_link_drops_no_record() {
    init_tracing();
    let config = gateway_config();
    let records = fleet_records(8);

    let orchestrator = BatchOrchestrator::new(
        SanitizationPolicy::from_config(&config.sanitization),
        BackoffConfig::from_config(&config.transfer).unwrap(),
    );
    // Rural 4G model: 30% of sends drop
    let channel = FlakyChannel::new(0.3, 42);
    let report = orchestrator
        .run(&records, &channel, &CancellationToken::new())
        .await;

    // Every record accounted for, exactly once, in input order
    assert_eq!(report.total, 8);
    assert_eq!(report.delivered + report.abandoned, 8);
    let reported: Vec<&str> = report
        .outcomes
        .iter()
        .map(|o| o.record_id.as_str())
        .collect();
    let expected: Vec<String> = (0..8).map(|i| format!("scan-{:03}", i)).collect();
    assert_eq!(reported, expected.iter().map(String::as_str).collect::<Vec<_>>());

    // Attempt histories respect the budget and the backoff shape
    for outcome in &report.outcomes {
        let attempts = outcome.outcome.attempts();
        assert!(!attempts.is_empty());
        assert!(attempts.len() <= 5);
        assert_eq!(attempts[0].delay_before.as_secs(), 0);
        for attempt in &attempts[1..] {
            assert!(attempt.delay_before.as_secs() >= 1);
            assert!(attempt.delay_before.as_secs() <= 8);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_config_driven_run_with_scripted_link() {
    init_tracing();
    let config = gateway_config();
    let records = fleet_records(3);

    // scan-000 needs one retry, scan-001 is rejected outright,
    // scan-002 goes through clean
    let channel = ScriptedChannel::new([
        SendOutcome::TransientFailure,
        SendOutcome::Success,
        SendOutcome::PermanentFailure,
        SendOutcome::Success,
    ]);

    let orchestrator = BatchOrchestrator::new(
        SanitizationPolicy::from_config(&config.sanitization),
        BackoffConfig::from_config(&config.transfer).unwrap(),
    );
    let report = orchestrator
        .run(&records, &channel, &CancellationToken::new())
        .await;

    assert_eq!(report.delivered_ids(), vec!["scan-000", "scan-002"]);
    assert_eq!(
        report.outcomes[1].outcome.abandon_reason(),
        Some(AbandonReason::Permanent)
    );
    assert_eq!(report.total_attempts, 4);
}

#[tokio::test]
async fn test_delivered_records_carry_no_phi() {
    init_tracing();
    let config = gateway_config();
    let policy = SanitizationPolicy::from_config(&config.sanitization);

    for record in fleet_records(5) {
        let sanitized = mdg_tx::sanitize(&record, &policy).unwrap();
        assert_eq!(
            sanitized.record().tag("PatientName"),
            Some(&TagValue::text("ANONYMOUS"))
        );
        assert_eq!(
            sanitized.record().tag("PatientID"),
            Some(&TagValue::text("00000"))
        );
        assert_eq!(
            sanitized.record().tag("StationName"),
            Some(&TagValue::text("REMOTE_MOBILE_CLINIC_01"))
        );
        // Pixel data and non-identifying tags pass through untouched
        assert_eq!(sanitized.record().image, record.image);
        assert_eq!(sanitized.record().tag("Modality"), record.tag("Modality"));
    }
}

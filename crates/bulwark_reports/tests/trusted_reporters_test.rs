//! End-to-end tests for report-driven moderation.

use bulwark_interface::{ModerationCall, RecordingModerationClient, ReportEvent};
use bulwark_protection::{MemoryStore, ProtectionContext, ProtectionRegistry, SettingUpdate};
use bulwark_reports::TrustedReporters;
use std::sync::Arc;

const ROOM: &str = "!room:example.org";
const MGMT: &str = "!mgmt:example.org";
const AUTHOR: &str = "@spammer:example.org";

async fn setup(
    client: Arc<RecordingModerationClient>,
    settings: &[(&str, &str)],
) -> (ProtectionRegistry, ProtectionContext) {
    let mut registry = ProtectionRegistry::new(Arc::new(MemoryStore::new()));
    registry
        .register(Arc::new(TrustedReporters::new(20)))
        .unwrap();
    registry.enable(TrustedReporters::NAME).await.unwrap();
    for (name, value) in settings {
        registry
            .apply_setting_change(
                TrustedReporters::NAME,
                name,
                SettingUpdate::Parse(value.to_string()),
            )
            .await
            .unwrap();
    }
    (registry, ProtectionContext::new(client, MGMT))
}

fn report(message_id: &str, reporter: &str) -> ReportEvent {
    ReportEvent::new(message_id, reporter, ROOM, AUTHOR)
}

fn bans(client: &RecordingModerationClient) -> usize {
    client
        .calls()
        .iter()
        .filter(|call| matches!(call, ModerationCall::Ban { .. }))
        .count()
}

#[tokio::test]
async fn test_ban_fires_once_at_threshold() {
    let client = Arc::new(RecordingModerationClient::new());
    let (registry, context) = setup(
        client.clone(),
        &[
            ("mxids", "@a:x.org, @b:x.org, @c:x.org, @d:x.org"),
            ("action", "ban"),
            ("threshold", "3"),
        ],
    )
    .await;

    for reporter in ["@a:x.org", "@b:x.org"] {
        registry.handle_report(&context, &report("$m1", reporter)).await;
    }
    assert_eq!(bans(&client), 0);

    registry.handle_report(&context, &report("$m1", "@c:x.org")).await;
    assert_eq!(bans(&client), 1);
    assert!(client.calls().contains(&ModerationCall::Ban {
        room_id: ROOM.to_string(),
        user_id: AUTHOR.to_string(),
        reason: Some("reported by trusted users".to_string()),
    }));
    assert_eq!(
        client.notices(),
        vec![format!(
            "message $m1 in {} reported by @a:x.org, @b:x.org, @c:x.org. actions: ban",
            ROOM
        )]
    );

    registry.handle_report(&context, &report("$m1", "@d:x.org")).await;
    registry.handle_report(&context, &report("$m1", "@a:x.org")).await;
    assert_eq!(bans(&client), 1);
    assert_eq!(client.notices().len(), 1);
}

#[tokio::test]
async fn test_failed_ban_still_sends_notice() {
    let client = Arc::new(RecordingModerationClient::new());
    client.fail_on("ban");
    let (registry, context) = setup(
        client.clone(),
        &[("mxids", "@a:x.org"), ("action", "ban"), ("threshold", "1")],
    )
    .await;

    let delivery = registry.handle_report(&context, &report("$m1", "@a:x.org")).await;
    assert!(delivery.failed().is_empty());
    assert_eq!(bans(&client), 1);

    let notices = client.notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].contains("ban (failed: Permission denied: ban refused)"));
}

#[tokio::test]
async fn test_untrusted_reports_are_ignored() {
    let client = Arc::new(RecordingModerationClient::new());
    let (registry, context) = setup(
        client.clone(),
        &[("mxids", "@a:x.org"), ("threshold", "1")],
    )
    .await;

    registry.handle_report(&context, &report("$m1", "@z:x.org")).await;
    assert!(client.calls().is_empty());

    let protection = registry.get(TrustedReporters::NAME).unwrap();
    assert_eq!(protection.name(), "TrustedReporters");
}

#[tokio::test]
async fn test_per_kind_thresholds_escalate() {
    let client = Arc::new(RecordingModerationClient::new());
    let (registry, context) = setup(
        client.clone(),
        &[
            ("mxids", "@a:x.org, @b:x.org"),
            ("alertThreshold", "1"),
            ("redactThreshold", "2"),
            ("threshold", "-1"),
        ],
    )
    .await;

    registry.handle_report(&context, &report("$m1", "@a:x.org")).await;
    registry.handle_report(&context, &report("$m1", "@b:x.org")).await;

    let calls = client.calls();
    assert!(calls.contains(&ModerationCall::Redact {
        room_id: ROOM.to_string(),
        message_id: "$m1".to_string(),
    }));
    let notices = client.notices();
    assert_eq!(notices.len(), 2);
    assert!(notices[0].ends_with("actions: alert"));
    assert!(notices[1].ends_with("actions: redact"));
}

#[tokio::test]
async fn test_disabled_protection_sees_nothing() {
    let client = Arc::new(RecordingModerationClient::new());
    let (registry, context) = setup(
        client.clone(),
        &[("mxids", "@a:x.org"), ("threshold", "1")],
    )
    .await;
    registry.disable(TrustedReporters::NAME).await.unwrap();

    let delivery = registry.handle_report(&context, &report("$m1", "@a:x.org")).await;
    assert!(delivery.handled().is_empty());
    assert!(client.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_reports_ban_once() {
    let client = Arc::new(RecordingModerationClient::new());
    let reporters: Vec<String> = (0..50).map(|i| format!("@r{}:x.org", i)).collect();
    let mxids = reporters.join(", ");
    let (registry, context) = setup(
        client.clone(),
        &[
            ("mxids", mxids.as_str()),
            ("action", "ban"),
            ("threshold", "3"),
        ],
    )
    .await;
    let registry = Arc::new(registry);

    let mut tasks = tokio::task::JoinSet::new();
    for reporter in reporters {
        let (registry, context) = (Arc::clone(&registry), context.clone());
        tasks.spawn(async move {
            registry
                .handle_report(&context, &report("$m1", &reporter))
                .await;
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }

    assert_eq!(bans(&client), 1);
    assert_eq!(client.notices().len(), 1);
}

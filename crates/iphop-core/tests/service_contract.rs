//! Contract Test: Caller-Facing Operations
//!
//! Constraints verified:
//! - schedule_upsert persists valid expressions and arms exactly one timer
//! - schedule_upsert with no expression clears storage and the timer
//! - Deleting a domain or provider cancels timers and cascades history
//! - Manual triggers skip the change gate
//!
//! If this test fails, the API surface disagrees with the scheduler state.

mod common;

use common::*;
use iphop_core::model::{Credentials, NewDomain, ProviderKind};
use iphop_core::traits::Store;
use iphop_core::{AesGcmVault, Error, IpHop, MemoryStore, UpdateOrchestrator};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn schedule_upsert_sets_and_clears() {
    let h = Harness::new(ip("1.2.3.4"), MockOutcome::Accept);
    let domain = h.seeded().await;
    let iphop = IpHop::new(h.orchestrator.clone());

    assert!(iphop.schedule_upsert(domain.id, Some("*/5 * * * *")).await.unwrap());
    assert!(iphop.schedule_upsert(domain.id, Some(" 0 * * * * ")).await.unwrap());
    assert_eq!(iphop.scheduler().active_count(), 1);
    assert_eq!(
        h.domain(&domain).await.cron_schedule.as_deref(),
        Some("0 * * * *")
    );

    assert!(iphop.schedule_upsert(domain.id, None).await.unwrap());
    assert_eq!(iphop.scheduler().active_count(), 0);
    assert_eq!(h.domain(&domain).await.cron_schedule, None);

    // Nothing left to cancel
    assert!(!iphop.schedule_upsert(domain.id, Some("")).await.unwrap());
}

#[tokio::test]
async fn schedule_upsert_rejects_invalid_without_storing() {
    let h = Harness::new(ip("1.2.3.4"), MockOutcome::Accept);
    let domain = h.seeded().await;
    let iphop = IpHop::new(h.orchestrator.clone());

    assert!(!iphop.schedule_upsert(domain.id, Some("whenever")).await.unwrap());
    assert_eq!(h.domain(&domain).await.cron_schedule, None);
    assert!(!iphop.scheduler().is_scheduled(domain.id));

    let err = iphop.schedule_upsert(999, Some("*/5 * * * *")).await.unwrap_err();
    assert!(matches!(err, Error::DomainNotFound(999)));
}

#[tokio::test]
async fn schedule_remove_keeps_stored_expression() {
    let h = Harness::new(ip("1.2.3.4"), MockOutcome::Accept);
    let domain = h.seeded().await;
    let iphop = IpHop::new(h.orchestrator.clone());

    iphop.schedule_upsert(domain.id, Some("*/5 * * * *")).await.unwrap();
    assert!(iphop.schedule_remove(domain.id));
    assert!(!iphop.schedule_remove(domain.id));
    assert_eq!(
        h.domain(&domain).await.cron_schedule.as_deref(),
        Some("*/5 * * * *")
    );

    // A reload re-arms it
    assert_eq!(iphop.scheduler_load_all().await.unwrap(), 1);
    iphop.scheduler_shutdown().await;
}

#[tokio::test]
async fn delete_domain_cancels_timer_and_history() {
    let h = Harness::new(ip("1.2.3.4"), MockOutcome::Accept);
    let domain = h.seeded().await;
    let iphop = IpHop::new(h.orchestrator.clone());

    iphop.schedule_upsert(domain.id, Some("*/5 * * * *")).await.unwrap();
    iphop.trigger_manual_update(domain.id).await.unwrap();
    assert_eq!(iphop.domain_history(domain.id, None).await.unwrap().len(), 1);

    assert!(iphop.delete_domain(domain.id).await.unwrap());
    assert!(!iphop.scheduler().is_scheduled(domain.id));
    assert!(iphop.domain_history(domain.id, None).await.unwrap().is_empty());
    assert!(!iphop.delete_domain(domain.id).await.unwrap());
}

#[tokio::test]
async fn delete_provider_cancels_owned_timers() {
    let h = Harness::new(ip("1.2.3.4"), MockOutcome::Accept);
    let provider = h.add_provider("home", "duckdns", true).await;
    let other = h.add_provider("work", "duckdns", true).await;
    let a = h.add_domain(&provider, "a.duckdns.org").await;
    let b = h.add_domain(&other, "b.duckdns.org").await;
    let iphop = IpHop::new(h.orchestrator.clone());
    iphop.schedule_upsert(a.id, Some("*/5 * * * *")).await.unwrap();
    iphop.schedule_upsert(b.id, Some("*/5 * * * *")).await.unwrap();

    assert!(iphop.delete_provider(provider.id).await.unwrap());
    assert!(!iphop.scheduler().is_scheduled(a.id));
    assert!(iphop.scheduler().is_scheduled(b.id));
    assert!(h.store.get_domain(a.id).await.unwrap().is_none());

    iphop.scheduler_shutdown().await;
}

#[tokio::test]
async fn manual_trigger_ignores_change_gate() {
    let h = Harness::new(ip("1.2.3.4"), MockOutcome::Accept);
    let domain = h.seeded().await;
    let iphop = IpHop::new(h.orchestrator.clone());

    assert!(iphop.trigger_manual_update(domain.id).await.unwrap());
    assert!(iphop.trigger_manual_update(domain.id).await.unwrap());
    assert_eq!(h.provider.update_call_count(), 2);
}

#[tokio::test]
async fn create_domain_validates_and_arms_schedule() {
    let h = Harness::new(ip("1.2.3.4"), MockOutcome::Accept);
    let provider = h.add_provider("home", "duckdns", true).await;
    let iphop = IpHop::new(h.orchestrator.clone());

    let err = iphop
        .create_domain(NewDomain {
            provider_id: provider.id,
            domain_name: "x.duckdns.org".into(),
            cron_schedule: Some("nope".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidCron { .. }));
    assert!(h.store.list_domains().await.unwrap().is_empty());

    let created = assert_ok!(
        iphop
            .create_domain(NewDomain {
                provider_id: provider.id,
                domain_name: "x.duckdns.org".into(),
                cron_schedule: Some("*/10 * * * *".into()),
                ..Default::default()
            })
            .await
    );
    assert!(iphop.scheduler().is_scheduled(created.id));

    iphop.scheduler_shutdown().await;
}

#[tokio::test]
async fn providers_created_through_the_facade_are_sealed() {
    let key = AesGcmVault::generate_key();
    let store = Arc::new(MemoryStore::new());
    let provider = MockProvider::new(MockOutcome::Accept);
    let orchestrator = Arc::new(UpdateOrchestrator::new(
        store.clone(),
        Arc::new(MockResolver::returning(ip("4.4.4.4"))),
        Arc::new(MockFactory::new(&provider)),
        Arc::new(AesGcmVault::from_base64(&key).unwrap()),
    ));
    let iphop = IpHop::new(orchestrator);

    let credentials = Credentials::new()
        .with("username", "alice")
        .with("password", "hunter2");
    let created = iphop
        .create_provider("noip-home", ProviderKind::NoIp, &credentials, true)
        .await
        .unwrap();
    assert_eq!(created.kind, "noip");
    assert!(!created.credentials_encrypted.contains("hunter2"));

    let domain = iphop
        .create_domain(NewDomain {
            provider_id: created.id,
            domain_name: "box.no-ip.org".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(iphop.trigger_manual_update(domain.id).await.unwrap());

    // Same name twice is refused by the store
    assert_err!(
        iphop
            .create_provider("noip-home", ProviderKind::NoIp, &credentials, true)
            .await
    );
}

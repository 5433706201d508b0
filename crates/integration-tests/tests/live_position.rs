//! Live position tracking against the SQLite store
//!
//! Covers: per-category counts, the served transition, the Alice/Billing
//! walkthrough, and subscription release.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use qless_core::application::{
    OperatorSession, RegistrationService, TriageController, VisitorSession,
};
use qless_core::domain::{PositionStatus, ServeOutcome};
use qless_core::port::id_provider::{RandomTokenProvider, UuidProvider};
use qless_core::port::time_provider::mocks::ManualClock;
use qless_core::port::QueueStore;
use qless_infra_sqlite::{
    create_pool, run_migrations, SqliteCategorySource, SqliteIdentityGate, SqliteQueueStore,
};

struct Desk {
    store: Arc<SqliteQueueStore>,
    registration: Arc<RegistrationService>,
    triage: TriageController,
}

async fn desk() -> Desk {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();

    let categories = Arc::new(SqliteCategorySource::new(pool.clone()));
    categories
        .put_category_document(
            "front-desk",
            &["Billing".to_string(), "Support".to_string(), "Returns".to_string()],
        )
        .await
        .unwrap();

    let store = Arc::new(SqliteQueueStore::new(pool.clone()));
    let clock = Arc::new(ManualClock::new(36_000_000, 1_000));
    let registration = Arc::new(RegistrationService::new(
        store.clone(),
        categories,
        Arc::new(RandomTokenProvider),
        clock.clone(),
    ));
    registration.load_categories().await.unwrap();

    let gate = Arc::new(SqliteIdentityGate::new(pool.clone()));
    gate.register_operator("desk1", "hunter2", 0).await.unwrap();
    let session = Arc::new(OperatorSession::new(gate));
    session.sign_in("desk1", "hunter2").await.unwrap();

    let triage = TriageController::new(
        store.clone(),
        store.clone(),
        session,
        Arc::new(UuidProvider),
        clock,
    );

    Desk {
        store,
        registration,
        triage,
    }
}

async fn within<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out waiting for snapshot")
}

#[tokio::test]
async fn test_counts_match_category_cardinality() {
    let desk = desk().await;
    for (name, category) in [
        ("A", "Billing"),
        ("B", "Support"),
        ("C", "Billing"),
        ("D", "Returns"),
        ("E", "Billing"),
    ] {
        desk.registration.submit(name, category).await.unwrap();
    }

    let mut visitor = VisitorSession::new(desk.registration.clone(), desk.store.clone());
    visitor.submit("F", "Support").await.unwrap();

    let counts = visitor.tracker().counts();
    assert_eq!(counts.get("Billing"), 3);
    assert_eq!(counts.get("Support"), 2);
    assert_eq!(counts.get("Returns"), 1);
    assert_eq!(counts.total(), 6);
}

#[tokio::test]
async fn test_alice_billing_walkthrough() {
    let desk = desk().await;

    let mut first = VisitorSession::new(desk.registration.clone(), desk.store.clone());
    let first_id = first.submit("Xavier", "Billing").await.unwrap();
    desk.registration.submit("Yolanda", "Billing").await.unwrap();

    let mut alice = VisitorSession::new(desk.registration.clone(), desk.store.clone());
    alice.submit("Alice", "Billing").await.unwrap();
    assert_eq!(
        alice.status(),
        PositionStatus::Waiting {
            position: 3,
            category_count: 3
        }
    );
    assert_eq!(
        alice.status().message(),
        "Your current position in the queue: 3"
    );

    assert_eq!(
        desk.triage.accept(&first_id).await.unwrap(),
        ServeOutcome::Accepted
    );

    let status = within(first.tracker().wait_for(|s| s.is_your_turn()))
        .await
        .unwrap();
    assert_eq!(status, PositionStatus::YourTurn);

    let status = within(alice.tracker().wait_for(|s| {
        matches!(s, PositionStatus::Waiting { position: 2, .. })
    }))
    .await
    .unwrap();
    assert_eq!(
        status,
        PositionStatus::Waiting {
            position: 2,
            category_count: 2
        }
    );
    within(async {
        while alice.tracker().counts().get("Billing") != 2 {
            alice.tracker().changed().await.unwrap();
        }
    })
    .await;
}

#[tokio::test]
async fn test_removed_entry_is_dismissed() {
    let desk = desk().await;
    let mut visitor = VisitorSession::new(desk.registration.clone(), desk.store.clone());
    let id = visitor.submit("Alice", "Returns").await.unwrap();

    let entry = desk.store.find_by_id(&id).await.unwrap().unwrap();
    desk.triage.remove(&entry).await.unwrap();

    let status = within(visitor.tracker().wait_for(|s| *s == PositionStatus::Dismissed))
        .await
        .unwrap();
    assert_eq!(status.message(), "Your entry has been closed");
}

#[tokio::test]
async fn test_ending_sessions_releases_subscriptions() {
    let desk = desk().await;
    let mut one = VisitorSession::new(desk.registration.clone(), desk.store.clone());
    let mut two = VisitorSession::new(desk.registration.clone(), desk.store.clone());
    one.submit("A", "Billing").await.unwrap();
    two.submit("B", "Support").await.unwrap();
    let board = desk.triage.open_board().await.unwrap();
    assert_eq!(desk.store.subscriber_count(), 5);

    one.end();
    drop(board);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(desk.store.subscriber_count(), 2);

    drop(two);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(desk.store.subscriber_count(), 0);
}

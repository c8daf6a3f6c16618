use std::sync::Arc;

use chrono::NaiveDate;
use storage::repository::{StorageError, WallRepository};
use storage::sqlite::SqliteRepository;
use wall_core::CalendarPolicy;
use wall_core::model::{ProtocolDetails, ProtocolId, TrackedProtocol, UserId};
use wall_core::time::fixed_now;

fn user() -> UserId {
    UserId::new("user-1").unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn build_protocol(id: &str) -> TrackedProtocol {
    let details = ProtocolDetails {
        title: format!("Protocol {id}"),
        category: Some("focus".into()),
        benefits: vec!["Calm".into(), "Clarity".into()],
        instructions: vec!["Sit".into()],
        ..ProtocolDetails::default()
    };
    TrackedProtocol::new(ProtocolId::new(id).unwrap(), details, fixed_now()).unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn toggle(
    repo: &SqliteRepository,
    id: &ProtocolId,
    on: NaiveDate,
    notes: Option<&str>,
) -> Option<TrackedProtocol> {
    let policy = CalendarPolicy::default();
    let notes = notes.map(str::to_owned);
    repo.update_protocol(
        &user(),
        id,
        Box::new(move |p: &mut TrackedProtocol| {
            p.toggle_completion(on, notes, &policy);
        }),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrip_persists_details_and_history() {
    let repo = connect("memdb_roundtrip").await;
    let policy = CalendarPolicy::default();

    let protocol = build_protocol("box-breathing");
    repo.insert_protocol(&user(), &protocol).await.unwrap();

    toggle(&repo, protocol.protocol_id(), day(2), Some("felt calm")).await;
    let protocol = toggle(&repo, protocol.protocol_id(), day(1), None)
        .await
        .expect("tracked");
    assert_eq!(protocol.completion_history().len(), 2);

    let fetched = repo
        .get_protocol(&user(), protocol.protocol_id())
        .await
        .unwrap()
        .expect("tracked");
    assert_eq!(fetched, protocol);
    assert_eq!(fetched.details().benefits, vec!["Calm", "Clarity"]);
    assert_eq!(
        fetched.entry_on(day(2), &policy).and_then(|e| e.notes()),
        Some("felt calm")
    );
}

#[tokio::test]
async fn sqlite_lists_in_insertion_order() {
    let repo = connect("memdb_order").await;
    for id in ["zeta", "alpha", "mid"] {
        repo.insert_protocol(&user(), &build_protocol(id)).await.unwrap();
    }

    let ids: Vec<String> = repo
        .list_protocols(&user())
        .await
        .unwrap()
        .iter()
        .map(|p| p.protocol_id().to_string())
        .collect();
    assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
}

#[tokio::test]
async fn sqlite_rejects_duplicate_and_unknown() {
    let repo = connect("memdb_conflict").await;
    let protocol = build_protocol("nsdr");
    repo.insert_protocol(&user(), &protocol).await.unwrap();

    assert!(matches!(
        repo.insert_protocol(&user(), &protocol).await,
        Err(StorageError::Conflict)
    ));
    let ghost = ProtocolId::new("ghost").unwrap();
    assert!(toggle(&repo, &ghost, day(1), None).await.is_none());
}

#[tokio::test]
async fn sqlite_remove_and_purge_drop_history() {
    let repo = connect("memdb_purge").await;
    let other = UserId::new("user-2").unwrap();

    let a = build_protocol("a");
    repo.insert_protocol(&user(), &a).await.unwrap();
    toggle(&repo, a.protocol_id(), day(3), None).await;
    repo.insert_protocol(&user(), &build_protocol("b")).await.unwrap();
    repo.insert_protocol(&other, &build_protocol("a")).await.unwrap();

    assert!(repo.remove_protocol(&user(), a.protocol_id()).await.unwrap());
    assert!(!repo.remove_protocol(&user(), a.protocol_id()).await.unwrap());

    // Re-adding starts from an empty history.
    repo.insert_protocol(&user(), &build_protocol("a")).await.unwrap();
    let readded = repo
        .get_protocol(&user(), a.protocol_id())
        .await
        .unwrap()
        .expect("tracked");
    assert!(readded.completion_history().is_empty());

    assert_eq!(repo.purge(&user()).await.unwrap(), 2);
    assert!(repo.list_protocols(&user()).await.unwrap().is_empty());
    assert_eq!(repo.list_protocols(&other).await.unwrap().len(), 1);
}

#[tokio::test]
async fn sqlite_migrate_is_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    repo.insert_protocol(&user(), &build_protocol("x")).await.unwrap();
    assert_eq!(repo.list_protocols(&user()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn sqlite_concurrent_toggles_are_all_kept() {
    let path = std::env::temp_dir().join(format!("wall-{}.sqlite3", uuid::Uuid::new_v4()));
    let repo = SqliteRepository::connect(&format!("sqlite://{}", path.display()))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    let repo = Arc::new(repo);
    let protocol = build_protocol("nsdr");
    repo.insert_protocol(&user(), &protocol).await.unwrap();

    let tasks: Vec<_> = (1..=20)
        .map(|d| {
            let repo = Arc::clone(&repo);
            let id = protocol.protocol_id().clone();
            tokio::spawn(async move { toggle(&repo, &id, day(d), None).await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().is_some());
    }

    let stored = repo
        .get_protocol(&user(), protocol.protocol_id())
        .await
        .unwrap()
        .expect("tracked");
    assert_eq!(stored.completion_history().len(), 20);
    let _ = std::fs::remove_file(&path);
}

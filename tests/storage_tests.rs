use chrono::{DateTime, TimeZone, Utc};
use event_api::storage::models::{EventFiles, EventPatch, NewEvent};
use event_api::storage::{new_event_id, EventStore, RedbStore};

fn test_store() -> (tempfile::TempDir, RedbStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = RedbStore::open(dir.path().join("data")).unwrap();
    (dir, store)
}

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, day, 10, 0, 0).unwrap()
}

fn sample_event(name: &str, schedule: DateTime<Utc>) -> NewEvent {
    NewEvent {
        uid: 1,
        name: name.to_string(),
        tagline: "Build fast".to_string(),
        schedule,
        description: "A hackathon".to_string(),
        moderator: None,
        category: None,
        sub_category: None,
        rigor_rank: 0,
        files: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_insert_and_find() {
    let (_dir, store) = test_store();

    let id = store.insert(sample_event("Hack Day", at(1))).await.unwrap();
    assert_eq!(id.len(), 24);

    let event = store.find_by_id(&id).await.unwrap().expect("event should exist");
    assert_eq!(event.id, id);
    assert_eq!(event.name, "Hack Day");
    assert_eq!(event.kind, "event");
    assert!(event.attendees.is_empty());
    assert_eq!(event.created_at, event.updated_at);
}

#[tokio::test]
async fn test_find_missing_returns_none() {
    let (_dir, store) = test_store();
    assert!(store.find_by_id(&new_event_id()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_find_latest_orders_by_schedule_desc() {
    let (_dir, store) = test_store();

    for (name, day) in [("first", 1), ("third", 3), ("second", 2), ("fifth", 5), ("fourth", 4)] {
        store.insert(sample_event(name, at(day))).await.unwrap();
    }

    let names = |events: Vec<event_api::storage::models::Event>| {
        events.into_iter().map(|e| e.name).collect::<Vec<_>>()
    };

    let page = store.find_latest(0, 2).await.unwrap();
    assert_eq!(names(page), vec!["fifth", "fourth"]);

    let page = store.find_latest(2, 2).await.unwrap();
    assert_eq!(names(page), vec!["third", "second"]);

    let page = store.find_latest(4, 2).await.unwrap();
    assert_eq!(names(page), vec!["first"]);

    assert!(store.find_latest(10, 2).await.unwrap().is_empty());
    assert_eq!(store.count().await.unwrap(), 5);
}

#[tokio::test]
async fn test_events_with_same_schedule_are_all_listed() {
    let (_dir, store) = test_store();

    store.insert(sample_event("a", at(1))).await.unwrap();
    store.insert(sample_event("b", at(1))).await.unwrap();

    assert_eq!(store.find_latest(0, 10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_update_reindexes_schedule() {
    let (_dir, store) = test_store();

    let early = store.insert(sample_event("early", at(1))).await.unwrap();
    store.insert(sample_event("late", at(2))).await.unwrap();

    let patch = EventPatch {
        schedule: Some(at(9)),
        ..EventPatch::touch(Utc::now())
    };
    let outcome = store.update(&early, &patch).await.unwrap();
    assert_eq!(outcome.matched, 1);
    assert_eq!(outcome.modified, 1);

    let latest = store.find_latest(0, 1).await.unwrap();
    assert_eq!(latest[0].id, early);
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_update_leaves_absent_fields() {
    let (_dir, store) = test_store();
    let id = store.insert(sample_event("Hack Day", at(1))).await.unwrap();

    let patch = EventPatch {
        tagline: Some("Build faster".to_string()),
        files: Some(EventFiles {
            image: "/uploads/image-1.png".to_string(),
        }),
        ..EventPatch::touch(Utc::now() + chrono::Duration::seconds(1))
    };
    store.update(&id, &patch).await.unwrap();

    let event = store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(event.tagline, "Build faster");
    assert_eq!(event.name, "Hack Day");
    assert_eq!(event.schedule, at(1));
    assert_eq!(event.files.unwrap().image, "/uploads/image-1.png");
    assert!(event.updated_at > event.created_at);
}

#[tokio::test]
async fn test_update_missing_matches_nothing() {
    let (_dir, store) = test_store();

    let outcome = store
        .update(&new_event_id(), &EventPatch::touch(Utc::now()))
        .await
        .unwrap();
    assert_eq!(outcome.matched, 0);
    assert_eq!(outcome.modified, 0);
}

#[tokio::test]
async fn test_delete_removes_event_and_index() {
    let (_dir, store) = test_store();
    let id = store.insert(sample_event("Hack Day", at(1))).await.unwrap();

    assert_eq!(store.delete(&id).await.unwrap(), 1);
    assert!(store.find_by_id(&id).await.unwrap().is_none());
    assert!(store.find_latest(0, 10).await.unwrap().is_empty());
    assert_eq!(store.count().await.unwrap(), 0);

    assert_eq!(store.delete(&id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let store = RedbStore::open(dir.path().join("data")).unwrap();
        store.insert(sample_event("Hack Day", at(1))).await.unwrap()
    };

    let store = RedbStore::open(dir.path().join("data")).unwrap();
    let event = store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(event.name, "Hack Day");
    store.ping().await.unwrap();
}

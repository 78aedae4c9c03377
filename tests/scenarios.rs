#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use futures::join;
use serde_json::json;
use together_lib::model::{Book, BookStatus, CheckIn, Goal};
use together_lib::schema::fields;
use together_lib::{DomainHook, ListOutcome, NoticeKind, RecordingNotifier};

mod util;

#[tokio::test]
async fn creating_a_goal_keeps_only_real_milestones() {
    let store = util::temp_store().await;
    let notifier = RecordingNotifier::new();
    let goals: DomainHook<Goal> = DomainHook::new(store.clone(), Arc::new(notifier.clone()));

    goals
        .create(fields(json!({ "title": "Run a 10k", "category": "Health", "timeframe": "3-Month" })))
        .await
        .expect("seed");
    goals.list().await;
    let before = goals.len();

    let created = goals
        .create(fields(json!({
            "title": "Save for house",
            "category": "Financial",
            "timeframe": "1-Year",
            "progress": 0,
            "milestones": ["", "Open account", ""],
        })))
        .await
        .expect("create");

    assert_eq!(created.milestones, vec!["Open account".to_string()]);
    assert_eq!(goals.len(), before + 1);
    assert_eq!(goals.items()[0], created);

    let stored: String = sqlx::query_scalar("SELECT milestones FROM goals WHERE id = ?")
        .bind(&created.id)
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(stored, r#"["Open account"]"#);
    assert_eq!(notifier.last().unwrap().description, "Goal added successfully");
}

#[tokio::test]
async fn updating_a_book_status_keeps_position_and_other_fields() {
    let store = util::temp_store().await;
    let notifier = RecordingNotifier::new();
    let books: DomainHook<Book> = DomainHook::new(store, Arc::new(notifier.clone()));

    for title in ["Dune", "Emma", "Ulysses"] {
        books
            .create(fields(json!({
                "title": title,
                "author": "Someone",
                "category": "Fiction",
                "status": "reading",
                "progress": 40,
            })))
            .await
            .expect("create book");
    }
    books.list().await;
    let before = books.items();
    let target = before[1].clone();

    let updated = books
        .update(&target.id, fields(json!({ "status": "completed" })))
        .await
        .expect("update");

    let after = books.items();
    assert_eq!(after.len(), before.len());
    assert_eq!(after[1].id, target.id);
    assert_eq!(after[1].status, BookStatus::Completed);
    assert_eq!(after[1], updated);
    assert_eq!(books.get(&target.id), Some(updated.clone()));
    assert_eq!(
        Book {
            status: BookStatus::Reading,
            ..after[1].clone()
        },
        target
    );
    assert_eq!(after[0], before[0]);
    assert_eq!(after[2], before[2]);
    assert_eq!(notifier.last().unwrap().description, "Book updated successfully");
}

#[tokio::test]
async fn deleting_a_missing_checkin_fails_without_touching_the_list() {
    let store = util::temp_store().await;
    let notifier = RecordingNotifier::new();
    let checkins: DomainHook<CheckIn> = DomainHook::new(store, Arc::new(notifier.clone()));

    checkins
        .create(fields(json!({ "date": "2025-08-10", "checkin_type": "weekly", "relationship_score": 9 })))
        .await
        .expect("create");
    notifier.clear();

    assert!(!checkins.delete("00000000-0000-7000-8000-000000000000").await);
    assert_eq!(checkins.len(), 1);
    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Error);
    assert_eq!(notices[0].description, "Failed to delete check-in");
}

#[tokio::test]
async fn listing_an_empty_table_is_quietly_empty() {
    let store = util::Scripted::new();
    let notifier = RecordingNotifier::new();
    let goals: DomainHook<Goal> = DomainHook::new(store.clone(), Arc::new(notifier.clone()));
    let reply = store.expect();

    assert!(!goals.loading());
    let (outcome, seen_loading) = join!(goals.list(), async {
        let seen = goals.loading();
        reply.send(Ok(Vec::new())).unwrap();
        seen
    });

    assert!(seen_loading);
    assert_eq!(outcome, ListOutcome::Loaded(0));
    assert!(goals.is_empty());
    assert!(!goals.loading());
    assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn empty_sqlite_table_lists_without_notice() {
    let store = util::temp_store().await;
    let notifier = RecordingNotifier::new();
    let goals: DomainHook<Goal> = DomainHook::new(store, Arc::new(notifier.clone()));
    assert_eq!(goals.list().await, ListOutcome::Loaded(0));
    assert!(notifier.notices().is_empty());
}

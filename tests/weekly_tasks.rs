#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use serde_json::json;
use together_lib::model::{Level, Partner, TaskStatus, WeeklyTask};
use together_lib::pages::WeeklyTasks;
use together_lib::schema::fields;
use together_lib::time::{date_key, parse_date, today, week_monday};
use together_lib::{DomainHook, ListOutcome, RecordingNotifier};

mod util;

async fn add(hook: &DomainHook<WeeklyTask>, who: &str, title: &str, week_of: &str, status: &str) {
    hook.create(fields(json!({
        "user_name": who,
        "task_title": title,
        "week_of": week_of,
        "status": status,
        "priority": "high",
    })))
    .await
    .expect("create task");
}

#[tokio::test]
async fn load_week_keeps_only_that_mondays_tasks() {
    let store = util::temp_store().await;
    let page = WeeklyTasks::new(store, Arc::new(RecordingNotifier::new()));
    add(&page.tasks, "Richmond", "Book dinner", "2025-08-04", "completed").await;
    add(&page.tasks, "Edwina", "Call mum", "2025-08-04", "in-progress").await;
    add(&page.tasks, "Edwina", "Plan trip", "2025-08-11", "not-started").await;

    let sunday = parse_date("2025-08-10").unwrap();
    assert_eq!(page.load_week(sunday).await, ListOutcome::Loaded(2));
    assert_eq!(page.week(), parse_date("2025-08-04"));
    assert!(page.tasks.items().iter().all(|t| t.week_of == "2025-08-04"));
    assert_eq!(page.tasks.items()[0].priority, Some(Level::High));

    assert_eq!(page.progress(Partner::Richmond), (1, 1));
    assert_eq!(page.progress(Partner::Edwina), (0, 1));
    assert_eq!(page.for_partner(Partner::Edwina)[0].status, TaskStatus::InProgress);

    assert_eq!(
        page.load_week(parse_date("2025-08-11").unwrap()).await,
        ListOutcome::Loaded(1)
    );
    assert_eq!(page.tasks.items()[0].task_title, "Plan trip");
}

#[tokio::test]
async fn current_week_uses_todays_monday() {
    let store = util::temp_store().await;
    let page = WeeklyTasks::new(store, Arc::new(RecordingNotifier::new()));
    let this_week = date_key(week_monday(today()));
    add(&page.tasks, "Richmond", "Water plants", &this_week, "not-started").await;
    add(&page.tasks, "Richmond", "Old chore", "2020-01-06", "completed").await;

    assert_eq!(page.load_current_week().await, ListOutcome::Loaded(1));
    assert_eq!(page.tasks.items()[0].week_of, this_week);
}

#[tokio::test]
async fn unknown_partner_rows_are_rejected_on_read() {
    let store = util::temp_store().await;
    sqlx::query(
        "INSERT INTO weekly_tasks (id, created_at, updated_at, user_name, task_title, week_of) \
         VALUES ('t1', 1, 1, 'Stranger', 'Mystery', '2025-08-04')",
    )
    .execute(store.pool())
    .await
    .unwrap();
    let notifier = RecordingNotifier::new();
    let page = WeeklyTasks::new(store, Arc::new(notifier.clone()));

    assert_eq!(
        page.load_week(parse_date("2025-08-06").unwrap()).await,
        ListOutcome::Failed
    );
    assert_eq!(notifier.last().unwrap().description, "Failed to load weekly tasks");
}

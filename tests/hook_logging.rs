#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use serde_json::json;
use together_lib::model::{Memory, MemoryType};
use together_lib::schema::fields;
use together_lib::{DomainHook, RecordingNotifier};
use tracing::subscriber;
use tracing_subscriber::EnvFilter;

mod util;

#[derive(Clone)]
struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn capture() -> (Arc<Mutex<Vec<u8>>>, impl subscriber::Subscriber + Send + Sync) {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let writer = buffer.clone();
    let sub = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("together=debug"))
        .with_writer(move || BufferWriter(writer.clone()))
        .json()
        .finish();
    (buffer, sub)
}

#[tokio::test]
async fn failed_update_logs_operation_table_and_id() {
    let (buffer, sub) = capture();
    let _guard = subscriber::set_default(sub);

    let store = util::temp_store().await;
    let memories: DomainHook<Memory> = DomainHook::new(store, Arc::new(RecordingNotifier::new()));
    assert!(memories
        .update("no-such-memory", fields(json!({ "title": "Renamed" })))
        .await
        .is_none());

    let log = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
    assert!(log.contains("\"event\":\"hook_error\""), "{log}");
    assert!(log.contains("\"operation\":\"update\""), "{log}");
    assert!(log.contains("\"table\":\"memories\""), "{log}");
    assert!(log.contains("\"id\":\"no-such-memory\""), "{log}");
    assert!(log.contains("STORE/NOT_FOUND"), "{log}");
}

#[tokio::test]
async fn out_of_set_optional_value_is_nulled_with_a_warning() {
    let (buffer, sub) = capture();
    let _guard = subscriber::set_default(sub);

    let store = util::temp_store().await;
    sqlx::query(
        "INSERT INTO memories (id, created_at, title, date, memory_type) \
         VALUES ('m1', 1, 'First date', '2025-08-08', 'anniversary'), \
                ('m2', 2, 'Proposal', '2025-09-01', ' Milestone ')",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let memories: DomainHook<Memory> = DomainHook::new(store, Arc::new(RecordingNotifier::new()));
    assert!(memories.list().await.is_loaded());
    let items = memories.items();
    assert_eq!(items[0].memory_type, Some(MemoryType::Milestone));
    assert_eq!(items[1].memory_type, None);

    let log = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
    assert!(log.contains("\"event\":\"narrow_dropped\""), "{log}");
    assert!(log.contains("anniversary"), "{log}");
}

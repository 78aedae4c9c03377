//! The generic record synchronizer behind every domain page.
//!
//! A [`DomainHook`] keeps an ordered local mirror of one table, loads it from
//! a [`RecordStore`], and reconciles the mirror with the row the store returns
//! from each write. Every mutation ends in exactly one notice; a load only
//! speaks up when it fails.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, error, info};

use crate::model::Entity;
use crate::notify::Notifier;
use crate::schema::{Row, SCHEMA_DECODE};
use crate::store::{Query, RecordStore};
use crate::{AppError, AppResult};

/// What became of a `list` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutcome {
    /// The mirror now holds this many records.
    Loaded(usize),
    /// The read failed; the mirror kept its previous contents.
    Failed,
    /// A newer `list` was issued, or the hook was detached, before this one
    /// resolved. Nothing was applied.
    Superseded,
}

impl ListOutcome {
    pub fn is_loaded(self) -> bool {
        matches!(self, ListOutcome::Loaded(_))
    }
}

#[derive(Debug)]
struct Mirror<E> {
    items: Vec<E>,
    loading: bool,
}

pub struct DomainHook<E: Entity> {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    mirror: Mutex<Mirror<E>>,
    generation: AtomicU64,
    detached: AtomicBool,
}

impl<E: Entity> DomainHook<E> {
    pub fn new(store: Arc<dyn RecordStore>, notifier: Arc<dyn Notifier>) -> Self {
        DomainHook {
            store,
            notifier,
            mirror: Mutex::new(Mirror {
                items: Vec::new(),
                loading: false,
            }),
            generation: AtomicU64::new(0),
            detached: AtomicBool::new(false),
        }
    }

    fn table() -> &'static str {
        E::schema().table
    }

    fn noun() -> &'static str {
        E::schema().noun
    }

    fn mirror(&self) -> MutexGuard<'_, Mirror<E>> {
        self.mirror.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the mirror in store order.
    pub fn items(&self) -> Vec<E> {
        self.mirror().items.clone()
    }

    pub fn get(&self, id: &str) -> Option<E> {
        self.mirror().items.iter().find(|e| e.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.mirror().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirror().items.is_empty()
    }

    pub fn loading(&self) -> bool {
        self.mirror().loading
    }

    /// Stops this hook from applying any response that arrives afterwards.
    /// Used when the page that owns it goes away.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
        self.mirror().loading = false;
        debug!(target: "together", event = "hook_detached", table = Self::table());
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    /// Replaces the mirror with the full table in its declared order.
    pub async fn list(&self) -> ListOutcome {
        self.list_where(Vec::new()).await
    }

    /// Replaces the mirror with the rows matching every `(column, value)`
    /// equality filter.
    pub async fn list_where(&self, filters: Vec<(String, Value)>) -> ListOutcome {
        if self.is_detached() {
            return ListOutcome::Superseded;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.mirror().loading = true;

        let mut query = Query::ordered(E::schema().sort);
        query.filters = filters;
        let result = match self.store.select(Self::table(), &query).await {
            Ok(rows) => rows.into_iter().map(decode::<E>).collect::<AppResult<Vec<E>>>(),
            Err(err) => Err(err),
        };

        if self.is_detached() || self.generation.load(Ordering::SeqCst) != generation {
            debug!(
                target: "together",
                event = "hook_list_discarded",
                table = Self::table(),
                generation
            );
            return ListOutcome::Superseded;
        }

        match result {
            Ok(items) => {
                let count = items.len();
                {
                    let mut mirror = self.mirror();
                    mirror.items = items;
                    mirror.loading = false;
                }
                info!(target: "together", event = "hook_list", table = Self::table(), count);
                ListOutcome::Loaded(count)
            }
            Err(err) => {
                self.mirror().loading = false;
                self.report("list", None, &err);
                self.notifier
                    .error(&format!("Failed to load {}", Self::table().replace('_', " ")));
                ListOutcome::Failed
            }
        }
    }

    /// Inserts a record and puts the persisted version at the head of the
    /// mirror. Fields that do not fit the schema fail before the store is
    /// asked.
    pub async fn create(&self, fields: Row) -> Option<E> {
        let result: AppResult<E> = async {
            let prepared = E::schema().prepare_write(fields)?;
            let row = self.store.insert(Self::table(), prepared).await?;
            decode::<E>(row)
        }
        .await;

        match result {
            Ok(record) => {
                if self.discard_late("create") {
                    return None;
                }
                self.mirror().items.insert(0, record.clone());
                self.notifier
                    .success(&format!("{} added successfully", capitalized(Self::noun())));
                Some(record)
            }
            Err(err) => {
                self.report("create", None, &err);
                self.notifier
                    .error(&format!("Failed to add {}", Self::noun()));
                None
            }
        }
    }

    /// Applies a partial update and swaps the persisted version into the
    /// mirror at the same position. A record that is not mirrored stays out.
    pub async fn update(&self, id: &str, changes: Row) -> Option<E> {
        let result: AppResult<E> = async {
            let prepared = E::schema().prepare_write(changes)?;
            let row = self.store.update(Self::table(), id, prepared).await?;
            decode::<E>(row)
        }
        .await;

        match result {
            Ok(record) => {
                if self.discard_late("update") {
                    return None;
                }
                {
                    let mut mirror = self.mirror();
                    if let Some(slot) = mirror.items.iter_mut().find(|e| e.id() == id) {
                        *slot = record.clone();
                    }
                }
                self.notifier
                    .success(&format!("{} updated successfully", capitalized(Self::noun())));
                Some(record)
            }
            Err(err) => {
                self.report("update", Some(id), &err);
                self.notifier
                    .error(&format!("Failed to update {}", Self::noun()));
                None
            }
        }
    }

    /// Deletes by id and drops the record from the mirror.
    pub async fn delete(&self, id: &str) -> bool {
        match self.store.delete(Self::table(), id).await {
            Ok(()) => {
                if self.discard_late("delete") {
                    return false;
                }
                self.mirror().items.retain(|e| e.id() != id);
                self.notifier
                    .success(&format!("{} deleted successfully", capitalized(Self::noun())));
                true
            }
            Err(err) => {
                self.report("delete", Some(id), &err);
                self.notifier
                    .error(&format!("Failed to delete {}", Self::noun()));
                false
            }
        }
    }

    fn discard_late(&self, operation: &'static str) -> bool {
        let late = self.is_detached();
        if late {
            debug!(
                target: "together",
                event = "hook_response_discarded",
                table = Self::table(),
                operation
            );
        }
        late
    }

    fn report(&self, operation: &'static str, id: Option<&str>, err: &AppError) {
        error!(
            target: "together",
            event = "hook_error",
            table = Self::table(),
            operation,
            id = id.unwrap_or(""),
            code = %err.code(),
            error = %err
        );
    }
}

/// Narrows a store row and reads it into the entity type.
pub fn decode<E: Entity>(row: Row) -> AppResult<E> {
    let schema = E::schema();
    let narrowed = schema.narrow(row)?;
    serde_json::from_value(Value::Object(narrowed)).map_err(|e| {
        AppError::new(SCHEMA_DECODE, e.to_string()).in_table(schema.table)
    })
}

fn capitalized(noun: &str) -> String {
    let mut chars = noun.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

//! Pages that own more than one hook, plus the week-scoped task board and the
//! photo gallery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::blob::{BlobEntry, BlobStore};
use crate::hook::{DomainHook, ListOutcome};
use crate::model::{
    Book, BudgetItem, BusinessVenture, ChurchActivity, GrowthEntry, GrowthGoal, IncomeSource,
    JournalEntry, LegacyPlan, LoveLetter, Memory, Partner, PrayerRequest, ReadingGoal,
    SavingsGoal, ScriptureReflection, SpiritualGoal, TaskStatus, TimelineEvent, WeeklyTask,
};
use crate::notify::Notifier;
use crate::store::RecordStore;
use crate::time::{date_key, today, week_monday};
use crate::AppError;

macro_rules! composite_page {
    ( $(#[$meta:meta])* $name:ident { $( $field:ident : $ty:ty ),+ $(,)? } ) => {
        $(#[$meta])*
        pub struct $name {
            $( pub $field: DomainHook<$ty>, )+
            loading: AtomicBool,
        }

        impl $name {
            pub fn new(store: Arc<dyn RecordStore>, notifier: Arc<dyn Notifier>) -> Self {
                $name {
                    $( $field: DomainHook::new(Arc::clone(&store), Arc::clone(&notifier)), )+
                    loading: AtomicBool::new(false),
                }
            }

            /// True from the start of [`Self::load`] until every section has
            /// answered.
            pub fn loading(&self) -> bool {
                self.loading.load(Ordering::SeqCst)
            }

            /// Lists every section concurrently. Returns whether all of them
            /// loaded.
            pub async fn load(&self) -> bool {
                self.loading.store(true, Ordering::SeqCst);
                let ( $( $field, )+ ) = futures::join!( $( self.$field.list() ),+ );
                self.loading.store(false, Ordering::SeqCst);
                let outcomes = [ $( $field ),+ ];
                debug!(
                    target: "together",
                    event = "page_loaded",
                    page = stringify!($name),
                    sections = outcomes.len(),
                    failed = outcomes.iter().filter(|o| **o == ListOutcome::Failed).count()
                );
                outcomes.iter().all(|o| o.is_loaded())
            }

            pub fn detach(&self) {
                $( self.$field.detach(); )+
                self.loading.store(false, Ordering::SeqCst);
            }
        }
    };
}

composite_page! {
    /// Savings, income, budget and ventures.
    Finance {
        savings: SavingsGoal,
        income: IncomeSource,
        budget: BudgetItem,
        ventures: BusinessVenture,
    }
}

composite_page! {
    Faith {
        scripture: ScriptureReflection,
        prayers: PrayerRequest,
        goals: SpiritualGoal,
        church: ChurchActivity,
    }
}

composite_page! {
    Memories {
        memories: Memory,
        letters: LoveLetter,
        journal: JournalEntry,
    }
}

composite_page! {
    Legacy {
        plans: LegacyPlan,
        timeline: TimelineEvent,
    }
}

composite_page! {
    Reading {
        books: Book,
        goals: ReadingGoal,
    }
}

composite_page! {
    Growth {
        entries: GrowthEntry,
        goals: GrowthGoal,
    }
}

impl Finance {
    /// Sum of every income source's monthly amount.
    pub fn monthly_income(&self) -> f64 {
        self.income.items().iter().map(|s| s.monthly_amount).sum()
    }

    pub fn total_saved(&self) -> f64 {
        self.savings
            .items()
            .iter()
            .filter_map(|g| g.current_amount)
            .sum()
    }
}

/// Tasks for one week at a time, keyed by the Monday that starts it.
pub struct WeeklyTasks {
    pub tasks: DomainHook<WeeklyTask>,
    week: Mutex<Option<NaiveDate>>,
}

impl WeeklyTasks {
    pub fn new(store: Arc<dyn RecordStore>, notifier: Arc<dyn Notifier>) -> Self {
        WeeklyTasks {
            tasks: DomainHook::new(store, notifier),
            week: Mutex::new(None),
        }
    }

    /// The Monday of the week last loaded.
    pub fn week(&self) -> Option<NaiveDate> {
        *self.week.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Lists the tasks whose `week_of` is the Monday of `date`'s week.
    pub async fn load_week(&self, date: NaiveDate) -> ListOutcome {
        let monday = week_monday(date);
        *self.week.lock().unwrap_or_else(|e| e.into_inner()) = Some(monday);
        self.tasks
            .list_where(vec![("week_of".to_string(), Value::from(date_key(monday)))])
            .await
    }

    pub async fn load_current_week(&self) -> ListOutcome {
        self.load_week(today()).await
    }

    pub fn for_partner(&self, partner: Partner) -> Vec<WeeklyTask> {
        self.tasks
            .items()
            .into_iter()
            .filter(|t| t.user_name == partner)
            .collect()
    }

    /// Completed and total task counts for one partner.
    pub fn progress(&self, partner: Partner) -> (usize, usize) {
        let tasks = self.for_partner(partner);
        let done = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        (done, tasks.len())
    }
}

/// A gallery entry: a stored file plus the URL it is served from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Photo {
    pub name: String,
    pub url: String,
    pub created_at: i64,
    pub size: u64,
}

#[derive(Debug, Default)]
struct Gallery {
    photos: Vec<Photo>,
    loading: bool,
    uploading: bool,
}

/// Mirrors the photo store newest first and reports each change like a hook.
pub struct Photos {
    blobs: Arc<dyn BlobStore>,
    notifier: Arc<dyn Notifier>,
    gallery: Mutex<Gallery>,
    detached: AtomicBool,
}

impl Photos {
    pub fn new(blobs: Arc<dyn BlobStore>, notifier: Arc<dyn Notifier>) -> Self {
        Photos {
            blobs,
            notifier,
            gallery: Mutex::new(Gallery::default()),
            detached: AtomicBool::new(false),
        }
    }

    fn gallery(&self) -> MutexGuard<'_, Gallery> {
        self.gallery.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn photos(&self) -> Vec<Photo> {
        self.gallery().photos.clone()
    }

    pub fn loading(&self) -> bool {
        self.gallery().loading
    }

    pub fn uploading(&self) -> bool {
        self.gallery().uploading
    }

    /// Stops the gallery from applying responses that arrive afterwards.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
        let mut gallery = self.gallery();
        gallery.loading = false;
        gallery.uploading = false;
    }

    fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    fn photo(&self, entry: BlobEntry) -> Result<Photo, AppError> {
        let url = self.blobs.public_url(&entry.name)?;
        Ok(Photo {
            name: entry.name,
            url,
            created_at: entry.created_at,
            size: entry.size,
        })
    }

    pub async fn load(&self) -> bool {
        if self.is_detached() {
            return false;
        }
        self.gallery().loading = true;
        let result = match self.blobs.list().await {
            Ok(entries) => entries
                .into_iter()
                .map(|e| self.photo(e))
                .collect::<Result<Vec<_>, _>>(),
            Err(err) => Err(err),
        };
        if self.is_detached() {
            return false;
        }
        let mut gallery = self.gallery();
        gallery.loading = false;
        match result {
            Ok(photos) => {
                info!(target: "together", event = "photos_list", count = photos.len());
                gallery.photos = photos;
                true
            }
            Err(err) => {
                drop(gallery);
                error!(target: "together", event = "photos_error", operation = "list", code = %err.code(), error = %err);
                self.notifier.error("Failed to load photos");
                false
            }
        }
    }

    pub async fn upload(&self, original_name: &str, bytes: &[u8]) -> Option<Photo> {
        if self.is_detached() {
            return None;
        }
        self.gallery().uploading = true;
        let result = match self.blobs.upload(original_name, bytes).await {
            Ok(entry) => self.photo(entry),
            Err(err) => Err(err),
        };
        if self.is_detached() {
            return None;
        }
        self.gallery().uploading = false;
        match result {
            Ok(photo) => {
                self.gallery().photos.insert(0, photo.clone());
                self.notifier.success("Photo uploaded successfully");
                Some(photo)
            }
            Err(err) => {
                error!(target: "together", event = "photos_error", operation = "upload", code = %err.code(), error = %err);
                self.notifier.error("Failed to upload photo");
                None
            }
        }
    }

    pub async fn remove(&self, name: &str) -> bool {
        let result = self.blobs.remove(name).await;
        if self.is_detached() {
            return false;
        }
        match result {
            Ok(()) => {
                self.gallery().photos.retain(|p| p.name != name);
                self.notifier.success("Photo deleted successfully");
                true
            }
            Err(err) => {
                error!(target: "together", event = "photos_error", operation = "remove", name, code = %err.code(), error = %err);
                self.notifier.error("Failed to delete photo");
                false
            }
        }
    }
}

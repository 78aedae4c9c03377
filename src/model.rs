//! Typed records for every table and the schema each one is read through.

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::schema::{EntitySchema, FieldSpec, SortKey, CREATED_AT, SCHEMA_OUT_OF_SET};
use crate::AppError;

/// A table-backed record the generic engine can list, create, update and delete.
pub trait Entity: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    fn schema() -> &'static EntitySchema;
    fn id(&self) -> &str;
}

macro_rules! closed_set {
    ( $(#[$meta:meta])* $name:ident { $( $variant:ident => $text:literal ),+ $(,)? } ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( #[serde(rename = $text)] $variant, )+
        }

        impl $name {
            pub const VALUES: &'static [&'static str] = &[$( $text ),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let trimmed = value.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($text) {
                        return Ok($name::$variant);
                    }
                )+
                Err(AppError::new(SCHEMA_OUT_OF_SET, concat!("Unknown ", stringify!($name)))
                    .with_context("value", value.to_string())
                    .with_context("allowed", Self::VALUES.join("|")))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

macro_rules! entity {
    ( $( $ty:ident => $schema:ident ),+ $(,)? ) => {
        $(
            impl Entity for $ty {
                fn schema() -> &'static EntitySchema {
                    &$schema
                }

                fn id(&self) -> &str {
                    &self.id
                }
            }
        )+
    };
}

closed_set! {
    /// Shared by achievement impact, legacy plan priority and task priority.
    Level { Low => "low", Medium => "medium", High => "high" }
}

closed_set! {
    Partner { Richmond => "Richmond", Edwina => "Edwina" }
}

closed_set! {
    BookStatus {
        ToRead => "to-read",
        Reading => "reading",
        Completed => "completed",
        Paused => "paused",
    }
}

closed_set! {
    TaskStatus {
        NotStarted => "not-started",
        InProgress => "in-progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

closed_set! {
    MemoryType { Photo => "photo", Milestone => "milestone", Special => "special" }
}

closed_set! {
    BudgetItemType { Income => "income", Expense => "expense" }
}

closed_set! {
    VentureStatus { Active => "active", Planning => "planning", Completed => "completed" }
}

closed_set! {
    PrayerStatus { Pending => "pending", Answered => "answered", Ongoing => "ongoing" }
}

closed_set! {
    TimelineCategory {
        Milestone => "milestone",
        Memory => "memory",
        Achievement => "achievement",
        Goal => "goal",
    }
}

// ---------------------------------------------------------------------------
// Schemas

pub static ACHIEVEMENTS: EntitySchema = EntitySchema {
    table: "achievements",
    noun: "achievement",
    fields: &[
        FieldSpec::text("title").required(),
        FieldSpec::text("description"),
        FieldSpec::text("category").required(),
        FieldSpec::date("date_achieved").required(),
        FieldSpec::choice("impact_level", Level::VALUES),
    ],
    sort: SortKey::newest_first("date_achieved"),
    has_updated_at: false,
};

pub static BOOKS: EntitySchema = EntitySchema {
    table: "books",
    noun: "book",
    fields: &[
        FieldSpec::text("title").required(),
        FieldSpec::text("author").required(),
        FieldSpec::text("category").required(),
        FieldSpec::choice("status", BookStatus::VALUES).or("to-read"),
        FieldSpec::integer("progress"),
        FieldSpec::integer("rating"),
        FieldSpec::date("date_started"),
        FieldSpec::date("date_completed"),
        FieldSpec::text("notes"),
    ],
    sort: SortKey::newest_first(CREATED_AT),
    has_updated_at: false,
};

pub static BUDGET_ITEMS: EntitySchema = EntitySchema {
    table: "budget_items",
    noun: "budget item",
    fields: &[
        FieldSpec::text("item_name").required(),
        FieldSpec::choice("item_type", BudgetItemType::VALUES).required(),
        FieldSpec::real("amount").required(),
        FieldSpec::text("category").required(),
    ],
    sort: SortKey::newest_first(CREATED_AT),
    has_updated_at: false,
};

pub static BUSINESS_VENTURES: EntitySchema = EntitySchema {
    table: "business_ventures",
    noun: "business venture",
    fields: &[
        FieldSpec::text("name").required(),
        FieldSpec::real("investment").required(),
        FieldSpec::real("current_value"),
        FieldSpec::choice("status", VentureStatus::VALUES).or("planning"),
    ],
    sort: SortKey::newest_first(CREATED_AT),
    has_updated_at: false,
};

pub static CHECKINS: EntitySchema = EntitySchema {
    table: "checkins",
    noun: "check-in",
    fields: &[
        FieldSpec::date("date").required(),
        FieldSpec::text("checkin_type").required(),
        FieldSpec::integer("relationship_score"),
        FieldSpec::text("wins"),
        FieldSpec::text("challenges"),
        FieldSpec::text("goals_progress"),
        FieldSpec::text("next_steps"),
    ],
    sort: SortKey::newest_first("date"),
    has_updated_at: false,
};

pub static CHURCH_ACTIVITIES: EntitySchema = EntitySchema {
    table: "church_activities",
    noun: "church activity",
    fields: &[
        FieldSpec::text("activity_name").required(),
        FieldSpec::date("date").required(),
        FieldSpec::text("reflection"),
    ],
    sort: SortKey::newest_first("date"),
    has_updated_at: false,
};

pub static GOALS: EntitySchema = EntitySchema {
    table: "goals",
    noun: "goal",
    fields: &[
        FieldSpec::text("title").required(),
        FieldSpec::text("description"),
        FieldSpec::text("category").required(),
        FieldSpec::text("timeframe").required(),
        FieldSpec::date("deadline"),
        FieldSpec::integer("progress"),
        FieldSpec::list("milestones"),
        FieldSpec::text("user_id"),
    ],
    sort: SortKey::newest_first(CREATED_AT),
    has_updated_at: true,
};

pub static GROWTH_ENTRIES: EntitySchema = EntitySchema {
    table: "growth_entries",
    noun: "growth entry",
    fields: &[
        FieldSpec::text("category").required(),
        FieldSpec::integer("score").required(),
        FieldSpec::date("entry_date").required(),
        FieldSpec::text("notes"),
        FieldSpec::text("user_id"),
    ],
    sort: SortKey::newest_first("entry_date"),
    has_updated_at: false,
};

pub static GROWTH_GOALS: EntitySchema = EntitySchema {
    table: "growth_goals",
    noun: "growth goal",
    fields: &[
        FieldSpec::text("category").required(),
        FieldSpec::text("goal_text").required(),
        FieldSpec::integer("target_score"),
        FieldSpec::date("deadline"),
        FieldSpec::list("milestones"),
        FieldSpec::text("user_id"),
    ],
    sort: SortKey::newest_first(CREATED_AT),
    has_updated_at: false,
};

pub static INCOME_SOURCES: EntitySchema = EntitySchema {
    table: "income_sources",
    noun: "income source",
    fields: &[
        FieldSpec::text("source_name").required(),
        FieldSpec::real("monthly_amount").required(),
        FieldSpec::text("user_id"),
    ],
    sort: SortKey::newest_first(CREATED_AT),
    has_updated_at: false,
};

pub static JOURNAL_ENTRIES: EntitySchema = EntitySchema {
    table: "journal_entries",
    noun: "journal entry",
    fields: &[
        FieldSpec::date("week_of").required(),
        FieldSpec::list("gratitude"),
        FieldSpec::list("lessons_learned"),
        FieldSpec::text("reflections"),
    ],
    sort: SortKey::newest_first("week_of"),
    has_updated_at: true,
};

pub static LEGACY_PLANS: EntitySchema = EntitySchema {
    table: "legacy_plans",
    noun: "legacy plan",
    fields: &[
        FieldSpec::text("title").required(),
        FieldSpec::text("description").required(),
        FieldSpec::text("plan_type").required(),
        FieldSpec::choice("priority", Level::VALUES),
        FieldSpec::text("timeline"),
    ],
    sort: SortKey::newest_first(CREATED_AT),
    has_updated_at: false,
};

pub static LOVE_LETTERS: EntitySchema = EntitySchema {
    table: "love_letters",
    noun: "love letter",
    fields: &[
        FieldSpec::text("title").required(),
        FieldSpec::text("content").required(),
        FieldSpec::text("from_user_id"),
        FieldSpec::text("to_user_id"),
    ],
    sort: SortKey::newest_first(CREATED_AT),
    has_updated_at: false,
};

pub static MEMORIES: EntitySchema = EntitySchema {
    table: "memories",
    noun: "memory",
    fields: &[
        FieldSpec::text("title").required(),
        FieldSpec::text("description"),
        FieldSpec::date("date").required(),
        FieldSpec::text("location"),
        FieldSpec::choice("memory_type", MemoryType::VALUES),
        FieldSpec::text("photo_url"),
    ],
    sort: SortKey::newest_first("date"),
    has_updated_at: false,
};

pub static PRAYER_REQUESTS: EntitySchema = EntitySchema {
    table: "prayer_requests",
    noun: "prayer request",
    fields: &[
        FieldSpec::text("request").required(),
        FieldSpec::date("date_requested").required(),
        FieldSpec::choice("status", PrayerStatus::VALUES).or("pending"),
        FieldSpec::date("date_answered"),
        FieldSpec::text("testimony"),
    ],
    sort: SortKey::newest_first("date_requested"),
    has_updated_at: false,
};

pub static READING_GOALS: EntitySchema = EntitySchema {
    table: "reading_goals",
    noun: "reading goal",
    fields: &[
        FieldSpec::integer("year").required(),
        FieldSpec::integer("target_books").required(),
        FieldSpec::integer("books_completed"),
    ],
    sort: SortKey::newest_first("year"),
    has_updated_at: false,
};

pub static SAVINGS_GOALS: EntitySchema = EntitySchema {
    table: "savings_goals",
    noun: "savings goal",
    fields: &[
        FieldSpec::text("goal_name").required(),
        FieldSpec::real("target_amount").required(),
        FieldSpec::real("current_amount"),
        FieldSpec::date("deadline"),
    ],
    sort: SortKey::newest_first(CREATED_AT),
    has_updated_at: false,
};

pub static SCRIPTURE_REFLECTIONS: EntitySchema = EntitySchema {
    table: "scripture_reflections",
    noun: "scripture reflection",
    fields: &[
        FieldSpec::text("verse").required(),
        FieldSpec::text("reference").required(),
        FieldSpec::text("reflection").required(),
        FieldSpec::date("date_studied").required(),
    ],
    sort: SortKey::newest_first("date_studied"),
    has_updated_at: false,
};

pub static SPIRITUAL_GOALS: EntitySchema = EntitySchema {
    table: "spiritual_goals",
    noun: "spiritual goal",
    fields: &[
        FieldSpec::text("goal").required(),
        FieldSpec::date("deadline"),
        FieldSpec::integer("progress"),
        FieldSpec::list("milestones"),
    ],
    sort: SortKey::newest_first(CREATED_AT),
    has_updated_at: false,
};

pub static TIMELINE_EVENTS: EntitySchema = EntitySchema {
    table: "timeline_events",
    noun: "timeline event",
    fields: &[
        FieldSpec::text("title").required(),
        FieldSpec::text("description"),
        FieldSpec::date("date").required(),
        FieldSpec::choice("category", TimelineCategory::VALUES),
    ],
    sort: SortKey::newest_first("date"),
    has_updated_at: false,
};

pub static WEEKLY_TASKS: EntitySchema = EntitySchema {
    table: "weekly_tasks",
    noun: "task",
    fields: &[
        FieldSpec::choice("user_name", Partner::VALUES).required(),
        FieldSpec::text("task_title").required(),
        FieldSpec::text("task_description"),
        FieldSpec::choice("status", TaskStatus::VALUES).or("not-started"),
        FieldSpec::choice("priority", Level::VALUES),
        FieldSpec::date("week_of").required(),
        FieldSpec::date("due_date"),
    ],
    sort: SortKey::newest_first(CREATED_AT),
    has_updated_at: true,
};

/// Every table the store serves, in alphabetical order.
pub static SCHEMAS: &[&EntitySchema] = &[
    &ACHIEVEMENTS,
    &BOOKS,
    &BUDGET_ITEMS,
    &BUSINESS_VENTURES,
    &CHECKINS,
    &CHURCH_ACTIVITIES,
    &GOALS,
    &GROWTH_ENTRIES,
    &GROWTH_GOALS,
    &INCOME_SOURCES,
    &JOURNAL_ENTRIES,
    &LEGACY_PLANS,
    &LOVE_LETTERS,
    &MEMORIES,
    &PRAYER_REQUESTS,
    &READING_GOALS,
    &SAVINGS_GOALS,
    &SCRIPTURE_REFLECTIONS,
    &SPIRITUAL_GOALS,
    &TIMELINE_EVENTS,
    &WEEKLY_TASKS,
];

pub fn schema_for(table: &str) -> Option<&'static EntitySchema> {
    SCHEMAS.iter().copied().find(|s| s.table == table)
}

// ---------------------------------------------------------------------------
// Records

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub created_at: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub date_achieved: String,
    pub impact_level: Option<Level>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub created_at: i64,
    pub title: String,
    pub author: String,
    pub category: String,
    pub status: BookStatus,
    pub progress: Option<i64>,
    pub rating: Option<i64>,
    pub date_started: Option<String>,
    pub date_completed: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetItem {
    pub id: String,
    pub created_at: i64,
    pub item_name: String,
    pub item_type: BudgetItemType,
    pub amount: f64,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessVenture {
    pub id: String,
    pub created_at: i64,
    pub name: String,
    pub investment: f64,
    pub current_value: Option<f64>,
    pub status: VentureStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: String,
    pub created_at: i64,
    pub date: String,
    pub checkin_type: String,
    pub relationship_score: Option<i64>,
    pub wins: Option<String>,
    pub challenges: Option<String>,
    pub goals_progress: Option<String>,
    pub next_steps: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurchActivity {
    pub id: String,
    pub created_at: i64,
    pub activity_name: String,
    pub date: String,
    pub reflection: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub timeframe: String,
    pub deadline: Option<String>,
    pub progress: Option<i64>,
    #[serde(default)]
    pub milestones: Vec<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthEntry {
    pub id: String,
    pub created_at: i64,
    pub category: String,
    pub score: i64,
    pub entry_date: String,
    pub notes: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthGoal {
    pub id: String,
    pub created_at: i64,
    pub category: String,
    pub goal_text: String,
    pub target_score: Option<i64>,
    pub deadline: Option<String>,
    #[serde(default)]
    pub milestones: Vec<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeSource {
    pub id: String,
    pub created_at: i64,
    pub source_name: String,
    pub monthly_amount: f64,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub week_of: String,
    #[serde(default)]
    pub gratitude: Vec<String>,
    #[serde(default)]
    pub lessons_learned: Vec<String>,
    pub reflections: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyPlan {
    pub id: String,
    pub created_at: i64,
    pub title: String,
    pub description: String,
    pub plan_type: String,
    pub priority: Option<Level>,
    pub timeline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoveLetter {
    pub id: String,
    pub created_at: i64,
    pub title: String,
    pub content: String,
    pub from_user_id: Option<String>,
    pub to_user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub created_at: i64,
    pub title: String,
    pub description: Option<String>,
    pub date: String,
    pub location: Option<String>,
    pub memory_type: Option<MemoryType>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrayerRequest {
    pub id: String,
    pub created_at: i64,
    pub request: String,
    pub date_requested: String,
    pub status: PrayerStatus,
    pub date_answered: Option<String>,
    pub testimony: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingGoal {
    pub id: String,
    pub created_at: i64,
    pub year: i64,
    pub target_books: i64,
    pub books_completed: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub id: String,
    pub created_at: i64,
    pub goal_name: String,
    pub target_amount: f64,
    pub current_amount: Option<f64>,
    pub deadline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptureReflection {
    pub id: String,
    pub created_at: i64,
    pub verse: String,
    pub reference: String,
    pub reflection: String,
    pub date_studied: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpiritualGoal {
    pub id: String,
    pub created_at: i64,
    pub goal: String,
    pub deadline: Option<String>,
    pub progress: Option<i64>,
    #[serde(default)]
    pub milestones: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: String,
    pub created_at: i64,
    pub title: String,
    pub description: Option<String>,
    pub date: String,
    pub category: Option<TimelineCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTask {
    pub id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub user_name: Partner,
    pub task_title: String,
    pub task_description: Option<String>,
    pub status: TaskStatus,
    pub priority: Option<Level>,
    pub week_of: String,
    pub due_date: Option<String>,
}

entity!(
    Achievement => ACHIEVEMENTS,
    Book => BOOKS,
    BudgetItem => BUDGET_ITEMS,
    BusinessVenture => BUSINESS_VENTURES,
    CheckIn => CHECKINS,
    ChurchActivity => CHURCH_ACTIVITIES,
    Goal => GOALS,
    GrowthEntry => GROWTH_ENTRIES,
    GrowthGoal => GROWTH_GOALS,
    IncomeSource => INCOME_SOURCES,
    JournalEntry => JOURNAL_ENTRIES,
    LegacyPlan => LEGACY_PLANS,
    LoveLetter => LOVE_LETTERS,
    Memory => MEMORIES,
    PrayerRequest => PRAYER_REQUESTS,
    ReadingGoal => READING_GOALS,
    SavingsGoal => SAVINGS_GOALS,
    ScriptureReflection => SCRIPTURE_REFLECTIONS,
    SpiritualGoal => SPIRITUAL_GOALS,
    TimelineEvent => TIMELINE_EVENTS,
    WeeklyTask => WEEKLY_TASKS,
);

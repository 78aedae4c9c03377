//! Per-table schema declarations consumed by the generic record engine.
//!
//! The store keeps every closed set as free text, so each declaration says
//! which columns must be narrowed on read and which columns carry text lists.

use serde_json::{Map, Value};
use tracing::warn;

use crate::time::{date_key, parse_date};
use crate::{AppError, AppResult};

/// A record as it travels to and from the store: column name to JSON value.
pub type Row = Map<String, Value>;

pub const ID: &str = "id";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

pub const SCHEMA_OUT_OF_SET: &str = "SCHEMA/OUT_OF_SET";
pub const SCHEMA_DECODE: &str = "SCHEMA/DECODE";
pub const VALIDATION_REQUIRED_FIELD: &str = "VALIDATION/REQUIRED_FIELD";
pub const VALIDATION_WRONG_TYPE: &str = "VALIDATION/WRONG_TYPE";
pub const VALIDATION_OUT_OF_SET: &str = "VALIDATION/OUT_OF_SET";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Real,
    /// `YYYY-MM-DD` text.
    Date,
    /// JSON array of strings.
    TextList,
}

impl FieldKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldKind::Integer => "INTEGER",
            FieldKind::Real => "REAL",
            FieldKind::Text | FieldKind::Date | FieldKind::TextList => "TEXT",
        }
    }

    fn expected(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "a whole number",
            FieldKind::Real => "a number",
            FieldKind::Date => "a YYYY-MM-DD date",
            FieldKind::TextList => "a list of text",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub choices: Option<&'static [&'static str]>,
    pub fallback: Option<&'static str>,
}

impl FieldSpec {
    const fn of(name: &'static str, kind: FieldKind) -> Self {
        FieldSpec {
            name,
            kind,
            required: false,
            choices: None,
            fallback: None,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::of(name, FieldKind::Text)
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::of(name, FieldKind::Integer)
    }

    pub const fn real(name: &'static str) -> Self {
        Self::of(name, FieldKind::Real)
    }

    pub const fn date(name: &'static str) -> Self {
        Self::of(name, FieldKind::Date)
    }

    pub const fn list(name: &'static str) -> Self {
        Self::of(name, FieldKind::TextList)
    }

    pub const fn choice(name: &'static str, values: &'static [&'static str]) -> Self {
        FieldSpec {
            choices: Some(values),
            ..Self::of(name, FieldKind::Text)
        }
    }

    pub const fn required(self) -> Self {
        FieldSpec {
            required: true,
            ..self
        }
    }

    /// Value substituted for out-of-set store values.
    pub const fn or(self, fallback: &'static str) -> Self {
        FieldSpec {
            fallback: Some(fallback),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: &'static str,
    pub descending: bool,
}

impl SortKey {
    pub const fn newest_first(column: &'static str) -> Self {
        SortKey {
            column,
            descending: true,
        }
    }
}

#[derive(Debug)]
pub struct EntitySchema {
    pub table: &'static str,
    /// Singular name used in user-facing messages.
    pub noun: &'static str,
    pub fields: &'static [FieldSpec],
    pub sort: SortKey,
    pub has_updated_at: bool,
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Every column of the table, identity and timestamps first.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        let stamps: &'static [&'static str] = if self.has_updated_at {
            &[ID, CREATED_AT, UPDATED_AT]
        } else {
            &[ID, CREATED_AT]
        };
        stamps
            .iter()
            .copied()
            .chain(self.fields.iter().map(|f| f.name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns().any(|c| c == name)
    }

    /// Rejects a draft that is missing a required field or leaves it blank.
    pub fn check_required(&self, fields: &Row) -> AppResult<()> {
        for spec in self.fields.iter().filter(|f| f.required) {
            let present = match fields.get(spec.name) {
                None | Some(Value::Null) => false,
                Some(Value::String(s)) => !s.trim().is_empty(),
                Some(_) => true,
            };
            if !present {
                return Err(AppError::new(
                    VALIDATION_REQUIRED_FIELD,
                    format!("{} is required", spec.name),
                )
                .in_table(self.table)
                .with_context("field", spec.name));
            }
        }
        Ok(())
    }

    /// Shapes client input for an insert or update: identity and timestamps
    /// belong to the store, every value must fit its declared kind, closed-set
    /// values are stored canonical and text lists lose their blank entries.
    pub fn prepare_write(&self, mut fields: Row) -> AppResult<Row> {
        fields.remove(ID);
        fields.remove(CREATED_AT);
        fields.remove(UPDATED_AT);
        for spec in self.fields {
            let Some(value) = fields.get_mut(spec.name) else {
                continue;
            };
            if value.is_null() {
                if spec.required {
                    return Err(AppError::new(
                        VALIDATION_REQUIRED_FIELD,
                        format!("{} is required", spec.name),
                    )
                    .in_table(self.table)
                    .with_context("field", spec.name));
                }
                continue;
            }
            *value = self.coerce(spec, value.take())?;
        }
        Ok(fields)
    }

    fn coerce(&self, spec: &FieldSpec, value: Value) -> AppResult<Value> {
        if let Some(choices) = spec.choices {
            let hit = value
                .as_str()
                .and_then(|s| choices.iter().find(|c| c.eq_ignore_ascii_case(s.trim())));
            return match hit {
                Some(hit) => Ok(Value::String((*hit).to_string())),
                None => Err(self
                    .rejected(VALIDATION_OUT_OF_SET, spec, &value, "is not one of the allowed options")
                    .with_context("allowed", choices.join("|"))),
            };
        }

        let fitted = match (spec.kind, &value) {
            (FieldKind::Text, Value::String(_)) | (FieldKind::Real, Value::Number(_)) => {
                Some(value.clone())
            }
            (FieldKind::Integer, v) if v.as_i64().is_some() => Some(value.clone()),
            (FieldKind::Date, Value::String(text)) => {
                parse_date(text).map(|date| Value::String(date_key(date)))
            }
            (FieldKind::TextList, Value::Array(items)) if items.iter().all(Value::is_string) => {
                let kept = clean_list(items.iter().filter_map(Value::as_str));
                Some(Value::Array(kept.into_iter().map(Value::String).collect()))
            }
            _ => None,
        };
        fitted.ok_or_else(|| {
            let reason = format!("must be {}", spec.kind.expected());
            self.rejected(VALIDATION_WRONG_TYPE, spec, &value, &reason)
        })
    }

    fn rejected(&self, code: &str, spec: &FieldSpec, value: &Value, reason: &str) -> AppError {
        AppError::new(code, format!("{} {reason}", spec.name))
            .in_table(self.table)
            .with_context("field", spec.name)
            .with_context("value", value.to_string())
    }

    /// Coerces a row read from the store into the closed shapes this schema
    /// declares. Applying it to an already narrowed row changes nothing.
    pub fn narrow(&self, mut row: Row) -> AppResult<Row> {
        match row.get(ID) {
            Some(Value::String(id)) if !id.is_empty() => {}
            _ => {
                return Err(AppError::new(SCHEMA_DECODE, "Row is missing its id").in_table(self.table))
            }
        }

        for spec in self.fields {
            if let Some(choices) = spec.choices {
                let narrowed = narrow_choice(self.table, spec, choices, row.get(spec.name))?;
                row.insert(spec.name.to_string(), narrowed);
            } else if spec.kind == FieldKind::TextList {
                let items = match row.remove(spec.name) {
                    Some(Value::Array(items)) => items
                        .into_iter()
                        .filter(|item| item.is_string())
                        .collect(),
                    _ => Vec::new(),
                };
                row.insert(spec.name.to_string(), Value::Array(items));
            }
        }
        Ok(row)
    }
}

fn narrow_choice(
    table: &str,
    spec: &FieldSpec,
    choices: &'static [&'static str],
    value: Option<&Value>,
) -> AppResult<Value> {
    let raw = match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if let Some(hit) = choices.iter().find(|c| c.eq_ignore_ascii_case(trimmed)) {
                return Ok(Value::String((*hit).to_string()));
            }
            Some(s.clone())
        }
        Some(other) => Some(other.to_string()),
    };

    if raw.is_none() && !spec.required && spec.fallback.is_none() {
        return Ok(Value::Null);
    }

    if let Some(fallback) = spec.fallback {
        if raw.is_some() {
            warn!(
                target: "together",
                event = "narrow_fallback",
                table,
                field = spec.name,
                value = raw.as_deref().unwrap_or_default(),
                fallback
            );
        }
        return Ok(Value::String(fallback.to_string()));
    }

    if !spec.required {
        warn!(
            target: "together",
            event = "narrow_dropped",
            table,
            field = spec.name,
            value = raw.as_deref().unwrap_or_default()
        );
        return Ok(Value::Null);
    }

    Err(
        AppError::new(SCHEMA_OUT_OF_SET, "Stored value is not one of the allowed options")
            .in_table(table)
            .with_context("field", spec.name)
            .with_context("value", raw.unwrap_or_else(|| "null".to_string()))
            .with_context("allowed", choices.join("|")),
    )
}

/// Drops empty and whitespace-only entries, keeping the order of the rest.
pub fn clean_list<'a, I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    items
        .into_iter()
        .filter(|item| !item.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Builds a [`Row`] from a JSON object literal; anything else is empty.
pub fn fields(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    static STATUS: &[&str] = &["to-read", "reading", "completed", "paused"];
    static LEVEL: &[&str] = &["low", "medium", "high"];
    static WHO: &[&str] = &["Richmond", "Edwina"];

    static SAMPLE: EntitySchema = EntitySchema {
        table: "sample",
        noun: "sample",
        fields: &[
            FieldSpec::text("title").required(),
            FieldSpec::choice("status", STATUS).or("to-read"),
            FieldSpec::choice("impact_level", LEVEL),
            FieldSpec::choice("user_name", WHO).required(),
            FieldSpec::list("milestones"),
            FieldSpec::integer("score"),
            FieldSpec::real("weight"),
            FieldSpec::date("due"),
        ],
        sort: SortKey::newest_first(CREATED_AT),
        has_updated_at: true,
    };

    fn row(value: Value) -> Row {
        fields(value)
    }

    #[test]
    fn columns_start_with_identity_and_stamps() {
        let cols: Vec<_> = SAMPLE.columns().collect();
        assert_eq!(&cols[..3], &["id", "created_at", "updated_at"]);
        assert!(SAMPLE.has_column("milestones"));
        assert!(!SAMPLE.has_column("partner_id"));
    }

    #[test]
    fn check_required_reports_first_missing_field() {
        let err = SAMPLE
            .check_required(&row(json!({ "title": "  ", "user_name": "Edwina" })))
            .unwrap_err();
        assert_eq!(err.code(), VALIDATION_REQUIRED_FIELD);
        assert_eq!(err.context().get("field"), Some(&"title".to_string()));
        assert!(SAMPLE
            .check_required(&row(json!({ "title": "Read", "user_name": "Edwina" })))
            .is_ok());
    }

    #[test]
    fn prepare_write_strips_store_columns_and_blank_items() {
        let prepared = SAMPLE.prepare_write(row(json!({
            "id": "client-made",
            "created_at": 1,
            "updated_at": 2,
            "title": "Save",
            "milestones": ["", "Open account", "  ", "Deposit"]
        })))
        .unwrap();
        assert!(!prepared.contains_key("id"));
        assert!(!prepared.contains_key("created_at"));
        assert!(!prepared.contains_key("updated_at"));
        assert_eq!(prepared["milestones"], json!(["Open account", "Deposit"]));
    }

    #[test]
    fn prepare_write_canonicalises_choices_and_dates() {
        let prepared = SAMPLE
            .prepare_write(row(json!({
                "status": " Paused",
                "user_name": "edwina",
                "due": " 2025-08-04 ",
                "score": 3,
                "impact_level": null,
            })))
            .unwrap();
        assert_eq!(prepared["status"], json!("paused"));
        assert_eq!(prepared["user_name"], json!("Edwina"));
        assert_eq!(prepared["due"], json!("2025-08-04"));
        assert_eq!(prepared["score"], json!(3));
        assert_eq!(prepared["impact_level"], Value::Null);
    }

    #[test]
    fn prepare_write_rejects_values_of_the_wrong_kind() {
        let cases = [
            (json!({ "score": "half" }), VALIDATION_WRONG_TYPE, "score"),
            (json!({ "score": 2.5 }), VALIDATION_WRONG_TYPE, "score"),
            (json!({ "weight": "heavy" }), VALIDATION_WRONG_TYPE, "weight"),
            (json!({ "due": "next week" }), VALIDATION_WRONG_TYPE, "due"),
            (json!({ "due": 20250804 }), VALIDATION_WRONG_TYPE, "due"),
            (json!({ "title": 7 }), VALIDATION_WRONG_TYPE, "title"),
            (json!({ "milestones": "Open account" }), VALIDATION_WRONG_TYPE, "milestones"),
            (json!({ "milestones": ["a", 3] }), VALIDATION_WRONG_TYPE, "milestones"),
            (json!({ "status": "abandoned" }), VALIDATION_OUT_OF_SET, "status"),
            (json!({ "user_name": null }), VALIDATION_REQUIRED_FIELD, "user_name"),
        ];
        for (input, code, field) in cases {
            let err = SAMPLE.prepare_write(row(input.clone())).unwrap_err();
            assert_eq!(err.code(), code, "{input}");
            assert_eq!(err.context().get("field").map(String::as_str), Some(field));
            assert_eq!(err.context().get("table").map(String::as_str), Some("sample"));
        }
        assert!(SAMPLE.prepare_write(row(json!({ "weight": 2 }))).is_ok());
    }

    #[test]
    fn narrow_canonicalises_case_and_whitespace() {
        let out = SAMPLE
            .narrow(row(json!({ "id": "a", "status": " Reading ", "user_name": "edwina" })))
            .unwrap();
        assert_eq!(out["status"], json!("reading"));
        assert_eq!(out["user_name"], json!("Edwina"));
        assert_eq!(out["milestones"], json!([]));
        assert_eq!(out["impact_level"], Value::Null);
    }

    #[test]
    fn narrow_uses_fallback_then_null_then_rejects() {
        let out = SAMPLE
            .narrow(row(json!({
                "id": "a",
                "status": "abandoned",
                "impact_level": "huge",
                "user_name": "Richmond"
            })))
            .unwrap();
        assert_eq!(out["status"], json!("to-read"));
        assert_eq!(out["impact_level"], Value::Null);

        let err = SAMPLE
            .narrow(row(json!({ "id": "a", "user_name": "Someone" })))
            .unwrap_err();
        assert_eq!(err.code(), SCHEMA_OUT_OF_SET);
        assert_eq!(err.context().get("field"), Some(&"user_name".to_string()));
    }

    #[test]
    fn narrow_requires_an_id() {
        let err = SAMPLE.narrow(row(json!({ "user_name": "Edwina" }))).unwrap_err();
        assert_eq!(err.code(), SCHEMA_DECODE);
    }

    #[test]
    fn narrow_drops_non_string_list_items() {
        let out = SAMPLE
            .narrow(row(json!({ "id": "a", "user_name": "Edwina", "milestones": ["a", 3, null, "b"] })))
            .unwrap();
        assert_eq!(out["milestones"], json!(["a", "b"]));
    }

    fn any_status() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            "[ a-zA-Z-]{0,12}".prop_map(Value::String),
            prop::sample::select(STATUS).prop_map(|s| Value::String(s.to_uppercase())),
            any::<i64>().prop_map(Value::from),
        ]
    }

    proptest! {
        #[test]
        fn narrowing_is_idempotent(
            status in any_status(),
            impact in any_status(),
            items in prop::collection::vec(prop_oneof!["[ a-z]{0,6}".prop_map(Value::String), Just(Value::Null)], 0..6),
        ) {
            let input = row(json!({
                "id": "row-1",
                "user_name": "Richmond",
                "status": status,
                "impact_level": impact,
                "milestones": items,
            }));
            let once = SAMPLE.narrow(input).unwrap();
            let twice = SAMPLE.narrow(once.clone()).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn clean_list_keeps_order_of_non_blank_items(items in prop::collection::vec("[ a-c]{0,3}", 0..12)) {
            let cleaned = clean_list(items.iter().map(String::as_str));
            let expected: Vec<String> = items.iter().filter(|s| !s.trim().is_empty()).cloned().collect();
            prop_assert!(cleaned.iter().all(|s| !s.trim().is_empty()));
            prop_assert_eq!(cleaned, expected);
        }
    }
}

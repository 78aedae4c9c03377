use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
}

/// Transient user-facing feedback. Fire-and-forget: nothing is returned and
/// nothing is persisted.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NoticeKind, title: &str, description: &str);

    fn success(&self, description: &str) {
        self.notify(NoticeKind::Success, "Success", description);
    }

    fn error(&self, description: &str) {
        self.notify(NoticeKind::Error, "Error", description);
    }
}

/// Emits notices as log events; the CLI's stand-in for toasts.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NoticeKind, title: &str, description: &str) {
        match kind {
            NoticeKind::Success => {
                info!(target: "together", event = "notice", kind = "success", title, description)
            }
            NoticeKind::Error => {
                warn!(target: "together", event = "notice", kind = "error", title, description)
            }
        }
    }
}

/// Keeps every notice in memory so callers can inspect what the user saw.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    pub fn count(&self, kind: NoticeKind) -> usize {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|n| n.kind == kind)
            .count()
    }

    pub fn clear(&self) {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NoticeKind, title: &str, description: &str) {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Notice {
                kind,
                title: title.to_string(),
                description: description.to_string(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_shares_state_between_clones() {
        let notifier = RecordingNotifier::new();
        let handle = notifier.clone();
        handle.success("Goal added successfully");
        handle.error("Failed to delete goal");

        assert_eq!(notifier.notices().len(), 2);
        assert_eq!(notifier.count(NoticeKind::Error), 1);
        let last = notifier.last().unwrap();
        assert_eq!(last.title, "Error");
        assert_eq!(last.description, "Failed to delete goal");

        notifier.clear();
        assert!(handle.notices().is_empty());
    }

    #[test]
    fn notice_serializes_kind_in_lowercase() {
        let notice = Notice {
            kind: NoticeKind::Success,
            title: "Success".into(),
            description: "Book added successfully".into(),
        };
        let value = serde_json::to_value(notice).unwrap();
        assert_eq!(value["kind"], "success");
    }
}

//! Work item data model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stage::{ImageHandle, SourceImage};

/// Stable identifier assigned when an item is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Pipeline status of a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    /// Waiting to be claimed
    Pending,
    /// Vision stage in flight
    Analyzing,
    /// Generation stage in flight
    Generating,
    Completed,
    Error,
}

impl WorkflowStatus {
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Analyzing | Self::Generating)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Analyzing => "analyzing",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of batch work.
///
/// `result_image` is present only when `Completed`, `last_error` only when
/// `Error`. The store does not enforce this; the scheduler and the retry
/// command build patches that keep it.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: ItemId,
    pub source: SourceImage,
    pub status: WorkflowStatus,
    /// `Some("")` while analysis is running but has produced no text yet.
    pub derived_prompt: Option<String>,
    pub result_image: Option<ImageHandle>,
    pub last_error: Option<String>,
    pub progress_notes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn new(mut source: SourceImage) -> Self {
        let now = Utc::now();
        let id = ItemId::new();
        if source.preview.is_empty() {
            source.preview = format!("memory:{}", id);
        }
        Self {
            id,
            source,
            status: WorkflowStatus::Pending,
            derived_prompt: None,
            result_image: None,
            last_error: None,
            progress_notes: vec!["Queued...".to_string()],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.source.file_name
    }
}

/// Partial field changes merged into an item by [`super::WorkItemStore::update`].
///
/// Double options distinguish "leave as is" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub status: Option<WorkflowStatus>,
    pub derived_prompt: Option<Option<String>>,
    pub result_image: Option<Option<ImageHandle>>,
    pub last_error: Option<Option<String>>,
    pub notes: NotesPatch,
}

#[derive(Debug, Clone, Default)]
pub enum NotesPatch {
    #[default]
    Keep,
    Append(String),
    Replace(Vec<String>),
}

impl ItemPatch {
    pub fn status(status: WorkflowStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.derived_prompt = Some(Some(prompt.into()));
        self
    }

    pub fn clear_prompt(mut self) -> Self {
        self.derived_prompt = Some(None);
        self
    }

    pub fn with_result(mut self, handle: ImageHandle) -> Self {
        self.result_image = Some(Some(handle));
        self
    }

    pub fn clear_result(mut self) -> Self {
        self.result_image = Some(None);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.last_error = Some(Some(message.into()));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.last_error = Some(None);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes = NotesPatch::Append(note.into());
        self
    }

    pub fn replace_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = NotesPatch::Replace(notes);
        self
    }

    /// Claim: `Pending -> Analyzing` with an empty in-progress prompt.
    pub fn analyzing() -> Self {
        Self::status(WorkflowStatus::Analyzing)
            .with_prompt("")
            .note("Analyzing image...")
    }

    pub fn generating(prompt: impl Into<String>) -> Self {
        Self::status(WorkflowStatus::Generating)
            .with_prompt(prompt)
            .note("Generating image...")
    }

    pub fn completed(handle: ImageHandle) -> Self {
        Self::status(WorkflowStatus::Completed)
            .with_result(handle)
            .clear_error()
            .note("Completed.")
    }

    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::status(WorkflowStatus::Error)
            .clear_result()
            .note(format!("Failed: {}", message))
            .with_error(message)
    }

    /// User retry: back to `Pending` with every scheduling-derived field cleared.
    pub fn retry() -> Self {
        Self::status(WorkflowStatus::Pending)
            .clear_error()
            .clear_result()
            .clear_prompt()
            .replace_notes(vec!["Retrying...".to_string()])
    }

    pub fn apply(self, item: &mut WorkItem) {
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some(prompt) = self.derived_prompt {
            item.derived_prompt = prompt;
        }
        if let Some(result) = self.result_image {
            item.result_image = result;
        }
        if let Some(error) = self.last_error {
            item.last_error = error;
        }
        match self.notes {
            NotesPatch::Keep => {}
            NotesPatch::Append(note) => item.progress_notes.push(note),
            NotesPatch::Replace(notes) => item.progress_notes = notes,
        }
        item.updated_at = Utc::now();
    }
}

/// Aggregate counts over the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
}

impl ProcessingStats {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a WorkItem>) -> Self {
        items.into_iter().fold(Self::default(), |mut acc, item| {
            acc.total += 1;
            match item.status {
                WorkflowStatus::Completed => acc.completed += 1,
                WorkflowStatus::Error => acc.failed += 1,
                WorkflowStatus::Pending => acc.pending += 1,
                WorkflowStatus::Analyzing | WorkflowStatus::Generating => {}
            }
            acc
        })
    }
}

/// Store mutation notifications.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    ItemsAdded {
        ids: Vec<ItemId>,
    },
    ItemUpdated {
        id: ItemId,
        status: WorkflowStatus,
        timestamp: DateTime<Utc>,
    },
    ItemRemoved {
        id: ItemId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> WorkItem {
        WorkItem::new(SourceImage::new("a.png", b"x".to_vec()))
    }

    #[test]
    fn new_item_is_pending_and_queued() {
        let item = item();
        assert_eq!(item.status, WorkflowStatus::Pending);
        assert_eq!(item.progress_notes, vec!["Queued...".to_string()]);
        assert!(item.derived_prompt.is_none());
    }

    #[test]
    fn in_memory_preview_is_keyed_by_item_id() {
        let a = item();
        let b = item();
        assert_eq!(a.source.preview, format!("memory:{}", a.id));
        assert_ne!(a.source.preview, b.source.preview);

        let from_disk = WorkItem::new(
            SourceImage::new("a.png", b"x".to_vec()).with_preview("/tmp/in/a.png"),
        );
        assert_eq!(from_disk.source.preview, "/tmp/in/a.png");
    }

    #[test]
    fn failed_then_retry_clears_fields() {
        let mut item = item();
        ItemPatch::analyzing().apply(&mut item);
        assert_eq!(item.derived_prompt.as_deref(), Some(""));

        ItemPatch::failed("boom").apply(&mut item);
        assert_eq!(item.status, WorkflowStatus::Error);
        assert_eq!(item.last_error.as_deref(), Some("boom"));
        assert!(item.result_image.is_none());

        ItemPatch::retry().apply(&mut item);
        assert_eq!(item.status, WorkflowStatus::Pending);
        assert!(item.last_error.is_none());
        assert!(item.derived_prompt.is_none());
        assert_eq!(item.progress_notes, vec!["Retrying...".to_string()]);
    }

    #[test]
    fn completed_carries_handle() {
        let mut item = item();
        ItemPatch::generating("a cat").apply(&mut item);
        ItemPatch::completed(ImageHandle::Url("https://x/1.png".into())).apply(&mut item);
        assert_eq!(item.status, WorkflowStatus::Completed);
        assert_eq!(item.derived_prompt.as_deref(), Some("a cat"));
        assert!(item.result_image.is_some());
        assert!(item.last_error.is_none());
    }

    #[test]
    fn stats_count_by_status() {
        let mut a = item();
        let b = item();
        let mut c = item();
        ItemPatch::completed(ImageHandle::Url("u".into())).apply(&mut a);
        ItemPatch::failed("x").apply(&mut c);
        let stats = ProcessingStats::from_items([&a, &b, &c]);
        assert_eq!(
            stats,
            ProcessingStats {
                total: 3,
                completed: 1,
                failed: 1,
                pending: 1
            }
        );
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::error::TaskError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn generate() -> Self { Self(Uuid::new_v4().to_string()) }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Identity of the user a collection belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Open,
    Complete,
}

impl TaskStatus {
    pub fn toggled(self) -> Self {
        match self { Self::Open => Self::Complete, Self::Complete => Self::Open }
    }

    pub fn as_str(self) -> &'static str {
        match self { Self::Open => "open", Self::Complete => "complete" }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for TaskStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "complete" => Ok(Self::Complete),
            other => Err(format!("invalid status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Sort weight: high 3, medium 2, low 1.
    pub fn rank(self) -> u8 {
        match self { Self::Low => 1, Self::Medium => 2, Self::High => 3 }
    }

    pub fn as_str(self) -> &'static str {
        match self { Self::Low => "low", Self::Medium => "medium", Self::High => "high" }
    }

    /// Next priority in low -> medium -> high -> low order.
    pub fn next(self) -> Self {
        match self { Self::Low => Self::Medium, Self::Medium => Self::High, Self::High => Self::Low }
    }

    pub fn prev(self) -> Self {
        match self { Self::Low => Self::High, Self::Medium => Self::Low, Self::High => Self::Medium }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Priority {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("invalid priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_id: OwnerId,
}

/// Fields supplied by the user when creating a task.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Self::default() }
    }
}

/// A partial update. `None` leaves a field untouched.
///
/// `description` is cleared by an empty (or whitespace-only) string, `due_date`
/// by an explicit `Some(None)` (JSON `null`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TaskChanges {
    pub fn status(status: TaskStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn normalize_title(title: &str) -> Result<String, TaskError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

pub fn normalize_description(description: Option<&str>) -> Option<String> {
    description.map(str::trim).filter(|d| !d.is_empty()).map(str::to_string)
}

impl Task {
    /// Builds a fresh task. The title is validated before anything is constructed.
    pub fn new(owner: OwnerId, input: NewTask, now: DateTime<Utc>) -> Result<Self, TaskError> {
        let title = normalize_title(&input.title)?;
        Ok(Self {
            id: TaskId::generate(),
            title,
            description: normalize_description(input.description.as_deref()),
            status: input.status.unwrap_or_default(),
            priority: input.priority.unwrap_or_default(),
            due_date: input.due_date,
            created_at: now,
            updated_at: now,
            owner_id: owner,
        })
    }

    /// Returns a copy with `changes` applied and `updated_at` set to `now`
    /// (never earlier than `created_at`).
    pub fn apply(&self, changes: TaskChanges, now: DateTime<Utc>) -> Result<Self, TaskError> {
        let mut next = self.clone();
        if let Some(title) = changes.title { next.title = normalize_title(&title)?; }
        if let Some(desc) = changes.description { next.description = normalize_description(Some(&desc)); }
        if let Some(status) = changes.status { next.status = status; }
        if let Some(priority) = changes.priority { next.priority = priority; }
        if let Some(due) = changes.due_date { next.due_date = due; }
        next.updated_at = now.max(self.created_at);
        Ok(next)
    }

    pub fn is_complete(&self) -> bool { self.status == TaskStatus::Complete }

    /// Open with a due date strictly before `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Open && self.due_date.is_some_and(|due| due < now)
    }
}

//! Derives what the shells display from a task collection: the filtered,
//! ordered list and the summary counters. Everything here is pure.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::{Priority, Task, TaskStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Open,
    Complete,
}

impl StatusFilter {
    pub fn matches(self, status: TaskStatus) -> bool {
        match self {
            Self::All => true,
            Self::Open => status == TaskStatus::Open,
            Self::Complete => status == TaskStatus::Complete,
        }
    }

    pub fn next(self) -> Self {
        match self { Self::All => Self::Open, Self::Open => Self::Complete, Self::Complete => Self::All }
    }

    pub fn as_str(self) -> &'static str {
        match self { Self::All => "all", Self::Open => "open", Self::Complete => "complete" }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for StatusFilter {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            other => other.parse::<TaskStatus>().map(|status| match status {
                TaskStatus::Open => Self::Open,
                TaskStatus::Complete => Self::Complete,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityFilter {
    #[default]
    All,
    Low,
    Medium,
    High,
}

impl PriorityFilter {
    pub fn matches(self, priority: Priority) -> bool {
        match self {
            Self::All => true,
            Self::Low => priority == Priority::Low,
            Self::Medium => priority == Priority::Medium,
            Self::High => priority == Priority::High,
        }
    }

    pub fn next(self) -> Self {
        match self { Self::All => Self::Low, Self::Low => Self::Medium, Self::Medium => Self::High, Self::High => Self::All }
    }

    pub fn as_str(self) -> &'static str {
        match self { Self::All => "all", Self::Low => "low", Self::Medium => "medium", Self::High => "high" }
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for PriorityFilter {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            other => other.parse::<Priority>().map(|priority| match priority {
                Priority::Low => Self::Low,
                Priority::Medium => Self::Medium,
                Priority::High => Self::High,
            }),
        }
    }
}

/// Search text plus the two filters. The default shows everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    pub search_text: String,
    pub status_filter: StatusFilter,
    pub priority_filter: PriorityFilter,
}

impl Criteria {
    /// `needle` is the search text already lower-cased.
    fn includes(&self, task: &Task, needle: &str) -> bool {
        matches_search(task, needle)
            && self.status_filter.matches(task.status)
            && self.priority_filter.matches(task.priority)
    }
}

fn matches_search(task: &Task, needle: &str) -> bool {
    needle.is_empty()
        || task.title.to_lowercase().contains(needle)
        || task.description.as_deref().is_some_and(|d| d.to_lowercase().contains(needle))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
}

/// Display order: priority descending; at equal priority, due date ascending when
/// both tasks have one, otherwise newest first.
///
/// A task with a due date and one without are ordered by creation time, so this
/// is not a total order over mixed collections.
pub fn compare(a: &Task, b: &Task) -> Ordering {
    b.priority.rank().cmp(&a.priority.rank()).then_with(|| match (a.due_date, b.due_date) {
        (Some(a_due), Some(b_due)) => a_due.cmp(&b_due),
        _ => b.created_at.cmp(&a.created_at),
    })
}

/// Filtered, ordered copy of `tasks` for display.
pub fn derive_view(tasks: &[Task], criteria: &Criteria) -> Vec<Task> {
    let needle = criteria.search_text.to_lowercase();
    let selected: Vec<&Task> = tasks.iter().filter(|t| criteria.includes(t, &needle)).collect();
    merge_sort(selected).into_iter().cloned().collect()
}

/// Counters over the whole collection, ignoring any criteria.
pub fn derive_stats(tasks: &[Task], now: DateTime<Utc>) -> TaskStats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.is_complete()).count();
    let overdue = tasks.iter().filter(|t| t.is_overdue(now)).count();
    TaskStats { total, completed, pending: total - completed, overdue }
}

// `slice::sort_by` may panic when the comparator is not a total order, which
// `compare` is not. A plain stable merge sort tolerates it.
fn merge_sort(mut items: Vec<&Task>) -> Vec<&Task> {
    if items.len() <= 1 {
        return items;
    }
    let right = merge_sort(items.split_off(items.len() / 2));
    let left = merge_sort(items);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare(r, l) == Ordering::Less,
            _ => break,
        };
        if take_right {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    merged
}

use chrono::{DateTime, Utc};

use super::error::{TaskError, TaskResult};
use super::task::{NewTask, OwnerId, Task, TaskChanges, TaskId};

/// One owner's tasks, held in memory. Every mutation either fully applies or
/// leaves the collection untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCollection {
    owner: OwnerId,
    tasks: Vec<Task>,
}

impl TaskCollection {
    pub fn empty(owner: OwnerId) -> Self { Self { owner, tasks: Vec::new() } }

    /// Wraps a loaded snapshot, dropping records that belong to someone else.
    pub fn from_snapshot(owner: OwnerId, tasks: Vec<Task>) -> Self {
        let tasks = tasks.into_iter().filter(|t| t.owner_id == owner).collect();
        Self { owner, tasks }
    }

    pub fn owner(&self) -> &OwnerId { &self.owner }
    pub fn tasks(&self) -> &[Task] { &self.tasks }
    pub fn len(&self) -> usize { self.tasks.len() }
    pub fn is_empty(&self) -> bool { self.tasks.is_empty() }

    pub fn get(&self, id: &TaskId) -> Option<&Task> { self.tasks.iter().find(|t| &t.id == id) }

    pub fn add(&mut self, input: NewTask, now: DateTime<Utc>) -> TaskResult<Task> {
        let mut task = Task::new(self.owner.clone(), input, now)?;
        while self.get(&task.id).is_some() {
            task.id = TaskId::generate();
        }
        self.tasks.push(task.clone());
        Ok(task)
    }

    pub fn update(&mut self, id: &TaskId, changes: TaskChanges, now: DateTime<Utc>) -> TaskResult<Task> {
        let slot = self
            .tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;
        let updated = slot.apply(changes, now)?;
        *slot = updated.clone();
        Ok(updated)
    }

    pub fn toggle_status(&mut self, id: &TaskId, now: DateTime<Utc>) -> TaskResult<Task> {
        let status = self.get(id).ok_or_else(|| TaskError::NotFound(id.clone()))?.status;
        self.update(id, TaskChanges::status(status.toggled()), now)
    }

    pub fn remove(&mut self, id: &TaskId) -> TaskResult<Task> {
        let index = self
            .tasks
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;
        Ok(self.tasks.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::TaskStatus;

    fn collection() -> TaskCollection { TaskCollection::empty(OwnerId("alice".into())) }

    #[test]
    fn add_assigns_owner_and_unique_ids() {
        let mut tasks = collection();
        let a = tasks.add(NewTask::titled("a"), Utc::now()).unwrap();
        let b = tasks.add(NewTask::titled("b"), Utc::now()).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.owner_id, OwnerId("alice".into()));
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn blank_title_leaves_collection_unchanged() {
        let mut tasks = collection();
        tasks.add(NewTask::titled("keep"), Utc::now()).unwrap();
        let before = tasks.clone();
        assert!(matches!(tasks.add(NewTask::titled("   "), Utc::now()), Err(TaskError::EmptyTitle)));
        assert_eq!(tasks, before);
    }

    #[test]
    fn toggle_flips_status_both_ways() {
        let mut tasks = collection();
        let task = tasks.add(NewTask::titled("flip"), Utc::now()).unwrap();
        assert_eq!(tasks.toggle_status(&task.id, Utc::now()).unwrap().status, TaskStatus::Complete);
        assert_eq!(tasks.toggle_status(&task.id, Utc::now()).unwrap().status, TaskStatus::Open);
    }

    #[test]
    fn missing_ids_are_reported() {
        let mut tasks = collection();
        let id = TaskId("nope".into());
        assert!(matches!(tasks.remove(&id), Err(TaskError::NotFound(_))));
        assert!(matches!(tasks.update(&id, TaskChanges::default(), Utc::now()), Err(TaskError::NotFound(_))));
    }

    #[test]
    fn snapshot_drops_foreign_records() {
        let mut other = TaskCollection::empty(OwnerId("bob".into()));
        let foreign = other.add(NewTask::titled("bob's"), Utc::now()).unwrap();
        let tasks = TaskCollection::from_snapshot(OwnerId("alice".into()), vec![foreign]);
        assert!(tasks.is_empty());
    }
}

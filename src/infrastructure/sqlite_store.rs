use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::domain::{
    store::TaskStore,
    task::{OwnerId, Task},
};

use super::kv::SqliteKeyValue;

/// Stores each owner's collection as one JSON document under `tasks_{owner}`.
#[derive(Clone)]
pub struct SqliteTaskStore {
    kv: SqliteKeyValue,
}

impl SqliteTaskStore {
    pub fn new(kv: SqliteKeyValue) -> Self { Self { kv } }

    pub fn storage(&self) -> &SqliteKeyValue { &self.kv }

    pub fn key(owner: &OwnerId) -> String { format!("tasks_{}", owner.0) }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn init(&self) -> Result<()> { self.kv.init().await }

    async fn load_all(&self, owner: &OwnerId) -> Result<Vec<Task>> {
        let Some(raw) = self.kv.get(&Self::key(owner)).await? else { return Ok(Vec::new()) };
        let tasks: Vec<Task> = serde_json::from_str(&raw)
            .with_context(|| format!("corrupt task collection for owner {owner}"))?;
        let loaded = tasks.len();
        let tasks: Vec<Task> = tasks.into_iter().filter(|t| &t.owner_id == owner).collect();
        if tasks.len() != loaded {
            tracing::warn!(%owner, dropped = loaded - tasks.len(), "ignoring tasks owned by another user");
        }
        tracing::debug!(%owner, count = tasks.len(), "loaded tasks");
        Ok(tasks)
    }

    async fn save_all(&self, owner: &OwnerId, tasks: &[Task]) -> Result<()> {
        let raw = serde_json::to_string(tasks)?;
        self.kv.set(&Self::key(owner), &raw).await?;
        tracing::debug!(%owner, count = tasks.len(), "saved tasks");
        Ok(())
    }

    async fn clear(&self, owner: &OwnerId) -> Result<()> {
        self.kv.remove(&Self::key(owner)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use crate::domain::task::{NewTask, Priority};

    async fn store() -> SqliteTaskStore {
        let kv = SqliteKeyValue::connect("sqlite::memory:").await.unwrap();
        let store = SqliteTaskStore::new(kv);
        store.init().await.unwrap();
        store
    }

    fn sample(owner: &OwnerId) -> Vec<Task> {
        let now = Utc::now();
        let full = NewTask {
            title: "Write report".into(),
            description: Some("quarterly".into()),
            priority: Some(Priority::High),
            due_date: Some(now + Duration::days(2)),
            status: None,
        };
        vec![
            Task::new(owner.clone(), full, now).unwrap(),
            Task::new(owner.clone(), NewTask::titled("bare"), now).unwrap(),
        ]
    }

    #[tokio::test]
    async fn round_trips_every_field() {
        let store = store().await;
        let owner = OwnerId("a".into());
        let tasks = sample(&owner);
        store.save_all(&owner, &tasks).await.unwrap();
        assert_eq!(store.load_all(&owner).await.unwrap(), tasks);
    }

    #[tokio::test]
    async fn resaving_loaded_tasks_is_byte_stable() {
        let store = store().await;
        let owner = OwnerId("a".into());
        store.save_all(&owner, &sample(&owner)).await.unwrap();

        let loaded = store.load_all(&owner).await.unwrap();
        store.save_all(&owner, &loaded).await.unwrap();
        let once = store.storage().get(&SqliteTaskStore::key(&owner)).await.unwrap();

        let loaded = store.load_all(&owner).await.unwrap();
        store.save_all(&owner, &loaded).await.unwrap();
        let twice = store.storage().get(&SqliteTaskStore::key(&owner)).await.unwrap();

        assert_eq!(once, twice);
        assert!(!once.unwrap().contains("null"));
    }

    #[tokio::test]
    async fn owners_are_isolated() {
        let store = store().await;
        let (a, b) = (OwnerId("a".into()), OwnerId("b".into()));
        store.save_all(&a, &sample(&a)).await.unwrap();
        assert!(store.load_all(&b).await.unwrap().is_empty());

        // A document written under the wrong key still only yields its owner's tasks.
        store.save_all(&b, &sample(&a)).await.unwrap();
        assert!(store.load_all(&b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_removes_collection() {
        let store = store().await;
        let owner = OwnerId("a".into());
        store.save_all(&owner, &sample(&owner)).await.unwrap();
        store.clear(&owner).await.unwrap();
        assert!(store.load_all(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_document_is_an_error() {
        let store = store().await;
        let owner = OwnerId("a".into());
        store.storage().set(&SqliteTaskStore::key(&owner), "not json").await.unwrap();
        assert!(store.load_all(&owner).await.is_err());
    }
}

use async_trait::async_trait;
use super::task::{OwnerId, Task};

/// Persistent, per-owner snapshot storage for task collections.
#[async_trait]
pub trait TaskStore: Send + Sync + 'static {
    async fn init(&self) -> anyhow::Result<()>;
    async fn load_all(&self, owner: &OwnerId) -> anyhow::Result<Vec<Task>>;
    async fn save_all(&self, owner: &OwnerId, tasks: &[Task]) -> anyhow::Result<()>;
    async fn clear(&self, owner: &OwnerId) -> anyhow::Result<()>;
}

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{
    collection::TaskCollection,
    error::{TaskError, TaskResult},
    identity::{IdentityProvider, User},
    store::TaskStore,
    task::{NewTask, Task, TaskChanges, TaskId},
    view::{derive_stats, derive_view, Criteria, TaskStats},
};

#[async_trait]
pub trait TaskService: Send + Sync + 'static {
    /// Picks up a user that is still signed in from a previous run.
    async fn restore(&self) -> TaskResult<Option<User>>;
    async fn sign_in(&self, user: User) -> TaskResult<User>;
    async fn sign_out(&self) -> TaskResult<()>;
    async fn current_user(&self) -> Option<User>;
    async fn refresh(&self) -> TaskResult<()>;
    async fn create(&self, input: NewTask) -> TaskResult<Task>;
    async fn get(&self, id: TaskId) -> TaskResult<Task>;
    async fn update(&self, id: TaskId, changes: TaskChanges) -> TaskResult<Task>;
    async fn toggle(&self, id: TaskId) -> TaskResult<Task>;
    async fn delete(&self, id: TaskId) -> TaskResult<Task>;
    async fn view(&self, criteria: Criteria) -> TaskResult<Vec<Task>>;
    async fn stats(&self) -> TaskResult<TaskStats>;
    /// View and counters taken from the same state of the collection.
    async fn snapshot(&self, criteria: Criteria) -> TaskResult<Snapshot>;
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub items: Vec<Task>,
    pub stats: TaskStats,
}

/// Restores the remembered user, or signs in `fallback` when there is none.
///
/// If the session opened but its tasks could not be loaded, the failure is
/// returned as a notice for the caller to show. Any other error is returned.
pub async fn start_session<T: TaskService>(service: &T, fallback: User) -> TaskResult<Option<String>> {
    let opened = match service.restore().await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => service.sign_in(fallback).await.map(|_| ()),
        Err(e) => Err(e),
    };
    match opened {
        Ok(()) => Ok(None),
        Err(TaskError::Storage(e)) => match service.current_user().await {
            Some(_) => Ok(Some(format!("Could not load tasks: {e}"))),
            None => Err(TaskError::Storage(e)),
        },
        Err(e) => Err(e),
    }
}

struct Session {
    user: User,
    tasks: TaskCollection,
}

/// Owns the signed-in user's collection. All reads and writes go through one
/// lock, so a load-mutate-save cycle never interleaves with another.
#[derive(Clone)]
pub struct TaskServiceImpl<S: TaskStore, I: IdentityProvider> {
    store: Arc<S>,
    identity: Arc<I>,
    session: Arc<Mutex<Option<Session>>>,
}

impl<S: TaskStore, I: IdentityProvider> TaskServiceImpl<S, I> {
    pub fn new(store: S, identity: I) -> Self {
        Self { store: Arc::new(store), identity: Arc::new(identity), session: Arc::new(Mutex::new(None)) }
    }

    /// Loads `user`'s collection into a fresh session. A failed load still
    /// opens the session, with no tasks.
    async fn open_session(&self, slot: &mut Option<Session>, user: User) -> TaskResult<()> {
        let owner = user.owner_id();
        let (tasks, loaded) = match self.store.load_all(&owner).await {
            Ok(tasks) => (TaskCollection::from_snapshot(owner, tasks), Ok(())),
            Err(e) => {
                tracing::warn!(%owner, error = %e, "could not load tasks");
                (TaskCollection::empty(owner), Err(TaskError::from(e)))
            }
        };
        tracing::info!(owner = %tasks.owner(), count = tasks.len(), "session opened");
        *slot = Some(Session { user, tasks });
        loaded
    }

    /// Applies `op` to a copy of the collection, persists the copy and only
    /// then makes it current.
    async fn mutate<T, F>(&self, op: F) -> TaskResult<T>
    where
        T: Send,
        F: FnOnce(&mut TaskCollection, DateTime<Utc>) -> TaskResult<T> + Send,
    {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(TaskError::NotSignedIn)?;
        let mut next = session.tasks.clone();
        let out = op(&mut next, Utc::now())?;
        if let Err(e) = self.store.save_all(next.owner(), next.tasks()).await {
            tracing::warn!(owner = %next.owner(), error = %e, "could not save tasks");
            return Err(e.into());
        }
        session.tasks = next;
        Ok(out)
    }

    async fn read<T, F>(&self, op: F) -> TaskResult<T>
    where
        T: Send,
        F: FnOnce(&TaskCollection) -> TaskResult<T> + Send,
    {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(TaskError::NotSignedIn)?;
        op(&session.tasks)
    }
}

#[async_trait]
impl<S: TaskStore, I: IdentityProvider> TaskService for TaskServiceImpl<S, I> {
    async fn restore(&self) -> TaskResult<Option<User>> {
        let mut guard = self.session.lock().await;
        let Some(user) = self.identity.current_user().await? else { return Ok(None) };
        self.open_session(&mut guard, user.clone()).await?;
        Ok(Some(user))
    }

    async fn sign_in(&self, user: User) -> TaskResult<User> {
        let mut guard = self.session.lock().await;
        let user = self.identity.sign_in(user).await?;
        self.open_session(&mut guard, user.clone()).await?;
        Ok(user)
    }

    async fn sign_out(&self) -> TaskResult<()> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            self.store.clear(session.tasks.owner()).await?;
            tracing::info!(owner = %session.tasks.owner(), "cleared tasks on sign out");
        }
        self.identity.sign_out().await?;
        *guard = None;
        Ok(())
    }

    async fn current_user(&self) -> Option<User> {
        self.session.lock().await.as_ref().map(|s| s.user.clone())
    }

    async fn refresh(&self) -> TaskResult<()> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(TaskError::NotSignedIn)?;
        let owner = session.tasks.owner().clone();
        match self.store.load_all(&owner).await {
            Ok(tasks) => {
                session.tasks = TaskCollection::from_snapshot(owner, tasks);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%owner, error = %e, "could not reload tasks");
                session.tasks = TaskCollection::empty(owner);
                Err(e.into())
            }
        }
    }

    async fn create(&self, input: NewTask) -> TaskResult<Task> {
        let task = self.mutate(|tasks, now| tasks.add(input, now)).await?;
        tracing::debug!(id = %task.id, "task created");
        Ok(task)
    }

    async fn get(&self, id: TaskId) -> TaskResult<Task> {
        self.read(|tasks| tasks.get(&id).cloned().ok_or_else(|| TaskError::NotFound(id.clone()))).await
    }

    async fn update(&self, id: TaskId, changes: TaskChanges) -> TaskResult<Task> {
        let task = self.mutate(|tasks, now| tasks.update(&id, changes, now)).await?;
        tracing::debug!(id = %task.id, "task updated");
        Ok(task)
    }

    async fn toggle(&self, id: TaskId) -> TaskResult<Task> {
        let task = self.mutate(|tasks, now| tasks.toggle_status(&id, now)).await?;
        tracing::debug!(id = %task.id, status = %task.status, "task toggled");
        Ok(task)
    }

    async fn delete(&self, id: TaskId) -> TaskResult<Task> {
        let task = self.mutate(|tasks, _| tasks.remove(&id)).await?;
        tracing::debug!(id = %task.id, "task deleted");
        Ok(task)
    }

    async fn view(&self, criteria: Criteria) -> TaskResult<Vec<Task>> {
        self.read(|tasks| Ok(derive_view(tasks.tasks(), &criteria))).await
    }

    async fn stats(&self) -> TaskResult<TaskStats> {
        self.read(|tasks| Ok(derive_stats(tasks.tasks(), Utc::now()))).await
    }

    async fn snapshot(&self, criteria: Criteria) -> TaskResult<Snapshot> {
        self.read(|tasks| {
            Ok(Snapshot {
                items: derive_view(tasks.tasks(), &criteria),
                stats: derive_stats(tasks.tasks(), Utc::now()),
            })
        })
        .await
    }
}

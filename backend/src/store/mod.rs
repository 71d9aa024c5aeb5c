//! Task persistence.
//!
//! [`TaskStore`] is the only seam between the service and the storage
//! engine. Two backends are provided:
//!
//! - [`InMemoryTaskStore`]: process-local, used by default and by the tests
//! - [`RedisTaskStore`]: durable, selected with `STORAGE_MODE=redis`
//!
//! Both backends perform the existence and frozen checks of
//! [`TaskStore::update`] atomically with the write, so a task completed by a
//! concurrent request can never be overwritten.

mod memory;
mod redis;

pub use memory::InMemoryTaskStore;
pub use self::redis::RedisTaskStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{NewTask, Task, TaskId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task {0} does not exist")]
    NotFound(TaskId),

    /// The stored record is completed and may no longer be written.
    #[error("task {0} is completed and cannot be overwritten")]
    Frozen(TaskId),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization(error.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Optional predicates narrowing a task query. Present predicates are
/// combined with AND; absent ones match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub completed: Option<bool>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
}

impl TaskFilter {
    /// True when no predicate is set, so every task matches.
    pub fn is_unrestricted(&self) -> bool {
        *self == Self::default()
    }

    /// A task without a due date never satisfies a due date bound.
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(completed) = self.completed {
            if task.completed != completed {
                return false;
            }
        }
        if let Some(from) = self.due_from {
            if !task.due_date.is_some_and(|due| due >= from) {
                return false;
            }
        }
        if let Some(to) = self.due_to {
            if !task.due_date.is_some_and(|due| due <= to) {
                return false;
            }
        }
        true
    }
}

/// Zero-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub const fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    pub fn offset(&self) -> usize {
        (u64::from(self.page) * u64::from(self.size))
            .try_into()
            .unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Filters `tasks` (already in storage order) and cuts out the requested page.
pub(crate) fn paginate<I>(tasks: I, filter: &TaskFilter, request: PageRequest) -> Page<Task>
where
    I: IntoIterator<Item = Task>,
{
    let matching: Vec<Task> = tasks.into_iter().filter(|task| filter.matches(task)).collect();
    let total = matching.len() as u64;
    let items = matching
        .into_iter()
        .skip(request.offset())
        .take(request.size as usize)
        .collect();
    Page { items, total }
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Assigns a fresh id and persists the task.
    async fn insert(&self, task: NewTask) -> StoreResult<Task>;

    async fn find_by_id(&self, id: TaskId) -> StoreResult<Option<Task>>;

    /// Every task, in insertion order.
    async fn find_all(&self) -> StoreResult<Vec<Task>>;

    async fn find_filtered(&self, filter: &TaskFilter, page: PageRequest)
        -> StoreResult<Page<Task>>;

    /// Overwrites the record with `task.id`.
    ///
    /// Fails with [`StoreError::NotFound`] if no such record exists and with
    /// [`StoreError::Frozen`] if the stored record is already completed.
    async fn update(&self, task: &Task) -> StoreResult<Task>;

    async fn delete(&self, id: TaskId) -> StoreResult<()>;
}

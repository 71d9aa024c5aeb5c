//! Task use cases.
//!
//! Every read-modify-write operation follows the same shape: load the task
//! (or fail with [`TaskError::NotFound`]), run the applicable rules, apply the
//! change and persist it through the [`TaskStore`].

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use shared::{GroupedTasks, NewTask, Presence, Task, TaskId, TaskPage, TaskPatchRequest, TaskRequest};

use crate::error::{TaskError, TaskResult};
use crate::rules::{self, Violations};
use crate::store::{PageRequest, StoreError, TaskFilter, TaskStore};

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    today: fn() -> NaiveDate,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self::with_clock(store, local_today)
    }

    /// Uses `today` instead of the local calendar date when validating due dates.
    pub fn with_clock(store: Arc<dyn TaskStore>, today: fn() -> NaiveDate) -> Self {
        Self { store, today }
    }

    #[tracing::instrument(skip_all)]
    pub async fn create(&self, request: TaskRequest) -> TaskResult<Task> {
        let today = (self.today)();
        let mut violations = Violations::new();
        violations
            .check(rules::check_title(request.title.as_deref(), rules::TITLE_REQUIRED))
            .check(rules::check_due_date(request.due_date, today));
        violations.finish()?;

        let new_task = NewTask {
            title: request.title.unwrap_or_default(),
            description: request.description,
            due_date: request.due_date,
        };
        let task = self.store.insert(new_task).await?;
        tracing::info!(task_id = task.id, "task created");
        Ok(task)
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn replace(&self, id: TaskId, request: TaskRequest) -> TaskResult<Task> {
        let mut task = self.load(id).await?;
        rules::ensure_editable(&task, rules::REPLACE_COMPLETED).inspect_err(log_rejection)?;

        let today = (self.today)();
        let mut violations = Violations::new();
        violations
            .check(rules::check_title(request.title.as_deref(), rules::TITLE_REQUIRED))
            .check(rules::check_due_date(request.due_date, today));
        violations.finish()?;

        task.title = request.title.unwrap_or_default();
        task.description = request.description;
        task.due_date = request.due_date;

        let task = self.persist(&task, rules::REPLACE_COMPLETED).await?;
        tracing::info!("task replaced");
        Ok(task)
    }

    /// The only operation that sets `completed`.
    #[tracing::instrument(skip(self))]
    pub async fn complete(&self, id: TaskId) -> TaskResult<Task> {
        let mut task = self.load(id).await?;
        rules::ensure_not_completed(&task).inspect_err(log_rejection)?;

        task.completed = true;
        let task = self.persist(&task, rules::ALREADY_COMPLETED).await?;
        tracing::info!("task completed");
        Ok(task)
    }

    /// Overwrites only the fields carrying a value in `patch`. Omitted and
    /// `null` fields are left unchanged, so an empty patch is a successful
    /// no-op.
    #[tracing::instrument(skip(self, patch))]
    pub async fn partial_update(&self, id: TaskId, patch: TaskPatchRequest) -> TaskResult<Task> {
        let mut task = self.load(id).await?;
        rules::ensure_editable(&task, rules::MODIFY_COMPLETED).inspect_err(log_rejection)?;

        let today = (self.today)();
        let mut violations = Violations::new();
        if let Presence::Present(Some(title)) = &patch.title {
            violations.check(rules::check_title(Some(title.as_str()), rules::TITLE_EMPTY));
        }
        if let Presence::Present(Some(due_date)) = &patch.due_date {
            violations.check(rules::check_due_date(Some(*due_date), today));
        }
        violations.finish()?;

        if let Presence::Present(Some(title)) = patch.title {
            task.title = title;
        }
        if let Presence::Present(Some(due_date)) = patch.due_date {
            task.due_date = Some(due_date);
        }

        let task = self.persist(&task, rules::MODIFY_COMPLETED).await?;
        tracing::info!("task patched");
        Ok(task)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: TaskId) -> TaskResult<()> {
        self.load(id).await?;
        self.store.delete(id).await.map_err(|error| match error {
            StoreError::NotFound(id) => TaskError::NotFound(id),
            other => TaskError::Store(other),
        })?;
        tracing::info!("task deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: TaskId) -> TaskResult<Task> {
        self.load(id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_filtered(&self, filter: TaskFilter, page: PageRequest) -> TaskResult<TaskPage> {
        let result = self.store.find_filtered(&filter, page).await?;
        let total_pages = if page.size == 0 {
            0
        } else {
            result.total.div_ceil(u64::from(page.size))
        };
        Ok(TaskPage {
            content: result.items,
            total: result.total,
            page: page.page,
            size: page.size,
            total_pages,
        })
    }

    /// Splits every task by completion, keeping storage order inside each group.
    pub async fn group_by_completion(&self) -> TaskResult<GroupedTasks> {
        let (completed, active): (Vec<Task>, Vec<Task>) = self
            .store
            .find_all()
            .await?
            .into_iter()
            .partition(|task| task.completed);
        Ok(GroupedTasks { completed, active })
    }

    async fn load(&self, id: TaskId) -> TaskResult<Task> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(TaskError::NotFound(id))
    }

    /// Writes `task` back. `frozen_message` is reported when a concurrent
    /// request completed the task after it was loaded.
    async fn persist(&self, task: &Task, frozen_message: &str) -> TaskResult<Task> {
        self.store.update(task).await.map_err(|error| match error {
            StoreError::NotFound(id) => TaskError::NotFound(id),
            StoreError::Frozen(id) => {
                tracing::warn!(task_id = id, "task was completed concurrently");
                TaskError::BusinessRule(frozen_message.to_string())
            }
            other => TaskError::Store(other),
        })
    }
}

fn log_rejection(error: &TaskError) {
    tracing::warn!(%error, "rejected by task rules");
}

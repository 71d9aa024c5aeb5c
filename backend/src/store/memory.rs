use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use shared::{NewTask, Task, TaskId};
use tokio::sync::RwLock;

use super::{paginate, Page, PageRequest, StoreError, StoreResult, TaskFilter, TaskStore};

/// Process-local store. Ids come from a counter starting at 1, so the
/// `BTreeMap` iteration order is insertion order.
#[derive(Debug, Clone)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<BTreeMap<TaskId, Task>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: NewTask) -> StoreResult<Task> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let task = task.into_task(id);
        self.tasks.write().await.insert(id, task.clone());
        Ok(task)
    }

    async fn find_by_id(&self, id: TaskId) -> StoreResult<Option<Task>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<Task>> {
        Ok(self.tasks.read().await.values().cloned().collect())
    }

    async fn find_filtered(
        &self,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Task>> {
        let tasks = self.tasks.read().await;
        Ok(paginate(tasks.values().cloned(), filter, page))
    }

    async fn update(&self, task: &Task) -> StoreResult<Task> {
        let mut tasks = self.tasks.write().await;
        let stored = tasks
            .get_mut(&task.id)
            .ok_or(StoreError::NotFound(task.id))?;
        if stored.completed {
            return Err(StoreError::Frozen(task.id));
        }
        *stored = task.clone();
        Ok(task.clone())
    }

    async fn delete(&self, id: TaskId) -> StoreResult<()> {
        self.tasks
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> InMemoryTaskStore {
        InMemoryTaskStore::new()
    }

    #[rstest]
    #[tokio::test]
    async fn insert_assigns_increasing_ids(store: InMemoryTaskStore) {
        let first = store
            .insert(NewTask::new("first").with_description("details"))
            .await
            .unwrap();
        let second = store.insert(NewTask::new("second")).await.unwrap();

        assert!(second.id > first.id);
        assert!(!first.completed);
        assert_eq!(first.description.as_deref(), Some("details"));
        assert_eq!(store.find_by_id(first.id).await.unwrap(), Some(first));
    }

    #[rstest]
    #[tokio::test]
    async fn find_all_keeps_insertion_order(store: InMemoryTaskStore) {
        for title in ["a", "b", "c"] {
            store.insert(NewTask::new(title)).await.unwrap();
        }

        let titles: Vec<String> = store
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|task| task.title)
            .collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[rstest]
    #[tokio::test]
    async fn update_overwrites_active_task(store: InMemoryTaskStore) {
        let mut task = store.insert(NewTask::new("draft")).await.unwrap();
        task.title = "final".to_string();

        store.update(&task).await.unwrap();

        let stored = store.find_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "final");
    }

    #[rstest]
    #[tokio::test]
    async fn update_rejects_unknown_id(store: InMemoryTaskStore) {
        let ghost = NewTask::new("ghost").into_task(42);
        let result = store.update(&ghost).await;
        assert!(matches!(result, Err(StoreError::NotFound(42))));
    }

    #[rstest]
    #[tokio::test]
    async fn update_rejects_completed_record(store: InMemoryTaskStore) {
        let mut task = store.insert(NewTask::new("done")).await.unwrap();
        task.completed = true;
        store.update(&task).await.unwrap();

        task.title = "changed".to_string();
        let result = store.update(&task).await;

        assert!(matches!(result, Err(StoreError::Frozen(id)) if id == task.id));
        let stored = store.find_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "done");
    }

    #[rstest]
    #[tokio::test]
    async fn delete_removes_and_then_reports_missing(store: InMemoryTaskStore) {
        let task = store.insert(NewTask::new("short lived")).await.unwrap();

        store.delete(task.id).await.unwrap();

        assert_eq!(store.find_by_id(task.id).await.unwrap(), None);
        assert!(matches!(
            store.delete(task.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn find_filtered_reports_total_across_pages(store: InMemoryTaskStore) {
        for index in 0..5 {
            store
                .insert(NewTask::new(format!("task {index}")))
                .await
                .unwrap();
        }

        let page = store
            .find_filtered(&TaskFilter::default(), PageRequest::new(1, 2))
            .await
            .unwrap();

        assert_eq!(page.total, 5);
        assert_eq!(
            page.items.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(),
            vec!["task 2", "task 3"]
        );
    }
}

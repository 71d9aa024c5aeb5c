//! Redis-backed store.
//!
//! Key layout:
//!
//! - `task:{id}` -> JSON serialized [`Task`]
//! - `tasks:index` -> ZSET of ids, score = id, gives insertion order
//! - `tasks:next_id` -> counter used to allocate ids

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, Script};
use shared::{NewTask, Task, TaskId};

use super::{paginate, Page, PageRequest, StoreError, StoreResult, TaskFilter, TaskStore};

const TASK_KEY_PREFIX: &str = "task:";
const TASK_INDEX_KEY: &str = "tasks:index";
const NEXT_ID_KEY: &str = "tasks:next_id";

/// Overwrites a task only if it exists and is not completed.
/// Returns 1 on success, 0 when missing, -1 when the stored task is frozen.
const UPDATE_SCRIPT: &str = r"
local existing = redis.call('GET', KEYS[1])
if not existing then
    return 0
end
local ok, data = pcall(cjson.decode, existing)
if ok and data.completed == true then
    return -1
end
redis.call('SET', KEYS[1], ARGV[1])
return 1
";

fn task_key(id: TaskId) -> String {
    format!("{TASK_KEY_PREFIX}{id}")
}

impl From<redis::RedisError> for StoreError {
    fn from(error: redis::RedisError) -> Self {
        StoreError::Backend(error.to_string())
    }
}

pub struct RedisTaskStore {
    connection: MultiplexedConnection,
    update_script: Script,
}

impl RedisTaskStore {
    /// Opens a multiplexed connection that is shared by every request.
    pub async fn connect(redis_url: &str) -> StoreResult<Self> {
        let client = Client::open(redis_url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            connection,
            update_script: Script::new(UPDATE_SCRIPT),
        })
    }

    async fn load_many(&self, ids: &[TaskId]) -> StoreResult<Vec<Task>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = ids.iter().copied().map(task_key).collect();
        let mut connection = self.connection.clone();
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut connection)
            .await?;

        // An id can disappear between ZRANGE and MGET when a delete races us.
        values
            .into_iter()
            .flatten()
            .map(|json| serde_json::from_str(&json).map_err(StoreError::from))
            .collect()
    }
}

impl RedisTaskStore {
    /// Reads one page straight off the index without loading other tasks.
    async fn load_page(&self, page: PageRequest) -> StoreResult<Page<Task>> {
        let mut connection = self.connection.clone();
        let total: u64 = connection.zcard(TASK_INDEX_KEY).await?;
        let start = isize::try_from(page.offset()).unwrap_or(isize::MAX);
        if page.size == 0 || u64::try_from(start).unwrap_or(u64::MAX) >= total {
            return Ok(Page { items: Vec::new(), total });
        }
        let stop = start
            .saturating_add(isize::try_from(page.size).unwrap_or(isize::MAX))
            .saturating_sub(1);
        let ids: Vec<TaskId> = connection.zrange(TASK_INDEX_KEY, start, stop).await?;
        let items = self.load_many(&ids).await?;
        Ok(Page { items, total })
    }
}

#[async_trait]
impl TaskStore for RedisTaskStore {
    async fn insert(&self, task: NewTask) -> StoreResult<Task> {
        let mut connection = self.connection.clone();
        let id: TaskId = connection.incr(NEXT_ID_KEY, 1).await?;
        let task = task.into_task(id);
        let json = serde_json::to_string(&task)?;

        redis::pipe()
            .atomic()
            .set(task_key(id), json)
            .ignore()
            .zadd(TASK_INDEX_KEY, id, id)
            .ignore()
            .query_async::<_, ()>(&mut connection)
            .await?;

        tracing::debug!(task_id = id, "stored task in redis");
        Ok(task)
    }

    async fn find_by_id(&self, id: TaskId) -> StoreResult<Option<Task>> {
        let mut connection = self.connection.clone();
        let json: Option<String> = connection.get(task_key(id)).await?;
        json.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn find_all(&self) -> StoreResult<Vec<Task>> {
        let mut connection = self.connection.clone();
        let ids: Vec<TaskId> = connection.zrange(TASK_INDEX_KEY, 0, -1).await?;
        self.load_many(&ids).await
    }

    async fn find_filtered(
        &self,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Task>> {
        if filter.is_unrestricted() {
            return self.load_page(page).await;
        }
        // No secondary index on completion or due date: filtered queries scan
        // every task and paginate in process.
        let tasks = self.find_all().await?;
        Ok(paginate(tasks, filter, page))
    }

    async fn update(&self, task: &Task) -> StoreResult<Task> {
        let json = serde_json::to_string(task)?;
        let mut connection = self.connection.clone();
        let outcome: i64 = self
            .update_script
            .key(task_key(task.id))
            .arg(json)
            .invoke_async(&mut connection)
            .await?;

        match outcome {
            1 => Ok(task.clone()),
            0 => Err(StoreError::NotFound(task.id)),
            _ => Err(StoreError::Frozen(task.id)),
        }
    }

    async fn delete(&self, id: TaskId) -> StoreResult<()> {
        let mut connection = self.connection.clone();
        let (removed, _): (i64, i64) = redis::pipe()
            .atomic()
            .del(task_key(id))
            .zrem(TASK_INDEX_KEY, id)
            .query_async(&mut connection)
            .await?;

        if removed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type TaskId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
}

/// A task that has not been persisted yet, so it has no id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// New tasks always start out active.
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            completed: false,
        }
    }
}

/// Body of `POST /api/tasks` and `PUT /api/tasks/{id}`.
///
/// `title` is optional here only so that a missing title is reported as a
/// field error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Marks whether a client sent a field at all.
///
/// Used with `#[serde(default)]`: an omitted key stays `Absent`, any value
/// (including `null` when `T` is an `Option`) becomes `Present`. Pair with
/// `skip_serializing_if = "Presence::is_absent"` so `Absent` fields are left
/// out of serialized bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence<T> {
    Absent,
    Present(T),
}

impl<T> Presence<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Presence::Absent)
    }
}

impl<T> Default for Presence<T> {
    fn default() -> Self {
        Presence::Absent
    }
}

impl<T> From<T> for Presence<T> {
    fn from(value: T) -> Self {
        Presence::Present(value)
    }
}

impl<T: Serialize> Serialize for Presence<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Presence::Present(value) => value.serialize(serializer),
            Presence::Absent => serializer.serialize_none(),
        }
    }
}

impl<'de, T> Deserialize<'de> for Presence<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Presence::Present)
    }
}

/// Body of `PATCH /api/tasks/{id}`.
///
/// Only non-null values change the task: an omitted key and an explicit
/// `null` both leave the field as it is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatchRequest {
    #[serde(default, skip_serializing_if = "Presence::is_absent")]
    pub title: Presence<Option<String>>,
    #[serde(default, skip_serializing_if = "Presence::is_absent")]
    pub due_date: Presence<Option<NaiveDate>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    pub content: Vec<Task>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupedTasks {
    #[serde(rename = "true")]
    pub completed: Vec<Task>,
    #[serde(rename = "false")]
    pub active: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error payload returned by the API. Validation failures carry `errors`,
/// everything else carries a single `error` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Fields { errors: Vec<FieldError> },
    Message { error: String },
}

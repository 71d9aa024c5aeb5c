//! Business rules for tasks.
//!
//! Everything here is pure: the caller supplies the current record and, for
//! date checks, today's date. State checks fail fast with
//! [`TaskError::BusinessRule`]; field checks return a [`FieldError`] so that
//! [`Violations`] can report every bad field of a request at once.

use chrono::NaiveDate;
use shared::{FieldError, Task};

use crate::error::{TaskError, TaskResult};

pub const REPLACE_COMPLETED: &str = "Completed tasks cannot be edited.";
pub const MODIFY_COMPLETED: &str = "Cannot modify a completed task.";
pub const ALREADY_COMPLETED: &str = "Task is already completed.";

pub const TITLE_REQUIRED: &str = "Title is required";
pub const TITLE_EMPTY: &str = "Title must not be empty";
pub const DUE_DATE_IN_PAST: &str = "Due date must be today or in the future";

pub fn ensure_editable(task: &Task, message: &str) -> TaskResult<()> {
    if task.completed {
        return Err(TaskError::BusinessRule(message.to_string()));
    }
    Ok(())
}

pub fn ensure_not_completed(task: &Task) -> TaskResult<()> {
    if task.completed {
        return Err(TaskError::BusinessRule(ALREADY_COMPLETED.to_string()));
    }
    Ok(())
}

/// Blank means empty or whitespace only.
pub fn check_title(title: Option<&str>, message: &str) -> Result<(), FieldError> {
    match title {
        Some(title) if !title.trim().is_empty() => Ok(()),
        _ => Err(FieldError::new("title", message)),
    }
}

pub fn check_due_date(due_date: Option<NaiveDate>, today: NaiveDate) -> Result<(), FieldError> {
    match due_date {
        Some(date) if date < today => Err(FieldError::new("dueDate", DUE_DATE_IN_PAST)),
        _ => Ok(()),
    }
}

/// Collects field errors from several checks.
#[derive(Debug, Default)]
pub struct Violations(Vec<FieldError>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, outcome: Result<(), FieldError>) -> &mut Self {
        if let Err(error) = outcome {
            self.0.push(error);
        }
        self
    }

    pub fn finish(self) -> TaskResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(TaskError::Validation(self.0))
        }
    }
}

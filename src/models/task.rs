use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// The only keys a task PATCH body may contain.
pub const UPDATABLE_FIELDS: [&str; 2] = ["description", "completed"];

/// Page size used whenever `limit` and `skip` are not both supplied.
pub const DEFAULT_LIMIT: u32 = 10;

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    pub description: String,
    pub completed: bool,
    /// Identifier of the user who created the task.
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new `Task` owned by `owner` from validated input.
    pub fn new(input: TaskInput, owner: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            description: input.description,
            completed: input.completed,
            owner,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input structure for creating a task.
///
/// Any `owner` in the request body is ignored; the owner is always the caller.
#[derive(Debug, Deserialize, Validate)]
pub struct TaskInput {
    #[serde(default)]
    #[validate(length(min = 1, message = "Task description is required"))]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl TaskInput {
    pub fn normalized(self) -> Self {
        Self {
            description: self.description.trim().to_string(),
            completed: self.completed,
        }
    }
}

/// Partial update of a task.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TaskPatch {
    #[validate(length(min = 1, message = "Task description is required"))]
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn normalized(self) -> Self {
        Self {
            description: self.description.map(|d| d.trim().to_string()),
            completed: self.completed,
        }
    }
}

/// Raw query string of `GET /tasks`, before interpretation.
#[derive(Debug, Default, Deserialize)]
pub struct TaskListParams {
    pub completed: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Description,
    Completed,
}

impl SortField {
    fn parse(field: &str) -> Option<Self> {
        match field {
            "createdAt" => Some(SortField::CreatedAt),
            "updatedAt" => Some(SortField::UpdatedAt),
            "description" => Some(SortField::Description),
            "completed" => Some(SortField::Completed),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Description => "description",
            SortField::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSort {
    pub field: SortField,
    pub descending: bool,
}

/// Interpreted listing options: filter, page window and ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListQuery {
    pub completed: Option<bool>,
    /// `None` means no upper bound (`limit=0`).
    pub limit: Option<u32>,
    pub skip: u32,
    pub sort: Option<TaskSort>,
}

impl Default for TaskListQuery {
    fn default() -> Self {
        Self {
            completed: None,
            limit: Some(DEFAULT_LIMIT),
            skip: 0,
            sort: None,
        }
    }
}

impl TaskListQuery {
    /// Interprets the query string.
    ///
    /// `limit` and `skip` only take effect together; if either is missing or not a
    /// non-negative integer both fall back to the defaults.
    pub fn from_params(params: &TaskListParams) -> Self {
        let completed = params
            .completed
            .as_deref()
            .filter(|value| !value.is_empty())
            .map(|value| value == "true");

        let window = match (params.limit.as_deref(), params.skip.as_deref()) {
            (Some(limit), Some(skip)) => limit
                .trim()
                .parse::<u32>()
                .ok()
                .zip(skip.trim().parse::<u32>().ok()),
            _ => None,
        };
        let (limit, skip) = match window {
            Some((0, skip)) => (None, skip),
            Some((limit, skip)) => (Some(limit), skip),
            None => (Some(DEFAULT_LIMIT), 0),
        };

        let sort = params.sort_by.as_deref().and_then(|sort_by| {
            let mut parts = sort_by.splitn(2, '_');
            let field = SortField::parse(parts.next()?)?;
            Some(TaskSort {
                field,
                descending: parts.next() == Some("desc"),
            })
        });

        Self {
            completed,
            limit,
            skip,
            sort,
        }
    }
}

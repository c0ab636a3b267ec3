use crate::error::ServiceError;
use crate::store::{Record, TaskStore, store_key};
use crate::validation::{
    FieldRules, FieldType, Payload, Schema, as_number, parse_id_value, parse_required_id,
    validate,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use tokio::sync::RwLock;
use utoipa::ToSchema;

pub mod api;

/// Priority of a task. Serialized with its Portuguese name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
pub enum Priority {
    #[serde(rename = "baixa")]
    Baixa,
    #[default]
    #[serde(rename = "média")]
    Media,
    #[serde(rename = "alta")]
    Alta,
}

impl Priority {
    /// Accepted wire names, lowest priority first.
    pub const NAMES: &'static [&'static str] = &["baixa", "média", "alta"];

    /// Returns the wire name of the priority.
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Baixa => "baixa",
            Priority::Media => "média",
            Priority::Alta => "alta",
        }
    }

    /// Parses a wire name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "baixa" => Some(Priority::Baixa),
            "média" => Some(Priority::Media),
            "alta" => Some(Priority::Alta),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Sequential identifier, never reused
    pub id: u32,
    /// Between 3 and 100 characters
    pub title: String,
    /// Up to 500 characters
    pub description: String,
    pub completed: bool,
    pub priority: Priority,
    /// Category reference. Not checked against existing categories.
    pub category_id: Option<u32>,
    /// ISO 8601 date or timestamp
    pub due_date: Option<String>,
    pub tags: Vec<String>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime<Utc>,
}

impl Record for Task {
    fn id(&self) -> u32 {
        self.id
    }
}

static TASK_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new()
        .field(
            "title",
            FieldRules::of(FieldType::String)
                .required()
                .min_length(3)
                .max_length(100),
        )
        .field(
            "description",
            FieldRules::of(FieldType::String).max_length(500),
        )
        .field("completed", FieldRules::of(FieldType::Boolean))
        .field(
            "priority",
            FieldRules::of(FieldType::String).one_of(Priority::NAMES),
        )
        .field(
            "categoryId",
            FieldRules::of(FieldType::Number).max(f64::from(u32::MAX)),
        )
        .field("dueDate", FieldRules::of(FieldType::String))
        .field("tags", FieldRules::of(FieldType::Array))
});

/// Validation rules for task payloads. Used for both creation and updates.
pub fn task_schema() -> &'static Schema {
    &TASK_SCHEMA
}

/// Parses a due date.
///
/// Accepts RFC 3339 timestamps, `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC)
/// and plain `YYYY-MM-DD` dates (UTC midnight).
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn due_date_of(task: &Task) -> Option<DateTime<Utc>> {
    task.due_date.as_deref().and_then(parse_due_date)
}

/// Field a task list can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    Description,
    Completed,
    Priority,
    CategoryId,
    DueDate,
    Tags,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /// Parses a camelCase field name as used in the JSON representation.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(SortField::Id),
            "title" => Some(SortField::Title),
            "description" => Some(SortField::Description),
            "completed" => Some(SortField::Completed),
            "priority" => Some(SortField::Priority),
            "categoryId" => Some(SortField::CategoryId),
            "dueDate" => Some(SortField::DueDate),
            "tags" => Some(SortField::Tags),
            "createdAt" => Some(SortField::CreatedAt),
            "updatedAt" => Some(SortField::UpdatedAt),
            _ => None,
        }
    }

    fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Description => a.description.cmp(&b.description),
            SortField::Completed => a.completed.cmp(&b.completed),
            SortField::Priority => a.priority.as_str().cmp(b.priority.as_str()),
            SortField::CategoryId => a.category_id.unwrap_or(0).cmp(&b.category_id.unwrap_or(0)),
            // Missing or unreadable due dates sort as the epoch.
            SortField::DueDate => {
                let epoch = DateTime::<Utc>::UNIX_EPOCH;
                due_date_of(a)
                    .unwrap_or(epoch)
                    .cmp(&due_date_of(b).unwrap_or(epoch))
            }
            SortField::Tags => a.tags.join(",").cmp(&b.tags.join(",")),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// `"desc"` sorts descending; anything else ascending.
    pub fn parse(raw: &str) -> Self {
        if raw == "desc" {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

/// Filters for [`TaskService::list_tasks`]. Every set filter must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilters {
    pub completed: Option<bool>,
    pub priority: Option<String>,
    pub category_id: Option<i64>,
    /// Case-insensitive substring of the title or the description
    pub search: Option<String>,
    /// Inclusive upper bound on the due date
    pub due_before: Option<DateTime<Utc>>,
    /// Inclusive lower bound on the due date
    pub due_after: Option<DateTime<Utc>>,
    pub sort_by: Option<SortField>,
    pub sort_order: SortOrder,
}

impl TaskFilters {
    fn matches(&self, task: &Task) -> bool {
        if let Some(completed) = self.completed {
            if task.completed != completed {
                return false;
            }
        }
        if let Some(priority) = &self.priority {
            if task.priority.as_str() != priority {
                return false;
            }
        }
        if let Some(category_id) = self.category_id {
            if task.category_id.map(i64::from) != Some(category_id) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_title = task.title.to_lowercase().contains(&needle);
            let in_description = task.description.to_lowercase().contains(&needle);
            if !in_title && !in_description {
                return false;
            }
        }
        if let Some(due_before) = self.due_before {
            if !due_date_of(task).is_some_and(|due| due <= due_before) {
                return false;
            }
        }
        if let Some(due_after) = self.due_after {
            if !due_date_of(task).is_some_and(|due| due >= due_after) {
                return false;
            }
        }
        true
    }
}

/// Task counts grouped by priority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PriorityBreakdown {
    pub alta: usize,
    #[serde(rename = "média")]
    pub media: usize,
    pub baixa: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Pending tasks whose due date has passed
    pub overdue: usize,
    pub by_priority: PriorityBreakdown,
    /// Task counts keyed by category id. Tasks without a category are not counted.
    pub by_category: BTreeMap<u32, usize>,
}

/// Shared state for the task routes.
#[derive(Clone, Debug, Default)]
pub struct TaskState {
    pub tasks: Arc<RwLock<TaskStore>>,
}

pub struct TaskService<'a> {
    store: &'a RwLock<TaskStore>,
}

impl TaskService<'_> {
    pub fn new(store: &RwLock<TaskStore>) -> TaskService<'_> {
        TaskService { store }
    }

    /// Lists the tasks matching `filters`, optionally sorted.
    ///
    /// Sorting is stable, so tasks that compare equal keep their insertion order.
    #[tracing::instrument(skip(self))]
    pub async fn list_tasks(&self, filters: &TaskFilters) -> Vec<Task> {
        let store = self.store.read().await;
        let mut tasks: Vec<Task> = store
            .iter()
            .filter(|task| filters.matches(task))
            .cloned()
            .collect();

        if let Some(field) = filters.sort_by {
            tasks.sort_by(|a, b| match filters.sort_order {
                SortOrder::Asc => field.compare(a, b),
                SortOrder::Desc => field.compare(a, b).reverse(),
            });
        }

        tasks
    }

    /// Retrieves a task by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The raw ID, as received in the request path.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when no task has this ID, or a validation error when the ID
    /// is missing or not a number.
    #[tracing::instrument(skip(self))]
    pub async fn get_task_by_id(&self, id: &str) -> Result<Option<Task>, ServiceError> {
        let id = parse_required_id(id, "Task")?;
        let store = self.store.read().await;
        Ok(store_key(id).and_then(|key| store.find(key)).cloned())
    }

    /// Creates a new task.
    ///
    /// # Arguments
    ///
    /// * `title` - The title of the task.
    /// * `description` - An optional description, empty when omitted.
    /// * `extra` - Optional `priority`, `categoryId`, `dueDate` and `tags`.
    ///
    /// # Returns
    ///
    /// The created task, or a validation error listing every violated rule.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(
        &self,
        title: String,
        description: Option<String>,
        extra: Payload,
    ) -> Result<Task, ServiceError> {
        let description = description.unwrap_or_default();

        let mut candidate = extra.clone();
        candidate.insert("title".to_string(), Value::String(title.clone()));
        candidate.insert(
            "description".to_string(),
            Value::String(description.clone()),
        );
        validate(&candidate, task_schema()).into_result()?;

        let now = Utc::now();
        let mut store = self.store.write().await;
        let task = Task {
            id: store.allocate_id(),
            title,
            description,
            completed: false,
            priority: extra
                .get("priority")
                .and_then(Value::as_str)
                .and_then(Priority::parse)
                .unwrap_or_default(),
            category_id: extra.get("categoryId").and_then(category_reference),
            due_date: extra.get("dueDate").and_then(due_date_value),
            tags: extra.get("tags").map(tag_list).unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        store.insert(task.clone());
        tracing::info!(task_id = task.id, "Created task");

        Ok(task)
    }

    /// Updates a task with the fields present in `updates`.
    ///
    /// `updates` is validated against the full task schema, so it must carry
    /// a valid `title` even when the title does not change. `id`,
    /// `createdAt` and `updatedAt` in the payload are ignored.
    ///
    /// # Returns
    ///
    /// The updated task, or `Ok(None)` when no task has this ID.
    #[tracing::instrument(skip(self))]
    pub async fn update_task(
        &self,
        id: &str,
        updates: Payload,
    ) -> Result<Option<Task>, ServiceError> {
        let id = parse_required_id(id, "Task")?;
        validate(&updates, task_schema()).into_result()?;

        let mut store = self.store.write().await;
        let Some(task) = (match store_key(id) {
            Some(key) => store.find_mut(key),
            None => None,
        }) else {
            return Ok(None);
        };
        apply_updates(task, &updates);
        task.updated_at = Utc::now();

        Ok(Some(task.clone()))
    }

    /// Deletes a task by its ID.
    ///
    /// # Returns
    ///
    /// The removed task, or `Ok(None)` when no task has this ID.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, id: &str) -> Result<Option<Task>, ServiceError> {
        let id = parse_required_id(id, "Task")?;
        let mut store = self.store.write().await;
        let removed = store_key(id).and_then(|key| store.remove(key));
        if let Some(task) = &removed {
            tracing::info!(task_id = task.id, "Deleted task");
        }
        Ok(removed)
    }

    /// Sets `completed` on every task listed in `ids`.
    ///
    /// Unparseable IDs are skipped. Tasks that exist are updated even when
    /// other IDs match nothing; in that case the call still fails with
    /// `ServiceError::NotFound` naming the missing IDs.
    #[tracing::instrument(skip(self))]
    pub async fn bulk_update_status(
        &self,
        ids: &[Value],
        completed: bool,
    ) -> Result<Vec<Task>, ServiceError> {
        let mut store = self.store.write().await;
        let now = Utc::now();
        let mut updated = Vec::new();
        let mut missing = Vec::new();

        for raw in ids {
            let Some(id) = parse_id_value(raw) else {
                tracing::debug!("Skipping unparseable task ID {}", raw);
                continue;
            };
            let found = match store_key(id) {
                Some(key) => store.find_mut(key),
                None => None,
            };
            match found {
                Some(task) => {
                    task.completed = completed;
                    task.updated_at = now;
                    updated.push(task.clone());
                }
                None => missing.push(display_id(raw)),
            }
        }

        if !missing.is_empty() {
            tracing::warn!(
                "Bulk status update left {} task(s) untouched: {}",
                missing.len(),
                missing.join(", ")
            );
            return Err(ServiceError::NotFound(format!(
                "Tasks not found: {}",
                missing.join(", ")
            )));
        }

        Ok(updated)
    }

    /// Computes task statistics. Overdue tasks are counted against the
    /// current time.
    #[tracing::instrument(skip(self))]
    pub async fn task_stats(&self) -> TaskStats {
        let store = self.store.read().await;
        let now = Utc::now();
        let mut stats = TaskStats::default();

        for task in store.iter() {
            stats.total += 1;
            if task.completed {
                stats.completed += 1;
            } else if due_date_of(task).is_some_and(|due| due < now) {
                stats.overdue += 1;
            }
            match task.priority {
                Priority::Alta => stats.by_priority.alta += 1,
                Priority::Media => stats.by_priority.media += 1,
                Priority::Baixa => stats.by_priority.baixa += 1,
            }
            if let Some(category_id) = task.category_id {
                *stats.by_category.entry(category_id).or_insert(0) += 1;
            }
        }
        stats.pending = stats.total - stats.completed;

        stats
    }
}

/// Merges the known fields of `updates` into `task`. A `null` resets the
/// field to its default.
fn apply_updates(task: &mut Task, updates: &Payload) {
    for (field, value) in updates {
        match field.as_str() {
            "title" => {
                if let Some(title) = value.as_str() {
                    task.title = title.to_string();
                }
            }
            "description" => task.description = value.as_str().unwrap_or_default().to_string(),
            "completed" => task.completed = value.as_bool().unwrap_or(false),
            "priority" => {
                task.priority = value
                    .as_str()
                    .and_then(Priority::parse)
                    .unwrap_or_default()
            }
            "categoryId" => task.category_id = category_reference(value),
            "dueDate" => task.due_date = due_date_value(value),
            "tags" => task.tags = tag_list(value),
            _ => {}
        }
    }
}

/// Reads a category reference. Zero, blank and negative values mean "none".
fn category_reference(value: &Value) -> Option<u32> {
    as_number(value)
        .filter(|number| *number >= 1.0)
        .map(|number| number.trunc() as u32)
}

fn due_date_value(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|due_date| !due_date.is_empty())
        .map(str::to_string)
}

fn tag_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|tags| {
            tags.iter()
                .map(|tag| match tag {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn display_id(raw: &Value) -> String {
    match raw {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

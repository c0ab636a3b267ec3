use crate::error::ServiceError;
use crate::store::{CategoryStore, Record, store_key};
use crate::validation::{FieldRules, FieldType, Payload, Schema, parse_required_id, validate};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tokio::sync::RwLock;
use utoipa::ToSchema;

pub mod api;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Sequential identifier, never reused
    pub id: u32,
    /// Between 2 and 50 characters, unique ignoring case
    pub name: String,
    /// Hex color such as #4a6fa5
    pub color: String,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime<Utc>,
}

impl Record for Category {
    fn id(&self) -> u32 {
        self.id
    }
}

static CATEGORY_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    let hex_color = Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("hex color pattern is valid");
    Schema::new()
        .field(
            "name",
            FieldRules::of(FieldType::String)
                .required()
                .min_length(2)
                .max_length(50),
        )
        .field(
            "color",
            FieldRules::of(FieldType::String)
                .required()
                .pattern(hex_color),
        )
});

/// Validation rules for category payloads. Used for both creation and updates.
pub fn category_schema() -> &'static Schema {
    &CATEGORY_SCHEMA
}

const DUPLICATE_NAME: &str = "A category with this name already exists";

/// Shared state for the category routes.
#[derive(Clone, Debug)]
pub struct CategoryState {
    pub categories: Arc<RwLock<CategoryStore>>,
}

impl Default for CategoryState {
    fn default() -> Self {
        Self {
            categories: Arc::new(RwLock::new(CategoryStore::seeded())),
        }
    }
}

pub struct CategoryService<'a> {
    store: &'a RwLock<CategoryStore>,
}

impl CategoryService<'_> {
    pub fn new(store: &RwLock<CategoryStore>) -> CategoryService<'_> {
        CategoryService { store }
    }

    /// Retrieves all categories in insertion order.
    #[tracing::instrument(skip(self))]
    pub async fn list_categories(&self) -> Vec<Category> {
        self.store.read().await.iter().cloned().collect()
    }

    /// Retrieves a category by its ID.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when no category has this ID, or a validation error when
    /// the ID is missing or not a number.
    #[tracing::instrument(skip(self))]
    pub async fn get_category_by_id(&self, id: &str) -> Result<Option<Category>, ServiceError> {
        let id = parse_required_id(id, "Category")?;
        let store = self.store.read().await;
        Ok(store_key(id).and_then(|key| store.find(key)).cloned())
    }

    /// Creates a new category.
    ///
    /// # Arguments
    ///
    /// * `name` - The category name, unique ignoring case.
    /// * `color` - The color as `#` followed by six hex digits.
    ///
    /// # Returns
    ///
    /// The created category, a validation error, or a conflict when the name
    /// is already taken.
    #[tracing::instrument(skip(self))]
    pub async fn create_category(
        &self,
        name: String,
        color: String,
    ) -> Result<Category, ServiceError> {
        let mut candidate = Payload::new();
        candidate.insert("name".to_string(), Value::String(name.clone()));
        candidate.insert("color".to_string(), Value::String(color.clone()));
        validate(&candidate, category_schema()).into_result()?;

        let mut store = self.store.write().await;
        if name_taken(&store, &name, None) {
            return Err(ServiceError::Conflict(DUPLICATE_NAME.to_string()));
        }

        let now = Utc::now();
        let category = Category {
            id: store.allocate_id(),
            name,
            color,
            created_at: now,
            updated_at: now,
        };
        store.insert(category.clone());
        tracing::info!(category_id = category.id, "Created category");

        Ok(category)
    }

    /// Updates a category with the fields present in `updates`.
    ///
    /// `updates` is validated against the full category schema, so both
    /// `name` and `color` are required. A new name must not collide with
    /// another category.
    ///
    /// # Returns
    ///
    /// The updated category, or `Ok(None)` when no category has this ID.
    #[tracing::instrument(skip(self))]
    pub async fn update_category(
        &self,
        id: &str,
        updates: Payload,
    ) -> Result<Option<Category>, ServiceError> {
        let id = parse_required_id(id, "Category")?;
        validate(&updates, category_schema()).into_result()?;

        let mut store = self.store.write().await;
        let Some(key) = store_key(id).filter(|key| store.find(*key).is_some()) else {
            return Ok(None);
        };

        let new_name = updates
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty());
        if let Some(name) = new_name {
            if name_taken(&store, name, Some(key)) {
                return Err(ServiceError::Conflict(DUPLICATE_NAME.to_string()));
            }
        }

        let Some(category) = store.find_mut(key) else {
            return Ok(None);
        };
        if let Some(name) = new_name {
            category.name = name.to_string();
        }
        if let Some(color) = updates.get("color").and_then(Value::as_str) {
            category.color = color.to_string();
        }
        category.updated_at = Utc::now();

        Ok(Some(category.clone()))
    }

    /// Deletes a category by its ID.
    ///
    /// Tasks that reference the category keep their `categoryId`.
    ///
    /// # Returns
    ///
    /// The removed category, or `Ok(None)` when no category has this ID.
    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, id: &str) -> Result<Option<Category>, ServiceError> {
        let id = parse_required_id(id, "Category")?;
        let mut store = self.store.write().await;
        let removed = store_key(id).and_then(|key| store.remove(key));
        if let Some(category) = &removed {
            tracing::info!(category_id = category.id, "Deleted category");
        }
        Ok(removed)
    }
}

/// Checks whether a category other than `except` already uses `name`, ignoring case.
fn name_taken(store: &CategoryStore, name: &str, except: Option<u32>) -> bool {
    let name = name.to_lowercase();
    store
        .iter()
        .filter(|category| Some(category.id) != except)
        .any(|category| category.name.to_lowercase() == name)
}

use questlist_server::error::ServiceError;
use questlist_server::store::TaskStore;
use questlist_server::task::{
    PriorityBreakdown, SortField, SortOrder, Task, TaskFilters, TaskService, TaskStats,
};
use serde_json::json;
use tokio::sync::RwLock;

mod common;

fn setup() -> RwLock<TaskStore> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    RwLock::new(TaskStore::default())
}

async fn create(service: &TaskService<'_>, title: &str, extra: serde_json::Value) -> Task {
    service
        .create_task(title.to_string(), None, common::payload(extra))
        .await
        .expect("Failed to create task")
}

#[tokio::test]
async fn can_assign_increasing_ids() {
    let store = setup();
    let service = TaskService::new(&store);

    let mut last_id = 0;
    for title in ["Buy milk", "Walk the dog", "Write the report"] {
        let task = create(&service, title, json!({})).await;
        assert!(task.id > last_id);
        last_id = task.id;
    }
}

#[tokio::test]
async fn can_fill_defaults_on_create() {
    let store = setup();
    let service = TaskService::new(&store);

    let task = create(&service, "Buy milk", json!({})).await;

    assert_eq!(task.description, "");
    assert!(!task.completed);
    assert_eq!(task.priority.as_str(), "média");
    assert_eq!(task.category_id, None);
    assert_eq!(task.due_date, None);
    assert!(task.tags.is_empty());
    assert_eq!(task.created_at, task.updated_at);
}

#[tokio::test]
async fn can_reject_short_title() {
    let store = setup();
    let service = TaskService::new(&store);

    let error = service
        .create_task("ab".to_string(), None, common::payload(json!({})))
        .await
        .unwrap_err();

    match error {
        ServiceError::Validation(message) => assert!(message.contains("title")),
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert!(store.read().await.is_empty());
}

#[tokio::test]
async fn can_report_every_violation_at_once() {
    let store = setup();
    let service = TaskService::new(&store);

    let error = service
        .create_task(
            "ab".to_string(),
            None,
            common::payload(json!({ "priority": "urgente", "tags": "home" })),
        )
        .await
        .unwrap_err();

    let message = error.to_string();
    assert!(message.contains("title"));
    assert!(message.contains("priority"));
    assert!(message.contains("tags"));
}

#[tokio::test]
async fn can_reject_non_numeric_id() {
    let store = setup();
    let service = TaskService::new(&store);

    let error = service.get_task_by_id("abc").await.unwrap_err();

    assert_eq!(
        error,
        ServiceError::Validation("Task ID must be a number".to_string())
    );
}

#[tokio::test]
async fn can_return_none_for_unused_id() {
    let store = setup();
    let service = TaskService::new(&store);
    create(&service, "Buy milk", json!({})).await;

    let task = service.get_task_by_id("42").await.unwrap();

    assert_eq!(task, None);
}

#[tokio::test]
async fn can_read_back_created_task() {
    let store = setup();
    let service = TaskService::new(&store);
    let created = create(
        &service,
        "Plan the trip",
        json!({ "priority": "alta", "categoryId": 2, "dueDate": "2030-01-15", "tags": ["travel"] }),
    )
    .await;

    let fetched = service
        .get_task_by_id(&created.id.to_string())
        .await
        .unwrap();

    assert_eq!(fetched, Some(created));
}

#[tokio::test]
async fn can_filter_by_completion() {
    let store = setup();
    let service = TaskService::new(&store);
    let first = create(&service, "Buy milk", json!({})).await;
    create(&service, "Walk the dog", json!({})).await;
    service
        .bulk_update_status(&[json!(first.id)], true)
        .await
        .unwrap();

    let filters = TaskFilters {
        completed: Some(true),
        ..TaskFilters::default()
    };
    let tasks = service.list_tasks(&filters).await;

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, first.id);
    assert!(tasks.iter().all(|task| task.completed));
}

#[tokio::test]
async fn can_intersect_filters() {
    let store = setup();
    let service = TaskService::new(&store);
    create(&service, "Buy milk", json!({ "priority": "alta", "categoryId": 2 })).await;
    create(&service, "Buy bread", json!({ "priority": "alta", "categoryId": 1 })).await;
    create(&service, "Walk the dog", json!({ "priority": "baixa", "categoryId": 2 })).await;

    let filters = TaskFilters {
        priority: Some("alta".to_string()),
        category_id: Some(2),
        ..TaskFilters::default()
    };
    let tasks = service.list_tasks(&filters).await;

    let titles: Vec<_> = tasks.iter().map(|task| task.title.as_str()).collect();
    assert_eq!(titles, vec!["Buy milk"]);
}

#[tokio::test]
async fn can_search_title_and_description_ignoring_case() {
    let store = setup();
    let service = TaskService::new(&store);
    create(&service, "Buy MILK", json!({})).await;
    service
        .create_task(
            "Groceries".to_string(),
            Some("milk and eggs".to_string()),
            common::payload(json!({})),
        )
        .await
        .unwrap();
    create(&service, "Walk the dog", json!({})).await;

    let filters = TaskFilters {
        search: Some("Milk".to_string()),
        ..TaskFilters::default()
    };
    let tasks = service.list_tasks(&filters).await;

    assert_eq!(tasks.len(), 2);
}

#[tokio::test]
async fn can_sort_by_due_date_descending_with_undated_last() {
    let store = setup();
    let service = TaskService::new(&store);
    create(&service, "No deadline", json!({})).await;
    create(&service, "Due early", json!({ "dueDate": "2030-01-01" })).await;
    create(&service, "Due late", json!({ "dueDate": "2031-06-30T12:00:00Z" })).await;

    let filters = TaskFilters {
        sort_by: Some(SortField::DueDate),
        sort_order: SortOrder::Desc,
        ..TaskFilters::default()
    };
    let tasks = service.list_tasks(&filters).await;

    let titles: Vec<_> = tasks.iter().map(|task| task.title.as_str()).collect();
    assert_eq!(titles, vec!["Due late", "Due early", "No deadline"]);
}

#[tokio::test]
async fn can_require_title_on_update() {
    let store = setup();
    let service = TaskService::new(&store);
    let task = create(&service, "Buy milk", json!({})).await;

    let error = service
        .update_task(&task.id.to_string(), common::payload(json!({ "completed": true })))
        .await
        .unwrap_err();

    assert!(error.to_string().contains("title"));
}

#[tokio::test]
async fn can_update_task_fields() {
    let store = setup();
    let service = TaskService::new(&store);
    let task = create(&service, "Buy milk", json!({ "tags": ["home"] })).await;

    let updated = service
        .update_task(
            &task.id.to_string(),
            common::payload(json!({
                "id": 99,
                "title": "Buy oat milk",
                "completed": true,
                "priority": "baixa",
                "tags": null
            })),
        )
        .await
        .unwrap()
        .expect("task exists");

    assert_eq!(updated.id, task.id);
    assert_eq!(updated.title, "Buy oat milk");
    assert!(updated.completed);
    assert_eq!(updated.priority.as_str(), "baixa");
    assert!(updated.tags.is_empty());
    assert_eq!(updated.created_at, task.created_at);
    assert!(updated.updated_at >= task.updated_at);
}

#[tokio::test]
async fn can_return_none_when_updating_unknown_task() {
    let store = setup();
    let service = TaskService::new(&store);

    let updated = service
        .update_task("7", common::payload(json!({ "title": "Anything" })))
        .await
        .unwrap();

    assert_eq!(updated, None);
}

#[tokio::test]
async fn can_delete_task_without_reusing_its_id() {
    let store = setup();
    let service = TaskService::new(&store);
    let task = create(&service, "Buy milk", json!({})).await;

    let removed = service.delete_task(&task.id.to_string()).await.unwrap();
    let again = service.delete_task(&task.id.to_string()).await.unwrap();
    let next = create(&service, "Walk the dog", json!({})).await;

    assert_eq!(removed, Some(task.clone()));
    assert_eq!(again, None);
    assert!(next.id > task.id);
}

#[tokio::test]
async fn can_apply_bulk_update_before_reporting_missing_ids() {
    let store = setup();
    let service = TaskService::new(&store);
    create(&service, "Buy milk", json!({})).await;
    create(&service, "Walk the dog", json!({})).await;

    let error = service
        .bulk_update_status(&[json!(1), json!(2), json!(999)], true)
        .await
        .unwrap_err();

    match error {
        ServiceError::NotFound(message) => assert!(message.contains("999")),
        other => panic!("expected a not found error, got {other:?}"),
    }
    let tasks = service.list_tasks(&TaskFilters::default()).await;
    assert!(tasks.iter().all(|task| task.completed));
}

#[tokio::test]
async fn can_skip_unparseable_ids_in_bulk_update() {
    let store = setup();
    let service = TaskService::new(&store);
    create(&service, "Buy milk", json!({})).await;

    let updated = service
        .bulk_update_status(&[json!("1"), json!("abc"), json!(null)], true)
        .await
        .unwrap();

    assert_eq!(updated.len(), 1);
    assert!(updated[0].completed);
}

#[tokio::test]
async fn can_compute_empty_stats() {
    let store = setup();
    let service = TaskService::new(&store);

    let stats = service.task_stats().await;

    assert_eq!(stats, TaskStats::default());
    assert_eq!(
        serde_json::to_value(&stats).unwrap(),
        json!({
            "total": 0,
            "completed": 0,
            "pending": 0,
            "overdue": 0,
            "byPriority": { "alta": 0, "média": 0, "baixa": 0 },
            "byCategory": {}
        })
    );
}

#[tokio::test]
async fn can_compute_stats() {
    let store = setup();
    let service = TaskService::new(&store);
    let done = create(&service, "Buy milk", json!({ "priority": "alta", "categoryId": 1 })).await;
    create(
        &service,
        "Pay the rent",
        json!({ "priority": "alta", "categoryId": 1, "dueDate": "2000-01-01" }),
    )
    .await;
    create(&service, "Read a book", json!({ "categoryId": 3, "dueDate": "2999-01-01" })).await;
    create(&service, "Stretch", json!({ "priority": "baixa" })).await;
    service
        .bulk_update_status(&[json!(done.id)], true)
        .await
        .unwrap();

    let stats = service.task_stats().await;

    assert_eq!(stats.total, 4);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.pending, 3);
    assert_eq!(stats.overdue, 1);
    assert_eq!(
        stats.by_priority,
        PriorityBreakdown {
            alta: 2,
            media: 1,
            baixa: 1
        }
    );
    assert_eq!(stats.by_category.get(&1), Some(&2));
    assert_eq!(stats.by_category.get(&3), Some(&1));
    assert_eq!(stats.by_category.len(), 2);
}

#[tokio::test]
async fn can_reject_category_reference_beyond_id_range() {
    let store = setup();
    let service = TaskService::new(&store);
    let task = create(&service, "Small ref", json!({ "categoryId": 4 })).await;

    let create_error = service
        .create_task(
            "Big ref".to_string(),
            None,
            common::payload(json!({ "categoryId": 4294967296u64 })),
        )
        .await
        .unwrap_err();
    let update_error = service
        .update_task(
            &task.id.to_string(),
            common::payload(json!({ "title": "Small ref", "categoryId": 4294967296u64 })),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        create_error,
        ServiceError::Validation(ref message) if message.contains("categoryId")
    ));
    assert!(matches!(
        update_error,
        ServiceError::Validation(ref message) if message.contains("categoryId")
    ));
    let stored = service.get_task_by_id(&task.id.to_string()).await.unwrap();
    assert_eq!(stored.and_then(|task| task.category_id), Some(4));
    assert_eq!(store.read().await.len(), 1);
}

#[tokio::test]
async fn can_return_none_for_oversized_id() {
    let store = setup();
    let service = TaskService::new(&store);
    create(&service, "Buy milk", json!({})).await;

    let task = service.get_task_by_id("99999999999999999999").await.unwrap();

    assert_eq!(task, None);
}

#[tokio::test]
async fn can_measure_title_length_in_utf16_units() {
    let store = setup();
    let service = TaskService::new(&store);

    let task = create(&service, "\u{1F600}\u{1F600}", json!({})).await;

    assert_eq!(task.title, "\u{1F600}\u{1F600}");
}

use sharelist_core::db::open_db_in_memory;
use sharelist_core::model::task::is_valid_share_id;
use sharelist_core::{
    IndexRepository, ListRepository, ListType, ListWrite, NewList, PendingSubscription, RepoError,
    ShareService, SqliteIndexRepository, SqliteListRepository, Task,
};

fn new_list(tasks: Vec<Task>) -> NewList {
    NewList {
        tasks,
        title: Some("Groceries".to_string()),
        list_type: ListType::Grocery,
    }
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteListRepository::new(&conn);

    let task = Task::new("Buy milk");
    let list_id = repo.create_list(&new_list(vec![task.clone()])).unwrap();
    assert!(is_valid_share_id(&list_id));

    let loaded = repo.get_list(&list_id).unwrap().unwrap();
    assert_eq!(loaded.list_id, list_id);
    assert_eq!(loaded.title.as_deref(), Some("Groceries"));
    assert_eq!(loaded.list_type, ListType::Grocery);
    assert_eq!(loaded.tasks.len(), 1);
    assert_eq!(loaded.tasks[0].id, task.id);
    assert_eq!(loaded.created_at, loaded.last_modified);
    assert!(loaded.focus_task_id.is_none());

    assert!(repo.get_list("00000000").unwrap().is_none());
}

#[test]
fn put_stamps_a_strictly_increasing_marker() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteListRepository::new(&conn);
    let list_id = repo.create_list(&new_list(vec![])).unwrap();
    let created = repo.last_modified(&list_id).unwrap().unwrap();

    let first = repo
        .put_list(&list_id, &ListWrite { tasks: vec![Task::new("a")], ..ListWrite::default() })
        .unwrap();
    let second = repo
        .put_list(&list_id, &ListWrite { tasks: vec![Task::new("b")], ..ListWrite::default() })
        .unwrap();

    // Strict increase even when both writes land in the same millisecond.
    assert!(first > created);
    assert!(second > first);
    assert_eq!(repo.last_modified(&list_id).unwrap(), Some(second));
}

#[test]
fn last_full_document_write_wins() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteListRepository::new(&conn);
    let list_id = repo.create_list(&new_list(vec![Task::new("seed")])).unwrap();

    let from_editor_a = vec![Task::new("a1"), Task::new("a2")];
    let from_editor_b = vec![Task::new("b1")];
    repo.put_list(&list_id, &ListWrite { tasks: from_editor_a, ..ListWrite::default() })
        .unwrap();
    repo.put_list(&list_id, &ListWrite { tasks: from_editor_b.clone(), ..ListWrite::default() })
        .unwrap();

    let loaded = repo.get_list(&list_id).unwrap().unwrap();
    assert_eq!(loaded.tasks.len(), 1);
    assert_eq!(loaded.tasks[0].id, from_editor_b[0].id);
}

#[test]
fn focus_pointer_survives_writes_that_do_not_set_it() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteListRepository::new(&conn);
    let task = Task::new("focused");
    let list_id = repo.create_list(&new_list(vec![task.clone()])).unwrap();

    repo.put_list(
        &list_id,
        &ListWrite {
            tasks: vec![task.clone()],
            focus_task_id: Some(Some(task.id)),
            ..ListWrite::default()
        },
    )
    .unwrap();
    assert_eq!(
        repo.get_list(&list_id).unwrap().unwrap().focus_task_id,
        Some(task.id)
    );

    // A plain content write leaves the stored pointer alone.
    repo.put_list(&list_id, &ListWrite { tasks: vec![task.clone()], ..ListWrite::default() })
        .unwrap();
    assert_eq!(
        repo.get_list(&list_id).unwrap().unwrap().focus_task_id,
        Some(task.id)
    );

    repo.put_list(
        &list_id,
        &ListWrite {
            tasks: vec![task.clone()],
            focus_task_id: Some(None),
            ..ListWrite::default()
        },
    )
    .unwrap();
    assert!(repo.get_list(&list_id).unwrap().unwrap().focus_task_id.is_none());
}

#[test]
fn writes_to_missing_lists_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteListRepository::new(&conn);

    assert!(matches!(
        repo.put_list("deadbeef", &ListWrite::default()),
        Err(RepoError::ListNotFound(_))
    ));
    assert!(matches!(
        repo.delete_list("deadbeef"),
        Err(RepoError::ListNotFound(_))
    ));
}

#[test]
fn share_date_reuses_the_owned_id_and_recreates_after_deletion() {
    let conn = open_db_in_memory().unwrap();
    let service = ShareService::new(
        SqliteListRepository::new(&conn),
        SqliteIndexRepository::new(&conn),
    );

    let tasks = vec![Task::new("shared")];
    let first = service
        .share_date("owner", "2024-05-01", &tasks, Some("Day"), ListType::General)
        .unwrap();
    assert!(first.created);

    let second = service
        .share_date("owner", "2024-05-01", &tasks, Some("Day"), ListType::General)
        .unwrap();
    assert!(!second.created);
    assert_eq!(second.list_id, first.list_id);

    service.delete_list(&first.list_id).unwrap();
    let third = service
        .share_date("owner", "2024-05-01", &tasks, Some("Day"), ListType::General)
        .unwrap();
    assert!(third.created);
    assert_ne!(third.list_id, first.list_id);

    let index = SqliteIndexRepository::new(&conn);
    assert_eq!(
        index.owned_list_for_date("owner", "2024-05-01").unwrap(),
        Some(third.list_id)
    );
}

#[test]
fn owned_index_keeps_the_first_entry_unless_replaced() {
    let conn = open_db_in_memory().unwrap();
    let index = SqliteIndexRepository::new(&conn);

    index.add_owned_list("owner", "2024-05-01", "aaaa1111").unwrap();
    index.add_owned_list("owner", "2024-05-01", "bbbb2222").unwrap();
    assert_eq!(
        index.owned_list_for_date("owner", "2024-05-01").unwrap(),
        Some("aaaa1111".to_string())
    );

    index.replace_owned_list("owner", "2024-05-01", "bbbb2222").unwrap();
    index.add_owned_list("owner", "2024-05-02", "cccc3333").unwrap();
    assert_eq!(
        index.owned_lists("owner").unwrap(),
        vec![
            ("2024-05-01".to_string(), "bbbb2222".to_string()),
            ("2024-05-02".to_string(), "cccc3333".to_string()),
        ]
    );
}

#[test]
fn subscribe_refuses_missing_lists() {
    let conn = open_db_in_memory().unwrap();
    let service = ShareService::new(
        SqliteListRepository::new(&conn),
        SqliteIndexRepository::new(&conn),
    );

    assert!(!service
        .subscribe("client-b", "deadbeef", None, "/list/deadbeef")
        .unwrap());
    assert!(service.load_subscriptions("client-b").unwrap().is_empty());
}

#[test]
fn delete_purges_every_subscription_and_pending_marker() {
    let conn = open_db_in_memory().unwrap();
    let lists = SqliteListRepository::new(&conn);
    let index = SqliteIndexRepository::new(&conn);
    let service = ShareService::new(
        SqliteListRepository::new(&conn),
        SqliteIndexRepository::new(&conn),
    );

    let list_id = lists.create_list(&new_list(vec![])).unwrap();
    let url = format!("/list/{list_id}");
    assert!(service.subscribe("client-b", &list_id, Some("Groceries"), &url).unwrap());
    assert!(service.subscribe("client-c", &list_id, None, &url).unwrap());
    index
        .add_pending_subscription(
            "client-d",
            &PendingSubscription { list_id: list_id.clone(), title: None, url: url.clone() },
        )
        .unwrap();

    service.delete_list(&list_id).unwrap();

    assert!(!lists.list_exists(&list_id).unwrap());
    assert!(index.subscriptions("client-b").unwrap().is_empty());
    assert!(index.subscriptions("client-c").unwrap().is_empty());
    assert!(index.take_pending_subscriptions("client-d").unwrap().is_empty());
}

#[test]
fn loading_subscriptions_prunes_entries_whose_list_is_gone() {
    let conn = open_db_in_memory().unwrap();
    let lists = SqliteListRepository::new(&conn);
    let service = ShareService::new(
        SqliteListRepository::new(&conn),
        SqliteIndexRepository::new(&conn),
    );

    let kept = lists.create_list(&new_list(vec![])).unwrap();
    let doomed = lists.create_list(&new_list(vec![])).unwrap();
    service
        .subscribe("client-b", &kept, None, &format!("/list/{kept}"))
        .unwrap();
    service
        .subscribe("client-b", &doomed, None, &format!("/list/{doomed}"))
        .unwrap();

    // Bypass the service so the subscription row outlives its list.
    conn.execute("DELETE FROM lists WHERE list_id = ?1;", [&doomed])
        .unwrap();

    let remaining = service.load_subscriptions("client-b").unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].list_id, kept);

    // The prune is persisted, not recomputed per load.
    let raw = SqliteIndexRepository::new(&conn).subscriptions("client-b").unwrap();
    assert_eq!(raw.len(), 1);
}

#[test]
fn pending_markers_become_subscriptions_on_absorb() {
    let conn = open_db_in_memory().unwrap();
    let lists = SqliteListRepository::new(&conn);
    let index = SqliteIndexRepository::new(&conn);
    let service = ShareService::new(
        SqliteListRepository::new(&conn),
        SqliteIndexRepository::new(&conn),
    );

    let live = lists.create_list(&new_list(vec![])).unwrap();
    index
        .add_pending_subscription(
            "client-b",
            &PendingSubscription {
                list_id: live.clone(),
                title: Some("Groceries".to_string()),
                url: format!("/list/{live}"),
            },
        )
        .unwrap();
    index
        .add_pending_subscription(
            "client-b",
            &PendingSubscription {
                list_id: "deadbeef".to_string(),
                title: None,
                url: "/list/deadbeef".to_string(),
            },
        )
        .unwrap();

    // The marker for the deleted list is dropped, not retried.
    assert_eq!(service.absorb_pending_subscriptions("client-b").unwrap(), 1);

    let subscriptions = index.subscriptions("client-b").unwrap();
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].list_id, live);
    assert_eq!(subscriptions[0].title.as_deref(), Some("Groceries"));
    assert!(index.take_pending_subscriptions("client-b").unwrap().is_empty());
}

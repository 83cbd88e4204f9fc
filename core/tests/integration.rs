//! End-to-end resolution over ureq against the mock Home Assistant server.

use std::time::{Duration, Instant};

use mock_server::{Db, Fixture};
use serde_json::json;
use shopping_core::{
    HassClient, IntegrationKind, ListResolver, ListSummary, ResolvedItems, UreqTransport,
    LEGACY_SHOPPING_LIST_ID,
};

const TOKEN: &str = "integration-token";

/// Start the mock server on a random port and return its base URL and state.
fn start(fixture: Fixture) -> (String, Db) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let db = mock_server::db(fixture);
    let server_db = db.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, server_db).await
        })
        .unwrap();
    });

    (format!("http://{addr}"), db)
}

fn resolver(base_url: &str, token: &str) -> ListResolver<UreqTransport> {
    resolver_with_timeout(base_url, token, Duration::from_secs(5))
}

fn resolver_with_timeout(
    base_url: &str,
    token: &str,
    timeout: Duration,
) -> ListResolver<UreqTransport> {
    ListResolver::new(HassClient::new(base_url, token), UreqTransport::new(timeout))
}

fn household() -> Fixture {
    Fixture::from_json(
        &json!({
            "token": TOKEN,
            "states": [
                {"entity_id": "todo.groceries", "state": "1", "attributes": {
                    "friendly_name": "Groceries",
                    "integration": "local_todo",
                    "items": [
                        {"uid": "g1", "summary": "Milk", "status": "needs_action"},
                        {"uid": "g2", "summary": "Jam", "status": "completed"}
                    ]
                }},
                {"entity_id": "todo.tasks", "state": "1", "attributes": {
                    "friendly_name": "Tasks",
                    "integration": "google_tasks"
                }},
                {"entity_id": "todo.inbox", "state": "1", "attributes": {
                    "integration": "todoist",
                    "items": [{"id": "t1", "content": "Bread", "checked": false}]
                }},
                {"entity_id": "todo.nextcloud", "state": "1", "attributes": {
                    "integration": "caldav",
                    "todos": [
                        {"uid": "c1", "summary": "Cheese", "status": "NEEDS-ACTION"},
                        {"uid": "c2", "summary": "Butter", "status": "COMPLETED"}
                    ]
                }},
                {"entity_id": "todo.alexa_shopping", "state": "1", "attributes": {
                    "integration": "alexa_todo",
                    "item_names": ["Batteries"]
                }},
                {"entity_id": "todo.home", "state": "2", "attributes": {
                    "friendly_name": "Home",
                    "supported_features": 71
                }},
                {"entity_id": "sensor.home_bring_items", "state": "2", "attributes": {
                    "purchases": [
                        {"name": "Coffee", "quantity": "500g"},
                        {"name": "Sugar"}
                    ]
                }},
                {"entity_id": "todo.mystery", "state": "1", "attributes": {}},
                {"entity_id": "sensor.temperature", "state": "21.5", "attributes": {}}
            ],
            "service_items": {
                "todo.tasks": [
                    {"uid": "s1", "summary": "Call plumber", "status": "needs_action"},
                    {"uid": "s2", "summary": "Pay rent", "status": "completed"}
                ]
            },
            "todo_api_items": {
                "todo.mystery": [{"id": "m1", "summary": "Glue"}]
            }
        })
        .to_string(),
    )
    .unwrap()
}

fn summary(lists: &[ListSummary], id: &str) -> (usize, IntegrationKind) {
    let list = lists
        .iter()
        .find(|l| l.id == id)
        .unwrap_or_else(|| panic!("{id} missing from {lists:?}"));
    (list.item_count, list.integration)
}

#[test]
fn enumerate_every_integration() {
    let (base_url, db) = start(household());
    let lists = resolver(&base_url, TOKEN).enumerate_lists();

    let journal = db.blocking_read().requests.clone();
    let state_fetches = journal.iter().filter(|r| *r == "GET /api/states").count();
    assert_eq!(state_fetches, 1, "{journal:?}");
    assert!(!journal.iter().any(|r| r.starts_with("GET /api/states/")), "{journal:?}");

    let ids: Vec<&str> = lists.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "todo.groceries",
            "todo.tasks",
            "todo.inbox",
            "todo.nextcloud",
            "todo.alexa_shopping",
            "todo.home",
            "todo.mystery",
        ]
    );
    assert_eq!(summary(&lists, "todo.groceries"), (1, IntegrationKind::LocalTodo));
    assert_eq!(summary(&lists, "todo.tasks"), (1, IntegrationKind::GoogleTasks));
    assert_eq!(summary(&lists, "todo.inbox"), (1, IntegrationKind::Todoist));
    assert_eq!(summary(&lists, "todo.nextcloud"), (1, IntegrationKind::CalDav));
    assert_eq!(summary(&lists, "todo.alexa_shopping"), (1, IntegrationKind::AlexaTodo));
    assert_eq!(summary(&lists, "todo.home"), (2, IntegrationKind::Bring));
    assert_eq!(summary(&lists, "todo.mystery"), (1, IntegrationKind::Unknown));
    assert_eq!(lists[0].name, "Groceries");
    assert_eq!(lists[6].name, "mystery");
}

#[test]
fn resolve_service_backed_list() {
    let (base_url, _db) = start(household());
    let resolved = resolver(&base_url, TOKEN)
        .resolve_items("todo.tasks", None)
        .unwrap();

    assert_eq!(resolved.items.len(), 1);
    assert_eq!(resolved.items[0].id, "s1");
    assert_eq!(resolved.items[0].name, "Call plumber");
}

#[test]
fn resolve_bring_through_related_sensor() {
    let (base_url, db) = start(household());
    let resolved = resolver(&base_url, TOKEN)
        .resolve_items("todo.home", None)
        .unwrap();

    let names: Vec<&str> = resolved.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Coffee (500g)", "Sugar"]);

    let journal = db.blocking_read().requests.clone();
    assert_eq!(
        journal,
        vec![
            "GET /api/states/todo.home",
            "POST /api/services/todo/get_items?return_response",
            "GET /api/states",
        ]
    );
}

#[test]
fn resolve_unknown_integration_via_todo_api() {
    let (base_url, _db) = start(household());
    let resolved = resolver(&base_url, TOKEN)
        .resolve_items("todo.mystery", Some(10))
        .unwrap();

    assert_eq!(resolved.items.len(), 1);
    assert_eq!(resolved.items[0].name, "Glue");
    assert_eq!(resolved.total_count, 1);
    assert!(!resolved.truncated);
}

#[test]
fn resolve_with_limit() {
    let mut fixture = household();
    fixture.states.push(json!({
        "entity_id": "todo.long",
        "state": "4",
        "attributes": {"integration": "local_todo", "items": ["a", "b", "c", "d"]}
    }));
    let (base_url, _db) = start(fixture);

    let resolved = resolver(&base_url, TOKEN)
        .resolve_items("todo.long", Some(3))
        .unwrap();
    assert_eq!(resolved.items.len(), 3);
    assert_eq!(resolved.total_count, 4);
    assert!(resolved.truncated);
}

#[test]
fn legacy_fallback_when_no_todo_entities() {
    let fixture = Fixture::from_json(
        &json!({
            "token": TOKEN,
            "states": [{"entity_id": "light.kitchen", "state": "off"}],
            "shopping_list": [
                {"id": "l1", "name": "Soap", "complete": false},
                {"id": "l2", "name": "Sponges", "complete": true}
            ]
        })
        .to_string(),
    )
    .unwrap();
    let (base_url, _db) = start(fixture);
    let r = resolver(&base_url, TOKEN);

    let lists = r.enumerate_lists();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].id, LEGACY_SHOPPING_LIST_ID);
    assert_eq!(lists[0].item_count, 1);

    let resolved = r.resolve_items(LEGACY_SHOPPING_LIST_ID, None).unwrap();
    assert_eq!(resolved.items[0].name, "Soap");
}

#[test]
fn wrong_token_degrades_to_empty() {
    let (base_url, _db) = start(household());
    let r = resolver(&base_url, "not-the-token");

    assert!(r.enumerate_lists().is_empty());
    let resolved = r.resolve_items("todo.groceries", None).unwrap();
    assert!(resolved.items.is_empty());
    assert_eq!(resolved.total_count, 0);
}

#[test]
fn unreachable_server_degrades_to_empty() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let r = resolver(&format!("http://{addr}"), TOKEN);

    assert!(r.enumerate_lists().is_empty());
    assert!(r.resolve_items("todo.shopping", None).unwrap().items.is_empty());
}

#[test]
fn silent_server_times_out_each_call() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept and hold every connection without ever answering.
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => held.push(stream),
                Err(_) => break,
            }
        }
    });

    let timeout = Duration::from_millis(300);
    let r = resolver_with_timeout(&format!("http://{addr}"), TOKEN, timeout);

    let started = Instant::now();
    let resolved = r.resolve_items("todo.shopping", None).unwrap();
    let elapsed = started.elapsed();

    assert_eq!(resolved, ResolvedItems::default());
    // State fetch plus the two network attempts of the generic chain.
    assert!(elapsed >= timeout * 3, "returned too early: {elapsed:?}");
    assert!(elapsed < timeout * 10, "not bounded by the timeout: {elapsed:?}");
}

//! End-to-end tests of the headless NDJSON loop

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use shipyard::run_event_loop;
use shipyard_api::{load_fixture, MemoryApi};
use shipyard_app::config::Settings;
use shipyard_app::Engine;

fn settings_for(user: &str, admin: bool) -> Settings {
    let mut settings = Settings::default();
    settings.session.user_id = user.to_string();
    settings.session.admin = admin;
    settings.api.refresh_interval_secs = 0;
    settings
}

fn fixture_api() -> MemoryApi {
    MemoryApi::new(
        load_fixture(&Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/resources.json"))
            .unwrap(),
    )
}

/// Feed `script` to the loop, then close input; returns every output line
async fn run_script(api: Arc<MemoryApi>, settings: Settings, script: &[Value]) -> Vec<Value> {
    let (tx, rx) = mpsc::channel(script.len().max(1));
    for line in script {
        // bare words go through as-is
        let line = match line {
            Value::String(word) => word.clone(),
            other => other.to_string(),
        };
        tx.send(line).await.unwrap();
    }
    drop(tx);

    let mut engine = Engine::new(api, settings);
    let mut out = Vec::new();
    run_event_loop(&mut engine, rx, &mut out).await.unwrap();

    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn events_named<'a>(lines: &'a [Value], name: &str) -> Vec<&'a Value> {
    lines.iter().filter(|line| line["event"] == name).collect()
}

#[tokio::test]
async fn test_ready_and_listing_respect_read_permission() {
    let lines = run_script(
        Arc::new(fixture_api()),
        settings_for("alice", false),
        &[json!({ "cmd": "list" })],
    )
    .await;

    assert_eq!(events_named(&lines, "resources_loaded").len(), 1);
    let ready = events_named(&lines, "ready");
    assert_eq!(ready[0]["user"], "alice");
    assert_eq!(ready[0]["resources"], 3);

    let listing = events_named(&lines, "resources")[0];
    let names: Vec<_> = listing["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["api", "edge"]);
    assert_eq!(listing["resources"][0]["can_edit"], true);
    assert_eq!(listing["resources"][1]["can_edit"], false);

    assert_eq!(lines.last().unwrap()["event"], "shutdown");
}

#[tokio::test]
async fn test_port_editing_session_commits_only_ports() {
    let api = Arc::new(fixture_api());
    let lines = run_script(
        api.clone(),
        settings_for("alice", false),
        &[
            json!({ "cmd": "open", "id": "dep-api" }),
            json!({ "cmd": "edit", "id": "dep-api", "action": "append", "path": "ports" }),
            json!({ "cmd": "edit", "id": "dep-api", "action": "set_row_field", "path": "ports",
                    "row": { "index": 1 }, "field": "local", "value": " 8443 " }),
            json!({ "cmd": "edit", "id": "dep-api", "action": "set_row_field", "path": "ports",
                    "row": { "index": 1 }, "field": "container", "value": "443" }),
            json!({ "cmd": "edit", "id": "dep-api", "action": "remove", "path": "ports",
                    "row": { "matching": { "type": "port", "value": { "local": "8080", "container": "80" } } } }),
            json!({ "cmd": "save", "id": "dep-api" }),
            json!({ "cmd": "wait" }),
            json!({ "cmd": "show", "id": "dep-api" }),
            json!({ "cmd": "history", "id": "dep-api" }),
        ],
    )
    .await;

    assert!(events_named(&lines, "edit_rejected").is_empty());
    assert_eq!(events_named(&lines, "save_started")[0]["fields"], json!(["ports"]));

    let shown = &events_named(&lines, "resource")[0]["resource"];
    assert_eq!(shown["dirty"], false);
    assert_eq!(shown["revision"], 2);
    assert_eq!(
        shown["snapshot"]["ports"],
        json!([{ "local": "8443", "container": "443" }])
    );
    assert_eq!(shown["draft"]["ports"], shown["snapshot"]["ports"]);
    assert_eq!(shown["snapshot"]["image"], "ghcr.io/acme/api:1.4.2");

    let history = &events_named(&lines, "history")[0]["records"];
    assert_eq!(history[0]["success"], true);
    assert_eq!(history[0]["operator"], "alice");

    let submissions = api.submissions().await;
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].partial.changed_fields(), vec!["ports"]);
}

#[tokio::test]
async fn test_read_only_user_cannot_edit() {
    let api = Arc::new(fixture_api());
    let lines = run_script(
        api.clone(),
        settings_for("bob", false),
        &[
            json!({ "cmd": "edit", "id": "dep-api", "action": "set_text", "path": "image", "value": "evil" }),
            json!({ "cmd": "save", "id": "dep-api" }),
            json!({ "cmd": "wait" }),
        ],
    )
    .await;

    let rejected = events_named(&lines, "edit_rejected");
    assert_eq!(rejected[0]["wiring"], false);
    assert!(events_named(&lines, "draft_opened").is_empty());
    assert!(events_named(&lines, "save_started").is_empty());
    assert!(api.submissions().await.is_empty());
}

#[tokio::test]
async fn test_end_of_input_waits_for_saves() {
    let api = Arc::new(fixture_api());
    let lines = run_script(
        api.clone(),
        settings_for("root", true),
        &[
            json!({ "cmd": "edit", "id": "bld-main", "action": "set_number", "path": "volume_gb", "value": 80 }),
            json!({ "cmd": "save", "id": "bld-main" }),
        ],
    )
    .await;

    let succeeded = events_named(&lines, "save_succeeded");
    assert_eq!(succeeded.len(), 1);
    assert_eq!(succeeded[0]["id"], "bld-main");
    assert_eq!(lines.last().unwrap()["event"], "shutdown");
}

#[tokio::test]
async fn test_bad_lines_are_reported_and_skipped() {
    let lines = run_script(
        Arc::new(fixture_api()),
        settings_for("root", true),
        &[
            json!({ "cmd": "launch" }),
            json!({ "cmd": "show", "id": "missing" }),
            json!({ "cmd": "undo", "id": "dep-api" }),
        ],
    )
    .await;

    let errors = events_named(&lines, "error");
    assert_eq!(errors.len(), 2);
    assert!(errors[0]["message"].as_str().unwrap().starts_with("Invalid command"));
    assert!(errors[1]["message"].as_str().unwrap().contains("missing"));
    assert_eq!(events_named(&lines, "edit_rejected").len(), 1);
}

#[tokio::test]
async fn test_quit_stops_before_remaining_input() {
    let lines = run_script(
        Arc::new(fixture_api()),
        settings_for("root", true),
        &[json!("quit"), json!({ "cmd": "list" })],
    )
    .await;

    assert!(events_named(&lines, "resources").is_empty());
    assert_eq!(lines.last().unwrap()["event"], "shutdown");
}

//! End-to-end protocol sessions driven through `HeadlessRunner::run`.

use serde_json::Value;
use siege_core::config::GameConfig;
use siege_headless::{HeadlessConfig, HeadlessRunner};

fn run_script(runner: &mut HeadlessRunner, script: &[String]) -> Vec<Value> {
    let input = script.join("\n");
    let mut out = Vec::new();
    runner.run(input.as_bytes(), &mut out).unwrap();
    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn quiet() -> HeadlessConfig {
    HeadlessConfig {
        echo_events: false,
        ..HeadlessConfig::default()
    }
}

fn last_state(lines: &[Value]) -> &Value {
    lines
        .iter()
        .rev()
        .find(|l| l["type"] == "state")
        .expect("session produced no state line")
}

#[test]
fn save_then_load_in_new_session_restores_state_and_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.ron");
    let path_str = path.display().to_string();

    let mut first = HeadlessRunner::new(GameConfig::default(), quiet()).unwrap();
    let lines = run_script(
        &mut first,
        &[
            r#"{"cmd":"place","unit":"shooter","column":0,"row":2}"#.to_string(),
            r#"{"cmd":"advance","count":3}"#.to_string(),
            format!(r#"{{"cmd":"save","path":"{path_str}"}}"#),
            r#"{"cmd":"query"}"#.to_string(),
        ],
    );
    let saved = last_state(&lines).clone();
    assert_eq!(saved["turn"], 3);
    assert_eq!(saved["balance"], 300);

    let config = HeadlessConfig {
        load_path: Some(path),
        ..quiet()
    };
    let mut second = HeadlessRunner::new(GameConfig::default(), config).unwrap();
    let lines = run_script(
        &mut second,
        &[
            r#"{"cmd":"query"}"#.to_string(),
            r#"{"cmd":"undo"}"#.to_string(),
            r#"{"cmd":"undo"}"#.to_string(),
            r#"{"cmd":"undo"}"#.to_string(),
            r#"{"cmd":"undo"}"#.to_string(),
            r#"{"cmd":"query"}"#.to_string(),
        ],
    );

    assert_eq!(lines[0]["type"], "ready");
    assert_eq!(lines[0]["turn"], 3);
    let loaded = &lines[1];
    assert_eq!(loaded["type"], "state");
    assert_eq!(loaded["balance"], saved["balance"]);
    assert_eq!(loaded["level"], saved["level"]);
    assert_eq!(
        loaded["entities"].as_array().map(Vec::len),
        saved["entities"].as_array().map(Vec::len)
    );
    assert_eq!(loaded["can_undo"], true);

    let details: Vec<&str> = lines
        .iter()
        .filter(|l| l["type"] == "ack")
        .filter_map(|l| l["detail"].as_str())
        .collect();
    assert_eq!(details, vec!["undone", "undone", "undone", "undone"]);
    let rewound = last_state(&lines);
    assert_eq!(rewound["turn"], 0);
    assert_eq!(rewound["balance"], 400);
    assert_eq!(rewound["can_undo"], false);
}

#[test]
fn load_of_missing_file_is_reported_and_session_continues() {
    let mut runner = HeadlessRunner::new(GameConfig::default(), quiet()).unwrap();
    let lines = run_script(
        &mut runner,
        &[
            r#"{"cmd":"load","path":"/nonexistent/save.ron"}"#.to_string(),
            r#"{"cmd":"query"}"#.to_string(),
        ],
    );
    assert_eq!(lines[1]["type"], "error");
    assert_eq!(lines[1]["cmd"], "load");
    assert_eq!(last_state(&lines)["turn"], 0);
}

#[test]
fn events_precede_acknowledgement() {
    let mut runner =
        HeadlessRunner::new(GameConfig::default(), HeadlessConfig::default()).unwrap();
    let lines = run_script(
        &mut runner,
        &[r#"{"cmd":"place","unit":"wall","column":3,"row":0}"#.to_string()],
    );
    let ack = lines.iter().position(|l| l["type"] == "ack").unwrap();
    let first_event = lines.iter().position(|l| l["type"] == "event").unwrap();
    assert!(first_event < ack);
    assert_eq!(lines[ack]["detail"], "placed");
}

#[test]
fn cooldown_rejection_is_reported_in_ack() {
    let mut runner = HeadlessRunner::new(GameConfig::default(), quiet()).unwrap();
    let lines = run_script(
        &mut runner,
        &[
            r#"{"cmd":"place","unit":"shooter","column":0,"row":0}"#.to_string(),
            r#"{"cmd":"place","unit":"shooter","column":0,"row":1}"#.to_string(),
        ],
    );
    let details: Vec<&str> = lines
        .iter()
        .filter(|l| l["type"] == "ack")
        .filter_map(|l| l["detail"].as_str())
        .collect();
    assert_eq!(details[0], "placed");
    assert!(details[1].starts_with("rejected:"), "got {details:?}");
}

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use inquest_bench::arena::EvalRunner;
use inquest_bench::config::EvalConfig;
use predicates::prelude::*;
use sha2::{Digest, Sha256};
use tempfile::tempdir;

fn eval_yaml(output_dir: &Path) -> String {
    format!(
        r#"
run_id: "test_smoke"
catalog:
  synthetic:
    characters: 12
    traits: 10
games:
  seed: 4242
  count: 6
agents:
  - name: "entropy"
    selector: "entropy"
  - name: "entropy_learning"
    selector: "entropy"
    learning: true
  - name: "uniform"
    selector: "uniform"
outputs:
  jsonl: "{jsonl}"
  summary_md: "{summary}"
  plots_dir: "{plots}"
oracle:
  unknown_rate: 0.0
  lie_rate: 0.0
metrics:
  baseline: "uniform"
logging:
  enable_structured: false
"#,
        jsonl = output_dir.join("games.jsonl").display(),
        summary = output_dir.join("summary.md").display(),
        plots = output_dir.join("plots").display()
    )
}

fn load_config(output_dir: &Path) -> EvalConfig {
    let mut cfg: EvalConfig = serde_yaml::from_str(&eval_yaml(output_dir)).expect("valid yaml");
    cfg.validate().expect("config validates");
    cfg
}

fn run_once(output_dir: &Path) -> String {
    let config = load_config(output_dir);
    let outputs = config.resolved_outputs();
    let runner = EvalRunner::new(config, outputs).expect("runner created");
    let summary = runner.run().expect("evaluation completes");

    assert_eq!(summary.games_played, 6);
    assert_eq!(summary.agents, 3);
    assert_eq!(summary.rows_written, 18);
    assert!(summary.summary_path.exists(), "summary markdown missing");
    // Plot rendering is optional; ensure any failure surfaces explicitly
    if let Some(plot_path) = summary.plot_path {
        assert!(plot_path.exists(), "plot path reported but missing on disk");
    }

    fs::read_to_string(&summary.jsonl_path).expect("jsonl readable")
}

fn digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[test]
fn same_seed_runs_are_byte_deterministic() {
    let dir = tempdir().expect("temp dir");
    let first = run_once(&dir.path().join("a"));
    let second = run_once(&dir.path().join("b"));

    assert_eq!(
        digest(&first),
        digest(&second),
        "same-seed runs must produce identical JSONL"
    );
}

#[test]
fn entropy_agent_solves_a_separable_catalog_without_noise() {
    let dir = tempdir().expect("temp dir");
    let jsonl = run_once(dir.path());

    let mut entropy_rows = 0;
    for line in jsonl.lines() {
        let row: serde_json::Value = serde_json::from_str(line).expect("row decodes to JSON");
        if row["agent"] == "entropy" {
            entropy_rows += 1;
            assert_eq!(
                row["solved"], true,
                "entropy agent failed game {} on a separable catalog",
                row["game_id"]
            );
            let questions = row["questions"].as_u64().expect("questions field");
            assert!(questions <= 20, "game ran past the question cap");
        }
    }
    assert_eq!(entropy_rows, 6);
}

#[test]
fn binary_validates_a_config_without_running() {
    let dir = tempdir().expect("temp dir");
    let config_path = dir.path().join("eval.yaml");
    fs::write(&config_path, eval_yaml(dir.path())).expect("config written");

    Command::cargo_bin("inquest-bench")
        .expect("binary built")
        .arg("--config")
        .arg(&config_path)
        .arg("--validate-only")
        .assert()
        .success()
        .stdout(predicate::str::contains("Validation-only mode"));

    assert!(
        !dir.path().join("games.jsonl").exists(),
        "validate-only must not play games"
    );
}

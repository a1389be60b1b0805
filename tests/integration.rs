use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const FOX: &str = "the quick brown fox jumps over the lazy dog";

fn psmith_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("psmith");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    let fox_post = vec![FOX; 3].join(" ");
    let corpus = serde_json::json!({
        "model": "test-embedder",
        "chunks": [
            {
                "id": "A",
                "text": "Ship small, ship often, and tell people what you learned along the way.",
                "embedding": [1.0, 0.0],
                "metadata": {"author": "Jane", "date": "2024-01-10", "post_id": "p1"}
            },
            {
                "id": "A2",
                "text": "Ship small and ship often, then tell people what you learned.",
                "embedding": [1.0, -0.02],
                "metadata": {"author": "Jane", "date": "2024-01-10", "post_id": "p1"}
            },
            {
                "id": "B",
                "text": fox_post,
                "embedding": [0.0, 1.0],
                "metadata": {"author": "Sam", "date": "2023-12-01", "post_id": "p2"}
            }
        ]
    });
    fs::write(
        data_dir.join("corpus.json"),
        serde_json::to_string_pretty(&corpus).unwrap(),
    )
    .unwrap();

    fs::write(
        root.join("copied.txt"),
        format!("Here is my take: {}", fox_post.to_uppercase()),
    )
    .unwrap();
    fs::write(
        root.join("fresh.txt"),
        "Momentum comes from finishing things, not from starting them.",
    )
    .unwrap();

    let config_content = format!(
        r#"[corpus]
path = "{}/data/corpus.json"

[retrieval]
top_k = 2
lambda_mult = 0.5
fetch_k = 20

[overlap]
threshold = 25
"#,
        root.display()
    );

    let config_path = config_dir.join("psmith.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_psmith(config_path: &Path, args: &[&str]) -> (String, String, Option<i32>) {
    let binary = psmith_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run psmith binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code())
}

#[test]
fn test_select_mmr_skips_near_duplicate() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, code) = run_psmith(&config_path, &["select", "--query", "1,0.2"]);
    assert_eq!(code, Some(0), "select failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Selected 2 chunks"));
    assert!(stdout.contains("1. ["));
    assert!(stdout.contains("] A (mmr"), "got: {}", stdout);
    assert!(stdout.contains("] B (mmr"), "got: {}", stdout);
    assert!(!stdout.contains("] A2"));
    assert!(stdout.contains("Lexical diversity:"));
}

#[test]
fn test_select_without_mmr_returns_top_k() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, code) = run_psmith(&config_path, &["select", "--query", "1,0.2", "--no-mmr"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("top-k"));
    assert!(stdout.contains("] A\n"));
    assert!(stdout.contains("] A2\n"));
    assert!(!stdout.contains("] B"));
}

#[test]
fn test_select_json_from_query_file() {
    let (tmp, config_path) = setup_test_env();
    let query_path = tmp.path().join("query.json");
    fs::write(&query_path, "[1.0, 0.2]").unwrap();

    let (stdout, stderr, code) = run_psmith(
        &config_path,
        &["select", "--query", query_path.to_str().unwrap(), "--k", "3", "--json"],
    );
    assert_eq!(code, Some(0), "stderr={}", stderr);
    let report: Value = serde_json::from_str(&stdout).unwrap();
    let ids: Vec<&str> = report["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["chunk"]["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[0], "A");
    assert_eq!(report["params"]["top_k"], 3);
    assert_eq!(report["params"]["metric"], "cosine");
    assert!(report["lexical_diversity"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_select_rejects_bad_lambda() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, code) = run_psmith(&config_path, &["select", "--query", "1,0", "--lambda", "1.5"]);
    assert_ne!(code, Some(0));
    assert!(stderr.contains("lambda_mult"), "stderr={}", stderr);
}

#[test]
fn test_select_rejects_fetch_k_below_k() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, code) = run_psmith(
        &config_path,
        &["select", "--query", "1,0.2", "--k", "30", "--fetch-k", "10"],
    );
    assert_ne!(code, Some(0));
    assert!(stderr.contains("retrieval.fetch_k"), "stderr={}", stderr);
}

#[test]
fn test_rank_lists_whole_corpus() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, code) = run_psmith(&config_path, &["rank", "--query", "0,1", "--json"]);
    assert_eq!(code, Some(0));
    let ranked: Value = serde_json::from_str(&stdout).unwrap();
    let ranked = ranked.as_array().unwrap();
    assert_eq!(ranked.len(), 3);
    assert_eq!(ranked[0]["chunk"]["id"], "B");
    assert!(ranked[0].get("mmr_score").is_none());
}

#[test]
fn test_rank_dimension_mismatch() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, code) = run_psmith(&config_path, &["rank", "--query", "1,0,0"]);
    assert_ne!(code, Some(0));
    assert!(stderr.contains("Dimension mismatch"), "stderr={}", stderr);
}

#[test]
fn test_check_flags_copied_text() {
    let (tmp, config_path) = setup_test_env();
    let draft = tmp.path().join("copied.txt");

    let (stdout, stderr, code) = run_psmith(&config_path, &["check", draft.to_str().unwrap()]);
    assert_eq!(code, Some(2), "stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("OVERLAP DETECTED"));
    assert!(stdout.contains("27 consecutive words matched from 'B'"));
}

#[test]
fn test_check_passes_fresh_text() {
    let (tmp, config_path) = setup_test_env();
    let draft = tmp.path().join("fresh.txt");

    let (stdout, _, code) = run_psmith(&config_path, &["check", draft.to_str().unwrap()]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("NO OVERLAP DETECTED"));
}

#[test]
fn test_check_restricted_to_sources() {
    let (tmp, config_path) = setup_test_env();
    let draft = tmp.path().join("copied.txt");

    let (stdout, _, code) = run_psmith(
        &config_path,
        &["check", draft.to_str().unwrap(), "--source", "A", "--source", "A2"],
    );
    assert_eq!(code, Some(0), "stdout={}", stdout);

    let (_, stderr, code) = run_psmith(
        &config_path,
        &["check", draft.to_str().unwrap(), "--source", "nope"],
    );
    assert_eq!(code, Some(1));
    assert!(stderr.contains("nope"));
}

#[test]
fn test_check_batch_json() {
    let (tmp, config_path) = setup_test_env();
    let copied = tmp.path().join("copied.txt");
    let fresh = tmp.path().join("fresh.txt");

    let (stdout, _, code) = run_psmith(
        &config_path,
        &[
            "check",
            copied.to_str().unwrap(),
            fresh.to_str().unwrap(),
            "--json",
        ],
    );
    assert_eq!(code, Some(2));
    let report: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["checks"][0]["exceeds_threshold"], true);
    assert_eq!(report["checks"][0]["spans"][0]["source_id"], "B");
    assert_eq!(report["checks"][0]["spans"][0]["word_count"], 27);
    assert_eq!(report["checks"][1]["exceeds_threshold"], false);
    assert_eq!(report["stats"]["total_checks"], 2);
    assert_eq!(report["stats"]["flagged_count"], 1);
    assert_eq!(report["stats"]["max_word_overlap"], 27);
}

#[test]
fn test_check_threshold_override() {
    let (tmp, config_path) = setup_test_env();
    let draft = tmp.path().join("copied.txt");

    let (_, _, code) = run_psmith(
        &config_path,
        &["check", draft.to_str().unwrap(), "--threshold", "28"],
    );
    assert_eq!(code, Some(0));

    let (_, stderr, code) = run_psmith(
        &config_path,
        &["check", draft.to_str().unwrap(), "--threshold", "0"],
    );
    assert_eq!(code, Some(1));
    assert!(stderr.contains("threshold"));
}

#[test]
fn test_stats() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, code) = run_psmith(&config_path, &["stats"]);
    assert_eq!(code, Some(0), "stderr={}", stderr);
    assert!(stdout.contains("Chunks:      3"));
    assert!(stdout.contains("Posts:       2"));
    assert!(stdout.contains("Dimensions:  2"));
    assert!(stdout.contains("Model:       test-embedder"));
    assert!(stdout.contains("2023-12-01 .. 2024-01-10"));
    assert!(stdout.contains("Jane"));
}

#[test]
fn test_missing_config_uses_defaults_with_corpus_flag() {
    let (tmp, _config_path) = setup_test_env();
    let corpus = tmp.path().join("data/corpus.json");
    let absent = tmp.path().join("config/absent.toml");

    let (stdout, stderr, code) = run_psmith(
        &absent,
        &["--corpus", corpus.to_str().unwrap(), "stats"],
    );
    assert_eq!(code, Some(0), "stderr={}", stderr);
    assert!(stdout.contains("Chunks:      3"));
}

#[test]
fn test_invalid_config_rejected() {
    let (_tmp, config_path) = setup_test_env();
    fs::write(&config_path, "[corpus]\npath = \"x.json\"\n[retrieval]\ntop_k = 0\n").unwrap();

    let (_, stderr, code) = run_psmith(&config_path, &["stats"]);
    assert_ne!(code, Some(0));
    assert!(stderr.contains("retrieval.top_k"));
}

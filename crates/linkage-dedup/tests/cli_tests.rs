//! CLI integration tests for linkage-dedup.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a Command for the linkage-dedup binary.
#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin("linkage-dedup").unwrap()
}

const CATALOG_CSV: &str = "\
id,title,brand
1,SanDisk Ultra 32GB microSDHC,sandisk
2,SanDisk Ultra 32GB microSDHC,sandisk
3,Kingston DataTraveler 16GB,kingston
4,Intenso Basic Line 8GB,intenso
";

fn write_catalog(temp: &TempDir) -> std::path::PathBuf {
    let path = temp.path().join("catalog.csv");
    fs::write(&path, CATALOG_CSV).unwrap();
    path
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Duplicate detection for product record tables",
        ));
}

#[test]
fn test_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("linkage-dedup"));
}

#[test]
fn test_match_help_lists_options() {
    cmd()
        .args(["match", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--threshold"))
        .stdout(predicate::str::contains("--size-cutoff"))
        .stdout(predicate::str::contains("--ground-truth"));
}

// ============================================================================
// Argument Validation Tests
// ============================================================================

#[test]
fn test_missing_subcommand() {
    cmd().assert().failure();
}

#[test]
fn test_invalid_threshold() {
    let temp = TempDir::new().unwrap();
    let input = write_catalog(&temp);

    cmd()
        .args(["match", input.to_str().unwrap(), "--threshold", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "threshold must be between 0.0 and 1.0",
        ));
}

#[test]
fn test_zero_size_cutoff() {
    let temp = TempDir::new().unwrap();
    let input = write_catalog(&temp);

    cmd()
        .args(["match", input.to_str().unwrap(), "--size-cutoff", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("size cutoff must be > 0"));
}

#[test]
fn test_unknown_preset() {
    let temp = TempDir::new().unwrap();
    let input = write_catalog(&temp);

    cmd()
        .args(["match", input.to_str().unwrap(), "--preset", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_unknown_extension() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("catalog.txt");
    fs::write(&input, CATALOG_CSV).unwrap();

    cmd()
        .args(["match", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot detect format"));
}

#[test]
fn test_preset_conflicts_with_config() {
    let temp = TempDir::new().unwrap();
    let input = write_catalog(&temp);
    let config = temp.path().join("config.json");
    fs::write(&config, "{}").unwrap();

    cmd()
        .args([
            "match",
            input.to_str().unwrap(),
            "--preset",
            "title-patterns",
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .failure();
}

// ============================================================================
// Match Tests
// ============================================================================

#[test]
fn test_match_pairs_to_stdout() {
    let temp = TempDir::new().unwrap();
    let input = write_catalog(&temp);

    cmd()
        .args(["match", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout("lid,rid\n1,2\n")
        .stderr(predicate::str::contains("Matching Results:"));
}

#[test]
fn test_match_writes_output_file() {
    let temp = TempDir::new().unwrap();
    let input = write_catalog(&temp);
    let output = temp.path().join("matches.csv");

    cmd()
        .args([
            "match",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout("");

    let content = fs::read_to_string(&output).unwrap();
    assert_eq!(content, "lid,rid\n1,2\n");
}

#[test]
fn test_match_with_ground_truth_json() {
    let temp = TempDir::new().unwrap();
    let input = write_catalog(&temp);
    let truth = temp.path().join("truth.csv");
    fs::write(&truth, "lid,rid\n1,2\n3,4\n").unwrap();

    let assert = cmd()
        .args([
            "match",
            input.to_str().unwrap(),
            "--ground-truth",
            truth.to_str().unwrap(),
            "--json",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["config"], "title-patterns");
    assert_eq!(json["stats"]["records"], 4);
    assert_eq!(json["stats"]["matched_pairs"], 1);
    assert_eq!(json["metrics"]["tp"], 1);
    assert_eq!(json["metrics"]["fn"], 1);
    assert_eq!(json["metrics"]["precision"], 1.0);
    assert_eq!(json["metrics"]["recall"], 0.5);
    assert_eq!(json["pairs"], serde_json::json!([{ "lid": 1, "rid": 2 }]));
}

#[test]
fn test_match_keeps_padded_ids() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("padded.csv");
    let truth = temp.path().join("truth.csv");
    fs::write(
        &input,
        "id,title\n0034,SanDisk Ultra 32GB\n0012,SanDisk Ultra 32GB\n0056,Kingston 16GB\n",
    )
    .unwrap();
    fs::write(&truth, "lid,rid\n0012,0034\n").unwrap();

    cmd()
        .args(["match", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout("lid,rid\n0012,0034\n");

    let assert = cmd()
        .args([
            "match",
            input.to_str().unwrap(),
            "-g",
            truth.to_str().unwrap(),
            "--json",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["pairs"], serde_json::json!([{ "lid": "0012", "rid": "0034" }]));
    assert_eq!(json["metrics"]["tp"], 1);
}

#[test]
fn test_match_leading_zero_ids_stay_distinct() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("ids.csv");
    fs::write(&input, "id,title\n007,red shoe\n7,red shoe\n").unwrap();

    cmd()
        .args(["match", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout("lid,rid\n007,7\n");
}

#[test]
fn test_match_with_config_file() {
    let temp = TempDir::new().unwrap();
    let input = write_catalog(&temp);
    let config = temp.path().join("config.json");
    fs::write(
        &config,
        r#"{
            "pipeline": { "compare_field": "title", "similarity_threshold": 0.2 },
            "extractor": { "fields": [ { "field": "brand", "rules": [ "\\w+" ] } ] }
        }"#,
    )
    .unwrap();

    cmd()
        .args([
            "match",
            input.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout("lid,rid\n1,2\n");
}

#[test]
fn test_match_jsonl_input() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("catalog.jsonl");
    fs::write(
        &input,
        concat!(
            r#"{"id": 7, "title": "Lexar 64GB Professional"}"#,
            "\n",
            r#"{"id": 3, "title": "Lexar 64GB Professional"}"#,
            "\n",
        ),
    )
    .unwrap();

    cmd()
        .args(["match", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout("lid,rid\n3,7\n");
}

#[test]
fn test_match_verbose_prints_configuration() {
    let temp = TempDir::new().unwrap();
    let input = write_catalog(&temp);

    cmd()
        .args(["match", input.to_str().unwrap(), "-v"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Configuration:"))
        .stderr(predicate::str::contains("Compare field: title"));
}

// ============================================================================
// Evaluate Tests
// ============================================================================

#[test]
fn test_evaluate_text() {
    let temp = TempDir::new().unwrap();
    let pairs = temp.path().join("pairs.csv");
    let truth = temp.path().join("truth.csv");
    fs::write(&pairs, "lid,rid\n1,2\n5,6\n").unwrap();
    fs::write(&truth, "lid,rid\n1,2\n3,4\n").unwrap();

    cmd()
        .args([
            "evaluate",
            pairs.to_str().unwrap(),
            "--ground-truth",
            truth.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("Evaluation Results:"))
        .stderr(predicate::str::contains("Precision:         0.5000"));
}

#[test]
fn test_evaluate_json() {
    let temp = TempDir::new().unwrap();
    let pairs = temp.path().join("pairs.csv");
    let truth = temp.path().join("truth.csv");
    fs::write(&pairs, "lid,rid\n1,2\n").unwrap();
    fs::write(&truth, "lid,rid\n1,2\n").unwrap();

    let assert = cmd()
        .args([
            "evaluate",
            pairs.to_str().unwrap(),
            "-g",
            truth.to_str().unwrap(),
            "--json",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["f1"], 1.0);
    assert_eq!(json["reported_count"], 1);
}

#[test]
fn test_evaluate_padded_ids_in_both_files() {
    let temp = TempDir::new().unwrap();
    let pairs = temp.path().join("pairs.csv");
    let truth = temp.path().join("truth.csv");
    fs::write(&pairs, "lid,rid\n1,2\n").unwrap();
    fs::write(&truth, "lid,rid\n1,2\n01,02\n").unwrap();

    let assert = cmd()
        .args([
            "evaluate",
            pairs.to_str().unwrap(),
            "-g",
            truth.to_str().unwrap(),
            "--json",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["tp"], 1);
    assert_eq!(json["fn"], 1);
}

#[test]
fn test_evaluate_missing_columns() {
    let temp = TempDir::new().unwrap();
    let pairs = temp.path().join("pairs.csv");
    let truth = temp.path().join("truth.csv");
    fs::write(&pairs, "a,b\n1,2\n").unwrap();
    fs::write(&truth, "lid,rid\n1,2\n").unwrap();

    cmd()
        .args([
            "evaluate",
            pairs.to_str().unwrap(),
            "-g",
            truth.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("lid"));
}

// ============================================================================
// Exact, Presets, Completions
// ============================================================================

#[test]
fn test_exact_duplicates() {
    let temp = TempDir::new().unwrap();
    let input = write_catalog(&temp);

    for hash in ["blake3", "xxh3"] {
        cmd()
            .args([
                "exact",
                input.to_str().unwrap(),
                "--fields",
                "title,brand",
                "--hash",
                hash,
            ])
            .assert()
            .success()
            .stdout("lid,rid\n1,2\n")
            .stderr(predicate::str::contains("Duplicate pairs:   1"));
    }
}

#[test]
fn test_exact_unknown_field() {
    let temp = TempDir::new().unwrap();
    let input = write_catalog(&temp);

    cmd()
        .args(["exact", input.to_str().unwrap(), "--fields", "color"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("color"));
}

#[test]
fn test_presets_lists_all() {
    cmd()
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("model-phrase"))
        .stdout(predicate::str::contains("codes-and-words"))
        .stdout(predicate::str::contains("title-patterns"))
        .stdout(predicate::str::contains("catalog-aliases"));
}

#[test]
fn test_single_preset_is_loadable_config() {
    let assert = cmd()
        .args(["presets", "catalog-aliases"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let config: linkage_dedup::DatasetConfig = serde_json::from_str(&stdout).unwrap();
    assert_eq!(config.pipeline.compare_field, "name");
    assert_eq!(config.pipeline.similarity_threshold, 0.7);
}

#[test]
fn test_completions() {
    cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("linkage-dedup"));
}

//! Integration tests for the kitroom CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const CATALOG: &str = r#"
categories:
  - { category_id: 1, name: Audio }
  - { category_id: 2, name: Lighting }
subcategories:
  - { subcategory_id: 10, category_id: 1, name: Mixers }
subsubcategories:
  - { subsubcategory_id: 100, subcategory_id: 10, name: Digital }
products:
  - { product_id: 1, name: Speaker, category_id: 1, price_per_day: 25.0 }
  - { product_id: 2, name: Analog Mixer, category_id: 1, subcategory_id: 10, price_per_day: 40.0 }
  - { product_id: 3, name: Digital Mixer, category_id: 1, subcategory_id: 10, subsubcategory_id: 100, price_per_day: 90.0 }
  - { product_id: 4, name: Spotlight, category_id: 2, price_per_day: 15.0 }
  - { product_id: 5, name: Cable Drum }
jobs:
  - { job_id: 1, name: Festival }
  - { job_id: 2, name: Wedding }
cases:
  - { case_id: 1, name: Audio Rack }
"#;

const DEVICES: &str = "device_id,serial_number,product_id,status
SPK-1,SN-001,1,free
MIX-1,SN-002,2,free
DMX-1,SN-003,3,free
LGT-1,SN-004,4,free
CBL-1,SN-005,5,free
";

/// Helper to get a kitroom command
fn kitroom() -> Command {
    let mut cmd = Command::cargo_bin("kitroom").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Helper to create an initialized project in a temp directory
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    kitroom().current_dir(tmp.path()).arg("init").assert().success();
    tmp
}

/// Helper to create a project with the catalog and devices loaded
fn setup_loaded_project() -> TempDir {
    let tmp = setup_test_project();
    fs::write(tmp.path().join("catalog.yaml"), CATALOG).unwrap();
    fs::write(tmp.path().join("devices.csv"), DEVICES).unwrap();

    kitroom()
        .current_dir(tmp.path())
        .args(["import", "catalog", "catalog.yaml"])
        .assert()
        .success();
    kitroom()
        .current_dir(tmp.path())
        .args(["import", "devices", "devices.csv"])
        .assert()
        .success();
    tmp
}

fn stdout_json(tmp: &TempDir, args: &[&str]) -> serde_json::Value {
    let output = kitroom()
        .current_dir(tmp.path())
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?} failed: {:?}", args, output);
    serde_json::from_slice(&output.stdout).unwrap()
}

// ============================================================================
// Init Command Tests
// ============================================================================

#[test]
fn test_init_creates_project_structure() {
    let tmp = TempDir::new().unwrap();

    kitroom()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized kitroom project"));

    assert!(tmp.path().join(".kitroom").is_dir());
    assert!(tmp.path().join(".kitroom/config.yaml").is_file());
    assert!(tmp.path().join(".kitroom/inventory.db").is_file());
}

#[test]
fn test_init_twice_is_harmless() {
    let tmp = setup_test_project();

    kitroom()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_outside_project_fail() {
    let tmp = TempDir::new().unwrap();

    kitroom()
        .current_dir(tmp.path())
        .args(["inventory", "list"])
        .assert()
        .failure();
}

// ============================================================================
// Import Command Tests
// ============================================================================

#[test]
fn test_import_loads_devices() {
    let tmp = setup_loaded_project();

    kitroom()
        .current_dir(tmp.path())
        .args(["device", "unassigned"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SPK-1"))
        .stdout(predicate::str::contains("CBL-1"));
}

#[test]
fn test_import_devices_dry_run_writes_nothing() {
    let tmp = setup_test_project();
    fs::write(tmp.path().join("devices.csv"), DEVICES).unwrap();

    kitroom()
        .current_dir(tmp.path())
        .args(["import", "devices", "devices.csv", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dry run"));

    let stats = stdout_json(&tmp, &["store", "status", "-f", "json"]);
    assert_eq!(stats["devices"], 0);
}

#[test]
fn test_import_devices_bad_row_fails_without_skip() {
    let tmp = setup_test_project();
    fs::write(
        tmp.path().join("devices.csv"),
        "device_id,status\nA-1,free\nA-2,broken\nA-3,free\n",
    )
    .unwrap();

    kitroom()
        .current_dir(tmp.path())
        .args(["import", "devices", "devices.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Row 3"));

    kitroom()
        .current_dir(tmp.path())
        .args(["import", "devices", "devices.csv", "--skip-errors"])
        .assert()
        .success();

    let stats = stdout_json(&tmp, &["store", "status", "-f", "json"]);
    assert_eq!(stats["devices"], 2);
}

#[test]
fn test_import_missing_file() {
    let tmp = setup_test_project();

    kitroom()
        .current_dir(tmp.path())
        .args(["import", "catalog", "nope.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

// ============================================================================
// Job Command Tests
// ============================================================================

#[test]
fn test_assign_then_conflict() {
    let tmp = setup_loaded_project();

    kitroom()
        .current_dir(tmp.path())
        .args(["job", "assign", "1", "SPK-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Assigned SPK-1 to job 1"));

    kitroom()
        .current_dir(tmp.path())
        .args(["job", "assign", "2", "SPK-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already assigned"));

    let devices = stdout_json(&tmp, &["job", "devices", "1", "-f", "json"]);
    assert_eq!(devices.as_array().unwrap().len(), 1);
    let other = stdout_json(&tmp, &["job", "devices", "2", "-f", "json"]);
    assert!(other.as_array().unwrap().is_empty());
}

#[test]
fn test_assign_price_override_only_when_positive() {
    let tmp = setup_loaded_project();

    kitroom()
        .current_dir(tmp.path())
        .args(["job", "assign", "1", "SPK-1", "--price", "0"])
        .assert()
        .success();
    kitroom()
        .current_dir(tmp.path())
        .args(["job", "assign", "1", "MIX-1", "--price", "55.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("55.50/day"));

    let devices = stdout_json(&tmp, &["job", "devices", "1", "-f", "json"]);
    let by_id = |id: &str| {
        devices
            .as_array()
            .unwrap()
            .iter()
            .find(|a| a["device_id"] == id)
            .cloned()
            .unwrap()
    };
    assert!(by_id("SPK-1")["custom_price"].is_null());
    assert_eq!(by_id("MIX-1")["custom_price"], 55.5);
}

#[test]
fn test_assign_unknown_job_or_device() {
    let tmp = setup_loaded_project();

    kitroom()
        .current_dir(tmp.path())
        .args(["job", "assign", "99", "SPK-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("job not found"));

    kitroom()
        .current_dir(tmp.path())
        .args(["job", "assign", "1", "GHOST"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("device not found"));
}

#[test]
fn test_remove_frees_device_for_other_job() {
    let tmp = setup_loaded_project();

    kitroom()
        .current_dir(tmp.path())
        .args(["job", "assign", "1", "SPK-1"])
        .assert()
        .success();
    kitroom()
        .current_dir(tmp.path())
        .args(["job", "remove", "1", "SPK-1"])
        .assert()
        .success();
    kitroom()
        .current_dir(tmp.path())
        .args(["job", "remove", "1", "SPK-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("assignment not found"));
    kitroom()
        .current_dir(tmp.path())
        .args(["job", "assign", "2", "SPK-1"])
        .assert()
        .success();
}

#[test]
fn test_bulk_reports_each_item() {
    let tmp = setup_loaded_project();

    kitroom()
        .current_dir(tmp.path())
        .args(["job", "assign", "2", "LGT-1"])
        .assert()
        .success();

    let items = stdout_json(
        &tmp,
        &["job", "bulk", "1", "SPK-1", "SN-002", "LGT-1", "GHOST", "-f", "json"],
    );
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 4);

    assert_eq!(items[0]["ok"], true);
    assert_eq!(items[1]["device_id"], "MIX-1");
    assert_eq!(items[1]["ok"], true);
    assert_eq!(items[2]["ok"], false);
    assert_eq!(items[2]["outcome"]["kind"], "conflict");
    assert_eq!(items[2]["outcome"]["job_id"], 2);
    assert_eq!(items[3]["outcome"]["kind"], "not_found");
}

#[test]
fn test_bulk_table_summary() {
    let tmp = setup_loaded_project();

    kitroom()
        .current_dir(tmp.path())
        .args(["job", "bulk", "1", "SPK-1", "GHOST"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not_found"))
        .stdout(predicate::str::contains("1 assigned, 1 failed"));
}

// ============================================================================
// Case Command Tests
// ============================================================================

#[test]
fn test_case_membership_is_exclusive() {
    let tmp = setup_loaded_project();
    fs::write(
        tmp.path().join("more.yaml"),
        "cases:\n  - { case_id: 2, name: Light Box }\n",
    )
    .unwrap();
    kitroom()
        .current_dir(tmp.path())
        .args(["import", "catalog", "more.yaml"])
        .assert()
        .success();

    kitroom()
        .current_dir(tmp.path())
        .args(["case", "add", "1", "SPK-1"])
        .assert()
        .success();
    kitroom()
        .current_dir(tmp.path())
        .args(["case", "add", "2", "SPK-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already in case 1"));

    let available = stdout_json(&tmp, &["case", "available", "2", "-f", "json"]);
    let ids: Vec<&str> = available
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["device_id"].as_str().unwrap())
        .collect();
    assert!(!ids.contains(&"SPK-1"));
    assert!(ids.contains(&"MIX-1"));
}

#[test]
fn test_scan_case_into_job() {
    let tmp = setup_loaded_project();

    for device in ["SPK-1", "MIX-1", "DMX-1"] {
        kitroom()
            .current_dir(tmp.path())
            .args(["case", "add", "1", device])
            .assert()
            .success();
    }
    kitroom()
        .current_dir(tmp.path())
        .args(["job", "assign", "2", "MIX-1"])
        .assert()
        .success();

    let items = stdout_json(&tmp, &["job", "scan-case", "1", "1", "-f", "json"]);
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 3);
    let ok: Vec<_> = items.iter().filter(|i| i["ok"] == true).collect();
    assert_eq!(ok.len(), 2);
    let conflict = items.iter().find(|i| i["reference"] == "MIX-1").unwrap();
    assert_eq!(conflict["outcome"]["kind"], "conflict");
}

#[test]
fn test_case_remove_reports_absent_device() {
    let tmp = setup_loaded_project();

    kitroom()
        .current_dir(tmp.path())
        .args(["case", "remove", "1", "SPK-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("was not in case"));
}

// ============================================================================
// Inventory Command Tests
// ============================================================================

#[test]
fn test_inventory_list_json() {
    let tmp = setup_loaded_project();

    let page = stdout_json(&tmp, &["inventory", "list", "-f", "json"]);
    assert_eq!(page["view"], "list");
    assert_eq!(page["total_count"], 5);
    assert_eq!(page["page"], 1);
    assert_eq!(page["items"]["devices"].as_array().unwrap().len(), 5);
}

#[test]
fn test_inventory_search() {
    let tmp = setup_loaded_project();

    let page = stdout_json(
        &tmp,
        &["inventory", "list", "--search", "mixer", "-f", "json"],
    );
    assert_eq!(page["total_count"], 2);
}

#[test]
fn test_inventory_search_treats_wildcards_literally() {
    let tmp = setup_loaded_project();

    let page = stdout_json(&tmp, &["inventory", "list", "--search", "SN_00", "-f", "json"]);
    assert_eq!(page["total_count"], 0);
    let page = stdout_json(&tmp, &["inventory", "list", "--search", "%", "-f", "json"]);
    assert_eq!(page["total_count"], 0);
}

#[test]
fn test_inventory_huge_page_is_an_error() {
    let tmp = setup_loaded_project();
    let page = usize::MAX.to_string();

    kitroom()
        .current_dir(tmp.path())
        .args(["inventory", "list", "--page", page.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("page out of range"));
}

#[test]
fn test_inventory_tree_drops_uncategorized() {
    let tmp = setup_loaded_project();

    let tree = stdout_json(&tmp, &["inventory", "list", "--view", "tree", "-f", "json"]);
    assert_eq!(tree["view"], "tree");
    assert_eq!(tree["total_count"], 4);

    let nodes = tree["items"].as_array().unwrap();
    let names: Vec<&str> = nodes.iter().map(|n| n["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Audio", "Lighting"]);

    let audio = &nodes[0];
    assert_eq!(audio["device_count"], 3);
    assert_eq!(audio["direct_devices"][0]["device_id"], "SPK-1");
    let mixers = &audio["subcategories"][0];
    assert_eq!(mixers["direct_devices"][0]["device_id"], "MIX-1");
    assert_eq!(mixers["subsubcategories"][0]["devices"][0]["device_id"], "DMX-1");
}

#[test]
fn test_inventory_tree_text_output() {
    let tmp = setup_loaded_project();

    kitroom()
        .current_dir(tmp.path())
        .args(["inventory", "list", "--view", "tree"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Audio (3)"))
        .stdout(predicate::str::contains("Digital (1)"))
        .stdout(predicate::str::contains("CBL-1").not());
}

#[test]
fn test_inventory_categorized_keeps_uncategorized() {
    let tmp = setup_loaded_project();

    let result = stdout_json(
        &tmp,
        &["inventory", "list", "--view", "categorized", "-f", "json"],
    );
    let groups = result["items"].as_array().unwrap();
    let last = groups.last().unwrap();
    assert_eq!(last["category"], "Uncategorized");
    assert_eq!(last["devices"][0]["device_id"], "CBL-1");
}

// ============================================================================
// Device and Sweep Command Tests
// ============================================================================

#[test]
fn test_device_status_change() {
    let tmp = setup_loaded_project();

    kitroom()
        .current_dir(tmp.path())
        .args(["device", "status", "LGT-1", "maintenance"])
        .assert()
        .success();

    let page = stdout_json(&tmp, &["inventory", "list", "--search", "SN-004", "-f", "json"]);
    assert_eq!(page["items"]["devices"][0]["status"], "maintenance");
}

#[test]
fn test_sweep_frees_paid_jobs() {
    let tmp = setup_loaded_project();

    kitroom()
        .current_dir(tmp.path())
        .args(["job", "bulk", "1", "SPK-1", "MIX-1"])
        .assert()
        .success();
    kitroom()
        .current_dir(tmp.path())
        .args(["job", "assign", "2", "LGT-1"])
        .assert()
        .success();
    kitroom()
        .current_dir(tmp.path())
        .args(["job", "set-status", "1", "paid"])
        .assert()
        .success();

    let outcome = stdout_json(&tmp, &["sweep", "-f", "json"]);
    assert_eq!(outcome["freed"]["jobs"], serde_json::json!([1]));
    assert_eq!(outcome["freed"]["assignments_removed"], 2);
    assert!(outcome["reconciled"].is_null());

    let job1 = stdout_json(&tmp, &["job", "devices", "1", "-f", "json"]);
    assert!(job1.as_array().unwrap().is_empty());
    let job2 = stdout_json(&tmp, &["job", "devices", "2", "-f", "json"]);
    assert_eq!(job2.as_array().unwrap().len(), 1);
}

#[test]
fn test_sweep_with_nothing_to_do() {
    let tmp = setup_loaded_project();

    kitroom()
        .current_dir(tmp.path())
        .arg("sweep")
        .assert()
        .success()
        .stdout(predicate::str::contains("No paid jobs"));
}

#[test]
fn test_sweep_reconcile() {
    let tmp = setup_loaded_project();

    kitroom()
        .current_dir(tmp.path())
        .args(["job", "assign", "2", "SPK-1"])
        .assert()
        .success();

    let outcome = stdout_json(&tmp, &["sweep", "--reconcile", "-f", "json"]);
    assert_eq!(
        outcome["reconciled"]["marked_assigned"],
        serde_json::json!(["SPK-1"])
    );
}

#[test]
fn test_set_status_unknown_job() {
    let tmp = setup_loaded_project();

    kitroom()
        .current_dir(tmp.path())
        .args(["job", "set-status", "42", "paid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("job not found"));
}

#[test]
fn test_paid_status_from_env() {
    let tmp = setup_loaded_project();

    kitroom()
        .current_dir(tmp.path())
        .args(["job", "assign", "1", "SPK-1"])
        .assert()
        .success();
    kitroom()
        .current_dir(tmp.path())
        .args(["job", "set-status", "1", "settled"])
        .assert()
        .success();

    kitroom()
        .current_dir(tmp.path())
        .env("KITROOM_PAID_STATUS", "settled")
        .args(["sweep"])
        .assert()
        .success()
        .stdout(predicate::str::contains("freed SPK-1"));
}

// ============================================================================
// Store Command Tests
// ============================================================================

#[test]
fn test_store_status() {
    let tmp = setup_loaded_project();

    kitroom()
        .current_dir(tmp.path())
        .args(["store", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Devices:"))
        .stdout(predicate::str::contains("free"));
}

#[test]
fn test_store_query() {
    let tmp = setup_loaded_project();

    kitroom()
        .current_dir(tmp.path())
        .args(["store", "query", "SELECT name FROM categories ORDER BY name"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("name\nAudio\nLighting"));

    kitroom()
        .current_dir(tmp.path())
        .args(["store", "query", "DELETE FROM devices"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("read-only"));
}

// ============================================================================
// Completions Tests
// ============================================================================

#[test]
fn test_completions_bash() {
    kitroom()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kitroom"));
}

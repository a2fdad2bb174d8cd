use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn pharmacy_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("pharmacy"))
}

fn init_config(temp_dir: &TempDir) -> PathBuf {
    let config_path = temp_dir.path().join("pharmacy-config");
    pharmacy_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success();
    config_path
}

fn run_ok(config_path: &Path, args: &[&str]) -> String {
    let output = pharmacy_cmd()
        .args(["-C", config_path.to_str().unwrap()])
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "command {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

/// Add a client and return its encrypted ID from the command output.
fn add_client(config_path: &Path, first: &str, last: &str, nit: Option<&str>) -> String {
    let mut args = vec!["client", "add", "--first-name", first, "--last-name", last];
    if let Some(nit) = nit {
        args.extend(["--nit", nit]);
    }
    let stdout = run_ok(config_path, &args);
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("ID: "))
        .map(str::to_string)
        .expect("client id in output")
}

fn add_sale(config_path: &Path, client: &str, amount: &str, date: &str) {
    run_ok(
        config_path,
        &["sale", "add", "--client", client, "--amount", amount, "--date", date],
    );
}

#[test]
fn test_help() {
    pharmacy_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pharmacy back-office"));
}

#[test]
fn test_version() {
    pharmacy_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pharmacy"));
}

#[test]
fn test_init_creates_config_and_database() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("pharmacy-config");

    pharmacy_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized pharmacy config"));

    assert!(config_path.join("config.toml").exists());
    assert!(config_path.join("output").is_dir());
    assert!(config_path.join("pharmacy.db").exists());
}

#[test]
fn test_init_fails_if_exists() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = init_config(&temp_dir);

    pharmacy_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_status_without_init() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nonexistent");

    pharmacy_cmd()
        .args(["-C", config_path.to_str().unwrap(), "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_status_counts_records() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = init_config(&temp_dir);
    add_client(&config_path, "Ana", "Rojas", None);

    let stdout = run_ok(&config_path, &["status"]);
    assert!(stdout.contains("Pharmacy Status"));
    assert!(stdout.contains("Clients:          1"));
    assert!(stdout.contains("Sales:            0"));
}

#[test]
fn test_client_add_list_and_json() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = init_config(&temp_dir);
    let id = add_client(&config_path, "María", "Peña", Some("1234567-8"));

    let table = run_ok(&config_path, &["client", "list"]);
    assert!(table.contains("María Peña"));
    assert!(table.contains(&id));
    assert!(table.contains("Total: 1 clients"));

    let json = run_ok(&config_path, &["client", "list", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed[0]["id"], id.as_str());
    assert_eq!(parsed[0]["nit"], "1234567-8");
}

#[test]
fn test_client_add_rejects_invalid_fields() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = init_config(&temp_dir);

    pharmacy_cmd()
        .args(["-C", config_path.to_str().unwrap()])
        .args(["client", "add", "--first-name", "A", "--last-name", "Perez2"])
        .args(["--email", "not-an-email"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("first_name"))
        .stderr(predicate::str::contains("last_name"))
        .stderr(predicate::str::contains("email"));
}

#[test]
fn test_duplicate_nit_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = init_config(&temp_dir);
    add_client(&config_path, "Ana", "Rojas", Some("7654321"));

    pharmacy_cmd()
        .args(["-C", config_path.to_str().unwrap()])
        .args(["client", "add", "--first-name", "Luis", "--last-name", "Vaca"])
        .args(["--nit", "7654321"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_client_edit_show_and_delete() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = init_config(&temp_dir);
    let id = add_client(&config_path, "Ana", "Rojas", None);

    run_ok(&config_path, &["client", "edit", &id, "--last-name", "Rojas Vaca"]);
    let shown = run_ok(&config_path, &["client", "show", &id]);
    assert!(shown.contains("Ana Rojas Vaca"));

    run_ok(&config_path, &["client", "delete", &id]);
    pharmacy_cmd()
        .args(["-C", config_path.to_str().unwrap(), "client", "show", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Client not found"));

    let list = run_ok(&config_path, &["client", "list"]);
    assert!(list.contains("No clients registered"));
}

#[test]
fn test_tampered_id_is_reported_generically() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = init_config(&temp_dir);

    for token in ["not*base64", "AAAAAAAAAAAAAAAAAAAAAA"] {
        pharmacy_cmd()
            .args(["-C", config_path.to_str().unwrap(), "client", "show", token])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid or tampered link"));
    }
}

#[test]
fn test_id_encode_decode_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = init_config(&temp_dir);

    let token = run_ok(&config_path, &["id", "encode", "42"]);
    let token = token.trim();
    assert!(!token.contains('='));
    assert!(!token.contains('+') && !token.contains('/'));

    let decoded = run_ok(&config_path, &["id", "decode", token]);
    assert_eq!(decoded.trim(), "42");
}

#[test]
fn test_sale_for_unknown_client_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = init_config(&temp_dir);
    let token = run_ok(&config_path, &["id", "encode", "999"]);

    pharmacy_cmd()
        .args(["-C", config_path.to_str().unwrap()])
        .args(["sale", "add", "--client", token.trim(), "--amount", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Client not found"));
}

#[test]
fn test_fidelity_report_pdf_and_xlsx() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = init_config(&temp_dir);
    let ana = add_client(&config_path, "Ana", "Rojas", None);
    let luis = add_client(&config_path, "Luis", "Vaca", None);

    add_sale(&config_path, &ana, "100", "2024-03-01");
    add_sale(&config_path, &ana, "50", "2024-03-15 10:30:00");
    add_sale(&config_path, &luis, "75.50", "2024-04-02");

    let pdf_path = temp_dir.path().join("fidelity.pdf");
    let stdout = run_ok(
        &config_path,
        &[
            "report", "fidelity", "--from", "2024-01-01", "--to", "2024-12-31",
            "--output", pdf_path.to_str().unwrap(),
        ],
    );
    assert!(stdout.contains("Client Fidelity Report"));
    assert!(stdout.contains("Rows:  2"));
    assert!(stdout.contains("application/pdf"));
    assert!(fs::read(&pdf_path).unwrap().starts_with(b"%PDF-1.5"));

    let stdout = run_ok(
        &config_path,
        &[
            "report", "fidelity", "--from", "2024-01-01", "--to", "2024-12-31",
            "--top", "1", "--format", "xlsx",
        ],
    );
    assert!(stdout.contains("Top 1 Clients by Total Spent"));
    assert!(stdout.contains("spreadsheetml"));

    let saved: Vec<_> = fs::read_dir(config_path.join("output"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].starts_with("ClientFidelityReport_"));
    assert!(saved[0].ends_with(".xlsx"));
}

#[test]
fn test_fidelity_preview_orders_top_n_by_total() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = init_config(&temp_dir);
    let ana = add_client(&config_path, "Ana", "Rojas", None);
    let luis = add_client(&config_path, "Luis", "Vaca", None);
    add_sale(&config_path, &ana, "20", "2024-05-01");
    add_sale(&config_path, &luis, "80", "2024-05-02");

    let stdout = run_ok(
        &config_path,
        &[
            "report", "fidelity", "--from", "2024-05-01", "--to", "2024-05-31",
            "--top", "2", "--sort", "name", "--preview",
        ],
    );
    let luis_at = stdout.find("Luis Vaca").unwrap();
    let ana_at = stdout.find("Ana Rojas").unwrap();
    assert!(luis_at < ana_at);
}

#[test]
fn test_fidelity_min_total_keeps_exact_spend() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = init_config(&temp_dir);
    let ana = add_client(&config_path, "Ana", "Rojas", None);
    add_sale(&config_path, &ana, "0.70", "2024-05-01");
    add_sale(&config_path, &ana, "0.10", "2024-05-02");

    let stdout = run_ok(
        &config_path,
        &[
            "report", "fidelity", "--from", "2024-05-01", "--to", "2024-05-31",
            "--min-total", "0.80", "--preview",
        ],
    );
    assert!(stdout.contains("Ana Rojas"));
    assert!(stdout.contains("0.80"));
}

#[test]
fn test_sale_rejects_non_numeric_amount() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = init_config(&temp_dir);
    let ana = add_client(&config_path, "Ana", "Rojas", None);

    pharmacy_cmd()
        .args(["-C", config_path.to_str().unwrap()])
        .args(["sale", "add", "--client", &ana, "--amount", "ten"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--amount"));
}

#[test]
fn test_fidelity_rejects_reversed_period() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = init_config(&temp_dir);

    pharmacy_cmd()
        .args(["-C", config_path.to_str().unwrap()])
        .args(["report", "fidelity", "--from", "2024-02-01", "--to", "2024-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Start date must be on or before the end date"));
}

#[test]
fn test_fidelity_rejects_unknown_sort() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = init_config(&temp_dir);

    pharmacy_cmd()
        .args(["-C", config_path.to_str().unwrap()])
        .args(["report", "fidelity", "--from", "2024-01-01", "--to", "2024-01-31"])
        .args(["--sort", "id; DROP TABLE clients"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid sort value"));
}

#[test]
fn test_inventory_report_and_categories() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = init_config(&temp_dir);
    run_ok(
        &config_path,
        &[
            "medicine", "add", "--name", "Paracetamol 500mg", "--category", "Analgesics",
            "--presentation", "Tablet", "--stock", "5", "--price", "0.50",
        ],
    );
    run_ok(
        &config_path,
        &[
            "medicine", "add", "--name", "Amoxicillin 500mg", "--category", "Antibiotics",
            "--presentation", "Capsule", "--stock", "120", "--price", "1.20",
        ],
    );

    let categories = run_ok(&config_path, &["categories"]);
    assert!(categories.contains("Analgesics"));
    assert!(categories.contains("Antibiotics"));

    let preview = run_ok(&config_path, &["report", "inventory", "--low-stock", "--preview"]);
    assert!(preview.contains("Paracetamol 500mg"));
    assert!(!preview.contains("Amoxicillin 500mg"));
    assert!(preview.contains("1 medicines"));

    let stdout = run_ok(
        &config_path,
        &["report", "inventory", "--category", "antibiotics", "--format", "xlsx"],
    );
    assert!(stdout.contains("Medicines by Category"));
    assert!(stdout.contains("Rows:  1"));

    pharmacy_cmd()
        .args(["-C", config_path.to_str().unwrap()])
        .args(["report", "inventory", "--category", "Vitamins"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Category not found"));
}

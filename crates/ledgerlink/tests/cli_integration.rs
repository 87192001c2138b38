//! CLI integration tests for the ledgerlink command-line interface.
//!
//! Every test runs against a throwaway config directory, so nothing here
//! touches the user's real session or reaches the network.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the ledgerlink binary, isolated in `dir`.
fn ledgerlink(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ledgerlink").unwrap();
    cmd.current_dir(dir.path())
        .env("LEDGERLINK_CONFIG_DIR", dir.path())
        .env_remove("LEDGERLINK_CLIENT_ID")
        .env_remove("LEDGERLINK_CLIENT_SECRET")
        .env_remove("LEDGERLINK_ENVIRONMENT")
        .env_remove("LEDGERLINK_REDIRECT_URI");
    cmd
}

fn store_session(dir: &TempDir) {
    ledgerlink(dir)
        .args([
            "auth",
            "set",
            "--access-token",
            "access-1",
            "--realm-id",
            "realm-9",
            "--refresh-token",
            "refresh-1",
            "--expires-in",
            "3600",
        ])
        .assert()
        .success();
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let dir = TempDir::new().unwrap();
    ledgerlink(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("QuickBooks Online"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    ledgerlink(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ledgerlink"));
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    ledgerlink(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("auth"))
        .stdout(predicate::str::contains("customers"))
        .stdout(predicate::str::contains("items"))
        .stdout(predicate::str::contains("accounts"))
        .stdout(predicate::str::contains("invoices"))
        .stdout(predicate::str::contains("payments"))
        .stdout(predicate::str::contains("company"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_auth_help_lists_flows() {
    let dir = TempDir::new().unwrap();
    ledgerlink(&dir)
        .args(["auth", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("exchange"))
        .stdout(predicate::str::contains("refresh"))
        .stdout(predicate::str::contains("logout"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument Validation Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_unknown_environment_rejected() {
    let dir = TempDir::new().unwrap();
    ledgerlink(&dir)
        .args(["--environment", "staging", "config", "path"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("staging"));
}

#[test]
fn test_malformed_invoice_line_rejected() {
    let dir = TempDir::new().unwrap();
    ledgerlink(&dir)
        .args(["invoices", "create", "--customer", "1", "--line", "7:three:10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid quantity"));
}

#[test]
fn test_invoice_requires_a_line() {
    let dir = TempDir::new().unwrap();
    ledgerlink(&dir)
        .args(["invoices", "create", "--customer", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--line"));
}

#[test]
fn test_unknown_account_type_rejected() {
    let dir = TempDir::new().unwrap();
    ledgerlink(&dir)
        .args(["accounts", "create", "Sales", "--type", "Piggy Bank"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown account type"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_status_without_session() {
    let dir = TempDir::new().unwrap();
    ledgerlink(&dir)
        .args(["--json", "auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"authenticated\": false"));
}

#[test]
fn test_set_then_status_round_trips_through_session_file() {
    let dir = TempDir::new().unwrap();
    store_session(&dir);

    assert!(dir.path().join("session.json").exists());

    ledgerlink(&dir)
        .args(["--json", "auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"authenticated\": true"))
        .stdout(predicate::str::contains("\"tenant_id\": \"realm-9\""))
        .stdout(predicate::str::contains("\"has_refresh_token\": true"));
}

#[test]
fn test_logout_removes_session() {
    let dir = TempDir::new().unwrap();
    store_session(&dir);

    ledgerlink(&dir)
        .args(["auth", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Session removed"));

    assert!(!dir.path().join("session.json").exists());

    ledgerlink(&dir)
        .args(["auth", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No stored session"));
}

#[test]
fn test_api_command_without_session_fails() {
    let dir = TempDir::new().unwrap();
    ledgerlink(&dir)
        .args(["customers", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not authenticated"));
}

#[test]
fn test_invalid_page_size_fails_before_any_request() {
    let dir = TempDir::new().unwrap();
    store_session(&dir);

    ledgerlink(&dir)
        .args(["customers", "list", "--page-size", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("page_size must be between 1 and 1000"));
}

#[test]
fn test_login_requires_client_credentials() {
    let dir = TempDir::new().unwrap();
    ledgerlink(&dir)
        .args(["auth", "url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("LEDGERLINK_CLIENT_ID"));
}

#[test]
fn test_auth_url_with_credentials() {
    let dir = TempDir::new().unwrap();
    ledgerlink(&dir)
        .env("LEDGERLINK_CLIENT_ID", "client-abc")
        .env("LEDGERLINK_CLIENT_SECRET", "secret-xyz")
        .args(["--json", "auth", "url"])
        .assert()
        .success()
        .stdout(predicate::str::contains("client_id=client-abc"))
        .stdout(predicate::str::contains("\"state\""))
        .stdout(predicate::str::contains("secret-xyz").not());
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_path_uses_config_dir() {
    let dir = TempDir::new().unwrap();
    ledgerlink(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"))
        .stdout(predicate::str::contains("does not exist yet"));
}

#[test]
fn test_config_init_then_show() {
    let dir = TempDir::new().unwrap();
    ledgerlink(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));

    assert!(dir.path().join("config.toml").exists());

    ledgerlink(&dir)
        .args(["--environment", "production", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("production"))
        .stdout(predicate::str::contains("quickbooks.api.intuit.com"));
}

#[test]
fn test_config_show_never_prints_secret() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[oauth]\nclient_id = \"id-1\"\nclient_secret = \"plain-secret\"\n",
    )
    .unwrap();

    ledgerlink(&dir)
        .args(["--verbose", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config file (plaintext)"))
        .stdout(predicate::str::contains("plain-secret").not());
}

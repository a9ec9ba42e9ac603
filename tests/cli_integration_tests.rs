// CLI behaviour against a mock delivery backend
//
// Each test runs the binary in its own temp directory so offline state and
// configuration files never leak between tests.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AGENT: &str = "aravind@example.com";

fn dlvery(dir: &TempDir, base_url: &str) -> Command {
    let mut cmd = Command::cargo_bin("dlvery").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("DLVERY_AGENT__ID")
        .env("DLVERY_STORE__BASE_URL", base_url)
        .env("DLVERY_OBSERVABILITY__LOG_LEVEL", "error");
    cmd
}

fn delivery_json(id: u64, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "sku": "SKU-1",
        "quantity": 2,
        "productName": "Rice 5kg",
        "agent": AGENT,
        "customerName": "Meena",
        "customerMobile": "+91-9000000000",
        "customerAddress": "12 Lake Rd",
        "priority": "emergency",
        "date": chrono::Local::now().date_naive().to_string(),
        "status": status,
        "notes": ""
    })
}

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("dlvery")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("queue"));
}

#[test]
fn test_missing_agent_is_an_error() {
    let dir = TempDir::new().unwrap();
    dlvery(&dir, "http://127.0.0.1:9")
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no agent identity"));
}

#[test]
fn test_status_without_any_sync() {
    let dir = TempDir::new().unwrap();
    dlvery(&dir, "http://127.0.0.1:9")
        .args(["--agent", AGENT, "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Last sync: never"))
        .stdout(predicate::str::contains("Pending sync: 0"))
        .stdout(predicate::str::contains("Durability: durable"));
}

#[test]
fn test_unknown_status_is_rejected_before_any_request() {
    let dir = TempDir::new().unwrap();
    dlvery(&dir, "http://127.0.0.1:9")
        .args(["--agent", AGENT, "update", "1", "returned"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown delivery status"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_offline_update_is_queued_across_runs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/delivery"))
        .and(query_param("agent", AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![delivery_json(7, "in_progress")]))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/delivery/7/status"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();

    dlvery(&dir, &server.uri())
        .args(["--agent", AGENT, "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TODAY (1)"))
        .stdout(predicate::str::contains("Rice 5kg"));

    dlvery(&dir, &server.uri())
        .args(["--agent", AGENT, "update", "7", "door_locked", "--notes", "no answer"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pending sync (1 queued)"));

    dlvery(&dir, &server.uri())
        .args(["--agent", AGENT, "queue"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PENDING SYNC (1)"))
        .stdout(predicate::str::contains("Door Locked"))
        .stdout(predicate::str::contains("no answer"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delivered_needs_signature_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/delivery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![delivery_json(8, "in_progress")]))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    dlvery(&dir, &server.uri())
        .args(["--agent", AGENT, "update", "8", "delivered"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("signature is required"));
}

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

const PROJECTS: &str = r#"{
    "count": 2,
    "value": [
        { "id": "p1", "name": "Alpha", "state": "wellFormed", "visibility": "private" },
        { "id": "p2", "name": "Beta", "state": "wellFormed", "visibility": "private" }
    ]
}"#;

/// base64(":test-pat")
const TEST_PAT_BASIC: &str = "Basic OnRlc3QtcGF0";

/// The binary with credential environment variables cleared
fn adomigrate() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("adomigrate"));
    for var in [
        "ADO_URL",
        "ADO_PAT",
        "GITLAB_URL",
        "GITLAB_TOKEN",
        "ADOMIGRATE_CONFIG",
        "ADOMIGRATE_FORMAT",
        "ADOMIGRATE_INSECURE",
        "ADOMIGRATE_LOG_CALLS",
        "ADOMIGRATE_DEBUG",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn write_config(dir: &Path, ado_url: &str, gitlab_url: &str) -> PathBuf {
    let path = dir.join("config.yaml");
    let contents = format!(
        "ado:\n  base_url: {ado_url}\n  pat: test-pat\n  api_version: \"7.1\"\n\
         gitlab:\n  base_url: {gitlab_url}\n  token: glpat-testtoken1234567890\n\
         retry:\n  max_attempts: 3\n  initial_delay_secs: 0\n"
    );
    fs::write(&path, contents).expect("failed to write config");
    path
}

#[test]
fn version_prints_package_version() {
    adomigrate()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn status_masks_credentials() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let path = temp.path().join("config.yaml");
    fs::write(
        &path,
        "ado:\n  base_url: https://tfs.example.com/DefaultCollection\n  pat: supersecretpat1234\ntls: permissive\n",
    )?;

    let assert = adomigrate()
        .arg("status")
        .arg("--config")
        .arg(&path)
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.contains(&path.to_string_lossy().to_string()));
    assert!(stdout.contains("https://tfs.example.com/DefaultCollection"));
    assert!(stdout.contains("***1234"));
    assert!(!stdout.contains("supersecretpat1234"));
    assert!(stdout.contains("permissive"));
    assert!(stdout.contains("GitLab not configured"));

    Ok(())
}

#[test]
fn status_reads_environment_overrides() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let missing = temp.path().join("absent.yaml");

    let assert = adomigrate()
        .arg("status")
        .arg("--config")
        .arg(&missing)
        .env("ADO_URL", "https://dev.azure.com/fabrikam")
        .env("ADO_PAT", "environment-pat-9876")
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.contains("(not found)"));
    assert!(stdout.contains("https://dev.azure.com/fabrikam"));
    assert!(stdout.contains("***9876"));

    Ok(())
}

// ============================================================================
// Azure DevOps
// ============================================================================

#[test]
fn project_list_json_decodes_collection() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let m = server
        .mock("GET", "/_apis/projects")
        .match_query(mockito::Matcher::UrlEncoded("api-version".into(), "7.1".into()))
        .match_header("authorization", TEST_PAT_BASIC)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PROJECTS)
        .create();

    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &server.url(), &server.url());

    let assert = adomigrate()
        .args(["project", "list", "--format", "json", "--config"])
        .arg(&config_path)
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.contains("\"Alpha\""));
    assert!(stdout.contains("\"Beta\""));
    assert!(stdout.contains("\"count\": 2"));
    m.assert();

    Ok(())
}

#[test]
fn project_list_table_output() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/_apis/projects")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(PROJECTS)
        .create();

    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &server.url(), &server.url());

    adomigrate()
        .args(["project", "list", "--config"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("NAME").and(predicate::str::contains("Alpha")));

    Ok(())
}

#[test]
fn transient_status_is_retried_until_budget_exhausted() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let m = server
        .mock("GET", "/_apis/projects")
        .match_query(mockito::Matcher::Any)
        .with_status(503)
        .with_body(r#"{"message":"Service Unavailable"}"#)
        .expect(3)
        .create();

    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &server.url(), &server.url());

    adomigrate()
        .args(["project", "list", "--config"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("503").and(predicate::str::contains("3 attempt")));
    m.assert();

    Ok(())
}

#[test]
fn permanent_status_fails_on_first_attempt() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let m = server
        .mock("GET", "/_apis/projects")
        .match_query(mockito::Matcher::Any)
        .with_status(401)
        .with_body(r#"{"message":"TF400813: The user is not authorized"}"#)
        .expect(1)
        .create();

    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &server.url(), &server.url());

    adomigrate()
        .args(["project", "list", "--config"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("401")
                .and(predicate::str::contains("TF400813"))
                .and(predicate::str::contains("[ADO]")),
        );
    m.assert();

    Ok(())
}

#[test]
fn operation_wait_treats_missing_operation_as_done() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let m = server
        .mock("GET", "/_apis/operations/op-1")
        .match_query(mockito::Matcher::Any)
        .with_status(404)
        .expect(1)
        .create();

    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &server.url(), &server.url());

    adomigrate()
        .args(["operation", "wait", "op-1", "--config"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("assumed completed"));
    m.assert();

    Ok(())
}

#[test]
fn operation_wait_reports_failed_operation() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/_apis/operations/op-2")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(r#"{"id":"op-2","status":"failed","resultMessage":"TF400898: quota"}"#)
        .create();

    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &server.url(), &server.url());

    adomigrate()
        .args(["operation", "wait", "op-2", "--format", "json", "--config"])
        .arg(&config_path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"failed\""))
        .stderr(predicate::str::contains("TF400898"));

    Ok(())
}

#[test]
fn repo_ensure_existing_is_not_recreated() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let get = server
        .mock("GET", "/Alpha/_apis/git/repositories/web")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(r#"{"id":"r1","name":"web","remoteUrl":"https://ado/Alpha/_git/web"}"#)
        .expect(1)
        .create();
    let post = server
        .mock("POST", "/Alpha/_apis/git/repositories")
        .match_query(mockito::Matcher::Any)
        .expect(0)
        .create();

    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &server.url(), &server.url());

    adomigrate()
        .args(["repo", "ensure", "Alpha", "web", "--config"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
    get.assert();
    post.assert();

    Ok(())
}

// ============================================================================
// GitLab
// ============================================================================

#[test]
fn gitlab_project_sends_private_token() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let m = server
        .mock("GET", "/api/v4/projects/42")
        .match_header("private-token", "glpat-testtoken1234567890")
        .with_status(200)
        .with_body(
            r#"{"id":42,"name":"app","path_with_namespace":"group/app","default_branch":"main"}"#,
        )
        .create();

    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &server.url(), &server.url());

    adomigrate()
        .args(["gitlab", "project", "42", "--config"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("group/app").and(predicate::str::contains("main")));
    m.assert();

    Ok(())
}

// ============================================================================
// Error Scenario Tests
// ============================================================================

#[test]
fn missing_ado_config_shows_helpful_error() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let nonexistent_config = temp.path().join("does-not-exist.yaml");

    adomigrate()
        .args(["project", "list", "--config"])
        .arg(&nonexistent_config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("adomigrate init").and(predicate::str::contains("ADO_PAT")));

    Ok(())
}

#[test]
fn invalid_config_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let path = temp.path().join("config.yaml");
    fs::write(&path, "ado: [not, a, map")?;

    adomigrate()
        .args(["status", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse configuration"));

    Ok(())
}

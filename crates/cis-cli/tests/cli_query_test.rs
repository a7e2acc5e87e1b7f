#![allow(clippy::unwrap_used)]
#![allow(missing_docs)]

use assert_cmd::cargo_bin_cmd;
use predicates::prelude::{PredicateBooleanExt, predicate};

/// Writes a config pointing the CLI at `base_url` and returns the directory.
fn config_dir(base_url: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        format!("[api]\nbase_url = \"{base_url}\"\nuser_agent = \"cis-cli-test/0.0.0\"\n"),
    )
    .unwrap();
    dir
}

#[test]
fn test_query_help() {
    // Arrange & Act & Assert
    let mut cmd = cargo_bin_cmd!("cis");
    cmd.args(["query", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--sample-rate"))
        .stdout(predicate::str::contains("--no-descriptions"));
}

#[test]
fn test_show_help() {
    // Arrange & Act & Assert
    let mut cmd = cargo_bin_cmd!("cis");
    cmd.args(["show", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<NAME>"));
}

#[test]
fn test_query_missing_term() {
    // Arrange & Act & Assert
    let mut cmd = cargo_bin_cmd!("cis");
    cmd.args(["query"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("<TERM>"));
}

#[test]
fn test_query_min_rate_without_max_rate() {
    // Arrange & Act & Assert
    let mut cmd = cargo_bin_cmd!("cis");
    cmd.args(["query", "H1:PSL", "--min-rate", "256"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--max-rate"));
}

#[test]
fn test_query_exact_without_name() {
    // Arrange & Act & Assert
    let mut cmd = cargo_bin_cmd!("cis");
    cmd.args(["query", "H1:PSL", "--exact"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--name"));
}

#[test]
fn test_invalid_base_url_in_config() {
    // Arrange
    let dir = config_dir("cis.ligo.org/api");

    // Act & Assert
    let mut cmd = cargo_bin_cmd!("cis");
    cmd.args(["query", "H1:PSL", "--dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid [api] base_url"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_query_lists_and_filters_channels() {
    // Arrange
    let mock_server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/api/channel/"))
        .and(wiremock::matchers::query_param("q", "H1:PSL-ISS "))
        .respond_with(
            wiremock::ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "sessionid=cli-test; Path=/")
                .set_body_string(include_str!("../../../fixtures/cis/channel_search_psl.json")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    let dir = config_dir(&format!("{}/api/", mock_server.uri()));
    let dir_path = dir.path().to_path_buf();

    // Act
    let assert = tokio::task::spawn_blocking(move || {
        let mut cmd = cargo_bin_cmd!("cis");
        cmd.args([
            "query",
            "H1:PSL-ISS*",
            "--no-descriptions",
            "--min-rate",
            "4096",
            "--max-rate",
            "16384",
            "--dir",
        ])
        .arg(&dir_path)
        .assert()
    })
    .await
    .unwrap();

    // Assert
    assert
        .success()
        .stdout(predicate::str::contains("H1:PSL-ISS_PDA_OUT_DQ"))
        .stdout(predicate::str::contains("H1:PSL-ISS_PDB_OUT_DQ").not())
        .stdout(predicate::str::contains("Total: 1 channels"));
    let jar = std::fs::read_to_string(dir.path().join("cookies.json")).unwrap();
    assert!(jar.contains("cli-test"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_show_reports_ambiguous_match() {
    // Arrange
    let mock_server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/api/channel/"))
        .respond_with(
            wiremock::ResponseTemplate::new(200)
                .set_body_string(include_str!("../../../fixtures/cis/channel_search_psl.json")),
        )
        .mount(&mock_server)
        .await;
    let dir = config_dir(&format!("{}/api", mock_server.uri()));
    let dir_path = dir.path().to_path_buf();

    // Act
    let assert = tokio::task::spawn_blocking(move || {
        let mut cmd = cargo_bin_cmd!("cis");
        cmd.args(["show", "H1:PSL-ISS", "--no-descriptions", "--dir"])
            .arg(&dir_path)
            .assert()
    })
    .await
    .unwrap();

    // Assert
    assert
        .failure()
        .stderr(predicate::str::contains("2 channels found matching 'H1:PSL-ISS'"));
}

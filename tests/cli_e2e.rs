//! End-to-end CLI tests for the cpd-harvester binary.

use std::fs;
use std::io::Cursor;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::mock_transport::page_with_links;
use support::socket_guard::start_mock_server_or_skip;

/// Binary with an empty config home so no user config leaks in.
fn harvester(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cpd-harvester").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    harvester(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fetch the English PDFs"));
}

#[test]
fn test_binary_without_subcommand_fails() {
    let home = TempDir::new().unwrap();
    harvester(&home)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_metadata_prints_json() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let first_pages = dir.path().join("first.txt");
    fs::write(&first_pages, "Country programme document 2022-2026").unwrap();

    harvester(&home)
        .args(["-q", "metadata", "cpd_viet_nam_2020.pdf", "--first-pages"])
        .arg(&first_pages)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""year": "2022-2026""#))
        .stdout(predicate::str::contains(r#""country": "Viet Nam""#))
        .stdout(predicate::str::contains(r#""region": "EAPRO""#));
}

#[test]
fn test_metadata_missing_text_file_fails() {
    let home = TempDir::new().unwrap();
    harvester(&home)
        .args(["metadata", "x.pdf", "--full-text", "/nonexistent/full.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read text file"));
}

#[test]
fn test_invalid_config_file_fails() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("bad.toml");
    fs::write(&config, "max_attempts = 42\n").unwrap();

    harvester(&home)
        .arg("--config")
        .arg(&config)
        .args(["metadata", "x.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_attempts"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_download_writes_archive_without_browser() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/cpd"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page_with_links(&[
            ("/files/kenya-en.pdf", "Kenya"),
            ("/files/rapport.pdf", "Rapport"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/kenya-en.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.7 kenya".to_vec()),
        )
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let archive = out.path().join("out.zip");

    harvester(&home)
        .args(["-q", "download", &format!("{}/cpd", server.uri()), "--no-browser"])
        .args(["--delay-ms", "0", "-o"])
        .arg(&archive)
        .assert()
        .success();

    let zip = zip::ZipArchive::new(Cursor::new(fs::read(&archive).unwrap())).unwrap();
    let names: Vec<_> = zip.file_names().collect();
    assert_eq!(names, vec!["kenya-en.pdf"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_download_total_failure_writes_no_archive() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/cpd"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page_with_links(&[("/files/gone-en.pdf", "Gone")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/gone-en.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let archive = out.path().join("out.zip");

    harvester(&home)
        .args(["download", &format!("{}/cpd", server.uri()), "--no-browser"])
        .args(["--delay-ms", "0", "-o"])
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("no archive written"));

    assert!(!archive.exists());
}

use std::fs;
use std::process::Command;

use basic_cleaning_core::store::{ArtifactStore, LocalArtifactStore, PublishRequest};

const RAW_SAMPLE: &str = "\
id,price,last_review
1,50,2019-01-01
2,10,bad-date
3,500,2020-05-05
";

fn cleaning_command(store_dir: &std::path::Path, work_dir: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_basic-cleaning"));
    command
        .current_dir(work_dir)
        .env("ARTIFACT_STORE_DIR", store_dir)
        .env("RUST_LOG", "warn");
    command
}

#[tokio::test]
async fn cleans_and_publishes_through_the_local_store() {
    let store_dir = tempfile::tempdir().unwrap();
    let work_dir = tempfile::tempdir().unwrap();
    let store = LocalArtifactStore::open(store_dir.path()).await.unwrap();

    let raw_path = work_dir.path().join("sample.csv");
    fs::write(&raw_path, RAW_SAMPLE).unwrap();
    store
        .publish(&PublishRequest::new("sample.csv", "raw_data", "raw listings", &raw_path))
        .await
        .unwrap();

    let output = cleaning_command(store_dir.path(), work_dir.path())
        .args([
            "--input_artifact",
            "sample.csv:latest",
            "--output_artifact",
            "clean_sample.csv",
            "--output_type",
            "clean_sample",
            "--output_description",
            "Data with outliers and null values removed",
            "--min_price",
            "25",
            "--max_price",
            "400",
        ])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let expected = "id,price,last_review\n1,50,2019-01-01\n";
    assert_eq!(
        fs::read_to_string(work_dir.path().join("clean_sample.csv")).unwrap(),
        expected
    );

    let published = store
        .fetch(&"clean_sample.csv:latest".parse().unwrap())
        .await
        .unwrap();
    assert_eq!(published.version.version, 0);
    assert_eq!(published.artifact_type, "clean_sample");
    assert_eq!(fs::read_to_string(&published.path).unwrap(), expected);
}

#[tokio::test]
async fn dotenv_file_sets_the_log_filter() {
    let store_dir = tempfile::tempdir().unwrap();
    let work_dir = tempfile::tempdir().unwrap();
    let store = LocalArtifactStore::open(store_dir.path()).await.unwrap();

    let raw_path = work_dir.path().join("sample.csv");
    fs::write(&raw_path, RAW_SAMPLE).unwrap();
    store
        .publish(&PublishRequest::new("sample.csv", "raw_data", "raw listings", &raw_path))
        .await
        .unwrap();
    fs::write(
        work_dir.path().join(".env"),
        format!(
            "RUST_LOG=off\nARTIFACT_STORE_DIR={}\n",
            store_dir.path().display()
        ),
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_basic-cleaning"))
        .current_dir(work_dir.path())
        .env_remove("RUST_LOG")
        .env_remove("ARTIFACT_STORE_DIR")
        .args([
            "--input_artifact",
            "sample.csv",
            "--output_artifact",
            "clean_sample.csv",
            "--output_type",
            "clean_sample",
            "--output_description",
            "cleaned",
            "--min_price",
            "25",
            "--max_price",
            "400",
        ])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(output.stdout.is_empty(), "stdout: {}", String::from_utf8_lossy(&output.stdout));
    assert!(store
        .fetch(&"clean_sample.csv:latest".parse().unwrap())
        .await
        .is_ok());
}

#[test]
fn missing_flag_fails_before_touching_the_store() {
    let scratch = tempfile::tempdir().unwrap();
    let store_dir = scratch.path().join("store");

    let output = cleaning_command(&store_dir, scratch.path())
        .args([
            "--input_artifact",
            "sample.csv:latest",
            "--output_artifact",
            "clean_sample.csv",
            "--output_type",
            "clean_sample",
            "--output_description",
            "cleaned",
            "--min_price",
            "25",
        ])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--max_price"));
    assert!(!store_dir.exists());
}

#[test]
fn unknown_input_artifact_exits_non_zero() {
    let scratch = tempfile::tempdir().unwrap();
    let store_dir = scratch.path().join("store");

    let output = cleaning_command(&store_dir, scratch.path())
        .args([
            "--input_artifact",
            "sample.csv:v3",
            "--output_artifact",
            "clean_sample.csv",
            "--output_type",
            "clean_sample",
            "--output_description",
            "cleaned",
            "--min_price",
            "25",
            "--max_price",
            "400",
        ])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(!scratch.path().join("clean_sample.csv").exists());
}

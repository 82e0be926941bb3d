mod common;

use std::path::Path;
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::*;
use serde_json::Value;

use common::*;

macro_rules! cargo_run {
    ($cmd:expr, $($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin($cmd)?;
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

/// 带上数据库目录和模型服务地址运行
macro_rules! photosearch {
    ($db:expr, $host:expr, $($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin("photosearch")?;
            cmd.arg("--db-path").arg($db).env("OLLAMA_HOST", $host).env_remove("PHOTOSEARCH_MODEL");
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

fn dataset(dir: &Path) {
    write_image(dir, "red.png", RED);
    write_image(dir, "green.png", GREEN);
    write_image(dir, "blue.png", BLUE);
}

#[test]
fn index_and_search_by_text() -> Result<()> {
    let photos = assert_fs::TempDir::new()?;
    let db = assert_fs::TempDir::new()?;
    let db = db.path().join("store");
    let host = spawn_fake_ollama();
    dataset(photos.path());

    photosearch!(&db, &host, "index-photos", photos.path(), "--embed-model", "nomic-embed-text")
        .success()
        .stdout(predicate::str::contains("indexed: 3, updated: 0, skipped: 0, failed: 0"));

    // 第二次运行全部跳过
    photosearch!(&db, &host, "index-photos", photos.path(), "--embed-model", "nomic-embed-text")
        .success()
        .stdout(predicate::str::contains("indexed: 0, updated: 0, skipped: 3, failed: 0"));

    let output = photosearch!(
        &db,
        &host,
        "search-photos-by-text",
        "red",
        "-k",
        "2",
        "--format",
        "json",
        "--embed-model",
        "nomic-embed-text"
    )
    .success()
    .get_output()
    .stdout
    .clone();
    let results: Vec<Value> = serde_json::from_slice(&output)?;
    assert_eq!(results.len(), 2);
    assert!(results[0]["path"].as_str().unwrap().ends_with("red.png"));
    assert!(results[0].get("description").is_none());

    photosearch!(
        &db,
        &host,
        "search-photos-by-text",
        "blue",
        "-k",
        "1",
        "-v",
        "--embed-model",
        "nomic-embed-text"
    )
    .success()
    .stdout(predicate::str::contains("blue.png").and(predicate::str::contains("a blue square")));

    Ok(())
}

#[test]
fn search_by_image_reports_bad_queries() -> Result<()> {
    let photos = assert_fs::TempDir::new()?;
    let db = assert_fs::TempDir::new()?;
    let host = spawn_fake_ollama();
    dataset(photos.path());
    let broken = photos.path().join("broken.jpg");
    std::fs::write(&broken, b"not a jpeg")?;

    photosearch!(db.path(), &host, "index-photos", photos.path()).success();

    photosearch!(db.path(), &host, "search-photos", photos.path().join("green.png"), "-k", "1")
        .success()
        .stdout(predicate::str::contains("green.png"));

    // 一张失败，另一张仍然输出结果
    photosearch!(
        db.path(),
        &host,
        "search-photos",
        &broken,
        photos.path().join("blue.png"),
        "-k",
        "1"
    )
    .failure()
    .stdout(predicate::str::contains("blue.png"));

    Ok(())
}

#[test]
fn custom_aspect_search_by_image() -> Result<()> {
    let photos = assert_fs::TempDir::new()?;
    let db = assert_fs::TempDir::new()?;
    let host = spawn_fake_ollama();
    let red = write_image(photos.path(), "red.png", RED);
    write_image(photos.path(), "blue.png", BLUE);

    photosearch!(
        db.path(),
        &host,
        "index-photos",
        photos.path(),
        "--aspect",
        "hazards",
        "--prompt",
        "Is this scene safe?"
    )
    .success();

    let output = photosearch!(
        db.path(),
        &host,
        "search-photos",
        &red,
        "--aspect",
        "hazards",
        "-k",
        "2",
        "--format",
        "json"
    )
    .success()
    .get_output()
    .stdout
    .clone();
    let results: Vec<Value> = serde_json::from_slice(&output)?;
    assert_eq!(results.len(), 2);
    assert!(results[0]["path"].as_str().unwrap().ends_with("red.png"));
    assert_eq!(results[0]["distance"].as_f64(), Some(0.0));

    // 之后添加的图片沿用已保存的提示词
    let green = write_image(photos.path(), "green.png", GREEN);
    photosearch!(db.path(), &host, "add-aspect", &green, "hazards").success();
    photosearch!(db.path(), &host, "examine-image", &green, "--aspect", "hazards")
        .success()
        .stdout(predicate::str::contains("a green square safe"))
        .stdout(predicate::str::contains("prompt: Is this scene safe?"));
    Ok(())
}

#[test]
fn malformed_query_on_empty_store_fails() -> Result<()> {
    let photos = assert_fs::TempDir::new()?;
    let db = assert_fs::TempDir::new()?;
    let host = spawn_fake_ollama();

    photosearch!(db.path(), &host, "index-photos", photos.path())
        .success()
        .stdout(predicate::str::contains("indexed: 0, updated: 0, skipped: 0, failed: 0"));

    let garbage = photos.path().join("garbage.jpg");
    std::fs::write(&garbage, b"not a jpeg")?;
    photosearch!(db.path(), &host, "search-photos", &garbage)
        .failure()
        .stderr(predicate::str::contains("无法解码图片"));
    Ok(())
}

#[test]
fn broken_files_are_counted() -> Result<()> {
    let photos = assert_fs::TempDir::new()?;
    let db = assert_fs::TempDir::new()?;
    let host = spawn_fake_ollama();
    dataset(photos.path());
    std::fs::write(photos.path().join("broken.png"), b"not a png")?;

    photosearch!(db.path(), &host, "index-photos", photos.path())
        .success()
        .stdout(predicate::str::contains("indexed: 3, updated: 0, skipped: 0, failed: 1"))
        .stdout(predicate::str::contains("broken.png"));
    Ok(())
}

#[test]
fn aspects_examine_and_remove() -> Result<()> {
    let photos = assert_fs::TempDir::new()?;
    let db = assert_fs::TempDir::new()?;
    let host = spawn_fake_ollama();
    dataset(photos.path());
    let red = photos.path().join("red.png");

    photosearch!(db.path(), &host, "index-photos", photos.path()).success();
    photosearch!(db.path(), &host, "add-aspect", &red, "safety").success();

    photosearch!(db.path(), &host, "examine-image", &red)
        .success()
        .stdout(predicate::str::contains("[default]").and(predicate::str::contains("[safety]")))
        .stdout(predicate::str::contains("a red square safe"));

    photosearch!(db.path(), &host, "list-photos")
        .success()
        .stdout(predicate::str::contains("red.png\tdefault,safety"));

    photosearch!(db.path(), &host, "remove-photo", &red, "--aspect", "safety")
        .success()
        .stdout(predicate::str::contains("已删除 1 条记录"));
    photosearch!(db.path(), &host, "remove-photo", &red, "--aspect", "safety")
        .failure()
        .stderr(predicate::str::contains("尚未索引"));

    photosearch!(db.path(), &host, "examine-image", &red, "--aspect", "safety")
        .failure()
        .stderr(predicate::str::contains("尚未索引"));
    Ok(())
}

#[test]
fn clear_and_delete_store() -> Result<()> {
    let photos = assert_fs::TempDir::new()?;
    let db = assert_fs::TempDir::new()?;
    let db = db.path().join("store");
    let host = spawn_fake_ollama();
    dataset(photos.path());

    photosearch!(&db, &host, "index-photos", photos.path()).success();
    photosearch!(&db, &host, "clear-store").success();
    assert!(db.join("photos.db").is_file());

    photosearch!(&db, &host, "search-photos-by-text", "red").success().stdout(predicate::str::is_empty());

    photosearch!(&db, &host, "delete-store").success();
    assert!(!db.exists());

    photosearch!(&db, &host, "delete-store").failure().stderr(predicate::str::contains("数据库不存在"));
    photosearch!(&db, &host, "search-photos-by-text", "red")
        .failure()
        .stderr(predicate::str::contains("数据库不存在"));
    Ok(())
}

#[rstest]
#[case("bakllava")]
#[case("llava:13b")]
fn missing_model_is_fatal(#[case] model: &str) -> Result<()> {
    let photos = assert_fs::TempDir::new()?;
    let db = assert_fs::TempDir::new()?;
    let host = spawn_fake_ollama();
    dataset(photos.path());

    photosearch!(db.path(), &host, "index-photos", photos.path(), "--model", model)
        .failure()
        .stderr(predicate::str::contains("模型不存在"));
    Ok(())
}

#[test]
fn unreachable_host_is_fatal() -> Result<()> {
    let photos = assert_fs::TempDir::new()?;
    let db = assert_fs::TempDir::new()?;
    dataset(photos.path());

    photosearch!(db.path(), "http://127.0.0.1:9", "index-photos", photos.path())
        .failure()
        .stderr(predicate::str::contains("无法连接模型服务"));
    Ok(())
}

#[test]
fn list_models() -> Result<()> {
    let db = assert_fs::TempDir::new()?;
    let host = spawn_fake_ollama();
    photosearch!(db.path(), &host, "list-models")
        .success()
        .stdout(predicate::str::contains("llava-phi3:latest"))
        .stdout(predicate::str::contains("nomic-embed-text:latest"));
    Ok(())
}

#[test]
fn help_lists_subcommands() -> Result<()> {
    cargo_run!("photosearch", "--help")
        .success()
        .stdout(predicate::str::contains("index-photos"))
        .stdout(predicate::str::contains("search-photos-by-text"))
        .stdout(predicate::str::contains("serve"));
    Ok(())
}

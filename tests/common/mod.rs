#![allow(dead_code)]

use std::path::{Path, PathBuf};

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageBuffer, Rgb};
use serde_json::{Value, json};

/// 模拟服务上存在的模型
pub const MODELS: [&str; 2] = ["llava-phi3:latest", "nomic-embed-text:latest"];

/// 嵌入向量的词表，不在词表中的词都落在最后一维
const VOCAB: [&str; 7] = ["a", "red", "green", "blue", "square", "safe", "pretty"];

/// 每个词一个维度的词袋向量
pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; VOCAB.len() + 1];
    for word in text.split_whitespace() {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
        let dim = VOCAB.iter().position(|w| *w == word).unwrap_or(VOCAB.len());
        vector[dim] += 1.0;
    }
    vector
}

/// 根据图片的主色生成描述，提示词中的 safety/aesthetic 会额外加一个词
pub fn describe_image(base64: &str, prompt: &str) -> Option<String> {
    let data = STANDARD.decode(base64).ok()?;
    let image = image::load_from_memory(&data).ok()?.to_rgb8();
    let mut sum = [0u64; 3];
    for pixel in image.pixels() {
        for (s, c) in sum.iter_mut().zip(pixel.0) {
            *s += c as u64;
        }
    }
    let color = match sum.iter().enumerate().max_by_key(|(_, s)| **s)?.0 {
        0 => "red",
        1 => "green",
        _ => "blue",
    };
    let extra = if prompt.contains("safe") {
        " safe"
    } else if prompt.contains("aesthetic") {
        " pretty"
    } else {
        ""
    };
    Some(format!("a {color} square{extra}"))
}

fn model_missing(name: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": format!("model '{name}' not found") })))
}

fn has_model(body: &Value) -> Result<(), (StatusCode, Json<Value>)> {
    let name = body["model"].as_str().unwrap_or_default();
    if MODELS.iter().any(|m| *m == name || m.trim_end_matches(":latest") == name) {
        Ok(())
    } else {
        Err(model_missing(name))
    }
}

async fn tags() -> Json<Value> {
    let models = MODELS
        .iter()
        .map(|name| json!({ "name": name, "size": 1024, "modified_at": "2024-01-01T00:00:00Z" }))
        .collect::<Vec<_>>();
    Json(json!({ "models": models }))
}

async fn generate(Json(body): Json<Value>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    has_model(&body)?;
    let prompt = body["prompt"].as_str().unwrap_or_default();
    let image = body["images"][0].as_str().unwrap_or_default();
    match describe_image(image, prompt) {
        Some(description) => Ok(Json(json!({ "response": description, "done": true }))),
        None => Err((StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid image" })))),
    }
}

async fn embed(Json(body): Json<Value>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    has_model(&body)?;
    let input = body["input"].as_str().unwrap_or_default();
    Ok(Json(json!({ "embeddings": [bag_of_words(input)] })))
}

/// 在后台线程中启动一个模拟的 Ollama 服务，返回其地址
pub fn spawn_fake_ollama() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async move {
            let app = Router::new()
                .route("/api/tags", get(tags))
                .route("/api/generate", post(generate))
                .route("/api/embed", post(embed));
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });

    format!("http://{addr}")
}

/// 生成一张纯色 PNG 图片
pub fn write_image(dir: &Path, name: &str, color: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    ImageBuffer::from_pixel(32, 24, Rgb(color)).save(&path).unwrap();
    path
}

pub const RED: [u8; 3] = [220, 20, 20];
pub const GREEN: [u8; 3] = [20, 220, 20];
pub const BLUE: [u8; 3] = [20, 20, 220];

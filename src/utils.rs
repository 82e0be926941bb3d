use std::io::Cursor;
use std::path::Path;
use std::process::{Command, Stdio};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Local, Utc};
use image::{DynamicImage, ImageFormat};
use indicatif::ProgressStyle;
use regex::Regex;
use tokio::task::spawn_blocking;

use crate::error::{Error, Result};

/// 发送给模型前图片的最大边长
pub const MAX_IMAGE_SIZE: u32 = 1024;

/// 进度条样式
pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .expect("invalid progress bar template")
        .progress_chars("#>-")
}

/// 经过预处理、可以直接发送给模型的图片
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// PNG 格式的 base64 编码
    pub base64: String,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// 解码图片，转换为 RGB，等比缩放到 [`MAX_IMAGE_SIZE`] 以内，再编码为 PNG + base64
    pub fn from_bytes(name: &str, data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(data)
            .map_err(|source| Error::Image { path: name.to_owned(), source })?;
        Self::from_image(name, image)
    }

    fn from_image(name: &str, image: DynamicImage) -> Result<Self> {
        let image = adjust_image_size(DynamicImage::ImageRgb8(image.to_rgb8()), MAX_IMAGE_SIZE);
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|source| Error::Image { path: name.to_owned(), source })?;
        Ok(Self {
            base64: STANDARD.encode(buffer.into_inner()),
            width: image.width(),
            height: image.height(),
        })
    }
}

/// 读取并预处理图片，解码和编码在阻塞线程池中进行
pub async fn read_image(path: &Path) -> Result<EncodedImage> {
    let data = tokio::fs::read(path).await?;
    encode_image(path.to_string_lossy().into_owned(), data).await
}

/// 在阻塞线程池中预处理图片数据
pub async fn encode_image(name: String, data: Vec<u8>) -> Result<EncodedImage> {
    spawn_blocking(move || EncodedImage::from_bytes(&name, &data))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
}

/// 如果图片宽或高超过 `max_size`，则等比缩放
pub fn adjust_image_size(image: DynamicImage, max_size: u32) -> DynamicImage {
    if image.width().max(image.height()) > max_size {
        image.thumbnail(max_size, max_size)
    } else {
        image
    }
}

/// 将逗号分隔的后缀名列表转换为大小写不敏感的正则
pub fn suffix_regex(suffix: &str) -> Result<Regex, regex::Error> {
    let alternatives = suffix
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| regex::escape(s.trim_start_matches('.')))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i)^({alternatives})$"))
}

/// 当前时间，Unix 毫秒
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 将 Unix 毫秒格式化为本地时间
pub fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// 使用系统默认程序打开图片
pub fn open_image(path: &Path) -> std::io::Result<()> {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]);
        cmd
    } else if cfg!(target_os = "macos") {
        Command::new("open")
    } else {
        Command::new("xdg-open")
    };
    cmd.arg(path).stdout(Stdio::null()).stderr(Stdio::null()).spawn()?;
    Ok(())
}

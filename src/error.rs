use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("无法连接模型服务 {host}: {source}")]
    ModelUnavailable {
        host: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("模型不存在: {0}，可使用 list-models 查看可用模型")]
    ModelNotFound(String),

    #[error("模型服务返回错误 ({status}): {message}")]
    ModelServer { status: u16, message: String },

    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("模型服务响应格式错误: {0}")]
    MalformedResponse(String),

    #[error("无法解码图片 {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库迁移失败: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("向量索引错误: {0}")]
    Index(String),

    #[error("向量维度不一致: 索引为 {expected}，输入为 {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("数据库不存在: {}", .0.display())]
    StoreNotFound(PathBuf),

    #[error("图片尚未索引: {0}")]
    NotIndexed(String),

    #[error("无效的方面名称: {0:?}")]
    InvalidAspect(String),
}

impl Error {
    /// 是否为致命错误，致命错误会中止整个命令
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ModelUnavailable { .. }
                | Self::ModelNotFound(_)
                | Self::StoreNotFound(_)
                | Self::Database(_)
                | Self::Migrate(_)
                | Self::Index(_)
        )
    }

    pub(crate) fn index(err: impl std::fmt::Display) -> Self {
        Self::Index(err.to_string())
    }
}

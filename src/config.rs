use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;

use crate::cli::*;

/// 默认使用的视觉模型
pub const DEFAULT_MODEL: &str = "llava-phi3:latest";

/// 默认的模型服务地址
pub const DEFAULT_HOST: &str = "http://localhost:11434";

static DEFAULT_STORE_DIR: LazyLock<String> = LazyLock::new(|| {
    ProjectDirs::from("", "", "photosearch")
        .map(|dirs| dirs.data_dir().join("store"))
        .unwrap_or_else(|| PathBuf::from("photosearch-store"))
        .to_string_lossy()
        .into_owned()
});

fn default_store_dir() -> &'static str {
    DEFAULT_STORE_DIR.as_str()
}

#[derive(Parser, Debug, Clone)]
pub struct ModelOptions {
    /// 用于生成图片描述的模型
    #[arg(long, env = "PHOTOSEARCH_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,
    /// 用于生成向量的模型，默认与 --model 相同
    #[arg(long, value_name = "MODEL")]
    pub embed_model: Option<String>,
    /// 模型服务地址
    #[arg(long, env = "OLLAMA_HOST", default_value = DEFAULT_HOST)]
    pub host: String,
    /// 单次请求超时时间，单位为秒
    #[arg(long, value_name = "SECS", default_value_t = 300)]
    pub timeout: u64,
}

impl ModelOptions {
    pub fn embed_model(&self) -> &str {
        self.embed_model.as_deref().unwrap_or(&self.model)
    }
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// 返回的结果数量
    #[arg(short, value_name = "K", default_value_t = 5)]
    pub k: usize,
    /// 只搜索该方面的记录
    #[arg(long, default_value = crate::aspect::DEFAULT_ASPECT, conflicts_with = "all_aspects")]
    pub aspect: String,
    /// 搜索所有方面
    #[arg(long)]
    pub all_aspects: bool,
    /// 输出详细信息，-v 显示描述，-vv 额外显示方面和索引时间
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// 使用系统默认程序打开结果图片
    #[arg(long)]
    pub view: bool,
    /// 输出格式
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl SearchOptions {
    /// 搜索时的方面过滤条件
    pub fn aspect_filter(&self) -> Option<&str> {
        (!self.all_aspects).then_some(self.aspect.as_str())
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "photosearch", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 向量数据库目录
    #[arg(long, global = true, default_value = default_store_dir())]
    pub db_path: StoreDir,
    /// 日志级别，RUST_LOG 环境变量优先
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    pub log_level: log::LevelFilter,
    /// 输出调试日志，等价于 --log-level debug
    #[arg(short, long, global = true)]
    pub debug: bool,
}

impl Opts {
    pub fn log_filter(&self) -> log::LevelFilter {
        if self.debug { log::LevelFilter::Debug } else { self.log_level }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 扫描目录并为图片生成描述和向量
    IndexPhotos(IndexCommand),
    /// 为指定图片添加或更新一个方面
    AddAspect(AddAspectCommand),
    /// 以图搜图
    SearchPhotos(SearchCommand),
    /// 以文字搜图
    SearchPhotosByText(SearchTextCommand),
    /// 查看图片已保存的描述
    ExamineImage(ExamineCommand),
    /// 列出模型服务上的可用模型
    ListModels(ListModelsCommand),
    /// 列出已索引的图片
    ListPhotos(ListPhotosCommand),
    /// 从数据库中删除图片记录
    RemovePhoto(RemoveCommand),
    /// 清空数据库中的所有记录，保留目录
    ClearStore(ClearCommand),
    /// 删除整个数据库目录
    DeleteStore(DeleteCommand),
    /// 启动 HTTP 搜索服务
    Serve(ServerCommand),
}

/// 数据库目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDir {
    path: PathBuf,
}

impl StoreDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回 SQLite 数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("photos.db")
    }

    /// 返回向量索引文件的路径
    pub fn index(&self) -> PathBuf {
        self.path.join("photos.usearch")
    }

    /// 返回向量索引临时文件的路径
    pub fn index_tmp(&self) -> PathBuf {
        self.path.join("photos.usearch.tmp")
    }

    pub fn exists(&self) -> bool {
        self.database().is_file()
    }
}

impl FromStr for StoreDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

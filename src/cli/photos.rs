use std::path::PathBuf;

use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::{Opts, OutputFormat};
use crate::error::Error;
use crate::indexer::photo_key;
use crate::store::{PhotoStore, VectorStore};

#[derive(Parser, Debug, Clone)]
pub struct ListPhotosCommand {
    /// 输出格式
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl SubCommandExtend for ListPhotosCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let store = PhotoStore::open(&opts.db_path).await?;
        let photos = store.photos().await;
        store.close().await?;
        let photos = photos?;
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&photos)?),
            OutputFormat::Table => {
                for photo in &photos {
                    println!("{}\t{}", photo.path, photo.aspects.join(","));
                }
            }
        }
        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
pub struct RemoveCommand {
    /// 图片路径
    pub path: PathBuf,
    /// 只删除该方面的记录
    #[arg(long)]
    pub aspect: Option<String>,
}

impl SubCommandExtend for RemoveCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        // 文件可能已被删除，此时按原样匹配
        let key = photo_key(&self.path).unwrap_or_else(|_| self.path.to_string_lossy().into_owned());

        let store = PhotoStore::open(&opts.db_path).await?;
        let removed = store.remove(&key, self.aspect.as_deref()).await;
        store.close().await?;

        match removed? {
            0 => Err(Error::NotIndexed(key).into()),
            n => {
                println!("已删除 {n} 条记录");
                Ok(())
            }
        }
    }
}

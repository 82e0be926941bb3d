use std::path::PathBuf;

use clap::Parser;

use crate::aspect::Aspect;
use crate::cli::SubCommandExtend;
use crate::config::{ModelOptions, Opts};
use crate::indexer::{IndexOutcome, index_photo};
use crate::search::resolve_aspect;
use crate::model::{ModelClient, OllamaClient};
use crate::store::PhotoStore;

#[derive(Parser, Debug, Clone)]
pub struct AddAspectCommand {
    #[command(flatten)]
    pub model: ModelOptions,
    /// 图片路径
    pub path: PathBuf,
    /// 方面名称
    pub aspect: String,
    /// 自定义提示词
    #[arg(long)]
    pub prompt: Option<String>,
}

impl SubCommandExtend for AddAspectCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        // 先检查名称，再连接模型服务
        Aspect::new(&self.aspect, None)?;
        let model = OllamaClient::from_options(&self.model)?;
        model.check().await?;

        let store = PhotoStore::create(&opts.db_path).await?;
        let result = async {
            let aspect = resolve_aspect(&store, &self.aspect, self.prompt.clone()).await?;
            let outcome = index_photo(&model, &store, &self.path, &aspect, true).await?;
            Ok::<_, crate::Error>((aspect, outcome))
        }
        .await;
        store.close().await?;

        let (aspect, outcome) = result?;
        match outcome {
            IndexOutcome::Updated => println!("已更新: {} ({})", self.path.display(), aspect.name),
            _ => println!("已添加: {} ({})", self.path.display(), aspect.name),
        }
        Ok(())
    }
}

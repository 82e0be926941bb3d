use std::path::PathBuf;

use clap::Parser;

use crate::aspect::Aspect;
use crate::cli::SubCommandExtend;
use crate::config::{ModelOptions, Opts, OutputFormat};
use crate::model::{ModelClient, OllamaClient};
use crate::search::{examine, resolve_aspect};
use crate::store::PhotoStore;
use crate::utils::{format_millis, read_image};

#[derive(Parser, Debug, Clone)]
pub struct ExamineCommand {
    #[command(flatten)]
    pub model: ModelOptions,
    /// 图片路径
    pub path: PathBuf,
    /// 只显示该方面的记录
    #[arg(long)]
    pub aspect: Option<String>,
    /// 同时让模型重新生成一份描述，不会写入数据库
    #[arg(long)]
    pub describe: bool,
    /// 输出格式
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl SubCommandExtend for ExamineCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let store = PhotoStore::open(&opts.db_path).await?;
        let records = examine(&store, &self.path, self.aspect.as_deref()).await;
        // 重新生成描述时使用与索引时相同的提示词
        let aspect = match &self.aspect {
            Some(name) => resolve_aspect(&store, name, None).await,
            None => Ok(Aspect::default()),
        };
        store.close().await?;
        let records = records?;
        let aspect = aspect?;

        let fresh = if self.describe {
            let model = OllamaClient::from_options(&self.model)?;
            let image = read_image(&self.path).await?;
            Some(model.describe(&image, &aspect.prompt).await?)
        } else {
            None
        };

        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({ "records": records, "description": fresh });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Table => {
                for record in &records {
                    println!("[{}] {}", record.aspect, format_millis(record.indexed_at));
                    println!("prompt: {}", record.prompt);
                    println!("{}\n", record.description.trim());
                }
                if let Some(description) = fresh {
                    println!("[fresh]");
                    println!("{}", description.trim());
                }
            }
        }
        Ok(())
    }
}

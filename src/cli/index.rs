use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indicatif::ProgressBar;
use log::{info, warn};

use crate::aspect::{Aspect, DEFAULT_ASPECT, DEFAULT_PROMPT, preset_names};
use crate::cli::SubCommandExtend;
use crate::config::{ModelOptions, Opts};
use crate::indexer::{IndexSummary, index_directory};
use crate::model::{ModelClient, OllamaClient};
use crate::search::resolve_aspect;
use crate::store::PhotoStore;
use crate::utils::{pb_style, suffix_regex};

#[derive(Parser, Debug, Clone)]
pub struct IndexCommand {
    #[command(flatten)]
    pub model: ModelOptions,
    /// 图片所在目录
    pub path: PathBuf,
    /// 方面名称，内置 default、safety、aesthetic
    #[arg(long, default_value = DEFAULT_ASPECT)]
    pub aspect: String,
    /// 自定义提示词，优先于方面的内置提示词
    #[arg(long)]
    pub prompt: Option<String>,
    /// 重新生成已索引图片的描述
    #[arg(long)]
    pub update: bool,
    /// 同时处理的图片数量
    #[arg(long, default_value_t = 4)]
    pub max_workers: usize,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "jpg,jpeg,png")]
    pub suffix: String,
}

impl SubCommandExtend for IndexCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        Aspect::new(&self.aspect, None)?;
        let suffix = suffix_regex(&self.suffix).context("无效的后缀名")?;
        if !self.path.is_dir() {
            anyhow::bail!("目录不存在: {}", self.path.display());
        }

        let model = OllamaClient::from_options(&self.model)?;
        model.check().await?;

        let store = PhotoStore::create(&opts.db_path).await?;
        // 未指定提示词时沿用该方面已保存的提示词
        let aspect = match resolve_aspect(&store, &self.aspect, self.prompt.clone()).await {
            Ok(aspect) => aspect,
            Err(e) => {
                store.close().await?;
                return Err(e.into());
            }
        };
        if !aspect.is_preset() && aspect.prompt == DEFAULT_PROMPT {
            warn!(
                "方面 {} 不是内置方面 ({})，将使用默认提示词",
                aspect.name,
                preset_names().collect::<Vec<_>>().join(", ")
            );
        }
        info!("开始索引 {}，方面: {}", self.path.display(), aspect.name);

        let pb = ProgressBar::no_length().with_style(pb_style());
        let result = index_directory(
            &model,
            &store,
            &self.path,
            &suffix,
            &aspect,
            self.update,
            self.max_workers,
            &pb,
        )
        .await;
        // 中止时也保存已完成的部分
        store.close().await?;

        print_summary(&result?);
        Ok(())
    }
}

fn print_summary(summary: &IndexSummary) {
    println!(
        "indexed: {}, updated: {}, skipped: {}, failed: {}",
        summary.indexed, summary.updated, summary.skipped, summary.failed
    );
    for (path, reason) in &summary.failures {
        println!("  {}: {reason}", path.display());
    }
}

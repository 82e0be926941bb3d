use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::Parser;
use log::{error, warn};
use serde::Serialize;

use crate::aspect::Aspect;
use crate::cli::SubCommandExtend;
use crate::config::{ModelOptions, Opts, OutputFormat, SearchOptions};
use crate::model::OllamaClient;
use crate::search::{Query, resolve_aspect, search};
use crate::store::{PhotoStore, SearchResult};
use crate::utils::{format_millis, open_image};

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub model: ModelOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    /// 被搜索的图片路径，可以有多个
    #[arg(required = true)]
    pub images: Vec<PathBuf>,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let model = OllamaClient::from_options(&self.model)?;
        let store = PhotoStore::open(&opts.db_path).await?;
        let aspect = query_aspect(&store, &self.search).await?;

        let mut outputs = vec![];
        let mut failed = 0;
        let mut fatal = None;
        for image in &self.images {
            let query = Query::Image(image);
            match search(&model, &store, query, &aspect, self.search.aspect_filter(), self.search.k)
                .await
            {
                Ok(results) => outputs.push((image.as_path(), results)),
                Err(e) if e.is_fatal() => {
                    fatal = Some(e);
                    break;
                }
                Err(e) => {
                    error!("{}: {e}", image.display());
                    failed += 1;
                }
            }
        }
        // 打开时可能重建了索引，关闭时保存
        store.close().await?;
        if let Some(e) = fatal {
            return Err(e.into());
        }

        if let [(_, results)] = outputs.as_slice() {
            print_results(results, &self.search)?;
        } else {
            print_grouped(&outputs, &self.search)?;
        }
        for (_, results) in &outputs {
            view_results(results, &self.search);
        }

        if failed > 0 {
            bail!("{failed} 张图片搜索失败");
        }
        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
pub struct SearchTextCommand {
    #[command(flatten)]
    pub model: ModelOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    /// 查询文本
    pub query: String,
}

impl SubCommandExtend for SearchTextCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let model = OllamaClient::from_options(&self.model)?;
        let store = PhotoStore::open(&opts.db_path).await?;
        let aspect = query_aspect(&store, &self.search).await?;

        let results = search(
            &model,
            &store,
            Query::Text(&self.query),
            &aspect,
            self.search.aspect_filter(),
            self.search.k,
        )
        .await;
        store.close().await?;
        let results = results?;

        print_results(&results, &self.search)?;
        view_results(&results, &self.search);
        Ok(())
    }
}

/// 以图搜图时用于生成描述的方面，搜索所有方面时使用默认方面
async fn query_aspect(store: &PhotoStore, opts: &SearchOptions) -> Result<Aspect> {
    Ok(match opts.aspect_filter() {
        Some(name) => resolve_aspect(store, name, None).await?,
        None => Aspect::default(),
    })
}

/// 按详细程度输出的一条结果
#[derive(Serialize)]
struct ResultView<'a> {
    distance: f32,
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    indexed_at: Option<String>,
}

impl<'a> ResultView<'a> {
    fn new(result: &'a SearchResult, verbose: u8) -> Self {
        Self {
            distance: result.distance,
            path: &result.path,
            description: (verbose >= 1).then_some(result.description.as_str()),
            aspect: (verbose >= 2).then_some(result.aspect.as_str()),
            indexed_at: (verbose >= 2).then(|| format_millis(result.indexed_at)),
        }
    }

    fn table_row(&self) -> String {
        let mut row = format!("{:.4}\t{}", self.distance, self.path);
        if let Some(aspect) = self.aspect {
            row.push('\t');
            row.push_str(aspect);
        }
        if let Some(time) = &self.indexed_at {
            row.push('\t');
            row.push_str(time);
        }
        if let Some(description) = self.description {
            row.push('\t');
            // 描述中的换行会破坏表格
            row.push_str(&description.split_whitespace().collect::<Vec<_>>().join(" "));
        }
        row
    }
}

fn views(results: &[SearchResult], verbose: u8) -> Vec<ResultView<'_>> {
    results.iter().map(|r| ResultView::new(r, verbose)).collect()
}

fn print_results(results: &[SearchResult], opts: &SearchOptions) -> Result<()> {
    let views = views(results, opts.verbose);
    match opts.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&views)?),
        OutputFormat::Table => {
            for view in &views {
                println!("{}", view.table_row());
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct QueryView<'a> {
    query: &'a Path,
    results: Vec<ResultView<'a>>,
}

fn print_grouped(outputs: &[(&Path, Vec<SearchResult>)], opts: &SearchOptions) -> Result<()> {
    match opts.format {
        OutputFormat::Json => {
            let groups = outputs
                .iter()
                .map(|(query, results)| QueryView { query, results: views(results, opts.verbose) })
                .collect::<Vec<_>>();
            println!("{}", serde_json::to_string_pretty(&groups)?);
        }
        OutputFormat::Table => {
            for (query, results) in outputs {
                println!("# {}", query.display());
                print_results(results, opts)?;
            }
        }
    }
    Ok(())
}

fn view_results(results: &[SearchResult], opts: &SearchOptions) {
    if !opts.view {
        return;
    }
    for result in results {
        if let Err(e) = open_image(Path::new(&result.path)) {
            warn!("无法打开图片 {}: {e}", result.path);
        }
    }
}

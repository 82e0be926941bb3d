use std::path::{Path, PathBuf};

use futures::StreamExt;
use indicatif::ProgressBar;
use log::{debug, warn};
use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use crate::aspect::Aspect;
use crate::error::Result;
use crate::model::ModelClient;
use crate::store::{PhotoRecord, VectorStore};
use crate::utils::{now_millis, read_image};

/// 单张图片的索引结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// 新增记录
    Indexed,
    /// 覆盖了已有记录
    Updated,
    /// 已存在且未要求更新
    Skipped,
}

/// 一次批量索引的统计
#[derive(Debug, Default, Clone, Serialize)]
pub struct IndexSummary {
    pub indexed: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// 失败的文件及原因
    pub failures: Vec<(PathBuf, String)>,
}

impl IndexSummary {
    fn record(&mut self, path: PathBuf, result: Result<IndexOutcome>) {
        match result {
            Ok(IndexOutcome::Indexed) => self.indexed += 1,
            Ok(IndexOutcome::Updated) => self.updated += 1,
            Ok(IndexOutcome::Skipped) => self.skipped += 1,
            Err(e) => {
                self.failed += 1;
                self.failures.push((path, e.to_string()));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.indexed + self.updated + self.skipped + self.failed
    }
}

/// 图片在数据库中使用的路径，即规范化后的绝对路径
pub fn photo_key(path: &Path) -> Result<String> {
    Ok(std::fs::canonicalize(path)?.to_string_lossy().into_owned())
}

/// 递归扫描目录下后缀名匹配的文件，结果已规范化并排序
pub fn scan_directory(root: &Path, suffix: &Regex) -> Result<Vec<PathBuf>> {
    let mut files = vec![];
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("无法读取目录项: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let matched = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| suffix.is_match(ext));
        if matched {
            files.push(std::fs::canonicalize(entry.path())?);
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// 索引单张图片
///
/// 如果 (path, aspect) 已存在且 `update` 为 false，不会调用模型
pub async fn index_photo<M, S>(
    model: &M,
    store: &S,
    path: &Path,
    aspect: &Aspect,
    update: bool,
) -> Result<IndexOutcome>
where
    M: ModelClient,
    S: VectorStore,
{
    let key = photo_key(path)?;
    let exists = store.get(&key, &aspect.name).await?.is_some();
    if exists && !update {
        debug!("跳过已索引图片: {key}");
        return Ok(IndexOutcome::Skipped);
    }

    let image = read_image(path).await?;
    let analysis = model.analyze(&image, &aspect.prompt).await?;
    store
        .upsert(PhotoRecord {
            path: key,
            aspect: aspect.name.clone(),
            prompt: aspect.prompt.clone(),
            description: analysis.description,
            embedding: analysis.embedding,
            indexed_at: now_millis(),
        })
        .await?;

    Ok(if exists { IndexOutcome::Updated } else { IndexOutcome::Indexed })
}

/// 并发索引一批图片，最多同时处理 `workers` 张
///
/// 单张图片失败只会计入统计；模型服务不可用等致命错误会中止整个任务
pub async fn index_photos<M, S>(
    model: &M,
    store: &S,
    files: Vec<PathBuf>,
    aspect: &Aspect,
    update: bool,
    workers: usize,
    pb: &ProgressBar,
) -> Result<IndexSummary>
where
    M: ModelClient,
    S: VectorStore,
{
    pb.set_length(files.len() as u64);
    let mut summary = IndexSummary::default();
    let mut tasks = futures::stream::iter(files)
        .map(move |path| async move {
            let result = index_photo(model, store, &path, aspect, update).await;
            (path, result)
        })
        .buffer_unordered(workers.max(1));

    while let Some((path, result)) = tasks.next().await {
        let result = match result {
            Err(e) if e.is_fatal() => {
                pb.abandon_with_message("索引中止");
                return Err(e);
            }
            other => other,
        };
        match &result {
            Ok(IndexOutcome::Indexed) => pb.set_message(format!("已索引: {}", path.display())),
            Ok(IndexOutcome::Updated) => pb.set_message(format!("已更新: {}", path.display())),
            Ok(IndexOutcome::Skipped) => pb.set_message(format!("跳过: {}", path.display())),
            Err(e) => {
                warn!("索引失败: {}: {e}", path.display());
                pb.println(format!("[ERR] {}: {e}", path.display()));
            }
        }
        summary.record(path, result);
        pb.inc(1);
    }

    pb.finish_with_message("索引完成");
    Ok(summary)
}

/// 扫描目录并索引其中的图片
#[allow(clippy::too_many_arguments)]
pub async fn index_directory<M, S>(
    model: &M,
    store: &S,
    root: &Path,
    suffix: &Regex,
    aspect: &Aspect,
    update: bool,
    workers: usize,
    pb: &ProgressBar,
) -> Result<IndexSummary>
where
    M: ModelClient,
    S: VectorStore,
{
    let files = scan_directory(root, suffix)?;
    debug!("在 {} 中找到 {} 张图片", root.display(), files.len());
    index_photos(model, store, files, aspect, update, workers, pb).await
}

mod index;
mod memory;
mod photo_store;

use std::cmp::Ordering;
use std::future::Future;

use serde::Serialize;

pub use index::VectorIndex;
pub use memory::MemoryStore;
pub use photo_store::PhotoStore;

use crate::error::Result;

/// 一张图片在某个方面下的记录，(path, aspect) 唯一
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoRecord {
    pub path: String,
    pub aspect: String,
    pub prompt: String,
    pub description: String,
    #[serde(skip_serializing)]
    pub embedding: Vec<f32>,
    /// 索引时间，Unix 毫秒
    pub indexed_at: i64,
}

/// 一条搜索结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub path: String,
    pub aspect: String,
    pub distance: f32,
    pub description: String,
    pub indexed_at: i64,
}

/// 一张已索引的图片及其所有方面
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoSummary {
    pub path: String,
    pub aspects: Vec<String>,
}

/// 向量数据库
///
/// 所有方法都可以被多个任务并发调用
pub trait VectorStore: Send + Sync {
    /// 获取 (path, aspect) 对应的记录
    fn get(
        &self,
        path: &str,
        aspect: &str,
    ) -> impl Future<Output = Result<Option<PhotoRecord>>> + Send;

    /// 添加或替换 (path, aspect) 对应的记录
    fn upsert(&self, record: PhotoRecord) -> impl Future<Output = Result<()>> + Send;

    /// 查找距离最近的 k 条记录，`aspect` 不为空时只查找该方面，结果按 [`sort_results`] 排序
    fn query(
        &self,
        embedding: &[f32],
        k: usize,
        aspect: Option<&str>,
    ) -> impl Future<Output = Result<Vec<SearchResult>>> + Send;

    /// 获取一张图片的所有记录，按方面名称排序
    fn records(&self, path: &str) -> impl Future<Output = Result<Vec<PhotoRecord>>> + Send;

    /// 该方面最近一次索引时使用的提示词，没有记录时为 None
    fn aspect_prompt(
        &self,
        aspect: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    /// 列出所有已索引的图片，按路径排序
    fn photos(&self) -> impl Future<Output = Result<Vec<PhotoSummary>>> + Send;

    /// 删除一张图片的记录，`aspect` 为空时删除所有方面，返回删除的数量
    fn remove(&self, path: &str, aspect: Option<&str>)
    -> impl Future<Output = Result<usize>> + Send;

    /// 删除所有记录
    fn clear(&self) -> impl Future<Output = Result<()>> + Send;

    /// 记录总数
    fn count(&self) -> impl Future<Output = Result<usize>> + Send;

    /// 将尚未持久化的数据写入磁盘
    fn flush(&self) -> impl Future<Output = Result<()>> + Send;
}

/// 按距离升序排序，距离相同时较早索引的在前，再按路径排序
pub fn sort_results(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal)
            .then(a.indexed_at.cmp(&b.indexed_at))
            .then_with(|| a.path.cmp(&b.path))
            .then_with(|| a.aspect.cmp(&b.aspect))
    });
}

/// 将 (path, aspect) 列表按路径分组，输入需已按路径排序
pub(crate) fn group_by_path(pairs: impl IntoIterator<Item = (String, String)>) -> Vec<PhotoSummary> {
    let mut photos: Vec<PhotoSummary> = vec![];
    for (path, aspect) in pairs {
        match photos.last_mut() {
            Some(last) if last.path == path => last.aspects.push(aspect),
            _ => photos.push(PhotoSummary { path, aspects: vec![aspect] }),
        }
    }
    photos
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(path: &str, distance: f32, indexed_at: i64) -> SearchResult {
        SearchResult {
            path: path.to_owned(),
            aspect: "default".to_owned(),
            distance,
            description: String::new(),
            indexed_at,
        }
    }

    #[test]
    fn ties_are_broken_by_timestamp_then_path() {
        let mut results = vec![
            result("/c.jpg", 0.5, 20),
            result("/b.jpg", 0.1, 30),
            result("/a.jpg", 0.5, 10),
            result("/d.jpg", 0.5, 10),
        ];
        sort_results(&mut results);
        let paths = results.iter().map(|r| r.path.as_str()).collect::<Vec<_>>();
        assert_eq!(paths, ["/b.jpg", "/a.jpg", "/d.jpg", "/c.jpg"]);
    }

    #[test]
    fn group_by_path_merges_adjacent() {
        let photos = group_by_path([
            ("/a.jpg".to_owned(), "default".to_owned()),
            ("/a.jpg".to_owned(), "safety".to_owned()),
            ("/b.jpg".to_owned(), "default".to_owned()),
        ]);
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].aspects, ["default", "safety"]);
        assert_eq!(photos[1].path, "/b.jpg");
    }
}

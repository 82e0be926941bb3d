use std::collections::BTreeMap;

use tokio::sync::RwLock;

use super::*;
use crate::error::Error;

/// 纯内存的向量数据库，暴力搜索，主要用于测试
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<(String, String), PhotoRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 平方欧氏距离
fn l2sq(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl VectorStore for MemoryStore {
    async fn get(&self, path: &str, aspect: &str) -> Result<Option<PhotoRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&(path.to_owned(), aspect.to_owned())).cloned())
    }

    async fn upsert(&self, record: PhotoRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if let Some(other) = records.values().next() {
            if other.embedding.len() != record.embedding.len() {
                return Err(Error::DimensionMismatch {
                    expected: other.embedding.len(),
                    actual: record.embedding.len(),
                });
            }
        }
        records.insert((record.path.clone(), record.aspect.clone()), record);
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        aspect: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        let records = self.records.read().await;
        let mut results = records
            .values()
            .filter(|r| aspect.is_none_or(|a| r.aspect == a))
            .map(|r| SearchResult {
                path: r.path.clone(),
                aspect: r.aspect.clone(),
                distance: l2sq(&r.embedding, embedding),
                description: r.description.clone(),
                indexed_at: r.indexed_at,
            })
            .collect::<Vec<_>>();
        sort_results(&mut results);
        results.truncate(k);
        Ok(results)
    }

    async fn records(&self, path: &str) -> Result<Vec<PhotoRecord>> {
        let records = self.records.read().await;
        Ok(records.values().filter(|r| r.path == path).cloned().collect())
    }

    async fn aspect_prompt(&self, aspect: &str) -> Result<Option<String>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.aspect == aspect)
            .max_by_key(|r| r.indexed_at)
            .map(|r| r.prompt.clone()))
    }

    async fn photos(&self) -> Result<Vec<PhotoSummary>> {
        let records = self.records.read().await;
        Ok(group_by_path(records.keys().cloned()))
    }

    async fn remove(&self, path: &str, aspect: Option<&str>) -> Result<usize> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|(p, a), _| !(p == path && aspect.is_none_or(|aspect| a == aspect)));
        Ok(before - records.len())
    }

    async fn clear(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

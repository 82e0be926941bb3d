use std::collections::HashMap;
use std::path::Path;

use log::debug;
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::error::{Error, Result};

/// usearch 向量索引，同时记录每个 key 对应的方面用于过滤
pub struct VectorIndex {
    index: Index,
    aspects: HashMap<u64, String>,
}

impl VectorIndex {
    fn options(dimensions: usize) -> IndexOptions {
        IndexOptions {
            dimensions,
            // 平方欧氏距离
            metric: MetricKind::L2sq,
            quantization: ScalarKind::F32,
            ..Default::default()
        }
    }

    /// 创建一个空索引
    pub fn new(dimensions: usize) -> Result<Self> {
        let index = Index::new(&Self::options(dimensions)).map_err(Error::index)?;
        Ok(Self { index, aspects: HashMap::new() })
    }

    /// 从文件加载索引，`aspects` 需与文件中的 key 一致
    pub fn load<P: AsRef<Path>>(
        path: P,
        dimensions: usize,
        aspects: HashMap<u64, String>,
    ) -> Result<Self> {
        let s = Self::new(dimensions)?;
        s.index.load(path_str(path.as_ref())?).map_err(Error::index)?;
        if s.index.dimensions() != dimensions {
            return Err(Error::DimensionMismatch {
                expected: dimensions,
                actual: s.index.dimensions(),
            });
        }
        Ok(Self { aspects, ..s })
    }

    /// 使用给定向量构建索引
    pub fn build<I>(dimensions: usize, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u64, String, Vec<f32>)>,
    {
        let mut s = Self::new(dimensions)?;
        for (key, aspect, vector) in entries {
            s.upsert(key, &aspect, &vector)?;
        }
        debug!("重建向量索引完成，共 {} 条", s.len());
        Ok(s)
    }

    pub fn dimensions(&self) -> usize {
        self.index.dimensions()
    }

    pub fn len(&self) -> usize {
        self.index.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions(),
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// 添加或替换向量
    pub fn upsert(&mut self, key: u64, aspect: &str, vector: &[f32]) -> Result<()> {
        self.check_dimensions(vector)?;
        if self.index.contains(key) {
            self.index.remove(key).map_err(Error::index)?;
        }
        if self.index.size() + 1 > self.index.capacity() {
            let capacity = (self.index.capacity() * 2).max(64);
            self.index.reserve(capacity).map_err(Error::index)?;
        }
        self.index.add(key, vector).map_err(Error::index)?;
        self.aspects.insert(key, aspect.to_owned());
        Ok(())
    }

    pub fn remove(&mut self, key: u64) -> Result<()> {
        if self.index.contains(key) {
            self.index.remove(key).map_err(Error::index)?;
        }
        self.aspects.remove(&key);
        Ok(())
    }

    /// 查找最近的 k 个向量，返回 `(key, 距离)`
    pub fn search(&self, vector: &[f32], k: usize, aspect: Option<&str>) -> Result<Vec<(u64, f32)>> {
        self.check_dimensions(vector)?;
        if k == 0 || self.is_empty() {
            return Ok(vec![]);
        }
        // usearch 按 k 预先分配结果缓冲区
        let k = k.min(self.len());
        let matches = match aspect {
            Some(aspect) => self
                .index
                .filtered_search(vector, k, |key| {
                    self.aspects.get(&key).is_some_and(|a| a == aspect)
                })
                .map_err(Error::index)?,
            None => self.index.search(vector, k).map_err(Error::index)?,
        };
        Ok(matches.keys.into_iter().zip(matches.distances).collect())
    }

    /// 保存索引，先写入临时文件再重命名
    pub fn save<P: AsRef<Path>>(&self, path: P, tmp: P) -> Result<()> {
        self.index.save(path_str(tmp.as_ref())?).map_err(Error::index)?;
        std::fs::rename(tmp, path)?;
        Ok(())
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| Error::Index(format!("路径不是合法的 UTF-8: {}", path.display())))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn sample() -> VectorIndex {
        VectorIndex::build(
            2,
            [
                (1, "default".to_owned(), vec![0.0, 0.0]),
                (2, "default".to_owned(), vec![1.0, 0.0]),
                (3, "safety".to_owned(), vec![0.1, 0.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn nearest_first() {
        let index = sample();
        let result = index.search(&[0.0, 0.0], 3, None).unwrap();
        let keys = result.iter().map(|(k, _)| *k).collect::<Vec<_>>();
        assert_eq!(keys, [1, 3, 2]);
        assert!(result[0].1.abs() < 1e-6);
        assert!((result[1].1 - 0.01).abs() < 1e-4);
    }

    #[test]
    fn filter_by_aspect() {
        let index = sample();
        let result = index.search(&[0.0, 0.0], 3, Some("safety")).unwrap();
        assert_eq!(result.iter().map(|(k, _)| *k).collect::<Vec<_>>(), [3]);
        assert!(index.search(&[0.0, 0.0], 3, Some("missing")).unwrap().is_empty());
    }

    #[test]
    fn upsert_replaces_vector() {
        let mut index = sample();
        index.upsert(2, "default", &[0.0, 0.05]).unwrap();
        assert_eq!(index.len(), 3);
        let result = index.search(&[0.0, 0.0], 2, Some("default")).unwrap();
        assert_eq!(result.iter().map(|(k, _)| *k).collect::<Vec<_>>(), [1, 2]);
    }

    #[test]
    fn remove_and_dimension_check() {
        let mut index = sample();
        index.remove(1).unwrap();
        index.remove(42).unwrap();
        assert_eq!(index.len(), 2);
        assert!(matches!(
            index.search(&[0.0, 0.0, 0.0], 1, None),
            Err(Error::DimensionMismatch { expected: 2, actual: 3 })
        ));
        assert!(index.upsert(9, "default", &[1.0]).is_err());
    }

    #[test]
    fn huge_k_is_clamped_to_size() {
        let index = sample();
        for k in [1000, 1 << 40, usize::MAX] {
            assert_eq!(index.search(&[0.0, 0.0], k, None).unwrap().len(), index.len());
        }
        let result = index.search(&[0.0, 0.0], usize::MAX, Some("default")).unwrap();
        assert_eq!(result.iter().map(|(k, _)| *k).collect::<Vec<_>>(), [1, 2]);
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photos.usearch");
        let tmp = dir.path().join("photos.usearch.tmp");
        let index = sample();
        index.save(&path, &tmp).unwrap();
        assert!(path.exists());
        assert!(!tmp.exists());

        let loaded = VectorIndex::load(&path, 2, index.aspects.clone()).unwrap();
        assert_eq!(loaded.len(), 3);
        let result = loaded.search(&[1.0, 0.0], 1, Some("default")).unwrap();
        assert_eq!(result[0].0, 2);
    }
}

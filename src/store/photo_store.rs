use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::RwLock;

use super::*;
use crate::config::StoreDir;
use crate::db::{Database, crud, decode_embedding, init_db};
use crate::error::Error;

/// 基于 SQLite + usearch 的向量数据库
///
/// SQLite 保存完整记录，是唯一的数据来源；usearch 索引只保存向量，
/// 打开时如果索引文件缺失或与 SQLite 不一致，会从 SQLite 重建
pub struct PhotoStore {
    dir: StoreDir,
    db: Database,
    /// 第一次写入前不知道向量维度，此时为 None
    index: RwLock<Option<VectorIndex>>,
    /// 索引是否有尚未保存的修改
    dirty: AtomicBool,
}

impl PhotoStore {
    /// 打开已存在的数据库
    pub async fn open(dir: &StoreDir) -> Result<Self> {
        if !dir.exists() {
            return Err(Error::StoreNotFound(dir.path().to_path_buf()));
        }
        Self::open_inner(dir).await
    }

    /// 打开数据库，不存在时创建
    pub async fn create(dir: &StoreDir) -> Result<Self> {
        std::fs::create_dir_all(dir.path())?;
        Self::open_inner(dir).await
    }

    async fn open_inner(dir: &StoreDir) -> Result<Self> {
        let db = init_db(dir.database()).await?;
        let (index, dirty) = load_index(&db, dir).await?;
        Ok(Self { dir: dir.clone(), db, index: RwLock::new(index), dirty: AtomicBool::new(dirty) })
    }

    /// 删除整个数据库目录
    pub fn destroy(dir: &StoreDir) -> Result<()> {
        if !dir.path().is_dir() {
            return Err(Error::StoreNotFound(dir.path().to_path_buf()));
        }
        std::fs::remove_dir_all(dir.path())?;
        info!("已删除数据库目录: {}", dir.path().display());
        Ok(())
    }

    pub fn dir(&self) -> &StoreDir {
        &self.dir
    }

    /// 保存索引并关闭连接池
    pub async fn close(self) -> Result<()> {
        self.flush().await?;
        self.db.close().await;
        Ok(())
    }
}

/// 加载向量索引，返回索引以及是否需要保存
async fn load_index(db: &Database, dir: &StoreDir) -> Result<(Option<VectorIndex>, bool)> {
    let keys = crud::get_keys(db).await?;
    let Some(first) = keys.first() else {
        return Ok((None, false));
    };
    let dimensions = first.size as usize / size_of::<f32>();
    let aspects = keys.iter().map(|k| (k.id as u64, k.aspect.clone())).collect::<HashMap<_, _>>();

    let index_file = dir.index();
    let last_indexed_at = crud::last_indexed_at(db).await?.unwrap_or_default();
    if modified_millis(&index_file).is_some_and(|t| t < last_indexed_at) {
        warn!("向量索引早于最近一次索引，重建索引");
    } else if index_file.exists() {
        match VectorIndex::load(&index_file, dimensions, aspects) {
            Ok(index) if index.len() == keys.len() => {
                debug!("从 {} 加载向量索引，共 {} 条", index_file.display(), index.len());
                return Ok((Some(index), false));
            }
            Ok(index) => {
                warn!("向量索引与数据库不一致 ({} != {})，重建索引", index.len(), keys.len())
            }
            Err(e) => warn!("无法加载向量索引: {e}，重建索引"),
        }
    }

    info!("正在重建向量索引");
    let rows = crud::get_embeddings(db).await?;
    let index = VectorIndex::build(
        dimensions,
        rows.into_iter()
            .map(|row| (row.id as u64, row.aspect, decode_embedding(&row.embedding))),
    )?;
    Ok((Some(index), true))
}

/// 文件修改时间，Unix 毫秒
fn modified_millis(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified).timestamp_millis())
}

impl VectorStore for PhotoStore {
    async fn get(&self, path: &str, aspect: &str) -> Result<Option<PhotoRecord>> {
        Ok(crud::get_photo(&self.db, path, aspect).await?.map(Into::into))
    }

    async fn upsert(&self, record: PhotoRecord) -> Result<()> {
        // 持有写锁完成 SQLite 与索引的更新，读者不会看到只更新了一半的记录
        let mut guard = self.index.write().await;
        if guard.is_none() {
            *guard = Some(VectorIndex::new(record.embedding.len())?);
        }
        let Some(index) = guard.as_mut() else {
            return Err(Error::Index("向量索引未初始化".to_owned()));
        };
        if index.dimensions() != record.embedding.len() {
            return Err(Error::DimensionMismatch {
                expected: index.dimensions(),
                actual: record.embedding.len(),
            });
        }

        let id = crud::upsert_photo(&self.db, &record).await?;
        index.upsert(id as u64, &record.aspect, &record.embedding)?;
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        aspect: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        let index = self.index.read().await;
        let Some(index) = &*index else {
            return Ok(vec![]);
        };

        let neighbors = index.search(embedding, k, aspect)?;
        let ids = neighbors.iter().map(|(key, _)| *key as i64).collect::<Vec<_>>();
        let mut rows = crud::get_photos_by_ids(&self.db, &ids)
            .await?
            .into_iter()
            .map(|row| (row.id as u64, row))
            .collect::<HashMap<_, _>>();

        let mut results = neighbors
            .into_iter()
            .filter_map(|(key, distance)| {
                let row = rows.remove(&key)?;
                Some(SearchResult {
                    path: row.path,
                    aspect: row.aspect,
                    distance,
                    description: row.description,
                    indexed_at: row.indexed_at,
                })
            })
            .collect::<Vec<_>>();
        sort_results(&mut results);
        Ok(results)
    }

    async fn records(&self, path: &str) -> Result<Vec<PhotoRecord>> {
        let rows = crud::get_photos_by_path(&self.db, path).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn aspect_prompt(&self, aspect: &str) -> Result<Option<String>> {
        Ok(crud::get_aspect_prompt(&self.db, aspect).await?)
    }

    async fn photos(&self) -> Result<Vec<PhotoSummary>> {
        Ok(group_by_path(crud::get_path_aspects(&self.db).await?))
    }

    async fn remove(&self, path: &str, aspect: Option<&str>) -> Result<usize> {
        let mut index = self.index.write().await;
        let ids = crud::delete_photos(&self.db, path, aspect).await?;
        if let Some(index) = &mut *index {
            for id in &ids {
                index.remove(*id as u64)?;
            }
        }
        if !ids.is_empty() {
            self.dirty.store(true, Ordering::Release);
        }
        Ok(ids.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut index = self.index.write().await;
        let deleted = crud::delete_all(&self.db).await?;
        *index = None;
        let index_file = self.dir.index();
        if index_file.exists() {
            std::fs::remove_file(index_file)?;
        }
        self.dirty.store(false, Ordering::Release);
        info!("已清空 {deleted} 条记录");
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(crud::count_photos(&self.db).await? as usize)
    }

    async fn flush(&self) -> Result<()> {
        let index = self.index.read().await;
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        match &*index {
            Some(index) => {
                debug!("保存向量索引到 {}", self.dir.index().display());
                if let Err(e) = index.save(self.dir.index(), self.dir.index_tmp()) {
                    self.dirty.store(true, Ordering::Release);
                    return Err(e);
                }
            }
            None => {
                let index_file = self.dir.index();
                if index_file.exists() {
                    std::fs::remove_file(index_file)?;
                }
            }
        }
        Ok(())
    }
}

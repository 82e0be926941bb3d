use sqlx::FromRow;

use crate::store::PhotoRecord;

/// 照片记录
#[derive(Debug, FromRow)]
pub struct PhotoRow {
    /// 记录 ID，同时也是向量索引中的 key
    pub id: i64,
    /// 图片路径
    pub path: String,
    /// 方面名称
    pub aspect: String,
    /// 生成描述时使用的提示词
    pub prompt: String,
    /// 模型生成的描述
    pub description: String,
    /// 本机字节序的 f32 数组
    pub embedding: Vec<u8>,
    /// 索引时间，Unix 毫秒
    pub indexed_at: i64,
}

impl From<PhotoRow> for PhotoRecord {
    fn from(row: PhotoRow) -> Self {
        Self {
            path: row.path,
            aspect: row.aspect,
            prompt: row.prompt,
            description: row.description,
            embedding: decode_embedding(&row.embedding),
            indexed_at: row.indexed_at,
        }
    }
}

/// 向量索引需要的最少信息
#[derive(Debug, FromRow)]
pub struct KeyRow {
    pub id: i64,
    pub aspect: String,
    /// 向量的字节数
    pub size: i64,
}

/// 用于重建向量索引
#[derive(Debug, FromRow)]
pub struct EmbeddingRow {
    pub id: i64,
    pub aspect: String,
    pub embedding: Vec<u8>,
}

pub fn encode_embedding(embedding: &[f32]) -> &[u8] {
    bytemuck::cast_slice(embedding)
}

pub fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytemuck::pod_collect_to_vec(bytes)
}

use sqlx::{Executor, QueryBuilder, Result, Sqlite, SqlitePool};

use super::{EmbeddingRow, KeyRow, PhotoRow, encode_embedding};
use crate::store::PhotoRecord;

/// 添加或替换 (path, aspect) 对应的记录，返回记录 ID
///
/// 替换时 ID 保持不变
pub async fn upsert_photo<'c, E>(executor: E, record: &PhotoRecord) -> Result<i64>
where
    E: Executor<'c, Database = Sqlite>,
{
    let id = sqlx::query_scalar(
        r#"
        INSERT INTO photo (path, aspect, prompt, description, embedding, indexed_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (path, aspect) DO UPDATE SET
            prompt = excluded.prompt,
            description = excluded.description,
            embedding = excluded.embedding,
            indexed_at = excluded.indexed_at
        RETURNING id
        "#,
    )
    .bind(&record.path)
    .bind(&record.aspect)
    .bind(&record.prompt)
    .bind(&record.description)
    .bind(encode_embedding(&record.embedding))
    .bind(record.indexed_at)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// 根据 (path, aspect) 查找记录
pub async fn get_photo(executor: &SqlitePool, path: &str, aspect: &str) -> Result<Option<PhotoRow>> {
    sqlx::query_as(
        r#"
        SELECT id, path, aspect, prompt, description, embedding, indexed_at
        FROM photo WHERE path = ? AND aspect = ?
        "#,
    )
    .bind(path)
    .bind(aspect)
    .fetch_optional(executor)
    .await
}

/// 获取一张图片的所有方面
pub async fn get_photos_by_path(executor: &SqlitePool, path: &str) -> Result<Vec<PhotoRow>> {
    sqlx::query_as(
        r#"
        SELECT id, path, aspect, prompt, description, embedding, indexed_at
        FROM photo WHERE path = ? ORDER BY aspect
        "#,
    )
    .bind(path)
    .fetch_all(executor)
    .await
}

/// 根据记录 ID 批量获取记录，不保证顺序
pub async fn get_photos_by_ids(executor: &SqlitePool, ids: &[i64]) -> Result<Vec<PhotoRow>> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT id, path, aspect, prompt, description, embedding, indexed_at FROM photo WHERE id IN (",
    );
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    query.build_query_as().fetch_all(executor).await
}

/// 该方面最近一次索引时使用的提示词
pub async fn get_aspect_prompt(executor: &SqlitePool, aspect: &str) -> Result<Option<String>> {
    sqlx::query_scalar(
        "SELECT prompt FROM photo WHERE aspect = ? ORDER BY indexed_at DESC, id DESC LIMIT 1",
    )
    .bind(aspect)
    .fetch_optional(executor)
    .await
}

/// 获取所有记录的 ID、方面和向量字节数
pub async fn get_keys(executor: &SqlitePool) -> Result<Vec<KeyRow>> {
    sqlx::query_as("SELECT id, aspect, length(embedding) AS size FROM photo ORDER BY id")
        .fetch_all(executor)
        .await
}

/// 获取所有向量，用于重建索引
pub async fn get_embeddings(executor: &SqlitePool) -> Result<Vec<EmbeddingRow>> {
    sqlx::query_as("SELECT id, aspect, embedding FROM photo ORDER BY id")
        .fetch_all(executor)
        .await
}

/// 获取所有 (path, aspect)，按路径排序
pub async fn get_path_aspects(executor: &SqlitePool) -> Result<Vec<(String, String)>> {
    sqlx::query_as("SELECT path, aspect FROM photo ORDER BY path, aspect")
        .fetch_all(executor)
        .await
}

/// 删除一张图片的记录，`aspect` 为空时删除所有方面，返回被删除的记录 ID
pub async fn delete_photos(
    executor: &SqlitePool,
    path: &str,
    aspect: Option<&str>,
) -> Result<Vec<i64>> {
    match aspect {
        Some(aspect) => {
            sqlx::query_scalar("DELETE FROM photo WHERE path = ? AND aspect = ? RETURNING id")
                .bind(path)
                .bind(aspect)
                .fetch_all(executor)
                .await
        }
        None => {
            sqlx::query_scalar("DELETE FROM photo WHERE path = ? RETURNING id")
                .bind(path)
                .fetch_all(executor)
                .await
        }
    }
}

/// 删除所有记录
pub async fn delete_all(executor: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM photo").execute(executor).await?;
    sqlx::query("VACUUM").execute(executor).await?;
    Ok(result.rows_affected())
}

/// 最近一次索引的时间
pub async fn last_indexed_at(executor: &SqlitePool) -> Result<Option<i64>> {
    sqlx::query_scalar("SELECT MAX(indexed_at) FROM photo").fetch_one(executor).await
}

/// 记录总数
pub async fn count_photos(executor: &SqlitePool) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM photo").fetch_one(executor).await
}

use std::path::Path;

use log::debug;

use crate::aspect::Aspect;
use crate::error::{Error, Result};
use crate::indexer::photo_key;
use crate::model::ModelClient;
use crate::store::{PhotoRecord, SearchResult, VectorStore};
use crate::utils::{EncodedImage, encode_image, read_image};

/// 查询内容
#[derive(Debug, Clone, Copy)]
pub enum Query<'a> {
    Text(&'a str),
    /// 本地图片文件
    Image(&'a Path),
    /// 上传的图片数据
    ImageBytes { name: &'a str, data: &'a [u8] },
}

/// 预处理后的查询，图片已经解码
enum PreparedQuery<'a> {
    Text(&'a str),
    Image(EncodedImage),
}

impl<'a> PreparedQuery<'a> {
    /// 读取并预处理查询图片，不调用模型
    async fn load(query: Query<'a>) -> Result<Self> {
        Ok(match query {
            Query::Text(text) => Self::Text(text),
            Query::Image(path) => Self::Image(read_image(path).await?),
            Query::ImageBytes { name, data } => {
                Self::Image(encode_image(name.to_owned(), data.to_vec()).await?)
            }
        })
    }

    async fn embed<M: ModelClient>(self, model: &M, aspect: &Aspect) -> Result<Vec<f32>> {
        match self {
            Self::Text(text) => model.embed(text).await,
            Self::Image(image) => Ok(model.analyze(&image, &aspect.prompt).await?.embedding),
        }
    }
}

/// 按名称获取方面
///
/// 提示词依次使用 `prompt`、该方面已保存记录的提示词、内置预设，
/// 使同一方面的描述始终由同一个提示词生成
pub async fn resolve_aspect<S: VectorStore>(
    store: &S,
    name: &str,
    prompt: Option<String>,
) -> Result<Aspect> {
    let prompt = match prompt.filter(|p| !p.trim().is_empty()) {
        Some(prompt) => Some(prompt),
        None => store.aspect_prompt(name.trim()).await?,
    };
    Aspect::new(name, prompt)
}

/// 计算查询向量，图片查询会先用 `aspect` 的提示词生成描述
pub async fn query_embedding<M: ModelClient>(
    model: &M,
    query: Query<'_>,
    aspect: &Aspect,
) -> Result<Vec<f32>> {
    PreparedQuery::load(query).await?.embed(model, aspect).await
}

/// 搜索与查询最相似的 k 条记录
///
/// `filter` 不为空时只搜索该方面。查询图片总会先被解码，
/// 之后如果数据库为空或 k 为 0 则直接返回，不会调用模型
pub async fn search<M, S>(
    model: &M,
    store: &S,
    query: Query<'_>,
    aspect: &Aspect,
    filter: Option<&str>,
    k: usize,
) -> Result<Vec<SearchResult>>
where
    M: ModelClient,
    S: VectorStore,
{
    let query = PreparedQuery::load(query).await?;
    if k == 0 || store.count().await? == 0 {
        debug!("数据库为空，跳过搜索");
        return Ok(vec![]);
    }
    let embedding = query.embed(model, aspect).await?;
    store.query(&embedding, k, filter).await
}

/// 查看一张图片的记录，`aspect` 不为空时只返回该方面
pub async fn examine<S: VectorStore>(
    store: &S,
    path: &Path,
    aspect: Option<&str>,
) -> Result<Vec<PhotoRecord>> {
    let key = photo_key(path).unwrap_or_else(|_| path.to_string_lossy().into_owned());
    examine_key(store, &key, aspect).await
}

/// 与 [`examine`] 相同，但直接使用数据库中的路径
pub async fn examine_key<S: VectorStore>(
    store: &S,
    key: &str,
    aspect: Option<&str>,
) -> Result<Vec<PhotoRecord>> {
    let mut records = store.records(key).await?;
    if let Some(aspect) = aspect {
        records.retain(|r| r.aspect == aspect);
    }
    if records.is_empty() {
        return Err(Error::NotIndexed(key.to_owned()));
    }
    Ok(records)
}

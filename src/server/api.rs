use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum_auth::AuthBearer;
use axum_typed_multipart::TypedMultipart;
use log::info;

use super::error::{AppError, Result};
use super::state::AppState;
use super::types::*;
use crate::aspect::{Aspect, DEFAULT_ASPECT};
use crate::error::Error;
use crate::indexer::{IndexOutcome, index_photo, photo_key};
use crate::search::{self, examine, resolve_aspect};
use crate::store::{PhotoRecord, PhotoSummary, SearchResult, VectorStore};

fn authorize(state: &AppState, token: &str) -> std::result::Result<(), (StatusCode, &'static str)> {
    if token == state.token {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "token 无效"))
    }
}

/// 请求中的方面名称，同时作为过滤条件和以图搜图的提示词来源
async fn request_aspect<'a>(
    state: &AppState,
    name: Option<&'a str>,
) -> Result<(Aspect, Option<&'a str>)> {
    match name {
        Some(name) => Ok((resolve_aspect(&state.store, name, None).await?, Some(name))),
        None => Ok((Aspect::default(), None)),
    }
}

async fn run_search(
    state: &AppState,
    query: search::Query<'_>,
    k: Option<usize>,
    aspect: Option<&str>,
) -> Result<Json<SearchResponse>> {
    let start = Instant::now();
    let (prompt_aspect, filter) = request_aspect(state, aspect).await?;
    let results: Vec<SearchResult> = search::search(
        &state.model,
        &state.store,
        query,
        &prompt_aspect,
        filter,
        k.unwrap_or(state.k),
    )
    .await?;
    Ok(Json(SearchResponse { time: start.elapsed().as_millis(), results }))
}

/// 以文字搜图
pub async fn search_text_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
    Json(data): Json<SearchTextRequest>,
) -> axum::response::Result<Json<SearchResponse>> {
    authorize(&state, &token)?;
    info!("正在搜索文本: {}", data.query);
    Ok(run_search(&state, search::Query::Text(&data.query), data.k, data.aspect.as_deref()).await?)
}

/// 搜索一张上传的图片
pub async fn search_image_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
    TypedMultipart(data): TypedMultipart<SearchImageRequest>,
) -> axum::response::Result<Json<SearchResponse>> {
    authorize(&state, &token)?;
    info!("正在搜索上传图片");
    let name = data.file.metadata.file_name.as_deref().unwrap_or("upload");
    let query = search::Query::ImageBytes { name, data: &data.file.contents };
    Ok(run_search(&state, query, data.k, data.aspect.as_deref()).await?)
}

/// 列出已索引的图片
pub async fn list_photos_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
) -> axum::response::Result<Json<Vec<PhotoSummary>>> {
    authorize(&state, &token)?;
    Ok(Json(state.store.photos().await.map_err(AppError)?))
}

/// 查看一张图片的所有记录
pub async fn photo_records_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
    Query(query): Query<RecordsQuery>,
) -> axum::response::Result<Json<Vec<PhotoRecord>>> {
    authorize(&state, &token)?;
    let records = examine(&state.store, Path::new(&query.path), None).await.map_err(AppError)?;
    Ok(Json(records))
}

/// 添加或更新服务器上的一张图片
pub async fn add_photo_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
    Json(data): Json<AddPhotoRequest>,
) -> axum::response::Result<Json<AddPhotoResponse>> {
    authorize(&state, &token)?;
    Ok(add_photo(&state, data).await?)
}

async fn add_photo(state: &AppState, data: AddPhotoRequest) -> Result<Json<AddPhotoResponse>> {
    let name = data.aspect.unwrap_or_else(|| DEFAULT_ASPECT.to_owned());
    let aspect = resolve_aspect(&state.store, &name, data.prompt).await?;
    let path = Path::new(&data.path);
    let outcome = index_photo(&state.model, &state.store, path, &aspect, true).await?;
    state.store.flush().await?;
    info!("已添加图片: {} ({})", data.path, aspect.name);
    Ok(Json(AddPhotoResponse {
        path: photo_key(path)?,
        aspect: aspect.name,
        updated: outcome == IndexOutcome::Updated,
    }))
}

/// 删除图片记录
pub async fn delete_photo_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
    Json(data): Json<DeletePhotoRequest>,
) -> axum::response::Result<Json<DeletePhotoResponse>> {
    authorize(&state, &token)?;
    Ok(delete_photo(&state, data).await?)
}

async fn delete_photo(state: &AppState, data: DeletePhotoRequest) -> Result<Json<DeletePhotoResponse>> {
    let key = photo_key(Path::new(&data.path)).unwrap_or(data.path);
    let removed = state.store.remove(&key, data.aspect.as_deref()).await?;
    if removed == 0 {
        return Err(Error::NotIndexed(key).into());
    }
    state.store.flush().await?;
    info!("已删除 {key} 的 {removed} 条记录");
    Ok(Json(DeletePhotoResponse { removed }))
}

use axum::body::Bytes;
use axum_typed_multipart::{FieldData, TryFromMultipart};
use serde::{Deserialize, Serialize};

use crate::store::SearchResult;

/// 以文字搜图的请求
#[derive(Debug, Deserialize)]
pub struct SearchTextRequest {
    pub query: String,
    /// 返回的结果数量，默认使用启动参数
    pub k: Option<usize>,
    /// 只搜索该方面，不填则搜索所有方面
    pub aspect: Option<String>,
}

/// 以图搜图的请求
#[derive(TryFromMultipart)]
pub struct SearchImageRequest {
    /// 上传的图片文件
    #[form_data(limit = "unlimited")]
    pub file: FieldData<Bytes>,
    pub k: Option<usize>,
    pub aspect: Option<String>,
}

/// 搜索响应
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    /// 搜索耗时，单位为毫秒
    pub time: u128,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    pub path: String,
}

/// 添加或更新一张服务器上的图片
#[derive(Debug, Deserialize)]
pub struct AddPhotoRequest {
    pub path: String,
    pub aspect: Option<String>,
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddPhotoResponse {
    pub path: String,
    pub aspect: String,
    /// 是否覆盖了已有记录
    pub updated: bool,
}

/// 删除图片记录，不填方面时删除所有方面
#[derive(Debug, Deserialize)]
pub struct DeletePhotoRequest {
    pub path: String,
    pub aspect: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletePhotoResponse {
    pub removed: usize,
}

use std::sync::Arc;

use crate::model::OllamaClient;
use crate::store::PhotoStore;

/// 应用状态
pub struct AppState {
    /// 向量数据库
    pub store: PhotoStore,
    /// 模型服务客户端
    pub model: OllamaClient,
    /// 默认返回的结果数量
    pub k: usize,
    /// 鉴权 token
    pub token: String,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(store: PhotoStore, model: OllamaClient, k: usize, token: String) -> Arc<Self> {
        Arc::new(AppState { store, model, k, token })
    }
}

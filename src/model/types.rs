use serde::{Deserialize, Serialize};

/// `/api/generate` 请求
#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    /// base64 编码的图片
    pub images: [&'a str; 1],
    pub stream: bool,
}

/// `/api/generate` 响应，仅保留需要的字段
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
}

/// `/api/embed` 请求
#[derive(Debug, Serialize)]
pub struct EmbedRequest<'a> {
    pub model: &'a str,
    pub input: &'a str,
}

/// `/api/embed` 响应
#[derive(Debug, Deserialize)]
pub struct EmbedResponse {
    pub embeddings: Vec<Vec<f32>>,
}

/// `/api/tags` 响应
#[derive(Debug, Deserialize)]
pub struct ListResponse {
    pub models: Vec<ModelInfo>,
}

/// 模型服务上的一个模型
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: String,
}

impl ModelInfo {
    /// 模型名称是否匹配，未写标签时视为 `latest`
    pub fn matches(&self, name: &str) -> bool {
        let normalize = |s: &str| {
            if s.contains(':') { s.to_owned() } else { format!("{s}:latest") }
        };
        normalize(&self.name) == normalize(name)
    }
}

/// 模型服务返回的错误
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

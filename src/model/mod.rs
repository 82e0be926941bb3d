mod ollama;
mod types;

use std::future::Future;

pub use ollama::OllamaClient;
pub use types::ModelInfo;

use crate::error::Result;
use crate::utils::EncodedImage;

/// 图片的描述和向量
#[derive(Debug, Clone)]
pub struct Analysis {
    pub description: String,
    pub embedding: Vec<f32>,
}

/// 模型服务客户端
pub trait ModelClient: Send + Sync {
    /// 使用提示词生成图片描述
    fn describe(
        &self,
        image: &EncodedImage,
        prompt: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// 生成文本向量
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send;

    /// 列出可用模型
    fn list_models(&self) -> impl Future<Output = Result<Vec<ModelInfo>>> + Send;

    /// 检查模型服务是否可用、所需模型是否存在
    fn check(&self) -> impl Future<Output = Result<()>> + Send;

    /// 生成图片描述，再对描述生成向量
    ///
    /// 图片和文字查询因此处于同一个向量空间
    fn analyze(
        &self,
        image: &EncodedImage,
        prompt: &str,
    ) -> impl Future<Output = Result<Analysis>> + Send {
        async move {
            let description = self.describe(image, prompt).await?;
            let embedding = self.embed(&description).await?;
            Ok(Analysis { description, embedding })
        }
    }
}

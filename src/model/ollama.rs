use std::time::Duration;

use log::debug;
use reqwest::{Client, Response};

use super::types::*;
use super::ModelClient;
use crate::config::ModelOptions;
use crate::error::{Error, Result};
use crate::utils::EncodedImage;

/// Ollama HTTP 客户端
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    host: String,
    model: String,
    embed_model: String,
}

impl OllamaClient {
    pub fn new(host: &str, model: &str, embed_model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_owned(),
            model: model.to_owned(),
            embed_model: embed_model.to_owned(),
        })
    }

    pub fn from_options(opts: &ModelOptions) -> Result<Self> {
        Self::new(&opts.host, &opts.model, opts.embed_model(), Duration::from_secs(opts.timeout))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    /// 将连接错误转换为 [`Error::ModelUnavailable`]
    fn send_error(&self, err: reqwest::Error) -> Error {
        if err.is_connect() || err.is_timeout() {
            Error::ModelUnavailable { host: self.host.clone(), source: err }
        } else {
            Error::Http(err)
        }
    }

    /// 检查响应状态码，404 且带有 model 字样视为模型不存在
    async fn check_status(&self, resp: Response, model: &str) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        if status == reqwest::StatusCode::NOT_FOUND && message.contains("model") {
            return Err(Error::ModelNotFound(model.to_owned()));
        }
        Err(Error::ModelServer { status: status.as_u16(), message })
    }
}

impl ModelClient for OllamaClient {
    async fn describe(&self, image: &EncodedImage, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            images: [image.base64.as_str()],
            stream: false,
        };
        let resp = self
            .client
            .post(self.url("/api/generate"))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let resp = self.check_status(resp, &self.model).await?;
        let body: GenerateResponse =
            resp.json().await.map_err(|e| Error::MalformedResponse(e.to_string()))?;

        let description = body.response.trim();
        if description.is_empty() {
            return Err(Error::MalformedResponse("模型返回了空描述".to_owned()));
        }
        debug!("生成描述 ({}x{}): {}", image.width, image.height, description);
        Ok(description.to_owned())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest { model: &self.embed_model, input: text };
        let resp = self
            .client
            .post(self.url("/api/embed"))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let resp = self.check_status(resp, &self.embed_model).await?;
        let body: EmbedResponse =
            resp.json().await.map_err(|e| Error::MalformedResponse(e.to_string()))?;

        let embedding = body
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::MalformedResponse("模型返回了空向量".to_owned()))?;
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(Error::MalformedResponse("向量中包含非有限值".to_owned()));
        }
        Ok(embedding)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let resp = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let resp = self.check_status(resp, &self.model).await?;
        let body: ListResponse =
            resp.json().await.map_err(|e| Error::MalformedResponse(e.to_string()))?;
        Ok(body.models)
    }

    async fn check(&self) -> Result<()> {
        let models = self.list_models().await?;
        for name in [&self.model, &self.embed_model] {
            if !models.iter().any(|m| m.matches(name)) {
                return Err(Error::ModelNotFound(name.clone()));
            }
        }
        Ok(())
    }
}

use clap::Parser;
use log::{info, warn};
use rand::distr::{Alphanumeric, SampleString};
use tokio::net::TcpListener;

use crate::cli::SubCommandExtend;
use crate::config::ModelOptions;
use crate::model::{ModelClient, OllamaClient};
use crate::store::{PhotoStore, VectorStore};
use crate::{Opts, server};

#[derive(Parser, Debug, Clone)]
pub struct ServerCommand {
    #[command(flatten)]
    pub model: ModelOptions,
    /// 默认返回的结果数量
    #[arg(short, value_name = "K", default_value_t = 5)]
    pub k: usize,
    /// 监听地址
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: String,
    /// 请求验证 token，不填则随机生成
    #[arg(long, default_value_t = String::new())]
    pub token: String,
}

impl SubCommandExtend for ServerCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let model = OllamaClient::from_options(&self.model)?;
        if let Err(e) = model.check().await {
            // 模型服务稍后可能恢复，搜索以外的接口仍然可用
            warn!("模型服务检查失败: {e}");
        }
        let store = PhotoStore::create(&opts.db_path).await?;

        let mut token = self.token.clone();
        if token.is_empty() {
            token = Alphanumeric.sample_string(&mut rand::rng(), 32);
            info!("鉴权 token: {token}");
        }

        // 创建应用状态
        let state = server::AppState::new(store, model, self.k, token);

        // 创建应用
        let app = server::create_app(state.clone());

        // 启动服务器
        info!("服务器启动：http://{}", &self.addr);
        let listener = TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

        info!("服务器已停止，正在保存索引");
        state.store.flush().await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("无法监听退出信号: {e}");
        std::future::pending::<()>().await;
    }
}

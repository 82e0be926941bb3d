use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::store::{PhotoStore, VectorStore};

#[derive(Parser, Debug, Clone)]
pub struct ClearCommand {}

impl SubCommandExtend for ClearCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let store = PhotoStore::open(&opts.db_path).await?;
        info!("正在清空数据库 {}", opts.db_path.path().display());
        store.clear().await?;
        store.close().await?;
        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {}

impl SubCommandExtend for DeleteCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        PhotoStore::destroy(&opts.db_path)?;
        Ok(())
    }
}

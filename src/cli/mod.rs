mod aspect;
mod examine;
mod index;
mod models;
mod photos;
mod search;
pub mod server;
mod store;

pub use aspect::*;
pub use examine::*;
pub use index::*;
pub use models::*;
pub use photos::*;
pub use search::*;
pub use server::*;
pub use store::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

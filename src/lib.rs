pub mod aspect;
pub mod cli;
pub mod config;
mod db;
pub mod error;
pub mod indexer;
pub mod model;
pub mod search;
pub mod server;
pub mod store;
pub mod utils;

pub use aspect::Aspect;
pub use config::Opts;
pub use error::{Error, Result};
pub use model::{ModelClient, OllamaClient};
pub use store::{MemoryStore, PhotoStore, VectorStore};

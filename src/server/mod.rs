mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;

pub use self::error::AppError;
pub use self::state::*;
pub use self::types::*;

/// 请求体大小上限：10M
pub const BODY_LIMIT: usize = 1024 * 1024 * 10;

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/search/text", post(api::search_text_handler))
        .route("/search/image", post(api::search_image_handler))
        .route(
            "/photos",
            get(api::list_photos_handler)
                .post(api::add_photo_handler)
                .delete(api::delete_photo_handler),
        )
        .route("/photos/records", get(api::photo_records_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .with_state(state)
}

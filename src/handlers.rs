pub mod inventory;

use axum::{routing::get, Router};

use crate::config::AppState;

/// Rotas da API (sem o Swagger, que o `main` acrescenta).
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route(
            "/api/records",
            get(inventory::records_get)
                .post(inventory::records_post)
                .delete(inventory::records_delete),
        )
        .with_state(app_state)
}

use axum::{response::IntoResponse, Json};
use serde_json::json;

use crate::models::catalog::{chapters, DIFFICULTY_BANDS};

#[axum::debug_handler]
pub async fn get_catalog() -> impl IntoResponse {
    let bands: Vec<_> = DIFFICULTY_BANDS
        .iter()
        .map(|b| {
            json!({
                "id": b.id,
                "label": b.label,
                "display_name": b.display_name(),
            })
        })
        .collect();
    Json(json!({
        "chapters": chapters(),
        "bands": bands,
    }))
}

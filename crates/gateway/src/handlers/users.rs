//! Read-only account listing

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::AppState;
use bibstore_common::{
    auth::AuthContext,
    db::{models::User, resource::API_PREFIX},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

fn render(user: &User) -> Result<Value> {
    let mut value = serde_json::to_value(user)?;
    if let Value::Object(map) = &mut value {
        map.insert(
            "url".to_string(),
            Value::String(format!("{}/user/{}", API_PREFIX, user.id)),
        );
    }
    Ok(value)
}

pub async fn list_users(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>> {
    let server = &state.config.server;
    let limit = params.limit.unwrap_or(server.page_size).min(server.max_page_size);
    let page = state
        .repo
        .list_users(params.offset.unwrap_or(0), limit)
        .await?;

    let results = page.results.iter().map(render).collect::<Result<Vec<_>>>()?;
    Ok(Json(json!({ "count": page.count, "results": results })))
}

pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(id): Path<i32>,
) -> Result<Json<Value>> {
    let user = state
        .repo
        .find_user_by_id(id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| AppError::not_found("User", id))?;

    Ok(Json(render(&user)?))
}

//! Generic table handlers
//!
//! Every table gets the same six endpoints under `/v2/{path}`; per-table
//! behaviour (filters, ownership, immutability, validation) lives in the
//! table's `Resource` implementation.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use validator::Validate;

use super::validate_request;
use crate::AppState;
use bibstore_common::{
    auth::AuthContext,
    config::ServerConfig,
    db::{
        resource::{int_field, row_url},
        BulkOutcome, ListQuery,
    },
    errors::{AppError, Result},
    Resource,
};

/// Body of a bulk create
#[derive(Debug, Deserialize, Validate)]
pub struct BulkRequest {
    /// Rows keyed by a client temporary `id`
    #[validate(length(min = 1, max = 10000))]
    pub data: Vec<Value>,
}

/// Routes for one table
pub fn routes<R: Resource>() -> Router<AppState> {
    let collection = format!("/{}", R::PATH);
    let bulk = format!("/{}/bulk", R::PATH);
    let item = format!("/{}/{{id}}", R::PATH);

    Router::new()
        .route(&collection, get(list::<R>).post(create::<R>))
        .route(&bulk, post(bulk_create::<R>))
        .route(&item, get(retrieve::<R>).put(update::<R>).delete(destroy::<R>))
}

/// Serialize a row with its own url and navigation links
pub fn render<R: Resource>(model: &R::Model) -> Result<Value> {
    let mut value = serde_json::to_value(model)?;
    if let Value::Object(map) = &mut value {
        if let Some(id) = int_field(map, "id") {
            map.insert("url".to_string(), Value::String(row_url::<R>(id)));
            for (name, url) in R::links(id) {
                map.insert(name.to_string(), Value::String(url));
            }
        }
    }
    Ok(value)
}

fn take_number(params: &mut HashMap<String, String>, name: &str) -> Result<Option<u64>> {
    params
        .remove(name)
        .map(|raw| {
            raw.trim().parse::<u64>().map_err(|_| AppError::InvalidFilter {
                param: name.to_string(),
                value: raw,
            })
        })
        .transpose()
}

/// Split pagination off the query string; the rest are filters
fn list_query(server: &ServerConfig, mut params: HashMap<String, String>) -> Result<ListQuery> {
    let limit = take_number(&mut params, "limit")?
        .unwrap_or(server.page_size)
        .min(server.max_page_size);
    let offset = take_number(&mut params, "offset")?.unwrap_or(0);

    Ok(ListQuery {
        filters: params,
        limit,
        offset,
    })
}

pub async fn list<R: Resource>(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>> {
    let query = list_query(&state.config.server, params)?;
    let page = state.repo.list::<R>(auth.user_id, &query).await?;

    let results = page
        .results
        .iter()
        .map(render::<R>)
        .collect::<Result<Vec<_>>>()?;
    Ok(Json(json!({ "count": page.count, "results": results })))
}

pub async fn retrieve<R: Resource>(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> Result<Json<Value>> {
    let model = state.repo.get::<R>(auth.user_id, id).await?;
    Ok(Json(render::<R>(&model)?))
}

pub async fn create<R: Resource>(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>)> {
    let model = state.repo.create::<R>(auth.user_id, body).await?;
    let rendered = render::<R>(&model)?;

    tracing::info!(
        model = R::NAME,
        user_id = auth.user_id,
        request_id = %auth.request_id,
        "Created row"
    );
    Ok((StatusCode::CREATED, Json(rendered)))
}

/// Partial update: fields absent from the body keep their value
pub async fn update<R: Resource>(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>> {
    let model = state.repo.update::<R>(auth.user_id, id, patch).await?;
    Ok(Json(render::<R>(&model)?))
}

pub async fn destroy<R: Resource>(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    state.repo.delete::<R>(auth.user_id, id).await?;
    tracing::info!(model = R::NAME, id, user_id = auth.user_id, "Deleted row");
    Ok(StatusCode::NO_CONTENT)
}

/// Create many rows; answers with the temporary id to real id mapping
pub async fn bulk_create<R: Resource>(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<BulkRequest>,
) -> Result<(StatusCode, Json<BulkOutcome>)> {
    validate_request(&request)?;

    let outcome = state.repo.bulk_create::<R>(auth.user_id, request.data).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bibstore_common::db::resource::PaperInstances;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_list_query_splits_pagination() {
        let server = ServerConfig::default();
        let query = list_query(&server, params(&[("limit", "5"), ("offset", "10"), ("title", "net")])).unwrap();
        assert_eq!(query.limit, 5);
        assert_eq!(query.offset, 10);
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.filters["title"], "net");
    }

    #[test]
    fn test_list_query_caps_limit() {
        let server = ServerConfig::default();
        let query = list_query(&server, params(&[("limit", "1000000")])).unwrap();
        assert_eq!(query.limit, server.max_page_size);

        let query = list_query(&server, HashMap::new()).unwrap();
        assert_eq!(query.limit, server.page_size);
    }

    #[test]
    fn test_bad_limit_is_rejected() {
        let server = ServerConfig::default();
        let err = list_query(&server, params(&[("limit", "ten")])).unwrap_err();
        assert!(matches!(err, AppError::InvalidFilter { .. }));
    }

    #[test]
    fn test_render_adds_url_and_links() {
        let row: bibstore_common::db::models::PaperInstance = serde_json::from_value(json!({
            "id": 7,
            "corpus_id": 1,
            "created_by_id": 1,
            "date_created": "2024-01-01T00:00:00Z",
            "title": "Rendered"
        }))
        .unwrap();

        let value = render::<PaperInstances>(&row).unwrap();
        assert_eq!(value["url"], "/v2/paper_instance/7");
        assert_eq!(value["citations"], "/v2/paper_instance?cited_by=7&concrete=false");
        assert_eq!(value["concrete"], true);
    }
}

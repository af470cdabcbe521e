//! Re-import detection by paper checksum

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use super::validate_request;
use crate::AppState;
use bibstore_common::{auth::AuthContext, errors::Result};

#[derive(Debug, Deserialize, Validate)]
pub struct ChecksumQuery {
    #[validate(length(min = 1, max = 128))]
    pub checksum: String,
    pub corpus: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChecksumBatch {
    pub corpus: i32,
    #[validate(length(min = 1, max = 10000))]
    pub checksums: Vec<String>,
}

/// `{"exists": bool}` for one checksum in one corpus
pub async fn checksum_exists(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ChecksumQuery>,
) -> Result<Json<Value>> {
    validate_request(&query)?;

    let exists = state
        .repo
        .checksum_exists(auth.user_id, query.corpus, &query.checksum)
        .await?;
    Ok(Json(json!({ "exists": exists })))
}

/// `{"results": {checksum: bool}}` for a list of checksums
pub async fn checksums_present(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(batch): Json<ChecksumBatch>,
) -> Result<Json<Value>> {
    validate_request(&batch)?;

    let results = state
        .repo
        .checksums_present(auth.user_id, batch.corpus, &batch.checksums)
        .await?;
    Ok(Json(json!({ "results": results })))
}

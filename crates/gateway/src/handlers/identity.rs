//! Identity resolution and disambiguation runs
//!
//! Storage keeps every assertion; a policy is only applied when a caller
//! asks which canonical entity an instance resolves to.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use validator::Validate;

use super::{resources::render, validate_request};
use crate::AppState;
use bibstore_common::{
    auth::AuthContext,
    db::resource::{
        Affiliations, AuthorIdentities, DisambiguationModels, InstitutionIdentities,
        PaperIdentities,
    },
    errors::{AppError, Result},
    identity::{model_recency, resolve, IdentityAssertion, IdentityKind, NewAssertion, ResolutionPolicy},
    metrics, Repository, Resource,
};

#[derive(Debug, Default, Deserialize)]
pub struct ResolveParams {
    #[serde(default)]
    pub policy: ResolutionPolicy,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DisambiguationRequest {
    #[validate(length(min = 1, max = 255))]
    pub label: String,
    #[serde(default)]
    pub methods: String,
    pub kind: IdentityKind,
    #[validate(length(min = 1, max = 10000))]
    pub assertions: Vec<NewAssertion>,
}

/// The assertion about `instance_id` that wins under `policy`
async fn pick<R>(
    repo: &Repository,
    instance_column: &str,
    instance_id: i32,
    policy: ResolutionPolicy,
    recency: &HashMap<i32, usize>,
) -> Result<Option<Value>>
where
    R: Resource,
    R::Model: IdentityAssertion,
{
    let assertions = repo.assertions_for::<R>(instance_column, instance_id).await?;
    resolve(&assertions, policy, recency)
        .get(&instance_id)
        .map(|winner| render::<R>(*winner))
        .transpose()
}

/// `GET /v2/resolve/{kind}/{instance_id}?policy=`
pub async fn resolve_identity(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path((kind, instance_id)): Path<(IdentityKind, i32)>,
    Query(params): Query<ResolveParams>,
) -> Result<Json<Value>> {
    let models = state.repo.disambiguation_models().await?;
    let recency = model_recency(&models);
    let policy = params.policy;
    let repo = &state.repo;

    let identity = match kind {
        IdentityKind::Author => {
            pick::<AuthorIdentities>(repo, "instance_id", instance_id, policy, &recency).await?
        }
        IdentityKind::Institution => {
            pick::<InstitutionIdentities>(repo, "instance_id", instance_id, policy, &recency).await?
        }
        IdentityKind::Paper => {
            pick::<PaperIdentities>(repo, "instance_id", instance_id, policy, &recency).await?
        }
        IdentityKind::Affiliation => {
            pick::<Affiliations>(repo, "author_id", instance_id, policy, &recency).await?
        }
    }
    .ok_or_else(|| AppError::not_found(kind.name(), instance_id))?;

    Ok(Json(json!({
        "kind": kind,
        "instance_id": instance_id,
        "policy": policy,
        "identity": identity,
    })))
}

/// `POST /v2/disambiguation`: a new model plus its assertions
pub async fn record_disambiguation(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<DisambiguationRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    validate_request(&request)?;

    let (model, ids) = state
        .repo
        .record_disambiguation(
            auth.user_id,
            &request.label,
            &request.methods,
            request.kind,
            request.assertions,
        )
        .await?;
    metrics::record_assertions(request.kind.name(), ids.len());

    tracing::info!(
        model_id = model.id,
        kind = request.kind.name(),
        assertions = ids.len(),
        "Recorded disambiguation"
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "model": render::<DisambiguationModels>(&model)?,
            "ids": ids,
        })),
    ))
}

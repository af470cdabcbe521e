//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support. Table-specific
//! behaviour comes from the [`Resource`] description of each table.

use crate::db::ids::first_free;
use crate::db::models::*;
use crate::db::resource::{
    column, Affiliations, AuthorIdentities, DisambiguationModels, InstanceTable,
    InstitutionIdentities, PaperIdentities, Resource,
};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::identity::{IdentityKind, NewAssertion};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, IdenStatic,
    IntoActiveModel, Iterable, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, Value as DbValue,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use tracing::{debug, info};

/// Keep a single INSERT below the bind-parameter limits of SQLite and PostgreSQL
const MAX_BIND_PARAMETERS: usize = 30_000;

/// Fields the server fills in and clients cannot overwrite
const SERVER_FIELDS: [&str; 3] = ["id", "created_by_id", "date_created"];

/// Filters and window for a list call
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub filters: HashMap<String, String>,
    pub limit: u64,
    pub offset: u64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filters: HashMap::new(),
            limit: 100,
            offset: 0,
        }
    }
}

/// One page of rows plus the total number of matches
#[derive(Debug, Clone, Serialize)]
pub struct Page<M> {
    pub count: u64,
    pub results: Vec<M>,
}

/// Result of a bulk create
#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    /// Client temporary id -> assigned id
    pub id_map: BTreeMap<String, i32>,
    #[serde(skip)]
    pub created: u64,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Generic table operations
    // ========================================================================

    /// Largest primary key currently stored in `R`
    pub async fn max_id<R: Resource>(&self) -> Result<Option<i32>> {
        max_id_on::<R, _>(self.write_conn()).await
    }

    /// List rows visible to `owner` matching the declared filters
    pub async fn list<R: Resource>(&self, owner: i32, query: &ListQuery) -> Result<Page<R::Model>> {
        let mut select = R::Entity::find();
        if R::OWNED {
            select = select.filter(column::<R>("created_by_id")?.eq(owner));
        }
        for declared in R::FILTERS {
            if let Some(raw) = query.filters.get(declared.param) {
                let condition =
                    declared
                        .kind
                        .condition(column::<R>(declared.column)?, declared.param, raw)?;
                select = select.filter(condition);
            }
        }

        let count = select.clone().count(self.read_conn()).await?;
        let results = select
            .order_by_asc(column::<R>("id")?)
            .offset(query.offset)
            .limit(query.limit)
            .all(self.read_conn())
            .await?;

        Ok(Page { count, results })
    }

    /// Fetch one row; rows owned by someone else are reported as missing
    pub async fn get<R: Resource>(&self, owner: i32, id: i32) -> Result<R::Model> {
        find_owned::<R, _>(self.read_conn(), owner, id).await
    }

    /// Create one row with the next free id
    pub async fn create<R: Resource>(&self, owner: i32, body: Value) -> Result<R::Model> {
        let row = into_object::<R>(body)?;
        let now = timestamp()?;

        let txn = self.write_conn().begin().await?;
        let id = first_free(max_id_on::<R, _>(&txn).await?);
        let model = prepare::<R>(row, id, owner, &now)?;

        check_corpus_scope::<R, _>(&txn, owner, [&model]).await?;
        if let Some(reference) = R::SELF_REFERENCE {
            let links = HashMap::from([(id, link_of::<R>(&model, reference)?)]);
            check_self_reference::<R, _>(&txn, reference, &links, id).await?;
        }

        insert_models::<R, _>(&txn, vec![model.clone()]).await?;
        txn.commit().await?;

        debug!(model = R::NAME, id, "Created row");
        Ok(model)
    }

    /// Merge `patch` into an existing row and store the changed columns
    pub async fn update<R: Resource>(&self, owner: i32, id: i32, patch: Value) -> Result<R::Model> {
        if R::IMMUTABLE {
            return Err(AppError::Immutable {
                resource_type: R::NAME.to_string(),
            });
        }

        let mut patch = into_object::<R>(patch)?;
        for field in SERVER_FIELDS {
            patch.remove(field);
        }

        let txn = self.write_conn().begin().await?;
        let existing = find_owned::<R, _>(&txn, owner, id).await?;
        if patch.is_empty() {
            return Ok(existing);
        }

        let mut merged = match serde_json::to_value(&existing)? {
            Value::Object(map) => map,
            _ => {
                return Err(AppError::Internal {
                    message: format!("{} did not serialize to an object", R::NAME),
                })
            }
        };
        merged.extend(patch);
        R::validate(&mut merged)?;
        let updated = decode::<R>(merged)?;

        let mut active = existing.clone().into_active_model();
        let mut changed = false;
        for col in R::Column::iter() {
            let value = updated.get(col);
            if value == existing.get(col) {
                continue;
            }
            if R::FROZEN.iter().any(|name| *name == col.as_str()) {
                return Err(AppError::invalid_field(col.as_str(), "cannot be changed"));
            }
            active.set(col, value);
            changed = true;
        }
        if !changed {
            return Ok(existing);
        }

        check_corpus_scope::<R, _>(&txn, owner, [&updated]).await?;
        if let Some(reference) = R::SELF_REFERENCE {
            let links = HashMap::from([(id, link_of::<R>(&updated, reference)?)]);
            check_self_reference::<R, _>(&txn, reference, &links, id).await?;
        }

        let saved = active.update(&txn).await?;
        txn.commit().await?;

        debug!(model = R::NAME, id, "Updated row");
        Ok(saved)
    }

    /// Delete one row (dependent instance rows cascade)
    pub async fn delete<R: Resource>(&self, owner: i32, id: i32) -> Result<()> {
        if R::IMMUTABLE {
            return Err(AppError::Immutable {
                resource_type: R::NAME.to_string(),
            });
        }

        find_owned::<R, _>(self.write_conn(), owner, id).await?;
        R::Entity::delete_many()
            .filter(column::<R>("id")?.eq(id))
            .exec(self.write_conn())
            .await?;

        debug!(model = R::NAME, id, "Deleted row");
        Ok(())
    }

    /// Create many rows at once
    ///
    /// Every row gets its id before any reference is rewritten, so a
    /// self-reference may point at a row later in the same payload. Rows
    /// carrying an `id` field are recorded in the returned `id_map` under that
    /// temporary id.
    pub async fn bulk_create<R: Resource>(&self, owner: i32, rows: Vec<Value>) -> Result<BulkOutcome> {
        let now = timestamp()?;
        let txn = self.write_conn().begin().await?;
        let mut next = first_free(max_id_on::<R, _>(&txn).await?);

        let mut pending = Vec::with_capacity(rows.len());
        let mut id_map = BTreeMap::new();
        for value in rows {
            let row = into_object::<R>(value)?;
            let id = next;
            next += 1;
            if let Some(temp) = row.get("id").and_then(temporary_key) {
                if id_map.insert(temp.clone(), id).is_some() {
                    return Err(AppError::DuplicateTemporaryId { temp_id: temp });
                }
            }
            pending.push((id, row));
        }

        let mut models = Vec::with_capacity(pending.len());
        let mut links = HashMap::new();
        for (id, mut row) in pending {
            if let Some(reference) = R::SELF_REFERENCE {
                let resolved = row.get(reference).filter(|v| !v.is_null()).map(|value| {
                    temporary_key(value)
                        .and_then(|key| id_map.get(&key).copied())
                        .map(Value::from)
                        .unwrap_or_else(|| value.clone())
                });
                if let Some(value) = resolved {
                    row.insert(reference.to_string(), value);
                }
            }

            let model = prepare::<R>(row, id, owner, &now)?;
            if let Some(reference) = R::SELF_REFERENCE {
                links.insert(id, link_of::<R>(&model, reference)?);
            }
            models.push(model);
        }

        check_corpus_scope::<R, _>(&txn, owner, models.iter()).await?;
        if let Some(reference) = R::SELF_REFERENCE {
            let mut ids: Vec<i32> = links.keys().copied().collect();
            ids.sort_unstable();
            for id in ids {
                check_self_reference::<R, _>(&txn, reference, &links, id).await?;
            }
            // Parents go first so the self-referencing foreign key holds per chunk
            let depth = |id: i32| chain_depth(&links, id);
            let id_col = column::<R>("id")?;
            models.sort_by_key(|model| match model.get(id_col) {
                DbValue::Int(Some(id)) => depth(id),
                _ => 0,
            });
        }

        let created = insert_models::<R, _>(&txn, models).await?;
        txn.commit().await?;

        info!(model = R::NAME, created, "Bulk created rows");
        Ok(BulkOutcome { id_map, created })
    }

    /// Append pre-built rows whose ids were allocated by the caller
    pub async fn insert_rows<R: Resource>(&self, rows: Vec<R::Model>) -> Result<u64> {
        insert_models::<R, _>(self.write_conn(), rows).await
    }

    // ========================================================================
    // Paper instance checksums
    // ========================================================================

    /// Whether `owner` already stored a paper with this checksum in `corpus`
    pub async fn checksum_exists(&self, owner: i32, corpus: i32, checksum: &str) -> Result<bool> {
        let found = PaperInstanceEntity::find()
            .filter(PaperInstanceColumn::CreatedById.eq(owner))
            .filter(PaperInstanceColumn::CorpusId.eq(corpus))
            .filter(PaperInstanceColumn::Checksum.eq(checksum))
            .count(self.read_conn())
            .await?;
        Ok(found > 0)
    }

    /// Which of `checksums` are already present in `corpus`
    pub async fn checksums_present(
        &self,
        owner: i32,
        corpus: i32,
        checksums: &[String],
    ) -> Result<BTreeMap<String, bool>> {
        let mut present: BTreeMap<String, bool> =
            checksums.iter().map(|c| (c.clone(), false)).collect();
        if checksums.is_empty() {
            return Ok(present);
        }

        let found: Vec<Option<String>> = PaperInstanceEntity::find()
            .select_only()
            .column(PaperInstanceColumn::Checksum)
            .filter(PaperInstanceColumn::CreatedById.eq(owner))
            .filter(PaperInstanceColumn::CorpusId.eq(corpus))
            .filter(PaperInstanceColumn::Checksum.is_in(checksums.iter().cloned()))
            .into_tuple()
            .all(self.read_conn())
            .await?;

        for checksum in found.into_iter().flatten() {
            present.insert(checksum, true);
        }
        Ok(present)
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    pub async fn find_user_by_id(&self, id: i32) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Username.eq(username))
            .filter(UserColumn::IsActive.eq(true))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn list_users(&self, offset: u64, limit: u64) -> Result<Page<User>> {
        let select = UserEntity::find().filter(UserColumn::IsActive.eq(true));
        let count = select.clone().count(self.read_conn()).await?;
        let results = select
            .order_by_asc(UserColumn::Id)
            .offset(offset)
            .limit(limit)
            .all(self.read_conn())
            .await?;
        Ok(Page { count, results })
    }

    /// Create an account; `password_hash` must already be hashed
    pub async fn create_user(&self, username: &str, email: &str, password_hash: String) -> Result<User> {
        let txn = self.write_conn().begin().await?;

        let taken = UserEntity::find()
            .filter(UserColumn::Username.eq(username))
            .count(&txn)
            .await?;
        if taken > 0 {
            return Err(AppError::Duplicate {
                message: format!("username {} is taken", username),
            });
        }

        let max: Option<Option<i32>> = UserEntity::find()
            .select_only()
            .column_as(UserColumn::Id.max(), "max_id")
            .into_tuple()
            .one(&txn)
            .await?;
        let user = User {
            id: first_free(max.flatten()),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            is_active: true,
            date_joined: Utc::now(),
        };

        UserEntity::insert(user.clone().into_active_model())
            .exec_without_returning(&txn)
            .await?;
        txn.commit().await?;

        info!(user_id = user.id, username = %user.username, "Created user");
        Ok(user)
    }

    // ========================================================================
    // Identity Operations
    // ========================================================================

    /// All assertions in `R` about one instance, oldest first
    pub async fn assertions_for<R: Resource>(
        &self,
        instance_column: &str,
        instance_id: i32,
    ) -> Result<Vec<R::Model>> {
        R::Entity::find()
            .filter(column::<R>(instance_column)?.eq(instance_id))
            .order_by_asc(column::<R>("id")?)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn disambiguation_models(&self) -> Result<Vec<DisambiguationModel>> {
        DisambiguationModelEntity::find()
            .order_by_asc(DisambiguationModelColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Store one disambiguation run: a new model plus its assertions
    ///
    /// Earlier runs are never touched.
    pub async fn record_disambiguation(
        &self,
        owner: i32,
        label: &str,
        methods: &str,
        kind: IdentityKind,
        assertions: Vec<NewAssertion>,
    ) -> Result<(DisambiguationModel, Vec<i32>)> {
        let txn = self.write_conn().begin().await?;

        let model = DisambiguationModel {
            id: first_free(max_id_on::<DisambiguationModels, _>(&txn).await?),
            label: label.to_string(),
            methods: methods.to_string(),
            date_created: Utc::now(),
            created_by_id: owner,
        };
        DisambiguationModelEntity::insert(model.clone().into_active_model())
            .exec_without_returning(&txn)
            .await?;

        let ids = match kind {
            IdentityKind::Author => {
                append_assertions::<AuthorIdentities, _, _>(&txn, &assertions, |id, a| {
                    AuthorIdentity {
                        id,
                        model_id: model.id,
                        confidence: a.confidence.value(),
                        methods: a.methods.clone(),
                        author_id: a.entity_id,
                        instance_id: a.instance_id,
                    }
                })
                .await?
            }
            IdentityKind::Institution => {
                append_assertions::<InstitutionIdentities, _, _>(&txn, &assertions, |id, a| {
                    InstitutionIdentity {
                        id,
                        model_id: model.id,
                        confidence: a.confidence.value(),
                        methods: a.methods.clone(),
                        institution_id: a.entity_id,
                        instance_id: a.instance_id,
                    }
                })
                .await?
            }
            IdentityKind::Paper => {
                append_assertions::<PaperIdentities, _, _>(&txn, &assertions, |id, a| {
                    PaperIdentity {
                        id,
                        model_id: model.id,
                        confidence: a.confidence.value(),
                        methods: a.methods.clone(),
                        paper_id: a.entity_id,
                        instance_id: a.instance_id,
                    }
                })
                .await?
            }
            IdentityKind::Affiliation => {
                append_assertions::<Affiliations, _, _>(&txn, &assertions, |id, a| {
                    Affiliation {
                        id,
                        model_id: model.id,
                        confidence: a.confidence.value(),
                        methods: a.methods.clone(),
                        author_id: a.instance_id,
                        institution_id: a.entity_id,
                        start_date: None,
                        end_date: None,
                        occur_date: None,
                    }
                })
                .await?
            }
        };

        txn.commit().await?;

        info!(
            model_id = model.id,
            kind = kind.name(),
            assertions = ids.len(),
            "Recorded disambiguation run"
        );
        Ok((model, ids))
    }
}

// ============================================================================
// Helpers shared by the operations above
// ============================================================================

async fn max_id_on<R: Resource, C: ConnectionTrait>(conn: &C) -> Result<Option<i32>> {
    let max: Option<Option<i32>> = R::Entity::find()
        .select_only()
        .column_as(column::<R>("id")?.max(), "max_id")
        .into_tuple()
        .one(conn)
        .await?;
    Ok(max.flatten())
}

async fn find_owned<R: Resource, C: ConnectionTrait>(conn: &C, owner: i32, id: i32) -> Result<R::Model> {
    let mut select = R::Entity::find().filter(column::<R>("id")?.eq(id));
    if R::OWNED {
        select = select.filter(column::<R>("created_by_id")?.eq(owner));
    }
    select
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found(R::NAME, id))
}

async fn insert_models<R: Resource, C: ConnectionTrait>(conn: &C, models: Vec<R::Model>) -> Result<u64> {
    let per_row = R::Column::iter().count().max(1);
    let chunk_size = (MAX_BIND_PARAMETERS / per_row).max(1);

    let mut inserted = 0;
    let mut models = models.into_iter().peekable();
    while models.peek().is_some() {
        let chunk: Vec<R::ActiveModel> = models
            .by_ref()
            .take(chunk_size)
            .map(|model| model.into_active_model())
            .collect();
        let rows = chunk.len() as u64;
        R::Entity::insert_many(chunk).exec_without_returning(conn).await?;
        inserted += rows;
    }
    Ok(inserted)
}

async fn append_assertions<R, C, F>(conn: &C, assertions: &[NewAssertion], build: F) -> Result<Vec<i32>>
where
    R: Resource,
    C: ConnectionTrait,
    F: Fn(i32, &NewAssertion) -> R::Model,
{
    let mut next = first_free(max_id_on::<R, _>(conn).await?);
    let mut ids = Vec::with_capacity(assertions.len());
    let mut rows = Vec::with_capacity(assertions.len());
    for assertion in assertions {
        ids.push(next);
        rows.push(build(next, assertion));
        next += 1;
    }
    insert_models::<R, _>(conn, rows).await?;
    Ok(ids)
}

/// Rows that name a corpus must name one the caller owns
///
/// Every instance row they point at through [`Resource::CORPUS_LINKS`] must
/// also be the caller's and live in that same corpus.
async fn check_corpus_scope<'m, R, C>(
    conn: &C,
    owner: i32,
    models: impl IntoIterator<Item = &'m R::Model>,
) -> Result<()>
where
    R: Resource,
    C: ConnectionTrait,
{
    let Ok(corpus_col) = R::Column::from_str("corpus_id") else {
        return Ok(());
    };
    let int = |model: &R::Model, col: R::Column| match model.get(col) {
        DbValue::Int(value) => value,
        _ => None,
    };

    let mut corpora = HashSet::new();
    let mut links = Vec::new();
    for model in models {
        let corpus = int(model, corpus_col);
        corpora.extend(corpus);
        for link in R::CORPUS_LINKS {
            if let Some(target) = int(model, column::<R>(link.column)?) {
                links.push((link, target, corpus));
            }
        }
    }

    for corpus in corpora {
        let owned = CorpusEntity::find()
            .filter(CorpusColumn::Id.eq(corpus))
            .filter(CorpusColumn::CreatedById.eq(owner))
            .count(conn)
            .await?;
        if owned == 0 {
            return Err(AppError::invalid_field(
                "corpus_id",
                format!("corpus {} does not exist", corpus),
            ));
        }
    }

    let mut seen: HashMap<(InstanceTable, i32), Option<i32>> = HashMap::new();
    for (link, target, corpus) in links {
        let target_corpus = match seen.get(&(link.target, target)) {
            Some(found) => *found,
            None => {
                let found = instance_corpus(conn, owner, link.target, target).await?;
                seen.insert((link.target, target), found);
                found
            }
        };
        match target_corpus {
            None => {
                return Err(AppError::invalid_field(
                    link.column,
                    format!("{} {} does not exist", link.target.name(), target),
                ))
            }
            Some(found) if Some(found) != corpus => {
                return Err(AppError::invalid_field(
                    link.column,
                    "must point at a row in the same corpus",
                ))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Corpus of one of the caller's instance rows
async fn instance_corpus<C: ConnectionTrait>(
    conn: &C,
    owner: i32,
    table: InstanceTable,
    id: i32,
) -> Result<Option<i32>> {
    let found = match table {
        InstanceTable::Paper => {
            PaperInstanceEntity::find()
                .select_only()
                .column(PaperInstanceColumn::CorpusId)
                .filter(PaperInstanceColumn::Id.eq(id))
                .filter(PaperInstanceColumn::CreatedById.eq(owner))
                .into_tuple::<i32>()
                .one(conn)
                .await?
        }
        InstanceTable::Author => {
            AuthorInstanceEntity::find()
                .select_only()
                .column(AuthorInstanceColumn::CorpusId)
                .filter(AuthorInstanceColumn::Id.eq(id))
                .filter(AuthorInstanceColumn::CreatedById.eq(owner))
                .into_tuple::<i32>()
                .one(conn)
                .await?
        }
        InstanceTable::Institution => {
            InstitutionInstanceEntity::find()
                .select_only()
                .column(InstitutionInstanceColumn::CorpusId)
                .filter(InstitutionInstanceColumn::Id.eq(id))
                .filter(InstitutionInstanceColumn::CreatedById.eq(owner))
                .into_tuple::<i32>()
                .one(conn)
                .await?
        }
    };
    Ok(found)
}

/// (corpus, parent) of a row for citation-chain checks
type Link = (Option<i32>, Option<i32>);

fn link_of<R: Resource>(model: &R::Model, reference: &str) -> Result<Link> {
    let int = |name: &str| -> Result<Option<i32>> {
        Ok(match model.get(column::<R>(name)?) {
            DbValue::Int(value) => value,
            _ => None,
        })
    };
    Ok((int("corpus_id")?, int(reference)?))
}

/// Follow `reference` upward from `id` through pending rows and the store
///
/// The direct target must share the row's corpus and the chain must never
/// come back to a row already visited.
async fn check_self_reference<R: Resource, C: ConnectionTrait>(
    conn: &C,
    reference: &str,
    pending: &HashMap<i32, Link>,
    id: i32,
) -> Result<()> {
    let Some(&(corpus, parent)) = pending.get(&id) else {
        return Ok(());
    };

    let mut seen = HashSet::from([id]);
    let mut cursor = parent;
    let mut direct = true;
    while let Some(target) = cursor {
        if !seen.insert(target) {
            return Err(AppError::invalid_field(
                reference,
                format!("{} {} is part of a reference cycle", R::NAME, id),
            ));
        }

        let (target_corpus, next) = match pending.get(&target) {
            Some(link) => *link,
            None => {
                let row = R::Entity::find()
                    .filter(column::<R>("id")?.eq(target))
                    .one(conn)
                    .await?
                    .ok_or_else(|| {
                        AppError::invalid_field(reference, format!("{} {} does not exist", R::NAME, target))
                    })?;
                link_of::<R>(&row, reference)?
            }
        };

        if direct && target_corpus != corpus {
            return Err(AppError::invalid_field(
                reference,
                "must point at a row in the same corpus",
            ));
        }
        direct = false;
        cursor = next;
    }
    Ok(())
}

/// Number of pending ancestors above `id`; chains were checked for cycles
fn chain_depth(links: &HashMap<i32, Link>, id: i32) -> usize {
    let mut depth = 0;
    let mut cursor = links.get(&id).and_then(|link| link.1);
    while let Some(parent) = cursor {
        match links.get(&parent) {
            Some(link) if depth < links.len() => {
                depth += 1;
                cursor = link.1;
            }
            _ => break,
        }
    }
    depth
}

fn into_object<R: Resource>(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(AppError::InvalidFormat {
            message: format!("{} must be a JSON object, got {}", R::NAME, other),
        }),
    }
}

fn timestamp() -> Result<Value> {
    serde_json::to_value(Utc::now()).map_err(Into::into)
}

/// Fill in server-owned fields and decode the row
fn prepare<R: Resource>(mut row: Map<String, Value>, id: i32, owner: i32, now: &Value) -> Result<R::Model> {
    R::validate(&mut row)?;
    row.insert("id".to_string(), Value::from(id));
    if R::OWNED {
        row.insert("created_by_id".to_string(), Value::from(owner));
    }
    if R::TIMESTAMPED {
        row.insert("date_created".to_string(), now.clone());
    }
    decode::<R>(row)
}

fn decode<R: Resource>(row: Map<String, Value>) -> Result<R::Model> {
    serde_json::from_value(Value::Object(row)).map_err(|e| AppError::InvalidFormat {
        message: format!("{}: {}", R::NAME, e),
    })
}

fn temporary_key(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

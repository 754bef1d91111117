use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, histogram};
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, Condition, DatabaseConnection, DbErr, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::product::{
    ActiveModel as ProductActiveModel, Column, Entity as Product, Model as ProductModel,
    ProductFields, ProductPatch,
};
use crate::errors::ServiceError;
use crate::repositories::Repository;
use crate::search::{TextQuery, PRODUCT_TEXT_INDEX};

use super::BaseRepository;

/// A page of results together with the size of the whole result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// A text search hit: the product plus its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ScoredProduct {
    #[serde(flatten)]
    pub product: ProductModel,
    /// Relevance score, higher is better
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSortKey {
    #[default]
    UpdatedAt,
    CreatedAt,
    Title,
    UnitPrice,
}

impl ProductSortKey {
    fn column(self) -> Column {
        match self {
            Self::UpdatedAt => Column::UpdatedAt,
            Self::CreatedAt => Column::CreatedAt,
            Self::Title => Column::Title,
            Self::UnitPrice => Column::UnitPrice,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl From<SortDirection> for Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        }
    }
}

/// Product persistence and search.
///
/// Update reads the record, then writes the merged result; delete is a single
/// statement. Neither is atomic with a caller's own existence check, and a
/// record removed in between is reported as `NotFound` by the write itself
/// (a missing row on read, or zero rows affected).
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert(&self, fields: ProductFields) -> Result<ProductModel, ServiceError>;

    async fn get_by_id(&self, id: Uuid) -> Result<ProductModel, ServiceError>;

    async fn update_by_id(
        &self,
        id: Uuid,
        patch: ProductPatch,
    ) -> Result<ProductModel, ServiceError>;

    async fn delete_by_id(&self, id: Uuid) -> Result<(), ServiceError>;

    async fn list_page(
        &self,
        offset: u64,
        limit: u64,
        sort_key: ProductSortKey,
        direction: SortDirection,
    ) -> Result<Page<ProductModel>, ServiceError>;

    async fn text_search(
        &self,
        query: &TextQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Page<ScoredProduct>, ServiceError>;

    async fn count(&self) -> Result<u64, ServiceError>;
}

/// sea-orm backed product store
#[derive(Debug, Clone)]
pub struct ProductRepository {
    base: BaseRepository,
}

impl ProductRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    fn not_found(id: Uuid) -> ServiceError {
        ServiceError::NotFound(format!("Product with ID {} not found", id))
    }
}

impl Repository for ProductRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}

fn record(operation: &'static str, start: Instant, result: &Result<impl Sized, ServiceError>) {
    histogram!("catalog_store.operation.duration", start.elapsed(), "operation" => operation);
    match result {
        Ok(_) => {
            counter!("catalog_store.operation.success", 1, "operation" => operation);
        }
        Err(ServiceError::DatabaseError(e)) => {
            error!(operation, error = %e, "Product store operation failed");
            counter!("catalog_store.operation.error", 1, "operation" => operation);
        }
        Err(_) => {
            counter!("catalog_store.operation.rejected", 1, "operation" => operation);
        }
    }
}

/// The `updated_at` to store on update: the requested stamp (or now), but
/// always strictly after the previous one.
pub(crate) fn next_updated_at(
    previous: DateTime<Utc>,
    requested: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    let stamp = requested.unwrap_or_else(Utc::now);
    stamp.max(previous + Duration::microseconds(1))
}

/// Orders hits by score, then newest first, then id.
pub(crate) fn rank(hits: &mut [ScoredProduct]) {
    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.product.updated_at.cmp(&a.product.updated_at))
            .then_with(|| a.product.id.cmp(&b.product.id))
    });
}

/// Narrows the candidate set in SQL: any scoring token appearing anywhere
/// in an indexed column. SQL `lower()` only folds ASCII, so non-ASCII
/// queries skip the prefilter and are scored over the whole table.
fn prefilter(query: &TextQuery) -> Option<Condition> {
    let tokens = query.scoring_tokens();
    if tokens.is_empty() || !tokens.iter().all(|t| t.is_ascii()) {
        return None;
    }

    let columns: Vec<Column> = PRODUCT_TEXT_INDEX
        .field_names()
        .filter_map(|field| Column::from_str(field).ok())
        .collect();

    let mut any = Condition::any();
    for token in &tokens {
        let pattern = format!("%{}%", token);
        for column in &columns {
            any = any.add(Expr::expr(Func::lower(Expr::col(*column))).like(pattern.clone()));
        }
    }
    Some(any)
}

#[async_trait]
impl ProductStore for ProductRepository {
    #[instrument(skip(self, fields))]
    async fn insert(&self, fields: ProductFields) -> Result<ProductModel, ServiceError> {
        let start = Instant::now();
        let result = async {
            let checked = fields.check()?;
            let now = Utc::now();

            let product = ProductActiveModel {
                id: Set(Uuid::new_v4()),
                title: Set(checked.title),
                description: Set(checked.description),
                brand: Set(checked.brand),
                unit_price: Set(checked.unit_price),
                quantity: Set(checked.quantity),
                image: Set(checked.image),
                active: Set(checked.active),
                created_at: Set(now),
                updated_at: Set(now),
            };

            let created = product.insert(self.get_db()).await?;
            debug!(product_id = %created.id, "Product created");
            Ok::<_, ServiceError>(created)
        }
        .await;

        record("insert", start, &result);
        result
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid) -> Result<ProductModel, ServiceError> {
        let start = Instant::now();
        let result = Product::find_by_id(id)
            .one(self.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
            .and_then(|found| found.ok_or_else(|| Self::not_found(id)));

        record("get_by_id", start, &result);
        result
    }

    #[instrument(skip(self, patch))]
    async fn update_by_id(
        &self,
        id: Uuid,
        patch: ProductPatch,
    ) -> Result<ProductModel, ServiceError> {
        let start = Instant::now();
        let result = async {
            let existing = Product::find_by_id(id)
                .one(self.get_db())
                .await?
                .ok_or_else(|| Self::not_found(id))?;

            let updated_at = next_updated_at(existing.updated_at, patch.updated_at);
            let checked = ProductFields::from(&existing).merge(patch).check()?;

            let mut product: ProductActiveModel = existing.into();
            product.title = Set(checked.title);
            product.description = Set(checked.description);
            product.brand = Set(checked.brand);
            product.unit_price = Set(checked.unit_price);
            product.quantity = Set(checked.quantity);
            product.image = Set(checked.image);
            product.active = Set(checked.active);
            product.updated_at = Set(updated_at);

            match product.update(self.get_db()).await {
                Ok(updated) => Ok::<_, ServiceError>(updated),
                Err(DbErr::RecordNotUpdated) => Err(Self::not_found(id)),
                Err(e) => Err(ServiceError::DatabaseError(e)),
            }
        }
        .await;

        record("update_by_id", start, &result);
        result
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, id: Uuid) -> Result<(), ServiceError> {
        let start = Instant::now();
        let result = Product::delete_by_id(id)
            .exec(self.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
            .and_then(|res| {
                if res.rows_affected == 0 {
                    Err(Self::not_found(id))
                } else {
                    Ok(())
                }
            });

        record("delete_by_id", start, &result);
        result
    }

    #[instrument(skip(self))]
    async fn list_page(
        &self,
        offset: u64,
        limit: u64,
        sort_key: ProductSortKey,
        direction: SortDirection,
    ) -> Result<Page<ProductModel>, ServiceError> {
        let start = Instant::now();
        let result = async {
            // Count and slice read from the same snapshot
            let txn = self.get_db().begin().await?;

            let total = Product::find().count(&txn).await?;
            let items = Product::find()
                .order_by(sort_key.column(), direction.into())
                .order_by(Column::Id, direction.into())
                .offset(offset)
                .limit(limit)
                .all(&txn)
                .await?;

            txn.commit().await?;
            Ok::<_, ServiceError>(Page { items, total })
        }
        .await;

        record("list_page", start, &result);
        result
    }

    #[instrument(skip(self))]
    async fn text_search(
        &self,
        query: &TextQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Page<ScoredProduct>, ServiceError> {
        if query.is_empty() {
            return Ok(Page {
                items: Vec::new(),
                total: 0,
            });
        }

        let start = Instant::now();
        let result = async {
            let mut select = Product::find();
            if let Some(condition) = prefilter(query) {
                select = select.filter(condition);
            }
            let candidates = select.all(self.get_db()).await?;
            let scanned = candidates.len();

            let mut hits: Vec<ScoredProduct> = candidates
                .into_iter()
                .filter_map(|product| {
                    PRODUCT_TEXT_INDEX
                        .score(query, &product)
                        .map(|score| ScoredProduct { product, score })
                })
                .collect();
            rank(&mut hits);

            let total = hits.len() as u64;
            debug!(scanned, matched = total, "Text search scored candidates");

            let items = hits
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect();
            Ok::<_, ServiceError>(Page { items, total })
        }
        .await;

        record("text_search", start, &result);
        result
    }

    #[instrument(skip(self))]
    async fn count(&self) -> Result<u64, ServiceError> {
        let start = Instant::now();
        let result = Product::find()
            .count(self.get_db())
            .await
            .map_err(ServiceError::DatabaseError);

        record("count", start, &result);
        result
    }
}

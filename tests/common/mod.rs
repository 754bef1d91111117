#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use async_trait::async_trait;
use catalog_api::{
    build_router,
    config::AppConfig,
    db,
    entities::product::{self, Model, ProductFields, ProductPatch},
    errors::ServiceError,
    repositories::{
        Page, ProductRepository, ProductSortKey, ProductStore, ScoredProduct, SortDirection,
    },
    search::TextQuery,
    AppState,
};
use sea_orm::DbErr;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness for spinning up an application backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Construct a test application after adjusting the default test configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = build_router(state.clone());

        Self { router, state }
    }

    /// Construct a test application whose handlers talk to a replacement store
    /// built around the real repository.
    pub async fn with_store(wrap: impl FnOnce(ProductRepository) -> Arc<dyn ProductStore>) -> Self {
        let app = Self::new().await;
        let mut state = app.state;
        state.store = wrap(ProductRepository::new(state.db.clone()));
        let router = build_router(state.clone());

        Self { router, state }
    }

    /// A repository sharing the application's database.
    pub fn repository(&self) -> ProductRepository {
        ProductRepository::new(self.state.db.clone())
    }

    /// Send a request against the router.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.send(request).await
    }

    /// Send a raw request against the router.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Create a product through the API and return its JSON.
    pub async fn create_product(&self, payload: Value) -> Value {
        let response = self
            .request(Method::POST, "/api/products", Some(payload))
            .await;
        assert_eq!(response.status(), 201, "product creation should succeed");
        response_json(response).await
    }

    /// Insert a product directly through the store.
    pub async fn seed_product(
        &self,
        title: &str,
        brand: &str,
        description: Option<&str>,
    ) -> product::Model {
        self.state
            .store
            .insert(product::ProductFields {
                title: Some(title.to_string()),
                brand: Some(brand.to_string()),
                description: description.map(str::to_string),
                unit_price: Some(9.99),
                quantity: Some(1.0),
                ..Default::default()
            })
            .await
            .expect("seed product for tests")
    }
}

pub fn widget() -> Value {
    json!({
        "title": "Widget",
        "brand": "Acme",
        "unit_price": 10,
        "quantity": 3
    })
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Driver text that must never reach a response body.
pub const DRIVER_ERROR: &str = "connection refused by 10.0.0.7:5432";

fn driver_error() -> ServiceError {
    ServiceError::DatabaseError(DbErr::Custom(DRIVER_ERROR.to_string()))
}

/// A store whose every operation fails with a database error.
pub struct UnavailableStore;

#[async_trait]
impl ProductStore for UnavailableStore {
    async fn insert(&self, _fields: ProductFields) -> Result<Model, ServiceError> {
        Err(driver_error())
    }

    async fn get_by_id(&self, _id: Uuid) -> Result<Model, ServiceError> {
        Err(driver_error())
    }

    async fn update_by_id(&self, _id: Uuid, _patch: ProductPatch) -> Result<Model, ServiceError> {
        Err(driver_error())
    }

    async fn delete_by_id(&self, _id: Uuid) -> Result<(), ServiceError> {
        Err(driver_error())
    }

    async fn list_page(
        &self,
        _offset: u64,
        _limit: u64,
        _sort_key: ProductSortKey,
        _direction: SortDirection,
    ) -> Result<Page<Model>, ServiceError> {
        Err(driver_error())
    }

    async fn text_search(
        &self,
        _query: &TextQuery,
        _offset: u64,
        _limit: u64,
    ) -> Result<Page<ScoredProduct>, ServiceError> {
        Err(driver_error())
    }

    async fn count(&self) -> Result<u64, ServiceError> {
        Err(driver_error())
    }
}

/// A store where another writer deletes the record right before every
/// update or delete reaches the database.
pub struct VanishingStore {
    inner: ProductRepository,
}

impl VanishingStore {
    pub fn new(inner: ProductRepository) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ProductStore for VanishingStore {
    async fn insert(&self, fields: ProductFields) -> Result<Model, ServiceError> {
        self.inner.insert(fields).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Model, ServiceError> {
        self.inner.get_by_id(id).await
    }

    async fn update_by_id(&self, id: Uuid, patch: ProductPatch) -> Result<Model, ServiceError> {
        self.inner.delete_by_id(id).await?;
        self.inner.update_by_id(id, patch).await
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), ServiceError> {
        self.inner.delete_by_id(id).await?;
        self.inner.delete_by_id(id).await
    }

    async fn list_page(
        &self,
        offset: u64,
        limit: u64,
        sort_key: ProductSortKey,
        direction: SortDirection,
    ) -> Result<Page<Model>, ServiceError> {
        self.inner.list_page(offset, limit, sort_key, direction).await
    }

    async fn text_search(
        &self,
        query: &TextQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Page<ScoredProduct>, ServiceError> {
        self.inner.text_search(query, offset, limit).await
    }

    async fn count(&self) -> Result<u64, ServiceError> {
        self.inner.count().await
    }
}

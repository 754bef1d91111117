use crate::entities::product::{Model as Product, ProductFields, ProductPatch};
use crate::errors::{ApiError, DeleteResponse, ServiceError};
use crate::handlers::common::{
    json_rejection, normalize_optional_string, normalize_string, query_rejection, PaginationParams,
    ProductPage,
};
use crate::repositories::{ProductSortKey, ScoredProduct, SortDirection};
use crate::search::TextQuery;
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Json, Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Deserializer};
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

const NO_PRODUCTS: &str = "No products";
const MISSING_QUERY: &str = "You did not enter your search query...";
const NO_SEARCH_RESULTS: &str = "No products found...";
const GET_NOT_FOUND: &str = "No product found with this id...";
const UPDATE_NOT_FOUND: &str = "Could not find a product with this id...";
const DELETE_NOT_FOUND: &str = "No product found with this id";
const DELETE_FAILED: &str = "Something went wrong while trying to delete the product";

/// Creates the router for product endpoints
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/search", get(search_products))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// Request body for creating a product. `image` and unknown fields are ignored.
#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "title": "Widget",
    "brand": "Acme",
    "description": "A very useful widget",
    "unit_price": 10.0,
    "quantity": 3
}))]
pub struct CreateProductRequest {
    pub title: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub unit_price: Option<f64>,
    /// Must be a whole number
    pub quantity: Option<f64>,
}

impl From<CreateProductRequest> for ProductFields {
    fn from(request: CreateProductRequest) -> Self {
        Self {
            title: request.title.map(normalize_string),
            description: normalize_optional_string(request.description),
            brand: request.brand.map(normalize_string),
            unit_price: request.unit_price,
            quantity: request.quantity,
            image: None,
            active: None,
        }
    }
}

/// Request body for updating a product.
///
/// Absent fields are left untouched, `null` clears an optional field.
/// `created_at` is not part of the body and is ignored if sent.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub brand: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<f64>)]
    pub unit_price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<f64>)]
    pub quantity: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub image: Option<Option<String>>,
    pub active: Option<bool>,
}

/// Distinguishes a field sent as `null` from one left out.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateProductRequest {
    fn into_patch(self) -> ProductPatch {
        ProductPatch {
            title: self.title.map(|v| v.map(normalize_string)),
            description: self.description.map(normalize_optional_string),
            brand: self.brand.map(|v| v.map(normalize_string)),
            unit_price: self.unit_price,
            quantity: self.quantity,
            image: self.image.map(normalize_optional_string),
            active: self.active,
            updated_at: Some(Utc::now()),
        }
    }
}

/// Text search parameters
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Search string: words, `-excluded` words and `"quoted phrases"`
    pub q: Option<String>,
    pub page: Option<i64>,
    #[serde(rename = "perPage")]
    pub per_page: Option<i64>,
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

/// List products, most recently updated first
#[utoipa::path(
    get,
    path = "/api/products",
    params(PaginationParams),
    responses(
        (status = 200, description = "Page of products", body = ProductPage<Product>),
        (status = 400, description = "Empty page or invalid pagination", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    params: Result<Query<PaginationParams>, QueryRejection>,
) -> Result<Json<ProductPage<Product>>, ApiError> {
    let Query(params) = params.map_err(query_rejection)?;
    let window = params.resolve(state.config.default_per_page)?;
    let offset = window
        .offset()
        .ok_or_else(|| ApiError::BadRequest(NO_PRODUCTS.to_string()))?;

    let page = state
        .store
        .list_page(
            offset,
            window.per_page,
            ProductSortKey::UpdatedAt,
            SortDirection::Desc,
        )
        .await
        .map_err(ApiError::with_failure_status(StatusCode::BAD_REQUEST))?;

    if page.items.is_empty() {
        return Err(ApiError::BadRequest(NO_PRODUCTS.to_string()));
    }

    Ok(Json(ProductPage::new(page.items, window, page.total)))
}

/// Full text search over title, brand and description
#[utoipa::path(
    get,
    path = "/api/products/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching products by relevance", body = ProductPage<ScoredProduct>),
        (status = 400, description = "Missing search query", body = crate::errors::ErrorResponse),
        (status = 404, description = "No matches", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn search_products(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<ProductPage<ScoredProduct>>, ApiError> {
    let Query(params) = params.map_err(query_rejection)?;

    let raw_query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest(MISSING_QUERY.to_string()))?;

    let window = PaginationParams {
        page: params.page,
        per_page: params.per_page,
    }
    .resolve(state.config.default_per_page)?;
    let offset = window
        .offset()
        .ok_or_else(|| ApiError::NotFound(NO_SEARCH_RESULTS.to_string()))?;

    let query = TextQuery::parse(raw_query);
    let hits = state
        .store
        .text_search(&query, offset, window.per_page)
        .await
        .map_err(ApiError::with_failure_status(StatusCode::NOT_FOUND))?;

    if hits.items.is_empty() {
        return Err(ApiError::NotFound(NO_SEARCH_RESULTS.to_string()));
    }

    Ok(Json(ProductPage::new(hits.items, window, hits.total)))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id = parse_id(&id).ok_or_else(|| ApiError::NotFound(GET_NOT_FOUND.to_string()))?;

    match state.store.get_by_id(id).await {
        Ok(product) => Ok(Json(product)),
        Err(ServiceError::NotFound(_)) => Err(ApiError::NotFound(GET_NOT_FOUND.to_string())),
        Err(e) => Err(ApiError::with_failure_status(StatusCode::NOT_FOUND)(e)),
    }
}

/// Create a new product
#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(json_rejection)?;

    let product = state
        .store
        .insert(payload.into())
        .await
        .map_err(ApiError::with_failure_status(StatusCode::BAD_REQUEST))?;

    info!(product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update a product
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<Product>, ApiError> {
    let id = parse_id(&id).ok_or_else(|| ApiError::NotFound(UPDATE_NOT_FOUND.to_string()))?;
    let on_failure = ApiError::with_failure_status(StatusCode::BAD_REQUEST);

    // Existence is checked before the body, so an unknown id is always 404.
    // The record can still disappear before the write; the store then
    // reports NotFound itself.
    match state.store.get_by_id(id).await {
        Ok(_) => {}
        Err(ServiceError::NotFound(_)) => {
            return Err(ApiError::NotFound(UPDATE_NOT_FOUND.to_string()))
        }
        Err(e) => return Err(on_failure(e)),
    }

    let Json(payload) = payload.map_err(json_rejection)?;

    match state.store.update_by_id(id, payload.into_patch()).await {
        Ok(product) => {
            info!(product_id = %product.id, "Product updated");
            Ok(Json(product))
        }
        Err(ServiceError::NotFound(_)) => Err(ApiError::NotFound(UPDATE_NOT_FOUND.to_string())),
        Err(e) => Err(on_failure(e)),
    }
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted", body = DeleteResponse),
        (status = 400, description = "Delete failed", body = DeleteResponse),
        (status = 404, description = "Product not found", body = DeleteResponse)
    ),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = parse_id(&id)
        .ok_or_else(|| ApiError::delete(StatusCode::NOT_FOUND, DELETE_NOT_FOUND))?;

    match state.store.get_by_id(id).await {
        Ok(_) => {}
        Err(ServiceError::NotFound(_)) => {
            return Err(ApiError::delete(StatusCode::NOT_FOUND, DELETE_NOT_FOUND))
        }
        Err(e) => {
            return Err(ApiError::delete(
                StatusCode::BAD_REQUEST,
                e.response_message(),
            ))
        }
    }

    // A concurrent delete between the check and here lands in this branch.
    if let Err(e) = state.store.delete_by_id(id).await {
        warn!(product_id = %id, error = %e, "Product delete failed");
        return Err(ApiError::delete(StatusCode::BAD_REQUEST, DELETE_FAILED));
    }

    info!(product_id = %id, "Product deleted");
    Ok(Json(DeleteResponse::succeeded()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_body_distinguishes_null_from_absent() {
        let request: UpdateProductRequest =
            serde_json::from_str(r#"{"description": null, "quantity": 5}"#).unwrap();
        assert_eq!(request.description, Some(None));
        assert_eq!(request.quantity, Some(Some(5.0)));
        assert_eq!(request.title, None);
    }

    #[test]
    fn update_body_ignores_created_at_and_stamps_updated_at() {
        let request: UpdateProductRequest = serde_json::from_str(
            r#"{"created_at": "2000-01-01T00:00:00Z", "title": " Gadget "}"#,
        )
        .unwrap();
        let patch = request.into_patch();
        assert_eq!(patch.title, Some(Some("Gadget".to_string())));
        assert!(patch.updated_at.is_some());
    }

    #[test]
    fn create_body_drops_image() {
        let request: CreateProductRequest = serde_json::from_str(
            r#"{"title":"Widget","brand":"Acme","unit_price":10,"quantity":3,"image":"w.png"}"#,
        )
        .unwrap();
        let fields = ProductFields::from(request);
        assert_eq!(fields.image, None);
        assert_eq!(fields.quantity, Some(3.0));
        assert!(fields.violations().is_empty());
    }

    #[test]
    fn ids_are_parsed_leniently() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&format!(" {} ", id)), Some(id));
        assert_eq!(parse_id("not-a-uuid"), None);
    }
}

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catalog API",
        version = "0.1.0",
        description = r#"
# Product Catalog API

Create, read, update and delete products, and search them by text.

## Search

`GET /api/products/search?q=...` matches whole words in `title`, `brand`
and `description`. Matches in the title weigh the most, then the brand, then
the description. Prefix a word with `-` to exclude products containing it,
and wrap words in double quotes to require a phrase. Every hit carries its
relevance `score`.

## Pagination

List and search accept:
- `page`: Page number (default: 1)
- `perPage`: Items per page (default: 8)

Responses use the envelope `{total_pages, page, perPage, products}`.

## Error Handling

Failures answer with an HTTP status and a body of the form:

```json
{ "msg": "No product found with this id..." }
```

Delete failures also carry `"success": false`.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::products::list_products,
        crate::handlers::products::search_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::health::health_check,
    ),
    components(
        schemas(
            crate::entities::product::Model,
            crate::repositories::ScoredProduct,
            crate::handlers::products::CreateProductRequest,
            crate::handlers::products::UpdateProductRequest,
            crate::health::HealthInfo,
            crate::health::HealthStatus,
            crate::errors::ErrorResponse,
            crate::errors::DeleteResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_product_endpoints() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Catalog API"));
        assert!(json.contains("/api/products/search"));
        assert!(json.contains("/api/products/{id}"));
        assert!(json.contains("/health"));
    }
}

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, PgTextExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::{CategoryEntity, ProductEntity},
    schema::{categories, products},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/products",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(list_products))
            .routes(utoipa_axum::routes!(get_product))
            .routes(utoipa_axum::routes!(get_product_by_slug)),
    )
}

#[derive(Serialize, ToSchema)]
struct ProductWithCategory {
    pub product: ProductEntity,
    pub category: CategoryEntity,
}

#[derive(Deserialize)]
struct ProductListQuery {
    category: Option<String>,
    search: Option<String>,
    featured: Option<bool>,
    sort: Option<String>,
}

/// Browse the catalog. Filters combine; an unknown category slug matches
/// nothing. Results are capped at 50 rows.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Products"],
    params(
        ("category" = Option<String>, Query, description = "Category slug to filter by"),
        ("search" = Option<String>, Query, description = "Case-insensitive substring match on the product name"),
        ("featured" = Option<bool>, Query, description = "When true, only featured products"),
        ("sort" = Option<String>, Query, description = "price-asc | price-desc | name; anything else sorts newest-first")
    ),
    responses(
        (status = 200, description = "List products successfully", body = StdResponse<Vec<ProductWithCategory>, String>)
    )
)]
async fn list_products(
    Query(params): Query<ProductListQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let mut query = products::table
        .inner_join(categories::table)
        .select((ProductEntity::as_select(), CategoryEntity::as_select()))
        .into_boxed();

    if let Some(category) = params.category {
        query = query.filter(categories::slug.eq(category));
    }
    if let Some(search) = params.search {
        query = query.filter(products::name.ilike(format!("%{search}%")));
    }
    if params.featured == Some(true) {
        query = query.filter(products::featured.eq(true));
    }

    query = match params.sort.as_deref() {
        Some("price-asc") => query.order_by(products::price.asc()),
        Some("price-desc") => query.order_by(products::price.desc()),
        Some("name") => query.order_by(products::name.asc()),
        _ => query.order_by(products::created_at.desc()),
    };

    let rows: Vec<(ProductEntity, CategoryEntity)> = query
        .limit(50)
        .get_results(conn)
        .await
        .context("Failed to get products")?;

    let products: Vec<ProductWithCategory> = rows
        .into_iter()
        .map(|(product, category)| ProductWithCategory { product, category })
        .collect();

    Ok(StdResponse {
        data: Some(products),
        message: Some("List products successfully"),
    })
}

/// Fetch a single product. This is the read the cart takes its price and
/// stock snapshot from.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Products"],
    params(
        ("id" = Uuid, Path, description = "Product ID to fetch")
    ),
    responses(
        (status = 200, description = "Get product successfully", body = StdResponse<ProductEntity, String>),
        (status = 404, description = "Product not found", body = StdResponse<String, String>)
    )
)]
async fn get_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = products::table.find(id).get_result(conn).await?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Get product successfully"),
    })
}

/// Fetch a product by its URL slug, with its category embedded.
#[utoipa::path(
    get,
    path = "/by-slug/{slug}",
    tags = ["Products"],
    params(
        ("slug" = String, Path, description = "Product slug to fetch")
    ),
    responses(
        (status = 200, description = "Get product successfully", body = StdResponse<ProductWithCategory, String>),
        (status = 404, description = "Product not found", body = StdResponse<String, String>)
    )
)]
async fn get_product_by_slug(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (product, category): (ProductEntity, CategoryEntity) = products::table
        .inner_join(categories::table)
        .filter(products::slug.eq(slug))
        .select((ProductEntity::as_select(), CategoryEntity::as_select()))
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(ProductWithCategory { product, category }),
        message: Some("Get product successfully"),
    })
}

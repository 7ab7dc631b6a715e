use anyhow::{Context, Result};
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, QueryResult, SelectableHelper};
use diesel::result::DatabaseErrorKind;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    aliases::DieselError,
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::{CreateProductEntity, ProductEntity, UpdateProductEntity},
    schema::products,
    slug::slugify,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/products",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_product))
            .routes(utoipa_axum::routes!(update_product, delete_product)),
    )
}

#[derive(Deserialize, ToSchema)]
struct CreateProductReq {
    pub name: String,
    pub description: Option<String>,
    pub price: i32,
    pub image_url: Option<String>,
    pub category_id: Uuid,
    pub stock_quantity: Option<i32>,
    pub featured: Option<bool>,
}

/// Add a product to the catalog. The slug is derived from the name; stock
/// defaults to zero so nothing is sellable until stock is set.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Admin"],
    request_body = CreateProductReq,
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Product created successfully", body = StdResponse<ProductEntity, String>),
        (status = 400, description = "Invalid product", body = StdResponse<String, String>)
    )
)]
async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<CreateProductReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("Product name is required".to_string()));
    }
    if body.price < 1 {
        return Err(AppError::BadRequest(
            "Product price must be a positive amount".to_string(),
        ));
    }
    if body.stock_quantity.is_some_and(|stock| stock < 0) {
        return Err(AppError::BadRequest(
            "Stock quantity cannot be negative".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: QueryResult<ProductEntity> = diesel::insert_into(products::table)
        .values(CreateProductEntity {
            slug: slugify(&body.name),
            name: body.name,
            description: body.description.unwrap_or_default(),
            price: body.price,
            image_url: body
                .image_url
                .unwrap_or_else(|| "/placeholder.svg".to_string()),
            category_id: body.category_id,
            stock_quantity: body.stock_quantity.unwrap_or(0),
            featured: body.featured.unwrap_or(false),
        })
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await;

    match product {
        Ok(product) => Ok(StdResponse {
            data: Some(product),
            message: Some("Product created successfully"),
        }),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => Err(
            AppError::BadRequest("A product with this name already exists".to_string()),
        ),
        Err(DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) => Err(
            AppError::BadRequest("Category does not exist".to_string()),
        ),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

/// Update a product. Renaming regenerates the slug unless one is supplied.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Admin"],
    params(
        ("id" = Uuid, Path, description = "Product ID to update")
    ),
    request_body = UpdateProductEntity,
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Product updated successfully", body = StdResponse<ProductEntity, String>),
        (status = 404, description = "Product not found", body = StdResponse<String, String>)
    )
)]
async fn update_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<UpdateProductEntity>,
) -> Result<impl IntoResponse, AppError> {
    if body.price.is_some_and(|price| price < 1) {
        return Err(AppError::BadRequest(
            "Product price must be a positive amount".to_string(),
        ));
    }
    if body.stock_quantity.is_some_and(|stock| stock < 0) {
        return Err(AppError::BadRequest(
            "Stock quantity cannot be negative".to_string(),
        ));
    }

    let mut changes = body;
    if changes.slug.is_none() {
        if let Some(name) = &changes.name {
            changes.slug = Some(slugify(name));
        }
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let updated: QueryResult<ProductEntity> = diesel::update(products::table.find(id))
        .set((changes, products::updated_at.eq(diesel::dsl::now)))
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await;

    match updated {
        Ok(product) => Ok(StdResponse {
            data: Some(product),
            message: Some("Product updated successfully"),
        }),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => Err(
            AppError::BadRequest("A product with this name already exists".to_string()),
        ),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

/// Remove a product from the catalog. Products referenced by order line
/// items stay; order history is never rewritten.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Admin"],
    params(
        ("id" = Uuid, Path, description = "Product ID to delete")
    ),
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Product deleted successfully", body = StdResponse<ProductEntity, String>),
        (status = 404, description = "Product not found", body = StdResponse<String, String>),
        (status = 409, description = "Product has order history", body = StdResponse<String, String>)
    )
)]
async fn delete_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let deleted: QueryResult<ProductEntity> = diesel::delete(products::table.find(id))
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await;

    match deleted {
        Ok(product) => Ok(StdResponse {
            data: Some(product),
            message: Some("Product deleted successfully"),
        }),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) => Err(
            AppError::Conflict("Cannot delete a product that has order history".to_string()),
        ),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

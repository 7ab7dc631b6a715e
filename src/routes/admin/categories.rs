use anyhow::{Context, Result};
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::result::DatabaseErrorKind;
use diesel::{ExpressionMethods, QueryDsl, QueryResult, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    aliases::DieselError,
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::{CategoryEntity, CreateCategoryEntity, UpdateCategoryEntity},
    schema::{categories, products},
    slug::slugify,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/categories",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_category))
            .routes(utoipa_axum::routes!(update_category, delete_category)),
    )
}

#[derive(Deserialize, ToSchema)]
struct CategoryReq {
    pub name: String,
    pub description: Option<String>,
}

/// Add a category. The slug is derived from the name.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Admin"],
    request_body = CategoryReq,
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Category created successfully", body = StdResponse<CategoryEntity, String>),
        (status = 400, description = "Invalid category", body = StdResponse<String, String>)
    )
)]
async fn create_category(
    State(state): State<AppState>,
    Json(body): Json<CategoryReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Category name is required".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let category: QueryResult<CategoryEntity> = diesel::insert_into(categories::table)
        .values(CreateCategoryEntity {
            slug: slugify(&body.name),
            name: body.name,
            description: body.description.unwrap_or_default(),
        })
        .returning(CategoryEntity::as_returning())
        .get_result(conn)
        .await;

    match category {
        Ok(category) => Ok(StdResponse {
            data: Some(category),
            message: Some("Category created successfully"),
        }),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => Err(
            AppError::BadRequest("A category with this name already exists".to_string()),
        ),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

/// Rename a category or change its description. The slug follows the name.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Admin"],
    params(
        ("id" = Uuid, Path, description = "Category ID to update")
    ),
    request_body = CategoryReq,
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Category updated successfully", body = StdResponse<CategoryEntity, String>),
        (status = 404, description = "Category not found", body = StdResponse<String, String>)
    )
)]
async fn update_category(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<CategoryReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Category name is required".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let updated: QueryResult<CategoryEntity> = diesel::update(categories::table.find(id))
        .set((
            UpdateCategoryEntity {
                slug: slugify(&body.name),
                name: body.name,
                description: body.description,
            },
            categories::updated_at.eq(diesel::dsl::now),
        ))
        .returning(CategoryEntity::as_returning())
        .get_result(conn)
        .await;

    match updated {
        Ok(category) => Ok(StdResponse {
            data: Some(category),
            message: Some("Category updated successfully"),
        }),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => Err(
            AppError::BadRequest("A category with this name already exists".to_string()),
        ),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

/// Remove an empty category. Categories still holding products cannot go;
/// move or delete the products first.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Admin"],
    params(
        ("id" = Uuid, Path, description = "Category ID to delete")
    ),
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Category deleted successfully", body = StdResponse<CategoryEntity, String>),
        (status = 400, description = "Category still has products", body = StdResponse<String, String>),
        (status = 404, description = "Category not found", body = StdResponse<String, String>)
    )
)]
async fn delete_category(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product_count: i64 = products::table
        .filter(products::category_id.eq(id))
        .count()
        .get_result(conn)
        .await
        .context("Failed to count products in category")?;

    if product_count > 0 {
        return Err(AppError::BadRequest(format!(
            "Cannot delete a category that still has {product_count} products"
        )));
    }

    let deleted: QueryResult<CategoryEntity> = diesel::delete(categories::table.find(id))
        .returning(CategoryEntity::as_returning())
        .get_result(conn)
        .await;

    match deleted {
        Ok(category) => Ok(StdResponse {
            data: Some(category),
            message: Some("Category deleted successfully"),
        }),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

use anyhow::{Context, Result};
use axum::{extract::State, response::IntoResponse};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::CategoryEntity,
    schema::categories,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/categories",
        OpenApiRouter::new().routes(utoipa_axum::routes!(list_categories)),
    )
}

/// Fetch all categories, ordered by name.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Categories"],
    responses(
        (status = 200, description = "List categories successfully", body = StdResponse<Vec<CategoryEntity>, String>)
    )
)]
async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let categories: Vec<CategoryEntity> = categories::table
        .order_by(categories::name.asc())
        .get_results(conn)
        .await
        .context("Failed to get categories")?;

    Ok(StdResponse {
        data: Some(categories),
        message: Some("List categories successfully"),
    })
}

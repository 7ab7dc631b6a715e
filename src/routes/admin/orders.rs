use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use diesel::{
    ExpressionMethods, NullableExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper,
};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::{OrderEntity, OrderItemEntity},
    order_status::{OrderStatus, UnknownOrderStatus},
    schema::{order_items, orders, products},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(list_orders))
            .routes(utoipa_axum::routes!(update_order_status)),
    )
}

#[derive(Serialize, ToSchema)]
struct OrderItemWithProduct {
    pub item: OrderItemEntity,
    /// Name from the live catalog; `None` when the product has since been
    /// removed.
    pub product_name: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct AdminOrderRes {
    pub order: OrderEntity,
    pub order_items: Vec<OrderItemWithProduct>,
}

#[derive(Deserialize)]
struct OrderListQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

/// List orders newest-first with their line items embedded.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin"],
    params(
        ("limit" = Option<i64>, Query, description = "Page size, defaults to 10"),
        ("offset" = Option<i64>, Query, description = "Rows to skip, defaults to 0")
    ),
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List orders successfully", body = StdResponse<Vec<AdminOrderRes>, String>),
        (status = 401, description = "Missing or wrong admin token", body = StdResponse<String, String>)
    )
)]
async fn list_orders(
    Query(params): Query<OrderListQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let orders: Vec<OrderEntity> = orders::table
        .order_by(orders::created_at.desc())
        .limit(params.limit.unwrap_or(10))
        .offset(params.offset.unwrap_or(0))
        .get_results(conn)
        .await
        .context("Failed to get orders")?;

    let order_ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();

    let items: Vec<(OrderItemEntity, Option<String>)> = order_items::table
        .left_join(products::table)
        .filter(order_items::order_id.eq_any(&order_ids))
        .select((OrderItemEntity::as_select(), products::name.nullable()))
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    let mut group: HashMap<Uuid, Vec<OrderItemWithProduct>> = HashMap::new();
    for (item, product_name) in items {
        group
            .entry(item.order_id)
            .or_default()
            .push(OrderItemWithProduct { item, product_name });
    }

    let orders_with_items: Vec<AdminOrderRes> = orders
        .into_iter()
        .map(|order| AdminOrderRes {
            order_items: group.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect();

    Ok(StdResponse {
        data: Some(orders_with_items),
        message: Some("List orders successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateOrderStatusReq {
    pub status: String,
}

/// Move an order along its lifecycle. Only forward moves are allowed, plus
/// cancellation from any non-terminal status; anything else is a 409. The
/// update is guarded against the status read here, so two admins racing on
/// the same order cannot both win.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Admin"],
    params(
        ("id" = Uuid, Path, description = "Order ID to update")
    ),
    request_body = UpdateOrderStatusReq,
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Order status updated successfully", body = StdResponse<OrderEntity, String>),
        (status = 400, description = "Unknown status value", body = StdResponse<String, String>),
        (status = 404, description = "Order not found", body = StdResponse<String, String>),
        (status = 409, description = "Transition not allowed from the current status", body = StdResponse<String, String>)
    )
)]
async fn update_order_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<UpdateOrderStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let requested: OrderStatus = body
        .status
        .parse()
        .map_err(|err: UnknownOrderStatus| AppError::BadRequest(err.to_string()))?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = orders::table.find(id).get_result(conn).await?;

    let current: OrderStatus = order
        .status
        .parse()
        .map_err(|err| anyhow!("Order {} carries an unreadable status: {err}", order.id))?;

    if !current.can_transition_to(requested) {
        return Err(AppError::Conflict(format!(
            "Cannot move order from {current} to {requested}"
        )));
    }

    // Guarded on the status we just read: a concurrent transition makes this
    // match zero rows instead of silently overwriting it.
    let updated: Option<OrderEntity> = diesel::update(orders::table.find(id))
        .filter(orders::status.eq(current.as_str()))
        .set((
            orders::status.eq(requested.as_str()),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await
        .optional()
        .context("Failed to update order status")?;

    let Some(updated) = updated else {
        return Err(AppError::Conflict(
            "Order status changed concurrently, reload and retry".to_string(),
        ));
    };

    tracing::info!(order_id = %updated.id, from = %current, to = %requested, "Order status updated");

    Ok(StdResponse {
        data: Some(updated),
        message: Some("Order status updated successfully"),
    })
}

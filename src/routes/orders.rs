use anyhow::{Context, Result};
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    checkout::OrderDraft,
    currency::format_kes,
    models::{CreateOrderEntity, OrderEntity, OrderItemEntity},
    order_status::OrderStatus,
    schema::{carts, order_items, orders},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(place_order))
            .routes(utoipa_axum::routes!(get_order)),
    )
}

/// Place an order. The order header, its line items, and the cart cleanup
/// all commit in one transaction; a failure anywhere leaves no orphaned
/// order behind.
///
/// Validation failures come back as 400 before anything touches the
/// database. Line items record the price each product had in the cart.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    request_body = OrderDraft,
    responses(
        (status = 200, description = "Order placed successfully", body = StdResponse<OrderEntity, String>),
        (status = 400, description = "Invalid order draft", body = StdResponse<String, String>)
    )
)]
async fn place_order(
    State(state): State<AppState>,
    Json(body): Json<OrderDraft>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()
        .map_err(|err| AppError::BadRequest(err.to_string()))?;

    let expected_total = body.expected_total();
    if body.total_amount != expected_total {
        // Stored as submitted; flagged for reconciliation rather than
        // rejected, since the shipping rule may have changed mid-session.
        tracing::warn!(
            submitted = body.total_amount,
            expected = expected_total,
            "Submitted order total does not match the current shipping rule"
        );
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let order: OrderEntity = diesel::insert_into(orders::table)
                    .values(CreateOrderEntity {
                        customer_name: body.customer_name.clone(),
                        customer_email: body.customer_email.clone(),
                        customer_phone: body.customer_phone.clone(),
                        shipping_address: body.shipping_address.clone(),
                        status: OrderStatus::New.to_string(),
                        total_amount: body.total_amount,
                    })
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create order")?;

                diesel::insert_into(order_items::table)
                    .values(body.order_items(order.id))
                    .execute(conn)
                    .await
                    .context("Failed to create order items")?;

                if let Some(token) = body.cart_token {
                    diesel::delete(carts::table.find(token))
                        .execute(conn)
                        .await
                        .context("Failed to clear the cart for the placed order")?;
                }

                Ok::<OrderEntity, anyhow::Error>(order)
            })
        })
        .await
        .context("Transaction failed")?;

    tracing::info!(
        order_id = %order.id,
        total = %format_kes(order.total_amount),
        "Order placed"
    );

    Ok(StdResponse {
        data: Some(order),
        message: Some("Order placed successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct GetOrderRes {
    pub order: OrderEntity,
    pub order_items: Vec<OrderItemEntity>,
}

/// Fetch an order with its line items, as referenced on the confirmation
/// page.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    params(
        ("id" = Uuid, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<GetOrderRes, String>),
        (status = 404, description = "Order not found", body = StdResponse<String, String>)
    )
)]
async fn get_order(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = orders::table.find(id).get_result(conn).await?;

    let order_items: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq(order.id))
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    Ok(StdResponse {
        data: Some(GetOrderRes { order, order_items }),
        message: Some("Get order successfully"),
    })
}

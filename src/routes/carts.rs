use anyhow::{Context, Result};
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::QueryDsl;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    cart::{
        CartAction, CartLineItem, CartState, ProductSnapshot,
        storage::PgCartStorage,
        store::CartStore,
    },
    checkout,
    models::ProductEntity,
    schema::products,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/carts",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_cart))
            .routes(utoipa_axum::routes!(get_cart, delete_cart))
            .routes(utoipa_axum::routes!(add_cart_item))
            .routes(utoipa_axum::routes!(update_cart_item, remove_cart_item)),
    )
}

/// A cart as the storefront renders it: the lines plus the running quote.
#[derive(Serialize, ToSchema)]
struct CartRes {
    pub token: Uuid,
    pub items: Vec<CartLineItem>,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub total: i64,
}

impl CartRes {
    fn build(token: Uuid, state: &CartState) -> Self {
        let quote = checkout::quote(state);
        Self {
            token,
            items: state.items().to_vec(),
            subtotal: quote.subtotal,
            shipping_fee: quote.shipping_fee,
            total: quote.total,
        }
    }
}

async fn open_store(state: &AppState, token: Uuid) -> CartStore<PgCartStorage> {
    CartStore::open(PgCartStorage::new(state.db_pool.clone()), token).await
}

/// Mint a cart token. Nothing is written until the first item goes in, so
/// abandoned tokens cost nothing.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Carts"],
    responses(
        (status = 200, description = "Cart created successfully", body = StdResponse<CartRes, String>)
    )
)]
async fn create_cart() -> Result<impl IntoResponse, AppError> {
    let token = Uuid::new_v4();

    Ok(StdResponse {
        data: Some(CartRes::build(token, &CartState::default())),
        message: Some("Cart created successfully"),
    })
}

/// Fetch a cart. Unknown tokens come back as an empty cart rather than 404;
/// the token is the only identity a shopper has.
#[utoipa::path(
    get,
    path = "/{token}",
    tags = ["Carts"],
    params(
        ("token" = Uuid, Path, description = "Cart token")
    ),
    responses(
        (status = 200, description = "Get cart successfully", body = StdResponse<CartRes, String>)
    )
)]
async fn get_cart(
    Path(token): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let store = open_store(&state, token).await;

    Ok(StdResponse {
        data: Some(CartRes::build(token, store.state())),
        message: Some("Get cart successfully"),
    })
}

/// Empty a cart.
#[utoipa::path(
    delete,
    path = "/{token}",
    tags = ["Carts"],
    params(
        ("token" = Uuid, Path, description = "Cart token")
    ),
    responses(
        (status = 200, description = "Cart cleared successfully", body = StdResponse<CartRes, String>)
    )
)]
async fn delete_cart(
    Path(token): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = open_store(&state, token).await;
    let cart = store.apply(CartAction::Clear).await;

    Ok(StdResponse {
        data: Some(CartRes::build(token, cart)),
        message: Some("Cart cleared successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct AddItemReq {
    pub product_id: Uuid,
}

/// Add one unit of a product to the cart. The product's price and stock are
/// snapshotted into the cart line here; repeated adds bump the quantity up
/// to the snapshotted stock ceiling.
#[utoipa::path(
    post,
    path = "/{token}/items",
    tags = ["Carts"],
    params(
        ("token" = Uuid, Path, description = "Cart token")
    ),
    request_body = AddItemReq,
    responses(
        (status = 200, description = "Item added to cart", body = StdResponse<CartRes, String>),
        (status = 404, description = "Product not found", body = StdResponse<String, String>)
    )
)]
async fn add_cart_item(
    Path(token): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<AddItemReq>,
) -> Result<impl IntoResponse, AppError> {
    // Scoped so the pooled connection is back in the pool before the cart
    // store takes its own.
    let product: ProductEntity = {
        let conn = &mut state
            .db_pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        products::table.find(body.product_id).get_result(conn).await?
    };

    let mut store = open_store(&state, token).await;
    let cart = store
        .apply(CartAction::Add(ProductSnapshot::from(&product)))
        .await;

    Ok(StdResponse {
        data: Some(CartRes::build(token, cart)),
        message: Some("Item added to cart"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateItemReq {
    pub quantity: i32,
}

/// Set the exact quantity for a line. Zero or less removes it; quantities
/// above the snapshotted stock are clamped down.
#[utoipa::path(
    patch,
    path = "/{token}/items/{product_id}",
    tags = ["Carts"],
    params(
        ("token" = Uuid, Path, description = "Cart token"),
        ("product_id" = Uuid, Path, description = "Product whose line to update")
    ),
    request_body = UpdateItemReq,
    responses(
        (status = 200, description = "Cart item updated", body = StdResponse<CartRes, String>)
    )
)]
async fn update_cart_item(
    Path((token, product_id)): Path<(Uuid, Uuid)>,
    State(state): State<AppState>,
    Json(body): Json<UpdateItemReq>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = open_store(&state, token).await;
    let cart = store
        .apply(CartAction::UpdateQuantity {
            product_id,
            quantity: body.quantity,
        })
        .await;

    Ok(StdResponse {
        data: Some(CartRes::build(token, cart)),
        message: Some("Cart item updated"),
    })
}

/// Drop a line from the cart. Removing something that is not there is fine.
#[utoipa::path(
    delete,
    path = "/{token}/items/{product_id}",
    tags = ["Carts"],
    params(
        ("token" = Uuid, Path, description = "Cart token"),
        ("product_id" = Uuid, Path, description = "Product whose line to remove")
    ),
    responses(
        (status = 200, description = "Cart item removed", body = StdResponse<CartRes, String>)
    )
)]
async fn remove_cart_item(
    Path((token, product_id)): Path<(Uuid, Uuid)>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = open_store(&state, token).await;
    let cart = store.apply(CartAction::Remove(product_id)).await;

    Ok(StdResponse {
        data: Some(CartRes::build(token, cart)),
        message: Some("Cart item removed"),
    })
}

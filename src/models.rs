use chrono::{DateTime, Utc};
use diesel::{
    Selectable,
    prelude::{AsChangeset, Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Categories

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CategoryEntity {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::categories)]
pub struct CreateCategoryEntity {
    pub name: String,
    pub slug: String,
    pub description: String,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::categories)]
pub struct UpdateCategoryEntity {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

// Products

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductEntity {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: i32,
    pub image_url: String,
    pub category_id: Uuid,
    pub stock_quantity: i32,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::products)]
pub struct CreateProductEntity {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: i32,
    pub image_url: String,
    pub category_id: Uuid,
    pub stock_quantity: i32,
    pub featured: bool,
}

/// Patch payload for products; absent fields keep their current value.
#[derive(AsChangeset, Deserialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::products)]
pub struct UpdateProductEntity {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<i32>,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub stock_quantity: Option<i32>,
    pub featured: Option<bool>,
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub shipping_address: String,
    pub status: String,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
pub struct CreateOrderEntity {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub shipping_address: String,
    pub status: String,
    pub total_amount: i64,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemEntity {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::order_items)]
pub struct CreateOrderItemEntity {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: i32,
}

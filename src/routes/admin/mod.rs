//! Back-office routes. Everything under `/admin` sits behind the bearer
//! token check; the sub-routers never apply it themselves.

pub mod categories;
pub mod orders;
pub mod products;

use utoipa_axum::router::OpenApiRouter;

use crate::{app_state::AppState, middleware};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/admin",
        OpenApiRouter::new()
            .merge(orders::routes_with_openapi())
            .merge(products::routes_with_openapi())
            .merge(categories::routes_with_openapi())
            .route_layer(axum::middleware::from_fn(middleware::admin_authorization)),
    )
}

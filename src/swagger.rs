use utoipa::openapi::{
    Components, OpenApi,
    security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

/// Mounts Swagger UI at `/swagger-ui`, serving the collected OpenAPI spec.
/// The `bearerAuth` scheme referenced by the admin routes is registered here.
pub fn create_swagger_ui(mut openapi: OpenApi) -> SwaggerUi {
    let components = openapi.components.get_or_insert(Components::new());
    components.add_security_scheme(
        "bearerAuth",
        SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
    );

    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi)
}

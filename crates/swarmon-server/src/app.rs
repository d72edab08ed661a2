use crate::state::AppState;
use crate::{api, logging};
use axum::http::HeaderValue;
use axum::middleware;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "swarmon API",
        description = "swarmon 传感器遥测与温度告警 REST API",
    ),
    tags(
        (name = "Health", description = "服务健康检查"),
        (name = "Sensors", description = "传感器读数上报与查询"),
        (name = "Alerts", description = "温度告警配置")
    )
)]
struct ApiDoc;

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn build_http_app(state: AppState) -> Router {
    let (router, api_spec) = api::routes().split_for_parts();

    let mut spec = ApiDoc::openapi();
    spec.merge(api_spec);

    let cors = cors_layer(&state.config.cors_allowed_origins);

    router
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/v1/openapi.json", spec))
        .layer(cors)
        .layer(middleware::from_fn(logging::request_logging))
}

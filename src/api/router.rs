use axum::{
    body::Body,
    http::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
    http::{HeaderName, Method, Request, Response},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    normalize_path::NormalizePathLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::api::{auth, content, feedback, handlers, rpc, storage, users};
use crate::core::{config::Settings, metrics, state::AppState};

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
const CORS_MAX_AGE: Duration = Duration::from_secs(60 * 60);

pub(crate) fn router(state: AppState) -> Router {
    let settings = state.settings();
    let mut app: Router<AppState> = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz).head(handlers::healthz))
        .nest(&settings.api().api_v1_str, api_v1());

    if settings.telemetry().prometheus_enabled {
        app = app.route("/metrics", get(handlers::metrics));
    }

    let trace = TraceLayer::new_for_http()
        .make_span_with(request_span)
        .on_response(|response: &Response<Body>, latency: Duration, _: &Span| {
            metrics::record_http_request(response.status().as_u16(), latency);
        });

    app.layer(NormalizePathLayer::trim_trailing_slash())
        .layer(PropagateRequestIdLayer::new(REQUEST_ID))
        .layer(SetRequestIdLayer::new(REQUEST_ID, MakeRequestUuid))
        .layer(trace)
        .layer(cors(settings))
        .with_state(state)
}

fn api_v1() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/rpc", rpc::router())
        .nest("/categories", content::categories::router())
        .nest("/difficulty-levels", content::difficulty_levels::router())
        .nest("/questions", content::questions::router())
        .nest("/feedback", feedback::tutor_router())
        .nest("/student-feedback", feedback::student_router())
        .nest("/storage", storage::router())
}

fn request_span<B>(request: &Request<B>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id
    )
}

fn cors(settings: &Settings) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT, ORIGIN, REQUEST_ID])
        .expose_headers([REQUEST_ID])
        .max_age(CORS_MAX_AGE);

    let origins: Vec<HeaderValue> = settings
        .cors()
        .origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    if origins.is_empty() {
        // credentials cannot be combined with a wildcard origin
        return layer.allow_origin(Any);
    }
    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

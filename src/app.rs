use axum::http::{HeaderName, Request};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::CorsSettings;
use crate::hosts::enforce_allowed_hosts;
use crate::routes;
use crate::state::AppState;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

fn cors_layer(cors: &CorsSettings) -> CorsLayer {
    if cors.allow_all_origins {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    }
}

pub fn build_router(state: AppState) -> Router {
    let settings = state.settings.clone();

    let trace_layer = TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
        let request_id = req
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!(
            "http",
            method = %req.method(),
            uri = %req.uri(),
            request_id = %request_id
        )
    });

    let api = Router::new()
        .route("/auth/register", post(routes::register))
        .route("/auth/token", post(routes::login))
        .route("/auth/token/refresh", post(routes::refresh))
        .route("/users", get(routes::list_users))
        .route("/users/me", get(routes::me))
        .route("/foods/search", get(routes::search_foods));

    let mut router = Router::new()
        .route("/health", get(routes::health))
        .nest("/api/v1", api);

    let static_files = &settings.static_files;
    let mount = static_files.mount_path();
    router = match static_files.dirs.first() {
        Some(dir) if settings.debug => router.nest_service(
            &mount,
            ServeDir::new(dir).fallback(ServeDir::new(&static_files.root)),
        ),
        _ => router.nest_service(&mount, ServeDir::new(&static_files.root)),
    };

    router
        .fallback(routes::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            enforce_allowed_hosts,
        ))
        .with_state(state)
        .layer(cors_layer(&settings.cors))
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
        .layer(trace_layer)
}

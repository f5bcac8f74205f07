use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState) -> Router {
    let hub_routes = Router::new()
        .route("/", get(handlers::actions::list_actions_handler))
        .route("/actions", get(handlers::actions::list_actions_handler))
        .route(
            "/actions/{name}",
            post(handlers::actions::execute_action_handler),
        )
        .route(
            "/actions/{name}/form",
            post(handlers::actions::action_form_handler),
        )
        .route(
            "/actions/{name}/oauth_check",
            post(handlers::actions::oauth_check_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_hub_token,
        ));

    let oauth_routes = Router::new()
        .route(
            "/actions/{name}/oauth",
            get(handlers::oauth::oauth_start_handler),
        )
        .route(
            "/actions/{name}/oauth/redirect",
            get(handlers::oauth::oauth_redirect_handler),
        );

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(oauth_routes)
        .merge(hub_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

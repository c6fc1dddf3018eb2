use axum::{Router, middleware};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    handler::{
        achievement::achievement_handler, admin::admin_handler, article::article_handler,
        auth::auth_handler, card::card_handler, comment::comment_handler,
        homepage::homepage_handler, member::member_handler, review::review_handler,
        upload::upload_handler,
    },
    middleware::{auth, role_check},
    models::UserRole,
};

pub fn create_router(app_state: AppState) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler(app_state.clone()))
        .nest("/articles", article_handler(app_state.clone()))
        .nest("/comments", comment_handler(app_state.clone()))
        .nest("/cards", card_handler())
        .nest("/v1/cards", review_handler(app_state.clone()))
        .nest("/members", member_handler(app_state.clone()))
        .nest("/achievements", achievement_handler())
        .nest("/homepage", homepage_handler())
        .nest("/uploads", upload_handler(app_state.clone()))
        .nest(
            "/admin",
            admin_handler()
                .layer(middleware::from_fn(|req, next| {
                    role_check(req, next, UserRole::Admin)
                }))
                .layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new()
        .nest("/api", api_route)
        // uploaded avatars and article images
        .nest_service("/static", ServeDir::new("static"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use crate::config::Config;
    use crate::db::DBClient;

    // axum panics at construction time on conflicting or malformed route
    // paths, so building the full router is the wiring check. The lazy
    // pool never connects.
    #[tokio::test]
    async fn full_router_wires_up_without_conflicts() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let app_state = AppState {
            env: Arc::new(Config {
                database_url: "postgres://localhost/unused".to_string(),
                jwt_secret: "test-secret".to_string(),
                jwt_maxage: 60,
                port: 8000,
                frontend_url: "http://localhost:3000".to_string(),
                upload_dir: "static/uploads".to_string(),
                admin_email: None,
                admin_code: None,
                elite_member_code: None,
                member_code: None,
            }),
            db_client: DBClient::new(pool),
        };

        let _router = create_router(app_state);
    }
}

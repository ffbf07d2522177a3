//! Cinelog API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Authentication and authorization
//! - Rate limiting
//! - Request routing
//! - Observability (logging, metrics)

mod extract;
mod handlers;
mod middleware;

use anyhow::Context;
use axum::{
    extract::FromRef,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use cinelog_common::{
    auth::JwtManager,
    catalog::{
        CatalogService, CatalogStore, InMemoryCatalogStore, QueryService, ReviewService,
        WishlistService,
    },
    config::{AppConfig, ObservabilityConfig},
    db::{DbPool, Repository},
    metrics,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn CatalogStore>,
    pub jwt: Arc<JwtManager>,
    pub reviews: ReviewService,
    pub queries: QueryService,
    pub wishlist: WishlistService,
    pub catalog: CatalogService,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn CatalogStore>) -> Self {
        let retry_budget = config.catalog.write_retry_budget();

        Self {
            jwt: Arc::new(JwtManager::new(
                &config.auth.jwt_secret,
                config.auth.jwt_expiration_secs,
            )),
            reviews: ReviewService::new(store.clone(), retry_budget),
            queries: QueryService::new(store.clone(), &config.catalog),
            wishlist: WishlistService::new(store.clone()),
            catalog: CatalogService::new(store.clone(), retry_budget),
            store,
            config,
        }
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting Cinelog API Gateway v{}",
        cinelog_common::VERSION
    );

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        install_metrics_exporter(config.observability.metrics_port)?;
    }
    metrics::register_metrics();

    let store = build_store(&config).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host / server.port")?;

    // Create app state
    let state = AppState::new(Arc::new(config), store);

    // Build the router
    let app = create_router(state)?;

    // Start the server
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            metrics::LATENCY_BUCKETS,
        )?
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Pick the catalogue backend from `database.url`
async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn CatalogStore>> {
    if config.uses_memory_store() {
        warn!("Using the in-memory catalogue store; data is lost on shutdown");
        return Ok(Arc::new(InMemoryCatalogStore::new()));
    }

    let pool = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        pool.run_migrations().await?;
    }

    Ok(Arc::new(Repository::new(pool)))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

/// Create the main application router
fn create_router(state: AppState) -> cinelog_common::Result<Router> {
    let config = state.config.clone();

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Movie endpoints
        .route(
            "/movies",
            get(handlers::movies::list_movies).post(handlers::movies::create_movie),
        )
        .route("/movies/new", get(handlers::movies::newest_movies))
        .route("/movies/top", get(handlers::movies::top_movies))
        .route("/movies/random", get(handlers::movies::random_movies))
        .route("/movies/report", get(handlers::movies::release_report))
        .route(
            "/movies/{id}",
            get(handlers::movies::get_movie)
                .put(handlers::movies::update_movie)
                .delete(handlers::movies::delete_movie),
        )

        // Review endpoints
        .route(
            "/movies/reviews",
            get(handlers::reviews::list_reviews).delete(handlers::reviews::delete_review),
        )
        .route("/movies/{id}/reviews", post(handlers::reviews::submit_review))

        // Wishlist endpoints
        .route(
            "/users/wishlist",
            get(handlers::wishlist::list_wishlist).post(handlers::wishlist::add_to_wishlist),
        )
        .route(
            "/users/wishlist/{movie_id}",
            delete(handlers::wishlist::remove_from_wishlist),
        )

        // Genre endpoints
        .route(
            "/genres",
            get(handlers::genres::list_genres).post(handlers::genres::create_genre),
        )
        .route("/genres/{id}", delete(handlers::genres::delete_genre))
        .route_layer(from_fn(middleware::metrics::track_metrics));

    // Compose the app
    let mut app = Router::new().nest("/api", api_routes);

    if config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(&config.rate_limit)?;
        app = app.layer(from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    Ok(app
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.server.cors_origins))
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    struct TestApp {
        router: Router,
        state: AppState,
    }

    impl TestApp {
        fn new() -> Self {
            let mut config = AppConfig::default();
            config.rate_limit.enabled = false;
            config.auth.jwt_secret = "router-test-secret".to_string();

            let state = AppState::new(Arc::new(config), Arc::new(InMemoryCatalogStore::new()));
            let router = create_router(state.clone()).unwrap();
            Self { router, state }
        }

        fn token(&self, username: &str, is_admin: bool) -> String {
            self.state
                .jwt
                .generate_token(Uuid::new_v4(), username, is_admin)
                .unwrap()
        }

        async fn call(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, value)
        }

        /// Send a body without a JSON content type
        async fn send_raw(
            &self,
            method: &str,
            uri: &str,
            token: &str,
            body: &'static str,
        ) -> (StatusCode, Value) {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(body))
                .unwrap();

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
        }

        /// Create a genre and a movie in it, returning the movie id
        async fn seed_movie(&self, admin: &str, name: &str) -> String {
            let (_, genres) = self.call("GET", "/api/genres", None, None).await;
            let genre_id = match genres.as_array().and_then(|g| g.first()) {
                Some(genre) => genre["id"].as_str().unwrap().to_string(),
                None => {
                    let (status, genre) = self
                        .call("POST", "/api/genres", Some(admin), Some(json!({"name": "Thriller"})))
                        .await;
                    assert_eq!(status, StatusCode::CREATED);
                    genre["id"].as_str().unwrap().to_string()
                }
            };

            let (status, movie) = self
                .call(
                    "POST",
                    "/api/movies",
                    Some(admin),
                    Some(json!({
                        "name": name,
                        "year": 2023,
                        "releaseDate": "2023-01-15",
                        "detail": "A tense story",
                        "genre": genre_id,
                        "cast": ["Lead Actor"],
                        "streamingLink": "https://stream.example/watch",
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{movie}");
            assert_eq!(movie["numReviews"], 0);
            movie["id"].as_str().unwrap().to_string()
        }
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = TestApp::new();

        let (status, body) = app.call("GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = app.call("GET", "/api/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"]["store"]["status"], "up");
    }

    #[tokio::test]
    async fn test_admin_routes_require_admin() {
        let app = TestApp::new();
        let viewer = app.token("viewer", false);

        let (status, body) = app.call("POST", "/api/movies", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, _) = app.call("POST", "/api/movies", Some(&viewer), Some(json!({}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app.call("GET", "/api/movies/report", Some("not-a-jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_review_flow_status_codes() {
        let app = TestApp::new();
        let admin = app.token("admin", true);
        let alice = app.token("alice", false);
        let movie_id = app.seed_movie(&admin, "Heat").await;
        let reviews = format!("/api/movies/{movie_id}/reviews");

        // Admins may not review, whatever the body says
        let (status, body) = app
            .call("POST", &reviews, Some(&admin), Some(json!({"rating": 99})))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "ADMIN_REVIEW");

        let (status, body) = app.send_raw("POST", &reviews, &admin, "rating=5").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "ADMIN_REVIEW");

        let (status, body) = app.send_raw("POST", &reviews, &alice, "rating=5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, _) = app
            .call("POST", &reviews, Some(&alice), Some(json!({"rating": 6, "comment": "x"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .call("POST", &reviews, Some(&alice), Some(json!({"comment": "no rating"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .call("POST", &reviews, Some(&alice), Some(json!({"rating": 4, "comment": "Great"})))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Review added");

        let (status, body) = app
            .call("POST", &reviews, Some(&alice), Some(json!({"rating": 2, "comment": "Again"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "ALREADY_REVIEWED");

        let missing = format!("/api/movies/{}/reviews", Uuid::new_v4());
        let (status, _) = app
            .call("POST", &missing, Some(&alice), Some(json!({"rating": 3, "comment": "?"})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, movie) = app
            .call("GET", &format!("/api/movies/{movie_id}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(movie["numReviews"], 1);
        assert_eq!(movie["rating"], 4.0);
        assert_eq!(movie["reviews"][0]["name"], "alice");
        assert_eq!(movie["genre"]["name"], "Thriller");
    }

    #[tokio::test]
    async fn test_review_moderation() {
        let app = TestApp::new();
        let admin = app.token("admin", true);
        let movie_id = app.seed_movie(&admin, "Alien").await;

        for (name, stars) in [("a", 5), ("b", 3)] {
            let token = app.token(name, false);
            let (status, _) = app
                .call(
                    "POST",
                    &format!("/api/movies/{movie_id}/reviews"),
                    Some(&token),
                    Some(json!({"rating": stars, "comment": "ok"})),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, listings) = app.call("GET", "/api/movies/reviews", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let listings = listings.as_array().unwrap().clone();
        assert_eq!(listings.len(), 2);

        let three = listings.iter().find(|l| l["rating"] == 3).unwrap();
        let (status, _) = app
            .call(
                "DELETE",
                "/api/movies/reviews",
                Some(&admin),
                Some(json!({"movieId": movie_id, "reviewId": three["id"]})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .call(
                "DELETE",
                "/api/movies/reviews",
                Some(&admin),
                Some(json!({"movieId": movie_id, "reviewId": three["id"]})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, movie) = app.call("GET", &format!("/api/movies/{movie_id}"), None, None).await;
        assert_eq!(movie["numReviews"], 1);
        assert_eq!(movie["rating"], 5.0);
    }

    #[tokio::test]
    async fn test_wishlist_routes() {
        let app = TestApp::new();
        let admin = app.token("admin", true);
        let bob = app.token("bob", false);
        let movie_id = app.seed_movie(&admin, "Up").await;
        let body = json!({"movieId": movie_id});

        let (status, _) = app.call("GET", "/api/users/wishlist", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .call("POST", "/api/users/wishlist", Some(&bob), Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = app
            .call("POST", "/api/users/wishlist", Some(&bob), Some(body))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, list) = app.call("GET", "/api/users/wishlist", Some(&bob), None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let remove = format!("/api/users/wishlist/{movie_id}");
        let (status, _) = app.call("DELETE", &remove, Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.call("DELETE", &remove, Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .call(
                "POST",
                "/api/users/wishlist",
                Some(&bob),
                Some(json!({"movieId": Uuid::new_v4()})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_listings_and_report() {
        let app = TestApp::new();
        let admin = app.token("admin", true);
        app.seed_movie(&admin, "One").await;
        app.seed_movie(&admin, "Two").await;

        let (status, newest) = app.call("GET", "/api/movies/new?limit=1", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(newest.as_array().unwrap().len(), 1);

        let (status, _) = app.call("GET", "/api/movies/top?limit=0", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, random) = app.call("GET", "/api/movies/random", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(random.as_array().unwrap().len(), 2);

        let (status, found) = app.call("GET", "/api/movies?search=tw", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found[0]["name"], "Two");

        let (status, report) = app.call("GET", "/api/movies/report", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report[0]["year"], 2023);
        assert_eq!(report[0]["month"], 1);
        assert_eq!(report[0]["count"], 2);
    }

    #[tokio::test]
    async fn test_movie_lifecycle_routes() {
        let app = TestApp::new();
        let admin = app.token("admin", true);
        let movie_id = app.seed_movie(&admin, "Draft").await;
        let path = format!("/api/movies/{movie_id}");

        let (status, updated) = app
            .call(
                "PUT",
                &path,
                Some(&admin),
                Some(json!({"name": "Final Cut", "rating": 5, "numReviews": 40})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Final Cut");
        assert_eq!(updated["numReviews"], 0);
        assert_eq!(updated["rating"], 0.0);

        let (status, _) = app.call("DELETE", &path, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = app.call("GET", &path, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "MOVIE_NOT_FOUND");

        let (status, _) = app.call("GET", "/api/movies/not-a-uuid", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

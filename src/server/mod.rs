pub mod config;
pub mod middleware;

use crate::{
    config::Config,
    database::{DatabaseManager, DatabaseManagerImpl, SubscriptionStore},
    error::AppError,
    routes::{create_docs_routes, create_health_routes, create_subscription_routes},
    server::middleware::{request_id_middleware, request_response_logger, request_timeout},
    shutdown::{DatabaseShutdown, ShutdownCoordinator, ShutdownManager},
};
use axum::{Router, middleware::from_fn, middleware::from_fn_with_state};
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, task::JoinHandle, time::timeout};
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct Server {
    pub config: Arc<Config>,
    pub database: Arc<dyn DatabaseManager>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub shutdown_coordinator: Arc<ShutdownCoordinator>,
}

impl Server {
    /// Open the connection pool and wire the subscription store to it
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let database_impl = DatabaseManagerImpl::new_from_config(&config.database)
            .await
            .map_err(AppError::Database)?;
        info!(
            max_connections = config.database.max_connections,
            "Database connection pool ready"
        );

        let subscriptions: Arc<dyn SubscriptionStore> = Arc::new(database_impl.subscriptions());
        let database: Arc<dyn DatabaseManager> = Arc::new(database_impl);

        Ok(Self::from_parts(config, database, subscriptions))
    }

    /// Assemble a server from already constructed collaborators
    pub fn from_parts(
        config: Config,
        database: Arc<dyn DatabaseManager>,
        subscriptions: Arc<dyn SubscriptionStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            database,
            subscriptions,
            shutdown_coordinator: Arc::new(ShutdownCoordinator::new()),
        }
    }

    /// Migrate, bind the configured address, and serve until SIGINT/SIGTERM
    pub async fn run(&self) -> Result<(), AppError> {
        if self.config.database.migration_on_startup {
            self.database.migrate().await.map_err(AppError::Database)?;
        }

        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

        let shutdown_coordinator = self.shutdown_coordinator.clone();
        tokio::spawn(async move {
            shutdown_coordinator.wait_for_shutdown_signal().await;
        });

        self.serve(listener).await
    }

    /// Serve on `listener` until shutdown is initiated
    ///
    /// In-flight requests get `server.shutdown_grace_secs` to finish before
    /// the server task is aborted. The pool is closed only after serving
    /// has stopped.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), AppError> {
        match listener.local_addr() {
            Ok(addr) => info!("Server listening on http://{}", addr),
            Err(e) => warn!("Could not read listener address: {}", e),
        }

        let app = self.create_app();
        let shutdown_coordinator = self.shutdown_coordinator.clone();
        let mut server_task: JoinHandle<std::io::Result<()>> = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_coordinator.wait_for_shutdown().await;
                    info!("Graceful shutdown initiated");
                })
                .await
        });

        let outcome = tokio::select! {
            result = &mut server_task => Self::serve_outcome(result),
            _ = self.shutdown_coordinator.wait_for_shutdown() => {
                let grace = Duration::from_secs(self.config.server.shutdown_grace_secs);
                match timeout(grace, &mut server_task).await {
                    Ok(result) => Self::serve_outcome(result),
                    Err(_) => {
                        warn!(
                            grace_secs = grace.as_secs(),
                            "In-flight requests did not finish in time, forcing shutdown"
                        );
                        server_task.abort();
                        Ok(())
                    }
                }
            }
        };

        let mut shutdown_manager =
            ShutdownManager::new(Duration::from_secs(self.config.server.shutdown_grace_secs));
        shutdown_manager.register(DatabaseShutdown::new(self.database.clone()));
        shutdown_manager.shutdown_all().await;

        info!("Server shutdown complete");
        outcome
    }

    fn serve_outcome(
        result: Result<std::io::Result<()>, tokio::task::JoinError>,
    ) -> Result<(), AppError> {
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!("Server error: {}", e);
                Err(AppError::Internal(format!("Server error: {}", e)))
            }
            Err(e) => {
                error!("Server task failed: {}", e);
                Err(AppError::Internal(format!("Server task failed: {}", e)))
            }
        }
    }

    fn subscription_routes(&self) -> Router {
        create_subscription_routes().with_state(self.subscriptions.clone())
    }

    /// Creates an application router
    pub fn create_app(&self) -> Router {
        let mut app = Router::new()
            .merge(create_health_routes())
            .merge(create_docs_routes())
            .merge(self.subscription_routes())
            .layer(from_fn_with_state(
                Duration::from_secs(self.config.server.request_timeout_secs),
                request_timeout,
            ));

        if self.config.logging.log_request {
            app = app.layer(from_fn(request_response_logger));
        }

        // Outermost, so the logger and handlers see the id
        app.layer(from_fn(request_id_middleware))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{database::mock::MockSubscriptionStore, test_utils::TestServerBuilder};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn get(app: Router, uri: &str) -> axum::response::Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_health_and_request_id() {
        let server = TestServerBuilder::new().build().await;

        let response = get(server.create_app(), "/healthz").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_subscription_routes_mounted() {
        let server = TestServerBuilder::new().build().await;

        let response = get(server.create_app(), "/subscriptions").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get(server.create_app(), "/subscriptions/").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get(server.create_app(), "/swagger/openapi.json").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_config_is_kept() {
        let mut config = Config::default();
        config.server.port = 18080;
        config.server.request_timeout_secs = 7;
        let server = TestServerBuilder::new().with_config(config).build().await;

        assert_eq!(server.config.server.port, 18080);
        assert_eq!(server.config.server.request_timeout_secs, 7);
        assert_eq!(
            server.config.database.url.as_deref(),
            Some("sqlite::memory:")
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let server = TestServerBuilder::new().build().await;
        let response = get(server.create_app(), "/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_custom_store_is_served() {
        let server = TestServerBuilder::new()
            .with_store(Arc::new(MockSubscriptionStore::failing()))
            .build()
            .await;

        let response = get(server.create_app(), "/subscriptions/").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_serve_stops_and_closes_pool() {
        let server = TestServerBuilder::new().build().await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let serving = {
            let server = server.clone();
            tokio::spawn(async move { server.serve(listener).await })
        };

        server.shutdown_coordinator.initiate_shutdown();
        let result = timeout(Duration::from_secs(10), serving)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert!(server.database.health_check().await.is_err());
    }
}

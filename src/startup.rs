//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{middleware, Router};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;

use crate::application::services::{
    AuthServiceImpl, FileServiceImpl, PasswordHasher, UserServiceImpl,
};
use crate::config::{CacheBackend, Settings, StorageBackend};
use crate::domain::{ErrorLog, File, FileStorage, Repository, User};
use crate::infrastructure::cache::{self, MemoryCache, ResponseStore};
use crate::infrastructure::database;
use crate::infrastructure::repositories::{InMemoryRepository, PgRepository};
use crate::infrastructure::storage::LocalFileStorage;
use crate::presentation::http::{create_router, handlers::health};
use crate::presentation::middleware::{
    create_cors_layer, create_trace_layer, expose_error_details, RateLimiter,
};
use crate::shared::jwt::JwtCodec;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn Repository<User>>,
    pub files: Arc<dyn Repository<File>>,
    pub error_logs: Arc<dyn Repository<ErrorLog>>,
    pub storage: Arc<dyn FileStorage>,
    /// Present for the postgres backend
    pub db: Option<PgPool>,
    /// Response cache; absent for the Redis backend without a reachable URL
    pub cache: Option<Arc<dyn ResponseStore>>,
    pub jwt: Arc<JwtCodec>,
    pub hasher: PasswordHasher,
    pub rate_limiter: Arc<RateLimiter>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Connect the configured backends and build shared state.
    pub async fn build(settings: Settings) -> Result<Self> {
        let (users, files, error_logs, db): (
            Arc<dyn Repository<User>>,
            Arc<dyn Repository<File>>,
            Arc<dyn Repository<ErrorLog>>,
            Option<PgPool>,
        ) = match settings.database.backend {
            StorageBackend::Postgres => {
                let pool = database::create_pool(&settings.database)
                    .await
                    .context("failed to connect to Postgres")?;
                if settings.database.run_migrations {
                    database::run_migrations(&pool)
                        .await
                        .context("failed to run migrations")?;
                    tracing::info!("Database migrations applied");
                }
                (
                    Arc::new(PgRepository::<User>::new(pool.clone())),
                    Arc::new(PgRepository::<File>::new(pool.clone())),
                    Arc::new(PgRepository::<ErrorLog>::new(pool.clone())),
                    Some(pool),
                )
            }
            StorageBackend::Memory => {
                tracing::warn!("Using the in-memory backend; data is lost on restart");
                (
                    Arc::new(InMemoryRepository::<User>::new()),
                    Arc::new(InMemoryRepository::<File>::new()),
                    Arc::new(InMemoryRepository::<ErrorLog>::new()),
                    None,
                )
            }
        };

        let cache: Option<Arc<dyn ResponseStore>> = match settings.cache.backend {
            CacheBackend::Memory => {
                tracing::info!("Using the in-process response cache");
                Some(Arc::new(MemoryCache::new()))
            }
            CacheBackend::Redis => match settings.redis.url.as_deref() {
                Some(url) => match cache::create_redis_cache(url).await {
                    Ok(cache) => Some(Arc::new(cache)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Redis unavailable; response caching disabled");
                        None
                    }
                },
                None => {
                    tracing::info!("Redis not configured; response caching disabled");
                    None
                }
            },
        };

        let storage = LocalFileStorage::init(settings.uploads.dir.clone())
            .await
            .context("failed to create uploads directory")?;

        let hasher = PasswordHasher::new(&settings.password)?;

        Ok(Self {
            users,
            files,
            error_logs,
            storage: Arc::new(storage),
            db,
            cache,
            jwt: Arc::new(JwtCodec::new(&settings.jwt)),
            hasher,
            rate_limiter: Arc::new(RateLimiter::new(&settings.rate_limit)),
            settings: Arc::new(settings),
        })
    }

    pub fn user_service(&self) -> UserServiceImpl {
        UserServiceImpl::new(self.users.clone(), self.hasher.clone())
    }

    pub fn auth_service(&self) -> AuthServiceImpl {
        AuthServiceImpl::new(
            self.users.clone(),
            Arc::new(self.user_service()),
            self.hasher.clone(),
            self.jwt.clone(),
            !self.settings.is_production(),
        )
    }

    pub fn file_service(&self) -> FileServiceImpl {
        FileServiceImpl::new(self.files.clone(), self.storage.clone())
    }
}

/// Full router with the cross-cutting layers applied.
pub fn build_router(state: AppState) -> Router {
    let settings = state.settings.clone();

    let mut router = create_router(state);
    if !settings.is_production() {
        router = router.layer(middleware::map_response(expose_error_details));
    }

    router
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            settings.server.request_timeout_secs,
        )))
        .layer(create_cors_layer(&settings.cors))
        .layer(create_trace_layer())
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        let addr = settings.server_addr();
        let state = AppState::build(settings).await?;
        let router = build_router(state);

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until Ctrl-C or SIGTERM
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

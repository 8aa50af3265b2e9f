//! 配送平台管理后台服务
//!
//! 提供通知管理与触发发送等 REST API。

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use delivery_admin_service::{routes, state::AppState};
use delivery_shared::{
    config::AppConfig,
    database::Database,
    observability::{self, middleware as obs_middleware},
    pubsub::RedisClient,
};
use notification_fanout::{
    AudienceResolver, FanoutDispatcher, FanoutOrchestrator,
    channels::{RedisRealtimeChannel, push_channel_from_config},
    repository::{PgDeliveryLogStore, PgNotificationRepository, PgOperationalErrorLog, pg_directories},
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

const SERVICE_NAME: &str = "delivery-admin-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME)?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting {} on {}", SERVICE_NAME, config.server_addr());

    // 初始化基础设施
    let db = Database::connect(&config.database).await?;
    db.run_migrations().await?;
    let redis = RedisClient::new(&config.redis)?;

    // 组装扇出引擎：PostgreSQL 仓储 + 推送网关 + Redis 实时频道
    let notifications = Arc::new(PgNotificationRepository::new(db.pool().clone()));
    let delivery_logs = Arc::new(PgDeliveryLogStore::new(db.pool().clone()));
    let error_log = Arc::new(PgOperationalErrorLog::new(db.pool().clone(), SERVICE_NAME));

    let push = push_channel_from_config(&config.fanout.push)?;
    let realtime = Arc::new(RedisRealtimeChannel::new(
        redis.clone(),
        config.fanout.realtime.channel_prefix.clone(),
    ));

    let resolver = Arc::new(AudienceResolver::new(pg_directories(db.pool().clone())));
    let dispatcher = Arc::new(FanoutDispatcher::new(
        delivery_logs.clone(),
        push,
        realtime,
        &config.fanout,
    ));
    let orchestrator = Arc::new(FanoutOrchestrator::new(
        notifications.clone(),
        resolver,
        dispatcher,
        error_log,
    ));

    info!(
        admin_channel_id = %config.fanout.admin_channel_id,
        failure_policy = ?config.fanout.failure_policy,
        "Notification fan-out engine initialized"
    );

    let state = AppState::new(notifications, delivery_logs, orchestrator);

    let app = Router::new()
        .nest("/api/admin", routes::api_routes())
        .route("/health", get(health_check))
        .route(
            "/ready",
            get({
                let db_for_ready = db.clone();
                let redis_for_ready = redis;
                move || readiness_check(db_for_ready.clone(), redis_for_ready.clone())
            }),
        )
        .layer(middleware::from_fn(security_headers))
        .layer(build_cors(config.is_production()))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：停止接收新连接并等待已有请求处理完毕；
    // 已受理的后台扇出任务不会被等待
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// CORS 配置：通过 DELIVERY_CORS_ORIGINS 环境变量控制允许的来源
fn build_cors(is_production: bool) -> CorsLayer {
    let allowed_origins = std::env::var("DELIVERY_CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3001,http://localhost:5173".to_string());

    if allowed_origins == "*" {
        if is_production {
            warn!("DELIVERY_CORS_ORIGINS=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        info!("CORS allowed_origins: * (all origins)");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        info!("CORS allowed_origins: {}", allowed_origins);
        let origins: Vec<_> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// 为所有响应注入 HTTP 安全头
async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert("x-xss-protection", HeaderValue::from_static("0"));
    response
}

/// 监听关闭信号（SIGTERM 或 Ctrl+C）
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("注册 Ctrl+C 处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("注册 SIGTERM 处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

/// 存活探针
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

/// 就绪探针：检查数据库和 Redis 连接是否可用
async fn readiness_check(db: Database, redis: RedisClient) -> Json<serde_json::Value> {
    let db_ok = db.health_check().await.is_ok();
    let redis_ok = redis.health_check().await.is_ok();
    let all_ok = db_ok && redis_ok;

    Json(serde_json::json!({
        "status": if all_ok { "ok" } else { "degraded" },
        "service": SERVICE_NAME,
        "checks": {
            "database": if db_ok { "ok" } else { "fail" },
            "redis": if redis_ok { "ok" } else { "fail" }
        },
        "pool": db.stats()
    }))
}

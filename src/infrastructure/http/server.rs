//! HTTP Server
//!
//! 组装路由与中间件，并托管 ReconcileWorker：
//! 服务停止后释放 AppState，等待 Worker 写完队列中剩余的生成结果

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::middleware::error_logging_middleware;
use super::routes::create_routes;
use super::state::AppState;
use crate::infrastructure::worker::ReconcileWorker;

/// 服务器运行参数
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 请求体上限（字节），接口只收 JSON
    pub body_limit: usize,
    /// 关闭时等待回写队列清空的最长时间
    pub drain_timeout: Duration,
}

impl ServerConfig {
    pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024;
    pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            body_limit: Self::DEFAULT_BODY_LIMIT,
            drain_timeout: Self::DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// HTTP 服务器
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
    worker: Option<ReconcileWorker>,
}

impl HttpServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
            worker: None,
        }
    }

    /// 由服务器负责启动和收尾的回写 Worker
    ///
    /// 它的 Handle 应当已经放进 AppState，否则 Worker 永远不会收到消息
    pub fn with_reconcile_worker(mut self, worker: ReconcileWorker) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .max_age(Duration::from_secs(3600));

        create_routes()
            .layer(DefaultBodyLimit::max(self.config.body_limit))
            .layer(middleware::from_fn(error_logging_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// 绑定配置中的地址并运行，直到 `shutdown_signal` 完成
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.addr()).await?;
        self.serve(listener, shutdown_signal).await
    }

    /// 在已绑定的 listener 上运行
    pub async fn serve<F>(self, listener: TcpListener, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        let local_addr: SocketAddr = listener.local_addr()?;
        let Self { config, state, worker } = self;

        let worker_task = worker.map(|worker| tokio::spawn(worker.run()));

        tracing::info!(
            addr = %local_addr,
            body_limit = config.body_limit,
            "HTTP server listening"
        );

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await;

        tracing::info!(addr = %local_addr, "HTTP server stopped accepting requests");

        // 路由已随 serve 释放；这里丢掉最后一份 AppState，后台生成任务结束后队列关闭
        drop(state);
        if let Some(task) = worker_task {
            drain_reconcile_worker(task, config.drain_timeout).await;
        }

        served
    }
}

async fn drain_reconcile_worker(task: JoinHandle<()>, timeout: Duration) {
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(())) => tracing::info!("Reconcile queue drained"),
        Ok(Err(e)) => tracing::warn!(error = %e, "Reconcile worker ended abnormally"),
        Err(_) => tracing::warn!(
            timeout_secs = timeout.as_secs(),
            "Reconcile queue not drained before timeout, pending assets dropped"
        ),
    }
}

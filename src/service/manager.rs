//! 服务管理器模块 - 负责管理多个服务的生命周期

use super::HttpRouterService;
use crate::service::trace::http_trace_layer;
use anyhow::Result;
use axum::Router;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use url::Url;
use veilink_common::VeilinkConfig;

/// 服务管理器，负责管理多个服务的生命周期
#[derive(Debug)]
pub struct ServiceManager {
    services: Vec<Box<dyn HttpRouterService>>,
    shutdown_tx: tokio::sync::broadcast::Sender<()>,
    config: VeilinkConfig,
}

impl ServiceManager {
    /// 创建新的服务管理器
    pub fn new(config: VeilinkConfig, shutdown_tx: tokio::sync::broadcast::Sender<()>) -> Self {
        Self {
            services: Vec::new(),
            shutdown_tx,
            config,
        }
    }

    /// 添加服务到管理器
    pub fn add_service(&mut self, service: Box<dyn HttpRouterService>) {
        info!("Adding service '{}' to manager", service.info().name);
        self.services.push(service);
    }

    /// 构建合并后的路由器（包含追踪与 CORS 中间件）
    pub async fn build_app(&mut self) -> Result<Router> {
        let mut app = Router::new();

        for service in &mut self.services {
            let service_name = service.info().name.clone();
            let router = service.build_router().await.map_err(|e| {
                error!(
                    "Failed to build router for service '{}': {:?}",
                    service_name, e
                );
                e
            })?;
            app = app.merge(router);
        }

        // 添加全局中间件层
        Ok(app
            .layer(http_trace_layer())
            .layer(CorsLayer::permissive()))
    }

    /// 启动所有服务
    ///
    /// 所有路由合并到 `bind.http` 指定的地址上；任一服务构建失败则整体失败。
    pub async fn start_all(&mut self) -> Result<JoinHandle<()>> {
        info!(
            "Starting {} HTTP route services (environment: {})",
            self.services.len(),
            self.config.env
        );

        let app = self.build_app().await?;

        let addr = self
            .config
            .bind
            .http
            .socket_addr()
            .map_err(|e| anyhow::anyhow!(e))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to address '{addr}': {e}"))?;
        let local_addr = listener.local_addr()?;
        info!("HTTP server listening on {}", local_addr);

        let base_url = match self.config.public_base_url() {
            Some(public) => Url::parse(&public)?,
            None => Url::parse(&format!("http://{local_addr}"))?,
        };
        for service in &mut self.services {
            if let Err(e) = service.on_start(base_url.clone()).await {
                error!("Failed to start service '{}': {:?}", service.info().name, e);
            }
        }

        let shutdown_tx = self.shutdown_tx.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            let server = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("HTTP server received shutdown signal");
            });
            if let Err(e) = server.await {
                error!("HTTP server error: {}", e);
                let _ = shutdown_tx.send(());
            }
            info!("HTTP server stopped");
        });

        Ok(handle)
    }

    /// Stop all services
    pub async fn stop_all(&mut self) -> Result<()> {
        info!("Stopping all services");

        let _ = self.shutdown_tx.send(());
        for service in &mut self.services {
            service.on_stop().await?;
        }

        info!("All services stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::RelayHttpService;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn test_config() -> VeilinkConfig {
        VeilinkConfig {
            secret: Some("manager-test-secret".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_build_app_serves_relay_routes() {
        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
        let config = test_config();
        let mut manager = ServiceManager::new(config.clone(), shutdown_tx);
        manager.add_service(Box::new(RelayHttpService::new(config)));

        let app = manager.build_app().await.unwrap();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "healthy");
    }

    #[tokio::test]
    async fn test_missing_secret_fails_startup() {
        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
        let config = VeilinkConfig {
            secret_env: Some("VEILINK_MANAGER_TEST_UNSET_SECRET".to_string()),
            ..Default::default()
        };
        let mut manager = ServiceManager::new(config.clone(), shutdown_tx);
        manager.add_service(Box::new(RelayHttpService::new(config)));

        assert!(manager.build_app().await.is_err());
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
        let mut config = test_config();
        config.bind.http.ip = "127.0.0.1".to_string();
        config.bind.http.port = 0;
        let mut manager = ServiceManager::new(config.clone(), shutdown_tx);
        manager.add_service(Box::new(RelayHttpService::new(config)));

        let handle = manager.start_all().await.unwrap();
        assert!(manager.services[0].info().is_running());

        manager.stop_all().await.unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}

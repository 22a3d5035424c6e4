//! veilink 主程序
//!
//! 加载配置、初始化日志，启动短链接发放与中继服务

mod cli;
mod error;
mod observability;
mod process;

use clap::Parser;
use observability::init_observability;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use veilink::{RelayHttpService, ServiceManager, VeilinkConfig};

macro_rules! bootstrap_info {
    ($($arg:tt)*) => {
        println!($($arg)*);
    };
}

macro_rules! bootstrap_error {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

use cli::{Cli, Commands};
use error::{Error, Result};

/// Application launcher utilities
struct ApplicationLauncher;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Test { config_file }) => {
            let config_path =
                ApplicationLauncher::find_config_file(config_file.as_ref().unwrap_or(&cli.config))?
                    .ok_or_else(|| {
                        Error::custom(
                            "No configuration file found. Please create one or specify path with --config",
                        )
                    })?;
            ApplicationLauncher::test_config_file(&config_path)
        }
        Some(Commands::Keygen) => {
            println!("{}", token::generate_secret());
            Ok(())
        }
        None => {
            let config_path = ApplicationLauncher::find_config_file(&cli.config)?;

            // Create Tokio runtime（before running the application）
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;

            // Run the asynchronous application
            runtime.block_on(ApplicationLauncher::run_application(config_path.as_deref()))
        }
    }
}

impl ApplicationLauncher {
    /// Find config file with fallback locations
    ///
    /// 显式指定的路径必须存在；默认位置都找不到时返回 None，由调用方决定是否使用默认配置。
    fn find_config_file(provided_path: &PathBuf) -> Result<Option<PathBuf>> {
        if provided_path != Path::new("config.toml") {
            if provided_path.exists() {
                bootstrap_info!("Using provided config file: {:?}", provided_path);
                return Ok(Some(provided_path.clone()));
            } else {
                bootstrap_error!("Provided config file not found: {:?}", provided_path);
                return Err(Error::custom(format!(
                    "Config file not found: {provided_path:?}"
                )));
            }
        }

        let fallback_paths = [
            // 1. Current working directory
            PathBuf::from("config.toml"),
            // 2. System config directory
            PathBuf::from("/etc/veilink/config.toml"),
        ];

        bootstrap_info!("Searching for config file in default locations...");

        for path in &fallback_paths {
            if path.exists() {
                bootstrap_info!("Found config file: {:?}", path);
                return Ok(Some(path.clone()));
            } else {
                bootstrap_info!("Config not found at: {:?}", path);
            }
        }

        Ok(None)
    }

    /// 测试配置文件是否有效
    fn test_config_file(config_path: &Path) -> Result<()> {
        // Initialize basic logging for test command
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();

        match VeilinkConfig::from_file(config_path) {
            Ok(config) => {
                info!("✅ 配置文件解析成功: {:?}", config_path);

                match config.validate() {
                    Ok(()) => {
                        info!("✅ 配置验证通过");
                    }
                    Err(errors) => {
                        error!("❌ 配置验证发现问题:");
                        for (i, err) in errors.iter().enumerate() {
                            if err.starts_with("Warning:") {
                                info!("  {}. ⚠️  {}", i + 1, err);
                            } else {
                                error!("  {}. ❌ {}", i + 1, err);
                            }
                        }
                        let has_errors = errors.iter().any(|e| !e.starts_with("Warning:"));
                        if has_errors {
                            return Err(Error::service_validation("配置验证失败".to_string()));
                        }
                    }
                }

                info!("🔑 secret 来源: {}", config.secret_source());
                info!("✅ 完整配置验证通过");
                Ok(())
            }
            Err(e) => {
                error!("❌ 配置文件解析失败: {}", e);
                Err(Error::service_validation(format!("配置解析失败: {e}")))
            }
        }
    }

    /// 加载配置：文件（可选）+ 环境变量覆盖 + 校验
    fn load_config(config_path: Option<&Path>) -> Result<VeilinkConfig> {
        let mut config = match config_path {
            Some(path) => {
                bootstrap_info!("📄 加载配置文件: {:?}", path);
                let config = VeilinkConfig::from_file(path).map_err(|e| {
                    bootstrap_error!("❌ 配置加载失败: {}", e);
                    Error::custom(format!("配置加载失败: {e}"))
                })?;
                bootstrap_info!("✅ 配置加载成功");
                config
            }
            None => {
                bootstrap_info!("No configuration file found, using defaults and environment");
                VeilinkConfig::default()
            }
        };

        config.apply_env_overrides()?;

        if let Err(errors) = config.validate() {
            bootstrap_error!("❌ 配置验证发现问题:");
            let mut has_critical_errors = false;
            for (i, err) in errors.iter().enumerate() {
                if err.starts_with("Warning:") {
                    bootstrap_info!("  {}. ⚠️  {}", i + 1, err);
                } else {
                    bootstrap_error!("  {}. ❌ {}", i + 1, err);
                    has_critical_errors = true;
                }
            }
            if has_critical_errors {
                return Err(Error::custom("配置验证失败，请修复上述错误".to_string()));
            }
        }

        Ok(config)
    }

    /// 运行应用程序的主入口
    async fn run_application(config_path: Option<&Path>) -> Result<()> {
        let config = Self::load_config(config_path)?;

        // 初始化日志
        let _observability_guard = init_observability(&config)?;

        // 写入 PID 文件
        let pid_path = process::ProcessManager::write_pid_file(config.pid.as_deref())?;
        let _pid_guard = process::PidFileGuard::new(pid_path);

        Self::run_services(config).await
    }

    /// 启动服务并等待关闭
    async fn run_services(config: VeilinkConfig) -> Result<()> {
        info!("🚀 启动 veilink 服务: {}", config.name);

        // secret 缺失时拒绝启动
        let secret_source = config.secret_source();
        secret_source.load()?;
        info!("🔑 secret 来源: {}", secret_source);

        if let Err(e) = veilink_common::metrics::register_metrics() {
            warn!(
                "Prometheus metrics registration warning (may already be registered): {}",
                e
            );
        }

        // 初始化全局关闭通道
        let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(10);

        // 安装 Ctrl-C 处理器，确保任何阶段都能广播关闭
        setup_ctrl_c_handler(shutdown_tx.clone()).await;

        let mut service_manager = ServiceManager::new(config.clone(), shutdown_tx.clone());
        service_manager.add_service(Box::new(RelayHttpService::new(config.clone())));

        let handle = service_manager
            .start_all()
            .await
            .map_err(|e| Error::service_startup(format!("{e:#}")))?;

        Self::display_service_info(&config);

        if let Err(e) = handle.await {
            error!("Service task terminated unexpectedly: {}", e);
        }
        service_manager.stop_all().await?;

        info!("🛑 所有服务已安全关闭");
        Ok(())
    }

    /// 显示服务信息
    fn display_service_info(config: &VeilinkConfig) {
        let base = config.public_base_url().unwrap_or_else(|| {
            format!("http://{}:{}", config.bind.http.ip, config.bind.http.port)
        });

        info!("✅ 所有服务已启动");
        info!("🔧 可用的API端点:");
        info!("  - POST {}/api/shorten", base);
        info!("  - GET  {}/r/{{token}}", base);
        info!("  - GET  {}/p/{{token}}", base);
        info!("  - GET  {}/health", base);
        info!("  - GET  {}/metrics", base);
    }
}

/// 设置Ctrl-C信号处理程序
async fn setup_ctrl_c_handler(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("无法监听Ctrl-C信号: {}", e);
            return;
        }
        info!("收到Ctrl-C信号，开始优雅关闭...");
        let _ = shutdown_tx.send(());
    });
}

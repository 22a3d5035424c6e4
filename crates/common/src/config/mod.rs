//! 统一配置管理系统
//!
//! 本模块是 veilink 配置的"单一真理之源"。
//! 所有配置项的定义、文档、默认值都在这里统一管理。
//! 配置文件为可选项：缺省时全部字段取默认值，secret 从环境变量 `SECRET` 读取。

pub mod bind;
pub mod relay;

pub use crate::config::bind::{BindConfig, HttpBindConfig};
pub use crate::config::relay::RelayConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use token::SecretSource;
use url::Url;

/// 未配置任何 secret 来源时读取的环境变量
pub const DEFAULT_SECRET_ENV: &str = "SECRET";

/// 覆盖监听端口的环境变量
pub const PORT_ENV: &str = "PORT";

/// 配置相关错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file does not exist: {path}")]
    FileNotFound { path: String },

    #[error("Path is not a valid file: {path}")]
    NotAFile { path: String },

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for environment variable '{var}': {value}")]
    InvalidEnv { var: String, value: String },
}

/// veilink 主配置结构体
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VeilinkConfig {
    /// 服务器实例名称
    ///
    /// 用于日志与健康检查中标识实例，例如 veilink-01。
    #[serde(default = "default_name")]
    pub name: String,

    /// 运行环境标识
    ///
    /// - "dev": 开发环境
    /// - "prod": 生产环境，对明文 secret 等配置给出警告
    /// - "test": 测试环境，用于自动化测试
    #[serde(default = "default_env")]
    pub env: String,

    /// PID 文件路径（可选）
    pub pid: Option<String>,

    /// 对外公开的基础地址（可选）
    ///
    /// 设置后短链接一律以此为前缀；未设置时根据请求的
    /// X-Forwarded-Proto / X-Forwarded-Host / Host 推导。
    /// 例如：https://go.example.com
    pub public_url: Option<String>,

    /// 网络绑定配置
    #[serde(default)]
    pub bind: BindConfig,

    /// 令牌 secret - 直接配置
    ///
    /// 注意：直接在配置文件中存储 secret 不够安全，生产环境建议使用 secret_env 或 secret_file
    #[serde(default)]
    pub secret: Option<String>,

    /// secret 环境变量名称
    ///
    /// 例如：secret_env = "VEILINK_SECRET"
    #[serde(default)]
    pub secret_env: Option<String>,

    /// secret 文件路径
    ///
    /// 文件权限应设置为 600 (仅所有者可读写)
    #[serde(default)]
    pub secret_file: Option<String>,

    /// 中继行为配置
    #[serde(default)]
    pub relay: RelayConfig,

    /// 可观测性配置（日志）
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// 可观测性配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ObservabilityConfig {
    /// 过滤级别
    ///
    /// 支持 EnvFilter 语法（如 "info,hyper=warn"）。默认值 "info"。
    #[serde(default = "default_filter_level")]
    pub filter_level: String,

    #[serde(default)]
    pub log: LogConfig,
}

/// 日志配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    /// 日志输出目标
    ///
    /// - "console": 仅输出到控制台（默认）
    /// - "file": 输出到文件
    #[serde(default = "default_log_output")]
    pub output: String,

    /// 日志轮转开关
    ///
    /// 当 output = "file" 时有效：
    /// - true: 按天轮转日志文件
    /// - false: 追加到单个文件
    #[serde(default)]
    pub rotate: bool,

    /// 日志文件路径
    ///
    /// 当 output = "file" 时有效
    #[serde(default = "default_log_path")]
    pub path: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter_level: default_filter_level(),
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: default_log_output(),
            rotate: false,
            path: default_log_path(),
        }
    }
}

fn default_name() -> String {
    "veilink".to_string()
}

fn default_env() -> String {
    "dev".to_string()
}

fn default_log_output() -> String {
    "console".to_string()
}

fn default_log_path() -> String {
    "logs/".to_string()
}

fn default_filter_level() -> String {
    "info".to_string()
}

impl Default for VeilinkConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            env: default_env(),
            pid: None,
            public_url: None,
            bind: BindConfig::default(),
            secret: None,
            secret_env: None,
            secret_file: None,
            relay: RelayConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl VeilinkConfig {
    /// 获取 secret 来源
    ///
    /// 优先级: secret_file > secret_env > secret > 环境变量 SECRET
    pub fn secret_source(&self) -> SecretSource {
        if let Some(path) = &self.secret_file {
            return SecretSource::File(path.clone());
        }

        if let Some(env_var) = &self.secret_env {
            return SecretSource::Environment(env_var.clone());
        }

        if let Some(secret) = &self.secret {
            return SecretSource::Direct(secret.clone());
        }

        SecretSource::Environment(DEFAULT_SECRET_ENV.to_string())
    }

    /// 解析公开基础地址（去掉末尾的 `/`）
    pub fn public_base_url(&self) -> Option<String> {
        self.public_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
    }

    /// 返回可观测性配置引用
    pub fn observability_config(&self) -> &ObservabilityConfig {
        &self.observability
    }

    /// 获取日志过滤级别，优先使用 RUST_LOG
    pub fn get_filter_level(&self) -> String {
        std::env::var("RUST_LOG")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.observability.filter_level.clone())
    }

    /// 应用环境变量覆盖
    ///
    /// 目前支持 `PORT` 覆盖 `bind.http.port`
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = std::env::var(PORT_ENV) {
            let value = value.trim();
            if !value.is_empty() {
                self.bind.http.port = value.parse().map_err(|_| ConfigError::InvalidEnv {
                    var: PORT_ENV.to_string(),
                    value: value.to_string(),
                })?;
            }
        }
        Ok(())
    }

    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(ConfigError::FileNotFound {
                path: format!("{path_ref:?}"),
            });
        }

        if !path_ref.is_file() {
            return Err(ConfigError::NotAFile {
                path: format!("{path_ref:?}"),
            });
        }

        let content = std::fs::read_to_string(path_ref)?;
        Ok(Self::from_toml(&content)?)
    }

    /// 从 TOML 字符串加载配置
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 将配置序列化为 TOML 字符串
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// 验证配置有效性
    ///
    /// 返回的问题列表中以 "Warning:" 开头的条目不阻止启动
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // 验证实例名称
        if self.name.trim().is_empty() {
            errors.push("Instance name cannot be empty".to_string());
        }

        // 验证环境
        if !["dev", "prod", "test"].contains(&self.env.as_str()) {
            errors.push(format!(
                "Invalid environment '{}', must be one of: dev, prod, test",
                self.env
            ));
        }

        // 验证过滤级别（EnvFilter 语法）
        let main_level = self
            .observability
            .filter_level
            .split(',')
            .next()
            .unwrap_or("")
            .trim();
        if !["trace", "debug", "info", "warn", "error"].contains(&main_level) {
            errors.push(format!(
                "Invalid filter level '{}', must start with one of: trace, debug, info, warn, error",
                self.observability.filter_level
            ));
        }

        // 验证日志输出
        if !["console", "file"].contains(&self.observability.log.output.as_str()) {
            errors.push(format!(
                "Invalid log output '{}' (observability.log.output), must be 'console' or 'file'",
                self.observability.log.output
            ));
        }

        // 验证绑定地址
        if let Err(e) = self.bind.http.socket_addr() {
            errors.push(e);
        }

        // 验证公开地址
        if let Some(public_url) = self.public_base_url() {
            match Url::parse(&public_url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
                Ok(_) => errors.push(format!(
                    "Invalid public_url '{public_url}', must be an absolute http(s) URL"
                )),
                Err(e) => errors.push(format!("Invalid public_url '{public_url}': {e}")),
            }
        }

        // 验证 secret
        if let Some(secret) = &self.secret {
            if secret.trim().is_empty() {
                errors.push("secret cannot be empty when set".to_string());
            } else if secret.trim().len() < 16 {
                errors.push(
                    "Warning: secret is too short, recommend at least 16 characters".to_string(),
                );
            }
            if self.env == "prod" && self.secret_env.is_none() && self.secret_file.is_none() {
                errors.push(
                    "Warning: secret is stored directly in the config file, prefer secret_env or secret_file"
                        .to_string(),
                );
            }
        }
        if let Some(env_var) = &self.secret_env
            && env_var.trim().is_empty()
        {
            errors.push("secret_env cannot be empty when set".to_string());
        }
        if let Some(path) = &self.secret_file
            && path.trim().is_empty()
        {
            errors.push("secret_file cannot be empty when set".to_string());
        }

        // 验证中继配置
        errors.extend(self.relay.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = VeilinkConfig::default();
        assert_eq!(config.name, "veilink");
        assert_eq!(config.env, "dev");
        assert_eq!(config.bind.http.port, 5000);
        assert!(config.public_base_url().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = VeilinkConfig::from_toml("").unwrap();
        assert_eq!(config.name, "veilink");
        assert_eq!(config.relay.cache_control, "no-cache");
        assert_eq!(config.observability.log.output, "console");
    }

    #[test]
    fn test_toml_serialization() {
        let config = VeilinkConfig {
            public_url: Some("https://go.example.com".to_string()),
            ..Default::default()
        };
        let toml = config.to_toml().unwrap();
        let parsed = VeilinkConfig::from_toml(&toml).unwrap();
        assert_eq!(parsed.public_url, config.public_url);
        assert_eq!(parsed.bind.http.port, config.bind.http.port);
    }

    #[test]
    fn test_secret_source_priority() {
        let config = VeilinkConfig::default();
        assert_eq!(
            config.secret_source(),
            SecretSource::Environment("SECRET".to_string())
        );

        let config = VeilinkConfig {
            secret: Some("direct-secret".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.secret_source(),
            SecretSource::Direct("direct-secret".to_string())
        );

        let config = VeilinkConfig {
            secret: Some("direct-secret".to_string()),
            secret_env: Some("MY_SECRET".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.secret_source(),
            SecretSource::Environment("MY_SECRET".to_string())
        );

        let config = VeilinkConfig {
            secret: Some("direct-secret".to_string()),
            secret_env: Some("MY_SECRET".to_string()),
            secret_file: Some("/run/secrets/veilink".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.secret_source(),
            SecretSource::File("/run/secrets/veilink".to_string())
        );
    }

    #[test]
    fn test_public_base_url_trims_trailing_slash() {
        let config = VeilinkConfig {
            public_url: Some("https://go.example.com/".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.public_base_url().as_deref(),
            Some("https://go.example.com")
        );
    }

    #[test]
    fn test_validate_reports_errors_and_warnings() {
        let config = VeilinkConfig {
            env: "staging".to_string(),
            public_url: Some("ftp://files.example.com".to_string()),
            secret: Some("short".to_string()),
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("Invalid environment")));
        assert!(errors.iter().any(|e| e.contains("public_url")));
        assert!(
            errors
                .iter()
                .any(|e| e.starts_with("Warning:") && e.contains("too short"))
        );
    }

    #[test]
    fn test_validate_warning_only() {
        let config = VeilinkConfig {
            env: "prod".to_string(),
            secret: Some("a-sufficiently-long-secret".to_string()),
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(!errors.is_empty());
        assert!(errors.iter().all(|e| e.starts_with("Warning:")));
    }

    #[test]
    fn test_from_file_missing() {
        let err = VeilinkConfig::from_file("/nonexistent/veilink.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
name = "veilink-test"
public_url = "https://go.example.com"
secret_env = "VEILINK_SECRET"

[bind.http]
ip = "127.0.0.1"
port = 8088

[relay]
cache_control = "private, max-age=60"
connect_timeout_secs = 5
"#,
        )
        .unwrap();

        let config = VeilinkConfig::from_file(&path).unwrap();
        assert_eq!(config.name, "veilink-test");
        assert_eq!(config.bind.http.port, 8088);
        assert_eq!(config.relay.cache_control, "private, max-age=60");
        assert_eq!(config.relay.connect_timeout_secs, Some(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_port_env_override() {
        unsafe {
            std::env::set_var(PORT_ENV, "7070");
        }
        let mut config = VeilinkConfig::default();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.bind.http.port, 7070);

        unsafe {
            std::env::set_var(PORT_ENV, "not-a-port");
        }
        let mut config = VeilinkConfig::default();
        assert!(matches!(
            config.apply_env_overrides(),
            Err(ConfigError::InvalidEnv { .. })
        ));

        unsafe {
            std::env::remove_var(PORT_ENV);
        }
    }

    #[test]
    #[serial]
    fn test_filter_level_prefers_rust_log() {
        let mut config = VeilinkConfig::default();
        config.observability.filter_level = "warn,hyper=error".to_string();

        unsafe {
            std::env::remove_var("RUST_LOG");
        }
        assert_eq!(config.get_filter_level(), "warn,hyper=error");

        unsafe {
            std::env::set_var("RUST_LOG", " debug ");
        }
        assert_eq!(config.get_filter_level(), "debug");

        unsafe {
            std::env::set_var("RUST_LOG", "  ");
        }
        assert_eq!(config.get_filter_level(), "warn,hyper=error");

        unsafe {
            std::env::remove_var("RUST_LOG");
        }
    }
}

//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 配置模块
//!
//! 定义熔断器的配置结构，支持从 JSON、YAML、TOML 加载。

use crate::constants::{DEFAULT_MAX_FAILURES, DEFAULT_RESET_TIMEOUT_MILLIS};
use crate::error::BreakerError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// 熔断器配置
///
/// 未提供的字段使用默认值（`max_failures = 5`，`reset_timeout_millis = 1000`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// 失败阈值（自上次重置以来连续失败达到此值时熔断）
    #[serde(alias = "maxFailures")]
    pub max_failures: u32,
    /// 重置超时（毫秒），从熔断时刻起至少经过此时间才允许探测调用
    #[serde(alias = "resetTimeoutMillis", alias = "resetTimeoutInMillis")]
    pub reset_timeout_millis: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: DEFAULT_MAX_FAILURES,
            reset_timeout_millis: DEFAULT_RESET_TIMEOUT_MILLIS,
        }
    }
}

impl CircuitBreakerConfig {
    /// 创建新的熔断器配置
    pub fn new(max_failures: u32, reset_timeout: Duration) -> Self {
        Self {
            max_failures,
            reset_timeout_millis: duration_to_millis(reset_timeout),
        }
    }

    /// 设置失败阈值
    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures;
        self
    }

    /// 设置重置超时
    pub fn with_reset_timeout(mut self, reset_timeout: Duration) -> Self {
        self.reset_timeout_millis = duration_to_millis(reset_timeout);
        self
    }

    /// 重置超时
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_millis)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), BreakerError> {
        if self.max_failures == 0 {
            return Err(BreakerError::ConfigError(
                "max_failures 必须大于0".to_string(),
            ));
        }
        Ok(())
    }

    /// 从 JSON 字符串加载
    pub fn from_json_str(content: &str) -> Result<Self, BreakerError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 YAML 字符串加载
    pub fn from_yaml_str(content: &str) -> Result<Self, BreakerError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 字符串加载
    pub fn from_toml_str(content: &str) -> Result<Self, BreakerError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从配置文件加载，根据扩展名选择格式
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BreakerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        debug!("加载熔断器配置: path={}", path.display());

        match extension.as_deref() {
            Some("json") => Self::from_json_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            other => Err(BreakerError::ConfigError(format!(
                "不支持的配置文件格式: {:?}",
                other
            ))),
        }
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

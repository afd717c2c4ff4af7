//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 错误类型定义
//!
//! 使用thiserror定义所有错误类型。
//!
//! - [`BreakerError`]: 熔断器的使用错误与配置错误（`wrap()` 重复调用、配置加载失败）
//! - [`CallError`]: 受保护调用的错误（快速失败拒绝，或被保护操作自身的失败）

use crate::constants::{
    KIND_ALREADY_IN_USE, KIND_CALL_FAILED, KIND_CIRCUIT_OPEN, KIND_CONFIG, KIND_FAIL_FAST,
    KIND_IO, KIND_PARSE,
};
use thiserror::Error;

/// Breakeron 错误类型
#[derive(Error, Debug)]
pub enum BreakerError {
    /// 同一个熔断器实例只能保护一个调用
    #[error("CircuitBreaker: already-in-use")]
    AlreadyInUse,

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// IO错误
    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerdeError(#[from] serde_json::Error),

    /// YAML解析错误
    #[error("YAML解析错误: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML解析错误
    #[error("TOML解析错误: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl BreakerError {
    /// 错误类别标识
    pub fn kind(&self) -> &'static str {
        match self {
            BreakerError::AlreadyInUse => KIND_ALREADY_IN_USE,
            BreakerError::ConfigError(_) => KIND_CONFIG,
            BreakerError::IoError(_) => KIND_IO,
            BreakerError::SerdeError(_) | BreakerError::YamlError(_) | BreakerError::TomlError(_) => {
                KIND_PARSE
            }
        }
    }
}

/// 受保护调用的错误
///
/// `E` 为被保护操作自身的错误类型，原样保留在 [`CallError::Failed`] 中。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError<E> {
    /// 熔断器当前禁止调用，操作未被执行
    #[error("CircuitBreaker: fail-fast")]
    FailFast,

    /// 状态机内部的拒绝标记，由 [`StateMachine::invoke`] 产生
    ///
    /// [`StateMachine::invoke`]: crate::state_machine::StateMachine::invoke
    #[error("circuit-breaker-open")]
    CircuitOpen,

    /// 被保护操作自身的失败
    #[error("{0}")]
    Failed(E),
}

/// 受保护调用的结果
pub type CallResult<T, E> = Result<T, CallError<E>>;

impl<E> CallError<E> {
    /// 错误类别标识
    pub fn kind(&self) -> &'static str {
        match self {
            CallError::FailFast => KIND_FAIL_FAST,
            CallError::CircuitOpen => KIND_CIRCUIT_OPEN,
            CallError::Failed(_) => KIND_CALL_FAILED,
        }
    }

    /// 是否为熔断器的拒绝（操作未被执行）
    pub fn is_rejection(&self) -> bool {
        matches!(self, CallError::FailFast | CallError::CircuitOpen)
    }

    /// 将内部拒绝标记转换为对外的快速失败错误
    pub fn into_external(self) -> Self {
        match self {
            CallError::CircuitOpen => CallError::FailFast,
            other => other,
        }
    }

    /// 获取被保护操作的失败原因
    pub fn as_failed(&self) -> Option<&E> {
        match self {
            CallError::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// 取出被保护操作的失败原因
    pub fn into_failed(self) -> Option<E> {
        match self {
            CallError::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// 转换失败原因的类型，拒绝类错误保持不变
    pub fn map_failed<F, O>(self, op: O) -> CallError<F>
    where
        O: FnOnce(E) -> F,
    {
        match self {
            CallError::FailFast => CallError::FailFast,
            CallError::CircuitOpen => CallError::CircuitOpen,
            CallError::Failed(e) => CallError::Failed(op(e)),
        }
    }
}

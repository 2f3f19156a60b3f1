// crates/bt_physics/src/error.rs

//! 输运引擎错误类型
//!
//! 所有算子都返回 [`TransportResult`]，内核从不中止进程，
//! 由上层驱动决定是否终止运行。
//!
//! 缺失的可选数据（如未注册的气体示踪剂）不属于错误，
//! 只通过 `log::warn!` 报告。

use bt_config::ConfigError;
use thiserror::Error;

/// 输运结果类型
pub type TransportResult<T> = Result<T, TransportError>;

/// 输运引擎错误
#[derive(Debug, Error)]
pub enum TransportError {
    /// 配置错误（孔隙率越界、必需示踪剂未解析等）
    #[error("配置错误: {0}")]
    Configuration(String),

    /// 物理不变量被破坏（无法新建沉积层、底层水体耗尽等）
    #[error("物理不变量被破坏: {0}")]
    PhysicalInvariant(String),

    /// 三对角系统奇异
    #[error("三对角系统奇异: 第 {row} 行主元 {pivot:.3e}")]
    SingularSystem {
        /// 出错行
        row: usize,
        /// 主元
        pivot: f64,
    },

    /// 数组大小不匹配
    #[error("{what} 大小不匹配: 期望 {expected}, 实际 {actual}")]
    SizeMismatch {
        /// 数组名称
        what: &'static str,
        /// 期望长度
        expected: usize,
        /// 实际长度
        actual: usize,
    },

    /// 未知箱体
    #[error("未知箱体: {0}")]
    UnknownBox(usize),

    /// 运行配置无效
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TransportError {
    /// 构造配置错误
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// 构造物理不变量错误
    pub fn physical(msg: impl Into<String>) -> Self {
        Self::PhysicalInvariant(msg.into())
    }

    /// 检查长度，不一致时返回 `SizeMismatch`
    pub fn check_len(what: &'static str, expected: usize, actual: usize) -> TransportResult<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::SizeMismatch {
                what,
                expected,
                actual,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_len() {
        assert!(TransportError::check_len("kz", 4, 4).is_ok());
        let err = TransportError::check_len("kz", 4, 3).unwrap_err();
        assert!(matches!(
            err,
            TransportError::SizeMismatch {
                what: "kz",
                expected: 4,
                actual: 3
            }
        ));
        assert!(err.to_string().contains("kz"));
    }

    #[test]
    fn test_config_error_conversion() {
        let err: TransportError = ConfigError::invalid("timestep", 0.0, "必须为正数").into();
        assert!(matches!(err, TransportError::Config(_)));
        assert!(err.to_string().contains("timestep"));
    }
}

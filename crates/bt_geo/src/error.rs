// crates/bt_geo/src/error.rs

//! 几何错误类型

use thiserror::Error;

/// 几何模块结果类型
pub type GeoResult<T> = Result<T, GeoError>;

/// 几何错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// 多边形顶点不足
    #[error("多边形顶点不足: 至少需要 3 个, 实际 {count}")]
    TooFewVertices {
        /// 实际顶点数
        count: usize,
    },

    /// 坐标包含 NaN 或无穷大
    #[error("无效坐标: 第 {index} 个顶点 ({x}, {y})")]
    NonFiniteVertex {
        /// 顶点序号
        index: usize,
        /// x 坐标
        x: f64,
        /// y 坐标
        y: f64,
    },

    /// 多边形面积为零
    #[error("退化多边形: 面积为零")]
    Degenerate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GeoError::TooFewVertices { count: 2 };
        assert!(err.to_string().contains('2'));
    }
}

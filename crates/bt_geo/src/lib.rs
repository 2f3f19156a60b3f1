// crates/bt_geo/src/lib.rs

//! BoxTracer 平面几何模块
//!
//! 为箱式模型提供水平方向的几何支持：
//!
//! - `geometry`: 平面点 (Point2D) 与多边形足迹 (Polygon)
//! - `spatial_index`: 基于 R-tree 的足迹包围盒索引
//! - `error`: 几何错误类型
//!
//! # 示例
//!
//! ```
//! use bt_geo::prelude::*;
//!
//! let square = Polygon::new(vec![
//!     Point2D::new(0.0, 0.0),
//!     Point2D::new(1.0, 0.0),
//!     Point2D::new(1.0, 1.0),
//!     Point2D::new(0.0, 1.0),
//! ]).unwrap();
//! assert!(square.contains(&Point2D::new(0.5, 0.5)));
//!
//! let index = FootprintIndex::build(&[square]);
//! assert_eq!(index.candidates(&Point2D::new(0.5, 0.5)), vec![0]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod geometry;
pub mod spatial_index;

/// 预导入模块
pub mod prelude {
    pub use crate::error::{GeoError, GeoResult};
    pub use crate::geometry::{Point2D, Polygon};
    pub use crate::spatial_index::{BoundingBox, FootprintIndex};
}

pub use error::{GeoError, GeoResult};
pub use geometry::{Point2D, Polygon};
pub use spatial_index::{BoundingBox, FootprintIndex};

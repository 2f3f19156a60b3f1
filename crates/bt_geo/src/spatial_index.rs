// crates/bt_geo/src/spatial_index.rs
//! 足迹空间索引
//!
//! 以多边形包围盒构建 R-tree，快速筛选可能包含查询点的足迹。
//! 精确判定（点在多边形内）由调用方完成。
//!
//! # 示例
//!
//! ```
//! use bt_geo::{FootprintIndex, Point2D, Polygon};
//!
//! let a = Polygon::rectangle(0.0, 0.0, 10.0, 10.0).unwrap();
//! let b = Polygon::rectangle(10.0, 0.0, 20.0, 10.0).unwrap();
//! let index = FootprintIndex::build(&[a, b]);
//!
//! assert_eq!(index.candidates(&Point2D::new(15.0, 5.0)), vec![1]);
//! assert!(index.candidates(&Point2D::new(50.0, 5.0)).is_empty());
//! ```

use crate::geometry::{Point2D, Polygon};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// 边界框
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// 最小 x
    pub min_x: f64,
    /// 最小 y
    pub min_y: f64,
    /// 最大 x
    pub max_x: f64,
    /// 最大 y
    pub max_y: f64,
}

impl BoundingBox {
    /// 创建新的边界框
    #[must_use]
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    /// 检查点是否在边界框内（含边界）
    #[must_use]
    pub fn contains_point(&self, point: &Point2D) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// 合并两个边界框
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    fn envelope(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

// ============================================================================
// R-tree 包装
// ============================================================================

/// 索引条目：足迹包围盒 + 注册序号
#[derive(Debug, Clone)]
struct FootprintEntry {
    bbox: BoundingBox,
    order: usize,
}

impl RTreeObject for FootprintEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bbox.envelope()
    }
}

/// 足迹索引
///
/// 条目编号即足迹的注册顺序（构建时切片中的下标）。
pub struct FootprintIndex {
    tree: RTree<FootprintEntry>,
    len: usize,
}

impl FootprintIndex {
    /// 从足迹列表批量构建
    #[must_use]
    pub fn build(footprints: &[Polygon]) -> Self {
        let entries: Vec<FootprintEntry> = footprints
            .iter()
            .enumerate()
            .map(|(order, polygon)| FootprintEntry {
                bbox: polygon.bounding_box(),
                order,
            })
            .collect();
        let len = entries.len();
        Self {
            tree: RTree::bulk_load(entries),
            len,
        }
    }

    /// 包围盒包含查询点的足迹序号，按注册顺序升序返回
    #[must_use]
    pub fn candidates(&self, point: &Point2D) -> Vec<usize> {
        let query = AABB::from_point([point.x, point.y]);
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&query)
            .filter(|entry| entry.bbox.contains_point(point))
            .map(|entry| entry.order)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// 足迹数量
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 检查索引是否为空
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_merge_and_contains() {
        let merged =
            BoundingBox::new(10.0, 10.0, 0.0, 0.0).merge(&BoundingBox::new(20.0, 5.0, 30.0, 8.0));
        assert_eq!(merged, BoundingBox::new(0.0, 0.0, 30.0, 10.0));
        assert!(merged.contains_point(&Point2D::new(25.0, 9.0)));
        assert!(merged.contains_point(&Point2D::new(30.0, 0.0)));
        assert!(!merged.contains_point(&Point2D::new(31.0, 5.0)));
    }

    #[test]
    fn test_candidates_sorted_by_registration() {
        // 三个互相重叠的足迹，乱序插入 R-tree 后仍按注册顺序返回
        let footprints = vec![
            Polygon::rectangle(0.0, 0.0, 10.0, 10.0).unwrap(),
            Polygon::rectangle(20.0, 0.0, 30.0, 10.0).unwrap(),
            Polygon::rectangle(5.0, 5.0, 25.0, 15.0).unwrap(),
            Polygon::rectangle(-5.0, -5.0, 8.0, 8.0).unwrap(),
        ];
        let index = FootprintIndex::build(&footprints);
        assert_eq!(index.len(), 4);

        assert_eq!(index.candidates(&Point2D::new(6.0, 6.0)), vec![0, 2, 3]);
        assert_eq!(index.candidates(&Point2D::new(22.0, 8.0)), vec![1, 2]);
        assert!(index.candidates(&Point2D::new(100.0, 100.0)).is_empty());
    }

    #[test]
    fn test_empty_index() {
        let index = FootprintIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index.candidates(&Point2D::ZERO).is_empty());
    }
}

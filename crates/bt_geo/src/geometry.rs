// crates/bt_geo/src/geometry.rs

//! 几何类型定义
//!
//! 提供箱体水平足迹所需的 2D 点和简单多边形。
//! 坐标假定为投影坐标（米），不做大地测量计算。

use crate::error::{GeoError, GeoResult};
use crate::spatial_index::BoundingBox;
use serde::{Deserialize, Serialize};

// ============================================================================
// Point2D
// ============================================================================

/// 2D点
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// X坐标
    pub x: f64,
    /// Y坐标
    pub y: f64,
}

impl Point2D {
    /// 零点常量
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// 创建新的2D点
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 是否为有限值
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<[f64; 2]> for Point2D {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

// ============================================================================
// Polygon
// ============================================================================

/// 简单多边形（箱体足迹）
///
/// 顶点按顺序首尾相连，不要求重复首顶点，顺/逆时针均可。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point2D>", into = "Vec<Point2D>")]
pub struct Polygon {
    vertices: Vec<Point2D>,
}

impl Polygon {
    /// 从顶点序列创建多边形
    ///
    /// 若末顶点与首顶点重合则自动去除。
    pub fn new(mut vertices: Vec<Point2D>) -> GeoResult<Self> {
        if vertices.len() > 3 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        if vertices.len() < 3 {
            return Err(GeoError::TooFewVertices {
                count: vertices.len(),
            });
        }
        if let Some((index, p)) = vertices.iter().enumerate().find(|(_, p)| !p.is_finite()) {
            return Err(GeoError::NonFiniteVertex {
                index,
                x: p.x,
                y: p.y,
            });
        }

        let polygon = Self { vertices };
        if polygon.area() <= 0.0 {
            return Err(GeoError::Degenerate);
        }
        Ok(polygon)
    }

    /// 轴对齐矩形
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> GeoResult<Self> {
        Self::new(vec![
            Point2D::new(min_x, min_y),
            Point2D::new(max_x, min_y),
            Point2D::new(max_x, max_y),
            Point2D::new(min_x, max_y),
        ])
    }

    /// 顶点切片
    #[inline]
    pub fn vertices(&self) -> &[Point2D] {
        &self.vertices
    }

    /// 顶点数量
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// 是否为空（构造后恒为 false）
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// 鞋带公式计算面积（绝对值）
    pub fn area(&self) -> f64 {
        let n = self.vertices.len();
        let mut twice = 0.0;
        for i in 0..n {
            let a = &self.vertices[i];
            let b = &self.vertices[(i + 1) % n];
            twice += a.x * b.y - b.x * a.y;
        }
        0.5 * twice.abs()
    }

    /// 顶点平均值
    pub fn vertex_mean(&self) -> Point2D {
        let n = self.vertices.len() as f64;
        let (sx, sy) = self
            .vertices
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point2D::new(sx / n, sy / n)
    }

    /// 包围盒
    pub fn bounding_box(&self) -> BoundingBox {
        let first = self.vertices[0];
        self.vertices.iter().skip(1).fold(
            BoundingBox::new(first.x, first.y, first.x, first.y),
            |bbox, p| bbox.merge(&BoundingBox::new(p.x, p.y, p.x, p.y)),
        )
    }

    /// 射线法判断点是否在多边形内
    ///
    /// 边界上的点的归属取决于射线方向，不作保证。
    pub fn contains(&self, point: &Point2D) -> bool {
        let (x, y) = (point.x, point.y);
        let n = self.vertices.len();
        let mut inside = false;
        let mut j = n - 1;

        for i in 0..n {
            let vi = &self.vertices[i];
            let vj = &self.vertices[j];

            if ((vi.y > y) != (vj.y > y))
                && (x < (vj.x - vi.x) * (y - vi.y) / (vj.y - vi.y) + vi.x)
            {
                inside = !inside;
            }

            j = i;
        }

        inside
    }
}

impl TryFrom<Vec<Point2D>> for Polygon {
    type Error = GeoError;

    fn try_from(vertices: Vec<Point2D>) -> GeoResult<Self> {
        Self::new(vertices)
    }
}

impl From<Polygon> for Vec<Point2D> {
    fn from(polygon: Polygon) -> Self {
        polygon.vertices
    }
}

// crates/bt_physics/src/spatial.rs

//! 空间定位
//!
//! 将地理点定位到箱体，将深度定位到水柱层或沉积层。
//! 调用频率低（点源放置），不在每步计算路径上。
//!
//! 定位器是显式句柄，由调用方持有并传递，不存在全局模型引用。
//!
//! # 重叠足迹
//!
//! 足迹重叠时按注册顺序取第一个包含查询点的箱体。
//! R-tree 只做包围盒初筛，候选按注册顺序逐个做射线法判定，
//! 因此结果与线性扫描完全一致。

use bt_geo::{FootprintIndex, Point2D, Polygon};

use crate::domain::{BoxId, ModelBox};

/// 箱体定位器
pub struct BoxLocator {
    footprints: Vec<Polygon>,
    index: FootprintIndex,
}

impl BoxLocator {
    /// 以箱体注册顺序构建
    pub fn new(boxes: &[ModelBox]) -> Self {
        let footprints: Vec<Polygon> = boxes.iter().map(|b| b.footprint().clone()).collect();
        let index = FootprintIndex::build(&footprints);
        Self { footprints, index }
    }

    /// 箱体数
    #[inline]
    pub fn len(&self) -> usize {
        self.footprints.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.footprints.is_empty()
    }

    /// 点所在箱体，首个注册的匹配者优先
    pub fn point_to_box(&self, x: f64, y: f64) -> Option<BoxId> {
        let point = Point2D::new(x, y);
        self.index
            .candidates(&point)
            .into_iter()
            .find(|&i| self.footprints[i].contains(&point))
            .map(BoxId)
    }

    /// 高程 z 所在水柱层
    ///
    /// 返回满足 `gridz[k] <= z < gridz[k+1]` 的 k。
    /// 低于底面的 z 归入第 0 层，达到或高于水面的 z 归入第 nz-1 层。
    pub fn depth_to_water_layer(&self, z: f64, model_box: &ModelBox) -> usize {
        let gridz = model_box.water().gridz();
        let nz = model_box.water().nz();
        if z < gridz[0] {
            return 0;
        }
        if z >= gridz[nz] {
            return nz - 1;
        }
        // gridz 严格递增，partition_point 给出首个 gridz > z 的界面
        let upper = gridz.partition_point(|&g| g <= z);
        upper.saturating_sub(1).min(nz - 1)
    }

    /// 高程 z 所在沉积层
    ///
    /// 沉积层高程向下递减，在已填充层 `topk..nz` 中返回首个满足
    /// `gridz[k] >= z > gridz[k+1]` 的 k；不在任何已填充层内时返回 `None`。
    pub fn depth_to_sediment_layer(&self, z: f64, model_box: &ModelBox) -> Option<usize> {
        let sediment = model_box.sediment();
        let gridz = sediment.gridz();
        sediment
            .active_layers()
            .find(|&k| gridz[k] >= z && z > gridz[k + 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BoxGeometry;

    fn make_box(id: usize, min_x: f64, max_x: f64) -> ModelBox {
        let geometry = BoxGeometry::new(
            Polygon::rectangle(min_x, 0.0, max_x, 10.0).unwrap(),
            vec![-30.0, -20.0, -5.0, 0.0],
            vec![0.0, 0.01, 0.02, 0.04],
            1,
        );
        ModelBox::from_geometry(BoxId(id), geometry).unwrap()
    }

    #[test]
    fn test_point_to_box() {
        let boxes = vec![make_box(0, 0.0, 10.0), make_box(1, 10.0, 20.0)];
        let locator = BoxLocator::new(&boxes);
        assert_eq!(locator.len(), 2);
        assert_eq!(locator.point_to_box(5.0, 5.0), Some(BoxId(0)));
        assert_eq!(locator.point_to_box(15.0, 5.0), Some(BoxId(1)));
        assert_eq!(locator.point_to_box(25.0, 5.0), None);
    }

    #[test]
    fn test_overlap_first_registered_wins() {
        let boxes = vec![
            make_box(0, 0.0, 10.0),
            make_box(1, 5.0, 15.0),
            make_box(2, -5.0, 8.0),
        ];
        let locator = BoxLocator::new(&boxes);
        assert_eq!(locator.point_to_box(6.0, 5.0), Some(BoxId(0)));
        assert_eq!(locator.point_to_box(12.0, 5.0), Some(BoxId(1)));
        assert_eq!(locator.point_to_box(-2.0, 5.0), Some(BoxId(2)));
    }

    #[test]
    fn test_depth_to_water_layer() {
        let b = make_box(0, 0.0, 10.0);
        let locator = BoxLocator::new(std::slice::from_ref(&b));
        assert_eq!(locator.depth_to_water_layer(-30.0, &b), 0);
        assert_eq!(locator.depth_to_water_layer(-25.0, &b), 0);
        assert_eq!(locator.depth_to_water_layer(-20.0, &b), 1);
        assert_eq!(locator.depth_to_water_layer(-5.0, &b), 2);
        assert_eq!(locator.depth_to_water_layer(-1.0, &b), 2);
        assert_eq!(locator.depth_to_water_layer(0.0, &b), 2);
        // 越界钳制
        assert_eq!(locator.depth_to_water_layer(-100.0, &b), 0);
        assert_eq!(locator.depth_to_water_layer(3.0, &b), 2);
    }

    #[test]
    fn test_depth_to_sediment_layer() {
        // 已填充层 1..4: gridz = [0, 0, -0.01, -0.03, -0.07]
        let b = make_box(0, 0.0, 10.0);
        let locator = BoxLocator::new(std::slice::from_ref(&b));
        // 层顶面归属本层
        assert_eq!(locator.depth_to_sediment_layer(0.0, &b), Some(1));
        assert_eq!(locator.depth_to_sediment_layer(-0.005, &b), Some(1));
        assert_eq!(locator.depth_to_sediment_layer(-0.01, &b), Some(2));
        assert_eq!(locator.depth_to_sediment_layer(-0.02, &b), Some(2));
        assert_eq!(locator.depth_to_sediment_layer(-0.06, &b), Some(3));
        assert_eq!(locator.depth_to_sediment_layer(-0.5, &b), None);
        assert_eq!(locator.depth_to_sediment_layer(1.0, &b), None);
    }
}

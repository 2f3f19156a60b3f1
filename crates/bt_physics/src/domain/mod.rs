// crates/bt_physics/src/domain/mod.rs

//! 领域模型
//!
//! - [`model_box`]: 箱体、箱体类型、外部几何、深层参考值
//! - [`water`]: 水柱分层
//! - [`sediment`]: 沉积层柱
//! - [`tracer`]: 示踪剂描述与注册表
//! - [`concentration`]: 浓度矩阵与双快照

pub mod concentration;
pub mod model_box;
pub mod sediment;
pub mod tracer;
pub mod water;

pub use concentration::{BoxConcentrations, ConcentrationField, LayerMatrix, TracerSnapshots};
pub use model_box::{BoxGeometry, BoxId, BoxType, DeepReservoir, ModelBox, ReservoirField};
pub use sediment::SedimentColumn;
pub use tracer::{TracerDescriptor, TracerRegistry};
pub use water::WaterColumn;

use crate::error::TransportResult;

/// 箱体集合 + 示踪剂注册表
#[derive(Debug, Clone)]
pub struct Domain {
    /// 箱体（下标即 [`BoxId`]）
    pub boxes: Vec<ModelBox>,
    /// 示踪剂
    pub tracers: TracerRegistry,
}

impl Domain {
    /// 由外部几何和示踪剂表构建
    pub fn build(
        geometries: Vec<BoxGeometry>,
        tracers: Vec<TracerDescriptor>,
    ) -> TransportResult<Self> {
        let tracers = TracerRegistry::new(tracers)?;
        let boxes = geometries
            .into_iter()
            .enumerate()
            .map(|(i, g)| ModelBox::from_geometry(BoxId(i), g))
            .collect::<TransportResult<Vec<_>>>()?;
        log::debug!(
            "领域模型构建完成: {} 个箱体, {} 个示踪剂",
            boxes.len(),
            tracers.len()
        );
        Ok(Self { boxes, tracers })
    }

    /// 箱体数
    #[inline]
    pub fn n_boxes(&self) -> usize {
        self.boxes.len()
    }

    /// 全零浓度场
    pub fn zero_field(&self) -> ConcentrationField {
        ConcentrationField::for_boxes(&self.boxes, self.tracers.len())
    }
}
